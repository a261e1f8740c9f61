use std::fs::File;

use crate::classifier::{
    BiasTarget, BinaryClassifier, BinaryTrainer, Classifier, FeatureCorpus, FeatureExtractor,
    Labeled, MulticlassClassifier, MulticlassTrainer,
};
use crate::perceptron::{AveragedPerceptron, CompactModel, OverUnderLoss, PerceptronExport};

const TRAIN_VEC: &str = include_str!("./resources/train.vec");
const DEV_VEC: &str = include_str!("./resources/dev.vec");

fn corpora() -> (FeatureCorpus, FeatureCorpus) {
    let train = FeatureCorpus::from_reader(TRAIN_VEC.as_bytes()).unwrap();
    let dev = FeatureCorpus::from_reader_with_length(DEV_VEC.as_bytes(), train.vector_length())
        .unwrap();
    (train, dev)
}

/// コーパスのヘッダの読み込み
#[test]
fn test_corpus_headers() {
    let (train, dev) = corpora();

    assert_eq!(12, train.vector_length());
    assert_eq!(12, dev.vector_length());
    assert_eq!("bias,word,prev,next", train.template());
    assert_eq!(4, train.extractor().template_count());
    assert_eq!(30, train.len());
    assert_eq!(10, dev.len());
}

/// 平均化された生の重みとコンパクトモデルの分類結果が一致する
#[test]
fn test_compact_model_equivalence() {
    let (train, dev) = corpora();
    let extractor = train.extractor();

    let mut perceptron = AveragedPerceptron::multiclass(3, 1.0);
    for _ in 0..5 {
        for sent in train.sentences() {
            for pos in 0..sent.num_positions() {
                let x = extractor.feature_vector(sent, pos);
                perceptron.train(sent.gold(pos) as usize, &x).unwrap();
            }
        }
    }

    let mut expected = vec![];
    for sent in dev.sentences() {
        for x in sent.vectors() {
            expected.push(perceptron.classify(x).unwrap());
        }
    }

    let model = perceptron.finalize();
    let actual: Vec<usize> = dev
        .sentences()
        .iter()
        .flat_map(|sent| sent.vectors().iter().map(|x| model.classify(x)))
        .collect();
    assert_eq!(expected, actual);
}

/// 多クラス分類器の学習、保存、読み込み
#[test]
fn test_multiclass_file_round_trip() {
    let (train, dev) = corpora();
    let classifier = MulticlassTrainer::new(train.extractor())
        .iterations(5)
        .loss(OverUnderLoss::new(1.0, 2.0))
        .train(train.sentences(), dev.sentences())
        .unwrap();
    let stats = classifier.evaluate(&dev.extractor(), dev.sentences());
    assert_eq!(dev.num_positions(), stats.total);
    assert!(stats.accuracy() > 0.8);

    let file = tempfile::NamedTempFile::new().unwrap();
    classifier.write(File::create(file.path()).unwrap()).unwrap();
    let restored = match Classifier::read(File::open(file.path()).unwrap()).unwrap() {
        Classifier::Multiclass(c) => c,
        Classifier::Binary(_) => panic!("expected a multiclass classifier"),
    };

    assert_eq!(classifier, restored);
    assert_eq!("bias,word,prev,next", restored.template());
    assert_eq!(stats, restored.evaluate(&dev.extractor(), dev.sentences()));
    assert!(BinaryClassifier::read(File::open(file.path()).unwrap()).is_err());
}

/// テキスト形式で書き出した重みから同じ分類結果が得られる
#[test]
fn test_export_reproduces_model() {
    let (train, dev) = corpora();
    let classifier = MulticlassTrainer::new(train.extractor())
        .iterations(3)
        .train(train.sentences(), &[])
        .unwrap();

    let mut text = vec![];
    classifier.export(&mut text).unwrap();
    let export = PerceptronExport::read(text.as_slice()).unwrap();
    assert_eq!(train.template(), export.template);

    let model = CompactModel::from_vectors(&export.vectors, 3, export.num_features);
    for sent in dev.sentences() {
        for x in sent.vectors() {
            assert_eq!(classifier.classify(x), model.classify(x));
        }
    }
}

/// 二値分類器のバイアス探索と保存
#[test]
fn test_binary_bias_target() {
    let (train, dev) = corpora();
    let target = BiasTarget::NegativeRecall(0.95);
    let classifier = BinaryTrainer::new(train.extractor())
        .iterations(5)
        .bias_target(target)
        .train(train.sentences(), dev.sentences())
        .unwrap();

    let stats = classifier.evaluate(&dev.extractor(), dev.sentences());
    assert!(stats.negative_recall() >= f64::from(target.value() - target.epsilon()) - 1e-6);

    let mut buf = vec![];
    classifier.write(&mut buf).unwrap();
    let restored = BinaryClassifier::read(buf.as_slice()).unwrap();
    assert_eq!(classifier.bias(), restored.bias());
    assert_eq!(stats, restored.evaluate(&dev.extractor(), dev.sentences()));
    assert!(MulticlassClassifier::read(buf.as_slice()).is_err());
}
