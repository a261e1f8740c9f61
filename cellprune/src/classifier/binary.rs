//! 二値分類器の学習と推論。

use std::io::{Read, Write};
use std::time::Instant;

use crate::classifier::{
    BiasTarget, BinaryStats, Classifier, ClassifierParts, FeatureExtractor, Labeled, bias_search,
};
use crate::errors::{CellpruneError, Result};
use crate::perceptron::{AveragedPerceptron, CompactModel, FeatureVector};

/// 二値分類器のトレーナー。
///
/// 正解値が 0 以外の位置を正例として学習します。
/// バイアスの目標が指定されていれば、学習後に開発データ上でバイアスを探索します。
pub struct BinaryTrainer<E> {
    extractor: E,
    iterations: usize,
    learning_rate: f32,
    bias_target: Option<BiasTarget>,
}

impl<E> BinaryTrainer<E> {
    /// 素性抽出器を指定して新しいトレーナーを作成します。
    pub const fn new(extractor: E) -> Self {
        Self {
            extractor,
            iterations: 10,
            learning_rate: 1.0,
            bias_target: None,
        }
    }

    /// 学習データを走査する回数を変更します。
    ///
    /// デフォルト値は 10 です。
    ///
    /// # パニック
    ///
    /// 値が1未満の場合、パニックします。
    pub fn iterations(mut self, n: usize) -> Self {
        assert!(n >= 1);
        self.iterations = n;
        self
    }

    /// 学習率を変更します。
    ///
    /// # パニック
    ///
    /// 値が正でない場合、パニックします。
    pub fn learning_rate(mut self, rate: f32) -> Self {
        assert!(rate > 0.0);
        self.learning_rate = rate;
        self
    }

    /// バイアス探索の目標を指定します。
    ///
    /// # パニック
    ///
    /// 目標値が `(0, 1]` の範囲外の場合、パニックします。
    pub fn bias_target(mut self, target: BiasTarget) -> Self {
        let v = target.value();
        assert!(v > 0.0 && v <= 1.0);
        self.bias_target = Some(target);
        self
    }

    /// 学習を行い、分類器を返します。
    ///
    /// # 引数
    ///
    /// * `train` - 学習データ
    /// * `dev` - 開発データ。反復ごとの評価とバイアス探索に使われます。
    ///
    /// # エラー
    ///
    /// 素性ベクトルの長さが揃っていない場合、[`CellpruneError`] が返されます。
    pub fn train<I>(self, train: &[I], dev: &[I]) -> Result<BinaryClassifier>
    where
        I: Labeled,
        E: FeatureExtractor<I>,
    {
        let started = Instant::now();
        log::info!(
            "training a binary perceptron on {} instances for {} iterations",
            train.len(),
            self.iterations
        );

        let mut perceptron = AveragedPerceptron::binary(self.learning_rate);
        for iteration in 1..=self.iterations {
            let mut num_updates = 0;
            for inst in train {
                for pos in 0..inst.num_positions() {
                    let x = self.extractor.feature_vector(inst, pos);
                    if perceptron.train(usize::from(inst.gold(pos) != 0), &x)? {
                        num_updates += 1;
                    }
                }
            }
            log::info!(
                "iteration {iteration}: {num_updates} updates ({:.1}s)",
                started.elapsed().as_secs_f64()
            );

            if iteration < self.iterations && !dev.is_empty() {
                let mut stats = BinaryStats::default();
                for inst in dev {
                    for pos in 0..inst.num_positions() {
                        let x = self.extractor.feature_vector(inst, pos);
                        stats.add(inst.gold(pos) != 0, perceptron.classify(&x)? == 1);
                    }
                }
                log::info!("iteration {iteration}: dev {stats}");
            }
        }

        let num_train_examples = perceptron.num_train_examples();
        let model = perceptron.finalize();
        log::info!(
            "finalized {} features with {} weights",
            model.num_features(),
            model.num_pairs()
        );

        let bias = match self.bias_target {
            Some(target) if !dev.is_empty() => {
                let scored = self.score_dev(&model, dev);
                let (w_min, w_max) = model.weight_range();
                let t = self.extractor.template_count() as f32;
                let result = bias_search(-w_max * t, -w_min * t, target, |bias| {
                    target.metric(&stats_at(&scored, bias))
                });
                log::info!(
                    "bias={} metric={:.4} after {} steps",
                    result.bias,
                    result.metric,
                    result.steps
                );
                result.bias
            }
            Some(_) => {
                log::warn!("no development data for the bias search; using bias 0");
                0.0
            }
            None => 0.0,
        };

        Ok(BinaryClassifier {
            model,
            bias,
            template: self.extractor.template().to_string(),
            num_train_examples,
        })
    }

    fn score_dev<I>(&self, model: &CompactModel, dev: &[I]) -> Vec<(bool, f32)>
    where
        I: Labeled,
        E: FeatureExtractor<I>,
    {
        let mut scored = vec![];
        for inst in dev {
            for pos in 0..inst.num_positions() {
                let x = self.extractor.feature_vector(inst, pos);
                scored.push((inst.gold(pos) != 0, model.score(&x)));
            }
        }
        scored
    }
}

fn stats_at(scored: &[(bool, f32)], bias: f32) -> BinaryStats {
    let mut stats = BinaryStats::default();
    for &(gold, score) in scored {
        stats.add(gold, score + bias > 0.0);
    }
    stats
}

/// 学習済みの二値分類器。
///
/// `score + bias > 0` のとき正例と判定します。
#[derive(Clone, Debug, PartialEq)]
pub struct BinaryClassifier {
    model: CompactModel,
    bias: f32,
    template: String,
    num_train_examples: u64,
}

impl BinaryClassifier {
    pub(crate) const fn from_parts(
        model: CompactModel,
        bias: f32,
        template: String,
        num_train_examples: u64,
    ) -> Self {
        Self {
            model,
            bias,
            template,
            num_train_examples,
        }
    }

    fn parts(&self) -> ClassifierParts<'_> {
        ClassifierParts {
            model: &self.model,
            bins: None,
            bias: Some(self.bias),
            template: &self.template,
            num_train_examples: self.num_train_examples,
        }
    }

    /// 推論用のモデルを返します。
    pub const fn model(&self) -> &CompactModel {
        &self.model
    }

    /// 判定バイアスを返します。
    pub const fn bias(&self) -> f32 {
        self.bias
    }

    /// 判定バイアスを変更します。
    pub fn set_bias(&mut self, bias: f32) {
        self.bias = bias;
    }

    /// 素性テンプレートの記述を返します。
    pub fn template(&self) -> &str {
        &self.template
    }

    /// 学習した事例の数を返します。
    pub const fn num_train_examples(&self) -> u64 {
        self.num_train_examples
    }

    /// バイアスを加える前のスコアを返します。
    pub fn score(&self, x: &FeatureVector) -> f32 {
        self.model.score(x)
    }

    /// 正例と判定すれば `true` を返します。
    pub fn classify(&self, x: &FeatureVector) -> bool {
        self.model.decide(x, self.bias)
    }

    /// データを分類し、評価統計を返します。
    pub fn evaluate<I, E>(&self, extractor: &E, data: &[I]) -> BinaryStats
    where
        I: Labeled,
        E: FeatureExtractor<I>,
    {
        let mut stats = BinaryStats::default();
        for inst in data {
            for pos in 0..inst.num_positions() {
                let x = extractor.feature_vector(inst, pos);
                stats.add(inst.gold(pos) != 0, self.classify(&x));
            }
        }
        stats
    }

    /// 分類器をバイナリ形式で書き込みます。
    ///
    /// # エラー
    ///
    /// 書き込みに失敗した場合、[`CellpruneError`] が返されます。
    pub fn write<W>(&self, wtr: W) -> Result<()>
    where
        W: Write,
    {
        self.parts().write(wtr)
    }

    /// [`write()`](Self::write) で書き込まれた分類器を読み込みます。
    ///
    /// # エラー
    ///
    /// 内容が壊れている場合や、多クラス分類器が保存されていた場合、[`CellpruneError`] が返されます。
    pub fn read<R>(rdr: R) -> Result<Self>
    where
        R: Read,
    {
        match Classifier::read(rdr)? {
            Classifier::Binary(c) => Ok(c),
            Classifier::Multiclass(_) => Err(CellpruneError::invalid_argument(
                "rdr",
                "the input is a multiclass classifier",
            )),
        }
    }

    /// 重みとバイアスをテキスト形式で書き出します。
    pub fn export<W>(&self, wtr: W) -> Result<()>
    where
        W: Write,
    {
        self.parts().export(wtr)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::classifier::{FeatureCorpus, MulticlassClassifier};
    use crate::perceptron::PerceptronExport;

    // Feature 0 is the bias; 1 marks positives, 2 negatives and 3 is noise.
    const CORPUS: &str = "\
1\t0 1
0\t0 2
0\t0 2 3
EOS
2\t0 1 3
0\t0 2
EOS
";

    #[test]
    fn test_train_separable() {
        let corpus = FeatureCorpus::from_reader(CORPUS.as_bytes()).unwrap();
        let classifier = BinaryTrainer::new(corpus.extractor())
            .iterations(4)
            .train(corpus.sentences(), corpus.sentences())
            .unwrap();

        assert!(classifier.model().is_binary());
        assert_eq!(0.0, classifier.bias());
        assert_eq!(20, classifier.num_train_examples());

        let stats = classifier.evaluate(&corpus.extractor(), corpus.sentences());
        assert_eq!(5, stats.total());
        assert_eq!(1.0, stats.accuracy());
    }

    #[test]
    fn test_bias_search_meets_target() {
        let corpus = FeatureCorpus::from_reader(CORPUS.as_bytes()).unwrap();
        let classifier = BinaryTrainer::new(corpus.extractor())
            .iterations(2)
            .bias_target(BiasTarget::Precision(1.0))
            .train(corpus.sentences(), corpus.sentences())
            .unwrap();

        let stats = classifier.evaluate(&corpus.extractor(), corpus.sentences());
        assert_eq!(1.0, stats.precision());
    }

    #[test]
    fn test_bias_without_dev() {
        let corpus = FeatureCorpus::from_reader(CORPUS.as_bytes()).unwrap();
        let classifier = BinaryTrainer::new(corpus.extractor())
            .bias_target(BiasTarget::NegativeRecall(0.99))
            .train(corpus.sentences(), &[])
            .unwrap();
        assert_eq!(0.0, classifier.bias());
    }

    #[test]
    #[should_panic]
    fn test_invalid_bias_target() {
        let _ = BinaryTrainer::new(()).bias_target(BiasTarget::Precision(1.5));
    }

    #[test]
    fn test_write_read_and_export() {
        let corpus = FeatureCorpus::from_reader(CORPUS.as_bytes()).unwrap();
        let mut classifier = BinaryTrainer::new(corpus.extractor())
            .train(corpus.sentences(), &[])
            .unwrap();
        classifier.set_bias(-0.25);

        let mut buf = vec![];
        classifier.write(&mut buf).unwrap();
        assert_eq!(classifier, BinaryClassifier::read(buf.as_slice()).unwrap());
        assert!(MulticlassClassifier::read(buf.as_slice()).is_err());
        match Classifier::read(buf.as_slice()).unwrap() {
            Classifier::Binary(c) => assert_eq!(-0.25, c.bias()),
            Classifier::Multiclass(_) => panic!("expected a binary classifier"),
        }

        let mut text = vec![];
        classifier.export(&mut text).unwrap();
        let export = PerceptronExport::read(text.as_slice()).unwrap();
        assert_eq!(2, export.num_classes);
        assert_eq!(1, export.vectors.len());
        assert_eq!(Some(-0.25), export.bias);
        assert!(String::from_utf8(text).unwrap().starts_with("numFeats=4 numClasses=2 "));
        assert_eq!(None, export.bins);
    }
}
