//! 多クラス分類器の学習と推論。

use std::io::{Read, Write};
use std::time::Instant;

use crate::classifier::{Classifier, ClassifierParts, FeatureExtractor, Labeled, MulticlassStats};
use crate::errors::{CellpruneError, Result};
use crate::perceptron::{
    AveragedPerceptron, Bins, CompactModel, FeatureVector, LossFunction, ZeroOneLoss,
};
use crate::utils::FromU32;

fn class_of(bins: Option<&Bins>, gold: u32) -> usize {
    bins.map_or_else(|| usize::from_u32(gold), |b| b.class_for(gold))
}

/// 多クラス分類器のトレーナー。
///
/// クラス数は、ビンが指定されていればビンから、
/// [`num_classes()`](Self::num_classes) で指定されていればその値から、
/// どちらもなければ学習データの最大の正解値から決まります。
pub struct MulticlassTrainer<E> {
    extractor: E,
    iterations: usize,
    learning_rate: f32,
    loss: Box<dyn LossFunction>,
    bins: Option<Bins>,
    num_classes: Option<usize>,
}

impl<E> MulticlassTrainer<E> {
    /// 素性抽出器を指定して新しいトレーナーを作成します。
    pub fn new(extractor: E) -> Self {
        Self {
            extractor,
            iterations: 10,
            learning_rate: 1.0,
            loss: Box::new(ZeroOneLoss),
            bins: None,
            num_classes: None,
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
    /// デフォルト値は 1.0 です。
    ///
    /// # パニック
    ///
    /// 値が正でない場合、パニックします。
    pub fn learning_rate(mut self, rate: f32) -> Self {
        assert!(rate > 0.0);
        self.learning_rate = rate;
        self
    }

    /// 損失関数を変更します。
    ///
    /// デフォルトは [`ZeroOneLoss`] です。
    pub fn loss<L>(mut self, loss: L) -> Self
    where
        L: LossFunction + 'static,
    {
        self.loss = Box::new(loss);
        self
    }

    /// 正解値をクラスに離散化するビンを指定します。
    pub fn bins(mut self, bins: Bins) -> Self {
        self.bins = Some(bins);
        self
    }

    /// クラス数を指定します。
    ///
    /// # パニック
    ///
    /// 値が2未満の場合、パニックします。
    pub fn num_classes(mut self, n: usize) -> Self {
        assert!(n >= 2);
        self.num_classes = Some(n);
        self
    }

    /// 学習を行い、分類器を返します。
    ///
    /// 最後の反復を除く各反復の後、開発データが空でなければその正解率をログに出力します。
    ///
    /// # 引数
    ///
    /// * `train` - 学習データ
    /// * `dev` - 開発データ（空でもよい）
    ///
    /// # エラー
    ///
    /// 素性ベクトルの長さが揃っていない場合や、正解クラスが範囲外の場合、
    /// [`CellpruneError`] が返されます。
    pub fn train<I>(self, train: &[I], dev: &[I]) -> Result<MulticlassClassifier>
    where
        I: Labeled,
        E: FeatureExtractor<I>,
    {
        let started = Instant::now();
        let bins = self.bins.as_ref();
        let num_classes = match (bins, self.num_classes) {
            (Some(b), _) => b.num_classes(),
            (None, Some(n)) => n,
            (None, None) => train
                .iter()
                .flat_map(|inst| (0..inst.num_positions()).map(move |pos| inst.gold(pos)))
                .max()
                .map_or(2, |m| (usize::from_u32(m) + 1).max(2)),
        };
        log::info!(
            "training a {num_classes}-class perceptron on {} instances for {} iterations",
            train.len(),
            self.iterations
        );

        let mut perceptron =
            AveragedPerceptron::multiclass(num_classes, self.learning_rate).loss(self.loss);
        for iteration in 1..=self.iterations {
            let mut num_updates = 0;
            for inst in train {
                for pos in 0..inst.num_positions() {
                    let x = self.extractor.feature_vector(inst, pos);
                    if perceptron.train(class_of(bins, inst.gold(pos)), &x)? {
                        num_updates += 1;
                    }
                }
            }
            log::info!(
                "iteration {iteration}: {num_updates} updates ({:.1}s)",
                started.elapsed().as_secs_f64()
            );

            if iteration < self.iterations && !dev.is_empty() {
                let mut stats = MulticlassStats::default();
                for inst in dev {
                    for pos in 0..inst.num_positions() {
                        let x = self.extractor.feature_vector(inst, pos);
                        stats.add(class_of(bins, inst.gold(pos)), perceptron.classify(&x)?);
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

        Ok(MulticlassClassifier {
            model,
            bins: self.bins,
            template: self.extractor.template().to_string(),
            num_train_examples,
        })
    }
}

/// 学習済みの多クラス分類器。
#[derive(Clone, Debug, PartialEq)]
pub struct MulticlassClassifier {
    model: CompactModel,
    bins: Option<Bins>,
    template: String,
    num_train_examples: u64,
}

impl MulticlassClassifier {
    pub(crate) const fn from_parts(
        model: CompactModel,
        bins: Option<Bins>,
        template: String,
        num_train_examples: u64,
    ) -> Self {
        Self {
            model,
            bins,
            template,
            num_train_examples,
        }
    }

    fn parts(&self) -> ClassifierParts<'_> {
        ClassifierParts {
            model: &self.model,
            bins: self.bins.as_ref(),
            bias: None,
            template: &self.template,
            num_train_examples: self.num_train_examples,
        }
    }

    /// 推論用のモデルを返します。
    pub const fn model(&self) -> &CompactModel {
        &self.model
    }

    /// 正解値の離散化に使ったビンを返します。
    pub const fn bins(&self) -> Option<&Bins> {
        self.bins.as_ref()
    }

    /// 素性テンプレートの記述を返します。
    pub fn template(&self) -> &str {
        &self.template
    }

    /// 学習した事例の数を返します。
    pub const fn num_train_examples(&self) -> u64 {
        self.num_train_examples
    }

    /// 分類結果のクラスを返します。
    pub fn classify(&self, x: &FeatureVector) -> usize {
        self.model.classify(x)
    }

    /// 分類結果のクラスに対応する値を返します。
    ///
    /// ビンがなければクラス番号そのもの、あふれクラスであれば `None` です。
    pub fn classify_value(&self, x: &FeatureVector) -> Option<u32> {
        let class = self.classify(x);
        match &self.bins {
            Some(bins) => bins.value_for(class),
            None => u32::try_from(class).ok(),
        }
    }

    /// データを分類し、評価統計を返します。
    pub fn evaluate<I, E>(&self, extractor: &E, data: &[I]) -> MulticlassStats
    where
        I: Labeled,
        E: FeatureExtractor<I>,
    {
        let mut stats = MulticlassStats::default();
        for inst in data {
            for pos in 0..inst.num_positions() {
                let x = extractor.feature_vector(inst, pos);
                stats.add(class_of(self.bins.as_ref(), inst.gold(pos)), self.classify(&x));
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
    /// 内容が壊れている場合や、二値分類器が保存されていた場合、[`CellpruneError`] が返されます。
    pub fn read<R>(rdr: R) -> Result<Self>
    where
        R: Read,
    {
        match Classifier::read(rdr)? {
            Classifier::Multiclass(c) => Ok(c),
            Classifier::Binary(_) => Err(CellpruneError::invalid_argument(
                "rdr",
                "the input is a binary classifier",
            )),
        }
    }

    /// 重みをテキスト形式で書き出します。
    pub fn export<W>(&self, wtr: W) -> Result<()>
    where
        W: Write,
    {
        self.parts().export(wtr)
    }
}
