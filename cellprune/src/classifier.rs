//! 平均化パーセプトロンによる分類器の学習と評価のためのモジュール。
//!
//! 品詞タグ付けやチャートセルの枝刈り（ビーム幅の予測、完全閉包の予測）に使う
//! 分類器を学習します。素性抽出は [`FeatureExtractor`] を通じて外部から与えます。
//!
//! # 概要
//!
//! - [`MulticlassTrainer`] / [`BinaryTrainer`]: 反復学習、開発データでの評価、バイアス探索
//! - [`MulticlassClassifier`] / [`BinaryClassifier`]: 学習済み分類器
//! - [`FeatureCorpus`]: 素性抽出済みのコーパス
//!
//! # 使用例
//!
//! ```
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! use cellprune::classifier::{FeatureCorpus, MulticlassTrainer};
//!
//! let corpus_data = "0\t0 1\n1\t0 2\nEOS\n2\t0 3\n0\t0 1\nEOS\n";
//! let corpus = FeatureCorpus::from_reader(corpus_data.as_bytes())?;
//!
//! let classifier = MulticlassTrainer::new(corpus.extractor())
//!     .iterations(5)
//!     .train(corpus.sentences(), &[])?;
//!
//! let stats = classifier.evaluate(&corpus.extractor(), corpus.sentences());
//! assert_eq!(1.0, stats.accuracy());
//! # Ok(())
//! # }
//! ```

mod bias;
mod binary;
mod corpus;
mod multiclass;
mod stats;

use std::io::{Read, Write};

use rkyv::{Archive, Deserialize, Serialize};

use crate::errors::{CellpruneError, Result};
use crate::perceptron::{Bins, CompactModel, CompactModelData, FeatureVector, PerceptronExport};
use crate::persist;

pub use crate::classifier::bias::{BIAS_DELTA, BiasSearch, BiasTarget, MAX_BIAS_STEPS, bias_search};
pub use crate::classifier::binary::{BinaryClassifier, BinaryTrainer};
pub use crate::classifier::corpus::{CorpusExtractor, FeatureCorpus, FeatureSentence};
pub use crate::classifier::multiclass::{MulticlassClassifier, MulticlassTrainer};
pub use crate::classifier::stats::{BinaryStats, MulticlassStats};

/// 分類器ファイルを識別するマジックバイト。
pub const CLASSIFIER_MAGIC: &[u8] = b"CellpruneClassifierRkyv 0.1\n";

/// 学習・評価の単位（文など）から位置ごとの素性ベクトルを取り出す素性抽出器。
pub trait FeatureExtractor<I>
where
    I: ?Sized,
{
    /// 素性空間の大きさを返します。
    fn vector_length(&self) -> usize;

    /// 1つの位置で有効になる素性の最大数を返します。
    ///
    /// バイアス探索の区間を決めるのに使われます。
    fn template_count(&self) -> usize;

    /// 素性テンプレートの記述を返します。モデルと一緒に保存されます。
    fn template(&self) -> &str;

    /// `instance` の `position` 番目の位置の素性ベクトルを返します。
    fn feature_vector(&self, instance: &I, position: usize) -> FeatureVector;
}

/// 位置ごとの正解を持つ学習・評価の単位。
pub trait Labeled {
    /// 分類する位置の数を返します。
    fn num_positions(&self) -> usize;

    /// `position` 番目の位置の正解値を返します。
    ///
    /// 多クラス分類ではクラス番号、またはビンで離散化する前の値です。
    /// 二値分類では 0 以外が正例です。
    fn gold(&self, position: usize) -> u32;
}

#[derive(Archive, Serialize, Deserialize)]
struct ClassifierData {
    binary: bool,
    model: CompactModelData,
    bins: Option<Vec<u32>>,
    bias: f32,
    template: String,
    num_train_examples: u64,
}

/// 種類を問わない学習済み分類器。
///
/// ファイルに保存された分類器の種類が分からない場合に使用します。
#[derive(Clone, Debug, PartialEq)]
pub enum Classifier {
    /// 二値分類器
    Binary(BinaryClassifier),
    /// 多クラス分類器
    Multiclass(MulticlassClassifier),
}

impl Classifier {
    /// [`BinaryClassifier::write()`] または [`MulticlassClassifier::write()`] で
    /// 書き込まれた分類器を読み込みます。
    ///
    /// # エラー
    ///
    /// マジックバイトが一致しない場合や内容が壊れている場合、[`CellpruneError`] が返されます。
    pub fn read<R>(rdr: R) -> Result<Self>
    where
        R: Read,
    {
        let data: ClassifierData = persist::read_archive(rdr, CLASSIFIER_MAGIC)?;
        let model = CompactModel::from_data(data.model)?;
        if model.is_binary() != data.binary {
            return Err(CellpruneError::invalid_format(
                "model",
                "the classifier kind does not match its weight vectors",
            ));
        }
        let bins = data.bins.map(Bins::new).transpose()?;

        Ok(if data.binary {
            Self::Binary(BinaryClassifier::from_parts(
                model,
                data.bias,
                data.template,
                data.num_train_examples,
            ))
        } else {
            Self::Multiclass(MulticlassClassifier::from_parts(
                model,
                bins,
                data.template,
                data.num_train_examples,
            ))
        })
    }

    /// 推論用のモデルを返します。
    pub fn model(&self) -> &CompactModel {
        match self {
            Self::Binary(c) => c.model(),
            Self::Multiclass(c) => c.model(),
        }
    }
}

struct ClassifierParts<'a> {
    model: &'a CompactModel,
    bins: Option<&'a Bins>,
    bias: Option<f32>,
    template: &'a str,
    num_train_examples: u64,
}

impl ClassifierParts<'_> {
    fn write<W>(&self, wtr: W) -> Result<()>
    where
        W: Write,
    {
        let data = ClassifierData {
            binary: self.model.is_binary(),
            model: self.model.to_data()?,
            bins: self.bins.map(|b| b.boundaries().to_vec()),
            bias: self.bias.unwrap_or(0.0),
            template: self.template.to_string(),
            num_train_examples: self.num_train_examples,
        };
        persist::write_archive(wtr, CLASSIFIER_MAGIC, &data)
    }

    fn export<W>(&self, wtr: W) -> Result<()>
    where
        W: Write,
    {
        PerceptronExport {
            num_features: self.model.vector_length(),
            num_classes: self.model.num_classes(),
            bins: self.bins.cloned(),
            num_train_examples: self.num_train_examples,
            bias: self.bias,
            template: self.template.to_string(),
            vectors: self.model.class_vectors(),
        }
        .write(wtr)
    }
}
