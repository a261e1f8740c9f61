//! 平均化パーセプトロンによる二値・多クラス分類のためのモジュール。
//!
//! # 概要
//!
//! - [`NumericVector`]: 長さに応じて密・疎の表現を選ぶ数値ベクトル
//! - [`FeatureVector`]: 入力となる疎な素性ベクトル
//! - [`AveragedPerceptron`]: 遅延平均化を行う学習器
//! - [`CompactModel`]: 推論用に素性ごとに重みを詰めたモデル
//! - [`PerceptronExport`]: モデルのテキスト形式での入出力
//!
//! # 使用例
//!
//! ```
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! use cellprune::perceptron::{AveragedPerceptron, FeatureVector};
//!
//! let positive = FeatureVector::from_indices(3, vec![0, 1])?;
//! let negative = FeatureVector::from_indices(3, vec![0, 2])?;
//!
//! let mut perceptron = AveragedPerceptron::binary(1.0);
//! for _ in 0..5 {
//!     perceptron.train(1, &positive)?;
//!     perceptron.train(0, &negative)?;
//! }
//!
//! let model = perceptron.finalize();
//! assert_eq!(1, model.classify(&positive));
//! assert_eq!(0, model.classify(&negative));
//! # Ok(())
//! # }
//! ```

mod averaged;
mod bins;
mod compact;
mod export;
mod loss;
mod vector;

pub use crate::perceptron::averaged::AveragedPerceptron;
pub use crate::perceptron::bins::Bins;
pub use crate::perceptron::compact::CompactModel;
pub(crate) use crate::perceptron::compact::CompactModelData;
pub use crate::perceptron::export::PerceptronExport;
pub use crate::perceptron::loss::{DifferenceLoss, LossFunction, OverUnderLoss, ZeroOneLoss};
pub use crate::perceptron::vector::{DENSE_VECTOR_LIMIT, FeatureVector, NumericVector, Scalar};
