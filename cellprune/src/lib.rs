//! # cellprune
//!
//! cellpruneは、構文解析の高速化のための2つの学習エンジンを提供します。
//!
//! ## 概要
//!
//! - **文法の導出**: 木構造コーパスから規則の出現回数を数え、最尤推定による確率文脈自由文法（PCFG）を構築します
//! - **左分解**: 任意のアリティの規則を二分岐の規則に変換します
//! - **平均化パーセプトロン**: 遅延平均化による多クラス・二値分類器の学習
//! - **コンパクトモデル**: 推論時にキャッシュ効率のよい並列配列表現
//! - **分類器の学習ループ**: 品詞タグ付けやチャートセルの枝刈りのための反復学習、評価、バイアス探索
//!
//! ## 使用例
//!
//! ```
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! use cellprune::grammar::InducedGrammar;
//!
//! let treebank = "(TOP (S (NP (NNP Wnnp)) (VP (VBZ Wvbz))))\n";
//! let grammar = InducedGrammar::from_reader(treebank.as_bytes(), "TOP")?;
//!
//! assert_eq!(1.0, grammar.unary_probability("TOP", "S"));
//! assert_eq!(1.0, grammar.binary_probability("S", "NP", "VP"));
//! assert_eq!(vec!["S"], grammar.binary_production_categories("NP", "VP"));
//! # Ok(())
//! # }
//! ```

#[cfg(not(any(target_pointer_width = "32", target_pointer_width = "64")))]
compile_error!("`target_pointer_width` must be 32 or 64");

/// 分類器の学習と評価
pub mod classifier;

/// エラー型の定義
pub mod errors;

/// 文法の導出と左分解
pub mod grammar;

/// 平均化パーセプトロンとコンパクトモデル
pub mod perceptron;

/// 記号表
pub mod symbol;

/// 括弧表記の木構造
pub mod tree;

/// 内部ユーティリティ関数
pub mod utils;

mod persist;

#[cfg(test)]
mod tests;

// Re-exports
pub use classifier::{BinaryClassifier, Classifier, MulticlassClassifier};
pub use grammar::{FactoredGrammar, InducedGrammar};
pub use perceptron::{AveragedPerceptron, CompactModel, FeatureVector};
pub use tree::Tree;

/// このライブラリのバージョン番号
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
