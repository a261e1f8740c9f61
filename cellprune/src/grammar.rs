//! 確率文脈自由文法（PCFG）の導出と索引付けのためのモジュール。
//!
//! 木構造コーパスを1回走査して規則の出現回数を数え、最尤推定による規則確率と
//! 構文解析器が参照する各種の逆引き表を構築します。
//!
//! # 概要
//!
//! - [`OccurrenceCounter`]: 単項規則・二項規則の出現回数を逐次的に集計します
//! - [`IndexedGrammar`]: 集計結果から対数確率表、妥当性ビットマップ、逆引き表を導出します
//! - [`StringGrammar`]: 整数IDの文法を記号表で包み、文字列で問い合わせられるようにします
//! - [`InducedGrammar`]: コーパスから導出された文法
//! - [`FactoredGrammar`]: 左分解により二分化された文法
//!
//! # 使用例
//!
//! ```
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! use cellprune::grammar::InducedGrammar;
//!
//! let treebank = "(TOP (NP (NNP Wnnp) (NNP Wnnp) (NNPS Wnnps)))\n";
//! let grammar = InducedGrammar::from_reader(treebank.as_bytes(), "TOP")?;
//! assert_eq!(1, grammar.unary_occurrences("TOP", "NP"));
//!
//! let factored = grammar.left_factor()?;
//! assert_eq!(1, factored.binary_occurrences("NP", "NNP", "NP-NNP"));
//! assert_eq!(1, factored.binary_occurrences("NP-NNP", "NNP", "NNPS"));
//! # Ok(())
//! # }
//! ```

mod counter;
mod factor;
mod indexed;
mod induced;
mod string;

pub use crate::grammar::counter::OccurrenceCounter;
pub use crate::grammar::factor::FactoredGrammar;
pub use crate::grammar::indexed::IndexedGrammar;
pub use crate::grammar::induced::InducedGrammar;
pub use crate::grammar::string::StringGrammar;

/// 一度も観測されなかった規則の対数確率。
///
/// 「観測されなかった」ことを表す番兵値であり、確率 0 に対応します。
/// 比較は完全一致で行ってください。
pub const NIL_PROBABILITY: f32 = f32::NEG_INFINITY;

/// 対数確率を確率に変換します。
///
/// [`NIL_PROBABILITY`] は `exp()` を通さずに、ちょうど `0.0` に対応付けます。
#[inline]
pub fn to_probability(log_probability: f32) -> f32 {
    if log_probability == NIL_PROBABILITY {
        0.0
    } else {
        log_probability.exp()
    }
}

/// 整数IDで問い合わせる文法のインターフェース。
///
/// カテゴリ（非終端記号）と生成記号は同じID空間に属します。
/// すべてのカテゴリは生成記号でもあります。
/// 列挙系のメソッドが返す順序に意味はありません。集合として扱ってください。
pub trait Grammar {
    /// 開始記号のカテゴリIDを返します。
    fn start_category(&self) -> u32;

    /// すべてのカテゴリIDを返します。
    fn categories(&self) -> &[u32];

    /// すべての生成記号IDを返します。
    fn productions(&self) -> &[u32];

    /// 異なり規則数を返します。
    fn num_rules(&self) -> usize;

    /// カテゴリの総出現回数（単項規則と二項規則の合計）を返します。
    fn category_occurrences(&self, category: u32) -> u64;

    /// 単項規則 `category -> production` の出現回数を返します。
    fn unary_occurrences(&self, category: u32, production: u32) -> u64;

    /// 二項規則 `category -> production1 production2` の出現回数を返します。
    fn binary_occurrences(&self, category: u32, production1: u32, production2: u32) -> u64;

    /// 単項規則の対数確率を返します。未観測の場合は [`NIL_PROBABILITY`] です。
    fn unary_log_probability(&self, category: u32, production: u32) -> f32;

    /// 二項規則の対数確率を返します。未観測の場合は [`NIL_PROBABILITY`] です。
    fn binary_log_probability(&self, category: u32, production1: u32, production2: u32) -> f32;

    /// 単項規則の確率を返します。
    fn unary_probability(&self, category: u32, production: u32) -> f32 {
        to_probability(self.unary_log_probability(category, production))
    }

    /// 二項規則の確率を返します。
    fn binary_probability(&self, category: u32, production1: u32, production2: u32) -> f32 {
        to_probability(self.binary_log_probability(category, production1, production2))
    }

    /// いずれかの規則の第1要素（単項規則の生成記号を含む）として現れる生成記号を返します。
    fn first_productions(&self) -> &[u32];

    /// いずれかの二項規則の第2要素として現れる生成記号を返します。
    fn second_productions(&self) -> &[u32];

    /// `production1` を単項規則または二項規則の第1要素として生成するカテゴリを返します。
    fn possible_categories(&self, production1: u32) -> &[u32];

    /// 二項規則 `? -> production1 production2` の左辺となるカテゴリを返します。
    fn binary_production_categories(&self, production1: u32, production2: u32) -> &[u32];

    /// [`binary_production_categories()`](Self::binary_production_categories) のうち、
    /// 開始記号から単項規則で生成できるカテゴリだけを返します。
    fn valid_top_categories(&self, production1: u32, production2: u32) -> &[u32];

    /// `production1` を第1要素とする二項規則の第2要素を返します。
    fn valid_second_productions(&self, production1: u32) -> &[u32];

    /// 単項規則の生成記号として現れる場合に `true` を返します。
    fn valid_unary_production(&self, production: u32) -> bool;

    /// 二項規則の第1要素として現れる場合に `true` を返します。
    fn valid_first_production(&self, production: u32) -> bool;

    /// 二項規則の第2要素として現れる場合に `true` を返します。
    fn valid_second_production(&self, production: u32) -> bool;
}
