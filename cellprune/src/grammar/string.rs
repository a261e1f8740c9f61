//! 文字列で問い合わせるための文法ラッパー。

use crate::grammar::{Grammar, NIL_PROBABILITY, to_probability};
use crate::symbol::SymbolSet;

/// 整数IDの文法を記号表と組み合わせ、文字列キーで問い合わせられるようにするラッパー。
///
/// すべてのメソッドは記号表で文字列をIDに変換してから、内部の文法に委譲します。
/// 記号表に存在しない文字列は、未観測の規則として扱われます。
#[derive(Clone, Debug, PartialEq)]
pub struct StringGrammar<G> {
    symbols: SymbolSet,
    grammar: G,
}

impl<G> StringGrammar<G> {
    /// 記号表と文法から新しいラッパーを作成します。
    pub const fn new(symbols: SymbolSet, grammar: G) -> Self {
        Self { symbols, grammar }
    }

    /// 記号表を返します。
    pub const fn symbols(&self) -> &SymbolSet {
        &self.symbols
    }

    /// 内部の整数ID文法を返します。
    pub const fn grammar(&self) -> &G {
        &self.grammar
    }

    /// 記号表と内部の文法に分解します。
    pub fn into_parts(self) -> (SymbolSet, G) {
        (self.symbols, self.grammar)
    }
}

impl<G> StringGrammar<G>
where
    G: Grammar,
{
    fn names(&self, ids: &[u32]) -> Vec<&str> {
        ids.iter().filter_map(|&id| self.symbols.symbol(id)).collect()
    }

    fn id(&self, symbol: &str) -> Option<u32> {
        self.symbols.index(symbol)
    }

    /// 開始記号を返します。
    pub fn start_category(&self) -> &str {
        self.symbols
            .symbol(self.grammar.start_category())
            .unwrap_or_default()
    }

    /// カテゴリの数を返します。
    pub fn num_categories(&self) -> usize {
        self.grammar.categories().len()
    }

    /// 生成記号の数を返します。
    pub fn num_productions(&self) -> usize {
        self.grammar.productions().len()
    }

    /// 異なり規則数を返します。
    pub fn num_rules(&self) -> usize {
        self.grammar.num_rules()
    }

    /// すべてのカテゴリを返します。
    pub fn categories(&self) -> Vec<&str> {
        self.names(self.grammar.categories())
    }

    /// すべての生成記号を返します。
    pub fn productions(&self) -> Vec<&str> {
        self.names(self.grammar.productions())
    }

    /// 規則の第1要素として現れる生成記号を返します。
    pub fn first_productions(&self) -> Vec<&str> {
        self.names(self.grammar.first_productions())
    }

    /// 二項規則の第2要素として現れる生成記号を返します。
    pub fn second_productions(&self) -> Vec<&str> {
        self.names(self.grammar.second_productions())
    }

    /// カテゴリの総出現回数を返します。
    pub fn category_occurrences(&self, category: &str) -> u64 {
        self.id(category)
            .map_or(0, |c| self.grammar.category_occurrences(c))
    }

    /// 単項規則の出現回数を返します。
    pub fn unary_occurrences(&self, category: &str, production: &str) -> u64 {
        match (self.id(category), self.id(production)) {
            (Some(c), Some(p)) => self.grammar.unary_occurrences(c, p),
            _ => 0,
        }
    }

    /// 二項規則の出現回数を返します。
    pub fn binary_occurrences(&self, category: &str, production1: &str, production2: &str) -> u64 {
        match (self.id(category), self.id(production1), self.id(production2)) {
            (Some(c), Some(p1), Some(p2)) => self.grammar.binary_occurrences(c, p1, p2),
            _ => 0,
        }
    }

    /// 単項規則の対数確率を返します。
    pub fn unary_log_probability(&self, category: &str, production: &str) -> f32 {
        match (self.id(category), self.id(production)) {
            (Some(c), Some(p)) => self.grammar.unary_log_probability(c, p),
            _ => NIL_PROBABILITY,
        }
    }

    /// 二項規則の対数確率を返します。
    pub fn binary_log_probability(
        &self,
        category: &str,
        production1: &str,
        production2: &str,
    ) -> f32 {
        match (self.id(category), self.id(production1), self.id(production2)) {
            (Some(c), Some(p1), Some(p2)) => self.grammar.binary_log_probability(c, p1, p2),
            _ => NIL_PROBABILITY,
        }
    }

    /// 単項規則の確率を返します。
    pub fn unary_probability(&self, category: &str, production: &str) -> f32 {
        to_probability(self.unary_log_probability(category, production))
    }

    /// 二項規則の確率を返します。
    pub fn binary_probability(&self, category: &str, production1: &str, production2: &str) -> f32 {
        to_probability(self.binary_log_probability(category, production1, production2))
    }

    /// `production1` を第1要素として生成しうるカテゴリを返します。
    pub fn possible_categories(&self, production1: &str) -> Vec<&str> {
        self.id(production1)
            .map_or_else(Vec::new, |p| self.names(self.grammar.possible_categories(p)))
    }

    /// 二項の組を生成するカテゴリを返します。
    pub fn binary_production_categories(&self, production1: &str, production2: &str) -> Vec<&str> {
        match (self.id(production1), self.id(production2)) {
            (Some(p1), Some(p2)) => self.names(self.grammar.binary_production_categories(p1, p2)),
            _ => vec![],
        }
    }

    /// 二項の組を生成し、かつ開始記号の単項子であるカテゴリを返します。
    pub fn valid_top_categories(&self, production1: &str, production2: &str) -> Vec<&str> {
        match (self.id(production1), self.id(production2)) {
            (Some(p1), Some(p2)) => self.names(self.grammar.valid_top_categories(p1, p2)),
            _ => vec![],
        }
    }

    /// `production1` に続きうる第2要素を返します。
    pub fn valid_second_productions(&self, production1: &str) -> Vec<&str> {
        self.id(production1)
            .map_or_else(Vec::new, |p| self.names(self.grammar.valid_second_productions(p)))
    }

    /// 単項規則の生成記号として現れる場合に `true` を返します。
    pub fn valid_unary_production(&self, production: &str) -> bool {
        self.id(production)
            .is_some_and(|p| self.grammar.valid_unary_production(p))
    }

    /// 二項規則の第1要素として現れる場合に `true` を返します。
    pub fn valid_first_production(&self, production: &str) -> bool {
        self.id(production)
            .is_some_and(|p| self.grammar.valid_first_production(p))
    }

    /// 二項規則の第2要素として現れる場合に `true` を返します。
    pub fn valid_second_production(&self, production: &str) -> bool {
        self.id(production)
            .is_some_and(|p| self.grammar.valid_second_production(p))
    }
}
