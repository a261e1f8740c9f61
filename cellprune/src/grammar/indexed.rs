//! 集計済みの出現回数から導出される索引付き文法。

use hashbrown::HashMap;

use crate::grammar::{Grammar, NIL_PROBABILITY, OccurrenceCounter};
use crate::utils::{BitVector, FromU32};

const EMPTY: &[u32] = &[];

/// 問い合わせ専用の索引付き文法。
///
/// [`IndexedGrammar::new()`] は出現回数表だけに依存する純粋な関数であり、
/// 同じ出現回数表から2回構築すれば同一の表が得られます。
/// 構築後に出現回数を追加することはできません。
#[derive(Clone, Debug, PartialEq)]
pub struct IndexedGrammar {
    counts: OccurrenceCounter,

    categories: Vec<u32>,
    productions: Vec<u32>,
    totals: Vec<u64>,

    // Indexed by category id.
    unary_log_probs: Vec<HashMap<u32, f32>>,
    binary_log_probs: Vec<HashMap<(u32, u32), f32>>,

    valid_unary: BitVector,
    valid_first: BitVector,
    valid_second: BitVector,

    // Indexed by production id.
    possible_categories: Vec<Vec<u32>>,
    second_by_first: Vec<Vec<u32>>,

    binary_categories: HashMap<(u32, u32), Vec<u32>>,
    top_categories: HashMap<(u32, u32), Vec<u32>>,

    first_productions: Vec<u32>,
    second_productions: Vec<u32>,
}

fn sort_dedup(v: &mut Vec<u32>) {
    v.sort_unstable();
    v.dedup();
}

#[inline]
fn log_probability(count: u64, total: u64) -> f32 {
    (count as f32 / total as f32).ln()
}

impl IndexedGrammar {
    /// 出現回数表からすべての派生表を構築します。
    ///
    /// 1. カテゴリごとの総出現回数
    /// 2. 単項規則の対数確率と単項妥当性ビットマップ
    /// 3. 二項規則の対数確率と第1・第2要素の妥当性ビットマップ
    /// 4. 生成記号から、それを第1要素とするカテゴリへの逆引き表
    /// 5. 二項の組からカテゴリへの逆引き表と、開始記号の単項子に限定した表
    /// 6. 第1要素・第2要素として現れる生成記号の一覧
    pub fn new(counts: OccurrenceCounter) -> Self {
        let num_symbols = counts.num_symbols();

        let categories: Vec<u32> = counts.categories().collect();
        let productions: Vec<u32> = (0..num_symbols).map(|i| i as u32).collect();

        let mut totals = vec![0; num_symbols];
        for &c in &categories {
            totals[usize::from_u32(c)] = counts.category_total(c);
        }

        let mut unary_log_probs = vec![HashMap::new(); num_symbols];
        let mut binary_log_probs = vec![HashMap::new(); num_symbols];
        let mut valid_unary = BitVector::with_len(num_symbols);
        let mut valid_first = BitVector::with_len(num_symbols);
        let mut valid_second = BitVector::with_len(num_symbols);
        let mut possible_categories = vec![vec![]; num_symbols];
        let mut second_by_first = vec![vec![]; num_symbols];
        let mut binary_categories: HashMap<(u32, u32), Vec<u32>> = HashMap::new();
        let mut first_productions = vec![];
        let mut second_productions = vec![];

        for (c, p, n) in counts.unary_rules() {
            let ci = usize::from_u32(c);
            unary_log_probs[ci].insert(p, log_probability(n, totals[ci]));
            valid_unary.set(usize::from_u32(p));
            possible_categories[usize::from_u32(p)].push(c);
            first_productions.push(p);
        }

        for (c, p1, p2, n) in counts.binary_rules() {
            let ci = usize::from_u32(c);
            binary_log_probs[ci].insert((p1, p2), log_probability(n, totals[ci]));
            valid_first.set(usize::from_u32(p1));
            valid_second.set(usize::from_u32(p2));
            possible_categories[usize::from_u32(p1)].push(c);
            second_by_first[usize::from_u32(p1)].push(p2);
            binary_categories.entry((p1, p2)).or_default().push(c);
            first_productions.push(p1);
            second_productions.push(p2);
        }

        possible_categories.iter_mut().for_each(sort_dedup);
        second_by_first.iter_mut().for_each(sort_dedup);
        binary_categories.values_mut().for_each(sort_dedup);
        sort_dedup(&mut first_productions);
        sort_dedup(&mut second_productions);

        let start = counts.start_category();
        let mut top_categories = HashMap::new();
        for (&pair, cats) in &binary_categories {
            let valid: Vec<u32> = cats
                .iter()
                .copied()
                .filter(|&c| counts.unary_count(start, c) != 0)
                .collect();
            if !valid.is_empty() {
                top_categories.insert(pair, valid);
            }
        }

        Self {
            counts,
            categories,
            productions,
            totals,
            unary_log_probs,
            binary_log_probs,
            valid_unary,
            valid_first,
            valid_second,
            possible_categories,
            second_by_first,
            binary_categories,
            top_categories,
            first_productions,
            second_productions,
        }
    }

    /// 索引の元になった出現回数表を返します。
    pub const fn counts(&self) -> &OccurrenceCounter {
        &self.counts
    }

    /// 出現回数表を取り出します。
    pub fn into_counts(self) -> OccurrenceCounter {
        self.counts
    }
}

impl Grammar for IndexedGrammar {
    fn start_category(&self) -> u32 {
        self.counts.start_category()
    }

    fn categories(&self) -> &[u32] {
        &self.categories
    }

    fn productions(&self) -> &[u32] {
        &self.productions
    }

    fn num_rules(&self) -> usize {
        self.counts.num_rules()
    }

    fn category_occurrences(&self, category: u32) -> u64 {
        self.totals
            .get(usize::from_u32(category))
            .copied()
            .unwrap_or(0)
    }

    fn unary_occurrences(&self, category: u32, production: u32) -> u64 {
        self.counts.unary_count(category, production)
    }

    fn binary_occurrences(&self, category: u32, production1: u32, production2: u32) -> u64 {
        self.counts.binary_count(category, production1, production2)
    }

    fn unary_log_probability(&self, category: u32, production: u32) -> f32 {
        self.unary_log_probs
            .get(usize::from_u32(category))
            .and_then(|hm| hm.get(&production))
            .copied()
            .unwrap_or(NIL_PROBABILITY)
    }

    fn binary_log_probability(&self, category: u32, production1: u32, production2: u32) -> f32 {
        self.binary_log_probs
            .get(usize::from_u32(category))
            .and_then(|hm| hm.get(&(production1, production2)))
            .copied()
            .unwrap_or(NIL_PROBABILITY)
    }

    fn first_productions(&self) -> &[u32] {
        &self.first_productions
    }

    fn second_productions(&self) -> &[u32] {
        &self.second_productions
    }

    fn possible_categories(&self, production1: u32) -> &[u32] {
        self.possible_categories
            .get(usize::from_u32(production1))
            .map_or(EMPTY, Vec::as_slice)
    }

    fn binary_production_categories(&self, production1: u32, production2: u32) -> &[u32] {
        self.binary_categories
            .get(&(production1, production2))
            .map_or(EMPTY, Vec::as_slice)
    }

    fn valid_top_categories(&self, production1: u32, production2: u32) -> &[u32] {
        self.top_categories
            .get(&(production1, production2))
            .map_or(EMPTY, Vec::as_slice)
    }

    fn valid_second_productions(&self, production1: u32) -> &[u32] {
        self.second_by_first
            .get(usize::from_u32(production1))
            .map_or(EMPTY, Vec::as_slice)
    }

    fn valid_unary_production(&self, production: u32) -> bool {
        self.valid_unary.get(usize::from_u32(production))
    }

    fn valid_first_production(&self, production: u32) -> bool {
        self.valid_first.get(usize::from_u32(production))
    }

    fn valid_second_production(&self, production: u32) -> bool {
        self.valid_second.get(usize::from_u32(production))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::grammar::to_probability;

    // 0: TOP, 1: S, 2: NP, 3: VP, 4: w1, 5: w2
    fn toy_counts() -> OccurrenceCounter {
        let mut counter = OccurrenceCounter::new(0);
        counter.increment_unary(0, 1, 3);
        counter.increment_unary(0, 2, 1);
        counter.increment_binary(1, 2, 3, 3);
        counter.increment_binary(2, 2, 3, 1);
        counter.increment_unary(2, 4, 3);
        counter.increment_unary(3, 5, 4);
        counter
    }

    #[test]
    fn test_log_probabilities() {
        let grammar = IndexedGrammar::new(toy_counts());

        assert_eq!(4, grammar.category_occurrences(0));
        assert_eq!(4, grammar.category_occurrences(2));
        assert!((grammar.unary_probability(0, 1) - 0.75).abs() < 1e-6);
        assert!((grammar.unary_log_probability(0, 2) - 0.25f32.ln()).abs() < 1e-6);
        assert!((grammar.binary_probability(1, 2, 3) - 1.0).abs() < 1e-6);
        assert!((grammar.binary_probability(2, 2, 3) - 0.25).abs() < 1e-6);

        assert_eq!(NIL_PROBABILITY, grammar.unary_log_probability(1, 4));
        assert_eq!(0.0, grammar.unary_probability(1, 4));
        assert_eq!(NIL_PROBABILITY, grammar.binary_log_probability(3, 2, 3));
        assert_eq!(NIL_PROBABILITY, grammar.unary_log_probability(99, 4));
        assert_eq!(0.0, to_probability(grammar.binary_log_probability(99, 0, 0)));
    }

    #[test]
    fn test_bitmaps_and_reverse_indices() {
        let grammar = IndexedGrammar::new(toy_counts());

        assert!(grammar.valid_unary_production(1));
        assert!(grammar.valid_unary_production(4));
        assert!(!grammar.valid_unary_production(3));
        assert!(grammar.valid_first_production(2));
        assert!(!grammar.valid_first_production(3));
        assert!(grammar.valid_second_production(3));
        assert!(!grammar.valid_second_production(2));

        assert_eq!(&[0, 1, 2], grammar.possible_categories(2));
        assert_eq!(&[2], grammar.possible_categories(4));
        assert!(grammar.possible_categories(3).is_empty());

        assert_eq!(&[1, 2], grammar.binary_production_categories(2, 3));
        assert_eq!(&[1, 2], grammar.valid_top_categories(2, 3));
        assert!(grammar.binary_production_categories(3, 2).is_empty());
        assert_eq!(&[3], grammar.valid_second_productions(2));

        assert_eq!(&[1, 2, 4, 5], grammar.first_productions());
        assert_eq!(&[3], grammar.second_productions());
        assert_eq!(&[0, 1, 2, 3], grammar.categories());
        assert_eq!(6, grammar.productions().len());
    }

    #[test]
    fn test_top_categories_are_filtered() {
        let mut counter = toy_counts();
        // 6: X is produced from (NP, VP) but never directly below TOP.
        counter.increment_binary(6, 2, 3, 1);
        let grammar = IndexedGrammar::new(counter);

        assert_eq!(&[1, 2, 6], grammar.binary_production_categories(2, 3));
        assert_eq!(&[1, 2], grammar.valid_top_categories(2, 3));
    }

    #[test]
    fn test_index_is_idempotent() {
        let counts = toy_counts();
        let a = IndexedGrammar::new(counts.clone());
        let b = IndexedGrammar::new(counts);
        assert_eq!(a, b);

        let c = IndexedGrammar::new(a.counts().clone());
        assert_eq!(a, c);
    }
}
