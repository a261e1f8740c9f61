//! 規則の出現回数の集計。

use hashbrown::HashMap;

use crate::utils::{BitVector, FromU32};

/// 単項規則・二項規則の出現回数表。
///
/// コーパスを1回走査する間に逐次的に加算されます。
/// 回数は単調増加であり、減算されることはありません。
/// カテゴリごとの記憶域は、新しいIDが現れるたびに拡張されます。
#[derive(Clone, Debug, Default, PartialEq)]
pub struct OccurrenceCounter {
    start: u32,
    num_symbols: usize,
    categories: BitVector,

    // Indexed by category id.
    unary: Vec<HashMap<u32, u64>>,
    binary: Vec<HashMap<u32, HashMap<u32, u64>>>,

    num_rules: usize,
}

impl OccurrenceCounter {
    /// 開始記号 `start` を登録した空の集計表を作成します。
    pub fn new(start: u32) -> Self {
        let mut counter = Self {
            start,
            ..Self::default()
        };
        counter.register_category(start);
        counter
    }

    /// 生成記号のID空間に `production` を登録します。
    pub fn register_production(&mut self, production: u32) {
        self.num_symbols = self.num_symbols.max(usize::from_u32(production) + 1);
    }

    /// `category` をカテゴリとして登録し、カテゴリごとの記憶域を拡張します。
    pub fn register_category(&mut self, category: u32) {
        self.register_production(category);
        let idx = usize::from_u32(category);
        if self.unary.len() <= idx {
            self.unary.resize_with(idx + 1, HashMap::new);
            self.binary.resize_with(idx + 1, HashMap::new);
        }
        self.categories.set(idx);
    }

    /// 単項規則 `category -> production` の出現回数に `weight` を加算します。
    pub fn increment_unary(&mut self, category: u32, production: u32, weight: u64) {
        self.register_category(category);
        self.register_production(production);
        let count = self.unary[usize::from_u32(category)]
            .entry(production)
            .or_insert(0);
        if *count == 0 && weight != 0 {
            self.num_rules += 1;
        }
        *count += weight;
    }

    /// 二項規則 `category -> production1 production2` の出現回数に `weight` を加算します。
    pub fn increment_binary(
        &mut self,
        category: u32,
        production1: u32,
        production2: u32,
        weight: u64,
    ) {
        self.register_category(category);
        self.register_production(production1);
        self.register_production(production2);
        let count = self.binary[usize::from_u32(category)]
            .entry(production1)
            .or_default()
            .entry(production2)
            .or_insert(0);
        if *count == 0 && weight != 0 {
            self.num_rules += 1;
        }
        *count += weight;
    }

    /// 開始記号のIDを返します。
    pub const fn start_category(&self) -> u32 {
        self.start
    }

    /// 生成記号ID空間の大きさを返します。
    pub const fn num_symbols(&self) -> usize {
        self.num_symbols
    }

    /// 異なり規則数を返します。
    pub const fn num_rules(&self) -> usize {
        self.num_rules
    }

    /// `id` がカテゴリとして登録されていれば `true` を返します。
    pub fn is_category(&self, id: u32) -> bool {
        self.categories.get(usize::from_u32(id))
    }

    /// 登録済みのカテゴリIDを昇順に列挙します。
    pub fn categories(&self) -> impl Iterator<Item = u32> + '_ {
        // Every index came from a u32 id.
        self.categories.ones().map(|i| i as u32)
    }

    /// 単項規則の出現回数を返します。
    pub fn unary_count(&self, category: u32, production: u32) -> u64 {
        self.unary
            .get(usize::from_u32(category))
            .and_then(|hm| hm.get(&production))
            .copied()
            .unwrap_or(0)
    }

    /// 二項規則の出現回数を返します。
    pub fn binary_count(&self, category: u32, production1: u32, production2: u32) -> u64 {
        self.binary
            .get(usize::from_u32(category))
            .and_then(|hm| hm.get(&production1))
            .and_then(|hm| hm.get(&production2))
            .copied()
            .unwrap_or(0)
    }

    /// カテゴリを左辺とする全規則の出現回数の合計を返します。
    pub fn category_total(&self, category: u32) -> u64 {
        let idx = usize::from_u32(category);
        let unary: u64 = self.unary.get(idx).map_or(0, |hm| hm.values().sum());
        let binary: u64 = self
            .binary
            .get(idx)
            .map_or(0, |hm| hm.values().flat_map(HashMap::values).sum());
        unary + binary
    }

    /// 出現回数が正の単項規則を `(category, production, count)` として列挙します。
    pub fn unary_rules(&self) -> impl Iterator<Item = (u32, u32, u64)> + '_ {
        self.unary.iter().enumerate().flat_map(|(c, hm)| {
            hm.iter()
                .filter(|&(_, &n)| n != 0)
                .map(move |(&p, &n)| (c as u32, p, n))
        })
    }

    /// 出現回数が正の二項規則を `(category, production1, production2, count)` として列挙します。
    pub fn binary_rules(&self) -> impl Iterator<Item = (u32, u32, u32, u64)> + '_ {
        self.binary.iter().enumerate().flat_map(|(c, hm)| {
            hm.iter().flat_map(move |(&p1, hm2)| {
                hm2.iter()
                    .filter(|&(_, &n)| n != 0)
                    .map(move |(&p2, &n)| (c as u32, p1, p2, n))
            })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_increment() {
        let mut counter = OccurrenceCounter::new(0);
        counter.increment_unary(1, 2, 1);
        counter.increment_unary(1, 2, 2);
        counter.increment_binary(1, 3, 4, 1);
        counter.increment_binary(5, 3, 4, 1);

        assert_eq!(3, counter.num_rules());
        assert_eq!(3, counter.unary_count(1, 2));
        assert_eq!(1, counter.binary_count(1, 3, 4));
        assert_eq!(0, counter.binary_count(1, 4, 3));
        assert_eq!(0, counter.unary_count(9, 9));
        assert_eq!(4, counter.category_total(1));
        assert_eq!(6, counter.num_symbols());
        assert_eq!(vec![0, 1, 5], counter.categories().collect::<Vec<_>>());
        assert!(!counter.is_category(2));
    }

    #[test]
    fn test_zero_weight_registers_without_rule() {
        let mut counter = OccurrenceCounter::new(0);
        counter.increment_unary(1, 2, 0);

        assert_eq!(0, counter.num_rules());
        assert!(counter.is_category(1));
        assert_eq!(0, counter.unary_rules().count());

        counter.increment_unary(1, 2, 1);
        assert_eq!(1, counter.num_rules());
    }
}
