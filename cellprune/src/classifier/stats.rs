//! 分類結果の評価統計。

use std::fmt;

/// 多クラス分類の評価統計。
///
/// クラスが順序を持つ場合に備え、過大予測と過小予測を区別して数えます。
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct MulticlassStats {
    /// 評価した位置の数
    pub total: usize,
    /// 正解した数
    pub correct: usize,
    /// 正解より大きいクラスを予測した数
    pub over: usize,
    /// 正解より小さいクラスを予測した数
    pub under: usize,
}

impl MulticlassStats {
    /// 1つの予測結果を加えます。
    pub fn add(&mut self, gold: usize, guess: usize) {
        self.total += 1;
        match guess.cmp(&gold) {
            std::cmp::Ordering::Equal => self.correct += 1,
            std::cmp::Ordering::Greater => self.over += 1,
            std::cmp::Ordering::Less => self.under += 1,
        }
    }

    /// 正解率を返します。
    pub fn accuracy(&self) -> f64 {
        ratio(self.correct, self.total)
    }
}

impl fmt::Display for MulticlassStats {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "accuracy={:.4} ({}/{}) over={} under={}",
            self.accuracy(),
            self.correct,
            self.total,
            self.over,
            self.under
        )
    }
}

/// 二値分類の評価統計（混同行列）。
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct BinaryStats {
    /// 真陽性
    pub true_positives: usize,
    /// 偽陽性
    pub false_positives: usize,
    /// 真陰性
    pub true_negatives: usize,
    /// 偽陰性
    pub false_negatives: usize,
}

fn ratio(numerator: usize, denominator: usize) -> f64 {
    if denominator == 0 {
        0.0
    } else {
        numerator as f64 / denominator as f64
    }
}

impl BinaryStats {
    /// 1つの予測結果を加えます。
    pub fn add(&mut self, gold: bool, guess: bool) {
        match (gold, guess) {
            (true, true) => self.true_positives += 1,
            (false, true) => self.false_positives += 1,
            (false, false) => self.true_negatives += 1,
            (true, false) => self.false_negatives += 1,
        }
    }

    /// 評価した位置の数を返します。
    pub fn total(&self) -> usize {
        self.true_positives + self.false_positives + self.true_negatives + self.false_negatives
    }

    /// 正解率を返します。
    pub fn accuracy(&self) -> f64 {
        ratio(self.true_positives + self.true_negatives, self.total())
    }

    /// 適合率を返します。正例と予測したものがなければ 1 です。
    pub fn precision(&self) -> f64 {
        if self.true_positives + self.false_positives == 0 {
            return 1.0;
        }
        ratio(self.true_positives, self.true_positives + self.false_positives)
    }

    /// 再現率を返します。
    pub fn recall(&self) -> f64 {
        ratio(self.true_positives, self.true_positives + self.false_negatives)
    }

    /// 負例の再現率を返します。負例がなければ 1 です。
    pub fn negative_recall(&self) -> f64 {
        if self.true_negatives + self.false_positives == 0 {
            return 1.0;
        }
        ratio(self.true_negatives, self.true_negatives + self.false_positives)
    }
}

impl fmt::Display for BinaryStats {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "accuracy={:.4} precision={:.4} recall={:.4} negative_recall={:.4} (tp={} fp={} tn={} fn={})",
            self.accuracy(),
            self.precision(),
            self.recall(),
            self.negative_recall(),
            self.true_positives,
            self.false_positives,
            self.true_negatives,
            self.false_negatives
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use approx::assert_relative_eq;

    #[test]
    fn test_multiclass_stats() {
        let mut stats = MulticlassStats::default();
        stats.add(1, 1);
        stats.add(1, 2);
        stats.add(2, 0);
        stats.add(0, 0);

        assert_eq!(4, stats.total);
        assert_eq!(1, stats.over);
        assert_eq!(1, stats.under);
        assert_relative_eq!(0.5, stats.accuracy());
    }

    #[test]
    fn test_binary_stats() {
        let mut stats = BinaryStats::default();
        assert_eq!(1.0, stats.precision());
        assert_eq!(0.0, stats.accuracy());

        stats.add(true, true);
        stats.add(true, false);
        stats.add(false, true);
        stats.add(false, false);
        stats.add(false, false);

        assert_eq!(5, stats.total());
        assert_relative_eq!(0.6, stats.accuracy());
        assert_relative_eq!(0.5, stats.precision());
        assert_relative_eq!(0.5, stats.recall());
        assert_relative_eq!(2.0 / 3.0, stats.negative_recall());
    }
}
