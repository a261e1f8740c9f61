//! 二値分類器の判定バイアスの探索。

use crate::classifier::BinaryStats;

/// 探索区間がこの幅より狭くなったら探索を終了します。
pub const BIAS_DELTA: f32 = 1e-4;

/// 探索の最大ステップ数
pub const MAX_BIAS_STEPS: usize = 64;

/// バイアス探索の目標。
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum BiasTarget {
    /// 開発データ上の適合率
    Precision(f32),
    /// 開発データ上の負例の再現率
    NegativeRecall(f32),
}

impl BiasTarget {
    /// 目標値を返します。
    pub const fn value(&self) -> f32 {
        match *self {
            Self::Precision(v) | Self::NegativeRecall(v) => v,
        }
    }

    /// 統計から目標の指標を取り出します。
    pub fn metric(&self, stats: &BinaryStats) -> f32 {
        match self {
            Self::Precision(_) => stats.precision() as f32,
            Self::NegativeRecall(_) => stats.negative_recall() as f32,
        }
    }

    /// 目標値とみなす許容幅 `(1 - 目標値) / 20` を返します。
    pub fn epsilon(&self) -> f32 {
        (1.0 - self.value()) / 20.0
    }
}

/// バイアス探索の結果。
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BiasSearch {
    /// 選ばれたバイアス
    pub bias: f32,
    /// そのバイアスでの指標
    pub metric: f32,
    /// 指標を評価した回数
    pub steps: usize,
}

/// 指標が目標を満たす最大のバイアスを二分探索します。
///
/// 判定は `score + bias > 0` で行われるため、バイアスを大きくするほど正例が増え、
/// 適合率と負例の再現率は下がります。
/// 中点の指標が目標以上なら区間の下端を、目標未満なら上端を中点に移します。
/// 指標が目標から許容幅 [`BiasTarget::epsilon()`] 以内に入るか、区間幅が [`BIAS_DELTA`] を下回るか、
/// [`MAX_BIAS_STEPS`] 回評価したところで終了します。
///
/// 目標を満たすバイアスが見つからなかった場合は、区間の下端を返します。
///
/// # 引数
///
/// * `lo`, `hi` - 探索区間
/// * `target` - 目標
/// * `metric_at` - バイアスを受け取り、そのときの指標を返す関数
pub fn bias_search<F>(lo: f32, hi: f32, target: BiasTarget, mut metric_at: F) -> BiasSearch
where
    F: FnMut(f32) -> f32,
{
    let goal = target.value();
    let epsilon = target.epsilon();
    let (mut lo, mut hi) = (lo.min(hi), lo.max(hi));
    let mut best = None;
    let mut steps = 0;

    while hi - lo > BIAS_DELTA && steps < MAX_BIAS_STEPS {
        let mid = lo + (hi - lo) / 2.0;
        let metric = metric_at(mid);
        steps += 1;
        log::debug!("bias search step {steps}: bias={mid} metric={metric} range=[{lo}, {hi}]");

        if (metric - goal).abs() <= epsilon {
            best = Some((mid, metric));
            break;
        }
        if metric >= goal {
            best = Some((mid, metric));
            lo = mid;
        } else {
            hi = mid;
        }
    }

    let (bias, metric) = best.unwrap_or_else(|| {
        steps += 1;
        (lo, metric_at(lo))
    });
    BiasSearch {
        bias,
        metric,
        steps,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Metric falls linearly from 1 at bias -10 to 0 at bias 10.
    fn linear(bias: f32) -> f32 {
        ((10.0 - bias) / 20.0).clamp(0.0, 1.0)
    }

    #[test]
    fn test_search_converges_within_epsilon() {
        let target = BiasTarget::Precision(0.8);
        let result = bias_search(-10.0, 10.0, target, linear);

        assert!((result.metric - 0.8).abs() <= target.epsilon());
        assert!((linear(result.bias) - result.metric).abs() < 1e-6);
        assert!(result.steps <= MAX_BIAS_STEPS);
    }

    #[test]
    fn test_strict_target_narrows_interval() {
        let target = BiasTarget::NegativeRecall(1.0);
        let result = bias_search(-10.0, 10.0, target, linear);

        assert_eq!(1.0, result.metric);
        assert!((result.bias + 10.0).abs() < 1e-3);
    }

    #[test]
    fn test_unreachable_target_returns_lower_bound() {
        let result = bias_search(0.0, 10.0, BiasTarget::Precision(0.9), linear);

        assert_eq!(0.0, result.bias);
        assert_eq!(0.5, result.metric);
    }

    #[test]
    fn test_empty_interval() {
        let mut calls = 0;
        let result = bias_search(2.0, 2.0, BiasTarget::Precision(0.5), |_| {
            calls += 1;
            0.25
        });
        assert_eq!(1, calls);
        assert_eq!(1, result.steps);
        assert_eq!(2.0, result.bias);
    }
}
