//! 誤分類時の損失関数。

use std::fmt::Debug;

/// 正解クラスと予測クラスから損失を計算する関数。
///
/// 損失は更新幅（学習率との積）として使われます。
/// 正解と予測が一致する場合に呼ばれることはありません。
pub trait LossFunction: Debug {
    /// 損失を返します。
    fn loss(&self, gold: usize, guess: usize) -> f32;
}

impl<L> LossFunction for Box<L>
where
    L: LossFunction + ?Sized,
{
    fn loss(&self, gold: usize, guess: usize) -> f32 {
        (**self).loss(gold, guess)
    }
}

/// 誤分類に一律 1 の損失を与えます。
#[derive(Clone, Copy, Debug, Default)]
pub struct ZeroOneLoss;

impl LossFunction for ZeroOneLoss {
    fn loss(&self, gold: usize, guess: usize) -> f32 {
        if gold == guess { 0.0 } else { 1.0 }
    }
}

/// クラス番号の差の絶対値を損失とします。
///
/// クラスが順序を持つ（ビーム幅のビンなど）場合に使用します。
#[derive(Clone, Copy, Debug, Default)]
pub struct DifferenceLoss;

impl LossFunction for DifferenceLoss {
    fn loss(&self, gold: usize, guess: usize) -> f32 {
        gold.abs_diff(guess) as f32
    }
}

/// 過大予測と過小予測に異なる損失を与えます。
///
/// ビーム幅の予測では、過小予測は正解の枝刈りにつながるため、
/// 通常は `under` を大きく設定します。
#[derive(Clone, Copy, Debug)]
pub struct OverUnderLoss {
    /// 予測クラスが正解より大きい場合の損失
    pub over: f32,
    /// 予測クラスが正解より小さい場合の損失
    pub under: f32,
}

impl OverUnderLoss {
    /// 新しい損失関数を作成します。
    ///
    /// # パニック
    ///
    /// いずれかの値が負の場合、パニックします。
    pub fn new(over: f32, under: f32) -> Self {
        assert!(over >= 0.0 && under >= 0.0);
        Self { over, under }
    }
}

impl LossFunction for OverUnderLoss {
    fn loss(&self, gold: usize, guess: usize) -> f32 {
        match guess.cmp(&gold) {
            std::cmp::Ordering::Greater => self.over,
            std::cmp::Ordering::Less => self.under,
            std::cmp::Ordering::Equal => 0.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_losses() {
        assert_eq!(1.0, ZeroOneLoss.loss(0, 3));
        assert_eq!(0.0, ZeroOneLoss.loss(2, 2));
        assert_eq!(3.0, DifferenceLoss.loss(0, 3));
        assert_eq!(2.0, DifferenceLoss.loss(4, 2));

        let loss = OverUnderLoss::new(0.5, 2.0);
        assert_eq!(0.5, loss.loss(1, 3));
        assert_eq!(2.0, loss.loss(3, 1));
        assert_eq!(0.0, loss.loss(1, 1));
    }
}
