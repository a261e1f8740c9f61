//! 遅延平均化を行う平均化パーセプトロン。

use crate::errors::{CellpruneError, Result};
use crate::perceptron::{CompactModel, FeatureVector, LossFunction, NumericVector, ZeroOneLoss};

/// 平均化パーセプトロン (Collins 2002)。
///
/// クラスごとに生の重みと平均化された重みを保持します。
/// 平均化は素性ごとに遅延して行われ、各素性について最後に同期した事例番号を記録します。
/// 素性 `f` が事例 `l` で同期済みのとき、事例 `t` での平均は
///
/// ```text
/// avg' = (avg * l + raw * (t - l - 1) + raw') / t
/// ```
///
/// で求まります。`l + 1` から `t - 1` の間、生の重みは変化していないためです。
///
/// 二値分類では重みベクトルは1本で、内積が正のときに正例（クラス 1）と予測します。
///
/// 事例は到着順に逐次処理する必要があります。
#[derive(Debug)]
pub struct AveragedPerceptron {
    num_classes: usize,
    binary: bool,
    learning_rate: f32,
    loss: Box<dyn LossFunction>,

    length: Option<usize>,
    raw: Vec<NumericVector<f32>>,
    averaged: Vec<NumericVector<f32>>,
    last_sync: Vec<NumericVector<u64>>,

    num_train_examples: u64,
    synced_through: u64,
}

impl AveragedPerceptron {
    fn new(num_classes: usize, binary: bool, learning_rate: f32) -> Self {
        Self {
            num_classes,
            binary,
            learning_rate,
            loss: Box::new(ZeroOneLoss),
            length: None,
            raw: vec![],
            averaged: vec![],
            last_sync: vec![],
            num_train_examples: 0,
            synced_through: 0,
        }
    }

    /// 二値分類器を作成します。
    ///
    /// # パニック
    ///
    /// 学習率が正でない場合、パニックします。
    pub fn binary(learning_rate: f32) -> Self {
        assert!(learning_rate > 0.0);
        Self::new(2, true, learning_rate)
    }

    /// `num_classes` クラスの多クラス分類器を作成します。
    ///
    /// # パニック
    ///
    /// クラス数が2未満の場合や、学習率が正でない場合、パニックします。
    pub fn multiclass(num_classes: usize, learning_rate: f32) -> Self {
        assert!(num_classes >= 2);
        assert!(learning_rate > 0.0);
        Self::new(num_classes, false, learning_rate)
    }

    /// 損失関数を変更します。
    ///
    /// デフォルトは [`ZeroOneLoss`] です。
    pub fn loss<L>(mut self, loss: L) -> Self
    where
        L: LossFunction + 'static,
    {
        self.loss = Box::new(loss);
        self
    }

    /// クラス数を返します。二値分類器では 2 です。
    pub const fn num_classes(&self) -> usize {
        self.num_classes
    }

    /// 二値分類器であれば `true` を返します。
    pub const fn is_binary(&self) -> bool {
        self.binary
    }

    /// これまでに学習した事例の数を返します。
    pub const fn num_train_examples(&self) -> u64 {
        self.num_train_examples
    }

    /// 素性空間の大きさを返します。まだ素性ベクトルを1つも受け取っていなければ `None` です。
    pub const fn vector_length(&self) -> Option<usize> {
        self.length
    }

    const fn num_vectors(&self) -> usize {
        if self.binary { 1 } else { self.num_classes }
    }

    fn check_dimension(&mut self, x: &FeatureVector) -> Result<()> {
        match self.length {
            Some(expected) if expected != x.len() => Err(CellpruneError::DimensionMismatch {
                expected,
                actual: x.len(),
            }),
            Some(_) => Ok(()),
            None => {
                let length = x.len();
                let n = self.num_vectors();
                self.raw = (0..n).map(|_| NumericVector::new(length)).collect();
                self.averaged = (0..n).map(|_| NumericVector::new(length)).collect();
                self.last_sync = (0..n).map(|_| NumericVector::new(length)).collect();
                self.length = Some(length);
                Ok(())
            }
        }
    }

    fn check_class(&self, class: usize) -> Result<()> {
        if class < self.num_classes {
            Ok(())
        } else {
            Err(CellpruneError::invalid_argument(
                "gold",
                format!("class {class} is out of range for {} classes", self.num_classes),
            ))
        }
    }

    fn argmax(scores: &[f32]) -> usize {
        let mut best = 0;
        for (class, &score) in scores.iter().enumerate().skip(1) {
            if score > scores[best] {
                best = class;
            }
        }
        best
    }

    fn predict(&self, weights: &[NumericVector<f32>], x: &FeatureVector) -> usize {
        if self.binary {
            usize::from(weights[0].dot_product(x) > 0.0)
        } else {
            let scores: Vec<f32> = weights.iter().map(|w| w.dot_product(x)).collect();
            Self::argmax(&scores)
        }
    }

    /// 1つの事例で学習します。
    ///
    /// 生の重みで予測し、正解と異なれば `学習率 * 損失` の幅で更新します。
    ///
    /// # 引数
    ///
    /// * `gold` - 正解クラス（二値分類では 0 または 1）
    /// * `x` - 素性ベクトル
    ///
    /// # 戻り値
    ///
    /// 更新を行った場合は `true`
    ///
    /// # エラー
    ///
    /// 素性ベクトルの長さが最初に受け取ったものと異なる場合や、
    /// 正解クラスが範囲外の場合、[`CellpruneError`] が返されます。
    pub fn train(&mut self, gold: usize, x: &FeatureVector) -> Result<bool> {
        self.check_dimension(x)?;
        self.check_class(gold)?;
        self.num_train_examples += 1;

        let guess = self.predict(&self.raw, x);
        if guess == gold {
            return Ok(false);
        }
        let alpha = self.learning_rate * self.loss.loss(gold, guess);
        self.update(gold, guess, alpha, x);
        Ok(true)
    }

    /// 現在の事例番号で重みを更新します。
    ///
    /// 多クラス分類では正解クラスに `+alpha`、予測クラスに `-alpha` を加えます。
    /// 二値分類では正解が正例なら `+alpha`、負例なら `-alpha` を加えます。
    ///
    /// # パニック
    ///
    /// まだ1つも事例を学習していない場合、パニックします。
    pub fn update(&mut self, gold: usize, guess: usize, alpha: f32, x: &FeatureVector) {
        let example = self.num_train_examples;
        assert!(example > 0);
        if self.binary {
            let sign = if gold == 1 { 1.0 } else { -1.0 };
            self.update_vector(0, sign * alpha, x, example);
        } else {
            self.update_vector(gold, alpha, x, example);
            self.update_vector(guess, -alpha, x, example);
        }
    }

    fn update_vector(&mut self, class: usize, alpha: f32, x: &FeatureVector, example: u64) {
        for (f, v) in x.iter() {
            let raw = self.raw[class].get(f);
            let new_raw = raw + alpha * v;
            let avg = self.next_average(class, f, raw, new_raw, example);
            self.raw[class].set(f, new_raw);
            self.averaged[class].set(f, avg);
            self.last_sync[class].set(f, example);
        }
    }

    #[inline]
    fn next_average(&self, class: usize, f: usize, raw: f32, new_raw: f32, example: u64) -> f32 {
        let last = self.last_sync[class].get(f);
        let avg = self.averaged[class].get(f);
        // An earlier update in the same example leaves last == example.
        let unchanged = (example - last) as f32 - 1.0;
        (avg * last as f32 + raw * unchanged + new_raw) / example as f32
    }

    /// すべての素性の平均を現在の事例番号まで同期します。
    ///
    /// 学習が再開されるまで、2回目以降の呼び出しは何もしません。
    pub fn average_all_features(&mut self) {
        let example = self.num_train_examples;
        if self.synced_through == example || example == 0 {
            return;
        }
        for class in 0..self.raw.len() {
            for f in self.last_sync[class].populated_indices() {
                if self.last_sync[class].get(f) == example {
                    continue;
                }
                let raw = self.raw[class].get(f);
                let avg = self.next_average(class, f, raw, raw, example);
                self.averaged[class].set(f, avg);
                self.last_sync[class].set(f, example);
            }
        }
        self.synced_through = example;
    }

    /// 平均化された重みで分類します。
    ///
    /// # エラー
    ///
    /// 素性ベクトルの長さが一致しない場合、[`CellpruneError`] が返されます。
    pub fn classify(&mut self, x: &FeatureVector) -> Result<usize> {
        self.check_dimension(x)?;
        self.average_all_features();
        Ok(self.predict(&self.averaged, x))
    }

    /// 平均化された重みによる各重みベクトルのスコアを返します。
    ///
    /// # エラー
    ///
    /// 素性ベクトルの長さが一致しない場合、[`CellpruneError`] が返されます。
    pub fn scores(&mut self, x: &FeatureVector) -> Result<Vec<f32>> {
        self.check_dimension(x)?;
        self.average_all_features();
        Ok(self.averaged.iter().map(|w| w.dot_product(x)).collect())
    }

    /// 生の重みベクトルを返します。
    pub fn raw_weights(&self) -> &[NumericVector<f32>] {
        &self.raw
    }

    /// 同期済みの平均化された重みベクトルを返します。
    pub fn averaged_weights(&mut self) -> &[NumericVector<f32>] {
        self.average_all_features();
        &self.averaged
    }

    /// 平均化された重みから推論用のコンパクトモデルを作成します。
    pub fn finalize(mut self) -> CompactModel {
        self.average_all_features();
        let length = self.length.unwrap_or(0);
        CompactModel::from_vectors(&self.averaged, self.num_classes, length)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use approx::assert_abs_diff_eq;

    use crate::perceptron::DifferenceLoss;

    // 0: bias, 1: x1, 2: x2. The target is NOR(x1, x2).
    fn nor_examples() -> Vec<(usize, FeatureVector)> {
        [
            (1, vec![0]),
            (0, vec![0, 2]),
            (0, vec![0, 1]),
            (0, vec![0, 1, 2]),
        ]
        .into_iter()
        .map(|(gold, indices)| (gold, FeatureVector::from_indices(3, indices).unwrap()))
        .collect()
    }

    fn assert_weights(expected: [f32; 3], actual: &NumericVector<f32>) {
        for (i, &e) in expected.iter().enumerate() {
            assert_abs_diff_eq!(e, actual.get(i), epsilon = 1e-6);
        }
    }

    #[test]
    fn test_nor_trajectory() {
        let examples = nor_examples();
        let mut perceptron = AveragedPerceptron::binary(1.0);

        let expected_avg = [
            [1.0, 0.0, 0.0],
            [0.5, 0.0, -0.5],
            [1.0 / 3.0, 0.0, -2.0 / 3.0],
            [0.25, 0.0, -0.75],
            [0.4, 0.0, -0.8],
            [0.5, 0.0, -5.0 / 6.0],
            [3.0 / 7.0, -1.0 / 7.0, -6.0 / 7.0],
            [3.0 / 8.0, -0.25, -7.0 / 8.0],
        ];
        let expected_raw = [
            [1.0, 0.0, 0.0],
            [0.0, 0.0, -1.0],
            [0.0, 0.0, -1.0],
            [0.0, 0.0, -1.0],
            [1.0, 0.0, -1.0],
            [1.0, 0.0, -1.0],
            [0.0, -1.0, -1.0],
            [0.0, -1.0, -1.0],
        ];

        for (t, (gold, x)) in examples.iter().cycle().take(8).enumerate() {
            perceptron.train(*gold, x).unwrap();
            assert_eq!(t as u64 + 1, perceptron.num_train_examples());
            assert_weights(expected_raw[t], &perceptron.raw_weights()[0]);
            assert_weights(expected_avg[t], &perceptron.averaged_weights()[0]);
        }
    }

    #[test]
    fn test_lazy_averaging_matches_eager_sync() {
        let examples = nor_examples();
        let mut lazy = AveragedPerceptron::binary(1.0);
        let mut eager = AveragedPerceptron::binary(1.0);
        for (gold, x) in examples.iter().cycle().take(12) {
            lazy.train(*gold, x).unwrap();
            eager.train(*gold, x).unwrap();
            eager.average_all_features();
        }
        assert_eq!(lazy.raw_weights(), eager.raw_weights());
        let eager_avg = eager.averaged_weights()[0].clone();
        let lazy_avg = &lazy.averaged_weights()[0];
        for f in 0..3 {
            assert_abs_diff_eq!(eager_avg.get(f), lazy_avg.get(f), epsilon = 1e-6);
        }
    }

    #[test]
    fn test_repeated_classify_does_not_resync() {
        fn mean(history: &[NumericVector<f32>]) -> [f32; 3] {
            let mut sum = [0.0; 3];
            for raw in history {
                for (f, s) in sum.iter_mut().enumerate() {
                    *s += raw.get(f);
                }
            }
            sum.map(|s| s / history.len() as f32)
        }

        let examples = nor_examples();
        let mut perceptron = AveragedPerceptron::binary(1.0);
        let mut history = vec![];
        for (gold, x) in examples.iter().cycle().take(6) {
            perceptron.train(*gold, x).unwrap();
            history.push(perceptron.raw_weights()[0].clone());
        }

        let query = &examples[1].1;
        let first = perceptron.classify(query).unwrap();
        let synced = perceptron.averaged_weights()[0].clone();
        assert_weights(mean(&history), &synced);

        assert_eq!(first, perceptron.classify(query).unwrap());
        assert_eq!(&synced, &perceptron.averaged_weights()[0]);
        assert_weights(mean(&history), &perceptron.averaged_weights()[0]);

        let (gold, x) = &examples[2];
        perceptron.train(*gold, x).unwrap();
        history.push(perceptron.raw_weights()[0].clone());
        perceptron.classify(query).unwrap();
        assert_weights(mean(&history), &perceptron.averaged_weights()[0]);
        assert_weights([3.0 / 7.0, -1.0 / 7.0, -6.0 / 7.0], &perceptron.averaged_weights()[0]);
    }

    #[test]
    fn test_separable_classes_are_learned() {
        // 0: bias, 1..=3: class indicators
        let examples: Vec<_> = (0..3)
            .map(|c| (c, FeatureVector::from_indices(4, vec![0, c + 1]).unwrap()))
            .collect();
        let mut perceptron = AveragedPerceptron::multiclass(3, 1.0);
        for _ in 0..10 {
            for (gold, x) in &examples {
                perceptron.train(*gold, x).unwrap();
            }
        }
        for (gold, x) in &examples {
            assert_eq!(*gold, perceptron.classify(x).unwrap());
        }
    }

    #[test]
    fn test_multiclass_update() {
        let mut perceptron = AveragedPerceptron::multiclass(3, 0.5).loss(DifferenceLoss);
        let x = FeatureVector::from_indices(2, vec![1]).unwrap();

        // All scores tie at zero, so class 0 is predicted.
        assert!(perceptron.train(2, &x).unwrap());
        assert_eq!(1.0, perceptron.raw_weights()[2].get(1));
        assert_eq!(-1.0, perceptron.raw_weights()[0].get(1));
        assert_eq!(0.0, perceptron.raw_weights()[1].get(1));

        assert!(!perceptron.train(2, &x).unwrap());
        assert_eq!(2, perceptron.classify(&x).unwrap());
        assert_eq!(vec![-1.0, 0.0, 1.0], perceptron.scores(&x).unwrap());
    }

    #[test]
    fn test_dimension_mismatch() {
        let mut perceptron = AveragedPerceptron::multiclass(2, 1.0);
        perceptron
            .train(0, &FeatureVector::from_indices(3, vec![0]).unwrap())
            .unwrap();

        let result = perceptron.train(0, &FeatureVector::from_indices(4, vec![0]).unwrap());
        assert!(matches!(
            result,
            Err(CellpruneError::DimensionMismatch {
                expected: 3,
                actual: 4
            })
        ));
        assert!(
            perceptron
                .train(5, &FeatureVector::from_indices(3, vec![0]).unwrap())
                .is_err()
        );
    }
}
