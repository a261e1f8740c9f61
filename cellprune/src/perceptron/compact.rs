//! 推論用のコンパクトな重み表現。

use hashbrown::HashMap;
use rkyv::{Archive, Deserialize, Serialize};

use crate::errors::{CellpruneError, Result};
use crate::perceptron::{FeatureVector, NumericVector};
use crate::utils::FromU32;

/// 素性ごとに非ゼロの `(クラス, 重み)` の組を連続して並べたモデル。
///
/// 素性 `f` のオフセットを `o` とすると、`classes[o]` に組の数 `n` が入り、
/// `classes[o + 1..=o + n]` と `weights[o + 1..=o + n]` に組が並びます。
/// `weights[o]` は使用しません。
/// したがって組の総数は配列長から素性数を引いたものに等しくなります。
///
/// 推論では素性ごとに1回だけハッシュ表を引き、続く短い区間を線形に走査します。
/// 学習時に観測されなかった素性はすべてのクラスに 0 を寄与します。
#[derive(Clone, Debug, PartialEq)]
pub struct CompactModel {
    num_classes: usize,
    num_vectors: usize,
    length: usize,
    features: Vec<usize>,
    offsets: HashMap<usize, usize>,
    classes: Vec<u32>,
    weights: Vec<f32>,
}

#[derive(Archive, Serialize, Deserialize)]
pub(crate) struct CompactModelData {
    num_classes: u32,
    num_vectors: u32,
    length: u64,
    features: Vec<u64>,
    classes: Vec<u32>,
    weights: Vec<f32>,
}

impl CompactModel {
    /// クラスごとの重みベクトルからモデルを作成します。
    ///
    /// 二値分類では `vectors` は1本です。
    ///
    /// # 引数
    ///
    /// * `vectors` - 重みベクトル
    /// * `num_classes` - クラス数
    /// * `length` - 素性空間の大きさ
    pub fn from_vectors(vectors: &[NumericVector<f32>], num_classes: usize, length: usize) -> Self {
        let mut features: Vec<usize> = vectors
            .iter()
            .flat_map(NumericVector::populated_indices)
            .collect();
        features.sort_unstable();
        features.dedup();

        let mut offsets = HashMap::with_capacity(features.len());
        let mut classes = vec![];
        let mut weights = vec![];
        for &f in &features {
            let offset = classes.len();
            offsets.insert(f, offset);
            classes.push(0);
            weights.push(0.0);
            for (c, w) in vectors.iter().enumerate() {
                let weight = w.get(f);
                if weight != 0.0 {
                    // Class ids are bounded by the number of weight vectors.
                    classes.push(c as u32);
                    weights.push(weight);
                }
            }
            classes[offset] = (classes.len() - offset - 1) as u32;
        }

        Self {
            num_classes,
            num_vectors: vectors.len(),
            length,
            features,
            offsets,
            classes,
            weights,
        }
    }

    /// クラス数を返します。
    pub const fn num_classes(&self) -> usize {
        self.num_classes
    }

    /// 素性空間の大きさを返します。
    pub const fn vector_length(&self) -> usize {
        self.length
    }

    /// 重みを持つ素性の数を返します。
    pub fn num_features(&self) -> usize {
        self.features.len()
    }

    /// 非ゼロの `(クラス, 重み)` の組の総数を返します。
    pub fn num_pairs(&self) -> usize {
        self.classes.len() - self.features.len()
    }

    /// 二値分類のモデルであれば `true` を返します。
    pub const fn is_binary(&self) -> bool {
        self.num_vectors == 1
    }

    /// 重みベクトルごとのスコアを返します。二値分類では長さ1です。
    pub fn scores(&self, x: &FeatureVector) -> Vec<f32> {
        let mut scores = vec![0.0; self.num_vectors];
        for (f, v) in x.iter() {
            let Some(&offset) = self.offsets.get(&f) else {
                continue;
            };
            let n = usize::from_u32(self.classes[offset]);
            for k in offset + 1..=offset + n {
                scores[usize::from_u32(self.classes[k])] += self.weights[k] * v;
            }
        }
        scores
    }

    /// 二値分類のスコアを返します。
    pub fn score(&self, x: &FeatureVector) -> f32 {
        self.scores(x).first().copied().unwrap_or(0.0)
    }

    /// 二値分類で、`score + bias > 0` であれば `true` を返します。
    pub fn decide(&self, x: &FeatureVector, bias: f32) -> bool {
        self.score(x) + bias > 0.0
    }

    /// 分類結果のクラスを返します。
    ///
    /// 多クラス分類ではスコア最大のクラス（同点なら番号の小さい方）、
    /// 二値分類ではスコアが正なら 1、そうでなければ 0 です。
    pub fn classify(&self, x: &FeatureVector) -> usize {
        if self.is_binary() {
            return usize::from(self.decide(x, 0.0));
        }
        let scores = self.scores(x);
        let mut best = 0;
        for (class, &score) in scores.iter().enumerate().skip(1) {
            if score > scores[best] {
                best = class;
            }
        }
        best
    }

    /// 重みの最小値と最大値を返します。0 を含みます。
    pub fn weight_range(&self) -> (f32, f32) {
        self.features
            .iter()
            .flat_map(|f| {
                let offset = self.offsets[f];
                let n = usize::from_u32(self.classes[offset]);
                self.weights[offset + 1..=offset + n].iter().copied()
            })
            .fold((0.0, 0.0), |(lo, hi), w| (w.min(lo), w.max(hi)))
    }

    /// クラスごとの重みベクトルを復元します。
    pub fn class_vectors(&self) -> Vec<NumericVector<f32>> {
        let mut vectors: Vec<_> = (0..self.num_vectors)
            .map(|_| NumericVector::new(self.length))
            .collect();
        for &f in &self.features {
            let offset = self.offsets[&f];
            let n = usize::from_u32(self.classes[offset]);
            for k in offset + 1..=offset + n {
                vectors[usize::from_u32(self.classes[k])].set(f, self.weights[k]);
            }
        }
        vectors
    }

    pub(crate) fn to_data(&self) -> Result<CompactModelData> {
        Ok(CompactModelData {
            num_classes: u32::try_from(self.num_classes)?,
            num_vectors: u32::try_from(self.num_vectors)?,
            length: u64::try_from(self.length)?,
            features: self
                .features
                .iter()
                .map(|&f| u64::try_from(f))
                .collect::<Result<_, _>>()?,
            classes: self.classes.clone(),
            weights: self.weights.clone(),
        })
    }

    pub(crate) fn from_data(data: CompactModelData) -> Result<Self> {
        let corrupted = |msg: &str| CellpruneError::invalid_format("model", msg.to_string());

        if data.classes.len() != data.weights.len() {
            return Err(corrupted("class and weight arrays differ in length"));
        }
        let num_vectors = usize::from_u32(data.num_vectors);
        let length = usize::try_from(data.length)?;

        let mut features = Vec::with_capacity(data.features.len());
        let mut offsets = HashMap::with_capacity(data.features.len());
        let mut cursor = 0;
        for &f in &data.features {
            let f = usize::try_from(f)?;
            if f >= length {
                return Err(corrupted("feature index out of range"));
            }
            let n = data
                .classes
                .get(cursor)
                .map(|&n| usize::from_u32(n))
                .ok_or_else(|| corrupted("truncated class array"))?;
            if cursor + n >= data.classes.len()
                || data.classes[cursor + 1..=cursor + n]
                    .iter()
                    .any(|&c| usize::from_u32(c) >= num_vectors)
            {
                return Err(corrupted("invalid class entry"));
            }
            features.push(f);
            offsets.insert(f, cursor);
            cursor += n + 1;
        }
        if cursor != data.classes.len() {
            return Err(corrupted("trailing entries in the class array"));
        }

        Ok(Self {
            num_classes: usize::from_u32(data.num_classes),
            num_vectors,
            length,
            features,
            offsets,
            classes: data.classes,
            weights: data.weights,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vectors() -> Vec<NumericVector<f32>> {
        let mut vectors = vec![
            NumericVector::dense(5),
            NumericVector::dense(5),
            NumericVector::sparse(5),
        ];
        vectors[0].set(0, 1.0);
        vectors[1].set(0, -2.0);
        vectors[2].set(3, 0.5);
        vectors[1].set(4, 3.0);
        vectors
    }

    #[test]
    fn test_layout() {
        let model = CompactModel::from_vectors(&vectors(), 3, 5);

        assert_eq!(3, model.num_features());
        assert_eq!(4, model.num_pairs());
        assert_eq!(model.num_pairs(), model.classes.len() - model.num_features());
        assert_eq!(vec![2, 0, 1, 1, 2, 1, 1], model.classes);
        assert_eq!((-2.0, 3.0), model.weight_range());
    }

    #[test]
    fn test_scores_match_vectors() {
        let vectors = vectors();
        let model = CompactModel::from_vectors(&vectors, 3, 5);
        let x = FeatureVector::from_pairs(5, vec![(0, 1.0), (3, 2.0), (4, 0.5), (1, 7.0)]).unwrap();

        let expected: Vec<f32> = vectors.iter().map(|w| w.dot_product(&x)).collect();
        assert_eq!(expected, model.scores(&x));
        assert_eq!(0, model.classify(&x));

        let restored = model.class_vectors();
        for (orig, restored) in vectors.iter().zip(&restored) {
            for i in 0..5 {
                assert_eq!(orig.get(i), restored.get(i));
            }
        }
    }

    #[test]
    fn test_binary_decision() {
        let mut w = NumericVector::dense(3);
        w.set(1, 2.0);
        let model = CompactModel::from_vectors(&[w], 2, 3);
        let x = FeatureVector::from_indices(3, vec![1]).unwrap();

        assert!(model.is_binary());
        assert_eq!(2.0, model.score(&x));
        assert_eq!(1, model.classify(&x));
        assert!(!model.decide(&x, -2.0));
        assert!(model.decide(&x, -1.5));
    }

    #[test]
    fn test_data_round_trip() {
        let model = CompactModel::from_vectors(&vectors(), 3, 5);
        let restored = CompactModel::from_data(model.to_data().unwrap()).unwrap();
        assert_eq!(model, restored);
    }

    #[test]
    fn test_corrupted_data() {
        let model = CompactModel::from_vectors(&vectors(), 3, 5);
        let mut data = model.to_data().unwrap();
        data.classes.pop();
        data.weights.pop();
        assert!(CompactModel::from_data(data).is_err());
    }
}
