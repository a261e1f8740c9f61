//! 数値ベクトルと素性ベクトル。

use std::ops::{Add, Mul};

use hashbrown::HashMap;

use crate::errors::{CellpruneError, Result};

/// この長さ以下のベクトルは密な配列で保持します。
pub const DENSE_VECTOR_LIMIT: usize = 1 << 20;

/// 要素型に要求される演算。
pub trait Scalar: Copy + Default + PartialEq + PartialOrd + Add<Output = Self> + Mul<Output = Self> {}

impl<T> Scalar for T where
    T: Copy + Default + PartialEq + PartialOrd + Add<Output = T> + Mul<Output = T>
{
}

/// 長さ固定の数値ベクトル。
///
/// 密な配列とハッシュマップによる疎な表現の2種類があり、
/// [`NumericVector::new()`] が長さに応じて選択します。
/// どちらの表現でも、設定されていない要素は `T::default()` です。
#[derive(Clone, Debug, PartialEq)]
pub enum NumericVector<T> {
    /// 密なベクトル
    Dense(Vec<T>),

    /// 疎なベクトル
    Sparse {
        /// ベクトルの長さ
        length: usize,
        /// 設定済みの要素
        values: HashMap<usize, T>,
    },
}

impl<T> NumericVector<T>
where
    T: Scalar,
{
    /// 長さ `length` のゼロベクトルを作成します。
    ///
    /// 長さが [`DENSE_VECTOR_LIMIT`] 以下であれば密な表現を、それより長ければ疎な表現を使用します。
    pub fn new(length: usize) -> Self {
        if length <= DENSE_VECTOR_LIMIT {
            Self::dense(length)
        } else {
            Self::sparse(length)
        }
    }

    /// 密な表現のゼロベクトルを作成します。
    pub fn dense(length: usize) -> Self {
        Self::Dense(vec![T::default(); length])
    }

    /// 疎な表現のゼロベクトルを作成します。
    pub fn sparse(length: usize) -> Self {
        Self::Sparse {
            length,
            values: HashMap::new(),
        }
    }

    /// ベクトルの長さを返します。
    pub fn len(&self) -> usize {
        match self {
            Self::Dense(values) => values.len(),
            Self::Sparse { length, .. } => *length,
        }
    }

    /// 長さが0であれば `true` を返します。
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// 疎な表現であれば `true` を返します。
    pub const fn is_sparse(&self) -> bool {
        matches!(self, Self::Sparse { .. })
    }

    /// `i` 番目の要素を返します。範囲外であれば `T::default()` です。
    #[inline]
    pub fn get(&self, i: usize) -> T {
        match self {
            Self::Dense(values) => values.get(i).copied().unwrap_or_default(),
            Self::Sparse { values, .. } => values.get(&i).copied().unwrap_or_default(),
        }
    }

    /// `i` 番目の要素を設定します。
    ///
    /// # パニック
    ///
    /// `i` がベクトルの長さ以上の場合、パニックします。
    #[inline]
    pub fn set(&mut self, i: usize, value: T) {
        match self {
            Self::Dense(values) => values[i] = value,
            Self::Sparse { length, values } => {
                assert!(i < *length);
                values.insert(i, value);
            }
        }
    }

    /// `i` 番目の要素に `delta` を加算します。
    ///
    /// # パニック
    ///
    /// `i` がベクトルの長さ以上の場合、パニックします。
    #[inline]
    pub fn add(&mut self, i: usize, delta: T) {
        let value = self.get(i) + delta;
        self.set(i, value);
    }

    /// 既定値でない要素のインデックスを昇順に返します。
    pub fn populated_indices(&self) -> Vec<usize> {
        let zero = T::default();
        match self {
            Self::Dense(values) => values
                .iter()
                .enumerate()
                .filter(|&(_, v)| *v != zero)
                .map(|(i, _)| i)
                .collect(),
            Self::Sparse { values, .. } => {
                let mut indices: Vec<usize> = values
                    .iter()
                    .filter(|&(_, v)| *v != zero)
                    .map(|(&i, _)| i)
                    .collect();
                indices.sort_unstable();
                indices
            }
        }
    }

    /// 暗黙の既定値を含めた最小値を返します。
    pub fn min(&self) -> T {
        self.fold(|a, b| if b < a { b } else { a })
    }

    /// 暗黙の既定値を含めた最大値を返します。
    pub fn max(&self) -> T {
        self.fold(|a, b| if b > a { b } else { a })
    }

    fn fold<F>(&self, f: F) -> T
    where
        F: Fn(T, T) -> T,
    {
        match self {
            Self::Dense(values) => values.iter().copied().reduce(f).unwrap_or_default(),
            Self::Sparse { length, values } => {
                let init = if values.len() < *length {
                    T::default()
                } else {
                    values.values().copied().next().unwrap_or_default()
                };
                values.values().copied().fold(init, f)
            }
        }
    }
}

impl NumericVector<f32> {
    /// 素性ベクトルとの内積を返します。
    #[inline]
    pub fn dot_product(&self, x: &FeatureVector) -> f32 {
        x.iter().map(|(i, v)| self.get(i) * v).sum()
    }
}

/// 学習・推論の入力となる疎な素性ベクトル。
///
/// 有効な素性のインデックスと、その値を保持します。
/// 値を持たないベクトル（二値素性）では、すべての値が 1 です。
#[derive(Clone, Debug, PartialEq)]
pub struct FeatureVector {
    length: usize,
    indices: Vec<usize>,
    values: Option<Vec<f32>>,
}

impl FeatureVector {
    /// 二値素性のインデックスから素性ベクトルを作成します。
    ///
    /// # エラー
    ///
    /// インデックスが `length` 以上の場合、[`CellpruneError`] が返されます。
    pub fn from_indices(length: usize, indices: Vec<usize>) -> Result<Self> {
        Self::check_indices(length, &indices)?;
        Ok(Self {
            length,
            indices,
            values: None,
        })
    }

    /// インデックスと値の組から素性ベクトルを作成します。
    ///
    /// # エラー
    ///
    /// インデックスが `length` 以上の場合、[`CellpruneError`] が返されます。
    pub fn from_pairs(length: usize, pairs: Vec<(usize, f32)>) -> Result<Self> {
        let (indices, values): (Vec<_>, Vec<_>) = pairs.into_iter().unzip();
        Self::check_indices(length, &indices)?;
        Ok(Self {
            length,
            indices,
            values: Some(values),
        })
    }

    fn check_indices(length: usize, indices: &[usize]) -> Result<()> {
        if let Some(&i) = indices.iter().find(|&&i| i >= length) {
            return Err(CellpruneError::invalid_argument(
                "indices",
                format!("feature index {i} is out of range for length {length}"),
            ));
        }
        Ok(())
    }

    /// ベクトルの長さ（素性空間の大きさ）を返します。
    pub const fn len(&self) -> usize {
        self.length
    }

    /// 素性空間の大きさが0であれば `true` を返します。
    pub const fn is_empty(&self) -> bool {
        self.length == 0
    }

    /// 有効な素性の数を返します。
    pub fn num_active(&self) -> usize {
        self.indices.len()
    }

    /// 有効な素性を `(インデックス, 値)` として列挙します。
    pub fn iter(&self) -> impl Iterator<Item = (usize, f32)> + '_ {
        self.indices.iter().enumerate().map(|(k, &i)| {
            let v = self.values.as_ref().map_or(1.0, |values| values[k]);
            (i, v)
        })
    }
}
