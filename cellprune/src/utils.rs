//! ユーティリティ関数と型変換トレイトを提供するモジュール
//!
//! - `FromU32`: u32からの型変換トレイト
//! - `BitVector`: 記号IDで引く固定幅のビット集合
//! - テスト用のマクロ

/// u32から他の型への変換を提供するトレイト
///
/// 標準ライブラリのFromトレイトとは異なり、プラットフォーム固有の仮定を行うことができます。
pub trait FromU32 {
    /// u32値から実装型を生成する
    fn from_u32(src: u32) -> Self;
}

#[cfg(any(target_pointer_width = "32", target_pointer_width = "64"))]
impl FromU32 for usize {
    #[inline(always)]
    fn from_u32(src: u32) -> Self {
        // Since the pointer width is guaranteed to be 32 or 64,
        // the following process always succeeds.
        unsafe { Self::try_from(src).unwrap_unchecked() }
    }
}

/// 記号IDをインデックスとするビットベクトル
///
/// 範囲外のインデックスに対する問い合わせは常に `false` を返します。
/// `set` は必要に応じて領域を拡張します。
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct BitVector {
    words: Vec<u64>,
}

impl BitVector {
    /// 少なくとも `len` ビットを保持できる空のビットベクトルを作成します。
    pub fn with_len(len: usize) -> Self {
        Self {
            words: vec![0; len.div_ceil(64)],
        }
    }

    /// `i` 番目のビットを立てます。
    pub fn set(&mut self, i: usize) {
        let w = i / 64;
        if w >= self.words.len() {
            self.words.resize(w + 1, 0);
        }
        self.words[w] |= 1 << (i % 64);
    }

    /// `i` 番目のビットが立っているかを返します。
    #[inline]
    pub fn get(&self, i: usize) -> bool {
        self.words
            .get(i / 64)
            .is_some_and(|&w| w & (1 << (i % 64)) != 0)
    }

    /// 立っているビットの数を返します。
    pub fn count_ones(&self) -> usize {
        self.words.iter().map(|w| w.count_ones() as usize).sum()
    }

    /// 立っているビットのインデックスを昇順に列挙します。
    pub fn ones(&self) -> impl Iterator<Item = usize> + '_ {
        self.words.iter().enumerate().flat_map(|(wi, &w)| {
            (0..64).filter(move |b| w & (1 << b) != 0).map(move |b| wi * 64 + b)
        })
    }
}

#[cfg(test)]
/// HashMapリテラルを簡潔に記述するためのマクロ
///
/// ```ignore
/// let map = hashmap! {
///     "key1" => "value1",
///     "key2" => "value2",
/// };
/// ```
macro_rules! hashmap {
    ( $($k:expr => $v:expr,)* ) => {
        {
            #[allow(unused_mut)]
            let mut h = hashbrown::HashMap::new();
            $(
                h.insert($k, $v);
            )*
            h
        }
    };
    ( $($k:expr => $v:expr),* ) => {
        hashmap![$( $k => $v, )*]
    };
}

#[cfg(test)]
pub(crate) use hashmap;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bit_vector() {
        let mut bits = BitVector::with_len(10);
        bits.set(3);
        bits.set(130);
        assert!(bits.get(3));
        assert!(bits.get(130));
        assert!(!bits.get(4));
        assert!(!bits.get(100_000));
        assert_eq!(2, bits.count_ones());
        assert_eq!(vec![3, 130], bits.ones().collect::<Vec<_>>());
    }
}
