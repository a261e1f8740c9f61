//! 連続値を順序付きクラスに離散化するビン。

use std::fmt;
use std::str::FromStr;

use crate::errors::{CellpruneError, Result};

/// 昇順の境界値の列。
///
/// `"0,5,10"` は 4 クラス `[..=0]`, `(0..=5]`, `(5..=10]`, `(10..)` を表します。
/// 最後のクラスは上限を持たないあふれクラスです。
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Bins {
    boundaries: Vec<u32>,
}

impl Bins {
    /// 境界値の列からビンを作成します。
    ///
    /// # エラー
    ///
    /// 境界値が空の場合や狭義単調増加でない場合、[`CellpruneError`] が返されます。
    pub fn new(boundaries: Vec<u32>) -> Result<Self> {
        if boundaries.is_empty() {
            return Err(CellpruneError::invalid_argument(
                "boundaries",
                "at least one boundary is required",
            ));
        }
        if boundaries.windows(2).any(|w| w[0] >= w[1]) {
            return Err(CellpruneError::invalid_argument(
                "boundaries",
                "boundaries must be strictly increasing",
            ));
        }
        Ok(Self { boundaries })
    }

    /// 境界値の列を返します。
    pub fn boundaries(&self) -> &[u32] {
        &self.boundaries
    }

    /// クラスの数（境界値の数 + 1）を返します。
    pub fn num_classes(&self) -> usize {
        self.boundaries.len() + 1
    }

    /// `value` を含むクラスを返します。
    ///
    /// 境界値が `value` 以上である最初のビンです。該当するビンがなければあふれクラスです。
    pub fn class_for(&self, value: u32) -> usize {
        self.boundaries.partition_point(|&b| b < value)
    }

    /// クラスの上限値を返します。あふれクラスは上限を持たないため `None` です。
    pub fn value_for(&self, class: usize) -> Option<u32> {
        self.boundaries.get(class).copied()
    }
}

impl FromStr for Bins {
    type Err = CellpruneError;

    fn from_str(s: &str) -> Result<Self> {
        let boundaries = s
            .split(',')
            .map(|b| b.trim().parse::<u32>())
            .collect::<Result<Vec<_>, _>>()?;
        Self::new(boundaries)
    }
}

impl fmt::Display for Bins {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        for (i, b) in self.boundaries.iter().enumerate() {
            if i != 0 {
                write!(f, ",")?;
            }
            write!(f, "{b}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_class_for() {
        let bins: Bins = "0,5,10".parse().unwrap();

        assert_eq!(4, bins.num_classes());
        assert_eq!(0, bins.class_for(0));
        assert_eq!(1, bins.class_for(1));
        assert_eq!(1, bins.class_for(5));
        assert_eq!(2, bins.class_for(6));
        assert_eq!(3, bins.class_for(11));

        assert_eq!(Some(5), bins.value_for(1));
        assert_eq!(None, bins.value_for(3));
        assert_eq!("0,5,10", bins.to_string());
    }

    #[test]
    fn test_invalid_bins() {
        assert!("".parse::<Bins>().is_err());
        assert!("5,1".parse::<Bins>().is_err());
        assert!("1,1".parse::<Bins>().is_err());
        assert!("a,b".parse::<Bins>().is_err());
    }
}
