//! 記号表のモジュール。
//!
//! 文字列と密な整数IDの双方向対応を管理します。
//! 文法の導出や分類器の学習でIDの割り当てが必要なコンポーネントは、
//! グローバルな状態ではなく、このモジュールの [`SymbolSet`] を明示的に受け取ります。

use hashbrown::HashMap;

use crate::errors::{CellpruneError, Result};
use crate::utils::FromU32;

/// 文字列と整数IDの双方向対応表。
///
/// IDは追加順に 0 から密に割り当てられます。
/// [`finalize()`](Self::finalize) の後は新しい記号を追加できません。
#[derive(Clone, Debug, Default)]
pub struct SymbolSet {
    symbols: Vec<String>,
    ids: HashMap<String, u32>,
    finalized: bool,
}

impl SymbolSet {
    /// 空の記号表を作成します。
    pub fn new() -> Self {
        Self::default()
    }

    /// 記号のIDを返します。未登録であれば新しいIDを割り当てます。
    ///
    /// # エラー
    ///
    /// 記号表が確定済みで、かつ記号が未登録の場合、[`CellpruneError`] が返されます。
    pub fn add_or_get_index(&mut self, symbol: &str) -> Result<u32> {
        if let Some(&id) = self.ids.get(symbol) {
            return Ok(id);
        }
        if self.finalized {
            return Err(CellpruneError::invalid_state(
                "cannot add a symbol to a finalized symbol set",
                symbol,
            ));
        }
        let id = u32::try_from(self.symbols.len())?;
        self.symbols.push(symbol.to_string());
        self.ids.insert(symbol.to_string(), id);
        Ok(id)
    }

    /// 登録済みの記号のIDを返します。
    #[inline]
    pub fn index(&self, symbol: &str) -> Option<u32> {
        self.ids.get(symbol).copied()
    }

    /// IDに対応する記号を返します。
    #[inline]
    pub fn symbol(&self, id: u32) -> Option<&str> {
        self.symbols.get(usize::from_u32(id)).map(String::as_str)
    }

    /// 登録されている記号の数を返します。
    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    /// 記号が1つも登録されていない場合に `true` を返します。
    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    /// 記号表を確定し、以降の追加を禁止します。
    pub fn finalize(&mut self) {
        self.finalized = true;
    }

    /// 記号表が確定済みかを返します。
    pub const fn is_finalized(&self) -> bool {
        self.finalized
    }

    /// ID順に記号を列挙します。
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.symbols.iter().map(String::as_str)
    }
}

impl PartialEq for SymbolSet {
    fn eq(&self, other: &Self) -> bool {
        self.symbols == other.symbols
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_and_lookup() {
        let mut symbols = SymbolSet::new();
        assert_eq!(0, symbols.add_or_get_index("TOP").unwrap());
        assert_eq!(1, symbols.add_or_get_index("NP").unwrap());
        assert_eq!(0, symbols.add_or_get_index("TOP").unwrap());

        assert_eq!(Some(1), symbols.index("NP"));
        assert_eq!(None, symbols.index("VP"));
        assert_eq!(Some("NP"), symbols.symbol(1));
        assert_eq!(None, symbols.symbol(2));
        assert_eq!(2, symbols.len());
    }

    #[test]
    fn test_finalized_rejects_new_symbols() {
        let mut symbols = SymbolSet::new();
        symbols.add_or_get_index("NP").unwrap();
        symbols.finalize();

        assert!(symbols.is_finalized());
        assert_eq!(0, symbols.add_or_get_index("NP").unwrap());
        assert!(symbols.add_or_get_index("VP").is_err());
    }
}
