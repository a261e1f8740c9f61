//! 文法の左分解（二分化）。

use std::io::Write;
use std::ops::Deref;

use crate::errors::{CellpruneError, Result};
use crate::grammar::induced::GrammarBuilder;
use crate::grammar::{IndexedGrammar, InducedGrammar, StringGrammar};
use crate::tree::{FACTOR_SEPARATOR, Tree};
use crate::utils::{BitVector, FromU32};

/// 左分解された文法。
///
/// すべての規則は単項または二項です。
/// 左分解で導入された合成カテゴリを記録しているため、
/// ラベルの命名規則に頼らずに [`unfactor()`](Self::unfactor) を行えます。
///
/// 問い合わせは [`Deref`] を通じて [`InducedGrammar`] のメソッドで行います。
#[derive(Clone, Debug, PartialEq)]
pub struct FactoredGrammar {
    grammar: InducedGrammar,
    synthetic: BitVector,
}

impl FactoredGrammar {
    /// `label` が左分解で導入された合成カテゴリであれば `true` を返します。
    pub fn is_synthetic(&self, label: &str) -> bool {
        self.grammar
            .symbols()
            .index(label)
            .is_some_and(|id| self.synthetic.get(usize::from_u32(id)))
    }

    /// 合成カテゴリの一覧を返します。
    pub fn synthetic_categories(&self) -> Vec<&str> {
        self.synthetic
            .ones()
            .filter_map(|i| u32::try_from(i).ok())
            .filter_map(|id| self.grammar.symbols().symbol(id))
            .collect()
    }

    /// 左分解された木から合成カテゴリを取り除き、元の多分木を復元します。
    pub fn unfactor(&self, tree: &Tree) -> Tree {
        tree.unfactor(|label| self.is_synthetic(label))
    }

    /// 内部の文法を返します。
    pub const fn grammar(&self) -> &InducedGrammar {
        &self.grammar
    }

    /// 内部の文法を取り出します。
    pub fn into_grammar(self) -> InducedGrammar {
        self.grammar
    }

    /// 文法をバイナリ形式で書き込みます。
    ///
    /// 合成カテゴリの記録は保存されません。
    /// 読み込みには [`InducedGrammar::read()`] を使用してください。
    pub fn write<W>(&self, wtr: W) -> Result<()>
    where
        W: Write,
    {
        self.grammar.write(wtr)
    }
}

impl Deref for FactoredGrammar {
    type Target = InducedGrammar;

    fn deref(&self) -> &Self::Target {
        &self.grammar
    }
}

impl StringGrammar<IndexedGrammar> {
    /// 3つ以上の記号を右辺に持つ規則を、合成カテゴリを導入した二項規則の連鎖に書き換えます。
    ///
    /// 規則 `NP -> NNP NNP NNPS NNP` は
    /// `NP -> NNP NP-NNP`、`NP-NNP -> NNP NP-NNP-NNP`、`NP-NNP-NNP -> NNPS NNP` になります。
    /// 連鎖の各規則には元の規則と同じ出現回数が加算されます。
    /// 単項規則はそのまま引き継がれます。
    ///
    /// # エラー
    ///
    /// 文法の記号表が壊れている場合、[`CellpruneError`] が返されます。
    pub fn left_factor(&self) -> Result<FactoredGrammar> {
        let symbols = self.symbols();
        let counts = self.grammar().counts();
        let name = move |id: u32| {
            symbols.symbol(id).ok_or_else(|| {
                CellpruneError::invalid_state("symbol id missing from the symbol set", id.to_string())
            })
        };

        let mut builder = GrammarBuilder::new(name(counts.start_category())?)?;
        for c in counts.categories() {
            builder.add_category(name(c)?)?;
        }

        let mut unary: Vec<_> = counts.unary_rules().collect();
        unary.sort_unstable();
        for (c, p, n) in unary {
            builder.add_unary(name(c)?, name(p)?, n)?;
        }

        let mut synthetic = BitVector::default();
        let mut binary: Vec<_> = counts.binary_rules().collect();
        binary.sort_unstable();
        for (c, p1, p2, n) in binary {
            let mut rhs: Vec<&str> = vec![name(p1)?];
            rhs.extend(name(p2)?.split_whitespace());

            let mut label = name(c)?.to_string();
            let mut rest = rhs.as_slice();
            while let [head, tail @ ..] = rest
                && tail.len() >= 2
            {
                let next = format!("{label}{FACTOR_SEPARATOR}{head}");
                let id = builder.add_category(&next)?;
                if symbols.index(&next).is_none_or(|orig| !counts.is_category(orig)) {
                    synthetic.set(usize::from_u32(id));
                }
                builder.add_binary(&label, head, &next, n)?;
                label = next;
                rest = tail;
            }
            if let [first, second] = rest {
                builder.add_binary(&label, first, second, n)?;
            }
        }

        let grammar = builder.build();
        log::info!(
            "left-factored {} rules into {} rules ({} synthetic categories)",
            self.num_rules(),
            grammar.num_rules(),
            synthetic.count_ones()
        );
        Ok(FactoredGrammar { grammar, synthetic })
    }
}
