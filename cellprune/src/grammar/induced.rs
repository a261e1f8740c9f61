//! 木構造コーパスからの文法の導出と、その永続化。

use std::io::{BufRead, BufReader, BufWriter, Read, Write};
use std::time::Instant;

use rkyv::{Archive, Deserialize, Serialize};

use crate::errors::{CellpruneError, Result};
use crate::grammar::{Grammar, IndexedGrammar, OccurrenceCounter, StringGrammar};
use crate::persist;
use crate::symbol::SymbolSet;
use crate::tree::Tree;

/// 文法ファイルを識別するマジックバイト。
pub const GRAMMAR_MAGIC: &[u8] = b"CellpruneGrammarRkyv 0.1\n";

/// 進捗をログに出力する行の間隔
const PROGRESS_INTERVAL: usize = 10_000;

/// 木構造コーパスから導出された、文字列で問い合わせられる文法。
pub type InducedGrammar = StringGrammar<IndexedGrammar>;

/// 記号表と出現回数表を同時に育てるビルダー。
pub(crate) struct GrammarBuilder {
    symbols: SymbolSet,
    counter: OccurrenceCounter,
}

impl GrammarBuilder {
    pub(crate) fn new(start_symbol: &str) -> Result<Self> {
        let mut symbols = SymbolSet::new();
        let start = symbols.add_or_get_index(start_symbol)?;
        Ok(Self {
            symbols,
            counter: OccurrenceCounter::new(start),
        })
    }

    pub(crate) fn add_category(&mut self, category: &str) -> Result<u32> {
        let id = self.symbols.add_or_get_index(category)?;
        self.counter.register_category(id);
        Ok(id)
    }

    pub(crate) fn add_unary(&mut self, category: &str, production: &str, weight: u64) -> Result<()> {
        let c = self.symbols.add_or_get_index(category)?;
        let p = self.symbols.add_or_get_index(production)?;
        self.counter.increment_unary(c, p, weight);
        Ok(())
    }

    pub(crate) fn add_binary(
        &mut self,
        category: &str,
        production1: &str,
        production2: &str,
        weight: u64,
    ) -> Result<()> {
        let c = self.symbols.add_or_get_index(category)?;
        let p1 = self.symbols.add_or_get_index(production1)?;
        let p2 = self.symbols.add_or_get_index(production2)?;
        self.counter.increment_binary(c, p1, p2, weight);
        Ok(())
    }

    /// 木に含まれる規則をすべて数えます。
    ///
    /// 3つ以上の子を持つノードは、第2要素以降を空白で連結した1つの記号を持つ
    /// 二項規則として記録されます。これは後で左分解によって二分化されます。
    /// ラベルのない根は開始記号として数えます。
    pub(crate) fn add_tree(&mut self, tree: &Tree) -> Result<()> {
        if !tree.label().is_empty() {
            return self.add_node(tree);
        }
        let start = self
            .symbols
            .symbol(self.counter.start_category())
            .unwrap_or_default()
            .to_string();
        self.add_node(&Tree::new(start, tree.children().to_vec()))
    }

    fn add_node(&mut self, tree: &Tree) -> Result<()> {
        let children = tree.children();
        match children {
            [] => return Ok(()),
            [child] => self.add_unary(tree.label(), child.label(), 1)?,
            [first, second] => self.add_binary(tree.label(), first.label(), second.label(), 1)?,
            [first, rest @ ..] => {
                let rest = rest.iter().map(Tree::label).collect::<Vec<_>>().join(" ");
                self.add_binary(tree.label(), first.label(), &rest, 1)?;
            }
        }
        for child in children {
            self.add_node(child)?;
        }
        Ok(())
    }

    pub(crate) fn build(mut self) -> InducedGrammar {
        self.symbols.finalize();
        StringGrammar::new(self.symbols, IndexedGrammar::new(self.counter))
    }
}

#[derive(Archive, Serialize, Deserialize)]
struct UnaryEntry {
    category: u32,
    production: u32,
    count: u64,
}

#[derive(Archive, Serialize, Deserialize)]
struct BinaryEntry {
    category: u32,
    production1: u32,
    production2: u32,
    count: u64,
}

/// 文法ファイルの内容。
///
/// 派生表は出現回数だけから決まるため、出現回数と記号表のみを保存します。
#[derive(Archive, Serialize, Deserialize)]
struct GrammarData {
    symbols: Vec<String>,
    start: u32,
    categories: Vec<u32>,
    unary: Vec<UnaryEntry>,
    binary: Vec<BinaryEntry>,
}

impl StringGrammar<IndexedGrammar> {
    /// 1行1文の括弧表記コーパスから文法を導出します。
    ///
    /// 解析できない行は警告を出力して読み飛ばします。
    ///
    /// # 引数
    ///
    /// * `rdr` - コーパスのリーダー
    /// * `start_symbol` - 開始記号（カテゴリID 0 が割り当てられます）
    ///
    /// # エラー
    ///
    /// 読み込みに失敗した場合、[`CellpruneError`] が返されます。
    pub fn from_reader<R>(rdr: R, start_symbol: &str) -> Result<Self>
    where
        R: Read,
    {
        let started = Instant::now();
        let mut builder = GrammarBuilder::new(start_symbol)?;
        let mut num_trees = 0;
        let mut num_skipped = 0;

        let mut rdr = BufReader::new(rdr);
        let mut buf = vec![];
        let mut num_lines = 0;
        loop {
            buf.clear();
            if rdr.read_until(b'\n', &mut buf)? == 0 {
                break;
            }
            num_lines += 1;

            match std::str::from_utf8(&buf).map(str::trim) {
                Ok("") => (),
                Ok(line) => match line.parse::<Tree>() {
                    Ok(tree) => {
                        builder.add_tree(&tree)?;
                        num_trees += 1;
                    }
                    Err(e) => {
                        num_skipped += 1;
                        log::warn!("skipping line {num_lines}: {e}");
                    }
                },
                Err(e) => {
                    num_skipped += 1;
                    log::warn!("skipping line {num_lines}: {e}");
                }
            }
            if num_lines % PROGRESS_INTERVAL == 0 {
                log::info!(
                    "read {num_lines} lines ({:.1}s)",
                    started.elapsed().as_secs_f64()
                );
            }
        }

        let grammar = builder.build();
        log::info!(
            "induced {} rules over {} categories from {num_trees} trees ({num_skipped} skipped) in {:.1}s",
            grammar.num_rules(),
            grammar.num_categories(),
            started.elapsed().as_secs_f64()
        );
        Ok(grammar)
    }

    /// 解析済みの木から文法を導出します。
    pub fn from_trees<'a, I>(trees: I, start_symbol: &str) -> Result<Self>
    where
        I: IntoIterator<Item = &'a Tree>,
    {
        let mut builder = GrammarBuilder::new(start_symbol)?;
        for tree in trees {
            builder.add_tree(tree)?;
        }
        Ok(builder.build())
    }

    /// 文法をバイナリ形式で書き込みます。
    ///
    /// # エラー
    ///
    /// シリアライゼーションまたは書き込みに失敗した場合、[`CellpruneError`] が返されます。
    pub fn write<W>(&self, wtr: W) -> Result<()>
    where
        W: Write,
    {
        let counts = self.grammar().counts();
        let mut unary: Vec<_> = counts
            .unary_rules()
            .map(|(category, production, count)| UnaryEntry {
                category,
                production,
                count,
            })
            .collect();
        unary.sort_unstable_by_key(|e| (e.category, e.production));
        let mut binary: Vec<_> = counts
            .binary_rules()
            .map(|(category, production1, production2, count)| BinaryEntry {
                category,
                production1,
                production2,
                count,
            })
            .collect();
        binary.sort_unstable_by_key(|e| (e.category, e.production1, e.production2));

        let data = GrammarData {
            symbols: self.symbols().iter().map(str::to_string).collect(),
            start: counts.start_category(),
            categories: counts.categories().collect(),
            unary,
            binary,
        };
        persist::write_archive(wtr, GRAMMAR_MAGIC, &data)
    }

    /// [`write()`](Self::write) で書き込まれた文法を読み込みます。
    ///
    /// # エラー
    ///
    /// マジックバイトが一致しない場合や内容が壊れている場合、[`CellpruneError`] が返されます。
    pub fn read<R>(rdr: R) -> Result<Self>
    where
        R: Read,
    {
        let data: GrammarData = persist::read_archive(rdr, GRAMMAR_MAGIC)?;

        let mut symbols = SymbolSet::new();
        for symbol in &data.symbols {
            symbols.add_or_get_index(symbol)?;
        }
        let num_symbols = u32::try_from(symbols.len())?;
        let in_range = |id: u32| {
            if id < num_symbols {
                Ok(id)
            } else {
                Err(CellpruneError::invalid_format(
                    "grammar",
                    format!("symbol id {id} out of range"),
                ))
            }
        };

        let mut counter = OccurrenceCounter::new(in_range(data.start)?);
        if num_symbols != 0 {
            counter.register_production(num_symbols - 1);
        }
        for &c in &data.categories {
            counter.register_category(in_range(c)?);
        }
        for e in &data.unary {
            counter.increment_unary(in_range(e.category)?, in_range(e.production)?, e.count);
        }
        for e in &data.binary {
            counter.increment_binary(
                in_range(e.category)?,
                in_range(e.production1)?,
                in_range(e.production2)?,
                e.count,
            );
        }

        symbols.finalize();
        Ok(StringGrammar::new(symbols, IndexedGrammar::new(counter)))
    }

    /// 規則を1行に1つずつ、人が読める形式で書き込みます。
    ///
    /// 各行は `左辺 -> 右辺\t対数確率\t出現回数` の形式です。
    pub fn write_text<W>(&self, wtr: W) -> Result<()>
    where
        W: Write,
    {
        let mut wtr = BufWriter::new(wtr);
        let grammar = self.grammar();
        let counts = grammar.counts();
        let name = move |id: u32| self.symbols().symbol(id).unwrap_or_default();

        let mut unary: Vec<_> = counts.unary_rules().collect();
        unary.sort_unstable();
        for (c, p, n) in unary {
            writeln!(
                &mut wtr,
                "{} -> {}\t{:.6}\t{n}",
                name(c),
                name(p),
                grammar.unary_log_probability(c, p)
            )?;
        }

        let mut binary: Vec<_> = counts.binary_rules().collect();
        binary.sort_unstable();
        for (c, p1, p2, n) in binary {
            writeln!(
                &mut wtr,
                "{} -> {} {}\t{:.6}\t{n}",
                name(c),
                name(p1),
                name(p2),
                grammar.binary_log_probability(c, p1, p2)
            )?;
        }

        wtr.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_induce_single_preterminal() {
        let grammar = InducedGrammar::from_reader("(NNP Wnnp)".as_bytes(), "TOP").unwrap();

        assert_eq!(2, grammar.num_categories());
        assert_eq!(1, grammar.num_rules());
        assert_eq!(1, grammar.unary_occurrences("NNP", "Wnnp"));
        assert_eq!("NNP", grammar.possible_categories("Wnnp")[0]);
        assert_eq!("TOP", grammar.start_category());
    }

    #[test]
    fn test_malformed_lines_are_skipped() {
        let treebank = "(TOP (NN a))\n(TOP (NN b)\n\n(TOP (NN a))\n";
        let grammar = InducedGrammar::from_reader(treebank.as_bytes(), "TOP").unwrap();

        assert_eq!(2, grammar.unary_occurrences("TOP", "NN"));
        assert_eq!(2, grammar.unary_occurrences("NN", "a"));
        assert_eq!(0, grammar.unary_occurrences("NN", "b"));
    }

    #[test]
    fn test_invalid_utf8_line_is_skipped() {
        let treebank = b"(TOP (NN a))\n(TOP (NN \xff\xfe))\n(TOP (NN a))\n";
        let grammar = InducedGrammar::from_reader(&treebank[..], "TOP").unwrap();

        assert_eq!(2, grammar.unary_occurrences("TOP", "NN"));
        assert_eq!(2, grammar.unary_occurrences("NN", "a"));
        assert_eq!(2, grammar.num_rules());
    }

    #[test]
    fn test_unlabeled_root_is_start_symbol() {
        let treebank = "( (S (NP (NNP Rex)) (VP (VBZ barks))) )\n";
        let grammar = InducedGrammar::from_reader(treebank.as_bytes(), "TOP").unwrap();

        assert_eq!(1, grammar.unary_occurrences("TOP", "S"));
        assert_eq!(None, grammar.symbols().index(""));
        assert_eq!(vec!["S"], grammar.valid_top_categories("NP", "VP"));
    }

    #[test]
    fn test_nary_rule_is_joined() {
        let treebank = "(NP (NNP Wnnp) (NNP Wnnp) (NNPS Wnnps))";
        let grammar = InducedGrammar::from_reader(treebank.as_bytes(), "TOP").unwrap();

        assert_eq!(1, grammar.binary_occurrences("NP", "NNP", "NNP NNPS"));
        assert_eq!(2, grammar.unary_occurrences("NNP", "Wnnp"));
        assert_eq!(3, grammar.num_rules());
        assert!(grammar.valid_second_production("NNP NNPS"));
    }

    #[test]
    fn test_write_text() {
        let grammar =
            InducedGrammar::from_reader("(TOP (S (NN a) (VB b)))".as_bytes(), "TOP").unwrap();
        let mut buf = vec![];
        grammar.write_text(&mut buf).unwrap();
        let text = String::from_utf8(buf).unwrap();

        assert!(text.contains("TOP -> S\t0.000000\t1\n"));
        assert!(text.contains("S -> NN VB\t0.000000\t1\n"));
        assert!(text.contains("NN -> a\t0.000000\t1\n"));
        assert_eq!(4, text.lines().count());
    }

    #[test]
    fn test_write_and_read() {
        let treebank = "(TOP (S (NP (DT the) (NN dog)) (VP (VBZ runs))))\n\
                        (TOP (S (NP (NNP Rex)) (VP (VBZ barks) (RB loudly))))\n";
        let grammar = InducedGrammar::from_reader(treebank.as_bytes(), "TOP").unwrap();

        let mut buf = vec![];
        grammar.write(&mut buf).unwrap();
        let restored = InducedGrammar::read(buf.as_slice()).unwrap();

        assert_eq!(grammar, restored);
        assert_eq!(2, restored.unary_occurrences("TOP", "S"));
    }
}
