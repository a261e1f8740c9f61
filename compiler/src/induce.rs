//! 文法の導出モジュール
//!
//! 1行1文の括弧表記の木構造コーパスから規則の出現回数を数え、
//! zstd圧縮したバイナリ形式の文法を出力します。

use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};

use cellprune::errors::CellpruneError;
use cellprune::grammar::InducedGrammar;

use clap::Parser;
use thiserror::Error;

/// 導出コマンドの引数
#[derive(Parser, Debug)]
#[clap(name = "induce", about = "A program to induce a PCFG from a treebank.")]
pub struct Args {
    /// Treebank file with one bracketed tree per line.
    #[clap(short = 'i', long)]
    treebank_in: PathBuf,

    /// File to which the binary grammar is output (in zstd).
    #[clap(short = 'o', long)]
    grammar_out: PathBuf,

    /// Start symbol of the grammar.
    #[clap(long, default_value = "TOP")]
    start: String,

    /// Left-factors the grammar into binary rules before writing it.
    #[clap(long)]
    factor: bool,

    /// File to which the rules are dumped in text.
    #[clap(long)]
    text_out: Option<PathBuf>,
}

/// 導出処理中に発生する可能性のあるエラー
#[derive(Debug, Error)]
pub enum InduceError {
    /// 入出力エラー
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// 文法構築エラー
    #[error("Grammar induction failed: {0}")]
    Cellprune(#[from] CellpruneError),
}

/// 文法をzstd圧縮して書き込み、指定があればテキスト形式でも書き出す
pub(crate) fn write_grammar(
    grammar: &InducedGrammar,
    grammar_out: &Path,
    text_out: Option<&Path>,
) -> Result<(), CellpruneError> {
    let file = File::create(grammar_out)?;
    let mut encoder = zstd::Encoder::new(file, 19)?;
    grammar.write(&mut encoder)?;
    encoder.finish()?;

    if let Some(path) = text_out {
        grammar.write_text(File::create(path)?)?;
    }
    Ok(())
}

/// 導出コマンドを実行する
///
/// # エラー
///
/// ファイルの読み書きや文法の構築に失敗した場合、`InduceError`を返します。
pub fn run(args: Args) -> Result<(), InduceError> {
    println!("Inducing the grammar...");
    let rdr = File::open(&args.treebank_in)?;
    let grammar = InducedGrammar::from_reader(rdr, &args.start)?;
    println!(
        "{} categories, {} productions, {} rules",
        grammar.num_categories(),
        grammar.num_productions(),
        grammar.num_rules()
    );

    let grammar = if args.factor {
        println!("Left-factoring the grammar...");
        let factored = grammar.left_factor()?;
        println!(
            "{} categories ({} synthetic), {} rules",
            factored.num_categories(),
            factored.synthetic_categories().len(),
            factored.num_rules()
        );
        factored.into_grammar()
    } else {
        grammar
    };

    println!("Writing the grammar...");
    write_grammar(&grammar, &args.grammar_out, args.text_out.as_deref())?;

    println!("Successfully wrote the grammar to {}", args.grammar_out.display());
    Ok(())
}
