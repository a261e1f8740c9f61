//! 文法の左分解モジュール
//!
//! `induce` コマンドで出力された文法を読み込み、左分解した文法を出力します。

use std::fs::File;
use std::io;
use std::path::PathBuf;

use cellprune::errors::CellpruneError;
use cellprune::grammar::InducedGrammar;

use clap::Parser;
use thiserror::Error;

use crate::induce::write_grammar;

/// 左分解コマンドの引数
#[derive(Parser, Debug)]
#[clap(name = "factor", about = "A program to left-factor a grammar.")]
pub struct Args {
    /// Binary grammar (in zstd).
    #[clap(short = 'i', long)]
    grammar_in: PathBuf,

    /// File to which the left-factored grammar is output (in zstd).
    #[clap(short = 'o', long)]
    grammar_out: PathBuf,

    /// File to which the rules are dumped in text.
    #[clap(long)]
    text_out: Option<PathBuf>,
}

/// 左分解中に発生する可能性のあるエラー
#[derive(Debug, Error)]
pub enum FactorError {
    /// 入出力エラー
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// 文法の読み込みまたは変換のエラー
    #[error("Left-factorization failed: {0}")]
    Cellprune(#[from] CellpruneError),
}

/// 左分解コマンドを実行する
///
/// # エラー
///
/// ファイルの読み書きや文法の変換に失敗した場合、`FactorError`を返します。
pub fn run(args: Args) -> Result<(), FactorError> {
    println!("Loading the grammar...");
    let file = File::open(&args.grammar_in)?;
    let grammar = InducedGrammar::read(zstd::Decoder::new(file)?)?;

    println!("Left-factoring {} rules...", grammar.num_rules());
    let factored = grammar.left_factor()?;
    for label in factored.synthetic_categories().iter().take(10) {
        log::debug!("synthetic category: {label}");
    }
    println!(
        "{} categories ({} synthetic), {} rules",
        factored.num_categories(),
        factored.synthetic_categories().len(),
        factored.num_rules()
    );

    println!("Writing the grammar...");
    write_grammar(factored.grammar(), &args.grammar_out, args.text_out.as_deref())?;

    println!("Successfully wrote the grammar to {}", args.grammar_out.display());
    Ok(())
}
