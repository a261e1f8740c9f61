//! cellprune 文法・分類器コンパイラのメインエントリーポイント
//!
//! このモジュールは、構文解析の高速化に使うモデルを構築するためのサブコマンドを提供します。
//! 木構造コーパスからの文法の導出、文法の左分解、素性コーパスからの分類器の学習を
//! 統合したCLIツールです。

mod factor;
mod induce;
mod train;

use clap::Parser;
use thiserror::Error;

use crate::{factor::FactorError, induce::InduceError, train::TrainError};

/// コマンドライン引数の構造体
///
/// `clap`を使用してコマンドライン引数をパースします。
#[derive(Parser, Debug)]
#[clap(name = "compile", version)]
struct Cli {
    /// 実行するサブコマンド
    #[clap(subcommand)]
    command: Command,
}

/// 利用可能なサブコマンド
#[derive(Parser, Debug)]
enum Command {
    /// 木構造コーパスから文法を導出します
    ///
    /// 規則の出現回数を数え、最尤推定による確率を持つ文法をバイナリ形式で出力します。
    Induce(induce::Args),

    /// 文法を左分解します
    ///
    /// 3つ以上の記号を右辺に持つ規則を、二項規則の連鎖に書き換えます。
    Factor(factor::Args),

    /// 素性コーパスから分類器を学習します
    ///
    /// 平均化パーセプトロンで二値分類器または多クラス分類器を学習します。
    Train(train::Args),
}

/// コンパイラの実行中に発生する可能性のあるエラー
///
/// 各サブコマンドで発生したエラーをラップします。
#[derive(Debug, Error)]
pub enum CompileError {
    /// 文法の導出中のエラー
    #[error(transparent)]
    InduceError(#[from] InduceError),
    /// 左分解中のエラー
    #[error(transparent)]
    FactorError(#[from] FactorError),
    /// 分類器の学習中のエラー
    #[error(transparent)]
    TrainError(#[from] TrainError),
}

/// メイン関数
///
/// ロガーを初期化し、コマンドライン引数をパースして指定されたサブコマンドを実行します。
/// ログの出力レベルは環境変数 `RUST_LOG` で変更できます（デフォルトは `info`）。
///
/// # エラー
///
/// 各サブコマンドの実行中にエラーが発生した場合、そのエラーが返されます。
fn main() -> Result<(), CompileError> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    match cli.command {
        Command::Induce(args) => Ok(induce::run(args)?),
        Command::Factor(args) => Ok(factor::run(args)?),
        Command::Train(args) => Ok(train::run(args)?),
    }
}
