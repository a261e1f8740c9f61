//! 分類器の精度を評価するユーティリティ
//!
//! このバイナリは、`compile train` で学習した分類器をテスト用の素性コーパスで評価します。
//! 多クラス分類器では正解率と過大・過小予測の数を、
//! 二値分類器では正解率、適合率、再現率、負例の再現率を出力します。

use std::error::Error;
use std::fs::File;
use std::path::PathBuf;

use cellprune::classifier::{Classifier, FeatureCorpus};

use clap::Parser;

/// コマンドライン引数
#[derive(Parser, Debug)]
#[clap(name = "evaluate", about = "Evaluate the classifier accuracy")]
struct Args {
    /// Test feature corpus.
    #[clap(short = 't', long)]
    test_in: PathBuf,

    /// Trained classifier (in zstd).
    #[clap(short = 'i', long)]
    model_in: PathBuf,

    /// Overrides the decision bias of a binary classifier.
    #[clap(long)]
    bias: Option<f32>,
}

/// メイン関数
///
/// 分類器を読み込み、テストコーパスのすべての位置を分類して評価統計を出力します。
///
/// # 戻り値
///
/// 実行が成功した場合は `Ok(())`、エラーが発生した場合はエラー情報
fn main() -> Result<(), Box<dyn Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    eprintln!("Loading the classifier...");
    let file = File::open(&args.model_in)?;
    let classifier = Classifier::read(zstd::Decoder::new(file)?)?;

    eprintln!("Loading the test corpus...");
    let length = classifier.model().vector_length();
    let test = FeatureCorpus::from_reader_with_length(File::open(&args.test_in)?, length)?;
    let extractor = test.extractor();

    eprintln!("Classifying {} positions...", test.num_positions());
    match classifier {
        Classifier::Binary(mut c) => {
            if let Some(bias) = args.bias {
                c.set_bias(bias);
            }
            let stats = c.evaluate(&extractor, test.sentences());
            println!("bias: {}", c.bias());
            println!("accuracy: {:.4}", stats.accuracy());
            println!("precision: {:.4}", stats.precision());
            println!("recall: {:.4}", stats.recall());
            println!("negative recall: {:.4}", stats.negative_recall());
            println!(
                "tp={} fp={} tn={} fn={}",
                stats.true_positives,
                stats.false_positives,
                stats.true_negatives,
                stats.false_negatives
            );
        }
        Classifier::Multiclass(c) => {
            if args.bias.is_some() {
                eprintln!("Warning: --bias is ignored for multiclass classifiers");
            }
            let stats = c.evaluate(&extractor, test.sentences());
            println!("classes: {}", c.model().num_classes());
            println!("accuracy: {:.4} ({}/{})", stats.accuracy(), stats.correct, stats.total);
            println!("over: {}", stats.over);
            println!("under: {}", stats.under);
        }
    }

    Ok(())
}
