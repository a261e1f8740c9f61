//! 分類器の学習モジュール
//!
//! このモジュールは、素性抽出済みのコーパスから平均化パーセプトロンによる分類器を学習します。
//! 学習した分類器はzstd圧縮したバイナリ形式で保存され、`evaluate` コマンドで評価できます。

use std::fs::File;
use std::io;
use std::path::PathBuf;

use cellprune::classifier::{BiasTarget, BinaryTrainer, FeatureCorpus, MulticlassTrainer};
use cellprune::errors::CellpruneError;
use cellprune::perceptron::{Bins, DifferenceLoss, OverUnderLoss, ZeroOneLoss};

use clap::{Parser, ValueEnum};
use thiserror::Error;

/// 分類器の種類
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Kind {
    /// 二値分類器（完全閉包の予測など）
    Binary,
    /// 多クラス分類器（品詞、ビーム幅の予測など）
    Multiclass,
}

/// 多クラス分類の損失関数
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Loss {
    /// 誤分類に一律の損失
    ZeroOne,
    /// クラス番号の差
    Difference,
    /// 過大予測と過小予測で異なる損失
    OverUnder,
}

/// 学習コマンドの引数
#[derive(Parser, Debug)]
#[clap(name = "train", about = "Averaged-perceptron classifier trainer")]
pub struct Args {
    /// Feature corpus to be trained. Each line is `gold<TAB>features` and sentences end with `EOS`.
    #[clap(short = 't', long)]
    train_in: PathBuf,

    /// Development feature corpus used for per-iteration evaluation and the bias search.
    #[clap(short = 'd', long)]
    dev_in: Option<PathBuf>,

    /// A file to which the classifier is output. The file is compressed by zstd.
    #[clap(short = 'o', long)]
    model_out: PathBuf,

    /// Kind of the classifier.
    #[clap(long, value_enum, default_value = "multiclass")]
    kind: Kind,

    /// Number of passes over the training corpus.
    #[clap(long, default_value = "10")]
    iterations: usize,

    /// Learning rate.
    #[clap(long, default_value = "1.0")]
    learning_rate: f32,

    /// Comma-separated bin boundaries that discretize gold values into classes (multiclass only).
    #[clap(long)]
    bins: Option<Bins>,

    /// Loss function (multiclass only).
    #[clap(long, value_enum, default_value = "zero-one")]
    loss: Loss,

    /// Penalty for predicting a larger class than the gold one (with `--loss over-under`).
    #[clap(long, default_value = "1.0")]
    over_penalty: f32,

    /// Penalty for predicting a smaller class than the gold one (with `--loss over-under`).
    #[clap(long, default_value = "1.0")]
    under_penalty: f32,

    /// Target precision on the development corpus for the bias search (binary only).
    #[clap(long, conflicts_with = "target_negative_recall")]
    target_precision: Option<f32>,

    /// Target negative-class recall on the development corpus for the bias search (binary only).
    #[clap(long)]
    target_negative_recall: Option<f32>,

    /// A file to which the weights are exported in text.
    #[clap(long)]
    export: Option<PathBuf>,
}

/// 学習処理中に発生する可能性のあるエラー
#[derive(Debug, Error)]
pub enum TrainError {
    /// 不正な引数の組み合わせ
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// 入出力エラー
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// 学習処理エラー
    #[error("Training process failed: {0}")]
    Cellprune(#[from] CellpruneError),
}

fn check_args(args: &Args) -> Result<(), TrainError> {
    if args.iterations == 0 {
        return Err(TrainError::InvalidArgument(
            "--iterations must be at least 1".to_string(),
        ));
    }
    if args.learning_rate <= 0.0 {
        return Err(TrainError::InvalidArgument(
            "--learning-rate must be positive".to_string(),
        ));
    }
    if args.over_penalty < 0.0 || args.under_penalty < 0.0 {
        return Err(TrainError::InvalidArgument(
            "penalties must not be negative".to_string(),
        ));
    }
    match args.kind {
        Kind::Binary if args.bins.is_some() => Err(TrainError::InvalidArgument(
            "--bins is only valid for multiclass classifiers".to_string(),
        )),
        Kind::Multiclass
            if args.target_precision.is_some() || args.target_negative_recall.is_some() =>
        {
            Err(TrainError::InvalidArgument(
                "bias targets are only valid for binary classifiers".to_string(),
            ))
        }
        _ => Ok(()),
    }
}

fn bias_target(args: &Args) -> Result<Option<BiasTarget>, TrainError> {
    let target = match (args.target_precision, args.target_negative_recall) {
        (Some(p), _) => Some(BiasTarget::Precision(p)),
        (None, Some(r)) => Some(BiasTarget::NegativeRecall(r)),
        (None, None) => None,
    };
    if let Some(t) = target
        && !(t.value() > 0.0 && t.value() <= 1.0)
    {
        return Err(TrainError::InvalidArgument(
            "bias targets must be in (0, 1]".to_string(),
        ));
    }
    Ok(target)
}

/// 学習コマンドを実行する
///
/// 素性コーパスから分類器を学習し、zstd圧縮して保存します。
///
/// # エラー
///
/// 引数が不正な場合や、ファイルの読み書き、学習処理に失敗した場合、`TrainError`を返します。
pub fn run(args: Args) -> Result<(), TrainError> {
    check_args(&args)?;
    let target = bias_target(&args)?;

    println!("Loading the training corpus...");
    let train = FeatureCorpus::from_reader(File::open(&args.train_in)?)?;
    let dev = match &args.dev_in {
        Some(path) => {
            println!("Loading the development corpus...");
            Some(FeatureCorpus::from_reader_with_length(
                File::open(path)?,
                train.vector_length(),
            )?)
        }
        None => None,
    };
    let dev_sentences = dev.as_ref().map(|d| d.sentences()).unwrap_or_default();
    println!(
        "{} training positions, {} development positions, {} features",
        train.num_positions(),
        dev.as_ref().map_or(0, |d| d.num_positions()),
        train.vector_length()
    );

    println!("Starting classifier training...");
    let file = File::create(&args.model_out)?;
    let mut encoder = zstd::Encoder::new(file, 19)?;
    match args.kind {
        Kind::Binary => {
            let mut trainer = BinaryTrainer::new(train.extractor())
                .iterations(args.iterations)
                .learning_rate(args.learning_rate);
            if let Some(target) = target {
                trainer = trainer.bias_target(target);
            }
            let classifier = trainer.train(train.sentences(), dev_sentences)?;
            if let Some(dev) = &dev {
                println!("dev: {}", classifier.evaluate(&dev.extractor(), dev.sentences()));
            }
            classifier.write(&mut encoder)?;
            if let Some(path) = &args.export {
                classifier.export(File::create(path)?)?;
            }
        }
        Kind::Multiclass => {
            let mut trainer = MulticlassTrainer::new(train.extractor())
                .iterations(args.iterations)
                .learning_rate(args.learning_rate);
            trainer = match args.loss {
                Loss::ZeroOne => trainer.loss(ZeroOneLoss),
                Loss::Difference => trainer.loss(DifferenceLoss),
                Loss::OverUnder => {
                    trainer.loss(OverUnderLoss::new(args.over_penalty, args.under_penalty))
                }
            };
            if let Some(bins) = args.bins.clone() {
                trainer = trainer.bins(bins);
            }
            let classifier = trainer.train(train.sentences(), dev_sentences)?;
            if let Some(dev) = &dev {
                println!("dev: {}", classifier.evaluate(&dev.extractor(), dev.sentences()));
            }
            classifier.write(&mut encoder)?;
            if let Some(path) = &args.export {
                classifier.export(File::create(path)?)?;
            }
        }
    }
    encoder.finish()?;

    println!("Successfully wrote the classifier to {}", args.model_out.display());
    Ok(())
}
