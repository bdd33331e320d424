use clap::Parser;
use retrieval_trainer_lib::model::AppConfig;
use retrieval_trainer_lib::{init_logging, run, PipelineOptions};
use std::path::PathBuf;

/// データセットの前処理・学習・量子化評価をまとめて実行する
#[derive(Parser, Debug)]
#[command(name = "retrieval_trainer")]
#[command(version)]
#[command(about = "Prepare tabular datasets, train MLPs and evaluate quantized exports", long_about = None)]
struct Cli {
    /// 設定ファイルのパス（無ければデフォルト設定）
    #[arg(short, long, default_value = "config.json")]
    config: PathBuf,

    /// 処理するデータセット（複数指定可、設定ファイルの値を上書き）
    #[arg(short, long = "dataset")]
    datasets: Vec<String>,

    /// エクスポートまでで止める
    #[arg(long)]
    prepare_only: bool,

    /// 実際に使う設定を `--config` のパスへ書き出して終了する
    #[arg(long)]
    write_config: bool,
}

fn main() -> anyhow::Result<()> {
    init_logging();
    let cli = Cli::parse();

    let mut config = AppConfig::load_or_default(&cli.config)?;
    if !cli.datasets.is_empty() {
        config.datasets = cli.datasets;
    }
    if cli.write_config {
        config.save(&cli.config)?;
        tracing::info!("設定ファイルを書き出しました: {}", cli.config.display());
        return Ok(());
    }

    let options = PipelineOptions {
        prepare_only: cli.prepare_only,
    };
    run(&config, &options)?;
    Ok(())
}
