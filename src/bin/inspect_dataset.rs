//! エクスポート済み learned-retrieval データセットの統計を表示する

use anyhow::{Context, Result};
use clap::Parser;
use retrieval_trainer_lib::init_logging;
use retrieval_trainer_lib::model::AppConfig;
use retrieval_trainer_lib::prepare::{list_datasets, LearnedRetrievalDataset};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "inspect_dataset")]
#[command(about = "Print summary statistics of exported learned-retrieval datasets", long_about = None)]
struct Cli {
    /// データセット名（省略時はディレクトリ内のすべて）
    names: Vec<String>,

    /// エクスポート先ディレクトリ（省略時は設定の processed_dir）
    #[arg(short, long)]
    dir: Option<PathBuf>,

    /// 設定ファイルのパス
    #[arg(short, long, default_value = "config.json")]
    config: PathBuf,
}

fn main() -> Result<()> {
    init_logging();
    let cli = Cli::parse();
    let dir = match cli.dir {
        Some(dir) => dir,
        None => AppConfig::load_or_default(&cli.config)?.paths.processed_dir,
    };

    let names = if cli.names.is_empty() {
        list_datasets(&dir).with_context(|| format!("Failed to list datasets in {:?}", dir))?
    } else {
        cli.names
    };
    if names.is_empty() {
        println!("✗ データセットが見つかりません: {:?}", dir);
        return Ok(());
    }

    for name in &names {
        let dataset = LearnedRetrievalDataset::open(&dir, name)
            .with_context(|| format!("Failed to open dataset: {}", name))?;
        println!("{}", dataset.stats_line());
    }
    Ok(())
}
