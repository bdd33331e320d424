//! 標準化・分割・外部形式への書き出し

pub mod base85;
pub mod export;
pub mod reader;
pub mod split;
pub mod standardize;

pub use export::{export_all, ExportPaths};
pub use reader::{list_datasets, LearnedRetrievalDataset};
pub use split::{stratified_split, StratifiedSplit};
pub use standardize::StandardScaler;

use crate::model::AppConfig;
use crate::types::{LoadedDataset, PreparedSplit};
use anyhow::{Context, Result};
use ndarray::Axis;
use tracing::info;

/// データセットを標準化して分割し、2種類のエクスポートを書き出す
///
/// 標準化は分割前の全行で行い、エクスポートも分割前の全行を対象とする。
pub fn prepare_dataset(name: &str, dataset: &LoadedDataset, config: &AppConfig) -> Result<PreparedSplit> {
    let x = StandardScaler::fit_transform(&dataset.features);

    let split = stratified_split(
        &dataset.labels,
        dataset.num_classes,
        config.split.test_ratio,
        config.split.seed,
    );
    info!(
        "[{}] 学習データ: {} 行, テストデータ: {} 行",
        name,
        split.train.len(),
        split.test.len()
    );

    let out = export_all(&config.paths, name, &x, &dataset.labels, dataset.num_classes)
        .with_context(|| format!("Failed to export dataset {}", name))?;
    info!("[{}] エクスポート: {}", name, out.lr_features.display());
    info!("[{}] エクスポート: {}", name, out.succinct_features.display());

    Ok(PreparedSplit {
        x_train: x.select(Axis(0), &split.train),
        x_test: x.select(Axis(0), &split.test),
        y_train: split.train.iter().map(|&i| dataset.labels[i]).collect(),
        y_test: split.test.iter().map(|&i| dataset.labels[i]).collect(),
        train_indices: split.train,
        test_indices: split.test,
        num_classes: dataset.num_classes,
    })
}
