pub mod download;
pub mod encoding;
pub mod source;
pub mod stats;
pub mod synthetic;

pub use source::DatasetSource;
pub use stats::{entropy_bits, label_counts, DatasetSummary};

use crate::error::DatasetResult;
use crate::model::AppConfig;
use crate::types::LoadedDataset;
use tracing::info;

/// 名前を解決してデータセットを読み込み、要約統計をログに出す
///
/// 名前の検証はファイルに触れる前に行う。
pub fn load_dataset(name: &str, config: &AppConfig) -> DatasetResult<LoadedDataset> {
    let source: DatasetSource = name.parse()?;
    let dataset = source.load(name, config)?;

    let summary = DatasetSummary::new(
        name,
        &dataset.labels,
        dataset.num_features(),
        dataset.num_classes,
    );
    for line in summary.to_string().lines() {
        info!("{}", line);
    }
    for (class, count) in summary.distribution() {
        info!("  label {}: {}", class, count);
    }

    Ok(dataset)
}
