//! 表形式データセットの前処理、MLP の学習、量子化モデルの評価

mod csv_loader;
mod types;

pub mod dataset;
pub mod error;
pub mod logging;
pub mod ml;
pub mod model;
pub mod pipeline;
pub mod prepare;
pub mod quant;

pub use dataset::load_dataset;
pub use error::{DatasetError, DatasetResult};
pub use logging::init_logging;
pub use model::AppConfig;
pub use pipeline::{run, PipelineOptions};
pub use prepare::prepare_dataset;
pub use types::{LoadedDataset, PreparedSplit};
