pub mod config;
pub mod model_metadata;
pub mod model_storage;

pub use config::{
    AppConfig, DeviceType, ExportSettings, LayerShape, PathSettings, SplitSettings, SyntheticSettings,
    TrainingSettings,
};
pub use model_metadata::{TrainingHistory, TrainingRecord};
pub use model_storage::{load_record, load_trained, model_filename, save_trained, with_suffix};
