pub mod early_stopping;
pub mod metrics;
pub mod ml_model;
pub mod training;

pub use early_stopping::{EarlyStopping, EarlyStoppingDecision};
pub use ml_model::{DenseLayer, MlpClassifier, MlpConfig, OutputKind};
pub use training::{evaluate, predict_probabilities, train, EpochMetrics, TrainedModel, TrainingJob};

/// CPU バックエンド
pub type CpuBackend = burn::backend::NdArray;

/// GPU バックエンド
#[cfg(feature = "wgpu")]
pub type GpuBackend = burn::backend::Wgpu;
