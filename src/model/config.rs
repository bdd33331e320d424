//! パイプライン設定管理モジュール
//!
//! 計算デバイス、入出力ディレクトリ、学習パラメータなどをJSON形式で保存・読み込みします。

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// 計算デバイスの種類
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum DeviceType {
    /// NdArray (CPU) バックエンド
    Cpu,
    /// WGPU (GPU) バックエンド（`wgpu` フィーチャが必要）
    Wgpu,
}

impl Default for DeviceType {
    fn default() -> Self {
        DeviceType::Cpu
    }
}

impl std::fmt::Display for DeviceType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DeviceType::Wgpu => write!(f, "WGPU (GPU)"),
            DeviceType::Cpu => write!(f, "CPU (NdArray)"),
        }
    }
}

/// 入出力ディレクトリ
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathSettings {
    /// 生データ（CSV）の置き場所
    pub data_dir: PathBuf,
    /// learned-retrieval 形式の出力先
    pub processed_dir: PathBuf,
    /// succinct-index 形式の出力先（processed_dir からの相対）
    pub succinct_subdir: String,
    /// 学習済みモデルの出力先
    pub models_dir: PathBuf,
}

impl Default for PathSettings {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            processed_dir: PathBuf::from("processed_data"),
            succinct_subdir: "data_sux4j".to_string(),
            models_dir: PathBuf::from("models"),
        }
    }
}

impl PathSettings {
    pub fn succinct_dir(&self) -> PathBuf {
        self.processed_dir.join(&self.succinct_subdir)
    }

    /// データセットごとのモデル出力ディレクトリ
    pub fn model_dir(&self, dataset_name: &str) -> PathBuf {
        self.models_dir.join(format!("{}_models", dataset_name))
    }
}

/// 隠れ層の形状 (depth, width)
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct LayerShape {
    /// 隠れ層の数
    pub depth: usize,
    /// 各隠れ層のユニット数
    pub width: usize,
}

impl LayerShape {
    pub const fn new(depth: usize, width: usize) -> Self {
        Self { depth, width }
    }
}

/// トレーニング設定
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainingSettings {
    /// 最大エポック数
    pub num_epochs: usize,
    /// バッチサイズ
    pub batch_size: usize,
    /// ワーカー数
    pub num_workers: usize,
    /// 学習率
    pub learning_rate: f64,
    /// ランダムシード
    pub seed: u64,
    /// 検証用に末尾から切り出す割合
    pub validation_split: f64,
    /// 早期終了までの猶予エポック数
    pub patience: usize,
    /// 改善とみなす最小の差
    pub min_delta: f64,
}

impl Default for TrainingSettings {
    fn default() -> Self {
        Self {
            num_epochs: 200,
            batch_size: 128,
            num_workers: 1,
            learning_rate: 1e-3,
            seed: 42,
            validation_split: 0.1,
            patience: 10,
            min_delta: 1e-5,
        }
    }
}

/// 学習/テスト分割の設定
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SplitSettings {
    /// テストデータの割合
    pub test_ratio: f64,
    /// ランダムシード
    pub seed: u64,
}

impl Default for SplitSettings {
    fn default() -> Self {
        Self {
            test_ratio: 0.2,
            seed: 42,
        }
    }
}

/// 合成ガウスデータの設定
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyntheticSettings {
    /// 全クラス合計のサンプル数
    pub samples: usize,
    /// クラス数
    pub classes: usize,
    /// 隣接クラスの平均値の間隔
    pub distance: f64,
    /// `gaussianN` の N で選ばれる標準偏差
    pub sigmas: Vec<f64>,
    /// ランダムシード
    pub seed: u64,
}

impl Default for SyntheticSettings {
    fn default() -> Self {
        Self {
            samples: 100_000_000,
            classes: 8,
            distance: 2.0,
            sigmas: vec![0.25, 0.5, 0.75, 1.0],
            seed: 42,
        }
    }
}

/// 量子化エクスポートの設定
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportSettings {
    /// int8 のキャリブレーションに使う学習データの先頭行数
    pub calibration_rows: usize,
}

impl Default for ExportSettings {
    fn default() -> Self {
        Self {
            calibration_rows: 1000,
        }
    }
}

/// パイプライン設定
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// 計算デバイスの種類
    #[serde(default)]
    pub device_type: DeviceType,
    /// 処理するデータセット名
    pub datasets: Vec<String>,
    /// 学習するモデル形状
    pub layer_shapes: Vec<LayerShape>,
    /// 合成データでも学習するか
    #[serde(default)]
    pub train_synthetic: bool,
    #[serde(default)]
    pub paths: PathSettings,
    #[serde(default)]
    pub split: SplitSettings,
    #[serde(default)]
    pub training: TrainingSettings,
    #[serde(default)]
    pub synthetic: SyntheticSettings,
    #[serde(default)]
    pub export: ExportSettings,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            device_type: DeviceType::default(),
            datasets: [
                "songs",
                "covertype",
                "nids",
                "urls",
                "gaussian0",
                "gaussian1",
                "gaussian2",
                "gaussian3",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
            layer_shapes: vec![
                LayerShape::new(0, 0),
                LayerShape::new(1, 50),
                LayerShape::new(1, 100),
                LayerShape::new(2, 50),
            ],
            train_synthetic: false,
            paths: PathSettings::default(),
            split: SplitSettings::default(),
            training: TrainingSettings::default(),
            synthetic: SyntheticSettings::default(),
            export: ExportSettings::default(),
        }
    }
}

impl AppConfig {
    /// 設定を読み込む
    pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let content = fs::read_to_string(path)?;
        let config: AppConfig = serde_json::from_str(&content)?;
        Ok(config)
    }

    /// 指定パスから設定を読み込む、存在しない場合はデフォルト設定を返す
    ///
    /// ファイルはあるが読めない場合はエラー。
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        if path.exists() {
            let config = Self::load(path)?;
            tracing::info!("設定ファイルを読み込みました: {}", path.display());
            Ok(config)
        } else {
            tracing::info!("設定ファイルが存在しません。デフォルト設定を使用します");
            Ok(Self::default())
        }
    }

    /// 設定を保存する
    pub fn save<P: AsRef<Path>>(&self, path: P) -> anyhow::Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }

    /// 設定情報を表示
    pub fn display(&self) {
        tracing::info!("=== パイプライン設定 ===");
        tracing::info!("計算デバイス: {}", self.device_type);
        tracing::info!("データセット: {}", self.datasets.join(", "));
        tracing::info!(
            "モデル形状: {}",
            self.layer_shapes
                .iter()
                .map(|s| format!("L{}H{}", s.depth, s.width))
                .collect::<Vec<_>>()
                .join(", ")
        );
        tracing::info!("データ: {}", self.paths.data_dir.display());
        tracing::info!("出力: {}", self.paths.processed_dir.display());
        tracing::info!("モデル: {}", self.paths.models_dir.display());
        tracing::info!(
            "エポック数: {}, バッチサイズ: {}, 学習率: {}, シード: {}",
            self.training.num_epochs,
            self.training.batch_size,
            self.training.learning_rate,
            self.training.seed
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.device_type, DeviceType::Cpu);
        assert_eq!(config.datasets.len(), 8);
        assert_eq!(config.training.num_epochs, 200);
        assert_eq!(config.training.batch_size, 128);
        assert_eq!(config.layer_shapes[0], LayerShape::new(0, 0));
        assert_eq!(config.export.calibration_rows, 1000);
    }

    #[test]
    fn test_serialize_deserialize() {
        let config = AppConfig::default();
        let json = serde_json::to_string(&config).unwrap();
        let deserialized: AppConfig = serde_json::from_str(&json).unwrap();

        assert_eq!(config.device_type, deserialized.device_type);
        assert_eq!(config.layer_shapes, deserialized.layer_shapes);
        assert_eq!(config.synthetic.sigmas, deserialized.synthetic.sigmas);
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let json = r#"{"datasets": ["urls"], "layer_shapes": [{"depth": 1, "width": 8}]}"#;
        let config: AppConfig = serde_json::from_str(json).unwrap();

        assert_eq!(config.datasets, vec!["urls".to_string()]);
        assert_eq!(config.paths.succinct_subdir, "data_sux4j");
        assert_eq!(config.split.seed, 42);
    }

    #[test]
    fn test_model_dir() {
        let paths = PathSettings::default();
        assert_eq!(paths.model_dir("songs"), PathBuf::from("models/songs_models"));
        assert_eq!(
            paths.succinct_dir(),
            PathBuf::from("processed_data/data_sux4j")
        );
    }

    #[test]
    fn test_missing_file_falls_back_to_default() {
        let dir = tempfile::tempdir().unwrap();
        let config = AppConfig::load_or_default(dir.path().join("none.json")).unwrap();
        assert_eq!(config.datasets.len(), 8);
    }

    #[test]
    fn test_device_type_display() {
        assert_eq!(format!("{}", DeviceType::Wgpu), "WGPU (GPU)");
        assert_eq!(format!("{}", DeviceType::Cpu), "CPU (NdArray)");
    }
}
