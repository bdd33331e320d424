//! モデルとメタデータの永続化
//!
//! 1つのモデルは同じ名前の2ファイルで保存する:
//! - `{filename}.mpk`  - モデルの重み（burn の NamedMpk、f32 精度）
//! - `{filename}.json` - 学習結果のメタデータ

use anyhow::{Context, Result};
use burn::{
    module::Module,
    record::{FullPrecisionSettings, NamedMpkFileRecorder},
    tensor::backend::Backend,
};
use chrono::{DateTime, Local};
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};

use crate::ml::MlpClassifier;
use crate::model::config::LayerShape;
use crate::model::model_metadata::TrainingRecord;

/// `{dataset}_mlp_L{depth}_H{width}_{YYYYmmdd-HHMMSS}`
pub fn model_filename(dataset_name: &str, shape: LayerShape, at: DateTime<Local>) -> String {
    format!(
        "{}_mlp_L{}_H{}_{}",
        dataset_name,
        shape.depth,
        shape.width,
        at.format("%Y%m%d-%H%M%S")
    )
}

/// 拡張子を置き換えずに末尾へ付け足す
pub fn with_suffix(stem: &Path, suffix: &str) -> PathBuf {
    let mut name = OsString::from(stem.as_os_str());
    name.push(suffix);
    PathBuf::from(name)
}

/// モデルの重みとメタデータを保存
///
/// `stem` は拡張子なしのパス。
pub fn save_trained<B: Backend>(
    model: &MlpClassifier<B>,
    record: &TrainingRecord,
    stem: &Path,
) -> Result<()> {
    // 親ディレクトリが存在しない場合は作成
    if let Some(parent) = stem.parent() {
        fs::create_dir_all(parent)
            .context(format!("Failed to create parent directory: {:?}", parent))?;
    }

    // f32 精度で保存（量子化の比較元になるため）
    model
        .clone()
        .save_file(stem.to_path_buf(), &NamedMpkFileRecorder::<FullPrecisionSettings>::new())
        .context(format!("Failed to save model weights: {:?}", stem))?;

    let json_path = with_suffix(stem, ".json");
    fs::write(&json_path, record.to_json_string()?)
        .context(format!("Failed to write training record: {:?}", json_path))?;

    Ok(())
}

/// メタデータのみを読み込む
pub fn load_record(stem: &Path) -> Result<TrainingRecord> {
    let json_path = with_suffix(stem, ".json");
    let json = fs::read_to_string(&json_path)
        .context(format!("Failed to open training record: {:?}", json_path))?;
    TrainingRecord::from_json_string(&json)
}

/// メタデータからモデルを組み立て、重みを読み込む
pub fn load_trained<B: Backend>(
    stem: &Path,
    device: &B::Device,
) -> Result<(MlpClassifier<B>, TrainingRecord)> {
    let record = load_record(stem)?;
    let mpk_path = with_suffix(stem, ".mpk");
    if !mpk_path.exists() {
        anyhow::bail!("Model weights not found: {:?}", mpk_path);
    }

    let model = record
        .model_config()
        .init::<B>(device)
        .load_file(stem.to_path_buf(), &NamedMpkFileRecorder::<FullPrecisionSettings>::new(), device)
        .map_err(|e| anyhow::anyhow!("モデル重みの読み込みエラー: {:?}", e))?;

    Ok((model, record))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ml::MlpConfig;
    use crate::model::model_metadata::TrainingHistory;
    use burn::backend::NdArray;
    use chrono::TimeZone;

    #[test]
    fn test_model_filename_format() {
        let at = Local.with_ymd_and_hms(2024, 3, 9, 7, 5, 1).unwrap();
        assert_eq!(
            model_filename("songs", LayerShape::new(2, 50), at),
            "songs_mlp_L2_H50_20240309-070501"
        );
    }

    #[test]
    fn test_with_suffix_keeps_full_name() {
        let stem = Path::new("models/urls_models/urls_mlp_L0_H0_20240101-000000");
        assert_eq!(
            with_suffix(stem, "_int8.qmodel"),
            PathBuf::from("models/urls_models/urls_mlp_L0_H0_20240101-000000_int8.qmodel")
        );
    }

    #[test]
    fn test_save_and_load_restores_weights() {
        let dir = tempfile::tempdir().unwrap();
        let stem = dir.path().join("nested").join("toy_mlp_L1_H4_20240101-000000");
        let device = Default::default();

        let config = MlpConfig::new(3, 4, 1, 4);
        let model = config.init::<NdArray>(&device);
        let record = TrainingRecord::new(TrainingHistory::new(), 0.5, model.num_params(), &config);
        save_trained(&model, &record, &stem).unwrap();

        assert!(with_suffix(&stem, ".mpk").exists());
        assert!(with_suffix(&stem, ".json").exists());

        let (loaded, loaded_record) = load_trained::<NdArray>(&stem, &device).unwrap();
        assert_eq!(loaded_record, record);
        assert_eq!(loaded.dense_layers().unwrap(), model.dense_layers().unwrap());
    }

    #[test]
    fn test_missing_weights_is_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(load_trained::<NdArray>(&dir.path().join("absent"), &Default::default()).is_err());
    }
}
