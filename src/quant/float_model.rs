//! float16 / float32 の書き出しと読み込み
//!
//! burn の NamedMpk 形式をそのまま使う。float16 は半精度で記録し、
//! 読み込み時に f32 のモデルへ戻す。

use anyhow::{bail, Result};
use burn::{
    module::Module,
    record::{FullPrecisionSettings, HalfPrecisionSettings, NamedMpkFileRecorder},
    tensor::backend::Backend,
};
use std::path::Path;

use crate::ml::{MlpClassifier, MlpConfig};
use crate::quant::mode::QuantMode;

/// `stem.mpk` にモードの精度で保存する
pub fn save_float<B: Backend>(model: &MlpClassifier<B>, stem: &Path, mode: QuantMode) -> Result<()> {
    let result = match mode {
        QuantMode::Float16 => model
            .clone()
            .save_file(stem.to_path_buf(), &NamedMpkFileRecorder::<HalfPrecisionSettings>::new()),
        QuantMode::Float32 => model
            .clone()
            .save_file(stem.to_path_buf(), &NamedMpkFileRecorder::<FullPrecisionSettings>::new()),
        QuantMode::Int8 => bail!("int8 models are written as .qmodel"),
    };
    result.map_err(|e| anyhow::anyhow!("{} モデルの保存エラー: {:?}", mode, e))
}

/// `stem.mpk` を読み込み、`config` の形のモデルに戻す
pub fn load_float<B: Backend>(
    config: &MlpConfig,
    stem: &Path,
    mode: QuantMode,
    device: &B::Device,
) -> Result<MlpClassifier<B>> {
    let model = config.init::<B>(device);
    let result = match mode {
        QuantMode::Float16 => model.load_file(
            stem.to_path_buf(),
            &NamedMpkFileRecorder::<HalfPrecisionSettings>::new(),
            device,
        ),
        QuantMode::Float32 => model.load_file(
            stem.to_path_buf(),
            &NamedMpkFileRecorder::<FullPrecisionSettings>::new(),
            device,
        ),
        QuantMode::Int8 => bail!("int8 models are read as .qmodel"),
    };
    result.map_err(|e| anyhow::anyhow!("{} モデルの読み込みエラー: {:?}", mode, e))
}
