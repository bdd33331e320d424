//! 量子化モデルの書き出しと評価
//!
//! モードごとに学習済みモデルをディスクから読み直して変換・保存し、
//! 保存したファイルを読み戻してテストデータで評価する。

use anyhow::{bail, Context, Result};
use burn::tensor::backend::Backend;
use ndarray::{s, Array2};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::ml::metrics::{binary_to_two_column, top1_accuracy, top_k_accuracy};
use crate::ml::{predict_probabilities, CpuBackend, OutputKind};
use crate::model::{load_record, load_trained, with_suffix, TrainingRecord};
use crate::quant::float_model::{load_float, save_float};
use crate::quant::mode::QuantMode;
use crate::quant::quantization::calibrate_input_ranges;
use crate::quant::quantized_model::QuantizedMlp;

/// 浮動小数点モデルで推論するときのバッチサイズ
const EVAL_BATCH_SIZE: usize = 1024;

/// 書き出しと評価の入力
#[derive(Debug, Clone)]
pub struct ExportJob<'a> {
    /// 拡張子なしの学習済みモデルのパス
    pub model_path: &'a Path,
    /// 先頭 `calibration_rows` 行を int8 の校正に使う
    pub x_train: &'a Array2<f32>,
    pub x_test: &'a Array2<f32>,
    pub y_test: &'a [u32],
    pub calibration_rows: usize,
}

/// 1モードぶんの評価結果
#[derive(Debug, Clone)]
pub struct EvaluationReport {
    pub mode: QuantMode,
    /// top-1 正解率（0〜1）
    pub accuracy: f64,
    /// top-3 正解率（多クラスのみ、0〜1）
    pub top3_accuracy: Option<f64>,
    pub artifact_path: PathBuf,
    pub artifact_bytes: u64,
    pub report_path: PathBuf,
}

impl EvaluationReport {
    /// `model_l=.. model_h=.. quant=.. training_seconds=.. model_params=.. test_accuracy=.. [test_top3_accuracy=..]`
    ///
    /// 正解率はパーセント。
    pub fn report_line(&self, record: &TrainingRecord) -> String {
        let mut line = String::new();
        line.push_str(&format!("model_l={} ", record.model_l));
        line.push_str(&format!("model_h={} ", record.model_h));
        line.push_str(&format!("quant={} ", self.mode));
        line.push_str(&format!("training_seconds={} ", record.training_seconds));
        line.push_str(&format!("model_params={} ", record.model_params));
        line.push_str(&format!("test_accuracy={} ", self.accuracy * 100.0));
        if let Some(top3) = self.top3_accuracy {
            line.push_str(&format!("test_top3_accuracy={}", top3 * 100.0));
        }
        line
    }
}

/// 拡張子なしの成果物パス `{filename}_{mode}`
fn artifact_stem(model_path: &Path, mode: QuantMode) -> PathBuf {
    with_suffix(model_path, &format!("_{}", mode))
}

/// `{filename}_int8.qmodel`、`{filename}_float16.mpk`、`{filename}_float32.mpk`
pub fn artifact_path(model_path: &Path, mode: QuantMode) -> PathBuf {
    with_suffix(&artifact_stem(model_path, mode), &format!(".{}", mode.extension()))
}

/// 成果物のファイル名に `_eval.txt` を付けたもの
pub fn report_path(model_path: &Path, mode: QuantMode) -> PathBuf {
    with_suffix(&artifact_path(model_path, mode), "_eval.txt")
}

/// 学習済みモデルを読み直して1モードぶんの成果物を書き、バイト数を返す
fn export_mode(
    job: &ExportJob<'_>,
    mode: QuantMode,
    device: &<CpuBackend as Backend>::Device,
) -> Result<u64> {
    let (model, record) = load_trained::<CpuBackend>(job.model_path, device)?;
    let path = artifact_path(job.model_path, mode);
    match mode {
        QuantMode::Int8 => {
            let calibration_end = job.calibration_rows.min(job.x_train.nrows());
            let calibration = job.x_train.slice(s![..calibration_end, ..]);
            let ranges = calibrate_input_ranges(&model, calibration, record.num_features, device)?;
            let quantized = QuantizedMlp::convert(&model.dense_layers()?, model.output_kind(), &ranges)
                .with_context(|| format!("Failed to convert model to {}", mode))?;
            quantized.save(&path)
        }
        QuantMode::Float16 | QuantMode::Float32 => {
            save_float(&model, &artifact_stem(job.model_path, mode), mode)?;
            Ok(fs::metadata(&path)
                .with_context(|| format!("Failed to stat artifact: {:?}", path))?
                .len())
        }
    }
}

/// 保存した成果物を読み戻してテストデータの確率を求める
fn predict_artifact(
    job: &ExportJob<'_>,
    record: &TrainingRecord,
    mode: QuantMode,
    device: &<CpuBackend as Backend>::Device,
) -> Result<Vec<f32>> {
    match mode {
        QuantMode::Int8 => QuantizedMlp::load(&artifact_path(job.model_path, mode))?.predict(job.x_test.view()),
        QuantMode::Float16 | QuantMode::Float32 => {
            let model = load_float::<CpuBackend>(
                &record.model_config(),
                &artifact_stem(job.model_path, mode),
                mode,
                device,
            )?;
            predict_probabilities(&model, job.x_test.view(), EVAL_BATCH_SIZE, device)
        }
    }
}

/// 3モードすべてを書き出してから、それぞれを評価してレポートを書く
pub fn export_and_evaluate(job: &ExportJob<'_>) -> Result<Vec<EvaluationReport>> {
    let device = Default::default();

    let mut artifacts = Vec::with_capacity(QuantMode::ALL.len());
    for mode in QuantMode::ALL {
        info!("{} {} quantization {}", "#".repeat(35), mode, "#".repeat(35));
        let bytes = export_mode(job, mode, &device)?;
        artifacts.push((mode, bytes));
    }

    let record = load_record(job.model_path)?;
    if job.x_test.ncols() != record.num_features {
        bail!(
            "Test data has {} columns, model expects {}",
            job.x_test.ncols(),
            record.num_features
        );
    }
    let config = record.model_config();

    let mut reports = Vec::with_capacity(artifacts.len());
    for (mode, bytes) in artifacts {
        let probs = predict_artifact(job, &record, mode, &device)?;
        let (table, columns) = match config.output_kind() {
            OutputKind::Sigmoid => (binary_to_two_column(&probs), 2),
            OutputKind::Softmax => (probs, config.output_units()),
        };

        let accuracy = top1_accuracy(&table, columns, job.y_test);
        let top3_accuracy = (record.num_classes > 2).then(|| top_k_accuracy(&table, columns, job.y_test, 3));
        info!("{} quantization file bytes: {}", mode, bytes);
        info!("{} quantization accuracy: {}", mode, accuracy);

        let report = EvaluationReport {
            mode,
            accuracy,
            top3_accuracy,
            artifact_path: artifact_path(job.model_path, mode),
            artifact_bytes: bytes,
            report_path: report_path(job.model_path, mode),
        };
        fs::write(&report.report_path, report.report_line(&record))
            .with_context(|| format!("Failed to write report: {:?}", report.report_path))?;
        reports.push(report);
    }

    Ok(reports)
}
