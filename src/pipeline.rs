//! データセットごとの処理の流れ
//!
//! 読み込み → 標準化・分割・エクスポート → 形状ごとの学習 → 量子化と評価。
//! どこかで失敗したら実行全体を止める。

use anyhow::Result;
use burn::backend::Autodiff;
use burn::tensor::backend::AutodiffBackend;
use tracing::info;

use crate::dataset::{load_dataset, DatasetSource};
use crate::ml::{train, CpuBackend, TrainingJob};
use crate::model::{AppConfig, DeviceType};
use crate::prepare::prepare_dataset;
use crate::quant::{export_and_evaluate, EvaluationReport, ExportJob};

/// 実行オプション
#[derive(Debug, Clone, Default)]
pub struct PipelineOptions {
    /// エクスポートまでで止める
    pub prepare_only: bool,
}

/// 設定のデバイスでパイプラインを実行する
pub fn run(config: &AppConfig, options: &PipelineOptions) -> Result<Vec<EvaluationReport>> {
    config.display();
    match config.device_type {
        DeviceType::Cpu => run_with::<Autodiff<CpuBackend>>(config, options, &Default::default()),
        DeviceType::Wgpu => run_on_gpu(config, options),
    }
}

#[cfg(feature = "wgpu")]
fn run_on_gpu(config: &AppConfig, options: &PipelineOptions) -> Result<Vec<EvaluationReport>> {
    run_with::<Autodiff<crate::ml::GpuBackend>>(config, options, &Default::default())
}

#[cfg(not(feature = "wgpu"))]
fn run_on_gpu(_config: &AppConfig, _options: &PipelineOptions) -> Result<Vec<EvaluationReport>> {
    anyhow::bail!("WGPU device requested but this build does not enable the `wgpu` feature")
}

/// 設定されたデータセットを順に処理する
pub fn run_with<B: AutodiffBackend>(
    config: &AppConfig,
    options: &PipelineOptions,
    device: &B::Device,
) -> Result<Vec<EvaluationReport>> {
    let mut reports = Vec::new();
    for name in &config.datasets {
        reports.extend(process_dataset::<B>(name, config, options, device)?);
    }
    info!("全データセットの処理が完了しました: レポート {} 件", reports.len());
    Ok(reports)
}

/// 1データセットぶんの処理
pub fn process_dataset<B: AutodiffBackend>(
    name: &str,
    config: &AppConfig,
    options: &PipelineOptions,
    device: &B::Device,
) -> Result<Vec<EvaluationReport>> {
    info!("Processing dataset: {}", name);
    let source: DatasetSource = name.parse()?;
    let dataset = load_dataset(name, config)?;
    let split = prepare_dataset(name, &dataset, config)?;

    if options.prepare_only {
        return Ok(Vec::new());
    }
    if source.is_synthetic() && !config.train_synthetic {
        info!("[{}] 合成データのため学習をスキップします", name);
        return Ok(Vec::new());
    }

    let mut reports = Vec::new();
    for &shape in &config.layer_shapes {
        info!(
            "Training model with {} layers and {} hidden units on {}",
            shape.depth, shape.width, name
        );
        let job = TrainingJob {
            dataset_name: name,
            shape,
            x_train: &split.x_train,
            y_train: &split.y_train,
            num_classes: split.num_classes,
            output_dir: config.paths.model_dir(name),
        };
        let trained = train::<B>(&job, &config.training, device)?;
        trained.record.log_info();

        let export = ExportJob {
            model_path: &trained.model_path,
            x_train: &split.x_train,
            x_test: &split.x_test,
            y_test: &split.y_test,
            calibration_rows: config.export.calibration_rows,
        };
        reports.extend(export_and_evaluate(&export)?);
    }
    Ok(reports)
}
