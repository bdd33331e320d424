//! モデル学習
//!
//! 学習データの末尾 `validation_split` を検証用に取り分け、検証精度で早期終了する。
//! 最良エポックの重みを復元してから保存する。

use anyhow::{Context, Result};
use burn::{
    data::{
        dataloader::{batcher::Batcher, DataLoaderBuilder},
        dataset::Dataset,
    },
    module::{AutodiffModule, Module},
    optim::{AdamConfig, GradientsParams, Optimizer},
    tensor::{
        backend::{AutodiffBackend, Backend},
        ElementConversion, Int, Tensor,
    },
};
use ndarray::{s, Array2, ArrayView2};
use std::path::PathBuf;
use std::time::Instant;
use tracing::info;

use crate::ml::early_stopping::{EarlyStopping, EarlyStoppingDecision};
use crate::ml::metrics::{binary_accuracy, top1_accuracy, top_k_accuracy};
use crate::ml::{MlpClassifier, MlpConfig, OutputKind};
use crate::model::{model_filename, save_trained, LayerShape, TrainingHistory, TrainingRecord, TrainingSettings};

/// 学習データセット（行列の1行が1サンプル）
pub struct TabularDataset {
    features: Array2<f32>,
    labels: Vec<u32>,
}

impl TabularDataset {
    pub fn new(features: Array2<f32>, labels: Vec<u32>) -> Self {
        Self { features, labels }
    }
}

/// データセットアイテム
#[derive(Clone, Debug)]
pub struct TabularItem {
    pub features: Vec<f32>,
    pub label: u32,
}

impl Dataset<TabularItem> for TabularDataset {
    fn get(&self, index: usize) -> Option<TabularItem> {
        let label = *self.labels.get(index)?;
        Some(TabularItem {
            features: self.features.row(index).to_vec(),
            label,
        })
    }

    fn len(&self) -> usize {
        self.labels.len()
    }
}

/// バッチャー
#[derive(Clone)]
pub struct TabularBatcher<B: Backend> {
    device: B::Device,
}

impl<B: Backend> TabularBatcher<B> {
    pub fn new(device: B::Device) -> Self {
        Self { device }
    }
}

/// バッチデータ
#[derive(Clone, Debug)]
pub struct TabularBatch<B: Backend> {
    pub features: Tensor<B, 2>,
    pub targets: Tensor<B, 1, Int>,
    /// 指標計算用にホスト側にも残す
    pub labels: Vec<u32>,
}

impl<B: Backend> Batcher<B, TabularItem, TabularBatch<B>> for TabularBatcher<B> {
    fn batch(&self, items: Vec<TabularItem>, _device: &B::Device) -> TabularBatch<B> {
        let batch_size = items.len();
        let num_features = items.first().map(|item| item.features.len()).unwrap_or(0);
        let mut values = Vec::with_capacity(batch_size * num_features);
        let mut labels = Vec::with_capacity(batch_size);

        for item in items {
            values.extend_from_slice(&item.features);
            labels.push(item.label);
        }

        TabularBatch {
            features: features_tensor(&values, batch_size, num_features, &self.device),
            targets: targets_tensor(&labels, &self.device),
            labels,
        }
    }
}

fn features_tensor<B: Backend>(values: &[f32], rows: usize, cols: usize, device: &B::Device) -> Tensor<B, 2> {
    Tensor::<B, 1>::from_floats(values, device).reshape([rows, cols])
}

fn targets_tensor<B: Backend>(labels: &[u32], device: &B::Device) -> Tensor<B, 1, Int> {
    let targets: Vec<i64> = labels.iter().map(|&l| l as i64).collect();
    Tensor::<B, 1, Int>::from_ints(targets.as_slice(), device)
}

/// 1回の学習に必要な入力
#[derive(Debug, Clone)]
pub struct TrainingJob<'a> {
    pub dataset_name: &'a str,
    pub shape: LayerShape,
    pub x_train: &'a Array2<f32>,
    pub y_train: &'a [u32],
    pub num_classes: usize,
    /// `{models_dir}/{dataset}_models`
    pub output_dir: PathBuf,
}

/// 学習済みモデル（最良エポックの重み）
#[derive(Debug)]
pub struct TrainedModel<B: Backend> {
    pub model: MlpClassifier<B>,
    pub record: TrainingRecord,
    /// 拡張子なしの保存先
    pub model_path: PathBuf,
}

/// 1エポックぶんの指標
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EpochMetrics {
    pub loss: f64,
    pub accuracy: f64,
    /// 多クラスのみ
    pub top3_accuracy: Option<f64>,
}

/// 履歴に使う指標名（正解率, top-3）
pub fn metric_names(kind: OutputKind) -> (&'static str, Option<&'static str>) {
    match kind {
        OutputKind::Softmax => ("sparse_categorical_accuracy", Some("sparse_top_3_accuracy")),
        OutputKind::Sigmoid => ("binary_accuracy", None),
    }
}

fn push_history(history: &mut TrainingHistory, prefix: &str, kind: OutputKind, metrics: &EpochMetrics) {
    let (accuracy_key, top3_key) = metric_names(kind);
    let mut push = |key: &str, value: f64| {
        history.entry(format!("{}{}", prefix, key)).or_default().push(value);
    };
    push("loss", metrics.loss);
    push(accuracy_key, metrics.accuracy);
    if let (Some(key), Some(value)) = (top3_key, metrics.top3_accuracy) {
        push(key, value);
    }
}

/// バッチごとの指標をサンプル数で重み付けして集計する
#[derive(Debug)]
struct MetricAccumulator {
    kind: OutputKind,
    samples: usize,
    loss_sum: f64,
    accuracy_sum: f64,
    top3_sum: f64,
}

impl MetricAccumulator {
    fn new(kind: OutputKind) -> Self {
        Self {
            kind,
            samples: 0,
            loss_sum: 0.0,
            accuracy_sum: 0.0,
            top3_sum: 0.0,
        }
    }

    fn add(&mut self, loss: f64, probs: &[f32], labels: &[u32]) {
        let n = labels.len();
        if n == 0 {
            return;
        }
        let weight = n as f64;
        self.samples += n;
        self.loss_sum += loss * weight;
        match self.kind {
            OutputKind::Softmax => {
                let columns = probs.len() / n;
                self.accuracy_sum += top1_accuracy(probs, columns, labels) * weight;
                self.top3_sum += top_k_accuracy(probs, columns, labels, 3) * weight;
            }
            OutputKind::Sigmoid => {
                self.accuracy_sum += binary_accuracy(probs, labels) * weight;
            }
        }
    }

    fn finish(&self) -> EpochMetrics {
        let n = self.samples.max(1) as f64;
        EpochMetrics {
            loss: self.loss_sum / n,
            accuracy: self.accuracy_sum / n,
            top3_accuracy: match self.kind {
                OutputKind::Softmax => Some(self.top3_sum / n),
                OutputKind::Sigmoid => None,
            },
        }
    }
}

fn to_host(tensor: Tensor<impl Backend, 2>) -> Result<Vec<f32>> {
    tensor
        .into_data()
        .convert::<f32>()
        .to_vec::<f32>()
        .map_err(|e| anyhow::anyhow!("推論結果の取得エラー: {:?}", e))
}

/// 行列をバッチに分けて確率を求める（行優先 `[rows, output_units]`）
pub fn predict_probabilities<B: Backend>(
    model: &MlpClassifier<B>,
    x: ArrayView2<f32>,
    batch_size: usize,
    device: &B::Device,
) -> Result<Vec<f32>> {
    let mut probs = Vec::new();
    let mut start = 0;
    while start < x.nrows() {
        let end = (start + batch_size.max(1)).min(x.nrows());
        let chunk = x.slice(s![start..end, ..]);
        let values: Vec<f32> = chunk.iter().copied().collect();
        let features = features_tensor::<B>(&values, end - start, x.ncols(), device);
        probs.extend(to_host(model.probabilities(features))?);
        start = end;
    }
    Ok(probs)
}

/// 損失と正解率を求める（勾配なし）
pub fn evaluate<B: Backend>(
    model: &MlpClassifier<B>,
    x: ArrayView2<f32>,
    labels: &[u32],
    batch_size: usize,
    device: &B::Device,
) -> Result<EpochMetrics> {
    let mut acc = MetricAccumulator::new(model.output_kind());
    let mut start = 0;
    while start < x.nrows() {
        let end = (start + batch_size.max(1)).min(x.nrows());
        let chunk = x.slice(s![start..end, ..]);
        let values: Vec<f32> = chunk.iter().copied().collect();
        let features = features_tensor::<B>(&values, end - start, x.ncols(), device);
        let batch_labels = &labels[start..end];

        let logits = model.forward(features);
        let loss = model.loss(logits.clone(), targets_tensor::<B>(batch_labels, device));
        let probs = to_host(model.activate(logits))?;
        acc.add(loss.into_scalar().elem::<f64>(), &probs, batch_labels);
        start = end;
    }
    Ok(acc.finish())
}

/// 検証用に切り出す境界（先頭から学習用に使う行数）
pub fn validation_boundary(rows: usize, validation_split: f64) -> usize {
    ((rows as f64) * (1.0 - validation_split)).floor() as usize
}

fn format_metrics(prefix: &str, kind: OutputKind, m: &EpochMetrics) -> String {
    let (accuracy_key, top3_key) = metric_names(kind);
    let mut text = format!("{}loss: {:.4} - {}{}: {:.4}", prefix, m.loss, prefix, accuracy_key, m.accuracy);
    if let (Some(key), Some(value)) = (top3_key, m.top3_accuracy) {
        text.push_str(&format!(" - {}{}: {:.4}", prefix, key, value));
    }
    text
}

/// モデル学習を実行し、最良エポックの重みとメタデータを保存する
pub fn train<B: AutodiffBackend>(
    job: &TrainingJob<'_>,
    settings: &TrainingSettings,
    device: &B::Device,
) -> Result<TrainedModel<B::InnerBackend>> {
    B::seed(device, settings.seed);

    let config = MlpConfig::new(job.x_train.ncols(), job.num_classes, job.shape.depth, job.shape.width);
    let kind = config.output_kind();
    let filename = model_filename(job.dataset_name, job.shape, chrono::Local::now());
    let model_path = job.output_dir.join(&filename);
    info!("{}", filename);

    // 末尾を検証用に取り分ける（シャッフル前）
    let split_at = validation_boundary(job.x_train.nrows(), settings.validation_split);
    let x_fit = job.x_train.slice(s![..split_at, ..]).to_owned();
    let y_fit = job.y_train[..split_at].to_vec();
    let x_val = job.x_train.slice(s![split_at.., ..]);
    let y_val = &job.y_train[split_at..];
    info!("学習データ: {} 行, 検証データ: {} 行", y_fit.len(), y_val.len());

    let dataloader_train = DataLoaderBuilder::new(TabularBatcher::<B>::new(device.clone()))
        .batch_size(settings.batch_size)
        .shuffle(settings.seed)
        .num_workers(settings.num_workers)
        .build(TabularDataset::new(x_fit, y_fit));

    let mut model = config.init::<B>(device);
    let model_params = model.num_params();
    info!(
        "モデル設定: 入力 {}, 隠れ層 {} x {}, 出力 {} ({:?}), パラメータ数 {}",
        config.num_features,
        config.depth,
        config.width,
        config.output_units(),
        kind,
        model_params
    );

    let mut optim = AdamConfig::new()
        .with_epsilon(1e-7)
        .init::<B, MlpClassifier<B>>();
    let mut early_stopping = EarlyStopping::new(settings.patience, settings.min_delta);
    let mut history = TrainingHistory::new();
    let mut best_model: Option<MlpClassifier<B::InnerBackend>> = None;

    let train_start = Instant::now();
    for epoch in 1..=settings.num_epochs {
        let mut train_acc = MetricAccumulator::new(kind);
        for batch in dataloader_train.iter() {
            let logits = model.forward(batch.features);
            let loss = model.loss(logits.clone(), batch.targets);

            let probs = to_host(model.activate(logits.detach()))?;
            train_acc.add(loss.clone().into_scalar().elem::<f64>(), &probs, &batch.labels);

            let grads = GradientsParams::from_grads(loss.backward(), &model);
            model = optim.step(settings.learning_rate, model, grads);
        }
        let train_metrics = train_acc.finish();

        let valid_model = model.valid();
        let monitored = if y_val.is_empty() {
            train_metrics.accuracy
        } else {
            let val_metrics = evaluate(&valid_model, x_val, y_val, settings.batch_size, device)?;
            push_history(&mut history, "val_", kind, &val_metrics);
            info!(
                "Epoch {}/{} - {} - {}",
                epoch,
                settings.num_epochs,
                format_metrics("", kind, &train_metrics),
                format_metrics("val_", kind, &val_metrics)
            );
            val_metrics.accuracy
        };
        push_history(&mut history, "", kind, &train_metrics);
        if y_val.is_empty() {
            info!("Epoch {}/{} - {}", epoch, settings.num_epochs, format_metrics("", kind, &train_metrics));
        }

        match early_stopping.update(epoch, monitored) {
            EarlyStoppingDecision::Improved => best_model = Some(valid_model),
            EarlyStoppingDecision::Continue => {}
            EarlyStoppingDecision::Stop => {
                info!("Epoch {}: early stopping", epoch);
                break;
            }
        }
    }
    let training_seconds = train_start.elapsed().as_secs_f64();
    info!("Training time: {} s", training_seconds);

    if let Some(best) = early_stopping.best() {
        info!(
            "最良エポック {} の重みを復元します (accuracy: {:.4})",
            early_stopping.best_epoch(),
            best
        );
    }
    let model = best_model.unwrap_or_else(|| model.valid());

    let record = TrainingRecord::new(history, training_seconds, model_params, &config);
    save_trained(&model, &record, &model_path)
        .with_context(|| format!("Failed to save model {}", filename))?;
    info!("モデルを保存しました: {}", model_path.display());

    Ok(TrainedModel {
        model,
        record,
        model_path,
    })
}
