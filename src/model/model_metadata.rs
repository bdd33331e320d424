//! 学習結果のメタデータ
//!
//! `{filename}.json` として保存される。エポックごとの履歴はトップレベルの
//! キー（`loss`、`val_loss` など）に配列として並び、その横に学習時間や
//! モデル形状が入る。

use crate::ml::MlpConfig;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// 指標名 → エポックごとの値
pub type TrainingHistory = BTreeMap<String, Vec<f64>>;

/// 学習結果のメタデータ
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TrainingRecord {
    /// エポックごとの指標
    #[serde(flatten)]
    pub history: TrainingHistory,

    /// 学習にかかった秒数
    pub training_seconds: f64,

    /// パラメータ総数
    pub model_params: usize,

    /// 隠れ層の数
    pub model_l: usize,

    /// 隠れ層のユニット数
    pub model_h: usize,

    /// 入力特徴量の次元（モデル再構築用）
    pub num_features: usize,

    /// クラス数（モデル再構築用）
    pub num_classes: usize,

    /// モデルの学習時刻（ISO8601形式）
    pub trained_at: String,
}

impl TrainingRecord {
    /// 新しいメタデータを作成
    pub fn new(
        history: TrainingHistory,
        training_seconds: f64,
        model_params: usize,
        config: &MlpConfig,
    ) -> Self {
        let trained_at = chrono::Local::now().to_rfc3339();

        Self {
            history,
            training_seconds,
            model_params,
            model_l: config.depth,
            model_h: config.width,
            num_features: config.num_features,
            num_classes: config.num_classes,
            trained_at,
        }
    }

    /// 同じ形のモデルを作るための設定
    pub fn model_config(&self) -> MlpConfig {
        MlpConfig::new(self.num_features, self.num_classes, self.model_l, self.model_h)
    }

    /// 実行したエポック数
    pub fn epochs(&self) -> usize {
        self.history.get("loss").map(Vec::len).unwrap_or(0)
    }

    /// メタデータをJSON文字列に変換
    pub fn to_json_string(&self) -> Result<String> {
        serde_json::to_string_pretty(self).context("Failed to serialize training record to JSON")
    }

    /// JSON文字列からメタデータを生成
    pub fn from_json_string(json: &str) -> Result<Self> {
        serde_json::from_str(json).context("Failed to deserialize training record from JSON")
    }

    /// メタデータをログに出す
    pub fn log_info(&self) {
        tracing::info!("=== 学習結果 ===");
        tracing::info!("モデル形状: L{} H{}", self.model_l, self.model_h);
        tracing::info!("入力次元: {}, クラス数: {}", self.num_features, self.num_classes);
        tracing::info!("パラメータ数: {}", self.model_params);
        tracing::info!("エポック数: {}", self.epochs());
        tracing::info!("学習時間: {:.2} 秒", self.training_seconds);
        tracing::info!("学習日時: {}", self.trained_at);
    }
}
