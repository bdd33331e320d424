//! データセット読み込みのエラー定義

use std::path::PathBuf;
use thiserror::Error;

/// データセットの読み込み・解析で発生するエラー
#[derive(Debug, Error)]
pub enum DatasetError {
    /// 未知のデータセット名
    #[error("Invalid dataset name: {0}")]
    InvalidInput(String),

    /// 入力ファイルが存在しない
    #[error("Data file not found: {}", .0.display())]
    NotFound(PathBuf),

    /// 必要な列がヘッダーに無い
    #[error("Column '{column}' not found in {}", path.display())]
    MissingColumn { column: String, path: PathBuf },

    /// 数値として解釈できないセル
    #[error("Cannot parse '{value}' in column '{column}' at row {row}")]
    Parse {
        column: String,
        row: usize,
        value: String,
    },

    /// covertype の取得失敗
    #[error("Download failed: {0}")]
    Download(String),

    #[error(transparent)]
    Csv(#[from] csv::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type DatasetResult<T> = Result<T, DatasetError>;
