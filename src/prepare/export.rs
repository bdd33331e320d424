//! 外部ツール向けのバイナリ出力
//!
//! ## learned-retrieval 形式
//! - `{name}_y.lrbin`: ネイティブ順の u16 列。先頭がクラス数、以降が全サンプルのラベル
//! - `{name}_X.lrbin`: 行数・列数（u64 LE）の後に標準化済み特徴量（f32、行優先）
//!
//! ## succinct-index 形式
//! - `{name}_y.sux4j`: バイト順を反転した i64 のラベル列
//! - `{name}_X.sux4j`: 1行1サンプル。行の f32 バイト列（0x00 → 空白、LF → 空白、CR は削除）、
//!   行番号の base-85（4バイトBE、5文字）、改行

use crate::model::PathSettings;
use crate::prepare::base85;
use ndarray::Array2;
use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;

/// 1データセット分の出力ファイル
#[derive(Debug, Clone)]
pub struct ExportPaths {
    pub lr_labels: PathBuf,
    pub lr_features: PathBuf,
    pub succinct_labels: PathBuf,
    pub succinct_features: PathBuf,
}

impl ExportPaths {
    pub fn new(paths: &PathSettings, name: &str) -> Self {
        let succinct = paths.succinct_dir();
        Self {
            lr_labels: paths.processed_dir.join(format!("{}_y.lrbin", name)),
            lr_features: paths.processed_dir.join(format!("{}_X.lrbin", name)),
            succinct_labels: succinct.join(format!("{}_y.sux4j", name)),
            succinct_features: succinct.join(format!("{}_X.sux4j", name)),
        }
    }
}

fn to_u16(value: usize) -> io::Result<u16> {
    u16::try_from(value).map_err(|_| {
        io::Error::new(
            io::ErrorKind::InvalidData,
            format!("value {} does not fit the u16 label format", value),
        )
    })
}

/// learned-retrieval のラベルファイル
pub fn write_lr_labels<W: Write>(mut w: W, labels: &[u32], num_classes: usize) -> io::Result<()> {
    w.write_all(&to_u16(num_classes)?.to_ne_bytes())?;
    for &label in labels {
        w.write_all(&to_u16(label as usize)?.to_ne_bytes())?;
    }
    w.flush()
}

/// learned-retrieval の特徴量ファイル
pub fn write_lr_features<W: Write>(mut w: W, x: &Array2<f32>) -> io::Result<()> {
    w.write_all(&(x.nrows() as u64).to_le_bytes())?;
    w.write_all(&(x.ncols() as u64).to_le_bytes())?;
    for value in x.iter() {
        w.write_all(&value.to_ne_bytes())?;
    }
    w.flush()
}

/// succinct-index のラベルファイル
pub fn write_succinct_labels<W: Write>(mut w: W, labels: &[u32]) -> io::Result<()> {
    for &label in labels {
        w.write_all(&(label as i64).swap_bytes().to_ne_bytes())?;
    }
    w.flush()
}

/// 行の f32 バイト列をテキスト1行に収まる形にする（可逆ではない）
pub fn mangle_row_bytes(row: impl IntoIterator<Item = f32>) -> Vec<u8> {
    row.into_iter()
        .flat_map(f32::to_ne_bytes)
        .filter_map(|b| match b {
            0x00 | b'\n' => Some(b' '),
            b'\r' => None,
            other => Some(other),
        })
        .collect()
}

/// succinct-index の特徴量ファイル
pub fn write_succinct_features<W: Write>(mut w: W, x: &Array2<f32>) -> io::Result<()> {
    for (i, row) in x.rows().into_iter().enumerate() {
        let index = u32::try_from(i).map_err(|_| {
            io::Error::new(io::ErrorKind::InvalidData, "row index exceeds 32 bits")
        })?;
        w.write_all(&mangle_row_bytes(row.iter().copied()))?;
        w.write_all(&base85::encode(&index.to_be_bytes()))?;
        w.write_all(b"\n")?;
    }
    w.flush()
}

/// 4ファイルすべてを書き出す
pub fn export_all(
    paths: &PathSettings,
    name: &str,
    x: &Array2<f32>,
    labels: &[u32],
    num_classes: usize,
) -> io::Result<ExportPaths> {
    let out = ExportPaths::new(paths, name);
    fs::create_dir_all(&paths.processed_dir)?;
    fs::create_dir_all(paths.succinct_dir())?;

    write_lr_labels(BufWriter::new(File::create(&out.lr_labels)?), labels, num_classes)?;
    write_lr_features(BufWriter::new(File::create(&out.lr_features)?), x)?;
    write_succinct_labels(BufWriter::new(File::create(&out.succinct_labels)?), labels)?;
    write_succinct_features(BufWriter::new(File::create(&out.succinct_features)?), x)?;
    Ok(out)
}
