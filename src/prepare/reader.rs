//! learned-retrieval 形式の読み戻し

use crate::dataset::{entropy_bits, label_counts};
use crate::error::{DatasetError, DatasetResult};
use ndarray::Array2;
use std::fs;
use std::path::Path;

const LABEL_SUFFIX: &str = "_y.lrbin";
const FEATURE_SUFFIX: &str = "_X.lrbin";

/// 読み戻したデータセット
#[derive(Debug, Clone)]
pub struct LearnedRetrievalDataset {
    pub name: String,
    pub num_classes: usize,
    pub labels: Vec<u16>,
    pub features: Array2<f32>,
}

impl LearnedRetrievalDataset {
    /// `{dir}/{name}_y.lrbin` と `{dir}/{name}_X.lrbin` を読む
    pub fn open(dir: &Path, name: &str) -> DatasetResult<Self> {
        let label_path = dir.join(format!("{}{}", name, LABEL_SUFFIX));
        let feature_path = dir.join(format!("{}{}", name, FEATURE_SUFFIX));

        let (num_classes, labels) = parse_labels(&read_file(&label_path)?, &label_path)?;
        let features = parse_features(&read_file(&feature_path)?, &feature_path)?;

        if labels.len() != features.nrows() {
            return Err(DatasetError::InvalidInput(format!(
                "{}: {} labels for {} rows",
                label_path.display(),
                labels.len(),
                features.nrows()
            )));
        }

        Ok(Self {
            name: name.to_string(),
            num_classes,
            labels,
            features,
        })
    }

    pub fn size(&self) -> usize {
        self.labels.len()
    }

    pub fn num_features(&self) -> usize {
        self.features.ncols()
    }

    pub fn entropy(&self) -> f64 {
        let labels: Vec<u32> = self.labels.iter().map(|&l| l as u32).collect();
        entropy_bits(&label_counts(&labels, self.num_classes))
    }

    /// `dataset_name=.. entropy=.. size=.. features=.. classes=..`
    pub fn stats_line(&self) -> String {
        format!(
            "dataset_name={} entropy={:.4} size={} features={} classes={}",
            self.name,
            self.entropy(),
            self.size(),
            self.num_features(),
            self.num_classes
        )
    }
}

/// ディレクトリ内の `*_y.lrbin` からデータセット名を集める（名前順）
pub fn list_datasets(dir: &Path) -> DatasetResult<Vec<String>> {
    if !dir.is_dir() {
        return Err(DatasetError::NotFound(dir.to_path_buf()));
    }
    let mut names = Vec::new();
    for entry in fs::read_dir(dir)? {
        let file_name = entry?.file_name();
        if let Some(name) = file_name.to_str().and_then(|n| n.strip_suffix(LABEL_SUFFIX)) {
            names.push(name.to_string());
        }
    }
    names.sort();
    Ok(names)
}

fn read_file(path: &Path) -> DatasetResult<Vec<u8>> {
    if !path.exists() {
        return Err(DatasetError::NotFound(path.to_path_buf()));
    }
    Ok(fs::read(path)?)
}

fn parse_labels(bytes: &[u8], path: &Path) -> DatasetResult<(usize, Vec<u16>)> {
    if bytes.len() < 2 || bytes.len() % 2 != 0 {
        return Err(DatasetError::InvalidInput(format!(
            "{}: label file has {} bytes",
            path.display(),
            bytes.len()
        )));
    }
    let mut records = bytes.chunks_exact(2).map(|c| u16::from_ne_bytes([c[0], c[1]]));
    let num_classes = records.next().map(usize::from).unwrap_or_default();
    let labels: Vec<u16> = records.collect();

    if let Some(&bad) = labels.iter().find(|&&l| l as usize >= num_classes) {
        return Err(DatasetError::InvalidInput(format!(
            "{}: label {} out of range for {} classes",
            path.display(),
            bad,
            num_classes
        )));
    }
    Ok((num_classes, labels))
}

fn parse_features(bytes: &[u8], path: &Path) -> DatasetResult<Array2<f32>> {
    let invalid = |msg: String| DatasetError::InvalidInput(format!("{}: {}", path.display(), msg));

    if bytes.len() < 16 {
        return Err(invalid("missing header".to_string()));
    }
    let rows = u64::from_le_bytes(bytes[0..8].try_into().unwrap_or_default()) as usize;
    let cols = u64::from_le_bytes(bytes[8..16].try_into().unwrap_or_default()) as usize;
    let payload = &bytes[16..];

    let expected = rows
        .checked_mul(cols)
        .and_then(|n| n.checked_mul(4))
        .ok_or_else(|| invalid(format!("header {}x{} overflows", rows, cols)))?;
    if payload.len() != expected {
        return Err(invalid(format!(
            "payload has {} bytes, header {}x{} needs {}",
            payload.len(),
            rows,
            cols,
            expected
        )));
    }

    let values: Vec<f32> = payload
        .chunks_exact(4)
        .map(|c| f32::from_ne_bytes([c[0], c[1], c[2], c[3]]))
        .collect();
    Array2::from_shape_vec((rows, cols), values).map_err(|e| invalid(e.to_string()))
}
