use ndarray::Array2;

/// 読み込み済みデータセット
///
/// `labels.len() == features.nrows()`、クラスIDは 0 から始まる連番。
#[derive(Debug, Clone)]
pub struct LoadedDataset {
    pub name: String,
    pub features: Array2<f64>,
    pub labels: Vec<u32>,
    pub num_classes: usize,
}

impl LoadedDataset {
    pub fn num_samples(&self) -> usize {
        self.features.nrows()
    }

    pub fn num_features(&self) -> usize {
        self.features.ncols()
    }
}

/// 標準化・層化分割済みのデータ
#[derive(Debug, Clone)]
pub struct PreparedSplit {
    pub x_train: Array2<f32>,
    pub x_test: Array2<f32>,
    pub y_train: Vec<u32>,
    pub y_test: Vec<u32>,
    /// 元データにおける学習行のインデックス
    pub train_indices: Vec<usize>,
    /// 元データにおけるテスト行のインデックス
    pub test_indices: Vec<usize>,
    pub num_classes: usize,
}

impl PreparedSplit {
    pub fn num_features(&self) -> usize {
        self.x_train.ncols()
    }

    /// 2値分類か（出力はシグモイド1ユニット）
    pub fn is_binary(&self) -> bool {
        self.num_classes <= 2
    }
}
