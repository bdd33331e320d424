//! ラベル分布の統計

use std::fmt;

/// クラスごとのサンプル数
pub fn label_counts(labels: &[u32], num_classes: usize) -> Vec<usize> {
    let mut counts = vec![0usize; num_classes];
    for &label in labels {
        counts[label as usize] += 1;
    }
    counts
}

/// ラベル分布のシャノンエントロピー（ビット）
///
/// −Σ p·log2(p)。出現しないクラスは寄与しない。
pub fn entropy_bits(counts: &[usize]) -> f64 {
    let total: usize = counts.iter().sum();
    if total == 0 {
        return 0.0;
    }
    counts
        .iter()
        .filter(|&&c| c > 0)
        .map(|&c| {
            let p = c as f64 / total as f64;
            -p * p.log2()
        })
        .sum()
}

/// データセットの要約統計
#[derive(Debug, Clone)]
pub struct DatasetSummary {
    pub name: String,
    pub samples: usize,
    pub features: usize,
    pub classes: usize,
    pub entropy: f64,
    pub counts: Vec<usize>,
}

impl DatasetSummary {
    pub fn new(name: &str, labels: &[u32], features: usize, classes: usize) -> Self {
        let counts = label_counts(labels, classes);
        Self {
            name: name.to_string(),
            samples: labels.len(),
            features,
            classes,
            entropy: entropy_bits(&counts),
            counts,
        }
    }

    /// サンプル数の多い順の (クラスID, 件数)
    pub fn distribution(&self) -> Vec<(usize, usize)> {
        let mut dist: Vec<(usize, usize)> = self.counts.iter().copied().enumerate().collect();
        dist.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));
        dist
    }
}

impl fmt::Display for DatasetSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Dataset: {}", self.name)?;
        writeln!(f, "Number of samples: {}", self.samples)?;
        writeln!(f, "Number of features: {}", self.features)?;
        writeln!(f, "Number of classes: {}", self.classes)?;
        write!(f, "Entropy: {:.4}", self.entropy)
    }
}
