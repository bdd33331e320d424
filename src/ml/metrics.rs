//! 確率テーブルに対する精度指標
//!
//! 確率は行優先 `[サンプル数, クラス数]` の `f32` 列で受け取る。

/// シグモイド出力 `p` を `(1 - p, p)` の2列テーブルにする
pub fn binary_to_two_column(probs: &[f32]) -> Vec<f32> {
    probs.iter().flat_map(|&p| [1.0 - p, p]).collect()
}

/// 正解クラスより厳密に大きいスコアのクラスが `k` 未満なら命中とみなす
///
/// 同点が境界をまたぐ場合は命中側に数える。正解クラスのスコアが NaN なら外れ。
pub fn in_top_k(row: &[f32], label: u32, k: usize) -> bool {
    let target = row[label as usize];
    !target.is_nan() && row.iter().filter(|&&score| score > target).count() < k
}

/// top-k 正解率（0〜1）
pub fn top_k_accuracy(probs: &[f32], num_columns: usize, labels: &[u32], k: usize) -> f64 {
    if labels.is_empty() {
        return 0.0;
    }
    let hits = probs
        .chunks_exact(num_columns)
        .zip(labels)
        .filter(|(row, &label)| in_top_k(row, label, k))
        .count();
    hits as f64 / labels.len() as f64
}

/// 最大スコアのクラス（同点は先頭）と一致した割合（0〜1）
pub fn top1_accuracy(probs: &[f32], num_columns: usize, labels: &[u32]) -> f64 {
    if labels.is_empty() {
        return 0.0;
    }
    let hits = probs
        .chunks_exact(num_columns)
        .zip(labels)
        .filter(|(row, &label)| argmax(row) == label as usize)
        .count();
    hits as f64 / labels.len() as f64
}

/// しきい値 0.5 の2値正解率（0〜1）
pub fn binary_accuracy(probs: &[f32], labels: &[u32]) -> f64 {
    if labels.is_empty() {
        return 0.0;
    }
    let hits = probs
        .iter()
        .zip(labels)
        .filter(|(&p, &label)| (p > 0.5) == (label == 1))
        .count();
    hits as f64 / labels.len() as f64
}

fn argmax(row: &[f32]) -> usize {
    let mut best = 0;
    for (i, &v) in row.iter().enumerate() {
        if v > row[best] {
            best = i;
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_two_column_rows_sum_to_one() {
        let table = binary_to_two_column(&[0.0, 0.25, 0.9, 1.0]);
        assert_eq!(table.len(), 8);
        for row in table.chunks(2) {
            assert_abs_diff_eq!(row[0] + row[1], 1.0, epsilon = 1e-6);
        }
        assert_eq!(&table[2..4], &[0.75, 0.25]);
    }

    #[test]
    fn test_top1_and_top3() {
        let probs = [
            0.1, 0.6, 0.2, 0.1, // 正解 1: top1
            0.4, 0.3, 0.2, 0.1, // 正解 2: top3 のみ
            0.4, 0.3, 0.2, 0.1, // 正解 3: 外れ
            0.7, 0.1, 0.1, 0.1, // 正解 0: top1
        ];
        let labels = [1, 2, 3, 0];
        assert_abs_diff_eq!(top1_accuracy(&probs, 4, &labels), 0.5);
        assert_abs_diff_eq!(top_k_accuracy(&probs, 4, &labels, 3), 0.75);
        assert_abs_diff_eq!(top_k_accuracy(&probs, 4, &labels, 1), 0.5);
    }

    #[test]
    fn test_ties_at_boundary_count_as_hit() {
        let row = [0.3, 0.3, 0.3, 0.1];
        assert!(in_top_k(&row, 2, 1));
        assert!(!in_top_k(&row, 3, 3));
    }

    #[test]
    fn test_binary_accuracy_threshold() {
        let probs = [0.2, 0.51, 0.5, 0.99];
        let labels = [0, 1, 1, 0];
        assert_abs_diff_eq!(binary_accuracy(&probs, &labels), 0.5);

        let table = binary_to_two_column(&probs);
        assert_abs_diff_eq!(top1_accuracy(&table, 2, &labels), 0.5);
    }

    #[test]
    fn test_empty_labels() {
        assert_eq!(top1_accuracy(&[], 3, &[]), 0.0);
        assert_eq!(binary_accuracy(&[], &[]), 0.0);
    }

    #[test]
    fn test_nan_scores_are_misses() {
        let probs = [f32::NAN, f32::NAN, f32::NAN, f32::NAN, 0.1, 0.2, 0.3, 0.4];
        assert!(!in_top_k(&probs[..4], 2, 3));
        assert_abs_diff_eq!(top_k_accuracy(&probs, 4, &[2, 3], 3), 0.5, epsilon = 1e-12);
    }
}
