//! ラベルの連番化とカテゴリ列のワンホット展開

use ndarray::{Array2, Axis};
use std::collections::BTreeMap;

/// 値をソート順に 0 からの連番へ写像する
///
/// 戻り値は (各サンプルのクラスID, クラスIDに対応する元の値)。
pub fn encode_labels<T: Ord + Clone>(values: &[T]) -> (Vec<u32>, Vec<T>) {
    let mut classes: BTreeMap<T, u32> = values.iter().map(|v| (v.clone(), 0)).collect();
    for (id, slot) in classes.values_mut().enumerate() {
        *slot = id as u32;
    }
    let encoded = values.iter().map(|v| classes[v]).collect();
    (encoded, classes.into_keys().collect())
}

/// 指定した列をワンホット展開する（各列の最小の水準は落とす）
///
/// 展開しない列は元の順序のまま前に残り、ダミー列は `columns` の順、
/// 水準の昇順で末尾に追加される。NaN はどの水準にも該当しない。
pub fn one_hot_drop_first(
    matrix: &Array2<f64>,
    names: &[String],
    columns: &[&str],
) -> (Array2<f64>, Vec<String>) {
    let expand: Vec<usize> = columns
        .iter()
        .filter_map(|c| names.iter().position(|n| n == c))
        .collect();

    let mut out_names: Vec<String> = Vec::new();
    let mut out_columns: Vec<Vec<f64>> = Vec::new();
    for (i, name) in names.iter().enumerate() {
        if !expand.contains(&i) {
            out_names.push(name.clone());
            out_columns.push(matrix.column(i).to_vec());
        }
    }

    for &i in &expand {
        let column = matrix.column(i);
        let mut levels: Vec<f64> = column.iter().copied().filter(|v| !v.is_nan()).collect();
        levels.sort_by(|a, b| a.total_cmp(b));
        levels.dedup();

        for level in levels.into_iter().skip(1) {
            out_names.push(format!("{}_{}", names[i], level));
            out_columns.push(
                column
                    .iter()
                    .map(|&v| if v == level { 1.0 } else { 0.0 })
                    .collect(),
            );
        }
    }

    let rows = matrix.nrows();
    let mut out = Array2::<f64>::zeros((rows, out_columns.len()));
    for (j, values) in out_columns.into_iter().enumerate() {
        out.index_axis_mut(Axis(1), j)
            .iter_mut()
            .zip(values)
            .for_each(|(dst, v)| *dst = v);
    }
    (out, out_names)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_encode_text_labels_sorted() {
        let raw: Vec<String> = ["rock", "jazz", "rock", "blues"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        let (encoded, classes) = encode_labels(&raw);

        assert_eq!(classes, vec!["blues", "jazz", "rock"]);
        assert_eq!(encoded, vec![2, 1, 2, 0]);
    }

    #[test]
    fn test_encode_numeric_labels_are_dense() {
        let (encoded, classes) = encode_labels(&[7i64, 1, 3, 7, 10]);
        assert_eq!(classes, vec![1, 3, 7, 10]);
        assert_eq!(encoded, vec![2, 0, 1, 2, 3]);
    }

    #[test]
    fn test_one_hot_drops_first_level() {
        let matrix = array![[0.5, 2.0, 4.0], [1.5, 0.0, 3.0], [2.5, 1.0, 4.0]];
        let names: Vec<String> = ["a", "key", "ts"].iter().map(|s| s.to_string()).collect();

        let (out, out_names) = one_hot_drop_first(&matrix, &names, &["key", "ts"]);

        assert_eq!(out_names, vec!["a", "key_1", "key_2", "ts_4"]);
        assert_eq!(
            out,
            array![
                [0.5, 0.0, 1.0, 1.0],
                [1.5, 0.0, 0.0, 0.0],
                [2.5, 1.0, 0.0, 1.0]
            ]
        );
    }
}
