use crate::error::{DatasetError, DatasetResult};
use csv::{Reader, ReaderBuilder};
use std::io::Read;
use std::path::Path;

/// 特徴量として読み込む列の指定
#[derive(Debug, Clone, Copy)]
pub enum FeatureColumns<'a> {
    /// 指定した列だけを指定順に使う
    Named(&'a [&'a str]),
    /// ラベル列と指定した列を除く全列をファイル順に使う
    AllExcept(&'a [&'a str]),
}

/// CSVから取り出した特徴量とラベル
#[derive(Debug, Clone)]
pub struct CsvColumns {
    pub feature_names: Vec<String>,
    /// 行優先で並べた特徴量
    pub values: Vec<f64>,
    pub rows: usize,
    /// ラベル列の生の文字列
    pub labels: Vec<String>,
}

/// ヘッダー付きCSVから特徴量列とラベル列を読み込む
pub fn load_csv(path: &Path, features: FeatureColumns<'_>, label: &str) -> DatasetResult<CsvColumns> {
    if !path.exists() {
        return Err(DatasetError::NotFound(path.to_path_buf()));
    }
    let reader = ReaderBuilder::new().has_headers(true).from_path(path)?;
    read_columns(reader, path, features, label)
}

/// 任意のリーダーから特徴量列とラベル列を読み込む
pub fn read_columns<R: Read>(
    mut reader: Reader<R>,
    path: &Path,
    features: FeatureColumns<'_>,
    label: &str,
) -> DatasetResult<CsvColumns> {
    let headers = reader.headers()?.clone();
    let position = |column: &str| {
        headers
            .iter()
            .position(|h| h == column)
            .ok_or_else(|| DatasetError::MissingColumn {
                column: column.to_string(),
                path: path.to_path_buf(),
            })
    };

    let label_index = position(label)?;
    let feature_indices: Vec<usize> = match features {
        FeatureColumns::Named(names) => names
            .iter()
            .map(|name| position(*name))
            .collect::<DatasetResult<_>>()?,
        FeatureColumns::AllExcept(excluded) => {
            for name in excluded {
                position(*name)?;
            }
            headers
                .iter()
                .enumerate()
                .filter(|(i, h)| *i != label_index && !excluded.contains(h))
                .map(|(i, _)| i)
                .collect()
        }
    };
    let feature_names: Vec<String> = feature_indices
        .iter()
        .map(|&i| headers[i].to_string())
        .collect();

    let mut values = Vec::new();
    let mut labels = Vec::new();
    for (row, result) in reader.records().enumerate() {
        let record = result?;
        for (&column, name) in feature_indices.iter().zip(&feature_names) {
            let cell = record.get(column).unwrap_or("");
            values.push(parse_numeric(cell, name, row)?);
        }
        labels.push(record.get(label_index).unwrap_or("").to_string());
    }

    Ok(CsvColumns {
        feature_names,
        rows: labels.len(),
        values,
        labels,
    })
}

/// ヘッダー無しの数値CSVを行優先で読み込む（列数を返す）
pub fn read_numeric_rows<R: Read>(reader: R) -> DatasetResult<(Vec<f64>, usize)> {
    let mut reader = ReaderBuilder::new().has_headers(false).from_reader(reader);
    let mut values = Vec::new();
    let mut columns = 0;
    for (row, result) in reader.records().enumerate() {
        let record = result?;
        columns = record.len();
        for (column, cell) in record.iter().enumerate() {
            values.push(parse_numeric(cell, &column.to_string(), row)?);
        }
    }
    Ok((values, columns))
}

/// セルを数値に変換する
///
/// 空セルは NaN、`True`/`False` は 1/0 として扱う。
pub fn parse_numeric(cell: &str, column: &str, row: usize) -> DatasetResult<f64> {
    let cell = cell.trim();
    match cell {
        "" => Ok(f64::NAN),
        "True" | "true" => Ok(1.0),
        "False" | "false" => Ok(0.0),
        _ => cell.parse().map_err(|_| DatasetError::Parse {
            column: column.to_string(),
            row,
            value: cell.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reader(data: &str) -> Reader<&[u8]> {
        ReaderBuilder::new()
            .has_headers(true)
            .from_reader(data.as_bytes())
    }

    #[test]
    fn test_named_columns_keep_requested_order() {
        let data = ",b,a,label\n0,1.5,2,x\n1,3,4,y\n";
        let cols = read_columns(
            reader(data),
            Path::new("mem.csv"),
            FeatureColumns::Named(&["a", "b"]),
            "label",
        )
        .unwrap();

        assert_eq!(cols.feature_names, vec!["a", "b"]);
        assert_eq!(cols.values, vec![2.0, 1.5, 4.0, 3.0]);
        assert_eq!(cols.labels, vec!["x", "y"]);
        assert_eq!(cols.rows, 2);
    }

    #[test]
    fn test_all_except_drops_label_and_excluded() {
        let data = "ip,port,Label,Attack,bytes\n1.2.3.4,80,1,dos,10\n5.6.7.8,443,0,benign,20\n";
        let cols = read_columns(
            reader(data),
            Path::new("mem.csv"),
            FeatureColumns::AllExcept(&["ip", "Label"]),
            "Attack",
        )
        .unwrap();

        assert_eq!(cols.feature_names, vec!["port", "bytes"]);
        assert_eq!(cols.values, vec![80.0, 10.0, 443.0, 20.0]);
        assert_eq!(cols.labels, vec!["dos", "benign"]);
    }

    #[test]
    fn test_missing_column_is_reported() {
        let err = read_columns(
            reader("a,label\n1,0\n"),
            Path::new("mem.csv"),
            FeatureColumns::Named(&["b"]),
            "label",
        )
        .unwrap_err();
        assert!(matches!(err, DatasetError::MissingColumn { ref column, .. } if column == "b"));
    }

    #[test]
    fn test_missing_file_is_not_found() {
        let err = load_csv(
            Path::new("definitely/not/here.csv"),
            FeatureColumns::AllExcept(&[]),
            "label",
        )
        .unwrap_err();
        assert!(matches!(err, DatasetError::NotFound(_)));
    }

    #[test]
    fn test_parse_numeric() {
        assert_eq!(parse_numeric(" 1.5 ", "c", 0).unwrap(), 1.5);
        assert_eq!(parse_numeric("True", "c", 0).unwrap(), 1.0);
        assert_eq!(parse_numeric("False", "c", 0).unwrap(), 0.0);
        assert!(parse_numeric("", "c", 0).unwrap().is_nan());
        assert!(matches!(
            parse_numeric("abc", "c", 3),
            Err(DatasetError::Parse { row: 3, .. })
        ));
    }

    #[test]
    fn test_read_numeric_rows() {
        let (values, columns) = read_numeric_rows("1,2,3\n4,5,6\n".as_bytes()).unwrap();
        assert_eq!(columns, 3);
        assert_eq!(values, vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
    }
}
