//! データセットごとの読み込み方法

use crate::csv_loader::{load_csv, read_numeric_rows, CsvColumns, FeatureColumns};
use crate::dataset::download::fetch_covertype;
use crate::dataset::encoding::{encode_labels, one_hot_drop_first};
use crate::dataset::synthetic::generate_gaussian;
use crate::error::{DatasetError, DatasetResult};
use crate::model::AppConfig;
use crate::types::LoadedDataset;
use flate2::read::GzDecoder;
use ndarray::{s, Array2};
use std::fs::File;
use std::str::FromStr;

const SONGS_FILE: &str = "spotify_data.csv";
const SONGS_FEATURES: [&str; 13] = [
    "key",
    "danceability",
    "energy",
    "loudness",
    "speechiness",
    "acousticness",
    "instrumentalness",
    "liveness",
    "valence",
    "tempo",
    "duration_ms",
    "time_signature",
    "popularity",
];
const SONGS_ONE_HOT: [&str; 2] = ["key", "time_signature"];

const NIDS_FILE: &str = "NF-ToN-IoT.csv";
const NIDS_DROPPED: [&str; 3] = ["IPV4_SRC_ADDR", "IPV4_DST_ADDR", "Label"];

const URLS_FILE: &str = "PhiUSIIL_Phishing_URL_Dataset.csv";
const URLS_FEATURES: [&str; 15] = [
    "URLLength",
    "IsDomainIP",
    "CharContinuationRate",
    "TLDLength",
    "NoOfSubDomain",
    "NoOfObfuscatedChar",
    "NoOfLettersInURL",
    "LetterRatioInURL",
    "NoOfDegitsInURL",
    "NoOfEqualsInURL",
    "NoOfQMarkInURL",
    "NoOfAmpersandInURL",
    "NoOfOtherSpecialCharsInURL",
    "SpacialCharRatioInURL",
    "IsHTTPS",
];

/// 読み込み可能なデータセット
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DatasetSource {
    /// Spotify 1M tracks（ジャンル分類）
    Songs,
    /// UCI Covertype（ネットワーク取得）
    Covertype,
    /// NF-ToN-IoT（攻撃種別分類）
    Nids,
    /// PhiUSIIL フィッシングURL
    Urls,
    /// 8クラスの1次元ガウス分布、`sigma_index` で標準偏差を選ぶ
    Gaussian { sigma_index: usize },
}

impl FromStr for DatasetSource {
    type Err = DatasetError;

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        match name {
            "songs" => Ok(Self::Songs),
            "covertype" => Ok(Self::Covertype),
            "nids" => Ok(Self::Nids),
            "urls" => Ok(Self::Urls),
            _ => name
                .strip_prefix("gaussian")
                .filter(|digit| digit.len() == 1)
                .and_then(|digit| digit.chars().next())
                .and_then(|digit| digit.to_digit(10))
                .map(|sigma_index| Self::Gaussian {
                    sigma_index: sigma_index as usize,
                })
                .ok_or_else(|| DatasetError::InvalidInput(name.to_string())),
        }
    }
}

impl DatasetSource {
    pub fn is_synthetic(&self) -> bool {
        matches!(self, Self::Gaussian { .. })
    }

    /// 特徴量行列・ラベル・クラス数を読み込む
    pub fn load(&self, name: &str, config: &AppConfig) -> DatasetResult<LoadedDataset> {
        let data_dir = &config.paths.data_dir;
        let (features, labels, num_classes) = match *self {
            Self::Songs => {
                let columns = load_csv(
                    &data_dir.join(SONGS_FILE),
                    FeatureColumns::Named(&SONGS_FEATURES),
                    "genre",
                )?;
                let (labels, classes) = encode_labels(&columns.labels);
                let (matrix, names) = into_matrix(columns)?;
                let (matrix, _) = one_hot_drop_first(&matrix, &names, &SONGS_ONE_HOT);
                (matrix, labels, classes.len())
            }
            Self::Covertype => {
                let path = fetch_covertype(data_dir)?;
                let (values, columns) = read_numeric_rows(GzDecoder::new(File::open(&path)?))?;
                let rows = if columns == 0 { 0 } else { values.len() / columns };
                let table = Array2::from_shape_vec((rows, columns), values)
                    .map_err(|e| DatasetError::InvalidInput(format!("{}: {}", path.display(), e)))?;
                let last = columns.saturating_sub(1);
                let raw: Vec<i64> = table.column(last).iter().map(|&v| v as i64 - 1).collect();
                let (labels, classes) = encode_labels(&raw);
                (table.slice(s![.., ..last]).to_owned(), labels, classes.len())
            }
            Self::Nids => {
                let columns = load_csv(
                    &data_dir.join(NIDS_FILE),
                    FeatureColumns::AllExcept(&NIDS_DROPPED),
                    "Attack",
                )?;
                let (labels, classes) = encode_labels(&columns.labels);
                let (matrix, _) = into_matrix(columns)?;
                (matrix, labels, classes.len())
            }
            Self::Urls => {
                let columns = load_csv(
                    &data_dir.join(URLS_FILE),
                    FeatureColumns::Named(&URLS_FEATURES),
                    "label",
                )?;
                let raw = columns
                    .labels
                    .iter()
                    .enumerate()
                    .map(|(row, v)| {
                        v.trim().parse::<i64>().map_err(|_| DatasetError::Parse {
                            column: "label".to_string(),
                            row,
                            value: v.clone(),
                        })
                    })
                    .collect::<DatasetResult<Vec<i64>>>()?;
                let (labels, classes) = encode_labels(&raw);
                let (matrix, _) = into_matrix(columns)?;
                (matrix, labels, classes.len())
            }
            Self::Gaussian { sigma_index } => {
                let sigma = *config.synthetic.sigmas.get(sigma_index).ok_or_else(|| {
                    DatasetError::InvalidInput(format!("{}: no sigma #{}", name, sigma_index))
                })?;
                let (matrix, labels) = generate_gaussian(&config.synthetic, sigma)?;
                let classes = labels.iter().max().map_or(0, |&m| m as usize + 1);
                (matrix, labels, classes)
            }
        };

        Ok(LoadedDataset {
            name: name.to_string(),
            features,
            labels,
            num_classes,
        })
    }
}

fn into_matrix(columns: CsvColumns) -> DatasetResult<(Array2<f64>, Vec<String>)> {
    let width = columns.feature_names.len();
    let matrix = Array2::from_shape_vec((columns.rows, width), columns.values)
        .map_err(|e| DatasetError::InvalidInput(e.to_string()))?;
    Ok((matrix, columns.feature_names))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn config_in(dir: &std::path::Path) -> AppConfig {
        let mut config = AppConfig::default();
        config.paths.data_dir = dir.to_path_buf();
        config.synthetic.samples = 800;
        config
    }

    #[test]
    fn test_parse_names() {
        assert_eq!("songs".parse::<DatasetSource>().unwrap(), DatasetSource::Songs);
        assert_eq!("covertype".parse::<DatasetSource>().unwrap(), DatasetSource::Covertype);
        assert_eq!(
            "gaussian3".parse::<DatasetSource>().unwrap(),
            DatasetSource::Gaussian { sigma_index: 3 }
        );
        assert!(matches!(
            "mnist".parse::<DatasetSource>(),
            Err(DatasetError::InvalidInput(_))
        ));
        assert!("gaussian".parse::<DatasetSource>().is_err());
    }

    #[test]
    fn test_gaussian_suffix_is_one_digit() {
        for name in ["gaussian+1", "gaussian01", "gaussian12", "gaussian-1", "gaussian１"] {
            assert!(
                matches!(name.parse::<DatasetSource>(), Err(DatasetError::InvalidInput(_))),
                "{}",
                name
            );
        }
        assert_eq!(
            "gaussian0".parse::<DatasetSource>().unwrap(),
            DatasetSource::Gaussian { sigma_index: 0 }
        );
    }

    #[test]
    fn test_gaussian_sigma_out_of_range() {
        let dir = tempfile::tempdir().unwrap();
        let err = DatasetSource::Gaussian { sigma_index: 9 }
            .load("gaussian9", &config_in(dir.path()))
            .unwrap_err();
        assert!(matches!(err, DatasetError::InvalidInput(_)));
    }

    #[test]
    fn test_gaussian_loads_eight_classes() {
        let dir = tempfile::tempdir().unwrap();
        let ds = DatasetSource::Gaussian { sigma_index: 0 }
            .load("gaussian0", &config_in(dir.path()))
            .unwrap();
        assert_eq!(ds.num_classes, 8);
        assert_eq!(ds.num_samples(), ds.labels.len());
        assert_eq!(ds.num_features(), 1);
    }

    #[test]
    fn test_songs_one_hot_and_labels() {
        let dir = tempfile::tempdir().unwrap();
        let mut file = File::create(dir.path().join(SONGS_FILE)).unwrap();
        writeln!(file, ",artist_name,track_name,track_id,popularity,year,genre,danceability,energy,key,loudness,mode,speechiness,acousticness,instrumentalness,liveness,valence,tempo,duration_ms,time_signature").unwrap();
        writeln!(file, "0,a,t1,id1,68,2012,rock,0.48,0.3,4,-10.0,1,0.03,0.69,0.0,0.11,0.13,133.4,240166,3").unwrap();
        writeln!(file, "1,b,t2,id2,50,2012,jazz,0.56,0.45,2,-9.0,1,0.04,0.3,0.0,0.2,0.5,120.0,200000,4").unwrap();
        writeln!(file, "2,c,t3,id3,10,2012,rock,0.6,0.5,4,-8.0,0,0.05,0.2,0.1,0.3,0.6,110.0,180000,4").unwrap();
        drop(file);

        let ds = DatasetSource::Songs.load("songs", &config_in(dir.path())).unwrap();

        // 11 数値列 + key(2,4 → key_4) + time_signature(3,4 → time_signature_4)
        assert_eq!(ds.num_features(), 13);
        assert_eq!(ds.labels, vec![1, 0, 1]);
        assert_eq!(ds.num_classes, 2);
        assert_eq!(ds.features[[0, 11]], 1.0);
        assert_eq!(ds.features[[1, 11]], 0.0);
        assert_eq!(ds.features[[0, 12]], 0.0);
        assert_eq!(ds.features[[2, 12]], 1.0);
    }

    #[test]
    fn test_urls_selects_fifteen_features() {
        let dir = tempfile::tempdir().unwrap();
        let mut file = File::create(dir.path().join(URLS_FILE)).unwrap();
        let mut header: Vec<&str> = vec!["FILENAME", "URL"];
        header.extend(URLS_FEATURES.iter());
        header.push("label");
        writeln!(file, "{}", header.join(",")).unwrap();
        for row in 0..4 {
            let mut cells = vec!["f.txt".to_string(), "http://x".to_string()];
            cells.extend((0..15).map(|c| (row * 15 + c).to_string()));
            cells.push((row % 2).to_string());
            writeln!(file, "{}", cells.join(",")).unwrap();
        }
        drop(file);

        let ds = DatasetSource::Urls.load("urls", &config_in(dir.path())).unwrap();
        assert_eq!(ds.num_features(), 15);
        assert_eq!(ds.num_samples(), 4);
        assert_eq!(ds.labels, vec![0, 1, 0, 1]);
        assert_eq!(ds.num_classes, 2);
    }

    #[test]
    fn test_nids_encodes_attack_names() {
        let dir = tempfile::tempdir().unwrap();
        let mut file = File::create(dir.path().join(NIDS_FILE)).unwrap();
        writeln!(file, "IPV4_SRC_ADDR,L4_SRC_PORT,IPV4_DST_ADDR,L4_DST_PORT,IN_BYTES,Label,Attack").unwrap();
        writeln!(file, "1.1.1.1,80,2.2.2.2,443,100,0,Benign").unwrap();
        writeln!(file, "1.1.1.2,81,2.2.2.3,22,200,1,scanning").unwrap();
        writeln!(file, "1.1.1.3,82,2.2.2.4,80,300,1,ddos").unwrap();
        drop(file);

        let ds = DatasetSource::Nids.load("nids", &config_in(dir.path())).unwrap();
        assert_eq!(ds.num_features(), 3);
        assert_eq!(ds.labels, vec![0, 2, 1]);
        assert_eq!(ds.num_classes, 3);
    }

    #[test]
    fn test_covertype_from_cached_gzip() {
        use flate2::write::GzEncoder;
        use flate2::Compression;

        let dir = tempfile::tempdir().unwrap();
        let file = File::create(dir.path().join(crate::dataset::download::COVERTYPE_FILE)).unwrap();
        let mut encoder = GzEncoder::new(file, Compression::default());
        writeln!(encoder, "2596,51,3,1").unwrap();
        writeln!(encoder, "2590,56,2,2").unwrap();
        writeln!(encoder, "2804,139,9,1").unwrap();
        encoder.finish().unwrap();

        let ds = DatasetSource::Covertype.load("covertype", &config_in(dir.path())).unwrap();
        assert_eq!(ds.num_features(), 3);
        assert_eq!(ds.labels, vec![0, 1, 0]);
        assert_eq!(ds.num_classes, 2);
    }

    #[test]
    fn test_missing_file_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let err = DatasetSource::Nids.load("nids", &config_in(dir.path())).unwrap_err();
        assert!(matches!(err, DatasetError::NotFound(_)));
    }
}
