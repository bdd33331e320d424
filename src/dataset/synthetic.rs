//! 1次元ガウス分布の合成データ

use crate::error::{DatasetError, DatasetResult};
use crate::model::SyntheticSettings;
use ndarray::{Array1, Array2, Axis};
use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::{Distribution, Normal};

/// クラス `i` の平均を `i * distance` とした正規分布サンプルを生成する
///
/// 各クラス `samples / classes` 件をクラス順に連結する。シード固定で再現可能。
pub fn generate_gaussian(
    settings: &SyntheticSettings,
    sigma: f64,
) -> DatasetResult<(Array2<f64>, Vec<u32>)> {
    if settings.classes == 0 {
        return Err(DatasetError::InvalidInput("synthetic classes must be positive".to_string()));
    }
    if !(sigma.is_finite() && sigma > 0.0) {
        return Err(DatasetError::InvalidInput(format!("sigma must be positive: {}", sigma)));
    }
    let per_class = settings.samples / settings.classes;
    let mut rng = StdRng::seed_from_u64(settings.seed);

    let mut values = Vec::with_capacity(per_class * settings.classes);
    let mut labels = Vec::with_capacity(per_class * settings.classes);
    for class in 0..settings.classes {
        let mean = class as f64 * settings.distance;
        let normal = Normal::new(mean, sigma)
            .map_err(|e| DatasetError::InvalidInput(format!("sigma {}: {}", sigma, e)))?;
        values.extend((0..per_class).map(|_| normal.sample(&mut rng)));
        labels.extend(std::iter::repeat(class as u32).take(per_class));
    }

    let features = Array1::from(values).insert_axis(Axis(1));
    Ok((features, labels))
}
