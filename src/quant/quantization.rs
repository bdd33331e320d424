//! int8 量子化パラメータと校正
//!
//! 実数値は `scale * (q - zero_point)` で表す。重みは対称（zero_point = 0）、
//! 各層の入力活性は校正データの範囲から求めた非対称パラメータを使う。

use anyhow::{bail, Result};
use burn::tensor::{backend::Backend, ElementConversion, Tensor};
use ndarray::ArrayView2;

use crate::ml::MlpClassifier;

/// アフィン量子化パラメータ
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QuantParams {
    pub scale: f32,
    pub zero_point: i32,
}

impl QuantParams {
    /// `[-max_abs, max_abs]` を `[-127, 127]` に対応させる
    pub fn symmetric(max_abs: f32) -> Self {
        let scale = if max_abs < 1e-10 { 1.0 } else { max_abs / 127.0 };
        Self { scale, zero_point: 0 }
    }

    /// `[min_val, max_val]` を `[-128, 127]` に対応させる
    ///
    /// 範囲は 0 を含むように広げるので、0 は誤差なく表現できる。
    pub fn asymmetric(min_val: f32, max_val: f32) -> Self {
        let min_val = min_val.min(0.0);
        let max_val = max_val.max(0.0);
        let range = max_val - min_val;
        let scale = if range < 1e-10 { 1.0 } else { range / 255.0 };
        let zero_point = ((-128.0f32 - min_val / scale).round() as i32).clamp(-128, 127);
        Self { scale, zero_point }
    }

    pub fn quantize(&self, value: f32) -> i8 {
        ((value / self.scale).round() as i32 + self.zero_point).clamp(-128, 127) as i8
    }

    pub fn dequantize(&self, q: i8) -> f32 {
        (q as i32 - self.zero_point) as f32 * self.scale
    }
}

/// 重みを対称 int8 に量子化
pub fn quantize_symmetric(values: &[f32]) -> (Vec<i8>, QuantParams) {
    let max_abs = values.iter().fold(0.0f32, |m, v| m.max(v.abs()));
    let params = QuantParams::symmetric(max_abs);
    let quantized = values
        .iter()
        .map(|&v| (v / params.scale).round().clamp(-127.0, 127.0) as i8)
        .collect();
    (quantized, params)
}

/// バイアスを `input_scale * weight_scale` の int32 に量子化
pub fn quantize_bias(bias: &[f32], input_scale: f32, weight_scale: f32) -> Vec<i32> {
    let scale = input_scale * weight_scale;
    bias.iter()
        .map(|&b| (b / scale).round().clamp(i32::MIN as f32, i32::MAX as f32) as i32)
        .collect()
}

/// 校正データをモデルに流し、各層の入力範囲 `(min, max)` を求める
///
/// 校正データが空なら各層 `(0, 0)`。
pub fn calibrate_input_ranges<B: Backend>(
    model: &MlpClassifier<B>,
    calibration: ArrayView2<f32>,
    num_features: usize,
    device: &B::Device,
) -> Result<Vec<(f32, f32)>> {
    if calibration.ncols() != num_features {
        bail!(
            "Calibration data has {} columns, model expects {}",
            calibration.ncols(),
            num_features
        );
    }
    if calibration.nrows() == 0 {
        return Ok(vec![(0.0, 0.0); model.num_layers()]);
    }

    let values: Vec<f32> = calibration.iter().copied().collect();
    let features = Tensor::<B, 1>::from_floats(values.as_slice(), device)
        .reshape([calibration.nrows(), calibration.ncols()]);
    let ranges = model
        .layer_inputs(features)
        .into_iter()
        .map(|input| {
            let lo = input.clone().min().into_scalar().elem::<f32>();
            let hi = input.max().into_scalar().elem::<f32>();
            (lo, hi)
        })
        .collect();
    Ok(ranges)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ml::MlpConfig;
    use approx::assert_abs_diff_eq;
    use burn::backend::NdArray;
    use ndarray::{array, Array2};

    #[test]
    fn test_symmetric_round_trip() {
        let (q, params) = quantize_symmetric(&[0.0, 1.0, -1.0, 0.25]);
        assert_eq!(params.zero_point, 0);
        assert_eq!(q, vec![0, 127, -127, 32]);
        for (&orig, &qv) in [0.0f32, 1.0, -1.0, 0.25].iter().zip(&q) {
            assert!((orig - params.dequantize(qv)).abs() < 0.01);
        }
    }

    #[test]
    fn test_asymmetric_includes_zero() {
        // 正の値だけの範囲でも 0 を含むように広げる
        let params = QuantParams::asymmetric(2.0, 4.0);
        assert_eq!(params.quantize(0.0), -128);
        assert_abs_diff_eq!(params.dequantize(params.quantize(0.0)), 0.0);
        assert!((params.dequantize(params.quantize(3.0)) - 3.0).abs() < params.scale);

        let params = QuantParams::asymmetric(-1.0, 1.0);
        assert!((params.dequantize(params.quantize(0.8)) - 0.8).abs() < 0.01);
    }

    #[test]
    fn test_degenerate_ranges() {
        assert_eq!(QuantParams::symmetric(0.0).scale, 1.0);
        assert_eq!(QuantParams::asymmetric(0.0, 0.0).scale, 1.0);
        let (q, _) = quantize_symmetric(&[0.0, 0.0]);
        assert_eq!(q, vec![0, 0]);
    }

    #[test]
    fn test_bias_uses_combined_scale() {
        assert_eq!(quantize_bias(&[0.5, -0.25], 0.5, 0.1), vec![10, -5]);
    }

    #[test]
    fn test_calibration_tracks_each_layer_input() {
        let device = Default::default();
        let model = MlpConfig::new(2, 3, 1, 4).init::<NdArray>(&device);
        let x = array![[1.0f32, 2.0], [-3.0, 0.5]];
        let ranges = calibrate_input_ranges(&model, x.view(), 2, &device).unwrap();

        assert_eq!(ranges.len(), 2);
        assert_eq!(ranges[0], (-3.0, 2.0));
        // 隠れ層の出力は ReLU 後
        assert!(ranges[1].0 >= 0.0 && ranges[1].0 <= ranges[1].1);
    }

    #[test]
    fn test_calibration_edge_cases() {
        let device = Default::default();
        let model = MlpConfig::new(2, 3, 2, 4).init::<NdArray>(&device);

        let empty = Array2::<f32>::zeros((0, 2));
        let ranges = calibrate_input_ranges(&model, empty.view(), 2, &device).unwrap();
        assert_eq!(ranges, vec![(0.0, 0.0); 3]);

        let wrong = Array2::<f32>::zeros((4, 5));
        assert!(calibrate_input_ranges(&model, wrong.view(), 2, &device).is_err());
    }
}
