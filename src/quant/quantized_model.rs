//! int8 量子化MLPとその保存形式
//!
//! ## `.qmodel` 形式（リトルエンディアン）
//! - ヘッダ: `b"QMLP"`、バージョン(u8)、出力(u8: 0=softmax, 1=sigmoid)、層数(u32)
//! - 層ごと: 入力数(u32)、出力数(u32)、ReLU(u8)、入力スケール(f32)、入力ゼロ点(i32)、
//!   重みスケール(f32)、重み(i8 × 入力×出力)、バイアス(i32 × 出力)
//!
//! 重みは `[入力, 出力]` の行優先。

use anyhow::{bail, Context, Result};
use ndarray::ArrayView2;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

use crate::ml::{DenseLayer, OutputKind};
use crate::quant::quantization::{quantize_bias, quantize_symmetric, QuantParams};

const MAGIC: &[u8; 4] = b"QMLP";
const FORMAT_VERSION: u8 = 2;

/// int8 の全結合層
#[derive(Debug, Clone, PartialEq)]
pub struct QuantizedLayer {
    pub inputs: usize,
    pub outputs: usize,
    pub relu: bool,
    pub input_params: QuantParams,
    pub weight_scale: f32,
    pub weights: Vec<i8>,
    pub bias: Vec<i32>,
}

impl QuantizedLayer {
    /// 入力を量子化して i32 で積和し、最後に実数へ戻す
    fn forward(&self, input: &[f32]) -> Vec<f32> {
        let zp = self.input_params.zero_point;
        let mut acc = self.bias.clone();
        for (i, &x) in input.iter().enumerate() {
            let q = self.input_params.quantize(x) as i32 - zp;
            if q == 0 {
                continue;
            }
            let row = &self.weights[i * self.outputs..(i + 1) * self.outputs];
            for (a, &w) in acc.iter_mut().zip(row) {
                *a += q * w as i32;
            }
        }
        let scale = self.input_params.scale * self.weight_scale;
        acc.into_iter()
            .map(|a| {
                let v = a as f32 * scale;
                if self.relu {
                    v.max(0.0)
                } else {
                    v
                }
            })
            .collect()
    }
}

/// int8 量子化MLP
#[derive(Debug, Clone, PartialEq)]
pub struct QuantizedMlp {
    pub output: OutputKind,
    pub layers: Vec<QuantizedLayer>,
}

impl QuantizedMlp {
    /// 浮動小数点の層を int8 に変換する
    ///
    /// `input_ranges` は各層の入力の校正範囲 `(min, max)`。
    pub fn convert(layers: &[DenseLayer], output: OutputKind, input_ranges: &[(f32, f32)]) -> Result<Self> {
        if layers.is_empty() {
            bail!("Model has no layers");
        }
        if input_ranges.len() != layers.len() {
            bail!(
                "Got {} calibration ranges for {} layers",
                input_ranges.len(),
                layers.len()
            );
        }
        for pair in layers.windows(2) {
            if pair[0].outputs != pair[1].inputs {
                bail!(
                    "Layer shapes do not chain: {} outputs into {} inputs",
                    pair[0].outputs,
                    pair[1].inputs
                );
            }
        }

        let converted = layers
            .iter()
            .zip(input_ranges)
            .map(|(layer, &(lo, hi))| {
                let input_params = QuantParams::asymmetric(lo, hi);
                let (weights, weight_params) = quantize_symmetric(&layer.weights);
                QuantizedLayer {
                    inputs: layer.inputs,
                    outputs: layer.outputs,
                    relu: layer.relu,
                    input_params,
                    weight_scale: weight_params.scale,
                    weights,
                    bias: quantize_bias(&layer.bias, input_params.scale, weight_params.scale),
                }
            })
            .collect();

        Ok(Self {
            output,
            layers: converted,
        })
    }

    pub fn num_features(&self) -> usize {
        self.layers.first().map(|l| l.inputs).unwrap_or(0)
    }

    pub fn output_units(&self) -> usize {
        self.layers.last().map(|l| l.outputs).unwrap_or(0)
    }

    /// 1行ぶんの確率
    pub fn predict_row(&self, row: &[f32]) -> Vec<f32> {
        let mut activation = row.to_vec();
        for layer in &self.layers {
            activation = layer.forward(&activation);
        }
        match self.output {
            OutputKind::Softmax => softmax(&activation),
            OutputKind::Sigmoid => activation.iter().map(|&v| 1.0 / (1.0 + (-v).exp())).collect(),
        }
    }

    /// 全行の確率（行優先 `[rows, output_units]`）
    pub fn predict(&self, x: ArrayView2<f32>) -> Result<Vec<f32>> {
        if x.ncols() != self.num_features() {
            bail!(
                "Input has {} columns, model expects {}",
                x.ncols(),
                self.num_features()
            );
        }
        let mut probs = Vec::with_capacity(x.nrows() * self.output_units());
        for row in x.rows() {
            probs.extend(self.predict_row(&row.to_vec()));
        }
        Ok(probs)
    }

    pub fn write_to<W: Write>(&self, mut w: W) -> Result<()> {
        w.write_all(MAGIC)?;
        w.write_all(&[
            FORMAT_VERSION,
            match self.output {
                OutputKind::Softmax => 0,
                OutputKind::Sigmoid => 1,
            },
        ])?;
        w.write_all(&(self.layers.len() as u32).to_le_bytes())?;

        for layer in &self.layers {
            w.write_all(&(layer.inputs as u32).to_le_bytes())?;
            w.write_all(&(layer.outputs as u32).to_le_bytes())?;
            w.write_all(&[layer.relu as u8])?;
            w.write_all(&layer.input_params.scale.to_le_bytes())?;
            w.write_all(&layer.input_params.zero_point.to_le_bytes())?;
            w.write_all(&layer.weight_scale.to_le_bytes())?;
            let raw: Vec<u8> = layer.weights.iter().map(|&q| q as u8).collect();
            w.write_all(&raw)?;
            for b in &layer.bias {
                w.write_all(&b.to_le_bytes())?;
            }
        }
        w.flush()?;
        Ok(())
    }

    pub fn read_from<R: Read>(mut r: R) -> Result<Self> {
        let mut magic = [0u8; 4];
        r.read_exact(&mut magic).context("Failed to read model header")?;
        if &magic != MAGIC {
            bail!("Not a quantized model file");
        }
        let [version, output] = read_array::<2>(&mut r)?;
        if version != FORMAT_VERSION {
            bail!("Unsupported model format version: {}", version);
        }
        let output = match output {
            0 => OutputKind::Softmax,
            1 => OutputKind::Sigmoid,
            other => bail!("Unknown output kind code: {}", other),
        };

        let layer_count = read_u32(&mut r)? as usize;
        let mut layers = Vec::with_capacity(layer_count.min(64));
        for _ in 0..layer_count {
            let inputs = read_u32(&mut r)? as usize;
            let outputs = read_u32(&mut r)? as usize;
            let [relu] = read_array::<1>(&mut r)?;
            let scale = f32::from_le_bytes(read_array(&mut r)?);
            let zero_point = i32::from_le_bytes(read_array(&mut r)?);
            let weight_scale = f32::from_le_bytes(read_array(&mut r)?);
            let mut raw = vec![0u8; inputs * outputs];
            r.read_exact(&mut raw).context("Truncated int8 weights")?;
            let bias = (0..outputs)
                .map(|_| -> Result<i32> { Ok(i32::from_le_bytes(read_array(&mut r)?)) })
                .collect::<Result<Vec<_>>>()?;

            layers.push(QuantizedLayer {
                inputs,
                outputs,
                relu: relu != 0,
                input_params: QuantParams { scale, zero_point },
                weight_scale,
                weights: raw.into_iter().map(|b| b as i8).collect(),
                bias,
            });
        }

        Ok(Self { output, layers })
    }

    /// ファイルに保存し、書き込んだバイト数を返す
    pub fn save(&self, path: &Path) -> Result<u64> {
        let file = File::create(path).context(format!("Failed to create model file: {:?}", path))?;
        self.write_to(BufWriter::new(file))?;
        Ok(fs::metadata(path)?.len())
    }

    pub fn load(path: &Path) -> Result<Self> {
        let file = File::open(path).context(format!("Failed to open model file: {:?}", path))?;
        Self::read_from(BufReader::new(file)).context(format!("Failed to read model file: {:?}", path))
    }
}

fn read_array<const N: usize>(r: &mut impl Read) -> Result<[u8; N]> {
    let mut buf = [0u8; N];
    r.read_exact(&mut buf).context("Unexpected end of model file")?;
    Ok(buf)
}

fn read_u32(r: &mut impl Read) -> Result<u32> {
    Ok(u32::from_le_bytes(read_array(r)?))
}

fn softmax(logits: &[f32]) -> Vec<f32> {
    let max = logits.iter().fold(f32::NEG_INFINITY, |m, &v| m.max(v));
    let exp: Vec<f32> = logits.iter().map(|&v| (v - max).exp()).collect();
    let sum: f32 = exp.iter().sum();
    exp.into_iter().map(|v| v / sum).collect()
}
