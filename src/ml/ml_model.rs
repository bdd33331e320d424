//! 表形式データ用の多層パーセプトロン
//!
//! 隠れ層の数と幅で形が決まる分類器と、量子化用の重み取り出しを提供します。

use anyhow::Result;
use burn::{
    config::Config,
    module::Module,
    nn::{
        loss::{BinaryCrossEntropyLossConfig, CrossEntropyLossConfig},
        Linear, LinearConfig, Relu,
    },
    tensor::{
        activation::{sigmoid, softmax},
        backend::Backend,
        Int, Tensor,
    },
};

/// 出力層の種類
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputKind {
    /// クラス数ぶんのユニット + softmax
    Softmax,
    /// 1ユニット + sigmoid（2値分類）
    Sigmoid,
}

/// モデル設定
#[derive(Config, Debug)]
pub struct MlpConfig {
    /// 入力特徴量の次元
    pub num_features: usize,
    /// 分類クラス数（2以下なら2値分類）
    pub num_classes: usize,
    /// 隠れ層の数（0なら線形分類器）
    pub depth: usize,
    /// 隠れ層のユニット数
    pub width: usize,
}

impl MlpConfig {
    pub fn output_kind(&self) -> OutputKind {
        if self.num_classes > 2 {
            OutputKind::Softmax
        } else {
            OutputKind::Sigmoid
        }
    }

    pub fn output_units(&self) -> usize {
        match self.output_kind() {
            OutputKind::Softmax => self.num_classes,
            OutputKind::Sigmoid => 1,
        }
    }

    /// モデルを初期化
    pub fn init<B: Backend>(&self, device: &B::Device) -> MlpClassifier<B> {
        let mut hidden = Vec::with_capacity(self.depth);
        let mut d_input = self.num_features;
        for _ in 0..self.depth {
            hidden.push(LinearConfig::new(d_input, self.width).init(device));
            d_input = self.width;
        }

        MlpClassifier {
            hidden,
            output: LinearConfig::new(d_input, self.output_units()).init(device),
            activation: Relu::new(),
        }
    }
}

/// 多層パーセプトロン分類器
///
/// # アーキテクチャ
/// - {Linear + ReLU} x depth
/// - Linear: -> num_classes（softmax）または 1（sigmoid）
#[derive(Module, Debug)]
pub struct MlpClassifier<B: Backend> {
    hidden: Vec<Linear<B>>,
    output: Linear<B>,
    activation: Relu,
}

/// 量子化器に渡す1層ぶんの重み
#[derive(Debug, Clone, PartialEq)]
pub struct DenseLayer {
    pub inputs: usize,
    pub outputs: usize,
    /// `[inputs, outputs]` 行優先
    pub weights: Vec<f32>,
    pub bias: Vec<f32>,
    /// 出力に ReLU を掛けるか
    pub relu: bool,
}

impl<B: Backend> MlpClassifier<B> {
    /// 順伝播
    ///
    /// # 引数
    /// - `features`: [batch_size, num_features]
    ///
    /// # 戻り値
    /// - 活性化前の出力 [batch_size, output_units]
    pub fn forward(&self, features: Tensor<B, 2>) -> Tensor<B, 2> {
        let mut x = features;
        for layer in &self.hidden {
            x = self.activation.forward(layer.forward(x));
        }
        self.output.forward(x)
    }

    /// 各全結合層への入力（先頭は `features` そのもの、ReLU 適用後）
    pub fn layer_inputs(&self, features: Tensor<B, 2>) -> Vec<Tensor<B, 2>> {
        let mut inputs = Vec::with_capacity(self.hidden.len() + 1);
        let mut x = features;
        for layer in &self.hidden {
            inputs.push(x.clone());
            x = self.activation.forward(layer.forward(x));
        }
        inputs.push(x);
        inputs
    }

    /// 全結合層の数（出力層を含む）
    pub fn num_layers(&self) -> usize {
        self.hidden.len() + 1
    }

    /// 出力が1ユニットなら2値分類
    pub fn output_kind(&self) -> OutputKind {
        let [_, units] = self.output.weight.val().dims();
        if units == 1 {
            OutputKind::Sigmoid
        } else {
            OutputKind::Softmax
        }
    }

    /// 出力層の活性化まで含めた確率
    pub fn probabilities(&self, features: Tensor<B, 2>) -> Tensor<B, 2> {
        self.activate(self.forward(features))
    }

    /// softmax または sigmoid
    pub fn activate(&self, logits: Tensor<B, 2>) -> Tensor<B, 2> {
        match self.output_kind() {
            OutputKind::Softmax => softmax(logits, 1),
            OutputKind::Sigmoid => sigmoid(logits),
        }
    }

    /// バッチ平均の損失
    ///
    /// 多クラスは交差エントロピー、2値はロジットに対する2値交差エントロピー。
    pub fn loss(&self, logits: Tensor<B, 2>, targets: Tensor<B, 1, Int>) -> Tensor<B, 1> {
        let device = logits.device();
        match self.output_kind() {
            OutputKind::Softmax => CrossEntropyLossConfig::new()
                .init(&device)
                .forward(logits, targets),
            OutputKind::Sigmoid => {
                let [batch_size, _] = logits.dims();
                BinaryCrossEntropyLossConfig::new()
                    .with_logits(true)
                    .init(&device)
                    .forward(logits.reshape([batch_size]), targets)
            }
        }
    }

    /// 全結合層の重みを入力側から順に取り出す
    pub fn dense_layers(&self) -> Result<Vec<DenseLayer>> {
        let mut layers = Vec::with_capacity(self.hidden.len() + 1);
        for layer in &self.hidden {
            layers.push(extract_linear(layer, true)?);
        }
        layers.push(extract_linear(&self.output, false)?);
        Ok(layers)
    }
}

fn extract_linear<B: Backend>(linear: &Linear<B>, relu: bool) -> Result<DenseLayer> {
    let weight = linear.weight.val();
    let [inputs, outputs] = weight.dims();
    let weights = weight
        .into_data()
        .to_vec::<f32>()
        .map_err(|e| anyhow::anyhow!("重みの取り出しに失敗しました: {:?}", e))?;
    let bias = match &linear.bias {
        Some(bias) => bias
            .val()
            .into_data()
            .to_vec::<f32>()
            .map_err(|e| anyhow::anyhow!("バイアスの取り出しに失敗しました: {:?}", e))?,
        None => vec![0.0; outputs],
    };

    Ok(DenseLayer {
        inputs,
        outputs,
        weights,
        bias,
        relu,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;

    type TestBackend = NdArray;

    #[test]
    fn test_output_shape_per_kind() {
        let device = Default::default();
        let x = Tensor::<TestBackend, 2>::zeros([5, 4], &device);

        let multi = MlpConfig::new(4, 7, 2, 16).init::<TestBackend>(&device);
        assert_eq!(multi.forward(x.clone()).dims(), [5, 7]);
        assert_eq!(multi.output_kind(), OutputKind::Softmax);

        let binary = MlpConfig::new(4, 2, 1, 8).init::<TestBackend>(&device);
        assert_eq!(binary.forward(x).dims(), [5, 1]);
        assert_eq!(binary.output_kind(), OutputKind::Sigmoid);
    }

    #[test]
    fn test_param_count() {
        let device = Default::default();
        // 4*16+16 + 16*16+16 + 16*7+7
        let model = MlpConfig::new(4, 7, 2, 16).init::<TestBackend>(&device);
        assert_eq!(model.num_params(), 80 + 272 + 119);

        // 線形分類器: 4*1+1
        let linear = MlpConfig::new(4, 2, 0, 0).init::<TestBackend>(&device);
        assert_eq!(linear.num_params(), 5);
    }

    #[test]
    fn test_softmax_rows_sum_to_one() {
        let device = Default::default();
        let model = MlpConfig::new(3, 4, 1, 8).init::<TestBackend>(&device);
        let x = Tensor::<TestBackend, 2>::ones([2, 3], &device);
        let probs = model.probabilities(x).into_data().to_vec::<f32>().unwrap();
        for row in probs.chunks(4) {
            assert!((row.iter().sum::<f32>() - 1.0).abs() < 1e-5);
        }
    }

    #[test]
    fn test_dense_layers_match_architecture() {
        let device = Default::default();
        let model = MlpConfig::new(6, 5, 2, 3).init::<TestBackend>(&device);
        let layers = model.dense_layers().unwrap();

        assert_eq!(layers.len(), 3);
        assert_eq!((layers[0].inputs, layers[0].outputs), (6, 3));
        assert_eq!((layers[2].inputs, layers[2].outputs), (3, 5));
        assert_eq!(layers[0].weights.len(), 18);
        assert_eq!(layers[2].bias.len(), 5);
        assert!(layers[0].relu && layers[1].relu && !layers[2].relu);
    }

    #[test]
    fn test_layer_inputs_follow_hidden_layers() {
        let device = Default::default();
        let model = MlpConfig::new(3, 4, 2, 5).init::<TestBackend>(&device);
        let x = Tensor::<TestBackend, 2>::ones([2, 3], &device);
        let inputs = model.layer_inputs(x);

        let dims: Vec<[usize; 2]> = inputs.iter().map(|t| t.dims()).collect();
        assert_eq!(dims, vec![[2, 3], [2, 5], [2, 5]]);
        assert_eq!(model.num_layers(), 3);
        // 隠れ層の出力は ReLU 後
        let min: f32 = inputs[1].clone().min().into_scalar();
        assert!(min >= 0.0);
    }

    #[test]
    fn test_losses_are_finite() {
        let device = Default::default();
        let x = Tensor::<TestBackend, 2>::ones([3, 2], &device);

        let multi = MlpConfig::new(2, 3, 1, 4).init::<TestBackend>(&device);
        let targets = Tensor::<TestBackend, 1, Int>::from_ints([0, 2, 1], &device);
        let loss: f32 = multi.loss(multi.forward(x.clone()), targets).into_scalar();
        assert!(loss.is_finite() && loss > 0.0);

        let binary = MlpConfig::new(2, 2, 0, 0).init::<TestBackend>(&device);
        let targets = Tensor::<TestBackend, 1, Int>::from_ints([0, 1, 1], &device);
        let loss: f32 = binary.loss(binary.forward(x), targets).into_scalar();
        assert!(loss.is_finite() && loss > 0.0);
    }
}
