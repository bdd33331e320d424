use ndarray::{Array1, Array2, Axis};

/// 列ごとの平均と標準偏差（母標準偏差）
#[derive(Debug, Clone)]
pub struct StandardScaler {
    pub mean: Array1<f64>,
    pub scale: Array1<f64>,
}

impl StandardScaler {
    /// 全行から統計量を求める。NaN は列ごとに除外し、分散 0 の列はスケール 1 とする。
    pub fn fit(x: &Array2<f64>) -> Self {
        let mut mean = Array1::<f64>::zeros(x.ncols());
        let mut scale = Array1::<f64>::ones(x.ncols());
        for (j, column) in x.axis_iter(Axis(1)).enumerate() {
            let present: Vec<f64> = column.iter().copied().filter(|v| !v.is_nan()).collect();
            if present.is_empty() {
                continue;
            }
            let n = present.len() as f64;
            let m = present.iter().sum::<f64>() / n;
            let std = (present.iter().map(|v| (v - m).powi(2)).sum::<f64>() / n).sqrt();
            mean[j] = m;
            scale[j] = if std == 0.0 { 1.0 } else { std };
        }
        Self { mean, scale }
    }

    /// NaN のセルは NaN のまま残る
    pub fn transform(&self, x: &Array2<f64>) -> Array2<f32> {
        let mut out = Array2::<f32>::zeros(x.raw_dim());
        for (mut dst, src) in out.rows_mut().into_iter().zip(x.rows()) {
            for j in 0..src.len() {
                dst[j] = ((src[j] - self.mean[j]) / self.scale[j]) as f32;
            }
        }
        out
    }

    pub fn fit_transform(x: &Array2<f64>) -> Array2<f32> {
        Self::fit(x).transform(x)
    }
}
