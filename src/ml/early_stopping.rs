/// 監視値の更新結果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EarlyStoppingDecision {
    /// 最良値を更新した（重みを保存する）
    Improved,
    Continue,
    Stop,
}

/// 最大化する指標に対する早期終了
///
/// `value - min_delta > best` のときだけ改善とみなし、改善のないエポックが
/// `patience` 回続いたら停止する。
#[derive(Debug, Clone)]
pub struct EarlyStopping {
    patience: usize,
    min_delta: f64,
    best: Option<f64>,
    best_epoch: usize,
    wait: usize,
}

impl EarlyStopping {
    pub fn new(patience: usize, min_delta: f64) -> Self {
        Self {
            patience,
            min_delta: min_delta.abs(),
            best: None,
            best_epoch: 0,
            wait: 0,
        }
    }

    pub fn update(&mut self, epoch: usize, value: f64) -> EarlyStoppingDecision {
        let improved = match self.best {
            None => true,
            Some(best) => value - self.min_delta > best,
        };
        if improved {
            self.best = Some(value);
            self.best_epoch = epoch;
            self.wait = 0;
            return EarlyStoppingDecision::Improved;
        }

        self.wait += 1;
        if self.wait >= self.patience {
            EarlyStoppingDecision::Stop
        } else {
            EarlyStoppingDecision::Continue
        }
    }

    pub fn best(&self) -> Option<f64> {
        self.best
    }

    pub fn best_epoch(&self) -> usize {
        self.best_epoch
    }
}
