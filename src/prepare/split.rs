//! ラベルで層化した学習/テスト分割

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

/// 元データの行インデックスによる分割結果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StratifiedSplit {
    pub train: Vec<usize>,
    pub test: Vec<usize>,
}

/// テスト行数 `ceil(test_ratio * n)` を各クラスの比率に合わせて割り振る
///
/// 端数は小数部の大きいクラスから順に 1 件ずつ配る（同値はクラスID順）。
pub fn allocate_per_class(counts: &[usize], draw: usize) -> Vec<usize> {
    let total: usize = counts.iter().sum();
    if total == 0 {
        return vec![0; counts.len()];
    }
    let exact: Vec<f64> = counts
        .iter()
        .map(|&c| c as f64 * draw as f64 / total as f64)
        .collect();
    let mut allocated: Vec<usize> = exact.iter().map(|v| v.floor() as usize).collect();
    let mut remaining = draw.saturating_sub(allocated.iter().sum());

    let mut order: Vec<usize> = (0..counts.len()).collect();
    order.sort_by(|&a, &b| {
        let fa = exact[a] - exact[a].floor();
        let fb = exact[b] - exact[b].floor();
        fb.total_cmp(&fa).then(a.cmp(&b))
    });
    while remaining > 0 {
        let before = remaining;
        for &class in &order {
            if remaining == 0 {
                break;
            }
            if allocated[class] < counts[class] {
                allocated[class] += 1;
                remaining -= 1;
            }
        }
        if before == remaining {
            break;
        }
    }
    allocated
}

/// 層化分割を行う。同じラベル列とシードからは同じ分割になる。
pub fn stratified_split(labels: &[u32], num_classes: usize, test_ratio: f64, seed: u64) -> StratifiedSplit {
    let n = labels.len();
    let n_test = ((test_ratio * n as f64).ceil() as usize).min(n);

    let mut by_class: Vec<Vec<usize>> = vec![Vec::new(); num_classes];
    for (i, &label) in labels.iter().enumerate() {
        by_class[label as usize].push(i);
    }
    let counts: Vec<usize> = by_class.iter().map(Vec::len).collect();
    let test_counts = allocate_per_class(&counts, n_test);

    let mut rng = StdRng::seed_from_u64(seed);
    let mut train = Vec::with_capacity(n - n_test);
    let mut test = Vec::with_capacity(n_test);
    for (mut members, take) in by_class.into_iter().zip(test_counts) {
        members.shuffle(&mut rng);
        test.extend_from_slice(&members[..take]);
        train.extend_from_slice(&members[take..]);
    }
    train.shuffle(&mut rng);
    test.shuffle(&mut rng);

    StratifiedSplit { train, test }
}
