//! 工作组内的两遍归约。
//!
//! 每行由一个工作组处理。组内第 `lane` 个线程负责第 `lane, lane + G, ...` 个通道切片，
//! 切片中超出通道数的分量被屏蔽。各线程的部分和写入组内共享存储，
//! 再以树形归约汇总到 0 号单元，归约的每一层之间都有一次组内同步。

use crate::SLICE;

/// 一行的统计量，仅在一次发射中存在。
#[derive(Clone, Copy, PartialEq, Debug)]
pub(super) struct Moments {
    pub mean: f64,
    pub inv_std: f64,
}

/// 依次访问 `lane` 线程负责的所有有效通道。
#[inline]
pub(super) fn lane_channels(
    group_size: usize,
    lane: usize,
    channels: usize,
) -> impl Iterator<Item = usize> {
    let slices = channels.div_ceil(SLICE);
    (lane..slices)
        .step_by(group_size)
        .flat_map(move |s| s * SLICE..(s * SLICE + SLICE).min(channels))
}

/// 组内共享存储上的树形归约，结果留在 0 号单元。
///
/// `local` 的长度必须是 2 的幂。
pub(super) fn tree_sum(local: &mut [f64]) -> f64 {
    debug_assert!(local.len().is_power_of_two());
    let mut half = local.len() / 2;
    while half > 0 {
        let (head, tail) = local.split_at_mut(half);
        for (a, b) in head.iter_mut().zip(&*tail) {
            *a += *b
        }
        half /= 2;
    }
    local[0]
}

/// 计算一行的均值和标准差倒数。
///
/// `load` 按通道号读出元素。方差恰为 0 时标准差视为 1，使常数行的输出恰为 0。
pub(super) fn moments(
    local: &mut [f64],
    channels: usize,
    epsilon: f64,
    load: impl Fn(usize) -> f64,
) -> Moments {
    let group_size = local.len();
    let n = channels as f64;

    for (lane, acc) in local.iter_mut().enumerate() {
        *acc = lane_channels(group_size, lane, channels).map(&load).sum();
    }
    let mean = tree_sum(local) / n;

    for (lane, acc) in local.iter_mut().enumerate() {
        *acc = lane_channels(group_size, lane, channels)
            .map(|c| {
                let d = load(c) - mean;
                d * d
            })
            .sum();
    }
    let variance = tree_sum(local) / n;

    let inv_std = if variance == 0. {
        1.
    } else {
        (variance + epsilon).sqrt().recip()
    };
    Moments { mean, inv_std }
}

#[cfg(test)]
mod test {
    use super::{lane_channels, moments, tree_sum, Moments};

    #[test]
    fn test_lane_channels() {
        // 10 个通道分成 3 个切片，最后一个切片只有 2 个有效分量
        let lanes = (0..2)
            .map(|lane| lane_channels(2, lane, 10).collect::<Vec<_>>())
            .collect::<Vec<_>>();
        assert_eq!(lanes, [vec![0, 1, 2, 3, 8, 9], vec![4, 5, 6, 7]]);
        // 线程多于切片时多余的线程没有工作
        assert_eq!(lane_channels(4, 3, 10).count(), 0);
    }

    #[test]
    fn test_tree_sum() {
        let mut local = (1..=8).map(f64::from).collect::<Vec<_>>();
        assert_eq!(tree_sum(&mut local), 36.);
        assert_eq!(tree_sum(&mut [5.]), 5.);
    }

    #[test]
    fn test_constant_row() {
        for x in [0., 0.01f32 as f64, 100., -3.5e7] {
            for group_size in [1, 2, 8] {
                let mut local = vec![0.; group_size];
                let Moments { mean, inv_std } = moments(&mut local, 37, 1e-8, |_| x);
                assert_eq!(mean, x);
                assert_eq!(inv_std, 1.);
            }
        }
    }

    #[test]
    fn test_group_size_invariance() {
        let row = (0..29).map(|i| (i * 7 % 11) as f64 - 3.).collect::<Vec<_>>();
        let mean = row.iter().sum::<f64>() / 29.;
        let variance = row.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / 29.;
        for group_size in [1, 2, 4, 8, 16] {
            let mut local = vec![0.; group_size];
            let m = moments(&mut local, row.len(), 0., |c| row[c]);
            assert!((m.mean - mean).abs() < 1e-12);
            assert!((m.inv_std - variance.sqrt().recip()).abs() < 1e-12);
        }
    }
}
