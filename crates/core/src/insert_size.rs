//! 插入片段长度分布与Lmin/Lmax推导。
//!
//! 每个文库在采样阶段累积一个长度直方图，采样结束后按截断策略
//! 计算concordant区间 `[Lmin, Lmax]`。

use crate::cutoff::CutoffPolicy;
use crate::error::{GasvError, Result};
use std::collections::BTreeMap;
use tracing::{info, warn};

/// 一个文库的concordant区间，满足 `0 <= lmin < lmax`。
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Thresholds {
    pub lmin: i64,
    pub lmax: i64,
}

/// 插入长度直方图。
#[derive(Debug, Clone, Default)]
pub struct InsertSizeHistogram {
    counts: BTreeMap<i64, u64>,
    total: u64,
    sum: i128,
}

impl InsertSizeHistogram {
    pub fn new() -> Self {
        Self::default()
    }

    /// 添加一个插入长度。
    pub fn add(&mut self, length: i64) {
        *self.counts.entry(length).or_insert(0) += 1;
        self.total += 1;
        self.sum += length as i128;
    }

    pub fn total(&self) -> u64 {
        self.total
    }

    pub fn sum(&self) -> i128 {
        self.sum
    }

    pub fn is_empty(&self) -> bool {
        self.total == 0
    }

    /// 均值，空直方图为0。
    pub fn mean(&self) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        self.sum as f64 / self.total as f64
    }

    /// 总体标准差。
    pub fn std_dev(&self) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        let mean = self.mean();
        let squares: f64 = self
            .counts
            .iter()
            .map(|(&length, &count)| {
                let d = length as f64 - mean;
                d * d * count as f64
            })
            .sum();
        (squares / self.total as f64).sqrt()
    }

    pub fn max_length(&self) -> Option<i64> {
        self.counts.keys().next_back().copied()
    }

    /// 累计计数首次 `>= rank` 的长度（rank为1-based）。
    pub fn value_at_rank(&self, rank: u64) -> Option<i64> {
        let mut running = 0;
        for (&length, &count) in &self.counts {
            running += count;
            if running >= rank {
                return Some(length);
            }
        }
        None
    }
}

/// Lmin/Lmax计算器。
pub struct CutoffEstimator;

impl CutoffEstimator {
    /// nearest-rank百分位位置：`max(1, ceil(q * total / 100))`。
    ///
    /// ```
    /// use bam2gasv_core::CutoffEstimator;
    ///
    /// assert_eq!(CutoffEstimator::percentile_rank(80, 5), 4);
    /// assert_eq!(CutoffEstimator::percentile_rank(20, 5), 1);
    /// assert_eq!(CutoffEstimator::percentile_rank(0, 5), 1);
    /// ```
    pub fn percentile_rank(q: u32, total: u64) -> u64 {
        let scaled = q as u64 * total;
        scaled.div_ceil(100).max(1)
    }

    fn raw_bounds(histogram: &InsertSizeHistogram, policy: CutoffPolicy, library: &str) -> (i64, i64) {
        match policy {
            CutoffPolicy::Exact { lmin, lmax } => (lmin, lmax),
            CutoffPolicy::StdDev(k) => {
                let mean = histogram.mean();
                let spread = k as f64 * histogram.std_dev();
                ((mean - spread).round() as i64, (mean + spread).round() as i64)
            }
            CutoffPolicy::Percentile(p) => {
                let p = if p < 50 {
                    warn!(
                        "文库 {} 的百分位 {}% 小于50%，按 {}% 处理以避免Lmin>Lmax",
                        library,
                        p,
                        100 - p
                    );
                    100 - p
                } else {
                    p
                };
                let total = histogram.total();
                let lower_rank = Self::percentile_rank(100 - p, total);
                let upper_rank = Self::percentile_rank(p, total);
                let lmin = histogram.value_at_rank(lower_rank).unwrap_or(0);
                let lmax = histogram
                    .value_at_rank(upper_rank)
                    .or_else(|| histogram.max_length())
                    .unwrap_or(0);
                (lmin, lmax)
            }
        }
    }

    /// 计算一个文库的阈值。
    ///
    /// # Returns
    ///
    /// * `Ok(None)` - 文库没有任何成对读，阈值保持未设置，下游跳过该文库
    /// * `Ok(Some(_))` - 合法阈值，负的Lmin已截为0
    ///
    /// # Errors
    ///
    /// * `InvalidThresholds` - 截断后仍然 `Lmin >= Lmax`
    pub fn estimate(
        library: &str,
        pair_count: u64,
        histogram: &InsertSizeHistogram,
        policy: CutoffPolicy,
    ) -> Result<Option<Thresholds>> {
        if pair_count == 0 {
            warn!("文库 {} 没有成对读，跳过阈值计算", library);
            return Ok(None);
        }

        let (mut lmin, lmax) = Self::raw_bounds(histogram, policy, library);
        if lmin < 0 {
            warn!("文库 {} 的Lmin={} 为负，修正为0", library, lmin);
            lmin = 0;
        }
        if lmin >= lmax {
            return Err(GasvError::InvalidThresholds {
                library: library.to_string(),
                lmin,
                lmax,
            });
        }

        info!(
            "文库 {} 使用 {}: Lmin={} Lmax={} (样本 {} 个, 均值 {:.2}, 标准差 {:.2})",
            library,
            policy,
            lmin,
            lmax,
            histogram.total(),
            histogram.mean(),
            histogram.std_dev()
        );
        Ok(Some(Thresholds { lmin, lmax }))
    }
}
