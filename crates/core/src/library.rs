//! 单个测序文库在流式处理中的全部状态。

use crate::category::{QualityTier, VariantCategory};
use crate::cutoff::CutoffPolicy;
use crate::error::Result;
use crate::esp::{EndSequencePair, MateHit};
use crate::insert_size::{CutoffEstimator, InsertSizeHistogram, Thresholds};
use std::collections::HashMap;

/// 文库所处阶段。
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LibraryState {
    /// 阈值未知，成对的ESP暂存在样本中
    Sampling,
    /// 阈值已确定，ESP直接分类
    StatsComputed,
}

/// 等待mate的读。
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PendingMate {
    pub hit: MateHit,
    pub mapping_quality: u8,
    pub read_length: u32,
}

/// 采样阶段暂存、尚未分类的ESP。
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SampledPair {
    pub esp: EndSequencePair,
    pub tier: QualityTier,
}

/// 读长统计。
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ReadLengthStats {
    pub count: u64,
    pub sum: u64,
    pub min: Option<u32>,
}

impl ReadLengthStats {
    pub fn add(&mut self, length: u32) {
        self.count += 1;
        self.sum += length as u64;
        self.min = Some(self.min.map_or(length, |m| m.min(length)));
    }

    pub fn mean(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.sum as f64 / self.count as f64
        }
    }
}

#[derive(Debug)]
pub struct Library {
    name: String,
    state: LibraryState,
    histogram: InsertSizeHistogram,
    read_lengths: ReadLengthStats,
    /// 采样阶段累计成对的读对数
    pair_count: u64,
    thresholds: Option<Thresholds>,
    sample: Vec<SampledPair>,
    pending: HashMap<String, PendingMate>,
    category_counts: [u64; 6],
}

impl Library {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            state: LibraryState::Sampling,
            histogram: InsertSizeHistogram::new(),
            read_lengths: ReadLengthStats::default(),
            pair_count: 0,
            thresholds: None,
            sample: Vec::new(),
            pending: HashMap::new(),
            category_counts: [0; 6],
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn state(&self) -> LibraryState {
        self.state
    }

    pub fn thresholds(&self) -> Option<Thresholds> {
        self.thresholds
    }

    pub fn histogram(&self) -> &InsertSizeHistogram {
        &self.histogram
    }

    pub fn read_lengths(&self) -> &ReadLengthStats {
        &self.read_lengths
    }

    pub fn pair_count(&self) -> u64 {
        self.pair_count
    }

    pub fn sample_len(&self) -> usize {
        self.sample.len()
    }

    /// 取出并移除同名的等待mate。
    pub fn take_pending(&mut self, read_name: &str) -> Option<PendingMate> {
        self.pending.remove(read_name)
    }

    pub fn park(&mut self, read_name: String, mate: PendingMate) {
        self.pending.insert(read_name, mate);
    }

    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// 清空等待表，返回被丢弃的读数。
    pub fn clear_pending(&mut self) -> usize {
        let n = self.pending.len();
        self.pending.clear();
        n
    }

    /// 采样阶段加入一对ESP。
    ///
    /// `for_stats` 为真时该读对的插入长度和两条读长计入统计。
    pub fn sample_pair(&mut self, pair: SampledPair, for_stats: bool, read_lengths: (u32, u32)) {
        self.pair_count += 1;
        if for_stats {
            self.histogram.add(pair.esp.insert_length());
            self.read_lengths.add(read_lengths.0);
            self.read_lengths.add(read_lengths.1);
        }
        self.sample.push(pair);
    }

    /// 计算阈值并进入 `StatsComputed`，返回待分类的样本。
    pub fn compute_thresholds(&mut self, policy: CutoffPolicy) -> Result<Vec<SampledPair>> {
        self.thresholds =
            CutoffEstimator::estimate(&self.name, self.pair_count, &self.histogram, policy)?;
        self.state = LibraryState::StatsComputed;
        Ok(std::mem::take(&mut self.sample))
    }

    pub fn count(&mut self, category: VariantCategory) {
        self.category_counts[category.index()] += 1;
    }

    pub fn category_count(&self, category: VariantCategory) -> u64 {
        self.category_counts[category.index()]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::esp::Strand;

    fn pair(start: i64, end: i64) -> SampledPair {
        SampledPair {
            esp: EndSequencePair::new(
                "r",
                MateHit { chromosome: 1, start, end: start + 49, strand: Strand::Forward },
                MateHit { chromosome: 1, start: end - 49, end, strand: Strand::Reverse },
            ),
            tier: QualityTier::High,
        }
    }

    #[test]
    fn test_sampling_to_stats() {
        let mut lib = Library::new("libA");
        assert_eq!(lib.state(), LibraryState::Sampling);

        lib.sample_pair(pair(100, 399), true, (50, 50));
        lib.sample_pair(pair(100, 299), true, (50, 48));
        lib.sample_pair(pair(100, 9999), false, (50, 50));

        assert_eq!(lib.pair_count(), 3);
        assert_eq!(lib.histogram().total(), 2);
        assert_eq!(lib.read_lengths().min, Some(48));
        assert_eq!(lib.read_lengths().count, 4);

        let drained = lib
            .compute_thresholds(CutoffPolicy::Exact { lmin: 150, lmax: 350 })
            .unwrap();
        assert_eq!(drained.len(), 3);
        assert_eq!(lib.sample_len(), 0);
        assert_eq!(lib.state(), LibraryState::StatsComputed);
        assert_eq!(lib.thresholds(), Some(Thresholds { lmin: 150, lmax: 350 }));
    }

    #[test]
    fn test_empty_library_keeps_thresholds_unset() {
        let mut lib = Library::new("empty");
        let drained = lib.compute_thresholds(CutoffPolicy::Percentile(99)).unwrap();
        assert!(drained.is_empty());
        assert_eq!(lib.thresholds(), None);
        assert_eq!(lib.state(), LibraryState::StatsComputed);
    }

    #[test]
    fn test_pending_mates() {
        let mut lib = Library::new("libA");
        let mate = PendingMate {
            hit: MateHit { chromosome: 2, start: 10, end: 60, strand: Strand::Reverse },
            mapping_quality: 30,
            read_length: 51,
        };
        lib.park("r1".to_string(), mate.clone());
        lib.park("r2".to_string(), mate.clone());
        assert_eq!(lib.take_pending("r1"), Some(mate));
        assert_eq!(lib.take_pending("r1"), None);
        assert_eq!(lib.clear_pending(), 1);
    }
}
