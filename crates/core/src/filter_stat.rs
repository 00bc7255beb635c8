//! 进入配对阶段之前的记录过滤及按原因的计数。

use bam2gasv_io::MateRecord;
use std::fmt;

/// 记录被丢弃的原因。
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DropReason {
    Unpaired,
    Unmapped,
    MateUnmapped,
    Secondary,
    Supplementary,
    QcFail,
    Duplicate,
}

#[derive(Debug, Default)]
pub struct FilterStat {
    total: u64,
    passed: u64,
    unpaired: u64,
    unmapped: u64,
    secondary: u64,
    supplementary: u64,
    qc_fail: u64,
    duplicate: u64,
}

impl FilterStat {
    pub fn new() -> Self {
        Self::default()
    }

    /// 判断记录是否应被丢弃，不修改计数。
    pub fn check(record: &MateRecord, include_duplicates: bool) -> Option<DropReason> {
        if !record.is_paired() {
            return Some(DropReason::Unpaired);
        }
        if record.is_unmapped() {
            return Some(DropReason::Unmapped);
        }
        if record.is_mate_unmapped() {
            return Some(DropReason::MateUnmapped);
        }
        if record.is_secondary() {
            return Some(DropReason::Secondary);
        }
        if record.is_supplementary() {
            return Some(DropReason::Supplementary);
        }
        if record.is_qc_fail() {
            return Some(DropReason::QcFail);
        }
        if !include_duplicates && record.is_duplicate() {
            return Some(DropReason::Duplicate);
        }
        None
    }

    /// 更新计数，记录可用时返回 `true`。
    pub fn update(&mut self, record: &MateRecord, include_duplicates: bool) -> bool {
        self.total += 1;

        match Self::check(record, include_duplicates) {
            None => {
                self.passed += 1;
                true
            }
            Some(reason) => {
                match reason {
                    DropReason::Unpaired => self.unpaired += 1,
                    DropReason::Unmapped | DropReason::MateUnmapped => self.unmapped += 1,
                    DropReason::Secondary => self.secondary += 1,
                    DropReason::Supplementary => self.supplementary += 1,
                    DropReason::QcFail => self.qc_fail += 1,
                    DropReason::Duplicate => self.duplicate += 1,
                }
                false
            }
        }
    }

    pub fn total(&self) -> u64 {
        self.total
    }

    pub fn passed(&self) -> u64 {
        self.passed
    }

    pub fn pass_rate(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.passed as f64 / self.total as f64
        }
    }
}

impl fmt::Display for FilterStat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "total: {}", self.total)?;
        writeln!(f, "unpaired: {}", self.unpaired)?;
        writeln!(f, "unmapped: {}", self.unmapped)?;
        writeln!(f, "secondary: {}", self.secondary)?;
        writeln!(f, "supplementary: {}", self.supplementary)?;
        writeln!(f, "qc_fail: {}", self.qc_fail)?;
        writeln!(f, "duplicate: {}", self.duplicate)?;
        write!(f, "passed: {} ({:.2}%)", self.passed, self.pass_rate() * 100.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bam2gasv_io::flags;

    fn record(bits: u16) -> MateRecord {
        MateRecord {
            read_name: "r".to_string(),
            reference_name: "1".to_string(),
            mate_reference_name: "1".to_string(),
            start: 1,
            end: 50,
            mapping_quality: 60,
            flags: bits,
            read_group: None,
            read_length: 50,
        }
    }

    #[test]
    fn test_drop_reasons() {
        assert_eq!(FilterStat::check(&record(0), false), Some(DropReason::Unpaired));
        assert_eq!(
            FilterStat::check(&record(flags::PAIRED | flags::MATE_UNMAPPED), false),
            Some(DropReason::MateUnmapped)
        );
        assert_eq!(
            FilterStat::check(&record(flags::PAIRED | flags::DUPLICATE), false),
            Some(DropReason::Duplicate)
        );
        assert_eq!(FilterStat::check(&record(flags::PAIRED | flags::DUPLICATE), true), None);
        assert_eq!(
            FilterStat::check(&record(flags::PAIRED | flags::SUPPLEMENTARY), true),
            Some(DropReason::Supplementary)
        );
    }

    #[test]
    fn test_counts_and_display() {
        let mut stat = FilterStat::new();
        assert!(stat.update(&record(flags::PAIRED), false));
        assert!(!stat.update(&record(flags::PAIRED | flags::SECONDARY), false));
        assert!(!stat.update(&record(flags::PAIRED | flags::QC_FAIL), false));
        assert!(stat.update(&record(flags::PAIRED | flags::REVERSE), false));

        assert_eq!(stat.total(), 4);
        assert_eq!(stat.passed(), 2);
        let text = stat.to_string();
        assert!(text.contains("secondary: 1"));
        assert!(text.contains("passed: 2 (50.00%)"));
    }
}
