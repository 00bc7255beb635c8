//! 变异类别及其输出文件、排序键的配置表。

use crate::sort_key::{KeySpec, StrandSwap};
use std::fmt;

/// ESP的结构变异类别。
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum VariantCategory {
    Concordant,
    Deletion,
    Insertion,
    Inversion,
    Divergent,
    Translocation,
}

/// 每个类别的输出配置。
#[derive(Debug)]
pub struct CategoryProfile {
    /// 输出文件后缀
    pub suffix: &'static str,
    /// 默认排序列（1-based，负数为降序）
    pub key_columns: &'static [i32],
    /// 负链mate交换起止列的规则
    pub strand_swaps: &'static [StrandSwap],
    pub concordant: bool,
}

// concordant行: chr start end
const CONCORDANT_KEY: &[i32] = &[1, 2, 3];
// discordant行: name chr1 start1 end1 ori1 chr2 start2 end2 ori2
const DISCORDANT_KEY: &[i32] = &[2, 3, 4, 6, 7, 8];
const DISCORDANT_SWAPS: &[StrandSwap] = &[
    StrandSwap {
        strand_column: 5,
        start_column: 3,
        end_column: 4,
    },
    StrandSwap {
        strand_column: 9,
        start_column: 7,
        end_column: 8,
    },
];

const fn discordant(suffix: &'static str) -> CategoryProfile {
    CategoryProfile {
        suffix,
        key_columns: DISCORDANT_KEY,
        strand_swaps: DISCORDANT_SWAPS,
        concordant: false,
    }
}

static PROFILES: [CategoryProfile; 6] = [
    CategoryProfile {
        suffix: "concordant",
        key_columns: CONCORDANT_KEY,
        strand_swaps: &[],
        concordant: true,
    },
    discordant("deletion"),
    discordant("insertion"),
    discordant("inversion"),
    discordant("divergent"),
    discordant("translocation"),
];

impl VariantCategory {
    pub const ALL: [VariantCategory; 6] = [
        VariantCategory::Concordant,
        VariantCategory::Deletion,
        VariantCategory::Insertion,
        VariantCategory::Inversion,
        VariantCategory::Divergent,
        VariantCategory::Translocation,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn profile(self) -> &'static CategoryProfile {
        &PROFILES[self.index()]
    }

    pub fn suffix(self) -> &'static str {
        self.profile().suffix
    }

    pub fn is_concordant(self) -> bool {
        self.profile().concordant
    }

    /// 是否列入 `.gasv.in`：非concordant且非insertion。
    pub fn is_gasv_input(self) -> bool {
        !self.is_concordant() && self != VariantCategory::Insertion
    }

    /// 该类别的默认排序键。
    pub fn default_key_spec(self) -> KeySpec {
        let profile = self.profile();
        KeySpec::from_static(profile.key_columns, profile.strand_swaps)
    }
}

impl fmt::Display for VariantCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.suffix())
    }
}

/// 按两条mate的比对质量划分的层级。
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum QualityTier {
    High,
    Low,
}

/// 一个输出桶：类别 × 质量层级。
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Bucket {
    pub category: VariantCategory,
    pub tier: QualityTier,
}

impl Bucket {
    pub fn new(category: VariantCategory, tier: QualityTier) -> Self {
        Self { category, tier }
    }

    pub fn high(category: VariantCategory) -> Self {
        Self::new(category, QualityTier::High)
    }

    /// 文件后缀，低质量桶追加 `_lowq`。
    pub fn suffix(&self) -> String {
        match self.tier {
            QualityTier::High => self.category.suffix().to_string(),
            QualityTier::Low => format!("{}_lowq", self.category.suffix()),
        }
    }
}

impl fmt::Display for Bucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.suffix())
    }
}
