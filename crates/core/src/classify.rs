//! ESP分类。

use crate::category::VariantCategory;
use crate::esp::EndSequencePair;
use crate::insert_size::Thresholds;

/// 按染色体、方向与片段长度把ESP归入变异类别。
///
/// - 不同染色体 → TRANSLOCATION
/// - 同向 → INVERSION
/// - first正链、second负链 → 按 `[Lmin, Lmax]`（闭区间）区分 CONCORDANT/DELETION/INSERTION
/// - 其余（背向）→ DIVERGENT
pub fn classify(esp: &EndSequencePair, thresholds: Thresholds) -> VariantCategory {
    if !esp.same_chromosome() {
        return VariantCategory::Translocation;
    }
    if esp.first().strand == esp.second().strand {
        return VariantCategory::Inversion;
    }
    if !esp.is_convergent() {
        return VariantCategory::Divergent;
    }

    let length = esp.insert_length();
    if length > thresholds.lmax {
        VariantCategory::Deletion
    } else if length < thresholds.lmin {
        VariantCategory::Insertion
    } else {
        VariantCategory::Concordant
    }
}
