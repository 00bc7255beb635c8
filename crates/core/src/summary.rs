//! 一次运行中可恢复情况的汇总。

use std::collections::BTreeSet;
use tracing::{info, warn};

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RunSummary {
    /// 无法转换为整数ID的染色体名
    pub skipped_chromosomes: BTreeSet<String>,
    /// 被跳过的坏记录数
    pub malformed_records: u64,
    /// 输入流是否提前结束
    pub truncated: bool,
    /// 没有任何成对读的文库
    pub empty_libraries: Vec<String>,
    /// 未开启低质量输出时丢弃的低质量读对
    pub dropped_low_quality_pairs: u64,
    /// 运行结束时仍未找到mate的读
    pub orphan_mates: u64,
}

impl RunSummary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn skip_chromosome(&mut self, name: &str) {
        if !self.skipped_chromosomes.contains(name) {
            self.skipped_chromosomes.insert(name.to_string());
        }
    }

    /// 没有截断、坏记录、跳过的染色体或空文库。
    pub fn is_clean(&self) -> bool {
        self.skipped_chromosomes.is_empty()
            && self.malformed_records == 0
            && !self.truncated
            && self.empty_libraries.is_empty()
    }

    /// 把非空项以warn级别输出。
    pub fn log(&self) {
        if self.is_clean() {
            info!("输入完整，所有染色体与文库均已处理");
        }
        if self.truncated {
            warn!("输入流提前结束，输出只包含已读取部分的结果");
        }
        if self.malformed_records > 0 {
            warn!("跳过了 {} 条无法解析的记录", self.malformed_records);
        }
        if !self.skipped_chromosomes.is_empty() {
            let names: Vec<&str> = self.skipped_chromosomes.iter().map(String::as_str).collect();
            warn!(
                "以下染色体无法转换为整数编号，相关读对已跳过（可用 --chromosome-naming 指定）: {}",
                names.join(", ")
            );
        }
        for library in &self.empty_libraries {
            warn!("文库 {} 没有成对读，未生成阈值", library);
        }
        if self.dropped_low_quality_pairs > 0 {
            warn!(
                "丢弃了 {} 个低质量读对（可用 --write-lowq 保留）",
                self.dropped_low_quality_pairs
            );
        }
        if self.orphan_mates > 0 {
            warn!("{} 条读直到结束都没有找到mate", self.orphan_mates);
        }
    }
}
