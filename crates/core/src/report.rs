//! 运行结束后交给输出模块的结果。

use crate::category::{Bucket, VariantCategory};
use crate::external_sort::FinishedFile;
use crate::insert_size::Thresholds;
use crate::library::{Library, ReadLengthStats};
use crate::summary::RunSummary;
use std::path::Path;

#[derive(Debug, Clone)]
pub struct LibraryReport {
    pub name: String,
    /// `None` 表示文库没有成对读，下游跳过
    pub thresholds: Option<Thresholds>,
    pub mean: f64,
    pub std_dev: f64,
    /// 参与统计的读对数与插入长度之和
    pub insert_count: u64,
    pub insert_sum: i128,
    pub read_lengths: ReadLengthStats,
    pub category_counts: [u64; 6],
    pub files: Vec<FinishedFile>,
}

impl LibraryReport {
    pub fn from_library(library: &Library, files: Vec<FinishedFile>) -> Self {
        let histogram = library.histogram();
        let mut category_counts = [0; 6];
        for category in VariantCategory::ALL {
            category_counts[category.index()] = library.category_count(category);
        }
        Self {
            name: library.name().to_string(),
            thresholds: library.thresholds(),
            mean: histogram.mean(),
            std_dev: histogram.std_dev(),
            insert_count: histogram.total(),
            insert_sum: histogram.sum(),
            read_lengths: *library.read_lengths(),
            category_counts,
            files,
        }
    }

    pub fn count(&self, category: VariantCategory) -> u64 {
        self.category_counts[category.index()]
    }

    pub fn file(&self, bucket: Bucket) -> Option<&Path> {
        self.files
            .iter()
            .find(|f| f.bucket == bucket)
            .map(|f| f.path.as_path())
    }
}

#[derive(Debug, Clone)]
pub struct RunReport {
    pub libraries: Vec<LibraryReport>,
    pub summary: RunSummary,
    /// 读取的记录总数与通过过滤的记录数
    pub records_read: u64,
    pub records_used: u64,
}
