//! BAM/SAM文件IO适配子库
//!
//! 封装rust-htslib，把比对记录转换为与后端无关的 [`MateRecord`]，
//! 并从头部提取参考序列与read group信息。

pub mod bam;
pub mod header;
pub mod record;

// 重新导出主要类型
pub use bam::{BamError, BamReader, MateRecordIterator};
pub use header::{BamHeader, ReadGroup, Reference};
pub use record::{flags, MateRecord};

/// 库版本信息
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
