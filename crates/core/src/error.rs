//! 致命错误类型。
//!
//! 可恢复的情况（无法识别的染色体、单条坏记录、截断的输入流）不在这里，
//! 它们累积在 [`crate::summary::RunSummary`] 中。

use bam2gasv_io::BamError;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub type Result<T> = std::result::Result<T, GasvError>;

#[derive(Error, Debug)]
pub enum GasvError {
    /// 参数组合不合法或必需文件缺失
    #[error("配置错误: {0}")]
    Config(String),

    /// 截断策略字符串无法解析
    #[error("无法解析的Lmin/Lmax截断策略 '{spec}': {reason}")]
    InvalidCutoff { spec: String, reason: String },

    /// 截断后仍然 Lmin >= Lmax
    #[error("文库 {library} 的阈值无效: Lmin={lmin} >= Lmax={lmax}，没有可用的concordant读对或配置错误")]
    InvalidThresholds { library: String, lmin: i64, lmax: i64 },

    /// 记录中的read group不在头部中
    #[error("read group '{0}' 不在BAM头部中，输入文件已损坏")]
    UnknownReadGroup(String),

    #[error("文件IO错误 {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// 临时文件中的行无法提取排序键
    #[error("排序行格式错误: {0}")]
    MalformedRow(String),

    #[error("BAM文件错误: {0}")]
    Bam(#[from] BamError),
}

impl GasvError {
    /// 构造一个把io错误与路径绑定的闭包，配合 `map_err` 使用。
    pub fn io(path: &Path) -> impl FnOnce(io::Error) -> GasvError + '_ {
        move |source| GasvError::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}
