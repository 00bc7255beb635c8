//! 运行参数。

use crate::cutoff::CutoffSpec;
use crate::error::{GasvError, Result};
use crate::esp::Platform;
use std::path::PathBuf;

/// 文库分组方式。
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum LibraryGrouping {
    /// 按头部的 `LB` 字段分文库处理。
    #[default]
    #[clap(name = "separate")]
    Separate,
    /// 所有读并入一个名为 `all` 的文库。
    #[clap(name = "all")]
    All,
}

pub const DEFAULT_MAPPING_QUALITY: u8 = 10;
pub const DEFAULT_SAMPLE_SIZE: usize = 500_000;
pub const DEFAULT_PROPER_LENGTH: i64 = 10_000;
pub const DEFAULT_SPILL_THRESHOLD: usize = 500_000;

#[derive(Debug, Clone)]
pub struct GasvConfig {
    /// 所有输出文件的前缀
    pub output_prefix: PathBuf,
    /// 任一mate低于该值即为低质量读对
    pub mapping_quality: u8,
    pub cutoff: CutoffSpec,
    /// 计算阈值前采样的读对数
    pub sample_size: usize,
    /// 参与统计的最大插入长度，0表示不限
    pub proper_length: i64,
    pub platform: Platform,
    pub write_concordant: bool,
    pub write_lowq: bool,
    pub grouping: LibraryGrouping,
    /// concordant记录直接写出，不排序
    pub no_sort: bool,
    /// 单个缓冲区达到该行数时触发溢写
    pub spill_threshold: usize,
    pub include_duplicates: bool,
    pub chromosome_naming: Option<PathBuf>,
    pub gasvpro: bool,
    /// 覆盖discordant文件的默认排序列
    pub sort_columns: Option<Vec<i32>>,
}

impl Default for GasvConfig {
    fn default() -> Self {
        Self {
            output_prefix: PathBuf::from("gasv"),
            mapping_quality: DEFAULT_MAPPING_QUALITY,
            cutoff: CutoffSpec::default(),
            sample_size: DEFAULT_SAMPLE_SIZE,
            proper_length: DEFAULT_PROPER_LENGTH,
            platform: Platform::default(),
            write_concordant: false,
            write_lowq: false,
            grouping: LibraryGrouping::default(),
            no_sort: false,
            spill_threshold: DEFAULT_SPILL_THRESHOLD,
            include_duplicates: false,
            chromosome_naming: None,
            gasvpro: false,
            sort_columns: None,
        }
    }
}

/// discordant行的整数列：2..=9中除去方向列5和9。
fn validate_sort_columns(columns: &[i32]) -> Result<()> {
    let bad: Vec<i32> = columns
        .iter()
        .copied()
        .filter(|c| !matches!(c.unsigned_abs(), 2..=4 | 6..=8))
        .collect();
    if columns.is_empty() || !bad.is_empty() {
        return Err(GasvError::Config(format!(
            "sort-columns只能使用discordant行的坐标列2-4、6-8，无效列: {:?}",
            bad
        )));
    }
    Ok(())
}

impl GasvConfig {
    pub fn validate(&self) -> Result<()> {
        if self.sample_size == 0 {
            return Err(GasvError::Config("sample-size必须大于0".to_string()));
        }
        if self.spill_threshold == 0 {
            return Err(GasvError::Config("spill-threshold必须大于0".to_string()));
        }
        if self.proper_length < 0 {
            return Err(GasvError::Config("proper-length不能为负".to_string()));
        }
        if self.no_sort && !self.write_concordant {
            return Err(GasvError::Config(
                "no-sort只作用于concordant输出，需要同时开启write-concordant".to_string(),
            ));
        }
        if self.output_prefix.as_os_str().is_empty() {
            return Err(GasvError::Config("输出前缀不能为空".to_string()));
        }
        if let Some(dir) = self.output_prefix.parent() {
            if !dir.as_os_str().is_empty() && !dir.is_dir() {
                return Err(GasvError::Config(format!("输出目录不存在: {}", dir.display())));
            }
        }
        if let Some(columns) = &self.sort_columns {
            validate_sort_columns(columns)?;
        }
        Ok(())
    }

    /// 插入长度是否可进入统计样本。
    pub fn is_proper_length(&self, length: i64) -> bool {
        length > 0 && (self.proper_length == 0 || length <= self.proper_length)
    }
}
