//! Lmin/Lmax截断策略及其字符串形式。
//!
//! 支持的写法：
//!
//! - `EXACT=<lmin>,<lmax>`
//! - `SD=<k>`：均值 ± k 倍标准差
//! - `PCT=<p>%`：百分位
//! - `FILE=<path>`：按文库名查表，表中每行 `<文库名>\t<上述三种之一>`

use crate::error::{GasvError, Result};
use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// 单个文库使用的截断策略。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CutoffPolicy {
    Exact { lmin: i64, lmax: i64 },
    StdDev(u32),
    Percentile(u32),
}

impl Default for CutoffPolicy {
    fn default() -> Self {
        CutoffPolicy::Percentile(99)
    }
}

impl fmt::Display for CutoffPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CutoffPolicy::Exact { lmin, lmax } => write!(f, "EXACT={},{}", lmin, lmax),
            CutoffPolicy::StdDev(k) => write!(f, "SD={}", k),
            CutoffPolicy::Percentile(p) => write!(f, "PCT={}%", p),
        }
    }
}

fn invalid(spec: &str, reason: &str) -> GasvError {
    GasvError::InvalidCutoff {
        spec: spec.to_string(),
        reason: reason.to_string(),
    }
}

impl FromStr for CutoffPolicy {
    type Err = GasvError;

    fn from_str(s: &str) -> Result<Self> {
        let spec = s.trim();
        let (kind, value) = spec
            .split_once('=')
            .ok_or_else(|| invalid(spec, "缺少 '='"))?;

        match kind.to_ascii_uppercase().as_str() {
            "EXACT" => {
                let (a, b) = value
                    .split_once(',')
                    .ok_or_else(|| invalid(spec, "EXACT需要两个以逗号分隔的整数"))?;
                let lmin = a.trim().parse().map_err(|_| invalid(spec, "Lmin不是整数"))?;
                let lmax = b.trim().parse().map_err(|_| invalid(spec, "Lmax不是整数"))?;
                Ok(CutoffPolicy::Exact { lmin, lmax })
            }
            "SD" => {
                let k = value
                    .trim()
                    .parse()
                    .map_err(|_| invalid(spec, "SD需要一个非负整数"))?;
                Ok(CutoffPolicy::StdDev(k))
            }
            "PCT" => {
                let p: u32 = value
                    .trim()
                    .trim_end_matches('%')
                    .parse()
                    .map_err(|_| invalid(spec, "PCT需要形如 99% 的整数百分比"))?;
                if p > 100 {
                    return Err(invalid(spec, "百分比必须在[0, 100]之间"));
                }
                Ok(CutoffPolicy::Percentile(p))
            }
            _ => Err(invalid(spec, "未知的策略类型")),
        }
    }
}

/// 命令行层面的截断配置：统一策略，或按文库查表。
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CutoffSpec {
    Uniform(CutoffPolicy),
    PerLibraryFile(PathBuf),
}

impl Default for CutoffSpec {
    fn default() -> Self {
        CutoffSpec::Uniform(CutoffPolicy::default())
    }
}

impl FromStr for CutoffSpec {
    type Err = GasvError;

    fn from_str(s: &str) -> Result<Self> {
        let spec = s.trim();
        match spec.split_once('=') {
            Some((kind, path)) if kind.eq_ignore_ascii_case("FILE") => {
                if path.is_empty() {
                    return Err(invalid(spec, "FILE需要文件路径"));
                }
                Ok(CutoffSpec::PerLibraryFile(PathBuf::from(path)))
            }
            _ => spec.parse().map(CutoffSpec::Uniform),
        }
    }
}

/// 解析后的截断表，为每个文库给出具体策略。
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CutoffTable {
    Uniform(CutoffPolicy),
    PerLibrary(HashMap<String, CutoffPolicy>),
}

impl CutoffTable {
    /// 加载截断配置，`FILE=` 形式会读取并解析查找表。
    pub fn load(spec: &CutoffSpec) -> Result<Self> {
        match spec {
            CutoffSpec::Uniform(policy) => Ok(CutoffTable::Uniform(*policy)),
            CutoffSpec::PerLibraryFile(path) => Self::from_file(path),
        }
    }

    fn from_file(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path).map_err(|e| {
            GasvError::Config(format!("无法读取文库截断文件 {}: {}", path.display(), e))
        })?;
        Self::parse_table(&text)
    }

    /// 解析 `<文库名>\t<策略>` 格式的文本，空行和 `#` 开头的行忽略。
    pub fn parse_table(text: &str) -> Result<Self> {
        let mut table = HashMap::new();
        for line in text.lines() {
            let line = line.trim_end();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let (library, policy) = line
                .split_once('\t')
                .ok_or_else(|| GasvError::Config(format!("文库截断文件行格式错误: '{}'", line)))?;
            table.insert(library.to_string(), policy.parse()?);
        }
        Ok(CutoffTable::PerLibrary(table))
    }

    /// 取出某个文库的策略。
    pub fn policy_for(&self, library: &str) -> Result<CutoffPolicy> {
        match self {
            CutoffTable::Uniform(policy) => Ok(*policy),
            CutoffTable::PerLibrary(table) => table.get(library).copied().ok_or_else(|| {
                GasvError::Config(format!("文库截断文件中没有文库 '{}'", library))
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("PCT=99%", CutoffPolicy::Percentile(99))]
    #[case("pct=30", CutoffPolicy::Percentile(30))]
    #[case("SD=3", CutoffPolicy::StdDev(3))]
    #[case("EXACT=100,500", CutoffPolicy::Exact { lmin: 100, lmax: 500 })]
    #[case(" EXACT=-5, 20 ", CutoffPolicy::Exact { lmin: -5, lmax: 20 })]
    fn test_parse_policy(#[case] input: &str, #[case] expected: CutoffPolicy) {
        assert_eq!(input.parse::<CutoffPolicy>().unwrap(), expected);
    }

    #[rstest]
    #[case("PCT=101%")]
    #[case("SD=-1")]
    #[case("EXACT=100")]
    #[case("MEDIAN=3")]
    #[case("99%")]
    fn test_parse_policy_rejects(#[case] input: &str) {
        assert!(matches!(
            input.parse::<CutoffPolicy>(),
            Err(GasvError::InvalidCutoff { .. })
        ));
    }

    #[test]
    fn test_display_round_trips() {
        for policy in [
            CutoffPolicy::Percentile(95),
            CutoffPolicy::StdDev(4),
            CutoffPolicy::Exact { lmin: 1, lmax: 2 },
        ] {
            assert_eq!(policy.to_string().parse::<CutoffPolicy>().unwrap(), policy);
        }
    }

    #[test]
    fn test_spec_file_form() {
        let spec: CutoffSpec = "FILE=/data/cutoffs.txt".parse().unwrap();
        assert_eq!(spec, CutoffSpec::PerLibraryFile(PathBuf::from("/data/cutoffs.txt")));
        assert_eq!(
            "SD=2".parse::<CutoffSpec>().unwrap(),
            CutoffSpec::Uniform(CutoffPolicy::StdDev(2))
        );
    }

    #[test]
    fn test_per_library_table() {
        let table = CutoffTable::parse_table("# comment\nlibA\tSD=3\nlibB\tEXACT=10,20\n\n").unwrap();
        assert_eq!(table.policy_for("libA").unwrap(), CutoffPolicy::StdDev(3));
        assert_eq!(
            table.policy_for("libB").unwrap(),
            CutoffPolicy::Exact { lmin: 10, lmax: 20 }
        );
        assert!(matches!(table.policy_for("libC"), Err(GasvError::Config(_))));
    }

    #[test]
    fn test_per_library_table_rejects_bad_line() {
        assert!(CutoffTable::parse_table("libA SD=3\n").is_err());
        assert!(CutoffTable::parse_table("libA\tSD=x\n").is_err());
    }

    #[test]
    fn test_load_missing_file_is_config_error() {
        let spec = CutoffSpec::PerLibraryFile(PathBuf::from("/nonexistent/cutoffs.txt"));
        assert!(matches!(CutoffTable::load(&spec), Err(GasvError::Config(_))));
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cutoffs.txt");
        fs::write(&path, "libA\tPCT=95%\n").unwrap();
        let table = CutoffTable::load(&CutoffSpec::PerLibraryFile(path)).unwrap();
        assert_eq!(table.policy_for("libA").unwrap(), CutoffPolicy::Percentile(95));
    }
}
