//! 汇总文件：`.info`、`.gasv.in` 与 `.gasvpro.in`。

use crate::category::{QualityTier, VariantCategory};
use crate::error::{GasvError, Result};
use crate::report::RunReport;
use std::ffi::OsString;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// `<prefix><extension>`
pub fn prefixed_path(prefix: &Path, extension: &str) -> PathBuf {
    let mut name = OsString::from(prefix.as_os_str());
    name.push(extension);
    PathBuf::from(name)
}

fn write_lines<I>(path: &Path, lines: I) -> Result<()>
where
    I: IntoIterator<Item = String>,
{
    let file = File::create(path).map_err(GasvError::io(path))?;
    let mut writer = BufWriter::new(file);
    for line in lines {
        writeln!(writer, "{}", line).map_err(GasvError::io(path))?;
    }
    writer.flush().map_err(GasvError::io(path))
}

/// 每个有阈值的文库一行：名字、Lmin、Lmax、均值、标准差。
pub fn write_info(prefix: &Path, report: &RunReport) -> Result<PathBuf> {
    let path = prefixed_path(prefix, ".info");
    let lines = report.libraries.iter().filter_map(|lib| {
        lib.thresholds.map(|t| {
            format!(
                "{}\t{}\t{}\t{:.2}\t{:.2}",
                lib.name, t.lmin, t.lmax, lib.mean, lib.std_dev
            )
        })
    });
    write_lines(&path, lines)?;
    info!("已写出 {}", path.display());
    Ok(path)
}

/// GASV输入清单：每个有阈值文库的非concordant、非insertion高质量文件。
pub fn write_gasv_input(prefix: &Path, report: &RunReport) -> Result<PathBuf> {
    let path = prefixed_path(prefix, ".gasv.in");
    let mut lines = Vec::new();
    for lib in &report.libraries {
        let Some(t) = lib.thresholds else {
            continue;
        };
        for category in VariantCategory::ALL {
            if !category.is_gasv_input() {
                continue;
            }
            let file = lib
                .files
                .iter()
                .find(|f| f.bucket.category == category && f.bucket.tier == QualityTier::High);
            if let Some(file) = file {
                lines.push(format!("{}\tPR\t{}\t{}", file.path.display(), t.lmin, t.lmax));
            }
        }
    }
    write_lines(&path, lines)?;
    info!("已写出 {}", path.display());
    Ok(path)
}

/// GASVPro需要的全局统计。
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GasvProStats {
    /// 所有文库合并后的平均插入长度
    pub average_insert: f64,
    /// 合并后的平均读长
    pub average_read_length: f64,
    /// concordant读对数 × 平均插入长度 / 基因组长度
    pub lambda: f64,
    pub concordant: u64,
}

impl GasvProStats {
    /// 数据不足（无统计样本或基因组长度为0）时返回 `None`。
    pub fn from_report(report: &RunReport, genome_length: u64) -> Option<Self> {
        let valid = report.libraries.iter().filter(|l| l.thresholds.is_some());

        let mut inserts = 0u64;
        let mut insert_sum = 0i128;
        let mut reads = 0u64;
        let mut read_sum = 0u64;
        let mut concordant = 0u64;
        for lib in valid {
            inserts += lib.insert_count;
            insert_sum += lib.insert_sum;
            reads += lib.read_lengths.count;
            read_sum += lib.read_lengths.sum;
            concordant += lib.count(VariantCategory::Concordant);
        }

        if genome_length == 0 || inserts == 0 || reads == 0 {
            return None;
        }
        let average_insert = insert_sum as f64 / inserts as f64;
        Some(Self {
            average_insert,
            average_read_length: read_sum as f64 / reads as f64,
            lambda: concordant as f64 * average_insert / genome_length as f64,
            concordant,
        })
    }
}

/// 写出 `.gasvpro.in`；统计不足时跳过并返回 `None`。
pub fn write_gasvpro_input(
    prefix: &Path,
    report: &RunReport,
    genome_length: u64,
) -> Result<Option<PathBuf>> {
    let Some(stats) = GasvProStats::from_report(report, genome_length) else {
        warn!("没有可用的concordant统计或基因组长度为0，跳过 .gasvpro.in");
        return Ok(None);
    };
    let path = prefixed_path(prefix, ".gasvpro.in");
    write_lines(
        &path,
        [
            format!("Lavg:\t{:.2}", stats.average_insert),
            format!("ReadLen:\t{:.2}", stats.average_read_length),
            format!("Lambda:\t{:.6}", stats.lambda),
        ],
    )?;
    info!(
        "已写出 {} (concordant {} 对, lambda {:.6})",
        path.display(),
        stats.concordant,
        stats.lambda
    );
    Ok(Some(path))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::category::Bucket;
    use crate::external_sort::FinishedFile;
    use crate::insert_size::Thresholds;
    use crate::library::ReadLengthStats;
    use crate::report::LibraryReport;
    use crate::summary::RunSummary;
    use std::fs;
    use tempfile::TempDir;

    fn library(name: &str, thresholds: Option<Thresholds>, dir: &Path) -> LibraryReport {
        let mut category_counts = [0; 6];
        category_counts[VariantCategory::Concordant.index()] = 100;
        LibraryReport {
            name: name.to_string(),
            thresholds,
            mean: 300.0,
            std_dev: 25.5,
            insert_count: 4,
            insert_sum: 1200,
            read_lengths: ReadLengthStats {
                count: 8,
                sum: 800,
                min: Some(100),
            },
            category_counts,
            files: VariantCategory::ALL
                .into_iter()
                .filter(|c| !c.is_concordant())
                .map(|c| FinishedFile {
                    bucket: Bucket::high(c),
                    path: dir.join(format!("out_{}.{}", name, c)),
                    rows: 0,
                })
                .collect(),
        }
    }

    fn report(dir: &Path) -> RunReport {
        RunReport {
            libraries: vec![
                library("libA", Some(Thresholds { lmin: 150, lmax: 450 }), dir),
                library("libB", None, dir),
            ],
            summary: RunSummary::default(),
            records_read: 0,
            records_used: 0,
        }
    }

    #[test]
    fn test_info_skips_unset_libraries() {
        let dir = TempDir::new().unwrap();
        let prefix = dir.path().join("out");
        let path = write_info(&prefix, &report(dir.path())).unwrap();
        assert_eq!(path, dir.path().join("out.info"));
        assert_eq!(fs::read_to_string(path).unwrap(), "libA\t150\t450\t300.00\t25.50\n");
    }

    #[test]
    fn test_gasv_input_lists_discordant_files() {
        let dir = TempDir::new().unwrap();
        let prefix = dir.path().join("out");
        let path = write_gasv_input(&prefix, &report(dir.path())).unwrap();
        let text = fs::read_to_string(path).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 4);
        assert_eq!(
            lines[0],
            format!("{}\tPR\t150\t450", dir.path().join("out_libA.deletion").display())
        );
        assert!(lines.iter().all(|l| !l.contains("insertion") && !l.contains("libB")));
        assert!(lines[3].contains("translocation"));
    }

    #[test]
    fn test_gasvpro_stats() {
        let dir = TempDir::new().unwrap();
        let stats = GasvProStats::from_report(&report(dir.path()), 30_000).unwrap();
        assert_eq!(stats.average_insert, 300.0);
        assert_eq!(stats.average_read_length, 100.0);
        assert_eq!(stats.concordant, 100);
        assert!((stats.lambda - 1.0).abs() < 1e-9);

        assert!(GasvProStats::from_report(&report(dir.path()), 0).is_none());
    }

    #[test]
    fn test_write_gasvpro() {
        let dir = TempDir::new().unwrap();
        let prefix = dir.path().join("out");
        let path = write_gasvpro_input(&prefix, &report(dir.path()), 30_000)
            .unwrap()
            .unwrap();
        assert_eq!(
            fs::read_to_string(path).unwrap(),
            "Lavg:\t300.00\nReadLen:\t100.00\nLambda:\t1.000000\n"
        );
        assert!(write_gasvpro_input(&prefix, &report(dir.path()), 0).unwrap().is_none());
    }
}
