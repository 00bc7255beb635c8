use anyhow::Context;
use bam2gasv_core::config::{
    DEFAULT_MAPPING_QUALITY, DEFAULT_PROPER_LENGTH, DEFAULT_SAMPLE_SIZE, DEFAULT_SPILL_THRESHOLD,
};
use bam2gasv_core::{convert, CutoffSpec, GasvConfig, GasvError, KeySpec, LibraryGrouping, Platform, RunReport};
use bam2gasv_io::{BamError, BamReader};
use clap::Parser;
use std::path::{Path, PathBuf};
use tracing::{debug, error, info};

/// 把配对比对的BAM转换为GASV所需的ESP文件
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// 输入BAM文件路径
    #[arg(short, long)]
    input: PathBuf,

    /// 输出文件前缀，默认为输入文件名去掉扩展名
    #[arg(short, long)]
    output_prefix: Option<PathBuf>,

    /// 最低mapping quality，任一mate低于该值即为低质量读对
    #[arg(short = 'q', long, default_value_t = DEFAULT_MAPPING_QUALITY)]
    mapping_quality: u8,

    /// 阈值策略：EXACT=lmin,lmax | SD=k | PCT=p% | FILE=<path>
    #[arg(short, long, default_value = "PCT=99%")]
    cutoff: String,

    /// 每个文库计算阈值前采样的读对数
    #[arg(long, default_value_t = DEFAULT_SAMPLE_SIZE)]
    sample_size: usize,

    /// 参与统计的最大插入长度，0表示不限
    #[arg(long, default_value_t = DEFAULT_PROPER_LENGTH)]
    proper_length: i64,

    /// 测序平台
    #[arg(long, value_enum, default_value = "illumina")]
    platform: Platform,

    /// 写出concordant读对
    #[arg(long)]
    write_concordant: bool,

    /// 写出低质量读对（`_lowq` 文件）
    #[arg(long)]
    write_lowq: bool,

    /// 文库分组方式
    #[arg(long, value_enum, default_value = "separate")]
    grouping: LibraryGrouping,

    /// concordant读对不排序，直接写出
    #[arg(long)]
    no_sort: bool,

    /// 单个缓冲区达到该行数时溢写到临时文件
    #[arg(long, default_value_t = DEFAULT_SPILL_THRESHOLD)]
    spill_threshold: usize,

    /// 包含标记为duplicate的读
    #[arg(long)]
    include_duplicates: bool,

    /// 染色体命名文件（每行 `名字<TAB>编号`）
    #[arg(long)]
    chromosome_naming: Option<PathBuf>,

    /// 额外写出GASVPro参数文件
    #[arg(long)]
    gasvpro: bool,

    /// discordant文件的排序列，如 `2,3,-4`
    #[arg(long)]
    sort_columns: Option<String>,

    /// 启用详细日志
    #[arg(short, long)]
    verbose: bool,
}

/// 自定义错误类型
#[derive(thiserror::Error, Debug)]
enum Bam2GasvError {
    #[error("BAM文件读取错误: {0}")]
    BamReadError(#[from] BamError),
    #[error("转换失败: {0}")]
    ConvertError(#[from] GasvError),
}

fn default_prefix(input: &Path) -> PathBuf {
    input.with_extension("")
}

fn build_config(args: &Args) -> anyhow::Result<GasvConfig> {
    let cutoff: CutoffSpec = args
        .cutoff
        .parse()
        .with_context(|| format!("无法解析 --cutoff '{}'", args.cutoff))?;
    let sort_columns = args
        .sort_columns
        .as_deref()
        .map(KeySpec::parse_columns)
        .transpose()
        .context("无法解析 --sort-columns")?;

    let config = GasvConfig {
        output_prefix: args
            .output_prefix
            .clone()
            .unwrap_or_else(|| default_prefix(&args.input)),
        mapping_quality: args.mapping_quality,
        cutoff,
        sample_size: args.sample_size,
        proper_length: args.proper_length,
        platform: args.platform,
        write_concordant: args.write_concordant,
        write_lowq: args.write_lowq,
        grouping: args.grouping,
        no_sort: args.no_sort,
        spill_threshold: args.spill_threshold,
        include_duplicates: args.include_duplicates,
        chromosome_naming: args.chromosome_naming.clone(),
        gasvpro: args.gasvpro,
        sort_columns,
    };
    config.validate()?;
    Ok(config)
}

/// 读取BAM并完成转换
fn run(bam_path: &Path, config: GasvConfig) -> Result<RunReport, Bam2GasvError> {
    let mut reader = BamReader::from_path(bam_path)?;
    let header = reader.header().clone();

    info!("开始处理BAM文件: {}", bam_path.display());
    debug!(
        "参考序列 {} 条，read group {} 个",
        header.references.len(),
        header.read_groups.len()
    );

    Ok(convert(config, &header, reader.records())?)
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // 初始化日志
    let log_level = if args.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(format!(
            "bam2gasv={0},bam2gasv_core={0},bam2gasv_io={0}",
            log_level
        ))
        .init();

    // 验证输入文件存在
    if !args.input.exists() {
        error!("输入文件不存在: {}", args.input.display());
        std::process::exit(1);
    }

    let config = build_config(&args)?;

    match run(&args.input, config) {
        Ok(report) => {
            for library in &report.libraries {
                match library.thresholds {
                    Some(t) => info!(
                        "文库 {}: Lmin={} Lmax={}，{} 个读对参与统计",
                        library.name, t.lmin, t.lmax, library.insert_count
                    ),
                    None => info!("文库 {}: 没有读对，未输出", library.name),
                }
            }
            Ok(())
        }
        Err(e) => {
            error!("{}", e);
            std::process::exit(1);
        }
    }
}
