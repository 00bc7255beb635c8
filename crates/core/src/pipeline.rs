//! 从记录流到全部输出文件的完整流程。

use crate::chromosome::ChromosomeNaming;
use crate::config::GasvConfig;
use crate::cutoff::CutoffTable;
use crate::engine::ClassificationEngine;
use crate::error::Result;
use crate::output::{write_gasv_input, write_gasvpro_input, write_info};
use crate::report::RunReport;
use bam2gasv_io::{BamError, BamHeader, MateRecord};
use tracing::info;

/// 加载辅助文件，流式分类并排序，写出汇总文件。
///
/// # Errors
///
/// 配置错误、未知read group、阈值无效以及任何输出IO错误都会中止运行。
/// 截断的输入流不是错误，见 [`ClassificationEngine::process`]。
pub fn convert<I>(config: GasvConfig, header: &BamHeader, records: I) -> Result<RunReport>
where
    I: IntoIterator<Item = std::result::Result<MateRecord, BamError>>,
{
    let naming = match &config.chromosome_naming {
        Some(path) => {
            let naming = ChromosomeNaming::from_file(path)?;
            info!("已加载 {} 个染色体命名", naming.len());
            naming
        }
        None => ChromosomeNaming::new(),
    };
    let cutoffs = CutoffTable::load(&config.cutoff)?;

    let prefix = config.output_prefix.clone();
    let gasvpro = config.gasvpro;

    let mut engine = ClassificationEngine::new(config, header, naming, cutoffs)?;
    engine.process(records)?;
    let report = engine.finish()?;

    write_info(&prefix, &report)?;
    write_gasv_input(&prefix, &report)?;
    if gasvpro {
        write_gasvpro_input(&prefix, &report, header.genome_length())?;
    }

    info!(
        "处理完成：总记录数 {}，有效记录数 {}",
        report.records_read, report.records_used
    );
    report.summary.log();
    Ok(report)
}
