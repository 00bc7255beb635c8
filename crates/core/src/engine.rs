//! 流式分类引擎。
//!
//! 按输入顺序消费记录：过滤 → 定位文库 → 染色体编号 → 按read名配对 →
//! 采样或分类 → 交给外部排序。每个文库先处于采样阶段，样本达到
//! `sample_size` 或输入结束时计算阈值，之后的读对直接分类。

use crate::category::{Bucket, QualityTier, VariantCategory};
use crate::chromosome::ChromosomeNaming;
use crate::classify::classify;
use crate::config::{GasvConfig, LibraryGrouping};
use crate::cutoff::CutoffTable;
use crate::error::{GasvError, Result};
use crate::esp::{EndSequencePair, MateHit, Strand};
use crate::external_sort::{ExternalSorter, SortOptions};
use crate::filter_stat::FilterStat;
use crate::library::{Library, LibraryState, PendingMate, SampledPair};
use crate::report::{LibraryReport, RunReport};
use crate::summary::RunSummary;
use bam2gasv_io::{BamError, BamHeader, MateRecord};
use std::collections::HashMap;
use tracing::{debug, info, warn};

/// 不分文库时使用的合成文库名。
pub const ALL_LIBRARY: &str = "all";

pub struct ClassificationEngine {
    config: GasvConfig,
    naming: ChromosomeNaming,
    cutoffs: CutoffTable,
    libraries: Vec<Library>,
    /// `None` 表示所有读归入唯一的文库
    library_by_read_group: Option<HashMap<String, usize>>,
    sorter: ExternalSorter,
    filter: FilterStat,
    summary: RunSummary,
}

impl ClassificationEngine {
    pub fn new(
        config: GasvConfig,
        header: &BamHeader,
        naming: ChromosomeNaming,
        cutoffs: CutoffTable,
    ) -> Result<Self> {
        config.validate()?;

        let mut sorter = ExternalSorter::new(SortOptions {
            prefix: config.output_prefix.clone(),
            spill_threshold: config.spill_threshold,
            no_sort: config.no_sort,
            discordant_columns: config.sort_columns.clone(),
        });
        let buckets = Self::enabled_buckets(&config);

        let header_libraries = header.libraries();
        let separate = config.grouping == LibraryGrouping::Separate;
        if separate && header_libraries.is_empty() {
            warn!("BAM头部没有read group，所有读归入文库 '{}'", ALL_LIBRARY);
        }

        let mut libraries = Vec::new();
        let library_by_read_group = if separate && !header_libraries.is_empty() {
            let mut index = HashMap::new();
            for name in &header_libraries {
                index.insert(name.clone(), sorter.add_library(name, &buckets)?);
                libraries.push(Library::new(name.clone()));
            }
            let by_rg = header
                .library_by_read_group()
                .into_iter()
                .map(|(rg, library)| (rg, index[&library]))
                .collect();
            Some(by_rg)
        } else {
            sorter.add_library(ALL_LIBRARY, &buckets)?;
            libraries.push(Library::new(ALL_LIBRARY));
            None
        };

        info!(
            "共 {} 个文库，平台 {}，每个文库 {} 个输出桶",
            libraries.len(),
            config.platform,
            buckets.len()
        );

        Ok(Self {
            config,
            naming,
            cutoffs,
            libraries,
            library_by_read_group,
            sorter,
            filter: FilterStat::new(),
            summary: RunSummary::new(),
        })
    }

    /// 按配置启用的输出桶：concordant需 `write_concordant`，低质量层需 `write_lowq`。
    pub fn enabled_buckets(config: &GasvConfig) -> Vec<Bucket> {
        let mut tiers = vec![QualityTier::High];
        if config.write_lowq {
            tiers.push(QualityTier::Low);
        }
        tiers
            .into_iter()
            .flat_map(|tier| {
                VariantCategory::ALL
                    .into_iter()
                    .filter(|c| config.write_concordant || !c.is_concordant())
                    .map(move |c| Bucket::new(c, tier))
            })
            .collect()
    }

    pub fn libraries(&self) -> &[Library] {
        &self.libraries
    }

    pub fn sorter(&self) -> &ExternalSorter {
        &self.sorter
    }

    pub fn summary(&self) -> &RunSummary {
        &self.summary
    }

    /// 消费整个记录流。
    ///
    /// 单条坏记录计数后跳过；其他读取错误视为输入被截断，停止读取，
    /// 已读取的数据照常进入后续的阈值计算与归并。
    pub fn process<I>(&mut self, records: I) -> Result<()>
    where
        I: IntoIterator<Item = std::result::Result<MateRecord, BamError>>,
    {
        for item in records {
            match item {
                Ok(record) => self.process_record(record)?,
                Err(e) if e.is_record_local() => {
                    self.summary.malformed_records += 1;
                    debug!("跳过记录: {}", e);
                }
                Err(e) => {
                    warn!("读取输入时出错，停止读取并使用已读取的数据: {}", e);
                    self.summary.truncated = true;
                    break;
                }
            }
        }
        Ok(())
    }

    fn library_index(&self, record: &MateRecord) -> Result<usize> {
        let Some(by_rg) = &self.library_by_read_group else {
            return Ok(0);
        };
        let rg = record.read_group.as_deref().unwrap_or("");
        by_rg
            .get(rg)
            .copied()
            .ok_or_else(|| GasvError::UnknownReadGroup(rg.to_string()))
    }

    pub fn process_record(&mut self, record: MateRecord) -> Result<()> {
        if !self.filter.update(&record, self.config.include_duplicates) {
            return Ok(());
        }

        let idx = self.library_index(&record)?;

        let chromosome = self.naming.resolve(&record.reference_name);
        let mate_chromosome = self.naming.resolve(&record.mate_reference_name);
        let Some((chromosome, _)) = chromosome.zip(mate_chromosome) else {
            if chromosome.is_none() {
                self.summary.skip_chromosome(&record.reference_name);
            }
            if mate_chromosome.is_none() {
                self.summary.skip_chromosome(&record.mate_reference_name);
            }
            self.libraries[idx].take_pending(&record.read_name);
            return Ok(());
        };

        let strand = self.config.platform.orient(
            Strand::from_reverse_flag(record.is_reverse()),
            record.is_last_in_template(),
        );
        let hit = MateHit {
            chromosome,
            start: record.start,
            end: record.end,
            strand,
        };

        let library = &mut self.libraries[idx];
        let Some(mate) = library.take_pending(&record.read_name) else {
            library.park(
                record.read_name,
                PendingMate {
                    hit,
                    mapping_quality: record.mapping_quality,
                    read_length: record.read_length,
                },
            );
            return Ok(());
        };

        let tier = if mate.mapping_quality.min(record.mapping_quality) < self.config.mapping_quality {
            QualityTier::Low
        } else {
            QualityTier::High
        };
        if tier == QualityTier::Low && !self.config.write_lowq {
            self.summary.dropped_low_quality_pairs += 1;
            return Ok(());
        }

        let esp = EndSequencePair::new(record.read_name, mate.hit, hit);
        let for_stats = tier == QualityTier::High
            && esp.same_chromosome()
            && esp.is_convergent()
            && self.config.is_proper_length(esp.insert_length());

        self.handle_pair(
            idx,
            SampledPair { esp, tier },
            for_stats,
            (mate.read_length, record.read_length),
        )
    }

    fn handle_pair(
        &mut self,
        idx: usize,
        pair: SampledPair,
        for_stats: bool,
        read_lengths: (u32, u32),
    ) -> Result<()> {
        let library = &mut self.libraries[idx];
        match library.state() {
            LibraryState::Sampling => {
                library.sample_pair(pair, for_stats, read_lengths);
                if library.pair_count() >= self.config.sample_size as u64 {
                    info!(
                        "文库 {} 采样达到 {} 个读对，计算阈值",
                        library.name(),
                        library.pair_count()
                    );
                    self.finalize_library(idx)?;
                }
                Ok(())
            }
            LibraryState::StatsComputed => self.emit(idx, pair),
        }
    }

    /// 计算阈值，并把样本中的ESP依次分类送入排序。
    fn finalize_library(&mut self, idx: usize) -> Result<()> {
        let policy = self.cutoffs.policy_for(self.libraries[idx].name())?;
        let sample = self.libraries[idx].compute_thresholds(policy)?;
        for pair in sample {
            self.emit(idx, pair)?;
        }
        Ok(())
    }

    fn emit(&mut self, idx: usize, pair: SampledPair) -> Result<()> {
        let library = &mut self.libraries[idx];
        let Some(thresholds) = library.thresholds() else {
            return Ok(());
        };

        let category = classify(&pair.esp, thresholds);
        if pair.tier == QualityTier::High {
            library.count(category);
        }
        if category.is_concordant() && !self.config.write_concordant {
            return Ok(());
        }

        let line = if category.is_concordant() {
            pair.esp.concordant_line()
        } else {
            pair.esp.discordant_line()
        };
        self.sorter.push(idx, Bucket::new(category, pair.tier), line)
    }

    /// 输入结束：为仍在采样的文库计算阈值，归并全部输出，生成报告。
    pub fn finish(mut self) -> Result<RunReport> {
        for idx in 0..self.libraries.len() {
            if self.libraries[idx].state() == LibraryState::Sampling {
                debug!(
                    "文库 {} 在输入结束时只有 {} 个读对，按现有样本计算阈值",
                    self.libraries[idx].name(),
                    self.libraries[idx].pair_count()
                );
                self.finalize_library(idx)?;
            }
        }

        for library in &mut self.libraries {
            self.summary.orphan_mates += library.clear_pending() as u64;
            if library.thresholds().is_none() {
                self.summary.empty_libraries.push(library.name().to_string());
            }
        }

        info!("记录过滤统计:\n{}", self.filter);

        let ClassificationEngine {
            libraries,
            sorter,
            filter,
            summary,
            ..
        } = self;

        let files = sorter.finish()?;
        let reports = libraries
            .iter()
            .zip(files)
            .map(|(library, files)| LibraryReport::from_library(library, files))
            .collect();

        Ok(RunReport {
            libraries: reports,
            summary,
            records_read: filter.total(),
            records_used: filter.passed(),
        })
    }
}
