//! BAM比对到GASV ESP文件的转换。
//!
//! 流式读取配对比对，按文库估计concordant插入长度区间，把每个读对归入
//! 六种结构变异类别之一，并通过有界内存的外部排序写出各类别的有序文件。

pub mod category;
pub mod chromosome;
pub mod classify;
pub mod config;
pub mod cutoff;
pub mod engine;
pub mod error;
pub mod esp;
pub mod external_sort;
pub mod filter_stat;
pub mod insert_size;
pub mod library;
pub mod output;
pub mod pipeline;
pub mod report;
pub mod sort_key;
pub mod summary;

pub use category::{Bucket, QualityTier, VariantCategory};
pub use chromosome::ChromosomeNaming;
pub use classify::classify;
pub use config::{GasvConfig, LibraryGrouping};
pub use cutoff::{CutoffPolicy, CutoffSpec, CutoffTable};
pub use engine::ClassificationEngine;
pub use error::{GasvError, Result};
pub use esp::{EndSequencePair, MateHit, Platform, Strand};
pub use external_sort::{ExternalSorter, FinishedFile, SortOptions};
pub use insert_size::{CutoffEstimator, InsertSizeHistogram, Thresholds};
pub use pipeline::convert;
pub use report::{LibraryReport, RunReport};
pub use sort_key::KeySpec;
pub use summary::RunSummary;
