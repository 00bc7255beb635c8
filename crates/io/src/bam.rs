use crate::header::BamHeader;
use crate::record::MateRecord;
use rust_htslib::bam::{self, record::Aux, Read};
use std::path::Path;
use thiserror::Error;
use tracing::{debug, info};

/// BAM/SAM文件读取错误
#[derive(Error, Debug)]
pub enum BamError {
    #[error("文件读取错误: {0}")]
    Htslib(#[from] rust_htslib::errors::Error),

    #[error("文件不存在: {path}")]
    FileNotFound { path: String },

    /// 输入流在记录中途结束
    #[error("输入流被截断: {0}")]
    Truncated(String),

    /// 单条记录无法解析，可跳过
    #[error("无法解析的记录: {0}")]
    Malformed(String),
}

impl BamError {
    /// 是否只影响当前这一条记录。
    pub fn is_record_local(&self) -> bool {
        matches!(self, BamError::Malformed(_))
    }
}

/// BAM/SAM文件读取器
pub struct BamReader {
    reader: bam::Reader,
    header: BamHeader,
    path: String,
}

impl BamReader {
    /// 从文件路径创建BAM读取器
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self, BamError> {
        let path_str = path.as_ref().to_string_lossy().to_string();

        if !path.as_ref().exists() {
            return Err(BamError::FileNotFound { path: path_str });
        }

        let reader = bam::Reader::from_path(&path)?;
        let header = BamHeader::from(reader.header());
        info!(
            "已打开BAM文件: {} ({} 条参考序列, {} 个read group)",
            path_str,
            header.references.len(),
            header.read_groups.len()
        );

        Ok(Self {
            reader,
            header,
            path: path_str,
        })
    }

    /// 获取文件路径
    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn header(&self) -> &BamHeader {
        &self.header
    }

    /// 迭代所有记录
    pub fn records(&mut self) -> MateRecordIterator<'_> {
        MateRecordIterator {
            inner: self.reader.records(),
            header: &self.header,
            count: 0,
        }
    }
}

/// 将htslib记录转换为 [`MateRecord`] 的迭代器
pub struct MateRecordIterator<'a> {
    inner: bam::Records<'a, bam::Reader>,
    header: &'a BamHeader,
    count: u64,
}

impl<'a> MateRecordIterator<'a> {
    fn convert(&self, record: &bam::Record) -> Result<MateRecord, BamError> {
        let read_name = std::str::from_utf8(record.qname())
            .map_err(|_| BamError::Malformed(format!("第 {} 条记录的read名不是UTF-8", self.count)))?
            .to_string();

        let read_group = match record.aux(b"RG") {
            Ok(Aux::String(rg)) => Some(rg.to_string()),
            _ => None,
        };

        let reference_name = self.header.reference_name(record.tid()).unwrap_or("*");
        let mate_reference_name = self.header.reference_name(record.mtid()).unwrap_or("*");

        Ok(MateRecord {
            read_name,
            reference_name: reference_name.to_string(),
            mate_reference_name: mate_reference_name.to_string(),
            start: record.pos() + 1,
            end: record.cigar().end_pos(),
            mapping_quality: record.mapq(),
            flags: record.flags(),
            read_group,
            read_length: record.seq_len() as u32,
        })
    }
}

impl<'a> Iterator for MateRecordIterator<'a> {
    type Item = Result<MateRecord, BamError>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.inner.next() {
            Some(Ok(record)) => {
                self.count += 1;
                if self.count % 1_000_000 == 0 {
                    debug!("已读取 {} 条记录", self.count);
                }
                Some(self.convert(&record))
            }
            Some(Err(rust_htslib::errors::Error::BamTruncatedRecord)) => {
                Some(Err(BamError::Truncated(format!("第 {} 条记录之后", self.count))))
            }
            Some(Err(rust_htslib::errors::Error::BamInvalidRecord)) => {
                self.count += 1;
                Some(Err(BamError::Malformed(format!("第 {} 条记录", self.count))))
            }
            Some(Err(e)) => Some(Err(BamError::Htslib(e))),
            None => None,
        }
    }
}
