//! BAM头部中下游需要的部分：参考序列字典与read group。

use rust_htslib::bam::{Header, HeaderView};
use std::collections::HashMap;

/// 参考序列条目。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reference {
    pub name: String,
    pub length: u64,
}

/// read group条目，`library` 对应 `LB` 字段。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadGroup {
    pub id: String,
    pub library: Option<String>,
}

/// 从BAM头部提取的、下游需要的信息。
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BamHeader {
    /// 按tid顺序排列的参考序列
    pub references: Vec<Reference>,
    /// 按出现顺序排列的read group
    pub read_groups: Vec<ReadGroup>,
}

impl From<&HeaderView> for BamHeader {
    /// 参考序列取自二进制字典（即 `tid`/`mtid` 索引的对象），
    /// read group取自头部文本的 `@RG` 记录。
    fn from(view: &HeaderView) -> Self {
        let references = view
            .target_names()
            .iter()
            .enumerate()
            .map(|(tid, name)| Reference {
                name: String::from_utf8_lossy(name).to_string(),
                length: view.target_len(tid as u32).unwrap_or(0),
            })
            .collect();

        let read_groups = Header::from_template(view)
            .to_hashmap()
            .get("RG")
            .map(|records| {
                records
                    .iter()
                    .filter_map(|rg| {
                        let id = rg.get("ID")?;
                        Some(ReadGroup {
                            id: id.clone(),
                            library: rg.get("LB").cloned(),
                        })
                    })
                    .collect()
            })
            .unwrap_or_default();

        BamHeader {
            references,
            read_groups,
        }
    }
}

impl BamHeader {
    /// 根据tid取参考序列名，负数或越界返回 `None`。
    pub fn reference_name(&self, tid: i32) -> Option<&str> {
        usize::try_from(tid)
            .ok()
            .and_then(|i| self.references.get(i))
            .map(|r| r.name.as_str())
    }

    /// 所有参考序列长度之和。
    pub fn genome_length(&self) -> u64 {
        self.references.iter().map(|r| r.length).sum()
    }

    /// read group ID到文库名的映射。
    ///
    /// 没有 `LB` 字段的read group以自身ID作为文库名。
    pub fn library_by_read_group(&self) -> HashMap<String, String> {
        self.read_groups
            .iter()
            .map(|rg| {
                let library = rg.library.clone().unwrap_or_else(|| rg.id.clone());
                (rg.id.clone(), library)
            })
            .collect()
    }

    /// 按头部出现顺序去重后的文库名列表。
    ///
    /// ```
    /// use bam2gasv_io::{BamHeader, ReadGroup};
    ///
    /// let header = BamHeader {
    ///     references: Vec::new(),
    ///     read_groups: vec![
    ///         ReadGroup { id: "rg1".into(), library: Some("libA".into()) },
    ///         ReadGroup { id: "rg2".into(), library: Some("libA".into()) },
    ///         ReadGroup { id: "rg3".into(), library: None },
    ///     ],
    /// };
    /// assert_eq!(header.libraries(), vec!["libA".to_string(), "rg3".to_string()]);
    /// ```
    pub fn libraries(&self) -> Vec<String> {
        let mut seen = Vec::new();
        for rg in &self.read_groups {
            let library = rg.library.as_ref().unwrap_or(&rg.id);
            if !seen.contains(library) {
                seen.push(library.clone());
            }
        }
        seen
    }
}
