//! 染色体名到整数ID的转换。
//!
//! GASV的输出只接受整数染色体编号。解析顺序：命名文件 → 去掉 `chr` 前缀后
//! 的整数 → X/Y（23/24）。都不匹配的名字由调用方记录并跳过。

use crate::error::{GasvError, Result};
use std::collections::HashMap;
use std::fs;
use std::path::Path;

pub const CHROMOSOME_X: u32 = 23;
pub const CHROMOSOME_Y: u32 = 24;

#[derive(Debug, Clone, Default)]
pub struct ChromosomeNaming {
    table: HashMap<String, u32>,
}

impl ChromosomeNaming {
    pub fn new() -> Self {
        Self::default()
    }

    /// 读取 `<名字>\t<整数ID>` 格式的命名文件。
    pub fn from_file(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path).map_err(|e| {
            GasvError::Config(format!("无法读取染色体命名文件 {}: {}", path.display(), e))
        })?;
        Self::parse(&text)
    }

    pub fn parse(text: &str) -> Result<Self> {
        let mut table = HashMap::new();
        for line in text.lines() {
            let line = line.trim_end();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let parsed = line
                .split_once('\t')
                .and_then(|(name, id)| id.trim().parse::<u32>().ok().map(|id| (name, id)));
            match parsed {
                Some((name, id)) => {
                    table.insert(name.to_string(), id);
                }
                None => {
                    return Err(GasvError::Config(format!(
                        "染色体命名文件行格式错误: '{}'",
                        line
                    )))
                }
            }
        }
        Ok(Self { table })
    }

    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    /// 解析染色体名，无法识别时返回 `None`。
    ///
    /// ```
    /// use bam2gasv_core::ChromosomeNaming;
    ///
    /// let naming = ChromosomeNaming::new();
    /// assert_eq!(naming.resolve("chr7"), Some(7));
    /// assert_eq!(naming.resolve("X"), Some(23));
    /// assert_eq!(naming.resolve("chrUn_gl000220"), None);
    /// ```
    pub fn resolve(&self, name: &str) -> Option<u32> {
        if let Some(&id) = self.table.get(name) {
            return Some(id);
        }

        let bare = match name.get(..3) {
            Some(prefix) if prefix.eq_ignore_ascii_case("chr") => &name[3..],
            _ => name,
        };
        if let Ok(id) = bare.parse::<u32>() {
            return Some(id);
        }
        match bare {
            "X" | "x" => Some(CHROMOSOME_X),
            "Y" | "y" => Some(CHROMOSOME_Y),
            _ => None,
        }
    }
}
