//! 文本行的复合排序键。
//!
//! 排序列用带符号的1-based列号表示：正数升序，负数降序。
//! discordant行中负链mate的起止列在取键之前互换，
//! 使得不同方向的mate都以“朝向断点的一端”参与比较。

use crate::error::{GasvError, Result};
use std::cmp::Ordering;

/// 当 `strand_column` 为 `-` 时交换 `start_column` 与 `end_column`。
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StrandSwap {
    pub strand_column: usize,
    pub start_column: usize,
    pub end_column: usize,
}

/// 单个键字段。
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct KeyField {
    value: i64,
    descending: bool,
}

impl Ord for KeyField {
    fn cmp(&self, other: &Self) -> Ordering {
        let ord = self.value.cmp(&other.value);
        if self.descending {
            ord.reverse()
        } else {
            ord
        }
    }
}

impl PartialOrd for KeyField {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// 按列顺序逐字段比较的复合键。
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub struct SortKey(Vec<KeyField>);

impl SortKey {
    pub fn values(&self) -> Vec<i64> {
        self.0.iter().map(|f| f.value).collect()
    }
}

/// 取键规则。
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct KeySpec {
    columns: Vec<i32>,
    swaps: Vec<StrandSwap>,
}

impl KeySpec {
    pub fn new(columns: Vec<i32>, swaps: Vec<StrandSwap>) -> Result<Self> {
        if columns.is_empty() || columns.contains(&0) {
            return Err(GasvError::Config(format!(
                "排序列必须是非空的非零列号: {:?}",
                columns
            )));
        }
        Ok(Self { columns, swaps })
    }

    pub(crate) fn from_static(columns: &[i32], swaps: &[StrandSwap]) -> Self {
        Self {
            columns: columns.to_vec(),
            swaps: swaps.to_vec(),
        }
    }

    /// 解析 `2,-3,4` 形式的列号列表。
    ///
    /// ```
    /// use bam2gasv_core::KeySpec;
    ///
    /// assert_eq!(KeySpec::parse_columns("2,-3, 4").unwrap(), vec![2, -3, 4]);
    /// assert!(KeySpec::parse_columns("2,0").is_err());
    /// ```
    pub fn parse_columns(s: &str) -> Result<Vec<i32>> {
        let columns = s
            .split(',')
            .map(|c| {
                c.trim()
                    .parse::<i32>()
                    .map_err(|_| GasvError::Config(format!("无法解析的排序列: '{}'", c)))
            })
            .collect::<Result<Vec<_>>>()?;
        if columns.is_empty() || columns.contains(&0) {
            return Err(GasvError::Config(format!("排序列必须是非零列号: '{}'", s)));
        }
        Ok(columns)
    }

    /// 保留交换规则，替换排序列。
    pub fn with_columns(self, columns: Vec<i32>) -> Result<Self> {
        Self::new(columns, self.swaps)
    }

    pub fn columns(&self) -> &[i32] {
        &self.columns
    }

    /// 从一行制表符分隔文本中提取排序键。
    pub fn extract(&self, line: &str) -> Result<SortKey> {
        let mut fields: Vec<&str> = line.split('\t').collect();

        for swap in &self.swaps {
            if fields.get(swap.strand_column - 1) == Some(&"-")
                && swap.start_column <= fields.len()
                && swap.end_column <= fields.len()
            {
                fields.swap(swap.start_column - 1, swap.end_column - 1);
            }
        }

        self.columns
            .iter()
            .map(|&column| {
                let index = column.unsigned_abs() as usize - 1;
                let raw = fields.get(index).ok_or_else(|| {
                    GasvError::MalformedRow(format!("缺少第 {} 列: '{}'", index + 1, line))
                })?;
                let value = raw.parse::<i64>().map_err(|_| {
                    GasvError::MalformedRow(format!("第 {} 列不是整数: '{}'", index + 1, line))
                })?;
                Ok(KeyField {
                    value,
                    descending: column < 0,
                })
            })
            .collect::<Result<Vec<_>>>()
            .map(SortKey)
    }

    /// 按键排序一批行，键相同时按整行文本排序以保证结果确定。
    pub fn sort_lines(&self, lines: Vec<String>) -> Result<Vec<(SortKey, String)>> {
        let mut keyed = lines
            .into_iter()
            .map(|line| Ok((self.extract(&line)?, line)))
            .collect::<Result<Vec<_>>>()?;
        keyed.sort_unstable();
        Ok(keyed)
    }
}
