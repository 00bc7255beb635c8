//! 与解析后端无关的比对记录。

/// SAM flag位。
pub mod flags {
    pub const PAIRED: u16 = 0x1;
    pub const PROPER_PAIR: u16 = 0x2;
    pub const UNMAPPED: u16 = 0x4;
    pub const MATE_UNMAPPED: u16 = 0x8;
    pub const REVERSE: u16 = 0x10;
    pub const MATE_REVERSE: u16 = 0x20;
    pub const FIRST_IN_TEMPLATE: u16 = 0x40;
    pub const LAST_IN_TEMPLATE: u16 = 0x80;
    pub const SECONDARY: u16 = 0x100;
    pub const QC_FAIL: u16 = 0x200;
    pub const DUPLICATE: u16 = 0x400;
    pub const SUPPLEMENTARY: u16 = 0x800;
}

/// 一条比对记录中配对分析需要的字段。
///
/// 坐标均为1-based闭区间。参考名为 `*` 表示未比对。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MateRecord {
    pub read_name: String,
    pub reference_name: String,
    pub mate_reference_name: String,
    pub start: i64,
    pub end: i64,
    pub mapping_quality: u8,
    pub flags: u16,
    pub read_group: Option<String>,
    pub read_length: u32,
}

impl MateRecord {
    #[inline]
    fn has(&self, bit: u16) -> bool {
        self.flags & bit != 0
    }

    /// 检查是否为配对读
    #[inline]
    pub fn is_paired(&self) -> bool {
        self.has(flags::PAIRED)
    }

    #[inline]
    pub fn is_unmapped(&self) -> bool {
        self.has(flags::UNMAPPED)
    }

    #[inline]
    pub fn is_mate_unmapped(&self) -> bool {
        self.has(flags::MATE_UNMAPPED)
    }

    /// 检查是否为reverse链
    #[inline]
    pub fn is_reverse(&self) -> bool {
        self.has(flags::REVERSE)
    }

    #[inline]
    pub fn is_first_in_template(&self) -> bool {
        self.has(flags::FIRST_IN_TEMPLATE)
    }

    #[inline]
    pub fn is_last_in_template(&self) -> bool {
        self.has(flags::LAST_IN_TEMPLATE)
    }

    #[inline]
    pub fn is_secondary(&self) -> bool {
        self.has(flags::SECONDARY)
    }

    #[inline]
    pub fn is_supplementary(&self) -> bool {
        self.has(flags::SUPPLEMENTARY)
    }

    #[inline]
    pub fn is_qc_fail(&self) -> bool {
        self.has(flags::QC_FAIL)
    }

    /// 检查是否标记为duplicate
    #[inline]
    pub fn is_duplicate(&self) -> bool {
        self.has(flags::DUPLICATE)
    }
}
