//! End Sequence Pair（ESP）：由同一片段的两条mate构成的位置/方向记录。

use std::cmp::Ordering;
use std::fmt;

/// 比对链方向。
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Strand {
    Forward,
    Reverse,
}

impl Strand {
    pub fn from_reverse_flag(reverse: bool) -> Self {
        if reverse {
            Strand::Reverse
        } else {
            Strand::Forward
        }
    }

    pub fn flip(self) -> Self {
        match self {
            Strand::Forward => Strand::Reverse,
            Strand::Reverse => Strand::Forward,
        }
    }
}

impl fmt::Display for Strand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Strand::Forward => write!(f, "+"),
            Strand::Reverse => write!(f, "-"),
        }
    }
}

/// 测序平台，决定mate方向的翻转规则。
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum Platform {
    /// 标准paired-end，不翻转。
    #[default]
    #[clap(name = "illumina")]
    Illumina,
    /// 翻转第二条测序读的方向。
    #[clap(name = "solid")]
    Solid,
    /// mate-pair文库，两条读都翻转。
    #[clap(name = "matepair")]
    MatePair,
}

impl Platform {
    /// 按平台规则得到参与分类的方向。
    ///
    /// ```
    /// use bam2gasv_core::{Platform, Strand};
    ///
    /// assert_eq!(Platform::Illumina.orient(Strand::Forward, true), Strand::Forward);
    /// assert_eq!(Platform::Solid.orient(Strand::Forward, true), Strand::Reverse);
    /// assert_eq!(Platform::Solid.orient(Strand::Forward, false), Strand::Forward);
    /// assert_eq!(Platform::MatePair.orient(Strand::Reverse, false), Strand::Forward);
    /// ```
    pub fn orient(self, strand: Strand, sequenced_second: bool) -> Strand {
        match self {
            Platform::Illumina => strand,
            Platform::Solid if sequenced_second => strand.flip(),
            Platform::Solid => strand,
            Platform::MatePair => strand.flip(),
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Platform::Illumina => write!(f, "illumina"),
            Platform::Solid => write!(f, "solid"),
            Platform::MatePair => write!(f, "matepair"),
        }
    }
}

/// 一条mate在参考上的位置，坐标为1-based闭区间。
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MateHit {
    pub chromosome: u32,
    pub start: i64,
    pub end: i64,
    pub strand: Strand,
}

impl MateHit {
    fn position(&self) -> (u32, i64) {
        (self.chromosome, self.start)
    }
}

/// 成对后的ESP，`first` 总是 (染色体, 起点) 较小的那条mate。
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EndSequencePair {
    read_name: String,
    first: MateHit,
    second: MateHit,
}

impl EndSequencePair {
    /// 构造ESP，按位置排序两条mate。交换只调整位置，方向跟随各自的mate。
    pub fn new(read_name: impl Into<String>, a: MateHit, b: MateHit) -> Self {
        let (first, second) = match a.position().cmp(&b.position()) {
            Ordering::Greater => (b, a),
            _ => (a, b),
        };
        Self {
            read_name: read_name.into(),
            first,
            second,
        }
    }

    pub fn read_name(&self) -> &str {
        &self.read_name
    }

    pub fn first(&self) -> &MateHit {
        &self.first
    }

    pub fn second(&self) -> &MateHit {
        &self.second
    }

    pub fn same_chromosome(&self) -> bool {
        self.first.chromosome == self.second.chromosome
    }

    /// first为正链、second为负链。
    pub fn is_convergent(&self) -> bool {
        self.first.strand == Strand::Forward && self.second.strand == Strand::Reverse
    }

    /// 片段长度：second末端 − first起点 + 1。
    pub fn insert_length(&self) -> i64 {
        self.second.end - self.first.start + 1
    }

    /// discordant文件的一行：read名与两条mate的 染色体/起点/终点/方向。
    pub fn discordant_line(&self) -> String {
        format!(
            "{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}",
            self.read_name,
            self.first.chromosome,
            self.first.start,
            self.first.end,
            self.first.strand,
            self.second.chromosome,
            self.second.start,
            self.second.end,
            self.second.strand,
        )
    }

    /// concordant文件的一行：染色体与片段跨度。
    pub fn concordant_line(&self) -> String {
        format!(
            "{}\t{}\t{}",
            self.first.chromosome, self.first.start, self.second.end
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hit(chromosome: u32, start: i64, end: i64, strand: Strand) -> MateHit {
        MateHit {
            chromosome,
            start,
            end,
            strand,
        }
    }

    #[test]
    fn test_pair_orders_by_position() {
        let upstream = hit(1, 100, 150, Strand::Forward);
        let downstream = hit(1, 300, 350, Strand::Reverse);
        let esp = EndSequencePair::new("r1", downstream, upstream);

        assert_eq!(esp.first(), &upstream);
        assert_eq!(esp.second(), &downstream);
        assert!(esp.is_convergent());
        assert_eq!(esp.insert_length(), 251);
    }

    #[test]
    fn test_swap_keeps_strand_with_mate() {
        // 下游mate为正链，上游为负链：交换后方向仍跟随原mate
        let esp = EndSequencePair::new(
            "r1",
            hit(1, 300, 350, Strand::Forward),
            hit(1, 100, 150, Strand::Reverse),
        );
        assert_eq!(esp.first().strand, Strand::Reverse);
        assert_eq!(esp.second().strand, Strand::Forward);
        assert!(!esp.is_convergent());
    }

    #[test]
    fn test_chromosome_orders_before_start() {
        let esp = EndSequencePair::new(
            "r1",
            hit(2, 10, 60, Strand::Forward),
            hit(1, 5000, 5050, Strand::Forward),
        );
        assert_eq!(esp.first().chromosome, 1);
        assert!(!esp.same_chromosome());
    }

    #[test]
    fn test_lines() {
        let esp = EndSequencePair::new(
            "read/7",
            hit(1, 100, 150, Strand::Forward),
            hit(3, 300, 350, Strand::Reverse),
        );
        assert_eq!(esp.discordant_line(), "read/7\t1\t100\t150\t+\t3\t300\t350\t-");
        assert_eq!(esp.concordant_line(), "1\t100\t350");
    }
}
