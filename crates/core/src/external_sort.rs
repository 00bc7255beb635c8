//! 分文库、分类别的外部排序。
//!
//! # 算法
//!
//! 1. **累积**：每个 (文库, 输出桶) 一个只追加的行缓冲区
//! 2. **溢写**：任一缓冲区达到阈值时，所有文库中行数不少于阈值1/10的缓冲区
//!    一起按类别的复合键排序，写入编号递增的临时文件后清空
//! 3. **归并**：输入结束后，对每个有临时文件的桶做K路归并写出最终文件，
//!    并删除临时文件
//!
//! 内存占用与缓冲区阈值和同时打开的临时文件数成正比，与总行数无关。
//! concordant桶在no-sort模式下跳过排序，直接写入最终文件。

use crate::category::{Bucket, VariantCategory};
use crate::error::{GasvError, Result};
use crate::sort_key::{KeySpec, SortKey};
use std::cmp::Reverse;
use std::collections::{BTreeMap, BinaryHeap};
use std::ffi::OsString;
use std::fs::{self, File};
use std::io::{BufRead, BufReader, BufWriter, Lines, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// 归并时每个临时文件的读缓冲大小。
const MERGE_BUFFER_SIZE: usize = 64 * 1024;

/// `<prefix>_<library>.<suffix>`
pub fn output_path(prefix: &Path, library: &str, suffix: &str) -> PathBuf {
    let mut name = OsString::from(prefix.as_os_str());
    name.push(format!("_{}.{}", library, suffix));
    PathBuf::from(name)
}

/// `<final>.<n>.tmpFile`
fn run_path(final_path: &Path, number: usize) -> PathBuf {
    let mut name = OsString::from(final_path.as_os_str());
    name.push(format!(".{}.tmpFile", number));
    PathBuf::from(name)
}

fn create_writer(path: &Path) -> Result<BufWriter<File>> {
    File::create(path)
        .map(BufWriter::new)
        .map_err(GasvError::io(path))
}

fn write_rows<'a, I>(path: &Path, rows: I) -> Result<u64>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut writer = create_writer(path)?;
    let mut count = 0;
    for row in rows {
        writeln!(writer, "{}", row).map_err(GasvError::io(path))?;
        count += 1;
    }
    writer.flush().map_err(GasvError::io(path))?;
    Ok(count)
}

/// 排序参数。
#[derive(Debug, Clone)]
pub struct SortOptions {
    pub prefix: PathBuf,
    /// 单个缓冲区的溢写阈值（行数）
    pub spill_threshold: usize,
    /// concordant桶不排序
    pub no_sort: bool,
    /// 覆盖discordant类别的排序列
    pub discordant_columns: Option<Vec<i32>>,
}

impl SortOptions {
    /// 批量溢写时缓冲区的最小行数。
    pub fn batch_minimum(&self) -> usize {
        (self.spill_threshold / 10).max(1)
    }

    fn key_spec(&self, category: VariantCategory) -> Result<KeySpec> {
        let spec = category.default_key_spec();
        match &self.discordant_columns {
            Some(columns) if !category.is_concordant() => spec.with_columns(columns.clone()),
            _ => Ok(spec),
        }
    }
}

/// 一个排序完成的最终输出文件。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FinishedFile {
    pub bucket: Bucket,
    pub path: PathBuf,
    pub rows: u64,
}

/// 单个 (文库, 输出桶) 的缓冲区与临时文件记录。
struct SortedBucket {
    bucket: Bucket,
    key_spec: KeySpec,
    rows: Vec<String>,
    final_path: PathBuf,
    runs: Vec<PathBuf>,
    /// no-sort模式下常开的最终文件
    direct: Option<BufWriter<File>>,
    direct_rows: u64,
}

impl SortedBucket {
    fn new(bucket: Bucket, key_spec: KeySpec, final_path: PathBuf, no_sort: bool) -> Result<Self> {
        let direct = if no_sort && bucket.category.is_concordant() {
            Some(create_writer(&final_path)?)
        } else {
            None
        };
        Ok(Self {
            bucket,
            key_spec,
            rows: Vec::new(),
            final_path,
            runs: Vec::new(),
            direct,
            direct_rows: 0,
        })
    }

    fn push(&mut self, line: String) -> Result<()> {
        match self.direct.as_mut() {
            Some(writer) => {
                writeln!(writer, "{}", line).map_err(GasvError::io(&self.final_path))?;
                self.direct_rows += 1;
            }
            None => self.rows.push(line),
        }
        Ok(())
    }

    /// 排序缓冲区并写入下一个临时文件。
    fn spill(&mut self) -> Result<()> {
        let sorted = self.key_spec.sort_lines(std::mem::take(&mut self.rows))?;
        let path = run_path(&self.final_path, self.runs.len() + 1);
        let count = write_rows(&path, sorted.iter().map(|(_, line)| line.as_str()))?;
        debug!("溢写 {} 行到 {}", count, path.display());
        self.runs.push(path);
        Ok(())
    }

    fn finish(mut self) -> Result<FinishedFile> {
        let rows = if let Some(mut writer) = self.direct.take() {
            writer.flush().map_err(GasvError::io(&self.final_path))?;
            self.direct_rows
        } else if self.runs.is_empty() {
            let sorted = self.key_spec.sort_lines(std::mem::take(&mut self.rows))?;
            write_rows(&self.final_path, sorted.iter().map(|(_, line)| line.as_str()))?
        } else {
            if !self.rows.is_empty() {
                self.spill()?;
            }
            let merged = merge_runs(&self.runs, &self.final_path, &self.key_spec)?;
            for run in &self.runs {
                fs::remove_file(run).map_err(GasvError::io(run))?;
            }
            merged
        };

        Ok(FinishedFile {
            bucket: self.bucket,
            path: self.final_path,
            rows,
        })
    }
}

/// 归并游标：一个临时文件及其当前行。
struct RunCursor {
    lines: Lines<BufReader<File>>,
    path: PathBuf,
}

impl RunCursor {
    fn open(path: &Path) -> Result<Self> {
        let file = File::open(path).map_err(GasvError::io(path))?;
        Ok(Self {
            lines: BufReader::with_capacity(MERGE_BUFFER_SIZE, file).lines(),
            path: path.to_path_buf(),
        })
    }

    fn next_row(&mut self, spec: &KeySpec) -> Result<Option<(SortKey, String)>> {
        match self.lines.next() {
            Some(line) => {
                let line = line.map_err(GasvError::io(&self.path))?;
                Ok(Some((spec.extract(&line)?, line)))
            }
            None => Ok(None),
        }
    }
}

/// K路归并若干已排序的临时文件，返回写出的行数。
///
/// 每个文件只保留一个当前行，用最小堆选出全局最小者。
pub fn merge_runs(runs: &[PathBuf], output: &Path, spec: &KeySpec) -> Result<u64> {
    let mut cursors = runs
        .iter()
        .map(|path| RunCursor::open(path))
        .collect::<Result<Vec<_>>>()?;

    let mut heap = BinaryHeap::with_capacity(cursors.len());
    for (idx, cursor) in cursors.iter_mut().enumerate() {
        if let Some((key, line)) = cursor.next_row(spec)? {
            heap.push(Reverse((key, line, idx)));
        }
    }

    let mut writer = create_writer(output)?;
    let mut count = 0;
    while let Some(Reverse((_, line, idx))) = heap.pop() {
        writeln!(writer, "{}", line).map_err(GasvError::io(output))?;
        count += 1;
        if let Some((key, line)) = cursors[idx].next_row(spec)? {
            heap.push(Reverse((key, line, idx)));
        }
    }
    writer.flush().map_err(GasvError::io(output))?;

    debug!("归并 {} 个临时文件共 {} 行到 {}", runs.len(), count, output.display());
    Ok(count)
}

struct LibraryBuckets {
    name: String,
    buckets: BTreeMap<Bucket, SortedBucket>,
}

/// 所有文库的输出桶及其溢写协调。
pub struct ExternalSorter {
    options: SortOptions,
    libraries: Vec<LibraryBuckets>,
    spills: u64,
}

impl ExternalSorter {
    pub fn new(options: SortOptions) -> Self {
        Self {
            options,
            libraries: Vec::new(),
            spills: 0,
        }
    }

    /// 注册一个文库及其启用的输出桶，返回文库下标。
    pub fn add_library(&mut self, name: &str, buckets: &[Bucket]) -> Result<usize> {
        let mut map = BTreeMap::new();
        for &bucket in buckets {
            let path = output_path(&self.options.prefix, name, &bucket.suffix());
            let spec = self.options.key_spec(bucket.category)?;
            map.insert(bucket, SortedBucket::new(bucket, spec, path, self.options.no_sort)?);
        }
        self.libraries.push(LibraryBuckets {
            name: name.to_string(),
            buckets: map,
        });
        Ok(self.libraries.len() - 1)
    }

    fn bucket_mut(&mut self, library: usize, bucket: Bucket) -> Result<&mut SortedBucket> {
        self.libraries
            .get_mut(library)
            .and_then(|lib| lib.buckets.get_mut(&bucket))
            .ok_or_else(|| GasvError::Config(format!("未注册的输出桶: 文库#{} {}", library, bucket)))
    }

    fn bucket(&self, library: usize, bucket: Bucket) -> Option<&SortedBucket> {
        self.libraries.get(library).and_then(|lib| lib.buckets.get(&bucket))
    }

    /// 追加一行，必要时触发批量溢写。
    pub fn push(&mut self, library: usize, bucket: Bucket, line: String) -> Result<()> {
        let threshold = self.options.spill_threshold;
        let target = self.bucket_mut(library, bucket)?;
        target.push(line)?;
        if target.rows.len() >= threshold {
            self.spill_all()?;
        }
        Ok(())
    }

    /// 溢写所有达到批量下限的缓冲区。
    pub fn spill_all(&mut self) -> Result<()> {
        let minimum = self.options.batch_minimum();
        let mut spilled = 0;
        for library in &mut self.libraries {
            for bucket in library.buckets.values_mut() {
                if bucket.rows.len() >= minimum {
                    bucket.spill()?;
                    spilled += 1;
                }
            }
        }
        self.spills += 1;
        debug!("第 {} 次批量溢写，共 {} 个缓冲区", self.spills, spilled);
        Ok(())
    }

    /// 某个桶已写出的临时文件数。
    pub fn temp_file_count(&self, library: usize, bucket: Bucket) -> usize {
        self.bucket(library, bucket).map_or(0, |b| b.runs.len())
    }

    /// 某个桶当前缓冲的行数。
    pub fn buffered(&self, library: usize, bucket: Bucket) -> usize {
        self.bucket(library, bucket).map_or(0, |b| b.rows.len())
    }

    /// 归并所有桶，按注册顺序返回每个文库的最终文件。
    pub fn finish(self) -> Result<Vec<Vec<FinishedFile>>> {
        info!("开始归并，共 {} 次批量溢写", self.spills);
        let mut finished = Vec::with_capacity(self.libraries.len());
        for library in self.libraries {
            let mut files = Vec::with_capacity(library.buckets.len());
            for (_, bucket) in library.buckets {
                let file = bucket.finish()?;
                debug!("文库 {} 的 {} 输出 {} 行", library.name, file.bucket, file.rows);
                files.push(file);
            }
            finished.push(files);
        }
        Ok(finished)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::category::QualityTier;
    use tempfile::TempDir;

    fn options(dir: &TempDir, spill_threshold: usize) -> SortOptions {
        SortOptions {
            prefix: dir.path().join("sample"),
            spill_threshold,
            no_sort: false,
            discordant_columns: None,
        }
    }

    fn temp_files(dir: &TempDir) -> Vec<PathBuf> {
        fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().path())
            .filter(|p| p.to_string_lossy().ends_with(".tmpFile"))
            .collect()
    }

    fn read_lines(path: &Path) -> Vec<String> {
        fs::read_to_string(path).unwrap().lines().map(String::from).collect()
    }

    /// 确定性的伪随机concordant行。
    fn concordant_rows(n: usize, seed: u64) -> Vec<String> {
        let mut state = seed;
        (0..n)
            .map(|_| {
                state = state.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
                let chromosome = (state >> 60) % 3 + 1;
                let start = (state >> 20) % 100_000;
                format!("{}\t{}\t{}", chromosome, start, start + 300)
            })
            .collect()
    }

    fn sorted_by_key(rows: &[String], category: VariantCategory) -> Vec<String> {
        category
            .default_key_spec()
            .sort_lines(rows.to_vec())
            .unwrap()
            .into_iter()
            .map(|(_, line)| line)
            .collect()
    }

    const CONCORDANT: Bucket = Bucket {
        category: VariantCategory::Concordant,
        tier: QualityTier::High,
    };
    const DELETION: Bucket = Bucket {
        category: VariantCategory::Deletion,
        tier: QualityTier::High,
    };

    #[test]
    fn test_paths() {
        let path = output_path(Path::new("/out/run1"), "libA", "deletion");
        assert_eq!(path, PathBuf::from("/out/run1_libA.deletion"));
        assert_eq!(run_path(&path, 3), PathBuf::from("/out/run1_libA.deletion.3.tmpFile"));
    }

    #[test]
    fn test_single_run_round_trip() {
        let dir = TempDir::new().unwrap();
        // 阈值100，批量下限10：50行不触发溢写，手动溢写后恰好一个临时文件
        let mut sorter = ExternalSorter::new(options(&dir, 100));
        let lib = sorter.add_library("libA", &[CONCORDANT]).unwrap();

        let rows = concordant_rows(50, 7);
        for row in &rows {
            sorter.push(lib, CONCORDANT, row.clone()).unwrap();
        }
        assert_eq!(sorter.temp_file_count(lib, CONCORDANT), 0);
        sorter.spill_all().unwrap();
        assert_eq!(sorter.temp_file_count(lib, CONCORDANT), 1);
        assert_eq!(sorter.buffered(lib, CONCORDANT), 0);
        assert_eq!(temp_files(&dir).len(), 1);

        let files = sorter.finish().unwrap();
        let merged = read_lines(&files[0][0].path);
        assert_eq!(merged, sorted_by_key(&rows, VariantCategory::Concordant));
        assert_eq!(files[0][0].rows, 50);
        assert!(temp_files(&dir).is_empty());
    }

    #[test]
    fn test_merge_of_many_runs_preserves_multiset() {
        let dir = TempDir::new().unwrap();
        let mut sorter = ExternalSorter::new(options(&dir, 4));
        let lib = sorter.add_library("libA", &[CONCORDANT]).unwrap();

        // 重复行也必须原样保留
        let mut rows = concordant_rows(13, 42);
        rows.push(rows[0].clone());
        for row in &rows {
            sorter.push(lib, CONCORDANT, row.clone()).unwrap();
        }
        assert_eq!(sorter.temp_file_count(lib, CONCORDANT), 3);
        assert_eq!(sorter.buffered(lib, CONCORDANT), 2);

        let files = sorter.finish().unwrap();
        let merged = read_lines(&files[0][0].path);

        let mut expected = rows.clone();
        expected.sort();
        let mut actual = merged.clone();
        actual.sort();
        assert_eq!(actual, expected);
        assert_eq!(merged, sorted_by_key(&rows, VariantCategory::Concordant));
        assert!(temp_files(&dir).is_empty());
    }

    #[test]
    fn test_concordant_and_deletion_end_to_end() {
        let dir = TempDir::new().unwrap();
        let mut sorter = ExternalSorter::new(options(&dir, 5));
        let lib = sorter.add_library("libA", &[CONCORDANT, DELETION]).unwrap();

        let concordant = concordant_rows(10, 3);
        let deletions = vec![
            "r9\t2\t5000\t5050\t+\t2\t9000\t9050\t-".to_string(),
            "r2\t1\t700\t750\t+\t1\t4000\t4050\t-".to_string(),
        ];
        for (i, row) in concordant.iter().enumerate() {
            sorter.push(lib, CONCORDANT, row.clone()).unwrap();
            if i % 5 == 1 {
                sorter.push(lib, DELETION, deletions[i / 5].clone()).unwrap();
            }
        }

        assert_eq!(sorter.temp_file_count(lib, CONCORDANT), 2);
        assert!(!temp_files(&dir).is_empty());

        let files = sorter.finish().unwrap();
        let by_bucket: BTreeMap<_, _> = files[0].iter().map(|f| (f.bucket, f)).collect();

        let concordant_out = read_lines(&by_bucket[&CONCORDANT].path);
        assert_eq!(concordant_out.len(), 10);
        assert_eq!(concordant_out, sorted_by_key(&concordant, VariantCategory::Concordant));

        let deletion_out = read_lines(&by_bucket[&DELETION].path);
        assert_eq!(deletion_out, vec![deletions[1].clone(), deletions[0].clone()]);

        assert_eq!(by_bucket[&CONCORDANT].path, dir.path().join("sample_libA.concordant"));
        assert!(temp_files(&dir).is_empty());
    }

    #[test]
    fn test_batch_spill_respects_minimum() {
        let dir = TempDir::new().unwrap();
        let mut sorter = ExternalSorter::new(options(&dir, 100));
        let a = sorter.add_library("libA", &[CONCORDANT]).unwrap();
        let b = sorter.add_library("libB", &[DELETION, CONCORDANT]).unwrap();

        for row in concordant_rows(12, 1) {
            sorter.push(b, CONCORDANT, row).unwrap();
        }
        sorter.push(b, DELETION, "r1\t1\t1\t50\t+\t1\t9000\t9050\t-".to_string()).unwrap();
        for row in concordant_rows(100, 2) {
            sorter.push(a, CONCORDANT, row).unwrap();
        }

        // libA触发溢写；libB的concordant有12行(>=10)一起溢写，deletion只有1行保留
        assert_eq!(sorter.temp_file_count(a, CONCORDANT), 1);
        assert_eq!(sorter.temp_file_count(b, CONCORDANT), 1);
        assert_eq!(sorter.temp_file_count(b, DELETION), 0);
        assert_eq!(sorter.buffered(b, DELETION), 1);

        let files = sorter.finish().unwrap();
        assert_eq!(files.len(), 2);
        assert_eq!(files[1].iter().map(|f| f.rows).sum::<u64>(), 13);
    }

    #[test]
    fn test_no_sort_keeps_arrival_order() {
        let dir = TempDir::new().unwrap();
        let mut opts = options(&dir, 2);
        opts.no_sort = true;
        let mut sorter = ExternalSorter::new(opts);
        let lib = sorter.add_library("libA", &[CONCORDANT]).unwrap();

        let rows = concordant_rows(7, 9);
        for row in &rows {
            sorter.push(lib, CONCORDANT, row.clone()).unwrap();
        }
        assert_eq!(sorter.temp_file_count(lib, CONCORDANT), 0);

        let files = sorter.finish().unwrap();
        assert_eq!(read_lines(&files[0][0].path), rows);
        assert_eq!(files[0][0].rows, 7);
    }

    #[test]
    fn test_empty_bucket_writes_empty_file() {
        let dir = TempDir::new().unwrap();
        let mut sorter = ExternalSorter::new(options(&dir, 10));
        sorter.add_library("libA", &[DELETION]).unwrap();
        let files = sorter.finish().unwrap();
        assert_eq!(files[0][0].rows, 0);
        assert!(files[0][0].path.exists());
    }

    #[test]
    fn test_unknown_bucket_is_error() {
        let dir = TempDir::new().unwrap();
        let mut sorter = ExternalSorter::new(options(&dir, 10));
        let lib = sorter.add_library("libA", &[DELETION]).unwrap();
        assert!(sorter.push(lib, CONCORDANT, "1\t2\t3".to_string()).is_err());
        assert!(sorter.push(lib + 1, DELETION, "x".to_string()).is_err());
    }

    #[test]
    fn test_discordant_column_override() {
        let dir = TempDir::new().unwrap();
        let mut opts = options(&dir, 100);
        opts.discordant_columns = Some(vec![-3]);
        let mut sorter = ExternalSorter::new(opts);
        let lib = sorter.add_library("libA", &[DELETION]).unwrap();
        for start in [100, 900, 500] {
            let row = format!("r{}\t1\t{}\t{}\t+\t1\t20000\t20050\t-", start, start, start + 50);
            sorter.push(lib, DELETION, row).unwrap();
        }
        let files = sorter.finish().unwrap();
        let starts: Vec<String> = read_lines(&files[0][0].path)
            .iter()
            .map(|l| l.split('\t').nth(2).unwrap().to_string())
            .collect();
        assert_eq!(starts, vec!["900", "500", "100"]);
    }

    #[test]
    fn test_missing_run_file_is_io_error() {
        let dir = TempDir::new().unwrap();
        let spec = VariantCategory::Concordant.default_key_spec();
        let err = merge_runs(
            &[dir.path().join("gone.1.tmpFile")],
            &dir.path().join("out"),
            &spec,
        )
        .unwrap_err();
        assert!(matches!(err, GasvError::Io { .. }));
    }
}
