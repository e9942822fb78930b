/*!
 * Common test utilities for the subalign test suite
 */

#![allow(dead_code)]

use anyhow::Result;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

use subalign::{Segment, Series};

/// Route library logs to the test harness; set RUST_LOG to see them
pub fn init_test_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Creates a temporary directory for test files
pub fn create_temp_dir() -> Result<TempDir> {
    Ok(TempDir::new()?)
}

/// Creates a test file with the given content in the specified directory
pub fn create_test_file(dir: &Path, filename: &str, content: &str) -> Result<PathBuf> {
    let file_path = dir.join(filename);
    fs::write(&file_path, content)?;
    Ok(file_path)
}

/// Series from `(start_ms, end_ms, text)` triples
pub fn series(spans: &[(u64, u64, &str)]) -> Series {
    spans.iter().map(|&(start, end, text)| Segment::new(start, end, text)).collect()
}

/// Texts of a series, in order
pub fn texts(series: &Series) -> Vec<String> {
    series.iter().map(|s| s.text.clone()).collect()
}

/// Four Mandarin anchor lines exercising every stage
pub fn sample_anchor() -> Series {
    series(&[
        (0, 2000, "为什么不试试"),
        (2000, 4000, "好运楼对面"),
        (4000, 6000, "你好，世界"),
        (6000, 7000, "再见"),
    ])
}

/// Cantonese transcript for `sample_anchor`: one line straddles the first
/// two anchors, two fragments share the third and the fourth has nothing
pub fn sample_candidate() -> Series {
    series(&[
        (1000, 3000, "点解唔试下好彩走楼斜对面"),
        (4000, 5000, "你好"),
        (5000, 6000, "世界"),
    ])
}

pub const SAMPLE_ANCHOR_SRT: &str = "1
00:00:00,000 --> 00:00:02,000
为什么不试试

2
00:00:02,000 --> 00:00:04,000
好运楼对面

3
00:00:10,000 --> 00:00:12,000
你好，世界
";

pub const SAMPLE_CANDIDATE_SRT: &str = "1
00:00:00,100 --> 00:00:01,900
点解唔试下

2
00:00:02,100 --> 00:00:03,900
好彩走楼斜对面

3
00:00:10,000 --> 00:00:11,000
你好

4
00:00:11,000 --> 00:00:12,000
世界
";
