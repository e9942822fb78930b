use std::fmt;
use std::fs;
use std::path::Path;

use anyhow::{anyhow, Context, Result};
use log::{debug, warn};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::errors::AlignmentError;
use crate::text_utils;

// @module: Timed text segments and SRT I/O

// @const: SRT timestamp regex
static TIMESTAMP_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(\d{2}):(\d{2}):(\d{2})[,.](\d{3}) --> (\d{2}):(\d{2}):(\d{2})[,.](\d{3})").unwrap()
});

// @struct: Single timed text segment
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Segment {
    // @field: Start time in ms
    pub start_ms: u64,

    // @field: End time in ms
    pub end_ms: u64,

    // @field: Segment text
    pub text: String,
}

impl Segment {
    pub fn new(start_ms: u64, end_ms: u64, text: impl Into<String>) -> Self {
        Segment {
            start_ms,
            end_ms,
            text: text.into(),
        }
    }

    /// Duration in milliseconds
    pub fn duration_ms(&self) -> u64 {
        self.end_ms.saturating_sub(self.start_ms)
    }

    /// Temporal overlap with another segment in milliseconds, 0 when disjoint
    pub fn overlap_ms(&self, other: &Segment) -> u64 {
        let start = self.start_ms.max(other.start_ms);
        let end = self.end_ms.min(other.end_ms);
        end.saturating_sub(start)
    }

    /// Same text, timing replaced by `timing`'s
    pub fn restamped(&self, timing: &Segment) -> Self {
        Segment::new(timing.start_ms, timing.end_ms, self.text.clone())
    }

    /// Split after `offset` characters.
    ///
    /// The split time is proportional to the offset, so the two pieces
    /// partition the original interval with no gap and no overlap.
    pub fn split_at_char(&self, offset: usize) -> Result<(Segment, Segment), AlignmentError> {
        let length = text_utils::char_len(&self.text);
        if offset == 0 || offset >= length {
            return Err(AlignmentError::InvalidSplit { offset, length });
        }

        let (head, tail) = text_utils::split_at_char(&self.text, offset);
        let split_ms = self.start_ms + self.duration_ms() * offset as u64 / length as u64;

        Ok((
            Segment::new(self.start_ms, split_ms, head),
            Segment::new(split_ms, self.end_ms, tail),
        ))
    }

    /// Parse an SRT timestamp to milliseconds
    pub fn parse_timestamp(timestamp: &str) -> Result<u64> {
        // Parse HH:MM:SS,mmm format
        let parts: Vec<&str> = timestamp.split(&[':', ',', '.'][..]).collect();

        if parts.len() != 4 {
            return Err(anyhow!("Invalid timestamp format: {}", timestamp));
        }

        let hours: u64 = parts[0].parse().context("Failed to parse hours")?;
        let minutes: u64 = parts[1].parse().context("Failed to parse minutes")?;
        let seconds: u64 = parts[2].parse().context("Failed to parse seconds")?;
        let millis: u64 = parts[3].parse().context("Failed to parse milliseconds")?;

        if minutes >= 60 || seconds >= 60 || millis >= 1000 {
            return Err(anyhow!("Invalid time components in timestamp: {}", timestamp));
        }

        Ok(hours * 3_600_000 + minutes * 60_000 + seconds * 1_000 + millis)
    }

    /// Format a timestamp in milliseconds to SRT format (HH:MM:SS,mmm)
    pub fn format_timestamp(ms: u64) -> String {
        let hours = ms / 3_600_000;
        let minutes = (ms % 3_600_000) / 60_000;
        let seconds = (ms % 60_000) / 1_000;
        let millis = ms % 1_000;

        format!("{:02}:{:02}:{:02},{:03}", hours, minutes, seconds, millis)
    }
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "{} --> {} {}",
            Self::format_timestamp(self.start_ms),
            Self::format_timestamp(self.end_ms),
            self.text
        )
    }
}

/// Ordered sequence of segments; position is reading order
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Series {
    segments: Vec<Segment>,
}

impl Series {
    pub fn new(segments: Vec<Segment>) -> Self {
        Series { segments }
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Segment> {
        self.segments.get(index)
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Segment> {
        self.segments.iter()
    }

    pub fn into_segments(self) -> Vec<Segment> {
        self.segments
    }

    /// Texts of the segments at `indices`, concatenated in the given order
    pub fn concat_text(&self, indices: &[usize]) -> String {
        text_utils::concat_texts(
            indices
                .iter()
                .filter_map(|&i| self.segments.get(i))
                .map(|s| s.text.as_str()),
        )
    }

    /// New series with segment `index` replaced by `pieces`
    pub fn replacing(&self, index: usize, pieces: Vec<Segment>) -> Series {
        let mut segments = Vec::with_capacity(self.segments.len() + pieces.len());
        segments.extend_from_slice(&self.segments[..index]);
        segments.extend(pieces);
        segments.extend_from_slice(&self.segments[index + 1..]);
        Series::new(segments)
    }

    /// New series without segment `index`
    pub fn removing(&self, index: usize) -> Series {
        self.replacing(index, Vec::new())
    }

    /// Parse SRT content
    pub fn from_srt(content: &str) -> Result<Series> {
        let mut segments = Vec::new();

        let mut current_seq_num: Option<usize> = None;
        let mut current_times: Option<(u64, u64)> = None;
        let mut current_text = String::new();

        let mut finish = |seq_num: Option<usize>, times: Option<(u64, u64)>, text: &mut String| {
            if let Some((start_ms, end_ms)) = times {
                let trimmed = text.trim();
                if end_ms < start_ms {
                    warn!("Skipping subtitle {:?} with end {} before start {}", seq_num, end_ms, start_ms);
                } else if trimmed.is_empty() {
                    warn!("Skipping empty subtitle {:?}", seq_num);
                } else {
                    segments.push(Segment::new(start_ms, end_ms, trimmed));
                }
            }
            text.clear();
        };

        for (line_number, line) in content.lines().enumerate() {
            let trimmed = line.trim().trim_start_matches('\u{feff}');

            if trimmed.is_empty() {
                if current_times.is_some() {
                    finish(current_seq_num, current_times, &mut current_text);
                    current_seq_num = None;
                    current_times = None;
                }
                continue;
            }

            if current_seq_num.is_none() && current_times.is_none() {
                if let Ok(num) = trimmed.parse::<usize>() {
                    current_seq_num = Some(num);
                    continue;
                }
            }

            if current_times.is_none() {
                if let Some(caps) = TIMESTAMP_REGEX.captures(trimmed) {
                    current_times = Some((Self::capture_ms(&caps, 1), Self::capture_ms(&caps, 5)));
                    continue;
                }
                warn!("Unexpected text at line {} before timestamp: {}", line_number + 1, trimmed);
                continue;
            }

            if !current_text.is_empty() {
                current_text.push('\n');
            }
            current_text.push_str(trimmed);
        }
        finish(current_seq_num, current_times, &mut current_text);

        // Sort by start time to ensure reading order
        segments.sort_by_key(|s| s.start_ms);
        debug!("Parsed {} SRT segments", segments.len());

        Ok(Series::new(segments))
    }

    fn capture_ms(caps: &regex::Captures, start_idx: usize) -> u64 {
        let part = |i: usize| -> u64 {
            caps.get(start_idx + i)
                .map_or(0, |m| m.as_str().parse().unwrap_or(0))
        };
        ((part(0) * 60 + part(1)) * 60 + part(2)) * 1000 + part(3)
    }

    /// Read an SRT file
    pub fn read_srt<P: AsRef<Path>>(path: P) -> Result<Series> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read subtitle file: {}", path.display()))?;
        Self::from_srt(&content)
    }

    /// Render as SRT, numbering from 1
    pub fn to_srt(&self) -> String {
        let mut output = String::new();
        for (i, segment) in self.segments.iter().enumerate() {
            output.push_str(&format!(
                "{}\n{} --> {}\n{}\n\n",
                i + 1,
                Segment::format_timestamp(segment.start_ms),
                Segment::format_timestamp(segment.end_ms),
                segment.text
            ));
        }
        output
    }

    /// Write an SRT file, creating parent directories
    pub fn write_srt<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)
                    .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
            }
        }
        fs::write(path, self.to_srt())
            .with_context(|| format!("Failed to write subtitle file: {}", path.display()))
    }
}

impl From<Vec<Segment>> for Series {
    fn from(segments: Vec<Segment>) -> Self {
        Series::new(segments)
    }
}

impl FromIterator<Segment> for Series {
    fn from_iter<I: IntoIterator<Item = Segment>>(iter: I) -> Self {
        Series::new(iter.into_iter().collect())
    }
}

impl<'a> IntoIterator for &'a Series {
    type Item = &'a Segment;
    type IntoIter = std::slice::Iter<'a, Segment>;

    fn into_iter(self) -> Self::IntoIter {
        self.segments.iter()
    }
}

impl std::ops::Index<usize> for Series {
    type Output = Segment;

    fn index(&self, index: usize) -> &Segment {
        &self.segments[index]
    }
}
