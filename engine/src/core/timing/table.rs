//! Timing Table Format
//!
//! Plain-text table with one `start|end|word` line per word:
//!
//! ```text
//! 0.000|0.640|Mars
//! 0.640|1.120|has
//! ```

use std::path::{Path, PathBuf};

use async_trait::async_trait;

use super::WordAligner;
use crate::core::{
    fs::atomic_write_bytes, ColorTag, CoreError, CoreResult, ScriptResult, WordTiming,
};

/// Renders a timing table
pub fn format_timing_table(timings: &[WordTiming]) -> String {
    let mut output = String::new();
    for timing in timings {
        output.push_str(&format!(
            "{:.3}|{:.3}|{}\n",
            timing.start_seconds, timing.end_seconds, timing.word
        ));
    }
    output
}

/// Writes a timing table atomically
pub fn write_timing_table(path: &Path, timings: &[WordTiming]) -> CoreResult<()> {
    atomic_write_bytes(path, format_timing_table(timings).as_bytes())
}

/// Parses a timing table. Blank lines are skipped.
pub fn parse_timing_table(content: &str) -> CoreResult<Vec<WordTiming>> {
    let mut timings = Vec::new();

    for (line_no, line) in content.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let mut parts = line.splitn(3, '|');
        let (Some(start), Some(end), Some(word)) = (parts.next(), parts.next(), parts.next())
        else {
            return Err(CoreError::InvalidInput(format!(
                "Line {}: expected start|end|word",
                line_no + 1
            )));
        };

        let parse = |value: &str, label: &str| {
            value.trim().parse::<f64>().map_err(|_| {
                CoreError::InvalidInput(format!(
                    "Line {}: invalid {} time '{}'",
                    line_no + 1,
                    label,
                    value
                ))
            })
        };

        timings.push(WordTiming {
            word: word.trim().to_string(),
            start_seconds: parse(start, "start")?,
            end_seconds: parse(end, "end")?,
            color_tag: ColorTag::Default,
        });
    }

    Ok(timings)
}

/// Aligner that reads boundaries from a precomputed table, e.g. the output
/// of a speech recognizer run over the voiceover.
#[derive(Debug, Clone)]
pub struct TimingTableAligner {
    path: PathBuf,
}

impl TimingTableAligner {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl WordAligner for TimingTableAligner {
    fn name(&self) -> &str {
        "timing-table"
    }

    async fn align(&self, _script: &ScriptResult) -> CoreResult<Vec<WordTiming>> {
        let content = tokio::fs::read_to_string(&self.path).await.map_err(|e| {
            CoreError::CaptionTimingFailed(format!(
                "Failed to read timing table {}: {}",
                self.path.display(),
                e
            ))
        })?;
        parse_timing_table(&content)
            .map_err(|e| CoreError::CaptionTimingFailed(e.to_string()))
    }
}
