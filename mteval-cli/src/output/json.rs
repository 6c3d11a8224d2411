//! JSON output formatter

use super::{Comparison, OutputFormatter};
use anyhow::Result;
use mteval_core::Score;
use serde::Serialize;
use std::io::Write;

/// JSON formatter - collects everything and writes one document at the end
pub struct JsonFormatter<W: Write> {
    writer: W,
    report: Report,
}

/// Corpus scores of one system
#[derive(Debug, Serialize)]
pub struct SystemData {
    /// System label
    pub system: String,
    /// One score per metric
    pub scores: Vec<Score>,
}

/// Scores of one segment
#[derive(Debug, Serialize)]
pub struct SegmentData {
    /// System label
    pub system: String,
    /// 1-based segment number
    pub segment: usize,
    /// One score per metric
    pub scores: Vec<Score>,
}

#[derive(Debug, Default, Serialize)]
struct Report {
    #[serde(skip_serializing_if = "Vec::is_empty")]
    systems: Vec<SystemData>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    segments: Vec<SegmentData>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    comparisons: Vec<Comparison>,
}

impl<W: Write> JsonFormatter<W> {
    /// Create a new JSON formatter
    pub fn new(writer: W) -> Self {
        Self {
            writer,
            report: Report::default(),
        }
    }

    /// Consume the formatter and return the writer
    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write + Send + Sync> OutputFormatter for JsonFormatter<W> {
    fn format_system(&mut self, system: &str, scores: &[Score]) -> Result<()> {
        self.report.systems.push(SystemData {
            system: system.to_string(),
            scores: scores.to_vec(),
        });
        Ok(())
    }

    fn format_segment(&mut self, system: &str, segment: usize, scores: &[Score]) -> Result<()> {
        self.report.segments.push(SegmentData {
            system: system.to_string(),
            segment,
            scores: scores.to_vec(),
        });
        Ok(())
    }

    fn format_comparison(&mut self, comparison: &Comparison) -> Result<()> {
        self.report.comparisons.push(comparison.clone());
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        serde_json::to_writer_pretty(&mut self.writer, &self.report)?;
        writeln!(self.writer)?;
        self.writer.flush()?;
        Ok(())
    }
}
