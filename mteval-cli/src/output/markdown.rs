//! Markdown output formatter

use super::{Comparison, OutputFormatter};
use anyhow::Result;
use mteval_core::{FormatOptions, Score, SignatureMode};
use std::io::Write;

/// Markdown formatter - outputs scores as tables
pub struct MarkdownFormatter<W: Write> {
    writer: W,
    options: FormatOptions,
    system_count: usize,
    segment_system: Option<String>,
    comparison_header: bool,
}

impl<W: Write> MarkdownFormatter<W> {
    /// Create a new markdown formatter
    pub fn new(writer: W, options: FormatOptions) -> Self {
        Self {
            writer,
            options,
            system_count: 0,
            segment_system: None,
            comparison_header: false,
        }
    }

    /// Consume the formatter and return the writer
    pub fn into_inner(self) -> W {
        self.writer
    }

    fn signature(&self, score: &Score) -> Option<String> {
        match self.options.signature {
            SignatureMode::Hidden => None,
            SignatureMode::Full => Some(score.signature().format(false)),
            SignatureMode::Short => Some(score.signature().format(true)),
        }
    }
}

impl<W: Write + Send + Sync> OutputFormatter for MarkdownFormatter<W> {
    fn format_system(&mut self, system: &str, scores: &[Score]) -> Result<()> {
        let w = self.options.width;
        let with_signature = self.options.signature != SignatureMode::Hidden;
        self.system_count += 1;

        writeln!(self.writer, "## {system}")?;
        writeln!(self.writer)?;
        if with_signature {
            writeln!(self.writer, "| Metric | Score | Signature |")?;
            writeln!(self.writer, "|--------|------:|-----------|")?;
        } else {
            writeln!(self.writer, "| Metric | Score |")?;
            writeln!(self.writer, "|--------|------:|")?;
        }
        for score in scores {
            match self.signature(score) {
                Some(sig) => writeln!(
                    self.writer,
                    "| {} | {:.w$} | `{sig}` |",
                    score.name(),
                    score.value()
                )?,
                None => writeln!(self.writer, "| {} | {:.w$} |", score.name(), score.value())?,
            }
        }
        writeln!(self.writer)?;
        Ok(())
    }

    fn format_segment(&mut self, system: &str, segment: usize, scores: &[Score]) -> Result<()> {
        let w = self.options.width;
        if self.segment_system.as_deref() != Some(system) {
            writeln!(self.writer, "### {system} (sentence level)")?;
            writeln!(self.writer)?;
            self.segment_system = Some(system.to_string());
        }
        let values = scores
            .iter()
            .map(|score| format!("{} = {:.w$}", score.name(), score.value()))
            .collect::<Vec<_>>()
            .join(", ");
        writeln!(self.writer, "{segment}. {values}")?;
        Ok(())
    }

    fn format_comparison(&mut self, comparison: &Comparison) -> Result<()> {
        let w = self.options.width;
        if !self.comparison_header {
            writeln!(self.writer)?;
            writeln!(self.writer, "## Significance")?;
            writeln!(self.writer)?;
            writeln!(self.writer, "| Metric | Baseline | System | Δ | p-value | Test |")?;
            writeln!(self.writer, "|--------|----------|--------|--:|--------:|------|")?;
            self.comparison_header = true;
        }
        let result = &comparison.result;
        writeln!(
            self.writer,
            "| {} | {} ({:.w$}) | {} ({:.w$}) | {:+.w$} | {:.4} | {} |",
            comparison.metric,
            comparison.baseline,
            result.baseline,
            comparison.system,
            result.system,
            result.delta,
            result.p_value,
            result.method,
        )?;
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        writeln!(self.writer)?;
        writeln!(self.writer, "---")?;
        writeln!(self.writer, "*Systems scored: {}*", self.system_count)?;
        self.writer.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::fixtures;

    #[test]
    fn test_system_table() {
        let mut formatter = MarkdownFormatter::new(Vec::new(), FormatOptions::default());
        formatter.format_system("sys.txt", &fixtures::scores()).unwrap();
        formatter.finish().unwrap();

        let out = String::from_utf8(formatter.into_inner()).unwrap();
        assert!(out.starts_with("## sys.txt\n"));
        assert!(out.contains("| Metric | Score |\n"));
        assert!(out.contains("| BLEU | "));
        assert!(out.ends_with("*Systems scored: 1*\n"));
    }

    #[test]
    fn test_signature_column() {
        let options = FormatOptions {
            signature: SignatureMode::Short,
            ..Default::default()
        };
        let mut formatter = MarkdownFormatter::new(Vec::new(), options);
        formatter.format_system("sys.txt", &fixtures::scores()).unwrap();

        let out = String::from_utf8(formatter.into_inner()).unwrap();
        assert!(out.contains("| Metric | Score | Signature |"));
        assert!(out.contains("+#.1+"));
    }

    #[test]
    fn test_segments_and_comparisons() {
        let mut formatter = MarkdownFormatter::new(Vec::new(), FormatOptions::default());
        formatter.format_segment("sys.txt", 1, &fixtures::scores()).unwrap();
        formatter.format_segment("sys.txt", 2, &fixtures::scores()).unwrap();
        formatter.format_comparison(&fixtures::comparison()).unwrap();

        let out = String::from_utf8(formatter.into_inner()).unwrap();
        assert_eq!(out.matches("### sys.txt (sentence level)").count(), 1);
        assert!(out.contains("\n2. BLEU = "));
        assert!(out.contains("## Significance"));
        assert!(out.contains("| BLEU | base.txt ("));
    }
}
