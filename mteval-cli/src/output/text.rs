//! Plain text output formatter

use super::{Comparison, OutputFormatter};
use anyhow::Result;
use mteval_core::{FormatOptions, Score};
use std::io::Write;

/// p-value below which a comparison is marked with `*`
const SIGNIFICANCE_LEVEL: f64 = 0.05;

/// Plain text formatter - outputs one score per line
pub struct TextFormatter<W: Write> {
    writer: W,
    options: FormatOptions,
    label_systems: bool,
}

impl<W: Write> TextFormatter<W> {
    /// Create a new text formatter
    pub fn new(writer: W, options: FormatOptions) -> Self {
        Self {
            writer,
            options,
            label_systems: false,
        }
    }

    /// Prefix every line with the system label
    pub fn label_systems(mut self, yes: bool) -> Self {
        self.label_systems = yes;
        self
    }

    /// Consume the formatter and return the writer
    pub fn into_inner(self) -> W {
        self.writer
    }

    fn prefix(&self, system: &str) -> String {
        if self.label_systems {
            format!("{system}: ")
        } else {
            String::new()
        }
    }
}

impl<W: Write + Send + Sync> OutputFormatter for TextFormatter<W> {
    fn format_system(&mut self, system: &str, scores: &[Score]) -> Result<()> {
        let prefix = self.prefix(system);
        for score in scores {
            writeln!(self.writer, "{prefix}{}", score.format(self.options))?;
        }
        Ok(())
    }

    fn format_segment(&mut self, system: &str, segment: usize, scores: &[Score]) -> Result<()> {
        let prefix = self.prefix(system);
        let line = scores
            .iter()
            .map(|score| score.format(self.options))
            .collect::<Vec<_>>()
            .join("\t");
        writeln!(self.writer, "{prefix}{segment}\t{line}")?;
        Ok(())
    }

    fn format_comparison(&mut self, comparison: &Comparison) -> Result<()> {
        let w = self.options.width;
        let result = &comparison.result;
        let mark = if result.is_significant(SIGNIFICANCE_LEVEL) {
            " *"
        } else {
            ""
        };
        writeln!(
            self.writer,
            "{}: {} vs. {} = {:.w$} vs. {:.w$} (Δ = {:+.w$}, p = {:.4}, {}){mark}",
            comparison.metric,
            comparison.system,
            comparison.baseline,
            result.system,
            result.baseline,
            result.delta,
            result.p_value,
            result.method,
        )?;
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        self.writer.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::fixtures;

    fn render(label: bool, f: impl FnOnce(&mut TextFormatter<Vec<u8>>)) -> String {
        let mut formatter = TextFormatter::new(Vec::new(), FormatOptions::default()).label_systems(label);
        f(&mut formatter);
        formatter.finish().unwrap();
        String::from_utf8(formatter.into_inner()).unwrap()
    }

    #[test]
    fn test_system_scores_one_per_line() {
        let out = render(false, |f| f.format_system("sys.txt", &fixtures::scores()).unwrap());
        let lines: Vec<_> = out.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("BLEU = "));
        assert!(lines[1].starts_with("chrF2 = "));
    }

    #[test]
    fn test_labelled_systems() {
        let out = render(true, |f| f.format_system("sys.txt", &fixtures::scores()).unwrap());
        assert!(out.lines().all(|line| line.starts_with("sys.txt: ")));
    }

    #[test]
    fn test_segment_line() {
        let out = render(false, |f| f.format_segment("sys.txt", 3, &fixtures::scores()).unwrap());
        assert!(out.starts_with("3\tBLEU = "));
        assert!(out.contains("\tchrF2 = "));
    }

    #[test]
    fn test_comparison_line() {
        let out = render(false, |f| f.format_comparison(&fixtures::comparison()).unwrap());
        assert!(out.starts_with("BLEU: sys.txt vs. base.txt = "));
        assert!(out.contains("paired bootstrap"));
    }
}
