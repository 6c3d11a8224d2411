//! Output formatting module

use crate::error::CliError;
use anyhow::Result;
use mteval_core::{FormatOptions, PairedResult, Score};
use serde::Serialize;
use std::io::Write;

/// Outcome of one paired significance test, labelled for display
#[derive(Debug, Clone, Serialize)]
pub struct Comparison {
    /// Metric display name
    pub metric: String,
    /// Baseline system label
    pub baseline: String,
    /// Compared system label
    pub system: String,
    /// Test result
    pub result: PairedResult,
}

/// Trait for output formatters
pub trait OutputFormatter: Send + Sync {
    /// Output the corpus scores of one system
    fn format_system(&mut self, system: &str, scores: &[Score]) -> Result<()>;

    /// Output the scores of one segment (1-based) of a system
    fn format_segment(&mut self, system: &str, segment: usize, scores: &[Score]) -> Result<()>;

    /// Output a paired significance test
    fn format_comparison(&mut self, comparison: &Comparison) -> Result<()>;

    /// Finalize output (e.g., write the JSON document)
    fn finish(&mut self) -> Result<()>;
}

/// Supported output formats
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// One score line per metric
    Text,
    /// A single JSON document with statistics and signatures
    Json,
    /// Markdown tables
    Markdown,
}

impl OutputFormat {
    /// All formats, in listing order
    pub const ALL: [OutputFormat; 3] = [Self::Text, Self::Json, Self::Markdown];

    /// Name accepted by `--format` and the `[output]` section
    pub fn name(self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Json => "json",
            Self::Markdown => "markdown",
        }
    }

    /// Short human description
    pub fn description(self) -> &'static str {
        match self {
            Self::Text => "one score line per metric (default)",
            Self::Json => "JSON document with statistics and signatures",
            Self::Markdown => "markdown tables",
        }
    }

    /// Looks a format up by name, ignoring case
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|format| format.name().eq_ignore_ascii_case(name))
    }
}

/// Resolve the format named in the `[output]` section
pub fn format_from_config(name: &str) -> Result<OutputFormat> {
    OutputFormat::from_name(name).ok_or_else(|| {
        CliError::ConfigError(format!(
            "unknown output format '{name}' (expected text, json or markdown)"
        ))
        .into()
    })
}

/// Create the formatter for `format` writing to `writer`
///
/// `label_systems` prefixes text lines with the system label, for runs over
/// several systems.
pub fn create_formatter(
    format: OutputFormat,
    options: FormatOptions,
    label_systems: bool,
    writer: Box<dyn Write + Send + Sync>,
) -> Box<dyn OutputFormatter> {
    match format {
        OutputFormat::Text => {
            Box::new(TextFormatter::new(writer, options).label_systems(label_systems))
        }
        OutputFormat::Json => Box::new(JsonFormatter::new(writer)),
        OutputFormat::Markdown => Box::new(MarkdownFormatter::new(writer, options)),
    }
}

pub mod json;
pub mod markdown;
pub mod text;

pub use json::JsonFormatter;
pub use markdown::MarkdownFormatter;
pub use text::TextFormatter;

#[cfg(test)]
pub(crate) mod fixtures {
    use mteval_core::metrics::{Bleu, Chrf, Metric};
    use mteval_core::{MetricKind, Score, Scorer, Seed};

    use super::Comparison;

    pub fn hyps() -> Vec<&'static str> {
        vec!["The dog bit the man.", "It wasn't surprising."]
    }

    pub fn refs() -> Vec<Vec<&'static str>> {
        vec![vec!["The dog bit the man.", "It was not unexpected."]]
    }

    pub fn scores() -> Vec<Score> {
        vec![
            Bleu::with_defaults().unwrap().corpus_score(&hyps(), &refs()).unwrap(),
            Chrf::with_defaults().unwrap().corpus_score(&hyps(), &refs()).unwrap(),
        ]
    }

    pub fn comparison() -> Comparison {
        let scorer = Scorer::with_defaults(MetricKind::Bleu).unwrap();
        let base = scorer
            .corpus_statistics(&["The dog.", "It was."], &refs())
            .unwrap();
        let sys = scorer.corpus_statistics(&hyps(), &refs()).unwrap();
        let result = scorer
            .paired_bootstrap(&base, &sys, 50, &mut Seed::default().rng())
            .unwrap();
        Comparison {
            metric: scorer.name(),
            baseline: "base.txt".to_string(),
            system: "sys.txt".to_string(),
            result,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_names() {
        for format in OutputFormat::ALL {
            assert_eq!(OutputFormat::from_name(format.name()), Some(format));
        }
        assert_eq!(OutputFormat::from_name("JSON"), Some(OutputFormat::Json));
        assert_eq!(OutputFormat::from_name("xml"), None);
    }

    #[test]
    fn test_format_from_config() {
        assert_eq!(format_from_config("markdown").unwrap(), OutputFormat::Markdown);
        let err = format_from_config("xml").unwrap_err();
        assert!(matches!(
            err.downcast_ref::<CliError>(),
            Some(CliError::ConfigError(_))
        ));
    }
}
