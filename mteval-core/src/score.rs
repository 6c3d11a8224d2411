//! Immutable score objects and their text projection

use crate::signature::Signature;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Bootstrap estimate attached to a score: mean ± 95% confidence half-width
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Estimate {
    /// Mean over resampled scores
    pub mean: f64,
    /// 1.96 × standard deviation / √N
    pub ci: f64,
    /// Number of resamples
    pub n_samples: usize,
}

/// Per-class measures reported by the class-based F metrics
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClassReport {
    /// The unigram class
    pub class: String,
    /// Hypothesis occurrences
    pub preds: usize,
    /// Clipped reference occurrences
    pub refs: usize,
    /// Matched occurrences
    pub correct: usize,
    /// Class precision (0–1)
    pub precision: f64,
    /// Class recall (0–1)
    pub recall: f64,
    /// Class F-score (0–1)
    pub f_score: f64,
}

/// Sufficient statistics and derived quantities, per metric
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ScoreDetails {
    /// BLEU statistics
    Bleu {
        /// Clipped matches per order
        counts: Vec<usize>,
        /// Hypothesis n-grams per order
        totals: Vec<usize>,
        /// Smoothed precisions per order, in percent
        precisions: Vec<f64>,
        /// Brevity penalty
        bp: f64,
        /// Hypothesis length in tokens
        sys_len: usize,
        /// Effective reference length in tokens
        ref_len: usize,
    },
    /// chrF statistics
    Chrf {
        /// (hyp, ref, matched) n-gram counts per order
        stats: Vec<[usize; 3]>,
        /// Character n-gram order
        char_order: usize,
        /// Word n-gram order
        word_order: usize,
        /// Recall weight
        beta: f64,
    },
    /// TER statistics
    Ter {
        /// Shifts plus edit operations
        num_edits: usize,
        /// Length of the chosen references
        ref_length: usize,
    },
    /// Class-based F statistics
    ClassEval {
        /// Averaged precision in percent
        precision: f64,
        /// Averaged recall in percent
        recall: f64,
        /// Hypothesis length in tokens
        sys_len: usize,
        /// Effective reference length in tokens
        ref_len: usize,
        /// Per-class measures, sorted by class
        classes: Vec<ClassReport>,
    },
}

/// How much of the signature to print next to a score
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SignatureMode {
    /// Metric name only
    #[default]
    Hidden,
    /// Full key names
    Full,
    /// Abbreviated key names
    Short,
}

/// Presentation options for [`Score::format`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FormatOptions {
    /// Decimal places of the main value
    pub width: usize,
    /// Print only the number
    pub score_only: bool,
    /// Signature rendering
    pub signature: SignatureMode,
}

impl Default for FormatOptions {
    fn default() -> Self {
        Self {
            width: 2,
            score_only: false,
            signature: SignatureMode::Hidden,
        }
    }
}

/// A computed metric value; built once from statistics and never mutated
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Score {
    name: String,
    value: f64,
    details: ScoreDetails,
    signature: Signature,
    #[serde(skip_serializing_if = "Option::is_none")]
    estimate: Option<Estimate>,
}

impl Score {
    /// Creates a score
    pub fn new(name: impl Into<String>, value: f64, details: ScoreDetails, signature: Signature) -> Self {
        Self {
            name: name.into(),
            value,
            details,
            signature,
            estimate: None,
        }
    }

    /// Returns the same score carrying a bootstrap estimate
    pub fn with_estimate(self, estimate: Estimate) -> Self {
        Self {
            estimate: Some(estimate),
            ..self
        }
    }

    /// Metric name, e.g. `BLEU` or `chrF2++`
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Score on the 0–100 scale
    pub fn value(&self) -> f64 {
        self.value
    }

    /// Score on the 0–1 scale (TER's edit rate)
    pub fn fraction(&self) -> f64 {
        self.value / 100.0
    }

    /// Raw statistics behind the value
    pub fn details(&self) -> &ScoreDetails {
        &self.details
    }

    /// Reproducibility signature
    pub fn signature(&self) -> &Signature {
        &self.signature
    }

    /// Bootstrap estimate, if one was computed
    pub fn estimate(&self) -> Option<&Estimate> {
        self.estimate.as_ref()
    }

    /// Renders the score as a single line of text
    pub fn format(&self, opts: FormatOptions) -> String {
        let w = opts.width;
        if opts.score_only {
            return format!("{:.w$}", self.value);
        }

        let prefix = match opts.signature {
            SignatureMode::Hidden => self.name.clone(),
            SignatureMode::Full => format!("{}+{}", self.name, self.signature.format(false)),
            SignatureMode::Short => format!("{}+{}", self.name, self.signature.format(true)),
        };

        let mut line = format!("{prefix} = {:.w$}", self.value);

        if let Some(est) = &self.estimate {
            line.push_str(&format!(" (μ = {:.w$} ± {:.w$})", est.mean, est.ci));
        }

        match &self.details {
            ScoreDetails::Bleu {
                precisions,
                bp,
                sys_len,
                ref_len,
                ..
            } => {
                let precs = precisions
                    .iter()
                    .map(|p| format!("{p:.1}"))
                    .collect::<Vec<_>>()
                    .join("/");
                let ratio = if *ref_len > 0 {
                    *sys_len as f64 / *ref_len as f64
                } else {
                    0.0
                };
                line.push_str(&format!(
                    " {precs} (BP = {bp:.3} ratio = {ratio:.3} hyp_len = {sys_len} ref_len = {ref_len})"
                ));
            }
            ScoreDetails::ClassEval {
                precision, recall, ..
            } => {
                line.push_str(&format!(" (P = {precision:.1} R = {recall:.1})"));
            }
            ScoreDetails::Chrf { .. } | ScoreDetails::Ter { .. } => {}
        }

        line
    }
}

impl fmt::Display for Score {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.format(FormatOptions::default()))
    }
}
