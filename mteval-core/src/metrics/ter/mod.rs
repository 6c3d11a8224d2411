//! Translation Edit Rate
//!
//! Edits are insertions, deletions, substitutions and block shifts, counted
//! against the reference that needs the fewest of them. Text goes through
//! the tercom tokenizer first; words are then interned to integer ids so the
//! distance computations compare integers.

mod beam;
mod shift;

pub use beam::{BeamEditDistance, EditOp, BEAM_WIDTH, MAX_CACHE_SIZE};
pub use shift::{
    edit_rate, find_shifted_pairs, perform_shift, translation_edit_rate, Alignment, EditRate,
    ShiftPair, MAX_SHIFT_CANDIDATES, MAX_SHIFT_DIST, MAX_SHIFT_SIZE,
};

use super::Metric;
use crate::corpus::Segment;
use crate::error::Result;
use crate::monoid::Monoid;
use crate::score::{Score, ScoreDetails};
use crate::signature::{case_value, yes_no, Signature, TestSetInfo};
use crate::tokenizer::{TercomOptions, TercomTokenizer, Tokenize};
use std::collections::HashMap;

/// Total edits and reference length
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TerStats {
    /// Shifts plus insertions, deletions and substitutions
    pub num_edits: usize,
    /// Length of the closest references
    pub ref_length: usize,
}

impl Monoid for TerStats {
    fn identity() -> Self {
        Self::default()
    }

    fn combine(&self, other: &Self) -> Self {
        Self {
            num_edits: self.num_edits + other.num_edits,
            ref_length: self.ref_length + other.ref_length,
        }
    }
}

/// TER configuration
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TerConfig {
    /// Tercom normalization switches
    pub options: TercomOptions,
    /// Standard test set the references come from
    pub test_set: Option<TestSetInfo>,
}

impl TerConfig {
    /// Create a configuration builder
    pub fn builder() -> TerBuilder {
        TerBuilder::default()
    }
}

/// Fluent builder for [`Ter`]
#[derive(Debug, Default)]
pub struct TerBuilder {
    config: TerConfig,
}

impl TerBuilder {
    /// Apply western and general punctuation normalization
    pub fn normalized(mut self, yes: bool) -> Self {
        self.config.options.normalized = yes;
        self
    }

    /// Remove punctuation before scoring
    pub fn no_punct(mut self, yes: bool) -> Self {
        self.config.options.no_punct = yes;
        self
    }

    /// Split CJK characters
    pub fn asian_support(mut self, yes: bool) -> Self {
        self.config.options.asian_support = yes;
        self
    }

    /// Keep the original casing
    pub fn case_sensitive(mut self, yes: bool) -> Self {
        self.config.options.case_sensitive = yes;
        self
    }

    /// Record the test set identity in signatures
    pub fn test_set(mut self, info: TestSetInfo) -> Self {
        self.config.test_set = Some(info);
        self
    }

    /// Compile the tokenizer and build the engine
    pub fn build(self) -> Result<Ter> {
        Ter::new(self.config)
    }
}

/// The TER engine
#[derive(Debug, Clone)]
pub struct Ter {
    config: TerConfig,
    tokenizer: TercomTokenizer,
}

impl Ter {
    /// Creates an engine for the given configuration
    pub fn new(config: TerConfig) -> Result<Self> {
        let tokenizer = TercomTokenizer::new(config.options)?;
        Ok(Self { config, tokenizer })
    }

    /// Default engine: lowercased, no normalization
    pub fn with_defaults() -> Result<Self> {
        Self::new(TerConfig::default())
    }

    /// Active configuration
    pub fn config(&self) -> &TerConfig {
        &self.config
    }
}

/// Maps words to dense ids, shared by a hypothesis and its references
#[derive(Debug, Default)]
struct Vocabulary<'a> {
    ids: HashMap<&'a str, u32>,
}

impl<'a> Vocabulary<'a> {
    fn encode(&mut self, line: &'a str) -> Vec<u32> {
        line.split_whitespace()
            .map(|word| {
                let next = self.ids.len() as u32;
                *self.ids.entry(word).or_insert(next)
            })
            .collect()
    }
}

impl Metric for Ter {
    type Stats = TerStats;

    fn name(&self) -> String {
        "TER".to_string()
    }

    fn signature(&self, num_refs: usize) -> Signature {
        let opts = self.config.options;
        let sig = Signature::new()
            .with("asian", "a", yes_no(opts.asian_support))
            .with("case", "c", case_value(!opts.case_sensitive))
            .with("norm", "nr", yes_no(opts.normalized))
            .with("numrefs", "#", num_refs)
            .with("punct", "pn", yes_no(!opts.no_punct))
            .with("tok", "t", self.tokenizer.signature());
        match &self.config.test_set {
            Some(info) => sig.with_test_set(info),
            None => sig,
        }
    }

    fn segment_statistics(&self, segment: &Segment<'_>) -> Result<TerStats> {
        let hyp_text = self.tokenizer.tokenize(segment.hypothesis);
        let ref_texts: Vec<String> = segment
            .references
            .iter()
            .map(|r| self.tokenizer.tokenize(r))
            .collect();

        let mut vocab = Vocabulary::default();
        let hyp = vocab.encode(&hyp_text);

        let mut best: Option<TerStats> = None;
        for text in &ref_texts {
            let reference = vocab.encode(text);
            let (num_edits, ref_length) = translation_edit_rate(&hyp, &reference)?;
            if best.map_or(true, |b| num_edits < b.num_edits) {
                best = Some(TerStats {
                    num_edits,
                    ref_length,
                });
            }
        }

        Ok(best.unwrap_or(TerStats {
            num_edits: hyp.len(),
            ref_length: 0,
        }))
    }

    fn score_value(&self, stats: &TerStats) -> f64 {
        if stats.ref_length > 0 {
            100.0 * stats.num_edits as f64 / stats.ref_length as f64
        } else {
            100.0
        }
    }

    fn build_score(&self, stats: &TerStats, num_refs: usize) -> Score {
        Score::new(
            self.name(),
            self.score_value(stats),
            ScoreDetails::Ter {
                num_edits: stats.num_edits,
                ref_length: stats.ref_length,
            },
            self.signature(num_refs),
        )
    }
}
