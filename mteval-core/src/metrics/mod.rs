//! Metric engines
//!
//! Each engine turns a segment into sufficient statistics (a [`Monoid`]) and
//! a statistics total into a [`Score`]. Corpus scoring, sentence scoring and
//! the significance tests are all written once, on top of that split.

pub mod bleu;
pub mod chrf;
pub mod clseval;
pub mod ter;

pub use bleu::{Bleu, BleuBuilder, BleuConfig, BleuStats, Smoothing};
pub use chrf::{Chrf, ChrfBuilder, ChrfConfig, ChrfStats};
pub use clseval::{AverageType, ClassEval, ClassEvalBuilder, ClassEvalConfig, ClassStats};
pub use ter::{Ter, TerBuilder, TerConfig, TerStats};

use crate::corpus::{Corpus, Segment};
use crate::error::Result;
use crate::monoid::{Monoid, MonoidReduce};
use crate::score::Score;
use crate::signature::Signature;
use std::fmt;

/// Per-segment statistics of a corpus, ready for summing or resampling
#[derive(Debug, Clone, PartialEq)]
pub struct SegmentStatistics<S> {
    stats: Vec<S>,
    num_refs: usize,
}

impl<S: Monoid> SegmentStatistics<S> {
    /// Wraps precomputed statistics
    pub fn new(stats: Vec<S>, num_refs: usize) -> Self {
        Self { stats, num_refs }
    }

    /// Statistics of the whole corpus
    pub fn total(&self) -> S {
        S::reduce(self.stats.iter().cloned())
    }

    /// Per-segment statistics
    pub fn as_slice(&self) -> &[S] {
        &self.stats
    }

    /// Number of reference streams the statistics were computed against
    pub fn num_refs(&self) -> usize {
        self.num_refs
    }

    /// Number of segments
    pub fn len(&self) -> usize {
        self.stats.len()
    }

    /// Whether there are no segments
    pub fn is_empty(&self) -> bool {
        self.stats.is_empty()
    }
}

/// A corpus-level metric computed from additive segment statistics
pub trait Metric {
    /// Sufficient statistics for one segment or a whole corpus
    type Stats: Monoid + fmt::Debug;

    /// Display name, e.g. `BLEU`
    fn name(&self) -> String;

    /// Signature describing the configuration for `num_refs` reference streams
    fn signature(&self, num_refs: usize) -> Signature;

    /// Extracts the statistics of one segment
    fn segment_statistics(&self, segment: &Segment<'_>) -> Result<Self::Stats>;

    /// Corpus-level value (0–100) from summed statistics
    fn score_value(&self, stats: &Self::Stats) -> f64;

    /// Corpus-level score object from summed statistics
    fn build_score(&self, stats: &Self::Stats, num_refs: usize) -> Score;

    /// Sentence-level score object; defaults to the corpus computation
    fn build_sentence_score(&self, stats: &Self::Stats, num_refs: usize) -> Score {
        self.build_score(stats, num_refs)
    }

    /// Hook run once per corpus before statistics are extracted
    fn inspect_corpus(&self, _corpus: &Corpus<'_>) {}

    /// Extracts statistics for every segment of a corpus
    fn corpus_statistics<H, R>(
        &self,
        hypotheses: &[H],
        references: &[Vec<R>],
    ) -> Result<SegmentStatistics<Self::Stats>>
    where
        H: AsRef<str>,
        R: AsRef<str>,
    {
        let corpus = Corpus::new(hypotheses, references)?;
        self.inspect_corpus(&corpus);

        let stats = corpus
            .segments()
            .iter()
            .map(|segment| self.segment_statistics(segment))
            .collect::<Result<Vec<_>>>()?;

        log::debug!("{}: extracted statistics for {} segments", self.name(), stats.len());
        Ok(SegmentStatistics::new(stats, corpus.num_refs()))
    }

    /// Scores a whole corpus
    fn corpus_score<H, R>(&self, hypotheses: &[H], references: &[Vec<R>]) -> Result<Score>
    where
        H: AsRef<str>,
        R: AsRef<str>,
    {
        let stats = self.corpus_statistics(hypotheses, references)?;
        Ok(self.build_score(&stats.total(), stats.num_refs()))
    }

    /// Scores one hypothesis against its references
    fn sentence_score<R: AsRef<str>>(&self, hypothesis: &str, references: &[R]) -> Result<Score> {
        let corpus = Corpus::single(hypothesis, references)?;
        let stats = self.segment_statistics(&corpus.segments()[0])?;
        Ok(self.build_sentence_score(&stats, corpus.num_refs()))
    }

    /// Scores every segment of a corpus individually
    fn sentence_scores<H, R>(&self, hypotheses: &[H], references: &[Vec<R>]) -> Result<Vec<Score>>
    where
        H: AsRef<str>,
        R: AsRef<str>,
    {
        let stats = self.corpus_statistics(hypotheses, references)?;
        Ok(stats
            .as_slice()
            .iter()
            .map(|s| self.build_sentence_score(s, stats.num_refs()))
            .collect())
    }
}

/// Splits a tokenized line into borrowed tokens
pub(crate) fn tokens_of(line: &str) -> Vec<&str> {
    line.split_whitespace().collect()
}
