//! chrF and chrF++: character (and word) n-gram F-score
//!
//! Statistics are (hypothesis, reference, matched) n-gram counts per order,
//! character orders first, then word orders. The default epsilon smoothing
//! lets orders without any n-grams contribute a tiny F instead of being
//! skipped; turning it off averages precision and recall over the orders
//! that do have n-grams on both sides.

use super::Metric;
use crate::corpus::Segment;
use crate::error::{MetricError, Result};
use crate::monoid::Monoid;
use crate::ngram::{
    char_ngrams, clipped_matches, split_punctuation, strip_whitespace, total_count,
    word_ngrams_of_order,
};
use crate::score::{Score, ScoreDetails};
use crate::signature::{case_value, yes_no, Signature, TestSetInfo};
use smallvec::SmallVec;
use std::borrow::Cow;

/// Default character n-gram order
pub const DEFAULT_CHAR_ORDER: usize = 6;

/// Default word n-gram order (0 = plain chrF)
pub const DEFAULT_WORD_ORDER: usize = 0;

/// Default recall weight
pub const DEFAULT_BETA: f64 = 2.0;

const EPSILON: f64 = 1e-16;

/// Counts for one n-gram order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct OrderCounts {
    /// N-grams in the hypothesis
    pub hyp: usize,
    /// N-grams in the reference
    pub reference: usize,
    /// Clipped matches
    pub matched: usize,
}

impl OrderCounts {
    fn add(self, other: Self) -> Self {
        Self {
            hyp: self.hyp + other.hyp,
            reference: self.reference + other.reference,
            matched: self.matched + other.matched,
        }
    }
}

/// chrF sufficient statistics, one entry per order
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ChrfStats {
    /// Character orders followed by word orders
    pub orders: SmallVec<[OrderCounts; 8]>,
}

impl Monoid for ChrfStats {
    fn identity() -> Self {
        Self::default()
    }

    fn combine(&self, other: &Self) -> Self {
        let len = self.orders.len().max(other.orders.len());
        let orders = (0..len)
            .map(|i| {
                let a = self.orders.get(i).copied().unwrap_or_default();
                let b = other.orders.get(i).copied().unwrap_or_default();
                a.add(b)
            })
            .collect();
        Self { orders }
    }
}

/// chrF configuration
#[derive(Debug, Clone, PartialEq)]
pub struct ChrfConfig {
    /// Character n-gram order
    pub char_order: usize,
    /// Word n-gram order; chrF++ when positive
    pub word_order: usize,
    /// Recall weight
    pub beta: f64,
    /// Keep whitespace inside character n-grams
    pub whitespace: bool,
    /// Lowercase inputs
    pub lowercase: bool,
    /// Epsilon smoothing for orders without n-grams
    pub eps_smoothing: bool,
    /// Standard test set the references come from
    pub test_set: Option<TestSetInfo>,
}

impl Default for ChrfConfig {
    fn default() -> Self {
        Self {
            char_order: DEFAULT_CHAR_ORDER,
            word_order: DEFAULT_WORD_ORDER,
            beta: DEFAULT_BETA,
            whitespace: false,
            lowercase: false,
            eps_smoothing: true,
            test_set: None,
        }
    }
}

impl ChrfConfig {
    /// Create a configuration builder
    pub fn builder() -> ChrfBuilder {
        ChrfBuilder::default()
    }

    fn validate(&self) -> Result<()> {
        if self.char_order + self.word_order == 0 {
            return Err(MetricError::InvalidConfig(
                "chrF needs at least one character or word order".into(),
            ));
        }
        if !(self.beta.is_finite() && self.beta > 0.0) {
            return Err(MetricError::InvalidConfig(format!(
                "beta must be a positive number, got {}",
                self.beta
            )));
        }
        Ok(())
    }

    fn num_orders(&self) -> usize {
        self.char_order + self.word_order
    }
}

/// Fluent builder for [`Chrf`]
#[derive(Debug, Default)]
pub struct ChrfBuilder {
    config: ChrfConfig,
}

impl ChrfBuilder {
    /// Set the character n-gram order
    pub fn char_order(mut self, order: usize) -> Self {
        self.config.char_order = order;
        self
    }

    /// Set the word n-gram order (2 gives chrF++)
    pub fn word_order(mut self, order: usize) -> Self {
        self.config.word_order = order;
        self
    }

    /// Set the recall weight
    pub fn beta(mut self, beta: f64) -> Self {
        self.config.beta = beta;
        self
    }

    /// Keep whitespace in character n-grams
    pub fn whitespace(mut self, yes: bool) -> Self {
        self.config.whitespace = yes;
        self
    }

    /// Lowercase inputs
    pub fn lowercase(mut self, yes: bool) -> Self {
        self.config.lowercase = yes;
        self
    }

    /// Toggle epsilon smoothing
    pub fn eps_smoothing(mut self, yes: bool) -> Self {
        self.config.eps_smoothing = yes;
        self
    }

    /// Record the test set identity in signatures
    pub fn test_set(mut self, info: TestSetInfo) -> Self {
        self.config.test_set = Some(info);
        self
    }

    /// Validate the configuration
    pub fn build(self) -> Result<Chrf> {
        Chrf::new(self.config)
    }
}

/// The chrF engine
#[derive(Debug, Clone)]
pub struct Chrf {
    config: ChrfConfig,
}

impl Chrf {
    /// Creates an engine from a validated configuration
    pub fn new(config: ChrfConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    /// Default engine: chrF2, character 6-grams
    pub fn with_defaults() -> Result<Self> {
        Self::new(ChrfConfig::default())
    }

    /// Active configuration
    pub fn config(&self) -> &ChrfConfig {
        &self.config
    }

    fn preprocess<'s>(&self, line: &'s str) -> Cow<'s, str> {
        if self.config.lowercase {
            Cow::Owned(line.to_lowercase())
        } else {
            Cow::Borrowed(line)
        }
    }

    fn pair_statistics(&self, hyp: &str, reference: &str) -> ChrfStats {
        let mut orders = SmallVec::with_capacity(self.config.num_orders());

        let (hyp_chars, ref_chars) = if self.config.whitespace {
            (Cow::Borrowed(hyp), Cow::Borrowed(reference))
        } else {
            (
                Cow::Owned(strip_whitespace(hyp)),
                Cow::Owned(strip_whitespace(reference)),
            )
        };

        for n in 1..=self.config.char_order {
            let h = char_ngrams(&hyp_chars, n);
            let r = char_ngrams(&ref_chars, n);
            orders.push(OrderCounts {
                hyp: total_count(&h),
                reference: total_count(&r),
                matched: clipped_matches(&h, &r),
            });
        }

        if self.config.word_order > 0 {
            let hyp_words = split_punctuation(hyp);
            let ref_words = split_punctuation(reference);
            for n in 1..=self.config.word_order {
                let h = word_ngrams_of_order(&hyp_words, n);
                let r = word_ngrams_of_order(&ref_words, n);
                orders.push(OrderCounts {
                    hyp: total_count(&h),
                    reference: total_count(&r),
                    matched: clipped_matches(&h, &r),
                });
            }
        }

        ChrfStats { orders }
    }

    /// F-score on the 0–100 scale
    fn f_score(&self, stats: &ChrfStats) -> f64 {
        let factor = self.config.beta * self.config.beta;
        let num_orders = self.config.num_orders();

        let mut eps_sum = 0.0;
        let mut avg_prec = 0.0;
        let mut avg_rec = 0.0;
        let mut effective_order = 0usize;

        for i in 0..num_orders {
            let counts = stats.orders.get(i).copied().unwrap_or_default();
            let prec = if counts.hyp > 0 {
                counts.matched as f64 / counts.hyp as f64
            } else {
                EPSILON
            };
            let rec = if counts.reference > 0 {
                counts.matched as f64 / counts.reference as f64
            } else {
                EPSILON
            };

            let denom = factor * prec + rec;
            eps_sum += if denom > 0.0 {
                (1.0 + factor) * prec * rec / denom
            } else {
                EPSILON
            };

            if counts.hyp > 0 && counts.reference > 0 {
                avg_prec += prec;
                avg_rec += rec;
                effective_order += 1;
            }
        }

        if self.config.eps_smoothing {
            return 100.0 * eps_sum / num_orders as f64;
        }

        if effective_order == 0 {
            return 0.0;
        }
        avg_prec /= effective_order as f64;
        avg_rec /= effective_order as f64;

        if avg_prec + avg_rec == 0.0 {
            0.0
        } else {
            100.0 * (1.0 + factor) * avg_prec * avg_rec / (factor * avg_prec + avg_rec)
        }
    }
}

impl Metric for Chrf {
    type Stats = ChrfStats;

    fn name(&self) -> String {
        format!("chrF{}{}", self.config.beta, "+".repeat(self.config.word_order))
    }

    fn signature(&self, num_refs: usize) -> Signature {
        let sig = Signature::new()
            .with("beta", "b", self.config.beta)
            .with("case", "c", case_value(self.config.lowercase))
            .with("eff", "e", yes_no(!self.config.eps_smoothing))
            .with("numchars", "n", self.config.char_order)
            .with("numwords", "w", self.config.word_order)
            .with("numrefs", "#", num_refs)
            .with("space", "s", yes_no(self.config.whitespace));
        match &self.config.test_set {
            Some(info) => sig.with_test_set(info),
            None => sig,
        }
    }

    /// Keeps the statistics of the reference with the best sentence-level F
    fn segment_statistics(&self, segment: &Segment<'_>) -> Result<ChrfStats> {
        let hyp = self.preprocess(segment.hypothesis);

        let mut best: Option<(f64, ChrfStats)> = None;
        for reference in &segment.references {
            let reference = self.preprocess(reference);
            let stats = self.pair_statistics(&hyp, &reference);
            let f = self.f_score(&stats);
            if best.as_ref().map_or(true, |(best_f, _)| f > *best_f) {
                best = Some((f, stats));
            }
        }

        Ok(best.map(|(_, stats)| stats).unwrap_or_else(|| ChrfStats {
            orders: SmallVec::from_elem(OrderCounts::default(), self.config.num_orders()),
        }))
    }

    fn score_value(&self, stats: &ChrfStats) -> f64 {
        self.f_score(stats)
    }

    fn build_score(&self, stats: &ChrfStats, num_refs: usize) -> Score {
        let num_orders = self.config.num_orders();
        let counts = (0..num_orders)
            .map(|i| {
                let c = stats.orders.get(i).copied().unwrap_or_default();
                [c.hyp, c.reference, c.matched]
            })
            .collect();

        Score::new(
            self.name(),
            self.f_score(stats),
            ScoreDetails::Chrf {
                stats: counts,
                char_order: self.config.char_order,
                word_order: self.config.word_order,
                beta: self.config.beta,
            },
            self.signature(num_refs),
        )
    }
}
