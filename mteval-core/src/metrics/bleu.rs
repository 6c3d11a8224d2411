//! BLEU: clipped n-gram precision with a brevity penalty
//!
//! Per-order precisions are combined as a geometric mean and scaled by the
//! brevity penalty. Zero-match orders are handled by the configured
//! [`Smoothing`] method; `log(0)` is clamped instead of raising, so an
//! unsmoothed zero precision floors the score at 0. A hypothesis without a
//! single matching n-gram scores 0 whatever the smoothing.

use super::{tokens_of, Metric};
use crate::corpus::{Corpus, Segment};
use crate::error::{MetricError, Result};
use crate::monoid::Monoid;
use crate::ngram::{closest_ref_len, merge_max, word_ngrams, NgramCounts};
use crate::score::{Score, ScoreDetails};
use crate::signature::{case_value, yes_no, Signature, TestSetInfo};
use crate::tokenizer::{Tokenize, Tokenizer, TokenizerKind};
use smallvec::{smallvec, SmallVec};

/// Default n-gram order
pub const DEFAULT_MAX_NGRAM_ORDER: usize = 4;

/// Default precision numerator for `floor` smoothing
pub const DEFAULT_FLOOR_VALUE: f64 = 0.1;

/// Default pseudo-count for `add-k` smoothing
pub const DEFAULT_ADD_K_VALUE: f64 = 1.0;

/// Stand-in for `log(0)` in the geometric mean
const LOG_ZERO: f64 = -9_999_999_999.0;

fn clamped_ln(x: f64) -> f64 {
    if x == 0.0 {
        LOG_ZERO
    } else {
        x.ln()
    }
}

/// How zero-match orders are treated
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum Smoothing {
    /// No smoothing: a zero-match order zeroes the score
    None,
    /// Replace a zero count by a fixed numerator
    Floor(f64),
    /// Add `k` to matches and totals of orders above 1
    AddK(f64),
    /// NIST geometric decay: 1/2, 1/4, ... of a match per zero-match order
    #[default]
    Exp,
}

impl Smoothing {
    /// Method names accepted by [`Smoothing::from_parts`]
    pub const NAMES: [&'static str; 4] = ["none", "floor", "add-k", "exp"];

    /// Builds a smoothing method from its name and optional value
    ///
    /// `floor` and `add-k` fall back to their defaults when no value is given;
    /// the value is ignored for `none` and `exp`.
    pub fn from_parts(method: &str, value: Option<f64>) -> Result<Self> {
        let smoothing = match method {
            "none" => Self::None,
            "floor" => Self::Floor(value.unwrap_or(DEFAULT_FLOOR_VALUE)),
            "add-k" => Self::AddK(value.unwrap_or(DEFAULT_ADD_K_VALUE)),
            "exp" => Self::Exp,
            other => return Err(MetricError::UnknownSmoothing(other.to_string())),
        };
        smoothing.validate()?;
        Ok(smoothing)
    }

    /// Method name
    pub fn name(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Floor(_) => "floor",
            Self::AddK(_) => "add-k",
            Self::Exp => "exp",
        }
    }

    fn validate(&self) -> Result<()> {
        match *self {
            Self::Floor(v) | Self::AddK(v) if !(v.is_finite() && v >= 0.0) => {
                Err(MetricError::InvalidConfig(format!(
                    "{} smoothing value must be a non-negative number, got {v}",
                    self.name()
                )))
            }
            _ => Ok(()),
        }
    }

    fn signature_value(&self) -> String {
        match self {
            Self::Floor(v) | Self::AddK(v) => format!("{}[{v}]", self.name()),
            Self::None | Self::Exp => self.name().to_string(),
        }
    }
}

/// BLEU sufficient statistics
///
/// Per-order vectors are empty for the identity element; combining pads the
/// shorter side with zeros.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct BleuStats {
    /// Hypothesis length in tokens
    pub sys_len: usize,
    /// Closest reference length in tokens
    pub ref_len: usize,
    /// Clipped matches per order
    pub correct: SmallVec<[usize; 4]>,
    /// Hypothesis n-grams per order
    pub total: SmallVec<[usize; 4]>,
}

impl BleuStats {
    /// Zeroed statistics for `order` n-gram orders
    pub fn zeroed(order: usize) -> Self {
        Self {
            sys_len: 0,
            ref_len: 0,
            correct: smallvec![0; order],
            total: smallvec![0; order],
        }
    }

    /// Number of n-gram orders carried
    pub fn order(&self) -> usize {
        self.correct.len()
    }
}

fn add_padded(a: &[usize], b: &[usize]) -> SmallVec<[usize; 4]> {
    (0..a.len().max(b.len()))
        .map(|i| a.get(i).copied().unwrap_or(0) + b.get(i).copied().unwrap_or(0))
        .collect()
}

impl Monoid for BleuStats {
    fn identity() -> Self {
        Self::default()
    }

    fn combine(&self, other: &Self) -> Self {
        Self {
            sys_len: self.sys_len + other.sys_len,
            ref_len: self.ref_len + other.ref_len,
            correct: add_padded(&self.correct, &other.correct),
            total: add_padded(&self.total, &other.total),
        }
    }
}

/// BLEU configuration
#[derive(Debug, Clone, PartialEq)]
pub struct BleuConfig {
    /// Tokenizer applied to hypotheses and references
    pub tokenizer: TokenizerKind,
    /// Lowercase before tokenizing
    pub lowercase: bool,
    /// Highest n-gram order
    pub max_ngram_order: usize,
    /// Zero-match handling
    pub smoothing: Smoothing,
    /// Shrink the order to the highest one with hypothesis n-grams
    pub effective_order: bool,
    /// Suppress the tokenized-input warning
    pub force: bool,
    /// Standard test set the references come from
    pub test_set: Option<TestSetInfo>,
}

impl Default for BleuConfig {
    fn default() -> Self {
        Self {
            tokenizer: TokenizerKind::Mteval13a,
            lowercase: false,
            max_ngram_order: DEFAULT_MAX_NGRAM_ORDER,
            smoothing: Smoothing::Exp,
            effective_order: false,
            force: false,
            test_set: None,
        }
    }
}

impl BleuConfig {
    /// Create a configuration builder
    pub fn builder() -> BleuBuilder {
        BleuBuilder::default()
    }

    fn validate(&self) -> Result<()> {
        if self.max_ngram_order == 0 {
            return Err(MetricError::InvalidConfig(
                "max_ngram_order must be greater than 0".into(),
            ));
        }
        self.smoothing.validate()
    }
}

/// Fluent builder for [`Bleu`]
#[derive(Debug, Default)]
pub struct BleuBuilder {
    config: BleuConfig,
}

impl BleuBuilder {
    /// Set the tokenizer
    pub fn tokenizer(mut self, kind: TokenizerKind) -> Self {
        self.config.tokenizer = kind;
        self
    }

    /// Lowercase inputs before tokenizing
    pub fn lowercase(mut self, yes: bool) -> Self {
        self.config.lowercase = yes;
        self
    }

    /// Set the highest n-gram order
    pub fn max_ngram_order(mut self, order: usize) -> Self {
        self.config.max_ngram_order = order;
        self
    }

    /// Set the smoothing method
    pub fn smoothing(mut self, smoothing: Smoothing) -> Self {
        self.config.smoothing = smoothing;
        self
    }

    /// Use the effective order for corpus scores
    pub fn effective_order(mut self, yes: bool) -> Self {
        self.config.effective_order = yes;
        self
    }

    /// Suppress the tokenized-input warning
    pub fn force(mut self, yes: bool) -> Self {
        self.config.force = yes;
        self
    }

    /// Record the test set identity in signatures
    pub fn test_set(mut self, info: TestSetInfo) -> Self {
        self.config.test_set = Some(info);
        self
    }

    /// Validate the configuration and compile the tokenizer
    pub fn build(self) -> Result<Bleu> {
        Bleu::new(self.config)
    }
}

/// Intermediate values of a BLEU computation
#[derive(Debug, Clone, PartialEq)]
struct Computation {
    score: f64,
    precisions: Vec<f64>,
    bp: f64,
}

/// The BLEU engine
#[derive(Debug, Clone)]
pub struct Bleu {
    config: BleuConfig,
    tokenizer: Tokenizer,
}

impl Bleu {
    /// Creates an engine from a validated configuration
    pub fn new(config: BleuConfig) -> Result<Self> {
        config.validate()?;
        let tokenizer = Tokenizer::new(config.tokenizer)?;
        Ok(Self { config, tokenizer })
    }

    /// Default engine: 13a tokenization, 4-grams, exp smoothing
    pub fn with_defaults() -> Result<Self> {
        Self::new(BleuConfig::default())
    }

    /// Active configuration
    pub fn config(&self) -> &BleuConfig {
        &self.config
    }

    /// Scores statistics supplied by the caller
    ///
    /// Fails when the statistics carry a different number of orders than the
    /// engine was configured for.
    pub fn score_from_statistics(&self, stats: &BleuStats, num_refs: usize) -> Result<Score> {
        if stats.order() != self.config.max_ngram_order {
            return Err(MetricError::OrderMismatch {
                expected: self.config.max_ngram_order,
                actual: stats.order(),
            });
        }
        Ok(self.build_score(stats, num_refs))
    }

    fn preprocess(&self, line: &str) -> String {
        let line = line.trim_end();
        if self.config.lowercase {
            self.tokenizer.tokenize(&line.to_lowercase())
        } else {
            self.tokenizer.tokenize(line)
        }
    }

    fn compute(&self, stats: &BleuStats, effective_order: bool) -> Computation {
        let max_order = self.config.max_ngram_order;
        let mut precisions = vec![0.0; max_order];
        let mut smooth_mteval = 1.0;
        let mut eff_order = max_order;
        let bp = brevity_penalty(stats.sys_len, stats.ref_len);

        // Without a single match every smoothing method scores 0.
        if stats.correct.iter().all(|&c| c == 0) {
            return Computation {
                score: 0.0,
                precisions,
                bp,
            };
        }

        for n in 1..=max_order {
            let mut correct = stats.correct.get(n - 1).copied().unwrap_or(0) as f64;
            let mut total = stats.total.get(n - 1).copied().unwrap_or(0) as f64;

            if let Smoothing::AddK(k) = self.config.smoothing {
                if n > 1 {
                    correct += k;
                    total += k;
                }
            }

            if total == 0.0 {
                break;
            }

            if effective_order {
                eff_order = n;
            }

            precisions[n - 1] = if correct == 0.0 {
                match self.config.smoothing {
                    Smoothing::Exp => {
                        smooth_mteval *= 2.0;
                        100.0 / (smooth_mteval * total)
                    }
                    Smoothing::Floor(v) => 100.0 * v / total,
                    Smoothing::None | Smoothing::AddK(_) => 0.0,
                }
            } else {
                100.0 * correct / total
            };
        }

        let log_sum: f64 = precisions[..eff_order].iter().map(|&p| clamped_ln(p)).sum();
        let score = bp * (log_sum / eff_order as f64).exp();

        Computation {
            score,
            precisions,
            bp,
        }
    }

    fn make_score(&self, stats: &BleuStats, num_refs: usize, effective_order: bool) -> Score {
        let computation = self.compute(stats, effective_order);
        let order = self.config.max_ngram_order;
        let pad = |v: &[usize]| (0..order).map(|i| v.get(i).copied().unwrap_or(0)).collect();

        Score::new(
            self.name(),
            computation.score,
            ScoreDetails::Bleu {
                counts: pad(&stats.correct),
                totals: pad(&stats.total),
                precisions: computation.precisions,
                bp: computation.bp,
                sys_len: stats.sys_len,
                ref_len: stats.ref_len,
            },
            self.signature_with(num_refs, effective_order),
        )
    }

    fn signature_with(&self, num_refs: usize, effective_order: bool) -> Signature {
        let sig = Signature::new()
            .with("case", "c", case_value(self.config.lowercase))
            .with("eff", "e", yes_no(effective_order))
            .with("numrefs", "#", num_refs)
            .with("order", "n", self.config.max_ngram_order)
            .with("smooth", "s", self.config.smoothing.signature_value())
            .with("tok", "tok", self.tokenizer.signature());
        match &self.config.test_set {
            Some(info) => sig.with_test_set(info),
            None => sig,
        }
    }
}

/// Brevity penalty for a hypothesis of `sys_len` against `ref_len` tokens
pub fn brevity_penalty(sys_len: usize, ref_len: usize) -> f64 {
    if sys_len >= ref_len {
        1.0
    } else if sys_len == 0 {
        0.0
    } else {
        (1.0 - ref_len as f64 / sys_len as f64).exp()
    }
}

impl Metric for Bleu {
    type Stats = BleuStats;

    fn name(&self) -> String {
        "BLEU".to_string()
    }

    fn signature(&self, num_refs: usize) -> Signature {
        self.signature_with(num_refs, self.config.effective_order)
    }

    fn segment_statistics(&self, segment: &Segment<'_>) -> Result<BleuStats> {
        let max_order = self.config.max_ngram_order;
        let hyp = self.preprocess(segment.hypothesis);
        let refs: Vec<String> = segment.references.iter().map(|r| self.preprocess(r)).collect();

        let hyp_tokens = tokens_of(&hyp);
        let ref_tokens: Vec<Vec<&str>> = refs.iter().map(|r| tokens_of(r)).collect();

        let mut ref_ngrams = NgramCounts::new();
        for tokens in &ref_tokens {
            merge_max(&mut ref_ngrams, word_ngrams(tokens, 1, max_order));
        }
        let ref_len = closest_ref_len(hyp_tokens.len(), ref_tokens.iter().map(Vec::len));

        let hyp_ngrams = word_ngrams(&hyp_tokens, 1, max_order);
        let mut stats = BleuStats::zeroed(max_order);
        stats.sys_len = hyp_tokens.len();
        stats.ref_len = ref_len;

        for (gram, &count) in &hyp_ngrams {
            let n = gram.len();
            stats.total[n - 1] += count;
            stats.correct[n - 1] += count.min(ref_ngrams.get(gram).copied().unwrap_or(0));
        }
        Ok(stats)
    }

    fn score_value(&self, stats: &BleuStats) -> f64 {
        self.compute(stats, self.config.effective_order).score
    }

    fn build_score(&self, stats: &BleuStats, num_refs: usize) -> Score {
        self.make_score(stats, num_refs, self.config.effective_order)
    }

    fn build_sentence_score(&self, stats: &BleuStats, num_refs: usize) -> Score {
        self.make_score(stats, num_refs, true)
    }

    fn inspect_corpus(&self, corpus: &Corpus<'_>) {
        if self.config.force || self.tokenizer.kind() == TokenizerKind::None {
            return;
        }
        if corpus.looks_tokenized() {
            log::warn!(
                "{} hypothesis lines end in a tokenized period (' .'); \
                 it looks like you forgot to detokenize your test data, which may hurt your score. \
                 Use force to silence this warning.",
                corpus.tokenized_period_count()
            );
        }
    }
}
