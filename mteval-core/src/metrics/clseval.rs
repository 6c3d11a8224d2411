//! Class-based F-measures over unigram types (MacroF, MicroF)
//!
//! Every word type seen in a hypothesis or its references is treated as a
//! class in a multi-class classification problem. Macro averaging gives each
//! class the same weight, so rare types matter as much as frequent ones;
//! micro averaging weights classes by their (smoothed) reference frequency.

use super::{tokens_of, Metric};
use crate::corpus::{Corpus, Segment};
use crate::error::{MetricError, Result};
use crate::monoid::Monoid;
use crate::ngram::{closest_ref_len, merge_max};
use crate::score::{ClassReport, Score, ScoreDetails};
use crate::signature::{case_value, Signature, TestSetInfo};
use crate::tokenizer::{Tokenize, Tokenizer, TokenizerKind};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::str::FromStr;

/// Default F-measure β
pub const DEFAULT_F_BETA: f64 = 1.0;

/// Default smoothing added to reference counts for micro weights
pub const DEFAULT_SMOOTH_VALUE: f64 = 1.0;

/// How per-class F-scores are averaged
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AverageType {
    /// Every class weighs 1
    #[default]
    Macro,
    /// Classes weigh their reference count plus the smoothing value
    Micro,
}

impl AverageType {
    /// All averaging types
    pub const ALL: [AverageType; 2] = [AverageType::Macro, AverageType::Micro];

    /// Lowercase name used in configuration files
    pub fn name(&self) -> &'static str {
        match self {
            Self::Macro => "macro",
            Self::Micro => "micro",
        }
    }

    fn title(&self) -> &'static str {
        match self {
            Self::Macro => "Macro",
            Self::Micro => "Micro",
        }
    }
}

impl fmt::Display for AverageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for AverageType {
    type Err = MetricError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "macro" => Ok(Self::Macro),
            "micro" => Ok(Self::Micro),
            _ => Err(MetricError::UnknownAverage(s.to_string())),
        }
    }
}

/// Counts of one class
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ClassCounts {
    /// Occurrences in the hypothesis
    pub preds: usize,
    /// Occurrences in the max-merged references
    pub refs: usize,
    /// Matched occurrences
    pub correct: usize,
}

impl ClassCounts {
    /// Precision, 1 when nothing was predicted
    pub fn precision(&self) -> f64 {
        if self.preds > 0 {
            self.correct as f64 / self.preds as f64
        } else {
            1.0
        }
    }

    /// Recall, 1 when nothing was expected
    pub fn recall(&self) -> f64 {
        if self.refs > 0 {
            self.correct as f64 / self.refs as f64
        } else {
            1.0
        }
    }

    /// F-measure weighting recall `beta` times as much as precision
    pub fn f_measure(&self, beta: f64) -> f64 {
        let factor = beta * beta;
        let (p, r) = (self.precision(), self.recall());
        let denom = factor * p + r;
        if denom == 0.0 {
            0.0
        } else {
            (1.0 + factor) * p * r / denom
        }
    }
}

/// Per-class statistics plus lengths
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ClassStats {
    /// Hypothesis length in tokens
    pub sys_len: usize,
    /// Closest reference length in tokens
    pub ref_len: usize,
    /// Counts keyed by word type
    pub classes: BTreeMap<String, ClassCounts>,
}

impl Monoid for ClassStats {
    fn identity() -> Self {
        Self::default()
    }

    fn combine(&self, other: &Self) -> Self {
        let mut out = self.clone();
        out.combine_assign(other);
        out
    }

    fn combine_assign(&mut self, other: &Self) {
        self.sys_len += other.sys_len;
        self.ref_len += other.ref_len;
        for (class, counts) in &other.classes {
            match self.classes.get_mut(class) {
                Some(entry) => {
                    entry.preds += counts.preds;
                    entry.refs += counts.refs;
                    entry.correct += counts.correct;
                }
                None => {
                    self.classes.insert(class.clone(), *counts);
                }
            }
        }
    }
}

/// ClassEval configuration
#[derive(Debug, Clone, PartialEq)]
pub struct ClassEvalConfig {
    /// Averaging type
    pub average: AverageType,
    /// F-measure β
    pub beta: f64,
    /// Added to reference counts for micro weights
    pub smooth_value: f64,
    /// Tokenizer applied to hypotheses and references
    pub tokenizer: TokenizerKind,
    /// Lowercase before tokenizing
    pub lowercase: bool,
    /// Suppress the tokenized-input warning
    pub force: bool,
    /// Standard test set the references come from
    pub test_set: Option<TestSetInfo>,
}

impl Default for ClassEvalConfig {
    fn default() -> Self {
        Self {
            average: AverageType::Macro,
            beta: DEFAULT_F_BETA,
            smooth_value: DEFAULT_SMOOTH_VALUE,
            tokenizer: TokenizerKind::Mteval13a,
            lowercase: false,
            force: false,
            test_set: None,
        }
    }
}

impl ClassEvalConfig {
    /// Create a configuration builder
    pub fn builder() -> ClassEvalBuilder {
        ClassEvalBuilder::default()
    }

    fn validate(&self) -> Result<()> {
        if !(self.beta.is_finite() && self.beta > 0.0) {
            return Err(MetricError::InvalidConfig(format!(
                "beta must be a positive number, got {}",
                self.beta
            )));
        }
        if !(self.smooth_value.is_finite() && self.smooth_value >= 0.0) {
            return Err(MetricError::InvalidConfig(format!(
                "smooth_value must be a non-negative number, got {}",
                self.smooth_value
            )));
        }
        Ok(())
    }
}

/// Fluent builder for [`ClassEval`]
#[derive(Debug, Default)]
pub struct ClassEvalBuilder {
    config: ClassEvalConfig,
}

impl ClassEvalBuilder {
    /// Set the averaging type
    pub fn average(mut self, average: AverageType) -> Self {
        self.config.average = average;
        self
    }

    /// Set the F-measure β
    pub fn beta(mut self, beta: f64) -> Self {
        self.config.beta = beta;
        self
    }

    /// Set the micro-average smoothing value
    pub fn smooth_value(mut self, value: f64) -> Self {
        self.config.smooth_value = value;
        self
    }

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
    pub fn build(self) -> Result<ClassEval> {
        ClassEval::new(self.config)
    }
}

/// Weighted averages over classes, on the 0–1 scale
#[derive(Debug, Clone, Copy, PartialEq)]
struct Averages {
    f_score: f64,
    precision: f64,
    recall: f64,
}

/// The MacroF / MicroF engine
#[derive(Debug, Clone)]
pub struct ClassEval {
    config: ClassEvalConfig,
    tokenizer: Tokenizer,
}

impl ClassEval {
    /// Creates an engine from a validated configuration
    pub fn new(config: ClassEvalConfig) -> Result<Self> {
        config.validate()?;
        let tokenizer = Tokenizer::new(config.tokenizer)?;
        Ok(Self { config, tokenizer })
    }

    /// Default engine for the given averaging type
    pub fn with_average(average: AverageType) -> Result<Self> {
        Self::new(ClassEvalConfig {
            average,
            ..Default::default()
        })
    }

    /// Active configuration
    pub fn config(&self) -> &ClassEvalConfig {
        &self.config
    }

    fn preprocess(&self, line: &str) -> String {
        let line = line.trim_end();
        if self.config.lowercase {
            self.tokenizer.tokenize(&line.to_lowercase())
        } else {
            self.tokenizer.tokenize(line)
        }
    }

    fn weight(&self, counts: &ClassCounts) -> f64 {
        match self.config.average {
            AverageType::Macro => 1.0,
            AverageType::Micro => counts.refs as f64 + self.config.smooth_value,
        }
    }

    fn averages(&self, stats: &ClassStats) -> Averages {
        let mut norm = 0.0;
        let mut f_score = 0.0;
        let mut precision = 0.0;
        let mut recall = 0.0;

        for counts in stats.classes.values() {
            let w = self.weight(counts);
            norm += w;
            f_score += w * counts.f_measure(self.config.beta);
            precision += w * counts.precision();
            recall += w * counts.recall();
        }

        if norm == 0.0 {
            return Averages {
                f_score: 0.0,
                precision: 0.0,
                recall: 0.0,
            };
        }
        Averages {
            f_score: f_score / norm,
            precision: precision / norm,
            recall: recall / norm,
        }
    }
}

fn unigram_counts<'a>(tokens: &[&'a str]) -> HashMap<&'a str, usize> {
    let mut counts = HashMap::new();
    for &token in tokens {
        *counts.entry(token).or_insert(0) += 1;
    }
    counts
}

impl Metric for ClassEval {
    type Stats = ClassStats;

    fn name(&self) -> String {
        format!("{}F{}", self.config.average.title(), self.config.beta)
    }

    fn signature(&self, num_refs: usize) -> Signature {
        let mut sig = Signature::new()
            .with("case", "c", case_value(self.config.lowercase))
            .with("numrefs", "#", num_refs)
            .with("tok", "tok", self.tokenizer.signature());
        if self.config.average == AverageType::Micro {
            sig = sig.with("smooth", "s", self.config.smooth_value);
        }
        match &self.config.test_set {
            Some(info) => sig.with_test_set(info),
            None => sig,
        }
    }

    fn segment_statistics(&self, segment: &Segment<'_>) -> Result<ClassStats> {
        let hyp = self.preprocess(segment.hypothesis);
        let refs: Vec<String> = segment.references.iter().map(|r| self.preprocess(r)).collect();

        let hyp_tokens = tokens_of(&hyp);
        let ref_tokens: Vec<Vec<&str>> = refs.iter().map(|r| tokens_of(r)).collect();

        let mut ref_counts = HashMap::new();
        for tokens in &ref_tokens {
            merge_max(&mut ref_counts, unigram_counts(tokens));
        }
        let hyp_counts = unigram_counts(&hyp_tokens);

        let mut classes = BTreeMap::new();
        for (&word, &preds) in &hyp_counts {
            let refs = ref_counts.get(word).copied().unwrap_or(0);
            classes.insert(
                word.to_string(),
                ClassCounts {
                    preds,
                    refs,
                    correct: preds.min(refs),
                },
            );
        }
        for (&word, &refs) in &ref_counts {
            if !hyp_counts.contains_key(word) {
                classes.insert(
                    word.to_string(),
                    ClassCounts {
                        preds: 0,
                        refs,
                        correct: 0,
                    },
                );
            }
        }

        Ok(ClassStats {
            sys_len: hyp_tokens.len(),
            ref_len: closest_ref_len(hyp_tokens.len(), ref_tokens.iter().map(Vec::len)),
            classes,
        })
    }

    fn score_value(&self, stats: &ClassStats) -> f64 {
        100.0 * self.averages(stats).f_score
    }

    fn build_score(&self, stats: &ClassStats, num_refs: usize) -> Score {
        let averages = self.averages(stats);
        let classes = stats
            .classes
            .iter()
            .map(|(class, counts)| ClassReport {
                class: class.clone(),
                preds: counts.preds,
                refs: counts.refs,
                correct: counts.correct,
                precision: counts.precision(),
                recall: counts.recall(),
                f_score: counts.f_measure(self.config.beta),
            })
            .collect();

        Score::new(
            self.name(),
            100.0 * averages.f_score,
            ScoreDetails::ClassEval {
                precision: 100.0 * averages.precision,
                recall: 100.0 * averages.recall,
                sys_len: stats.sys_len,
                ref_len: stats.ref_len,
                classes,
            },
            self.signature(num_refs),
        )
    }

    fn inspect_corpus(&self, corpus: &Corpus<'_>) {
        if self.config.force || self.tokenizer.kind() == TokenizerKind::None {
            return;
        }
        if corpus.looks_tokenized() {
            log::warn!(
                "{} hypothesis lines end in a tokenized period (' .'); \
                 detokenize your test data or use force to silence this warning",
                corpus.tokenized_period_count()
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::monoid::MonoidReduce;

    const EPSILON: f64 = 1e-9;

    fn refs() -> Vec<&'static str> {
        vec![
            "the cat sat on the mat",
            "ಬಾ ಬಾ ಗಿಣಿಯೇ ಬಣ್ಣದ ಗಿಣಿಯೇ ಹಣ್ಣನು ಕೊಡುವೆನು ಬಾ ಬಾ",
        ]
    }

    fn hyps() -> Vec<&'static str> {
        vec!["cat sat on mat it", "the ಗಿಣಿಯೇ ಬಣ್ಣದ ಹಣ್ಣನು ಕೊಡುವೆನು ಬಾ"]
    }

    /// (refs, f1) of the eleven classes of `hyps()` against `refs()`
    fn expected_classes() -> Vec<(f64, f64)> {
        vec![
            (2.0, 0.0),
            (1.0, 1.0),
            (1.0, 1.0),
            (1.0, 1.0),
            (1.0, 1.0),
            (0.0, 0.0),
            (4.0, 2.0 * 0.25 / 1.25),
            (2.0, 2.0 * 0.5 / 1.5),
            (1.0, 1.0),
            (1.0, 1.0),
            (1.0, 1.0),
        ]
    }

    fn macro_expected() -> f64 {
        let classes = expected_classes();
        100.0 * classes.iter().map(|(_, f)| f).sum::<f64>() / classes.len() as f64
    }

    fn micro_expected(smooth: f64) -> f64 {
        let classes = expected_classes();
        let norm: f64 = classes.iter().map(|(r, _)| r + smooth).sum();
        100.0 * classes.iter().map(|(r, f)| (r + smooth) * f).sum::<f64>() / norm
    }

    #[test]
    fn test_identical_is_perfect() {
        for average in AverageType::ALL {
            let metric = ClassEval::with_average(average).unwrap();
            let score = metric.corpus_score(&refs(), &[refs()]).unwrap();
            assert!((score.value() - 100.0).abs() < EPSILON);
        }
    }

    #[test]
    fn test_macro_f() {
        let metric = ClassEval::with_average(AverageType::Macro).unwrap();
        let score = metric.corpus_score(&hyps(), &[refs()]).unwrap();
        assert!((score.value() - macro_expected()).abs() < EPSILON);
        assert_eq!(score.name(), "MacroF1");
    }

    #[test]
    fn test_micro_f() {
        let metric = ClassEval::with_average(AverageType::Micro).unwrap();
        let score = metric.corpus_score(&hyps(), &[refs()]).unwrap();
        assert!((score.value() - micro_expected(1.0)).abs() < EPSILON);
        assert!((micro_expected(1.0) - macro_expected()).abs() > 1000.0 * EPSILON);
        assert_eq!(score.name(), "MicroF1");
    }

    #[test]
    fn test_large_smoothing_approaches_macro() {
        let metric = ClassEvalConfig::builder()
            .average(AverageType::Micro)
            .smooth_value(1e12)
            .build()
            .unwrap();
        let score = metric.corpus_score(&hyps(), &[refs()]).unwrap();
        assert!((score.value() - macro_expected()).abs() < EPSILON);
    }

    #[test]
    fn test_class_report() {
        let metric = ClassEval::with_average(AverageType::Macro).unwrap();
        let score = metric.corpus_score(&hyps(), &[refs()]).unwrap();
        let ScoreDetails::ClassEval { classes, .. } = score.details() else {
            panic!("unexpected details");
        };
        assert_eq!(classes.len(), 11);

        let the = classes.iter().find(|c| c.class == "the").unwrap();
        assert_eq!((the.refs, the.preds, the.correct), (2, 1, 0));

        let it = classes.iter().find(|c| c.class == "it").unwrap();
        assert_eq!(it.recall, 1.0);
        assert_eq!(it.precision, 0.0);
        assert_eq!(it.f_score, 0.0);

        let mut sorted: Vec<_> = classes.iter().map(|c| c.class.clone()).collect();
        sorted.sort();
        assert_eq!(sorted, classes.iter().map(|c| c.class.clone()).collect::<Vec<_>>());
    }

    #[test]
    fn test_in_place_sum_matches_combine() {
        let metric = ClassEval::with_average(AverageType::Macro).unwrap();
        let stats = metric.corpus_statistics(&hyps(), &[refs()]).unwrap();
        let segments = stats.as_slice();

        let mut acc = segments[0].clone();
        acc.combine_assign(&segments[1]);
        assert_eq!(acc, segments[0].combine(&segments[1]));
        assert_eq!(acc, stats.total());

        let resample = ClassStats::sum_indexed(segments, &[0, 1, 0]);
        let expected = segments[0].combine(&segments[1]).combine(&segments[0]);
        assert_eq!(resample, expected);
        assert_eq!(resample.classes["cat"].preds, 2);
        assert_eq!(resample.sys_len, 2 * segments[0].sys_len + segments[1].sys_len);
    }

    #[test]
    fn test_empty_corpus_scores_zero() {
        let metric = ClassEval::with_average(AverageType::Macro).unwrap();
        assert_eq!(metric.score_value(&ClassStats::default()), 0.0);
    }

    #[test]
    fn test_average_parsing() {
        assert_eq!("macro".parse::<AverageType>().unwrap(), AverageType::Macro);
        assert_eq!("MICRO".parse::<AverageType>().unwrap(), AverageType::Micro);
        assert!(matches!(
            "weighted".parse::<AverageType>(),
            Err(MetricError::UnknownAverage(_))
        ));
    }

    #[test]
    fn test_invalid_beta() {
        assert!(ClassEvalConfig::builder().beta(0.0).build().is_err());
        assert!(ClassEvalConfig::builder().smooth_value(-1.0).build().is_err());
    }

    #[test]
    fn test_micro_signature_records_smoothing() {
        let micro = ClassEval::with_average(AverageType::Micro).unwrap();
        let makro = ClassEval::with_average(AverageType::Macro).unwrap();
        assert_eq!(micro.signature(1).get("smooth"), Some("1"));
        assert_eq!(makro.signature(1).get("smooth"), None);
    }
}
