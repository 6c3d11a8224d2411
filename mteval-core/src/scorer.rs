//! Closed dispatch over the metric engines
//!
//! [`Scorer`] is what front ends hold: one value per requested metric,
//! scoring corpora and running significance tests without knowing which
//! engine sits behind it. Statistics extracted through a scorer are tagged
//! with the engine they came from, so paired tests can reuse them across
//! systems.

use crate::error::{MetricError, Result};
use crate::metrics::{
    AverageType, Bleu, BleuStats, Chrf, ChrfStats, ClassEval, ClassStats, Metric, SegmentStatistics, Ter,
    TerStats,
};
use crate::score::Score;
use crate::significance::{self, PairedResult};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Metrics selectable by name
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MetricKind {
    /// BLEU
    Bleu,
    /// chrF / chrF++
    Chrf,
    /// Translation Edit Rate
    Ter,
    /// Macro-averaged unigram F
    MacroF,
    /// Micro-averaged unigram F
    MicroF,
}

impl MetricKind {
    /// All metrics, in listing order
    pub const ALL: [MetricKind; 5] = [
        Self::Bleu,
        Self::Chrf,
        Self::Ter,
        Self::MacroF,
        Self::MicroF,
    ];

    /// Lowercase name
    pub fn name(self) -> &'static str {
        match self {
            Self::Bleu => "bleu",
            Self::Chrf => "chrf",
            Self::Ter => "ter",
            Self::MacroF => "macrof",
            Self::MicroF => "microf",
        }
    }

    /// Short human description
    pub fn description(self) -> &'static str {
        match self {
            Self::Bleu => "clipped n-gram precision with brevity penalty",
            Self::Chrf => "character n-gram F-score (chrF++ with word n-grams)",
            Self::Ter => "edit rate with block shifts (lower is better)",
            Self::MacroF => "macro-averaged F over unigram types",
            Self::MicroF => "micro-averaged F over unigram types",
        }
    }

    /// Whether a higher score means a better translation
    pub fn higher_is_better(self) -> bool {
        !matches!(self, Self::Ter)
    }
}

impl fmt::Display for MetricKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for MetricKind {
    type Err = MetricError;

    fn from_str(s: &str) -> Result<Self> {
        let lower = s.to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|kind| kind.name() == lower)
            .ok_or_else(|| MetricError::InvalidConfig(format!("unknown metric '{s}'")))
    }
}

/// Per-segment statistics tagged with the engine that produced them
#[derive(Debug, Clone, PartialEq)]
pub enum CorpusStatistics {
    /// BLEU statistics
    Bleu(SegmentStatistics<BleuStats>),
    /// chrF statistics
    Chrf(SegmentStatistics<ChrfStats>),
    /// TER statistics
    Ter(SegmentStatistics<TerStats>),
    /// MacroF / MicroF statistics
    ClassEval(SegmentStatistics<ClassStats>),
}

impl CorpusStatistics {
    /// Number of segments
    pub fn len(&self) -> usize {
        match self {
            Self::Bleu(s) => s.len(),
            Self::Chrf(s) => s.len(),
            Self::Ter(s) => s.len(),
            Self::ClassEval(s) => s.len(),
        }
    }

    /// Whether there are no segments
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A configured metric engine
#[derive(Debug, Clone)]
pub enum Scorer {
    /// BLEU
    Bleu(Bleu),
    /// chrF / chrF++
    Chrf(Chrf),
    /// TER
    Ter(Ter),
    /// MacroF / MicroF
    ClassEval(ClassEval),
}

macro_rules! dispatch {
    ($scorer:expr, $engine:ident => $body:expr) => {
        match $scorer {
            Scorer::Bleu($engine) => $body,
            Scorer::Chrf($engine) => $body,
            Scorer::Ter($engine) => $body,
            Scorer::ClassEval($engine) => $body,
        }
    };
}

fn wrong_statistics(scorer: &Scorer) -> MetricError {
    MetricError::InvalidConfig(format!(
        "statistics were not computed by {}",
        scorer.name()
    ))
}

impl Scorer {
    /// Engine with default settings for `kind`
    pub fn with_defaults(kind: MetricKind) -> Result<Self> {
        Ok(match kind {
            MetricKind::Bleu => Self::Bleu(Bleu::with_defaults()?),
            MetricKind::Chrf => Self::Chrf(Chrf::with_defaults()?),
            MetricKind::Ter => Self::Ter(Ter::with_defaults()?),
            MetricKind::MacroF => Self::ClassEval(ClassEval::with_average(AverageType::Macro)?),
            MetricKind::MicroF => Self::ClassEval(ClassEval::with_average(AverageType::Micro)?),
        })
    }

    /// Which metric this is
    pub fn kind(&self) -> MetricKind {
        match self {
            Self::Bleu(_) => MetricKind::Bleu,
            Self::Chrf(_) => MetricKind::Chrf,
            Self::Ter(_) => MetricKind::Ter,
            Self::ClassEval(m) => match m.config().average {
                AverageType::Macro => MetricKind::MacroF,
                AverageType::Micro => MetricKind::MicroF,
            },
        }
    }

    /// Display name of the engine, e.g. `chrF2++`
    pub fn name(&self) -> String {
        dispatch!(self, m => m.name())
    }

    /// Scores a corpus
    pub fn corpus_score<H, R>(&self, hypotheses: &[H], references: &[Vec<R>]) -> Result<Score>
    where
        H: AsRef<str>,
        R: AsRef<str>,
    {
        dispatch!(self, m => m.corpus_score(hypotheses, references))
    }

    /// Scores every segment individually
    pub fn sentence_scores<H, R>(&self, hypotheses: &[H], references: &[Vec<R>]) -> Result<Vec<Score>>
    where
        H: AsRef<str>,
        R: AsRef<str>,
    {
        dispatch!(self, m => m.sentence_scores(hypotheses, references))
    }

    /// Scores one hypothesis against its references
    pub fn sentence_score<R: AsRef<str>>(&self, hypothesis: &str, references: &[R]) -> Result<Score> {
        dispatch!(self, m => m.sentence_score(hypothesis, references))
    }

    /// Extracts per-segment statistics for later scoring or resampling
    pub fn corpus_statistics<H, R>(&self, hypotheses: &[H], references: &[Vec<R>]) -> Result<CorpusStatistics>
    where
        H: AsRef<str>,
        R: AsRef<str>,
    {
        Ok(match self {
            Self::Bleu(m) => CorpusStatistics::Bleu(m.corpus_statistics(hypotheses, references)?),
            Self::Chrf(m) => CorpusStatistics::Chrf(m.corpus_statistics(hypotheses, references)?),
            Self::Ter(m) => CorpusStatistics::Ter(m.corpus_statistics(hypotheses, references)?),
            Self::ClassEval(m) => CorpusStatistics::ClassEval(m.corpus_statistics(hypotheses, references)?),
        })
    }

    /// Corpus score from previously extracted statistics
    pub fn score(&self, stats: &CorpusStatistics) -> Result<Score> {
        match (self, stats) {
            (Self::Bleu(m), CorpusStatistics::Bleu(s)) => Ok(m.build_score(&s.total(), s.num_refs())),
            (Self::Chrf(m), CorpusStatistics::Chrf(s)) => Ok(m.build_score(&s.total(), s.num_refs())),
            (Self::Ter(m), CorpusStatistics::Ter(s)) => Ok(m.build_score(&s.total(), s.num_refs())),
            (Self::ClassEval(m), CorpusStatistics::ClassEval(s)) => {
                Ok(m.build_score(&s.total(), s.num_refs()))
            }
            _ => Err(wrong_statistics(self)),
        }
    }

    /// Corpus score with a bootstrap confidence estimate attached
    pub fn bootstrap<G: Rng>(&self, stats: &CorpusStatistics, n_samples: usize, rng: &mut G) -> Result<Score> {
        match (self, stats) {
            (Self::Bleu(m), CorpusStatistics::Bleu(s)) => significance::bootstrap_score(m, s, n_samples, rng),
            (Self::Chrf(m), CorpusStatistics::Chrf(s)) => significance::bootstrap_score(m, s, n_samples, rng),
            (Self::Ter(m), CorpusStatistics::Ter(s)) => significance::bootstrap_score(m, s, n_samples, rng),
            (Self::ClassEval(m), CorpusStatistics::ClassEval(s)) => {
                significance::bootstrap_score(m, s, n_samples, rng)
            }
            _ => Err(wrong_statistics(self)),
        }
    }

    /// Paired bootstrap test of `system` against `baseline`
    pub fn paired_bootstrap<G: Rng>(
        &self,
        baseline: &CorpusStatistics,
        system: &CorpusStatistics,
        n_samples: usize,
        rng: &mut G,
    ) -> Result<PairedResult> {
        use CorpusStatistics as C;
        match (self, baseline, system) {
            (Self::Bleu(m), C::Bleu(b), C::Bleu(s)) => significance::paired_bootstrap(m, b, s, n_samples, rng),
            (Self::Chrf(m), C::Chrf(b), C::Chrf(s)) => significance::paired_bootstrap(m, b, s, n_samples, rng),
            (Self::Ter(m), C::Ter(b), C::Ter(s)) => significance::paired_bootstrap(m, b, s, n_samples, rng),
            (Self::ClassEval(m), C::ClassEval(b), C::ClassEval(s)) => {
                significance::paired_bootstrap(m, b, s, n_samples, rng)
            }
            _ => Err(wrong_statistics(self)),
        }
    }

    /// Paired approximate randomization test of `system` against `baseline`
    pub fn approximate_randomization<G: Rng>(
        &self,
        baseline: &CorpusStatistics,
        system: &CorpusStatistics,
        n_trials: usize,
        rng: &mut G,
    ) -> Result<PairedResult> {
        use CorpusStatistics as C;
        match (self, baseline, system) {
            (Self::Bleu(m), C::Bleu(b), C::Bleu(s)) => {
                significance::approximate_randomization(m, b, s, n_trials, rng)
            }
            (Self::Chrf(m), C::Chrf(b), C::Chrf(s)) => {
                significance::approximate_randomization(m, b, s, n_trials, rng)
            }
            (Self::Ter(m), C::Ter(b), C::Ter(s)) => significance::approximate_randomization(m, b, s, n_trials, rng),
            (Self::ClassEval(m), C::ClassEval(b), C::ClassEval(s)) => {
                significance::approximate_randomization(m, b, s, n_trials, rng)
            }
            _ => Err(wrong_statistics(self)),
        }
    }
}

impl From<Bleu> for Scorer {
    fn from(m: Bleu) -> Self {
        Self::Bleu(m)
    }
}

impl From<Chrf> for Scorer {
    fn from(m: Chrf) -> Self {
        Self::Chrf(m)
    }
}

impl From<Ter> for Scorer {
    fn from(m: Ter) -> Self {
        Self::Ter(m)
    }
}

impl From<ClassEval> for Scorer {
    fn from(m: ClassEval) -> Self {
        Self::ClassEval(m)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::significance::Seed;

    fn hyps() -> Vec<&'static str> {
        vec!["The cat sat on the mat.", "A quick brown fox."]
    }

    fn refs() -> Vec<Vec<&'static str>> {
        vec![vec!["The cat sat on the mat.", "The quick brown fox jumps."]]
    }

    #[test]
    fn test_metric_kind_parsing() {
        assert_eq!("BLEU".parse::<MetricKind>().unwrap(), MetricKind::Bleu);
        assert_eq!("macrof".parse::<MetricKind>().unwrap(), MetricKind::MacroF);
        assert!("meteor".parse::<MetricKind>().is_err());
        assert!(!MetricKind::Ter.higher_is_better());
    }

    #[test]
    fn test_every_kind_round_trips() {
        for kind in MetricKind::ALL {
            let scorer = Scorer::with_defaults(kind).unwrap();
            assert_eq!(scorer.kind(), kind);
        }
    }

    #[test]
    fn test_cached_statistics_match_direct_scoring() {
        for kind in MetricKind::ALL {
            let scorer = Scorer::with_defaults(kind).unwrap();
            let stats = scorer.corpus_statistics(&hyps(), &refs()).unwrap();
            assert_eq!(stats.len(), 2);
            let direct = scorer.corpus_score(&hyps(), &refs()).unwrap();
            assert_eq!(scorer.score(&stats).unwrap().value(), direct.value());
        }
    }

    #[test]
    fn test_statistics_from_another_metric_are_rejected() {
        let bleu = Scorer::with_defaults(MetricKind::Bleu).unwrap();
        let ter = Scorer::with_defaults(MetricKind::Ter).unwrap();
        let ter_stats = ter.corpus_statistics(&hyps(), &refs()).unwrap();
        assert!(bleu.score(&ter_stats).is_err());
        assert!(bleu
            .bootstrap(&ter_stats, 10, &mut Seed::default().rng())
            .is_err());
    }

    #[test]
    fn test_paired_tests_dispatch() {
        let chrf = Scorer::with_defaults(MetricKind::Chrf).unwrap();
        let base = chrf
            .corpus_statistics(&["cat", "fox"], &refs())
            .unwrap();
        let sys = chrf.corpus_statistics(&hyps(), &refs()).unwrap();

        let bs = chrf
            .paired_bootstrap(&base, &sys, 50, &mut Seed::default().rng())
            .unwrap();
        assert!(bs.delta > 0.0);

        let ar = chrf
            .approximate_randomization(&base, &sys, 50, &mut Seed::default().rng())
            .unwrap();
        assert_eq!(ar.delta, bs.delta);
    }
}
