//! Bootstrap confidence intervals and paired significance tests
//!
//! Every procedure works on cached [`SegmentStatistics`]: a resample is a
//! sum of already extracted statistics, never a re-tokenization. Random
//! draws always happen sequentially on the caller's RNG, chunk by chunk;
//! with the `parallel` feature only the scoring of a drawn chunk runs on
//! the rayon pool, so results do not depend on the thread count.

use crate::error::{MetricError, Result};
use crate::metrics::{Metric, SegmentStatistics};
use crate::monoid::{Monoid, MonoidReduce};
use crate::score::{Estimate, Score};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// Default seed of the resampling RNG
pub const DEFAULT_SEED: u64 = 12345;

/// Default number of bootstrap resamples
pub const DEFAULT_BOOTSTRAP_SAMPLES: usize = 1000;

/// Default number of approximate randomization trials
pub const DEFAULT_AR_TRIALS: usize = 10_000;

/// Environment variable overriding the seed (`none` for OS entropy)
pub const SEED_ENV_VAR: &str = "MTEVAL_SEED";

/// Resamples drawn before a scoring pass
const CHUNK_SIZE: usize = 500;

/// z-value of a two-sided 95% interval
const Z_95: f64 = 1.96;

/// Where the resampling RNG gets its state from
///
/// In configuration files a seed is an integer, or the string `"none"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "SeedValue", into = "SeedValue")]
pub enum Seed {
    /// Reproducible stream
    Fixed(u64),
    /// Fresh OS entropy on every run
    Random,
}

impl Default for Seed {
    fn default() -> Self {
        Self::Fixed(DEFAULT_SEED)
    }
}

impl Seed {
    /// Reads the seed from [`SEED_ENV_VAR`], falling back to the default
    pub fn from_env() -> Result<Self> {
        match std::env::var(SEED_ENV_VAR) {
            Ok(value) => value.parse(),
            Err(_) => Ok(Self::default()),
        }
    }

    /// Creates the RNG
    pub fn rng(&self) -> StdRng {
        match self {
            Self::Fixed(seed) => StdRng::seed_from_u64(*seed),
            Self::Random => StdRng::from_os_rng(),
        }
    }
}

impl FromStr for Seed {
    type Err = MetricError;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("none") {
            return Ok(Self::Random);
        }
        s.parse::<u64>()
            .map(Self::Fixed)
            .map_err(|_| MetricError::InvalidConfig(format!("invalid seed '{s}': expected an integer or 'none'")))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
enum SeedValue {
    Number(u64),
    Text(String),
}

impl TryFrom<SeedValue> for Seed {
    type Error = MetricError;

    fn try_from(value: SeedValue) -> Result<Self> {
        match value {
            SeedValue::Number(seed) => Ok(Self::Fixed(seed)),
            SeedValue::Text(text) => text.parse(),
        }
    }
}

impl From<Seed> for SeedValue {
    fn from(seed: Seed) -> Self {
        match seed {
            Seed::Fixed(seed) => SeedValue::Number(seed),
            Seed::Random => SeedValue::Text("none".to_string()),
        }
    }
}

impl fmt::Display for Seed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Fixed(seed) => write!(f, "{seed}"),
            Self::Random => f.write_str("none"),
        }
    }
}

/// Paired test procedure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PairedMethod {
    /// Paired bootstrap resampling
    Bootstrap,
    /// Paired approximate randomization
    ApproximateRandomization,
}

impl fmt::Display for PairedMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bootstrap => f.write_str("paired bootstrap"),
            Self::ApproximateRandomization => f.write_str("approximate randomization"),
        }
    }
}

/// Outcome of comparing a system against a baseline
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PairedResult {
    /// Test procedure
    pub method: PairedMethod,
    /// Baseline corpus score
    pub baseline: f64,
    /// System corpus score
    pub system: f64,
    /// System minus baseline
    pub delta: f64,
    /// Probability of a difference at least this large under the null hypothesis
    pub p_value: f64,
    /// Resamples or trials run
    pub n_samples: usize,
    /// Bootstrap estimate of the baseline (paired bootstrap only)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub baseline_estimate: Option<Estimate>,
    /// Bootstrap estimate of the system (paired bootstrap only)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system_estimate: Option<Estimate>,
}

impl PairedResult {
    /// Whether the difference is significant at level `alpha`
    pub fn is_significant(&self, alpha: f64) -> bool {
        self.p_value < alpha
    }
}

/// Mean and 95% half-width of resampled scores
pub fn estimate(scores: &[f64]) -> Estimate {
    let n = scores.len();
    if n == 0 {
        return Estimate {
            mean: 0.0,
            ci: 0.0,
            n_samples: 0,
        };
    }
    let mean = scores.iter().sum::<f64>() / n as f64;
    let variance = scores.iter().map(|s| (s - mean).powi(2)).sum::<f64>() / n as f64;
    Estimate {
        mean,
        ci: Z_95 * variance.sqrt() / (n as f64).sqrt(),
        n_samples: n,
    }
}

fn check_samples(n_samples: usize) -> Result<()> {
    if n_samples == 0 {
        return Err(MetricError::InvalidConfig(
            "number of resamples must be greater than 0".into(),
        ));
    }
    Ok(())
}

fn check_paired<S>(baseline: &SegmentStatistics<S>, system: &SegmentStatistics<S>) -> Result<()>
where
    S: Monoid,
{
    if baseline.len() != system.len() {
        return Err(MetricError::SegmentCountMismatch {
            baseline: baseline.len(),
            system: system.len(),
        });
    }
    Ok(())
}

#[cfg(feature = "parallel")]
fn map_drawn<T, U, F>(drawn: &[T], f: F) -> Vec<U>
where
    T: Sync,
    U: Send,
    F: Fn(&T) -> U + Sync + Send,
{
    drawn.par_iter().map(f).collect()
}

#[cfg(not(feature = "parallel"))]
fn map_drawn<T, U, F>(drawn: &[T], f: F) -> Vec<U>
where
    F: Fn(&T) -> U,
{
    drawn.iter().map(f).collect()
}

/// Draws `n_samples` index vectors in chunks and maps each one with `score`
fn resample<R, U, F>(rng: &mut R, n_segments: usize, n_samples: usize, score: F) -> Vec<U>
where
    R: Rng,
    U: Send,
    F: Fn(&[usize]) -> U + Sync + Send,
{
    let mut out = Vec::with_capacity(n_samples);
    let mut remaining = n_samples;
    while remaining > 0 {
        let chunk = remaining.min(CHUNK_SIZE);
        let drawn: Vec<Vec<usize>> = (0..chunk)
            .map(|_| (0..n_segments).map(|_| rng.random_range(0..n_segments)).collect())
            .collect();
        out.extend(map_drawn(&drawn, |indices| score(indices.as_slice())));
        remaining -= chunk;
    }
    out
}

/// Bootstrap estimate of a corpus score
pub fn bootstrap_estimate<M, R>(
    metric: &M,
    stats: &SegmentStatistics<M::Stats>,
    n_samples: usize,
    rng: &mut R,
) -> Result<Estimate>
where
    M: Metric + Sync,
    R: Rng,
{
    check_samples(n_samples)?;
    if stats.is_empty() {
        let value = metric.score_value(&stats.total());
        return Ok(Estimate {
            mean: value,
            ci: 0.0,
            n_samples,
        });
    }

    let segments = stats.as_slice();
    let scores = resample(rng, stats.len(), n_samples, |indices| {
        metric.score_value(&M::Stats::sum_indexed(segments, indices))
    });
    let est = estimate(&scores);
    log::debug!(
        "{}: bootstrap over {n_samples} samples, mean {:.4} ± {:.4}",
        metric.name(),
        est.mean,
        est.ci
    );
    Ok(est)
}

/// Corpus score carrying its bootstrap estimate
pub fn bootstrap_score<M, R>(
    metric: &M,
    stats: &SegmentStatistics<M::Stats>,
    n_samples: usize,
    rng: &mut R,
) -> Result<Score>
where
    M: Metric + Sync,
    R: Rng,
{
    let est = bootstrap_estimate(metric, stats, n_samples, rng)?;
    Ok(metric
        .build_score(&stats.total(), stats.num_refs())
        .with_estimate(est))
}

/// Paired bootstrap resampling of a system against a baseline
///
/// Both systems are scored on the same resampled index vectors. The deltas
/// are centered on their mean to simulate the null hypothesis.
pub fn paired_bootstrap<M, R>(
    metric: &M,
    baseline: &SegmentStatistics<M::Stats>,
    system: &SegmentStatistics<M::Stats>,
    n_samples: usize,
    rng: &mut R,
) -> Result<PairedResult>
where
    M: Metric + Sync,
    R: Rng,
{
    check_samples(n_samples)?;
    check_paired(baseline, system)?;

    let base_score = metric.score_value(&baseline.total());
    let sys_score = metric.score_value(&system.total());
    let real_delta = sys_score - base_score;

    if baseline.is_empty() {
        return Ok(PairedResult {
            method: PairedMethod::Bootstrap,
            baseline: base_score,
            system: sys_score,
            delta: real_delta,
            p_value: 1.0,
            n_samples,
            baseline_estimate: None,
            system_estimate: None,
        });
    }

    let (base_segments, sys_segments) = (baseline.as_slice(), system.as_slice());
    let pairs = resample(rng, baseline.len(), n_samples, |indices| {
        (
            metric.score_value(&M::Stats::sum_indexed(base_segments, indices)),
            metric.score_value(&M::Stats::sum_indexed(sys_segments, indices)),
        )
    });

    let base_scores: Vec<f64> = pairs.iter().map(|(b, _)| *b).collect();
    let sys_scores: Vec<f64> = pairs.iter().map(|(_, s)| *s).collect();
    let deltas: Vec<f64> = pairs.iter().map(|(b, s)| s - b).collect();
    let mean_delta = deltas.iter().sum::<f64>() / deltas.len() as f64;

    let extreme = deltas
        .iter()
        .filter(|d| (*d - mean_delta).abs() >= real_delta.abs())
        .count();
    let p_value = (1 + extreme) as f64 / (n_samples + 1) as f64;

    log::debug!(
        "{}: paired bootstrap delta {real_delta:.4}, p = {p_value:.4}",
        metric.name()
    );

    Ok(PairedResult {
        method: PairedMethod::Bootstrap,
        baseline: base_score,
        system: sys_score,
        delta: real_delta,
        p_value,
        n_samples,
        baseline_estimate: Some(estimate(&base_scores)),
        system_estimate: Some(estimate(&sys_scores)),
    })
}

/// Paired approximate randomization of a system against a baseline
///
/// Each trial swaps every segment's statistics between the two systems with
/// probability 0.5 and checks whether the swapped difference is at least as
/// large as the observed one.
pub fn approximate_randomization<M, R>(
    metric: &M,
    baseline: &SegmentStatistics<M::Stats>,
    system: &SegmentStatistics<M::Stats>,
    n_trials: usize,
    rng: &mut R,
) -> Result<PairedResult>
where
    M: Metric + Sync,
    R: Rng,
{
    check_samples(n_trials)?;
    check_paired(baseline, system)?;

    let base_score = metric.score_value(&baseline.total());
    let sys_score = metric.score_value(&system.total());
    let real_delta = sys_score - base_score;
    let real_abs = real_delta.abs();

    let (base_segments, sys_segments) = (baseline.as_slice(), system.as_slice());
    let score_swapped = |swaps: &Vec<bool>| {
        let mut left = M::Stats::identity();
        let mut right = M::Stats::identity();
        for ((b, s), &swap) in base_segments.iter().zip(sys_segments).zip(swaps) {
            let (to_left, to_right) = if swap { (s, b) } else { (b, s) };
            left.combine_assign(to_left);
            right.combine_assign(to_right);
        }
        (metric.score_value(&right) - metric.score_value(&left)).abs() >= real_abs
    };

    let mut extreme = 0usize;
    let mut remaining = n_trials;
    while remaining > 0 {
        let chunk = remaining.min(CHUNK_SIZE);
        let drawn: Vec<Vec<bool>> = (0..chunk)
            .map(|_| (0..baseline.len()).map(|_| rng.random_bool(0.5)).collect())
            .collect();
        extreme += map_drawn(&drawn, &score_swapped)
            .into_iter()
            .filter(|&hit| hit)
            .count();
        remaining -= chunk;
    }

    let p_value = (extreme + 1) as f64 / (n_trials + 1) as f64;
    log::debug!(
        "{}: approximate randomization delta {real_delta:.4}, p = {p_value:.4}",
        metric.name()
    );

    Ok(PairedResult {
        method: PairedMethod::ApproximateRandomization,
        baseline: base_score,
        system: sys_score,
        delta: real_delta,
        p_value,
        n_samples: n_trials,
        baseline_estimate: None,
        system_estimate: None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::{Bleu, Chrf, Ter};

    fn hyps() -> Vec<&'static str> {
        vec![
            "The dog bit the man.",
            "It wasn't surprising.",
            "The man had just bitten him.",
            "A cat sat on the mat.",
            "Nobody expected this.",
        ]
    }

    fn worse_hyps() -> Vec<&'static str> {
        vec![
            "Dog man.",
            "Not surprising.",
            "The man bit him first.",
            "Cat mat.",
            "Unexpected.",
        ]
    }

    fn refs() -> Vec<Vec<&'static str>> {
        vec![vec![
            "The dog bit the man.",
            "It was not unexpected.",
            "The man bit him first.",
            "The cat sat on the mat.",
            "Nobody expected this.",
        ]]
    }

    #[test]
    fn test_seed_parsing() {
        assert_eq!("42".parse::<Seed>().unwrap(), Seed::Fixed(42));
        assert_eq!("None".parse::<Seed>().unwrap(), Seed::Random);
        assert!("abc".parse::<Seed>().is_err());
        assert_eq!(Seed::default(), Seed::Fixed(DEFAULT_SEED));
        assert_eq!(Seed::Random.to_string(), "none");
    }

    #[test]
    fn test_estimate_population_stdev() {
        let est = estimate(&[1.0, 3.0]);
        assert_eq!(est.mean, 2.0);
        assert!((est.ci - 1.96 / 2f64.sqrt()).abs() < 1e-12);
        assert_eq!(est.n_samples, 2);
    }

    #[test]
    fn test_bootstrap_is_reproducible() {
        let bleu = Bleu::with_defaults().unwrap();
        let stats = bleu.corpus_statistics(&hyps(), &refs()).unwrap();

        let a = bootstrap_estimate(&bleu, &stats, 200, &mut Seed::Fixed(7).rng()).unwrap();
        let b = bootstrap_estimate(&bleu, &stats, 200, &mut Seed::Fixed(7).rng()).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.n_samples, 200);
        assert!(a.ci > 0.0);
        assert!(a.mean >= 0.0 && a.mean <= 100.0);
    }

    #[test]
    fn test_bootstrap_score_keeps_corpus_value() {
        let chrf = Chrf::with_defaults().unwrap();
        let stats = chrf.corpus_statistics(&hyps(), &refs()).unwrap();
        let plain = chrf.corpus_score(&hyps(), &refs()).unwrap();
        let score = bootstrap_score(&chrf, &stats, 100, &mut Seed::default().rng()).unwrap();
        assert_eq!(score.value(), plain.value());
        assert!(score.estimate().is_some());
    }

    #[test]
    fn test_identical_systems_are_not_significant() {
        let bleu = Bleu::with_defaults().unwrap();
        let stats = bleu.corpus_statistics(&hyps(), &refs()).unwrap();

        let bs = paired_bootstrap(&bleu, &stats, &stats, 100, &mut Seed::default().rng()).unwrap();
        assert_eq!(bs.delta, 0.0);
        assert_eq!(bs.p_value, 1.0);

        let ar = approximate_randomization(&bleu, &stats, &stats, 100, &mut Seed::default().rng())
            .unwrap();
        assert_eq!(ar.p_value, 1.0);
    }

    #[test]
    fn test_p_values_are_never_zero() {
        let ter = Ter::with_defaults().unwrap();
        let base = ter.corpus_statistics(&worse_hyps(), &refs()).unwrap();
        let sys = ter.corpus_statistics(&hyps(), &refs()).unwrap();

        let ar = approximate_randomization(&ter, &base, &sys, 50, &mut Seed::default().rng()).unwrap();
        assert!(ar.p_value >= 1.0 / 51.0);
        assert!(ar.p_value <= 1.0);
        assert!(ar.delta < 0.0);

        let bs = paired_bootstrap(&ter, &base, &sys, 50, &mut Seed::default().rng()).unwrap();
        assert!(bs.p_value >= 1.0 / 51.0);
        assert!(bs.baseline_estimate.is_some());
    }

    #[test]
    fn test_mismatched_segment_counts() {
        let bleu = Bleu::with_defaults().unwrap();
        let full = bleu.corpus_statistics(&hyps(), &refs()).unwrap();
        let short = bleu
            .corpus_statistics(&hyps()[..2], &[refs()[0][..2].to_vec()])
            .unwrap();
        let err = paired_bootstrap(&bleu, &full, &short, 10, &mut Seed::default().rng()).unwrap_err();
        assert!(matches!(
            err,
            MetricError::SegmentCountMismatch {
                baseline: 5,
                system: 2
            }
        ));
    }

    #[test]
    fn test_zero_samples_rejected() {
        let bleu = Bleu::with_defaults().unwrap();
        let stats = bleu.corpus_statistics(&hyps(), &refs()).unwrap();
        assert!(bootstrap_estimate(&bleu, &stats, 0, &mut Seed::default().rng()).is_err());
    }
}
