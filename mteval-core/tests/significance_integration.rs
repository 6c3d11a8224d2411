//! End-to-end scoring through configuration, scorers and resampling

use mteval_core::config::default_template;
use mteval_core::{EvalConfig, MetricError, MetricKind, PairedMethod, Scorer, Seed};

fn references() -> Vec<Vec<&'static str>> {
    vec![vec![
        "The dog bit the man.",
        "It was not unexpected.",
        "The man bit him first.",
        "A cat sat on the mat.",
        "Nobody had expected this outcome.",
        "The weather was fine all week.",
    ]]
}

fn baseline() -> Vec<&'static str> {
    vec![
        "The dog the man.",
        "It was surprising.",
        "A man bit him.",
        "The cat is on a mat.",
        "Nobody expected it.",
        "Weather fine week.",
    ]
}

fn system() -> Vec<&'static str> {
    vec![
        "The dog bit the man.",
        "It was not unexpected.",
        "The man bit him first.",
        "A cat sat on the mat.",
        "Nobody had expected this.",
        "The weather was fine all week.",
    ]
}

#[test]
fn test_template_config_scores_every_metric() {
    let mut config = EvalConfig::from_toml_str(&default_template()).unwrap();
    config.metrics = MetricKind::ALL.to_vec();

    let scorers = config.scorers().unwrap();
    assert_eq!(scorers.len(), MetricKind::ALL.len());

    for scorer in &scorers {
        let perfect = scorer.corpus_score(&system(), &[system()]).unwrap();
        let expected = if scorer.kind().higher_is_better() {
            100.0
        } else {
            0.0
        };
        assert!(
            (perfect.value() - expected).abs() < 1e-9,
            "{} scored {}",
            scorer.name(),
            perfect.value()
        );
    }
}

#[test]
fn test_cached_statistics_match_direct_scoring() {
    for kind in MetricKind::ALL {
        let scorer = Scorer::with_defaults(kind).unwrap();
        let stats = scorer.corpus_statistics(&baseline(), &references()).unwrap();
        assert_eq!(stats.len(), baseline().len());

        let cached = scorer.score(&stats).unwrap();
        let direct = scorer.corpus_score(&baseline(), &references()).unwrap();
        assert_eq!(cached.value(), direct.value(), "{kind}");
    }
}

#[test]
fn test_bootstrap_is_reproducible_with_fixed_seed() {
    let scorer = Scorer::with_defaults(MetricKind::Chrf).unwrap();
    let stats = scorer.corpus_statistics(&baseline(), &references()).unwrap();

    let first = scorer.bootstrap(&stats, 200, &mut Seed::Fixed(7).rng()).unwrap();
    let second = scorer.bootstrap(&stats, 200, &mut Seed::Fixed(7).rng()).unwrap();

    let (a, b) = (first.estimate().unwrap(), second.estimate().unwrap());
    assert_eq!(a, b);
    assert_eq!(a.n_samples, 200);
    assert!(a.ci >= 0.0);
    assert!(a.mean > 0.0 && a.mean < 100.0);
}

#[test]
fn test_paired_tests_prefer_better_system() {
    for kind in [MetricKind::Bleu, MetricKind::Chrf, MetricKind::Ter] {
        let scorer = Scorer::with_defaults(kind).unwrap();
        let base = scorer.corpus_statistics(&baseline(), &references()).unwrap();
        let sys = scorer.corpus_statistics(&system(), &references()).unwrap();

        let bootstrap = scorer
            .paired_bootstrap(&base, &sys, 300, &mut Seed::default().rng())
            .unwrap();
        assert_eq!(bootstrap.method, PairedMethod::Bootstrap);
        assert!(bootstrap.p_value > 0.0 && bootstrap.p_value <= 1.0);
        assert!(bootstrap.baseline_estimate.is_some());

        let ar = scorer
            .approximate_randomization(&base, &sys, 300, &mut Seed::default().rng())
            .unwrap();
        assert_eq!(ar.method, PairedMethod::ApproximateRandomization);
        assert!(ar.p_value > 0.0 && ar.p_value <= 1.0);

        if kind.higher_is_better() {
            assert!(bootstrap.delta > 0.0, "{kind}: {}", bootstrap.delta);
        } else {
            assert!(bootstrap.delta < 0.0, "{kind}: {}", bootstrap.delta);
        }
        assert_eq!(bootstrap.delta, ar.delta);
    }
}

#[test]
fn test_identical_systems_are_never_significant() {
    let scorer = Scorer::with_defaults(MetricKind::Bleu).unwrap();
    let base = scorer.corpus_statistics(&baseline(), &references()).unwrap();
    let same = scorer.corpus_statistics(&baseline(), &references()).unwrap();

    let bootstrap = scorer
        .paired_bootstrap(&base, &same, 100, &mut Seed::default().rng())
        .unwrap();
    assert_eq!(bootstrap.p_value, 1.0);
    assert!(!bootstrap.is_significant(0.05));

    let ar = scorer
        .approximate_randomization(&base, &same, 100, &mut Seed::default().rng())
        .unwrap();
    assert_eq!(ar.p_value, 1.0);
}

#[test]
fn test_mismatched_inputs_are_rejected() {
    let bleu = Scorer::with_defaults(MetricKind::Bleu).unwrap();
    let chrf = Scorer::with_defaults(MetricKind::Chrf).unwrap();

    let base = bleu.corpus_statistics(&baseline(), &references()).unwrap();
    let short_refs = vec![references()[0][..3].to_vec()];
    let short = bleu.corpus_statistics(&system()[..3], &short_refs).unwrap();

    let err = bleu
        .paired_bootstrap(&base, &short, 10, &mut Seed::default().rng())
        .unwrap_err();
    assert!(matches!(
        err,
        MetricError::SegmentCountMismatch {
            baseline: 6,
            system: 3
        }
    ));

    let err = chrf.score(&base).unwrap_err();
    assert!(matches!(err, MetricError::InvalidConfig(_)));
}
