//! Property tests for sufficient statistics and perfect matches

use mteval_core::metrics::{AverageType, BleuStats, ChrfStats, TerStats};
use mteval_core::metrics::{Bleu, Chrf, ClassEval, Metric, Ter};
use mteval_core::monoid::{Monoid, MonoidReduce};
use proptest::prelude::*;
use smallvec::SmallVec;

fn bleu_stats() -> impl Strategy<Value = BleuStats> {
    (
        0usize..50,
        0usize..50,
        proptest::collection::vec(0usize..20, 0..6),
        proptest::collection::vec(0usize..20, 0..6),
    )
        .prop_map(|(sys_len, ref_len, correct, total)| BleuStats {
            sys_len,
            ref_len,
            correct: SmallVec::from_vec(correct),
            total: SmallVec::from_vec(total),
        })
}

fn ter_stats() -> impl Strategy<Value = TerStats> {
    (0usize..100, 0usize..100).prop_map(|(num_edits, ref_length)| TerStats {
        num_edits,
        ref_length,
    })
}

fn sentence() -> impl Strategy<Value = String> {
    // At least four words of two letters, so every BLEU and chrF order has n-grams
    proptest::collection::vec("[a-z]{2,8}", 4..12).prop_map(|words| words.join(" "))
}

proptest! {
    #[test]
    fn bleu_stats_associative(a in bleu_stats(), b in bleu_stats(), c in bleu_stats()) {
        prop_assert_eq!(a.combine(&b).combine(&c), a.combine(&b.combine(&c)));
    }

    #[test]
    fn bleu_stats_identity(a in bleu_stats()) {
        let padded = a.combine(&BleuStats::identity());
        prop_assert_eq!(&padded, &a);
        prop_assert_eq!(BleuStats::identity().combine(&a), a);
    }

    #[test]
    fn ter_stats_associative(a in ter_stats(), b in ter_stats(), c in ter_stats()) {
        prop_assert_eq!(a.combine(&b).combine(&c), a.combine(&b.combine(&c)));
        prop_assert_eq!(a.combine(&TerStats::identity()), a);
    }

    #[test]
    fn tree_reduce_matches_fold(items in proptest::collection::vec(ter_stats(), 0..40)) {
        let folded = items.iter().fold(TerStats::identity(), |acc, s| acc.combine(s));
        prop_assert_eq!(TerStats::reduce(items), folded);
    }

    #[test]
    fn perfect_match_scores(lines in proptest::collection::vec(sentence(), 1..5)) {
        let refs = vec![lines.clone()];

        let bleu = Bleu::with_defaults().unwrap().corpus_score(&lines, &refs).unwrap();
        prop_assert!((bleu.value() - 100.0).abs() < 1e-9);

        let chrf = Chrf::with_defaults().unwrap().corpus_score(&lines, &refs).unwrap();
        prop_assert!((chrf.value() - 100.0).abs() < 1e-9);

        let ter = Ter::with_defaults().unwrap().corpus_score(&lines, &refs).unwrap();
        prop_assert_eq!(ter.value(), 0.0);

        let macro_f = ClassEval::with_average(AverageType::Macro)
            .unwrap()
            .corpus_score(&lines, &refs)
            .unwrap();
        prop_assert!((macro_f.value() - 100.0).abs() < 1e-9);
    }

    #[test]
    fn corpus_equals_summed_segments(
        hyps in proptest::collection::vec(sentence(), 1..6),
        refs in proptest::collection::vec(sentence(), 6),
    ) {
        let refs = vec![refs[..hyps.len()].to_vec()];
        let chrf = Chrf::with_defaults().unwrap();

        let stats = chrf.corpus_statistics(&hyps, &refs).unwrap();
        let summed = stats
            .as_slice()
            .iter()
            .fold(ChrfStats::identity(), |acc, s| acc.combine(s));
        let direct = chrf.corpus_score(&hyps, &refs).unwrap();

        prop_assert_eq!(chrf.score_value(&summed), direct.value());
    }
}
