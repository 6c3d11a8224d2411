//! Reproducible machine translation evaluation
//!
//! This crate scores system translations against one or more references
//! with BLEU, chrF/chrF++, TER and the class-based MacroF/MicroF measures,
//! and tests whether two systems differ significantly.
//!
//! Every metric reduces a segment to additive sufficient statistics (a
//! [`Monoid`]). Corpus scores are computed from the summed statistics, and
//! resampling methods re-sum cached statistics instead of re-scoring text.
//! Each score carries a [`Signature`] recording every setting that affects
//! its value.
//!
//! # Example
//!
//! ```rust
//! use mteval_core::metrics::{Bleu, Metric};
//!
//! let bleu = Bleu::with_defaults().unwrap();
//! let hyps = ["The dog bit the man.", "It wasn't surprising."];
//! let refs = vec![vec!["The dog bit the man.", "It was not surprising."]];
//!
//! let score = bleu.corpus_score(&hyps, &refs).unwrap();
//! assert!(score.value() > 0.0 && score.value() < 100.0);
//! ```

#![warn(missing_docs)]

pub mod config;
pub mod corpus;
pub mod error;
pub mod metrics;
pub mod monoid;
pub mod ngram;
pub mod score;
pub mod scorer;
pub mod signature;
pub mod significance;
pub mod tokenizer;

pub use config::EvalConfig;
pub use corpus::{Corpus, Segment};
pub use error::{MetricError, Result};
pub use metrics::{Metric, SegmentStatistics};
pub use monoid::{Monoid, MonoidReduce};
pub use score::{Estimate, FormatOptions, Score, ScoreDetails, SignatureMode};
pub use scorer::{CorpusStatistics, MetricKind, Scorer};
pub use signature::{Signature, TestSetInfo};
pub use significance::{PairedMethod, PairedResult, Seed};
pub use tokenizer::{Tokenize, Tokenizer, TokenizerKind};
