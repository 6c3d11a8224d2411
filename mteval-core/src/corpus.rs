//! Alignment of hypothesis and reference streams into segments

use crate::error::{MetricError, Result};
use smallvec::SmallVec;

/// Hypothesis lines ending in a tokenized period before the warning fires
pub const TOKENIZED_PERIOD_THRESHOLD: usize = 100;

/// One hypothesis with its non-empty references
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment<'a> {
    /// System output for this segment
    pub hypothesis: &'a str,
    /// References that are not blank, in stream order
    pub references: SmallVec<[&'a str; 4]>,
}

/// A validated corpus: every segment has at least one reference
#[derive(Debug, Clone)]
pub struct Corpus<'a> {
    segments: Vec<Segment<'a>>,
    num_refs: usize,
}

impl<'a> Corpus<'a> {
    /// Aligns `hypotheses` with each reference stream
    ///
    /// `references` holds one stream per reference set, each with one line per
    /// hypothesis. Blank references are dropped per segment; a segment left
    /// with none is an error.
    pub fn new<H, R>(hypotheses: &'a [H], references: &'a [Vec<R>]) -> Result<Self>
    where
        H: AsRef<str>,
        R: AsRef<str>,
    {
        if references.is_empty() {
            return Err(MetricError::NoReferenceStreams);
        }

        for (stream, lines) in references.iter().enumerate() {
            if lines.len() != hypotheses.len() {
                return Err(MetricError::LengthMismatch {
                    stream,
                    expected: hypotheses.len(),
                    actual: lines.len(),
                });
            }
        }

        let mut segments = Vec::with_capacity(hypotheses.len());
        for (idx, hyp) in hypotheses.iter().enumerate() {
            let refs: SmallVec<[&'a str; 4]> = references
                .iter()
                .map(|stream| stream[idx].as_ref())
                .filter(|r| !r.trim().is_empty())
                .collect();

            if refs.is_empty() {
                return Err(MetricError::NoReferences { segment: idx });
            }

            segments.push(Segment {
                hypothesis: hyp.as_ref(),
                references: refs,
            });
        }

        Ok(Self {
            segments,
            num_refs: references.len(),
        })
    }

    /// Builds a one-segment corpus
    pub fn single<R: AsRef<str>>(hypothesis: &'a str, references: &'a [R]) -> Result<Self> {
        if references.is_empty() {
            return Err(MetricError::NoReferenceStreams);
        }

        let refs: SmallVec<[&'a str; 4]> = references
            .iter()
            .map(AsRef::as_ref)
            .filter(|r| !r.trim().is_empty())
            .collect();
        if refs.is_empty() {
            return Err(MetricError::NoReferences { segment: 0 });
        }

        Ok(Self {
            segments: vec![Segment {
                hypothesis,
                references: refs,
            }],
            num_refs: references.len(),
        })
    }

    /// The aligned segments
    pub fn segments(&self) -> &[Segment<'a>] {
        &self.segments
    }

    /// Number of reference streams supplied
    pub fn num_refs(&self) -> usize {
        self.num_refs
    }

    /// Number of segments
    pub fn len(&self) -> usize {
        self.segments.len()
    }

    /// Whether the corpus has no segments
    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Counts hypotheses that look already tokenized (ending in " .")
    pub fn tokenized_period_count(&self) -> usize {
        self.segments
            .iter()
            .filter(|seg| seg.hypothesis.trim_end().ends_with(" ."))
            .count()
    }

    /// Whether the hypotheses look tokenized often enough to warn about
    pub fn looks_tokenized(&self) -> bool {
        self.tokenized_period_count() >= TOKENIZED_PERIOD_THRESHOLD
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_aligns_streams() {
        let hyps = vec!["a", "b"];
        let refs = vec![vec!["ra1", "rb1"], vec!["ra2", "rb2"]];
        let corpus = Corpus::new(&hyps, &refs).unwrap();

        assert_eq!(corpus.len(), 2);
        assert_eq!(corpus.num_refs(), 2);
        assert_eq!(corpus.segments()[1].hypothesis, "b");
        assert_eq!(corpus.segments()[1].references.as_slice(), &["rb1", "rb2"]);
    }

    #[test]
    fn test_length_mismatch_names_stream() {
        let hyps = vec!["a", "b"];
        let refs = vec![vec!["ra", "rb"], vec!["ra"]];
        let err = Corpus::new(&hyps, &refs).unwrap_err();

        assert!(matches!(
            err,
            MetricError::LengthMismatch {
                stream: 1,
                expected: 2,
                actual: 1
            }
        ));
    }

    #[test]
    fn test_blank_references_dropped_per_segment() {
        let hyps = vec!["a", "b"];
        let refs = vec![vec!["ra", "  "], vec!["", "rb"]];
        let corpus = Corpus::new(&hyps, &refs).unwrap();

        assert_eq!(corpus.segments()[0].references.as_slice(), &["ra"]);
        assert_eq!(corpus.segments()[1].references.as_slice(), &["rb"]);
        assert_eq!(corpus.num_refs(), 2);
    }

    #[test]
    fn test_segment_without_references_fails() {
        let hyps = vec!["a", "b"];
        let refs = vec![vec!["ra", ""]];
        let err = Corpus::new(&hyps, &refs).unwrap_err();
        assert!(matches!(err, MetricError::NoReferences { segment: 1 }));
    }

    #[test]
    fn test_no_streams() {
        let hyps = vec!["a"];
        let refs: Vec<Vec<&str>> = vec![];
        assert!(matches!(
            Corpus::new(&hyps, &refs),
            Err(MetricError::NoReferenceStreams)
        ));
        assert!(matches!(
            Corpus::single("a", &[] as &[&str]),
            Err(MetricError::NoReferenceStreams)
        ));
    }

    #[test]
    fn test_tokenized_heuristic() {
        let hyps: Vec<String> = (0..TOKENIZED_PERIOD_THRESHOLD)
            .map(|i| format!("line {i} ."))
            .collect();
        let refs = vec![hyps.clone()];
        let corpus = Corpus::new(&hyps, &refs).unwrap();
        assert!(corpus.looks_tokenized());

        let short = &hyps[..TOKENIZED_PERIOD_THRESHOLD - 1];
        let short_refs = vec![short.to_vec()];
        let corpus = Corpus::new(short, &short_refs).unwrap();
        assert!(!corpus.looks_tokenized());
    }
}
