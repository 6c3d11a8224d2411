//! Error types for metric configuration and scoring

use thiserror::Error;

/// Error type for all scoring operations
#[derive(Debug, Error)]
pub enum MetricError {
    /// A reference stream does not have one line per hypothesis
    #[error("Length mismatch: reference stream {stream} has {actual} lines, expected {expected} (hypothesis count)")]
    LengthMismatch {
        /// Index of the offending reference stream
        stream: usize,
        /// Number of hypotheses
        expected: usize,
        /// Number of lines in the reference stream
        actual: usize,
    },

    /// Paired inputs cover a different number of segments
    #[error("Segment count mismatch: baseline has {baseline} segments, system has {system}")]
    SegmentCountMismatch {
        /// Segments in the baseline statistics
        baseline: usize,
        /// Segments in the system statistics
        system: usize,
    },

    /// No reference streams were supplied at all
    #[error("No reference streams given")]
    NoReferenceStreams,

    /// Every reference for a segment was empty
    #[error("Segment {segment} has no non-empty references")]
    NoReferences {
        /// Zero-based segment index
        segment: usize,
    },

    /// Smoothing method name is not recognized
    #[error("Unknown smoothing method: {0} (expected one of none, floor, add-k, exp)")]
    UnknownSmoothing(String),

    /// Averaging type name is not recognized
    #[error("Unknown average type: {0} (expected macro or micro)")]
    UnknownAverage(String),

    /// Tokenizer name is not recognized
    #[error("Unknown tokenizer: {0}")]
    UnknownTokenizer(String),

    /// A configuration value is out of range
    #[error("Configuration error: {0}")]
    InvalidConfig(String),

    /// Statistics do not match the configured n-gram order
    #[error("Order mismatch: metric expects {expected} orders, statistics carry {actual}")]
    OrderMismatch {
        /// Orders the metric was configured for
        expected: usize,
        /// Orders present in the statistics
        actual: usize,
    },

    /// The edit distance backtrace reached a cell that was never computed
    #[error("Undefined alignment cell at row {row}, column {col}")]
    UndefinedAlignment {
        /// Hypothesis position
        row: usize,
        /// Reference position
        col: usize,
    },

    /// A tokenizer pattern failed to compile
    #[error("Invalid tokenizer pattern: {0}")]
    Regex(#[from] regex::Error),

    /// Configuration file could not be parsed
    #[error("Failed to parse configuration: {0}")]
    ConfigParse(#[from] toml::de::Error),

    /// Configuration file could not be read
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for scoring operations
pub type Result<T> = std::result::Result<T, MetricError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_length_mismatch_names_stream() {
        let err = MetricError::LengthMismatch {
            stream: 1,
            expected: 3,
            actual: 2,
        };
        let msg = err.to_string();
        assert!(msg.contains("reference stream 1"));
        assert!(msg.contains("has 2 lines"));
        assert!(msg.contains("expected 3"));
    }

    #[test]
    fn test_unknown_names_display() {
        assert_eq!(
            MetricError::UnknownAverage("weighted".into()).to_string(),
            "Unknown average type: weighted (expected macro or micro)"
        );
        assert!(MetricError::UnknownSmoothing("foo".into())
            .to_string()
            .starts_with("Unknown smoothing method: foo"));
    }

    #[test]
    fn test_io_error_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let err: MetricError = io.into();
        assert!(matches!(err, MetricError::Io(_)));
    }
}
