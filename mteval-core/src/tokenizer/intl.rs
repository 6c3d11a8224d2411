//! mteval-v14 international tokenizer

use super::Tokenize;
use crate::error::Result;
use regex::Regex;

/// Splits Unicode punctuation and symbols
///
/// Punctuation stays attached when it sits next to a digit on the side being
/// examined, so decimal and thousand separators survive. A number followed
/// by a sentence-final period keeps the period, matching mteval-v14.
#[derive(Debug, Clone)]
pub struct International {
    nondigit_punct: Regex,
    punct_nondigit: Regex,
    symbol: Regex,
}

impl International {
    /// Compiles the tokenizer patterns
    pub fn new() -> Result<Self> {
        Ok(Self {
            nondigit_punct: Regex::new(r"([^\d])(\p{P})")?,
            punct_nondigit: Regex::new(r"(\p{P})([^\d])")?,
            symbol: Regex::new(r"(\p{S})")?,
        })
    }
}

impl Tokenize for International {
    fn tokenize(&self, line: &str) -> String {
        let step = self.nondigit_punct.replace_all(line, "${1} ${2} ");
        let step = self.punct_nondigit.replace_all(&step, " ${1} ${2}");
        let step = self.symbol.replace_all(&step, " ${1} ");
        step.trim().to_string()
    }

    fn signature(&self) -> String {
        "intl".to_string()
    }
}
