//! Tokenizers applied before n-gram extraction
//!
//! Tokenizers are pure string transforms. Each one reports a short
//! signature that metrics fold into their own reproducibility signature.
//! The set is closed: [`TokenizerKind`] names the variants, [`Tokenizer`]
//! holds the compiled form.

mod intl;
mod mteval;
mod tercom;

pub use intl::International;
pub use mteval::Mteval13a;
pub use tercom::{TercomOptions, TercomTokenizer};

use crate::error::{MetricError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A stateless string transform with a reproducibility signature
pub trait Tokenize {
    /// Tokenizes one line, returning whitespace-separated tokens
    fn tokenize(&self, line: &str) -> String;

    /// Identifier folded into metric signatures
    fn signature(&self) -> String;
}

/// Tokenizers available to BLEU and the class-based F metrics
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(try_from = "String", into = "String")]
pub enum TokenizerKind {
    /// Leave the input untouched
    None,
    /// mteval-v13a tokenization, the WMT standard
    #[default]
    Mteval13a,
    /// mteval-v14 international tokenization over Unicode classes
    Intl,
    /// One token per character
    Char,
}

impl TokenizerKind {
    /// All variants, in listing order
    pub const ALL: [TokenizerKind; 4] = [Self::None, Self::Mteval13a, Self::Intl, Self::Char];

    /// Canonical name used on the command line and in signatures
    pub fn name(self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Mteval13a => "13a",
            Self::Intl => "intl",
            Self::Char => "char",
        }
    }

    /// Short human description
    pub fn description(self) -> &'static str {
        match self {
            Self::None => "no tokenization, split on whitespace only",
            Self::Mteval13a => "mteval-v13a punctuation splitting (default)",
            Self::Intl => "mteval-v14 international, Unicode punctuation and symbols",
            Self::Char => "character level",
        }
    }
}

impl fmt::Display for TokenizerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for TokenizerKind {
    type Err = MetricError;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.name() == s)
            .ok_or_else(|| MetricError::UnknownTokenizer(s.to_string()))
    }
}

impl TryFrom<String> for TokenizerKind {
    type Error = MetricError;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<TokenizerKind> for String {
    fn from(kind: TokenizerKind) -> Self {
        kind.name().to_string()
    }
}

/// A ready-to-use tokenizer with its patterns compiled
#[derive(Debug, Clone)]
pub enum Tokenizer {
    /// Identity transform
    None,
    /// mteval-v13a
    Mteval13a(Mteval13a),
    /// mteval-v14 international
    Intl(International),
    /// Character level
    Char,
}

impl Tokenizer {
    /// Compiles the tokenizer for `kind`
    pub fn new(kind: TokenizerKind) -> Result<Self> {
        Ok(match kind {
            TokenizerKind::None => Self::None,
            TokenizerKind::Mteval13a => Self::Mteval13a(Mteval13a::new()?),
            TokenizerKind::Intl => Self::Intl(International::new()?),
            TokenizerKind::Char => Self::Char,
        })
    }

    /// The variant this tokenizer was built from
    pub fn kind(&self) -> TokenizerKind {
        match self {
            Self::None => TokenizerKind::None,
            Self::Mteval13a(_) => TokenizerKind::Mteval13a,
            Self::Intl(_) => TokenizerKind::Intl,
            Self::Char => TokenizerKind::Char,
        }
    }
}

impl Tokenize for Tokenizer {
    fn tokenize(&self, line: &str) -> String {
        match self {
            Self::None => line.to_string(),
            Self::Mteval13a(tok) => tok.tokenize(line),
            Self::Intl(tok) => tok.tokenize(line),
            Self::Char => {
                let mut out = String::with_capacity(line.len() * 2);
                for (i, c) in line.chars().enumerate() {
                    if i > 0 {
                        out.push(' ');
                    }
                    out.push(c);
                }
                out
            }
        }
    }

    fn signature(&self) -> String {
        self.kind().name().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_round_trip_names() {
        for kind in TokenizerKind::ALL {
            assert_eq!(kind.name().parse::<TokenizerKind>().unwrap(), kind);
        }
    }

    #[test]
    fn test_unknown_tokenizer_rejected() {
        let err = "zh".parse::<TokenizerKind>().unwrap_err();
        assert!(matches!(err, MetricError::UnknownTokenizer(name) if name == "zh"));
    }

    #[test]
    fn test_none_is_identity() {
        let tok = Tokenizer::new(TokenizerKind::None).unwrap();
        assert_eq!(tok.tokenize("It wasn't."), "It wasn't.");
        assert_eq!(tok.signature(), "none");
    }

    #[test]
    fn test_char_tokenizer() {
        let tok = Tokenizer::new(TokenizerKind::Char).unwrap();
        assert_eq!(tok.tokenize("abc"), "a b c");
        assert_eq!(tok.tokenize("美众"), "美 众");
        // Spaces become their own (empty after splitting) tokens
        let tokens: Vec<_> = tok.tokenize("a b").split_whitespace().map(str::to_owned).collect();
        assert_eq!(tokens, vec!["a", "b"]);
    }

    #[test]
    fn test_kind_deserializes_from_name() {
        #[derive(Deserialize)]
        struct Wrapper {
            tok: TokenizerKind,
        }
        let w: Wrapper = toml::from_str("tok = \"intl\"").unwrap();
        assert_eq!(w.tok, TokenizerKind::Intl);
        assert!(toml::from_str::<Wrapper>("tok = \"bogus\"").is_err());
    }
}
