//! mteval-v13a tokenizer

use super::Tokenize;
use crate::error::Result;
use regex::Regex;

/// Entity and line-break replacements applied before punctuation splitting
const UNESCAPE: [(&str, &str); 7] = [
    ("<skipped>", ""),
    ("-\n", ""),
    ("\n", " "),
    ("&quot;", "\""),
    ("&amp;", "&"),
    ("&lt;", "<"),
    ("&gt;", ">"),
];

/// Regex rules shared by 13a and the normalized tercom mode
#[derive(Debug, Clone)]
pub(crate) struct PunctuationRules {
    pub(crate) symbols: Regex,
    pub(crate) period_comma_after_nondigit: Regex,
    pub(crate) period_comma_before_nondigit: Regex,
    pub(crate) dash_after_digit: Regex,
}

impl PunctuationRules {
    pub(crate) fn new() -> Result<Self> {
        Ok(Self {
            symbols: Regex::new(r"([\{-~\[-` -&\(-\+:-@/])")?,
            period_comma_after_nondigit: Regex::new(r"([^0-9])([\.,])")?,
            period_comma_before_nondigit: Regex::new(r"([\.,])([^0-9])")?,
            dash_after_digit: Regex::new(r"([0-9])(-)")?,
        })
    }
}

/// Tokenizer equivalent to mteval-v13a, used by WMT
#[derive(Debug, Clone)]
pub struct Mteval13a {
    rules: PunctuationRules,
    whitespace: Regex,
}

impl Mteval13a {
    /// Compiles the tokenizer patterns
    pub fn new() -> Result<Self> {
        Ok(Self {
            rules: PunctuationRules::new()?,
            whitespace: Regex::new(r"\s+")?,
        })
    }
}

impl Tokenize for Mteval13a {
    fn tokenize(&self, line: &str) -> String {
        let mut text = line.to_string();
        for (from, to) in UNESCAPE {
            if text.contains(from) {
                text = text.replace(from, to);
            }
        }

        let padded = format!(" {text} ");
        let step = self.rules.symbols.replace_all(&padded, " ${1} ");
        let step = self
            .rules
            .period_comma_after_nondigit
            .replace_all(&step, "${1} ${2} ");
        let step = self
            .rules
            .period_comma_before_nondigit
            .replace_all(&step, " ${1} ${2}");
        let step = self.rules.dash_after_digit.replace_all(&step, "${1} ${2} ");
        let step = self.whitespace.replace_all(&step, " ");

        step.trim().to_string()
    }

    fn signature(&self) -> String {
        "13a".to_string()
    }
}
