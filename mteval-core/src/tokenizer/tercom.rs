//! Tokenizer replicating the normalization options of Tercom

use super::mteval::PunctuationRules;
use super::Tokenize;
use crate::error::Result;
use regex::Regex;
use serde::{Deserialize, Serialize};

const ASIAN_PUNCT: &str = r"([\x{3001}\x{3002}\x{3008}-\x{3011}\x{3014}-\x{301f}\x{ff61}-\x{ff65}\x{30fb}])";
const FULL_WIDTH_PUNCT: &str = r"([\x{ff0e}\x{ff0c}\x{ff1f}\x{ff1a}\x{ff1b}\x{ff01}\x{ff02}\x{ff08}\x{ff09}])";

/// Options of the tercom tokenizer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TercomOptions {
    /// Apply general and western punctuation normalization
    pub normalized: bool,
    /// Remove punctuation
    pub no_punct: bool,
    /// Split CJK characters (needs `normalized` for splitting)
    pub asian_support: bool,
    /// Keep the original casing
    pub case_sensitive: bool,
}

#[derive(Debug, Clone)]
struct Normalizer {
    rules: PunctuationRules,
    possessive_mid: Regex,
    possessive_end: Regex,
}

#[derive(Debug, Clone)]
struct AsianRules {
    splits: Vec<Regex>,
    asian_punct: Regex,
    full_width_punct: Regex,
}

/// Tercom-compatible tokenizer used by TER
#[derive(Debug, Clone)]
pub struct TercomTokenizer {
    options: TercomOptions,
    normalizer: Normalizer,
    asian: AsianRules,
    punct: Regex,
}

impl TercomTokenizer {
    /// Compiles the tokenizer for the given options
    pub fn new(options: TercomOptions) -> Result<Self> {
        let normalizer = Normalizer {
            rules: PunctuationRules::new()?,
            possessive_mid: Regex::new(r"'s ")?,
            possessive_end: Regex::new(r"'s$")?,
        };

        let asian = AsianRules {
            splits: vec![
                // CJK unified ideographs and extension A
                Regex::new(r"([\x{4e00}-\x{9fff}\x{3400}-\x{4dbf}])")?,
                // CJK strokes and radicals supplement
                Regex::new(r"([\x{31c0}-\x{31ef}\x{2e80}-\x{2eff}])")?,
                // CJK compatibility ideographs and forms
                Regex::new(r"([\x{3300}-\x{33ff}\x{f900}-\x{faff}\x{fe30}-\x{fe4f}])")?,
                // Enclosed CJK letters and months
                Regex::new(r"([\x{3200}-\x{3f22}])")?,
            ],
            asian_punct: Regex::new(ASIAN_PUNCT)?,
            full_width_punct: Regex::new(FULL_WIDTH_PUNCT)?,
        };

        Ok(Self {
            options,
            normalizer,
            asian,
            punct: Regex::new(r#"[\.,\?:;!"\(\)]"#)?,
        })
    }

    /// Options this tokenizer was built with
    pub fn options(&self) -> TercomOptions {
        self.options
    }

    fn normalize_western(&self, sent: &str) -> String {
        let mut sent = format!(" {sent} ");
        for (from, to) in [
            ("\n-", ""),
            ("\n", " "),
            ("&quot;", "\""),
            ("&amp;", "&"),
            ("&lt;", "<"),
            ("&gt;", ">"),
        ] {
            if sent.contains(from) {
                sent = sent.replace(from, to);
            }
        }

        let rules = &self.normalizer.rules;
        let step = rules.symbols.replace_all(&sent, " ${1} ");
        let step = self.normalizer.possessive_mid.replace_all(&step, " 's ");
        let step = self.normalizer.possessive_end.replace_all(&step, " 's");
        let step = rules.period_comma_after_nondigit.replace_all(&step, "${1} ${2} ");
        let step = rules.period_comma_before_nondigit.replace_all(&step, " ${1} ${2}");
        let step = rules.dash_after_digit.replace_all(&step, "${1} ${2} ");
        step.into_owned()
    }

    fn normalize_asian(&self, sent: String) -> String {
        // Hiragana and katakana runs are not split
        let mut sent = sent;
        for re in self
            .asian
            .splits
            .iter()
            .chain([&self.asian.asian_punct, &self.asian.full_width_punct])
        {
            sent = re.replace_all(&sent, " ${1} ").into_owned();
        }
        sent
    }

    fn remove_punct(&self, sent: String) -> String {
        let mut sent = self.punct.replace_all(&sent, "").into_owned();
        if self.options.asian_support {
            sent = self.asian.asian_punct.replace_all(&sent, "").into_owned();
            sent = self.asian.full_width_punct.replace_all(&sent, "").into_owned();
        }
        sent
    }
}

impl Tokenize for TercomTokenizer {
    fn tokenize(&self, line: &str) -> String {
        if line.is_empty() {
            return String::new();
        }

        let mut sent = if self.options.case_sensitive {
            line.to_string()
        } else {
            line.to_lowercase()
        };

        if self.options.normalized {
            sent = self.normalize_western(&sent);
            if self.options.asian_support {
                sent = self.normalize_asian(sent);
            }
        }

        if self.options.no_punct {
            sent = self.remove_punct(sent);
        }

        sent.split_whitespace().collect::<Vec<_>>().join(" ")
    }

    fn signature(&self) -> String {
        "tercom".to_string()
    }
}
