//! Reproducibility signatures
//!
//! A signature echoes every setting that influences a score as a sorted
//! `key.value+key.value` string. Short mode swaps each key for its
//! abbreviation but keeps the ordering by full key name, so both forms list
//! entries in the same order.

use serde::{Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;

/// Crate version recorded in every signature
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Identity of a standard test set, supplied by a dataset collaborator
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TestSetInfo {
    /// Test set name, e.g. `wmt14`
    pub test_set: Option<String>,
    /// Language pair, e.g. `en-de`
    pub langpair: Option<String>,
    /// Restrict to segments originally written in this language
    pub origlang: Option<String>,
    /// Named subset of the test set
    pub subset: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Entry {
    abbr: &'static str,
    value: String,
}

/// Sorted set of configuration entries identifying how a score was computed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Signature {
    entries: BTreeMap<&'static str, Entry>,
}

impl Signature {
    /// Creates a signature carrying only the version entry
    pub fn new() -> Self {
        Self {
            entries: BTreeMap::new(),
        }
        .with("version", "v", VERSION)
    }

    /// Adds or replaces an entry
    pub fn with(mut self, key: &'static str, abbr: &'static str, value: impl ToString) -> Self {
        self.entries.insert(
            key,
            Entry {
                abbr,
                value: value.to_string(),
            },
        );
        self
    }

    /// Adds the test-set identity entries that are present
    pub fn with_test_set(mut self, info: &TestSetInfo) -> Self {
        let fields = [
            ("test", "t", &info.test_set),
            ("lang", "l", &info.langpair),
            ("origlang", "o", &info.origlang),
            ("subset", "S", &info.subset),
        ];
        for (key, abbr, value) in fields {
            if let Some(value) = value {
                self = self.with(key, abbr, value);
            }
        }
        self
    }

    /// Looks up the value of an entry by its full key
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(|e| e.value.as_str())
    }

    /// Renders the signature, with abbreviated keys when `short` is set
    pub fn format(&self, short: bool) -> String {
        self.entries
            .iter()
            .map(|(key, entry)| {
                let name = if short { entry.abbr } else { key };
                format!("{name}.{}", entry.value)
            })
            .collect::<Vec<_>>()
            .join("+")
    }
}

impl Default for Signature {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.format(false))
    }
}

impl Serialize for Signature {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.format(false))
    }
}

/// Renders a boolean flag the way signatures spell it
pub(crate) fn yes_no(flag: bool) -> &'static str {
    if flag {
        "yes"
    } else {
        "no"
    }
}

/// Renders the case-folding entry
pub(crate) fn case_value(lowercase: bool) -> &'static str {
    if lowercase {
        "lc"
    } else {
        "mixed"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entries_sorted_by_full_key() {
        let sig = Signature::new()
            .with("tok", "tok", "13a")
            .with("case", "c", "mixed")
            .with("numrefs", "#", 1);

        assert_eq!(
            sig.format(false),
            format!("case.mixed+numrefs.1+tok.13a+version.{VERSION}")
        );
        assert_eq!(
            sig.format(true),
            format!("c.mixed+#.1+tok.13a+v.{VERSION}")
        );
    }

    #[test]
    fn test_different_values_differ() {
        let a = Signature::new().with("smooth", "s", "exp");
        let b = Signature::new().with("smooth", "s", "floor[0.1]");
        assert_ne!(a.format(false), b.format(false));
        assert_ne!(a.format(true), b.format(true));
    }

    #[test]
    fn test_test_set_entries() {
        let info = TestSetInfo {
            test_set: Some("wmt14".into()),
            langpair: Some("en-de".into()),
            ..Default::default()
        };
        let sig = Signature::new().with_test_set(&info);
        assert_eq!(sig.get("test"), Some("wmt14"));
        assert_eq!(sig.get("lang"), Some("en-de"));
        assert_eq!(sig.get("subset"), None);
        assert!(sig.format(true).contains("t.wmt14"));
    }

    #[test]
    fn test_serializes_as_string() {
        let sig = Signature::new().with("case", "c", "lc");
        let json = serde_json::to_string(&sig).unwrap();
        assert_eq!(json, format!("\"case.lc+version.{VERSION}\""));
    }
}
