//! N-gram extraction and clipped counting
//!
//! N-grams are borrowed slices of the token (or character) sequence they come
//! from, so counting never allocates per n-gram. Reference tables from
//! several references are merged by taking the maximum count per n-gram,
//! which is the clipping rule shared by BLEU, chrF and the class-based F
//! metrics.

use std::collections::HashMap;
use std::hash::Hash;

/// Counts of word n-grams, keyed by the token slice
pub type NgramCounts<'a> = HashMap<&'a [&'a str], usize>;

/// Counts of character n-grams, keyed by the string slice
pub type CharNgramCounts<'a> = HashMap<&'a str, usize>;

/// Extracts all word n-grams with `min_order <= n <= max_order`
pub fn word_ngrams<'a>(tokens: &'a [&'a str], min_order: usize, max_order: usize) -> NgramCounts<'a> {
    let mut counts = NgramCounts::new();
    for n in min_order.max(1)..=max_order {
        for window in tokens.windows(n) {
            *counts.entry(window).or_insert(0) += 1;
        }
    }
    counts
}

/// Extracts word n-grams of exactly order `n`
pub fn word_ngrams_of_order<'a>(tokens: &'a [&'a str], n: usize) -> NgramCounts<'a> {
    word_ngrams(tokens, n, n)
}

/// Extracts character n-grams of order `n` over Unicode scalar values
pub fn char_ngrams(text: &str, n: usize) -> CharNgramCounts<'_> {
    let mut counts = CharNgramCounts::new();
    if n == 0 {
        return counts;
    }

    let bounds: Vec<usize> = text
        .char_indices()
        .map(|(i, _)| i)
        .chain(std::iter::once(text.len()))
        .collect();
    let num_chars = bounds.len() - 1;

    if num_chars >= n {
        for start in 0..=(num_chars - n) {
            let gram = &text[bounds[start]..bounds[start + n]];
            *counts.entry(gram).or_insert(0) += 1;
        }
    }
    counts
}

/// Removes all whitespace, as chrF does unless whitespace is included
pub fn strip_whitespace(text: &str) -> String {
    text.split_whitespace().collect()
}

/// Splits one leading or trailing ASCII punctuation character off each word
///
/// Single-character words are kept whole. A trailing mark wins over a
/// leading one; only one side is split.
pub fn split_punctuation(line: &str) -> Vec<&str> {
    let mut tokens = Vec::new();

    for word in line.split_whitespace() {
        let mut chars = word.chars();
        let (Some(first), Some(last)) = (chars.next(), chars.next_back()) else {
            tokens.push(word);
            continue;
        };

        if last.is_ascii_punctuation() {
            let cut = word.len() - last.len_utf8();
            tokens.push(&word[..cut]);
            tokens.push(&word[cut..]);
        } else if first.is_ascii_punctuation() {
            let cut = first.len_utf8();
            tokens.push(&word[..cut]);
            tokens.push(&word[cut..]);
        } else {
            tokens.push(word);
        }
    }

    tokens
}

/// Merges `other` into `into`, keeping the maximum count per key
pub fn merge_max<K: Hash + Eq>(into: &mut HashMap<K, usize>, other: HashMap<K, usize>) {
    for (gram, count) in other {
        let entry = into.entry(gram).or_insert(0);
        if count > *entry {
            *entry = count;
        }
    }
}

/// Size of the multiset intersection: the clipped match count
pub fn clipped_matches<K: Hash + Eq>(hyp: &HashMap<K, usize>, reference: &HashMap<K, usize>) -> usize {
    hyp.iter()
        .map(|(gram, &count)| reference.get(gram).map_or(0, |&r| count.min(r)))
        .sum()
}

/// Total number of n-grams in a table
pub fn total_count<K>(counts: &HashMap<K, usize>) -> usize {
    counts.values().sum()
}

/// Picks the reference length closest to `hyp_len`, preferring the shorter one on ties
///
/// Returns 0 when there are no references.
pub fn closest_ref_len<I>(hyp_len: usize, ref_lens: I) -> usize
where
    I: IntoIterator<Item = usize>,
{
    ref_lens
        .into_iter()
        .min_by_key(|&len| (len.abs_diff(hyp_len), len))
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_word_ngrams_counts() {
        let tokens = ["a", "b", "a", "b"];
        let counts = word_ngrams(&tokens, 1, 2);

        assert_eq!(counts[&["a"][..]], 2);
        assert_eq!(counts[&["b"][..]], 2);
        assert_eq!(counts[&["a", "b"][..]], 2);
        assert_eq!(counts[&["b", "a"][..]], 1);
        assert_eq!(counts.len(), 4);
    }

    #[test]
    fn test_word_ngrams_longer_than_sentence() {
        let tokens = ["only"];
        assert!(word_ngrams_of_order(&tokens, 2).is_empty());
    }

    #[test]
    fn test_char_ngrams_multibyte() {
        let counts = char_ngrams("zahăr", 2);
        assert_eq!(counts.len(), 4);
        assert_eq!(counts["hă"], 1);
        assert_eq!(counts["ăr"], 1);
        assert!(char_ngrams("ab", 3).is_empty());
        assert!(char_ngrams("ab", 0).is_empty());
    }

    #[test]
    fn test_strip_whitespace() {
        assert_eq!(strip_whitespace(" a b\tc \n"), "abc");
    }

    #[test]
    fn test_split_punctuation_one_side_only() {
        assert_eq!(split_punctuation("Hello, world!"), vec!["Hello", ",", "world", "!"]);
        assert_eq!(split_punctuation("(quoted)"), vec!["(quoted", ")"]);
        assert_eq!(split_punctuation("\"start"), vec!["\"", "start"]);
        assert_eq!(split_punctuation(". a"), vec![".", "a"]);
    }

    #[test]
    fn test_merge_max_clips_not_sums() {
        let mut merged: HashMap<&str, usize> = HashMap::from([("the", 2), ("cat", 1)]);
        merge_max(&mut merged, HashMap::from([("the", 1), ("dog", 3)]));

        assert_eq!(merged["the"], 2);
        assert_eq!(merged["cat"], 1);
        assert_eq!(merged["dog"], 3);
    }

    #[test]
    fn test_clipped_matches() {
        let hyp: HashMap<&str, usize> = HashMap::from([("a", 3), ("b", 1)]);
        let reference: HashMap<&str, usize> = HashMap::from([("a", 1), ("c", 4)]);
        assert_eq!(clipped_matches(&hyp, &reference), 1);
        assert_eq!(total_count(&hyp), 4);
    }

    #[test]
    fn test_closest_ref_len_prefers_shorter_on_tie() {
        assert_eq!(closest_ref_len(5, [3, 7]), 3);
        assert_eq!(closest_ref_len(5, [7, 3]), 3);
        assert_eq!(closest_ref_len(5, [9, 6, 4]), 4);
        assert_eq!(closest_ref_len(5, [5, 4]), 5);
        assert_eq!(closest_ref_len(5, std::iter::empty()), 0);
    }
}
