//! Greedy block shifting on top of the beam edit distance

use super::beam::{BeamEditDistance, EditOp};
use crate::error::Result;
use std::cmp::Reverse;

/// Longest block that may be shifted
pub const MAX_SHIFT_SIZE: usize = 10;

/// Largest distance between the hypothesis and reference start of a block
pub const MAX_SHIFT_DIST: usize = 50;

/// Budget of shift candidates evaluated per hypothesis/reference pair
pub const MAX_SHIFT_CANDIDATES: usize = 1000;

/// A block of words common to the hypothesis and the reference
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShiftPair {
    /// Block start in the hypothesis
    pub hyp_start: usize,
    /// Block start in the reference
    pub ref_start: usize,
    /// Block length in words
    pub len: usize,
}

/// Enumerates matching blocks, shortest first for every start pair
pub fn find_shifted_pairs<'a>(hyp: &'a [u32], reference: &'a [u32]) -> impl Iterator<Item = ShiftPair> + 'a {
    (0..hyp.len()).flat_map(move |hyp_start| {
        (0..reference.len())
            .filter(move |ref_start| hyp_start.abs_diff(*ref_start) <= MAX_SHIFT_DIST)
            .flat_map(move |ref_start| {
                let run = hyp[hyp_start..]
                    .iter()
                    .zip(&reference[ref_start..])
                    .take(MAX_SHIFT_SIZE)
                    .take_while(|(h, r)| h == r)
                    .count();
                (1..=run).map(move |len| ShiftPair {
                    hyp_start,
                    ref_start,
                    len,
                })
            })
    })
}

fn clamped(words: &[u32], from: usize, to: usize) -> &[u32] {
    let to = to.min(words.len());
    let from = from.min(to);
    &words[from..to]
}

/// Moves `words[start..start + len]` so that it begins at `target`
///
/// `target` indexes the sequence before the move; ranges running past the
/// end are clamped.
pub fn perform_shift(words: &[u32], start: usize, len: usize, target: usize) -> Vec<u32> {
    let end = start + len;
    let parts: [&[u32]; 4] = if target < start {
        [
            clamped(words, 0, target),
            clamped(words, start, end),
            clamped(words, target, start),
            clamped(words, end, words.len()),
        ]
    } else if target > end {
        [
            clamped(words, 0, start),
            clamped(words, end, target),
            clamped(words, start, end),
            clamped(words, target, words.len()),
        ]
    } else {
        [
            clamped(words, 0, start),
            clamped(words, end, len + target),
            clamped(words, start, end),
            clamped(words, len + target, words.len()),
        ]
    };
    parts.concat()
}

/// Position map and error flags derived from a trace
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Alignment {
    /// Hypothesis position aligned to every reference position, -1 before the first word
    pub align: Vec<isize>,
    /// Reference positions that are substituted or deleted
    pub ref_err: Vec<bool>,
    /// Hypothesis positions that are substituted or inserted
    pub hyp_err: Vec<bool>,
}

impl Alignment {
    /// Builds the alignment from a reference-to-hypothesis trace
    pub fn from_trace(trace: &[EditOp]) -> Self {
        let mut pos_hyp: isize = -1;
        let mut align = Vec::new();
        let mut ref_err = Vec::new();
        let mut hyp_err = Vec::new();

        for op in trace {
            match op {
                EditOp::Nop | EditOp::Sub => {
                    let err = *op == EditOp::Sub;
                    pos_hyp += 1;
                    align.push(pos_hyp);
                    hyp_err.push(err);
                    ref_err.push(err);
                }
                EditOp::Ins => {
                    pos_hyp += 1;
                    hyp_err.push(true);
                }
                EditOp::Del => {
                    align.push(pos_hyp);
                    ref_err.push(true);
                }
                EditOp::Undefined => {}
            }
        }

        Self {
            align,
            ref_err,
            hyp_err,
        }
    }
}

/// Outcome of one search for the best shift
#[derive(Debug)]
struct ShiftOutcome {
    gain: i64,
    words: Vec<u32>,
    checked: usize,
}

/// Finds the single best shift of `hyp`, if any reduces the edit distance
fn best_shift(
    hyp: &[u32],
    reference: &[u32],
    ed: &mut BeamEditDistance<'_>,
    mut checked: usize,
) -> Result<ShiftOutcome> {
    let (pre_score, trace) = ed.distance(hyp)?;
    let flipped: Vec<EditOp> = trace.into_iter().map(EditOp::flipped).collect();
    let alignment = Alignment::from_trace(&flipped);

    type Rank = (i64, usize, Reverse<usize>, Reverse<usize>);
    let mut best: Option<(Rank, Vec<u32>)> = None;

    for pair in find_shifted_pairs(hyp, reference) {
        let ShiftPair {
            hyp_start,
            ref_start,
            len,
        } = pair;

        if !alignment.hyp_err[hyp_start..hyp_start + len].contains(&true) {
            continue;
        }
        if !alignment.ref_err[ref_start..ref_start + len].contains(&true) {
            continue;
        }
        let aligned = alignment.align[ref_start];
        if hyp_start as isize <= aligned && aligned < (hyp_start + len) as isize {
            continue;
        }

        let mut prev_target = None;
        for offset in -1..len as isize {
            let pos = ref_start as isize + offset;
            let target = if pos == -1 {
                0
            } else if let Some(&a) = alignment.align.get(pos as usize) {
                (a + 1) as usize
            } else {
                break;
            };
            if prev_target == Some(target) {
                continue;
            }
            prev_target = Some(target);

            let shifted = perform_shift(hyp, hyp_start, len, target);
            let (score, _) = ed.distance(&shifted)?;
            let rank = (
                pre_score as i64 - score as i64,
                len,
                Reverse(hyp_start),
                Reverse(target),
            );
            checked += 1;

            if best.as_ref().map_or(true, |(best_rank, _)| rank > *best_rank) {
                best = Some((rank, shifted));
            }
        }

        if checked >= MAX_SHIFT_CANDIDATES {
            break;
        }
    }

    Ok(match best {
        Some(((gain, ..), words)) => ShiftOutcome {
            gain,
            words,
            checked,
        },
        None => ShiftOutcome {
            gain: 0,
            words: hyp.to_vec(),
            checked,
        },
    })
}

/// Result of the greedy shift search for one hypothesis/reference pair
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EditRate {
    /// Shifts applied
    pub shifts: usize,
    /// Edit distance of the shifted hypothesis
    pub distance: usize,
    /// Reference length in words
    pub ref_length: usize,
    /// Shift candidates evaluated before the search stopped
    pub candidates_checked: usize,
}

impl EditRate {
    /// Shifts plus insertions, deletions and substitutions
    pub fn num_edits(&self) -> usize {
        self.shifts + self.distance
    }
}

/// Runs the shift search, stopping when no shift helps or the candidate budget is spent
pub fn edit_rate(hyp: &[u32], reference: &[u32]) -> Result<EditRate> {
    if reference.is_empty() {
        return Ok(EditRate {
            shifts: 0,
            distance: hyp.len(),
            ref_length: 0,
            candidates_checked: 0,
        });
    }

    let mut ed = BeamEditDistance::new(reference);
    let mut words = hyp.to_vec();
    let mut shifts = 0;
    let mut checked = 0;

    loop {
        let outcome = best_shift(&words, reference, &mut ed, checked)?;
        checked = outcome.checked;
        if checked >= MAX_SHIFT_CANDIDATES || outcome.gain <= 0 {
            break;
        }
        shifts += 1;
        words = outcome.words;
    }

    let (distance, _) = ed.distance(&words)?;
    log::trace!("ter: {shifts} shifts, {distance} edits, {checked} candidates checked");
    Ok(EditRate {
        shifts,
        distance,
        ref_length: reference.len(),
        candidates_checked: checked,
    })
}

/// Number of edits (shifts included) turning `hyp` into `reference`, and the reference length
pub fn translation_edit_rate(hyp: &[u32], reference: &[u32]) -> Result<(usize, usize)> {
    let rate = edit_rate(hyp, reference)?;
    Ok((rate.num_edits(), rate.ref_length))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_perform_shift_cases() {
        let words = [0, 1, 2, 3, 4, 5];
        // move block before its position
        assert_eq!(perform_shift(&words, 3, 2, 1), vec![0, 3, 4, 1, 2, 5]);
        // move block after its position
        assert_eq!(perform_shift(&words, 0, 2, 4), vec![2, 3, 0, 1, 4, 5]);
        // target inside the block's span
        assert_eq!(perform_shift(&words, 1, 2, 2), vec![0, 3, 1, 2, 4, 5]);
        // target past the end is clamped
        assert_eq!(perform_shift(&words, 0, 1, 6), vec![1, 2, 3, 4, 5, 0]);
    }

    #[test]
    fn test_find_shifted_pairs() {
        let hyp = [1, 2, 3];
        let reference = [2, 3, 1];
        let pairs: Vec<_> = find_shifted_pairs(&hyp, &reference)
            .map(|p| (p.hyp_start, p.ref_start, p.len))
            .collect();
        assert_eq!(pairs, vec![(0, 2, 1), (1, 0, 1), (1, 0, 2), (2, 1, 1)]);
    }

    #[test]
    fn test_alignment_from_trace() {
        use EditOp::*;
        let alignment = Alignment::from_trace(&[Del, Nop, Ins, Sub]);
        assert_eq!(alignment.align, vec![-1, 0, 2]);
        assert_eq!(alignment.ref_err, vec![true, false, true]);
        assert_eq!(alignment.hyp_err, vec![false, true, true]);
    }

    #[test]
    fn test_identical_needs_no_edits() {
        let words = [1, 2, 3, 4];
        assert_eq!(translation_edit_rate(&words, &words).unwrap(), (0, 4));
    }

    #[test]
    fn test_block_move_counts_as_one_shift() {
        // d e f g h a b c -> a b c d e f g h
        let hyp = [4, 5, 6, 7, 8, 1, 2, 3];
        let reference = [1, 2, 3, 4, 5, 6, 7, 8];
        assert_eq!(translation_edit_rate(&hyp, &reference).unwrap(), (1, 8));
    }

    #[test]
    fn test_empty_sides() {
        assert_eq!(translation_edit_rate(&[1, 2], &[]).unwrap(), (2, 0));
        assert_eq!(translation_edit_rate(&[], &[1]).unwrap(), (1, 1));
        assert_eq!(translation_edit_rate(&[], &[]).unwrap(), (0, 0));
    }

    /// Reference 0..300 with every pair of adjacent 5-word blocks swapped
    fn swapped_blocks() -> (Vec<u32>, Vec<u32>) {
        let reference: Vec<u32> = (0..300).collect();
        let hyp: Vec<u32> = reference
            .chunks(10)
            .flat_map(|pair| pair[5..].iter().chain(&pair[..5]).copied())
            .collect();
        (hyp, reference)
    }

    #[test]
    fn test_candidate_budget_stops_the_search() {
        let (hyp, reference) = swapped_blocks();
        let rate = edit_rate(&hyp, &reference).unwrap();

        assert!(rate.candidates_checked >= MAX_SHIFT_CANDIDATES);
        assert!(rate.shifts >= 1);
        // 30 swaps would need 30 shifts; the budget runs out first
        assert!(rate.shifts < 30);
        assert!(rate.distance > 0);
        assert_eq!(rate.ref_length, 300);

        let unshifted = BeamEditDistance::new(&reference).distance(&hyp).unwrap().0;
        assert!(rate.num_edits() <= unshifted);

        assert_eq!(edit_rate(&hyp, &reference).unwrap(), rate);
        assert_eq!(
            translation_edit_rate(&hyp, &reference).unwrap(),
            (rate.num_edits(), 300)
        );
    }

    #[test]
    fn test_small_search_stays_under_budget() {
        let hyp = [4, 5, 6, 7, 8, 1, 2, 3];
        let reference = [1, 2, 3, 4, 5, 6, 7, 8];
        let rate = edit_rate(&hyp, &reference).unwrap();
        assert!(rate.candidates_checked < MAX_SHIFT_CANDIDATES);
        assert_eq!((rate.shifts, rate.distance), (1, 0));
    }
}
