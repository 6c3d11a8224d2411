//! Beam-restricted Levenshtein distance with a prefix cache of DP rows
//!
//! Rows of the DP matrix depend only on the hypothesis prefix that produced
//! them, so rows are memoized in a trie keyed by hypothesis words. Shifting
//! moves blocks around inside one hypothesis, which keeps long prefixes
//! identical between calls.

use crate::error::{MetricError, Result};
use std::collections::HashMap;

/// Width of the band around the diagonal that is filled in
pub const BEAM_WIDTH: usize = 25;

/// Maximum number of cached rows per reference
pub const MAX_CACHE_SIZE: usize = 10_000;

const INFINITY: u64 = 10_000_000_000_000_000;

/// One edit operation of an alignment trace
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditOp {
    /// Words match
    Nop,
    /// Substitution
    Sub,
    /// Insertion
    Ins,
    /// Deletion
    Del,
    /// Cell outside the beam; never part of a finished trace
    Undefined,
}

impl EditOp {
    /// Swaps insertions and deletions, changing the point of view of the trace
    pub fn flipped(self) -> Self {
        match self {
            Self::Ins => Self::Del,
            Self::Del => Self::Ins,
            other => other,
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct Cell {
    cost: u64,
    op: EditOp,
}

impl Cell {
    const UNDEFINED: Cell = Cell {
        cost: INFINITY,
        op: EditOp::Undefined,
    };
}

type Row = Vec<Cell>;

const ROOT: usize = 0;

/// Trie of DP rows stored in an arena; node 0 holds the initial row
#[derive(Debug)]
struct RowCache {
    rows: Vec<Row>,
    children: HashMap<(usize, u32), usize>,
}

impl RowCache {
    fn new(initial_row: Row) -> Self {
        Self {
            rows: vec![initial_row],
            children: HashMap::new(),
        }
    }

    /// Number of cached rows, the initial row excluded
    fn len(&self) -> usize {
        self.rows.len() - 1
    }

    fn row(&self, node: usize) -> &[Cell] {
        &self.rows[node]
    }

    /// Node path of the longest cached prefix of `words`, starting at the root
    fn longest_prefix(&self, words: &[u32]) -> Vec<usize> {
        let mut path = vec![ROOT];
        let mut node = ROOT;
        for &word in words {
            match self.children.get(&(node, word)) {
                Some(&child) => {
                    path.push(child);
                    node = child;
                }
                None => break,
            }
        }
        path
    }

    /// Stores the rows computed past the cached prefix
    fn extend(&mut self, words: &[u32], mut node: usize, rows: Vec<Row>) {
        if self.len() >= MAX_CACHE_SIZE {
            return;
        }
        for (&word, row) in words.iter().zip(rows) {
            let child = self.rows.len();
            self.rows.push(row);
            self.children.insert((node, word), child);
            node = child;
        }
    }
}

/// Edit distance against one fixed reference
#[derive(Debug)]
pub struct BeamEditDistance<'r> {
    reference: &'r [u32],
    cache: RowCache,
}

impl<'r> BeamEditDistance<'r> {
    /// Prepares the distance computation for `reference`
    pub fn new(reference: &'r [u32]) -> Self {
        let initial_row = (0..=reference.len())
            .map(|j| Cell {
                cost: j as u64,
                op: EditOp::Ins,
            })
            .collect();
        Self {
            reference,
            cache: RowCache::new(initial_row),
        }
    }

    /// Number of rows currently cached
    pub fn cached_rows(&self) -> usize {
        self.cache.len()
    }

    /// Distance from `hyp` to the reference and the hypothesis-to-reference trace
    pub fn distance(&mut self, hyp: &[u32]) -> Result<(usize, Vec<EditOp>)> {
        let path = self.cache.longest_prefix(hyp);
        let start = path.len() - 1;
        let n_hyp = hyp.len();
        let n_ref = self.reference.len();

        let ratio = if n_hyp == 0 {
            1.0
        } else {
            n_ref as f64 / n_hyp as f64
        };
        let beam = if ratio / 2.0 > BEAM_WIDTH as f64 {
            (ratio / 2.0 + BEAM_WIDTH as f64).ceil() as usize
        } else {
            BEAM_WIDTH
        };

        let mut fresh: Vec<Row> = Vec::with_capacity(n_hyp - start);
        for i in start + 1..=n_hyp {
            let prev: &[Cell] = if i - 1 <= start {
                self.cache.row(path[i - 1])
            } else {
                &fresh[i - 2 - start]
            };
            let mut row = vec![Cell::UNDEFINED; n_ref + 1];

            let diagonal = (i as f64 * ratio).floor() as usize;
            let min_j = diagonal.saturating_sub(beam);
            let max_j = if i == n_hyp {
                n_ref + 1
            } else {
                (diagonal + beam).min(n_ref + 1)
            };

            for j in min_j..max_j {
                if j == 0 {
                    row[0] = Cell {
                        cost: prev[0].cost + 1,
                        op: EditOp::Del,
                    };
                    continue;
                }

                let (sub_cost, sub_op) = if hyp[i - 1] == self.reference[j - 1] {
                    (0, EditOp::Nop)
                } else {
                    (1, EditOp::Sub)
                };
                let candidates = [
                    (prev[j - 1].cost + sub_cost, sub_op),
                    (prev[j].cost + 1, EditOp::Del),
                    (row[j - 1].cost + 1, EditOp::Ins),
                ];
                for (cost, op) in candidates {
                    if row[j].cost > cost {
                        row[j] = Cell { cost, op };
                    }
                }
            }

            fresh.push(row);
        }

        let (distance, trace) = {
            let row_at = |i: usize| row_of(&self.cache, &path, &fresh, i);

            let mut trace = Vec::with_capacity(n_hyp.max(n_ref));
            let (mut i, mut j) = (n_hyp, n_ref);
            while i > 0 || j > 0 {
                let op = row_at(i)[j].op;
                trace.push(op);
                match op {
                    EditOp::Nop | EditOp::Sub => {
                        i -= 1;
                        j -= 1;
                    }
                    EditOp::Ins => j -= 1,
                    EditOp::Del => i -= 1,
                    EditOp::Undefined => {
                        return Err(MetricError::UndefinedAlignment { row: i, col: j })
                    }
                }
            }
            trace.reverse();
            (row_at(n_hyp)[n_ref].cost as usize, trace)
        };

        let last = path[start];
        self.cache.extend(&hyp[start..], last, fresh);
        Ok((distance, trace))
    }
}

/// Row `i` of the matrix: cached up to the prefix length, freshly computed after
fn row_of<'a>(cache: &'a RowCache, path: &[usize], fresh: &'a [Row], i: usize) -> &'a [Cell] {
    let start = path.len() - 1;
    if i <= start {
        cache.row(path[i])
    } else {
        &fresh[i - start - 1]
    }
}
