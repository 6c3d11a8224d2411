//! Monoid abstraction for sufficient statistics
//!
//! Every metric reduces a corpus to integer statistics that can be added
//! segment by segment. Expressing them as a monoid makes corpus scoring,
//! sentence caching and resampling share one summation path: the statistics
//! of a corpus equal the combination of the statistics of any partition.

use smallvec::SmallVec;

/// An associative combine operation with an identity element
///
/// Implementations must satisfy:
/// - Associativity: `a.combine(&b).combine(&c) == a.combine(&b.combine(&c))`
/// - Identity: `a.combine(&Self::identity()) == a`
pub trait Monoid: Clone + Send + Sync {
    /// Returns the identity element (statistics of an empty corpus)
    fn identity() -> Self;

    /// Combines two elements
    fn combine(&self, other: &Self) -> Self;

    /// Adds `other` into `self`; accumulating loops use this form
    fn combine_assign(&mut self, other: &Self) {
        *self = self.combine(other);
    }
}

/// Extension trait for monoids that can be reduced from collections
pub trait MonoidReduce: Monoid {
    /// Reduces a collection of elements to a single result
    ///
    /// Uses tree reduction to keep the combine depth logarithmic.
    fn reduce<I>(iter: I) -> Self
    where
        I: IntoIterator<Item = Self>,
    {
        let mut items: SmallVec<[Self; 16]> = iter.into_iter().collect();

        while items.len() > 1 {
            let mut next_level = SmallVec::<[Self; 16]>::with_capacity(items.len() / 2 + 1);
            for pair in items.chunks(2) {
                match pair {
                    [left, right] => next_level.push(left.combine(right)),
                    [single] => next_level.push(single.clone()),
                    _ => {}
                }
            }

            items = next_level;
        }

        items.into_iter().next().unwrap_or_else(Self::identity)
    }

    /// Sums the elements selected by `indices`, in index order
    fn sum_indexed(items: &[Self], indices: &[usize]) -> Self {
        let mut acc = Self::identity();
        for &i in indices {
            acc.combine_assign(&items[i]);
        }
        acc
    }
}

impl<T: Monoid> MonoidReduce for T {}
