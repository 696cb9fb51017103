//! Pairwise combination of work items.
//!
//! The scheduler treats a [`Combiner`] as opaque apart from
//! [`Combiner::output_len`], which it needs before the result arrives so the
//! receive side can be sized and checked.

use crate::work::{Coefficient, WorkItem};

/// A pure function merging two work items into one.
pub trait Combiner: Send + Sync {
    /// Combine `a` and `b` into a new item.
    fn combine(&self, a: &[Coefficient], b: &[Coefficient]) -> WorkItem;

    /// Length of `combine(a, b)` given only the operand lengths.
    fn output_len(&self, len_a: usize, len_b: usize) -> usize;
}

/// Discrete convolution: polynomial multiplication on coefficient vectors.
///
/// `out[k] = Σ a[i] * b[k - i]`. Arithmetic wraps on overflow, so results are
/// exact modulo 2^64 and the operation stays associative and commutative.
#[derive(Debug, Clone, Copy, Default)]
pub struct Convolution;

impl Combiner for Convolution {
    fn combine(&self, a: &[Coefficient], b: &[Coefficient]) -> WorkItem {
        let mut out: Vec<Coefficient> = vec![0; self.output_len(a.len(), b.len())];
        for (i, &x) in a.iter().enumerate() {
            for (j, &y) in b.iter().enumerate() {
                out[i + j] = out[i + j].wrapping_add(x.wrapping_mul(y));
            }
        }
        WorkItem::new(out)
    }

    fn output_len(&self, len_a: usize, len_b: usize) -> usize {
        if len_a == 0 || len_b == 0 {
            0
        } else {
            len_a + len_b - 1
        }
    }
}

/// Fold `items` left to right with `combiner`; the sequential reference result.
///
/// Returns `None` for an empty slice.
pub fn fold_sequential<C: Combiner + ?Sized>(combiner: &C, items: &[WorkItem]) -> Option<WorkItem> {
    let (first, rest) = items.split_first()?;
    Some(rest.iter().fold(first.clone(), |acc, item| {
        combiner.combine(acc.coefficients(), item.coefficients())
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn conv(a: &[i64], b: &[i64]) -> Vec<i64> {
        Convolution.combine(a, b).into_coefficients()
    }

    #[test]
    fn combine_linear_factors() {
        assert_eq!(conv(&[1, 2], &[1, 3]), vec![1, 5, 6]);
    }

    #[test]
    fn combine_constants() {
        assert_eq!(conv(&[5], &[7]), vec![35]);
    }

    #[test]
    fn combine_is_commutative() {
        let a = [3, -1, 4, 1];
        let b = [-5, 9, 2];
        assert_eq!(conv(&a, &b), conv(&b, &a));
    }

    #[test]
    fn combine_is_associative() {
        let a = [1, 2];
        let b = [-3, 0, 1];
        let c = [4, 4];
        let left = conv(&conv(&a, &b), &c);
        let right = conv(&a, &conv(&b, &c));
        assert_eq!(left, right);
    }

    #[test]
    fn output_len_matches_combine() {
        for (la, lb) in [(1, 1), (2, 3), (5, 1), (4, 4)] {
            let a = vec![1; la];
            let b = vec![1; lb];
            assert_eq!(Convolution.combine(&a, &b).len(), Convolution.output_len(la, lb));
        }
    }

    #[test]
    fn empty_operand_yields_empty_item() {
        assert!(conv(&[], &[1, 2]).is_empty());
        assert_eq!(Convolution.output_len(0, 3), 0);
    }

    #[test]
    fn overflow_wraps() {
        let out = conv(&[i64::MAX], &[2]);
        assert_eq!(out, vec![i64::MAX.wrapping_mul(2)]);
    }

    #[test]
    fn fold_sequential_multiplies_all() {
        let items = vec![
            WorkItem::new(vec![1, 1]),
            WorkItem::new(vec![1, 1]),
            WorkItem::new(vec![1, 1]),
        ];
        let folded = fold_sequential(&Convolution, &items).unwrap();
        assert_eq!(folded.coefficients(), &[1, 3, 3, 1]);
        assert!(fold_sequential(&Convolution, &[]).is_none());
    }
}
