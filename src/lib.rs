#![deny(missing_docs)]

//! In-place k-d ordering and search over sequences of fixed-arity numeric
//! tuples.
//!
//! [`kd_sort`] permutes a caller-owned sequence into an implicit balanced
//! k-d tree whose structure is defined purely by element order: no per-node
//! links, no allocation beyond the sequence itself. [`KdSeq`] wraps sorted
//! storage and answers membership, nearest-neighbor and axis-aligned range
//! queries by recursive descent over half-open subranges, returning
//! positions into the sequence.
//!
//! ```
//! use core::ops::ControlFlow;
//!
//! use kd_seq::KdSeq;
//!
//! let seq = KdSeq::new(vec![[0.0, 0.0], [1.0, 2.0], [2.0, 1.0]]);
//!
//! let nearest = seq.nearest(&[1.1, 1.9]).unwrap();
//! assert_eq!(seq[nearest], [1.0, 2.0]);
//!
//! let mut in_box = Vec::new();
//! seq.range_query(&[0.5, 0.5], &[2.5, 2.5], |position| {
//!     in_box.push(seq[position]);
//!     ControlFlow::Continue(())
//! });
//! assert_eq!(in_box.len(), 2);
//! ```

mod bound;
mod look_up;
mod nearest;
mod order;
mod sort;

pub use look_up::{Query, WithinDistance};
pub use order::{all_less, contains, kd_cmp, kd_cmp_by, l2_dist, none_less, sum_of_squares};
#[cfg(feature = "rayon")]
pub use sort::{kd_sort_threaded, SortPoolError};
pub use sort::{kd_sort, kd_sort_by, lex_sort, lex_sort_by};

use std::cmp::Ordering;
use std::marker::PhantomData;
use std::ops::Deref;

use num_traits::ToPrimitive;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::order::axis_less;

/// A tuple component: totally ordered and able to measure a signed offset to
/// another value of the same type as a floating quantity.
///
/// A blanket implementation covers all numeric primitives. Comparing
/// non-finite floating values panics, as does a value outside the range of
/// `f64`.
pub trait Coord: Copy {
    /// Compare two component values.
    fn order(&self, other: &Self) -> Ordering;

    /// The signed offset `self - other` as a floating quantity.
    fn offset(&self, other: &Self) -> f64;
}

impl<C> Coord for C
where
    C: Copy + PartialOrd + ToPrimitive,
{
    fn order(&self, other: &Self) -> Ordering {
        self.partial_cmp(other).unwrap()
    }

    fn offset(&self, other: &Self) -> f64 {
        self.to_f64().unwrap() - other.to_f64().unwrap()
    }
}

/// A fixed-arity tuple of [`Coord`] components.
///
/// Implemented for arrays of a single component type and for tuples of arity
/// up to eight whose components may differ per axis.
pub trait Point: Sized {
    /// The number of axes.
    const DIM: usize;

    /// Compare `self` and `other` on the given axis.
    fn cmp_axis(&self, other: &Self, axis: usize) -> Ordering;

    /// The signed offset between `self` and `other` on the given axis.
    fn offset_axis(&self, other: &Self, axis: usize) -> f64;

    /// The squared Euclidean distance between `self` and `other` over all
    /// axes.
    fn distance_2(&self, other: &Self) -> f64 {
        (0..Self::DIM)
            .map(|axis| {
                let offset = self.offset_axis(other, axis);
                offset * offset
            })
            .sum()
    }
}

impl<C: Coord, const N: usize> Point for [C; N] {
    const DIM: usize = N;

    fn cmp_axis(&self, other: &Self, axis: usize) -> Ordering {
        self[axis].order(&other[axis])
    }

    fn offset_axis(&self, other: &Self, axis: usize) -> f64 {
        self[axis].offset(&other[axis])
    }
}

macro_rules! impl_point_for_tuples {
    ($($len:expr => ($($idx:tt $c:ident),+);)+) => {
        $(
            impl<$($c: Coord),+> Point for ($($c,)+) {
                const DIM: usize = $len;

                fn cmp_axis(&self, other: &Self, axis: usize) -> Ordering {
                    match axis {
                        $($idx => self.$idx.order(&other.$idx),)+
                        _ => panic!("axis {} out of bounds", axis),
                    }
                }

                fn offset_axis(&self, other: &Self, axis: usize) -> f64 {
                    match axis {
                        $($idx => self.$idx.offset(&other.$idx),)+
                        _ => panic!("axis {} out of bounds", axis),
                    }
                }
            }
        )+
    };
}

impl_point_for_tuples! {
    1 => (0 A);
    2 => (0 A, 1 B);
    3 => (0 A, 1 B, 2 C);
    4 => (0 A, 1 B, 2 C, 3 D);
    5 => (0 A, 1 B, 2 C, 3 D, 4 E);
    6 => (0 A, 1 B, 2 C, 3 D, 4 E, 5 F);
    7 => (0 A, 1 B, 2 C, 3 D, 4 E, 5 F, 6 G);
    8 => (0 A, 1 B, 2 C, 3 D, 4 E, 5 F, 6 G, 7 H);
}

/// A sequence of points in k-d order.
///
/// Constructed by sorting caller-owned storage via [`KdSeq::new`] or
/// [`KdSeq::par_new`], or wrapped around externally ordered storage via
/// [`KdSeq::from_sorted`]. All queries are read-only and return positions
/// into the sequence; the sequence itself is reachable through `Deref`.
#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(bound(serialize = "S: Serialize", deserialize = "S: Deserialize<'de>"))
)]
pub struct KdSeq<P, S> {
    points: S,
    _marker: PhantomData<P>,
}

impl<P, S> KdSeq<P, S> {
    /// Wrap storage which is already in k-d order.
    ///
    /// This is the entry point for storage ordered externally, e.g. by
    /// [`kd_sort_threaded`] or [`kd_sort_by`]. Queries assume the invariant
    /// established by [`kd_sort`]; wrapping storage ordered any other way
    /// yields in-range but meaningless positions.
    pub fn from_sorted(points: S) -> Self {
        Self {
            points,
            _marker: PhantomData,
        }
    }

    /// Return the underlying storage.
    pub fn into_inner(self) -> S {
        self.points
    }
}

impl<P, S: AsRef<[P]>> Deref for KdSeq<P, S> {
    type Target = [P];

    fn deref(&self) -> &Self::Target {
        self.points.as_ref()
    }
}

pub(crate) fn midpos(first: usize, last: usize) -> usize {
    first + (last - first) / 2
}

pub(crate) fn next_axis<P: Point>(axis: usize) -> usize {
    (axis + 1) % P::DIM
}

/// The discriminator of a range in k-d order at `axis`: the leftmost
/// position tied with the median on that axis.
pub(crate) fn find_pivot<P: Point>(points: &[P], first: usize, last: usize, axis: usize) -> usize {
    let mid = midpos(first, last);

    first + points[first..mid].partition_point(|x| axis_less(x, &points[mid], axis))
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    use std::ops::ControlFlow;

    use proptest::{collection::vec, prelude::*, strategy::Strategy};

    pub(crate) fn random_points(len: usize) -> impl Strategy<Value = Vec<[f64; 2]>> {
        vec(prop::array::uniform2(0.0f64..=1.0), len)
    }

    #[test]
    fn arrays_and_tuples_agree_per_axis() {
        let a = [1.0, 4.0, 9.0];
        let b = [2.0, 4.0, 3.0];
        let ta = (1.0, 4.0, 9.0);
        let tb = (2.0, 4.0, 3.0);

        for axis in 0..3 {
            assert_eq!(a.cmp_axis(&b, axis), ta.cmp_axis(&tb, axis));
            assert_eq!(a.offset_axis(&b, axis), ta.offset_axis(&tb, axis));
        }

        assert_eq!(a.distance_2(&b), ta.distance_2(&tb));
    }

    #[test]
    fn heterogeneous_tuple_components() {
        let a = (1u8, -3i32, 0.5f64);
        let b = (2u8, -3i32, 0.25f64);

        assert_eq!(a.cmp_axis(&b, 0), Ordering::Less);
        assert_eq!(a.cmp_axis(&b, 1), Ordering::Equal);
        assert_eq!(a.cmp_axis(&b, 2), Ordering::Greater);
        assert_eq!(a.offset_axis(&b, 0), -1.0);
        assert_eq!(a.offset_axis(&b, 2), 0.25);
    }

    #[test]
    fn integer_offsets_do_not_wrap() {
        let a = (1u32, 1u32);
        let b = (3u32, 1u32);

        assert_eq!(a.offset_axis(&b, 0), -2.0);
        assert_eq!(a.distance_2(&b), 4.0);
    }

    proptest! {
        #[test]
        fn sorted_sequence_answers_queries(
            points in random_points(100),
            targets in random_points(10),
        ) {
            let seq = KdSeq::new(points);

            for target in targets {
                let brute = seq
                    .iter()
                    .enumerate()
                    .min_by(|(_, lhs), (_, rhs)| {
                        let lhs = lhs.distance_2(&target);
                        let rhs = rhs.distance_2(&target);

                        lhs.partial_cmp(&rhs).unwrap()
                    })
                    .map(|(position, _)| position)
                    .unwrap();

                let nearest = seq.nearest(&target).unwrap();
                prop_assert_eq!(seq[nearest], seq[brute]);

                let lower = target.map(|coord| coord - 0.25);
                let upper = target.map(|coord| coord + 0.25);

                let mut results1 = Vec::new();
                seq.range_query(&lower, &upper, |position| {
                    results1.push(position);
                    ControlFlow::Continue(())
                });

                let results2 = seq
                    .iter()
                    .enumerate()
                    .filter(|(_, point)| contains(*point, &lower, &upper))
                    .map(|(position, _)| position)
                    .collect::<Vec<_>>();

                results1.sort_unstable();
                prop_assert_eq!(results1, results2);
            }
        }
    }
}
