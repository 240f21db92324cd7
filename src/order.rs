use std::cmp::Ordering;

use crate::Point;

pub(crate) fn axis_less<P: Point>(lhs: &P, rhs: &P, axis: usize) -> bool {
    lhs.cmp_axis(rhs, axis) == Ordering::Less
}

/// Cyclic lexicographic order starting at the given axis.
///
/// Axes are visited in the order `axis`, `axis + 1`, ..., wrapping modulo
/// [`Point::DIM`]; the first axis on which the points differ decides. With
/// `axis == 0` this is the plain lexicographic order used by
/// [`lex_sort`](crate::lex_sort).
pub fn kd_cmp<P: Point>(lhs: &P, rhs: &P, axis: usize) -> Ordering {
    for step in 0..P::DIM {
        let axis = (axis + step) % P::DIM;

        match lhs.cmp_axis(rhs, axis) {
            Ordering::Equal => continue,
            decided => return decided,
        }
    }

    Ordering::Equal
}

/// [`kd_cmp`] with a caller-supplied per-axis comparator.
///
/// `cmp` must order each axis totally; it replaces the natural component
/// order everywhere, including the equality test that advances to the next
/// axis.
pub fn kd_cmp_by<P, F>(lhs: &P, rhs: &P, axis: usize, cmp: &F) -> Ordering
where
    P: Point,
    F: Fn(&P, &P, usize) -> Ordering,
{
    for step in 0..P::DIM {
        let axis = (axis + step) % P::DIM;

        match cmp(lhs, rhs, axis) {
            Ordering::Equal => continue,
            decided => return decided,
        }
    }

    Ordering::Equal
}

/// Whether `lhs` is strictly less than `rhs` on every axis.
pub fn all_less<P: Point>(lhs: &P, rhs: &P) -> bool {
    (0..P::DIM).all(|axis| lhs.cmp_axis(rhs, axis) == Ordering::Less)
}

/// Whether `lhs` is greater than or equal to `rhs` on every axis.
///
/// This is not the negation of [`all_less`]: both are false for points that
/// are less on one axis and greater on another.
pub fn none_less<P: Point>(lhs: &P, rhs: &P) -> bool {
    (0..P::DIM).all(|axis| lhs.cmp_axis(rhs, axis) != Ordering::Less)
}

/// Whether `point` lies in the half-open box `[lower, upper)`.
pub fn contains<P: Point>(point: &P, lower: &P, upper: &P) -> bool {
    none_less(point, lower) && all_less(point, upper)
}

/// The sum of squared per-axis offsets between `lhs` and `rhs`.
pub fn sum_of_squares<P: Point>(lhs: &P, rhs: &P) -> f64 {
    lhs.distance_2(rhs)
}

/// The Euclidean distance between `lhs` and `rhs`.
pub fn l2_dist<P: Point>(lhs: &P, rhs: &P) -> f64 {
    sum_of_squares(lhs, rhs).sqrt()
}
