use std::ops::Range;

use crate::order::{all_less, none_less};
use crate::{find_pivot, next_axis, KdSeq, Point};

impl<P, S> KdSeq<P, S>
where
    P: Point,
    S: AsRef<[P]>,
{
    /// The leftmost position whose point is greater than or equal to `value`
    /// on every axis, or `len()` if there is none.
    ///
    /// The bound is taken under the componentwise partial order, not the
    /// total lexicographic order; together with
    /// [`upper_bound`](KdSeq::upper_bound) it supports membership tests
    /// modulo componentwise equality.
    pub fn lower_bound(&self, value: &P) -> usize {
        lower_bound(self, 0, self.len(), 0, value)
    }

    /// The leftmost position whose point is strictly greater than `value`
    /// on every axis, or `len()` if there is none.
    pub fn upper_bound(&self, value: &P) -> usize {
        upper_bound(self, 0, self.len(), 0, value)
    }

    /// The pair of [`lower_bound`](KdSeq::lower_bound) and
    /// [`upper_bound`](KdSeq::upper_bound) as a position range.
    pub fn equal_range(&self, value: &P) -> Range<usize> {
        self.lower_bound(value)..self.upper_bound(value)
    }

    /// Whether the sequence holds a point componentwise equal to `value`.
    pub fn contains_point(&self, value: &P) -> bool {
        let position = self.lower_bound(value);

        position != self.len() && none_less(value, &self[position])
    }
}

fn lower_bound<P: Point>(points: &[P], first: usize, last: usize, axis: usize, value: &P) -> usize {
    if last - first <= 1 {
        return if first < last && none_less(&points[first], value) {
            first
        } else {
            last
        };
    }

    let pivot = find_pivot(points, first, last, axis);
    let next = next_axis::<P>(axis);

    // A qualifying pivot bounds the answer from the right, a pivot below
    // `value` on every axis rules out the left subtree entirely.
    if none_less(&points[pivot], value) {
        return lower_bound(points, first, pivot, next, value);
    }

    if all_less(&points[pivot], value) {
        return lower_bound(points, pivot + 1, last, next, value);
    }

    let candidate = lower_bound(points, first, pivot, next, value);

    if candidate < pivot && none_less(&points[candidate], value) {
        return candidate;
    }

    let candidate = lower_bound(points, pivot + 1, last, next, value);

    if candidate < last && none_less(&points[candidate], value) {
        return candidate;
    }

    last
}

fn upper_bound<P: Point>(points: &[P], first: usize, last: usize, axis: usize, value: &P) -> usize {
    if last - first <= 1 {
        return if first < last && all_less(value, &points[first]) {
            first
        } else {
            last
        };
    }

    let pivot = find_pivot(points, first, last, axis);
    let next = next_axis::<P>(axis);

    if all_less(value, &points[pivot]) {
        return upper_bound(points, first, pivot, next, value);
    }

    if none_less(value, &points[pivot]) {
        return upper_bound(points, pivot + 1, last, next, value);
    }

    let candidate = upper_bound(points, first, pivot, next, value);

    if candidate < pivot && all_less(value, &points[candidate]) {
        return candidate;
    }

    let candidate = upper_bound(points, pivot + 1, last, next, value);

    if candidate < last && all_less(value, &points[candidate]) {
        return candidate;
    }

    last
}

#[cfg(test)]
mod tests {
    use super::*;

    use proptest::test_runner::TestRunner;

    use crate::tests::random_points;

    #[test]
    fn membership_by_componentwise_equality() {
        let seq = KdSeq::new(vec![
            (0, 0, 0),
            (1, 0, 0),
            (0, 1, 0),
            (0, 0, 1),
            (1, 1, 1),
        ]);

        assert!(seq.contains_point(&(0, 1, 0)));
        assert!(seq.contains_point(&(1, 1, 1)));
        assert!(!seq.contains_point(&(1, 1, 0)));
        assert!(!seq.contains_point(&(2, 0, 0)));
    }

    #[test]
    fn bounds_on_empty_and_singleton_sequences() {
        let empty = KdSeq::<[f64; 2], _>::new(Vec::new());

        assert_eq!(empty.lower_bound(&[0.0, 0.0]), 0);
        assert_eq!(empty.upper_bound(&[0.0, 0.0]), 0);
        assert_eq!(empty.equal_range(&[0.0, 0.0]), 0..0);
        assert!(!empty.contains_point(&[0.0, 0.0]));

        let one = KdSeq::new(vec![[2.0, 3.0]]);

        assert_eq!(one.lower_bound(&[2.0, 3.0]), 0);
        assert_eq!(one.lower_bound(&[2.5, 3.0]), 1);
        assert_eq!(one.upper_bound(&[1.0, 1.0]), 0);
        assert_eq!(one.upper_bound(&[2.0, 3.0]), 1);
        assert!(one.contains_point(&[2.0, 3.0]));
    }

    #[test]
    fn random_bounds_match_linear_scans() {
        TestRunner::default()
            .run(
                &(random_points(100), random_points(20)),
                |(points, targets)| {
                    let seq = KdSeq::new(points);

                    for target in targets {
                        let expected = seq
                            .iter()
                            .position(|point| none_less(point, &target))
                            .unwrap_or(seq.len());

                        assert_eq!(seq.lower_bound(&target), expected);

                        let expected = seq
                            .iter()
                            .position(|point| all_less(&target, point))
                            .unwrap_or(seq.len());

                        assert_eq!(seq.upper_bound(&target), expected);
                    }

                    Ok(())
                },
            )
            .unwrap();
    }

    #[test]
    fn random_membership_matches_linear_scans() {
        TestRunner::default()
            .run(&random_points(100), |points| {
                let seq = KdSeq::new(points.clone());

                for target in points.iter().take(10) {
                    assert!(seq.contains_point(target));
                }

                for target in [[2.0, 2.0], [-1.0, 0.5], [0.5, -1.0]] {
                    let expected = seq
                        .iter()
                        .any(|point| none_less(&target, point) && none_less(point, &target));

                    assert_eq!(seq.contains_point(&target), expected);
                }

                Ok(())
            })
            .unwrap();
    }
}
