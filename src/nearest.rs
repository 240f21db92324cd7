use std::cmp::Ordering;
use std::collections::BinaryHeap;

use crate::order::{axis_less, l2_dist};
use crate::{find_pivot, next_axis, KdSeq, Point};

impl<P, S> KdSeq<P, S>
where
    P: Point,
    S: AsRef<[P]>,
{
    /// The position of a point at minimum Euclidean distance from `target`,
    /// or `None` if the sequence is empty.
    ///
    /// Any one minimizer may be returned when several points share the
    /// minimum distance.
    pub fn nearest(&self, target: &P) -> Option<usize> {
        if self.is_empty() {
            return None;
        }

        Some(nearest(self, 0, self.len(), 0, target))
    }

    /// [`nearest`](KdSeq::nearest) with an early-exit tolerance.
    ///
    /// A position within `eps` of `target` is returned as soon as it is
    /// seen, and subtree pruning is slackened by `eps`, so the returned
    /// distance is within `eps` of the true minimum. `eps == 0` recovers
    /// the exact semantics.
    pub fn approx_nearest(&self, target: &P, eps: f64) -> Option<usize> {
        if self.is_empty() {
            return None;
        }

        Some(approx_nearest(self, 0, self.len(), 0, target, eps))
    }

    /// The positions of the `n` points closest to `target`, in unspecified
    /// order.
    ///
    /// Fewer than `n` positions are returned only if the sequence is
    /// shorter than `n`.
    pub fn nearest_n(&self, target: &P, n: usize) -> Vec<usize> {
        if n == 0 {
            return Vec::new();
        }

        let mut best = NBest::new(n);

        knn(self, 0, self.len(), 0, target, &mut best);

        best.into_positions()
    }
}

fn nearest<P: Point>(points: &[P], first: usize, last: usize, axis: usize, target: &P) -> usize {
    if last - first <= 1 {
        return first;
    }

    let pivot = find_pivot(points, first, last, axis);
    let next = next_axis::<P>(axis);

    let go_left = axis_less(target, &points[pivot], axis);

    let mut best = if go_left {
        nearest(points, first, pivot, next, target)
    } else {
        nearest(points, pivot + 1, last, next, target)
    };

    let pivot_dist = l2_dist(&points[pivot], target);

    // An empty near side reports `last`; ties resolve toward the pivot.
    let best_dist = if best == last {
        best = pivot;
        pivot_dist
    } else {
        let dist = l2_dist(&points[best], target);

        if dist < pivot_dist {
            dist
        } else {
            best = pivot;
            pivot_dist
        }
    };

    if target.offset_axis(&points[pivot], axis).abs() < best_dist {
        let other = if go_left {
            nearest(points, pivot + 1, last, next, target)
        } else {
            nearest(points, first, pivot, next, target)
        };

        if other != last && l2_dist(&points[other], target) < best_dist {
            best = other;
        }
    }

    best
}

fn approx_nearest<P: Point>(
    points: &[P],
    first: usize,
    last: usize,
    axis: usize,
    target: &P,
    eps: f64,
) -> usize {
    if last - first <= 1 {
        return first;
    }

    let pivot = find_pivot(points, first, last, axis);
    let next = next_axis::<P>(axis);

    let pivot_dist = l2_dist(&points[pivot], target);

    if pivot_dist < eps {
        return pivot;
    }

    let go_left = axis_less(target, &points[pivot], axis);

    let mut best = if go_left {
        approx_nearest(points, first, pivot, next, target, eps)
    } else {
        approx_nearest(points, pivot + 1, last, next, target, eps)
    };

    let best_dist = if best == last {
        best = pivot;
        pivot_dist
    } else {
        let dist = l2_dist(&points[best], target);

        if dist < eps {
            return best;
        }

        if dist < pivot_dist {
            dist
        } else {
            best = pivot;
            pivot_dist
        }
    };

    if target.offset_axis(&points[pivot], axis).abs() < best_dist - eps {
        let other = if go_left {
            approx_nearest(points, pivot + 1, last, next, target, eps)
        } else {
            approx_nearest(points, first, pivot, next, target, eps)
        };

        if other != last && l2_dist(&points[other], target) < best_dist {
            best = other;
        }
    }

    best
}

struct Candidate {
    distance: f64,
    position: usize,
}

impl PartialEq for Candidate {
    fn eq(&self, other: &Self) -> bool {
        self.distance == other.distance
    }
}

impl Eq for Candidate {}

impl PartialOrd for Candidate {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Candidate {
    fn cmp(&self, other: &Self) -> Ordering {
        self.distance.total_cmp(&other.distance)
    }
}

/// Bounded queue of the closest positions seen so far, keyed by distance.
struct NBest {
    capacity: usize,
    heap: BinaryHeap<Candidate>,
}

impl NBest {
    fn new(capacity: usize) -> Self {
        Self {
            capacity,
            heap: BinaryHeap::with_capacity(capacity + 1),
        }
    }

    /// The largest retained distance; infinity while the queue is not yet
    /// full so that no subtree is pruned prematurely.
    fn worst(&self) -> f64 {
        if self.heap.len() < self.capacity {
            f64::INFINITY
        } else {
            self.heap
                .peek()
                .map_or(f64::INFINITY, |candidate| candidate.distance)
        }
    }

    fn add(&mut self, distance: f64, position: usize) {
        self.heap.push(Candidate { distance, position });

        if self.heap.len() > self.capacity {
            self.heap.pop();
        }
    }

    fn into_positions(self) -> Vec<usize> {
        self.heap
            .into_iter()
            .map(|candidate| candidate.position)
            .collect()
    }
}

fn knn<P: Point>(
    points: &[P],
    first: usize,
    last: usize,
    axis: usize,
    target: &P,
    best: &mut NBest,
) {
    match last - first {
        0 => return,
        1 => {
            best.add(l2_dist(&points[first], target), first);

            return;
        }
        _ => {}
    }

    let pivot = find_pivot(points, first, last, axis);
    let next = next_axis::<P>(axis);

    best.add(l2_dist(&points[pivot], target), pivot);

    let go_left = axis_less(target, &points[pivot], axis);

    if go_left {
        knn(points, first, pivot, next, target, best);
    } else {
        knn(points, pivot + 1, last, next, target, best);
    }

    // `<=` keeps candidates tied with the current worst admissible.
    if target.offset_axis(&points[pivot], axis).abs() <= best.worst() {
        if go_left {
            knn(points, pivot + 1, last, next, target, best);
        } else {
            knn(points, first, pivot, next, target, best);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use proptest::test_runner::TestRunner;
    use rand::{rngs::StdRng, Rng, SeedableRng};

    use crate::tests::random_points;

    #[test]
    fn nearest_on_the_diagonal() {
        let seq = KdSeq::new(vec![
            [1.0, 1.0],
            [2.0, 2.0],
            [3.0, 3.0],
            [4.0, 4.0],
            [5.0, 5.0],
        ]);

        let position = seq.nearest(&[2.1, 2.0]).unwrap();

        assert_eq!(seq[position], [2.0, 2.0]);
    }

    #[test]
    fn nearest_on_empty_and_duplicate_sequences() {
        let empty = KdSeq::<[f64; 2], _>::new(Vec::new());
        assert_eq!(empty.nearest(&[0.0, 0.0]), None);

        let duplicates = KdSeq::new(vec![[7.0, 7.0]; 8]);
        let position = duplicates.nearest(&[7.0, 7.0]).unwrap();

        assert!(position < 8);
        assert_eq!(duplicates[position], [7.0, 7.0]);
    }

    #[test]
    fn approximate_nearest_stays_within_the_tolerance() {
        let seq = KdSeq::new(vec![[0.0, 0.0], [10.0, 10.0]]);
        let exact = 50.0f64.sqrt();

        let position = seq.nearest(&[5.0, 5.0]).unwrap();
        assert_eq!(l2_dist(&seq[position], &[5.0, 5.0]), exact);

        let position = seq.approx_nearest(&[5.0, 5.0], 0.0).unwrap();
        assert_eq!(l2_dist(&seq[position], &[5.0, 5.0]), exact);

        let position = seq.approx_nearest(&[5.0, 5.0], 10.0).unwrap();
        assert!(l2_dist(&seq[position], &[5.0, 5.0]) <= exact + 10.0);
    }

    #[test]
    fn random_approximate_nearest_stays_within_the_tolerance() {
        TestRunner::default()
            .run(
                &(random_points(100), random_points(10)),
                |(points, targets)| {
                    let seq = KdSeq::new(points);

                    for target in targets {
                        let minimum = seq
                            .iter()
                            .map(|point| l2_dist(point, &target))
                            .fold(f64::INFINITY, f64::min);

                        for eps in [0.0, 0.05, 0.25] {
                            let position = seq.approx_nearest(&target, eps).unwrap();

                            assert!(l2_dist(&seq[position], &target) <= minimum + eps);
                        }
                    }

                    Ok(())
                },
            )
            .unwrap();
    }

    #[test]
    fn nearest_n_bounds_and_small_sequences() {
        let seq = KdSeq::new(vec![[0.0, 0.0], [1.0, 0.0], [0.0, 1.0]]);

        assert!(seq.nearest_n(&[0.0, 0.0], 0).is_empty());

        let mut all = seq.nearest_n(&[0.0, 0.0], 5);
        all.sort_unstable();
        assert_eq!(all, [0, 1, 2]);
    }

    #[test]
    fn nearest_n_matches_a_brute_force_scan() {
        let mut rng = StdRng::seed_from_u64(17);

        let points = (0..10_000)
            .map(|_| [rng.gen::<f64>(), rng.gen()])
            .collect::<Vec<[f64; 2]>>();

        let seq = KdSeq::new(points);

        for _ in 0..10 {
            let target = [rng.gen::<f64>(), rng.gen()];

            let mut by_distance = (0..seq.len()).collect::<Vec<_>>();
            by_distance.sort_unstable_by(|lhs, rhs| {
                let lhs = l2_dist(&seq[*lhs], &target);
                let rhs = l2_dist(&seq[*rhs], &target);

                lhs.partial_cmp(&rhs).unwrap()
            });

            let mut expected = by_distance[..5].to_vec();
            expected.sort_unstable();

            let mut positions = seq.nearest_n(&target, 5);
            positions.sort_unstable();

            assert_eq!(positions, expected);
        }
    }
}
