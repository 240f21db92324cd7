use std::cmp::Ordering;
#[cfg(feature = "rayon")]
use std::num::NonZeroUsize;
#[cfg(feature = "rayon")]
use std::thread::available_parallelism;

#[cfg(feature = "rayon")]
use rayon::{join, ThreadPoolBuilder};
#[cfg(feature = "rayon")]
use thiserror::Error;

use crate::order::{kd_cmp, kd_cmp_by};
use crate::{next_axis, KdSeq, Point};

impl<P, S> KdSeq<P, S>
where
    P: Point,
    S: AsRef<[P]> + AsMut<[P]>,
{
    /// Construct a sequence in k-d order by sorting the given storage.
    pub fn new(mut points: S) -> Self {
        kd_sort(points.as_mut());

        Self::from_sorted(points)
    }

    #[cfg(feature = "rayon")]
    /// Construct a sequence in k-d order by sorting the given storage, in
    /// parallel.
    ///
    /// Requires the `rayon` feature and dispatches tasks into the current
    /// [thread pool][rayon::ThreadPool]. Task fan-out is gated so that
    /// roughly one live task per pool thread exists at any time.
    pub fn par_new(mut points: S) -> Self
    where
        P: Send,
    {
        let max_tasks = rayon::current_num_threads();

        par_sort(points.as_mut(), 0, 0, max_tasks);

        Self::from_sorted(points)
    }
}

/// Sort `points` into k-d order.
///
/// After this, every recursive half-open subrange is split by the median
/// under the [cyclic order](crate::kd_cmp) of its level's axis, with full
/// ties adjacent to the left of the median. Queries on [`KdSeq`] rely on
/// exactly this layout.
pub fn kd_sort<P: Point>(points: &mut [P]) {
    sort(points, 0, &kd_cmp::<P>);
}

/// Sort `points` into k-d order under a caller-supplied per-axis comparator.
///
/// `cmp` must order each axis totally. The resulting layout satisfies the
/// k-d order invariants with `cmp` in place of the natural component order;
/// wrap it via [`KdSeq::from_sorted`] only if `cmp` agrees with that order.
pub fn kd_sort_by<P, F>(points: &mut [P], cmp: F)
where
    P: Point,
    F: Fn(&P, &P, usize) -> Ordering,
{
    let order = |lhs: &P, rhs: &P, axis: usize| kd_cmp_by(lhs, rhs, axis, &cmp);

    sort(points, 0, &order);
}

/// Sort `points` lexicographically, i.e. under the cyclic order from axis 0.
pub fn lex_sort<P: Point>(points: &mut [P]) {
    points.sort_unstable_by(|lhs, rhs| kd_cmp(lhs, rhs, 0));
}

/// [`lex_sort`] with a caller-supplied per-axis comparator.
pub fn lex_sort_by<P, F>(points: &mut [P], cmp: F)
where
    P: Point,
    F: Fn(&P, &P, usize) -> Ordering,
{
    points.sort_unstable_by(|lhs, rhs| kd_cmp_by(lhs, rhs, 0, &cmp));
}

#[cfg(feature = "rayon")]
/// Error returned by [`kd_sort_threaded`] when the dedicated thread pool
/// cannot be created.
#[derive(Debug, Error)]
#[error("failed to create sorting thread pool")]
pub struct SortPoolError(#[from] rayon::ThreadPoolBuildError);

#[cfg(feature = "rayon")]
/// Sort `points` into k-d order using up to `max_threads` threads.
///
/// A dedicated pool of `max_threads` threads (default: available
/// parallelism) runs the same recursion as [`kd_sort`], spawning one task
/// for the right half of a range while the current task sorts the left
/// half, until `2^depth` reaches the thread budget. A budget of one falls
/// back to the serial sort. If the pool cannot be created the sequence is
/// left unmodified and the error is returned.
pub fn kd_sort_threaded<P>(
    points: &mut [P],
    max_threads: Option<NonZeroUsize>,
) -> Result<(), SortPoolError>
where
    P: Point + Send,
{
    let max_threads = max_threads
        .or_else(|| available_parallelism().ok())
        .map_or(1, NonZeroUsize::get);

    if max_threads <= 1 {
        sort(points, 0, &kd_cmp::<P>);

        return Ok(());
    }

    let pool = ThreadPoolBuilder::new().num_threads(max_threads).build()?;

    pool.install(|| par_sort(points, 0, 0, max_threads));

    Ok(())
}

fn sort<P, F>(points: &mut [P], axis: usize, order: &F)
where
    P: Point,
    F: Fn(&P, &P, usize) -> Ordering,
{
    if points.len() <= 1 {
        return;
    }

    let (left, right, next_axis) = sort_axis(points, axis, order);

    sort(left, next_axis, order);
    sort(right, next_axis, order);
}

#[cfg(feature = "rayon")]
fn par_sort<P>(points: &mut [P], axis: usize, depth: usize, max_tasks: usize)
where
    P: Point + Send,
{
    if points.len() <= 1 {
        return;
    }

    let (left, right, next_axis) = sort_axis(points, axis, &kd_cmp::<P>);

    if (1 << depth) < max_tasks {
        join(
            || par_sort(left, next_axis, depth + 1, max_tasks),
            || par_sort(right, next_axis, depth + 1, max_tasks),
        );
    } else {
        sort(left, next_axis, &kd_cmp::<P>);
        sort(right, next_axis, &kd_cmp::<P>);
    }
}

fn sort_axis<'a, P, F>(
    points: &'a mut [P],
    axis: usize,
    order: &F,
) -> (&'a mut [P], &'a mut [P], usize)
where
    P: Point,
    F: Fn(&P, &P, usize) -> Ordering,
{
    let mid = points.len() / 2;

    points.select_nth_unstable_by(mid, |lhs, rhs| order(lhs, rhs, axis));

    let (left, rest) = points.split_at_mut(mid);

    // Full ties end up adjacent to the left of the median, which lets the
    // descent recover the discriminator by binary search.
    let split = partition(left, |x| order(x, &rest[0], axis) == Ordering::Less);

    (&mut left[..split], &mut rest[1..], next_axis::<P>(axis))
}

fn partition<P>(points: &mut [P], mut pred: impl FnMut(&P) -> bool) -> usize {
    let mut split = 0;

    for index in 0..points.len() {
        if pred(&points[index]) {
            points.swap(split, index);
            split += 1;
        }
    }

    split
}
