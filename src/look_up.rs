use std::ops::ControlFlow;

#[cfg(feature = "rayon")]
use rayon::join;

use crate::order::{axis_less, contains};
use crate::{find_pivot, next_axis, KdSeq, Point};

/// A look-up region: a closed axis-aligned bounding box around an arbitrary
/// point predicate.
pub trait Query<P: Point> {
    /// The closed bounding box enclosing all matching points.
    fn aabb(&self) -> (&P, &P);

    /// Whether a point inside the bounding box actually matches.
    fn test(&self, point: &P) -> bool;
}

/// All points within a Euclidean distance of a center point.
#[derive(Debug)]
pub struct WithinDistance<const N: usize> {
    center: [f64; N],
    aabb: ([f64; N], [f64; N]),
    distance_2: f64,
}

impl<const N: usize> WithinDistance<N> {
    /// A query for all points within `distance` of `center`.
    pub fn new(center: [f64; N], distance: f64) -> Self {
        Self {
            aabb: (
                center.map(|coord| coord - distance),
                center.map(|coord| coord + distance),
            ),
            center,
            distance_2: distance.powi(2),
        }
    }
}

impl<const N: usize> Query<[f64; N]> for WithinDistance<N> {
    fn aabb(&self) -> (&[f64; N], &[f64; N]) {
        (&self.aabb.0, &self.aabb.1)
    }

    fn test(&self, point: &[f64; N]) -> bool {
        self.center.distance_2(point) <= self.distance_2
    }
}

impl<P, S> KdSeq<P, S>
where
    P: Point,
    S: AsRef<[P]>,
{
    /// Visit the positions of all points in the half-open box
    /// `[lower, upper)`, in descent order.
    ///
    /// Each qualifying position is emitted exactly once; the visitor may
    /// stop the traversal early by returning [`ControlFlow::Break`].
    /// Callers that need sorted output must sort the emitted positions.
    pub fn range_query<V>(&self, lower: &P, upper: &P, mut visitor: V)
    where
        V: FnMut(usize) -> ControlFlow<()>,
    {
        let _ = range_query(self, 0, self.len(), 0, lower, upper, &mut visitor);
    }

    /// Visit the positions of all points matching `query`, in descent
    /// order.
    pub fn look_up<Q, V>(&self, query: &Q, mut visitor: V)
    where
        Q: Query<P>,
        V: FnMut(usize) -> ControlFlow<()>,
    {
        let _ = look_up(self, 0, self.len(), 0, query, &mut visitor);
    }

    #[cfg(feature = "rayon")]
    /// [`look_up`](KdSeq::look_up) visiting the two subtrees of every level
    /// in parallel.
    ///
    /// Requires the `rayon` feature; the visitor runs concurrently and is
    /// therefore not offered early termination.
    pub fn par_look_up<Q, V>(&self, query: &Q, visitor: V)
    where
        P: Sync,
        Q: Query<P> + Sync,
        V: Fn(usize) + Sync,
    {
        par_look_up(self, 0, self.len(), 0, query, &visitor);
    }
}

fn range_query<P, V>(
    points: &[P],
    mut first: usize,
    last: usize,
    mut axis: usize,
    lower: &P,
    upper: &P,
    visitor: &mut V,
) -> ControlFlow<()>
where
    P: Point,
    V: FnMut(usize) -> ControlFlow<()>,
{
    loop {
        match last - first {
            0 => return ControlFlow::Continue(()),
            1 => {
                if contains(&points[first], lower, upper) {
                    visitor(first)?;
                }

                return ControlFlow::Continue(());
            }
            _ => {}
        }

        let pivot = find_pivot(points, first, last, axis);
        let next = next_axis::<P>(axis);

        if contains(&points[pivot], lower, upper) {
            visitor(pivot)?;
        }

        if !axis_less(&points[pivot], lower, axis) {
            range_query(points, first, pivot, next, lower, upper, visitor)?;
        }

        if !axis_less(&points[pivot], upper, axis) {
            return ControlFlow::Continue(());
        }

        first = pivot + 1;
        axis = next;
    }
}

fn in_aabb<P: Point>(point: &P, lower: &P, upper: &P) -> bool {
    (0..P::DIM).all(|axis| !axis_less(point, lower, axis) && !axis_less(upper, point, axis))
}

fn look_up<P, Q, V>(
    points: &[P],
    mut first: usize,
    last: usize,
    mut axis: usize,
    query: &Q,
    visitor: &mut V,
) -> ControlFlow<()>
where
    P: Point,
    Q: Query<P>,
    V: FnMut(usize) -> ControlFlow<()>,
{
    loop {
        let (lower, upper) = query.aabb();

        match last - first {
            0 => return ControlFlow::Continue(()),
            1 => {
                let point = &points[first];

                if in_aabb(point, lower, upper) && query.test(point) {
                    visitor(first)?;
                }

                return ControlFlow::Continue(());
            }
            _ => {}
        }

        let pivot = find_pivot(points, first, last, axis);
        let next = next_axis::<P>(axis);
        let point = &points[pivot];

        if in_aabb(point, lower, upper) && query.test(point) {
            visitor(pivot)?;
        }

        if !axis_less(point, lower, axis) {
            look_up(points, first, pivot, next, query, visitor)?;
        }

        if axis_less(upper, point, axis) {
            return ControlFlow::Continue(());
        }

        first = pivot + 1;
        axis = next;
    }
}

#[cfg(feature = "rayon")]
fn par_look_up<P, Q, V>(
    points: &[P],
    first: usize,
    last: usize,
    axis: usize,
    query: &Q,
    visitor: &V,
) where
    P: Point + Sync,
    Q: Query<P> + Sync,
    V: Fn(usize) + Sync,
{
    let (lower, upper) = query.aabb();

    match last - first {
        0 => return,
        1 => {
            let point = &points[first];

            if in_aabb(point, lower, upper) && query.test(point) {
                visitor(first);
            }

            return;
        }
        _ => {}
    }

    let pivot = find_pivot(points, first, last, axis);
    let next = next_axis::<P>(axis);
    let point = &points[pivot];

    if in_aabb(point, lower, upper) && query.test(point) {
        visitor(pivot);
    }

    join(
        || {
            if !axis_less(point, lower, axis) {
                par_look_up(points, first, pivot, next, query, visitor);
            }
        },
        || {
            if !axis_less(upper, point, axis) {
                par_look_up(points, pivot + 1, last, next, query, visitor);
            }
        },
    );
}
