//! Time-tagged points.

use crate::geom::ArcPoint;
use crate::num::RootOf2;
use crate::site::SiteId;
use std::cmp::Ordering;

/// An unordered site pair, stored as `(min, max)`.
pub type PairId = (SiteId, SiteId);

/// Normalizes two site ids into a [`PairId`].
pub fn pair_id(a: SiteId, b: SiteId) -> PairId {
    if a <= b { (a, b) } else { (b, a) }
}

/// Role of a transit point on a bisector.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PointRole {
    Generic,
    Transit,
    Collision,
    Domination,
}

/// A point together with the squared time at which the wavefront
/// reaches it. Ordered by time, then position; equality is positional
/// and temporal, never identity.
#[derive(Clone, Debug)]
pub struct TimePoint {
    pub pnt: ArcPoint,
    pub sqrd_time: RootOf2,
}

impl TimePoint {
    pub fn new(pnt: ArcPoint, sqrd_time: RootOf2) -> Self {
        Self { pnt, sqrd_time }
    }
}

impl PartialEq for TimePoint {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for TimePoint {}

impl PartialOrd for TimePoint {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for TimePoint {
    fn cmp(&self, other: &Self) -> Ordering {
        self.sqrd_time
            .cmp(&other.sqrd_time)
            .then_with(|| self.pnt.cmp(&other.pnt))
    }
}

/// A distinguished point on a bisector: where the two sites collide,
/// or where one starts to dominate the other.
#[derive(Clone, Debug)]
pub struct TransitPoint {
    pub pnt: ArcPoint,
    pub sqrd_time: RootOf2,
    pub pair: PairId,
    pub role: PointRole,
}

impl TransitPoint {
    pub fn new(pnt: ArcPoint, sqrd_time: RootOf2, pair: PairId, role: PointRole) -> Self {
        Self {
            pnt,
            sqrd_time,
            pair,
            role,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geom::Point;
    use crate::num::RootOf2;

    fn tp(x: i64, y: i64, t: i64) -> TimePoint {
        TimePoint::new(Point::from_ints(x, y).to_arc_point(), RootOf2::from_int(t))
    }

    #[test]
    fn ordered_by_time_then_position() {
        assert!(tp(9, 9, 1) < tp(0, 0, 2));
        assert!(tp(1, 0, 5) < tp(2, 0, 5));
        assert_eq!(tp(3, 4, 5), tp(3, 4, 5));
    }

    #[test]
    fn pair_ids_are_normalized() {
        assert_eq!(pair_id(7, 2), (2, 7));
        assert_eq!(pair_id(2, 7), (2, 7));
    }
}
