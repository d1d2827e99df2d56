//! Weighted bisectors of site pairs.
//!
//! For two point sites of unequal weight the bisector under the
//! multiplicative metric is an Apollonius circle; for equal weights it
//! degenerates to the perpendicular bisector line. Either way it is
//! cut by the center line through the two sites into two trajectories,
//! and carries two transit points: the collision point (nearest mutual
//! arrival, where both trajectories begin) and the domination point
//! (where the heavier site's front has swallowed the lighter one).
//!
//! `site1` is always the greater site by `(weight, id)`. The center
//! line is oriented from `site2` to `site1`, and trajectory side 1
//! (`is_left`) is its positive side — the convention the offset-circle
//! arc bookkeeping depends on: walking the greater site's offset
//! circle counterclockwise from the pair's left intersection to its
//! right one crosses the portion facing the lesser site.

use crate::error::Error;
use crate::geom::{circle_line, Circle, Line, Point};
use crate::num::{rat, Rational, RootOf2};
use crate::site::Site;
use crate::time_point::{pair_id, PairId, PointRole, TransitPoint};
use crate::trajectory::{SectionCurve, TrajSection, Trajectory};
use num_traits::Signed;
use std::collections::BTreeMap;

/// Arena of bisectors, keyed by normalized site pair. Built lazily,
/// never evicted for the duration of a run.
pub type BisectorTable = BTreeMap<PairId, Bisector>;

/// Magnitude used for the nominal "infinite" reach of equal-weight
/// bisectors, and for their sentinel domination time.
const FAR: i64 = 1_000_000_000_000;

#[derive(Clone, Debug)]
pub struct Bisector {
    site1: Site,
    site2: Site,
    center_line: Line,
    trajs: [Trajectory; 2],
    coll: TransitPoint,
    dom: TransitPoint,
}

impl Bisector {
    /// Builds the bisector of two distinct sites. Fails only on a
    /// modeling error (the supporting curve must meet the center line
    /// in exactly two points).
    pub fn new(a: &Site, b: &Site) -> Result<Self, Error> {
        assert_ne!(a.id(), b.id(), "bisector of a site with itself");
        let (site1, site2) = if a < b {
            (b.clone(), a.clone())
        } else {
            (a.clone(), b.clone())
        };
        let center_line = Line::through(site2.center(), site1.center());

        if site1.weight() == site2.weight() {
            Ok(Self::equal_weight(site1, site2, center_line))
        } else {
            Self::apollonius(site1, site2, center_line)
        }
    }

    fn equal_weight(site1: Site, site2: Site, center_line: Line) -> Self {
        let pair = pair_id(site1.id(), site2.id());
        let p = site1.center();
        let q = site2.center();
        let half = Rational::new(1.into(), 2.into());
        let mid = Point::new((&p.x + &q.x) * &half, (&p.y + &q.y) * &half);

        let coll = TransitPoint::new(
            mid.to_arc_point(),
            site1.sqrd_dist(&mid.to_arc_point()),
            pair,
            PointRole::Collision,
        );
        // Equal-weight sites never dominate each other; park the
        // domination transit at a nominal far point and time.
        let dom = TransitPoint::new(
            Point::from_ints(FAR, FAR).to_arc_point(),
            RootOf2::from_int(FAR),
            pair,
            PointRole::Domination,
        );

        // The perpendicular bisector, split at the midpoint. The
        // center-line normal points into the positive (left) side.
        let (nx, ny) = center_line.normal();
        let scale = rat(FAR) / nx.abs().max(ny.abs());
        let left_end = Point::new(&mid.x + &nx * &scale, &mid.y + &ny * &scale);
        let right_end = Point::new(&mid.x - &nx * &scale, &mid.y - &ny * &scale);

        let make = |end: Point, is_left: bool| {
            let sec = TrajSection::new(
                coll.clone(),
                dom.clone(),
                SectionCurve::Seg(crate::geom::Segment::new(mid.clone(), end)),
                center_line.clone(),
                is_left,
                site1.clone(),
                site2.clone(),
            );
            Trajectory::new(site1.clone(), site2.clone(), is_left, true, vec![sec])
        };

        let trajs = [make(left_end, true), make(right_end, false)];
        Self {
            site1,
            site2,
            center_line,
            trajs,
            coll,
            dom,
        }
    }

    fn apollonius(site1: Site, site2: Site, center_line: Line) -> Result<Self, Error> {
        let pair = pair_id(site1.id(), site2.id());
        let circ = apollonius_circle(&site1, &site2);

        let mut pts = circle_line(&circ, &center_line);
        if pts.len() != 2 {
            return Err(Error::BisectorConstruction(site1.id(), site2.id()));
        }
        let p2 = pts.pop().expect("two points");
        let p1 = pts.pop().expect("two points");
        let t1 = site1.sqrd_dist(&p1);
        let t2 = site1.sqrd_dist(&p2);
        let ((cp, ct), (dp, dt)) = if t1 <= t2 {
            ((p1, t1), (p2, t2))
        } else {
            ((p2, t2), (p1, t1))
        };

        let coll = TransitPoint::new(cp, ct, pair, PointRole::Collision);
        let dom = TransitPoint::new(dp, dt, pair, PointRole::Domination);

        let make = |is_left: bool| {
            let sec = TrajSection::new(
                coll.clone(),
                dom.clone(),
                SectionCurve::Arc(circ.clone()),
                center_line.clone(),
                is_left,
                site1.clone(),
                site2.clone(),
            );
            Trajectory::new(site1.clone(), site2.clone(), is_left, true, vec![sec])
        };

        let trajs = [make(true), make(false)];
        Ok(Self {
            site1,
            site2,
            center_line,
            trajs,
            coll,
            dom,
        })
    }

    pub fn id(&self) -> PairId {
        pair_id(self.site1.id(), self.site2.id())
    }

    pub fn site1(&self) -> &Site {
        &self.site1
    }

    pub fn site2(&self) -> &Site {
        &self.site2
    }

    pub fn center_line(&self) -> &Line {
        &self.center_line
    }

    pub fn trajs(&self) -> &[Trajectory; 2] {
        &self.trajs
    }

    /// The trajectory on the requested side; side 1 (`is_left`) is
    /// index 0.
    pub fn traj(&self, is_left: bool) -> &Trajectory {
        &self.trajs[if is_left { 0 } else { 1 }]
    }

    /// Classifies `p` against the center line and returns the
    /// trajectory on its side. A point exactly on the line cannot be
    /// classified.
    pub fn find_traj(&self, p: &crate::geom::ArcPoint) -> Result<&Trajectory, Error> {
        match self.center_line.side_of(p) {
            0 => Err(Error::AmbiguousSide(self.site1.id(), self.site2.id())),
            s => Ok(self.traj(s > 0)),
        }
    }

    pub fn coll(&self) -> &TransitPoint {
        &self.coll
    }

    pub fn dom(&self) -> &TransitPoint {
        &self.dom
    }

    pub fn is_equal_weight(&self) -> bool {
        self.site1.weight() == self.site2.weight()
    }
}

/// The Apollonius circle of two sites of unequal weight, in closed
/// form.
pub fn apollonius_circle(site1: &Site, site2: &Site) -> Circle {
    let sw1 = site1.weight() * site1.weight();
    let sw2 = site2.weight() * site2.weight();
    debug_assert!(sw1 != sw2);
    let p1 = site1.center();
    let p2 = site2.center();

    let dx = &p2.x - &p1.x;
    let dy = &p2.y - &p1.y;
    let sqrd_dist = &dx * &dx + &dy * &dy;

    let diff = &sw2 - &sw1;
    let sqr_radius = &sw1 * &sw2 * &sqrd_dist / (&diff * &diff);

    let denom = &sw1 - &sw2;
    let cx = (&sw1 * &p2.x - &sw2 * &p1.x) / &denom;
    let cy = (&sw1 * &p2.y - &sw2 * &p1.y) / &denom;
    Circle::new(Point::new(cx, cy), sqr_radius)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geom::Point;
    use crate::num::rat;

    fn site(id: usize, w: i64, x: i64, y: i64) -> Site {
        Site::new_point(id, rat(w), Point::from_ints(x, y))
    }

    #[test]
    fn equal_weights_yield_vertical_line_at_five() {
        let bisec = Bisector::new(&site(0, 1, 0, 0), &site(1, 1, 10, 0)).unwrap();
        assert!(bisec.is_equal_weight());
        assert_eq!(bisec.coll().pnt, Point::from_ints(5, 0).to_arc_point());
        assert_eq!(bisec.coll().sqrd_time, RootOf2::from_int(25));

        // Both trajectories run along x = 5.
        for traj in bisec.trajs() {
            let sec = &traj.secs()[0];
            match sec.curve() {
                SectionCurve::Seg(seg) => {
                    assert_eq!(seg.source.x, rat(5));
                    assert_eq!(seg.target.x, rat(5));
                }
                SectionCurve::Arc(_) => panic!("expected a segment"),
            }
        }
    }

    #[test]
    fn unequal_weights_yield_apollonius_circle() {
        let s1 = site(0, 2, 0, 0);
        let s2 = site(1, 1, 10, 0);
        let bisec = Bisector::new(&s1, &s2).unwrap();
        assert!(!bisec.is_equal_weight());

        let circ = apollonius_circle(bisec.site1(), bisec.site2());
        assert_eq!(circ.center, Point::new(rat(40) / rat(3), rat(0)));
        assert_eq!(circ.sqr_radius, rat(400) / rat(9));

        // Collision strictly precedes domination.
        assert!(bisec.coll().sqrd_time < bisec.dom().sqrd_time);
        assert_eq!(bisec.coll().sqrd_time, RootOf2::from_rational(rat(100) / rat(9)));
        assert_eq!(bisec.dom().sqrd_time, RootOf2::from_int(100));
    }

    #[test]
    fn vertical_equal_weight_bisector_is_supported() {
        // Sites stacked vertically: the perpendicular bisector is
        // horizontal; sites side by side: it is vertical. Both build.
        let horiz = Bisector::new(&site(0, 1, 0, 0), &site(1, 1, 0, 10)).unwrap();
        assert_eq!(horiz.coll().pnt, Point::from_ints(0, 5).to_arc_point());
        let vert = Bisector::new(&site(0, 1, 0, 0), &site(1, 1, 10, 0)).unwrap();
        assert_eq!(vert.coll().pnt, Point::from_ints(5, 0).to_arc_point());
    }

    #[test]
    fn find_traj_classifies_by_side() {
        let bisec = Bisector::new(&site(0, 2, 0, 0), &site(1, 1, 10, 0)).unwrap();
        let above = crate::geom::ArcPoint {
            x: RootOf2::from_int(13),
            y: RootOf2::from_int(1),
        };
        let below = crate::geom::ArcPoint {
            x: RootOf2::from_int(13),
            y: RootOf2::from_int(-1),
        };
        let on = Point::from_ints(13, 0).to_arc_point();

        // The center line runs from the lighter site (10,0) to the
        // heavier one (0,0); its positive side is -y.
        assert!(bisec.find_traj(&below).unwrap().is_left());
        assert!(!bisec.find_traj(&above).unwrap().is_left());
        assert!(bisec.find_traj(&on).is_err());
    }

    #[test]
    fn normalization_puts_greater_site_first() {
        let light = site(0, 1, 0, 0);
        let heavy = site(1, 2, 10, 0);
        let bisec = Bisector::new(&light, &heavy).unwrap();
        assert_eq!(bisec.site1().id(), 1);
        assert_eq!(bisec.site2().id(), 0);
        assert_eq!(bisec.id(), (0, 1));
    }
}
