//! Weighted sites.
//!
//! A site is a growth generator: its offset circle at squared time `t`
//! has radius `w·√t`. The `(weight, id)` ordering defined here is the
//! tie-break underlying every scheduler decision.

use crate::geom::{ArcPoint, Circle, Point};
use crate::num::{Rational, RootOf2};
use glam::DVec2;
use num_traits::{Signed, ToPrimitive, Zero};
use std::cmp::Ordering;
use std::f64::consts::TAU;

/// Identifier of a site; index into the diagram's site table.
pub type SiteId = usize;

/// Closed set of supported site shapes. Point sites are the only
/// concrete kind today; new kinds extend this enum.
#[derive(Clone, Debug)]
pub enum SiteShape {
    Point(Point),
}

#[derive(Clone, Debug)]
pub struct Site {
    id: SiteId,
    weight: Rational,
    shape: SiteShape,
}

impl Site {
    pub fn new_point(id: SiteId, weight: Rational, center: Point) -> Self {
        assert!(weight.is_positive(), "site {id} has non-positive weight");
        Self {
            id,
            weight,
            shape: SiteShape::Point(center),
        }
    }

    pub fn id(&self) -> SiteId {
        self.id
    }

    pub fn weight(&self) -> &Rational {
        &self.weight
    }

    pub fn weight_f64(&self) -> f64 {
        self.weight.to_f64().unwrap_or(f64::NAN)
    }

    pub fn shape(&self) -> &SiteShape {
        &self.shape
    }

    pub fn center(&self) -> &Point {
        match &self.shape {
            SiteShape::Point(p) => p,
        }
    }

    /// Squared arrival time of this site's growth front at `p`:
    /// `((x−cx)² + (y−cy)²) / w²`.
    pub fn sqrd_dist(&self, p: &ArcPoint) -> RootOf2 {
        let c = self.center();
        let dx = p.x.sub_rat(&c.x);
        let dy = p.y.sub_rat(&c.y);
        let w2 = &self.weight * &self.weight;
        dx.square().add(&dy.square()).div_rat(&w2)
    }

    /// Approximate angle of `p` about the center, in `[0, 2π)`. Only
    /// the angular neighbor fallback consumes this.
    pub fn angle(&self, p: &ArcPoint) -> f64 {
        let c = self.center();
        let cv = DVec2::new(
            c.x.to_f64().unwrap_or(f64::NAN),
            c.y.to_f64().unwrap_or(f64::NAN),
        );
        let mut theta = (p.approx() - cv).to_angle();
        if theta < 0.0 {
            theta += TAU;
        }
        theta
    }

    /// The offset circle at squared time `t`. The squared radius uses a
    /// rational snapshot of `t`; event ordering never reads it.
    pub fn grow_off_at(&self, t: &RootOf2) -> Circle {
        let snapshot = Rational::from_float(t.to_f64().max(0.0)).unwrap_or_else(Rational::zero);
        let w2 = &self.weight * &self.weight;
        Circle::new(self.center().clone(), snapshot * w2)
    }
}

impl PartialEq for Site {
    fn eq(&self, other: &Self) -> bool {
        self.weight == other.weight && self.id == other.id
    }
}

impl Eq for Site {}

impl PartialOrd for Site {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Site {
    fn cmp(&self, other: &Self) -> Ordering {
        self.weight
            .cmp(&other.weight)
            .then_with(|| self.id.cmp(&other.id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::num::rat;

    fn site(id: SiteId, weight: i64, x: i64, y: i64) -> Site {
        Site::new_point(id, rat(weight), Point::from_ints(x, y))
    }

    #[test]
    fn ordering_is_weight_then_id() {
        let a = site(0, 2, 0, 0);
        let b = site(1, 1, 5, 5);
        let c = site(2, 1, 9, 9);
        assert!(a > b);
        assert!(b < c);
        assert_eq!(site(3, 4, 1, 1), site(3, 4, 7, 7));
    }

    #[test]
    fn sqrd_dist_divides_by_weight_squared() {
        let s = site(0, 2, 0, 0);
        let p = Point::from_ints(6, 8).to_arc_point();
        // 100 / 4.
        assert_eq!(s.sqrd_dist(&p), RootOf2::from_rational(rat(25)));
    }

    #[test]
    fn angle_wraps_into_upper_range() {
        let s = site(0, 1, 0, 0);
        let below = Point::from_ints(0, -1).to_arc_point();
        let theta = s.angle(&below);
        assert!((theta - 3.0 * TAU / 4.0).abs() < 1e-9);
    }

    #[test]
    fn offset_circle_radius_scales_with_weight() {
        let s = site(0, 3, 1, 2);
        let circ = s.grow_off_at(&RootOf2::from_int(4));
        assert_eq!(circ.center, Point::from_ints(1, 2));
        assert_eq!(circ.sqr_radius, rat(36));
    }

    #[test]
    #[should_panic(expected = "non-positive weight")]
    fn zero_weight_is_rejected() {
        let _ = site(0, 0, 0, 0);
    }
}
