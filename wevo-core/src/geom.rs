//! Exact planar primitives and constructions.
//!
//! Rational inputs only ever meet rational supporting curves here, so
//! each constructed intersection point carries coordinates in a single
//! quadratic extension (see [`crate::num`]). The predicates
//! ([`Line::side_of`], [`Segment::contains`]) are exact signs; nothing
//! in this module rounds.

use crate::num::{rat, sign_sum, Rational, RootOf2};
use glam::DVec2;
use num_traits::{Signed, ToPrimitive, Zero};
use std::cmp::Ordering;

/// A point with rational coordinates.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub struct Point {
    pub x: Rational,
    pub y: Rational,
}

impl Point {
    pub fn new(x: Rational, y: Rational) -> Self {
        Self { x, y }
    }

    pub fn from_ints(x: i64, y: i64) -> Self {
        Self::new(rat(x), rat(y))
    }

    pub fn to_arc_point(&self) -> ArcPoint {
        ArcPoint {
            x: RootOf2::from_rational(self.x.clone()),
            y: RootOf2::from_rational(self.y.clone()),
        }
    }

    /// Floating-point shadow for rendering.
    pub fn approx(&self) -> DVec2 {
        DVec2::new(
            self.x.to_f64().unwrap_or(f64::NAN),
            self.y.to_f64().unwrap_or(f64::NAN),
        )
    }
}

/// A constructed point; coordinates may carry one radical level.
#[derive(Clone, Debug)]
pub struct ArcPoint {
    pub x: RootOf2,
    pub y: RootOf2,
}

impl ArcPoint {
    /// Floating-point shadow for rendering and angle fallbacks.
    pub fn approx(&self) -> DVec2 {
        DVec2::new(self.x.to_f64(), self.y.to_f64())
    }
}

impl PartialEq for ArcPoint {
    fn eq(&self, other: &Self) -> bool {
        self.x == other.x && self.y == other.y
    }
}

impl Eq for ArcPoint {}

impl PartialOrd for ArcPoint {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ArcPoint {
    fn cmp(&self, other: &Self) -> Ordering {
        self.x.cmp(&other.x).then_with(|| self.y.cmp(&other.y))
    }
}

/// The oriented line `a·x + b·y + c = 0`; the normal `(a, b)` points
/// to the positive side.
#[derive(Clone, Debug)]
pub struct Line {
    pub a: Rational,
    pub b: Rational,
    pub c: Rational,
}

impl Line {
    /// Line through `p` and `q`, oriented so the positive side is the
    /// left of the direction `p -> q`.
    pub fn through(p: &Point, q: &Point) -> Self {
        let a = &p.y - &q.y;
        let b = &q.x - &p.x;
        let c = -(&a * &p.x) - &b * &p.y;
        Self { a, b, c }
    }

    /// Direction vector of the oriented line.
    pub fn direction(&self) -> (Rational, Rational) {
        (self.b.clone(), -&self.a)
    }

    /// Normal vector, pointing into the positive side.
    pub fn normal(&self) -> (Rational, Rational) {
        (self.a.clone(), self.b.clone())
    }

    /// The perpendicular line through `p`, oriented along this line's
    /// direction.
    pub fn perpendicular_at(&self, p: &Point) -> Self {
        let a = self.b.clone();
        let b = -&self.a;
        let c = -(&a * &p.x) - &b * &p.y;
        Self { a, b, c }
    }

    /// Exact side sign for a constructed point: `+1` on the positive
    /// side, `-1` on the negative side, `0` on the line.
    pub fn side_of(&self, p: &ArcPoint) -> i32 {
        let (xa, xb, xc) = p.x.parts();
        let (ya, yb, yc) = p.y.parts();
        let konst = &self.a * xa + &self.b * ya + &self.c;
        sign_sum(&konst, &(&self.a * xb), xc, &(&self.b * yb), yc)
    }

    pub fn side_of_point(&self, p: &Point) -> i32 {
        let v = &self.a * &p.x + &self.b * &p.y + &self.c;
        if v.is_zero() {
            0
        } else if v.is_positive() {
            1
        } else {
            -1
        }
    }
}

/// A circle with rational center and squared radius.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Circle {
    pub center: Point,
    pub sqr_radius: Rational,
}

impl Circle {
    pub fn new(center: Point, sqr_radius: Rational) -> Self {
        Self { center, sqr_radius }
    }

    pub fn radius_f64(&self) -> f64 {
        self.sqr_radius.to_f64().unwrap_or(f64::NAN).max(0.0).sqrt()
    }
}

/// A segment with rational endpoints.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Segment {
    pub source: Point,
    pub target: Point,
}

impl Segment {
    pub fn new(source: Point, target: Point) -> Self {
        Self { source, target }
    }

    pub fn line(&self) -> Line {
        Line::through(&self.source, &self.target)
    }

    /// Exact membership for a point already on the supporting line:
    /// the projection parameter must fall within `[0, |d|²]`.
    pub fn contains(&self, p: &ArcPoint) -> bool {
        let dx = &self.target.x - &self.source.x;
        let dy = &self.target.y - &self.source.y;
        let (xa, xb, xc) = p.x.parts();
        let (ya, yb, yc) = p.y.parts();
        let k = &dx * &self.source.x + &dy * &self.source.y;
        let l2 = &dx * &dx + &dy * &dy;

        let lo = &dx * xa + &dy * ya - &k;
        if sign_sum(&lo, &(&dx * xb), xc, &(&dy * yb), yc) < 0 {
            return false;
        }
        let hi = lo - l2;
        sign_sum(&hi, &(&dx * xb), xc, &(&dy * yb), yc) <= 0
    }
}

/// Intersects a circle with a line. Returns zero, one (tangent) or two
/// points; with two, both live in the same quadratic extension.
pub fn circle_line(circ: &Circle, line: &Line) -> Vec<ArcPoint> {
    let l2 = &line.a * &line.a + &line.b * &line.b;
    assert!(!l2.is_zero(), "degenerate line");
    let d0 = &line.a * &circ.center.x + &line.b * &circ.center.y + &line.c;

    // Foot of the perpendicular from the center onto the line.
    let fx = &circ.center.x - &line.a * &d0 / &l2;
    let fy = &circ.center.y - &line.b * &d0 / &l2;

    // Squared advance along the direction (b, -a), normalized by |d|².
    let disc = (&circ.sqr_radius - &d0 * &d0 / &l2) / &l2;
    if disc.is_negative() {
        return Vec::new();
    }
    if disc.is_zero() {
        return vec![Point::new(fx, fy).to_arc_point()];
    }

    let p1 = ArcPoint {
        x: RootOf2::new(fx.clone(), line.b.clone(), disc.clone()),
        y: RootOf2::new(fy.clone(), -&line.a, disc.clone()),
    };
    let p2 = ArcPoint {
        x: RootOf2::new(fx, -&line.b, disc.clone()),
        y: RootOf2::new(fy, line.a.clone(), disc),
    };
    vec![p1, p2]
}

/// Intersects two circles via their radical line. Concentric pairs
/// yield nothing.
pub fn circle_circle(c1: &Circle, c2: &Circle) -> Vec<ArcPoint> {
    if c1.center == c2.center {
        return Vec::new();
    }
    let a = rat(2) * (&c2.center.x - &c1.center.x);
    let b = rat(2) * (&c2.center.y - &c1.center.y);
    let c = &c1.center.x * &c1.center.x + &c1.center.y * &c1.center.y
        - &c2.center.x * &c2.center.x
        - &c2.center.y * &c2.center.y
        - &c1.sqr_radius
        + &c2.sqr_radius;
    circle_line(c1, &Line { a, b, c })
}

/// Intersects two lines; `None` when parallel.
pub fn line_line(l1: &Line, l2: &Line) -> Option<Point> {
    let det = &l1.a * &l2.b - &l2.a * &l1.b;
    if det.is_zero() {
        return None;
    }
    let x = (&l1.b * &l2.c - &l2.b * &l1.c) / &det;
    let y = (&l2.a * &l1.c - &l1.a * &l2.c) / &det;
    Some(Point::new(x, y))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::num::rat;

    fn circle(x: i64, y: i64, r2: i64) -> Circle {
        Circle::new(Point::from_ints(x, y), rat(r2))
    }

    #[test]
    fn circle_line_two_hits() {
        // x² + y² = 25 against y = 3: (±4, 3).
        let line = Line {
            a: rat(0),
            b: rat(1),
            c: rat(-3),
        };
        let pts = circle_line(&circle(0, 0, 25), &line);
        assert_eq!(pts.len(), 2);
        for p in &pts {
            assert_eq!(p.y, RootOf2::from_int(3));
            assert_eq!(p.x.square(), RootOf2::from_int(16));
        }
        assert_ne!(pts[0], pts[1]);
    }

    #[test]
    fn circle_line_tangent_and_miss() {
        let tangent = Line {
            a: rat(0),
            b: rat(1),
            c: rat(-5),
        };
        assert_eq!(circle_line(&circle(0, 0, 25), &tangent).len(), 1);
        let miss = Line {
            a: rat(0),
            b: rat(1),
            c: rat(-6),
        };
        assert!(circle_line(&circle(0, 0, 25), &miss).is_empty());
    }

    #[test]
    fn circle_circle_symmetric_pair() {
        // Unit-distance circles of equal radius meet off-axis.
        let pts = circle_circle(&circle(0, 0, 4), &circle(2, 0, 4));
        assert_eq!(pts.len(), 2);
        for p in &pts {
            assert_eq!(p.x, RootOf2::from_int(1));
            assert_eq!(p.y.square(), RootOf2::from_int(3));
        }
    }

    #[test]
    fn concentric_circles_do_not_intersect() {
        assert!(circle_circle(&circle(1, 1, 4), &circle(1, 1, 9)).is_empty());
    }

    #[test]
    fn side_signs_follow_orientation() {
        // Left of (0,0) -> (10,0) is +y.
        let line = Line::through(&Point::from_ints(0, 0), &Point::from_ints(10, 0));
        assert_eq!(line.side_of_point(&Point::from_ints(5, 1)), 1);
        assert_eq!(line.side_of_point(&Point::from_ints(5, -1)), -1);
        assert_eq!(line.side_of_point(&Point::from_ints(5, 0)), 0);

        // Exact side for a constructed point: (1, √3) lies above.
        let pts = circle_circle(&circle(0, 0, 4), &circle(2, 0, 4));
        let above = pts.iter().find(|p| p.y.sign() > 0).unwrap();
        assert_eq!(line.side_of(above), 1);
    }

    #[test]
    fn segment_membership() {
        let seg = Segment::new(Point::from_ints(0, 0), Point::from_ints(10, 0));
        assert!(seg.contains(&Point::from_ints(5, 0).to_arc_point()));
        assert!(seg.contains(&Point::from_ints(0, 0).to_arc_point()));
        assert!(seg.contains(&Point::from_ints(10, 0).to_arc_point()));
        assert!(!seg.contains(&Point::from_ints(11, 0).to_arc_point()));
        assert!(!seg.contains(&Point::from_ints(-1, 0).to_arc_point()));
    }

    #[test]
    fn line_intersection() {
        let l1 = Line::through(&Point::from_ints(0, 0), &Point::from_ints(10, 10));
        let l2 = Line::through(&Point::from_ints(0, 10), &Point::from_ints(10, 0));
        assert_eq!(line_line(&l1, &l2), Some(Point::from_ints(5, 5)));
        let l3 = Line::through(&Point::from_ints(0, 1), &Point::from_ints(10, 11));
        assert_eq!(line_line(&l1, &l3), None);
    }

    #[test]
    fn perpendicular_passes_through_anchor() {
        let base = Line::through(&Point::from_ints(0, 0), &Point::from_ints(10, 0));
        let perp = base.perpendicular_at(&Point::from_ints(5, 0));
        assert_eq!(perp.side_of_point(&Point::from_ints(5, 0)), 0);
        assert_eq!(perp.side_of_point(&Point::from_ints(5, 7)), 0);
    }
}
