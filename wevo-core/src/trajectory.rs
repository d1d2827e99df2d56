//! Trajectories: time-parameterized halves of a bisector.
//!
//! Each bisector contributes two trajectories, one per side of the
//! center line through its two sites. A trajectory is an ordered list
//! of sections, each valid on a closed squared-time interval and able
//! to evaluate its position at any covered time. The two transit
//! points (collision, domination) lie on the center line, so side
//! membership doubles as the in-section test for arc sections.

use crate::geom::{circle_circle, circle_line, line_line, ArcPoint, Circle, Line, Segment};
use crate::num::RootOf2;
use crate::site::{Site, SiteId};
use crate::time_point::{pair_id, PairId, TimePoint, TransitPoint};
use log::warn;

/// Identity of a trajectory: site pair, side, and the `is_first`
/// disambiguator kept for split arcs. Moving intersections share this
/// identity one-to-one.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub struct TrajId {
    pub pair: PairId,
    pub is_left: bool,
    pub is_first: bool,
}

/// Supporting curve of a section: a circular arc on the Apollonius
/// circle, or a segment when both sites weigh the same.
#[derive(Clone, Debug)]
pub enum SectionCurve {
    Arc(Circle),
    Seg(Segment),
}

#[derive(Clone, Debug)]
pub struct TrajSection {
    start: TransitPoint,
    end: TransitPoint,
    curve: SectionCurve,
    center_line: Line,
    is_left: bool,
    site1: Site,
    site2: Site,
}

impl TrajSection {
    pub fn new(
        start: TransitPoint,
        end: TransitPoint,
        curve: SectionCurve,
        center_line: Line,
        is_left: bool,
        site1: Site,
        site2: Site,
    ) -> Self {
        debug_assert!(start.sqrd_time <= end.sqrd_time);
        Self {
            start,
            end,
            curve,
            center_line,
            is_left,
            site1,
            site2,
        }
    }

    pub fn start(&self) -> &TransitPoint {
        &self.start
    }

    pub fn end(&self) -> &TransitPoint {
        &self.end
    }

    pub fn curve(&self) -> &SectionCurve {
        &self.curve
    }

    /// True for the equal-weight (segment) form.
    pub fn is_equal_weight(&self) -> bool {
        matches!(self.curve, SectionCurve::Seg(_))
    }

    pub fn incls(&self, sqrd_time: &RootOf2) -> bool {
        self.start.sqrd_time <= *sqrd_time && *sqrd_time <= self.end.sqrd_time
    }

    /// Closed membership of a point known to lie on the supporting
    /// curve.
    fn on_side(&self, p: &ArcPoint) -> bool {
        match &self.curve {
            SectionCurve::Arc(_) => {
                let s = self.center_line.side_of(p);
                s == 0 || (s > 0) == self.is_left
            }
            SectionCurve::Seg(seg) => seg.contains(p),
        }
    }

    /// Position at `sqrd_time`. Exact matches against the transit
    /// endpoints short-circuit; otherwise the curve is cut with the
    /// site's growth circle, expecting a single hit on this side.
    pub fn pnt_at(&self, sqrd_time: &RootOf2) -> Option<ArcPoint> {
        if *sqrd_time == self.start.sqrd_time {
            return Some(self.start.pnt.clone());
        }
        if *sqrd_time == self.end.sqrd_time {
            return Some(self.end.pnt.clone());
        }

        let grown = self.site1.grow_off_at(sqrd_time);
        let cands: Vec<ArcPoint> = match &self.curve {
            SectionCurve::Arc(circ) => circle_circle(circ, &grown)
                .into_iter()
                .filter(|p| {
                    let s = self.center_line.side_of(p);
                    s != 0 && (s > 0) == self.is_left
                })
                .collect(),
            SectionCurve::Seg(seg) => circle_line(&grown, &seg.line())
                .into_iter()
                .filter(|p| seg.contains(p))
                .collect(),
        };

        match cands.len() {
            1 => cands.into_iter().next(),
            n => {
                warn!(
                    "section of pair {:?} yielded {} points at time {}",
                    pair_id(self.site1.id(), self.site2.id()),
                    n,
                    sqrd_time
                );
                None
            }
        }
    }
}

#[derive(Clone, Debug)]
pub struct Trajectory {
    site1: Site,
    site2: Site,
    is_left: bool,
    is_first: bool,
    secs: Vec<TrajSection>,
}

impl Trajectory {
    pub fn new(site1: Site, site2: Site, is_left: bool, is_first: bool, secs: Vec<TrajSection>) -> Self {
        assert!(!secs.is_empty(), "trajectory without sections");
        Self {
            site1,
            site2,
            is_left,
            is_first,
            secs,
        }
    }

    pub fn id(&self) -> TrajId {
        TrajId {
            pair: pair_id(self.site1.id(), self.site2.id()),
            is_left: self.is_left,
            is_first: self.is_first,
        }
    }

    pub fn site1(&self) -> &Site {
        &self.site1
    }

    pub fn site2(&self) -> &Site {
        &self.site2
    }

    /// The pair partner of `site_id` on this trajectory.
    pub fn other_site(&self, site_id: SiteId) -> &Site {
        debug_assert!(self.site1.id() == site_id || self.site2.id() == site_id);
        if self.site1.id() == site_id {
            &self.site2
        } else {
            &self.site1
        }
    }

    pub fn is_left(&self) -> bool {
        self.is_left
    }

    pub fn secs(&self) -> &[TrajSection] {
        &self.secs
    }

    pub fn start(&self) -> &TransitPoint {
        self.secs.first().map(|s| s.start()).expect("non-empty")
    }

    pub fn end(&self) -> &TransitPoint {
        self.secs.last().map(|s| s.end()).expect("non-empty")
    }

    pub fn pnt_at(&self, sqrd_time: &RootOf2) -> Option<ArcPoint> {
        match self.secs.iter().find(|s| s.incls(sqrd_time)) {
            Some(sec) => sec.pnt_at(sqrd_time),
            None => {
                warn!("no section of {:?} covers time {}", self.id(), sqrd_time);
                None
            }
        }
    }

    /// All exact intersection points with `other`, each tagged with
    /// this trajectory's `site1` arrival time. Trajectories of the
    /// same pair never intersect; callers only pair trajectories that
    /// share a site.
    pub fn intersect(&self, other: &Trajectory) -> Vec<TimePoint> {
        if self.id().pair == other.id().pair {
            return Vec::new();
        }
        debug_assert!(
            self.site1.id() == other.site1.id()
                || self.site1.id() == other.site2.id()
                || self.site2.id() == other.site1.id()
                || self.site2.id() == other.site2.id()
        );

        let mut out = Vec::new();
        for sec1 in &self.secs {
            for sec2 in &other.secs {
                let pts: Vec<ArcPoint> = match (&sec1.curve, &sec2.curve) {
                    (SectionCurve::Arc(c1), SectionCurve::Arc(c2)) => circle_circle(c1, c2),
                    (SectionCurve::Arc(c1), SectionCurve::Seg(s2)) => {
                        circle_line(c1, &s2.line())
                    }
                    (SectionCurve::Seg(s1), SectionCurve::Arc(c2)) => {
                        circle_line(c2, &s1.line())
                    }
                    (SectionCurve::Seg(s1), SectionCurve::Seg(s2)) => {
                        match line_line(&s1.line(), &s2.line()) {
                            Some(p) => vec![p.to_arc_point()],
                            None => Vec::new(),
                        }
                    }
                };

                for p in pts {
                    if sec1.on_side(&p) && sec2.on_side(&p) {
                        let t = self.site1.sqrd_dist(&p);
                        out.push(TimePoint::new(p, t));
                    }
                }
            }
        }
        out
    }
}
