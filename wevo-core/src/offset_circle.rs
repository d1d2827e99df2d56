//! Per-site offset-circle arc structures.
//!
//! An offset circle tracks which angular portions of its site's
//! growing circle are still exposed on the wavefront. Arcs are keyed
//! by their endpoint intersections, `(from, to)` read counterclockwise,
//! with the `lefts`/`rights` maps giving angular adjacency. Every
//! operation is an atomic, time-stamped transformation that leaves
//! `arcs`, `lefts` and `rights` mutually consistent: each insertion or
//! removal touches one arc entry and exactly two adjacency entries.
//!
//! A circle starts *active and empty*, becomes *populated* after its
//! first collision, and ends either empty-and-active (never touched,
//! or all competitors retired) or empty-and-inactive (fully
//! dominated).

use crate::bisector::BisectorTable;
use crate::geom::ArcPoint;
use crate::intersection::{isect_pnt_at, IsectId, IsectTable};
use crate::num::{Rational, RootOf2};
use crate::site::Site;
use log::{debug, warn};
use num_bigint::BigInt;
use std::collections::{BTreeMap, BTreeSet};
use std::f64::consts::TAU;

/// An arc between two moving intersections, counterclockwise from the
/// first to the second.
pub type ArcKey = (IsectId, IsectId);

#[derive(Clone, Debug)]
pub struct OffsetCircle {
    site: Site,
    is_active: bool,
    /// Arc endpoints -> wavefront flag.
    arcs: BTreeMap<ArcKey, bool>,
    /// Counterclockwise-previous neighbor of each intersection.
    lefts: BTreeMap<IsectId, IsectId>,
    /// Counterclockwise-next neighbor of each intersection.
    rights: BTreeMap<IsectId, IsectId>,
    /// Intersections currently on this circle.
    isects: BTreeSet<IsectId>,
}

impl OffsetCircle {
    pub fn new(site: Site) -> Self {
        Self {
            site,
            is_active: true,
            arcs: BTreeMap::new(),
            lefts: BTreeMap::new(),
            rights: BTreeMap::new(),
            isects: BTreeSet::new(),
        }
    }

    pub fn site(&self) -> &Site {
        &self.site
    }

    pub fn is_active(&self) -> bool {
        self.is_active
    }

    pub fn arcs(&self) -> &BTreeMap<ArcKey, bool> {
        &self.arcs
    }

    pub fn isects(&self) -> &BTreeSet<IsectId> {
        &self.isects
    }

    pub fn incls_isect(&self, isect: &IsectId) -> bool {
        self.isects.contains(isect)
    }

    /// Adjacency-map neighbor lookup.
    pub fn neighbor(&self, isect: &IsectId, left: bool) -> Option<IsectId> {
        let id = if left {
            self.lefts.get(isect)
        } else {
            self.rights.get(isect)
        }?;
        debug_assert!(self.isects.contains(id), "adjacency points at a dropped intersection");
        if self.isects.contains(id) {
            Some(*id)
        } else {
            None
        }
    }

    /// Introduces the boundary pair of a new collision.
    ///
    /// `active` marks genuine mutual exposure (the event site is the
    /// pair's greater one); only then is the pair's own shielded arc
    /// inserted. `pierces` reorders the from/to roles when the greater
    /// circle passes clean through the smaller one's domain.
    pub fn spawn_arc(
        &mut self,
        bisecs: &BisectorTable,
        isects: &mut IsectTable,
        sqrd_time: &RootOf2,
        isect1: IsectId,
        isect2: IsectId,
        active: bool,
        pierces: bool,
    ) {
        if !self.is_active {
            return;
        }

        let (mut from, mut to) = if active {
            (isect1, isect2)
        } else {
            (isect2, isect1)
        };
        if !active && pierces {
            std::mem::swap(&mut from, &mut to);
        }

        debug!(
            "circle {}: spawning arc {:?} -> {:?} at {}",
            self.site.id(),
            from,
            to,
            sqrd_time
        );

        if self.isects.is_empty() {
            // First split of an untouched circle.
            if active {
                self.insert_arc(sqrd_time, from, to, false);
            }
            self.insert_arc(sqrd_time, to, from, true);

            self.insert_isect(isect1);
            set_wf(isects, &isect1, sqrd_time, true);
            self.insert_isect(isect2);
            set_wf(isects, &isect2, sqrd_time, true);
            return;
        }

        let Some(pnt) = crate::intersection::lookup_traj(bisecs, &isect1)
            .map(|t| t.start().pnt.clone())
        else {
            warn!("circle {}: collision trajectory missing", self.site.id());
            return;
        };

        let left = self.search_neighbor_at(bisecs, sqrd_time, &pnt, true);
        let right = self.search_neighbor_at(bisecs, sqrd_time, &pnt, false);
        let (Some(left), Some(right)) = (left, right) else {
            warn!(
                "circle {}: no angular neighbors for the incoming collision",
                self.site.id()
            );
            return;
        };

        let arc_key = (left, right);
        self.incls_arc(&arc_key, true);
        let is_on_wf = self.arcs[&arc_key];

        self.erase_arc(sqrd_time, left, right, true);
        self.insert_arc(sqrd_time, left, from, is_on_wf);
        if active {
            self.insert_arc(sqrd_time, from, to, pierces);
        }
        self.insert_arc(sqrd_time, to, right, is_on_wf);

        self.insert_isect(isect1);
        set_wf(isects, &isect1, sqrd_time, is_on_wf || (active && pierces));
        self.insert_isect(isect2);
        set_wf(isects, &isect2, sqrd_time, is_on_wf || (active && pierces));
    }

    /// Removes the boundary pair `(from, to)` at a domination. With
    /// more than two arcs the neighbors on both sides merge into one
    /// new arc, which is returned for follow-up event checks; when the
    /// structure collapses to nothing the circle goes back to empty,
    /// active or not according to `active`.
    pub fn delete_arc(
        &mut self,
        isects: &mut IsectTable,
        sqrd_time: &RootOf2,
        from: IsectId,
        to: IsectId,
        active: bool,
    ) -> Option<(IsectId, IsectId)> {
        debug!(
            "circle {}: deleting arc {:?} -> {:?} at {}",
            self.site.id(),
            from,
            to,
            sqrd_time
        );

        let mut new_arc = None;

        if self.arcs.len() > 2 {
            let left = self.neighbor(&from, true);
            let right = self.neighbor(&to, false);
            if let (Some(left), Some(right)) = (left, right)
                && self.incls_arc(&(left, from), false)
                && self.incls_arc(&(from, to), false)
                && self.incls_arc(&(to, right), false)
            {
                let is_on_wf = self.arcs[&(left, from)];
                self.erase_arc(sqrd_time, left, from, true);
                self.erase_arc(sqrd_time, from, to, true);
                self.erase_arc(sqrd_time, to, right, true);
                self.insert_arc(sqrd_time, left, right, is_on_wf);
                new_arc = Some((left, right));
            } else if self.incls_arc(&(from, to), false) {
                self.erase_arc(sqrd_time, from, to, false);
            }
        } else {
            self.erase_arc(sqrd_time, from, to, false);
            self.erase_arc(sqrd_time, to, from, false);
            if self.arcs.is_empty() {
                self.is_active = active;
            }
        }

        if self.isects.contains(&from) && self.isects.contains(&to) {
            set_wf(isects, &from, sqrd_time, false);
            self.isects.remove(&from);
            set_wf(isects, &to, sqrd_time, false);
            self.isects.remove(&to);
        }

        new_arc
    }

    /// [`Self::delete_arc`] with the stored orientation of the pair
    /// looked up first.
    pub fn delete_arc_unordered(
        &mut self,
        isects: &mut IsectTable,
        sqrd_time: &RootOf2,
        isect1: IsectId,
        isect2: IsectId,
        active: bool,
    ) -> Option<(IsectId, IsectId)> {
        let fwd = self.arcs.contains_key(&(isect1, isect2));
        let bwd = self.arcs.contains_key(&(isect2, isect1));
        assert!(
            fwd || bwd,
            "circle {}: neither orientation of {:?}/{:?} exists",
            self.site.id(),
            isect1,
            isect2
        );
        assert!(!(fwd && bwd), "both orientations of an arc exist");
        if fwd {
            self.delete_arc(isects, sqrd_time, isect1, isect2, active)
        } else {
            self.delete_arc(isects, sqrd_time, isect2, isect1, active)
        }
    }

    /// Collapses the vanished arc between `from` and `to` when three
    /// boundaries meet, merging `from`'s other arc into the survivor.
    /// Returns whether `from` was the counterclockwise-earlier
    /// endpoint.
    pub fn collapse_arc(&mut self, sqrd_time: &RootOf2, from: &IsectId, to: &IsectId) -> bool {
        let fwd = self.arcs.contains_key(&(*from, *to));
        let bwd = self.arcs.contains_key(&(*to, *from));
        assert!(fwd ^ bwd, "circle {}: exactly one orientation of the collapsing arc must exist", self.site.id());
        let is_less = fwd;

        let Some(nb) = self.neighbor(from, is_less) else {
            warn!(
                "circle {}: collapse without a mergeable neighbor of {:?}",
                self.site.id(),
                from
            );
            return is_less;
        };

        debug!(
            "circle {}: collapsing {:?} -> {:?} at {}",
            self.site.id(),
            if is_less { from } else { to },
            if is_less { to } else { from },
            sqrd_time
        );

        let old1 = if is_less { (*from, *to) } else { (*to, *from) };
        let old2 = if is_less { (nb, *from) } else { (*from, nb) };
        let merged = if is_less { (nb, *to) } else { (*to, nb) };

        self.erase_arc(sqrd_time, old1.0, old1.1, true);

        if self.incls_arc(&old2, false) {
            let is_on_wf = self.arcs[&old2];
            self.erase_arc(sqrd_time, old2.0, old2.1, true);
            self.isects.remove(from);
            self.insert_arc(sqrd_time, merged.0, merged.1, is_on_wf);
        } else {
            self.isects.remove(from);
            self.isects.remove(to);
        }

        is_less
    }

    /// The dual of [`Self::collapse_arc`]: splits the arc next to
    /// `from` by inserting `to`. The angular orientation is decided an
    /// infinitesimal step after the event time. Returns `(had
    /// neighbor, from-is-earlier)`; without a neighbor the caller must
    /// probe both sides for follow-up events.
    pub fn expand_isect(
        &mut self,
        bisecs: &BisectorTable,
        sqrd_time: &RootOf2,
        from: &IsectId,
        to: &IsectId,
        is_on_wf: bool,
    ) -> (bool, bool) {
        // 1e20 in rational form; the probe time is t + t/1e20.
        let eps = Rational::from_integer(BigInt::from(100_000_000_000_000_000_000_u128));
        let probe = sqrd_time.add(&sqrd_time.div_rat(&eps));

        let a1 = self
            .angle_at(bisecs, from, &probe)
            .or_else(|| self.angle_at(bisecs, from, sqrd_time));
        let a2 = self
            .angle_at(bisecs, to, &probe)
            .or_else(|| self.angle_at(bisecs, to, sqrd_time));

        let is_less = match (a1, a2) {
            (Some(a1), Some(a2)) => {
                let diff = (a1 - a2).abs();
                if !(1e-12..1e-2).contains(&diff) {
                    warn!(
                        "circle {}: suspicious angular gap {} between {:?} and {:?}",
                        self.site.id(),
                        diff,
                        from,
                        to
                    );
                }
                a1 < a2
            }
            _ => {
                warn!(
                    "circle {}: could not evaluate angles for expansion",
                    self.site.id()
                );
                true
            }
        };

        let nb = self.neighbor(from, !is_less);
        let new1 = if is_less { (*from, *to) } else { (*to, *from) };

        debug!(
            "circle {}: expanding {:?} -> {:?} at {}",
            self.site.id(),
            new1.0,
            new1.1,
            sqrd_time
        );

        if let Some(nb) = nb {
            let old = if is_less { (*from, nb) } else { (nb, *from) };
            let new2 = if is_less { (*to, nb) } else { (nb, *to) };
            self.incls_arc(&old, true);
            let wf2 = self.arcs[&old];
            self.erase_arc(sqrd_time, old.0, old.1, true);
            self.insert_arc(sqrd_time, new1.0, new1.1, is_on_wf);
            self.insert_arc(sqrd_time, new2.0, new2.1, wf2);
        } else {
            self.insert_arc(sqrd_time, new1.0, new1.1, is_on_wf);
        }

        self.insert_isect(*to);
        (nb.is_some(), is_less)
    }

    /// Swaps the identity of one arc endpoint, keeping the wavefront
    /// flag of the arc it bounds. Returns `true` when the replaced
    /// endpoint was the counterclockwise-later one.
    pub fn replace_isect(
        &mut self,
        isects: &IsectTable,
        sqrd_time: &RootOf2,
        old: &IsectId,
        new: &IsectId,
    ) -> bool {
        debug_assert!(
            !(self.lefts.contains_key(old) && self.rights.contains_key(old)),
            "replace target must bound exactly one arc"
        );

        let arc_key = if let Some(left) = self.lefts.get(old).copied()
            && self.incls_arc(&(left, *old), false)
        {
            (left, *old)
        } else if let Some(right) = self.rights.get(old).copied()
            && self.incls_arc(&(*old, right), false)
        {
            (*old, right)
        } else {
            panic!(
                "circle {}: no arc bounded by {:?} to replace",
                self.site.id(),
                old
            );
        };

        let is_less = *old == arc_key.0;
        let other = if is_less { arc_key.1 } else { arc_key.0 };

        assert!(self.isects.contains(&other), "partner endpoint missing");
        assert!(self.isects.contains(old), "replaced endpoint missing");

        let is_on_wf = isects.get(old).map(|i| i.is_wf_vert()).unwrap_or(false);

        debug!(
            "circle {}: replacing {:?} by {:?} at {}",
            self.site.id(),
            old,
            new,
            sqrd_time
        );

        self.isects.remove(old);
        self.insert_isect(*new);

        self.incls_arc(&arc_key, true);
        self.erase_arc(sqrd_time, arc_key.0, arc_key.1, true);
        let replaced = if is_less {
            (*new, other)
        } else {
            (other, *new)
        };
        self.insert_arc(sqrd_time, replaced.0, replaced.1, is_on_wf);

        !is_less
    }

    /// Angular nearest-neighbor on the requested side of `pnt`, with a
    /// wrap-around retry from the far end of the angle range.
    pub fn search_neighbor_at(
        &self,
        bisecs: &BisectorTable,
        sqrd_time: &RootOf2,
        pnt: &ArcPoint,
        left: bool,
    ) -> Option<IsectId> {
        let angle = self.site.angle(pnt);
        self.search_neighbor_angle(bisecs, sqrd_time, angle, left)
            .or_else(|| {
                self.search_neighbor_angle(bisecs, sqrd_time, if left { TAU } else { 0.0 }, left)
            })
    }

    fn search_neighbor_angle(
        &self,
        bisecs: &BisectorTable,
        sqrd_time: &RootOf2,
        angle: f64,
        left: bool,
    ) -> Option<IsectId> {
        let mut best: Option<(f64, IsectId)> = None;
        for id in &self.isects {
            let Some(candidate) = self.angle_at(bisecs, id, sqrd_time) else {
                warn!(
                    "circle {}: skipping unevaluable intersection {:?}",
                    self.site.id(),
                    id
                );
                continue;
            };
            let qualifies = if left {
                candidate < angle
            } else {
                candidate > angle
            };
            if qualifies {
                let diff = (angle - candidate).abs();
                if best.map_or(true, |(d, _)| diff < d) {
                    best = Some((diff, *id));
                }
            }
        }
        best.map(|(_, id)| id)
    }

    fn angle_at(&self, bisecs: &BisectorTable, id: &IsectId, sqrd_time: &RootOf2) -> Option<f64> {
        isect_pnt_at(bisecs, id, sqrd_time).map(|p| self.site.angle(&p))
    }

    /// Whether `pnt` falls inside a currently tracked arc — on an
    /// untouched circle, whether the circle is still active at all.
    pub fn is_in_active_arc(
        &self,
        bisecs: &BisectorTable,
        sqrd_time: &RootOf2,
        pnt: &ArcPoint,
    ) -> bool {
        if self.isects.is_empty() {
            return self.is_active;
        }
        let left = self.search_neighbor_at(bisecs, sqrd_time, pnt, true);
        let right = self.search_neighbor_at(bisecs, sqrd_time, pnt, false);
        match (left, right) {
            (Some(left), Some(right)) => self.incls_arc(&(left, right), false),
            _ => false,
        }
    }

    /// Structural consistency: one adjacency pair per arc, and every
    /// tracked intersection bounds some arc.
    pub fn is_consistent(&self) -> bool {
        if self.arcs.len() != self.lefts.len() || self.arcs.len() != self.rights.len() {
            return false;
        }
        let mut endpoints = BTreeSet::new();
        for (from, to) in self.arcs.keys() {
            if self.rights.get(from) != Some(to) || self.lefts.get(to) != Some(from) {
                return false;
            }
            endpoints.insert(*from);
            endpoints.insert(*to);
        }
        endpoints == self.isects
    }

    fn insert_arc(&mut self, sqrd_time: &RootOf2, from: IsectId, to: IsectId, is_on_wf: bool) {
        debug!(
            "circle {}: + arc {:?} -> {:?} (wavefront: {}) at {}",
            self.site.id(),
            from,
            to,
            is_on_wf,
            sqrd_time
        );
        self.arcs.insert((from, to), is_on_wf);
        self.rights.insert(from, to);
        self.lefts.insert(to, from);
    }

    fn erase_arc(&mut self, sqrd_time: &RootOf2, from: IsectId, to: IsectId, must: bool) {
        debug!(
            "circle {}: - arc {:?} -> {:?} at {}",
            self.site.id(),
            from,
            to,
            sqrd_time
        );
        if self.incls_arc(&(from, to), must) {
            self.arcs.remove(&(from, to));
        }
        if must {
            assert!(
                self.rights.contains_key(&from),
                "circle {}: missing right adjacency of {:?}",
                self.site.id(),
                from
            );
            assert!(
                self.lefts.contains_key(&to),
                "circle {}: missing left adjacency of {:?}",
                self.site.id(),
                to
            );
        }
        self.rights.remove(&from);
        self.lefts.remove(&to);
    }

    fn insert_isect(&mut self, id: IsectId) {
        self.isects.insert(id);
    }

    fn incls_arc(&self, key: &ArcKey, must: bool) -> bool {
        let present = self.arcs.contains_key(key);
        if must && !present {
            panic!(
                "circle {}: expected arc {:?} -> {:?}",
                self.site.id(),
                key.0,
                key.1
            );
        }
        present
    }
}

fn set_wf(isects: &mut IsectTable, id: &IsectId, sqrd_time: &RootOf2, flag: bool) {
    match isects.get_mut(id) {
        Some(isect) => isect.set_is_wf_vert(sqrd_time, flag),
        None => warn!("no canonical intersection for {:?}", id),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bisector::Bisector;
    use crate::geom::Point;
    use crate::intersection::MovingIntersection;
    use crate::num::rat;
    use crate::trajectory::TrajId;

    fn site(id: usize, w: i64, x: i64, y: i64) -> Site {
        Site::new_point(id, rat(w), Point::from_ints(x, y))
    }

    /// Three equal-weight sites: A(0,0), B(10,0), C(2,8). Builds the
    /// bisector and intersection tables for the pairs involving A.
    fn tables() -> (BisectorTable, IsectTable, [Site; 3]) {
        let a = site(0, 1, 0, 0);
        let b = site(1, 1, 10, 0);
        let c = site(2, 1, 2, 8);

        let mut bisecs = BisectorTable::new();
        for (s1, s2) in [(&a, &b), (&a, &c), (&b, &c)] {
            let bisec = Bisector::new(s1, s2).unwrap();
            bisecs.insert(bisec.id(), bisec);
        }

        let mut isects = IsectTable::new();
        for bisec in bisecs.values() {
            for traj in bisec.trajs() {
                isects.insert(traj.id(), MovingIntersection::new(traj.id()));
            }
        }
        (bisecs, isects, [a, b, c])
    }

    fn traj_pair(pair: (usize, usize)) -> (TrajId, TrajId) {
        let left = TrajId {
            pair,
            is_left: true,
            is_first: true,
        };
        let right = TrajId {
            pair,
            is_left: false,
            is_first: true,
        };
        (left, right)
    }

    #[test]
    fn first_spawn_splits_the_circle() {
        let (bisecs, mut isects, [a, ..]) = tables();
        let (l, r) = traj_pair((0, 1));

        // Circle of the greater site carries both the shielded and the
        // wavefront arc.
        let mut high = OffsetCircle::new(a.clone());
        high.spawn_arc(&bisecs, &mut isects, &RootOf2::from_int(25), l, r, true, false);
        assert_eq!(high.arcs().len(), 2);
        assert_eq!(high.arcs()[&(l, r)], false);
        assert_eq!(high.arcs()[&(r, l)], true);
        assert!(high.is_consistent());

        // The lesser site only tracks its wavefront arc.
        let mut low = OffsetCircle::new(a);
        low.spawn_arc(&bisecs, &mut isects, &RootOf2::from_int(25), l, r, false, false);
        assert_eq!(low.arcs().len(), 1);
        assert_eq!(low.arcs()[&(l, r)], true);
        assert!(low.is_consistent());

        // Both intersections went on the wavefront.
        assert!(isects[&l].is_wf_vert());
        assert!(isects[&r].is_wf_vert());
    }

    #[test]
    fn second_spawn_splits_the_covering_arc() {
        let (bisecs, mut isects, [a, ..]) = tables();
        let (ac_l, ac_r) = traj_pair((0, 2));
        let (ab_l, ab_r) = traj_pair((0, 1));

        let mut circ = OffsetCircle::new(a);
        // Pair (A, C) collides first (t = 17), then (A, B) at t = 25.
        circ.spawn_arc(&bisecs, &mut isects, &RootOf2::from_int(17), ac_l, ac_r, false, false);
        circ.spawn_arc(&bisecs, &mut isects, &RootOf2::from_int(25), ab_l, ab_r, false, false);

        assert_eq!(circ.arcs().len(), 2);
        assert!(circ.is_consistent());
        assert_eq!(circ.isects().len(), 4);
    }

    #[test]
    fn delete_arc_empties_and_deactivates() {
        let (bisecs, mut isects, [a, ..]) = tables();
        let (l, r) = traj_pair((0, 1));
        let t0 = RootOf2::from_int(25);

        let mut circ = OffsetCircle::new(a);
        circ.spawn_arc(&bisecs, &mut isects, &t0, l, r, false, false);

        let t1 = RootOf2::from_int(40);
        let merged = circ.delete_arc(&mut isects, &t1, l, r, false);
        assert!(merged.is_none());
        assert!(circ.arcs().is_empty());
        assert!(!circ.is_active());
        assert!(circ.is_consistent());
        assert!(!isects[&l].is_wf_vert());
        assert!(!isects[&r].is_wf_vert());
    }

    #[test]
    fn delete_arc_merges_flanking_arcs() {
        let (bisecs, mut isects, [a, ..]) = tables();
        let (ac_l, ac_r) = traj_pair((0, 2));
        let (ab_l, ab_r) = traj_pair((0, 1));

        let mut circ = OffsetCircle::new(a.clone());
        circ.spawn_arc(&bisecs, &mut isects, &RootOf2::from_int(17), ac_l, ac_r, true, false);
        circ.spawn_arc(&bisecs, &mut isects, &RootOf2::from_int(25), ab_l, ab_r, true, false);
        assert_eq!(circ.arcs().len(), 4);
        let before = circ.is_consistent();
        assert!(before);

        // Deleting the (A,B) pair merges its flanks back together.
        let merged = circ.delete_arc(&mut isects, &RootOf2::from_int(30), ab_l, ab_r, true);
        assert!(merged.is_some());
        assert_eq!(circ.arcs().len(), 2);
        assert!(circ.is_consistent());
        assert!(!circ.incls_isect(&ab_l));
        assert!(!circ.incls_isect(&ab_r));
    }

    #[test]
    fn consistency_catches_missing_adjacency() {
        let (bisecs, mut isects, [a, ..]) = tables();
        let (l, r) = traj_pair((0, 1));
        let mut circ = OffsetCircle::new(a);
        circ.spawn_arc(&bisecs, &mut isects, &RootOf2::from_int(25), l, r, true, false);
        assert!(circ.is_consistent());
        circ.lefts.clear();
        assert!(!circ.is_consistent());
    }
}
