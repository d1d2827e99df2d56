//! Moving intersections.
//!
//! A moving intersection is the topological vertex that slides along
//! one trajectory as time advances. Identity is the trajectory id; the
//! scheduler keeps one canonical instance per id. The wavefront switch
//! log is append-only and is what the diagram is later read from: a
//! log interval with flag `true` and distinct endpoint times is a
//! diagram edge.

use crate::bisector::BisectorTable;
use crate::geom::ArcPoint;
use crate::num::RootOf2;
use crate::trajectory::{TrajId, Trajectory};
use std::collections::BTreeMap;

/// Intersection ids coincide with trajectory ids.
pub type IsectId = TrajId;

/// Arena of moving intersections, keyed by identity. At most one
/// instance per trajectory identity exists at any time.
pub type IsectTable = BTreeMap<IsectId, MovingIntersection>;

#[derive(Clone, Debug)]
pub struct MovingIntersection {
    traj: TrajId,
    is_wf_vert: bool,
    switches: Vec<(RootOf2, bool)>,
}

impl MovingIntersection {
    pub fn new(traj: TrajId) -> Self {
        Self {
            traj,
            is_wf_vert: true,
            switches: Vec::new(),
        }
    }

    pub fn id(&self) -> IsectId {
        self.traj
    }

    pub fn is_wf_vert(&self) -> bool {
        self.is_wf_vert
    }

    pub fn switches(&self) -> &[(RootOf2, bool)] {
        &self.switches
    }

    /// Appends a wavefront-membership switch. The log is never
    /// rewritten.
    pub fn set_is_wf_vert(&mut self, sqrd_time: &RootOf2, is_wf_vert: bool) {
        self.switches.push((sqrd_time.clone(), is_wf_vert));
        self.is_wf_vert = is_wf_vert;
    }
}

/// Resolves a trajectory id against the bisector arena.
pub fn lookup_traj<'a>(bisecs: &'a BisectorTable, id: &TrajId) -> Option<&'a Trajectory> {
    debug_assert!(id.is_first, "split trajectories are not cached separately");
    bisecs.get(&id.pair).map(|b| b.traj(id.is_left))
}

/// Position of the intersection `id` at `sqrd_time`, if its trajectory
/// covers that time.
pub fn isect_pnt_at(bisecs: &BisectorTable, id: &IsectId, sqrd_time: &RootOf2) -> Option<ArcPoint> {
    lookup_traj(bisecs, id).and_then(|t| t.pnt_at(sqrd_time))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn switch_log_is_append_only() {
        let id = TrajId {
            pair: (0, 1),
            is_left: true,
            is_first: true,
        };
        let mut isect = MovingIntersection::new(id);
        assert!(isect.is_wf_vert());
        assert!(isect.switches().is_empty());

        isect.set_is_wf_vert(&RootOf2::from_int(3), true);
        isect.set_is_wf_vert(&RootOf2::from_int(7), false);
        assert!(!isect.is_wf_vert());
        assert_eq!(isect.switches().len(), 2);
        assert_eq!(isect.switches()[0], (RootOf2::from_int(3), true));
        assert_eq!(isect.switches()[1], (RootOf2::from_int(7), false));
    }
}
