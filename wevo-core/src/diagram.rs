//! The event-driven sweep and its orchestration.
//!
//! [`VorDiag::build`] consumes site records, seeds collision events
//! for every considered pair, and drains the queue in one
//! deterministic loop. All shared state lives in flat tables owned by
//! the engine — bisectors by pair, moving intersections by trajectory
//! identity, offset circles by site — and events carry ids only.
//!
//! Validity policy: geometric preconditions of an event may
//! legitimately have evaporated by the time it pops (events are
//! generated optimistically); such events are counted and dropped.
//! Structural inconsistencies panic.

use crate::bisector::{Bisector, BisectorTable};
use crate::error::Error;
use crate::events::{Event, EventKind, EventQueue};
use crate::geom::{ArcPoint, Circle, Point};
use crate::intersection::{lookup_traj, IsectId, IsectTable, MovingIntersection};
use crate::num::{rat, RootOf2};
use crate::offset_circle::OffsetCircle;
use crate::site::{Site, SiteId};
use crate::time_point::{pair_id, PairId};
use crate::trajectory::SectionCurve;
use log::{debug, error, warn};
use std::collections::{BTreeMap, BTreeSet};

/// One input record: integer coordinates and weight.
#[derive(Clone, Copy, Debug)]
pub struct SiteRecord {
    pub x: i64,
    pub y: i64,
    pub weight: i64,
}

/// Per-run event statistics.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Stats {
    pub coll_evs: usize,
    pub invalid_coll_evs: usize,
    pub dom_evs: usize,
    pub invalid_dom_evs: usize,
    pub edge_evs: usize,
    pub invalid_edge_evs: usize,
    pub vor_verts: usize,
}

/// A circular diagram edge, counterclockwise from `source` to
/// `target` on `circle`.
#[derive(Clone, Debug)]
pub struct DiagramArc {
    pub pair: PairId,
    pub circle: Circle,
    pub source: ArcPoint,
    pub target: ArcPoint,
}

/// A straight diagram edge (equal-weight bisector piece).
#[derive(Clone, Debug)]
pub struct DiagramSeg {
    pub pair: PairId,
    pub source: ArcPoint,
    pub target: ArcPoint,
}

/// The finished multiplicatively weighted Voronoi diagram.
#[derive(Debug)]
pub struct VorDiag {
    sites: Vec<Site>,
    edges: Vec<DiagramArc>,
    segs: Vec<DiagramSeg>,
    stats: Stats,
}

impl VorDiag {
    /// Runs the full sweep. Records are sorted by descending weight
    /// (stable) and then given sequential ids; `cand_sets`, when
    /// present, restricts the pairs considered to ids co-occurring in
    /// some set — a performance narrowing only.
    pub fn build(
        records: &[SiteRecord],
        cand_sets: Option<&[BTreeSet<SiteId>]>,
    ) -> Result<Self, Error> {
        for (i, rec) in records.iter().enumerate() {
            if rec.weight <= 0 {
                return Err(Error::NonPositiveWeight(i));
            }
        }

        let mut ordered: Vec<&SiteRecord> = records.iter().collect();
        ordered.sort_by(|a, b| b.weight.cmp(&a.weight));

        let sites: Vec<Site> = ordered
            .iter()
            .enumerate()
            .map(|(id, rec)| Site::new_point(id, rat(rec.weight), Point::from_ints(rec.x, rec.y)))
            .collect();

        let mut engine = Engine::new(sites);
        engine.comp_colls(cand_sets)?;
        engine.run();
        let (edges, segs) = engine.comp_vor_edges();

        Ok(Self {
            sites: engine.sites,
            edges,
            segs,
            stats: engine.stats,
        })
    }

    pub fn sites(&self) -> &[Site] {
        &self.sites
    }

    pub fn edges(&self) -> &[DiagramArc] {
        &self.edges
    }

    pub fn segs(&self) -> &[DiagramSeg] {
        &self.segs
    }

    pub fn stats(&self) -> &Stats {
        &self.stats
    }
}

struct Engine {
    sites: Vec<Site>,
    bisecs: BisectorTable,
    isects: IsectTable,
    circs: BTreeMap<SiteId, OffsetCircle>,
    queue: EventQueue,
    stats: Stats,
}

impl Engine {
    fn new(sites: Vec<Site>) -> Self {
        let circs = sites
            .iter()
            .map(|s| (s.id(), OffsetCircle::new(s.clone())))
            .collect();
        Self {
            sites,
            bisecs: BisectorTable::new(),
            isects: IsectTable::new(),
            circs,
            queue: EventQueue::new(),
            stats: Stats::default(),
        }
    }

    /// Seeds two collision events per considered pair, one per
    /// incident site.
    fn comp_colls(&mut self, cand_sets: Option<&[BTreeSet<SiteId>]>) -> Result<(), Error> {
        match cand_sets {
            None => {
                for a in 0..self.sites.len() {
                    for b in (a + 1)..self.sites.len() {
                        self.comp_coll(a, b)?;
                    }
                }
            }
            Some(sets) => {
                let n = self.sites.len();
                let mut seen = BTreeSet::new();
                for set in sets {
                    for &c1 in set {
                        for &c2 in set {
                            if c1 == c2 {
                                continue;
                            }
                            if c1 >= n || c2 >= n {
                                return Err(Error::CandidateOutOfRange(c1.max(c2), n));
                            }
                            let pair = pair_id(c1, c2);
                            if seen.insert(pair) {
                                self.comp_coll(pair.0, pair.1)?;
                            }
                        }
                    }
                }
            }
        }
        Ok(())
    }

    fn comp_coll(&mut self, a: SiteId, b: SiteId) -> Result<(), Error> {
        let pair = pair_id(a, b);
        if !self.bisecs.contains_key(&pair) {
            let bisec = Bisector::new(&self.sites[a], &self.sites[b])?;
            self.bisecs.insert(pair, bisec);
        }

        let coll = self.bisecs[&pair].coll().clone();
        for site in [a, b] {
            self.queue.push(Event {
                pnt: coll.pnt.clone(),
                sqrd_time: coll.sqrd_time.clone(),
                site,
                kind: EventKind::Collision {
                    pair,
                    pierces: false,
                },
            });
        }
        Ok(())
    }

    /// Drains the queue. Each batch holds every event at one exact
    /// time; within a batch, events are grouped by exact point and the
    /// groups are dispatched in arrival order.
    fn run(&mut self) {
        let mut last_time: Option<RootOf2> = None;
        while !self.queue.is_empty() {
            let batch = self.queue.pop_batch();
            debug_assert!(!batch.is_empty());
            if let Some(prev) = &last_time {
                debug_assert!(*prev <= batch[0].sqrd_time, "queue ran backwards");
            }
            last_time = Some(batch[0].sqrd_time.clone());

            let mut groups: Vec<Vec<Event>> = Vec::new();
            'events: for ev in batch {
                for group in &mut groups {
                    if group[0].pnt == ev.pnt {
                        group.push(ev);
                        continue 'events;
                    }
                }
                groups.push(vec![ev]);
            }

            for group in groups {
                self.handle_group(group);
            }
        }
    }

    fn handle_group(&mut self, group: Vec<Event>) {
        let mut colls: Vec<Event> = Vec::new();
        let mut doms: Vec<Event> = Vec::new();
        let mut edges: Vec<Event> = Vec::new();
        for ev in group {
            match ev.kind {
                EventKind::Collision { .. } => colls.push(ev),
                EventKind::Domination { .. } => doms.push(ev),
                EventKind::Edge { .. } => edges.push(ev),
            }
        }

        // Collision twins pair up by site pair.
        while !colls.is_empty() {
            let ev1 = colls.remove(0);
            let EventKind::Collision { pair, .. } = &ev1.kind else {
                unreachable!()
            };
            let pair = *pair;
            let twin = colls.iter().position(|e| {
                matches!(e.kind, EventKind::Collision { pair: p, .. } if p == pair)
            });
            match twin {
                Some(i) => {
                    let ev2 = colls.remove(i);
                    self.handle_coll_pair(ev1, ev2);
                }
                None => {
                    warn!("unpaired collision event for pair {pair:?}");
                    self.stats.invalid_coll_evs += 1;
                }
            }
        }

        // Domination twins pair up by their trajectory pair.
        while !doms.is_empty() {
            let ev1 = doms.remove(0);
            let EventKind::Domination { isect1, isect2 } = &ev1.kind else {
                unreachable!()
            };
            let (isect1, isect2) = (*isect1, *isect2);
            let twin = doms.iter().position(|e| {
                matches!(e.kind, EventKind::Domination { isect1: a, isect2: b }
                    if a == isect1 && b == isect2)
            });
            match twin {
                Some(i) => {
                    let ev2 = doms.remove(i);
                    self.handle_dom_pair(ev1, ev2);
                }
                None => {
                    warn!("unpaired domination event for {isect1:?}");
                    self.stats.invalid_dom_evs += 1;
                }
            }
        }

        if !edges.is_empty() {
            self.handle_edge_group(edges);
        }
    }

    fn handle_coll_pair(&mut self, ev1: Event, ev2: Event) {
        debug_assert!(ev1.sqrd_time == ev2.sqrd_time);
        let EventKind::Collision { pierces, .. } = &ev1.kind else {
            unreachable!()
        };
        let pierces = *pierces;

        let b_dom = self.sites[ev1.site] > self.sites[ev2.site];
        let valid = self.circs[&ev1.site].is_in_active_arc(&self.bisecs, &ev1.sqrd_time, &ev1.pnt)
            && self.circs[&ev2.site].is_in_active_arc(&self.bisecs, &ev2.sqrd_time, &ev2.pnt);

        self.process_coll(ev1, b_dom, valid, pierces);
        self.process_coll(ev2, !b_dom, valid, pierces);
    }

    fn process_coll(&mut self, ev: Event, b_dom: bool, valid: bool, pierces: bool) {
        let EventKind::Collision { pair, .. } = &ev.kind else {
            unreachable!()
        };
        let pair = *pair;
        let (id_left, id_right) = {
            let bisec = &self.bisecs[&pair];
            (bisec.traj(true).id(), bisec.traj(false).id())
        };
        self.make_isect(id_left);
        self.make_isect(id_right);

        if valid {
            debug!(
                "valid collision of pair {:?} on circle {} at {}",
                pair, ev.site, ev.sqrd_time
            );
            let circ = self.circs.get_mut(&ev.site).expect("circle exists");
            circ.spawn_arc(
                &self.bisecs,
                &mut self.isects,
                &ev.sqrd_time,
                id_left,
                id_right,
                b_dom,
                pierces,
            );
            self.check_edge_ev_side(
                ev.site,
                &ev.sqrd_time,
                id_left,
                if pierces { !b_dom } else { b_dom },
            );
            self.check_edge_ev_side(
                ev.site,
                &ev.sqrd_time,
                id_right,
                if pierces { b_dom } else { !b_dom },
            );
            self.stats.coll_evs += 1;
        } else {
            debug!(
                "ignored invalid collision of pair {:?} on circle {} at {}",
                pair, ev.site, ev.sqrd_time
            );
            self.stats.invalid_coll_evs += 1;
        }

        // The follow-up domination is always scheduled.
        let end = lookup_traj(&self.bisecs, &id_left)
            .expect("trajectory cached")
            .end()
            .clone();
        self.queue.push(Event {
            pnt: end.pnt,
            sqrd_time: end.sqrd_time,
            site: ev.site,
            kind: EventKind::Domination {
                isect1: id_left,
                isect2: id_right,
            },
        });
    }

    fn handle_dom_pair(&mut self, ev1: Event, ev2: Event) {
        debug_assert!(ev1.sqrd_time == ev2.sqrd_time);
        let b_dom = self.sites[ev1.site] > self.sites[ev2.site];

        let circ1 = &self.circs[&ev1.site];
        let circ2 = &self.circs[&ev2.site];
        let valid = (circ1.is_in_active_arc(&self.bisecs, &ev1.sqrd_time, &ev1.pnt)
            && circ2.is_in_active_arc(&self.bisecs, &ev2.sqrd_time, &ev2.pnt))
            || (circ1.is_active() && circ2.is_active());

        if valid {
            self.process_dom(ev1, b_dom);
            self.process_dom(ev2, !b_dom);
        } else {
            debug!(
                "ignored invalid domination pair on circles {} and {} at {}",
                ev1.site, ev2.site, ev1.sqrd_time
            );
            self.stats.invalid_dom_evs += 2;
        }
    }

    fn process_dom(&mut self, ev: Event, b_dom: bool) {
        let EventKind::Domination { isect1, isect2 } = &ev.kind else {
            unreachable!()
        };
        let (isect1, isect2) = (*isect1, *isect2);
        debug!(
            "valid domination on circle {} at {}",
            ev.site, ev.sqrd_time
        );
        let circ = self.circs.get_mut(&ev.site).expect("circle exists");
        let merged = circ.delete_arc(&mut self.isects, &ev.sqrd_time, isect1, isect2, b_dom);
        if let Some((left, right)) = merged {
            self.check_edge_ev(ev.site, &ev.sqrd_time, left, right);
        }
        self.stats.dom_evs += 1;
    }

    /// Handles all edge events of one (time, point) group. The first
    /// event is the primary; the rest are twin candidates, each
    /// identifying a third site whose boundary passes through the same
    /// point.
    fn handle_edge_group(&mut self, mut evs: Vec<Event>) {
        let primary = evs.remove(0);
        let EventKind::Edge { isect1, isect2 } = &primary.kind else {
            unreachable!()
        };
        let (isect1, isect2) = (*isect1, *isect2);
        let site1 = primary.site;
        let Some(site2) = self.other_site_id(site1, &isect1) else {
            return;
        };
        let Some(site3) = self.other_site_id(site1, &isect2) else {
            return;
        };

        let mut ids = BTreeSet::from([site1]);
        let mut twins: Vec<Event> = Vec::new();
        for ev in evs {
            let EventKind::Edge {
                isect1: i1,
                isect2: i2,
            } = &ev.kind
            else {
                continue;
            };
            let circ = &self.circs[&ev.site];
            if !ids.contains(&ev.site) && circ.incls_isect(i1) && circ.incls_isect(i2) {
                ids.insert(ev.site);
                self.stats.edge_evs += 1;
                twins.push(ev);
            } else {
                debug!("invalid twin edge event on circle {}", ev.site);
                self.stats.invalid_edge_evs += 1;
            }
        }

        if !twins.is_empty() {
            // Three arcs vanish simultaneously.
            let mut involved = if twins.len() != 2 {
                warn!(
                    "three-arc meet with {} twin events instead of two",
                    twins.len()
                );
                vec![site1, site2, site3]
            } else {
                vec![site1, twins[0].site, twins[1].site]
            };
            involved.sort_by(|a, b| self.sites[*a].cmp(&self.sites[*b]));
            let (low, med, high) = (involved[0], involved[1], involved[2]);

            if self.delete_lowest_arc(&primary.pnt, &primary.sqrd_time, low, med, high) {
                self.stats.edge_evs += 1;
            }
            return;
        }

        let gt2 = self.sites[site1] > self.sites[site2];
        let gt3 = self.sites[site1] > self.sites[site3];
        if gt2 && gt3 {
            self.edge_on_highest(&primary, site1, site2, site3);
        } else if !gt2 && !gt3 {
            // Reached only when the event ordering has gone wrong; the
            // lowest-weighted arc cannot vanish without twin events.
            error!(
                "arc vanished along lowest-weighted site {} without twins at {}",
                site1, primary.sqrd_time
            );
            self.stats.invalid_edge_evs += 1;
        } else {
            self.edge_on_medium(&primary, site1, site2, site3);
        }
    }

    /// The vanished arc lies on the highest-weighted of the three
    /// sites.
    fn edge_on_highest(&mut self, ev: &Event, site1: SiteId, site2: SiteId, site3: SiteId) {
        debug!("arc vanished along the highest-weighted site {site1}");
        let t = ev.sqrd_time.clone();
        let (low_id, med_id) = if self.sites[site2] < self.sites[site3] {
            (site2, site3)
        } else {
            (site3, site2)
        };

        let (Some(isect1), Some(isect2), Some(isect3)) = (
            self.make_isect_at(&ev.pnt, low_id, med_id),
            self.make_isect_at(&ev.pnt, low_id, site1),
            self.make_isect_at(&ev.pnt, med_id, site1),
        ) else {
            return;
        };

        if !self.circs[&low_id].incls_isect(&isect2)
            || !self.circs[&med_id].incls_isect(&isect3)
            || !self.circs[&site1].incls_isect(&isect2)
            || !self.circs[&site1].incls_isect(&isect3)
        {
            debug!("invalid edge event on circle {site1}");
            self.stats.invalid_edge_evs += 1;
            return;
        }

        let wf2 = self.isects[&isect2].is_wf_vert();
        let wf3 = self.isects[&isect3].is_wf_vert();

        let check_nb = {
            let med = self.circs.get_mut(&med_id).expect("circle exists");
            med.expand_isect(&self.bisecs, &t, &isect3, &isect1, wf2 && !wf3)
        };
        let b_left1 = self
            .circs
            .get_mut(&site1)
            .expect("circle exists")
            .collapse_arc(&t, &isect2, &isect3);
        let b_left3 = self
            .circs
            .get_mut(&low_id)
            .expect("circle exists")
            .replace_isect(&self.isects, &t, &isect2, &isect1);

        self.check_edge_ev_side(site1, &t, isect3, b_left1);
        if check_nb.0 {
            self.check_edge_ev_side(med_id, &t, isect1, true);
            self.check_edge_ev_side(med_id, &t, isect1, false);
        } else {
            self.check_edge_ev_side(med_id, &t, isect1, check_nb.1);
        }
        self.check_edge_ev_side(low_id, &t, isect1, b_left3);

        if wf2 && wf3 {
            self.set_isect_wf(&isect1, &t, true);
            self.set_isect_wf(&isect2, &t, false);
            self.set_isect_wf(&isect3, &t, false);
            self.stats.vor_verts += 1;
        } else if wf2 && !wf3 {
            self.set_isect_wf(&isect1, &t, true);
            self.set_isect_wf(&isect2, &t, false);
            self.set_isect_wf(&isect3, &t, true);
            self.stats.vor_verts += 1;
        } else if !wf2 && !wf3 {
            self.set_isect_wf(&isect1, &t, false);
        }

        self.stats.edge_evs += 1;
    }

    /// The vanished arc lies on the medium-weighted site.
    fn edge_on_medium(&mut self, ev: &Event, site1: SiteId, site2: SiteId, site3: SiteId) {
        debug!("arc vanished along the medium-weighted site {site1}");
        let t = ev.sqrd_time.clone();
        let (low_id, high_id) = if self.sites[site2] < self.sites[site3] {
            (site2, site3)
        } else {
            (site3, site2)
        };

        let (Some(isect1), Some(isect2), Some(isect3)) = (
            self.make_isect_at(&ev.pnt, low_id, site1),
            self.make_isect_at(&ev.pnt, low_id, high_id),
            self.make_isect_at(&ev.pnt, site1, high_id),
        ) else {
            return;
        };

        if !self.circs[&low_id].incls_isect(&isect1)
            || !self.circs[&site1].incls_isect(&isect1)
            || !self.circs[&site1].incls_isect(&isect3)
            || !self.circs[&high_id].incls_isect(&isect3)
        {
            debug!("invalid edge event on circle {site1}");
            self.stats.invalid_edge_evs += 1;
            return;
        }

        let wf1 = self.isects[&isect1].is_wf_vert();
        let wf3 = self.isects[&isect3].is_wf_vert();

        let check_nb = {
            let high = self.circs.get_mut(&high_id).expect("circle exists");
            high.expand_isect(&self.bisecs, &t, &isect3, &isect2, wf1 && !wf3)
        };
        let b_left2 = self
            .circs
            .get_mut(&site1)
            .expect("circle exists")
            .collapse_arc(&t, &isect1, &isect3);
        let b_left3 = self
            .circs
            .get_mut(&low_id)
            .expect("circle exists")
            .replace_isect(&self.isects, &t, &isect1, &isect2);

        if check_nb.0 {
            self.check_edge_ev_side(high_id, &t, isect2, true);
            self.check_edge_ev_side(high_id, &t, isect2, false);
        } else {
            self.check_edge_ev_side(high_id, &t, isect2, check_nb.1);
        }
        self.check_edge_ev_side(site1, &t, isect3, b_left2);
        self.check_edge_ev_side(low_id, &t, isect2, b_left3);

        if wf1 && wf3 {
            self.set_isect_wf(&isect1, &t, false);
            self.set_isect_wf(&isect2, &t, true);
            self.set_isect_wf(&isect3, &t, false);
            self.stats.vor_verts += 1;
        } else if wf1 && !wf3 {
            self.set_isect_wf(&isect1, &t, false);
            self.set_isect_wf(&isect2, &t, true);
            self.set_isect_wf(&isect3, &t, true);
            self.stats.vor_verts += 1;
        } else if !wf1 && !wf3 {
            self.set_isect_wf(&isect2, &t, false);
        }

        self.stats.edge_evs += 1;
    }

    /// Three arcs vanish at once: the two heavier circles collapse
    /// their vanished arcs, the lightest deletes its boundary pair
    /// outright.
    fn delete_lowest_arc(
        &mut self,
        pnt: &ArcPoint,
        t: &RootOf2,
        low: SiteId,
        med: SiteId,
        high: SiteId,
    ) -> bool {
        let (Some(isect1), Some(isect2), Some(isect3)) = (
            self.make_isect_at(pnt, low, med),
            self.make_isect_at(pnt, low, high),
            self.make_isect_at(pnt, med, high),
        ) else {
            return false;
        };

        if !self.circs[&low].incls_isect(&isect1)
            || !self.circs[&low].incls_isect(&isect2)
            || !self.circs[&med].incls_isect(&isect1)
            || !self.circs[&med].incls_isect(&isect3)
            || !self.circs[&high].incls_isect(&isect2)
            || !self.circs[&high].incls_isect(&isect3)
        {
            debug!("invalid three-arc edge event at {t}");
            self.stats.invalid_edge_evs += 1;
            return false;
        }

        let wf1 = self.isects[&isect1].is_wf_vert();
        let wf2 = self.isects[&isect2].is_wf_vert();
        let wf3 = self.isects[&isect3].is_wf_vert();

        let b_left1 = self
            .circs
            .get_mut(&high)
            .expect("circle exists")
            .collapse_arc(t, &isect2, &isect3);
        let b_left2 = self
            .circs
            .get_mut(&med)
            .expect("circle exists")
            .collapse_arc(t, &isect1, &isect3);
        self.circs
            .get_mut(&low)
            .expect("circle exists")
            .delete_arc_unordered(&mut self.isects, t, isect1, isect2, false);

        self.check_edge_ev_side(high, t, isect3, b_left1);
        self.check_edge_ev_side(med, t, isect3, b_left2);

        if wf1 && wf2 && wf3 {
            self.set_isect_wf(&isect1, t, false);
            self.set_isect_wf(&isect2, t, false);
            self.set_isect_wf(&isect3, t, false);
            // Three genuinely distinct wavefront arcs meet here.
            self.stats.vor_verts += 1;
        } else if wf1 && wf2 && !wf3 {
            self.set_isect_wf(&isect1, t, false);
            self.set_isect_wf(&isect2, t, false);
            self.set_isect_wf(&isect3, t, true);
            self.stats.vor_verts += 1;
        }

        true
    }

    /// Schedules an edge event between `isect` and its angular
    /// neighbor on the given side, if their trajectories meet in the
    /// strict future.
    fn check_edge_ev_side(&mut self, site: SiteId, t: &RootOf2, isect: IsectId, left: bool) {
        let Some(other) = self.circs[&site].neighbor(&isect, left) else {
            warn!("circle {site}: no {} neighbor of {isect:?}", if left { "left" } else { "right" });
            return;
        };
        self.check_edge_ev(site, t, isect, other);
    }

    fn check_edge_ev(&mut self, site: SiteId, t: &RootOf2, isect: IsectId, other: IsectId) {
        let (Some(traj1), Some(traj2)) = (
            lookup_traj(&self.bisecs, &isect),
            lookup_traj(&self.bisecs, &other),
        ) else {
            warn!("missing trajectory for edge check on circle {site}");
            return;
        };

        let best = traj1
            .intersect(traj2)
            .into_iter()
            .filter(|v| v.sqrd_time > *t)
            .min();

        if let Some(vert) = best {
            debug!(
                "scheduling edge event on circle {} at {}",
                site, vert.sqrd_time
            );
            self.queue.push(Event {
                pnt: vert.pnt,
                sqrd_time: vert.sqrd_time,
                site,
                kind: EventKind::Edge {
                    isect1: isect,
                    isect2: other,
                },
            });
        } else {
            debug!("no future meeting of {isect:?} and {other:?}");
        }
    }

    /// Canonical moving intersection for a trajectory identity.
    fn make_isect(&mut self, id: IsectId) {
        self.isects
            .entry(id)
            .or_insert_with(|| MovingIntersection::new(id));
    }

    /// Canonical moving intersection for the pair's trajectory through
    /// `pnt`. `None` when the bisector was never built (pruned by
    /// candidate sets) or the point cannot be classified.
    fn make_isect_at(&mut self, pnt: &ArcPoint, a: SiteId, b: SiteId) -> Option<IsectId> {
        let pair = pair_id(a, b);
        let Some(bisec) = self.bisecs.get(&pair) else {
            error!("bisector {pair:?} not found");
            return None;
        };
        match bisec.find_traj(pnt) {
            Ok(traj) => {
                let id = traj.id();
                self.make_isect(id);
                Some(id)
            }
            Err(e) => {
                warn!("cannot classify event point: {e}");
                None
            }
        }
    }

    fn other_site_id(&self, site: SiteId, isect: &IsectId) -> Option<SiteId> {
        let traj = lookup_traj(&self.bisecs, isect)?;
        Some(traj.other_site(site).id())
    }

    fn set_isect_wf(&mut self, id: &IsectId, t: &RootOf2, flag: bool) {
        if let Some(isect) = self.isects.get_mut(id) {
            isect.set_is_wf_vert(t, flag);
        }
    }

    /// Reads the diagram out of the wavefront switch logs: every
    /// interval with the flag up and distinct endpoint times is an
    /// edge.
    fn comp_vor_edges(&self) -> (Vec<DiagramArc>, Vec<DiagramSeg>) {
        let mut edges = Vec::new();
        let mut segs = Vec::new();

        for (id, isect) in &self.isects {
            let Some(traj) = lookup_traj(&self.bisecs, id) else {
                continue;
            };
            let switches = isect.switches();

            for sec in traj.secs() {
                for window in switches.windows(2) {
                    let (t1, on_wf) = &window[0];
                    let t2 = &window[1].0;
                    if !*on_wf || t1 == t2 {
                        continue;
                    }
                    let (Some(p1), Some(p2)) = (traj.pnt_at(t1), traj.pnt_at(t2)) else {
                        warn!("unevaluable edge endpoints on {id:?}");
                        continue;
                    };
                    match sec.curve() {
                        SectionCurve::Arc(circ) => {
                            let (source, target) = if traj.is_left() { (p1, p2) } else { (p2, p1) };
                            edges.push(DiagramArc {
                                pair: id.pair,
                                circle: circ.clone(),
                                source,
                                target,
                            });
                        }
                        SectionCurve::Seg(_) => {
                            segs.push(DiagramSeg {
                                pair: id.pair,
                                source: p1,
                                target: p2,
                            });
                        }
                    }
                }
            }
        }
        (edges, segs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rec(x: i64, y: i64, weight: i64) -> SiteRecord {
        SiteRecord { x, y, weight }
    }

    #[test]
    fn rejects_non_positive_weights() {
        let err = VorDiag::build(&[rec(0, 0, 0)], None).unwrap_err();
        assert!(matches!(err, Error::NonPositiveWeight(0)));
    }

    #[test]
    fn sorts_by_descending_weight_with_stable_ties() {
        let diag = VorDiag::build(&[rec(0, 0, 5), rec(1, 1, 9), rec(2, 2, 5)], None).unwrap();
        let sites = diag.sites();
        assert_eq!(sites.len(), 3);
        assert_eq!(sites[0].center(), &Point::from_ints(1, 1));
        assert_eq!(sites[1].center(), &Point::from_ints(0, 0));
        assert_eq!(sites[2].center(), &Point::from_ints(2, 2));
        for (id, site) in sites.iter().enumerate() {
            assert_eq!(site.id(), id);
        }
    }

    #[test]
    fn two_equal_sites_split_the_plane() {
        let diag = VorDiag::build(&[rec(0, 0, 1), rec(10, 0, 1)], None).unwrap();
        let stats = diag.stats();
        assert_eq!(stats.vor_verts, 0);
        assert_eq!(stats.coll_evs, 2);
        assert_eq!(stats.dom_evs, 2);
        assert_eq!(stats.invalid_coll_evs, 0);

        // The bisector is the vertical line x = 5: one straight edge
        // piece per trajectory, both starting at the midpoint.
        assert!(diag.edges().is_empty());
        assert_eq!(diag.segs().len(), 2);
        let mid = Point::from_ints(5, 0).to_arc_point();
        for seg in diag.segs() {
            assert_eq!(seg.pair, (0, 1));
            assert_eq!(seg.source, mid);
        }
    }

    #[test]
    fn unequal_pair_yields_a_circular_bisector() {
        let diag = VorDiag::build(&[rec(0, 0, 2), rec(10, 0, 1)], None).unwrap();
        let stats = diag.stats();
        assert_eq!(stats.vor_verts, 0);
        assert_eq!(stats.coll_evs, 2);
        assert_eq!(stats.dom_evs, 2);

        // Both trajectory pieces live on the Apollonius circle and
        // span collision (t = 100/9) to domination (t = 100).
        assert!(diag.segs().is_empty());
        assert_eq!(diag.edges().len(), 2);
        for arc in diag.edges() {
            assert_eq!(arc.pair, (0, 1));
            assert_eq!(arc.circle.center, Point::new(rat(40) / rat(3), rat(0)));
        }
    }

    #[test]
    fn unweighted_triangle_has_one_vertex_at_the_circumcenter() {
        let diag =
            VorDiag::build(&[rec(0, 0, 1), rec(10, 0, 1), rec(2, 8, 1)], None).unwrap();
        let stats = diag.stats();
        assert_eq!(stats.vor_verts, 1);

        // Each pair contributes a wavefront piece; the three pieces
        // consumed by the vertex event all end at the circumcenter.
        let circumcenter = Point::from_ints(5, 3).to_arc_point();
        let at_vertex = diag
            .segs()
            .iter()
            .filter(|s| s.target == circumcenter)
            .count();
        assert_eq!(at_vertex, 3);
        // One outer piece survives until its late domination closes it.
        assert_eq!(diag.segs().len(), 4);
        let pairs: BTreeSet<PairId> = diag.segs().iter().map(|s| s.pair).collect();
        assert_eq!(pairs.len(), 3);
    }

    #[test]
    fn equal_weights_respect_the_planar_edge_bound() {
        let records = [rec(0, 0, 1), rec(10, 0, 1), rec(2, 8, 1), rec(30, 1, 1)];
        let diag = VorDiag::build(&records, None).unwrap();
        assert!(diag.stats().vor_verts >= 1);

        let n = records.len();
        let pairs: BTreeSet<PairId> = diag.segs().iter().map(|s| s.pair).collect();
        assert!(pairs.len() <= 3 * n - 6);
    }

    #[test]
    fn candidate_sets_reproduce_the_exhaustive_run() {
        let records = [rec(0, 0, 1), rec(10, 0, 1), rec(2, 8, 1)];
        let full = VorDiag::build(&records, None).unwrap();

        let sets = vec![BTreeSet::from([0usize, 1, 2])];
        let narrowed = VorDiag::build(&records, Some(&sets)).unwrap();

        assert_eq!(full.stats(), narrowed.stats());
        assert_eq!(full.segs().len(), narrowed.segs().len());
    }

    #[test]
    fn candidate_ids_are_validated() {
        let records = [rec(0, 0, 1), rec(10, 0, 1)];
        let sets = vec![BTreeSet::from([0usize, 7])];
        let err = VorDiag::build(&records, Some(&sets)).unwrap_err();
        assert!(matches!(err, Error::CandidateOutOfRange(7, 2)));
    }

    #[test]
    fn random_equal_weight_instances_stay_within_bounds() {
        use rand::rngs::StdRng;
        use rand::{Rng, SeedableRng};

        let mut rng = StdRng::seed_from_u64(11);
        let n = 6;
        let records: Vec<SiteRecord> = (0..n)
            .map(|i| SiteRecord {
                // Spaced x bands keep the sites pairwise distinct.
                x: (i as i64) * 307 + rng.random_range(0..150),
                y: rng.random_range(-400..=400),
                weight: 1,
            })
            .collect();

        let diag = VorDiag::build(&records, None).unwrap();
        let stats = diag.stats();
        assert_eq!(stats.coll_evs + stats.invalid_coll_evs, n * (n - 1));
        assert_eq!(stats.dom_evs + stats.invalid_dom_evs, n * (n - 1));

        let pairs: BTreeSet<PairId> = diag.segs().iter().map(|s| s.pair).collect();
        assert!(pairs.len() <= 3 * n - 6);
    }

    #[test]
    fn mixed_weights_account_for_every_event() {
        let records = [rec(0, 0, 3), rec(40, 0, 2), rec(10, 30, 1)];
        let diag = VorDiag::build(&records, None).unwrap();
        let stats = diag.stats();

        // Three pairs, two collision events each. The pair of the two
        // lighter sites collides at a point the heaviest site has long
        // covered, so that collision (and its later domination) is
        // discarded.
        assert_eq!(stats.coll_evs, 4);
        assert_eq!(stats.invalid_coll_evs, 2);
        assert_eq!(stats.dom_evs, 4);
        assert_eq!(stats.invalid_dom_evs, 2);
        assert_eq!(stats.vor_verts, 0);

        // Two surviving bisectors, one circular piece per trajectory.
        assert_eq!(diag.edges().len(), 4);
        assert!(diag.segs().is_empty());
    }
}
