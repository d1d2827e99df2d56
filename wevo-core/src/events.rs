//! Typed events and the global time-ordered queue.
//!
//! Events are transient: created speculatively, compared by exact
//! time, consumed once. Same-pair collision and domination events are
//! always generated — and consumed — as twin pairs; the queue supports
//! that by handing out *batches*: all events sharing the minimal exact
//! time, in insertion order, so the scheduler pairs twins explicitly
//! instead of peeking and re-pushing.

use crate::geom::ArcPoint;
use crate::intersection::IsectId;
use crate::num::RootOf2;
use crate::site::SiteId;
use crate::time_point::PairId;
use std::cmp::Ordering;
use std::collections::BinaryHeap;

#[derive(Clone, Debug)]
pub enum EventKind {
    /// Two growth circles touch for the first time; carries the pair
    /// whose bisector trajectories begin here.
    Collision { pair: PairId, pierces: bool },
    /// The pair's trajectories retire at the domination transit point.
    Domination { isect1: IsectId, isect2: IsectId },
    /// Two moving intersections on one offset circle coincide.
    Edge { isect1: IsectId, isect2: IsectId },
}

#[derive(Clone, Debug)]
pub struct Event {
    pub pnt: ArcPoint,
    pub sqrd_time: RootOf2,
    pub site: SiteId,
    pub kind: EventKind,
}

struct QueueEntry {
    seq: u64,
    ev: Event,
}

impl PartialEq for QueueEntry {
    fn eq(&self, other: &Self) -> bool {
        self.seq == other.seq
    }
}

impl Eq for QueueEntry {}

impl PartialOrd for QueueEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for QueueEntry {
    // Max-heap; invert so the earliest time pops first, FIFO on ties.
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .ev
            .sqrd_time
            .cmp(&self.ev.sqrd_time)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

#[derive(Default)]
pub struct EventQueue {
    heap: BinaryHeap<QueueEntry>,
    seq: u64,
}

impl EventQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, ev: Event) {
        let seq = self.seq;
        self.seq += 1;
        self.heap.push(QueueEntry { seq, ev });
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    pub fn len(&self) -> usize {
        self.heap.len()
    }

    /// Removes and returns every event at the minimal time, in
    /// insertion order.
    pub fn pop_batch(&mut self) -> Vec<Event> {
        let Some(first) = self.heap.pop() else {
            return Vec::new();
        };
        let time = first.ev.sqrd_time.clone();
        let mut batch = vec![first.ev];
        while let Some(top) = self.heap.peek() {
            if top.ev.sqrd_time != time {
                break;
            }
            batch.push(self.heap.pop().expect("peeked").ev);
        }
        batch
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geom::Point;

    fn ev(t: i64, site: SiteId) -> Event {
        Event {
            pnt: Point::from_ints(t, 0).to_arc_point(),
            sqrd_time: RootOf2::from_int(t),
            site,
            kind: EventKind::Collision {
                pair: (0, 1),
                pierces: false,
            },
        }
    }

    #[test]
    fn batches_drain_in_nondecreasing_time() {
        let mut queue = EventQueue::new();
        for (t, site) in [(5, 0), (2, 1), (9, 2), (2, 3), (5, 4)] {
            queue.push(ev(t, site));
        }

        let mut last = RootOf2::from_int(-1);
        let mut total = 0;
        while !queue.is_empty() {
            let batch = queue.pop_batch();
            assert!(!batch.is_empty());
            let time = batch[0].sqrd_time.clone();
            assert!(last < time);
            for e in &batch {
                assert_eq!(e.sqrd_time, time);
            }
            total += batch.len();
            last = time;
        }
        assert_eq!(total, 5);
    }

    #[test]
    fn ties_preserve_insertion_order() {
        let mut queue = EventQueue::new();
        for site in 0..4 {
            queue.push(ev(7, site));
        }
        let batch = queue.pop_batch();
        let sites: Vec<SiteId> = batch.iter().map(|e| e.site).collect();
        assert_eq!(sites, vec![0, 1, 2, 3]);
        assert!(queue.is_empty());
    }
}
