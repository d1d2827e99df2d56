//! Library error type.
//!
//! Only modeling-level failures surface here; broken internal
//! invariants (adjacency consistency, cache uniqueness) are defects
//! and panic instead. Speculative event-validity failures are neither:
//! they are counted and discarded by the scheduler.

use crate::site::SiteId;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("site record {0} has a non-positive weight")]
    NonPositiveWeight(usize),

    #[error("bisector of sites {0} and {1} did not yield exactly two transit points")]
    BisectorConstruction(SiteId, SiteId),

    #[error("candidate id {0} is out of range for {1} sites")]
    CandidateOutOfRange(usize, usize),

    #[error("point lies on the center line of pair ({0}, {1})")]
    AmbiguousSide(SiteId, SiteId),
}
