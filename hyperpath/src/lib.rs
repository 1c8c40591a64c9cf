//! Optimal-strategy transit assignment.
//!
//! Given a transit network of stop-to-stop links with travel times and
//! service headways, find for each destination the optimal strategy: the set
//! of attractive links a passenger should be willing to board at every stop,
//! and the expected cost of reaching the destination from there. Demand is
//! then split across the strategy in proportion to service frequency.

pub mod domain;
pub mod network;
pub mod planner;
pub mod queue;
pub mod scenario;
