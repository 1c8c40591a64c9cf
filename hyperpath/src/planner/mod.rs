//! Optimal-strategy planner.
//!
//! This module implements the core of the crate: for a fixed destination,
//! find the hyperpath of "attractive" links that optimises a cost model at
//! every stop, then split origin-destination demand across it.
//!
//! The search is a single generic label-correcting loop parameterised by a
//! [`CostModel`]. Four models are provided: expected cost, expected cost
//! with line continuations, on-time probability and time-budget
//! reliability.

mod assign;
mod config;
mod distribution;
mod model;
mod models;
mod order;
mod pipeline;
mod search;


pub use assign::{AssignmentError, DemandMatrix, DroppedDemand, Volumes, assign_demand};
pub use config::{AssignmentConfig, SearchConfig, UnreachableDemand};
pub use distribution::{normal_cdf, on_time_probability};
pub use model::{
    CostModel, Inclusion, NodeState, NodeStates, Relaxation, RouteState, StateLabel, find_state,
    origin_state,
};
pub use models::{ExpectedCost, Moments, OnTimeProbability, RouteAware, TimeBudget};
pub use pipeline::{
    BatchAssignment, DestinationRun, HyperpathResult, PlannerError, assign_od_matrix,
    compute_hyperpath,
};
pub use search::{
    AttractiveLink, LabelUpdate, SearchError, SearchStatus, Strategy, find_optimal_strategy,
};
