//! Search and assignment configuration for the strategy planner.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::search::SearchError;

/// Configuration parameters for the optimal-strategy search.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// Constant substituted for degenerate products (`0 × ∞`) and for a
    /// zero combined frequency in the expected-cost combination rule.
    pub alpha: f64,

    /// Frequency given to unscheduled links (`headway <= 0`).
    pub infinite_frequency: f64,

    /// Slack allowed when comparing costs for link inclusion.
    pub tolerance: f64,

    /// Reliabilities closer than this are treated as ties, broken by the
    /// smaller mean arrival time.
    pub reliability_epsilon: f64,

    /// Lower bound on variance when turning moments into a reliability.
    pub variance_floor: f64,

    /// Maximum number of queue pops before the search gives up.
    pub max_iterations: usize,

    /// Optional wall-clock limit for a single search (milliseconds).
    pub time_limit_ms: Option<u64>,

    /// Record every label improvement on the resulting strategy.
    pub record_updates: bool,
}

impl SearchConfig {
    /// Create a new configuration with the given parameters.
    pub fn new(
        alpha: f64,
        infinite_frequency: f64,
        tolerance: f64,
        reliability_epsilon: f64,
        variance_floor: f64,
        max_iterations: usize,
    ) -> Self {
        Self {
            alpha,
            infinite_frequency,
            tolerance,
            reliability_epsilon,
            variance_floor,
            max_iterations,
            ..Self::default()
        }
    }

    /// Returns the time limit as a Duration, if set.
    pub fn time_limit(&self) -> Option<Duration> {
        self.time_limit_ms.map(Duration::from_millis)
    }

    /// Check that every parameter is usable.
    pub fn validate(&self) -> Result<(), SearchError> {
        let invalid = |msg: &str| Err(SearchError::InvalidConfig(msg.to_string()));

        if !self.alpha.is_finite() || self.alpha <= 0.0 {
            return invalid("alpha must be positive and finite");
        }
        if !self.infinite_frequency.is_finite() || self.infinite_frequency <= 0.0 {
            return invalid("infinite frequency must be positive and finite");
        }
        if !(self.tolerance >= 0.0) {
            return invalid("tolerance cannot be negative");
        }
        if !(self.reliability_epsilon >= 0.0) {
            return invalid("reliability epsilon cannot be negative");
        }
        if !(self.variance_floor > 0.0) {
            return invalid("variance floor must be positive");
        }
        if self.max_iterations == 0 {
            return invalid("max iterations must be at least 1");
        }
        Ok(())
    }
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            alpha: 1.0,
            infinite_frequency: 99_999_999_999.0,
            tolerance: 1e-9,
            reliability_epsilon: 1e-6,
            variance_floor: 1e-8,
            max_iterations: 1_000_000,
            time_limit_ms: None,
            record_updates: false,
        }
    }
}

/// What to do with demand whose origin has no attractive link.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnreachableDemand {
    /// Leave it unassigned and report it on the volumes
    #[default]
    Drop,
    /// Fail the assignment
    Reject,
}

/// Configuration parameters for demand assignment.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AssignmentConfig {
    /// Policy for demand that cannot reach its destination.
    pub unreachable_demand: UnreachableDemand,

    /// Relative tolerance for the arrived-versus-demanded check.
    pub conservation_tolerance: f64,
}

impl AssignmentConfig {
    /// Create a new configuration with the given parameters.
    pub fn new(unreachable_demand: UnreachableDemand, conservation_tolerance: f64) -> Self {
        Self {
            unreachable_demand,
            conservation_tolerance,
        }
    }
}

impl Default for AssignmentConfig {
    fn default() -> Self {
        Self {
            unreachable_demand: UnreachableDemand::Drop,
            conservation_tolerance: 1e-3,
        }
    }
}
