//! Maximum reliability of meeting a time budget.
//!
//! Labels carry the mean and variance of the time to destination. Adding a
//! link to a node's attractive set mixes its moments with those already
//! there, weighted by frequency, and the reliability is the normal
//! probability of arriving within the budget.

use serde::Serialize;

use crate::domain::TransitLink;
use crate::planner::config::SearchConfig;
use crate::planner::distribution::normal_cdf;
use crate::planner::model::{CostModel, Inclusion, Relaxation, RouteState, StateLabel};
use crate::planner::search::SearchError;
use crate::queue::DualPriority;

/// Mean and variance of the time to destination, with the reliability they
/// imply.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Moments {
    pub mean: f64,
    pub variance: f64,
    /// Probability of arriving within the budget.
    pub reliability: f64,
}

impl Moments {
    /// Moments of a node that cannot reach the destination.
    pub fn unreachable() -> Self {
        Self {
            mean: f64::INFINITY,
            variance: 0.0,
            reliability: 0.0,
        }
    }
}

/// Maximise the probability of arriving within `budget`, breaking near
/// ties by the smaller mean.
#[derive(Debug, Clone, Copy)]
pub struct TimeBudget {
    /// Time budget, in the same units as link costs.
    pub budget: f64,
}

impl TimeBudget {
    pub fn new(budget: f64) -> Self {
        Self { budget }
    }

    /// Reliability of a travel time with the given moments.
    pub fn reliability(&self, mean: f64, variance: f64, config: &SearchConfig) -> f64 {
        if !mean.is_finite() {
            return 0.0;
        }
        let scale = variance.max(config.variance_floor).sqrt();
        normal_cdf((self.budget - mean) / scale)
    }

    /// Moments of the time to destination via `link`.
    fn via(&self, link: &TransitLink, downstream: &Moments, config: &SearchConfig) -> Moments {
        if !downstream.mean.is_finite() {
            return Moments::unreachable();
        }
        let (mean, variance) = link.traversal_moments();
        let mean = downstream.mean + mean;
        let variance = downstream.variance + variance;
        Moments {
            mean,
            variance,
            reliability: self.reliability(mean, variance, config),
        }
    }
}

impl CostModel for TimeBudget {
    type Label = Moments;
    type Priority = DualPriority;

    fn name(&self) -> &'static str {
        "time_budget"
    }

    fn validate(&self) -> Result<(), SearchError> {
        if !self.budget.is_finite() {
            return Err(SearchError::InvalidModel(format!(
                "time budget must be finite, got {}",
                self.budget
            )));
        }
        Ok(())
    }

    fn unreachable(&self) -> Moments {
        Moments::unreachable()
    }

    fn perfect(&self) -> Moments {
        Moments {
            mean: 0.0,
            variance: 0.0,
            reliability: 1.0,
        }
    }

    fn is_reachable(&self, label: &Moments) -> bool {
        label.mean.is_finite()
    }

    fn priority(&self, link: &TransitLink, downstream: &Moments, config: &SearchConfig) -> DualPriority {
        let via = self.via(link, downstream, config);
        DualPriority::new(0.0 - via.reliability, via.mean, config.reliability_epsilon)
    }

    fn exhausted(&self, priority: &DualPriority) -> bool {
        priority.primary() >= 0.0 && priority.secondary() == f64::INFINITY
    }

    fn relax(
        &self,
        link: &TransitLink,
        downstream: &Moments,
        _state: &RouteState,
        current: &StateLabel<Moments>,
        config: &SearchConfig,
    ) -> Option<Relaxation<Moments>> {
        let via = self.via(link, downstream, config);
        if !via.mean.is_finite() {
            return None;
        }

        let f_a = link.frequency(config.infinite_frequency);
        let f_i = current.frequency;
        let existing = &current.label;

        let (mean, variance) = if f_i == 0.0 || !existing.mean.is_finite() {
            (via.mean, via.variance)
        } else {
            let total = f_i + f_a;
            let mean = (f_i * existing.mean + f_a * via.mean) / total;
            let second = (f_i * (existing.variance + existing.mean * existing.mean)
                + f_a * (via.variance + via.mean * via.mean))
                / total;
            (mean, (second - mean * mean).max(0.0))
        };

        let reliability = self.reliability(mean, variance, config);
        let epsilon = config.reliability_epsilon;
        let better = reliability > existing.reliability + epsilon;
        let tied_but_sooner = (reliability - existing.reliability).abs() <= epsilon
            && mean < existing.mean - config.tolerance;

        if !(better || tied_but_sooner) {
            return None;
        }

        Some(Relaxation {
            label: Moments {
                mean,
                variance,
                reliability,
            },
            frequency: f_i + f_a,
            inclusion: Inclusion::Join,
        })
    }

    fn assignment_distance(&self, link: &TransitLink, downstream: &Moments) -> f64 {
        downstream.mean + link.traversal_moments().0
    }
}
