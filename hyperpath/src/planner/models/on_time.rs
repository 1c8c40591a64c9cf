//! Maximum probability of arriving before a deadline.
//!
//! Each link contributes the probability that waiting for it and riding it
//! fits within the deadline. A node keeps the single best link; the
//! passenger boards that service rather than whichever arrives first.

use ordered_float::OrderedFloat;

use crate::domain::TransitLink;
use crate::planner::config::SearchConfig;
use crate::planner::distribution::on_time_probability;
use crate::planner::model::{CostModel, Inclusion, Relaxation, RouteState, StateLabel};
use crate::planner::search::SearchError;

/// Maximise the probability of reaching the destination by `deadline`.
#[derive(Debug, Clone, Copy)]
pub struct OnTimeProbability {
    /// Arrival deadline, in the same units as link costs.
    pub deadline: f64,
}

impl OnTimeProbability {
    pub fn new(deadline: f64) -> Self {
        Self { deadline }
    }

    /// Probability that `link` on its own is traversed within the deadline.
    ///
    /// The wait is Uniform(0, headway); the in-vehicle time and optional
    /// delay are normal.
    pub fn link_probability(&self, link: &TransitLink) -> f64 {
        let (mean, variance) = link.traversal_moments();
        on_time_probability(mean, variance.sqrt(), self.deadline)
    }

    fn via(&self, link: &TransitLink, downstream: f64) -> f64 {
        downstream * self.link_probability(link)
    }
}

impl CostModel for OnTimeProbability {
    type Label = f64;
    type Priority = OrderedFloat<f64>;

    fn name(&self) -> &'static str {
        "on_time_probability"
    }

    fn validate(&self) -> Result<(), SearchError> {
        if !self.deadline.is_finite() {
            return Err(SearchError::InvalidModel(format!(
                "deadline must be finite, got {}",
                self.deadline
            )));
        }
        Ok(())
    }

    fn unreachable(&self) -> f64 {
        0.0
    }

    fn perfect(&self) -> f64 {
        1.0
    }

    fn is_reachable(&self, label: &f64) -> bool {
        *label > 0.0
    }

    fn priority(&self, link: &TransitLink, downstream: &f64, _config: &SearchConfig) -> Self::Priority {
        OrderedFloat(0.0 - self.via(link, *downstream))
    }

    fn exhausted(&self, priority: &Self::Priority) -> bool {
        priority.0 >= 0.0
    }

    fn relax(
        &self,
        link: &TransitLink,
        downstream: &f64,
        _state: &RouteState,
        current: &StateLabel<f64>,
        config: &SearchConfig,
    ) -> Option<Relaxation<f64>> {
        let candidate = self.via(link, *downstream);
        if candidate > current.label + config.tolerance {
            Some(Relaxation {
                label: candidate,
                frequency: link.frequency(config.infinite_frequency),
                inclusion: Inclusion::Supersede,
            })
        } else {
            None
        }
    }

    fn assignment_distance(&self, link: &TransitLink, downstream: &f64) -> f64 {
        1.0 - self.via(link, *downstream)
    }
}
