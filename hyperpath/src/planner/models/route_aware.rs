//! Expected cost with line continuations.
//!
//! The classical model charges a wait at every node, even when the
//! passenger simply stays on the vehicle. Here a node carries a `Boarding`
//! state (waiting for any attractive line, combined as in
//! [`ExpectedCost`](super::ExpectedCost)) and one `Continuing(route)` state
//! per line calling there, which pays no wait. A passenger arriving on
//! route `r` continues from the better of `Continuing(r)` and alighting.

use ordered_float::OrderedFloat;
use smallvec::{SmallVec, smallvec};

use crate::domain::TransitLink;
use crate::planner::config::SearchConfig;
use crate::planner::model::{
    CostModel, Inclusion, NodeStates, Relaxation, RouteState, StateLabel, find_state,
    origin_state,
};

use super::expected_cost::combine_expected;

/// Minimise expected cost, waiting only when changing lines.
#[derive(Debug, Clone, Copy, Default)]
pub struct RouteAware;

impl CostModel for RouteAware {
    type Label = f64;
    type Priority = OrderedFloat<f64>;

    fn name(&self) -> &'static str {
        "route_aware"
    }

    fn unreachable(&self) -> f64 {
        f64::INFINITY
    }

    fn perfect(&self) -> f64 {
        0.0
    }

    fn is_reachable(&self, label: &f64) -> bool {
        label.is_finite()
    }

    fn tail_states(&self, link: &TransitLink) -> SmallVec<[RouteState; 2]> {
        if link.is_scheduled() {
            smallvec![
                RouteState::Boarding,
                RouteState::Continuing(link.route().clone())
            ]
        } else {
            smallvec![RouteState::Boarding]
        }
    }

    fn downstream(&self, link: &TransitLink, head: &NodeStates<f64>) -> f64 {
        let alight = origin_state(head).map_or(f64::INFINITY, |s| s.label);
        let stay = find_state(head, &RouteState::Continuing(link.route().clone()))
            .map_or(f64::INFINITY, |s| s.label);
        alight.min(stay)
    }

    fn priority(&self, link: &TransitLink, downstream: &f64, _config: &SearchConfig) -> Self::Priority {
        OrderedFloat(downstream + link.travel_cost())
    }

    fn exhausted(&self, priority: &Self::Priority) -> bool {
        priority.0 == f64::INFINITY
    }

    fn relax(
        &self,
        link: &TransitLink,
        downstream: &f64,
        state: &RouteState,
        current: &StateLabel<f64>,
        config: &SearchConfig,
    ) -> Option<Relaxation<f64>> {
        let via = downstream + link.travel_cost();
        match state {
            RouteState::Continuing(_) => {
                if via < current.label - config.tolerance {
                    Some(Relaxation {
                        label: via,
                        frequency: link.frequency(config.infinite_frequency),
                        inclusion: Inclusion::Supersede,
                    })
                } else {
                    None
                }
            }
            RouteState::Boarding | RouteState::AtDestination => {
                combine_expected(link, via, current, config)
            }
        }
    }

    fn assignment_distance(&self, link: &TransitLink, downstream: &f64) -> f64 {
        downstream + link.travel_cost()
    }
}
