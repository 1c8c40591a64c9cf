//! Minimum expected travel cost (the classical optimal strategy).
//!
//! A passenger at a node boards whichever attractive line arrives first.
//! Each line is chosen with probability proportional to its frequency, so
//! the node's expected cost is the frequency-weighted mean of the costs via
//! each attractive link plus the combined wait.

use ordered_float::OrderedFloat;

use crate::domain::TransitLink;
use crate::planner::config::SearchConfig;
use crate::planner::model::{CostModel, Inclusion, Relaxation, RouteState, StateLabel};

/// Minimise expected generalised cost (waiting plus in-vehicle time).
#[derive(Debug, Clone, Copy, Default)]
pub struct ExpectedCost;

/// Add a link costing `via` (downstream cost plus travel cost) to the
/// attractive set summarised by `current`.
///
/// The link is included when `via <= u_i + tolerance`. The combined label is
///
/// ```text
/// u_i' = (f_i·u_i + f_a·via) / (f_i + f_a)
/// ```
///
/// where `f_i·u_i` is replaced by `alpha` when it is NaN (`0 × ∞` before
/// any link is attractive), and the whole label is `alpha` when both
/// frequencies are zero.
pub(crate) fn combine_expected(
    link: &TransitLink,
    via: f64,
    current: &StateLabel<f64>,
    config: &SearchConfig,
) -> Option<Relaxation<f64>> {
    if !(via <= current.label + config.tolerance) {
        return None;
    }

    let f_a = link.frequency(config.infinite_frequency);
    let mut weighted = current.frequency * current.label;
    if weighted.is_nan() {
        weighted = config.alpha;
    }

    let frequency = current.frequency + f_a;
    let label = if frequency == 0.0 {
        config.alpha
    } else {
        (weighted + f_a * via) / frequency
    };

    Some(Relaxation {
        label: label.min(current.label),
        frequency,
        inclusion: Inclusion::Join,
    })
}

impl CostModel for ExpectedCost {
    type Label = f64;
    type Priority = OrderedFloat<f64>;

    fn name(&self) -> &'static str {
        "expected_cost"
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
        _state: &RouteState,
        current: &StateLabel<f64>,
        config: &SearchConfig,
    ) -> Option<Relaxation<f64>> {
        combine_expected(link, downstream + link.travel_cost(), current, config)
    }

    fn assignment_distance(&self, link: &TransitLink, downstream: &f64) -> f64 {
        downstream + link.travel_cost()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{RouteId, StopId};

    fn link(cost: f64, headway: f64) -> TransitLink {
        TransitLink::new(
            StopId::parse("A").unwrap(),
            StopId::parse("B").unwrap(),
            RouteId::parse("1").unwrap(),
            cost,
            headway,
        )
        .unwrap()
    }

    fn empty() -> StateLabel<f64> {
        StateLabel {
            label: f64::INFINITY,
            frequency: 0.0,
        }
    }

    #[test]
    fn first_link_adds_full_headway_wait() {
        let config = SearchConfig::default();
        let r = combine_expected(&link(10.0, 15.0), 25.0, &empty(), &config).unwrap();

        // alpha / f = 15 minutes of waiting
        assert!((r.label - 40.0).abs() < 1e-9);
        assert!((r.frequency - 1.0 / 15.0).abs() < 1e-12);
        assert_eq!(r.inclusion, Inclusion::Join);
    }

    #[test]
    fn second_link_mixes_by_frequency() {
        let config = SearchConfig::default();
        let first = combine_expected(&link(20.0, 15.0), 20.0, &empty(), &config).unwrap();
        let current = StateLabel {
            label: first.label,
            frequency: first.frequency,
        };
        let second = combine_expected(&link(30.0, 5.0), 30.0, &current, &config).unwrap();

        assert!((current.label - 35.0).abs() < 1e-9);
        assert!((second.label - 31.25).abs() < 1e-9);
        assert!((second.frequency - (1.0 / 15.0 + 0.2)).abs() < 1e-12);
    }

    #[test]
    fn costlier_link_rejected() {
        let config = SearchConfig::default();
        let current = StateLabel {
            label: 20.0,
            frequency: 0.1,
        };
        assert!(combine_expected(&link(5.0, 10.0), 25.0, &current, &config).is_none());
        assert!(combine_expected(&link(5.0, 10.0), f64::NAN, &current, &config).is_none());
    }

    #[test]
    fn tied_link_included_without_raising_label() {
        let config = SearchConfig::default();
        let current = StateLabel {
            label: 20.0,
            frequency: 0.1,
        };
        let r = combine_expected(&link(5.0, 10.0), 20.0, &current, &config).unwrap();
        assert!(r.label <= 20.0);
        assert!((r.frequency - 0.2).abs() < 1e-12);
    }

    #[test]
    fn walking_link_has_negligible_wait() {
        let config = SearchConfig::default();
        let r = combine_expected(&link(4.0, 0.0), 4.0, &empty(), &config).unwrap();
        assert!((r.label - 4.0).abs() < 1e-9);
        assert_eq!(r.frequency, config.infinite_frequency);
    }

    #[test]
    fn priority_and_exhaustion() {
        let model = ExpectedCost;
        let config = SearchConfig::default();
        let l = link(5.0, 10.0);

        assert_eq!(model.priority(&l, &10.0, &config), OrderedFloat(15.0));
        assert!(model.exhausted(&model.priority(&l, &f64::INFINITY, &config)));
        assert!(!model.exhausted(&OrderedFloat(1e12)));
    }
}
