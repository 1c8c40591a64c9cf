//! The cost-model abstraction shared by every strategy search.
//!
//! A model decides what a label is (a cost, a probability, a pair of
//! moments), how a link changes the label of its tail, and how links are
//! prioritised. The search itself is model-agnostic.

use std::fmt::Debug;

use serde::Serialize;
use smallvec::{SmallVec, smallvec};

use crate::domain::{RouteId, TransitLink};

use super::config::SearchConfig;
use super::search::SearchError;

/// Where a passenger is, relative to the lines serving a node.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum RouteState {
    /// At the destination.
    AtDestination,
    /// At the stop, waiting to board any attractive line.
    Boarding,
    /// Aboard the given route as it calls at the stop.
    Continuing(RouteId),
}

impl RouteState {
    /// The state a trip starting at a node is in.
    pub fn origin(is_destination: bool) -> Self {
        if is_destination {
            RouteState::AtDestination
        } else {
            RouteState::Boarding
        }
    }
}

/// Label and combined frequency of one state.
#[derive(Debug, Clone, PartialEq)]
pub struct StateLabel<L> {
    pub label: L,
    pub frequency: f64,
}

/// One state held at a node.
#[derive(Debug, Clone, PartialEq)]
pub struct NodeState<L> {
    pub state: RouteState,
    pub value: StateLabel<L>,
}

/// All states held at a node. Most nodes have one or two.
pub type NodeStates<L> = SmallVec<[NodeState<L>; 2]>;

/// Find the value of `state` in `states`.
pub fn find_state<'a, L>(states: &'a NodeStates<L>, state: &RouteState) -> Option<&'a StateLabel<L>> {
    states.iter().find(|s| &s.state == state).map(|s| &s.value)
}

/// Set the value of `state`, inserting it if absent.
pub fn set_state<L>(states: &mut NodeStates<L>, state: RouteState, value: StateLabel<L>) {
    match states.iter_mut().find(|s| s.state == state) {
        Some(existing) => existing.value = value,
        None => states.push(NodeState { state, value }),
    }
}

/// The origin-feasible state of a node: `AtDestination` or `Boarding`.
pub fn origin_state<L>(states: &NodeStates<L>) -> Option<&StateLabel<L>> {
    find_state(states, &RouteState::AtDestination)
        .or_else(|| find_state(states, &RouteState::Boarding))
}

/// How an accepted link relates to links already attractive at a state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Inclusion {
    /// Added alongside them; frequencies add.
    Join,
    /// Replaces them.
    Supersede,
}

/// The outcome of relaxing a link into one tail state.
#[derive(Debug, Clone, PartialEq)]
pub struct Relaxation<L> {
    pub label: L,
    pub frequency: f64,
    pub inclusion: Inclusion,
}

/// A label combination rule.
///
/// Labels only ever improve: a model must not return a relaxation whose
/// label is worse than the current one.
pub trait CostModel: Send + Sync {
    type Label: Clone + Debug + PartialEq + Serialize + Send + Sync;
    type Priority: Ord + Clone + Debug;

    /// Short identifier used in logs and reports.
    fn name(&self) -> &'static str;

    /// Check model parameters before a search.
    fn validate(&self) -> Result<(), SearchError> {
        Ok(())
    }

    /// Label of a node that cannot reach the destination.
    fn unreachable(&self) -> Self::Label;

    /// Label of the destination.
    fn perfect(&self) -> Self::Label;

    fn is_reachable(&self, label: &Self::Label) -> bool;

    /// States at the tail of `link` that relaxing it may improve.
    fn tail_states(&self, _link: &TransitLink) -> SmallVec<[RouteState; 2]> {
        smallvec![RouteState::Boarding]
    }

    /// The label a passenger taking `link` continues with at its head.
    fn downstream(&self, _link: &TransitLink, head: &NodeStates<Self::Label>) -> Self::Label {
        origin_state(head)
            .map(|s| s.label.clone())
            .unwrap_or_else(|| self.unreachable())
    }

    /// Queue priority of `link` given its downstream label. Smaller pops
    /// first.
    fn priority(
        &self,
        link: &TransitLink,
        downstream: &Self::Label,
        config: &SearchConfig,
    ) -> Self::Priority;

    /// True if no link at this priority (or any later one) can improve a
    /// label.
    fn exhausted(&self, priority: &Self::Priority) -> bool;

    /// Try to include `link` in the attractive set of `state` at its tail.
    fn relax(
        &self,
        link: &TransitLink,
        downstream: &Self::Label,
        state: &RouteState,
        current: &StateLabel<Self::Label>,
        config: &SearchConfig,
    ) -> Option<Relaxation<Self::Label>>;

    /// Distance-from-destination of the tail via `link`, used to order the
    /// attractive set for assignment. Larger is farther.
    fn assignment_distance(&self, link: &TransitLink, downstream: &Self::Label) -> f64;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn states() -> NodeStates<f64> {
        smallvec![NodeState {
            state: RouteState::Boarding,
            value: StateLabel {
                label: 12.0,
                frequency: 0.1,
            },
        }]
    }

    #[test]
    fn find_and_set() {
        let mut s = states();
        assert_eq!(find_state(&s, &RouteState::Boarding).unwrap().label, 12.0);

        let route = RouteState::Continuing(RouteId::parse("1").unwrap());
        assert!(find_state(&s, &route).is_none());

        set_state(
            &mut s,
            route.clone(),
            StateLabel {
                label: 4.0,
                frequency: 0.0,
            },
        );
        set_state(
            &mut s,
            RouteState::Boarding,
            StateLabel {
                label: 10.0,
                frequency: 0.2,
            },
        );

        assert_eq!(s.len(), 2);
        assert_eq!(find_state(&s, &route).unwrap().label, 4.0);
        assert_eq!(origin_state(&s).unwrap().label, 10.0);
    }

    #[test]
    fn origin_prefers_destination_state() {
        let mut s = states();
        set_state(
            &mut s,
            RouteState::AtDestination,
            StateLabel {
                label: 0.0,
                frequency: 0.0,
            },
        );
        assert_eq!(origin_state(&s).unwrap().label, 0.0);
        assert_eq!(RouteState::origin(true), RouteState::AtDestination);
        assert_eq!(RouteState::origin(false), RouteState::Boarding);
    }
}
