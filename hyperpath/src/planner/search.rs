//! Optimal-strategy search.
//!
//! A label-correcting fixed point over the link graph. Links are popped from
//! an updatable priority queue in order of the label they would give their
//! tail; whenever a link improves a tail state, every link into that tail is
//! re-queued with a refreshed priority. The combination rule, label type and
//! priority all come from the [`CostModel`].

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Instant;

use serde::Serialize;
use smallvec::{SmallVec, smallvec};
use tracing::{debug, trace};

use crate::domain::StopId;
use crate::network::{LinkId, NodeId, StopIndex, TransitNetwork};
use crate::queue::UpdatablePriorityQueue;

use super::config::SearchConfig;
use super::model::{
    CostModel, Inclusion, NodeState, NodeStates, RouteState, StateLabel, find_state,
    origin_state, set_state,
};
use super::order::assignment_order;

/// Clock checks happen once per this many iterations.
const CLOCK_CHECK_INTERVAL: usize = 64;

/// Error from strategy search.
#[derive(Debug, Clone, thiserror::Error)]
pub enum SearchError {
    /// Destination is not a stop of the network
    #[error("destination {0} is not in the network")]
    UnknownDestination(StopId),

    /// Search configuration is unusable
    #[error("invalid search config: {0}")]
    InvalidConfig(String),

    /// Cost model parameters are unusable
    #[error("invalid cost model: {0}")]
    InvalidModel(String),
}

/// How a search ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchStatus {
    /// No further link could improve any label.
    Converged,
    /// Stopped at `max_iterations`; labels are best-effort.
    IterationLimit,
    /// Stopped at the time limit; labels are best-effort.
    TimedOut,
}

/// One label improvement, recorded when `record_updates` is set.
#[derive(Debug, Clone, PartialEq)]
pub struct LabelUpdate<L> {
    pub stop: StopId,
    pub state: RouteState,
    pub previous: L,
    pub label: L,
    pub link: LinkId,
}

/// A link in the optimal hyperpath.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AttractiveLink {
    pub link: LinkId,
    pub from: NodeId,
    pub to: NodeId,
    /// Boarding frequency of the link.
    pub frequency: f64,
    /// Distance from the destination of the tail via this link.
    pub distance: f64,
}

/// The result of a strategy search for one destination.
///
/// Labels and frequencies are those of each node's origin state: the
/// destination's fixed label, or the state of a passenger waiting at the
/// stop.
#[derive(Debug, Clone)]
pub struct Strategy<L> {
    model: &'static str,
    destination: StopId,
    destination_node: NodeId,
    stops: Arc<StopIndex>,
    labels: Vec<L>,
    frequencies: Vec<f64>,
    reachable: Vec<bool>,
    attractive: Vec<AttractiveLink>,
    sorted: bool,
    status: SearchStatus,
    iterations: usize,
    updates: Vec<LabelUpdate<L>>,
}

impl<L> Strategy<L> {
    pub fn model(&self) -> &'static str {
        self.model
    }

    pub fn destination(&self) -> &StopId {
        &self.destination
    }

    pub fn destination_node(&self) -> NodeId {
        self.destination_node
    }

    pub fn stops(&self) -> &Arc<StopIndex> {
        &self.stops
    }

    /// Label of a stop, or `None` if the stop is not in the network.
    pub fn label(&self, stop: &StopId) -> Option<&L> {
        self.stops.node(stop).map(|n| &self.labels[n.0])
    }

    /// Combined frequency of a stop's attractive links.
    pub fn frequency(&self, stop: &StopId) -> Option<f64> {
        self.stops.node(stop).map(|n| self.frequencies[n.0])
    }

    /// Labels indexed by node.
    pub fn labels(&self) -> &[L] {
        &self.labels
    }

    /// Frequencies indexed by node.
    pub fn frequencies(&self) -> &[f64] {
        &self.frequencies
    }

    /// Returns true if `stop` can reach the destination.
    pub fn is_reachable(&self, stop: &StopId) -> bool {
        self.stops
            .node(stop)
            .is_some_and(|n| self.reachable[n.0])
    }

    pub fn node_reachable(&self, node: NodeId) -> bool {
        self.reachable[node.0]
    }

    /// The attractive set, in insertion order until
    /// [`sort_for_assignment`](Self::sort_for_assignment) is called.
    pub fn attractive(&self) -> &[AttractiveLink] {
        &self.attractive
    }

    /// Returns true once the attractive set is in assignment order.
    pub fn is_sorted_for_assignment(&self) -> bool {
        self.sorted
    }

    /// Order the attractive set so every link into a node comes before any
    /// link out of it, farthest from the destination first.
    pub fn sort_for_assignment(&mut self) {
        if !self.sorted {
            self.attractive = assignment_order(&self.attractive, self.stops.len());
            self.sorted = true;
        }
    }

    pub fn status(&self) -> SearchStatus {
        self.status
    }

    pub fn iterations(&self) -> usize {
        self.iterations
    }

    /// Recorded label improvements, oldest first. Empty unless
    /// `record_updates` was set.
    pub fn updates(&self) -> &[LabelUpdate<L>] {
        &self.updates
    }
}

/// Mutable state of one search.
struct Search<'a, M: CostModel> {
    network: &'a TransitNetwork,
    model: &'a M,
    config: &'a SearchConfig,
    destination: NodeId,
    nodes: Vec<NodeStates<M::Label>>,
    /// Attractive links per tail state.
    members: HashMap<(NodeId, RouteState), SmallVec<[LinkId; 4]>>,
    /// Every accepted `(link, state)`, in order.
    log: Vec<(LinkId, RouteState)>,
    updates: Vec<LabelUpdate<M::Label>>,
    queue: UpdatablePriorityQueue<LinkId, M::Priority>,
}

impl<'a, M: CostModel> Search<'a, M> {
    fn new(
        network: &'a TransitNetwork,
        model: &'a M,
        config: &'a SearchConfig,
        destination: NodeId,
    ) -> Self {
        let mut nodes = vec![NodeStates::new(); network.stop_count()];
        nodes[destination.0] = smallvec![NodeState {
            state: RouteState::AtDestination,
            value: StateLabel {
                label: model.perfect(),
                frequency: 0.0,
            },
        }];

        Self {
            network,
            model,
            config,
            destination,
            nodes,
            members: HashMap::new(),
            log: Vec::new(),
            updates: Vec::new(),
            queue: UpdatablePriorityQueue::with_capacity(network.link_count()),
        }
    }

    /// Queue `link` with a priority from the current label at its head.
    fn enqueue(&mut self, id: LinkId) {
        let (from, to) = self.network.endpoints(id);
        if from == self.destination {
            return;
        }
        let link = self.network.link(id);
        let downstream = self.model.downstream(link, &self.nodes[to.0]);
        let priority = self.model.priority(link, &downstream, self.config);
        self.queue.push(id, priority);
    }

    fn run(&mut self) -> (SearchStatus, usize) {
        for id in self.network.link_ids() {
            self.enqueue(id);
        }

        let started = Instant::now();
        let time_limit = self.config.time_limit();
        let mut iterations = 0;

        while let Some((id, priority)) = self.queue.pop() {
            if self.model.exhausted(&priority) {
                break;
            }
            if iterations >= self.config.max_iterations {
                return (SearchStatus::IterationLimit, iterations);
            }
            if let Some(limit) = time_limit {
                if iterations % CLOCK_CHECK_INTERVAL == 0 && started.elapsed() >= limit {
                    return (SearchStatus::TimedOut, iterations);
                }
            }
            iterations += 1;

            if self.relax_link(id) {
                let network = self.network;
                let (from, _) = network.endpoints(id);
                for &incoming in network.incoming(from) {
                    self.enqueue(incoming);
                }
            }
        }

        (SearchStatus::Converged, iterations)
    }

    /// Relax `id` into every applicable tail state. Returns true if any
    /// state changed.
    fn relax_link(&mut self, id: LinkId) -> bool {
        let (from, to) = self.network.endpoints(id);
        let link = self.network.link(id);
        let downstream = self.model.downstream(link, &self.nodes[to.0]);
        let mut changed = false;

        for state in self.model.tail_states(link) {
            let current = find_state(&self.nodes[from.0], &state)
                .cloned()
                .unwrap_or_else(|| StateLabel {
                    label: self.model.unreachable(),
                    frequency: 0.0,
                });

            let Some(relaxation) =
                self.model
                    .relax(link, &downstream, &state, &current, self.config)
            else {
                continue;
            };

            let key = (from, state.clone());
            if relaxation.inclusion == Inclusion::Join
                && self.members.get(&key).is_some_and(|m| m.contains(&id))
            {
                continue;
            }

            // Assignment needs the attractive set to stay acyclic. Links
            // between equally good stops (zero-cost walks both ways) would
            // otherwise both qualify.
            if state == RouteState::origin(from == self.destination) && self.leads_to(to, from) {
                trace!(
                    from = %self.network.stop(from),
                    to = %self.network.stop(to),
                    "skipping link that would close an attractive cycle"
                );
                continue;
            }

            let members = self.members.entry(key).or_default();
            if relaxation.inclusion == Inclusion::Supersede {
                members.clear();
            }
            members.push(id);

            trace!(
                stop = %self.network.stop(from),
                state = ?state,
                previous = ?current.label,
                label = ?relaxation.label,
                frequency = relaxation.frequency,
                "label improved"
            );

            if self.config.record_updates {
                self.updates.push(LabelUpdate {
                    stop: self.network.stop(from).clone(),
                    state: state.clone(),
                    previous: current.label,
                    label: relaxation.label.clone(),
                    link: id,
                });
            }

            self.log.push((id, state.clone()));
            set_state(
                &mut self.nodes[from.0],
                state,
                StateLabel {
                    label: relaxation.label,
                    frequency: relaxation.frequency,
                },
            );
            changed = true;
        }

        changed
    }

    /// Returns true if `target` is reachable from `start` along the current
    /// attractive links of origin states.
    fn leads_to(&self, start: NodeId, target: NodeId) -> bool {
        let mut stack = vec![start];
        let mut seen = HashSet::new();
        while let Some(node) = stack.pop() {
            if node == target {
                return true;
            }
            if !seen.insert(node) {
                continue;
            }
            let state = RouteState::origin(node == self.destination);
            if let Some(links) = self.members.get(&(node, state)) {
                stack.extend(links.iter().map(|&id| self.network.endpoints(id).1));
            }
        }
        false
    }

    /// Reduce per-state results to the origin state of each node.
    fn finish(self, status: SearchStatus, iterations: usize) -> Strategy<M::Label> {
        let Search {
            network,
            model,
            config,
            destination,
            nodes,
            members,
            log,
            updates,
            ..
        } = self;

        let mut labels = Vec::with_capacity(nodes.len());
        let mut frequencies = Vec::with_capacity(nodes.len());
        let mut reachable = Vec::with_capacity(nodes.len());
        for states in &nodes {
            match origin_state(states) {
                Some(value) => {
                    reachable.push(model.is_reachable(&value.label));
                    labels.push(value.label.clone());
                    frequencies.push(value.frequency);
                }
                None => {
                    reachable.push(false);
                    labels.push(model.unreachable());
                    frequencies.push(0.0);
                }
            }
        }

        let mut seen = HashSet::new();
        let mut attractive = Vec::new();
        for (id, state) in log {
            let (from, to) = network.endpoints(id);
            if state != RouteState::origin(from == destination) {
                continue;
            }
            let still_member = members
                .get(&(from, state))
                .is_some_and(|links| links.contains(&id));
            if !still_member || !seen.insert(id) {
                continue;
            }

            let link = network.link(id);
            let downstream = model.downstream(link, &nodes[to.0]);
            attractive.push(AttractiveLink {
                link: id,
                from,
                to,
                frequency: link.frequency(config.infinite_frequency),
                distance: model.assignment_distance(link, &downstream),
            });
        }

        Strategy {
            model: model.name(),
            destination: network.stop(destination).clone(),
            destination_node: destination,
            stops: Arc::clone(network.stops()),
            labels,
            frequencies,
            reachable,
            attractive,
            sorted: false,
            status,
            iterations,
            updates,
        }
    }
}

/// Compute the optimal strategy towards `destination` under `model`.
///
/// Unreachable stops keep the model's unreachable label; that is not an
/// error. A search stopped by the iteration or time limit still returns its
/// best-effort strategy, with the status saying so.
///
/// # Errors
///
/// Returns an error if the configuration or model parameters are invalid,
/// or if `destination` is not a stop of `network`.
pub fn find_optimal_strategy<M: CostModel>(
    network: &TransitNetwork,
    destination: &StopId,
    model: &M,
    config: &SearchConfig,
) -> Result<Strategy<M::Label>, SearchError> {
    config.validate()?;
    model.validate()?;
    let destination_node = network
        .node(destination)
        .ok_or_else(|| SearchError::UnknownDestination(destination.clone()))?;

    debug!(
        model = model.name(),
        destination = %destination,
        stops = network.stop_count(),
        links = network.link_count(),
        "starting strategy search"
    );

    let mut search = Search::new(network, model, config, destination_node);
    let (status, iterations) = search.run();
    let strategy = search.finish(status, iterations);

    debug!(
        model = model.name(),
        destination = %destination,
        iterations,
        status = ?status,
        attractive = strategy.attractive().len(),
        "strategy search complete"
    );

    Ok(strategy)
}
