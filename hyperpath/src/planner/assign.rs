//! Demand assignment over an optimal strategy.
//!
//! Demand to the strategy's destination is loaded at its origins and pushed
//! through the attractive set in assignment order. At each node the
//! accumulated volume is split across the node's attractive links in
//! proportion to their frequency share.

use std::borrow::Cow;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::domain::StopId;
use crate::network::{LinkId, TransitNetwork};

use super::config::{AssignmentConfig, UnreachableDemand};
use super::order::assignment_order;
use super::search::{AttractiveLink, Strategy};

/// Error from demand assignment.
#[derive(Debug, Clone, thiserror::Error)]
pub enum AssignmentError {
    /// The strategy was computed on a different network
    #[error("strategy does not belong to this network")]
    NetworkMismatch,

    /// Demand is negative or not finite
    #[error("invalid demand {demand} from {origin} to {destination}")]
    InvalidDemand {
        origin: StopId,
        destination: StopId,
        demand: f64,
    },

    /// An origin is not a stop of the network
    #[error("unknown origin stop {0}")]
    UnknownOrigin(StopId),

    /// Demand cannot reach its destination and the policy is to reject it
    #[error("{demand} demand from {origin} cannot reach {destination}")]
    UnreachableOrigin {
        origin: StopId,
        destination: StopId,
        demand: f64,
    },
}

/// Origin → destination → demand.
///
/// # Examples
///
/// ```
/// use hyperpath::domain::StopId;
/// use hyperpath::planner::DemandMatrix;
///
/// let a = StopId::parse("A").unwrap();
/// let c = StopId::parse("C").unwrap();
///
/// let mut demand = DemandMatrix::new();
/// demand.add(a.clone(), c.clone(), 10.0);
/// demand.add(a.clone(), c.clone(), 5.0);
///
/// assert_eq!(demand.get(&a, &c), 15.0);
/// assert_eq!(demand.total_to(&c), 15.0);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DemandMatrix {
    entries: BTreeMap<StopId, BTreeMap<StopId, f64>>,
}

impl DemandMatrix {
    /// Create an empty matrix.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `demand` from `origin` to `destination`.
    pub fn add(&mut self, origin: StopId, destination: StopId, demand: f64) {
        *self
            .entries
            .entry(origin)
            .or_default()
            .entry(destination)
            .or_insert(0.0) += demand;
    }

    /// Demand from `origin` to `destination`, zero if absent.
    pub fn get(&self, origin: &StopId, destination: &StopId) -> f64 {
        self.entries
            .get(origin)
            .and_then(|row| row.get(destination))
            .copied()
            .unwrap_or(0.0)
    }

    /// Every destination with at least one entry.
    pub fn destinations(&self) -> BTreeSet<StopId> {
        self.entries
            .values()
            .flat_map(|row| row.keys().cloned())
            .collect()
    }

    /// `(origin, demand)` pairs bound for `destination`.
    pub fn to_destination<'a>(
        &'a self,
        destination: &'a StopId,
    ) -> impl Iterator<Item = (&'a StopId, f64)> + 'a {
        self.entries
            .iter()
            .filter_map(move |(origin, row)| row.get(destination).map(|d| (origin, *d)))
    }

    /// Total demand bound for `destination`.
    pub fn total_to(&self, destination: &StopId) -> f64 {
        self.to_destination(destination).map(|(_, d)| d).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.values().all(|row| row.is_empty())
    }
}

/// Demand left unassigned because its origin cannot reach the destination.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DroppedDemand {
    pub origin: StopId,
    pub destination: StopId,
    pub demand: f64,
}

/// Flows produced by assignment.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Volumes {
    /// Flow between stops, summed over parallel routes.
    pub links: BTreeMap<StopId, BTreeMap<StopId, f64>>,
    /// Volume passing through each stop: origin demand plus inflow. At a
    /// destination this is the arrived flow.
    pub nodes: BTreeMap<StopId, f64>,
    /// Flow on each link, indexed by `LinkId`.
    pub link_flows: Vec<f64>,
    /// Arrived flow minus demand, summed over destinations. Zero when all
    /// assigned demand arrives.
    pub destination_balance: f64,
    /// Total demand loaded onto the network.
    pub assigned_demand: f64,
    pub dropped: Vec<DroppedDemand>,
}

impl Volumes {
    /// All-zero volumes over `network`.
    pub fn empty(network: &TransitNetwork) -> Self {
        let mut links: BTreeMap<StopId, BTreeMap<StopId, f64>> = BTreeMap::new();
        for link in network.links() {
            links
                .entry(link.from_stop().clone())
                .or_default()
                .insert(link.to_stop().clone(), 0.0);
        }
        let nodes = network
            .stops()
            .iter()
            .map(|(_, stop)| (stop.clone(), 0.0))
            .collect();

        Self {
            links,
            nodes,
            link_flows: vec![0.0; network.link_count()],
            destination_balance: 0.0,
            assigned_demand: 0.0,
            dropped: Vec::new(),
        }
    }

    /// Flow on one link.
    pub fn link_flow(&self, id: LinkId) -> f64 {
        self.link_flows.get(id.0).copied().unwrap_or(0.0)
    }

    /// Flow from `from` to `to` over all routes.
    pub fn between(&self, from: &StopId, to: &StopId) -> f64 {
        self.links
            .get(from)
            .and_then(|row| row.get(to))
            .copied()
            .unwrap_or(0.0)
    }

    /// Volume through a stop.
    pub fn node(&self, stop: &StopId) -> f64 {
        self.nodes.get(stop).copied().unwrap_or(0.0)
    }

    /// Total demand that could not be assigned.
    pub fn dropped_demand(&self) -> f64 {
        self.dropped.iter().map(|d| d.demand).sum()
    }

    /// Add another assignment on the same network into this one.
    pub fn merge(&mut self, other: Volumes) {
        for (from, row) in other.links {
            let target = self.links.entry(from).or_default();
            for (to, flow) in row {
                *target.entry(to).or_insert(0.0) += flow;
            }
        }
        for (stop, volume) in other.nodes {
            *self.nodes.entry(stop).or_insert(0.0) += volume;
        }
        if self.link_flows.len() < other.link_flows.len() {
            self.link_flows.resize(other.link_flows.len(), 0.0);
        }
        for (total, flow) in self.link_flows.iter_mut().zip(other.link_flows) {
            *total += flow;
        }
        self.destination_balance += other.destination_balance;
        self.assigned_demand += other.assigned_demand;
        self.dropped.extend(other.dropped);
    }
}

/// Assign the demand bound for the strategy's destination.
///
/// Demand from the destination to itself is ignored. Demand from an origin
/// with no attractive link is dropped and reported, or rejected, per
/// `config.unreachable_demand`.
///
/// The attractive set is used as-is if it has been through
/// [`Strategy::sort_for_assignment`]; otherwise a sorted copy is made.
///
/// # Errors
///
/// Returns an error if the strategy came from another network, if any
/// demand to the destination is invalid or from an unknown stop, or if
/// unreachable demand is rejected.
pub fn assign_demand<L>(
    network: &TransitNetwork,
    strategy: &Strategy<L>,
    demand: &DemandMatrix,
    config: &AssignmentConfig,
) -> Result<Volumes, AssignmentError> {
    if !Arc::ptr_eq(network.stops(), strategy.stops()) {
        return Err(AssignmentError::NetworkMismatch);
    }

    let destination = strategy.destination();
    let destination_node = strategy.destination_node();
    let frequencies = strategy.frequencies();

    let mut volumes = Volumes::empty(network);
    let mut node_volume = vec![0.0; network.stop_count()];
    let mut total = 0.0;

    for (origin, amount) in demand.to_destination(destination) {
        if !amount.is_finite() || amount < 0.0 {
            return Err(AssignmentError::InvalidDemand {
                origin: origin.clone(),
                destination: destination.clone(),
                demand: amount,
            });
        }
        let node = network
            .node(origin)
            .ok_or_else(|| AssignmentError::UnknownOrigin(origin.clone()))?;

        if node == destination_node || amount == 0.0 {
            continue;
        }

        if !strategy.node_reachable(node) || frequencies[node.0] == 0.0 {
            match config.unreachable_demand {
                UnreachableDemand::Reject => {
                    return Err(AssignmentError::UnreachableOrigin {
                        origin: origin.clone(),
                        destination: destination.clone(),
                        demand: amount,
                    });
                }
                UnreachableDemand::Drop => {
                    warn!(
                        origin = %origin,
                        destination = %destination,
                        demand = amount,
                        "dropping demand from origin with no attractive link"
                    );
                    volumes.dropped.push(DroppedDemand {
                        origin: origin.clone(),
                        destination: destination.clone(),
                        demand: amount,
                    });
                    continue;
                }
            }
        }

        node_volume[node.0] += amount;
        total += amount;
    }

    let order: Cow<'_, [AttractiveLink]> = if strategy.is_sorted_for_assignment() {
        Cow::Borrowed(strategy.attractive())
    } else {
        Cow::Owned(assignment_order(strategy.attractive(), network.stop_count()))
    };

    for attractive in order.iter() {
        let f_i = frequencies[attractive.from.0];
        let flow = if f_i == 0.0 {
            0.0
        } else {
            (attractive.frequency / f_i) * node_volume[attractive.from.0]
        };
        volumes.link_flows[attractive.link.0] += flow;
        node_volume[attractive.to.0] += flow;
    }

    let arrived = node_volume[destination_node.0];
    if (arrived - total).abs() > config.conservation_tolerance * total.max(1.0) {
        warn!(
            destination = %destination,
            demand = total,
            arrived,
            "assigned flow not conserved"
        );
    }

    for (id, link) in network.links().iter().enumerate() {
        let flow = volumes.link_flows[id];
        if flow != 0.0 {
            *volumes
                .links
                .entry(link.from_stop().clone())
                .or_default()
                .entry(link.to_stop().clone())
                .or_insert(0.0) += flow;
        }
    }
    for (node, stop) in network.stops().iter() {
        volumes.nodes.insert(stop.clone(), node_volume[node.0]);
    }
    volumes.destination_balance = arrived - total;
    volumes.assigned_demand = total;

    debug!(
        destination = %destination,
        demand = total,
        arrived,
        dropped = volumes.dropped.len(),
        "demand assigned"
    );

    Ok(volumes)
}
