//! Validated transit network.
//!
//! A `TransitNetwork` owns the stop set and link list for a search and
//! precomputes dense node/link indices so the search and assignment can
//! traverse incoming and outgoing links in O(1).

mod schedule;
mod walking;

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use tracing::{debug, warn};

use crate::domain::{DomainError, LinkKey, RouteId, StopId, TransitLink};

pub use schedule::{
    HeadwayTable, ScheduleConfig, ScheduleTime, StopTime, TripSchedule, links_from_trips,
};
pub use walking::{WalkingTransfers, WalkingTransfersBuilder};

/// Dense index of a stop within a network.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub usize);

/// Dense index of a link within a network.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LinkId(pub usize);

/// Error from network construction.
#[derive(Debug, Clone, thiserror::Error)]
pub enum NetworkError {
    /// No stops were given
    #[error("network has no stops")]
    EmptyStopSet,

    /// The same stop id was given twice
    #[error("duplicate stop {0}")]
    DuplicateStop(StopId),

    /// Two links share endpoints and route
    #[error("duplicate link {from} -> {to} on route {route}")]
    DuplicateLink {
        from: StopId,
        to: StopId,
        route: RouteId,
    },

    /// A link references a stop outside the stop set
    #[error("link {from} -> {to} references unknown stop {stop}")]
    UnknownStop {
        from: StopId,
        to: StopId,
        stop: StopId,
    },

    /// Invalid domain value
    #[error(transparent)]
    Domain(#[from] DomainError),
}

/// Stop set with dense indices.
///
/// Shared between a network and the strategies computed on it.
#[derive(Debug, Clone)]
pub struct StopIndex {
    stops: Vec<StopId>,
    positions: HashMap<StopId, NodeId>,
}

impl StopIndex {
    fn build(stops: Vec<StopId>) -> Result<Self, NetworkError> {
        if stops.is_empty() {
            return Err(NetworkError::EmptyStopSet);
        }

        let mut positions = HashMap::with_capacity(stops.len());
        for (idx, stop) in stops.iter().enumerate() {
            if positions.insert(stop.clone(), NodeId(idx)).is_some() {
                return Err(NetworkError::DuplicateStop(stop.clone()));
            }
        }

        Ok(Self { stops, positions })
    }

    /// Look up the node for a stop.
    pub fn node(&self, stop: &StopId) -> Option<NodeId> {
        self.positions.get(stop).copied()
    }

    /// The stop at a node.
    ///
    /// # Panics
    ///
    /// Panics if `node` did not come from this index.
    pub fn stop(&self, node: NodeId) -> &StopId {
        &self.stops[node.0]
    }

    pub fn contains(&self, stop: &StopId) -> bool {
        self.positions.contains_key(stop)
    }

    pub fn len(&self) -> usize {
        self.stops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stops.is_empty()
    }

    /// Iterate over `(node, stop)` pairs in index order.
    pub fn iter(&self) -> impl Iterator<Item = (NodeId, &StopId)> {
        self.stops
            .iter()
            .enumerate()
            .map(|(idx, stop)| (NodeId(idx), stop))
    }
}

/// How links that reference unknown stops are treated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Validation {
    /// Skip them with a warning
    Lenient,
    /// Reject the network
    Strict,
}

/// A transit network: stops, links and adjacency.
///
/// Immutable after construction. Link ids are unique per
/// `(from, to, route)`.
///
/// # Examples
///
/// ```
/// use hyperpath::domain::{RouteId, StopId, TransitLink};
/// use hyperpath::network::TransitNetwork;
///
/// let stop = |s: &str| StopId::parse(s).unwrap();
/// let route = RouteId::parse("1").unwrap();
///
/// let links = vec![
///     TransitLink::new(stop("A"), stop("B"), route.clone(), 10.0, 15.0).unwrap(),
///     TransitLink::new(stop("B"), stop("C"), route.clone(), 15.0, 15.0).unwrap(),
///     // References a stop outside the set: skipped
///     TransitLink::new(stop("C"), stop("Z"), route, 1.0, 15.0).unwrap(),
/// ];
///
/// let network = TransitNetwork::new(vec![stop("A"), stop("B"), stop("C")], links).unwrap();
/// assert_eq!(network.link_count(), 2);
/// assert_eq!(network.skipped_links(), 1);
/// ```
#[derive(Debug, Clone)]
pub struct TransitNetwork {
    stops: Arc<StopIndex>,
    links: Vec<TransitLink>,
    endpoints: Vec<(NodeId, NodeId)>,
    incoming: Vec<Vec<LinkId>>,
    outgoing: Vec<Vec<LinkId>>,
    keys: HashMap<LinkKey, LinkId>,
    skipped: usize,
}

impl TransitNetwork {
    /// Build a network, skipping links that reference stops outside
    /// `stops`.
    pub fn new(
        stops: impl IntoIterator<Item = StopId>,
        links: impl IntoIterator<Item = TransitLink>,
    ) -> Result<Self, NetworkError> {
        Self::build(stops.into_iter().collect(), links, Validation::Lenient)
    }

    /// Build a network, rejecting links that reference stops outside
    /// `stops`.
    pub fn strict(
        stops: impl IntoIterator<Item = StopId>,
        links: impl IntoIterator<Item = TransitLink>,
    ) -> Result<Self, NetworkError> {
        Self::build(stops.into_iter().collect(), links, Validation::Strict)
    }

    /// Build a network whose stop set is every link endpoint, in order of
    /// first appearance.
    pub fn from_links(links: Vec<TransitLink>) -> Result<Self, NetworkError> {
        let mut seen = HashSet::new();
        let mut stops = Vec::new();
        for link in &links {
            for stop in [link.from_stop(), link.to_stop()] {
                if seen.insert(stop.clone()) {
                    stops.push(stop.clone());
                }
            }
        }
        Self::build(stops, links, Validation::Strict)
    }

    fn build(
        stops: Vec<StopId>,
        links: impl IntoIterator<Item = TransitLink>,
        validation: Validation,
    ) -> Result<Self, NetworkError> {
        let index = StopIndex::build(stops)?;
        let node_count = index.len();

        let mut kept = Vec::new();
        let mut endpoints = Vec::new();
        let mut incoming = vec![Vec::new(); node_count];
        let mut outgoing = vec![Vec::new(); node_count];
        let mut keys = HashMap::new();
        let mut skipped = 0;

        for link in links {
            let from = index.node(link.from_stop());
            let to = index.node(link.to_stop());

            let (from, to) = match (from, to) {
                (Some(from), Some(to)) => (from, to),
                _ => {
                    let unknown = if from.is_none() {
                        link.from_stop().clone()
                    } else {
                        link.to_stop().clone()
                    };
                    if validation == Validation::Strict {
                        return Err(NetworkError::UnknownStop {
                            from: link.from_stop().clone(),
                            to: link.to_stop().clone(),
                            stop: unknown,
                        });
                    }
                    warn!(
                        from = %link.from_stop(),
                        to = %link.to_stop(),
                        stop = %unknown,
                        "skipping link to unknown stop"
                    );
                    skipped += 1;
                    continue;
                }
            };

            let id = LinkId(kept.len());
            if keys.insert(link.key(), id).is_some() {
                return Err(NetworkError::DuplicateLink {
                    from: link.from_stop().clone(),
                    to: link.to_stop().clone(),
                    route: link.route().clone(),
                });
            }

            outgoing[from.0].push(id);
            incoming[to.0].push(id);
            endpoints.push((from, to));
            kept.push(link);
        }

        debug!(
            stops = node_count,
            links = kept.len(),
            skipped,
            "built transit network"
        );

        Ok(Self {
            stops: Arc::new(index),
            links: kept,
            endpoints,
            incoming,
            outgoing,
            keys,
            skipped,
        })
    }

    /// The shared stop index.
    pub fn stops(&self) -> &Arc<StopIndex> {
        &self.stops
    }

    pub fn stop_count(&self) -> usize {
        self.stops.len()
    }

    pub fn link_count(&self) -> usize {
        self.links.len()
    }

    /// Look up the node for a stop.
    pub fn node(&self, stop: &StopId) -> Option<NodeId> {
        self.stops.node(stop)
    }

    /// The stop at a node.
    pub fn stop(&self, node: NodeId) -> &StopId {
        self.stops.stop(node)
    }

    /// All links, indexed by `LinkId`.
    pub fn links(&self) -> &[TransitLink] {
        &self.links
    }

    pub fn link(&self, id: LinkId) -> &TransitLink {
        &self.links[id.0]
    }

    /// Iterate over all link ids.
    pub fn link_ids(&self) -> impl Iterator<Item = LinkId> + use<> {
        (0..self.links.len()).map(LinkId)
    }

    /// `(from, to)` nodes of a link.
    pub fn endpoints(&self, id: LinkId) -> (NodeId, NodeId) {
        self.endpoints[id.0]
    }

    /// Links ending at `node`.
    pub fn incoming(&self, node: NodeId) -> &[LinkId] {
        &self.incoming[node.0]
    }

    /// Links starting at `node`.
    pub fn outgoing(&self, node: NodeId) -> &[LinkId] {
        &self.outgoing[node.0]
    }

    /// Look up a link by its full identity.
    pub fn link_id(&self, key: &LinkKey) -> Option<LinkId> {
        self.keys.get(key).copied()
    }

    /// Number of input links dropped for referencing unknown stops.
    pub fn skipped_links(&self) -> usize {
        self.skipped
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stop(s: &str) -> StopId {
        StopId::parse(s).unwrap()
    }

    fn link(from: &str, to: &str, route: &str) -> TransitLink {
        TransitLink::new(
            stop(from),
            stop(to),
            RouteId::parse(route).unwrap(),
            5.0,
            10.0,
        )
        .unwrap()
    }

    fn stops(names: &[&str]) -> Vec<StopId> {
        names.iter().map(|s| stop(s)).collect()
    }

    #[test]
    fn builds_adjacency() {
        let network = TransitNetwork::new(
            stops(&["A", "B", "C"]),
            vec![link("A", "B", "1"), link("B", "C", "1"), link("A", "C", "2")],
        )
        .unwrap();

        let a = network.node(&stop("A")).unwrap();
        let c = network.node(&stop("C")).unwrap();

        assert_eq!(network.outgoing(a).len(), 2);
        assert_eq!(network.incoming(c).len(), 2);
        assert_eq!(network.incoming(a).len(), 0);
        assert_eq!(network.endpoints(LinkId(2)), (a, c));
        assert_eq!(network.link_ids().count(), 3);
    }

    #[test]
    fn rejects_empty_stop_set() {
        let result = TransitNetwork::new(Vec::new(), Vec::new());
        assert!(matches!(result, Err(NetworkError::EmptyStopSet)));
    }

    #[test]
    fn rejects_duplicate_stops() {
        let result = TransitNetwork::new(stops(&["A", "B", "A"]), Vec::new());
        assert!(matches!(result, Err(NetworkError::DuplicateStop(s)) if s == stop("A")));
    }

    #[test]
    fn rejects_duplicate_links() {
        let result = TransitNetwork::new(
            stops(&["A", "B"]),
            vec![link("A", "B", "1"), link("A", "B", "1")],
        );
        assert!(matches!(result, Err(NetworkError::DuplicateLink { .. })));
    }

    #[test]
    fn parallel_routes_are_distinct_links() {
        let network = TransitNetwork::new(
            stops(&["A", "B"]),
            vec![link("A", "B", "1"), link("A", "B", "2")],
        )
        .unwrap();

        assert_eq!(network.link_count(), 2);
        let key = link("A", "B", "2").key();
        assert_eq!(network.link_id(&key), Some(LinkId(1)));
    }

    #[test]
    fn lenient_skips_unknown_stops() {
        let network = TransitNetwork::new(
            stops(&["A", "B"]),
            vec![link("A", "B", "1"), link("B", "X", "1"), link("Y", "A", "1")],
        )
        .unwrap();

        assert_eq!(network.link_count(), 1);
        assert_eq!(network.skipped_links(), 2);
    }

    #[test]
    fn strict_rejects_unknown_stops() {
        let result = TransitNetwork::strict(stops(&["A", "B"]), vec![link("B", "X", "1")]);
        match result {
            Err(NetworkError::UnknownStop { stop: unknown, .. }) => {
                assert_eq!(unknown, stop("X"))
            }
            other => panic!("expected UnknownStop, got {other:?}"),
        }
    }

    #[test]
    fn from_links_collects_stops_in_order() {
        let network =
            TransitNetwork::from_links(vec![link("B", "C", "1"), link("A", "B", "1")]).unwrap();

        let order: Vec<_> = network.stops().iter().map(|(_, s)| s.as_str()).collect();
        assert_eq!(order, vec!["B", "C", "A"]);
    }

    #[test]
    fn from_links_rejects_empty() {
        assert!(matches!(
            TransitNetwork::from_links(Vec::new()),
            Err(NetworkError::EmptyStopSet)
        ));
    }
}
