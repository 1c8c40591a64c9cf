//! Walking transfers between stops.
//!
//! Some stops are close enough to walk between, enabling transfers that
//! don't appear in any trip schedule. Walks are symmetric and become
//! unscheduled links on the walking route.

use std::collections::HashMap;

use crate::domain::{DomainError, StopId, TransitLink};

/// A collection of walking transfers between stops.
///
/// Transfers are symmetric: if you can walk from A to B, you can walk from
/// B to A in the same time.
#[derive(Debug, Clone, Default)]
pub struct WalkingTransfers {
    /// Map from (from, to) to walk time in minutes.
    /// Stored in both directions for O(1) lookup.
    transfers: HashMap<(StopId, StopId), f64>,
}

impl WalkingTransfers {
    /// Create an empty collection.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a walking transfer between two stops.
    ///
    /// The transfer is stored symmetrically (both A→B and B→A). Walks from a
    /// stop to itself are ignored.
    pub fn add(&mut self, a: StopId, b: StopId, minutes: f64) {
        if a == b {
            return;
        }
        self.transfers.insert((a.clone(), b.clone()), minutes);
        self.transfers.insert((b, a), minutes);
    }

    /// Get the walk time between two stops, if walkable.
    pub fn get(&self, from: &StopId, to: &StopId) -> Option<f64> {
        self.transfers.get(&(from.clone(), to.clone())).copied()
    }

    /// Check if two stops are walkable.
    pub fn is_walkable(&self, from: &StopId, to: &StopId) -> bool {
        self.get(from, to).is_some()
    }

    /// Returns the number of walkable pairs (counting A→B and B→A as one).
    pub fn len(&self) -> usize {
        self.transfers.len() / 2
    }

    /// Returns true if there are no walking transfers.
    pub fn is_empty(&self) -> bool {
        self.transfers.is_empty()
    }

    /// Emit one unscheduled link per direction, sorted by endpoints.
    pub fn to_links(&self) -> Result<Vec<TransitLink>, DomainError> {
        let mut pairs: Vec<_> = self.transfers.iter().collect();
        pairs.sort_by(|a, b| a.0.cmp(b.0));

        pairs
            .into_iter()
            .map(|((from, to), minutes)| TransitLink::walking(from.clone(), to.clone(), *minutes))
            .collect()
    }
}

/// Builder for creating walking transfers.
///
/// Provides a fluent API for adding transfers.
#[derive(Debug, Default)]
pub struct WalkingTransfersBuilder {
    inner: WalkingTransfers,
}

impl WalkingTransfersBuilder {
    /// Create a new builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a walking transfer. Invalid stop ids are ignored.
    pub fn add(mut self, a: &str, b: &str, minutes: f64) -> Self {
        if let (Ok(a), Ok(b)) = (StopId::parse(a), StopId::parse(b)) {
            self.inner.add(a, b, minutes);
        }
        self
    }

    /// Build the walking transfers.
    pub fn build(self) -> WalkingTransfers {
        self.inner
    }
}
