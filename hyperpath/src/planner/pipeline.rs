//! Search followed by assignment, for one or many destinations.

use std::collections::BTreeMap;

use rayon::prelude::*;
use serde::Serialize;
use tracing::debug;

use crate::domain::{DomainError, StopId};
use crate::network::{NetworkError, TransitNetwork};

use super::assign::{AssignmentError, DemandMatrix, Volumes, assign_demand};
use super::config::{AssignmentConfig, SearchConfig};
use super::model::CostModel;
use super::search::{SearchError, SearchStatus, Strategy, find_optimal_strategy};

/// Error from any planner stage.
#[derive(Debug, Clone, thiserror::Error)]
pub enum PlannerError {
    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error(transparent)]
    Network(#[from] NetworkError),

    #[error(transparent)]
    Search(#[from] SearchError),

    #[error(transparent)]
    Assignment(#[from] AssignmentError),
}

/// Strategy and flows for one destination.
#[derive(Debug, Clone)]
pub struct HyperpathResult<L> {
    /// The strategy, sorted for assignment.
    pub strategy: Strategy<L>,
    pub volumes: Volumes,
}

/// Search outcome for one destination of a batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DestinationRun {
    pub status: SearchStatus,
    pub iterations: usize,
}

/// Summed flows over every destination of a demand matrix.
#[derive(Debug, Clone, Serialize)]
pub struct BatchAssignment {
    pub volumes: Volumes,
    pub runs: BTreeMap<StopId, DestinationRun>,
}

/// Find the optimal strategy towards `destination` and assign the demand
/// bound for it.
pub fn compute_hyperpath<M: CostModel>(
    network: &TransitNetwork,
    destination: &StopId,
    demand: &DemandMatrix,
    model: &M,
    search: &SearchConfig,
    assignment: &AssignmentConfig,
) -> Result<HyperpathResult<M::Label>, PlannerError> {
    let mut strategy = find_optimal_strategy(network, destination, model, search)?;
    strategy.sort_for_assignment();
    let volumes = assign_demand(network, &strategy, demand, assignment)?;
    Ok(HyperpathResult { strategy, volumes })
}

/// Run search and assignment for every destination in `demand`, in
/// parallel, and sum the flows.
///
/// Each destination's search is independent. The first error aborts the
/// batch.
pub fn assign_od_matrix<M: CostModel>(
    network: &TransitNetwork,
    demand: &DemandMatrix,
    model: &M,
    search: &SearchConfig,
    assignment: &AssignmentConfig,
) -> Result<BatchAssignment, PlannerError> {
    let destinations: Vec<StopId> = demand.destinations().into_iter().collect();
    debug!(
        destinations = destinations.len(),
        model = model.name(),
        "assigning demand matrix"
    );

    let results = destinations
        .into_par_iter()
        .map(|destination| {
            let result =
                compute_hyperpath(network, &destination, demand, model, search, assignment)?;
            let run = DestinationRun {
                status: result.strategy.status(),
                iterations: result.strategy.iterations(),
            };
            Ok((destination, run, result.volumes))
        })
        .collect::<Result<Vec<_>, PlannerError>>()?;

    let mut volumes = Volumes::empty(network);
    let mut runs = BTreeMap::new();
    for (destination, run, partial) in results {
        volumes.merge(partial);
        runs.insert(destination, run);
    }

    Ok(BatchAssignment { volumes, runs })
}
