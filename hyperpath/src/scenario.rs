//! Scenario files.
//!
//! A scenario is one JSON document holding a network (explicit links,
//! scheduled trips and walking transfers), a demand matrix, the cost model
//! to use and its configuration. Running it produces a serialisable
//! [`Report`].

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::domain::{DelayDistribution, DomainError, RouteId, StopId, TransitLink};
use crate::network::{ScheduleConfig, TransitNetwork, TripSchedule, WalkingTransfers, links_from_trips};
use crate::planner::{
    AssignmentConfig, CostModel, DemandMatrix, DestinationRun, ExpectedCost, OnTimeProbability,
    PlannerError, RouteAware, SearchConfig, SearchStatus, Strategy, TimeBudget, Volumes,
    assign_od_matrix, compute_hyperpath,
};

/// Errors from loading or running a scenario.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ScenarioError {
    /// The scenario file could not be read
    #[error("cannot read {path}: {message}")]
    Io { path: String, message: String },

    /// The scenario document is malformed
    #[error("invalid scenario: {0}")]
    Parse(String),

    /// A label could not be converted for the report
    #[error("cannot encode report: {0}")]
    Report(String),

    #[error(transparent)]
    Planner(#[from] PlannerError),
}

impl From<DomainError> for ScenarioError {
    fn from(err: DomainError) -> Self {
        ScenarioError::Planner(err.into())
    }
}

/// A link given explicitly in the scenario.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinkSpec {
    pub from: StopId,
    pub to: StopId,
    pub route: RouteId,

    /// In-vehicle travel time in minutes
    pub travel_cost: f64,

    /// Minutes between departures; zero or absent for unscheduled links
    #[serde(default)]
    pub headway: f64,

    /// Standard deviation of the travel time
    #[serde(default)]
    pub std_travel_time: f64,

    /// Optional extra delay
    #[serde(default)]
    pub delay: Option<DelayDistribution>,
}

impl LinkSpec {
    /// Validate into a link.
    pub fn to_link(&self) -> Result<TransitLink, DomainError> {
        let link = TransitLink::new(
            self.from.clone(),
            self.to.clone(),
            self.route.clone(),
            self.travel_cost,
            self.headway,
        )?
        .with_travel_dispersion(self.std_travel_time)?;

        match self.delay {
            Some(delay) => link.with_delay(delay.mu, delay.sigma),
            None => Ok(link),
        }
    }
}

/// A walking transfer, usable in both directions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WalkSpec {
    pub from: StopId,
    pub to: StopId,
    pub minutes: f64,
}

/// Which cost model to search with.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ModelSpec {
    #[default]
    ExpectedCost,
    RouteAware,
    OnTimeProbability { deadline: f64 },
    TimeBudget { budget: f64 },
}

/// A complete scenario document.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Scenario {
    /// Stops of the network. When empty, every link endpoint is a stop and
    /// links to unknown stops cannot occur; otherwise such links are
    /// skipped with a warning.
    pub stops: Vec<StopId>,

    pub links: Vec<LinkSpec>,

    pub walking: Vec<WalkSpec>,

    /// Scheduled trips, turned into links with observed headways
    pub trips: Vec<TripSchedule>,

    pub schedule: ScheduleConfig,

    pub demand: DemandMatrix,

    /// Search towards this stop only. When absent, every destination in
    /// the demand matrix is assigned.
    pub destination: Option<StopId>,

    pub model: ModelSpec,

    pub search: SearchConfig,

    pub assignment: AssignmentConfig,
}

/// One attractive link, by stop and route.
#[derive(Debug, Clone, Serialize)]
pub struct AttractiveReport {
    pub from: StopId,
    pub to: StopId,
    pub route: RouteId,
    pub frequency: f64,
}

/// The strategy found for a single destination.
#[derive(Debug, Clone, Serialize)]
pub struct StrategyReport {
    pub destination: StopId,
    pub status: SearchStatus,
    pub iterations: usize,
    /// Label per stop, in the model's label format. Unbounded values are
    /// written as `null`.
    pub labels: BTreeMap<StopId, serde_json::Value>,
    pub frequencies: BTreeMap<StopId, f64>,
    /// Attractive links in assignment order
    pub attractive: Vec<AttractiveReport>,
}

/// Output of a scenario run.
#[derive(Debug, Clone, Serialize)]
pub struct Report {
    pub model: &'static str,
    /// Present when the scenario names a single destination
    pub strategy: Option<StrategyReport>,
    pub runs: BTreeMap<StopId, DestinationRun>,
    pub volumes: Volumes,
}

impl Scenario {
    /// Read a scenario from a JSON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ScenarioError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|e| ScenarioError::Io {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        Self::from_json(&json)
    }

    /// Parse a scenario from a JSON string.
    pub fn from_json(json: &str) -> Result<Self, ScenarioError> {
        serde_json::from_str(json).map_err(|e| ScenarioError::Parse(e.to_string()))
    }

    /// Build the network: explicit links, then trip links, then walking
    /// links.
    pub fn network(&self) -> Result<TransitNetwork, ScenarioError> {
        let mut links = self
            .links
            .iter()
            .map(LinkSpec::to_link)
            .collect::<Result<Vec<_>, _>>()?;
        links.extend(links_from_trips(&self.trips, &self.schedule)?);

        let mut walking = WalkingTransfers::new();
        for walk in &self.walking {
            walking.add(walk.from.clone(), walk.to.clone(), walk.minutes);
        }
        links.extend(walking.to_links()?);

        let network = if self.stops.is_empty() {
            TransitNetwork::from_links(links)
        } else {
            TransitNetwork::new(self.stops.iter().cloned(), links)
        };
        network.map_err(|e| ScenarioError::Planner(e.into()))
    }

    /// Run the scenario with its chosen model.
    pub fn run(&self) -> Result<Report, ScenarioError> {
        let network = self.network()?;
        info!(
            stops = network.stop_count(),
            links = network.link_count(),
            skipped = network.skipped_links(),
            model = ?self.model,
            "scenario network built"
        );

        match self.model {
            ModelSpec::ExpectedCost => self.run_with(&network, &ExpectedCost),
            ModelSpec::RouteAware => self.run_with(&network, &RouteAware),
            ModelSpec::OnTimeProbability { deadline } => {
                self.run_with(&network, &OnTimeProbability::new(deadline))
            }
            ModelSpec::TimeBudget { budget } => self.run_with(&network, &TimeBudget::new(budget)),
        }
    }

    fn run_with<M: CostModel>(
        &self,
        network: &TransitNetwork,
        model: &M,
    ) -> Result<Report, ScenarioError> {
        match &self.destination {
            Some(destination) => {
                let result = compute_hyperpath(
                    network,
                    destination,
                    &self.demand,
                    model,
                    &self.search,
                    &self.assignment,
                )?;
                let strategy = strategy_report(network, &result.strategy)?;
                let runs = BTreeMap::from([(
                    destination.clone(),
                    DestinationRun {
                        status: strategy.status,
                        iterations: strategy.iterations,
                    },
                )]);
                Ok(Report {
                    model: model.name(),
                    strategy: Some(strategy),
                    runs,
                    volumes: result.volumes,
                })
            }
            None => {
                let batch = assign_od_matrix(
                    network,
                    &self.demand,
                    model,
                    &self.search,
                    &self.assignment,
                )?;
                debug!(destinations = batch.runs.len(), "scenario batch assigned");
                Ok(Report {
                    model: model.name(),
                    strategy: None,
                    runs: batch.runs,
                    volumes: batch.volumes,
                })
            }
        }
    }
}

fn strategy_report<L: Serialize>(
    network: &TransitNetwork,
    strategy: &Strategy<L>,
) -> Result<StrategyReport, ScenarioError> {
    let mut labels = BTreeMap::new();
    let mut frequencies = BTreeMap::new();
    for (node, stop) in network.stops().iter() {
        let label = serde_json::to_value(&strategy.labels()[node.0])
            .map_err(|e| ScenarioError::Report(e.to_string()))?;
        labels.insert(stop.clone(), label);
        frequencies.insert(stop.clone(), strategy.frequencies()[node.0]);
    }

    let attractive = strategy
        .attractive()
        .iter()
        .map(|a| {
            let link = network.link(a.link);
            AttractiveReport {
                from: link.from_stop().clone(),
                to: link.to_stop().clone(),
                route: link.route().clone(),
                frequency: a.frequency,
            }
        })
        .collect();

    Ok(StrategyReport {
        destination: strategy.destination().clone(),
        status: strategy.status(),
        iterations: strategy.iterations(),
        labels,
        frequencies,
        attractive,
    })
}
