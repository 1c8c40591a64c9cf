//! Building links from trip schedules.
//!
//! Schedule data arrives as per-trip stop-time sequences. This module turns
//! them into the link attributes the search needs: a mean travel time and
//! dispersion per `(from, to, route)`, and a mean headway per
//! `(route, stop)`.

use std::collections::{BTreeMap, HashMap};
use std::fmt;

use chrono::Duration;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::domain::{DomainError, RouteId, StopId, TransitLink};

/// Configuration for schedule-derived links.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScheduleConfig {
    /// Headway given to a `(route, stop)` with fewer than two departures
    /// (minutes). Zero marks the link as unscheduled.
    pub single_departure_headway_mins: f64,

    /// Travel-time coefficient of variation used when a link has fewer
    /// than two observed traversals.
    pub default_travel_cv: f64,
}

impl ScheduleConfig {
    /// Create a new configuration with the given parameters.
    pub fn new(single_departure_headway_mins: f64, default_travel_cv: f64) -> Self {
        Self {
            single_departure_headway_mins,
            default_travel_cv,
        }
    }
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            single_departure_headway_mins: 0.0,
            default_travel_cv: 0.2,
        }
    }
}

/// A time of day in a schedule, as an offset from service-day midnight.
///
/// Hours may exceed 23 for trips running past midnight.
///
/// # Examples
///
/// ```
/// use hyperpath::network::ScheduleTime;
///
/// let t = ScheduleTime::parse("25:10:00").unwrap();
/// assert_eq!(t.to_string(), "25:10:00");
///
/// assert!(ScheduleTime::parse("8:05").is_err());
/// assert!(ScheduleTime::parse("08:60:00").is_err());
/// ```
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ScheduleTime(Duration);

impl ScheduleTime {
    /// Parse `H:MM:SS` or `HH:MM:SS`.
    pub fn parse(s: &str) -> Result<Self, DomainError> {
        let invalid = || DomainError::InvalidTime(s.to_string());

        let mut parts = s.split(':');
        let (Some(h), Some(m), Some(sec), None) =
            (parts.next(), parts.next(), parts.next(), parts.next())
        else {
            return Err(invalid());
        };

        if h.is_empty() || h.len() > 3 || m.len() != 2 || sec.len() != 2 {
            return Err(invalid());
        }

        let hours: i64 = h.parse().map_err(|_| invalid())?;
        let minutes: i64 = m.parse().map_err(|_| invalid())?;
        let seconds: i64 = sec.parse().map_err(|_| invalid())?;
        if hours < 0 || !(0..60).contains(&minutes) || !(0..60).contains(&seconds) {
            return Err(invalid());
        }

        Ok(ScheduleTime(
            Duration::hours(hours) + Duration::minutes(minutes) + Duration::seconds(seconds),
        ))
    }

    /// Offset from service-day midnight.
    pub fn since_midnight(&self) -> Duration {
        self.0
    }

    /// Minutes elapsed since `earlier`. Negative if `earlier` is later.
    pub fn minutes_since(&self, earlier: ScheduleTime) -> f64 {
        (self.0 - earlier.0).num_seconds() as f64 / 60.0
    }
}

impl TryFrom<String> for ScheduleTime {
    type Error = DomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        ScheduleTime::parse(&value)
    }
}

impl From<ScheduleTime> for String {
    fn from(value: ScheduleTime) -> Self {
        value.to_string()
    }
}

impl fmt::Debug for ScheduleTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ScheduleTime({})", self)
    }
}

impl fmt::Display for ScheduleTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let total = self.0.num_seconds();
        write!(
            f,
            "{:02}:{:02}:{:02}",
            total / 3600,
            (total % 3600) / 60,
            total % 60
        )
    }
}

/// One scheduled call of a trip at a stop.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StopTime {
    pub stop: StopId,
    pub arrival: ScheduleTime,
    pub departure: ScheduleTime,
}

/// A vehicle trip: its route and ordered calls.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TripSchedule {
    pub trip_id: String,
    pub route: RouteId,
    pub stop_times: Vec<StopTime>,
}

/// Mean headway per `(route, stop)`, in minutes.
#[derive(Debug, Clone, Default)]
pub struct HeadwayTable {
    headways: HashMap<(RouteId, StopId), f64>,
    fallback: f64,
}

impl HeadwayTable {
    /// Compute headways from the departures observed in `trips`.
    ///
    /// The headway is the mean gap between consecutive sorted departures.
    /// Pairs with fewer than two departures get
    /// `config.single_departure_headway_mins`.
    pub fn from_trips(trips: &[TripSchedule], config: &ScheduleConfig) -> Self {
        let mut departures: HashMap<(RouteId, StopId), Vec<ScheduleTime>> = HashMap::new();
        for trip in trips {
            for call in &trip.stop_times {
                departures
                    .entry((trip.route.clone(), call.stop.clone()))
                    .or_default()
                    .push(call.departure);
            }
        }

        let headways = departures
            .into_iter()
            .map(|(key, mut times)| {
                times.sort();
                let headway = if times.len() > 1 {
                    let span = times[times.len() - 1].minutes_since(times[0]);
                    span / (times.len() - 1) as f64
                } else {
                    config.single_departure_headway_mins
                };
                (key, headway)
            })
            .collect();

        Self {
            headways,
            fallback: config.single_departure_headway_mins,
        }
    }

    /// Headway of `route` at `stop`, or the fallback if never observed.
    pub fn get(&self, route: &RouteId, stop: &StopId) -> f64 {
        self.headways
            .get(&(route.clone(), stop.clone()))
            .copied()
            .unwrap_or(self.fallback)
    }

    pub fn len(&self) -> usize {
        self.headways.len()
    }

    pub fn is_empty(&self) -> bool {
        self.headways.is_empty()
    }
}

/// Build one link per `(from, to, route)` seen in consecutive calls.
///
/// Travel cost is the mean observed travel time; dispersion is the sample
/// standard deviation across trips, or `default_travel_cv × mean` with a
/// single observation. Links come out sorted by `(from, to, route)`.
pub fn links_from_trips(
    trips: &[TripSchedule],
    config: &ScheduleConfig,
) -> Result<Vec<TransitLink>, DomainError> {
    let headways = HeadwayTable::from_trips(trips, config);

    let mut observations: BTreeMap<(StopId, StopId, RouteId), Vec<f64>> = BTreeMap::new();
    for trip in trips {
        for pair in trip.stop_times.windows(2) {
            let (current, next) = (&pair[0], &pair[1]);
            let minutes = next.arrival.minutes_since(current.departure);
            if minutes < 0.0 {
                warn!(
                    trip = %trip.trip_id,
                    from = %current.stop,
                    to = %next.stop,
                    minutes,
                    "skipping negative travel time"
                );
                continue;
            }
            observations
                .entry((current.stop.clone(), next.stop.clone(), trip.route.clone()))
                .or_default()
                .push(minutes);
        }
    }

    let mut links = Vec::with_capacity(observations.len());
    for ((from, to, route), samples) in observations {
        let n = samples.len() as f64;
        let mean = samples.iter().sum::<f64>() / n;
        let std = if samples.len() > 1 {
            let ss: f64 = samples.iter().map(|x| (x - mean) * (x - mean)).sum();
            (ss / (n - 1.0)).sqrt()
        } else {
            mean * config.default_travel_cv
        };

        let headway = headways.get(&route, &from);
        links.push(TransitLink::new(from, to, route, mean, headway)?.with_travel_dispersion(std)?);
    }

    debug!(
        trips = trips.len(),
        links = links.len(),
        headways = headways.len(),
        "built links from schedule"
    );

    Ok(links)
}
