//! Transit link type.
//!
//! A `TransitLink` is a directed arc of a line segment between two stops,
//! carrying the cost attributes every model reads. Links are validated at
//! construction and never change afterwards.

use serde::{Deserialize, Serialize};

use super::{DomainError, RouteId, StopId};

/// Extra delay added to a link's travel time, as a normal distribution.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DelayDistribution {
    /// Mean extra delay (minutes).
    pub mu: f64,
    /// Standard deviation of the extra delay (minutes).
    pub sigma: f64,
}

/// Full identity of a link: endpoints plus route.
///
/// Two links between the same pair of stops on different routes have
/// different keys.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LinkKey {
    pub from: StopId,
    pub to: StopId,
    pub route: RouteId,
}

/// A directed transit link.
///
/// # Invariants
///
/// - `travel_cost` is finite and `>= 0`
/// - `headway` is finite; `headway <= 0` means unscheduled (walking or
///   continuous service) and is treated as infinite frequency
/// - `std_travel_time` is finite and `>= 0`
/// - a delay, if present, has finite `mu` and finite `sigma >= 0`
///
/// # Examples
///
/// ```
/// use hyperpath::domain::{RouteId, StopId, TransitLink};
///
/// let link = TransitLink::new(
///     StopId::parse("A").unwrap(),
///     StopId::parse("B").unwrap(),
///     RouteId::parse("1").unwrap(),
///     10.0,
///     15.0,
/// )
/// .unwrap();
///
/// assert!(link.is_scheduled());
/// assert_eq!(link.wait_moments(), (7.5, 225.0 / 12.0));
///
/// // Negative travel costs are rejected
/// assert!(TransitLink::new(
///     StopId::parse("A").unwrap(),
///     StopId::parse("B").unwrap(),
///     RouteId::parse("1").unwrap(),
///     -1.0,
///     15.0,
/// )
/// .is_err());
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct TransitLink {
    from: StopId,
    to: StopId,
    route: RouteId,
    travel_cost: f64,
    headway: f64,
    std_travel_time: f64,
    delay: Option<DelayDistribution>,
}

impl TransitLink {
    /// Construct a link, validating the cost attributes.
    pub fn new(
        from: StopId,
        to: StopId,
        route: RouteId,
        travel_cost: f64,
        headway: f64,
    ) -> Result<Self, DomainError> {
        if !travel_cost.is_finite() || travel_cost < 0.0 {
            return Err(DomainError::InvalidAttribute {
                field: "travel_cost",
                value: travel_cost,
            });
        }
        if !headway.is_finite() {
            return Err(DomainError::InvalidAttribute {
                field: "headway",
                value: headway,
            });
        }

        Ok(TransitLink {
            from,
            to,
            route,
            travel_cost,
            headway,
            std_travel_time: 0.0,
            delay: None,
        })
    }

    /// Construct an unscheduled walking link on the walking route.
    pub fn walking(from: StopId, to: StopId, walk_minutes: f64) -> Result<Self, DomainError> {
        TransitLink::new(from, to, RouteId::walking(), walk_minutes, 0.0)
    }

    /// Set the standard deviation of the in-vehicle travel time.
    pub fn with_travel_dispersion(mut self, std_travel_time: f64) -> Result<Self, DomainError> {
        if !std_travel_time.is_finite() || std_travel_time < 0.0 {
            return Err(DomainError::InvalidAttribute {
                field: "std_travel_time",
                value: std_travel_time,
            });
        }
        self.std_travel_time = std_travel_time;
        Ok(self)
    }

    /// Attach an extra delay distribution.
    pub fn with_delay(mut self, mu: f64, sigma: f64) -> Result<Self, DomainError> {
        if !mu.is_finite() {
            return Err(DomainError::InvalidAttribute {
                field: "delay_mu",
                value: mu,
            });
        }
        if !sigma.is_finite() || sigma < 0.0 {
            return Err(DomainError::InvalidAttribute {
                field: "delay_sigma",
                value: sigma,
            });
        }
        self.delay = Some(DelayDistribution { mu, sigma });
        Ok(self)
    }

    pub fn from_stop(&self) -> &StopId {
        &self.from
    }

    pub fn to_stop(&self) -> &StopId {
        &self.to
    }

    pub fn route(&self) -> &RouteId {
        &self.route
    }

    /// Expected in-vehicle traversal time.
    pub fn travel_cost(&self) -> f64 {
        self.travel_cost
    }

    /// Mean time between departures of this link's route at `from`.
    pub fn headway(&self) -> f64 {
        self.headway
    }

    pub fn std_travel_time(&self) -> f64 {
        self.std_travel_time
    }

    pub fn delay(&self) -> Option<DelayDistribution> {
        self.delay
    }

    /// Returns true when the link has a positive headway.
    pub fn is_scheduled(&self) -> bool {
        self.headway > 0.0
    }

    /// Boarding frequency, `1 / headway`, or `infinite_frequency` for
    /// unscheduled links.
    pub fn frequency(&self, infinite_frequency: f64) -> f64 {
        if self.is_scheduled() {
            1.0 / self.headway
        } else {
            infinite_frequency
        }
    }

    /// Mean and variance of the wait for this link at `from`.
    ///
    /// Arrivals are uniform over a headway, so the wait is Uniform(0, h):
    /// mean `h / 2`, variance `h² / 12`. Unscheduled links have no wait.
    pub fn wait_moments(&self) -> (f64, f64) {
        if self.is_scheduled() {
            (self.headway / 2.0, self.headway * self.headway / 12.0)
        } else {
            (0.0, 0.0)
        }
    }

    /// Mean and variance of the time spent on this link, wait included.
    pub fn traversal_moments(&self) -> (f64, f64) {
        let (wait_mean, wait_var) = self.wait_moments();
        let (delay_mean, delay_var) = self
            .delay
            .map(|d| (d.mu, d.sigma * d.sigma))
            .unwrap_or((0.0, 0.0));

        (
            wait_mean + self.travel_cost + delay_mean,
            wait_var + self.std_travel_time * self.std_travel_time + delay_var,
        )
    }

    /// The link's full identity.
    pub fn key(&self) -> LinkKey {
        LinkKey {
            from: self.from.clone(),
            to: self.to.clone(),
            route: self.route.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stop(s: &str) -> StopId {
        StopId::parse(s).unwrap()
    }

    fn route(s: &str) -> RouteId {
        RouteId::parse(s).unwrap()
    }

    fn link(cost: f64, headway: f64) -> Result<TransitLink, DomainError> {
        TransitLink::new(stop("A"), stop("B"), route("1"), cost, headway)
    }

    #[test]
    fn accepts_zero_cost_and_zero_headway() {
        let l = link(0.0, 0.0).unwrap();
        assert!(!l.is_scheduled());
        assert_eq!(l.travel_cost(), 0.0);
    }

    #[test]
    fn rejects_bad_costs() {
        assert!(link(-0.5, 10.0).is_err());
        assert!(link(f64::NAN, 10.0).is_err());
        assert!(link(f64::INFINITY, 10.0).is_err());
        assert!(link(5.0, f64::NAN).is_err());
    }

    #[test]
    fn rejects_line_that_never_runs() {
        // An infinite headway would board at frequency zero
        for headway in [f64::INFINITY, f64::NEG_INFINITY] {
            assert!(matches!(
                link(5.0, headway),
                Err(DomainError::InvalidAttribute { field: "headway", .. })
            ));
        }
    }

    #[test]
    fn frequency_of_scheduled_and_walking() {
        assert_eq!(link(5.0, 20.0).unwrap().frequency(1e9), 0.05);
        assert_eq!(link(5.0, 0.0).unwrap().frequency(1e9), 1e9);
        assert_eq!(link(5.0, -3.0).unwrap().frequency(1e9), 1e9);
    }

    #[test]
    fn uniform_wait_moments() {
        let (mean, var) = link(5.0, 12.0).unwrap().wait_moments();
        assert_eq!(mean, 6.0);
        assert_eq!(var, 12.0);

        assert_eq!(link(5.0, 0.0).unwrap().wait_moments(), (0.0, 0.0));
    }

    #[test]
    fn traversal_moments_add_dispersion_and_delay() {
        let l = link(10.0, 12.0)
            .unwrap()
            .with_travel_dispersion(2.0)
            .unwrap()
            .with_delay(1.0, 3.0)
            .unwrap();

        let (mean, var) = l.traversal_moments();
        assert_eq!(mean, 6.0 + 10.0 + 1.0);
        assert_eq!(var, 12.0 + 4.0 + 9.0);
    }

    #[test]
    fn rejects_bad_dispersion_and_delay() {
        assert!(link(1.0, 1.0).unwrap().with_travel_dispersion(-1.0).is_err());
        assert!(link(1.0, 1.0).unwrap().with_delay(f64::NAN, 1.0).is_err());
        assert!(link(1.0, 1.0).unwrap().with_delay(0.0, -1.0).is_err());
    }

    #[test]
    fn walking_link_uses_walking_route() {
        let l = TransitLink::walking(stop("A"), stop("B"), 4.0).unwrap();
        assert!(l.route().is_walking());
        assert!(!l.is_scheduled());
    }

    #[test]
    fn keys_distinguish_routes() {
        let a = TransitLink::new(stop("A"), stop("B"), route("1"), 1.0, 5.0).unwrap();
        let b = TransitLink::new(stop("A"), stop("B"), route("2"), 1.0, 5.0).unwrap();
        assert_ne!(a.key(), b.key());
    }
}
