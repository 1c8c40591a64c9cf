//! Domain types for the transit network.
//!
//! This module contains the value types every other layer is built on.
//! All types enforce their invariants at construction time, so code that
//! receives them can trust their validity.

mod error;
mod link;
mod route;
mod stop;

pub use error::DomainError;
pub use link::{DelayDistribution, LinkKey, TransitLink};
pub use route::{InvalidRouteId, RouteId, WALKING_ROUTE};
pub use stop::{InvalidStopId, StopId};
