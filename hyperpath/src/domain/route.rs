//! Route (line/service) identifier type.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

/// Route id given to walking transfers.
pub const WALKING_ROUTE: &str = "walk";

/// Error returned when parsing an invalid route identifier.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid route id: {reason}")]
pub struct InvalidRouteId {
    reason: &'static str,
}

/// Identifies the line a link belongs to.
///
/// Only used to tell "staying on the same line" apart from "changing
/// lines", and as part of a link's identity so that parallel links served
/// by different routes stay distinct.
///
/// # Examples
///
/// ```
/// use hyperpath::domain::RouteId;
///
/// let route = RouteId::parse("M1").unwrap();
/// assert_eq!(route.as_str(), "M1");
/// assert!(RouteId::walking().is_walking());
/// assert!(RouteId::parse("").is_err());
/// ```
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RouteId(Arc<str>);

impl RouteId {
    /// Parse a route id from a string. The input must be non-empty.
    pub fn parse(s: &str) -> Result<Self, InvalidRouteId> {
        if s.trim().is_empty() {
            return Err(InvalidRouteId {
                reason: "route id cannot be empty",
            });
        }
        Ok(RouteId(Arc::from(s)))
    }

    /// The route id shared by all walking transfers.
    pub fn walking() -> Self {
        RouteId(Arc::from(WALKING_ROUTE))
    }

    /// Returns true for the walking route.
    pub fn is_walking(&self) -> bool {
        &*self.0 == WALKING_ROUTE
    }

    /// Returns the route id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for RouteId {
    type Error = InvalidRouteId;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        RouteId::parse(&value)
    }
}

impl From<RouteId> for String {
    fn from(value: RouteId) -> Self {
        value.0.to_string()
    }
}

impl fmt::Debug for RouteId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RouteId({})", self.as_str())
    }
}

impl fmt::Display for RouteId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_and_display() {
        let route = RouteId::parse("1").unwrap();
        assert_eq!(route.to_string(), "1");
        assert_eq!(format!("{:?}", route), "RouteId(1)");
        assert!(!route.is_walking());
    }

    #[test]
    fn reject_blank() {
        assert!(RouteId::parse("").is_err());
        assert!(RouteId::parse("  ").is_err());
    }

    #[test]
    fn walking_route() {
        assert_eq!(RouteId::walking(), RouteId::parse("walk").unwrap());
    }
}
