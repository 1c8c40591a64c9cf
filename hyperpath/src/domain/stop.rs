//! Stop identifier type.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

/// Error returned when parsing an invalid stop identifier.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid stop id: {reason}")]
pub struct InvalidStopId {
    reason: &'static str,
}

/// An opaque identifier naming a network node.
///
/// Stop ids come straight from schedule data (GTFS `stop_id`), so the only
/// validation is that they are non-empty and not pure whitespace. Cloning is
/// cheap: the text is shared.
///
/// # Examples
///
/// ```
/// use hyperpath::domain::StopId;
///
/// let stop = StopId::parse("100457-8017").unwrap();
/// assert_eq!(stop.as_str(), "100457-8017");
///
/// // Empty ids are rejected
/// assert!(StopId::parse("").is_err());
/// assert!(StopId::parse("   ").is_err());
/// ```
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct StopId(Arc<str>);

impl StopId {
    /// Parse a stop id from a string.
    pub fn parse(s: &str) -> Result<Self, InvalidStopId> {
        if s.is_empty() {
            return Err(InvalidStopId {
                reason: "stop id cannot be empty",
            });
        }
        if s.trim().is_empty() {
            return Err(InvalidStopId {
                reason: "stop id cannot be only whitespace",
            });
        }
        Ok(StopId(Arc::from(s)))
    }

    /// Returns the stop id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for StopId {
    type Error = InvalidStopId;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        StopId::parse(&value)
    }
}

impl From<StopId> for String {
    fn from(value: StopId) -> Self {
        value.0.to_string()
    }
}

impl fmt::Debug for StopId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "StopId({})", self.as_str())
    }
}

impl fmt::Display for StopId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
