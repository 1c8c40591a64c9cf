//! Domain error types.
//!
//! These errors represent validation failures in the domain layer. They are
//! distinct from network-construction and search errors.

use super::{InvalidRouteId, InvalidStopId};

/// Domain-level errors for validation.
#[derive(Debug, Clone, thiserror::Error)]
pub enum DomainError {
    /// Stop id failed validation
    #[error(transparent)]
    Stop(#[from] InvalidStopId),

    /// Route id failed validation
    #[error(transparent)]
    Route(#[from] InvalidRouteId),

    /// A numeric link attribute is outside its allowed range
    #[error("invalid link attribute {field}: {value}")]
    InvalidAttribute { field: &'static str, value: f64 },

    /// A schedule time string could not be parsed
    #[error("invalid schedule time {0:?}")]
    InvalidTime(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::StopId;

    #[test]
    fn error_display() {
        let err = DomainError::InvalidAttribute {
            field: "travel_cost",
            value: -1.0,
        };
        assert_eq!(err.to_string(), "invalid link attribute travel_cost: -1");

        let err = DomainError::InvalidTime("8:xx".into());
        assert_eq!(err.to_string(), "invalid schedule time \"8:xx\"");

        let err: DomainError = StopId::parse("").unwrap_err().into();
        assert_eq!(err.to_string(), "invalid stop id: stop id cannot be empty");
    }
}
