//! Error types for the throttled cache layer
//!
//! Provides unified error handling using thiserror.

use thiserror::Error;

// == Throttle Error Enum ==
/// Unified error type for constructing caches and limiters.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ThrottleError {
    /// A construction parameter is out of its valid range
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl ThrottleError {
    pub(crate) fn invalid(msg: impl Into<String>) -> Self {
        ThrottleError::InvalidConfig(msg.into())
    }
}

// == Fetch Error Enum ==
/// Outcome of a failed [`ThrottledCache::fetch`](crate::ThrottledCache::fetch).
#[derive(Error, Debug)]
pub enum FetchError<E> {
    /// The token bucket refused admission for this call
    #[error("Throttled: no tokens available for a call of cost {cost}")]
    Throttled { cost: u32 },

    /// The wrapped operation failed; nothing was cached
    #[error("Operation failed: {0}")]
    Operation(#[source] E),
}

impl<E> FetchError<E> {
    /// Returns true if the call never reached the wrapped operation.
    pub fn is_throttled(&self) -> bool {
        matches!(self, FetchError::Throttled { .. })
    }

    /// Consumes the error, returning the operation's own error if there was one.
    pub fn into_operation(self) -> Option<E> {
        match self {
            FetchError::Operation(e) => Some(e),
            FetchError::Throttled { .. } => None,
        }
    }
}

// == Result Type Alias ==
/// Convenience Result type for construction and validation.
pub type Result<T> = std::result::Result<T, ThrottleError>;

// == Validation Helpers ==
pub(crate) fn ensure_positive_rate(name: &str, value: f64) -> Result<()> {
    if !value.is_finite() || value <= 0.0 {
        return Err(ThrottleError::invalid(format!(
            "{} must be a positive finite number, got {}",
            name, value
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_config_message() {
        let err = ThrottleError::invalid("capacity must be greater than zero");
        assert_eq!(
            err.to_string(),
            "Invalid configuration: capacity must be greater than zero"
        );
    }

    #[test]
    fn test_ensure_positive_rate() {
        assert!(ensure_positive_rate("rate", 2.5).is_ok());
        assert!(ensure_positive_rate("rate", 0.0).is_err());
        assert!(ensure_positive_rate("rate", -1.0).is_err());
        assert!(ensure_positive_rate("rate", f64::NAN).is_err());
        assert!(ensure_positive_rate("rate", f64::INFINITY).is_err());
    }

    #[test]
    fn test_fetch_error_helpers() {
        let throttled: FetchError<std::io::Error> = FetchError::Throttled { cost: 1 };
        assert!(throttled.is_throttled());
        assert!(throttled.into_operation().is_none());

        let failed: FetchError<std::io::Error> =
            FetchError::Operation(std::io::Error::new(std::io::ErrorKind::Other, "boom"));
        assert!(!failed.is_throttled());
        assert_eq!(failed.to_string(), "Operation failed: boom");
        assert_eq!(failed.into_operation().map(|e| e.to_string()), Some("boom".to_string()));
    }
}
