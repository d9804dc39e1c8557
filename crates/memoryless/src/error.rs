//! Error types for memoryless scheduling

use std::time::Duration;

use thiserror::Error;

/// Result type for configuration checks
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Schedule configuration errors
///
/// These are the only errors the scheduler reports. They are raised before any
/// timer is armed or any callback is invoked.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// Lower bound is above the mean
    #[error("min delay {min:?} exceeds expected delay {expected:?}")]
    MinExceedsExpected { min: Duration, expected: Duration },

    /// Mean is above a non-zero upper bound
    #[error("expected delay {expected:?} exceeds max delay {max:?}")]
    ExpectedExceedsMax { expected: Duration, max: Duration },

    /// A serialized duration field was negative
    #[error("field `{field}` must not be negative (got {value_ms}ms)")]
    NegativeDuration { field: &'static str, value_ms: i64 },
}

impl ConfigError {
    /// Name of the offending field, for reporting
    pub fn field(&self) -> &'static str {
        match self {
            Self::MinExceedsExpected { .. } => "min",
            Self::ExpectedExceedsMax { .. } => "max",
            Self::NegativeDuration { field, .. } => field,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = ConfigError::MinExceedsExpected {
            min: Duration::from_secs(2),
            expected: Duration::from_secs(1),
        };
        assert!(err.to_string().contains("min delay 2s"));
        assert!(err.to_string().contains("expected delay 1s"));

        let err = ConfigError::ExpectedExceedsMax {
            expected: Duration::from_millis(1500),
            max: Duration::from_secs(1),
        };
        assert!(err.to_string().contains("1.5s"));

        let err = ConfigError::NegativeDuration {
            field: "min_ms",
            value_ms: -5,
        };
        assert!(err.to_string().contains("min_ms"));
        assert!(err.to_string().contains("-5ms"));
    }

    #[test]
    fn test_error_field() {
        let err = ConfigError::NegativeDuration {
            field: "expected_ms",
            value_ms: -1,
        };
        assert_eq!(err.field(), "expected_ms");

        let err = ConfigError::ExpectedExceedsMax {
            expected: Duration::from_secs(2),
            max: Duration::from_secs(1),
        };
        assert_eq!(err.field(), "max");
    }
}
