//! Schedule configuration

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, ConfigResult};

/// Default mean delay in millis.
const DEFAULT_EXPECTED_MS: u64 = 1000;

/// Delay distribution and run mode for a memoryless schedule.
///
/// Delays are drawn from an exponential distribution with mean `expected` and
/// then clamped to `[min, max]`. A zero `max` means there is no upper bound.
/// Clamping biases the distribution, so keep `min` at or below ~10% of
/// `expected` and `max` at or above ~250% of `expected`.
///
/// Nothing is validated on construction; [`Config::check`] runs when a
/// schedule is started.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "ConfigRepr", into = "ConfigRepr")]
pub struct Config {
    /// Mean delay between invocation starts.
    expected: Duration,
    /// Lower bound on any delay.
    min: Duration,
    /// Upper bound on any delay, zero for unbounded.
    max: Duration,
    /// Invoke once and return, no timing involved.
    once: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self::new(Duration::from_millis(DEFAULT_EXPECTED_MS))
    }
}

impl Config {
    /// Creates an unclamped config with the given mean delay.
    pub fn new(expected: Duration) -> Self {
        Self {
            expected,
            min: Duration::ZERO,
            max: Duration::ZERO,
            once: false,
        }
    }

    pub fn with_expected(mut self, expected: Duration) -> Self {
        self.expected = expected;
        self
    }

    pub fn with_min(mut self, min: Duration) -> Self {
        self.min = min;
        self
    }

    /// Sets the upper bound. `Duration::ZERO` removes it.
    pub fn with_max(mut self, max: Duration) -> Self {
        self.max = max;
        self
    }

    pub fn with_once(mut self, once: bool) -> Self {
        self.once = once;
        self
    }

    pub fn expected(&self) -> Duration {
        self.expected
    }

    pub fn min(&self) -> Duration {
        self.min
    }

    pub fn max(&self) -> Duration {
        self.max
    }

    /// Returns the upper bound, or `None` if unbounded.
    pub fn max_bound(&self) -> Option<Duration> {
        (!self.max.is_zero()).then_some(self.max)
    }

    pub fn once(&self) -> bool {
        self.once
    }

    /// Checks `min <= expected` and, when bounded, `expected <= max`.
    pub fn check(&self) -> ConfigResult<()> {
        if self.min > self.expected {
            return Err(ConfigError::MinExceedsExpected {
                min: self.min,
                expected: self.expected,
            });
        }

        if let Some(max) = self.max_bound() {
            if self.expected > max {
                return Err(ConfigError::ExpectedExceedsMax {
                    expected: self.expected,
                    max,
                });
            }
        }

        Ok(())
    }
}

/// On-disk form of [`Config`], with signed millisecond fields.
///
/// Sub-millisecond precision is truncated when serializing.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct ConfigRepr {
    #[serde(default = "default_expected_ms")]
    expected_ms: i64,

    #[serde(default)]
    min_ms: i64,

    #[serde(default)]
    max_ms: i64,

    #[serde(default)]
    once: bool,
}

fn default_expected_ms() -> i64 {
    DEFAULT_EXPECTED_MS as i64
}

fn millis_field(field: &'static str, value_ms: i64) -> ConfigResult<Duration> {
    u64::try_from(value_ms)
        .map(Duration::from_millis)
        .map_err(|_| ConfigError::NegativeDuration { field, value_ms })
}

fn to_millis(d: Duration) -> i64 {
    i64::try_from(d.as_millis()).unwrap_or(i64::MAX)
}

impl TryFrom<ConfigRepr> for Config {
    type Error = ConfigError;

    fn try_from(repr: ConfigRepr) -> Result<Self, Self::Error> {
        Ok(Self {
            expected: millis_field("expected_ms", repr.expected_ms)?,
            min: millis_field("min_ms", repr.min_ms)?,
            max: millis_field("max_ms", repr.max_ms)?,
            once: repr.once,
        })
    }
}

impl From<Config> for ConfigRepr {
    fn from(config: Config) -> Self {
        Self {
            expected_ms: to_millis(config.expected),
            min_ms: to_millis(config.min),
            max_ms: to_millis(config.max),
            once: config.once,
        }
    }
}
