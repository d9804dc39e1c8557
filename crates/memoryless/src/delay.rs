//! Clamped exponential delay model

use std::time::Duration;

use rand::Rng;
use rand_distr::Exp1;

use crate::{config::Config, error::ConfigResult};

/// Draws one delay for the given config.
///
/// The unclamped value is `expected * x` with `x ~ Exp(1)`, so successive
/// draws are independent and memoryless. The result is then clamped to
/// `[min, max]` (no upper clamp when `max` is zero). Products that overflow
/// saturate to [`Duration::MAX`] before clamping.
///
/// `config` must pass [`Config::check`]. Otherwise the bounds contradict
/// each other and the result is unspecified; debug builds panic. Use
/// [`DelayModel`] for a checked source of delays.
pub fn wait_time<R: Rng + ?Sized>(config: &Config, rng: &mut R) -> Duration {
    debug_assert!(config.check().is_ok(), "unchecked config {config:?}");
    let x: f64 = rng.sample(Exp1);
    let secs = config.expected().as_secs_f64() * x;
    let raw = Duration::try_from_secs_f64(secs).unwrap_or(Duration::MAX);
    clamp(config, raw)
}

fn clamp(config: &Config, d: Duration) -> Duration {
    let d = d.max(config.min());
    match config.max_bound() {
        Some(max) => d.min(max),
        None => d,
    }
}

/// Infinite sequence of delays drawn from one config and random source.
#[derive(Debug)]
pub struct DelayModel<R> {
    config: Config,
    rng: R,
}

impl<R: Rng> DelayModel<R> {
    /// Checks `config` and binds it to `rng`.
    pub fn new(config: Config, rng: R) -> ConfigResult<Self> {
        config.check()?;
        Ok(Self { config, rng })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Draws the next delay.
    pub fn next_delay(&mut self) -> Duration {
        wait_time(&self.config, &mut self.rng)
    }
}

impl<R: Rng> Iterator for DelayModel<R> {
    type Item = Duration;

    fn next(&mut self) -> Option<Self::Item> {
        Some(self.next_delay())
    }
}
