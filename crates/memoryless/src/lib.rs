//! Memoryless recurring-task scheduling
//!
//! This crate runs work at random intervals whose lengths are drawn from an
//! exponential distribution, i.e. at the arrival times of a Poisson process.
//! Sampling a system at such instants sees its time-averaged state without
//! bias (PASTA: "Poisson Arrivals See Time Averages"), which is what periodic
//! probes and samplers usually want. Fixed-period sampling can alias with
//! periodic behavior in the system under observation; memoryless sampling
//! cannot.
//!
//! ## Components
//!
//! - [`Config`]: mean delay, clamping bounds and the `once` switch.
//! - [`wait_time`] / [`DelayModel`]: the clamped exponential delay draw.
//! - [`run`] / [`run_async`] / [`run_with_rng`]: call a function repeatedly
//!   until a [`CancellationToken`] fires.
//! - [`Ticker`] / [`make_ticker`]: the same schedule as a stream of instants.
//! - [`sleep`] / [`after_fn`]: single memoryless timers.
//!
//! Delays are soft. Clamping to `[min, max]` trades statistical purity for
//! operational bounds, and `max` bounds the delay between calls, not the
//! duration of a call.

mod config;
mod delay;
mod error;
mod runner;
mod ticker;
mod timer;

pub use config::Config;
pub use delay::{wait_time, DelayModel};
pub use error::{ConfigError, ConfigResult};
pub use runner::{run, run_async, run_with_rng};
pub use ticker::{make_ticker, Ticker};
pub use timer::{after_fn, sleep, AfterFn};
// Re-exported so callers don't need a direct tokio-util dependency.
pub use tokio_util::sync::CancellationToken;
