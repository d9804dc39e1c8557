//! One-shot memoryless timers
//!
//! Each timer waits for a single draw from the delay model. Building a fresh
//! timer every time one fires produces a memoryless series of events, which
//! is useful when the caller owns its own loop. The `once` flag of the config
//! has no effect here.

use std::sync::{
    atomic::{AtomicU8, Ordering},
    Arc,
};

use rand::thread_rng;
use tokio::{
    task::JoinHandle,
    time::{self, Sleep},
};
use tracing::trace;

use crate::{config::Config, delay::wait_time, error::ConfigResult};

const PENDING: u8 = 0;
const FIRED: u8 = 1;
const STOPPED: u8 = 2;

/// Returns a timer that elapses after one memoryless delay.
pub fn sleep(config: &Config) -> ConfigResult<Sleep> {
    config.check()?;
    let delay = wait_time(config, &mut thread_rng());
    trace!(?delay, "memoryless sleep armed");
    Ok(time::sleep(delay))
}

/// Calls `f` on a background task after one memoryless delay.
///
/// Must be called from within a tokio runtime.
pub fn after_fn<F>(config: &Config, f: F) -> ConfigResult<AfterFn>
where
    F: FnOnce() + Send + 'static,
{
    let timer = sleep(config)?;
    let state = Arc::new(AtomicU8::new(PENDING));

    let task_state = Arc::clone(&state);
    let handle = tokio::spawn(async move {
        timer.await;
        if task_state
            .compare_exchange(PENDING, FIRED, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
        {
            f();
        }
    });

    Ok(AfterFn { state, handle })
}

/// Handle to a callback scheduled by [`after_fn`].
#[derive(Debug)]
pub struct AfterFn {
    state: Arc<AtomicU8>,
    handle: JoinHandle<()>,
}

impl AfterFn {
    /// Prevents the callback from running.
    ///
    /// Returns `true` if this call stopped it, `false` if it already fired or
    /// was already stopped.
    pub fn stop(&self) -> bool {
        let stopped = self
            .state
            .compare_exchange(PENDING, STOPPED, Ordering::AcqRel, Ordering::Acquire)
            .is_ok();
        if stopped {
            self.handle.abort();
        }
        stopped
    }

    /// Returns whether the timer fired, meaning the callback has started or
    /// is about to start. It may still be running.
    pub fn has_fired(&self) -> bool {
        self.state.load(Ordering::Acquire) == FIRED
    }
}
