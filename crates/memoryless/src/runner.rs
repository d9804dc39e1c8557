//! Recurring runner
//!
//! Invokes a callback at memoryless intervals until a cancellation token
//! fires. The timer for the next call is armed *before* the current call
//! runs, so the exponential distribution describes the time between call
//! starts. This only matches the intended rest period while the callback is
//! fast compared to the expected delay.

use std::future::{self, Future};

use rand::{rngs::StdRng, Rng, SeedableRng};
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

use crate::{config::Config, delay::DelayModel, error::ConfigResult};

/// Calls `f` repeatedly at memoryless intervals until `cancel` fires.
///
/// Returns an error without calling `f` if the config is invalid. With
/// `once` set, `f` is called exactly once and this returns right away.
/// Otherwise this returns `Ok(())` after cancellation is observed. A call
/// already in progress when the token fires is allowed to finish, and no
/// call starts after cancellation is seen.
///
/// ```rust,ignore
/// let cancel = CancellationToken::new();
/// let config = Config::new(Duration::from_secs(10)).with_max(Duration::from_secs(30));
/// memoryless::run(cancel.clone(), || probe_once(), config).await?;
/// ```
pub async fn run<F>(cancel: CancellationToken, mut f: F, config: Config) -> ConfigResult<()>
where
    F: FnMut(),
{
    run_async(
        cancel,
        move || {
            f();
            future::ready(())
        },
        config,
    )
    .await
}

/// Like [`run`], but awaits the future returned by each call before waiting
/// for the next one. Calls never overlap.
pub async fn run_async<F, Fut>(cancel: CancellationToken, f: F, config: Config) -> ConfigResult<()>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = ()>,
{
    run_with_rng(cancel, f, config, StdRng::from_entropy()).await
}

/// Like [`run_async`], drawing delays from the provided random source.
pub async fn run_with_rng<F, Fut, R>(
    cancel: CancellationToken,
    mut f: F,
    config: Config,
    rng: R,
) -> ConfigResult<()>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = ()>,
    R: Rng,
{
    let mut delays = DelayModel::new(config, rng)?;

    if config.once() {
        f().await;
        return Ok(());
    }

    debug!(
        expected = ?config.expected(),
        min = ?config.min(),
        max = ?config.max_bound(),
        "memoryless runner started"
    );

    let mut calls: u64 = 0;

    loop {
        // Checked before every call, so a token cancelled from inside the
        // previous call stops us even if the timer has already fired.
        if cancel.is_cancelled() {
            break;
        }

        let delay = delays.next_delay();
        let timer = sleep(delay);
        tokio::pin!(timer);

        trace!(?delay, calls, "invoking callback");
        f().await;
        calls += 1;

        tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            _ = &mut timer => {}
        }
    }

    debug!(calls, "memoryless runner cancelled");
    Ok(())
}
