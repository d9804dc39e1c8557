//! Probe drivers for both scheduler primitives.

use std::time::Duration;

use memoryless::{make_ticker, run, CancellationToken, Config as ScheduleConfig};
use tokio::time::Instant;
use tracing::{info, warn};

use crate::errors::Result;

/// Running statistics over observed probe instants.
#[derive(Debug, Default)]
pub(crate) struct ProbeStats {
    probes: u64,
    first: Option<Instant>,
    last: Option<Instant>,
}

impl ProbeStats {
    /// Records a probe and returns the gap since the previous one.
    pub(crate) fn record(&mut self, at: Instant) -> Option<Duration> {
        self.probes += 1;
        self.first.get_or_insert(at);
        let gap = self.last.map(|last| at.saturating_duration_since(last));
        self.last = Some(at);
        gap
    }

    pub(crate) fn probes(&self) -> u64 {
        self.probes
    }

    /// Mean gap between consecutive probes, if there were at least two.
    pub(crate) fn mean_gap(&self) -> Option<Duration> {
        let (first, last) = (self.first?, self.last?);
        let gaps = u32::try_from(self.probes.checked_sub(1)?).ok()?;
        if gaps == 0 {
            return None;
        }
        Some(last.saturating_duration_since(first) / gaps)
    }

    /// Whether `limit` probes have been taken.
    pub(crate) fn reached(&self, limit: Option<u64>) -> bool {
        limit.is_some_and(|limit| self.probes >= limit)
    }
}

/// Takes probes through [`memoryless::run`] until cancelled or `count` is reached.
pub(crate) async fn probe_with_runner(
    cancel: CancellationToken,
    schedule: ScheduleConfig,
    count: Option<u64>,
) -> Result<ProbeStats> {
    let mut stats = ProbeStats::default();

    run(
        cancel.clone(),
        || {
            let gap = stats.record(Instant::now());
            info!(probe = stats.probes(), ?gap, "probe");
            if stats.reached(count) {
                cancel.cancel();
            }
        },
        schedule,
    )
    .await?;

    Ok(stats)
}

/// Takes probes by reading a [`memoryless::Ticker`] until cancelled or
/// `count` is reached.
pub(crate) async fn probe_with_ticker(
    cancel: CancellationToken,
    schedule: ScheduleConfig,
    count: Option<u64>,
) -> Result<ProbeStats> {
    let mut stats = ProbeStats::default();
    let ticker = make_ticker(&cancel, schedule)?;

    while let Some(tick) = ticker.recv().await {
        let gap = stats.record(tick);
        info!(probe = stats.probes(), ?gap, "probe");
        if stats.reached(count) {
            break;
        }
    }

    ticker.shutdown().await;
    Ok(stats)
}

/// Logs a summary of the probes taken.
pub(crate) fn report(stats: &ProbeStats, schedule: &ScheduleConfig) {
    match stats.mean_gap() {
        Some(mean) => info!(
            probes = stats.probes(),
            ?mean,
            expected = ?schedule.expected(),
            "probing finished"
        ),
        None if stats.probes() == 0 => warn!("probing finished without any probes"),
        None => info!(probes = stats.probes(), "probing finished"),
    }
}
