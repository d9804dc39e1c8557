//! End-to-end tests for the runner and ticker

use std::{
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
    time::Duration,
};

use futures::StreamExt;
use memoryless::*;
use rand::{rngs::StdRng, SeedableRng};
use tokio::time::{timeout, Instant};

fn pinned(d: Duration) -> Config {
    Config::new(d).with_min(d).with_max(d)
}

/// Kolmogorov-Smirnov distance between samples and `Exp(mean)`.
fn ks_exponential(samples: &mut [f64], mean: f64) -> f64 {
    samples.sort_by(|a, b| a.total_cmp(b));
    let n = samples.len() as f64;
    samples
        .iter()
        .enumerate()
        .map(|(i, x)| {
            let cdf = 1.0 - (-x / mean).exp();
            (cdf - i as f64 / n).max((i + 1) as f64 / n - cdf)
        })
        .fold(0.0, f64::max)
}

#[tokio::test(start_paused = true)]
async fn test_call_starts_follow_exponential() {
    const CALLS: usize = 4000;
    let expected = Duration::from_secs(1);

    let cancel = CancellationToken::new();
    let mut starts = Vec::with_capacity(CALLS);

    run_with_rng(
        cancel.clone(),
        || {
            starts.push(Instant::now());
            if starts.len() == CALLS {
                cancel.cancel();
            }
            std::future::ready(())
        },
        Config::new(expected),
        StdRng::seed_from_u64(42),
    )
    .await
    .expect("valid config");

    let mut gaps: Vec<f64> = starts
        .windows(2)
        .map(|w| (w[1] - w[0]).as_secs_f64())
        .collect();
    let mean = gaps.iter().sum::<f64>() / gaps.len() as f64;
    assert!((mean - 1.0).abs() < 0.1, "mean gap {mean}s");

    // Timer deadlines are rounded to whole milliseconds, which is negligible
    // against a one second mean.
    let d = ks_exponential(&mut gaps, expected.as_secs_f64());
    let critical = 1.95 / (gaps.len() as f64).sqrt();
    assert!(d < critical, "KS distance {d} exceeds {critical}");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_cancel_with_microsecond_delays_returns() {
    let cancel = CancellationToken::new();
    let calls = Arc::new(AtomicU64::new(0));

    let task = tokio::spawn({
        let cancel = cancel.clone();
        let calls = Arc::clone(&calls);
        async move {
            run(
                cancel,
                move || {
                    calls.fetch_add(1, Ordering::Relaxed);
                },
                pinned(Duration::from_micros(1)),
            )
            .await
        }
    });

    tokio::time::sleep(Duration::from_millis(20)).await;
    cancel.cancel();
    let at_cancel = calls.load(Ordering::Relaxed);

    let res = timeout(Duration::from_secs(5), task)
        .await
        .expect("runner must return after cancellation")
        .expect("runner must not panic");
    assert!(res.is_ok());

    let after = calls.load(Ordering::Relaxed);
    assert!(after <= at_cancel + 1, "{after} calls vs {at_cancel}");

    // Cancelling again after return is harmless.
    cancel.cancel();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_idle_ticker_delivers_nothing_after_stop() {
    let cancel = CancellationToken::new();
    let ticker = make_ticker(&cancel, pinned(Duration::from_millis(1))).expect("valid config");

    ticker.stop();
    tokio::time::sleep(Duration::from_millis(20)).await;

    assert!(ticker.is_stopped());
    assert!(ticker.is_finished(), "producer task leaked");
    assert_eq!(ticker.recv().await, None);

    let ticks: Vec<_> = ticker.into_stream().collect().await;
    assert!(ticks.is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_ticker_stop_is_idempotent() {
    let cancel = CancellationToken::new();
    let config = Config::new(Duration::from_millis(50));
    let ticker = make_ticker(&cancel, config).expect("valid config");

    assert!(ticker.recv().await.is_some());
    ticker.stop();
    ticker.stop();
    cancel.cancel();

    assert_eq!(ticker.recv().await, None);
    ticker.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_parent_cancel_stops_ticker() {
    let cancel = CancellationToken::new();
    let config = Config::new(Duration::from_millis(50));
    let ticker = make_ticker(&cancel, config).expect("valid config");

    assert!(ticker.recv().await.is_some());
    cancel.cancel();

    assert!(ticker.is_stopped());
    assert_eq!(ticker.recv().await, None);

    tokio::time::sleep(Duration::from_millis(1)).await;
    assert!(ticker.is_finished());
}

#[tokio::test(start_paused = true)]
async fn test_stop_wakes_pending_reader() {
    let cancel = CancellationToken::new();
    let ticker = make_ticker(&cancel, pinned(Duration::from_secs(3600))).expect("valid config");
    let ticker = Arc::new(ticker);

    // Take the immediate first tick so the next one is an hour away.
    assert!(ticker.recv().await.is_some());

    let reader = tokio::spawn({
        let ticker = Arc::clone(&ticker);
        async move { ticker.recv().await }
    });
    tokio::task::yield_now().await;

    ticker.stop();
    assert_eq!(reader.await.expect("reader task"), None);
}

#[tokio::test(start_paused = true)]
async fn test_once_ticker_yields_single_tick() {
    let cancel = CancellationToken::new();
    let config = Config::new(Duration::from_secs(3600)).with_once(true);
    let ticker = make_ticker(&cancel, config).expect("valid config");

    let ticks: Vec<_> = ticker.into_stream().collect().await;
    assert_eq!(ticks.len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_ticker_stream_spacing() {
    let cancel = CancellationToken::new();
    let config = Config::new(Duration::from_millis(200))
        .with_min(Duration::from_millis(20))
        .with_max(Duration::from_millis(500));
    let ticker = Ticker::with_rng(&cancel, config, StdRng::seed_from_u64(3)).expect("valid config");

    let ticks: Vec<_> = ticker.into_stream().take(50).collect().await;
    assert_eq!(ticks.len(), 50);

    for w in ticks.windows(2) {
        let gap = w[1] - w[0];
        assert!(gap >= Duration::from_millis(20), "{gap:?}");
        assert!(gap <= Duration::from_millis(501), "{gap:?}");
    }
}

#[tokio::test]
async fn test_ticker_rejects_invalid_config() {
    let cancel = CancellationToken::new();
    let config = Config::new(Duration::from_millis(10)).with_max(Duration::from_millis(5));

    let err = make_ticker(&cancel, config).expect_err("invalid config");
    assert_eq!(err.field(), "max");
}
