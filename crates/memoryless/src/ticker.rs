//! Memoryless tick source
//!
//! A [`Ticker`] runs the same loop as [`run`](crate::run) on a background
//! task, except that each "call" hands the current instant to a reader.
//!
//! Hand-over is a rendezvous: a reader posts a request carrying a one-shot
//! reply slot and the producer answers it. The producer never queues ticks
//! ahead of readers. If no reader is waiting, it waits for one (or for the
//! stop signal), and requests whose reader gave up before being answered are
//! skipped. A reader that gives up after being answered leaves its tick in
//! the ticker, and the next [`Ticker::recv`] returns it.

use futures::Stream;
use parking_lot::Mutex;
use rand::{rngs::StdRng, Rng, SeedableRng};
use tokio::{
    sync::{mpsc, oneshot},
    task::JoinHandle,
    time::{sleep, Instant},
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace, warn};

use crate::{config::Config, delay::DelayModel, error::ConfigResult};

/// A tick request: the reader's reply slot.
type TickRequest = oneshot::Sender<Instant>;

/// Creates a ticker tied to `cancel`. See [`Ticker::new`].
pub fn make_ticker(cancel: &CancellationToken, config: Config) -> ConfigResult<Ticker> {
    Ticker::new(cancel, config)
}

/// Cancellable stream of ticks at memoryless intervals.
///
/// The ticker stops when [`Ticker::stop`] is called, when the parent token
/// passed at construction is cancelled, or when it is dropped. Once stopped,
/// [`Ticker::recv`] returns `None`.
#[derive(Debug)]
pub struct Ticker {
    requests: mpsc::Sender<TickRequest>,
    /// Tick answered to a reader that went away before reading it.
    unread: Mutex<Option<Instant>>,
    stop: CancellationToken,
    worker: JoinHandle<()>,
}

impl Ticker {
    /// Validates `config` and spawns the producer task.
    ///
    /// Must be called from within a tokio runtime.
    pub fn new(cancel: &CancellationToken, config: Config) -> ConfigResult<Self> {
        Self::with_rng(cancel, config, StdRng::from_entropy())
    }

    /// Like [`Ticker::new`], drawing delays from the provided random source.
    pub fn with_rng<R>(cancel: &CancellationToken, config: Config, rng: R) -> ConfigResult<Self>
    where
        R: Rng + Send + 'static,
    {
        let delays = DelayModel::new(config, rng)?;

        let stop = cancel.child_token();
        let (requests, request_rx) = mpsc::channel(1);
        let worker = tokio::spawn(tick_loop(stop.clone(), request_rx, delays));

        Ok(Self {
            requests,
            unread: Mutex::new(None),
            stop,
            worker,
        })
    }

    /// Waits for the next tick.
    ///
    /// Returns the instant the tick was produced, or `None` once the ticker is
    /// stopped or has finished (a `once` ticker finishes after one tick).
    ///
    /// Cancel safe: if the returned future is dropped after the producer
    /// answered it, the tick is kept for the next call.
    pub async fn recv(&self) -> Option<Instant> {
        if self.stop.is_cancelled() {
            return None;
        }

        let unread = self.unread.lock().take();
        if unread.is_some() {
            return unread;
        }

        let (reply_tx, reply_rx) = oneshot::channel();
        let mut reply = PendingReply {
            rx: reply_rx,
            unread: &self.unread,
        };
        let exchange = async {
            self.requests.send(reply_tx).await.ok()?;
            (&mut reply.rx).await.ok()
        };

        tokio::select! {
            biased;
            _ = self.stop.cancelled() => None,
            tick = exchange => tick,
        }
    }

    /// Stops the ticker. Idempotent.
    ///
    /// Pending and future [`Ticker::recv`] calls return `None`, and a tick
    /// that has not been handed over yet is dropped.
    pub fn stop(&self) {
        self.stop.cancel();
    }

    /// Returns whether the ticker was stopped, directly or via its parent.
    pub fn is_stopped(&self) -> bool {
        self.stop.is_cancelled()
    }

    /// Returns whether the producer task has exited.
    pub fn is_finished(&self) -> bool {
        self.worker.is_finished()
    }

    /// Stops the ticker and waits for the producer task to exit.
    pub async fn shutdown(mut self) {
        self.stop();
        if let Err(e) = (&mut self.worker).await {
            warn!(%e, "ticker task did not exit cleanly");
        }
    }

    /// Converts the ticker into a stream that ends when it stops.
    pub fn into_stream(self) -> impl Stream<Item = Instant> {
        futures::stream::unfold(self, |ticker| async move {
            let tick = ticker.recv().await?;
            Some((tick, ticker))
        })
    }
}

/// Reply slot of an in-flight [`Ticker::recv`].
///
/// Dropped unread, it moves an already answered tick back into the ticker.
struct PendingReply<'a> {
    rx: oneshot::Receiver<Instant>,
    unread: &'a Mutex<Option<Instant>>,
}

impl Drop for PendingReply<'_> {
    fn drop(&mut self) {
        if let Ok(tick) = self.rx.try_recv() {
            trace!("tick reader went away after hand-over, keeping tick");
            self.unread.lock().get_or_insert(tick);
        }
    }
}

impl Drop for Ticker {
    fn drop(&mut self) {
        self.stop.cancel();
    }
}

/// Producer loop. Exits on stop, or when every ticker handle is gone.
async fn tick_loop<R: Rng>(
    stop: CancellationToken,
    mut requests: mpsc::Receiver<TickRequest>,
    mut delays: DelayModel<R>,
) {
    let config = *delays.config();
    if config.once() {
        deliver(&stop, &mut requests, Instant::now()).await;
        debug!("memoryless ticker finished (once)");
        return;
    }

    debug!(
        expected = ?config.expected(),
        min = ?config.min(),
        max = ?config.max_bound(),
        "memoryless ticker started"
    );

    let mut delivered: u64 = 0;

    loop {
        if stop.is_cancelled() {
            break;
        }

        let timer = sleep(delays.next_delay());
        tokio::pin!(timer);

        match deliver(&stop, &mut requests, Instant::now()).await {
            Delivery::Delivered => delivered += 1,
            Delivery::Stopped => break,
        }

        tokio::select! {
            biased;
            _ = stop.cancelled() => break,
            _ = &mut timer => {}
        }
    }

    debug!(delivered, "memoryless ticker stopped");
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Delivery {
    Delivered,
    Stopped,
}

/// Hands `tick` to the first reader still waiting for it.
async fn deliver(
    stop: &CancellationToken,
    requests: &mut mpsc::Receiver<TickRequest>,
    tick: Instant,
) -> Delivery {
    loop {
        tokio::select! {
            biased;
            _ = stop.cancelled() => return Delivery::Stopped,
            req = requests.recv() => match req {
                Some(reply) => {
                    if reply.send(tick).is_ok() {
                        return Delivery::Delivered;
                    }
                    trace!("tick reader went away, waiting for another");
                }
                None => return Delivery::Stopped,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_deliver_skips_abandoned_requests() {
        let stop = CancellationToken::new();
        let (tx, mut rx) = mpsc::channel::<TickRequest>(4);

        let (gone_tx, gone_rx) = oneshot::channel();
        drop(gone_rx);
        tx.send(gone_tx).await.unwrap();

        let (live_tx, live_rx) = oneshot::channel();
        tx.send(live_tx).await.unwrap();

        let now = Instant::now();
        assert_eq!(deliver(&stop, &mut rx, now).await, Delivery::Delivered);
        assert_eq!(live_rx.await.unwrap(), now);
    }

    #[tokio::test(start_paused = true)]
    async fn test_deliver_returns_on_stop() {
        let stop = CancellationToken::new();
        let (_tx, mut rx) = mpsc::channel::<TickRequest>(1);

        stop.cancel();
        assert_eq!(
            deliver(&stop, &mut rx, Instant::now()).await,
            Delivery::Stopped
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_deliver_returns_when_handles_dropped() {
        let stop = CancellationToken::new();
        let (tx, mut rx) = mpsc::channel::<TickRequest>(1);
        drop(tx);

        assert_eq!(
            deliver(&stop, &mut rx, Instant::now()).await,
            Delivery::Stopped
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_abandoned_recv_keeps_answered_tick() {
        let cancel = CancellationToken::new();
        let pinned = Duration::from_secs(10);
        let config = Config::new(pinned).with_min(pinned).with_max(pinned);
        let start = Instant::now();
        let ticker = Ticker::new(&cancel, config).expect("valid config");

        {
            let read = ticker.recv();
            tokio::pin!(read);
            assert!(futures::poll!(&mut read).is_pending());

            // Let the producer answer the posted request, then give up on it.
            tokio::task::yield_now().await;
        }

        let tick = ticker.recv().await.expect("kept tick");
        assert_eq!(tick, start);
        assert_eq!(Instant::now(), start, "waited for a later tick");

        ticker.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_ticks_are_monotonic() {
        let cancel = CancellationToken::new();
        let ticker = Ticker::with_rng(
            &cancel,
            Config::new(Duration::from_millis(100)),
            StdRng::seed_from_u64(9),
        )
        .expect("valid config");

        let mut last = ticker.recv().await.expect("first tick");
        for _ in 0..20 {
            let tick = ticker.recv().await.expect("tick");
            assert!(tick >= last);
            last = tick;
        }

        ticker.shutdown().await;
    }
}
