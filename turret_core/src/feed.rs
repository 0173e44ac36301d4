//! Detection feed thread.
//!
//! Pulls frames from a `DetectionSource` on a dedicated thread and hands
//! the freshest batch to the control loop over a capacity-1 channel. The
//! consumer always sees the latest batch; a slow consumer loses stale
//! batches, never blocks the producer.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use crossbeam_channel as xch;
use turret_traits::clock::Clock;
use turret_traits::{Detection, DetectionSource};

pub struct FrameFeed {
    rx: xch::Receiver<Vec<Detection>>,
    /// ms timestamp (relative to `epoch`) of the last successful frame
    last_ok: Arc<AtomicU64>,
    epoch: Instant,
    shutdown: Arc<AtomicBool>,
    join_handle: Option<JoinHandle<()>>,
}

impl FrameFeed {
    /// Spawn the feed thread. `timeout` is passed through to the source on
    /// each pull; pull errors are logged and the thread keeps going.
    pub fn spawn<S, C>(mut source: S, timeout: Duration, clock: C) -> Self
    where
        S: DetectionSource + Send + 'static,
        C: Clock + Send + 'static,
    {
        let (tx, rx) = xch::bounded::<Vec<Detection>>(1);
        // Producer-side receiver for latest-wins replacement.
        let rx_evict = rx.clone();
        let shutdown = Arc::new(AtomicBool::new(false));
        let thread_shutdown = Arc::clone(&shutdown);
        let last_ok = Arc::new(AtomicU64::new(0));
        let thread_last_ok = Arc::clone(&last_ok);
        let epoch = clock.now();

        let join_handle = std::thread::spawn(move || {
            loop {
                if thread_shutdown.load(Ordering::Relaxed) {
                    break;
                }
                match source.next_frame(timeout) {
                    Ok(batch) => {
                        thread_last_ok.store(clock.ms_since(epoch), Ordering::Relaxed);
                        let mut pending = batch;
                        loop {
                            match tx.try_send(pending) {
                                Ok(()) => break,
                                Err(xch::TrySendError::Full(b)) => {
                                    // Drop the stale batch sitting in the slot.
                                    let _ = rx_evict.try_recv();
                                    pending = b;
                                }
                                Err(xch::TrySendError::Disconnected(_)) => return,
                            }
                        }
                    }
                    Err(e) => {
                        tracing::warn!(error = %e, "detection source pull failed");
                    }
                }
            }
            tracing::debug!("frame feed thread exiting");
        });

        Self {
            rx,
            last_ok,
            epoch,
            shutdown,
            join_handle: Some(join_handle),
        }
    }

    /// Freshest batch since the previous call, if any arrived.
    #[must_use]
    pub fn latest(&self) -> Option<Vec<Detection>> {
        self.rx.try_iter().last()
    }

    /// Block up to `timeout` for the next batch.
    #[must_use]
    pub fn recv_timeout(&self, timeout: Duration) -> Option<Vec<Detection>> {
        self.rx.recv_timeout(timeout).ok()
    }

    /// How long ago (ms, by the feed's clock) the source last produced a
    /// frame. Returns `now_ms` itself before the first frame.
    #[must_use]
    pub fn stalled_for(&self, now_ms: u64) -> u64 {
        now_ms.saturating_sub(self.last_ok.load(Ordering::Relaxed))
    }

    #[must_use]
    pub fn epoch(&self) -> Instant {
        self.epoch
    }
}

impl Drop for FrameFeed {
    fn drop(&mut self) {
        self.shutdown.store(true, Ordering::Relaxed);
        if let Some(handle) = self.join_handle.take()
            && handle.join().is_err()
        {
            tracing::warn!("frame feed thread panicked before join");
        }
    }
}
