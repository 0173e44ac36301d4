//! Control-loop thread that drains actuator requests.
//!
//! The frame path never touches the recorder directly; it raises flags on
//! `RecorderRequests` and this thread applies them at its own cadence. A
//! drained stop always restarts the capture pipeline afterwards, because
//! stopping a recording tears the device's capture configuration down.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::JoinHandle;
use std::time::Duration;

use turret_traits::Recorder;
use turret_traits::clock::Clock;

use crate::requests::RecorderRequests;

pub struct ActuatorDrain {
    shutdown: Arc<AtomicBool>,
    join_handle: Option<JoinHandle<()>>,
}

impl ActuatorDrain {
    /// Spawn the drain loop. It polls every `poll`, applies pending start
    /// then stop, and exits when the handle is dropped.
    pub fn spawn<R, C>(
        mut recorder: R,
        requests: Arc<RecorderRequests>,
        poll: Duration,
        clock: C,
    ) -> Self
    where
        R: Recorder + Send + 'static,
        C: Clock + Send + 'static,
    {
        let shutdown = Arc::new(AtomicBool::new(false));
        let thread_shutdown = Arc::clone(&shutdown);

        let join_handle = std::thread::spawn(move || {
            loop {
                if thread_shutdown.load(Ordering::Relaxed) {
                    break;
                }

                if requests.take_start() {
                    match recorder.start() {
                        Ok(()) => tracing::info!("recording started"),
                        Err(e) => tracing::warn!(error = %e, "recorder start failed"),
                    }
                }

                if requests.take_stop() {
                    match recorder.stop() {
                        Ok(()) => tracing::info!("recording stopped"),
                        Err(e) => tracing::warn!(error = %e, "recorder stop failed"),
                    }
                    // Best effort even when the stop itself failed; the
                    // capture side must come back either way.
                    if let Err(e) = recorder.restart_pipeline() {
                        tracing::warn!(error = %e, "capture pipeline restart failed");
                    }
                }

                if thread_shutdown.load(Ordering::Relaxed) {
                    break;
                }
                clock.sleep(poll);
            }
            tracing::debug!("actuator drain thread exiting");
        });

        Self {
            shutdown,
            join_handle: Some(join_handle),
        }
    }
}

impl Drop for ActuatorDrain {
    fn drop(&mut self) {
        self.shutdown.store(true, Ordering::Relaxed);
        if let Some(handle) = self.join_handle.take()
            && handle.join().is_err()
        {
            tracing::warn!("actuator drain thread panicked before join");
        }
    }
}
