//! Target acquisition hysteresis.
//!
//! A single spurious detection must not swing the actuators, and a single
//! missed frame must not drop an engaged target. Acquisition therefore
//! requires a burst of detections inside a trailing window, and loss
//! requires a sustained gap.

use std::collections::VecDeque;

#[derive(Debug, Clone, Copy)]
pub struct AcquisitionCfg {
    /// Detections inside the window needed to declare acquisition.
    pub activation_detections: usize,
    /// Length of the trailing activation window (ms).
    pub activation_window_ms: u64,
    /// Gap without detections after which an acquired target is lost (ms).
    pub lost_timeout_ms: u64,
}

impl Default for AcquisitionCfg {
    fn default() -> Self {
        Self {
            activation_detections: 5,
            activation_window_ms: 1_000,
            lost_timeout_ms: 2_000,
        }
    }
}

/// Edge reported by one `update` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    None,
    Acquired,
    Lost,
}

#[derive(Debug)]
pub struct TargetTracker {
    cfg: AcquisitionCfg,
    /// Timestamps (ms) of recent detection frames, oldest first.
    detection_times_ms: VecDeque<u64>,
    last_detection_ms: Option<u64>,
    acquired: bool,
}

impl TargetTracker {
    #[must_use]
    pub fn new(cfg: AcquisitionCfg) -> Self {
        Self {
            cfg,
            detection_times_ms: VecDeque::new(),
            last_detection_ms: None,
            acquired: false,
        }
    }

    #[must_use]
    pub fn is_acquired(&self) -> bool {
        self.acquired
    }

    /// Drop all state back to idle without reporting a transition.
    pub fn reset(&mut self) {
        self.detection_times_ms.clear();
        self.last_detection_ms = None;
        self.acquired = false;
    }

    /// Feed one frame observation. `now_ms` must be monotonic across calls.
    ///
    /// Loss is evaluated on every update once acquired, whether or not the
    /// frame carried detections; a detection arriving after the timeout gap
    /// reports `Lost` for that frame and counts toward a fresh activation.
    pub fn update(&mut self, has_detections: bool, now_ms: u64) -> Transition {
        let mut transition = Transition::None;

        if self.acquired
            && let Some(last) = self.last_detection_ms
            && now_ms.saturating_sub(last) > self.cfg.lost_timeout_ms
        {
            self.acquired = false;
            self.detection_times_ms.clear();
            transition = Transition::Lost;
            tracing::info!(gap_ms = now_ms.saturating_sub(last), "target lost");
        }

        if has_detections {
            self.detection_times_ms.push_back(now_ms);
            self.last_detection_ms = Some(now_ms);

            while let Some(&oldest) = self.detection_times_ms.front() {
                if now_ms.saturating_sub(oldest) > self.cfg.activation_window_ms {
                    self.detection_times_ms.pop_front();
                } else {
                    break;
                }
            }

            if !self.acquired
                && transition != Transition::Lost
                && self.detection_times_ms.len() >= self.cfg.activation_detections
            {
                self.acquired = true;
                transition = Transition::Acquired;
                tracing::info!(
                    detections = self.detection_times_ms.len(),
                    window_ms = self.cfg.activation_window_ms,
                    "target acquired"
                );
            }
        }

        transition
    }
}
