//! Frame orchestration and mode arbitration.
//!
//! One `process_frame` call per captured frame: smooth the detections,
//! advance the acquisition state machine, fire side effects on its edges,
//! and while a target is held, steer toward the best track. Side effects
//! happen only on transitions, so reprocessing a steady state never
//! re-toggles an actuator.

use std::sync::{Arc, Mutex};
use std::time::Instant;

use turret_traits::clock::Clock;
use turret_traits::{Detection, FrameSize, Relay, ServoBank};

use crate::acquire::{AcquisitionCfg, TargetTracker, Transition};
use crate::error::{BuildError, TurretError, map_hw_error_dyn};
use crate::filter::{FilterCfg, TrackFilter};
use crate::mapper::{self, TrackingCfg};
use crate::motion::MotionController;
use crate::requests::RecorderRequests;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperatingMode {
    /// Frames drive the state machine and the actuators.
    Automatic,
    /// Frames are ignored; only direct commands move the rig.
    Manual,
}

/// What one processed frame did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameOutcome {
    /// Manual mode, frame ignored.
    Suspended,
    /// No target held.
    Idle,
    /// This frame crossed the acquisition threshold.
    JustAcquired { moved: bool },
    /// Target held; `moved` is false inside the dead zone or when the move
    /// slot was busy.
    Tracking { moved: bool },
    /// This frame crossed the loss timeout.
    JustLost,
}

/// Everything the pipeline needs besides its collaborators.
#[derive(Debug, Clone, Copy)]
pub struct PipelineParams {
    pub filter: FilterCfg,
    pub acquisition: AcquisitionCfg,
    pub tracking: TrackingCfg,
    pub frame: FrameSize,
    /// When false, acquisition never drives the relay. Recording and
    /// motion are unaffected.
    pub armed: bool,
}

#[derive(Debug, Clone, Copy)]
pub struct PipelineStatus {
    pub mode: OperatingMode,
    pub acquired: bool,
    pub armed: bool,
    pub pan_deg: f32,
    pub tilt_deg: f32,
    pub moving: bool,
    pub live_tracks: usize,
}

pub struct FramePipeline<B: ServoBank + Send + 'static, R: Relay> {
    filter: TrackFilter,
    tracker: TargetTracker,
    tracking: TrackingCfg,
    frame: FrameSize,
    armed: bool,
    mode: OperatingMode,
    relay_active: bool,
    motion: Arc<MotionController<B>>,
    relay: Arc<Mutex<R>>,
    requests: Arc<RecorderRequests>,
    clock: Arc<dyn Clock + Send + Sync>,
    epoch: Instant,
}

impl<B: ServoBank + Send + 'static, R: Relay> std::fmt::Debug for FramePipeline<B, R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FramePipeline")
            .field("armed", &self.armed)
            .field("mode", &self.mode)
            .field("relay_active", &self.relay_active)
            .finish_non_exhaustive()
    }
}

impl<B: ServoBank + Send + 'static, R: Relay> FramePipeline<B, R> {
    pub fn new(
        params: PipelineParams,
        motion: Arc<MotionController<B>>,
        relay: Arc<Mutex<R>>,
        requests: Arc<RecorderRequests>,
        clock: Arc<dyn Clock + Send + Sync>,
    ) -> Result<Self, BuildError> {
        validate(&params)?;
        let epoch = clock.now();
        Ok(Self {
            filter: TrackFilter::new(params.filter),
            tracker: TargetTracker::new(params.acquisition),
            tracking: params.tracking,
            frame: params.frame,
            armed: params.armed,
            mode: OperatingMode::Automatic,
            relay_active: false,
            motion,
            relay,
            requests,
            clock,
            epoch,
        })
    }

    /// Process one frame, stamped with the pipeline clock.
    pub fn process_frame(&mut self, detections: &[Detection]) -> Result<FrameOutcome, TurretError> {
        let now_ms = self.clock.ms_since(self.epoch);
        self.process_frame_at(detections, now_ms)
    }

    /// Like `process_frame` with an explicit timestamp (ms, monotonic).
    pub fn process_frame_at(
        &mut self,
        detections: &[Detection],
        now_ms: u64,
    ) -> Result<FrameOutcome, TurretError> {
        if self.mode == OperatingMode::Manual {
            return Ok(FrameOutcome::Suspended);
        }

        // Filter before the state machine, so target selection below never
        // sees a track the same frame already evicted.
        self.filter.update(detections);
        let transition = self.tracker.update(!detections.is_empty(), now_ms);

        match transition {
            Transition::Acquired => {
                self.requests.request_start();
                self.set_relay(true)?;
                let moved = self.pursue();
                Ok(FrameOutcome::JustAcquired { moved })
            }
            Transition::Lost => {
                self.set_relay(false)?;
                self.requests.request_stop();
                if !self.motion.request_home() {
                    tracing::debug!("home request dropped: move slot busy");
                }
                Ok(FrameOutcome::JustLost)
            }
            Transition::None => {
                if self.tracker.is_acquired() {
                    Ok(FrameOutcome::Tracking {
                        moved: self.pursue(),
                    })
                } else {
                    Ok(FrameOutcome::Idle)
                }
            }
        }
    }

    /// Switch modes. Leaving Automatic quiesces everything the state
    /// machine was driving; entering it starts from a clean idle state and
    /// re-homes the rig.
    pub fn set_mode(&mut self, mode: OperatingMode) -> Result<(), TurretError> {
        if mode == self.mode {
            return Ok(());
        }
        self.set_relay(false)?;
        // Only an in-progress engagement has a recording to wind down.
        if self.tracker.is_acquired() {
            self.requests.request_stop();
        }
        self.tracker.reset();
        self.filter.clear();
        if mode == OperatingMode::Automatic && !self.motion.request_home() {
            tracing::debug!("home request dropped: move slot busy");
        }
        self.mode = mode;
        tracing::info!(?mode, "operating mode changed");
        Ok(())
    }

    #[must_use]
    pub fn mode(&self) -> OperatingMode {
        self.mode
    }

    /// Direct pose command. Refused in Automatic mode, where the state
    /// machine owns the servos.
    pub fn manual_move(&self, pan_deg: f32, tilt_deg: f32) -> Result<(), TurretError> {
        self.ensure_manual("move")?;
        self.motion.move_to(pan_deg, tilt_deg)
    }

    /// Direct relay command. Allowed in either mode and not gated by
    /// `armed`; arming only gates what acquisition may do on its own.
    pub fn manual_fire(&mut self, on: bool) -> Result<(), TurretError> {
        let mut relay = self
            .relay
            .lock()
            .map_err(|_| TurretError::State("relay lock poisoned".into()))?;
        relay
            .set_active(on)
            .map_err(|e| map_hw_error_dyn(e.as_ref()))?;
        self.relay_active = on;
        Ok(())
    }

    /// Redefine the home pose as the current pose. Refused in Automatic
    /// mode.
    pub fn manual_set_home(&self) -> Result<(), TurretError> {
        self.ensure_manual("set-home")?;
        self.motion.set_home_to_current()
    }

    #[must_use]
    pub fn status(&self) -> PipelineStatus {
        let (pan_deg, tilt_deg) = self.motion.current_angles();
        PipelineStatus {
            mode: self.mode,
            acquired: self.tracker.is_acquired(),
            armed: self.armed,
            pan_deg,
            tilt_deg,
            moving: self.motion.is_moving(),
            live_tracks: self.filter.len(),
        }
    }

    fn ensure_manual(&self, what: &str) -> Result<(), TurretError> {
        if self.mode == OperatingMode::Automatic {
            return Err(TurretError::Rejected(format!(
                "manual {what} refused while in automatic mode"
            )));
        }
        Ok(())
    }

    /// Steer toward the best track. Returns whether a move was started.
    fn pursue(&self) -> bool {
        let Some(track) = self.filter.best() else {
            return false;
        };
        let Some(delta) = mapper::angle_offsets(&track.bbox, self.frame, &self.tracking) else {
            return false;
        };
        let (pan, tilt) = self.motion.current_angles();
        self.motion
            .request_move(pan + delta.pan_deg, tilt + delta.tilt_deg)
    }

    fn set_relay(&mut self, on: bool) -> Result<(), TurretError> {
        if on && !self.armed {
            tracing::debug!("relay activation suppressed: not armed");
            return Ok(());
        }
        if on == self.relay_active {
            return Ok(());
        }
        let mut relay = self
            .relay
            .lock()
            .map_err(|_| TurretError::State("relay lock poisoned".into()))?;
        relay
            .set_active(on)
            .map_err(|e| map_hw_error_dyn(e.as_ref()))?;
        self.relay_active = on;
        Ok(())
    }
}

fn validate(p: &PipelineParams) -> Result<(), BuildError> {
    if !(p.filter.ema_alpha > 0.0 && p.filter.ema_alpha <= 1.0) {
        return Err(BuildError::InvalidConfig("ema_alpha must be in (0, 1]"));
    }
    if p.acquisition.activation_detections == 0 {
        return Err(BuildError::InvalidConfig(
            "activation_detections must be >= 1",
        ));
    }
    if p.acquisition.activation_window_ms == 0 || p.acquisition.lost_timeout_ms == 0 {
        return Err(BuildError::InvalidConfig(
            "acquisition windows must be >= 1 ms",
        ));
    }
    if !(p.tracking.pan_deg_per_pixel > 0.0) || !(p.tracking.tilt_deg_per_pixel > 0.0) {
        return Err(BuildError::InvalidConfig(
            "degrees-per-pixel gains must be > 0",
        ));
    }
    if p.tracking.dead_zone_px < 0.0 {
        return Err(BuildError::InvalidConfig("dead_zone_px must be >= 0"));
    }
    if p.frame.width == 0 || p.frame.height == 0 {
        return Err(BuildError::InvalidConfig("frame dimensions must be > 0"));
    }
    Ok(())
}
