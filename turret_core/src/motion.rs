//! Clamped, interpolated servo motion with a single-slot move task.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use turret_config::PulseMap;
use turret_traits::ServoBank;
use turret_traits::clock::Clock;

use crate::error::{TurretError, map_hw_error_dyn};

#[derive(Debug, Clone, Copy)]
pub struct MotionCfg {
    pub home_pan_deg: f32,
    pub home_tilt_deg: f32,
    /// Interpolation steps per move, at least 1.
    pub move_steps: u32,
    pub step_delay: Duration,
    /// Poses are clamped to ±this on every axis.
    pub angle_range_deg: f32,
}

impl Default for MotionCfg {
    fn default() -> Self {
        Self {
            home_pan_deg: 0.0,
            home_tilt_deg: 0.0,
            move_steps: 15,
            step_delay: Duration::from_millis(20),
            angle_range_deg: 90.0,
        }
    }
}

/// Which physical PWM channel each logical axis drives.
///
/// The reference rig is cross-wired: the plug labeled "pan" on the hat sits
/// on the tilt servo and vice versa, so the logical pan angle is written to
/// `tilt_channel`.
#[derive(Debug, Clone, Copy)]
pub struct ChannelWiring {
    pub pan_channel: u8,
    pub tilt_channel: u8,
}

impl Default for ChannelWiring {
    fn default() -> Self {
        Self {
            pan_channel: 0,
            tilt_channel: 1,
        }
    }
}

struct Pose<B> {
    servos: B,
    pan_deg: f32,
    tilt_deg: f32,
}

/// Drives both servos through interpolated moves.
///
/// Shared by reference: blocking entry points lock the pose, and the
/// non-blocking `request_*` entry points run the same blocking move on a
/// detached thread guarded by a busy flag, so at most one move is in
/// flight and later requests are dropped rather than queued.
pub struct MotionController<B: ServoBank> {
    pose: Mutex<Pose<B>>,
    busy: AtomicBool,
    cfg: MotionCfg,
    home: Mutex<(f32, f32)>,
    pulses: PulseMap,
    wiring: ChannelWiring,
    clock: Arc<dyn Clock + Send + Sync>,
}

impl<B: ServoBank> MotionController<B> {
    pub fn new(
        servos: B,
        cfg: MotionCfg,
        pulses: PulseMap,
        wiring: ChannelWiring,
        clock: Arc<dyn Clock + Send + Sync>,
    ) -> Self {
        Self {
            pose: Mutex::new(Pose {
                servos,
                pan_deg: cfg.home_pan_deg,
                tilt_deg: cfg.home_tilt_deg,
            }),
            busy: AtomicBool::new(false),
            home: Mutex::new((cfg.home_pan_deg, cfg.home_tilt_deg)),
            cfg,
            pulses,
            wiring,
            clock,
        }
    }

    /// Move both axes to the given absolute pose, blocking until done.
    ///
    /// Targets outside ±angle_range are clamped, the path is split into
    /// `move_steps` evenly spaced waypoints with `step_delay` between
    /// them, and the stored pose is committed only after the final step.
    pub fn move_to(&self, pan_target_deg: f32, tilt_target_deg: f32) -> Result<(), TurretError> {
        self.move_to_with(
            pan_target_deg,
            tilt_target_deg,
            self.cfg.move_steps,
            self.cfg.step_delay,
        )
    }

    /// `move_to` with an explicit interpolation shape.
    pub fn move_to_with(
        &self,
        pan_target_deg: f32,
        tilt_target_deg: f32,
        steps: u32,
        step_delay: Duration,
    ) -> Result<(), TurretError> {
        let range = self.cfg.angle_range_deg;
        let pan_target = pan_target_deg.clamp(-range, range);
        let tilt_target = tilt_target_deg.clamp(-range, range);

        let mut pose = self
            .pose
            .lock()
            .map_err(|_| TurretError::State("motion pose lock poisoned".into()))?;

        let steps = steps.max(1);
        let (start_pan, start_tilt) = (pose.pan_deg, pose.tilt_deg);
        let (pan_span, tilt_span) = (pan_target - start_pan, tilt_target - start_tilt);

        for i in 1..=steps {
            let frac = i as f32 / steps as f32;
            // Each intermediate waypoint is clamped too, so a pose that
            // drifted out of range can never command an out-of-range pulse.
            let pan = (start_pan + pan_span * frac).clamp(-range, range);
            let tilt = (start_tilt + tilt_span * frac).clamp(-range, range);
            self.write_pose(&mut pose.servos, pan, tilt)?;
            if i < steps {
                self.clock.sleep(step_delay);
            }
        }

        pose.pan_deg = pan_target;
        pose.tilt_deg = tilt_target;
        tracing::debug!(pan = pan_target, tilt = tilt_target, "move complete");
        Ok(())
    }

    /// Blocking move to the home pose.
    pub fn move_home(&self) -> Result<(), TurretError> {
        let (pan, tilt) = self.home_pose();
        self.move_to(pan, tilt)
    }

    /// Redefine home as the current pose.
    pub fn set_home_to_current(&self) -> Result<(), TurretError> {
        let (pan, tilt) = self.current_angles();
        let mut home = self
            .home
            .lock()
            .map_err(|_| TurretError::State("home lock poisoned".into()))?;
        *home = (pan, tilt);
        tracing::info!(pan, tilt, "home pose updated");
        Ok(())
    }

    #[must_use]
    pub fn home_pose(&self) -> (f32, f32) {
        match self.home.lock() {
            Ok(h) => *h,
            Err(poisoned) => *poisoned.into_inner(),
        }
    }

    /// Last committed pose. Mid-move this is still the move's start pose.
    #[must_use]
    pub fn current_angles(&self) -> (f32, f32) {
        match self.pose.lock() {
            Ok(p) => (p.pan_deg, p.tilt_deg),
            Err(poisoned) => {
                let p = poisoned.into_inner();
                (p.pan_deg, p.tilt_deg)
            }
        }
    }

    #[must_use]
    pub fn is_moving(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }

    fn write_pose(&self, servos: &mut B, pan_deg: f32, tilt_deg: f32) -> Result<(), TurretError> {
        let pan_pulse = self.pulses.pulse_for_angle(pan_deg);
        let tilt_pulse = self.pulses.pulse_for_angle(tilt_deg);
        // Cross-wiring: logical pan goes out on the tilt-labeled channel.
        servos
            .set_pulse(self.wiring.tilt_channel, pan_pulse)
            .map_err(|e| map_hw_error_dyn(e.as_ref()))?;
        servos
            .set_pulse(self.wiring.pan_channel, tilt_pulse)
            .map_err(|e| map_hw_error_dyn(e.as_ref()))?;
        Ok(())
    }
}

impl<B: ServoBank + Send + 'static> MotionController<B> {
    /// Start a move on the worker slot. Returns false (and does nothing)
    /// if a previous requested move is still running.
    pub fn request_move(self: &Arc<Self>, pan_target_deg: f32, tilt_target_deg: f32) -> bool {
        self.spawn_move(move |ctl| ctl.move_to(pan_target_deg, tilt_target_deg))
    }

    /// Like `request_move`, toward the home pose.
    pub fn request_home(self: &Arc<Self>) -> bool {
        self.spawn_move(MotionController::move_home)
    }

    fn spawn_move<F>(self: &Arc<Self>, go: F) -> bool
    where
        F: FnOnce(&MotionController<B>) -> Result<(), TurretError> + Send + 'static,
    {
        if self
            .busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            tracing::debug!("move request dropped: previous move still in flight");
            return false;
        }
        let ctl = Arc::clone(self);
        std::thread::spawn(move || {
            if let Err(e) = go(&ctl) {
                tracing::warn!(error = %e, "requested move failed");
            }
            ctl.busy.store(false, Ordering::Release);
        });
        true
    }
}
