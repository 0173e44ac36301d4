//! Collaborator assembly and the automatic tracking loop.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use eyre::Result;
use turret_config::{Config, PulseMap};
use turret_core::pipeline::{FrameOutcome, FramePipeline, PipelineParams};
use turret_core::util::frame_period;
use turret_core::{ActuatorDrain, FrameFeed, MotionController, RecorderRequests};
use turret_hardware::{SimulatedCamera, SimulatedRecorder};
#[cfg(not(feature = "hardware"))]
use turret_hardware::{SimulatedRelay, SimulatedServoBank};
use turret_traits::clock::MonotonicClock;
use turret_traits::{DetectionSource, Recorder, Relay, ServoBank};

pub type DynServoBank = Box<dyn ServoBank + Send>;
pub type DynRelay = Box<dyn Relay + Send>;
pub type DynRecorder = Box<dyn Recorder + Send>;
pub type DynSource = Box<dyn DetectionSource + Send>;

/// Open the servo bank: PCA9685 when built with `hardware`, otherwise the
/// simulated bank.
pub fn open_servo_bank(cfg: &Config) -> Result<DynServoBank> {
    #[cfg(feature = "hardware")]
    {
        let bank = turret_hardware::pca9685::Pca9685::new(
            cfg.servo.i2c_bus,
            cfg.servo.i2c_address,
            cfg.servo.pwm_frequency_hz,
        )?;
        Ok(Box::new(bank))
    }
    #[cfg(not(feature = "hardware"))]
    {
        let _ = cfg;
        Ok(Box::new(SimulatedServoBank::new()))
    }
}

pub fn open_relay(cfg: &Config) -> Result<DynRelay> {
    #[cfg(feature = "hardware")]
    {
        let relay = turret_hardware::relay::GpioRelay::new(cfg.actuators.relay_pin)?;
        Ok(Box::new(relay))
    }
    #[cfg(not(feature = "hardware"))]
    {
        let _ = cfg;
        Ok(Box::new(SimulatedRelay::new()))
    }
}

// The recorder and the detection source have no on-device drivers here;
// the capture stack lives in a separate process on the real rig.
pub fn open_recorder() -> DynRecorder {
    Box::new(SimulatedRecorder::new())
}

pub fn open_source(cfg: &Config) -> DynSource {
    // Visible bursts long enough to acquire, gaps long enough to lose
    Box::new(SimulatedCamera::new(
        cfg.capture.frame_width,
        cfg.capture.frame_height,
        frame_period(cfg.capture.frame_rate_hz),
        cfg.capture.frame_rate_hz.saturating_mul(4).max(8),
        cfg.capture.frame_rate_hz.saturating_mul(3).max(6),
    ))
}

pub fn build_motion(cfg: &Config, bank: DynServoBank) -> Arc<MotionController<DynServoBank>> {
    Arc::new(MotionController::new(
        bank,
        (&*cfg).into(),
        PulseMap::from(&cfg.servo),
        (&cfg.servo).into(),
        Arc::new(MonotonicClock::new()),
    ))
}

#[derive(Debug, Default)]
pub struct RunSummary {
    pub frames: u64,
    pub feed_timeouts: u64,
    pub acquisitions: u64,
    pub losses: u64,
    pub moves: u64,
    pub final_pan_deg: f32,
    pub final_tilt_deg: f32,
    pub elapsed: Duration,
}

/// Run the automatic loop until shutdown or the deadline.
pub fn run_loop(
    cfg: &Config,
    armed_override: bool,
    duration: Option<Duration>,
    shutdown: &Arc<AtomicBool>,
) -> Result<RunSummary> {
    let motion = build_motion(cfg, open_servo_bank(cfg)?);
    let relay = Arc::new(Mutex::new(open_relay(cfg)?));
    let requests = Arc::new(RecorderRequests::new());

    let mut params = PipelineParams::from(cfg);
    if armed_override {
        params.armed = true;
    }
    let mut pipeline = FramePipeline::new(
        params,
        Arc::clone(&motion),
        Arc::clone(&relay),
        Arc::clone(&requests),
        Arc::new(MonotonicClock::new()),
    )?;

    let frame_timeout = Duration::from_millis(cfg.capture.frame_timeout_ms);
    let feed = FrameFeed::spawn(open_source(cfg), frame_timeout, MonotonicClock::new());
    let _drain = ActuatorDrain::spawn(
        open_recorder(),
        Arc::clone(&requests),
        Duration::from_millis(cfg.actuators.drain_poll_ms),
        MonotonicClock::new(),
    );

    tracing::info!(
        armed = params.armed,
        frame_rate_hz = cfg.capture.frame_rate_hz,
        "tracking loop started"
    );

    let started = Instant::now();
    let mut summary = RunSummary::default();
    let poll = frame_period(cfg.capture.frame_rate_hz);

    while !shutdown.load(Ordering::Relaxed) {
        if let Some(limit) = duration
            && started.elapsed() >= limit
        {
            break;
        }

        let Some(batch) = feed.recv_timeout(poll) else {
            summary.feed_timeouts += 1;
            continue;
        };

        summary.frames += 1;
        match pipeline.process_frame(&batch)? {
            FrameOutcome::JustAcquired { moved } => {
                summary.acquisitions += 1;
                summary.moves += u64::from(moved);
            }
            FrameOutcome::JustLost => summary.losses += 1,
            FrameOutcome::Tracking { moved } => summary.moves += u64::from(moved),
            FrameOutcome::Idle | FrameOutcome::Suspended => {}
        }
    }

    let (pan, tilt) = motion.current_angles();
    summary.final_pan_deg = pan;
    summary.final_tilt_deg = tilt;
    summary.elapsed = started.elapsed();
    tracing::info!(
        frames = summary.frames,
        acquisitions = summary.acquisitions,
        losses = summary.losses,
        "tracking loop stopped"
    );
    Ok(summary)
}
