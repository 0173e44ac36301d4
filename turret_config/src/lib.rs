#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
//! Config schema and servo pulse calibration for the tracking turret.
//!
//! - `Config` and sub-structs are deserialized from TOML and validated.
//! - `PulseMap` converts logical angles into PCA9685 pulse ticks using the
//!   per-rig min/center/max pulse calibration.
use serde::Deserialize;

/// Servo and PWM controller settings. Both servos are assumed to be the
/// same type; the pulse bounds correspond to the ±angle_range endpoints.
#[derive(Debug, Deserialize, Clone, Copy)]
#[serde(default)]
pub struct ServoCfg {
    pub pwm_frequency_hz: u32,
    /// Pulse length (ticks) for -angle_range degrees
    pub min_pulse: u16,
    /// Pulse length (ticks) for +angle_range degrees
    pub max_pulse: u16,
    /// Half range of motion in degrees (90 => -90..=+90)
    pub angle_range_deg: f32,
    pub i2c_address: u16,
    pub i2c_bus: u8,
    /// Physical channel wired as "pan" on the controller board.
    pub pan_channel: u8,
    /// Physical channel wired as "tilt" on the controller board.
    pub tilt_channel: u8,
}

impl Default for ServoCfg {
    fn default() -> Self {
        // MG996R-class servo on a PCA9685 at 50 Hz
        Self {
            pwm_frequency_hz: 50,
            min_pulse: 103,
            max_pulse: 512,
            angle_range_deg: 90.0,
            i2c_address: 0x40,
            i2c_bus: 1,
            pan_channel: 0,
            tilt_channel: 1,
        }
    }
}

/// Motion profile: home pose and interpolation shape.
#[derive(Debug, Deserialize, Clone, Copy)]
#[serde(default)]
pub struct MotionCfg {
    pub home_pan_deg: f32,
    pub home_tilt_deg: f32,
    /// Discrete interpolation steps per move
    pub move_steps: u32,
    /// Delay between interpolation steps (ms)
    pub step_delay_ms: u64,
}

impl Default for MotionCfg {
    fn default() -> Self {
        Self {
            home_pan_deg: 0.0,
            home_tilt_deg: 0.0,
            move_steps: 15,
            step_delay_ms: 20,
        }
    }
}

/// Pixel-offset → angle mapping used while pursuing a target.
#[derive(Debug, Deserialize, Clone, Copy)]
#[serde(default)]
pub struct TrackingCfg {
    pub pan_deg_per_pixel: f32,
    pub tilt_deg_per_pixel: f32,
    /// Reverse directions if the rig moves away from the target.
    pub pan_invert: bool,
    pub tilt_invert: bool,
    /// No corrective motion while BOTH axis offsets are within this many
    /// pixels of frame center.
    pub dead_zone_px: f32,
}

impl Default for TrackingCfg {
    fn default() -> Self {
        Self {
            pan_deg_per_pixel: 0.03,
            tilt_deg_per_pixel: 0.03,
            pan_invert: true,
            tilt_invert: true,
            dead_zone_px: 20.0,
        }
    }
}

/// Detection smoothing filter settings.
#[derive(Debug, Deserialize, Clone, Copy)]
#[serde(default)]
pub struct FilterCfg {
    /// EMA blend factor for box coordinates. Range: (0.0, 1.0];
    /// 1.0 disables smoothing (snap to the latest box).
    pub ema_alpha: f32,
    /// Evict a track once it has gone unseen for more than this many
    /// consecutive frames. 0 evicts on the first missed frame.
    pub fade_frames: u32,
}

impl Default for FilterCfg {
    fn default() -> Self {
        Self {
            ema_alpha: 0.4,
            fade_frames: 5,
        }
    }
}

/// Target acquisition hysteresis thresholds.
#[derive(Debug, Deserialize, Clone, Copy)]
#[serde(default)]
pub struct AcquisitionCfg {
    /// Detections within the window required to declare "target acquired"
    pub activation_detections: usize,
    /// Trailing window (ms) for counting detections toward activation
    pub activation_window_ms: u64,
    /// Declare the target lost after this many ms without a detection
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

/// Side-effect actuator arbitration.
#[derive(Debug, Deserialize, Clone, Copy)]
#[serde(default)]
pub struct ActuatorCfg {
    /// When false, acquisition still drives recording and motion but never
    /// fires the relay.
    pub armed: bool,
    /// BCM pin driving the relay module
    pub relay_pin: u8,
    /// Polling interval (ms) of the request-drain control loop
    pub drain_poll_ms: u64,
}

impl Default for ActuatorCfg {
    fn default() -> Self {
        Self {
            armed: false,
            relay_pin: 14,
            drain_poll_ms: 50,
        }
    }
}

/// Capture stream properties the core needs (the stream itself is owned by
/// the capture collaborator).
#[derive(Debug, Deserialize, Clone, Copy)]
#[serde(default)]
pub struct CaptureCfg {
    pub frame_width: u32,
    pub frame_height: u32,
    /// Per-frame wait for the detection source (ms)
    pub frame_timeout_ms: u64,
    /// Nominal capture rate, used to pace simulated sources (Hz)
    pub frame_rate_hz: u32,
}

impl Default for CaptureCfg {
    fn default() -> Self {
        Self {
            frame_width: 640,
            frame_height: 360,
            frame_timeout_ms: 500,
            frame_rate_hz: 25,
        }
    }
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct Logging {
    pub file: Option<String>,  // path to .log (JSON lines)
    pub level: Option<String>, // "info","debug"
    /// Log rotation policy: "never" | "daily" | "hourly" (default: never)
    pub rotation: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub servo: ServoCfg,
    pub motion: MotionCfg,
    pub tracking: TrackingCfg,
    pub filter: FilterCfg,
    pub acquisition: AcquisitionCfg,
    pub actuators: ActuatorCfg,
    pub capture: CaptureCfg,
    pub logging: Logging,
}

pub fn load_toml(s: &str) -> Result<Config, toml::de::Error> {
    toml::from_str::<Config>(s)
}

impl Config {
    pub fn validate(&self) -> eyre::Result<()> {
        // Servo
        if self.servo.pwm_frequency_hz == 0 {
            eyre::bail!("servo.pwm_frequency_hz must be > 0");
        }
        if self.servo.min_pulse >= self.servo.max_pulse {
            eyre::bail!("servo.min_pulse must be < servo.max_pulse");
        }
        // The PCA9685 counter is 12-bit; anything above 4095 would be
        // rejected by the driver on every write.
        if self.servo.max_pulse > 4095 {
            eyre::bail!("servo.max_pulse must be <= 4095 (12-bit counter)");
        }
        if !(self.servo.angle_range_deg > 0.0) {
            eyre::bail!("servo.angle_range_deg must be > 0");
        }
        if self.servo.pan_channel == self.servo.tilt_channel {
            eyre::bail!("servo.pan_channel and servo.tilt_channel must differ");
        }

        // Motion
        if self.motion.move_steps == 0 {
            eyre::bail!("motion.move_steps must be >= 1");
        }
        if self.motion.home_pan_deg.abs() > self.servo.angle_range_deg
            || self.motion.home_tilt_deg.abs() > self.servo.angle_range_deg
        {
            eyre::bail!("motion home angles must lie within ±servo.angle_range_deg");
        }

        // Tracking
        if !(self.tracking.pan_deg_per_pixel > 0.0) || !(self.tracking.tilt_deg_per_pixel > 0.0) {
            eyre::bail!("tracking degrees-per-pixel gains must be > 0");
        }
        if self.tracking.dead_zone_px < 0.0 {
            eyre::bail!("tracking.dead_zone_px must be >= 0");
        }

        // Filter
        if !(self.filter.ema_alpha > 0.0 && self.filter.ema_alpha <= 1.0) {
            eyre::bail!("filter.ema_alpha must be in (0.0, 1.0]");
        }

        // Acquisition
        if self.acquisition.activation_detections == 0 {
            eyre::bail!("acquisition.activation_detections must be >= 1");
        }
        if self.acquisition.activation_window_ms == 0 {
            eyre::bail!("acquisition.activation_window_ms must be >= 1");
        }
        if self.acquisition.lost_timeout_ms == 0 {
            eyre::bail!("acquisition.lost_timeout_ms must be >= 1");
        }

        // Actuators
        if self.actuators.drain_poll_ms == 0 {
            eyre::bail!("actuators.drain_poll_ms must be >= 1");
        }

        // Capture
        if self.capture.frame_width == 0 || self.capture.frame_height == 0 {
            eyre::bail!("capture frame dimensions must be > 0");
        }
        if self.capture.frame_timeout_ms == 0 {
            eyre::bail!("capture.frame_timeout_ms must be >= 1");
        }
        if self.capture.frame_rate_hz == 0 {
            eyre::bail!("capture.frame_rate_hz must be > 0");
        }

        Ok(())
    }
}

/// Linear angle→pulse calibration for one servo type.
///
/// pulse(angle) = center + (angle / angle_range) * (max - center), with
/// center = (min + max) / 2. Angles are clamped to ±angle_range first, so
/// the result always lies within [min, max].
#[derive(Debug, Clone, Copy)]
pub struct PulseMap {
    pub min_pulse: u16,
    pub max_pulse: u16,
    pub center_pulse: u16,
    pub angle_range_deg: f32,
}

impl PulseMap {
    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn pulse_for_angle(&self, angle_deg: f32) -> u16 {
        let a = angle_deg.clamp(-self.angle_range_deg, self.angle_range_deg);
        let half_span = f32::from(self.max_pulse) - f32::from(self.center_pulse);
        let p = f32::from(self.center_pulse) + (a / self.angle_range_deg) * half_span;
        // Clamp defensively against rounding at the endpoints.
        p.round()
            .clamp(f32::from(self.min_pulse), f32::from(self.max_pulse)) as u16
    }
}

impl From<&ServoCfg> for PulseMap {
    fn from(s: &ServoCfg) -> Self {
        PulseMap {
            min_pulse: s.min_pulse,
            max_pulse: s.max_pulse,
            center_pulse: (s.min_pulse + s.max_pulse) / 2,
            angle_range_deg: s.angle_range_deg,
        }
    }
}

#[cfg(test)]
mod pulse_map_tests {
    use super::{PulseMap, ServoCfg};

    fn map() -> PulseMap {
        PulseMap::from(&ServoCfg {
            min_pulse: 150,
            max_pulse: 565,
            ..ServoCfg::default()
        })
    }

    #[test]
    fn endpoints_and_center() {
        let m = map();
        assert_eq!(m.center_pulse, 357);
        assert_eq!(m.pulse_for_angle(0.0), 357);
        assert_eq!(m.pulse_for_angle(90.0), 565);
        // -90° mirrors around the integer center (149) and is then clamped
        // up to min_pulse
        assert_eq!(m.pulse_for_angle(-90.0), 150);
    }

    #[test]
    fn out_of_range_angles_clamp() {
        let m = map();
        assert_eq!(m.pulse_for_angle(180.0), m.pulse_for_angle(90.0));
        assert_eq!(m.pulse_for_angle(-180.0), m.pulse_for_angle(-90.0));
    }
}
