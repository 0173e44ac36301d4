//! Conversions from the on-disk config schema into core runtime configs.
//!
//! The core never reads TOML; callers load and validate a
//! `turret_config::Config` and convert the slices each component needs.

use std::time::Duration;

use turret_traits::FrameSize;

use crate::acquire::AcquisitionCfg;
use crate::filter::FilterCfg;
use crate::mapper::TrackingCfg;
use crate::motion::{ChannelWiring, MotionCfg};
use crate::pipeline::PipelineParams;

impl From<&turret_config::FilterCfg> for FilterCfg {
    fn from(c: &turret_config::FilterCfg) -> Self {
        Self {
            ema_alpha: c.ema_alpha,
            fade_frames: c.fade_frames,
        }
    }
}

impl From<&turret_config::AcquisitionCfg> for AcquisitionCfg {
    fn from(c: &turret_config::AcquisitionCfg) -> Self {
        Self {
            activation_detections: c.activation_detections,
            activation_window_ms: c.activation_window_ms,
            lost_timeout_ms: c.lost_timeout_ms,
        }
    }
}

impl From<&turret_config::TrackingCfg> for TrackingCfg {
    fn from(c: &turret_config::TrackingCfg) -> Self {
        Self {
            pan_deg_per_pixel: c.pan_deg_per_pixel,
            tilt_deg_per_pixel: c.tilt_deg_per_pixel,
            pan_invert: c.pan_invert,
            tilt_invert: c.tilt_invert,
            dead_zone_px: c.dead_zone_px,
        }
    }
}

// The clamp range lives in the servo section, so motion needs both.
impl From<&turret_config::Config> for MotionCfg {
    fn from(cfg: &turret_config::Config) -> Self {
        Self {
            home_pan_deg: cfg.motion.home_pan_deg,
            home_tilt_deg: cfg.motion.home_tilt_deg,
            move_steps: cfg.motion.move_steps,
            step_delay: Duration::from_millis(cfg.motion.step_delay_ms),
            angle_range_deg: cfg.servo.angle_range_deg,
        }
    }
}

impl From<&turret_config::ServoCfg> for ChannelWiring {
    fn from(s: &turret_config::ServoCfg) -> Self {
        Self {
            pan_channel: s.pan_channel,
            tilt_channel: s.tilt_channel,
        }
    }
}

impl From<&turret_config::Config> for PipelineParams {
    fn from(cfg: &turret_config::Config) -> Self {
        Self {
            filter: (&cfg.filter).into(),
            acquisition: (&cfg.acquisition).into(),
            tracking: (&cfg.tracking).into(),
            frame: FrameSize::new(cfg.capture.frame_width, cfg.capture.frame_height),
            armed: cfg.actuators.armed,
        }
    }
}
