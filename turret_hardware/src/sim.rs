//! Simulated collaborators. Same trait surface and the same validation as
//! the real drivers, no bus underneath.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use turret_traits::{BoundingBox, Detection, DetectionSource, Recorder, Relay, ServoBank};

use crate::error::HwError;

/// 16-channel servo bank that journals the last pulse per channel.
#[derive(Debug, Clone, Default)]
pub struct SimulatedServoBank {
    pulses: Arc<Mutex<[Option<u16>; 16]>>,
}

impl SimulatedServoBank {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Last pulse written to `channel`, if any.
    #[must_use]
    pub fn last_pulse(&self, channel: u8) -> Option<u16> {
        self.pulses
            .lock()
            .ok()
            .and_then(|p| p.get(usize::from(channel)).copied().flatten())
    }
}

impl ServoBank for SimulatedServoBank {
    fn set_pulse(
        &mut self,
        channel: u8,
        pulse: u16,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        if channel >= 16 {
            return Err(HwError::BadChannel(channel).into());
        }
        if pulse > 4095 {
            return Err(HwError::BadPulse(pulse).into());
        }
        let mut pulses = self.pulses.lock().map_err(|_| "pulse journal poisoned")?;
        pulses[usize::from(channel)] = Some(pulse);
        tracing::debug!(channel, pulse, "servo pulse (simulated)");
        Ok(())
    }
}

/// Relay that tracks its state and skips redundant writes, like the GPIO
/// driver does.
#[derive(Debug, Clone, Default)]
pub struct SimulatedRelay {
    active: Arc<Mutex<bool>>,
}

impl SimulatedRelay {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn is_active(&self) -> bool {
        self.active.lock().map(|a| *a).unwrap_or(false)
    }
}

impl Relay for SimulatedRelay {
    fn set_active(&mut self, on: bool) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let mut active = self.active.lock().map_err(|_| "relay state poisoned")?;
        if *active == on {
            return Ok(());
        }
        *active = on;
        tracing::info!(on, "relay switched (simulated)");
        Ok(())
    }
}

/// Recorder that journals its state and counts pipeline restarts.
#[derive(Debug, Clone, Default)]
pub struct SimulatedRecorder {
    state: Arc<Mutex<RecorderState>>,
}

#[derive(Debug, Default)]
struct RecorderState {
    recording: bool,
    restarts: u32,
}

impl SimulatedRecorder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn is_recording(&self) -> bool {
        self.state.lock().map(|s| s.recording).unwrap_or(false)
    }

    #[must_use]
    pub fn restarts(&self) -> u32 {
        self.state.lock().map(|s| s.restarts).unwrap_or(0)
    }
}

impl Recorder for SimulatedRecorder {
    fn start(&mut self) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let mut state = self.state.lock().map_err(|_| "recorder state poisoned")?;
        if state.recording {
            tracing::debug!("start ignored, already recording (simulated)");
            return Ok(());
        }
        state.recording = true;
        tracing::info!("recording started (simulated)");
        Ok(())
    }

    fn stop(&mut self) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let mut state = self.state.lock().map_err(|_| "recorder state poisoned")?;
        state.recording = false;
        tracing::info!("recording stopped (simulated)");
        Ok(())
    }

    fn restart_pipeline(&mut self) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let mut state = self.state.lock().map_err(|_| "recorder state poisoned")?;
        state.restarts += 1;
        tracing::info!(restarts = state.restarts, "capture pipeline restarted (simulated)");
        Ok(())
    }
}

/// Detection source that plays a repeating visible/absent cycle with the
/// target drifting across the frame, paced at a fixed frame period.
#[derive(Debug)]
pub struct SimulatedCamera {
    frame_width: u32,
    frame_height: u32,
    frame_period: Duration,
    visible_frames: u32,
    absent_frames: u32,
    frame_index: u32,
}

impl SimulatedCamera {
    #[must_use]
    pub fn new(
        frame_width: u32,
        frame_height: u32,
        frame_period: Duration,
        visible_frames: u32,
        absent_frames: u32,
    ) -> Self {
        Self {
            frame_width,
            frame_height,
            frame_period,
            visible_frames: visible_frames.max(1),
            absent_frames,
            frame_index: 0,
        }
    }
}

impl DetectionSource for SimulatedCamera {
    fn next_frame(
        &mut self,
        timeout: Duration,
    ) -> Result<Vec<Detection>, Box<dyn std::error::Error + Send + Sync>> {
        std::thread::sleep(self.frame_period.min(timeout));

        let cycle = self.visible_frames + self.absent_frames;
        let phase = self.frame_index % cycle.max(1);
        self.frame_index = self.frame_index.wrapping_add(1);

        if phase >= self.visible_frames {
            return Ok(Vec::new());
        }

        // Target drifts left to right across the visible burst
        let t = f64::from(phase) / f64::from(self.visible_frames);
        let w = f64::from(self.frame_width);
        let h = f64::from(self.frame_height);
        let cx = w * (0.2 + 0.6 * t);
        let cy = h * 0.5;
        let size = (w * 0.08) as f32;

        Ok(vec![Detection {
            category: 0,
            confidence: 0.75 + 0.2 * (t as f32),
            bbox: BoundingBox::new(cx as f32 - size / 2.0, cy as f32 - size / 2.0, size, size),
        }])
    }
}
