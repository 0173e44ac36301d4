//! No-op collaborators for wiring the pipeline without hardware.

use std::time::Duration;

use turret_traits::{Detection, DetectionSource, Recorder, Relay, ServoBank};

/// Accepts every pulse write and discards it.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopServoBank;

impl ServoBank for NoopServoBank {
    fn set_pulse(
        &mut self,
        _channel: u8,
        _pulse: u16,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        Ok(())
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NoopRelay;

impl Relay for NoopRelay {
    fn set_active(&mut self, _on: bool) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        Ok(())
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NoopRecorder;

impl Recorder for NoopRecorder {
    fn start(&mut self) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        Ok(())
    }

    fn stop(&mut self) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        Ok(())
    }

    fn restart_pipeline(&mut self) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        Ok(())
    }
}

/// Source that never produces a frame; every pull waits out the timeout
/// and reports it, like a camera with nothing attached.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopSource;

impl DetectionSource for NoopSource {
    fn next_frame(
        &mut self,
        timeout: Duration,
    ) -> Result<Vec<Detection>, Box<dyn std::error::Error + Send + Sync>> {
        std::thread::sleep(timeout);
        Err("no detection source attached (timeout)".into())
    }
}
