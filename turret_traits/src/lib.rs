pub mod clock;
pub mod detection;

pub use clock::{Clock, MonotonicClock};
pub use detection::{BoundingBox, Detection, FrameSize};

/// A bank of PWM servo channels (e.g. a PCA9685).
///
/// Channels are addressed by index; `set_pulse` writes one pulse width in
/// controller ticks. Implementations own the underlying bus.
pub trait ServoBank {
    fn set_pulse(
        &mut self,
        channel: u8,
        pulse: u16,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;
}

/// A binary actuator driven through a relay (firing mechanism).
pub trait Relay {
    fn set_active(&mut self, on: bool) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;
}

/// Video recording device. Stopping a recording invalidates the capture
/// pipeline on the real device, hence the explicit restart hook.
pub trait Recorder {
    fn start(&mut self) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;
    fn stop(&mut self) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;
    fn restart_pipeline(&mut self) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;
}

/// Per-frame source of object detections (inference collaborator).
///
/// `next_frame` blocks until the next captured frame has been processed or
/// the timeout expires, and returns the detections found in it (possibly
/// empty).
pub trait DetectionSource {
    fn next_frame(
        &mut self,
        timeout: std::time::Duration,
    ) -> Result<Vec<Detection>, Box<dyn std::error::Error + Send + Sync>>;
}

// Boxed forwarding, so callers can pick a backend at runtime.
impl<T: ServoBank + ?Sized> ServoBank for Box<T> {
    fn set_pulse(
        &mut self,
        channel: u8,
        pulse: u16,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        (**self).set_pulse(channel, pulse)
    }
}

impl<T: Relay + ?Sized> Relay for Box<T> {
    fn set_active(&mut self, on: bool) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        (**self).set_active(on)
    }
}

impl<T: Recorder + ?Sized> Recorder for Box<T> {
    fn start(&mut self) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        (**self).start()
    }

    fn stop(&mut self) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        (**self).stop()
    }

    fn restart_pipeline(&mut self) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        (**self).restart_pipeline()
    }
}

impl<T: DetectionSource + ?Sized> DetectionSource for Box<T> {
    fn next_frame(
        &mut self,
        timeout: std::time::Duration,
    ) -> Result<Vec<Detection>, Box<dyn std::error::Error + Send + Sync>> {
        (**self).next_frame(timeout)
    }
}
