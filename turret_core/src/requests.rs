//! Deferred actuator requests between the frame path and the control loop.

use std::sync::atomic::{AtomicBool, Ordering};

/// Recording commands set by the frame path and drained elsewhere.
///
/// Requests are idempotent flags, not counted events: asking twice before a
/// poll is the same as asking once, and a start and a stop raised between
/// polls are both seen on the next drain.
#[derive(Debug, Default)]
pub struct RecorderRequests {
    start: AtomicBool,
    stop: AtomicBool,
}

impl RecorderRequests {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn request_start(&self) {
        self.start.store(true, Ordering::Release);
    }

    pub fn request_stop(&self) {
        self.stop.store(true, Ordering::Release);
    }

    /// Take-and-clear the start flag. The flag is cleared before the caller
    /// acts on it, so a request raised while acting lands in the next poll.
    pub fn take_start(&self) -> bool {
        self.start.swap(false, Ordering::AcqRel)
    }

    /// Take-and-clear the stop flag.
    pub fn take_stop(&self) -> bool {
        self.stop.swap(false, Ordering::AcqRel)
    }

    /// Peek without clearing, for status reporting.
    #[must_use]
    pub fn pending(&self) -> (bool, bool) {
        (
            self.start.load(Ordering::Acquire),
            self.stop.load(Ordering::Acquire),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::RecorderRequests;

    #[test]
    fn take_clears_the_flag() {
        let r = RecorderRequests::new();
        r.request_start();
        assert!(r.take_start());
        assert!(!r.take_start());
    }

    #[test]
    fn repeated_requests_coalesce() {
        let r = RecorderRequests::new();
        r.request_stop();
        r.request_stop();
        assert!(r.take_stop());
        assert!(!r.take_stop());
    }

    #[test]
    fn start_and_stop_are_independent() {
        let r = RecorderRequests::new();
        r.request_start();
        r.request_stop();
        assert_eq!(r.pending(), (true, true));
        assert!(r.take_start());
        assert!(r.take_stop());
        assert_eq!(r.pending(), (false, false));
    }
}
