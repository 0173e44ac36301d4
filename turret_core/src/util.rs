use std::time::Duration;

/// Nominal period of a stream running at `hz` frames per second.
///
/// Clamped to at least 1 µs so a misconfigured rate can never produce a
/// zero-length sleep loop.
#[must_use]
pub fn frame_period(hz: u32) -> Duration {
    let micros = 1_000_000_u64 / u64::from(hz.max(1));
    Duration::from_micros(micros.max(1))
}

#[cfg(test)]
mod tests {
    use super::frame_period;
    use std::time::Duration;

    #[test]
    fn common_rates() {
        assert_eq!(frame_period(25), Duration::from_millis(40));
        assert_eq!(frame_period(50), Duration::from_millis(20));
    }

    #[test]
    fn degenerate_rates_stay_positive() {
        assert!(frame_period(0) > Duration::ZERO);
        assert!(frame_period(u32::MAX) > Duration::ZERO);
    }
}
