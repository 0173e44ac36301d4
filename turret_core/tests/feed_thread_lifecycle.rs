use std::collections::VecDeque;
use std::time::Duration;

use turret_core::feed::FrameFeed;
use turret_traits::clock::MonotonicClock;
use turret_traits::{BoundingBox, Detection, DetectionSource};

/// Source that plays back a fixed script of batches, then goes silent.
struct ScriptedSource {
    batches: VecDeque<Vec<Detection>>,
}

impl ScriptedSource {
    fn new(n: u32) -> Self {
        let batches = (0..n)
            .map(|i| {
                vec![Detection {
                    category: i,
                    confidence: 0.5,
                    bbox: BoundingBox::new(0.0, 0.0, 10.0, 10.0),
                }]
            })
            .collect();
        Self { batches }
    }
}

impl DetectionSource for ScriptedSource {
    fn next_frame(
        &mut self,
        timeout: Duration,
    ) -> Result<Vec<Detection>, Box<dyn std::error::Error + Send + Sync>> {
        match self.batches.pop_front() {
            Some(batch) => Ok(batch),
            None => {
                std::thread::sleep(timeout);
                Err("capture timeout".into())
            }
        }
    }
}

#[test]
fn slow_consumer_sees_only_the_freshest_batch() {
    let feed = FrameFeed::spawn(
        ScriptedSource::new(10),
        Duration::from_millis(20),
        MonotonicClock::new(),
    );

    // Let the producer burn through the whole script
    std::thread::sleep(Duration::from_millis(100));

    let batch = feed.latest().expect("a batch must be pending");
    assert_eq!(batch[0].category, 9, "older batches were replaced");
    assert!(feed.latest().is_none(), "slot drained");
}

#[test]
fn recv_timeout_returns_batches_in_order_for_a_fast_consumer() {
    let feed = FrameFeed::spawn(
        ScriptedSource::new(1),
        Duration::from_millis(20),
        MonotonicClock::new(),
    );

    let batch = feed
        .recv_timeout(Duration::from_millis(500))
        .expect("first batch");
    assert_eq!(batch[0].category, 0);
    assert!(feed.recv_timeout(Duration::from_millis(50)).is_none());
}

#[test]
fn stall_age_grows_while_the_source_is_silent() {
    let clock = MonotonicClock::new();
    let feed = FrameFeed::spawn(ScriptedSource::new(1), Duration::from_millis(10), clock);

    // Consume the only frame, then let the source sit in timeouts
    let _ = feed.recv_timeout(Duration::from_millis(500));
    std::thread::sleep(Duration::from_millis(120));

    use turret_traits::clock::Clock;
    let now_ms = clock.ms_since(feed.epoch());
    assert!(
        feed.stalled_for(now_ms) >= 50,
        "stall age should reflect the silent period"
    );
}

#[test]
fn drop_joins_the_feed_thread() {
    let feed = FrameFeed::spawn(
        ScriptedSource::new(0),
        Duration::from_millis(10),
        MonotonicClock::new(),
    );
    let started = std::time::Instant::now();
    drop(feed);
    assert!(started.elapsed() < Duration::from_secs(1));
}
