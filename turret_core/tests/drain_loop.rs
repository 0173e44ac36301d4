use std::sync::{Arc, Mutex};
use std::time::Duration;

use turret_core::drain::ActuatorDrain;
use turret_core::requests::RecorderRequests;
use turret_traits::Recorder;
use turret_traits::clock::MonotonicClock;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Event {
    Start,
    Stop,
    Restart,
}

/// Recorder double that journals calls; `fail_stop` makes stop() error.
#[derive(Clone, Default)]
struct JournalingRecorder {
    events: Arc<Mutex<Vec<Event>>>,
    fail_stop: bool,
}

impl JournalingRecorder {
    fn events(&self) -> Vec<Event> {
        self.events.lock().map(|e| e.clone()).unwrap_or_default()
    }

    fn record(&self, ev: Event) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        self.events.lock().map_err(|_| "lock poisoned")?.push(ev);
        Ok(())
    }
}

impl Recorder for JournalingRecorder {
    fn start(&mut self) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        self.record(Event::Start)
    }

    fn stop(&mut self) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        if self.fail_stop {
            return Err("recorder refused to stop".into());
        }
        self.record(Event::Stop)
    }

    fn restart_pipeline(&mut self) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        self.record(Event::Restart)
    }
}

fn wait_for<F: Fn() -> bool>(cond: F) {
    for _ in 0..400 {
        if cond() {
            return;
        }
        std::thread::sleep(Duration::from_millis(5));
    }
    panic!("condition never became true");
}

#[test]
fn start_request_is_drained_once() {
    let rec = JournalingRecorder::default();
    let requests = Arc::new(RecorderRequests::new());
    let _drain = ActuatorDrain::spawn(
        rec.clone(),
        Arc::clone(&requests),
        Duration::from_millis(5),
        MonotonicClock::new(),
    );

    requests.request_start();
    wait_for(|| !rec.events().is_empty());
    std::thread::sleep(Duration::from_millis(30));
    assert_eq!(rec.events(), vec![Event::Start], "flag must not re-fire");
}

#[test]
fn stop_is_always_followed_by_a_pipeline_restart() {
    let rec = JournalingRecorder::default();
    let requests = Arc::new(RecorderRequests::new());
    let _drain = ActuatorDrain::spawn(
        rec.clone(),
        Arc::clone(&requests),
        Duration::from_millis(5),
        MonotonicClock::new(),
    );

    requests.request_stop();
    wait_for(|| rec.events().contains(&Event::Restart));
    assert_eq!(rec.events(), vec![Event::Stop, Event::Restart]);
}

#[test]
fn restart_happens_even_when_stop_fails() {
    let rec = JournalingRecorder {
        fail_stop: true,
        ..JournalingRecorder::default()
    };
    let requests = Arc::new(RecorderRequests::new());
    let _drain = ActuatorDrain::spawn(
        rec.clone(),
        Arc::clone(&requests),
        Duration::from_millis(5),
        MonotonicClock::new(),
    );

    requests.request_stop();
    wait_for(|| rec.events().contains(&Event::Restart));
    assert_eq!(rec.events(), vec![Event::Restart]);
}

#[test]
fn start_and_stop_raised_together_apply_start_first() {
    let rec = JournalingRecorder::default();
    let requests = Arc::new(RecorderRequests::new());
    requests.request_start();
    requests.request_stop();

    let _drain = ActuatorDrain::spawn(
        rec.clone(),
        Arc::clone(&requests),
        Duration::from_millis(5),
        MonotonicClock::new(),
    );

    wait_for(|| rec.events().contains(&Event::Restart));
    assert_eq!(rec.events(), vec![Event::Start, Event::Stop, Event::Restart]);
}

#[test]
fn drop_joins_the_thread_promptly() {
    let rec = JournalingRecorder::default();
    let requests = Arc::new(RecorderRequests::new());
    let drain = ActuatorDrain::spawn(
        rec,
        Arc::clone(&requests),
        Duration::from_millis(5),
        MonotonicClock::new(),
    );

    let started = std::time::Instant::now();
    drop(drain);
    assert!(started.elapsed() < Duration::from_secs(1));

    // Requests raised after shutdown are never applied
    requests.request_start();
    std::thread::sleep(Duration::from_millis(30));
    assert!(requests.take_start(), "flag still pending, nothing drained it");
}
