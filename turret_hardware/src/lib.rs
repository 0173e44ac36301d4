//! Hardware backends for the turret: simulated implementations that run
//! anywhere, and real Raspberry Pi drivers behind the `hardware` feature.

pub mod error;
#[cfg(feature = "hardware")]
pub mod pca9685;
#[cfg(feature = "hardware")]
pub mod relay;
#[cfg(all(feature = "rt", target_os = "linux"))]
pub mod rt;
pub mod sim;

pub use sim::{SimulatedCamera, SimulatedRecorder, SimulatedRelay, SimulatedServoBank};
