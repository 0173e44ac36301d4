#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]
#![allow(
    clippy::module_name_repetitions,
    clippy::missing_errors_doc,
    clippy::cast_precision_loss
)]
//! Control core for a pan/tilt camera turret.
//!
//! The per-frame path runs filter → acquisition state machine → mapper →
//! motion; actuator side effects ride on state-machine edges and are
//! drained by a separate control loop. Hardware enters only through the
//! `turret_traits` seams, so the whole core runs against simulated
//! collaborators.

pub mod acquire;
pub mod conversions;
pub mod drain;
pub mod error;
pub mod feed;
pub mod filter;
pub mod mapper;
pub mod mocks;
pub mod motion;
pub mod pipeline;
pub mod requests;
pub mod util;

pub use acquire::{AcquisitionCfg, TargetTracker, Transition};
pub use drain::ActuatorDrain;
pub use error::{BuildError, TurretError};
pub use feed::FrameFeed;
pub use filter::{FilterCfg, SmoothedTrack, TrackFilter};
pub use mapper::{AngleDelta, TrackingCfg, angle_offsets};
pub use motion::{ChannelWiring, MotionCfg, MotionController};
pub use pipeline::{
    FrameOutcome, FramePipeline, OperatingMode, PipelineParams, PipelineStatus,
};
pub use requests::RecorderRequests;
