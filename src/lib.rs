//! VioBridge connects a camera-tracking provider (visual-inertial odometry,
//! the kind ARKit produces) to an acoustic indoor-positioning engine. The
//! provider calls in once per camera frame and whenever its tracking quality
//! changes; the bridge passes poses through to the engine only while tracking
//! is normal, and otherwise just tells the engine how tracking is doing so it
//! can fall back to ultrasound alone. Location estimates flow back out to
//! observers: the log, a UDP stream, or anything else that implements
//! [`observer::LocationObserver`].
//!
//! The acoustic engine itself isn't here. [`dummy_engine`] and
//! [`dummy_tracker`] stand in for the real collaborators so the whole
//! pipeline can be run and tested end to end.

#![warn(missing_docs)]
pub mod args;
pub mod config;
pub mod dummy_engine;
pub mod dummy_tracker;
pub mod fusion_engine;
pub mod location;
pub mod observer;
pub mod pose;
pub mod session;
pub mod shim;
pub mod tracker_message_decoder;
pub mod tracking_state;
pub mod udp_streamer;

pub use fusion_engine::FusionEngine;
pub use location::{Location3D, LocationEstimate, PoseTransform, RangeDataPoint};
pub use observer::{LocationFanout, LocationObserver, LogObserver};
pub use pose::{FrameUpdate, MatrixLayout, PoseSample};
pub use shim::PoseIngestionShim;
pub use tracking_state::{CameraTrackingState, EngineTrackingState, LimitedReason, TrackingQuality};
