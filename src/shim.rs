//! The [`PoseIngestionShim`] sits between a camera-tracking provider and a
//! [`FusionEngine`]. The provider calls it once per frame and whenever its
//! tracking state changes; the shim decides what the engine gets to see.

use crate::fusion_engine::FusionEngine;
use crate::location::LocationEstimate;
use crate::observer::{LocationFanout, LocationObserver};
use crate::pose::{FrameUpdate, PoseSample};
use crate::tracking_state::{EngineTrackingState, TrackingQuality};
use log::debug;
use nalgebra::Matrix4;
use std::sync::{Arc, Mutex, PoisonError};

/// Counters kept by a [`PoseIngestionShim`] over its lifetime.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ShimStats {
    /// Frame callbacks received
    pub frames: u64,
    /// Poses handed to the engine
    pub poses_forwarded: u64,
    /// Frames where only the tracking state was forwarded
    pub frames_gated: u64,
}

/// Bridges a callback-driven tracking provider to a push-driven
/// [`FusionEngine`], only letting poses through while tracking is normal.
pub struct PoseIngestionShim<E>
where
    E: FusionEngine,
{
    // Shared so the engine can also be driven (started, stopped, shut down)
    // from outside the session that feeds the shim.
    engine: Option<Arc<Mutex<E>>>,
    tracking_quality: TrackingQuality,
    use_vio: bool,
    observers: LocationFanout,
    stats: ShimStats,
}

impl<E> PoseIngestionShim<E>
where
    E: FusionEngine,
{
    /// Instantiates a new `PoseIngestionShim`, optionally attached to an
    /// engine, delivering locations to `observers`.
    pub fn new(engine: Option<Arc<Mutex<E>>>, observers: LocationFanout) -> Self {
        Self {
            engine,
            tracking_quality: TrackingQuality::NotAvailable,
            use_vio: true,
            observers,
            stats: ShimStats::default(),
        }
    }

    /// When `false`, no pose is ever forwarded and the engine is told that
    /// visual tracking is disabled.
    pub fn with_vio(self, use_vio: bool) -> Self {
        Self { use_vio, ..self }
    }

    /// Attaches an engine, replacing any previous one.
    pub fn attach_engine(&mut self, engine: Arc<Mutex<E>>) {
        self.engine = Some(engine);
    }

    /// Detaches and returns the current engine, if any.
    pub fn detach_engine(&mut self) -> Option<Arc<Mutex<E>>> {
        self.engine.take()
    }

    /// The last tracking quality the provider reported.
    pub fn tracking_quality(&self) -> TrackingQuality {
        self.tracking_quality
    }

    /// Counters since this shim was created.
    pub fn stats(&self) -> ShimStats {
        self.stats
    }

    /// Adds a location observer.
    pub fn subscribe(&self, observer: Box<dyn LocationObserver + Send>) {
        self.observers.subscribe(observer);
    }

    /// A handle an engine can deliver locations through.
    pub fn location_sink(&self) -> LocationFanout {
        self.observers.clone()
    }

    /// The provider reports a new tracking state. Only the latest one is kept.
    pub fn on_tracking_state_changed(&mut self, quality: TrackingQuality) {
        debug!("tracking quality {:?} -> {:?}", self.tracking_quality, quality);
        self.tracking_quality = quality;
    }

    /// The provider has a new camera frame. Forwards the pose if tracking is
    /// normal, and the tracking state in every case.
    pub fn on_frame_update(&mut self, transform: &Matrix4<f64>, yaw: f64, timestamp: f64) {
        self.stats.frames += 1;

        let Some(engine) = self.engine.as_ref() else {
            return;
        };
        let mut engine = engine.lock().unwrap_or_else(PoisonError::into_inner);

        if !self.use_vio {
            engine.on_tracking_state_changed(EngineTrackingState::Disabled);
            self.stats.frames_gated += 1;
            return;
        }

        if self.tracking_quality.is_trustworthy() {
            let sample = PoseSample::from_transform(transform, yaw, timestamp);
            engine.on_pose_sample(sample);
            engine.on_tracking_state_changed(EngineTrackingState::Normal);
            self.stats.poses_forwarded += 1;
        } else {
            // Let the engine fall back to ultrasound-only localization.
            engine.on_tracking_state_changed(self.tracking_quality.into());
            self.stats.frames_gated += 1;
        }
    }

    /// [`Self::on_frame_update`] for an assembled [`FrameUpdate`].
    pub fn on_frame(&mut self, frame: &FrameUpdate) {
        self.on_frame_update(&frame.transform, frame.yaw, frame.timestamp);
    }

    /// The engine produced a location. Hands it to every observer.
    ///
    /// This is the entry point for engines that call back into the shim
    /// itself. Engines running on their own thread, like
    /// [`DummyEngine`](crate::dummy_engine::DummyEngine), deliver through
    /// [`Self::location_sink`] instead and reach the same observers.
    pub fn on_location_update(&self, location: &LocationEstimate) {
        self.observers.clone().on_location_update(location);
    }
}
