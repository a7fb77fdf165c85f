use crate::pose::PoseSample;
use crate::tracking_state::EngineTrackingState;

/// `FusionEngine`
///
/// Whatever owns the acoustic/visual fusion. The bridge pushes poses and
/// tracking state into it and never waits for an answer; results come back
/// asynchronously through a [`LocationObserver`](crate::observer::LocationObserver).
pub trait FusionEngine {
    /// Hands the engine a visual-inertial pose to fuse. Only called while
    /// tracking is normal.
    fn on_pose_sample(&mut self, sample: PoseSample);

    /// Tells the engine how far it can trust visual tracking right now.
    fn on_tracking_state_changed(&mut self, state: EngineTrackingState);

    /// The most recent state the engine was given.
    fn tracking_state(&self) -> EngineTrackingState;

    /// Begin delivering location updates.
    fn start_updating_location(&mut self) {}

    /// Pause location updates, for instance when the app is backgrounded.
    fn stop_updating_location(&mut self) {}

    /// Resume after [`FusionEngine::stop_updating_location`].
    fn resume_updating_location(&mut self) {}
}
