//! Runs a [`PoseIngestionShim`] on its own thread, feeding it tracker events
//! one at a time in the order they were sent. This is the delivery contract
//! tracking providers give their callbacks: serial, never overlapping.

use crate::fusion_engine::FusionEngine;
use crate::shim::PoseIngestionShim;
use crate::tracker_message_decoder::TrackerEvent;
use log::{debug, info};
use std::sync::mpsc::{Receiver, Sender};
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// Spawns the session thread. It runs until every sender for `input` has
/// been dropped, then hands the shim back through the join handle.
pub fn run_session<E>(
    mut shim: PoseIngestionShim<E>,
    input: Receiver<TrackerEvent>,
) -> JoinHandle<PoseIngestionShim<E>>
where
    E: FusionEngine + Send + 'static,
{
    thread::spawn(move || {
        while let Ok(event) = input.recv() {
            match event {
                TrackerEvent::State(state) => {
                    debug!("tracker state {}", state);
                    shim.on_tracking_state_changed(state.into());
                }
                TrackerEvent::Frame(frame) => shim.on_frame(&frame),
            }
        }

        let stats = shim.stats();
        info!(
            "session : terminated after {} frames, {} poses forwarded, {} gated.",
            stats.frames, stats.poses_forwarded, stats.frames_gated
        );
        shim
    })
}

/// Spaces frames out the way the tracker originally delivered them, going by
/// their timestamps. A `speed` of 2 plays a recording back twice as fast.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FramePacer {
    speed: f64,
    last_timestamp: Option<f64>,
}

impl FramePacer {
    /// Instantiates a new [`FramePacer`]. `speed` must be positive and finite.
    pub fn new(speed: f64) -> Self {
        Self {
            speed,
            last_timestamp: None,
        }
    }

    /// How long to wait before delivering `event`. State changes go out
    /// straight away, as do frames whose timestamp goes backwards.
    pub fn delay_before(&mut self, event: &TrackerEvent) -> Duration {
        let TrackerEvent::Frame(frame) = event else {
            return Duration::ZERO;
        };
        let gap = self
            .last_timestamp
            .map_or(0.0, |last| (frame.timestamp - last) / self.speed);
        self.last_timestamp = Some(frame.timestamp);

        Duration::try_from_secs_f64(gap).unwrap_or(Duration::ZERO)
    }
}

/// Sends `events` to a session, sleeping between frames as `pacer` says.
/// Returns how many were delivered before the session hung up.
pub fn feed(
    output: &Sender<TrackerEvent>,
    events: impl IntoIterator<Item = TrackerEvent>,
    mut pacer: FramePacer,
) -> usize {
    let mut delivered = 0;
    for event in events {
        let delay = pacer.delay_before(&event);
        if !delay.is_zero() {
            spin_sleep::sleep(delay);
        }
        if output.send(event).is_err() {
            debug!("session : hung up after {} events", delivered);
            break;
        }
        delivered += 1;
    }
    delivered
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::observer::LocationFanout;
    use crate::pose::FrameUpdate;
    use crate::shim::tests::RecordingEngine;
    use crate::shim::ShimStats;
    use crate::tracking_state::{CameraTrackingState, EngineTrackingState, LimitedReason, TrackingQuality};
    use nalgebra::Vector3;
    use crate::config::BeaconSite;
    use crate::dummy_engine::{DummyEngine, EngineSettings};
    use crate::location::PoseTransform;
    use crate::observer::tests::RecordingObserver;
    use std::sync::mpsc::channel;
    use std::sync::{Arc, Mutex};
    use std::time::Instant;

    fn frame(x: f64) -> TrackerEvent {
        TrackerEvent::Frame(FrameUpdate::from_position_yaw(Vector3::new(x, 0.0, 0.0), 0.0, x))
    }

    #[test]
    fn events_are_delivered_in_order() {
        let engine = Arc::new(Mutex::new(RecordingEngine::default()));
        let shim = PoseIngestionShim::new(Some(engine.clone()), LocationFanout::new());
        let (tx, rx) = channel();

        let handle = run_session(shim, rx);
        tx.send(frame(0.0)).unwrap();
        tx.send(TrackerEvent::State(CameraTrackingState::Normal)).unwrap();
        tx.send(frame(1.0)).unwrap();
        tx.send(frame(2.0)).unwrap();
        tx.send(TrackerEvent::State(CameraTrackingState::Limited(
            LimitedReason::InsufficientFeatures,
        )))
        .unwrap();
        tx.send(frame(3.0)).unwrap();
        drop(tx);

        let shim = handle.join().unwrap();
        assert_eq!(
            shim.stats(),
            ShimStats {
                frames: 4,
                poses_forwarded: 2,
                frames_gated: 2,
            }
        );
        assert_eq!(shim.tracking_quality(), TrackingQuality::InsufficientFeatures);

        let engine = engine.lock().unwrap();
        let xs: Vec<f64> = engine.poses.iter().map(|p| p.x).collect();
        assert_eq!(xs, vec![1.0, 2.0]);
        assert_eq!(
            engine.states,
            vec![
                EngineTrackingState::NotAvailable,
                EngineTrackingState::Normal,
                EngineTrackingState::Normal,
                EngineTrackingState::InsufficientFeatures,
            ]
        );
    }

    #[test]
    fn pacer_follows_timestamps_and_speed() {
        let mut pacer = FramePacer::new(2.0);

        assert_eq!(pacer.delay_before(&frame(1.0)), Duration::ZERO);
        assert_eq!(pacer.delay_before(&frame(1.5)), Duration::from_millis(250));
        assert_eq!(
            pacer.delay_before(&TrackerEvent::State(CameraTrackingState::Normal)),
            Duration::ZERO
        );
        assert_eq!(pacer.delay_before(&frame(2.5)), Duration::from_millis(500));
        assert_eq!(pacer.delay_before(&frame(2.0)), Duration::ZERO);
    }

    #[test]
    fn feed_stops_when_session_hangs_up() {
        let (tx, rx) = channel();
        drop(rx);
        let events = vec![frame(0.0), frame(0.0)];
        assert_eq!(feed(&tx, events, FramePacer::new(1.0)), 0);
    }

    #[test]
    fn paced_replay_keeps_the_engine_reporting() {
        let observers = LocationFanout::new();
        let recorder = RecordingObserver::default();
        observers.subscribe(Box::new(recorder.clone()));

        let settings = EngineSettings {
            solve_in_3d: true,
            interval: Duration::from_millis(50),
            pose_transform: PoseTransform::default(),
            vio_noise: 0.0,
            ultrasound_noise: 0.0,
            beacons: vec![BeaconSite {
                ble_mac: "CCF9578E0D89".to_owned(),
                slot: 1,
                position: (0.0, 0.0, 0.0),
            }],
        };
        let mut shim: PoseIngestionShim<DummyEngine> = PoseIngestionShim::new(None, observers);
        let engine = Arc::new(Mutex::new(DummyEngine::new(settings, shim.location_sink())));
        shim.attach_engine(engine.clone());
        engine.lock().unwrap().start_updating_location();

        // Half a second of tracking at 20 frames per second.
        let mut events = vec![TrackerEvent::State(CameraTrackingState::Normal)];
        events.extend((0..10).map(|i| {
            let t = f64::from(i) * 0.05;
            TrackerEvent::Frame(FrameUpdate::from_position_yaw(Vector3::new(t, 0.0, 0.0), 0.0, t))
        }));

        let (tx, rx) = channel();
        let session = run_session(shim, rx);
        let started = Instant::now();
        assert_eq!(feed(&tx, events, FramePacer::new(1.0)), 11);
        drop(tx);
        let shim = session.join().unwrap();
        let elapsed = started.elapsed();

        let mut engine = engine.lock().unwrap();
        engine.stop_updating_location();
        engine.shutdown();

        assert_eq!(shim.stats().poses_forwarded, 10);
        assert!(elapsed >= Duration::from_millis(400));
        assert!(recorder.seen.lock().unwrap().len() >= 3);
    }
}
