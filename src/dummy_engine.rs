//! A stand-in fusion engine. It doesn't do any acoustic ranging; it carries
//! the latest visual pose into the positioning frame, pretends to range
//! against the configured beacons, and falls back to a noisy "ultrasound only"
//! fix while visual tracking is unavailable.

use crate::config::{BeaconSite, BridgeConfig, ConfigError};
use crate::fusion_engine::FusionEngine;
use crate::location::{Location3D, LocationEstimate, PoseTransform, RangeDataPoint};
use crate::observer::{LocationFanout, LocationObserver};
use crate::pose::PoseSample;
use crate::tracking_state::EngineTrackingState;
use log::debug;
use rand::prelude::*;
use std::sync::mpsc::{self, RecvTimeoutError};
use std::thread;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

// Accuracy reported with visual tracking, and how much worse it gets without.
const VIO_ACCURACY: f64 = 0.05;
const ULTRASOUND_INFLATION: f64 = 5.0;

/// The parts of a [`BridgeConfig`] the engine cares about.
#[derive(Debug, Clone)]
pub struct EngineSettings {
    #[allow(missing_docs)]
    pub solve_in_3d: bool,
    /// Time between estimates
    pub interval: Duration,
    #[allow(missing_docs)]
    pub pose_transform: PoseTransform,
    /// Meters of noise on fixes made with visual tracking
    pub vio_noise: f64,
    /// Meters of noise on fixes made without
    pub ultrasound_noise: f64,
    #[allow(missing_docs)]
    pub beacons: Vec<BeaconSite>,
}

impl TryFrom<&BridgeConfig> for EngineSettings {
    type Error = ConfigError;

    fn try_from(config: &BridgeConfig) -> Result<Self, Self::Error> {
        Ok(Self {
            solve_in_3d: config.solve_in_3d,
            interval: config.location_interval()?,
            pose_transform: config.pose_transform,
            vio_noise: 0.01,
            ultrasound_noise: config.ultrasound_noise,
            beacons: config.beacons.clone(),
        })
    }
}

enum Signal {
    Pose(PoseSample),
    State(EngineTrackingState),
    Start,
    Stop,
    Shutdown,
}

/// A [`FusionEngine`] that runs on its own thread and emits a
/// [`LocationEstimate`] every `interval` while started.
pub struct DummyEngine {
    handle: Option<thread::JoinHandle<()>>,
    tx: mpsc::Sender<Signal>,
    state: EngineTrackingState,
}

impl DummyEngine {
    /// Spawns the engine thread. Estimates go to `sink`; nothing is emitted
    /// until [`FusionEngine::start_updating_location`] is called.
    pub fn new(settings: EngineSettings, sink: LocationFanout) -> Self {
        let (tx, rx) = mpsc::channel::<Signal>();

        let handle = thread::spawn(move || {
            let mut worker = Worker::new(settings, sink);
            // When the next estimate is due. `None` while stopped, or when the
            // interval is too long to ever come around.
            let mut due: Option<Instant> = None;
            while worker.running {
                if let Some(when) = due.filter(|when| Instant::now() >= *when) {
                    if let Some(estimate) = worker.estimate() {
                        worker.sink.on_location_update(&estimate);
                    }
                    due = when.max(Instant::now()).checked_add(worker.settings.interval);
                }

                let received = match due {
                    Some(when) => rx.recv_timeout(when.saturating_duration_since(Instant::now())),
                    None => rx.recv().map_err(RecvTimeoutError::from),
                };
                match received {
                    Ok(signal) => {
                        let was_updating = worker.updating;
                        worker.handle(signal);
                        match (was_updating, worker.updating) {
                            (false, true) => due = Some(Instant::now()),
                            (true, false) => due = None,
                            _ => {}
                        }
                    }
                    Err(RecvTimeoutError::Timeout) => {}
                    Err(RecvTimeoutError::Disconnected) => break,
                }
            }
        });

        DummyEngine {
            handle: Some(handle),
            tx,
            state: EngineTrackingState::default(),
        }
    }

    /// Stops the engine thread and waits for it to finish. Calling this
    /// more than once is harmless.
    pub fn shutdown(&mut self) {
        // The worker only exits on `Shutdown`, so a failed send means it
        // is already gone.
        let _ = self.tx.send(Signal::Shutdown);
        if let Some(thread) = self.handle.take() {
            if thread.join().is_err() {
                log::warn!("engine thread panicked");
            }
        }
    }

    fn send(&self, signal: Signal) {
        if self.tx.send(signal).is_err() {
            debug!("engine thread has shut down, dropping signal");
        }
    }
}

impl FusionEngine for DummyEngine {
    fn on_pose_sample(&mut self, sample: PoseSample) {
        self.send(Signal::Pose(sample));
    }

    fn on_tracking_state_changed(&mut self, state: EngineTrackingState) {
        if state != self.state {
            self.state = state;
            self.send(Signal::State(state));
        }
    }

    fn tracking_state(&self) -> EngineTrackingState {
        self.state
    }

    fn start_updating_location(&mut self) {
        self.send(Signal::Start);
    }

    fn stop_updating_location(&mut self) {
        self.send(Signal::Stop);
    }

    fn resume_updating_location(&mut self) {
        self.send(Signal::Start);
    }
}

impl Drop for DummyEngine {
    fn drop(&mut self) {
        self.shutdown();
    }
}

struct Worker {
    settings: EngineSettings,
    sink: LocationFanout,
    running: bool,
    updating: bool,
    state: EngineTrackingState,
    latest_pose: Option<PoseSample>,
    last_fix: Option<Location3D>,
    rng: ThreadRng,
}

impl Worker {
    fn new(settings: EngineSettings, sink: LocationFanout) -> Self {
        Self {
            settings,
            sink,
            running: true,
            updating: false,
            state: EngineTrackingState::default(),
            latest_pose: None,
            last_fix: None,
            rng: thread_rng(),
        }
    }

    fn handle(&mut self, signal: Signal) {
        match signal {
            Signal::Pose(sample) => self.latest_pose = Some(sample),
            Signal::State(state) => {
                debug!("engine tracking state now {:?}", state);
                self.state = state;
            }
            Signal::Start if !self.updating => {
                self.updating = true;
                self.sink.on_started_updating();
            }
            Signal::Stop if self.updating => {
                self.updating = false;
                self.sink.on_stopped_updating();
            }
            Signal::Start | Signal::Stop => {}
            Signal::Shutdown => self.running = false,
        }
    }

    fn jitter(&mut self, noise: f64) -> f64 {
        if noise > 0.0 {
            self.rng.gen_range(-noise..noise)
        } else {
            0.0
        }
    }

    fn estimate(&mut self) -> Option<LocationEstimate> {
        let visual = self.state == EngineTrackingState::Normal;
        let transform = self.settings.pose_transform;

        let (base, noise, accuracy, reported_transform) = match (visual, self.latest_pose) {
            (true, Some(pose)) => {
                let (x, y, z) = transform.apply((pose.x, pose.y, pose.z));
                (
                    Location3D::new(x, y, z),
                    self.settings.vio_noise,
                    VIO_ACCURACY,
                    transform,
                )
            }
            _ => (
                self.last_fix?,
                self.settings.ultrasound_noise,
                VIO_ACCURACY * ULTRASOUND_INFLATION,
                transform.inflated(ULTRASOUND_INFLATION),
            ),
        };

        let mut location = Location3D::new(
            base.x + self.jitter(noise),
            base.y + self.jitter(noise),
            base.z + self.jitter(noise),
        )
        .with_accuracy(accuracy);
        if !self.settings.solve_in_3d {
            location.y = transform.y;
        }
        self.last_fix = Some(location);

        let timestamp = unix_now();
        let beacons: Vec<RangeDataPoint> = self
            .settings
            .beacons
            .clone()
            .into_iter()
            .map(|site| {
                let range = (location.distance_to(site.position) + self.jitter(noise)).max(0.0);
                RangeDataPoint {
                    ble_mac: site.ble_mac,
                    slot: site.slot,
                    range,
                    rssi: -40.0 - 6.0 * range,
                    timestamp,
                }
            })
            .collect();

        Some(LocationEstimate::new(location, reported_transform, beacons, timestamp))
    }
}

fn unix_now() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs_f64())
        .unwrap_or_default()
}
