//! Generates a fake tracking session: someone walking in a circle, with
//! tracking that takes a while to initialize and that drops out every so
//! often from excessive motion.

use crate::pose::FrameUpdate;
use crate::tracker_message_decoder::TrackerEvent;
use crate::tracking_state::{CameraTrackingState, LimitedReason};
use nalgebra::Vector3;
use rand::prelude::*;
use std::f64::consts::{FRAC_PI_2, PI};

/// Shape of the generated session.
#[derive(Debug, Clone)]
pub struct DummyTracker {
    /// Frames per second
    pub frame_rate: f64,
    /// Radius of the walk, in meters
    pub radius: f64,
    /// Seconds to walk the full circle
    pub lap_seconds: f64,
    /// Height the camera is held at
    pub height: f64,
    /// Meters of uniform noise added to each position
    pub noise: f64,
    /// Frames spent initializing at the start
    pub init_frames: usize,
    /// A dropout starts every this many frames (0 for never)
    pub dropout_every: usize,
    /// Length of each dropout, in frames
    pub dropout_len: usize,
}

impl Default for DummyTracker {
    fn default() -> Self {
        Self {
            frame_rate: 30.0,
            radius: 2.0,
            lap_seconds: 20.0,
            height: 1.4,
            noise: 0.0,
            init_frames: 30,
            dropout_every: 300,
            dropout_len: 20,
        }
    }
}

impl DummyTracker {
    /// The state the provider would be in at frame `i`.
    pub fn state_at(&self, i: usize) -> CameraTrackingState {
        if i < self.init_frames {
            return CameraTrackingState::Limited(LimitedReason::Initializing);
        }
        if self.dropout_every > 0 {
            let since_init = i - self.init_frames;
            let phase = since_init % self.dropout_every;
            if since_init >= self.dropout_every && phase < self.dropout_len {
                return CameraTrackingState::Limited(LimitedReason::ExcessiveMotion);
            }
        }
        CameraTrackingState::Normal
    }

    /// The camera pose at frame `i`, without noise. Yaw follows the walking
    /// direction.
    fn frame_at(&self, i: usize) -> (Vector3<f64>, f64, f64) {
        let t = i as f64 / self.frame_rate;
        let angle = 2.0 * PI * t / self.lap_seconds;
        let position = Vector3::new(
            self.radius * angle.cos(),
            self.height,
            self.radius * angle.sin(),
        );
        let yaw = (-(angle + FRAC_PI_2)).rem_euclid(2.0 * PI);
        (position, yaw, t)
    }

    /// Generates `frames` frames, preceded by a state event whenever the
    /// tracking state changes.
    pub fn generate(&self, frames: usize) -> Vec<TrackerEvent> {
        let mut rng = thread_rng();
        let mut last_state = None;
        let mut events = Vec::with_capacity(frames + 8);

        for i in 0..frames {
            let state = self.state_at(i);
            if last_state != Some(state) {
                events.push(TrackerEvent::State(state));
                last_state = Some(state);
            }

            let (mut position, yaw, t) = self.frame_at(i);
            if self.noise > 0.0 {
                position += Vector3::from_fn(|_, _| rng.gen_range(-self.noise..self.noise));
            }
            events.push(TrackerEvent::Frame(FrameUpdate::from_position_yaw(position, yaw, t)));
        }

        events
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn schedule_initializes_then_drops_out() {
        let tracker = DummyTracker {
            init_frames: 2,
            dropout_every: 4,
            dropout_len: 1,
            ..Default::default()
        };
        let limited = CameraTrackingState::Limited(LimitedReason::ExcessiveMotion);
        let init = CameraTrackingState::Limited(LimitedReason::Initializing);
        let normal = CameraTrackingState::Normal;

        let states: Vec<_> = (0..11).map(|i| tracker.state_at(i)).collect();
        assert_eq!(
            states,
            vec![init, init, normal, normal, normal, normal, limited, normal, normal, normal, limited]
        );
    }

    #[test]
    fn state_events_only_on_change() {
        let tracker = DummyTracker {
            init_frames: 3,
            dropout_every: 0,
            ..Default::default()
        };
        let events = tracker.generate(10);

        let states: Vec<_> = events
            .iter()
            .filter_map(|e| match e {
                TrackerEvent::State(s) => Some(*s),
                TrackerEvent::Frame(_) => None,
            })
            .collect();
        assert_eq!(
            states,
            vec![
                CameraTrackingState::Limited(LimitedReason::Initializing),
                CameraTrackingState::Normal
            ]
        );
        assert_eq!(events.len(), 12);
    }

    #[test]
    fn generate_some_points() {
        let tracker = DummyTracker {
            frame_rate: 4.0,
            lap_seconds: 1.0,
            radius: 1.0,
            height: 0.0,
            ..Default::default()
        };
        let real_points = [(1.0, 0.0), (0.0, 1.0), (-1.0, 0.0), (0.0, -1.0)];

        for (i, (x, z)) in real_points.into_iter().enumerate() {
            let (position, _, _) = tracker.frame_at(i);
            assert!((position.x - x).abs() < 0.0001);
            assert!((position.z - z).abs() < 0.0001);
        }
    }
}
