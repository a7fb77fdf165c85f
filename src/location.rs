//! The results a fusion engine hands back: a located device, the transform
//! from the tracker's frame into the positioning frame, and the beacon
//! ranges that went into the fix.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A position in the positioning system's frame, with per-axis accuracy in
/// meters.
#[allow(missing_docs)]
#[derive(Debug, Clone, Copy, PartialEq, Default, Deserialize, Serialize)]
pub struct Location3D {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub x_accuracy: f64,
    pub y_accuracy: f64,
    pub z_accuracy: f64,
}

impl Location3D {
    /// A location with no accuracy information.
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self {
            x,
            y,
            z,
            ..Default::default()
        }
    }

    /// Returns the same location with every axis given accuracy `accuracy`.
    pub fn with_accuracy(self, accuracy: f64) -> Self {
        Self {
            x_accuracy: accuracy,
            y_accuracy: accuracy,
            z_accuracy: accuracy,
            ..self
        }
    }

    /// Euclidean distance to a point.
    pub fn distance_to(&self, (x, y, z): (f64, f64, f64)) -> f64 {
        ((self.x - x).powi(2) + (self.y - y).powi(2) + (self.z - z).powi(2)).sqrt()
    }
}

/// Translation and rotation (about the vertical axis) taking the tracking
/// provider's frame into the positioning frame, each with a standard
/// deviation.
#[allow(missing_docs)]
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
pub struct PoseTransform {
    pub x: f64,
    pub x_std_dev: f64,
    pub y: f64,
    pub y_std_dev: f64,
    pub z: f64,
    pub z_std_dev: f64,
    /// Radians about the vertical axis
    pub rotation: f64,
    pub rotation_std_dev: f64,
}

impl Default for PoseTransform {
    fn default() -> Self {
        Self {
            x: 0.0,
            x_std_dev: 0.1,
            y: 0.0,
            y_std_dev: 0.1,
            z: 0.0,
            z_std_dev: 0.1,
            rotation: 0.0,
            rotation_std_dev: 0.1,
        }
    }
}

impl PoseTransform {
    /// Carries a point from the tracker's frame into the positioning frame.
    pub fn apply(&self, (x, y, z): (f64, f64, f64)) -> (f64, f64, f64) {
        let (sin, cos) = self.rotation.sin_cos();
        (
            cos * x + sin * z + self.x,
            y + self.y,
            -sin * x + cos * z + self.z,
        )
    }

    /// Returns the same transform with every standard deviation scaled.
    pub fn inflated(self, factor: f64) -> Self {
        Self {
            x_std_dev: self.x_std_dev * factor,
            y_std_dev: self.y_std_dev * factor,
            z_std_dev: self.z_std_dev * factor,
            rotation_std_dev: self.rotation_std_dev * factor,
            ..self
        }
    }
}

/// A single ultrasound ranging measurement to one beacon.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct RangeDataPoint {
    /// The BLE MAC address of the beacon
    pub ble_mac: String,
    /// The beacon's transmit time slot
    pub slot: u8,
    /// Meters from the device to the beacon
    pub range: f64,
    /// Packet signal strength, unitless
    pub rssi: f64,
    /// Unix time the packet was received
    pub timestamp: f64,
}

/// A location fix produced by a fusion engine.
#[allow(missing_docs)]
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct LocationEstimate {
    pub location: Location3D,
    pub pose_transform: PoseTransform,
    /// Beacons that contributed, nearest first
    pub beacons: Vec<RangeDataPoint>,
    /// Unix time of the fix
    pub timestamp: f64,
}

impl LocationEstimate {
    /// Builds an estimate, putting `beacons` in time-of-flight order.
    pub fn new(
        location: Location3D,
        pose_transform: PoseTransform,
        mut beacons: Vec<RangeDataPoint>,
        timestamp: f64,
    ) -> Self {
        beacons.sort_by(|a, b| a.range.total_cmp(&b.range));
        Self {
            location,
            pose_transform,
            beacons,
            timestamp,
        }
    }
}

impl fmt::Display for LocationEstimate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "x: {:.6}, y: {:.6}, z: {:.6}",
            self.location.x, self.location.y, self.location.z
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::FRAC_PI_2;

    fn beacon(mac: &str, range: f64) -> RangeDataPoint {
        RangeDataPoint {
            ble_mac: mac.to_owned(),
            slot: 0,
            range,
            rssi: -40.0,
            timestamp: 0.0,
        }
    }

    #[test]
    fn beacons_are_sorted_nearest_first() {
        let estimate = LocationEstimate::new(
            Location3D::new(0.0, 0.0, 0.0),
            PoseTransform::default(),
            vec![beacon("C", 3.0), beacon("A", 1.0), beacon("B", 2.0)],
            0.0,
        );
        let order: Vec<&str> = estimate.beacons.iter().map(|b| b.ble_mac.as_str()).collect();
        assert_eq!(order, vec!["A", "B", "C"]);
    }

    #[test]
    fn display_matches_console_format() {
        let estimate = LocationEstimate::new(
            Location3D::new(1.0, -2.5, 0.125),
            PoseTransform::default(),
            vec![],
            0.0,
        );
        assert_eq!(
            estimate.to_string(),
            "x: 1.000000, y: -2.500000, z: 0.125000"
        );
    }

    #[test]
    fn transform_rotates_about_vertical_then_offsets() {
        let transform = PoseTransform {
            x: 10.0,
            y: 1.0,
            z: 0.0,
            rotation: FRAC_PI_2,
            ..Default::default()
        };
        let (x, y, z) = transform.apply((1.0, 2.0, 0.0));
        assert!((x - 10.0).abs() < 1e-9);
        assert!((y - 3.0).abs() < 1e-9);
        assert!((z + 1.0).abs() < 1e-9);
    }
}
