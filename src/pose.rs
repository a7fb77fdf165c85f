//! Camera poses as they come out of the tracking provider, and the
//! [`PoseSample`]s that the bridge hands to a fusion engine.

use nalgebra::{Matrix4, Rotation3, Vector3};
use serde::{Deserialize, Serialize};

/// How the sixteen entries of a 4x4 transform are laid out in memory by the
/// tracking provider.
///
/// Getting this wrong does not fail, it silently swaps the translation for
/// the bottom row of the matrix (usually `0, 0, 0`), so it is worth checking
/// against the provider's documentation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
pub enum MatrixLayout {
    /// Entries are stored column by column, translation in entries 12..15.
    /// This is what ARKit's `simd_float4x4` does.
    #[default]
    ColumnMajor,
    /// Entries are stored row by row, translation in entries 3, 7 and 11.
    RowMajor,
}

impl MatrixLayout {
    /// Builds a transform from sixteen entries stored in this layout.
    pub fn matrix_from_entries(self, entries: &[f64; 16]) -> Matrix4<f64> {
        match self {
            MatrixLayout::ColumnMajor => Matrix4::from_column_slice(entries),
            MatrixLayout::RowMajor => Matrix4::from_row_slice(entries),
        }
    }
}

/// A single visual-inertial pose, ready to be fused.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PoseSample {
    /// Meters along the provider's x axis
    pub x: f64,
    /// Meters along the provider's y axis, which is vertical when the
    /// provider is aligned to gravity
    pub y: f64,
    /// Meters along the provider's z axis
    pub z: f64,
    /// Rotation about the vertical axis
    pub yaw_radians: f64,
    /// Provider timestamp, in seconds
    pub timestamp_seconds: f64,
}

/// One frame callback from the tracking provider.
#[derive(Debug, Clone, PartialEq)]
pub struct FrameUpdate {
    /// Camera-to-world transform, in the usual `[R | t; 0 1]` form
    pub transform: Matrix4<f64>,
    /// Euler angle about the vertical axis
    pub yaw: f64,
    /// Provider timestamp, in seconds
    pub timestamp: f64,
}

impl FrameUpdate {
    /// Instantiates a [`FrameUpdate`] from an already-assembled transform.
    pub fn new(transform: Matrix4<f64>, yaw: f64, timestamp: f64) -> Self {
        Self {
            transform,
            yaw,
            timestamp,
        }
    }

    /// Instantiates a [`FrameUpdate`] from the provider's raw matrix entries.
    pub fn from_entries(entries: &[f64; 16], layout: MatrixLayout, yaw: f64, timestamp: f64) -> Self {
        Self::new(layout.matrix_from_entries(entries), yaw, timestamp)
    }

    /// A camera standing at `position`, turned `yaw` radians about the
    /// vertical axis.
    pub fn from_position_yaw(position: Vector3<f64>, yaw: f64, timestamp: f64) -> Self {
        let rotation = Rotation3::from_axis_angle(&Vector3::y_axis(), yaw);
        let mut transform = rotation.to_homogeneous();
        transform.fixed_view_mut::<3, 1>(0, 3).copy_from(&position);
        Self::new(transform, yaw, timestamp)
    }

    /// The pose this frame describes.
    pub fn pose_sample(&self) -> PoseSample {
        PoseSample::from_transform(&self.transform, self.yaw, self.timestamp)
    }
}

impl PoseSample {
    /// Pulls the translation out of `transform` and pairs it with the yaw and
    /// timestamp, which pass through untouched.
    pub fn from_transform(transform: &Matrix4<f64>, yaw_radians: f64, timestamp_seconds: f64) -> Self {
        let (x, y, z) = translation(transform);
        Self {
            x,
            y,
            z,
            yaw_radians,
            timestamp_seconds,
        }
    }
}

/// The translation column of a homogeneous transform.
pub fn translation(transform: &Matrix4<f64>) -> (f64, f64, f64) {
    (transform[(0, 3)], transform[(1, 3)], transform[(2, 3)])
}
