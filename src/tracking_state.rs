//! Tracking-quality types on both sides of the bridge.
//!
//! The camera-tracking provider reports its state as a [`CameraTrackingState`],
//! which nests the reasons for limited tracking. The bridge flattens that into
//! a [`TrackingQuality`], and the fusion engine receives an
//! [`EngineTrackingState`], which additionally knows about VIO being switched
//! off entirely.

use std::fmt;

/// Why the tracking provider considers its tracking limited.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LimitedReason {
    /// The session has just started and has not yet gathered enough data.
    Initializing,
    /// The camera is looking at a scene without enough visual features.
    InsufficientFeatures,
    /// The device is moving too fast for visual tracking.
    ExcessiveMotion,
    /// The session is trying to recover after an interruption.
    Relocalizing,
}

/// The tracking state as the camera-tracking provider reports it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CameraTrackingState {
    /// Pose data is trustworthy.
    Normal,
    /// Pose data is available but of questionable quality.
    Limited(LimitedReason),
    /// No pose data is available.
    NotAvailable,
}

/// The flattened tracking quality stored by the shim.
#[allow(missing_docs)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TrackingQuality {
    Normal,
    Initializing,
    InsufficientFeatures,
    ExcessiveMotion,
    Relocalizing,
    NotAvailable,
}

impl TrackingQuality {
    /// Every variant, in declaration order.
    pub const ALL: [TrackingQuality; 6] = [
        TrackingQuality::Normal,
        TrackingQuality::Initializing,
        TrackingQuality::InsufficientFeatures,
        TrackingQuality::ExcessiveMotion,
        TrackingQuality::Relocalizing,
        TrackingQuality::NotAvailable,
    ];

    /// Only `Normal` quality lets a pose through to the fusion engine.
    pub fn is_trustworthy(self) -> bool {
        self == TrackingQuality::Normal
    }
}

/// The tracking state understood by the fusion engine.
///
/// `Disabled` has no [`TrackingQuality`] counterpart; the shim only sends it
/// when VIO fusion has been turned off, so that the engine solves with
/// ultrasound alone.
#[allow(missing_docs)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum EngineTrackingState {
    Disabled,
    #[default]
    NotAvailable,
    Normal,
    Initializing,
    Relocalizing,
    ExcessiveMotion,
    InsufficientFeatures,
}

impl From<CameraTrackingState> for TrackingQuality {
    fn from(state: CameraTrackingState) -> Self {
        match state {
            CameraTrackingState::Normal => TrackingQuality::Normal,
            CameraTrackingState::Limited(LimitedReason::Initializing) => {
                TrackingQuality::Initializing
            }
            CameraTrackingState::Limited(LimitedReason::InsufficientFeatures) => {
                TrackingQuality::InsufficientFeatures
            }
            CameraTrackingState::Limited(LimitedReason::ExcessiveMotion) => {
                TrackingQuality::ExcessiveMotion
            }
            CameraTrackingState::Limited(LimitedReason::Relocalizing) => {
                TrackingQuality::Relocalizing
            }
            CameraTrackingState::NotAvailable => TrackingQuality::NotAvailable,
        }
    }
}

impl From<TrackingQuality> for EngineTrackingState {
    fn from(quality: TrackingQuality) -> Self {
        match quality {
            TrackingQuality::Normal => EngineTrackingState::Normal,
            TrackingQuality::Initializing => EngineTrackingState::Initializing,
            TrackingQuality::InsufficientFeatures => EngineTrackingState::InsufficientFeatures,
            TrackingQuality::ExcessiveMotion => EngineTrackingState::ExcessiveMotion,
            TrackingQuality::Relocalizing => EngineTrackingState::Relocalizing,
            TrackingQuality::NotAvailable => EngineTrackingState::NotAvailable,
        }
    }
}

impl fmt::Display for LimitedReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LimitedReason::Initializing => "INITIALIZING",
            LimitedReason::InsufficientFeatures => "INSUFFICIENT_FEATURES",
            LimitedReason::ExcessiveMotion => "EXCESSIVE_MOTION",
            LimitedReason::Relocalizing => "RELOCALIZING",
        };
        write!(f, "{}", name)
    }
}

impl fmt::Display for CameraTrackingState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CameraTrackingState::Normal => write!(f, "NORMAL"),
            CameraTrackingState::Limited(reason) => write!(f, "LIMITED:{}", reason),
            CameraTrackingState::NotAvailable => write!(f, "NOT_AVAILABLE"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn every_quality_maps_to_a_distinct_engine_state() {
        let mapped: HashSet<EngineTrackingState> = TrackingQuality::ALL
            .iter()
            .map(|&q| EngineTrackingState::from(q))
            .collect();

        assert_eq!(mapped.len(), TrackingQuality::ALL.len());
        assert!(!mapped.contains(&EngineTrackingState::Disabled));
    }

    #[test]
    fn limited_reasons_flatten() {
        let cases = [
            (LimitedReason::Initializing, TrackingQuality::Initializing),
            (
                LimitedReason::InsufficientFeatures,
                TrackingQuality::InsufficientFeatures,
            ),
            (LimitedReason::ExcessiveMotion, TrackingQuality::ExcessiveMotion),
            (LimitedReason::Relocalizing, TrackingQuality::Relocalizing),
        ];

        for (reason, quality) in cases {
            assert_eq!(
                TrackingQuality::from(CameraTrackingState::Limited(reason)),
                quality
            );
        }
        assert_eq!(
            TrackingQuality::from(CameraTrackingState::NotAvailable),
            TrackingQuality::NotAvailable
        );
    }

    #[test]
    fn only_normal_is_trustworthy() {
        let trusted: Vec<_> = TrackingQuality::ALL
            .iter()
            .filter(|q| q.is_trustworthy())
            .collect();
        assert_eq!(trusted, vec![&TrackingQuality::Normal]);
    }
}
