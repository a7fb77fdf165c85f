//! Runtime configuration for the bridge, read from a [ron] file. A minimal
//! file looks like this; every field can be left out to take its default:
//!
//! ```text
//! (
//!     realm_identifier: "/a813dda10478e48d283b237775d5ae55/Leeroy",
//!     use_vio: true,
//!     solve_in_3d: false,
//!     matrix_layout: ColumnMajor,
//!     location_rate_hz: 4.0,
//!     udp_target: Some("127.0.0.1:9750"),
//!     beacons: [
//!         (ble_mac: "CCF9578E0D89", slot: 1, position: (0.0, 2.5, 0.0)),
//!     ],
//! )
//! ```

use crate::location::PoseTransform;
use crate::pose::MatrixLayout;
use serde::{Deserialize, Serialize};
use std::{
    borrow::Cow,
    fmt,
    fs,
    net::{SocketAddr, ToSocketAddrs},
    path::Path,
    time::Duration,
};

/// A beacon installed in the realm, with its position in the positioning
/// frame.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct BeaconSite {
    /// BLE MAC address
    pub ble_mac: String,
    /// Transmit time slot
    pub slot: u8,
    /// Position in meters, y up
    pub position: (f64, f64, f64),
}

/// Everything the bridge and its simulated engine need to know.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct BridgeConfig {
    /// Realm to localize in, of the form `/userid/realmid`
    pub realm_identifier: String,
    /// Whether visual-inertial poses are fused at all
    pub use_vio: bool,
    /// Solve in three dimensions instead of pinning the vertical axis
    pub solve_in_3d: bool,
    /// How the tracking provider stores its transforms
    pub matrix_layout: MatrixLayout,
    /// Location estimates per second
    pub location_rate_hz: f64,
    /// Where to stream estimates as JSON datagrams, if anywhere
    pub udp_target: Option<String>,
    /// Transform from the tracker's frame into the positioning frame
    pub pose_transform: PoseTransform,
    /// Meters of noise on fixes made without visual tracking
    pub ultrasound_noise: f64,
    /// Installed beacons
    pub beacons: Vec<BeaconSite>,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            realm_identifier: "/demo/realm".to_owned(),
            use_vio: true,
            solve_in_3d: false,
            matrix_layout: MatrixLayout::ColumnMajor,
            location_rate_hz: 4.0,
            udp_target: None,
            pose_transform: PoseTransform::default(),
            ultrasound_noise: 0.25,
            beacons: Vec::new(),
        }
    }
}

/// Returned when a configuration can't be read or doesn't make sense.
#[derive(Debug)]
pub enum ConfigError {
    /// Returned when the file can't be read or written.
    IoError(std::io::Error),

    /// Returned when serialization of the configuration fails.
    RonError(ron::Error),

    /// Returned when the file isn't valid RON for a [`BridgeConfig`].
    RonSpannedError(ron::de::SpannedError),

    /// Returned when a value parses but is unusable.
    Invalid(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        use ConfigError as CE;
        let msg = match self {
            CE::IoError(error) => Cow::from(format!("io error: {}", error)),
            CE::RonError(error) => Cow::from(format!("ron error: {}", error)),
            CE::RonSpannedError(error) => Cow::from(format!("ron spanning error: {}", error)),
            CE::Invalid(reason) => Cow::from(format!("invalid configuration: {}", reason)),
        };

        write!(f, "{}", msg)
    }
}

impl std::error::Error for ConfigError {}

impl BridgeConfig {
    /// Read and validate a configuration from the path provided.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(ConfigError::IoError)?;
        Self::from_ron(&text)
    }

    /// Parse and validate a configuration from RON text.
    pub fn from_ron(text: &str) -> Result<Self, ConfigError> {
        let config: Self = ron::de::from_str(text).map_err(ConfigError::RonSpannedError)?;
        config.validate()?;
        Ok(config)
    }

    /// Write the configuration out to the path provided.
    pub fn to_path(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let text = ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default())
            .map_err(ConfigError::RonError)?;
        fs::write(path, text).map_err(ConfigError::IoError)
    }

    /// Checks the values that serde can't.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let segments: Vec<&str> = self.realm_identifier.split('/').collect();
        if !matches!(segments.as_slice(), ["", user, realm] if !user.is_empty() && !realm.is_empty())
        {
            return Err(ConfigError::Invalid(format!(
                "realm identifier {:?} is not of the form /userid/realmid",
                self.realm_identifier
            )));
        }

        self.location_interval()?;

        if !(self.ultrasound_noise.is_finite() && self.ultrasound_noise >= 0.0) {
            return Err(ConfigError::Invalid(format!(
                "ultrasound noise must not be negative, got {}",
                self.ultrasound_noise
            )));
        }

        if let Some(target) = &self.udp_target {
            resolve_target(target)?;
        }

        Ok(())
    }

    /// Time between location estimates. Fails unless the rate is positive
    /// and slow enough, or fast enough, to be represented as a [`Duration`].
    pub fn location_interval(&self) -> Result<Duration, ConfigError> {
        if !(self.location_rate_hz.is_finite() && self.location_rate_hz > 0.0) {
            return Err(ConfigError::Invalid(format!(
                "location rate must be positive, got {}",
                self.location_rate_hz
            )));
        }
        Duration::try_from_secs_f64(1.0 / self.location_rate_hz).map_err(|e| {
            ConfigError::Invalid(format!(
                "location rate {} Hz has no usable interval: {}",
                self.location_rate_hz, e
            ))
        })
    }
}

/// Resolves `host:port` to the first address it names.
pub fn resolve_target(target: &str) -> Result<SocketAddr, ConfigError> {
    target
        .to_socket_addrs()
        .map_err(|e| ConfigError::Invalid(format!("udp target {:?}: {}", target, e)))?
        .next()
        .ok_or_else(|| ConfigError::Invalid(format!("udp target {:?} resolves to nothing", target)))
}
