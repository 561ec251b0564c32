//! Protocol version selection.
//!
//! A RadonEye exposes one vendor service per firmware generation. Newer
//! firmware may expose both, so services are checked newest first.

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::uuid::{V1_SERVICE, V2_SERVICE};

/// Divisor applied to raw V1 history values.
///
/// Two scale constants exist across V1 firmware batches and neither can be
/// detected from the wire.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HistoryScale {
    /// Raw value divided by `37 × e`.
    #[default]
    Euler,
    /// Raw value divided by `37 × 2.7`.
    Legacy,
}

impl HistoryScale {
    /// Divisor that turns a raw history value into pCi/L.
    #[must_use]
    pub fn divisor(self) -> f64 {
        match self {
            HistoryScale::Euler => 37.0 * std::f64::consts::E,
            HistoryScale::Legacy => 37.0 * 2.7,
        }
    }
}

/// Which V1 status layout to expect.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum V1Layout {
    /// Decide per read, from whether the alarm/unit frame shows up.
    #[default]
    Auto,
    /// Firmware without the alarm/unit frame.
    Basic,
    /// Firmware that sends the alarm/unit frame.
    Extended,
}

/// Wire protocol spoken by a connected device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProtocolVersion {
    /// First-generation RD200 protocol.
    V1 {
        /// Scale applied to raw history values.
        history_scale: HistoryScale,
    },
    /// Second-generation protocol with the V2 status layout.
    V2,
    /// V2 wire format with the V3 serial/model layout.
    V3Layout,
}

impl ProtocolVersion {
    /// Service UUID carrying this protocol.
    #[must_use]
    pub fn service(self) -> Uuid {
        match self {
            ProtocolVersion::V1 { .. } => V1_SERVICE,
            ProtocolVersion::V2 | ProtocolVersion::V3Layout => V2_SERVICE,
        }
    }
}

impl fmt::Display for ProtocolVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProtocolVersion::V1 { .. } => write!(f, "v1"),
            ProtocolVersion::V2 => write!(f, "v2"),
            ProtocolVersion::V3Layout => write!(f, "v3"),
        }
    }
}

/// Anything that can answer "is this GATT service present".
pub trait Capabilities {
    /// Whether the connected device exposes `service`.
    fn has_service(&self, service: Uuid) -> bool;
}

/// Picks the protocol version for a connected device.
#[derive(Debug, Clone, Copy, Default)]
pub struct VersionDetector {
    history_scale: HistoryScale,
}

impl VersionDetector {
    /// Create a detector that assigns `history_scale` to V1 devices.
    #[must_use]
    pub fn new(history_scale: HistoryScale) -> Self {
        Self { history_scale }
    }

    /// Select a version from the device's services.
    ///
    /// The V2/V3 service is checked before the V1 service.
    pub fn detect(&self, capabilities: &dyn Capabilities) -> Result<ProtocolVersion> {
        let candidates = [
            ProtocolVersion::V2,
            ProtocolVersion::V1 {
                history_scale: self.history_scale,
            },
        ];

        for version in candidates {
            if capabilities.has_service(version.service()) {
                debug!("Detected protocol {} via service {}", version, version.service());
                return Ok(version);
            }
        }

        Err(Error::UnsupportedDevice)
    }
}
