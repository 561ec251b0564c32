//! Core types for RadonEye readings.

use core::fmt;

use bytes::Buf;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::{ParseError, ParseResult};
use crate::units::RadonUnit;

/// A radon concentration expressed in both supported units.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct RadonValue {
    /// Becquerels per cubic metre.
    pub bq_m3: f64,
    /// Picocuries per litre.
    pub pci_l: f64,
}

impl RadonValue {
    /// The value in the requested unit.
    #[must_use]
    pub fn in_unit(&self, unit: RadonUnit) -> f64 {
        match unit {
            RadonUnit::BqM3 => self.bq_m3,
            RadonUnit::PciL => self.pci_l,
        }
    }
}

impl fmt::Display for RadonValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} Bq/m³ ({} pCi/L)", self.bq_m3, self.pci_l)
    }
}

/// Alarm configuration stored on the device.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct AlarmSettings {
    /// Whether the audible alarm is armed.
    pub enabled: bool,
    /// Concentration that triggers the alarm.
    pub level: RadonValue,
    /// Minutes between repeated alarms (a multiple of 10).
    pub interval_minutes: u32,
}

/// Snapshot of a device's state as reported by a status read.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct DeviceStatus {
    /// Serial number, assembled from three sub-fields of the status frame(s).
    pub serial: String,
    /// Model name (e.g. "RD200").
    pub model: String,
    /// Firmware version string.
    pub firmware_version: String,
    /// Most recent 10-minute reading.
    pub latest: RadonValue,
    /// Average over the last day.
    pub day_avg: RadonValue,
    /// Average over the last month.
    pub month_avg: RadonValue,
    /// Highest reading since power-on.
    pub peak: RadonValue,
    /// Raw particle count for the current interval.
    pub counts_current: u16,
    /// Raw particle count for the previous interval.
    pub counts_previous: u16,
    /// Counts formatted as `current/previous`.
    pub counts: String,
    /// Minutes since the device started measuring.
    pub uptime_minutes: u32,
    /// Uptime formatted as `DdHHhMMm`.
    pub uptime: String,
    /// Unit shown on the device display. `None` on firmware that does not report it.
    #[cfg_attr(
        feature = "serde",
        serde(default, skip_serializing_if = "Option::is_none")
    )]
    pub display_unit: Option<RadonUnit>,
    /// Alarm configuration. `None` on firmware that does not report it.
    #[cfg_attr(
        feature = "serde",
        serde(default, skip_serializing_if = "Option::is_none")
    )]
    pub alarm: Option<AlarmSettings>,
}

/// One page of a paged history response.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct HistoryPage {
    /// 1-based page number.
    pub page_no: u8,
    /// Total number of pages in this response.
    pub page_count: u8,
    /// Number of values declared by the page header.
    pub value_count: u8,
    /// Values in Bq/m³.
    pub values: Vec<u16>,
}

impl HistoryPage {
    /// Header size, including the leading preamble byte.
    pub const HEADER_BYTES: usize = 4;

    /// Parse a history page frame.
    ///
    /// Layout (little-endian):
    /// - byte 0: preamble (ignored here)
    /// - byte 1: page count
    /// - byte 2: page number
    /// - byte 3: value count
    /// - bytes 4..: `value_count` unsigned 16-bit values
    pub fn from_bytes(data: &[u8]) -> ParseResult<Self> {
        if data.len() < Self::HEADER_BYTES {
            return Err(ParseError::too_short(
                "history page header",
                Self::HEADER_BYTES,
                data.len(),
            ));
        }

        let mut buf = &data[1..];
        let page_count = buf.get_u8();
        let page_no = buf.get_u8();
        let value_count = buf.get_u8();

        let needed = usize::from(value_count) * 2;
        if buf.remaining() < needed {
            return Err(ParseError::too_short(
                "history page values",
                Self::HEADER_BYTES + needed,
                data.len(),
            ));
        }

        let values = (0..value_count).map(|_| buf.get_u16_le()).collect();

        Ok(HistoryPage {
            page_no,
            page_count,
            value_count,
            values,
        })
    }
}

/// An ordered run of history samples, oldest first.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct HistoryReading {
    values: Vec<RadonValue>,
}

impl HistoryReading {
    /// Wrap already converted samples.
    #[must_use]
    pub fn new(values: Vec<RadonValue>) -> Self {
        Self { values }
    }

    /// A history with no samples.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Number of samples.
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether the history has no samples.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Samples in chronological order.
    #[must_use]
    pub fn values(&self) -> &[RadonValue] {
        &self.values
    }

    /// All samples in Bq/m³.
    #[must_use]
    pub fn values_bq_m3(&self) -> Vec<f64> {
        self.values.iter().map(|v| v.bq_m3).collect()
    }

    /// All samples in pCi/L.
    #[must_use]
    pub fn values_pci_l(&self) -> Vec<f64> {
        self.values.iter().map(|v| v.pci_l).collect()
    }
}

impl IntoIterator for HistoryReading {
    type Item = RadonValue;
    type IntoIter = std::vec::IntoIter<RadonValue>;

    fn into_iter(self) -> Self::IntoIter {
        self.values.into_iter()
    }
}

/// Format an uptime in minutes as `DdHHhMMm`.
#[must_use]
pub fn format_uptime(minutes: u32) -> String {
    let days = minutes / (24 * 60);
    let hours = minutes / 60 % 24;
    let mins = minutes % 60;
    format!("{days}d{hours:02}h{mins:02}m")
}

/// Format particle counts as `current/previous`.
#[must_use]
pub fn format_counts(current: u16, previous: u16) -> String {
    format!("{current}/{previous}")
}
