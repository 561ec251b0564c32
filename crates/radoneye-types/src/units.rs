//! Radon concentration units and conversion.
//!
//! RadonEye devices report either picocuries per litre (pCi/L) or becquerels
//! per cubic metre (Bq/m³). One pCi/L equals 37 Bq/m³.
//!
//! Conversions honour a [`RoundingPolicy`] chosen by the caller. With the
//! default policy Bq/m³ values are whole numbers and pCi/L values carry two
//! decimals, matching what the device shows on its display.

use core::fmt;
use core::str::FromStr;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::ParseError;
use crate::types::RadonValue;

/// Number of Bq/m³ in one pCi/L.
pub const BQ_M3_PER_PCI_L: f64 = 37.0;

/// A radon concentration unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum RadonUnit {
    /// Becquerels per cubic metre.
    #[cfg_attr(feature = "serde", serde(rename = "bq/m3"))]
    BqM3,
    /// Picocuries per litre.
    #[cfg_attr(feature = "serde", serde(rename = "pci/l"))]
    PciL,
}

impl RadonUnit {
    /// Wire byte used by the display-unit field and the set-unit command.
    #[must_use]
    pub fn to_byte(self) -> u8 {
        match self {
            RadonUnit::PciL => 0x00,
            RadonUnit::BqM3 => 0x01,
        }
    }

    /// Canonical short name (`"bq/m3"` or `"pci/l"`).
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            RadonUnit::BqM3 => "bq/m3",
            RadonUnit::PciL => "pci/l",
        }
    }
}

impl fmt::Display for RadonUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RadonUnit {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "bq/m3" | "bq/m³" | "bq" => Ok(RadonUnit::BqM3),
            "pci/l" | "pci" => Ok(RadonUnit::PciL),
            other => Err(ParseError::InvalidUnit(other.to_string())),
        }
    }
}

impl TryFrom<u8> for RadonUnit {
    type Error = ParseError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0x00 => Ok(RadonUnit::PciL),
            0x01 => Ok(RadonUnit::BqM3),
            other => Err(ParseError::InvalidUnit(format!("unit byte 0x{other:02X}"))),
        }
    }
}

/// Whether conversions round their results.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum RoundingPolicy {
    /// Bq/m³ to the nearest integer, pCi/L to two decimals.
    #[default]
    Rounded,
    /// Exact floating-point results.
    Exact,
}

/// Converts radon concentrations between units.
///
/// The converter is `Copy` and carries only its rounding policy, so it can be
/// handed to every decoder that needs it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UnitConverter {
    rounding: RoundingPolicy,
}

impl UnitConverter {
    /// Create a converter with the given rounding policy.
    #[must_use]
    pub fn new(rounding: RoundingPolicy) -> Self {
        Self { rounding }
    }

    /// Create a converter that never rounds.
    #[must_use]
    pub fn exact() -> Self {
        Self::new(RoundingPolicy::Exact)
    }

    /// The rounding policy in effect.
    #[must_use]
    pub fn rounding(&self) -> RoundingPolicy {
        self.rounding
    }

    /// Convert pCi/L to Bq/m³.
    #[must_use]
    pub fn to_bq_m3(&self, pci_l: f64) -> f64 {
        let value = pci_l * BQ_M3_PER_PCI_L;
        match self.rounding {
            RoundingPolicy::Rounded => value.round(),
            RoundingPolicy::Exact => value,
        }
    }

    /// Convert Bq/m³ to pCi/L.
    #[must_use]
    pub fn to_pci_l(&self, bq_m3: f64) -> f64 {
        self.round_pci_l(bq_m3 / BQ_M3_PER_PCI_L)
    }

    /// Apply the pCi/L display precision (two decimals) when rounding.
    #[must_use]
    pub fn round_pci_l(&self, pci_l: f64) -> f64 {
        match self.rounding {
            RoundingPolicy::Rounded => (pci_l * 100.0).round() / 100.0,
            RoundingPolicy::Exact => pci_l,
        }
    }

    /// Convert `value` from one unit to another.
    #[must_use]
    pub fn convert(&self, value: f64, from: RadonUnit, to: RadonUnit) -> f64 {
        match (from, to) {
            (RadonUnit::BqM3, RadonUnit::PciL) => self.to_pci_l(value),
            (RadonUnit::PciL, RadonUnit::BqM3) => self.to_bq_m3(value),
            _ => value,
        }
    }

    /// Build a paired value from a wire-authoritative Bq/m³ reading.
    #[must_use]
    pub fn from_bq_m3(&self, bq_m3: f64) -> RadonValue {
        RadonValue {
            bq_m3,
            pci_l: self.to_pci_l(bq_m3),
        }
    }

    /// Build a paired value from a wire-authoritative pCi/L reading.
    ///
    /// Bq/m³ is derived from the raw reading, not from the rounded pCi/L.
    #[must_use]
    pub fn from_pci_l(&self, pci_l: f64) -> RadonValue {
        RadonValue {
            bq_m3: self.to_bq_m3(pci_l),
            pci_l: self.round_pci_l(pci_l),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_rounded_conversions() {
        let conv = UnitConverter::default();
        assert_eq!(conv.to_bq_m3(0.58), 21.0);
        assert_eq!(conv.to_pci_l(21.0), 0.57);
        assert_eq!(conv.to_pci_l(148.0), 4.0);
        assert_eq!(conv.round_pci_l(1.3224), 1.32);
    }

    #[test]
    fn test_exact_conversions() {
        let conv = UnitConverter::exact();
        assert!((conv.to_bq_m3(0.58) - 21.46).abs() < 1e-9);
        assert!((conv.to_pci_l(21.0) - 21.0 / 37.0).abs() < 1e-12);
        assert_eq!(conv.round_pci_l(1.3224), 1.3224);
    }

    #[test]
    fn test_convert_identity_and_cross() {
        let conv = UnitConverter::default();
        assert_eq!(conv.convert(12.5, RadonUnit::BqM3, RadonUnit::BqM3), 12.5);
        assert_eq!(conv.convert(0.123, RadonUnit::PciL, RadonUnit::PciL), 0.123);
        assert_eq!(conv.convert(4.0, RadonUnit::PciL, RadonUnit::BqM3), 148.0);
        assert_eq!(conv.convert(111.0, RadonUnit::BqM3, RadonUnit::PciL), 3.0);
    }

    #[test]
    fn test_from_pci_l_derives_from_raw_value() {
        // 0.5849 rounds to 0.58 pCi/L, but Bq/m³ comes from the raw 21.64.
        let value = UnitConverter::default().from_pci_l(0.5849);
        assert_eq!(value.pci_l, 0.58);
        assert_eq!(value.bq_m3, 22.0);
    }

    #[test]
    fn test_unit_parsing() {
        assert_eq!("bq/m3".parse::<RadonUnit>().unwrap(), RadonUnit::BqM3);
        assert_eq!("PCI/L".parse::<RadonUnit>().unwrap(), RadonUnit::PciL);
        assert!(matches!(
            "ppm".parse::<RadonUnit>(),
            Err(ParseError::InvalidUnit(u)) if u == "ppm"
        ));
    }

    #[test]
    fn test_unit_bytes() {
        assert_eq!(RadonUnit::try_from(0x00).unwrap(), RadonUnit::PciL);
        assert_eq!(RadonUnit::try_from(0x01).unwrap(), RadonUnit::BqM3);
        assert!(RadonUnit::try_from(0x07).is_err());
        for unit in [RadonUnit::BqM3, RadonUnit::PciL] {
            assert_eq!(RadonUnit::try_from(unit.to_byte()).unwrap(), unit);
        }
    }

    #[test]
    fn test_unit_display() {
        assert_eq!(RadonUnit::BqM3.to_string(), "bq/m3");
        assert_eq!(RadonUnit::PciL.to_string(), "pci/l");
    }

    proptest! {
        #[test]
        fn prop_rounded_round_trip_is_stable(bq in 0u32..100_000) {
            let conv = UnitConverter::default();
            let once = conv.to_pci_l(f64::from(bq));
            let twice = conv.to_pci_l(conv.to_bq_m3(once));
            prop_assert_eq!(once, twice);
        }

        #[test]
        fn prop_exact_round_trip_is_stable(bq in 0u32..100_000) {
            let conv = UnitConverter::exact();
            let once = conv.to_pci_l(f64::from(bq));
            let twice = conv.to_pci_l(conv.to_bq_m3(once));
            prop_assert!((once - twice).abs() < 1e-9);
        }

        #[test]
        fn prop_rounded_pci_round_trip_is_idempotent(pci in 0.0f64..1_000.0) {
            let conv = UnitConverter::default();
            let first = conv.to_pci_l(conv.to_bq_m3(pci));
            let second = conv.to_pci_l(conv.to_bq_m3(first));
            prop_assert_eq!(first, second);
        }

        #[test]
        fn prop_rounded_bq_is_integral(pci in 0.0f64..1_000.0) {
            let bq = UnitConverter::default().to_bq_m3(pci);
            prop_assert_eq!(bq, bq.trunc());
        }
    }
}
