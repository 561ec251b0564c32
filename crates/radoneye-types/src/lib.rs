//! Platform-agnostic types for RadonEye radon monitors.
//!
//! This crate provides the shared domain records produced by the protocol
//! engine in `radoneye-core`, free of any Bluetooth dependency.
//!
//! # Features
//!
//! - Domain records: [`DeviceStatus`], [`HistoryReading`], [`HistoryPage`]
//! - Radon units and the [`UnitConverter`] with an explicit [`RoundingPolicy`]
//! - UUID constants for the RD200 GATT services
//! - Error types for frame parsing
//!
//! # Example
//!
//! ```
//! use radoneye_types::{RadonUnit, UnitConverter};
//!
//! let conv = UnitConverter::default();
//! assert_eq!(conv.convert(4.0, RadonUnit::PciL, RadonUnit::BqM3), 148.0);
//! ```

pub mod error;
pub mod types;
pub mod units;
pub mod uuid;

pub use error::{ParseError, ParseResult};
pub use types::{
    AlarmSettings, DeviceStatus, HistoryPage, HistoryReading, RadonValue, format_counts,
    format_uptime,
};
pub use units::{BQ_M3_PER_PCI_L, RadonUnit, RoundingPolicy, UnitConverter};

#[cfg(test)]
mod tests {
    use super::*;

    // --- HistoryPage parsing tests ---

    #[test]
    fn test_parse_history_page() {
        let bytes: [u8; 10] = [
            0x41, // preamble
            0x02, // page count
            0x01, // page number
            0x03, // value count
            0x0A, 0x00, // 10
            0x14, 0x00, // 20
            0x2C, 0x01, // 300
        ];

        let page = HistoryPage::from_bytes(&bytes).unwrap();
        assert_eq!(page.page_count, 2);
        assert_eq!(page.page_no, 1);
        assert_eq!(page.value_count, 3);
        assert_eq!(page.values, vec![10, 20, 300]);
    }

    #[test]
    fn test_parse_history_page_ignores_trailing_bytes() {
        let bytes = [0x41, 0x01, 0x01, 0x01, 0x05, 0x00, 0xFF, 0xFF];
        let page = HistoryPage::from_bytes(&bytes).unwrap();
        assert_eq!(page.values, vec![5]);
    }

    #[test]
    fn test_parse_history_page_empty() {
        let page = HistoryPage::from_bytes(&[0x41, 0x00, 0x00, 0x00]).unwrap();
        assert_eq!(page.page_count, 0);
        assert!(page.values.is_empty());
    }

    #[test]
    fn test_parse_history_page_short_header() {
        let result = HistoryPage::from_bytes(&[0x41, 0x01]);
        assert!(matches!(result, Err(ParseError::InvalidData(_))));
    }

    #[test]
    fn test_parse_history_page_truncated_values() {
        // Declares 3 values but carries only one and a half.
        let result = HistoryPage::from_bytes(&[0x41, 0x01, 0x01, 0x03, 0x01, 0x00, 0x02]);
        let err = result.unwrap_err();
        assert!(err.to_string().contains("expected at least 10 bytes"));
    }

    // --- Formatting tests ---

    #[test]
    fn test_format_uptime() {
        assert_eq!(format_uptime(11713), "8d03h13m");
        assert_eq!(format_uptime(0), "0d00h00m");
        assert_eq!(format_uptime(59), "0d00h59m");
        assert_eq!(format_uptime(24 * 60), "1d00h00m");
    }

    #[test]
    fn test_format_counts() {
        assert_eq!(format_counts(1, 4), "1/4");
        assert_eq!(format_counts(0, 0), "0/0");
    }

    // --- HistoryReading tests ---

    #[test]
    fn test_history_reading_accessors() {
        let conv = UnitConverter::default();
        let reading = HistoryReading::new(vec![conv.from_bq_m3(37.0), conv.from_bq_m3(74.0)]);
        assert_eq!(reading.len(), 2);
        assert_eq!(reading.values_bq_m3(), vec![37.0, 74.0]);
        assert_eq!(reading.values_pci_l(), vec![1.0, 2.0]);

        let collected: Vec<RadonValue> = reading.into_iter().collect();
        assert_eq!(collected[1].pci_l, 2.0);
    }

    #[test]
    fn test_history_reading_empty() {
        assert!(HistoryReading::empty().is_empty());
    }

    #[test]
    fn test_radon_value_in_unit() {
        let value = RadonValue {
            bq_m3: 111.0,
            pci_l: 3.0,
        };
        assert_eq!(value.in_unit(RadonUnit::BqM3), 111.0);
        assert_eq!(value.in_unit(RadonUnit::PciL), 3.0);
    }

    // --- Serialization tests ---

    #[cfg(feature = "serde")]
    #[test]
    fn test_status_serialization_omits_missing_fields() {
        let conv = UnitConverter::default();
        let status = DeviceStatus {
            serial: "RU22012020159".into(),
            model: "RD200".into(),
            firmware_version: "V1.2.4".into(),
            latest: conv.from_bq_m3(21.0),
            day_avg: conv.from_bq_m3(54.0),
            month_avg: conv.from_bq_m3(0.0),
            peak: conv.from_bq_m3(81.0),
            counts_current: 1,
            counts_previous: 4,
            counts: format_counts(1, 4),
            uptime_minutes: 11713,
            uptime: format_uptime(11713),
            display_unit: None,
            alarm: None,
        };

        let json = serde_json::to_value(&status).unwrap();
        assert_eq!(json["latest"]["bq_m3"], 21.0);
        assert_eq!(json["latest"]["pci_l"], 0.57);
        assert!(json.get("alarm").is_none());
        assert!(json.get("display_unit").is_none());
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_unit_serialization() {
        assert_eq!(
            serde_json::to_string(&RadonUnit::BqM3).unwrap(),
            "\"bq/m3\""
        );
        let unit: RadonUnit = serde_json::from_str("\"pci/l\"").unwrap();
        assert_eq!(unit, RadonUnit::PciL);
    }
}
