//! Output formatting for status, history and scan results.
//!
//! Text output is meant for people and line-based tools; JSON output is
//! compact, one document per line.

use std::collections::BTreeMap;

use anyhow::Result;
use radoneye_core::DiscoveredDevice;
use radoneye_types::{DeviceStatus, HistoryReading, RadonUnit};
use serde_json::{Map, Value, json};

use crate::cli::OutputFormat;

/// Flatten nested objects into one level, joining keys with `_`.
///
/// `{"latest": {"bq_m3": 21.0}}` becomes `{"latest_bq_m3": 21.0}`.
pub fn flatten(value: &Value) -> BTreeMap<String, Value> {
    let mut out = BTreeMap::new();
    if let Value::Object(map) = value {
        flatten_into(&mut out, None, map);
    }
    out
}

fn flatten_into(out: &mut BTreeMap<String, Value>, prefix: Option<&str>, map: &Map<String, Value>) {
    for (key, value) in map {
        let key = match prefix {
            Some(prefix) => format!("{prefix}_{key}"),
            None => key.clone(),
        };
        match value {
            Value::Object(inner) => flatten_into(out, Some(&key), inner),
            other => {
                out.insert(key, other.clone());
            }
        }
    }
}

/// Render a scalar for text output. Strings lose their quotes.
fn text_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Format a status snapshot as sorted `key = value` lines or a flat JSON object.
pub fn format_status(status: &DeviceStatus, format: OutputFormat) -> Result<String> {
    let flat = flatten(&serde_json::to_value(status)?);
    Ok(match format {
        OutputFormat::Json => serde_json::to_string(&flat)?,
        OutputFormat::Text => flat
            .iter()
            .map(|(key, value)| format!("{key} = {}", text_value(value)))
            .collect::<Vec<_>>()
            .join("\n"),
    })
}

/// Format history as tab-separated rows (1-based) or a JSON object of two arrays.
pub fn format_history(history: &HistoryReading, format: OutputFormat) -> Result<String> {
    Ok(match format {
        OutputFormat::Json => serde_json::to_string(&json!({
            "values_bq_m3": history.values_bq_m3(),
            "values_pci_l": history.values_pci_l(),
        }))?,
        OutputFormat::Text => {
            let mut lines = vec!["#\tBq/m3\tpCi/L".to_string()];
            for (index, value) in history.values().iter().enumerate() {
                lines.push(format!("{}\t{}\t{}", index + 1, value.bq_m3, value.pci_l));
            }
            lines.join("\n")
        }
    })
}

/// Format one scan result.
pub fn format_device(device: &DiscoveredDevice, format: OutputFormat) -> Result<String> {
    let name = device.name.as_deref().unwrap_or("");
    Ok(match format {
        OutputFormat::Json => serde_json::to_string(&json!({
            "address": device.identifier,
            "name": device.name,
            "rssi": device.rssi,
        }))?,
        OutputFormat::Text => format!("{}\t{}", device.identifier, name),
    })
}

/// Format a bare unit, e.g. for `unit --output json`.
pub fn format_unit(unit: RadonUnit) -> Result<String> {
    Ok(serde_json::to_string(&unit)?)
}

/// One-line summary of an alarm change.
pub fn format_alarm(
    enabled: bool,
    level: f64,
    unit: RadonUnit,
    interval_minutes: u32,
    format: OutputFormat,
) -> Result<String> {
    Ok(match format {
        OutputFormat::Json => serde_json::to_string(&json!({
            "enabled": enabled,
            "level": level,
            "unit": unit,
            "interval_minutes": interval_minutes,
        }))?,
        OutputFormat::Text if enabled => format!(
            "Setup alarm: enabled, level = {level} {unit}, interval = {interval_minutes} mins"
        ),
        OutputFormat::Text => "Setup alarm: disabled".to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use radoneye_types::{AlarmSettings, RadonValue, format_counts, format_uptime};

    fn value(bq_m3: f64, pci_l: f64) -> RadonValue {
        RadonValue { bq_m3, pci_l }
    }

    fn sample_status() -> DeviceStatus {
        DeviceStatus {
            serial: "RU22012020159".to_string(),
            model: "RD200".to_string(),
            firmware_version: "V1.2.4".to_string(),
            latest: value(21.0, 0.58),
            day_avg: value(54.0, 1.47),
            month_avg: value(0.0, 0.0),
            peak: value(81.0, 2.2),
            counts_current: 1,
            counts_previous: 4,
            counts: format_counts(1, 4),
            uptime_minutes: 11713,
            uptime: format_uptime(11713),
            display_unit: None,
            alarm: None,
        }
    }

    #[test]
    fn test_flatten_nested_objects() {
        let flat = flatten(&json!({
            "a": {"b": 1, "c": {"d": "x"}},
            "e": [1, 2],
        }));
        assert_eq!(flat.get("a_b"), Some(&json!(1)));
        assert_eq!(flat.get("a_c_d"), Some(&json!("x")));
        assert_eq!(flat.get("e"), Some(&json!([1, 2])));
        assert_eq!(flat.len(), 3);
    }

    #[test]
    fn test_status_text_is_sorted_key_value_lines() {
        let text = format_status(&sample_status(), OutputFormat::Text).unwrap();
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(lines.first(), Some(&"counts = 1/4"));
        assert!(lines.contains(&"serial = RU22012020159"));
        assert!(lines.contains(&"latest_bq_m3 = 21.0"));
        assert!(lines.contains(&"latest_pci_l = 0.58"));
        assert!(lines.contains(&"uptime = 8d03h13m"));
        assert!(!text.contains("display_unit"));
        assert!(!text.contains("alarm"));

        let mut sorted = lines.clone();
        sorted.sort_unstable();
        assert_eq!(lines, sorted);
    }

    #[test]
    fn test_status_json_is_flat_and_compact() {
        let mut status = sample_status();
        status.display_unit = Some(RadonUnit::BqM3);
        status.alarm = Some(AlarmSettings {
            enabled: true,
            level: value(148.0, 4.0),
            interval_minutes: 60,
        });

        let out = format_status(&status, OutputFormat::Json).unwrap();
        assert!(!out.contains(' '));
        assert!(!out.contains('\n'));

        let parsed: Value = serde_json::from_str(&out).unwrap();
        assert_eq!(parsed["alarm_enabled"], json!(true));
        assert_eq!(parsed["alarm_level_bq_m3"], json!(148.0));
        assert_eq!(parsed["alarm_interval_minutes"], json!(60));
        assert_eq!(parsed["display_unit"], json!("bq/m3"));
        assert_eq!(parsed["peak_pci_l"], json!(2.2));
    }

    #[test]
    fn test_history_text() {
        let history = HistoryReading::new(vec![value(49.0, 1.32), value(26.0, 0.7)]);
        let text = format_history(&history, OutputFormat::Text).unwrap();
        assert_eq!(text, "#\tBq/m3\tpCi/L\n1\t49\t1.32\n2\t26\t0.7");
    }

    #[test]
    fn test_history_text_empty_has_header_only() {
        let text = format_history(&HistoryReading::empty(), OutputFormat::Text).unwrap();
        assert_eq!(text, "#\tBq/m3\tpCi/L");
    }

    #[test]
    fn test_history_json() {
        let history = HistoryReading::new(vec![value(49.0, 1.32), value(26.0, 0.7)]);
        let out = format_history(&history, OutputFormat::Json).unwrap();
        assert_eq!(
            out,
            r#"{"values_bq_m3":[49.0,26.0],"values_pci_l":[1.32,0.7]}"#
        );
    }

    #[test]
    fn test_unit_json() {
        assert_eq!(format_unit(RadonUnit::PciL).unwrap(), "\"pci/l\"");
    }

    #[test]
    fn test_alarm_summary() {
        assert_eq!(
            format_alarm(true, 2.5, RadonUnit::PciL, 60, OutputFormat::Text).unwrap(),
            "Setup alarm: enabled, level = 2.5 pci/l, interval = 60 mins"
        );
        assert_eq!(
            format_alarm(false, 2.0, RadonUnit::PciL, 60, OutputFormat::Text).unwrap(),
            "Setup alarm: disabled"
        );

        let out = format_alarm(true, 150.0, RadonUnit::BqM3, 30, OutputFormat::Json).unwrap();
        let parsed: Value = serde_json::from_str(&out).unwrap();
        assert_eq!(parsed["unit"], json!("bq/m3"));
        assert_eq!(parsed["interval_minutes"], json!(30));
    }
}
