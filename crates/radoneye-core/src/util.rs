//! Utility functions for radoneye-core.

use std::fmt;

use btleplug::platform::PeripheralId;

/// Bytes shown per line of a [`HexDump`].
const DUMP_WIDTH: usize = 16;

/// Displays raw frame bytes as a hex dump with a printable ASCII column.
///
/// ```
/// use radoneye_core::util::HexDump;
///
/// let dump = HexDump(b"\xa1RD200").to_string();
/// assert!(dump.starts_with("a1 52 44 32 30 30"));
/// assert!(dump.ends_with("# .RD200"));
/// ```
pub struct HexDump<'a>(pub &'a [u8]);

impl fmt::Display for HexDump<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, chunk) in self.0.chunks(DUMP_WIDTH).enumerate() {
            if i > 0 {
                f.write_str("\n   ")?;
            }
            let hex = chunk
                .iter()
                .map(|b| format!("{b:02x}"))
                .collect::<Vec<_>>()
                .join(" ");
            let text: String = chunk
                .iter()
                .map(|&b| {
                    if b.is_ascii_graphic() || b == b' ' {
                        char::from(b)
                    } else {
                        '.'
                    }
                })
                .collect();
            write!(f, "{hex:<width$}# {text}", width = DUMP_WIDTH * 3)?;
        }
        Ok(())
    }
}

/// Format a peripheral ID as a string.
///
/// On macOS, peripheral IDs are UUIDs. On other platforms they wrap the
/// Bluetooth address.
pub fn format_peripheral_id(id: &PeripheralId) -> String {
    format!("{:?}", id)
        .trim_start_matches("PeripheralId(")
        .trim_end_matches(')')
        .to_string()
}

/// Create an identifier string from an address and peripheral ID.
///
/// On macOS where addresses are 00:00:00:00:00:00, uses the peripheral ID.
pub fn create_identifier(address: &str, peripheral_id: &PeripheralId) -> String {
    if address == "00:00:00:00:00:00" {
        format_peripheral_id(peripheral_id)
    } else {
        address.to_string()
    }
}
