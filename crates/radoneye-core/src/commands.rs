//! Command opcodes and the outbound [`Command`] value.
//!
//! Every command is written to the command characteristic of the active
//! service. The first byte is the opcode; replies arrive as notification
//! frames whose first byte (the preamble) usually repeats it.

use bytes::{BufMut, BytesMut};

// --- V1 opcodes ---

/// Request the status burst (frames A4, A8, AC, 50, 51).
pub const V1_STATUS_BURST: u8 = 0x10;

/// Request the serial prefix frame (A6).
pub const V1_STATUS_SERIAL: u8 = 0xA6;

/// Request the firmware version frame (AF).
pub const V1_STATUS_FIRMWARE: u8 = 0xAF;

/// Request the measurement frame (50) on its own.
pub const V1_STATUS_MEASUREMENT: u8 = 0x50;

/// Request the uptime/peak frame (51) on its own.
pub const V1_STATUS_UPTIME: u8 = 0x51;

/// Request the history metadata frame (E8).
pub const V1_HISTORY_METADATA: u8 = 0xE8;

/// Request the raw history stream.
pub const V1_HISTORY_DATA: u8 = 0xE9;

// --- V2 / V3 opcodes ---

/// Request the single status frame.
pub const V2_STATUS: u8 = 0x40;

/// Request the paged history.
pub const V2_HISTORY: u8 = 0x41;

// --- Shared opcodes ---

/// Make the device beep.
pub const BEEP: u8 = 0xA1;

/// Configure the radon alarm.
pub const SET_ALARM: u8 = 0xAA;

/// Configure the display unit.
pub const SET_UNIT: u8 = 0xA2;

/// Second byte of every settings write.
pub const SETTINGS_MARKER: u8 = 0x11;

/// An outbound command: an opcode followed by an optional payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    opcode: u8,
    payload: Vec<u8>,
}

impl Command {
    /// A command consisting of the opcode alone.
    #[must_use]
    pub fn new(opcode: u8) -> Self {
        Self {
            opcode,
            payload: Vec::new(),
        }
    }

    /// A command with a payload.
    #[must_use]
    pub fn with_payload(opcode: u8, payload: impl Into<Vec<u8>>) -> Self {
        Self {
            opcode,
            payload: payload.into(),
        }
    }

    /// The opcode byte.
    pub fn opcode(&self) -> u8 {
        self.opcode
    }

    /// The payload following the opcode.
    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    /// Encode the command as written on the wire.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut buf = BytesMut::with_capacity(1 + self.payload.len());
        buf.put_u8(self.opcode);
        buf.put_slice(&self.payload);
        buf.to_vec()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_opcode_values() {
        assert_eq!(V1_STATUS_BURST, 0x10);
        assert_eq!(V1_STATUS_SERIAL, 0xA6);
        assert_eq!(V1_STATUS_FIRMWARE, 0xAF);
        assert_eq!(V1_STATUS_MEASUREMENT, 0x50);
        assert_eq!(V1_STATUS_UPTIME, 0x51);
        assert_eq!(V1_HISTORY_METADATA, 0xE8);
        assert_eq!(V1_HISTORY_DATA, 0xE9);
        assert_eq!(V2_STATUS, 0x40);
        assert_eq!(V2_HISTORY, 0x41);
        assert_eq!(BEEP, 0xA1);
        assert_eq!(SET_ALARM, 0xAA);
        assert_eq!(SET_UNIT, 0xA2);
    }

    #[test]
    fn test_command_bytes() {
        assert_eq!(Command::new(BEEP).to_bytes(), vec![0xA1]);
        let cmd = Command::with_payload(SET_UNIT, [SETTINGS_MARKER, 0x01]);
        assert_eq!(cmd.opcode(), SET_UNIT);
        assert_eq!(cmd.payload(), &[0x11, 0x01]);
        assert_eq!(cmd.to_bytes(), vec![0xA2, 0x11, 0x01]);
    }
}
