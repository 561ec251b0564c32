//! First-generation RD200 protocol.
//!
//! A status snapshot is spread over several notification frames:
//!
//! | Preamble | Contents |
//! |----------|----------|
//! | `A4` | serial date and sequence (length-prefixed at 1) |
//! | `A6` | serial prefix (length-prefixed at 1) |
//! | `A8` | model (length-prefixed at 2) |
//! | `AF` | firmware version (length-prefixed at 1) |
//! | `50` | latest/day/month pCi/L (f32 at 2/6/10), counts (u16 at 14/16) |
//! | `51` | uptime minutes (u32 at 4), peak pCi/L (f32 at 12) |
//! | `AC` | display unit (2), alarm enabled (3), level pCi/L (f32 at 4), interval (8) |
//!
//! `AC` only carries settings on extended firmware.

use bytes::{BufMut, BytesMut};

use radoneye_types::{
    AlarmSettings, BQ_M3_PER_PCI_L, DeviceStatus, HistoryReading, RadonUnit, UnitConverter,
    format_counts, format_uptime,
};

use super::{
    Channels, FrameCodec, FrameSet, HistoryPlan, StatusPlan, interval_byte, read_f32, read_str_lp,
    read_u8, read_u16, read_u32, tagged, trim_field,
};
use crate::commands::{
    BEEP, Command, SET_ALARM, SET_UNIT, SETTINGS_MARKER, V1_HISTORY_DATA, V1_HISTORY_METADATA,
    V1_STATUS_BURST, V1_STATUS_FIRMWARE, V1_STATUS_SERIAL,
};
use crate::error::{Error, Result};
use crate::uuid::{V1_COMMAND, V1_HISTORY, V1_STATUS};
use crate::version::{HistoryScale, ProtocolVersion, V1Layout};

const FRAME_SERIAL_DATE: u8 = 0xA4;
const FRAME_SERIAL_PREFIX: u8 = 0xA6;
const FRAME_MODEL: u8 = 0xA8;
const FRAME_SETTINGS: u8 = 0xAC;
const FRAME_FIRMWARE: u8 = 0xAF;
const FRAME_MEASUREMENT: u8 = 0x50;
const FRAME_UPTIME: u8 = 0x51;
const FRAME_HISTORY_METADATA: u8 = 0xE8;

/// Codec for first-generation firmware.
#[derive(Debug, Clone, Copy)]
pub struct V1Codec {
    converter: UnitConverter,
    history_scale: HistoryScale,
    layout: V1Layout,
}

impl V1Codec {
    /// Create a V1 codec.
    pub fn new(converter: UnitConverter, history_scale: HistoryScale, layout: V1Layout) -> Self {
        Self {
            converter,
            history_scale,
            layout,
        }
    }

    fn decode_settings(&self, frame: &[u8]) -> Result<(RadonUnit, AlarmSettings)> {
        let unit = RadonUnit::try_from(read_u8(frame, 2)?)?;
        let alarm = AlarmSettings {
            enabled: read_u8(frame, 3)? == 0x01,
            level: self.converter.from_pci_l(f64::from(read_f32(frame, 4)?)),
            interval_minutes: u32::from(read_u8(frame, 8)?) * 10,
        };
        Ok((unit, alarm))
    }
}

impl FrameCodec for V1Codec {
    fn version(&self) -> ProtocolVersion {
        ProtocolVersion::V1 {
            history_scale: self.history_scale,
        }
    }

    fn channels(&self) -> Channels {
        Channels {
            command: V1_COMMAND,
            status: V1_STATUS,
            history: V1_HISTORY,
        }
    }

    fn converter(&self) -> UnitConverter {
        self.converter
    }

    fn status_plan(&self) -> StatusPlan {
        let mut required = vec![
            FRAME_SERIAL_DATE,
            FRAME_MODEL,
            FRAME_MEASUREMENT,
            FRAME_UPTIME,
            FRAME_FIRMWARE,
            FRAME_SERIAL_PREFIX,
        ];
        let mut optional = Vec::new();
        match self.layout {
            V1Layout::Auto => optional.push(FRAME_SETTINGS),
            V1Layout::Extended => required.push(FRAME_SETTINGS),
            V1Layout::Basic => {}
        }

        StatusPlan {
            commands: vec![
                Command::new(V1_STATUS_BURST),
                Command::new(V1_STATUS_FIRMWARE),
                Command::new(V1_STATUS_SERIAL),
            ],
            required,
            optional,
        }
    }

    fn decode_status(&self, frames: &FrameSet) -> Result<DeviceStatus> {
        let serial_date = read_str_lp(tagged(frames, FRAME_SERIAL_DATE)?, 1)?;
        let serial_prefix = read_str_lp(tagged(frames, FRAME_SERIAL_PREFIX)?, 1)?;
        let model = read_str_lp(tagged(frames, FRAME_MODEL)?, 2)?;
        let firmware = read_str_lp(tagged(frames, FRAME_FIRMWARE)?, 1)?;
        let measurement = tagged(frames, FRAME_MEASUREMENT)?;
        let uptime_frame = tagged(frames, FRAME_UPTIME)?;

        // The A4 string reads e.g. "20201202SN0159": date at 2..8, sequence last.
        let chars: Vec<char> = serial_date.chars().collect();
        let date: String = chars.iter().skip(2).take(6).collect();
        let sequence: String = chars[chars.len().saturating_sub(4)..].iter().collect();
        let serial = format!("{serial_prefix}{date}{sequence}");

        let pci = |offset| -> Result<_> {
            Ok(self
                .converter
                .from_pci_l(f64::from(read_f32(measurement, offset)?)))
        };
        let latest = pci(2)?;
        let day_avg = pci(6)?;
        let month_avg = pci(10)?;
        let counts_current = read_u16(measurement, 14)?;
        let counts_previous = read_u16(measurement, 16)?;

        let uptime_minutes = read_u32(uptime_frame, 4)?;
        let peak = self
            .converter
            .from_pci_l(f64::from(read_f32(uptime_frame, 12)?));

        let settings = match (self.layout, frames.get(&FRAME_SETTINGS)) {
            (V1Layout::Basic, _) | (_, None) => None,
            (_, Some(frame)) => Some(self.decode_settings(frame)?),
        };

        Ok(DeviceStatus {
            serial,
            model: trim_field(&model),
            firmware_version: trim_field(&firmware),
            latest,
            day_avg,
            month_avg,
            peak,
            counts_current,
            counts_previous,
            counts: format_counts(counts_current, counts_previous),
            uptime_minutes,
            uptime: format_uptime(uptime_minutes),
            display_unit: settings.map(|(unit, _)| unit),
            alarm: settings.map(|(_, alarm)| alarm),
        })
    }

    fn history_plan(&self) -> HistoryPlan {
        HistoryPlan::TwoPhase {
            metadata_request: Command::new(V1_HISTORY_METADATA),
            metadata_tag: FRAME_HISTORY_METADATA,
            data_request: Command::new(V1_HISTORY_DATA),
        }
    }

    fn decode_history_count(&self, frame: &[u8]) -> Result<u16> {
        read_u16(frame, 2)
    }

    fn decode_history_blob(&self, data: &[u8], declared_count: u16) -> Result<HistoryReading> {
        let needed = usize::from(declared_count) * 2;
        if data.len() < needed {
            return Err(Error::InvalidData(format!(
                "history stream: expected {needed} bytes, got {}",
                data.len()
            )));
        }

        let divisor = self.history_scale.divisor();
        let values = data[..needed]
            .chunks_exact(2)
            .map(|pair| {
                let raw = u16::from_le_bytes([pair[0], pair[1]]);
                self.converter.from_pci_l(f64::from(raw) / divisor)
            })
            .collect();
        Ok(HistoryReading::new(values))
    }

    fn encode_beep(&self) -> Command {
        Command::new(BEEP)
    }

    fn encode_set_alarm(
        &self,
        enabled: bool,
        level_bq_m3: f64,
        interval_minutes: u32,
    ) -> Result<Command> {
        let level_pci_l = level_bq_m3 / BQ_M3_PER_PCI_L;
        if !level_pci_l.is_finite() || level_pci_l < 0.0 || level_pci_l > f64::from(f32::MAX) {
            return Err(Error::invalid_config(format!(
                "alarm level {level_bq_m3} Bq/m³ is out of range"
            )));
        }

        let mut payload = BytesMut::with_capacity(7);
        payload.put_u8(SETTINGS_MARKER);
        payload.put_u8(u8::from(enabled));
        payload.put_f32_le(level_pci_l as f32);
        payload.put_u8(interval_byte(interval_minutes)?);
        Ok(Command::with_payload(SET_ALARM, payload.to_vec()))
    }

    fn encode_set_unit(&self, unit: RadonUnit) -> Command {
        Command::with_payload(SET_UNIT, [SETTINGS_MARKER, unit.to_byte()])
    }
}
