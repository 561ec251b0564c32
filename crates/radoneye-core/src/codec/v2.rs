//! Second and third generation protocol.
//!
//! A status snapshot is one frame of at least 53 bytes. All radon values are
//! whole Bq/m³. The byte at offset 1 selects the serial/model layout:
//! `0x03` marks the V3 layout, anything else is V2.

use bytes::{BufMut, BytesMut};

use radoneye_types::{
    AlarmSettings, DeviceStatus, HistoryPage, RadonUnit, UnitConverter, format_counts,
    format_uptime,
};

use super::{
    Channels, FrameCodec, FrameSet, HistoryPlan, StatusPlan, interval_byte, read_str, read_u8,
    read_u16, read_u32, tagged, trim_field,
};
use crate::commands::{BEEP, Command, SET_ALARM, SET_UNIT, SETTINGS_MARKER, V2_HISTORY, V2_STATUS};
use crate::error::{Error, Result};
use crate::uuid::{V2_COMMAND, V2_HISTORY as V2_HISTORY_CHANNEL, V2_STATUS as V2_STATUS_CHANNEL};
use crate::version::ProtocolVersion;

/// Minimum length of a status frame.
pub const STATUS_MIN_BYTES: usize = 53;

const LAYOUT_MARKER_OFFSET: usize = 1;
const V3_LAYOUT_MARKER: u8 = 0x03;

/// Serial and model placement inside the status frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StatusLayout {
    V2,
    V3,
}

impl StatusLayout {
    /// `(offset, len)` of the three serial parts in output order, then the model.
    fn fields(self) -> ([(usize, usize); 3], (usize, usize)) {
        match self {
            StatusLayout::V2 => ([(8, 3), (2, 6), (11, 4)], (16, 6)),
            StatusLayout::V3 => ([(2, 3), (5, 6), (11, 4)], (15, 6)),
        }
    }
}

/// Codec for the single-frame status protocol.
#[derive(Debug, Clone, Copy)]
pub struct V2Codec {
    converter: UnitConverter,
    pinned: Option<StatusLayout>,
}

impl V2Codec {
    /// Codec that picks the layout from each frame's marker byte.
    pub fn new(converter: UnitConverter) -> Self {
        Self {
            converter,
            pinned: None,
        }
    }

    /// Codec that always uses the V3 layout.
    pub fn pinned_v3(converter: UnitConverter) -> Self {
        Self {
            converter,
            pinned: Some(StatusLayout::V3),
        }
    }

    fn layout(&self, frame: &[u8]) -> StatusLayout {
        self.pinned.unwrap_or_else(|| {
            if frame.get(LAYOUT_MARKER_OFFSET) == Some(&V3_LAYOUT_MARKER) {
                StatusLayout::V3
            } else {
                StatusLayout::V2
            }
        })
    }
}

impl FrameCodec for V2Codec {
    fn version(&self) -> ProtocolVersion {
        match self.pinned {
            Some(StatusLayout::V3) => ProtocolVersion::V3Layout,
            _ => ProtocolVersion::V2,
        }
    }

    fn channels(&self) -> Channels {
        Channels {
            command: V2_COMMAND,
            status: V2_STATUS_CHANNEL,
            history: V2_HISTORY_CHANNEL,
        }
    }

    fn converter(&self) -> UnitConverter {
        self.converter
    }

    fn status_plan(&self) -> StatusPlan {
        StatusPlan {
            commands: vec![Command::new(V2_STATUS)],
            required: vec![V2_STATUS],
            optional: Vec::new(),
        }
    }

    fn decode_status(&self, frames: &FrameSet) -> Result<DeviceStatus> {
        let frame = tagged(frames, V2_STATUS)?;
        if frame.len() < STATUS_MIN_BYTES {
            return Err(Error::InvalidData(format!(
                "status frame: expected at least {STATUS_MIN_BYTES} bytes, got {}",
                frame.len()
            )));
        }

        let (serial_parts, (model_offset, model_len)) = self.layout(frame).fields();
        let mut serial = String::new();
        for (offset, len) in serial_parts {
            serial.push_str(&read_str(frame, offset, len)?);
        }

        let bq = |offset| -> Result<_> {
            Ok(self
                .converter
                .from_bq_m3(f64::from(read_u16(frame, offset)?)))
        };

        let alarm = AlarmSettings {
            enabled: read_u8(frame, 29)? == 0x01,
            level: bq(30)?,
            interval_minutes: u32::from(read_u8(frame, 32)?) * 10,
        };

        let counts_current = read_u16(frame, 39)?;
        let counts_previous = read_u16(frame, 41)?;
        let uptime_minutes = read_u32(frame, 43)?;

        Ok(DeviceStatus {
            serial,
            model: trim_field(&read_str(frame, model_offset, model_len)?),
            firmware_version: trim_field(&read_str(frame, 22, 6)?),
            latest: bq(33)?,
            day_avg: bq(35)?,
            month_avg: bq(37)?,
            peak: bq(51)?,
            counts_current,
            counts_previous,
            counts: format_counts(counts_current, counts_previous),
            uptime_minutes,
            uptime: format_uptime(uptime_minutes),
            display_unit: Some(RadonUnit::try_from(read_u8(frame, 28)?)?),
            alarm: Some(alarm),
        })
    }

    fn history_plan(&self) -> HistoryPlan {
        HistoryPlan::Paged {
            request: Command::new(V2_HISTORY),
            page_tag: V2_HISTORY,
        }
    }

    fn decode_history_page(&self, frame: &[u8]) -> Result<HistoryPage> {
        match frame.first() {
            Some(&V2_HISTORY) => Ok(HistoryPage::from_bytes(frame)?),
            other => Err(Error::InvalidData(format!(
                "history page: unexpected preamble {other:02X?}"
            ))),
        }
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
        let level = level_bq_m3.round();
        if !(0.0..=f64::from(u16::MAX)).contains(&level) {
            return Err(Error::invalid_config(format!(
                "alarm level {level_bq_m3} Bq/m³ is out of range (0..=65535)"
            )));
        }

        let mut payload = BytesMut::with_capacity(5);
        payload.put_u8(SETTINGS_MARKER);
        payload.put_u8(u8::from(enabled));
        payload.put_u16_le(level as u16);
        payload.put_u8(interval_byte(interval_minutes)?);
        Ok(Command::with_payload(SET_ALARM, payload.to_vec()))
    }

    fn encode_set_unit(&self, unit: RadonUnit) -> Command {
        Command::with_payload(SET_UNIT, [SETTINGS_MARKER, unit.to_byte()])
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Build a status frame with the given layout marker and latest reading.
    pub(crate) fn status_frame(marker: u8, latest_bq_m3: u16) -> Vec<u8> {
        let mut frame = vec![0u8; STATUS_MIN_BYTES];
        frame[0] = V2_STATUS;
        frame[1] = marker;
        if marker == V3_LAYOUT_MARKER {
            frame[2..5].copy_from_slice(b"RU2");
            frame[5..11].copy_from_slice(b"201202");
            frame[11..15].copy_from_slice(b"0159");
            frame[15..21].copy_from_slice(b"RD200P");
        } else {
            frame[2..8].copy_from_slice(b"201202");
            frame[8..11].copy_from_slice(b"RU2");
            frame[11..15].copy_from_slice(b"0159");
            frame[16..22].copy_from_slice(b"RD200P");
        }
        frame[22..28].copy_from_slice(b"V2.0.1");
        frame[28] = 0x01; // display unit Bq/m³
        frame[29] = 0x01; // alarm on
        frame[30..32].copy_from_slice(&148u16.to_le_bytes());
        frame[32] = 6; // 60 minutes
        frame[33..35].copy_from_slice(&latest_bq_m3.to_le_bytes());
        frame[35..37].copy_from_slice(&54u16.to_le_bytes());
        frame[37..39].copy_from_slice(&0u16.to_le_bytes());
        frame[39..41].copy_from_slice(&1u16.to_le_bytes());
        frame[41..43].copy_from_slice(&4u16.to_le_bytes());
        frame[43..47].copy_from_slice(&11713u32.to_le_bytes());
        frame[51..53].copy_from_slice(&81u16.to_le_bytes());
        frame
    }

    fn frames(frame: Vec<u8>) -> FrameSet {
        FrameSet::from([(V2_STATUS, frame)])
    }

    #[test]
    fn test_decode_v2_status() {
        let codec = V2Codec::new(UnitConverter::default());
        let status = codec.decode_status(&frames(status_frame(0x35, 21))).unwrap();

        assert_eq!(status.serial, "RU22012020159");
        assert_eq!(status.model, "RD200P");
        assert_eq!(status.firmware_version, "V2.0.1");
        assert_eq!(status.latest.bq_m3, 21.0);
        assert_eq!(status.latest.pci_l, 0.57);
        assert_eq!(status.day_avg.bq_m3, 54.0);
        assert_eq!(status.day_avg.pci_l, 1.46);
        assert_eq!(status.peak.bq_m3, 81.0);
        assert_eq!(status.peak.pci_l, 2.19);
        assert_eq!(status.counts, "1/4");
        assert_eq!(status.uptime, "8d03h13m");
        assert_eq!(status.display_unit, Some(RadonUnit::BqM3));

        let alarm = status.alarm.unwrap();
        assert!(alarm.enabled);
        assert_eq!(alarm.level.bq_m3, 148.0);
        assert_eq!(alarm.level.pci_l, 4.0);
        assert_eq!(alarm.interval_minutes, 60);
    }

    #[test]
    fn test_decode_v3_layout_by_marker() {
        let codec = V2Codec::new(UnitConverter::default());
        let status = codec
            .decode_status(&frames(status_frame(V3_LAYOUT_MARKER, 21)))
            .unwrap();
        assert_eq!(status.serial, "RU22012020159");
        assert_eq!(status.model, "RD200P");
    }

    #[test]
    fn test_pinned_v3_ignores_marker() {
        let mut frame = status_frame(V3_LAYOUT_MARKER, 21);
        frame[1] = 0x35;
        let codec = V2Codec::pinned_v3(UnitConverter::default());
        assert_eq!(codec.version(), ProtocolVersion::V3Layout);
        let status = codec.decode_status(&frames(frame)).unwrap();
        assert_eq!(status.serial, "RU22012020159");
    }

    #[test]
    fn test_decode_status_exact_values() {
        let codec = V2Codec::new(UnitConverter::exact());
        let status = codec.decode_status(&frames(status_frame(0x35, 21))).unwrap();
        assert_eq!(status.latest.bq_m3, 21.0);
        assert!((status.latest.pci_l - 21.0 / 37.0).abs() < 1e-12);
    }

    #[test]
    fn test_decode_status_short_frame() {
        let codec = V2Codec::new(UnitConverter::default());
        let mut frame = status_frame(0x35, 21);
        frame.truncate(52);
        let result = codec.decode_status(&frames(frame));
        assert!(matches!(result, Err(Error::InvalidData(_))));
    }

    #[test]
    fn test_decode_status_bad_unit_byte() {
        let codec = V2Codec::new(UnitConverter::default());
        let mut frame = status_frame(0x35, 21);
        frame[28] = 0x09;
        let result = codec.decode_status(&frames(frame));
        assert!(matches!(result, Err(Error::InvalidUnit(_))));
    }

    #[test]
    fn test_decode_history_page() {
        let codec = V2Codec::new(UnitConverter::default());
        let page = codec
            .decode_history_page(&[0x41, 0x02, 0x01, 0x02, 0x0A, 0x00, 0x14, 0x00])
            .unwrap();
        assert_eq!(page.page_no, 1);
        assert_eq!(page.page_count, 2);
        assert_eq!(page.values, vec![10, 20]);

        assert!(codec.decode_history_page(&[0x40, 0x01, 0x01, 0x00]).is_err());
    }

    #[test]
    fn test_encode_commands() {
        let codec = V2Codec::new(UnitConverter::default());
        assert_eq!(codec.encode_beep().to_bytes(), vec![0xA1]);
        assert_eq!(
            codec.encode_set_unit(RadonUnit::PciL).to_bytes(),
            vec![0xA2, 0x11, 0x00]
        );
        assert_eq!(
            codec.encode_set_alarm(true, 148.0, 60).unwrap().to_bytes(),
            vec![0xAA, 0x11, 0x01, 0x94, 0x00, 0x06]
        );
        // Interval rounds up to the next ten minutes.
        assert_eq!(
            codec.encode_set_alarm(false, 100.4, 15).unwrap().to_bytes(),
            vec![0xAA, 0x11, 0x00, 0x64, 0x00, 0x02]
        );
    }

    #[test]
    fn test_encode_alarm_out_of_range() {
        let codec = V2Codec::new(UnitConverter::default());
        assert!(matches!(
            codec.encode_set_alarm(true, 70_000.0, 60),
            Err(Error::InvalidConfig(_))
        ));
        assert!(matches!(
            codec.encode_set_alarm(true, 100.0, 3000),
            Err(Error::InvalidConfig(_))
        ));
    }
}
