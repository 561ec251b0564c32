//! Frame encoding and decoding, one codec per protocol version.
//!
//! Frames are decoded at fixed little-endian offsets. The only validation the
//! protocol offers is the leading preamble byte identifying the frame type.

mod v1;
mod v2;

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use bytes::Buf;
use uuid::Uuid;

use radoneye_types::{DeviceStatus, HistoryPage, HistoryReading, RadonUnit, UnitConverter};

use crate::commands::Command;
use crate::error::{Error, Result};
use crate::version::{ProtocolVersion, V1Layout};

pub use v1::V1Codec;
pub use v2::V2Codec;

#[cfg(test)]
pub(crate) use v1::tests as v1_frames;
#[cfg(test)]
pub(crate) use v2::tests as v2_frames;

/// Frames collected for one status read, keyed by preamble.
pub type FrameSet = BTreeMap<u8, Vec<u8>>;

/// Characteristics used by one protocol version.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Channels {
    /// Commands are written here.
    pub command: Uuid,
    /// Status (and V1 history metadata) frames arrive here.
    pub status: Uuid,
    /// History frames arrive here.
    pub history: Uuid,
}

/// How to read a status snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusPlan {
    /// Commands to write, in order.
    pub commands: Vec<Command>,
    /// Preambles that must all be observed.
    pub required: Vec<u8>,
    /// Preambles worth waiting for briefly once the required set is complete.
    pub optional: Vec<u8>,
}

/// How to read the stored history.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HistoryPlan {
    /// One request answered by numbered pages on the history channel.
    Paged {
        /// Request command.
        request: Command,
        /// Preamble of every page.
        page_tag: u8,
    },
    /// A metadata frame declaring the sample count, then a raw byte stream.
    TwoPhase {
        /// Command requesting the metadata frame.
        metadata_request: Command,
        /// Preamble of the metadata frame (status channel).
        metadata_tag: u8,
        /// Command starting the raw stream (history channel).
        data_request: Command,
    },
}

/// Encodes commands and decodes frames for one protocol version.
pub trait FrameCodec: Send + Sync + fmt::Debug {
    /// Protocol version implemented by this codec.
    fn version(&self) -> ProtocolVersion;

    /// Characteristics used by this version.
    fn channels(&self) -> Channels;

    /// Converter used when building paired radon values.
    fn converter(&self) -> UnitConverter;

    // --- Status ---

    /// Commands and frames making up a status read.
    fn status_plan(&self) -> StatusPlan;

    /// Decode a complete set of status frames.
    fn decode_status(&self, frames: &FrameSet) -> Result<DeviceStatus>;

    // --- History ---

    /// Exchange shape used for history reads.
    fn history_plan(&self) -> HistoryPlan;

    /// Decode one history page.
    fn decode_history_page(&self, frame: &[u8]) -> Result<HistoryPage> {
        let _ = frame;
        Err(Error::InvalidData(format!(
            "paged history is not part of the {} protocol",
            self.version()
        )))
    }

    /// Decode the sample count declared by a history metadata frame.
    fn decode_history_count(&self, frame: &[u8]) -> Result<u16> {
        let _ = frame;
        Err(Error::InvalidData(format!(
            "history metadata is not part of the {} protocol",
            self.version()
        )))
    }

    /// Decode a raw history stream of `declared_count` samples.
    fn decode_history_blob(&self, data: &[u8], declared_count: u16) -> Result<HistoryReading> {
        let _ = (data, declared_count);
        Err(Error::InvalidData(format!(
            "raw history is not part of the {} protocol",
            self.version()
        )))
    }

    // --- Settings ---

    /// Encode a beep request.
    fn encode_beep(&self) -> Command;

    /// Encode an alarm configuration.
    fn encode_set_alarm(
        &self,
        enabled: bool,
        level_bq_m3: f64,
        interval_minutes: u32,
    ) -> Result<Command>;

    /// Encode a display unit change.
    fn encode_set_unit(&self, unit: RadonUnit) -> Command;
}

/// Build the codec for a detected version.
pub fn for_version(
    version: ProtocolVersion,
    converter: UnitConverter,
    v1_layout: V1Layout,
) -> Arc<dyn FrameCodec> {
    match version {
        ProtocolVersion::V1 { history_scale } => {
            Arc::new(V1Codec::new(converter, history_scale, v1_layout))
        }
        ProtocolVersion::V2 => Arc::new(V2Codec::new(converter)),
        ProtocolVersion::V3Layout => Arc::new(V2Codec::pinned_v3(converter)),
    }
}

// --- Field readers shared by the codecs ---

pub(crate) fn tagged<'a>(frames: &'a FrameSet, tag: u8) -> Result<&'a [u8]> {
    frames
        .get(&tag)
        .map(Vec::as_slice)
        .ok_or_else(|| Error::InvalidData(format!("missing frame 0x{tag:02X}")))
}

fn field<'a>(frame: &'a [u8], offset: usize, len: usize) -> Result<&'a [u8]> {
    frame.get(offset..offset + len).ok_or_else(|| {
        Error::InvalidData(format!(
            "frame 0x{:02X} too short: need {} bytes, got {}",
            frame.first().copied().unwrap_or_default(),
            offset + len,
            frame.len()
        ))
    })
}

fn read_u8(frame: &[u8], offset: usize) -> Result<u8> {
    Ok(field(frame, offset, 1)?[0])
}

fn read_u16(frame: &[u8], offset: usize) -> Result<u16> {
    Ok(field(frame, offset, 2)?.get_u16_le())
}

fn read_u32(frame: &[u8], offset: usize) -> Result<u32> {
    Ok(field(frame, offset, 4)?.get_u32_le())
}

fn read_f32(frame: &[u8], offset: usize) -> Result<f32> {
    Ok(field(frame, offset, 4)?.get_f32_le())
}

/// Fixed-length ASCII field.
fn read_str(frame: &[u8], offset: usize, len: usize) -> Result<String> {
    Ok(String::from_utf8_lossy(field(frame, offset, len)?).into_owned())
}

/// ASCII field whose length is stored in the byte at `offset`.
fn read_str_lp(frame: &[u8], offset: usize) -> Result<String> {
    let len = usize::from(read_u8(frame, offset)?);
    read_str(frame, offset + 1, len)
}

fn trim_field(value: &str) -> String {
    value
        .trim_end_matches(|c: char| c.is_whitespace() || c == '\0')
        .to_string()
}

/// Alarm interval byte: minutes in tens, rounded up.
fn interval_byte(interval_minutes: u32) -> Result<u8> {
    u8::try_from(interval_minutes.div_ceil(10)).map_err(|_| {
        Error::invalid_config(format!(
            "alarm interval {interval_minutes} min does not fit the device range (max 2550)"
        ))
    })
}
