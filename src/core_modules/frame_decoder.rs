// THEORY:
// The frame decoder gives meaning to the 64 sampled bits. The transmitter's
// symbol layout is fixed:
//
//   bits  0-7   sync header (0b1011_1001 by default)
//   bits  8-15  temperature, degrees Celsius
//   bits 16-23  relative humidity, percent
//   bits 24-31  distance, centimeters
//   bits 32-63  reserved
//
// Every field is an unsigned byte, most significant bit first. The header is the
// only integrity check the link has: a frame whose header does not match was
// sampled from a misaligned grid, a half-switched LED array or noise, and its
// payload is discarded. That is an everyday event on an optical link, so it is
// reported as a status, never as an error.

use crate::core_modules::bit_sampler::Bitstream;
use serde::Serialize;

/// Decoded sensor payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Telemetry {
    pub temperature: u8,
    pub humidity: u8,
    pub distance: u8,
}

impl Telemetry {
    /// Builds the 64-bit symbol a transmitter would display for this payload.
    /// `reserved` fills bits 32-63.
    pub fn encode(&self, sync_pattern: u8, reserved: u32) -> Bitstream {
        let word = (u64::from(sync_pattern) << 56)
            | (u64::from(self.temperature) << 48)
            | (u64::from(self.humidity) << 40)
            | (u64::from(self.distance) << 32)
            | u64::from(reserved);
        Bitstream::from_word(word)
    }
}

/// Why a record is or is not valid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FrameStatus {
    /// Header matched and the payload was decoded.
    Decoded,
    /// A grid was sampled but the header did not match.
    HeaderMismatch,
    /// No blobs and no previous grid: nothing could be sampled.
    NoGrid,
}

/// Where the sampling grid of a record came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GridSource {
    Fresh,
    Stale,
    None,
}

/// The decoder's verdict for one region.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FrameRecord {
    /// 1-based position of this record in the session.
    pub sequence: u64,
    pub valid: bool,
    pub status: FrameStatus,
    /// Present only when `valid`.
    pub telemetry: Option<Telemetry>,
    pub grid_source: GridSource,
    /// Blobs that survived the size filter.
    pub blob_count: usize,
    #[serde(serialize_with = "serialize_bits")]
    pub bits: Option<Bitstream>,
}

fn serialize_bits<S: serde::Serializer>(
    bits: &Option<Bitstream>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    match bits {
        Some(bits) => serializer.serialize_some(&bits.to_string()),
        None => serializer.serialize_none(),
    }
}

/// Header check and payload extraction.
pub fn decode_frame(bits: &Bitstream, sync_pattern: u8) -> (FrameStatus, Option<Telemetry>) {
    if bits.byte(0) != sync_pattern {
        return (FrameStatus::HeaderMismatch, None);
    }
    let telemetry = Telemetry {
        temperature: bits.byte(1),
        humidity: bits.byte(2),
        distance: bits.byte(3),
    };
    (FrameStatus::Decoded, Some(telemetry))
}
