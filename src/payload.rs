//! Decoder for the fixed-layout GPS tracker payload.
//!
//! The tracker firmware packs one reading into 11 big-endian bytes:
//!
//! ```text
//! [0..4]  i32  latitude  * 10^7
//! [4..8]  i32  longitude * 10^7
//! [8..10] u16  altitude in meters
//! [10]    u8   satellite count
//! ```
//!
//! Decoding is pure and deterministic; no partial results are produced.

use thiserror::Error;

/// Exact payload length in bytes.
pub const PAYLOAD_LEN: usize = 11;

/// Fixed-point scale applied to latitude and longitude.
pub const COORD_SCALE: f64 = 10_000_000.0;

/// Payload decoding error.
#[derive(Error, Debug)]
pub enum DecodeError {
    /// Payload had the wrong length after base64 decoding.
    #[error("payload is {0} bytes, expected {PAYLOAD_LEN}")]
    Length(usize),

    /// Raw payload was not valid base64.
    #[error("payload is not valid base64: {0}")]
    Base64(#[from] base64::DecodeError),
}

/// One decoded GPS reading.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GpsReading {
    /// Latitude in degrees.
    pub latitude: f64,
    /// Longitude in degrees.
    pub longitude: f64,
    /// Altitude in meters.
    pub altitude: u16,
    /// Number of satellites the fix was computed from.
    pub satellites: u8,
}

/// Decode an 11-byte buffer into a [`GpsReading`].
///
/// Coordinates are decoded as signed integers: the firmware encodes
/// `int32_t` via `htonl`, so southern latitudes and western longitudes
/// arrive as negative values.
pub fn decode(buf: &[u8]) -> Result<GpsReading, DecodeError> {
    if buf.len() != PAYLOAD_LEN {
        return Err(DecodeError::Length(buf.len()));
    }

    let lat_raw = i32::from_be_bytes([buf[0], buf[1], buf[2], buf[3]]);
    let lon_raw = i32::from_be_bytes([buf[4], buf[5], buf[6], buf[7]]);
    let altitude = u16::from_be_bytes([buf[8], buf[9]]);
    let satellites = buf[10];

    Ok(GpsReading {
        latitude: lat_raw as f64 / COORD_SCALE,
        longitude: lon_raw as f64 / COORD_SCALE,
        altitude,
        satellites,
    })
}
