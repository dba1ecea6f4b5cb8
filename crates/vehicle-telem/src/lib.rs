/// Vehicle telemetry frame protocol.
///
/// Raw 74-byte frames broadcast by the vehicle are turned into validated [`VehicleStatus`]
/// records by the [`FrameDecoder`], and into store-ready [`VehicleDocument`]s by the
/// [`DocumentMapper`]. Both stages are pure: nothing is retained between frames.
///
/// The [`model`] module generates synthetic vehicle movement, which together with
/// [`protocol::encode`] produces frames for simulation and testing.
use std::fmt;
use std::sync::Once;

use thiserror::Error;

pub mod coord;
pub mod decoder;
pub mod document;
pub mod model;
pub mod protocol;
pub mod status;
pub mod vector;

pub use decoder::{DecoderConfig, FrameDecoder, FrameZone};
pub use document::{DocumentMapper, GeoPoint, MapperConfig, VehicleDocument};
pub use protocol::{RawFrame, FRAME_LEN};
pub use status::VehicleStatus;
pub use vector::Vector3;

/// Result type for this library
pub type TGResult<T> = std::result::Result<T, Error>;

/// Error type for this library
#[derive(Debug, Error)]
pub enum Error {
    #[error("Decode error: {0}")]
    Decode(#[from] DecodeError),
    #[error("Encode error: {0}")]
    Encode(String),
    #[error("Invalid coordinate: {0}")]
    InvalidCoord(String),
    #[error("Invalid time zone: {0}")]
    InvalidTimeZone(String),
}

/// Reason a single frame was rejected. Each variant is local to the frame: callers log it and
/// move on to the next one.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("frame size mismatch: expected {expected} bytes, got {actual}")]
    SizeMismatch { expected: usize, actual: usize },
    #[error("malformed frame layout: {0}")]
    MalformedLayout(String),
    #[error("invalid timestamp: {field} = {value}")]
    InvalidTimestamp { field: TimeField, value: i32 },
    #[error("invalid signal strength: {0} (expected 0..=100)")]
    InvalidSignalStrength(u8),
}

impl From<nom::error::Error<&[u8]>> for DecodeError {
    fn from(err: nom::error::Error<&[u8]>) -> Self {
        DecodeError::MalformedLayout(format!("{:?} with {} bytes left", err.code, err.input.len()))
    }
}

/// Calendar sub-field carried in the frame header, in wire order.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum TimeField {
    Second,
    Minute,
    Hour,
    Day,
    Month,
    Year,
}

impl fmt::Display for TimeField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TimeField::Second => "second",
            TimeField::Minute => "minute",
            TimeField::Hour => "hour",
            TimeField::Day => "day",
            TimeField::Month => "month",
            TimeField::Year => "year",
        };
        f.write_str(name)
    }
}

/// Test binary helper to init tracing. This is usually the responsibility of the consumer of the
/// library crate.
pub fn lazy_init_tracing() {
    {
        static INIT: Once = Once::new();
        &INIT
    }
    .call_once(|| {
        tracing_subscriber::fmt::init();
    });
}
