pub mod status_frame;

pub use status_frame::{encode, parse_fields, RawFields};

use crate::DecodeError;

/// Size in bytes of every vehicle status frame. Partial frames do not exist.
pub const FRAME_LEN: usize = 74;

/// Byte offsets of the wire fields. Multi-byte fields are little-endian.
pub mod offset {
    pub const SECOND: usize = 0;
    pub const MINUTE: usize = 1;
    pub const HOUR: usize = 2;
    pub const DAY: usize = 3;
    pub const MONTH: usize = 4;
    pub const YEAR: usize = 5;
    pub const ACCELERATION: usize = 7;
    pub const VELOCITY: usize = 19;
    pub const ANGULAR_VELOCITY: usize = 31;
    pub const ORIENTATION: usize = 43;
    pub const LOCATION: usize = 55;
    pub const DEAD_RECKONED: usize = 67;
    pub const LOCATION_FRESHNESS: usize = 68;
    pub const SIGNAL_STRENGTH: usize = 72;
    pub const BATTERY_STATUS: usize = 73;
}

/// One raw frame as delivered by the transport: exactly [`FRAME_LEN`] bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawFrame([u8; FRAME_LEN]);

impl RawFrame {
    pub fn as_bytes(&self) -> &[u8; FRAME_LEN] {
        &self.0
    }

    pub fn into_bytes(self) -> [u8; FRAME_LEN] {
        self.0
    }
}

impl From<[u8; FRAME_LEN]> for RawFrame {
    fn from(bytes: [u8; FRAME_LEN]) -> Self {
        Self(bytes)
    }
}

impl TryFrom<&[u8]> for RawFrame {
    type Error = DecodeError;

    fn try_from(bytes: &[u8]) -> Result<Self, Self::Error> {
        let bytes: [u8; FRAME_LEN] = bytes.try_into().map_err(|_| DecodeError::SizeMismatch {
            expected: FRAME_LEN,
            actual: bytes.len(),
        })?;
        Ok(Self(bytes))
    }
}

impl AsRef<[u8]> for RawFrame {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}
