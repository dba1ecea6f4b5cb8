use chrono::{Datelike, Timelike};
use nom::{
    number::complete::{le_f32, le_i8, le_u16, le_u32, le_u8},
    Finish, IResult,
};

use super::{RawFrame, FRAME_LEN};
use crate::{status::VehicleStatus, vector::Vector3, DecodeError, Error, TGResult};

/// Vehicle status frame, field by field, before any range checks.
///
/// ```text
///  0  second     u8       |  7  acceleration      3 x f32
///  1  minute     u8       | 19  velocity          3 x f32
///  2  hour       u8       | 31  angular_velocity  3 x f32
///  3  day        u8       | 43  orientation       3 x f32
///  4  month      u8       | 55  location          3 x f32 (lon, lat, alt)
///  5  year       u16      | 67  dead_reckoned     u8 (nonzero = true)
///                         | 68  location_freshness u32 (ms)
///                         | 72  signal_strength   u8
///                         | 73  battery_status    i8
/// ```
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct RawFields {
    pub second: u8,
    pub minute: u8,
    pub hour: u8,
    pub day: u8,
    pub month: u8,
    pub year: u16,
    pub acceleration: Vector3,
    pub velocity: Vector3,
    pub angular_velocity: Vector3,
    pub orientation: Vector3,
    pub location: Vector3,
    pub dead_reckoned: u8,
    pub location_freshness: u32,
    pub signal_strength: u8,
    pub battery_status: i8,
}

pub fn parse_fields(frame: &RawFrame) -> Result<RawFields, DecodeError> {
    let (rest, fields) = nom_parse(frame.as_bytes()).finish()?;
    if !rest.is_empty() {
        return Err(DecodeError::MalformedLayout(format!(
            "{} trailing bytes",
            rest.len()
        )));
    }
    Ok(fields)
}

fn le_vector3(bytes: &[u8]) -> IResult<&[u8], Vector3> {
    let (rest, x) = le_f32(bytes)?;
    let (rest, y) = le_f32(rest)?;
    let (rest, z) = le_f32(rest)?;
    Ok((rest, Vector3 { x, y, z }))
}

fn nom_parse(bytes: &[u8]) -> IResult<&[u8], RawFields> {
    let (rest, second) = le_u8(bytes)?;
    let (rest, minute) = le_u8(rest)?;
    let (rest, hour) = le_u8(rest)?;
    let (rest, day) = le_u8(rest)?;
    let (rest, month) = le_u8(rest)?;
    let (rest, year) = le_u16(rest)?;
    let (rest, acceleration) = le_vector3(rest)?;
    let (rest, velocity) = le_vector3(rest)?;
    let (rest, angular_velocity) = le_vector3(rest)?;
    let (rest, orientation) = le_vector3(rest)?;
    let (rest, location) = le_vector3(rest)?;
    let (rest, dead_reckoned) = le_u8(rest)?;
    let (rest, location_freshness) = le_u32(rest)?;
    let (rest, signal_strength) = le_u8(rest)?;
    let (rest, battery_status) = le_i8(rest)?;
    Ok((
        rest,
        RawFields {
            second,
            minute,
            hour,
            day,
            month,
            year,
            acceleration,
            velocity,
            angular_velocity,
            orientation,
            location,
            dead_reckoned,
            location_freshness,
            signal_strength,
            battery_status,
        },
    ))
}

impl RawFields {
    /// Serialize into the fixed frame layout. No range checks are applied here.
    pub fn to_frame(&self) -> RawFrame {
        let mut buf = [0u8; FRAME_LEN];
        let mut w = Writer {
            buf: &mut buf,
            pos: 0,
        };
        w.put(&[self.second, self.minute, self.hour, self.day, self.month]);
        w.put(&self.year.to_le_bytes());
        for v in [
            self.acceleration,
            self.velocity,
            self.angular_velocity,
            self.orientation,
            self.location,
        ] {
            w.put(&v.x.to_le_bytes());
            w.put(&v.y.to_le_bytes());
            w.put(&v.z.to_le_bytes());
        }
        w.put(&[self.dead_reckoned]);
        w.put(&self.location_freshness.to_le_bytes());
        w.put(&[self.signal_strength]);
        w.put(&self.battery_status.to_le_bytes());
        debug_assert_eq!(w.pos, FRAME_LEN);
        RawFrame(buf)
    }
}

struct Writer<'a> {
    buf: &'a mut [u8; FRAME_LEN],
    pos: usize,
}

impl Writer<'_> {
    fn put(&mut self, bytes: &[u8]) {
        self.buf[self.pos..self.pos + bytes.len()].copy_from_slice(bytes);
        self.pos += bytes.len();
    }
}

/// Encode a status the way the vehicle does. The timestamp is written in its own offset.
pub fn encode(status: &VehicleStatus) -> TGResult<RawFrame> {
    let time = status.time();
    let year = u16::try_from(time.year())
        .map_err(|_| Error::Encode(format!("year {} does not fit in u16", time.year())))?;
    let fields = RawFields {
        // Calendar components are bounded well below u8::MAX.
        second: time.second() as u8,
        minute: time.minute() as u8,
        hour: time.hour() as u8,
        day: time.day() as u8,
        month: time.month() as u8,
        year,
        acceleration: status.acceleration(),
        velocity: status.velocity(),
        angular_velocity: status.angular_velocity(),
        orientation: status.orientation(),
        location: status.location(),
        dead_reckoned: status.is_location_dead_reckoned() as u8,
        location_freshness: status.location_freshness(),
        signal_strength: status.signal_strength(),
        battery_status: status.battery_status(),
    };
    Ok(fields.to_frame())
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{lazy_init_tracing, protocol::offset};

    #[test]
    fn test_field_offsets() {
        lazy_init_tracing();
        let fields = RawFields {
            second: 1,
            minute: 2,
            hour: 3,
            day: 4,
            month: 5,
            year: 0x07e8,
            acceleration: Vector3::new(1.0, 0.0, 0.0),
            velocity: Vector3::new(2.0, 0.0, 0.0),
            angular_velocity: Vector3::new(3.0, 0.0, 0.0),
            orientation: Vector3::new(4.0, 0.0, 0.0),
            location: Vector3::new(51.389, 35.7, 1200.0),
            dead_reckoned: 1,
            location_freshness: 0x0102_0304,
            signal_strength: 80,
            battery_status: -1,
        };
        let frame = fields.to_frame();
        let b = frame.as_bytes();
        assert_eq!(b[offset::SECOND], 1);
        assert_eq!(b[offset::MONTH], 5);
        assert_eq!(&b[offset::YEAR..offset::YEAR + 2], &[0xe8, 0x07]);
        assert_eq!(
            &b[offset::ACCELERATION..offset::ACCELERATION + 4],
            &1.0f32.to_le_bytes()
        );
        assert_eq!(
            &b[offset::VELOCITY..offset::VELOCITY + 4],
            &2.0f32.to_le_bytes()
        );
        assert_eq!(
            &b[offset::ANGULAR_VELOCITY..offset::ANGULAR_VELOCITY + 4],
            &3.0f32.to_le_bytes()
        );
        assert_eq!(
            &b[offset::ORIENTATION..offset::ORIENTATION + 4],
            &4.0f32.to_le_bytes()
        );
        assert_eq!(
            &b[offset::LOCATION + 8..offset::LOCATION + 12],
            &1200.0f32.to_le_bytes()
        );
        assert_eq!(b[offset::DEAD_RECKONED], 1);
        assert_eq!(
            &b[offset::LOCATION_FRESHNESS..offset::LOCATION_FRESHNESS + 4],
            &[0x04, 0x03, 0x02, 0x01]
        );
        assert_eq!(b[offset::SIGNAL_STRENGTH], 80);
        assert_eq!(b[offset::BATTERY_STATUS], 0xff);

        let parsed = parse_fields(&frame).unwrap();
        assert_eq!(parsed, fields);
    }

    #[test]
    fn test_parse_hand_built_frame() {
        let mut bytes = [0u8; FRAME_LEN];
        bytes[offset::HOUR] = 12;
        bytes[offset::DAY] = 15;
        bytes[offset::MONTH] = 6;
        bytes[offset::YEAR..offset::YEAR + 2].copy_from_slice(&2024u16.to_le_bytes());
        bytes[offset::LOCATION..offset::LOCATION + 4].copy_from_slice(&51.389f32.to_le_bytes());
        bytes[offset::LOCATION_FRESHNESS..offset::LOCATION_FRESHNESS + 4]
            .copy_from_slice(&500u32.to_le_bytes());
        bytes[offset::SIGNAL_STRENGTH] = 80;
        bytes[offset::BATTERY_STATUS] = 75;

        let fields = parse_fields(&RawFrame::from(bytes)).unwrap();
        assert_eq!(fields.hour, 12);
        assert_eq!(fields.year, 2024);
        assert_eq!(fields.location.x, 51.389);
        assert_eq!(fields.location_freshness, 500);
        assert_eq!(fields.signal_strength, 80);
        assert_eq!(fields.battery_status, 75);
    }

    #[test]
    fn test_raw_frame_size_mismatch() {
        let err = RawFrame::try_from(&[0u8; 73][..]).unwrap_err();
        assert_eq!(
            err,
            DecodeError::SizeMismatch {
                expected: 74,
                actual: 73
            }
        );
        assert!(RawFrame::try_from(&[0u8; 74][..]).is_ok());
    }

    #[test]
    fn test_truncated_input_is_malformed() {
        let err: DecodeError = nom_parse(&[0u8; 40]).finish().unwrap_err().into();
        assert!(matches!(err, DecodeError::MalformedLayout(_)));
    }
}
