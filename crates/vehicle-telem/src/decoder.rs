/// Frame decoding and field validation.
use std::fmt;
use std::ops::RangeInclusive;
use std::str::FromStr;

use chrono::{
    DateTime, Days, FixedOffset, LocalResult, NaiveDate, NaiveDateTime, Offset, TimeZone, Utc,
};
use chrono_tz::Tz;
use tracing::trace;

use crate::{
    protocol::{self, RawFields, RawFrame},
    status::VehicleStatus,
    DecodeError, Error, TimeField,
};

pub(crate) const YEAR_RANGE: RangeInclusive<u16> = 2000..=2100;
const SIGNAL_RANGE: RangeInclusive<u8> = 0..=100;

/// Zone the vehicle's clock is assumed to run in unless configured otherwise.
pub const DEFAULT_TIME_ZONE: Tz = chrono_tz::Asia::Tehran;

/// Zone used to interpret the calendar fields of a frame.
///
/// A named zone applies its historical daylight-saving rules, so the same wall-clock time maps
/// to different offsets depending on the date. A fixed offset never changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameZone {
    Named(Tz),
    Fixed(FixedOffset),
}

impl Default for FrameZone {
    fn default() -> Self {
        FrameZone::Named(DEFAULT_TIME_ZONE)
    }
}

impl FrameZone {
    /// Attach this zone to a local wall-clock time.
    ///
    /// Ambiguous times (clocks set back) resolve to the earlier instant. Times skipped by a
    /// forward transition keep their wall-clock reading under the offset in force before it.
    pub fn localize(&self, naive: NaiveDateTime) -> Option<DateTime<FixedOffset>> {
        match self {
            FrameZone::Fixed(offset) => naive.and_local_timezone(*offset).single(),
            FrameZone::Named(tz) => match naive.and_local_timezone(*tz) {
                LocalResult::Single(t) | LocalResult::Ambiguous(t, _) => Some(t.fixed_offset()),
                LocalResult::None => {
                    let before = naive.checked_sub_days(Days::new(1))?;
                    let offset = tz.offset_from_utc_datetime(&before).fix();
                    naive.and_local_timezone(offset).single()
                }
            },
        }
    }

    /// Current time in this zone.
    pub fn now(&self) -> DateTime<FixedOffset> {
        let now = Utc::now();
        match self {
            FrameZone::Fixed(offset) => now.with_timezone(offset),
            FrameZone::Named(tz) => now.with_timezone(tz).fixed_offset(),
        }
    }
}

impl fmt::Display for FrameZone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FrameZone::Named(tz) => f.write_str(tz.name()),
            FrameZone::Fixed(offset) => write!(f, "{offset}"),
        }
    }
}

/// Accepts an IANA name ("Asia/Tehran"), a UTC offset ("+03:30"), or "UTC"/"Z".
impl FromStr for FrameZone {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("utc") || s == "Z" {
            return Ok(FrameZone::Fixed(Utc.fix()));
        }
        if let Ok(offset) = s.parse::<FixedOffset>() {
            return Ok(FrameZone::Fixed(offset));
        }
        s.parse::<Tz>()
            .map(FrameZone::Named)
            .map_err(|e| Error::InvalidTimeZone(format!("'{s}': {e}")))
    }
}

impl From<Tz> for FrameZone {
    fn from(tz: Tz) -> Self {
        FrameZone::Named(tz)
    }
}

impl From<FixedOffset> for FrameZone {
    fn from(offset: FixedOffset) -> Self {
        FrameZone::Fixed(offset)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DecoderConfig {
    /// Zone the vehicle's calendar fields are expressed in. Timestamps carry the offset in force
    /// at that instant; they are not normalized to UTC.
    pub time_zone: FrameZone,
}

/// Turns raw frames into validated [`VehicleStatus`] records.
///
/// Checks run in a fixed order and stop at the first failure:
///
/// 1. length must be exactly [`FRAME_LEN`](protocol::FRAME_LEN)
/// 2. the little-endian layout must parse
/// 3. calendar fields: second, minute, hour, day (1..=31, no month-length check), month, year
///    (2000..=2100)
/// 4. signal strength must be 0..=100
///
/// Battery, location freshness and every vector component pass through unchecked, NaN and
/// infinities included.
#[derive(Debug, Clone, Default)]
pub struct FrameDecoder {
    config: DecoderConfig,
}

impl FrameDecoder {
    pub fn new(config: DecoderConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &DecoderConfig {
        &self.config
    }

    pub fn decode(&self, buffer: &[u8]) -> Result<VehicleStatus, DecodeError> {
        let frame = RawFrame::try_from(buffer)?;
        self.decode_frame(&frame)
    }

    pub fn decode_frame(&self, frame: &RawFrame) -> Result<VehicleStatus, DecodeError> {
        let fields = protocol::parse_fields(frame)?;
        trace!(?fields, "parsed frame layout");
        check_calendar(&fields)?;
        check_signal_strength(fields.signal_strength)?;
        let time = self.calendar_instant(&fields)?;
        Ok(VehicleStatus {
            time,
            acceleration: fields.acceleration,
            velocity: fields.velocity,
            angular_velocity: fields.angular_velocity,
            orientation: fields.orientation,
            location: fields.location,
            is_location_dead_reckoned: fields.dead_reckoned != 0,
            location_freshness: fields.location_freshness,
            signal_strength: fields.signal_strength,
            battery_status: fields.battery_status,
        })
    }

    /// Combine the calendar fields into one instant in the configured zone.
    ///
    /// Day numbers past the end of the month roll into the next month (June 31 is July 1),
    /// since the range check accepts any day up to 31.
    fn calendar_instant(&self, f: &RawFields) -> Result<DateTime<FixedOffset>, DecodeError> {
        let invalid_day = DecodeError::InvalidTimestamp {
            field: TimeField::Day,
            value: f.day.into(),
        };
        let date = NaiveDate::from_ymd_opt(f.year.into(), f.month.into(), 1)
            .and_then(|first| first.checked_add_days(Days::new(u64::from(f.day) - 1)))
            .ok_or_else(|| invalid_day.clone())?;
        date.and_hms_opt(f.hour.into(), f.minute.into(), f.second.into())
            .and_then(|naive| self.config.time_zone.localize(naive))
            .ok_or(invalid_day)
    }
}

fn check_calendar(f: &RawFields) -> Result<(), DecodeError> {
    let checks: [(TimeField, u16, RangeInclusive<u16>); 6] = [
        (TimeField::Second, f.second.into(), 0..=59),
        (TimeField::Minute, f.minute.into(), 0..=59),
        (TimeField::Hour, f.hour.into(), 0..=23),
        (TimeField::Day, f.day.into(), 1..=31),
        (TimeField::Month, f.month.into(), 1..=12),
        (TimeField::Year, f.year, YEAR_RANGE),
    ];
    for (field, value, range) in checks {
        if !range.contains(&value) {
            return Err(DecodeError::InvalidTimestamp {
                field,
                value: value.into(),
            });
        }
    }
    Ok(())
}

pub(crate) fn check_signal_strength(signal: u8) -> Result<(), DecodeError> {
    if !SIGNAL_RANGE.contains(&signal) {
        return Err(DecodeError::InvalidSignalStrength(signal));
    }
    Ok(())
}
