/// Decoded vehicle status record.
use chrono::{DateTime, Datelike, FixedOffset};

use crate::{decoder, vector::Vector3, DecodeError, TimeField};

/// One validated sampling instant reported by the vehicle.
///
/// Values only come out of [`FrameDecoder::decode`](crate::FrameDecoder::decode) or
/// [`StatusBuilder::build`], both of which apply the protocol's range checks, so a
/// `VehicleStatus` in hand is always fully valid.
#[derive(Debug, Clone, PartialEq)]
pub struct VehicleStatus {
    pub(crate) time: DateTime<FixedOffset>,
    pub(crate) acceleration: Vector3,
    pub(crate) velocity: Vector3,
    pub(crate) angular_velocity: Vector3,
    pub(crate) orientation: Vector3,
    pub(crate) location: Vector3,
    pub(crate) is_location_dead_reckoned: bool,
    pub(crate) location_freshness: u32,
    pub(crate) signal_strength: u8,
    pub(crate) battery_status: i8,
}

impl VehicleStatus {
    pub fn builder(time: DateTime<FixedOffset>) -> StatusBuilder {
        StatusBuilder::new(time)
    }

    /// Measurement time on the vehicle, in the decoder's configured zone.
    pub fn time(&self) -> DateTime<FixedOffset> {
        self.time
    }

    /// m/s²
    pub fn acceleration(&self) -> Vector3 {
        self.acceleration
    }

    /// m/s
    pub fn velocity(&self) -> Vector3 {
        self.velocity
    }

    /// rad/s
    pub fn angular_velocity(&self) -> Vector3 {
        self.angular_velocity
    }

    /// Roll, pitch, yaw in radians.
    pub fn orientation(&self) -> Vector3 {
        self.orientation
    }

    /// `x` = longitude, `y` = latitude, `z` = altitude in meters.
    pub fn location(&self) -> Vector3 {
        self.location
    }

    pub fn is_location_dead_reckoned(&self) -> bool {
        self.is_location_dead_reckoned
    }

    /// Milliseconds since the location was last refreshed.
    pub fn location_freshness(&self) -> u32 {
        self.location_freshness
    }

    /// 0..=100
    pub fn signal_strength(&self) -> u8 {
        self.signal_strength
    }

    /// Percentage when non-negative; negative means the vehicle runs on external power.
    pub fn battery_status(&self) -> i8 {
        self.battery_status
    }

    pub fn is_externally_powered(&self) -> bool {
        self.battery_status < 0
    }

    /// Field-wise equality over float bit patterns, so statuses carrying NaN compare equal to
    /// themselves.
    pub fn bitwise_eq(&self, other: &Self) -> bool {
        self.time == other.time
            && self.acceleration.to_bits() == other.acceleration.to_bits()
            && self.velocity.to_bits() == other.velocity.to_bits()
            && self.angular_velocity.to_bits() == other.angular_velocity.to_bits()
            && self.orientation.to_bits() == other.orientation.to_bits()
            && self.location.to_bits() == other.location.to_bits()
            && self.is_location_dead_reckoned == other.is_location_dead_reckoned
            && self.location_freshness == other.location_freshness
            && self.signal_strength == other.signal_strength
            && self.battery_status == other.battery_status
    }
}

/// Assembles a [`VehicleStatus`] outside of frame decoding (simulation, tests).
#[derive(Debug, Clone)]
pub struct StatusBuilder {
    status: VehicleStatus,
}

impl StatusBuilder {
    fn new(time: DateTime<FixedOffset>) -> Self {
        Self {
            status: VehicleStatus {
                time,
                acceleration: Vector3::ZERO,
                velocity: Vector3::ZERO,
                angular_velocity: Vector3::ZERO,
                orientation: Vector3::ZERO,
                location: Vector3::ZERO,
                is_location_dead_reckoned: false,
                location_freshness: 0,
                signal_strength: 0,
                battery_status: 0,
            },
        }
    }

    pub fn acceleration(mut self, v: Vector3) -> Self {
        self.status.acceleration = v;
        self
    }

    pub fn velocity(mut self, v: Vector3) -> Self {
        self.status.velocity = v;
        self
    }

    pub fn angular_velocity(mut self, v: Vector3) -> Self {
        self.status.angular_velocity = v;
        self
    }

    pub fn orientation(mut self, v: Vector3) -> Self {
        self.status.orientation = v;
        self
    }

    /// Location as (longitude, latitude, altitude).
    pub fn location(mut self, v: Vector3) -> Self {
        self.status.location = v;
        self
    }

    pub fn dead_reckoned(mut self, dead_reckoned: bool) -> Self {
        self.status.is_location_dead_reckoned = dead_reckoned;
        self
    }

    pub fn location_freshness(mut self, msec: u32) -> Self {
        self.status.location_freshness = msec;
        self
    }

    pub fn signal_strength(mut self, signal: u8) -> Self {
        self.status.signal_strength = signal;
        self
    }

    pub fn battery_status(mut self, battery: i8) -> Self {
        self.status.battery_status = battery;
        self
    }

    /// Applies the same year and signal checks as frame decoding.
    pub fn build(self) -> Result<VehicleStatus, DecodeError> {
        let year = self.status.time.year();
        if !u16::try_from(year).is_ok_and(|y| decoder::YEAR_RANGE.contains(&y)) {
            return Err(DecodeError::InvalidTimestamp {
                field: TimeField::Year,
                value: year,
            });
        }
        decoder::check_signal_strength(self.status.signal_strength)?;
        Ok(self.status)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use chrono::TimeZone;

    fn tehran() -> FixedOffset {
        FixedOffset::east_opt(3 * 3600 + 1800).unwrap()
    }

    #[test]
    fn test_builder_defaults() {
        let time = tehran().with_ymd_and_hms(2024, 6, 15, 12, 0, 0).unwrap();
        let status = VehicleStatus::builder(time).build().unwrap();
        assert_eq!(status.time(), time);
        assert_eq!(status.location(), Vector3::ZERO);
        assert_eq!(status.signal_strength(), 0);
        assert!(!status.is_location_dead_reckoned());
    }

    #[test]
    fn test_builder_rejects_out_of_range() {
        let time = tehran().with_ymd_and_hms(2024, 6, 15, 12, 0, 0).unwrap();
        let err = VehicleStatus::builder(time)
            .signal_strength(101)
            .build()
            .unwrap_err();
        assert_eq!(err, DecodeError::InvalidSignalStrength(101));

        let time = tehran().with_ymd_and_hms(1999, 12, 31, 23, 59, 59).unwrap();
        let err = VehicleStatus::builder(time).build().unwrap_err();
        assert_eq!(
            err,
            DecodeError::InvalidTimestamp {
                field: TimeField::Year,
                value: 1999
            }
        );
    }

    #[test]
    fn test_builder_reports_actual_year() {
        for year in [-5, 70_000] {
            let time = tehran().with_ymd_and_hms(year, 1, 1, 0, 0, 0).unwrap();
            assert_eq!(
                VehicleStatus::builder(time).build().unwrap_err(),
                DecodeError::InvalidTimestamp {
                    field: TimeField::Year,
                    value: year
                }
            );
        }
    }

    #[test]
    fn test_external_power() {
        let time = tehran().with_ymd_and_hms(2024, 6, 15, 12, 0, 0).unwrap();
        let status = VehicleStatus::builder(time)
            .battery_status(-1)
            .build()
            .unwrap();
        assert!(status.is_externally_powered());
        assert_eq!(status.battery_status(), -1);
    }

    #[test]
    fn test_bitwise_eq_with_nan() {
        let time = tehran().with_ymd_and_hms(2024, 6, 15, 12, 0, 0).unwrap();
        let status = VehicleStatus::builder(time)
            .velocity(Vector3::new(f32::NAN, 0.0, 0.0))
            .build()
            .unwrap();
        assert_ne!(status, status.clone());
        assert!(status.bitwise_eq(&status.clone()));
    }
}
