/// Simulated vehicle producing a stream of status records, for exercising the pipeline without
/// a real vehicle on the other end of the broker.
///
/// Motion is a bounded random walk and not physically realistic. Sensor-ish fields (signal,
/// GNSS fix loss, battery drain) are drawn at random around plausible values.
use std::time::Duration;

use chrono::{DateTime, FixedOffset};
use rand::Rng;
use tracing::debug;

use crate::{
    coord::{BBoxWGS, Heading, LatLon},
    status::VehicleStatus,
    vector::Vector3,
    TGResult,
};

//  _____
// |_   _|   _ _ __   ___  ___
//   | || | | | '_ \ / _ \/ __|
//   | || |_| | |_) |  __/\__ \
//   |_| \__, | .__/ \___||___/
//       |___/|_|

/// API for a stream of vehicle status samples.
pub trait TelemStream {
    /// Advance the model by `delta_t` and sample it, stamping the result with `at`.
    fn next(&mut self, delta_t: TimeDelta, at: DateTime<FixedOffset>) -> TGResult<VehicleStatus>;
}

/// Time delta since last sample, with [`Default`] and conversion from [`Duration`] for
/// convenience.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct TimeDelta {
    msec: u32,
}

impl Default for TimeDelta {
    fn default() -> Self {
        Self { msec: 1000 }
    }
}

impl From<Duration> for TimeDelta {
    fn from(d: Duration) -> Self {
        Self {
            msec: u32::try_from(d.as_millis()).unwrap_or(u32::MAX),
        }
    }
}

impl TimeDelta {
    pub fn seconds(&self) -> f32 {
        self.msec as f32 / 1000.0
    }

    pub fn millis(&self) -> u32 {
        self.msec
    }
}

//  ____                 _                  __        __    _ _
// |  _ \ __ _ _ __   __| | ___  _ __ ___   \ \      / /_ _| | | __
// | |_) / _` | '_ \ / _` |/ _ \| '_ ` _ \   \ \ /\ / / _` | | |/ /
// |  _ < (_| | | | | (_| | (_) | | | | | |   \ V  V / (_| | |   <
// |_| \_\__,_|_| |_|\__,_|\___/|_| |_| |_|    \_/\_/ \__,_|_|_|\_\

/// Chance per sample that the GNSS fix is lost and the location is dead reckoned.
const FIX_LOSS_PROBABILITY: f64 = 0.1;
/// Battery drain in percent per second while on battery power.
const BATTERY_DRAIN_PER_SEC: f32 = 0.01;

pub struct RandomWalk {
    bbox: BBoxWGS,
    max_velocity_mps: f32,
    altitude_m: f32,
    pub(crate) last_pos: LatLon,
    heading: Heading,
    last_velocity: Vector3,
    since_fix_ms: u32,
    /// `None` while on external power.
    battery_pct: Option<f32>,
}

impl RandomWalk {
    pub fn new(bbox: BBoxWGS, max_velocity_mps: f32) -> Self {
        let start_pos = bbox.midpoint();
        let random_deg = rand::random::<f32>() * 360.0;
        Self {
            bbox,
            max_velocity_mps,
            altitude_m: 1200.0,
            last_pos: start_pos,
            heading: Heading::from(random_deg),
            last_velocity: Vector3::ZERO,
            since_fix_ms: 0,
            battery_pct: Some(100.0),
        }
    }

    pub fn with_altitude(mut self, altitude_m: f32) -> Self {
        self.altitude_m = altitude_m;
        self
    }

    /// Report a negative battery status, as vehicles powered by an adapter do.
    pub fn on_external_power(mut self) -> Self {
        self.battery_pct = None;
        self
    }

    fn battery_status(&mut self, dt: f32) -> i8 {
        match self.battery_pct.as_mut() {
            Some(pct) => {
                *pct = (*pct - dt * BATTERY_DRAIN_PER_SEC).max(0.0);
                pct.round() as i8
            }
            None => -1,
        }
    }
}

impl TelemStream for RandomWalk {
    fn next(&mut self, delta_t: TimeDelta, at: DateTime<FixedOffset>) -> TGResult<VehicleStatus> {
        let mut rng = rand::thread_rng();
        let dt = delta_t.seconds();
        let speed = rng.gen::<f32>() * self.max_velocity_mps;

        let turn = (rng.gen::<f32>() - 0.5) * 10.0;
        self.heading.rot(turn);
        debug!("heading after {} turn: {}", turn, self.heading.0);

        let (east, north) = self.heading.east_north();
        let velocity = Vector3::new(east * speed, north * speed, 0.0);
        let (acceleration, yaw_rate) = if dt > 0.0 {
            (
                Vector3::new(
                    (velocity.x - self.last_velocity.x) / dt,
                    (velocity.y - self.last_velocity.y) / dt,
                    0.0,
                ),
                turn.to_radians() / dt,
            )
        } else {
            (Vector3::ZERO, 0.0)
        };
        self.last_velocity = velocity;

        let moved = self
            .last_pos
            .offset_m((velocity.x * dt) as f64, (velocity.y * dt) as f64)?;
        let (pos, oob) = self.bbox.clamp(moved);
        if oob {
            debug!("out of bounds at {:?}, turning around", moved);
            self.heading.rot(180.0);
        }
        self.last_pos = pos;

        let dead_reckoned = rng.gen_bool(FIX_LOSS_PROBABILITY);
        self.since_fix_ms = if dead_reckoned {
            self.since_fix_ms.saturating_add(delta_t.millis())
        } else {
            rng.gen_range(0..1000)
        };

        let status = VehicleStatus::builder(at)
            .acceleration(acceleration)
            .velocity(velocity)
            .angular_velocity(Vector3::new(0.0, 0.0, yaw_rate))
            .orientation(Vector3::new(0.0, 0.0, self.heading.to_radians()))
            .location(Vector3::new(
                pos.lon as f32,
                pos.lat as f32,
                self.altitude_m,
            ))
            .dead_reckoned(dead_reckoned)
            .location_freshness(self.since_fix_ms)
            .signal_strength(rng.gen_range(20..=100))
            .battery_status(self.battery_status(dt))
            .build()?;
        Ok(status)
    }
}
