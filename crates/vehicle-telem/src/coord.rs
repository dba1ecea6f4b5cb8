/// WGS 84 coordinate helpers used by the simulated vehicle model.
use crate::{Error, TGResult};

//  _____
// |_   _|   _ _ __   ___  ___
//   | || | | | '_ \ / _ \/ __|
//   | || |_| | |_) |  __/\__ \
//   |_| \__, | .__/ \___||___/
//       |___/|_|

/// Latitude / longitude pair in degrees.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct LatLon {
    pub lat: f64,
    pub lon: f64,
}

impl LatLon {
    pub fn new(lat: f64, lon: f64) -> TGResult<Self> {
        validate_lat(lat)?;
        validate_lon(lon)?;
        Ok(Self { lat, lon })
    }

    /// Move by the given east / north distances, using the local meters-per-degree at the
    /// current latitude. Only meant for small steps.
    pub fn offset_m(&self, east_m: f64, north_m: f64) -> TGResult<LatLon> {
        let lat = self.lat + north_m / meter_per_deg_lat(self.lat)?;
        let lon = self.lon + east_m / meter_per_deg_lon(self.lat)?;
        Ok(LatLon { lat, lon })
    }
}

/// Bounding box with north-west and south-east corners. Does not handle boxes crossing the
/// antimeridian.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct BBoxWGS {
    pub north_west: LatLon,
    pub south_east: LatLon,
}

impl BBoxWGS {
    pub fn new(north_west: LatLon, south_east: LatLon) -> TGResult<Self> {
        LatLon::new(north_west.lat, north_west.lon)?;
        LatLon::new(south_east.lat, south_east.lon)?;
        if north_west.lat < south_east.lat || north_west.lon > south_east.lon {
            return Err(Error::InvalidCoord(format!(
                "corners {north_west:?} / {south_east:?} are not north-west / south-east"
            )));
        }
        Ok(Self {
            north_west,
            south_east,
        })
    }

    pub fn midpoint(&self) -> LatLon {
        LatLon {
            lat: (self.north_west.lat + self.south_east.lat) / 2.0,
            lon: (self.north_west.lon + self.south_east.lon) / 2.0,
        }
    }

    pub fn contains(&self, p: LatLon) -> bool {
        (self.south_east.lat..=self.north_west.lat).contains(&p.lat)
            && (self.north_west.lon..=self.south_east.lon).contains(&p.lon)
    }

    /// Clamp a point into the box. The flag is set when the point was outside.
    pub fn clamp(&self, p: LatLon) -> (LatLon, bool) {
        let lat = p.lat.clamp(self.south_east.lat, self.north_west.lat);
        let lon = p.lon.clamp(self.north_west.lon, self.south_east.lon);
        let clamped = LatLon { lat, lon };
        (clamped, clamped != p)
    }

    /// Approximate (width, height) in meters.
    pub fn approx_dimensions_m(&self) -> TGResult<(f64, f64)> {
        // Midpoint latitude stands in for the whole box.
        let mid = self.midpoint();
        let lat_deg = self.north_west.lat - self.south_east.lat;
        let lon_deg = self.south_east.lon - self.north_west.lon;
        let width = meter_per_deg_lon(mid.lat)? * lon_deg;
        let height = meter_per_deg_lat(mid.lat)? * lat_deg;
        Ok((width.abs(), height.abs()))
    }
}

fn validate_lat(lat: f64) -> TGResult<()> {
    if !(-90.0..=90.0).contains(&lat) {
        return Err(Error::InvalidCoord(format!("latitude {lat}")));
    }
    Ok(())
}

fn validate_lon(lon: f64) -> TGResult<()> {
    if !(-180.0..=180.0).contains(&lon) {
        return Err(Error::InvalidCoord(format!("longitude {lon}")));
    }
    Ok(())
}

/// Meters travelled along a N-S line per degree of latitude.
// 111132.92 - 559.82 cos(2φ) + 1.175 cos(4φ) - 0.0023 cos(6φ)
// Source: https://en.wikipedia.org/wiki/Geographic_coordinate_system
pub fn meter_per_deg_lat(lat_deg: f64) -> TGResult<f64> {
    validate_lat(lat_deg)?;
    let lat_rad = lat_deg.to_radians();
    Ok(
        111132.92 - 559.82 * (2.0 * lat_rad).cos() + 1.175 * (4.0 * lat_rad).cos()
            - 0.0023 * (6.0 * lat_rad).cos(),
    )
}

/// Meters travelled along an E-W line per degree of longitude at the given latitude.
// 111412.84 cos(φ) - 93.5 cos(3φ) + 0.118 cos(5φ)
pub fn meter_per_deg_lon(lat_deg: f64) -> TGResult<f64> {
    validate_lat(lat_deg)?;
    let lat_rad = lat_deg.to_radians();
    Ok(
        111412.84 * lat_rad.cos() - 93.5 * (3.0 * lat_rad).cos()
            + 0.118 * (5.0 * lat_rad).cos(),
    )
}

/// Compass heading in degrees, clockwise from north, kept in [0, 360).
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Heading(pub f32);

impl Heading {
    pub fn rot(&mut self, deg_cw: f32) {
        self.0 = (self.0 + deg_cw).rem_euclid(360.0);
    }

    pub fn to_radians(self) -> f32 {
        self.0.to_radians()
    }

    /// Unit (east, north) components of the heading.
    pub fn east_north(self) -> (f32, f32) {
        let rad = self.to_radians();
        (rad.sin(), rad.cos())
    }
}

impl From<f32> for Heading {
    fn from(deg: f32) -> Self {
        let mut h = Self(0.0);
        h.rot(deg);
        h
    }
}
