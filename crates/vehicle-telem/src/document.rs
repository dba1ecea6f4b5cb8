/// Mapping of decoded statuses into store documents.
use chrono::{DateTime, FixedOffset};
use serde::Serialize;

use crate::{status::VehicleStatus, vector::Vector3};

/// Identifier written into every document's `vehicle` field unless configured otherwise.
pub const DEFAULT_VEHICLE: &str = "cps-tracer";

/// Store field types the document relies on. Everything else is left to dynamic mapping.
pub const INDEX_FIELDS: &[(&str, &str)] = &[
    ("location", "geo_point"),
    ("vehicle", "keyword"),
    ("altitude", "float"),
    ("acceleration_magnitude", "float"),
    ("velocity_magnitude", "float"),
    ("time", "date"),
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MapperConfig {
    pub vehicle: String,
}

impl Default for MapperConfig {
    fn default() -> Self {
        Self {
            vehicle: DEFAULT_VEHICLE.to_string(),
        }
    }
}

/// 2-D point in the shape geospatial indexes expect. Altitude lives in its own field.
#[derive(Debug, Copy, Clone, PartialEq, Serialize)]
pub struct GeoPoint {
    pub lat: f32,
    pub lon: f32,
}

/// Flat, store-ready record. Serializes with fields in declaration order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VehicleDocument {
    /// When the frame was processed.
    pub message_arrival: DateTime<FixedOffset>,
    /// When the frame was measured on the vehicle.
    pub time: DateTime<FixedOffset>,
    pub acceleration: Vector3,
    pub acceleration_magnitude: f64,
    pub velocity: Vector3,
    pub velocity_magnitude: f64,
    pub angular_velocity: Vector3,
    pub orientation: Vector3,
    pub location: GeoPoint,
    pub vehicle: String,
    pub altitude: f32,
    pub is_location_dead_reckoned: bool,
    pub location_freshness: u32,
    pub signal_strength: u8,
    pub battery_status: i8,
}

#[derive(Debug, Clone, Default)]
pub struct DocumentMapper {
    config: MapperConfig,
}

impl DocumentMapper {
    pub fn new(config: MapperConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &MapperConfig {
        &self.config
    }

    /// Total over every valid status, including ones carrying NaN or infinite components,
    /// which propagate into the magnitudes.
    pub fn to_document(
        &self,
        status: VehicleStatus,
        observed_at: DateTime<FixedOffset>,
    ) -> VehicleDocument {
        let location = status.location();
        VehicleDocument {
            message_arrival: observed_at,
            time: status.time(),
            acceleration: status.acceleration(),
            acceleration_magnitude: status.acceleration().magnitude(),
            velocity: status.velocity(),
            velocity_magnitude: status.velocity().magnitude(),
            angular_velocity: status.angular_velocity(),
            orientation: status.orientation(),
            location: GeoPoint {
                lat: location.y,
                lon: location.x,
            },
            vehicle: self.config.vehicle.clone(),
            altitude: location.z,
            is_location_dead_reckoned: status.is_location_dead_reckoned(),
            location_freshness: status.location_freshness(),
            signal_strength: status.signal_strength(),
            battery_status: status.battery_status(),
        }
    }
}

#[cfg(test)]
mod test {
    use chrono::{Duration, TimeZone};

    use super::*;
    fn measured_at() -> DateTime<FixedOffset> {
        FixedOffset::east_opt(12600)
            .unwrap()
            .with_ymd_and_hms(2024, 6, 15, 12, 0, 0)
            .unwrap()
    }

    fn status() -> crate::status::StatusBuilder {
        VehicleStatus::builder(measured_at())
            .location_freshness(500)
            .signal_strength(80)
            .battery_status(75)
    }

    #[test]
    fn test_magnitudes() {
        let status = status()
            .acceleration(Vector3::new(3.0, 4.0, 0.0))
            .velocity(Vector3::new(0.0, 3.0, 4.0))
            .angular_velocity(Vector3::new(3.0, 4.0, 0.0))
            .build()
            .unwrap();
        let doc = DocumentMapper::default().to_document(status, measured_at());
        assert!((doc.acceleration_magnitude - 5.0).abs() < f64::EPSILON);
        assert!((doc.velocity_magnitude - 5.0).abs() < f64::EPSILON);
        assert_eq!(doc.angular_velocity, Vector3::new(3.0, 4.0, 0.0));
    }

    #[test]
    fn test_location_rekeyed() {
        let status = status()
            .location(Vector3::new(51.389, 35.700, 1200.0))
            .build()
            .unwrap();
        let doc = DocumentMapper::default().to_document(status, measured_at());
        assert_eq!(
            doc.location,
            GeoPoint {
                lat: 35.700,
                lon: 51.389
            }
        );
        assert_eq!(doc.altitude, 1200.0);
    }

    #[test]
    fn test_scenario_document() {
        let arrival = measured_at() + Duration::milliseconds(1500);
        let doc = DocumentMapper::default().to_document(status().build().unwrap(), arrival);
        assert_eq!(doc.message_arrival, arrival);
        assert_eq!(doc.time, measured_at());
        assert_eq!(doc.acceleration_magnitude, 0.0);
        assert_eq!(doc.velocity_magnitude, 0.0);
        assert_eq!(doc.vehicle, DEFAULT_VEHICLE);
        assert!(!doc.is_location_dead_reckoned);
        assert_eq!(doc.location_freshness, 500);
        assert_eq!(doc.signal_strength, 80);
        assert_eq!(doc.battery_status, 75);
    }

    #[test]
    fn test_negative_battery_passes_through() {
        let status = status().battery_status(-1).build().unwrap();
        let doc = DocumentMapper::default().to_document(status, measured_at());
        assert_eq!(doc.battery_status, -1);
    }

    #[test]
    fn test_nan_propagates() {
        let status = status()
            .velocity(Vector3::new(f32::NAN, 1.0, 2.0))
            .build()
            .unwrap();
        let doc = DocumentMapper::default().to_document(status, measured_at());
        assert!(doc.velocity_magnitude.is_nan());
        assert_eq!(doc.acceleration_magnitude, 0.0);
    }

    #[test]
    fn test_configured_vehicle() {
        let mapper = DocumentMapper::new(MapperConfig {
            vehicle: "rover-7".to_string(),
        });
        let doc = mapper.to_document(status().build().unwrap(), measured_at());
        assert_eq!(doc.vehicle, "rover-7");
    }

    #[test]
    fn test_json_shape() {
        let status = status()
            .location(Vector3::new(51.389, 35.7, 1200.0))
            .build()
            .unwrap();
        let doc = DocumentMapper::default().to_document(status, measured_at());
        let json = serde_json::to_value(&doc).unwrap();

        let keys: Vec<&str> = json
            .as_object()
            .unwrap()
            .keys()
            .map(String::as_str)
            .collect();
        for (field, _) in INDEX_FIELDS {
            assert!(keys.contains(field), "missing {field}");
        }
        assert_eq!(json["time"], "2024-06-15T12:00:00+03:30");
        assert_eq!(json["location"]["lat"], serde_json::json!(35.7f32));
        assert_eq!(json["location"]["lon"], serde_json::json!(51.389f32));
        assert_eq!(json["acceleration"], serde_json::json!({"x": 0.0, "y": 0.0, "z": 0.0}));
        assert_eq!(json["vehicle"], "cps-tracer");
        assert_eq!(json["is_location_dead_reckoned"], false);
        assert_eq!(json["battery_status"], 75);
        assert!(json.get("angular_velocity_magnitude").is_none());
    }
}
