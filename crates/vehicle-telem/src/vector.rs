use serde::Serialize;

/// Three positional `f32` components.
///
/// The components carry no meaning of their own: the same type holds acceleration, velocity,
/// angular velocity, orientation and the (lon, lat, alt) location triple. Consumers assign
/// meaning by position.
#[derive(Debug, Default, Copy, Clone, PartialEq, Serialize)]
pub struct Vector3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Vector3 {
    pub const ZERO: Vector3 = Vector3::new(0.0, 0.0, 0.0);

    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    /// Euclidean norm, computed in `f64`. NaN components propagate.
    pub fn magnitude(&self) -> f64 {
        let (x, y, z) = (self.x as f64, self.y as f64, self.z as f64);
        (x * x + y * y + z * z).sqrt()
    }

    /// Component bit patterns, for exact comparisons that also hold for NaN.
    pub fn to_bits(&self) -> [u32; 3] {
        [self.x.to_bits(), self.y.to_bits(), self.z.to_bits()]
    }
}

impl From<[f32; 3]> for Vector3 {
    fn from([x, y, z]: [f32; 3]) -> Self {
        Self { x, y, z }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_magnitude() {
        assert!((Vector3::new(3.0, 4.0, 0.0).magnitude() - 5.0).abs() < f64::EPSILON);
        assert!((Vector3::new(0.0, -3.0, 4.0).magnitude() - 5.0).abs() < f64::EPSILON);
        assert_eq!(Vector3::ZERO.magnitude(), 0.0);
    }

    #[test]
    fn test_magnitude_non_finite() {
        assert!(Vector3::new(f32::NAN, 1.0, 1.0).magnitude().is_nan());
        assert!(Vector3::new(f32::INFINITY, 0.0, 0.0).magnitude().is_infinite());
    }
}
