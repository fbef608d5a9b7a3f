use nalgebra::Vector3;

use crate::error::{AnisotropyError, Result};

/// Allowed deviation of `|n|` from one.
pub const UNIT_TOLERANCE: f64 = 1e-6;

/// Unit propagation direction.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Direction([f64; 3]);

impl Direction {
    /// Validates that the vector is already unit length.
    pub fn new(x: f64, y: f64, z: f64) -> Result<Self> {
        let vector = [x, y, z];
        let norm = norm(vector);
        if !norm.is_finite() || (norm - 1.0).abs() > UNIT_TOLERANCE {
            return Err(AnisotropyError::NonUnitDirection { vector, norm });
        }
        Ok(Self(vector))
    }

    /// Rescales any non-zero vector to unit length, e.g. `[1, 1, 1]`.
    pub fn normalized(x: f64, y: f64, z: f64) -> Result<Self> {
        let vector = [x, y, z];
        let norm = norm(vector);
        if !norm.is_finite() || norm == 0.0 {
            return Err(AnisotropyError::NonUnitDirection { vector, norm });
        }
        Ok(Self([x / norm, y / norm, z / norm]))
    }

    /// Spherical to Cartesian: θ from +z, φ from +x towards +y.
    pub fn from_spherical(theta: f64, phi: f64) -> Self {
        let (sin_theta, cos_theta) = theta.sin_cos();
        let (sin_phi, cos_phi) = phi.sin_cos();
        Self([sin_theta * cos_phi, sin_theta * sin_phi, cos_theta])
    }

    pub fn x(&self) -> f64 {
        self.0[0]
    }

    pub fn y(&self) -> f64 {
        self.0[1]
    }

    pub fn z(&self) -> f64 {
        self.0[2]
    }

    pub fn as_array(&self) -> [f64; 3] {
        self.0
    }

    pub fn to_vector(&self) -> Vector3<f64> {
        Vector3::from(self.0)
    }

    pub fn norm(&self) -> f64 {
        norm(self.0)
    }
}

impl TryFrom<[f64; 3]> for Direction {
    type Error = AnisotropyError;

    fn try_from(value: [f64; 3]) -> Result<Self> {
        Self::new(value[0], value[1], value[2])
    }
}

impl From<Direction> for [f64; 3] {
    fn from(direction: Direction) -> Self {
        direction.0
    }
}

fn norm(v: [f64; 3]) -> f64 {
    (v[0] * v[0] + v[1] * v[1] + v[2] * v[2]).sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::f64::consts::{FRAC_PI_2, PI};

    #[test]
    fn rejects_non_unit_vectors() {
        let err = Direction::new(1.0, 1.0, 0.0).unwrap_err();
        match err {
            AnisotropyError::NonUnitDirection { norm, .. } => {
                assert_relative_eq!(norm, 2.0_f64.sqrt())
            }
            other => panic!("unexpected error {other:?}"),
        }
        assert!(Direction::new(0.0, 0.0, 0.0).is_err());
        assert!(Direction::new(f64::NAN, 0.0, 1.0).is_err());
    }

    #[test]
    fn normalizes_body_diagonal() {
        let n = Direction::normalized(1.0, 1.0, 1.0).unwrap();
        let expected = 1.0 / 3.0_f64.sqrt();
        assert_relative_eq!(n.x(), expected);
        assert_relative_eq!(n.norm(), 1.0, epsilon = 1e-15);
        assert!(Direction::normalized(0.0, 0.0, 0.0).is_err());
    }

    #[test]
    fn spherical_mapping() {
        let pole = Direction::from_spherical(0.0, 1.3);
        assert_relative_eq!(pole.z(), 1.0);

        let y_axis = Direction::from_spherical(FRAC_PI_2, FRAC_PI_2);
        assert_relative_eq!(y_axis.x(), 0.0, epsilon = 1e-15);
        assert_relative_eq!(y_axis.y(), 1.0);
        assert_relative_eq!(y_axis.z(), 0.0, epsilon = 1e-15);

        let south = Direction::from_spherical(PI, 0.0);
        assert_relative_eq!(south.z(), -1.0);
    }
}
