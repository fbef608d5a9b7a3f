use nalgebra::{SymmetricEigen, Vector3};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::christoffel::ChristoffelTensor;
use crate::error::{AnisotropyError, Result};

// Iteration bound for the implicit QR sweeps of the symmetric solver
const MAX_EIGEN_ITERATIONS: usize = 1000;

/// Wave branch, ordered by descending modulus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Branch {
    /// quasi-P, compressional
    P,
    /// quasi-S1, faster shear
    S1,
    /// quasi-S2, slower shear
    S2,
}

impl Branch {
    pub const ALL: [Branch; 3] = [Branch::P, Branch::S1, Branch::S2];

    pub fn index(self) -> usize {
        match self {
            Branch::P => 0,
            Branch::S1 => 1,
            Branch::S2 => 2,
        }
    }
}

impl fmt::Display for Branch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Branch::P => "P",
            Branch::S1 => "S1",
            Branch::S2 => "S2",
        };
        f.write_str(name)
    }
}

/// Moduli and polarizations of the three plane waves along one direction.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WaveSolution {
    moduli: [f64; 3],
    polarizations: [Vector3<f64>; 3],
}

impl WaveSolution {
    /// Eigendecomposition of the Christoffel tensor.
    ///
    /// Moduli are sorted descending with a stable sort, so equal moduli keep the
    /// order the eigensolver produced them in. Every polarization is unit length
    /// with its largest-magnitude component positive.
    pub fn solve(tik: &ChristoffelTensor) -> Result<Self> {
        let eigen = SymmetricEigen::try_new(*tik.matrix(), f64::EPSILON, MAX_EIGEN_ITERATIONS)
            .ok_or_else(|| AnisotropyError::NoConvergence {
                matrix: tik.to_rows(),
            })?;

        if eigen.eigenvalues.iter().any(|v| !v.is_finite()) {
            return Err(AnisotropyError::NoConvergence {
                matrix: tik.to_rows(),
            });
        }

        let mut order = [0usize, 1, 2];
        order.sort_by(|&a, &b| eigen.eigenvalues[b].total_cmp(&eigen.eigenvalues[a]));

        let mut moduli = [0.0; 3];
        let mut polarizations = [Vector3::zeros(); 3];
        for (slot, &column) in order.iter().enumerate() {
            moduli[slot] = eigen.eigenvalues[column];
            polarizations[slot] = canonical_sign(eigen.eigenvectors.column(column).normalize());
        }

        Ok(WaveSolution {
            moduli,
            polarizations,
        })
    }

    pub fn moduli(&self) -> [f64; 3] {
        self.moduli
    }

    pub fn modulus(&self, branch: Branch) -> f64 {
        self.moduli[branch.index()]
    }

    pub fn polarizations(&self) -> &[Vector3<f64>; 3] {
        &self.polarizations
    }

    pub fn polarization(&self, branch: Branch) -> Vector3<f64> {
        self.polarizations[branch.index()]
    }

    /// Phase velocities `sqrt(modulus / rho)` in branch order.
    ///
    /// `rho` must be positive; callers validate it once per sweep.
    pub fn velocities(&self, rho: f64) -> Result<[f64; 3]> {
        let mut velocities = [0.0; 3];
        for branch in Branch::ALL {
            let modulus = self.modulus(branch);
            if modulus < 0.0 {
                return Err(AnisotropyError::NegativeModulus { branch, modulus });
            }
            velocities[branch.index()] = (modulus / rho).sqrt();
        }
        Ok(velocities)
    }
}

fn canonical_sign(v: Vector3<f64>) -> Vector3<f64> {
    // first component of largest magnitude decides
    let mut dominant = 0;
    for i in 1..3 {
        if v[i].abs() > v[dominant].abs() {
            dominant = i;
        }
    }
    if v[dominant] < 0.0 {
        -v
    } else {
        v
    }
}
