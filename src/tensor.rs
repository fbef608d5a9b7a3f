use ndarray::{Array4, ArrayD, Ix4};

use crate::error::{AnisotropyError, Result};

// Relative tolerance for the elastic symmetry checks
const SYMMETRY_TOLERANCE: f64 = 1e-9;

/// Fourth-rank elastic stiffness tensor `c[i][j][k][l]`.
///
/// Validated on construction: shape 3x3x3x3, finite entries, minor symmetry
/// (`c_ijkl == c_jikl`) and major symmetry (`c_ijkl == c_klij`).
#[derive(Debug, Clone, PartialEq)]
pub struct StiffnessTensor {
    cijkl: Array4<f64>,
}

impl StiffnessTensor {
    pub fn new(cijkl: Array4<f64>) -> Result<Self> {
        let (a, b, c, d) = cijkl.dim();
        if (a, b, c, d) != (3, 3, 3, 3) {
            return Err(AnisotropyError::TensorShape {
                shape: vec![a, b, c, d],
            });
        }

        if let Some(((i, j, k, l), &value)) = cijkl.indexed_iter().find(|(_, v)| !v.is_finite()) {
            return Err(AnisotropyError::NonFiniteModulus {
                index: [i, j, k, l],
                value,
            });
        }

        let scale = cijkl.iter().fold(0.0_f64, |acc, v| acc.max(v.abs()));
        let tolerance = SYMMETRY_TOLERANCE * scale.max(f64::MIN_POSITIVE);

        for i in 0..3 {
            for j in 0..3 {
                for k in 0..3 {
                    for l in 0..3 {
                        let value = cijkl[[i, j, k, l]];

                        let minor = cijkl[[j, i, k, l]];
                        if (value - minor).abs() > tolerance {
                            return Err(AnisotropyError::Asymmetric {
                                symmetry: "minor",
                                index: [i, j, k, l],
                                value,
                                mirrored: minor,
                            });
                        }

                        let major = cijkl[[k, l, i, j]];
                        if (value - major).abs() > tolerance {
                            return Err(AnisotropyError::Asymmetric {
                                symmetry: "major",
                                index: [i, j, k, l],
                                value,
                                mirrored: major,
                            });
                        }
                    }
                }
            }
        }

        Ok(Self { cijkl })
    }

    /// Accept an array of unknown rank, e.g. one handed over from a Voigt converter.
    pub fn from_dyn(cijkl: ArrayD<f64>) -> Result<Self> {
        let shape = cijkl.shape().to_vec();
        let cijkl = cijkl
            .into_dimensionality::<Ix4>()
            .map_err(|_| AnisotropyError::TensorShape { shape })?;
        Self::new(cijkl)
    }

    /// Cubic crystal from its three independent moduli.
    pub fn cubic(c11: f64, c12: f64, c44: f64) -> Result<Self> {
        let mut cijkl = Array4::<f64>::zeros((3, 3, 3, 3));

        for i in 0..3 {
            for j in 0..3 {
                if i == j {
                    // c_iiii
                    cijkl[[i, i, i, i]] = c11;
                } else {
                    // c_iijj, then both shear orderings c_ijij and c_ijji
                    cijkl[[i, i, j, j]] = c12;
                    cijkl[[i, j, i, j]] = c44;
                    cijkl[[i, j, j, i]] = c44;
                }
            }
        }

        Self::new(cijkl)
    }

    /// Isotropic material from the Lamé parameters.
    pub fn isotropic(lambda: f64, mu: f64) -> Result<Self> {
        // An isotropic solid is the cubic case with c11 - c12 = 2 c44
        Self::cubic(lambda + 2.0 * mu, lambda, mu)
    }

    /// Isotropic material from P and S velocities and density.
    pub fn from_velocities(vp: f64, vs: f64, rho: f64) -> Result<Self> {
        let mu = rho * vs * vs;
        let lambda = rho * vp * vp - 2.0 * mu;
        Self::isotropic(lambda, mu)
    }

    pub fn get(&self, i: usize, j: usize, k: usize, l: usize) -> f64 {
        self.cijkl[[i, j, k, l]]
    }

    pub fn as_array(&self) -> &Array4<f64> {
        &self.cijkl
    }

    pub fn into_array(self) -> Array4<f64> {
        self.cijkl
    }

    /// Multiply every modulus by `factor`, e.g. 1e9 to go from GPa to Pa.
    pub fn scaled(&self, factor: f64) -> Result<Self> {
        Self::new(self.cijkl.mapv(|v| v * factor))
    }
}

/// Stiffness paired with density, one entry of a batch evaluation.
#[derive(Debug, Clone, PartialEq)]
pub struct Material {
    pub stiffness: StiffnessTensor,
    pub density: f64, // kg/m³
}

impl Material {
    pub fn new(stiffness: StiffnessTensor, density: f64) -> Self {
        Self { stiffness, density }
    }
}
