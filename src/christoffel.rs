use nalgebra::Matrix3;

use crate::direction::Direction;
use crate::error::Result;
use crate::tensor::StiffnessTensor;

/// Christoffel tensor `T_ik = c_ijkl n_j n_l` for one propagation direction.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChristoffelTensor(Matrix3<f64>);

impl ChristoffelTensor {
    pub fn new(c: &StiffnessTensor, n: &Direction) -> Self {
        let n = n.as_array();
        let mut tik = Matrix3::<f64>::zeros();

        // Full contraction over j and l for every (i, k)
        for i in 0..3 {
            for k in 0..3 {
                let mut sum = 0.0;
                for j in 0..3 {
                    for l in 0..3 {
                        sum += c.get(i, j, k, l) * n[j] * n[l];
                    }
                }
                tik[(i, k)] = sum;
            }
        }

        ChristoffelTensor(tik)
    }

    /// Builds from a raw vector, which must already be unit length.
    pub fn for_direction(c: &StiffnessTensor, n: [f64; 3]) -> Result<Self> {
        let n = Direction::try_from(n)?;
        Ok(Self::new(c, &n))
    }

    pub fn get(&self, i: usize, k: usize) -> f64 {
        self.0[(i, k)]
    }

    pub fn matrix(&self) -> &Matrix3<f64> {
        &self.0
    }

    pub fn to_rows(&self) -> [[f64; 3]; 3] {
        let m = &self.0;
        [
            [m[(0, 0)], m[(0, 1)], m[(0, 2)]],
            [m[(1, 0)], m[(1, 1)], m[(1, 2)]],
            [m[(2, 0)], m[(2, 1)], m[(2, 2)]],
        ]
    }

    pub fn is_symmetric(&self, tolerance: f64) -> bool {
        (0..3).all(|i| (0..3).all(|k| (self.0[(i, k)] - self.0[(k, i)]).abs() <= tolerance))
    }
}

// Only the lower triangle is read by the eigensolver
impl From<Matrix3<f64>> for ChristoffelTensor {
    fn from(m: Matrix3<f64>) -> Self {
        ChristoffelTensor(m)
    }
}

impl From<ChristoffelTensor> for Matrix3<f64> {
    fn from(t: ChristoffelTensor) -> Self {
        t.0
    }
}
