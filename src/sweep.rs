use rayon::prelude::*;
use rayon::ThreadPoolBuilder;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;
use tracing::{debug, info};

use crate::christoffel::ChristoffelTensor;
use crate::direction::Direction;
use crate::error::{AnisotropyError, Result};
use crate::field::{Sample, VelocityField};
use crate::grid::DirectionGrid;
use crate::tensor::StiffnessTensor;
use crate::wave::WaveSolution;

/// Sweeps the Christoffel solution over every direction of a grid.
///
/// Stiffness and density are only read. Each direction is evaluated
/// independently and its result stored at the direction's grid index, so the
/// serial and parallel runs produce the same field.
pub struct VelocitySweep<'a> {
    stiffness: &'a StiffnessTensor,
    density: f64,
    grid: DirectionGrid,
    report_period: usize, // θ rows between progress reports
    keep_polarizations: bool,
    cancel: Option<&'a AtomicBool>,
}

impl<'a> VelocitySweep<'a> {
    pub fn new(stiffness: &'a StiffnessTensor, density: f64, grid: &DirectionGrid) -> Result<Self> {
        if !density.is_finite() || density <= 0.0 {
            return Err(AnisotropyError::NonPositiveDensity(density));
        }
        Ok(Self {
            stiffness,
            density,
            grid: grid.clone(),
            report_period: 20,
            keep_polarizations: false,
            cancel: None,
        })
    }

    /// Keep the three polarization vectors of every direction in the field.
    pub fn with_polarizations(mut self, keep: bool) -> Self {
        self.keep_polarizations = keep;
        self
    }

    pub fn with_report_period(mut self, rows: usize) -> Self {
        self.report_period = rows;
        self
    }

    /// Flag polled between directions; raising it stops the sweep with `Cancelled`.
    pub fn with_cancel_flag(mut self, flag: &'a AtomicBool) -> Self {
        self.cancel = Some(flag);
        self
    }

    pub fn grid(&self) -> &DirectionGrid {
        &self.grid
    }

    pub fn density(&self) -> f64 {
        self.density
    }

    fn is_cancelled(&self) -> bool {
        self.cancel.is_some_and(|flag| flag.load(Ordering::Relaxed))
    }

    fn evaluate(&self, index: usize, n: &Direction) -> Result<Sample> {
        let solve = || -> Result<Sample> {
            let tik = ChristoffelTensor::new(self.stiffness, n);
            let solution = WaveSolution::solve(&tik)?;
            let velocities = solution.velocities(self.density)?;
            Ok(Sample {
                velocities,
                polarizations: self.keep_polarizations.then(|| *solution.polarizations()),
            })
        };
        solve().map_err(|e| AnisotropyError::at_direction(index, n.as_array(), e))
    }

    /// Sequential sweep in grid order.
    pub fn run(&self) -> Result<VelocityField> {
        let (n_theta, n_phi) = self.grid.shape();
        info!(
            directions = self.grid.len(),
            n_theta,
            n_phi,
            density = self.density,
            "starting velocity sweep"
        );
        let start = Instant::now();

        let mut samples = Vec::with_capacity(self.grid.len());
        for i in 0..n_theta {
            if self.is_cancelled() {
                return Err(AnisotropyError::Cancelled { index: i * n_phi });
            }

            for j in 0..n_phi {
                let index = i * n_phi + j;
                samples.push(self.evaluate(index, &self.grid.direction(i, j))?);
            }

            if self.report_period > 0 && (i + 1) % self.report_period == 0 {
                debug!(row = i + 1, n_theta, "sweep progress");
            }
        }

        info!(elapsed_ms = start.elapsed().as_millis() as u64, "velocity sweep complete");
        Ok(VelocityField::from_samples(&self.grid, samples))
    }

    /// Parallel sweep on a dedicated pool of `threads` workers (0 = rayon default).
    pub fn run_parallel(&self, threads: usize) -> Result<VelocityField> {
        let pool = ThreadPoolBuilder::new().num_threads(threads).build()?;
        info!(
            directions = self.grid.len(),
            threads = pool.current_num_threads(),
            density = self.density,
            "starting parallel velocity sweep"
        );
        let start = Instant::now();

        let samples = pool.install(|| {
            (0..self.grid.len())
                .into_par_iter()
                .map(|index| {
                    if self.is_cancelled() {
                        return Err(AnisotropyError::Cancelled { index });
                    }
                    self.evaluate(index, &self.grid.direction_at(index))
                })
                .collect::<Result<Vec<Sample>>>()
        })?;

        info!(elapsed_ms = start.elapsed().as_millis() as u64, "velocity sweep complete");
        Ok(VelocityField::from_samples(&self.grid, samples))
    }
}

/// Sequential phase velocities of `stiffness` over `grid`.
pub fn phase_velocities(
    stiffness: &StiffnessTensor,
    density: f64,
    grid: &DirectionGrid,
) -> Result<VelocityField> {
    VelocitySweep::new(stiffness, density, grid)?.run()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::grid::SamplingMode;
    use approx::assert_relative_eq;
    use ndarray::Array4;

    fn coarse_grid() -> DirectionGrid {
        DirectionGrid::with_step_degrees(SamplingMode::FullSphere, 15.0).unwrap()
    }

    #[test]
    fn rejects_non_positive_density() {
        let c = StiffnessTensor::isotropic(30.0, 20.0).unwrap();
        for rho in [0.0, -1.0, f64::NAN] {
            let err = phase_velocities(&c, rho, &coarse_grid()).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::InvalidInput);
        }
    }

    #[test]
    fn isotropic_velocities_everywhere() {
        let (lambda, mu, rho) = (60.0e9, 40.0e9, 3000.0);
        let c = StiffnessTensor::isotropic(lambda, mu).unwrap();
        let field = phase_velocities(&c, rho, &coarse_grid()).unwrap();
        let vp = ((lambda + 2.0 * mu) / rho).sqrt();
        let vs = (mu / rho).sqrt();
        for idx in 0..field.len() {
            let (_, v) = field.sample(idx).unwrap();
            assert_relative_eq!(v[0], vp, max_relative = 1e-10);
            assert_relative_eq!(v[1], vs, max_relative = 1e-10);
            assert_relative_eq!(v[2], vs, max_relative = 1e-10);
        }
    }

    #[test]
    fn negative_modulus_names_the_direction() {
        // c44 < 0 gives a negative shear modulus along every axis
        let c = StiffnessTensor::cubic(166.0, 64.0, -79.0).unwrap();
        let err = phase_velocities(&c, 3000.0, &coarse_grid()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NumericalFailure);
        match err {
            AnisotropyError::AtDirection {
                index,
                direction,
                source,
            } => {
                assert_eq!(index, 0);
                assert_eq!(direction, [0.0, 0.0, 1.0]);
                assert!(matches!(*source, AnisotropyError::NegativeModulus { .. }));
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn zero_tensor_sweeps_to_zero_velocities() {
        let c = StiffnessTensor::new(Array4::zeros((3, 3, 3, 3))).unwrap();
        let field = phase_velocities(&c, 1.0, &coarse_grid()).unwrap();
        assert!(field.vp().iter().all(|v| *v == 0.0));
    }

    #[test]
    fn parallel_matches_serial() {
        let c = StiffnessTensor::cubic(166.0e9, 64.0e9, 79.0e9).unwrap();
        let grid = DirectionGrid::with_step_degrees(SamplingMode::FullSphere, 5.0).unwrap();
        let sweep = VelocitySweep::new(&c, 3000.0, &grid).unwrap();
        let serial = sweep.run().unwrap();
        let parallel = sweep.run_parallel(4).unwrap();
        assert_eq!(serial, parallel);
    }

    #[test]
    fn polarizations_are_kept_on_request() {
        let c = StiffnessTensor::cubic(166.0, 64.0, 79.0).unwrap();
        let field = VelocitySweep::new(&c, 3.0, &coarse_grid())
            .unwrap()
            .with_polarizations(true)
            .run_parallel(2)
            .unwrap();
        let polarizations = field.polarizations().unwrap();
        assert_eq!(polarizations.len(), field.len());
        // north pole: P polarized along z
        assert_relative_eq!(polarizations[0][0].z, 1.0, epsilon = 1e-12);
    }

    #[test]
    fn raised_flag_cancels_both_modes() {
        let c = StiffnessTensor::isotropic(30.0, 20.0).unwrap();
        let flag = AtomicBool::new(true);
        let sweep = VelocitySweep::new(&c, 1.0, &coarse_grid())
            .unwrap()
            .with_cancel_flag(&flag);

        let err = sweep.run().unwrap_err();
        assert!(matches!(err, AnisotropyError::Cancelled { index: 0 }));
        let err = sweep.run_parallel(2).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Cancelled);

        flag.store(false, Ordering::Relaxed);
        assert!(sweep.run().is_ok());
    }
}
