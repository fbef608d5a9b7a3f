use serde::{Deserialize, Serialize};
use std::f64::consts::{FRAC_PI_2, PI, TAU};

use crate::direction::Direction;
use crate::error::{AnisotropyError, Result};

// Guards against an exactly divisible span being over-counted by rounding
const COUNT_GUARD: f64 = 1e-9;

/// Polar range covered by a sweep.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SamplingMode {
    /// θ in [0, π]
    #[default]
    FullSphere,
    /// θ in [0, π/2], the upper hemisphere used for stereographic analyses
    Hemisphere,
}

impl SamplingMode {
    pub fn theta_max(&self) -> f64 {
        match self {
            SamplingMode::FullSphere => PI,
            SamplingMode::Hemisphere => FRAC_PI_2,
        }
    }
}

/// Regular (θ, φ) direction grid, θ outer and φ inner.
///
/// Both axes include their upper bound. Each axis holds `ceil(span / step) + 1`
/// samples at `i * step`, with the final sample pinned to the span end.
#[derive(Debug, Clone, PartialEq)]
pub struct DirectionGrid {
    mode: SamplingMode,
    step: f64,      // Angular step (radians)
    n_theta: usize, // Number of polar samples
    n_phi: usize,   // Number of azimuthal samples
}

impl DirectionGrid {
    pub fn new(mode: SamplingMode, step: f64) -> Result<Self> {
        let max = mode.theta_max();
        if !step.is_finite() || step <= 0.0 || step > max {
            return Err(AnisotropyError::InvalidStep { step, max });
        }
        if step < 1e-3 {
            tracing::warn!(step, "very fine angular step, sweep will be large");
        }
        Ok(DirectionGrid {
            mode,
            step,
            n_theta: axis_count(max, step),
            n_phi: axis_count(TAU, step),
        })
    }

    /// Grid with the step given in degrees.
    pub fn with_step_degrees(mode: SamplingMode, degrees: f64) -> Result<Self> {
        Self::new(mode, degrees.to_radians())
    }

    /// Full sphere at one degree.
    pub fn full_sphere() -> Self {
        DirectionGrid {
            mode: SamplingMode::FullSphere,
            step: PI / 180.0,
            n_theta: 181,
            n_phi: 361,
        }
    }

    /// Upper hemisphere at one degree.
    pub fn hemisphere() -> Self {
        DirectionGrid {
            mode: SamplingMode::Hemisphere,
            step: PI / 180.0,
            n_theta: 91,
            n_phi: 361,
        }
    }

    pub fn mode(&self) -> SamplingMode {
        self.mode
    }

    /// Angular step in radians.
    pub fn step(&self) -> f64 {
        self.step
    }

    pub fn n_theta(&self) -> usize {
        self.n_theta
    }

    pub fn n_phi(&self) -> usize {
        self.n_phi
    }

    pub fn theta(&self, i: usize) -> f64 {
        axis_value(i, self.n_theta, self.step, self.mode.theta_max())
    }

    pub fn phi(&self, j: usize) -> f64 {
        axis_value(j, self.n_phi, self.step, TAU)
    }

    pub fn in_bounds(&self, i: usize, j: usize) -> bool {
        i < self.n_theta && j < self.n_phi
    }

    pub fn direction(&self, i: usize, j: usize) -> Direction {
        Direction::from_spherical(self.theta(i), self.phi(j))
    }

    /// Direction at a flat index (row-major, θ outer).
    pub fn direction_at(&self, index: usize) -> Direction {
        self.direction(index / self.n_phi, index % self.n_phi)
    }

    pub fn shape(&self) -> (usize, usize) {
        (self.n_theta, self.n_phi)
    }

    pub fn len(&self) -> usize {
        self.n_theta * self.n_phi
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Every direction in grid order. Each call restarts from the pole.
    pub fn iter(&self) -> impl Iterator<Item = Direction> + '_ {
        (0..self.n_theta).flat_map(move |i| (0..self.n_phi).map(move |j| self.direction(i, j)))
    }

    pub fn directions(&self) -> Vec<Direction> {
        self.iter().collect()
    }
}

fn axis_count(span: f64, step: f64) -> usize {
    (span / step - COUNT_GUARD).ceil() as usize + 1
}

fn axis_value(i: usize, count: usize, step: f64, span: f64) -> f64 {
    if i + 1 == count {
        span
    } else {
        i as f64 * step
    }
}
