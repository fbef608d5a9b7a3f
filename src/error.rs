//! Error types for tensor validation, wave solving and velocity sweeps.

use thiserror::Error;

use crate::wave::Branch;

/// Result alias used throughout the library.
pub type Result<T> = std::result::Result<T, AnisotropyError>;

/// Broad classification of an [`AnisotropyError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Malformed input: tensor shape or symmetry, direction, density, step, field.
    InvalidInput,
    /// Eigensolver failure or a non-physical (negative) modulus.
    NumericalFailure,
    /// The caller raised the cancellation flag during a sweep.
    Cancelled,
    /// The worker pool for a parallel sweep could not be built.
    WorkerPool,
}

#[derive(Error, Debug)]
pub enum AnisotropyError {
    #[error("stiffness tensor must have shape 3x3x3x3, got {shape:?}")]
    TensorShape { shape: Vec<usize> },

    #[error("stiffness tensor entry c{index:?} is not finite ({value})")]
    NonFiniteModulus { index: [usize; 4], value: f64 },

    #[error("stiffness tensor breaks {symmetry} symmetry at c{index:?}: {value} vs {mirrored}")]
    Asymmetric {
        symmetry: &'static str,
        index: [usize; 4],
        value: f64,
        mirrored: f64,
    },

    #[error("direction {vector:?} is not unit length (norm {norm})")]
    NonUnitDirection { vector: [f64; 3], norm: f64 },

    #[error("density must be positive, got {0}")]
    NonPositiveDensity(f64),

    #[error("angular step must be in (0, {max}] radians, got {step}")]
    InvalidStep { step: f64, max: f64 },

    #[error("velocity field is empty")]
    EmptyField,

    #[error(
        "velocity field components differ in length: {directions} directions, \
         vp {vp}, vs1 {vs1}, vs2 {vs2}"
    )]
    FieldLengthMismatch {
        directions: usize,
        vp: usize,
        vs1: usize,
        vs2: usize,
    },

    #[error("{branch} velocity at #{index} must be finite and non-negative, got {value}")]
    InvalidVelocity {
        branch: Branch,
        index: usize,
        value: f64,
    },

    #[error("anisotropy metric {name} is not finite (zero shear velocity or degenerate field)")]
    NonFiniteMetric { name: &'static str },

    #[error("eigensolver did not converge for Christoffel tensor {matrix:?}")]
    NoConvergence { matrix: [[f64; 3]; 3] },

    #[error("negative {branch} modulus {modulus}, tensor is not positive definite")]
    NegativeModulus { branch: Branch, modulus: f64 },

    #[error("direction #{index} {direction:?}: {source}")]
    AtDirection {
        index: usize,
        direction: [f64; 3],
        #[source]
        source: Box<AnisotropyError>,
    },

    #[error("sweep cancelled at direction #{index}")]
    Cancelled { index: usize },

    #[error("failed to build worker pool: {0}")]
    WorkerPool(#[from] rayon::ThreadPoolBuildError),
}

impl AnisotropyError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::TensorShape { .. }
            | Self::NonFiniteModulus { .. }
            | Self::Asymmetric { .. }
            | Self::NonUnitDirection { .. }
            | Self::NonPositiveDensity(_)
            | Self::InvalidStep { .. }
            | Self::EmptyField
            | Self::FieldLengthMismatch { .. }
            | Self::InvalidVelocity { .. }
            | Self::NonFiniteMetric { .. } => ErrorKind::InvalidInput,
            Self::NoConvergence { .. } | Self::NegativeModulus { .. } => {
                ErrorKind::NumericalFailure
            }
            Self::AtDirection { source, .. } => source.kind(),
            Self::Cancelled { .. } => ErrorKind::Cancelled,
            Self::WorkerPool(_) => ErrorKind::WorkerPool,
        }
    }

    /// Attach the failing direction to an evaluation error.
    pub fn at_direction(index: usize, direction: [f64; 3], source: AnisotropyError) -> Self {
        Self::AtDirection {
            index,
            direction,
            source: Box::new(source),
        }
    }

    /// Flat grid index of the failing direction, if the error carries one.
    pub fn direction_index(&self) -> Option<usize> {
        match self {
            Self::AtDirection { index, .. } | Self::Cancelled { index } => Some(*index),
            _ => None,
        }
    }
}
