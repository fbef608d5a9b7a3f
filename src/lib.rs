//! Directional elastic phase velocities and seismic anisotropy metrics.
//!
//! A [`StiffnessTensor`] and a density go in. For every direction of a
//! [`DirectionGrid`] the Christoffel tensor is built and solved for the quasi-P,
//! quasi-S1 and quasi-S2 moduli, giving a [`VelocityField`] that
//! [`AnisotropySummary`] reduces to extrema and percentage anisotropies.
//!
//! ```no_run
//! use elastic_anisotropy::{AnisotropySummary, DirectionGrid, StiffnessTensor, VelocitySweep};
//!
//! # fn main() -> elastic_anisotropy::Result<()> {
//! let c = StiffnessTensor::cubic(166.0e9, 64.0e9, 79.0e9)?;
//! let field = VelocitySweep::new(&c, 3000.0, &DirectionGrid::full_sphere())?.run_parallel(0)?;
//! let summary = AnisotropySummary::from_field(&field)?;
//! println!("AVp = {:.2} %", summary.p_wave_anisotropy_percent);
//! # Ok(())
//! # }
//! ```

pub mod christoffel;
pub mod config;
pub mod direction;
pub mod error;
pub mod field;
pub mod grid;
pub mod metrics;
pub mod sweep;
pub mod tensor;
pub mod wave;

pub use christoffel::ChristoffelTensor;
pub use direction::Direction;
pub use error::{AnisotropyError, ErrorKind, Result};
pub use field::{DirectionRecord, Metric, VelocityField};
pub use grid::{DirectionGrid, SamplingMode};
pub use metrics::{relative_difference_percent, summarize_materials, AnisotropySummary};
pub use sweep::{phase_velocities, VelocitySweep};
pub use tensor::{Material, StiffnessTensor};
pub use wave::{Branch, WaveSolution};
