//! Scalar anisotropy statistics of a completed velocity field.

use ndarray::ArrayView1;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::error::{AnisotropyError, Result};
use crate::field::VelocityField;
use crate::grid::DirectionGrid;
use crate::sweep::VelocitySweep;
use crate::tensor::Material;

/// Symmetric relative difference `200 (a - b) / (a + b)`, in percent.
pub fn relative_difference_percent(a: f64, b: f64) -> f64 {
    200.0 * (a - b) / (a + b)
}

/// Extrema and anisotropy percentages of a velocity field.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AnisotropySummary {
    pub max_vp: f64,
    pub min_vp: f64,
    pub max_vs1: f64,
    pub min_vs1: f64,
    pub max_vs2: f64,
    pub min_vs2: f64,
    /// Largest point-wise shear-wave splitting, percent
    pub max_vs_anisotropy_percent: f64,
    /// Smallest point-wise shear-wave splitting, percent
    pub min_vs_anisotropy_percent: f64,
    pub p_wave_anisotropy_percent: f64,
    pub s1_wave_anisotropy_percent: f64,
    pub s2_wave_anisotropy_percent: f64,
    /// Largest point-wise `vs1 - vs2`
    pub max_dvs: f64,
    /// Anisotropy of the point-wise Vp/Vs1 ratio, percent
    pub vp_vs1_anisotropy_percent: f64,
}

impl AnisotropySummary {
    pub fn from_field(field: &VelocityField) -> Result<Self> {
        if field.is_empty() {
            return Err(AnisotropyError::EmptyField);
        }

        let (max_vp, min_vp) = extrema("vp", field.vp())?;
        let (max_vs1, min_vs1) = extrema("vs1", field.vs1())?;
        let (max_vs2, min_vs2) = extrema("vs2", field.vs2())?;

        let splitting = field.shear_splitting_percent();
        let (max_vs_anisotropy_percent, min_vs_anisotropy_percent) =
            extrema("vs_anisotropy_percent", splitting.view())?;

        let (max_dvs, _) = extrema("dvs", field.shear_difference().view())?;

        let ratio = field.vp_vs1_ratio();
        let (max_ratio, min_ratio) = extrema("vp_vs1_ratio", ratio.view())?;

        let summary = AnisotropySummary {
            max_vp,
            min_vp,
            max_vs1,
            min_vs1,
            max_vs2,
            min_vs2,
            max_vs_anisotropy_percent,
            min_vs_anisotropy_percent,
            p_wave_anisotropy_percent: relative_difference_percent(max_vp, min_vp),
            s1_wave_anisotropy_percent: relative_difference_percent(max_vs1, min_vs1),
            s2_wave_anisotropy_percent: relative_difference_percent(max_vs2, min_vs2),
            max_dvs,
            vp_vs1_anisotropy_percent: relative_difference_percent(max_ratio, min_ratio),
        };

        // a branch that is zero everywhere gives 0/0 in its anisotropy
        if let Some((name, _)) = summary.entries().into_iter().find(|(_, v)| !v.is_finite()) {
            return Err(AnisotropyError::NonFiniteMetric { name });
        }
        Ok(summary)
    }

    /// Every scalar with a stable name, in declaration order.
    pub fn entries(&self) -> [(&'static str, f64); 13] {
        [
            ("max_vp", self.max_vp),
            ("min_vp", self.min_vp),
            ("max_vs1", self.max_vs1),
            ("min_vs1", self.min_vs1),
            ("max_vs2", self.max_vs2),
            ("min_vs2", self.min_vs2),
            ("max_vs_anisotropy_percent", self.max_vs_anisotropy_percent),
            ("min_vs_anisotropy_percent", self.min_vs_anisotropy_percent),
            ("p_wave_anisotropy_percent", self.p_wave_anisotropy_percent),
            ("s1_wave_anisotropy_percent", self.s1_wave_anisotropy_percent),
            ("s2_wave_anisotropy_percent", self.s2_wave_anisotropy_percent),
            ("max_dvs", self.max_dvs),
            ("vp_vs1_anisotropy_percent", self.vp_vs1_anisotropy_percent),
        ]
    }
}

// (max, min) of a non-empty view; any NaN or infinity is an error
fn extrema(name: &'static str, values: ArrayView1<'_, f64>) -> Result<(f64, f64)> {
    let mut bounds: Option<(f64, f64)> = None;
    for &v in values.iter() {
        if !v.is_finite() {
            return Err(AnisotropyError::NonFiniteMetric { name });
        }
        bounds = Some(match bounds {
            Some((max, min)) => (max.max(v), min.min(v)),
            None => (v, v),
        });
    }
    bounds.ok_or(AnisotropyError::EmptyField)
}

/// Summaries for several materials, in input order.
///
/// Materials are spread across rayon's global pool; each sweep runs serially.
pub fn summarize_materials(
    materials: &[Material],
    grid: &DirectionGrid,
) -> Result<Vec<AnisotropySummary>> {
    materials
        .par_iter()
        .map(|material| {
            let field = VelocitySweep::new(&material.stiffness, material.density, grid)?
                .with_report_period(0)
                .run()?;
            AnisotropySummary::from_field(&field)
        })
        .collect()
}
