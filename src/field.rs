use nalgebra::Vector3;
use ndarray::{Array1, ArrayView1, ArrayView2, Zip};
use serde::{Deserialize, Serialize};

use crate::direction::Direction;
use crate::error::{AnisotropyError, Result};
use crate::grid::DirectionGrid;
use crate::metrics::relative_difference_percent;
use crate::wave::Branch;

/// Scalar derived from the three phase velocities of one direction.
///
/// Replaces integer-indexed panel selection in plotting code: a renderer picks
/// a variant and calls [`VelocityField::metric_values`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    VpVs1,
    Vp,
    Vs1,
    Vs2,
    AVpVs1,
    AVpVs2,
    ShearSplitting,
}

impl Metric {
    pub const ALL: [Metric; 7] = [
        Metric::VpVs1,
        Metric::Vp,
        Metric::Vs1,
        Metric::Vs2,
        Metric::AVpVs1,
        Metric::AVpVs2,
        Metric::ShearSplitting,
    ];

    pub fn evaluate(self, vp: f64, vs1: f64, vs2: f64) -> f64 {
        match self {
            Metric::VpVs1 => vp / vs1,
            Metric::Vp => vp,
            Metric::Vs1 => vs1,
            Metric::Vs2 => vs2,
            Metric::AVpVs1 => (vp - vs1) / (vp + vs1),
            Metric::AVpVs2 => (vp - vs2) / (vp + vs2),
            Metric::ShearSplitting => relative_difference_percent(vs1, vs2),
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Metric::VpVs1 => "VP/VS1",
            Metric::Vp => "VP",
            Metric::Vs1 => "VS1",
            Metric::Vs2 => "VS2",
            Metric::AVpVs1 => "AVpVs1",
            Metric::AVpVs2 => "AVpVs2",
            Metric::ShearSplitting => "AVs",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            Metric::VpVs1 => "Ratio of VP to VS1",
            Metric::Vp => "Velocity of P-waves (VP)",
            Metric::Vs1 => "Velocity of S1-waves (VS1)",
            Metric::Vs2 => "Velocity of S2-waves (VS2)",
            Metric::AVpVs1 => "Anisotropy measure for VP and VS1",
            Metric::AVpVs2 => "Anisotropy measure for VP and VS2",
            Metric::ShearSplitting => "Shear-wave splitting (%)",
        }
    }
}

/// Result of evaluating one direction during a sweep.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Sample {
    pub velocities: [f64; 3],
    pub polarizations: Option<[Vector3<f64>; 3]>,
}

/// One direction of a field in serializable form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DirectionRecord {
    pub direction: [f64; 3],
    /// (vp, vs1, vs2)
    pub velocities: [f64; 3],
    /// P, S1, S2 polarization vectors, present when the sweep kept them
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub polarizations: Option<[[f64; 3]; 3]>,
}

/// Phase velocities of the three branches, index-aligned with their directions.
#[derive(Debug, Clone, PartialEq)]
pub struct VelocityField {
    directions: Vec<Direction>,
    vp: Array1<f64>,
    vs1: Array1<f64>,
    vs2: Array1<f64>,
    polarizations: Option<Vec<[Vector3<f64>; 3]>>,
    shape: Option<(usize, usize)>, // (n_theta, n_phi) when built from a grid
}

impl VelocityField {
    /// Assemble a field from externally computed sequences.
    ///
    /// Every velocity must be finite and non-negative.
    pub fn new(
        directions: Vec<Direction>,
        vp: Vec<f64>,
        vs1: Vec<f64>,
        vs2: Vec<f64>,
    ) -> Result<Self> {
        let n = directions.len();
        if vp.len() != n || vs1.len() != n || vs2.len() != n {
            return Err(AnisotropyError::FieldLengthMismatch {
                directions: n,
                vp: vp.len(),
                vs1: vs1.len(),
                vs2: vs2.len(),
            });
        }
        for (branch, values) in Branch::ALL.into_iter().zip([&vp, &vs1, &vs2]) {
            if let Some((index, &value)) = values
                .iter()
                .enumerate()
                .find(|(_, v)| !v.is_finite() || **v < 0.0)
            {
                return Err(AnisotropyError::InvalidVelocity {
                    branch,
                    index,
                    value,
                });
            }
        }
        Ok(VelocityField {
            directions,
            vp: Array1::from(vp),
            vs1: Array1::from(vs1),
            vs2: Array1::from(vs2),
            polarizations: None,
            shape: None,
        })
    }

    pub(crate) fn from_samples(grid: &DirectionGrid, samples: Vec<Sample>) -> Self {
        let n = samples.len();
        debug_assert_eq!(n, grid.len());

        let mut vp = Array1::<f64>::zeros(n);
        let mut vs1 = Array1::<f64>::zeros(n);
        let mut vs2 = Array1::<f64>::zeros(n);
        let mut polarizations = Vec::new();

        for (idx, sample) in samples.iter().enumerate() {
            vp[idx] = sample.velocities[0];
            vs1[idx] = sample.velocities[1];
            vs2[idx] = sample.velocities[2];
            if let Some(p) = sample.polarizations {
                polarizations.push(p);
            }
        }

        let polarizations = (polarizations.len() == n && n > 0).then_some(polarizations);

        VelocityField {
            directions: grid.directions(),
            vp,
            vs1,
            vs2,
            polarizations,
            shape: Some(grid.shape()),
        }
    }

    pub fn len(&self) -> usize {
        self.directions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.directions.is_empty()
    }

    pub fn directions(&self) -> &[Direction] {
        &self.directions
    }

    pub fn vp(&self) -> ArrayView1<'_, f64> {
        self.vp.view()
    }

    pub fn vs1(&self) -> ArrayView1<'_, f64> {
        self.vs1.view()
    }

    pub fn vs2(&self) -> ArrayView1<'_, f64> {
        self.vs2.view()
    }

    pub fn branch(&self, branch: Branch) -> ArrayView1<'_, f64> {
        match branch {
            Branch::P => self.vp.view(),
            Branch::S1 => self.vs1.view(),
            Branch::S2 => self.vs2.view(),
        }
    }

    /// (n_theta, n_phi) of the originating grid, if any.
    pub fn shape(&self) -> Option<(usize, usize)> {
        self.shape
    }

    /// One branch laid out as rows of constant θ.
    pub fn branch_grid(&self, branch: Branch) -> Option<ArrayView2<'_, f64>> {
        let shape = self.shape?;
        self.branch(branch).into_shape_with_order(shape).ok()
    }

    /// Direction and (vp, vs1, vs2) at a flat index.
    pub fn sample(&self, index: usize) -> Option<(Direction, [f64; 3])> {
        let direction = *self.directions.get(index)?;
        Some((
            direction,
            [self.vp[index], self.vs1[index], self.vs2[index]],
        ))
    }

    /// Polarizations per direction, in branch order, if the sweep kept them.
    pub fn polarizations(&self) -> Option<&[[Vector3<f64>; 3]]> {
        self.polarizations.as_deref()
    }

    /// Every direction with its velocities and, if kept, polarizations.
    pub fn records(&self) -> Vec<DirectionRecord> {
        (0..self.len())
            .filter_map(|index| {
                let (direction, velocities) = self.sample(index)?;
                let polarizations = self
                    .polarizations
                    .as_ref()
                    .map(|all| all[index].map(|p| [p.x, p.y, p.z]));
                Some(DirectionRecord {
                    direction: direction.as_array(),
                    velocities,
                    polarizations,
                })
            })
            .collect()
    }

    pub fn metric_values(&self, metric: Metric) -> Array1<f64> {
        Zip::from(&self.vp)
            .and(&self.vs1)
            .and(&self.vs2)
            .map_collect(|&vp, &vs1, &vs2| metric.evaluate(vp, vs1, vs2))
    }

    /// Point-wise `200 (vs1 - vs2) / (vs1 + vs2)`.
    pub fn shear_splitting_percent(&self) -> Array1<f64> {
        self.metric_values(Metric::ShearSplitting)
    }

    /// Point-wise `vs1 - vs2`.
    pub fn shear_difference(&self) -> Array1<f64> {
        &self.vs1 - &self.vs2
    }

    /// Point-wise `vp / vs1`.
    pub fn vp_vs1_ratio(&self) -> Array1<f64> {
        self.metric_values(Metric::VpVs1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::SamplingMode;
    use approx::assert_relative_eq;

    fn small_field() -> VelocityField {
        let directions = vec![
            Direction::new(1.0, 0.0, 0.0).unwrap(),
            Direction::new(0.0, 1.0, 0.0).unwrap(),
            Direction::new(0.0, 0.0, 1.0).unwrap(),
        ];
        VelocityField::new(
            directions,
            vec![8.0, 7.0, 6.0],
            vec![5.0, 4.0, 4.0],
            vec![3.0, 4.0, 2.0],
        )
        .unwrap()
    }

    #[test]
    fn rejects_ragged_sequences() {
        let err = VelocityField::new(
            vec![Direction::new(1.0, 0.0, 0.0).unwrap()],
            vec![1.0, 2.0],
            vec![1.0],
            vec![1.0],
        )
        .unwrap_err();
        assert!(matches!(
            err,
            AnisotropyError::FieldLengthMismatch { directions: 1, vp: 2, .. }
        ));
    }

    #[test]
    fn rejects_nan_and_negative_velocities() {
        let directions = || {
            vec![
                Direction::new(1.0, 0.0, 0.0).unwrap(),
                Direction::new(0.0, 1.0, 0.0).unwrap(),
            ]
        };
        let err = VelocityField::new(directions(), vec![f64::NAN, 5.0], vec![3.0; 2], vec![2.0; 2])
            .unwrap_err();
        assert!(matches!(
            err,
            AnisotropyError::InvalidVelocity { branch: Branch::P, index: 0, .. }
        ));
        assert_eq!(err.kind(), crate::error::ErrorKind::InvalidInput);

        let err = VelocityField::new(directions(), vec![5.0; 2], vec![3.0; 2], vec![2.0, -1.0])
            .unwrap_err();
        assert!(matches!(
            err,
            AnisotropyError::InvalidVelocity { branch: Branch::S2, index: 1, .. }
        ));

        let err =
            VelocityField::new(directions(), vec![5.0; 2], vec![f64::INFINITY, 3.0], vec![2.0; 2])
                .unwrap_err();
        assert!(matches!(err, AnisotropyError::InvalidVelocity { branch: Branch::S1, .. }));
    }

    #[test]
    fn records_carry_polarizations_when_kept() {
        let grid = DirectionGrid::with_step_degrees(SamplingMode::Hemisphere, 90.0).unwrap();
        let samples = (0..grid.len())
            .map(|i| Sample {
                velocities: [3.0, 2.0, 1.0 + i as f64],
                polarizations: Some([Vector3::z(), Vector3::x(), Vector3::y()]),
            })
            .collect();
        let field = VelocityField::from_samples(&grid, samples);
        let records = field.records();
        assert_eq!(records.len(), grid.len());
        assert_eq!(records[4].velocities, [3.0, 2.0, 5.0]);
        assert_eq!(records[4].direction, grid.direction_at(4).as_array());
        assert_eq!(
            records[0].polarizations,
            Some([[0.0, 0.0, 1.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]])
        );

        assert!(small_field().records().iter().all(|r| r.polarizations.is_none()));
    }

    #[test]
    fn metrics_follow_the_plot_definitions() {
        let field = small_field();
        let ratio = field.metric_values(Metric::VpVs1);
        assert_relative_eq!(ratio[0], 8.0 / 5.0);
        let a = field.metric_values(Metric::AVpVs2);
        assert_relative_eq!(a[2], (6.0 - 2.0) / (6.0 + 2.0));
        assert_eq!(field.metric_values(Metric::Vs2), field.vs2().to_owned());
    }

    #[test]
    fn splitting_and_difference() {
        let field = small_field();
        let splitting = field.shear_splitting_percent();
        assert_relative_eq!(splitting[0], 200.0 * 2.0 / 8.0);
        assert_eq!(splitting[1], 0.0);
        assert_eq!(field.shear_difference().to_vec(), vec![2.0, 0.0, 2.0]);
    }

    #[test]
    fn sample_pairs_direction_with_velocities() {
        let field = small_field();
        let (n, v) = field.sample(1).unwrap();
        assert_eq!(n.y(), 1.0);
        assert_eq!(v, [7.0, 4.0, 4.0]);
        assert!(field.sample(3).is_none());
        assert!(field.branch_grid(Branch::P).is_none());
    }

    #[test]
    fn grid_fields_reshape_by_theta_rows() {
        let grid = DirectionGrid::with_step_degrees(SamplingMode::Hemisphere, 45.0).unwrap();
        let samples = (0..grid.len())
            .map(|i| Sample {
                velocities: [i as f64, 0.0, 0.0],
                polarizations: None,
            })
            .collect();
        let field = VelocityField::from_samples(&grid, samples);
        let vp = field.branch_grid(Branch::P).unwrap();
        assert_eq!(vp.dim(), grid.shape());
        assert_eq!(vp[[1, 2]], (grid.n_phi() + 2) as f64);
        assert!(field.polarizations().is_none());
    }
}
