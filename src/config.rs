use anyhow::{anyhow, Context, Result};
use ndarray::Array4;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::grid::{DirectionGrid, SamplingMode};
use crate::tensor::{Material, StiffnessTensor};

// Voigt index of the symmetric pair (i, j): 11→0, 22→1, 33→2, 23→3, 13→4, 12→5
const VOIGT_INDEX: [[usize; 3]; 3] = [[0, 5, 4], [5, 1, 3], [4, 3, 2]];

/// Expand a 6x6 Voigt stiffness matrix to the full fourth-rank tensor.
pub fn voigt_to_tensor(voigt: &[[f64; 6]; 6]) -> crate::error::Result<StiffnessTensor> {
    let mut cijkl = Array4::<f64>::zeros((3, 3, 3, 3));
    for ((i, j, k, l), c) in cijkl.indexed_iter_mut() {
        *c = voigt[VOIGT_INDEX[i][j]][VOIGT_INDEX[k][l]];
    }
    StiffnessTensor::new(cijkl)
}

/// Direction grid configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SamplingConfig {
    #[serde(default)]
    pub mode: SamplingMode,
    #[serde(default = "default_step_degrees")]
    pub step_degrees: f64,
}

fn default_step_degrees() -> f64 {
    1.0
}

impl Default for SamplingConfig {
    fn default() -> Self {
        Self {
            mode: SamplingMode::default(),
            step_degrees: default_step_degrees(),
        }
    }
}

impl SamplingConfig {
    fn validate(&self) -> Result<()> {
        let max = self.mode.theta_max().to_degrees();
        if !(self.step_degrees > 0.0 && self.step_degrees <= max) {
            return Err(anyhow!(
                "step_degrees must be in (0, {}], got {}",
                max,
                self.step_degrees
            ));
        }
        Ok(())
    }

    pub fn grid(&self) -> Result<DirectionGrid> {
        Ok(DirectionGrid::with_step_degrees(self.mode, self.step_degrees)?)
    }
}

/// Sweep execution configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SweepConfig {
    #[serde(default = "default_parallel")]
    pub parallel: bool,
    #[serde(default)]
    pub threads: usize, // 0 lets rayon pick
    #[serde(default = "default_report_period")]
    pub report_period: usize,
    #[serde(default)]
    pub polarizations: bool,
}

fn default_parallel() -> bool {
    true
}

fn default_report_period() -> usize {
    20
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self {
            parallel: default_parallel(),
            threads: 0,
            report_period: default_report_period(),
            polarizations: false,
        }
    }
}

/// One material: density plus either a Voigt matrix or isotropic velocities
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MaterialConfig {
    pub name: String,
    pub density: f64, // kg/m³
    #[serde(default = "default_modulus_scale")]
    pub modulus_scale: f64, // e.g. 1e9 when moduli are given in GPa
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub voigt: Option<[[f64; 6]; 6]>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vp: Option<f64>, // P-wave velocity (m/s)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vs: Option<f64>, // S-wave velocity (m/s)
}

fn default_modulus_scale() -> f64 {
    1.0
}

impl MaterialConfig {
    fn validate(&self) -> Result<()> {
        if !(self.density > 0.0) {
            return Err(anyhow!(
                "Material '{}': density must be positive, got {}",
                self.name,
                self.density
            ));
        }
        if !(self.modulus_scale > 0.0) {
            return Err(anyhow!(
                "Material '{}': modulus_scale must be positive, got {}",
                self.name,
                self.modulus_scale
            ));
        }

        match (&self.voigt, self.vp, self.vs) {
            (Some(_), None, None) => Ok(()),
            (None, Some(vp), Some(vs)) => {
                if vp <= 0.0 || vs <= 0.0 {
                    return Err(anyhow!(
                        "Material '{}': velocities must be positive (vp={}, vs={})",
                        self.name,
                        vp,
                        vs
                    ));
                }
                if vs > vp {
                    return Err(anyhow!(
                        "Material '{}': S-wave velocity must be less than P-wave velocity (vs={} > vp={})",
                        self.name,
                        vs,
                        vp
                    ));
                }
                Ok(())
            }
            _ => Err(anyhow!(
                "Material '{}': give either a 6x6 `voigt` matrix or both `vp` and `vs`",
                self.name
            )),
        }
    }

    pub fn stiffness(&self) -> Result<StiffnessTensor> {
        let tensor = match (&self.voigt, self.vp, self.vs) {
            (Some(voigt), _, _) => voigt_to_tensor(voigt)?.scaled(self.modulus_scale)?,
            (None, Some(vp), Some(vs)) => StiffnessTensor::from_velocities(vp, vs, self.density)?,
            _ => return Err(anyhow!("Material '{}' has no stiffness", self.name)),
        };
        Ok(tensor)
    }

    pub fn material(&self) -> Result<Material> {
        let stiffness = self
            .stiffness()
            .with_context(|| format!("Invalid stiffness for material '{}'", self.name))?;
        Ok(Material::new(stiffness, self.density))
    }
}

/// Report output configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OutputConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
}

/// Complete run configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub sampling: SamplingConfig,
    #[serde(default)]
    pub sweep: SweepConfig,
    pub materials: Vec<MaterialConfig>,
    #[serde(default)]
    pub output: OutputConfig,
}

impl Config {
    /// Load configuration from TOML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file '{}'", path.display()))?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Config =
            toml::from_str(content).map_err(|e| anyhow!("Failed to parse TOML config: {}", e))?;

        // Validate before returning
        config.validate()?;

        Ok(config)
    }

    /// Validate all configuration parameters
    pub fn validate(&self) -> Result<()> {
        self.sampling.validate()?;

        if self.materials.is_empty() {
            return Err(anyhow!("At least one material must be defined"));
        }
        for material in &self.materials {
            material.validate()?;
            // catches asymmetric Voigt input before any sweep starts
            material.stiffness()?;
        }

        Ok(())
    }

    /// Log configuration summary
    pub fn log_summary(&self) {
        let grid = self.sampling.grid().ok();
        info!(
            mode = ?self.sampling.mode,
            step_degrees = self.sampling.step_degrees,
            directions = grid.map(|g| g.len()).unwrap_or(0),
            "sampling"
        );
        info!(
            parallel = self.sweep.parallel,
            threads = self.sweep.threads,
            polarizations = self.sweep.polarizations,
            "sweep"
        );
        for (i, material) in self.materials.iter().enumerate() {
            let form = if material.voigt.is_some() { "voigt" } else { "isotropic" };
            info!(
                index = i,
                name = %material.name,
                density = material.density,
                form,
                "material"
            );
        }
        if let Some(path) = &self.output.path {
            info!(path = %path.display(), "report output");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CUBIC: &str = r#"
        [sampling]
        mode = "hemisphere"
        step_degrees = 5.0

        [sweep]
        parallel = false

        [[materials]]
        name = "cubic"
        density = 3000.0
        modulus_scale = 1e9
        voigt = [
            [166.0, 64.0, 64.0, 0.0, 0.0, 0.0],
            [64.0, 166.0, 64.0, 0.0, 0.0, 0.0],
            [64.0, 64.0, 166.0, 0.0, 0.0, 0.0],
            [0.0, 0.0, 0.0, 79.0, 0.0, 0.0],
            [0.0, 0.0, 0.0, 0.0, 79.0, 0.0],
            [0.0, 0.0, 0.0, 0.0, 0.0, 79.0],
        ]

        [[materials]]
        name = "granite"
        density = 2700.0
        vp = 6000.0
        vs = 3500.0
    "#;

    #[test]
    fn parses_voigt_and_isotropic_materials() {
        let config = Config::from_toml_str(CUBIC).unwrap();
        assert_eq!(config.sampling.mode, SamplingMode::Hemisphere);
        assert!(!config.sweep.parallel);
        assert_eq!(config.sweep.report_period, 20);
        assert_eq!(config.materials.len(), 2);
        assert!(config.output.path.is_none());

        let cubic = config.materials[0].material().unwrap();
        assert_eq!(cubic.stiffness, StiffnessTensor::cubic(166.0e9, 64.0e9, 79.0e9).unwrap());
        let granite = config.materials[1].material().unwrap();
        assert_eq!(granite.density, 2700.0);
    }

    #[test]
    fn defaults_apply_when_sections_are_missing() {
        let config = Config::from_toml_str(
            r#"
            [[materials]]
            name = "rock"
            density = 2500.0
            vp = 5000.0
            vs = 3000.0
            "#,
        )
        .unwrap();
        assert_eq!(config.sampling.mode, SamplingMode::FullSphere);
        assert_eq!(config.sampling.step_degrees, 1.0);
        assert!(config.sweep.parallel);
        assert_eq!(config.sampling.grid().unwrap(), DirectionGrid::full_sphere());
    }

    #[test]
    fn rejects_ambiguous_or_missing_stiffness() {
        let err = Config::from_toml_str(
            r#"
            [[materials]]
            name = "half"
            density = 2500.0
            vp = 5000.0
            "#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("either"));

        let err = Config::from_toml_str("materials = []").unwrap_err();
        assert!(err.to_string().contains("At least one material"));
    }

    #[test]
    fn rejects_bad_values() {
        let bad_step = CUBIC.replace("step_degrees = 5.0", "step_degrees = 120.0");
        assert!(Config::from_toml_str(&bad_step).is_err());

        let bad_density = CUBIC.replace("density = 3000.0", "density = -1.0");
        assert!(Config::from_toml_str(&bad_density).is_err());

        let swapped = CUBIC.replace("vs = 3500.0", "vs = 7000.0");
        assert!(Config::from_toml_str(&swapped).is_err());

        let asymmetric = CUBIC.replacen("[64.0, 166.0, 64.0", "[65.0, 166.0, 64.0", 1);
        assert!(Config::from_toml_str(&asymmetric).is_err());
    }

    #[test]
    fn voigt_expansion_uses_standard_index_map() {
        let mut voigt = [[0.0; 6]; 6];
        for (a, row) in voigt.iter_mut().enumerate() {
            for (b, c) in row.iter_mut().enumerate() {
                *c = (a.min(b) * 10 + a.max(b)) as f64 + 1.0;
            }
        }
        let c = voigt_to_tensor(&voigt).unwrap();
        // c_2323 -> C44, c_1312 -> C56, c_1122 -> C12
        assert_eq!(c.get(1, 2, 1, 2), voigt[3][3]);
        assert_eq!(c.get(0, 2, 0, 1), voigt[4][5]);
        assert_eq!(c.get(2, 1, 1, 0), voigt[3][5]);
        assert_eq!(c.get(0, 0, 1, 1), voigt[0][1]);
    }
}
