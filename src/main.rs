use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use serde::Serialize;
use std::fs;
use std::path::PathBuf;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use elastic_anisotropy::config::Config;
use elastic_anisotropy::{AnisotropySummary, DirectionRecord, VelocityField, VelocitySweep};

/// Phase velocities and anisotropy of elastic materials
#[derive(Parser, Debug)]
#[command(name = "elastic-anisotropy")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Christoffel phase velocities and anisotropy metrics", long_about = None)]
struct Cli {
    /// TOML run configuration
    #[arg(short, long)]
    config: PathBuf,

    /// Log verbosity
    #[arg(short, long, value_enum, default_value = "info")]
    log_level: LogLevel,

    /// Write the summary report here, overriding `[output] path`
    #[arg(short, long)]
    output: Option<PathBuf>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl From<LogLevel> for Level {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Trace => Level::TRACE,
            LogLevel::Debug => Level::DEBUG,
            LogLevel::Info => Level::INFO,
            LogLevel::Warn => Level::WARN,
            LogLevel::Error => Level::ERROR,
        }
    }
}

#[derive(Serialize)]
struct Report {
    materials: Vec<MaterialReport>,
}

#[derive(Serialize)]
struct MaterialReport {
    name: String,
    density: f64,
    directions: usize,
    summary: AnisotropySummary,
    // per-direction velocities and polarizations, only when `[sweep] polarizations` is set
    #[serde(skip_serializing_if = "Option::is_none")]
    samples: Option<Vec<DirectionRecord>>,
}

impl MaterialReport {
    fn new(name: &str, density: f64, field: &VelocityField, summary: AnisotropySummary) -> Self {
        Self {
            name: name.to_string(),
            density,
            directions: field.len(),
            summary,
            samples: field.polarizations().map(|_| field.records()),
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::from(cli.log_level))
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let config = Config::from_file(&cli.config)?;
    config.log_summary();

    let grid = config.sampling.grid()?;
    let mut reports = Vec::with_capacity(config.materials.len());

    for material_config in &config.materials {
        let material = material_config.material()?;
        let sweep = VelocitySweep::new(&material.stiffness, material.density, &grid)?
            .with_report_period(config.sweep.report_period)
            .with_polarizations(config.sweep.polarizations);

        let field = if config.sweep.parallel {
            sweep.run_parallel(config.sweep.threads)
        } else {
            sweep.run()
        }
        .with_context(|| format!("Velocity sweep failed for '{}'", material_config.name))?;

        let summary = AnisotropySummary::from_field(&field)
            .with_context(|| format!("Cannot summarize '{}'", material_config.name))?;
        info!(material = %material_config.name, "anisotropy summary");
        for (name, value) in summary.entries() {
            info!("  {:<28} {:.4}", name, value);
        }

        reports.push(MaterialReport::new(
            &material_config.name,
            material.density,
            &field,
            summary,
        ));
    }

    if let Some(path) = cli.output.or(config.output.path) {
        let report = toml::to_string_pretty(&Report { materials: reports })?;
        fs::write(&path, report)
            .with_context(|| format!("Failed to write report '{}'", path.display()))?;
        info!(path = %path.display(), "report written");
    }

    Ok(())
}
