use config::{Config as ConfigLoader, Environment, File};
use serde::Deserialize;
use std::env;
use std::path::{Path, PathBuf};

use super::error::Error;
use common::constants::BOLTZMANN_CONSTANT_MEV_PER_K;
use common::types::ParticleType;

#[derive(Debug, Deserialize, Clone)]
pub struct SimulationConfig {
    pub histories: u64,
    pub workers: usize,
    pub seed: u64,
    pub particle_type: ParticleType,
    /// Source energy (MeV).
    pub source_energy: f64,
}

/// A 1-D stack of slabs along +x, starting at x = 0.
#[derive(Debug, Deserialize, Clone)]
pub struct GeometryConfig {
    /// Slab widths (cm), one cell per slab.
    pub cell_widths: Vec<f64>,
    /// Total macroscopic cross section (1/cm), the same in every slab.
    pub total_cross_section: f64,
    pub absorption_probability: f64,
    /// Fraction of the energy lost in each scattering collision.
    pub energy_loss_fraction: f64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct TallyConfig {
    pub energy_bins: Vec<f64>,
    pub multiplier: f64,
    pub cosine_cutoff: f64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct KernelConfig {
    pub atomic_weight_ratio: f64,
    pub temperature_k: f64,
    pub alpha: f64,
    pub beta: f64,
    /// Incoming energy (MeV).
    pub energy: f64,
    /// Constant zero temperature elastic cross section (b).
    pub zero_temperature_cross_section: f64,
    /// Mean center-of-mass scattering cosine, 0 for isotropic scattering.
    pub mean_cosine: f64,
    pub relative_error_tol: f64,
    pub subinterval_limit: usize,
}

impl KernelConfig {
    /// Target temperature (MeV).
    pub fn kt(&self) -> f64 {
        BOLTZMANN_CONSTANT_MEV_PER_K * self.temperature_k
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub simulation: SimulationConfig,
    pub geometry: GeometryConfig,
    pub tally: TallyConfig,
    pub kernel: KernelConfig,
}

impl Config {
    /// Checks the settings the library setters cannot see.
    pub fn validate(&self) -> Result<(), Error> {
        let sim = &self.simulation;
        if sim.histories == 0 {
            return Err(Error::InvalidConfig("simulation.histories must be positive".into()));
        }
        if sim.workers == 0 {
            return Err(Error::InvalidConfig("simulation.workers must be positive".into()));
        }
        if !(sim.source_energy > 0.0 && sim.source_energy.is_finite()) {
            return Err(Error::InvalidConfig(format!(
                "simulation.source_energy = {} must be positive",
                sim.source_energy
            )));
        }

        let geo = &self.geometry;
        if geo.cell_widths.is_empty() || geo.cell_widths.iter().any(|w| !(*w > 0.0)) {
            return Err(Error::InvalidConfig(
                "geometry.cell_widths must be a non-empty list of positive widths".into(),
            ));
        }
        if !(geo.total_cross_section > 0.0 && geo.total_cross_section.is_finite()) {
            return Err(Error::InvalidConfig(format!(
                "geometry.total_cross_section = {} must be positive",
                geo.total_cross_section
            )));
        }
        // Histories only terminate through absorption or escape.
        if !(geo.absorption_probability > 0.0 && geo.absorption_probability <= 1.0) {
            return Err(Error::InvalidConfig(format!(
                "geometry.absorption_probability = {} must lie in (0, 1]",
                geo.absorption_probability
            )));
        }
        if !(0.0..1.0).contains(&geo.energy_loss_fraction) {
            return Err(Error::InvalidConfig(format!(
                "geometry.energy_loss_fraction = {} must lie in [0, 1)",
                geo.energy_loss_fraction
            )));
        }

        let kernel = &self.kernel;
        if !(kernel.relative_error_tol > 0.0 && kernel.relative_error_tol < 1.0) {
            return Err(Error::InvalidConfig(format!(
                "kernel.relative_error_tol = {} must lie in (0, 1)",
                kernel.relative_error_tol
            )));
        }
        if kernel.subinterval_limit == 0 {
            return Err(Error::InvalidConfig("kernel.subinterval_limit must be positive".into()));
        }

        Ok(())
    }
}

/// Loads configuration from `crates/executor/Config.toml` under the current
/// directory and `EXECUTOR_*` environment variables.
pub fn load_config() -> Result<Config, Error> {
    let base_path = env::current_dir().map_err(|e| {
        Error::ConfigLoadError(format!("Failed to determine current directory: {}", e))
    })?;

    let config_file_path: PathBuf = base_path
        .join("crates")
        .join("executor")
        .join("Config.toml");

    load_config_from(&config_file_path)
}

/// Loads configuration from `path`, layered with `EXECUTOR_*` environment variables.
pub fn load_config_from(path: &Path) -> Result<Config, Error> {
    if !path.exists() {
        return Err(Error::ConfigLoadError(format!(
            "Configuration file not found at calculated path: {}",
            path.display()
        )));
    }

    let s = ConfigLoader::builder()
        .add_source(File::from(path).required(true))
        .add_source(
            Environment::with_prefix("EXECUTOR")
                .try_parsing(true)
                .separator("_"),
        )
        .build()
        .map_err(|e| Error::ConfigLoadError(e.to_string()))?;

    let app_config: Config = s
        .try_deserialize()
        .map_err(|e| Error::ConfigLoadError(format!("Failed to deserialize config: {}", e)))?;

    app_config.validate()?;

    Ok(app_config)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::Builder;

    pub(crate) const MOCK_CONFIG: &str = r#"
[simulation]
histories = 200
workers = 2
seed = 7
particle_type = "photon"
source_energy = 1.0

[geometry]
cell_widths = [1.0, 2.0]
total_cross_section = 0.5
absorption_probability = 0.3
energy_loss_fraction = 0.4

[tally]
energy_bins = [0.0, 0.1, 0.5, 1.0]
multiplier = 1.0
cosine_cutoff = 0.05

[kernel]
atomic_weight_ratio = 0.999167
temperature_k = 293.6
alpha = 1.0
beta = 0.0
energy = 1.0e-6
zero_temperature_cross_section = 20.0
mean_cosine = 0.0
relative_error_tol = 1.0e-4
subinterval_limit = 1000
"#;

    fn write_config(content: &str) -> tempfile::NamedTempFile {
        let mut temp_file = Builder::new()
            .suffix(".toml")
            .tempfile()
            .expect("Failed to create temp file");
        temp_file
            .write_all(content.as_bytes())
            .expect("Failed to write mock content");
        temp_file
    }

    pub(crate) fn mock_config() -> Config {
        let temp_file = write_config(MOCK_CONFIG);
        load_config_from(temp_file.path()).expect("Mock config should load")
    }

    #[test]
    fn test_load_config_from_file() {
        let config = mock_config();

        assert_eq!(config.simulation.histories, 200);
        assert_eq!(config.simulation.workers, 2);
        assert_eq!(config.simulation.particle_type, ParticleType::Photon);
        assert_eq!(config.geometry.cell_widths, vec![1.0, 2.0]);
        assert_eq!(config.tally.energy_bins.len(), 4);
        assert_eq!(config.tally.cosine_cutoff, 0.05);
        assert!((config.kernel.kt() - 2.53e-8).abs() < 1e-10);
        assert_eq!(config.kernel.subinterval_limit, 1000);
    }

    #[test]
    fn test_load_config_file_not_found() {
        let result = load_config_from(Path::new("non_existent_config.toml"));

        match result {
            Err(Error::ConfigLoadError(msg)) => assert!(msg.contains("not found")),
            other => panic!("Expected ConfigLoadError, got: {:?}", other),
        }
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let content = MOCK_CONFIG.replace("absorption_probability = 0.3", "absorption_probability = 0.0");
        let temp_file = write_config(&content);

        assert!(matches!(
            load_config_from(temp_file.path()),
            Err(Error::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_invalid_kernel_tolerance_is_rejected() {
        let content = MOCK_CONFIG.replace("relative_error_tol = 1.0e-4", "relative_error_tol = 0.0");
        let temp_file = write_config(&content);

        assert!(matches!(
            load_config_from(temp_file.path()),
            Err(Error::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_missing_section_fails_to_deserialize() {
        let content = MOCK_CONFIG.replace("[kernel]", "[unused]");
        let temp_file = write_config(&content);

        assert!(matches!(
            load_config_from(temp_file.path()),
            Err(Error::ConfigLoadError(_))
        ));
    }
}
