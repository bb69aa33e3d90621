//! Scheduler Configuration - scenario, search tuning and collaborator wiring
//!
//! Each section implements `Default` with the values the scheduler has always
//! run with, so an empty or absent config file reproduces the stock run.

use std::path::{Path, PathBuf};

use chrono::{Datelike, Local};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::optimization::SearchMode;
use crate::types::{parse_sim_date, InitialWaterContent, PlantingDate};

/// Environment variable naming a config file.
pub const CONFIG_ENV_VAR: &str = "IRRIGATION_CONFIG";
/// Config file picked up from the working directory.
pub const LOCAL_CONFIG_FILE: &str = "scheduler.toml";

// ============================================================================
// Config Source
// ============================================================================

/// Where the active configuration came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    CommandLine(PathBuf),
    Environment(PathBuf),
    WorkingDirectory(PathBuf),
    Defaults,
}

impl std::fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigSource::CommandLine(p) => write!(f, "--config {}", p.display()),
            ConfigSource::Environment(p) => write!(f, "${CONFIG_ENV_VAR} ({})", p.display()),
            ConfigSource::WorkingDirectory(p) => write!(f, "./{}", p.display()),
            ConfigSource::Defaults => write!(f, "built-in defaults"),
        }
    }
}

// ============================================================================
// Top-Level Config
// ============================================================================

/// Root configuration for one optimization run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// Crop, soil, irrigation method and simulation window
    #[serde(default)]
    pub scenario: ScenarioConfig,

    /// Random start-point scan
    #[serde(default)]
    pub search: SearchConfig,

    /// Nelder–Mead refinement
    #[serde(default)]
    pub refine: RefineConfig,

    /// Input and output artifact locations
    #[serde(default)]
    pub paths: PathsConfig,

    /// External crop model process
    #[serde(default)]
    pub simulator: CommandConfig,

    /// External weather/soil preparation process
    #[serde(default)]
    pub acquisition: CommandConfig,
}

impl SchedulerConfig {
    /// Load configuration using the standard search order.
    ///
    /// An explicit path must exist. A dangling `$IRRIGATION_CONFIG` is logged
    /// and skipped. A file that is found but fails to parse or validate is
    /// an error.
    pub fn load(cli_path: Option<&Path>) -> Result<(Self, ConfigSource), ConfigError> {
        // 1. --config
        if let Some(path) = cli_path {
            let config = Self::load_from_file(path)?;
            info!(path = %path.display(), "Loaded scheduler config from --config");
            return Ok((config, ConfigSource::CommandLine(path.to_path_buf())));
        }

        // 2. $IRRIGATION_CONFIG
        if let Ok(raw) = std::env::var(CONFIG_ENV_VAR) {
            let path = PathBuf::from(&raw);
            if path.exists() {
                let config = Self::load_from_file(&path)?;
                info!(path = %path.display(), "Loaded scheduler config from {CONFIG_ENV_VAR}");
                return Ok((config, ConfigSource::Environment(path)));
            }
            warn!(path = %raw, "{CONFIG_ENV_VAR} points to non-existent file, falling back");
        }

        // 3. ./scheduler.toml
        let local = PathBuf::from(LOCAL_CONFIG_FILE);
        if local.exists() {
            let config = Self::load_from_file(&local)?;
            info!("Loaded scheduler config from ./{LOCAL_CONFIG_FILE}");
            return Ok((config, ConfigSource::WorkingDirectory(local)));
        }

        // 4. Defaults
        info!("No {LOCAL_CONFIG_FILE} found, using built-in defaults");
        Ok((Self::default(), ConfigSource::Defaults))
    }

    /// Load from a specific TOML file path.
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents =
            std::fs::read_to_string(path).map_err(|e| ConfigError::Io(path.to_path_buf(), e))?;
        Self::from_toml_str(&contents).map_err(|e| match e {
            ConfigError::Parse(_, inner) => ConfigError::Parse(path.to_path_buf(), inner),
            other => other,
        })
    }

    /// Parse and validate a TOML document. Unknown keys and suspicious
    /// values are logged as warnings.
    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        // Two-pass: check for unknown keys first (warnings only)
        for w in super::validation::validate_unknown_keys(contents) {
            warn!("{}", w);
        }

        let config: Self =
            toml::from_str(contents).map_err(|e| ConfigError::Parse(PathBuf::new(), e))?;
        config.validate()?;
        for w in super::validation::suspicious_values(&config) {
            warn!("{}", w);
        }
        Ok(config)
    }

    /// Serialize the current config to a TOML string.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(ConfigError::Serialize)
    }

    /// Write the config to `path`, e.g. to seed a `scheduler.toml`.
    pub fn save_to_file(&self, path: &Path) -> Result<(), ConfigError> {
        let contents = self.to_toml()?;
        std::fs::write(path, contents).map_err(|e| ConfigError::Io(path.to_path_buf(), e))?;
        info!(path = %path.display(), "Scheduler config saved");
        Ok(())
    }

    /// Check every section, collecting all problems before failing.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut errors: Vec<String> = Vec::new();
        let s = &self.scenario;

        if let Err(e) = PlantingDate::parse(&s.planting_date) {
            errors.push(e.to_string());
        }
        let start = parse_sim_date("scenario.sim_start", &s.sim_start);
        let end = parse_sim_date("scenario.sim_end", &s.sim_end);
        match (start, end) {
            (Ok(start), Ok(end)) if end < start => errors.push(format!(
                "scenario.sim_end ({}) must not precede scenario.sim_start ({})",
                s.sim_end, s.sim_start
            )),
            (start, end) => {
                for e in [start.err(), end.err()].into_iter().flatten() {
                    errors.push(e.to_string());
                }
            }
        }

        if s.layer_thicknesses.is_empty() {
            errors.push("scenario.layer_thicknesses must list at least one layer".to_string());
        }
        for (i, dz) in s.layer_thicknesses.iter().enumerate() {
            if !dz.is_finite() || *dz <= 0.0 {
                errors.push(format!(
                    "scenario.layer_thicknesses[{i}] = {dz} must be a positive finite depth"
                ));
            }
        }
        if !s.seasonal_cap_mm.is_finite() || s.seasonal_cap_mm < 0.0 {
            errors.push(format!(
                "scenario.seasonal_cap_mm = {} must be finite and >= 0",
                s.seasonal_cap_mm
            ));
        }
        if s.initial_water.depth_layer.len() != s.initial_water.value.len() {
            errors.push(format!(
                "scenario.initial_water: {} depth layers but {} values",
                s.initial_water.depth_layer.len(),
                s.initial_water.value.len()
            ));
        }

        if self.search.stages == 0 {
            errors.push("search.stages must be > 0".to_string());
        }
        if self.search.num_searches == 0 {
            errors.push("search.num_searches must be > 0".to_string());
        }
        if self.search.max_workers == Some(0) {
            errors.push("search.max_workers must be > 0 when set".to_string());
        }

        let r = &self.refine;
        for (name, value) in [
            ("refine.sd_tolerance", r.sd_tolerance),
            ("refine.initial_step", r.initial_step),
            ("refine.zero_step", r.zero_step),
        ] {
            if !value.is_finite() || value <= 0.0 {
                errors.push(format!("{name} = {value} must be a positive finite number"));
            }
        }
        if r.max_iters == Some(0) {
            errors.push("refine.max_iters must be > 0 when set".to_string());
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Validation(errors))
        }
    }
}

// ============================================================================
// Error Type
// ============================================================================

#[derive(Debug)]
pub enum ConfigError {
    Io(PathBuf, std::io::Error),
    Parse(PathBuf, toml::de::Error),
    Serialize(toml::ser::Error),
    Validation(Vec<String>),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Io(path, e) => write!(f, "Config I/O error ({}): {}", path.display(), e),
            ConfigError::Parse(path, e) => {
                write!(f, "Config parse error ({}): {}", path.display(), e)
            }
            ConfigError::Serialize(e) => write!(f, "Config serialization error: {e}"),
            ConfigError::Validation(errors) => {
                writeln!(f, "Config validation failed:")?;
                for e in errors {
                    writeln!(f, "  - {e}")?;
                }
                Ok(())
            }
        }
    }
}

impl std::error::Error for ConfigError {}

// ============================================================================
// Scenario
// ============================================================================

/// Fixed simulation setup. Dates are `YYYY/MM/DD`, planting date `MM/DD`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioConfig {
    #[serde(default = "default_crop")]
    pub crop: String,

    #[serde(default = "default_planting_date")]
    pub planting_date: String,

    /// Base soil class; texture fractions come from the soil profile file
    #[serde(default = "default_soil_type")]
    pub soil_type: String,

    /// Compartment thicknesses (m)
    #[serde(default = "default_layer_thicknesses")]
    pub layer_thicknesses: Vec<f64>,

    #[serde(default)]
    pub initial_water: InitialWaterContent,

    /// 1 = irrigate when soil moisture drops below the stage trigger
    #[serde(default = "default_irrigation_method")]
    pub irrigation_method: u8,

    /// Seasonal irrigation cap (mm)
    #[serde(default = "default_seasonal_cap")]
    pub seasonal_cap_mm: f64,

    #[serde(default = "default_sim_start")]
    pub sim_start: String,

    #[serde(default = "default_sim_end")]
    pub sim_end: String,
}

fn default_crop() -> String {
    "Potato".to_string()
}
fn default_planting_date() -> String {
    "11/15".to_string()
}
fn default_soil_type() -> String {
    "ClayLoam".to_string()
}
fn default_layer_thicknesses() -> Vec<f64> {
    vec![0.3, 0.3, 0.4, 1.0]
}
fn default_irrigation_method() -> u8 {
    1
}
fn default_seasonal_cap() -> f64 {
    200.0
}
fn default_sim_start() -> String {
    format!("{}/01/01", Local::now().year())
}
fn default_sim_end() -> String {
    format!("{}/12/31", Local::now().year() + 1)
}

impl Default for ScenarioConfig {
    fn default() -> Self {
        Self {
            crop: default_crop(),
            planting_date: default_planting_date(),
            soil_type: default_soil_type(),
            layer_thicknesses: default_layer_thicknesses(),
            initial_water: InitialWaterContent::default(),
            irrigation_method: default_irrigation_method(),
            seasonal_cap_mm: default_seasonal_cap(),
            sim_start: default_sim_start(),
            sim_end: default_sim_end(),
        }
    }
}

// ============================================================================
// Search
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Growth stages, i.e. trigger vector length
    #[serde(default = "default_stages")]
    pub stages: usize,

    /// Random candidates drawn by the start-point scan
    #[serde(default = "default_num_searches")]
    pub num_searches: usize,

    #[serde(default)]
    pub mode: SearchMode,

    /// Fixed RNG seed for reproducible scans
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,

    /// Upper bound on pool workers (defaults to available cores)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_workers: Option<usize>,
}

fn default_stages() -> usize {
    4
}
fn default_num_searches() -> usize {
    100
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            stages: default_stages(),
            num_searches: default_num_searches(),
            mode: SearchMode::default(),
            seed: None,
            max_workers: None,
        }
    }
}

// ============================================================================
// Refine
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RefineConfig {
    /// Stop once the simplex cost standard deviation falls below this
    #[serde(default = "default_sd_tolerance")]
    pub sd_tolerance: f64,

    /// Relative perturbation of each coordinate in the initial simplex
    #[serde(default = "default_initial_step")]
    pub initial_step: f64,

    /// Absolute perturbation used for zero coordinates
    #[serde(default = "default_zero_step")]
    pub zero_step: f64,

    /// Iteration cap (defaults to 200 × stages)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_iters: Option<u64>,
}

fn default_sd_tolerance() -> f64 {
    1e-4
}
fn default_initial_step() -> f64 {
    0.05
}
fn default_zero_step() -> f64 {
    0.00025
}

impl Default for RefineConfig {
    fn default() -> Self {
        Self {
            sd_tolerance: default_sd_tolerance(),
            initial_step: default_initial_step(),
            zero_step: default_zero_step(),
            max_iters: None,
        }
    }
}

// ============================================================================
// Paths
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PathsConfig {
    #[serde(default = "default_weather_path")]
    pub weather: PathBuf,

    #[serde(default = "default_soil_path")]
    pub soil: PathBuf,

    /// Destination of the daily schedule CSV
    #[serde(default = "default_output_path")]
    pub output: PathBuf,
}

fn default_weather_path() -> PathBuf {
    PathBuf::from("db/climate_data.txt")
}
fn default_soil_path() -> PathBuf {
    PathBuf::from("db/soil_data.csv")
}
fn default_output_path() -> PathBuf {
    PathBuf::from("db/optimized_irr_schedule.csv")
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            weather: default_weather_path(),
            soil: default_soil_path(),
            output: default_output_path(),
        }
    }
}

// ============================================================================
// External Commands
// ============================================================================

/// External process: `command = ["program", "arg", ...]`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandConfig {
    #[serde(default)]
    pub command: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub working_dir: Option<PathBuf>,
}

impl CommandConfig {
    pub fn is_configured(&self) -> bool {
        !self.command.is_empty()
    }
}

// ============================================================================
// Tests
// ============================================================================
