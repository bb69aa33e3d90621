//! Crop-growth simulator boundary.
//!
//! The optimizer treats the crop model as an opaque function: a
//! [`SimulationRequest`] goes in, per-season yields and a daily water-flux
//! series come out. Implementations:
//!
//! - [`CommandSimulator`]: runs an external model process per request,
//!   exchanging JSON over stdin/stdout
//! - [`SyntheticSimulator`]: deterministic response surface for smoke runs
//!   and tests

mod command;
mod synthetic;

pub use command::CommandSimulator;
pub use synthetic::SyntheticSimulator;

use std::path::PathBuf;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::{format_sim_date, InitialWaterContent, Scenario, SoilProfile};

/// Simulator must be shareable across start-point workers.
pub trait CropSimulator: Send + Sync {
    /// Run one simulation to natural termination.
    fn simulate(&self, request: &SimulationRequest) -> Result<SimulationOutput, SimulationError>;

    /// Backend name for logging.
    fn name(&self) -> &str;
}

// ============================================================================
// Request
// ============================================================================

/// Irrigation management handed to the simulator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IrrigationManagement {
    pub irrigation_method: u8,
    /// Soil-moisture triggers per growth stage (% of total available water).
    pub smt: Vec<f64>,
    /// Seasonal irrigation cap (mm).
    pub max_irr_season: f64,
}

/// Complete input set for one simulator invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationRequest {
    pub crop: String,
    /// `MM/DD`.
    pub planting_date: String,
    pub soil: SoilProfile,
    pub initial_water_content: InitialWaterContent,
    pub irrigation: IrrigationManagement,
    /// `YYYY/MM/DD`.
    pub sim_start: String,
    /// `YYYY/MM/DD`.
    pub sim_end: String,
    pub weather_path: PathBuf,
}

impl SimulationRequest {
    /// Build a request for `scenario` with the given triggers over `start..=end`.
    pub fn for_scenario(scenario: &Scenario, smt: &[f64], start: NaiveDate, end: NaiveDate) -> Self {
        Self {
            crop: scenario.crop.clone(),
            planting_date: scenario.planting_date.to_string(),
            soil: scenario.soil.clone(),
            initial_water_content: scenario.initial_water.clone(),
            irrigation: IrrigationManagement {
                irrigation_method: scenario.irrigation_method,
                smt: smt.to_vec(),
                max_irr_season: scenario.seasonal_cap_mm,
            },
            sim_start: format_sim_date(start),
            sim_end: format_sim_date(end),
            weather_path: scenario.weather_path.clone(),
        }
    }
}

// ============================================================================
// Output
// ============================================================================

/// Per-season summary row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeasonResult {
    /// Dry yield (t/ha).
    pub dry_yield: f64,
    /// Seasonal irrigation (mm).
    pub seasonal_irrigation: f64,
}

/// Daily water-flux row. Only the irrigation depth is consumed here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyWaterFlux {
    /// Irrigation applied on the day (mm).
    pub irr_day: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SimulationOutput {
    pub seasons: Vec<SeasonResult>,
    #[serde(default)]
    pub water_flux: Vec<DailyWaterFlux>,
}

impl SimulationOutput {
    /// Arithmetic mean dry yield across seasons.
    pub fn mean_dry_yield(&self) -> Result<f64, SimulationError> {
        mean(self.seasons.iter().map(|s| s.dry_yield)).ok_or(SimulationError::NoSeasons)
    }

    /// Arithmetic mean seasonal irrigation across seasons.
    pub fn mean_seasonal_irrigation(&self) -> Result<f64, SimulationError> {
        mean(self.seasons.iter().map(|s| s.seasonal_irrigation)).ok_or(SimulationError::NoSeasons)
    }

    pub fn daily_irrigation(&self) -> Vec<f64> {
        self.water_flux.iter().map(|f| f.irr_day).collect()
    }
}

fn mean(values: impl Iterator<Item = f64>) -> Option<f64> {
    let (sum, n) = values.fold((0.0, 0usize), |(s, n), v| (s + v, n + 1));
    if n == 0 {
        None
    } else {
        Some(sum / n as f64)
    }
}

// ============================================================================
// Errors
// ============================================================================

#[derive(Error, Debug)]
pub enum SimulationError {
    #[error("failed to launch simulator '{program}': {source}")]
    Launch {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("simulator I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("simulator exited with {status}: {stderr}")]
    Failed { status: String, stderr: String },

    #[error("simulator produced unreadable output: {0}")]
    MalformedOutput(#[from] serde_json::Error),

    #[error("simulation completed without any harvested season")]
    NoSeasons,

    #[error("simulator rejected the scenario: {0}")]
    Rejected(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::sample_scenario;

    #[test]
    fn test_request_carries_scenario() {
        let scenario = sample_scenario("2025/01/01", "2026/12/31");
        let (start, end) = scenario.evaluation_window();
        let req = SimulationRequest::for_scenario(&scenario, &[10.0, 20.0, 30.0, 40.0], start, end);
        assert_eq!(req.planting_date, "11/15");
        assert_eq!(req.sim_start, "2025/01/01");
        assert_eq!(req.sim_end, "2026/12/31");
        assert_eq!(req.irrigation.smt, vec![10.0, 20.0, 30.0, 40.0]);
        assert_eq!(req.irrigation.max_irr_season, 200.0);
        assert_eq!(req.soil.layers.len(), 1);
    }

    #[test]
    fn test_mean_yield() {
        let out = SimulationOutput {
            seasons: vec![
                SeasonResult { dry_yield: 8.0, seasonal_irrigation: 100.0 },
                SeasonResult { dry_yield: 10.0, seasonal_irrigation: 200.0 },
            ],
            water_flux: Vec::new(),
        };
        assert_eq!(out.mean_dry_yield().unwrap(), 9.0);
        assert_eq!(out.mean_seasonal_irrigation().unwrap(), 150.0);
    }

    #[test]
    fn test_no_seasons_is_error() {
        let out = SimulationOutput::default();
        assert!(matches!(out.mean_dry_yield(), Err(SimulationError::NoSeasons)));
    }

    #[test]
    fn test_output_json_without_flux() {
        let out: SimulationOutput =
            serde_json::from_str(r#"{"seasons":[{"dry_yield":7.5,"seasonal_irrigation":120.0}]}"#).unwrap();
        assert!(out.water_flux.is_empty());
        assert_eq!(out.mean_dry_yield().unwrap(), 7.5);
    }
}
