//! Deterministic stand-in crop model.
//!
//! Yield follows a Gaussian response surface centred on a configurable
//! optimum trigger vector; seasonal irrigation scales with the mean trigger
//! and is capped by the seasonal limit. Used by the `synthetic-simulator`
//! binary and by tests that need a full pipeline without a real crop model.

use chrono::{Datelike, NaiveDate};

use super::{
    CropSimulator, DailyWaterFlux, SeasonResult, SimulationError, SimulationOutput,
    SimulationRequest,
};
use crate::types::{parse_sim_date, TRIGGER_MAX, TRIGGER_MIN};

/// Peak dry yield at the optimum (t/ha).
const DEFAULT_PEAK_YIELD: f64 = 12.0;
/// Squared-distance scale of the response surface.
const DEFAULT_WIDTH: f64 = 20_000.0;
/// Days between irrigation applications inside the irrigation season.
const APPLICATION_INTERVAL_DAYS: u32 = 10;
/// Irrigation season bounds (day of year, inclusive).
const IRRIGATION_SEASON_DOY: (u32, u32) = (60, 240);

#[derive(Debug, Clone)]
pub struct SyntheticSimulator {
    optimum: Vec<f64>,
    peak_yield: f64,
    width: f64,
}

impl SyntheticSimulator {
    pub fn new(optimum: Vec<f64>) -> Self {
        Self {
            optimum,
            peak_yield: DEFAULT_PEAK_YIELD,
            width: DEFAULT_WIDTH,
        }
    }

    pub fn with_peak_yield(mut self, peak_yield: f64) -> Self {
        self.peak_yield = peak_yield;
        self
    }

    pub fn with_width(mut self, width: f64) -> Self {
        self.width = width;
        self
    }

    /// Dry yield for one season under `smt`.
    pub fn yield_for(&self, smt: &[f64]) -> f64 {
        let dist2: f64 = smt
            .iter()
            .zip(&self.optimum)
            .map(|(x, o)| (x.clamp(TRIGGER_MIN, TRIGGER_MAX) - o).powi(2))
            .sum();
        self.peak_yield * (-dist2 / self.width).exp()
    }

    fn seasonal_irrigation(smt: &[f64], cap: f64) -> f64 {
        if smt.is_empty() {
            return 0.0;
        }
        let mean_trigger =
            smt.iter().map(|x| x.clamp(TRIGGER_MIN, TRIGGER_MAX)).sum::<f64>() / smt.len() as f64;
        (cap.max(0.0) * mean_trigger / TRIGGER_MAX).max(0.0)
    }

    fn is_application_day(date: NaiveDate) -> bool {
        let doy = date.ordinal();
        (IRRIGATION_SEASON_DOY.0..=IRRIGATION_SEASON_DOY.1).contains(&doy)
            && (doy - IRRIGATION_SEASON_DOY.0) % APPLICATION_INTERVAL_DAYS == 0
    }
}

impl CropSimulator for SyntheticSimulator {
    fn simulate(&self, request: &SimulationRequest) -> Result<SimulationOutput, SimulationError> {
        let smt = &request.irrigation.smt;
        if smt.len() != self.optimum.len() {
            return Err(SimulationError::Rejected(format!(
                "expected {} soil-moisture triggers, got {}",
                self.optimum.len(),
                smt.len()
            )));
        }
        let start = parse_sim_date("sim_start", &request.sim_start)
            .map_err(|e| SimulationError::Rejected(e.to_string()))?;
        let end = parse_sim_date("sim_end", &request.sim_end)
            .map_err(|e| SimulationError::Rejected(e.to_string()))?;
        if end < start {
            return Err(SimulationError::Rejected(format!(
                "simulation ends ({end}) before it starts ({start})"
            )));
        }

        let season_yield = self.yield_for(smt);
        let season_irrigation = Self::seasonal_irrigation(smt, request.irrigation.max_irr_season);
        let events_per_season = (IRRIGATION_SEASON_DOY.1 - IRRIGATION_SEASON_DOY.0)
            / APPLICATION_INTERVAL_DAYS
            + 1;
        let depth = season_irrigation / f64::from(events_per_season);

        let seasons = (start.year()..=end.year())
            .map(|_| SeasonResult {
                dry_yield: season_yield,
                seasonal_irrigation: season_irrigation,
            })
            .collect();

        let water_flux = start
            .iter_days()
            .take_while(|d| *d <= end)
            .map(|d| DailyWaterFlux {
                irr_day: if Self::is_application_day(d) { depth } else { 0.0 },
            })
            .collect();

        Ok(SimulationOutput { seasons, water_flux })
    }

    fn name(&self) -> &str {
        "synthetic"
    }
}
