//! Scenario: the fixed simulation setup held constant for one optimization run.

use std::path::PathBuf;

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::error::{SchedulerError, SchedulerResult};

/// Date format used for simulation start/end (`YYYY/MM/DD`).
pub const SIM_DATE_FORMAT: &str = "%Y/%m/%d";

/// Penetrability assigned to every soil layer built from texture fractions.
pub const DEFAULT_PENETRABILITY: f64 = 100.0;

// ============================================================================
// Planting Date
// ============================================================================

/// Month/day on which the crop is planted each season.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlantingDate {
    pub month: u32,
    pub day: u32,
}

impl PlantingDate {
    /// Parse `MM/DD`. Feb 29 is accepted.
    pub fn parse(raw: &str) -> SchedulerResult<Self> {
        let invalid = |message: String| SchedulerError::invalid_input("scenario.planting_date", message);

        let (m, d) = raw
            .trim()
            .split_once('/')
            .ok_or_else(|| invalid(format!("'{raw}' is not in MM/DD format")))?;
        let month: u32 = m
            .parse()
            .map_err(|_| invalid(format!("'{raw}' has a non-numeric month")))?;
        let day: u32 = d
            .parse()
            .map_err(|_| invalid(format!("'{raw}' has a non-numeric day")))?;

        // 2000 is a leap year, so this accepts every real calendar day.
        if NaiveDate::from_ymd_opt(2000, month, day).is_none() {
            return Err(invalid(format!("'{raw}' is not a calendar day")));
        }
        Ok(Self { month, day })
    }
}

impl std::fmt::Display for PlantingDate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:02}/{:02}", self.month, self.day)
    }
}

/// Parse a `YYYY/MM/DD` simulation date, naming the offending field on error.
pub fn parse_sim_date(field: &str, raw: &str) -> SchedulerResult<NaiveDate> {
    NaiveDate::parse_from_str(raw.trim(), SIM_DATE_FORMAT).map_err(|e| {
        SchedulerError::invalid_input(field, format!("'{raw}' is not a YYYY/MM/DD date ({e})"))
    })
}

/// Format a date the way the simulator expects it.
pub fn format_sim_date(date: NaiveDate) -> String {
    date.format(SIM_DATE_FORMAT).to_string()
}

// ============================================================================
// Soil
// ============================================================================

/// One soil layer described by its texture fractions (percent).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SoilLayer {
    /// Layer thickness (m).
    pub thickness: f64,
    pub sand: f64,
    pub clay: f64,
    /// Organic matter.
    pub om: f64,
    pub penetrability: f64,
}

/// Layered soil definition handed to the simulator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SoilProfile {
    /// Named soil class used as the simulator's base profile.
    pub soil_type: String,
    /// Compartment thicknesses (m), summing to the root-zone depth.
    pub dz: Vec<f64>,
    pub layers: Vec<SoilLayer>,
}

// ============================================================================
// Initial Water Content
// ============================================================================

/// Initial soil water content, per depth layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InitialWaterContent {
    /// `Prop`, `Num` or `Pct`.
    #[serde(default = "default_wc_type")]
    pub wc_type: String,
    /// `Depth` or `Layer`.
    #[serde(default = "default_wc_method")]
    pub method: String,
    #[serde(default = "default_depth_layer")]
    pub depth_layer: Vec<u32>,
    #[serde(default = "default_wc_value")]
    pub value: Vec<String>,
}

fn default_wc_type() -> String { "Prop".to_string() }
fn default_wc_method() -> String { "Depth".to_string() }
fn default_depth_layer() -> Vec<u32> { vec![1, 2, 3, 4] }
fn default_wc_value() -> Vec<String> {
    ["FC", "SAT", "WP", "WP"].iter().map(ToString::to_string).collect()
}

impl Default for InitialWaterContent {
    fn default() -> Self {
        Self {
            wc_type: default_wc_type(),
            method: default_wc_method(),
            depth_layer: default_depth_layer(),
            value: default_wc_value(),
        }
    }
}

// ============================================================================
// Scenario
// ============================================================================

/// Immutable simulation setup shared (read-only) by every evaluation.
#[derive(Debug, Clone, PartialEq)]
pub struct Scenario {
    pub crop: String,
    pub planting_date: PlantingDate,
    pub soil: SoilProfile,
    pub initial_water: InitialWaterContent,
    /// Simulator irrigation method code (1 = soil-moisture thresholds).
    pub irrigation_method: u8,
    /// Seasonal irrigation cap (mm).
    pub seasonal_cap_mm: f64,
    /// Number of growth-stage triggers expected in every candidate.
    pub stages: usize,
    /// First day of the schedule window (inclusive).
    pub sim_start: NaiveDate,
    /// Last day of the schedule window (inclusive).
    pub sim_end: NaiveDate,
    pub weather_path: PathBuf,
}

impl Scenario {
    pub fn start_year(&self) -> i32 {
        self.sim_start.year()
    }

    pub fn end_year(&self) -> i32 {
        self.sim_end.year()
    }

    /// Window used while optimizing: whole calendar years spanning the
    /// configured start and end dates.
    pub fn evaluation_window(&self) -> (NaiveDate, NaiveDate) {
        let first = NaiveDate::from_ymd_opt(self.start_year(), 1, 1).unwrap_or(self.sim_start);
        let last = NaiveDate::from_ymd_opt(self.end_year(), 12, 31).unwrap_or(self.sim_end);
        (first, last)
    }

    /// Exact window materialized into the schedule.
    pub fn schedule_window(&self) -> (NaiveDate, NaiveDate) {
        (self.sim_start, self.sim_end)
    }

    /// Number of calendar days in the schedule window, inclusive.
    pub fn schedule_days(&self) -> usize {
        usize::try_from((self.sim_end - self.sim_start).num_days() + 1).unwrap_or(0)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn sample_scenario(start: &str, end: &str) -> Scenario {
        Scenario {
            crop: "Potato".to_string(),
            planting_date: PlantingDate { month: 11, day: 15 },
            soil: SoilProfile {
                soil_type: "ClayLoam".to_string(),
                dz: vec![0.3, 0.3, 0.4, 1.0],
                layers: vec![SoilLayer {
                    thickness: 0.3,
                    sand: 32.0,
                    clay: 28.0,
                    om: 1.2,
                    penetrability: DEFAULT_PENETRABILITY,
                }],
            },
            initial_water: InitialWaterContent::default(),
            irrigation_method: 1,
            seasonal_cap_mm: 200.0,
            stages: 4,
            sim_start: parse_sim_date("start", start).unwrap(),
            sim_end: parse_sim_date("end", end).unwrap(),
            weather_path: PathBuf::from("db/climate_data.txt"),
        }
    }

    #[test]
    fn test_planting_date_parse() {
        let p = PlantingDate::parse("11/15").unwrap();
        assert_eq!(p, PlantingDate { month: 11, day: 15 });
        assert_eq!(p.to_string(), "11/15");
        assert_eq!(PlantingDate::parse("2/29").unwrap().to_string(), "02/29");
    }

    #[test]
    fn test_planting_date_rejects_garbage() {
        assert!(PlantingDate::parse("1115").is_err());
        assert!(PlantingDate::parse("13/01").is_err());
        assert!(PlantingDate::parse("04/31").is_err());
        assert!(PlantingDate::parse("ab/01").is_err());
    }

    #[test]
    fn test_parse_sim_date_names_field() {
        let err = parse_sim_date("scenario.sim_start", "2025-01-01").unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("scenario.sim_start"), "{msg}");
        assert!(msg.contains("2025-01-01"), "{msg}");
    }

    #[test]
    fn test_windows() {
        let s = sample_scenario("2025/03/10", "2026/06/30");
        let (first, last) = s.evaluation_window();
        assert_eq!(first, NaiveDate::from_ymd_opt(2025, 1, 1).unwrap());
        assert_eq!(last, NaiveDate::from_ymd_opt(2026, 12, 31).unwrap());
        assert_eq!(s.schedule_window().0, NaiveDate::from_ymd_opt(2025, 3, 10).unwrap());
    }

    #[test]
    fn test_schedule_days_inclusive() {
        let s = sample_scenario("2025/01/01", "2025/12/31");
        assert_eq!(s.schedule_days(), 365);
        let s = sample_scenario("2024/01/01", "2025/12/31");
        assert_eq!(s.schedule_days(), 731);
    }
}
