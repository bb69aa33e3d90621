//! Schedule Materializer
//!
//! Re-runs the simulator once with the final trigger vector over the exact
//! scenario window and turns its daily irrigation series into the dated
//! `Year,Month,Day,IrrDay` CSV that downstream tooling consumes.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{info, warn};

use crate::error::{SchedulerError, SchedulerResult};
use crate::simulator::{CropSimulator, SimulationRequest};
use crate::types::{IrrigationSchedule, Scenario, ScheduleRecord, TriggerVector};

/// Column header of the schedule artifact.
pub const SCHEDULE_HEADER: [&str; 4] = ["Year", "Month", "Day", "IrrDay"];

/// A schedule persisted to disk.
#[derive(Debug, Clone, PartialEq)]
pub struct ScheduleArtifact {
    pub path: PathBuf,
    pub schedule: IrrigationSchedule,
}

pub struct ScheduleMaterializer {
    simulator: Arc<dyn CropSimulator>,
}

impl ScheduleMaterializer {
    pub fn new(simulator: Arc<dyn CropSimulator>) -> Self {
        Self { simulator }
    }

    /// Simulate `optimal` over `sim_start..=sim_end` and align the daily
    /// series to the calendar by position.
    pub fn build(&self, optimal: &TriggerVector, scenario: &Scenario) -> SchedulerResult<IrrigationSchedule> {
        if optimal.len() != scenario.stages {
            return Err(SchedulerError::TriggerLength {
                expected: scenario.stages,
                actual: optimal.len(),
            });
        }
        let (start, end) = scenario.schedule_window();
        let request = SimulationRequest::for_scenario(scenario, optimal.as_slice(), start, end);
        let output = self.simulator.simulate(&request)?;

        let series = output.daily_irrigation();
        let calendar_days = scenario.schedule_days();
        if series.len() != calendar_days {
            warn!(
                simulated = series.len(),
                calendar = calendar_days,
                "Daily irrigation series does not match the calendar window, aligning by position"
            );
        }
        Ok(IrrigationSchedule::from_series(start, end, &series))
    }

    /// Build the schedule and persist it at `output`, replacing any prior file.
    pub fn materialize(
        &self,
        optimal: &TriggerVector,
        scenario: &Scenario,
        output: &Path,
    ) -> SchedulerResult<ScheduleArtifact> {
        let schedule = self.build(optimal, scenario)?;
        write_schedule(&schedule, output)?;
        Ok(ScheduleArtifact {
            path: output.to_path_buf(),
            schedule,
        })
    }
}

impl std::fmt::Debug for ScheduleMaterializer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScheduleMaterializer")
            .field("simulator", &self.simulator.name())
            .finish()
    }
}

// ============================================================================
// CSV persistence
// ============================================================================

/// Write the schedule atomically (temp file alongside, then rename).
pub fn write_schedule(schedule: &IrrigationSchedule, path: &Path) -> SchedulerResult<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| SchedulerError::io(parent, e))?;
    }

    let tmp_path = path.with_extension("csv.tmp");
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_path(&tmp_path)
        .map_err(|e| SchedulerError::csv(&tmp_path, e))?;
    writer
        .write_record(SCHEDULE_HEADER)
        .map_err(|e| SchedulerError::csv(&tmp_path, e))?;
    for record in schedule.records() {
        writer
            .serialize(record)
            .map_err(|e| SchedulerError::csv(&tmp_path, e))?;
    }
    writer.flush().map_err(|e| SchedulerError::io(&tmp_path, e))?;
    drop(writer);

    fs::rename(&tmp_path, path).map_err(|e| SchedulerError::io(path, e))?;
    info!(
        path = %path.display(),
        days = schedule.len(),
        events = schedule.irrigation_events(),
        total_mm = schedule.total_mm(),
        "Irrigation schedule written"
    );
    Ok(())
}

/// Read a schedule artifact back.
pub fn read_schedule(path: &Path) -> SchedulerResult<Vec<ScheduleRecord>> {
    let mut reader = csv::Reader::from_path(path).map_err(|e| SchedulerError::csv(path, e))?;
    reader
        .deserialize()
        .collect::<Result<Vec<ScheduleRecord>, _>>()
        .map_err(|e| SchedulerError::csv(path, e))
}
