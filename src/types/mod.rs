//! Core data types shared across the optimizer.

mod evaluation;
mod scenario;
mod schedule;
mod trigger;

pub use evaluation::{
    EvaluationDiagnostics, OptimizationOutcome, SearchTrace, StartOrigin, StartPoint, TraceEntry,
};
pub use scenario::{
    format_sim_date, parse_sim_date, InitialWaterContent, PlantingDate, Scenario, SoilLayer,
    SoilProfile, DEFAULT_PENETRABILITY, SIM_DATE_FORMAT,
};
pub use schedule::{IrrigationSchedule, ScheduleDay, ScheduleRecord};
pub use trigger::{TriggerVector, TRIGGER_MAX, TRIGGER_MIDPOINT, TRIGGER_MIN};

#[cfg(test)]
pub(crate) use scenario::tests::sample_scenario;
