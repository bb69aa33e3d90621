//! Irrigation Scheduler: soil-moisture trigger optimization
//!
//! Searches for the per-growth-stage soil-moisture triggers that maximize
//! simulated crop yield under a seasonal irrigation cap, then materializes
//! the resulting day-by-day irrigation schedule.
//!
//! ## Architecture
//!
//! - **Objective Evaluator**: one crop-model run per candidate, reduced to mean yield
//! - **Start-Point Search**: random-restart scan on a worker pool, sequential fallback
//! - **Local Refiner**: Nelder–Mead simplex descent from the best start
//! - **Schedule Materializer**: final simulation run written as a dated CSV
//! - **Orchestrator**: input preconditions and the end-to-end run

pub mod acquisition;
pub mod config;
pub mod error;
pub mod inputs;
pub mod optimization;
pub mod orchestrator;
pub mod schedule;
pub mod simulator;
pub mod types;

// Re-export configuration
pub use config::{ConfigError, SchedulerConfig};

// Re-export the error taxonomy
pub use error::{SchedulerError, SchedulerResult};

// Re-export commonly used types
pub use types::{
    EvaluationDiagnostics, IrrigationSchedule, OptimizationOutcome, Scenario, StartOrigin,
    StartPoint, TriggerVector,
};

// Re-export pipeline components
pub use optimization::{
    LocalRefiner, NelderMeadMinimizer, Objective, ObjectiveEvaluator, SearchMode, StartPointSearch,
};
pub use orchestrator::Orchestrator;
pub use schedule::ScheduleMaterializer;
pub use simulator::{CommandSimulator, CropSimulator, SyntheticSimulator};
