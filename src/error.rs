//! Crate-level error taxonomy.
//!
//! Fatal errors carry the file, date or stage that caused them so the
//! operator can act on the message without re-running with debug logging.

use std::path::PathBuf;

use chrono::NaiveDate;
use thiserror::Error;

use crate::acquisition::ProviderError;
use crate::config::ConfigError;
use crate::inputs::InputError;
use crate::simulator::SimulationError;

/// Errors surfaced by the optimizer and its orchestration.
#[derive(Error, Debug)]
pub enum SchedulerError {
    /// Malformed configuration value (dates, planting day, counts).
    #[error("invalid input for '{field}': {message}")]
    InvalidInput { field: String, message: String },

    /// Candidate vector does not match the scenario's growth-stage count.
    #[error("trigger vector has {actual} stages, scenario expects {expected}")]
    TriggerLength { expected: usize, actual: usize },

    /// Required upstream artifact absent and not recoverable.
    #[error("required input missing at {}: {detail}", path.display())]
    MissingInput { path: PathBuf, detail: String },

    /// Weather series does not span the window that will be simulated.
    #[error(
        "weather file {} covers {first}..{last} but the simulation needs {required_start}..{required_end}",
        path.display()
    )]
    WeatherCoverage {
        path: PathBuf,
        first: NaiveDate,
        last: NaiveDate,
        required_start: NaiveDate,
        required_end: NaiveDate,
    },

    #[error(transparent)]
    Input(#[from] InputError),

    #[error("simulation failed: {0}")]
    Simulation(#[from] SimulationError),

    /// Local refinement failed for a reason other than an objective error.
    #[error("optimizer failure: {0}")]
    Optimizer(String),

    #[error("I/O error at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("CSV error at {}: {source}", path.display())]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl SchedulerError {
    pub fn invalid_input(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidInput {
            field: field.into(),
            message: message.into(),
        }
    }

    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn csv(path: impl Into<PathBuf>, source: csv::Error) -> Self {
        Self::Csv {
            path: path.into(),
            source,
        }
    }
}

impl From<ProviderError> for SchedulerError {
    fn from(e: ProviderError) -> Self {
        Self::MissingInput {
            path: e.artifact_path(),
            detail: e.to_string(),
        }
    }
}

pub type SchedulerResult<T> = Result<T, SchedulerError>;
