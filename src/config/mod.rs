//! Scheduler Configuration Module
//!
//! Run configuration loaded from TOML, covering the scenario, search and
//! refinement tuning, file locations and the external collaborators.
//!
//! ## Loading Order
//!
//! 1. `--config <path>` on the command line
//! 2. `IRRIGATION_CONFIG` environment variable (path to TOML file)
//! 3. `scheduler.toml` in the current working directory
//! 4. Built-in defaults
//!
//! ## Usage
//!
//! ```ignore
//! let (config, source) = SchedulerConfig::load(cli.config.as_deref())?;
//! let stages = config.search.stages;
//! ```

mod scheduler_config;
pub mod validation;

pub use scheduler_config::*;
