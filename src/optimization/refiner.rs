//! Local Refiner: derivative-free simplex descent from the start point.
//!
//! The objective is handed to argmin's Nelder–Mead through a thin
//! [`CostFunction`] adapter. Objective errors abort the run and come back
//! out with their original variant, including errors raised while the
//! initial simplex is scored. There is no best-so-far fallback.

use std::panic::{self, AssertUnwindSafe};
use std::sync::{Mutex, PoisonError};

use argmin::core::{CostFunction, Executor, State};
use argmin::solver::neldermead::NelderMead;
use tracing::{debug, info};

use super::start_point::panic_message;
use super::Objective;
use crate::config::RefineConfig;
use crate::error::{SchedulerError, SchedulerResult};
use crate::types::TriggerVector;

/// Iterations allowed per dimension when no explicit cap is configured.
const ITERS_PER_STAGE: u64 = 200;

/// `minimize(objective, x0) -> x*`, unconstrained.
pub trait Minimizer: Send + Sync {
    fn minimize(&self, objective: &dyn Objective, x0: &TriggerVector) -> SchedulerResult<TriggerVector>;
}

/// Nelder–Mead with the classic initial simplex: vertex `i` scales
/// coordinate `i` of `x0` by `1 + initial_step`, or sets it to `zero_step`
/// when that coordinate is zero.
#[derive(Debug, Clone, PartialEq)]
pub struct NelderMeadMinimizer {
    sd_tolerance: f64,
    initial_step: f64,
    zero_step: f64,
    max_iters: Option<u64>,
}

impl Default for NelderMeadMinimizer {
    fn default() -> Self {
        Self::from_config(&RefineConfig::default())
    }
}

impl NelderMeadMinimizer {
    pub fn from_config(config: &RefineConfig) -> Self {
        Self {
            sd_tolerance: config.sd_tolerance,
            initial_step: config.initial_step,
            zero_step: config.zero_step,
            max_iters: config.max_iters,
        }
    }

    pub fn with_sd_tolerance(mut self, sd_tolerance: f64) -> Self {
        self.sd_tolerance = sd_tolerance;
        self
    }

    pub fn with_max_iters(mut self, max_iters: Option<u64>) -> Self {
        self.max_iters = max_iters;
        self
    }

    /// `k + 1` vertices, `x0` first.
    pub fn initial_simplex(&self, x0: &[f64]) -> Vec<Vec<f64>> {
        let mut vertices = Vec::with_capacity(x0.len() + 1);
        vertices.push(x0.to_vec());
        for i in 0..x0.len() {
            let mut v = x0.to_vec();
            v[i] = if v[i] == 0.0 {
                self.zero_step
            } else {
                v[i] * (1.0 + self.initial_step)
            };
            vertices.push(v);
        }
        vertices
    }

    fn iteration_cap(&self, stages: usize) -> u64 {
        self.max_iters
            .unwrap_or_else(|| ITERS_PER_STAGE * stages as u64)
            .max(1)
    }
}

impl Minimizer for NelderMeadMinimizer {
    fn minimize(&self, objective: &dyn Objective, x0: &TriggerVector) -> SchedulerResult<TriggerVector> {
        if x0.is_empty() {
            return Ok(x0.clone());
        }

        let solver = NelderMead::new(self.initial_simplex(x0.as_slice()))
            .with_sd_tolerance(self.sd_tolerance)
            .map_err(|e| SchedulerError::Optimizer(e.to_string()))?;
        let max_iters = self.iteration_cap(x0.len());

        // argmin unwraps the costs of the initial simplex, so an objective
        // failure there unwinds instead of returning an error.
        let failure = Mutex::new(None);
        let run = panic::catch_unwind(AssertUnwindSafe(|| {
            Executor::new(
                CostAdapter {
                    objective,
                    failure: &failure,
                },
                solver,
            )
            .configure(|state| state.max_iters(max_iters))
            .run()
        }));
        if let Some(e) = failure.lock().unwrap_or_else(PoisonError::into_inner).take() {
            return Err(e);
        }
        let result = match run {
            Ok(Ok(result)) => result,
            Ok(Err(e)) => return Err(SchedulerError::Optimizer(e.to_string())),
            Err(payload) => {
                return Err(SchedulerError::Optimizer(format!(
                    "simplex solver panicked: {}",
                    panic_message(payload.as_ref())
                )))
            }
        };

        let state = result.state();
        info!(
            iterations = state.get_iter(),
            best_cost = state.get_best_cost(),
            termination = ?state.get_termination_status(),
            "Simplex refinement finished"
        );
        state
            .get_best_param()
            .cloned()
            .map(TriggerVector::new)
            .ok_or_else(|| SchedulerError::Optimizer("simplex produced no best vertex".to_string()))
    }
}

/// Presents an [`Objective`] to argmin. The first objective error is kept
/// in `failure` so it reaches the caller with its original variant.
struct CostAdapter<'a> {
    objective: &'a dyn Objective,
    failure: &'a Mutex<Option<SchedulerError>>,
}

impl CostFunction for CostAdapter<'_> {
    type Param = Vec<f64>;
    type Output = f64;

    fn cost(&self, param: &Self::Param) -> Result<Self::Output, argmin::core::Error> {
        match self.objective.cost(param) {
            Ok(cost) if cost.is_nan() => {
                debug!(?param, "Objective returned NaN, treating vertex as worst");
                Ok(f64::INFINITY)
            }
            Ok(cost) => Ok(cost),
            Err(e) => {
                let message = e.to_string();
                let mut slot = self.failure.lock().unwrap_or_else(PoisonError::into_inner);
                if slot.is_none() {
                    *slot = Some(e);
                }
                Err(argmin::core::Error::msg(message))
            }
        }
    }
}

// ============================================================================
// Local Refiner
// ============================================================================

/// Refinement phase. The caller clips the result to `[0, 100]`.
pub struct LocalRefiner {
    minimizer: Box<dyn Minimizer>,
}

impl LocalRefiner {
    pub fn new(minimizer: Box<dyn Minimizer>) -> Self {
        Self { minimizer }
    }

    pub fn nelder_mead(config: &RefineConfig) -> Self {
        Self::new(Box::new(NelderMeadMinimizer::from_config(config)))
    }

    pub fn refine(&self, objective: &dyn Objective, x0: &TriggerVector) -> SchedulerResult<TriggerVector> {
        info!(start = %x0, "Refining start point");
        let refined = self.minimizer.minimize(objective, x0)?;
        if refined.len() != x0.len() {
            return Err(SchedulerError::TriggerLength {
                expected: x0.len(),
                actual: refined.len(),
            });
        }
        info!(refined = %refined, "Refinement complete");
        Ok(refined)
    }
}

impl std::fmt::Debug for LocalRefiner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalRefiner").finish_non_exhaustive()
    }
}
