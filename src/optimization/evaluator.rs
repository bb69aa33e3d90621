//! Objective Evaluator: one simulator run per candidate, reduced to a scalar.

use std::sync::Arc;

use tracing::debug;

use crate::error::{SchedulerError, SchedulerResult};
use crate::simulator::{CropSimulator, SimulationOutput, SimulationRequest};
use crate::types::{EvaluationDiagnostics, Scenario};

/// Scalar function minimized by the search phases.
///
/// Shared by reference across start-point workers, hence `Send + Sync`.
pub trait Objective: Send + Sync {
    fn cost(&self, smt: &[f64]) -> SchedulerResult<f64>;
}

impl<F> Objective for F
where
    F: Fn(&[f64]) -> SchedulerResult<f64> + Send + Sync,
{
    fn cost(&self, smt: &[f64]) -> SchedulerResult<f64> {
        self(smt)
    }
}

/// Evaluates trigger vectors against a fixed scenario.
///
/// Every call re-invokes the simulator; nothing is cached.
#[derive(Clone)]
pub struct ObjectiveEvaluator {
    simulator: Arc<dyn CropSimulator>,
    scenario: Arc<Scenario>,
}

impl ObjectiveEvaluator {
    pub fn new(simulator: Arc<dyn CropSimulator>, scenario: Arc<Scenario>) -> Self {
        Self {
            simulator,
            scenario,
        }
    }

    pub fn scenario(&self) -> &Scenario {
        &self.scenario
    }

    /// Mean dry yield across simulated seasons (the reward).
    pub fn evaluate(&self, smt: &[f64]) -> SchedulerResult<f64> {
        Ok(self.simulate(smt)?.mean_dry_yield()?)
    }

    /// Yield, mean seasonal irrigation and reward from a single run.
    pub fn evaluate_diagnostic(&self, smt: &[f64]) -> SchedulerResult<EvaluationDiagnostics> {
        let output = self.simulate(smt)?;
        let yield_t_ha = output.mean_dry_yield()?;
        Ok(EvaluationDiagnostics {
            yield_t_ha,
            irrigation_mm: output.mean_seasonal_irrigation()?,
            reward: yield_t_ha,
        })
    }

    fn simulate(&self, smt: &[f64]) -> SchedulerResult<SimulationOutput> {
        if smt.len() != self.scenario.stages {
            return Err(SchedulerError::TriggerLength {
                expected: self.scenario.stages,
                actual: smt.len(),
            });
        }
        let (start, end) = self.scenario.evaluation_window();
        let request = SimulationRequest::for_scenario(&self.scenario, smt, start, end);
        let output = self.simulator.simulate(&request)?;
        debug!(
            simulator = self.simulator.name(),
            seasons = output.seasons.len(),
            "Candidate simulated"
        );
        Ok(output)
    }
}

impl std::fmt::Debug for ObjectiveEvaluator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ObjectiveEvaluator")
            .field("simulator", &self.simulator.name())
            .field("stages", &self.scenario.stages)
            .finish()
    }
}

/// Negated reward, so that minimizing maximizes yield.
impl Objective for ObjectiveEvaluator {
    fn cost(&self, smt: &[f64]) -> SchedulerResult<f64> {
        Ok(-self.evaluate(smt)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    use crate::simulator::{SeasonResult, SimulationError, SyntheticSimulator};
    use crate::types::sample_scenario;

    fn evaluator(optimum: Vec<f64>) -> ObjectiveEvaluator {
        ObjectiveEvaluator::new(
            Arc::new(SyntheticSimulator::new(optimum)),
            Arc::new(sample_scenario("2025/03/01", "2026/10/31")),
        )
    }

    /// Records every request and answers with a fixed two-season output.
    #[derive(Default)]
    struct RecordingSimulator {
        calls: AtomicUsize,
        last: Mutex<Option<SimulationRequest>>,
    }

    impl CropSimulator for RecordingSimulator {
        fn simulate(&self, request: &SimulationRequest) -> Result<SimulationOutput, SimulationError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            *self.last.lock().unwrap() = Some(request.clone());
            Ok(SimulationOutput {
                seasons: vec![
                    SeasonResult { dry_yield: 6.0, seasonal_irrigation: 120.0 },
                    SeasonResult { dry_yield: 8.0, seasonal_irrigation: 180.0 },
                ],
                water_flux: Vec::new(),
            })
        }

        fn name(&self) -> &str {
            "recording"
        }
    }

    #[test]
    fn test_valid_vectors_give_finite_non_negative_yield() {
        let eval = evaluator(vec![70.0; 4]);
        for smt in [[0.0; 4], [100.0; 4], [12.5, 99.0, 50.0, 3.0]] {
            let y = eval.evaluate(&smt).unwrap();
            assert!(y.is_finite() && y >= 0.0, "yield {y} for {smt:?}");
        }
    }

    #[test]
    fn test_cost_is_negated_yield() {
        let eval = evaluator(vec![70.0; 4]);
        let smt = [40.0, 50.0, 60.0, 70.0];
        assert_eq!(eval.cost(&smt).unwrap(), -eval.evaluate(&smt).unwrap());
    }

    #[test]
    fn test_diagnostic_reports_yield_irrigation_and_reward() {
        let sim = Arc::new(RecordingSimulator::default());
        let eval = ObjectiveEvaluator::new(
            sim.clone(),
            Arc::new(sample_scenario("2025/03/01", "2026/10/31")),
        );
        let d = eval.evaluate_diagnostic(&[50.0; 4]).unwrap();
        assert_eq!(d.yield_t_ha, 7.0);
        assert_eq!(d.irrigation_mm, 150.0);
        assert_eq!(d.reward, d.yield_t_ha);
    }

    #[test]
    fn test_evaluation_window_is_whole_years() {
        let sim = Arc::new(RecordingSimulator::default());
        let eval = ObjectiveEvaluator::new(
            sim.clone(),
            Arc::new(sample_scenario("2025/03/01", "2026/10/31")),
        );
        eval.evaluate(&[50.0; 4]).unwrap();
        let req = sim.last.lock().unwrap().clone().unwrap();
        assert_eq!(req.sim_start, "2025/01/01");
        assert_eq!(req.sim_end, "2026/12/31");
        assert_eq!(req.irrigation.smt, vec![50.0; 4]);
    }

    #[test]
    fn test_every_call_reinvokes_simulator() {
        let sim = Arc::new(RecordingSimulator::default());
        let eval = ObjectiveEvaluator::new(
            sim.clone(),
            Arc::new(sample_scenario("2025/01/01", "2025/12/31")),
        );
        eval.evaluate(&[50.0; 4]).unwrap();
        eval.evaluate(&[50.0; 4]).unwrap();
        eval.evaluate_diagnostic(&[50.0; 4]).unwrap();
        assert_eq!(sim.calls.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn test_wrong_length_rejected_before_simulating() {
        let sim = Arc::new(RecordingSimulator::default());
        let eval = ObjectiveEvaluator::new(
            sim.clone(),
            Arc::new(sample_scenario("2025/01/01", "2025/12/31")),
        );
        let err = eval.evaluate(&[50.0; 3]).unwrap_err();
        assert!(matches!(err, SchedulerError::TriggerLength { expected: 4, actual: 3 }));
        assert_eq!(sim.calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_out_of_range_values_are_passed_through() {
        let sim = Arc::new(RecordingSimulator::default());
        let eval = ObjectiveEvaluator::new(
            sim.clone(),
            Arc::new(sample_scenario("2025/01/01", "2025/12/31")),
        );
        eval.evaluate(&[-5.0, 120.0, 50.0, 50.0]).unwrap();
        let req = sim.last.lock().unwrap().clone().unwrap();
        assert_eq!(req.irrigation.smt, vec![-5.0, 120.0, 50.0, 50.0]);
    }
}
