//! Start-Point Search: random-restart scan ahead of local refinement.
//!
//! Candidates are scored through a [`BatchEvaluator`]. The worker-pool
//! strategy is preferred; if the pool cannot be built or dies mid-batch the
//! same candidates are rescored sequentially. When nothing at all can be
//! scored the midpoint vector is substituted and flagged as a fallback.

use std::any::Any;
use std::num::NonZeroUsize;
use std::panic::{self, AssertUnwindSafe};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

use super::Objective;
use crate::error::{SchedulerError, SchedulerResult};
use crate::types::{
    SearchTrace, StartOrigin, StartPoint, TraceEntry, TriggerVector, TRIGGER_MAX, TRIGGER_MIN,
};

/// How the batch of candidates is scored.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchMode {
    /// Worker pool when more than one core is available, else sequential.
    #[default]
    Auto,
    Parallel,
    Sequential,
}

#[derive(Error, Debug)]
pub enum BatchError {
    /// The evaluation backend itself failed; retry on another strategy.
    #[error("batch backend failed: {0}")]
    Backend(String),

    /// A candidate evaluation returned an error; aborts the search.
    #[error(transparent)]
    Objective(#[from] SchedulerError),
}

/// Scores a batch of candidates, preserving input order.
///
/// `None` marks a candidate whose evaluation died without producing a value.
pub trait BatchEvaluator {
    fn name(&self) -> &'static str;

    fn evaluate_batch(
        &self,
        objective: &dyn Objective,
        candidates: &[TriggerVector],
    ) -> Result<Vec<Option<f64>>, BatchError>;
}

// ============================================================================
// Strategies
// ============================================================================

/// Bounded rayon pool, one task per candidate, full barrier.
#[derive(Debug, Clone, Copy)]
pub struct ParallelBatch {
    workers: usize,
}

impl ParallelBatch {
    pub fn new(workers: usize) -> Self {
        Self {
            workers: workers.max(1),
        }
    }

    pub fn workers(&self) -> usize {
        self.workers
    }
}

impl BatchEvaluator for ParallelBatch {
    fn name(&self) -> &'static str {
        "parallel"
    }

    fn evaluate_batch(
        &self,
        objective: &dyn Objective,
        candidates: &[TriggerVector],
    ) -> Result<Vec<Option<f64>>, BatchError> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.workers)
            .thread_name(|i| format!("start-search-{i}"))
            .build()
            .map_err(|e| BatchError::Backend(e.to_string()))?;

        // A panicking worker takes the whole batch down with it.
        let results: Vec<SchedulerResult<f64>> = panic::catch_unwind(AssertUnwindSafe(|| {
            pool.install(|| {
                candidates
                    .par_iter()
                    .map(|c| objective.cost(c.as_slice()))
                    .collect()
            })
        }))
        .map_err(|payload| BatchError::Backend(panic_message(payload.as_ref())))?;

        results
            .into_iter()
            .map(|r| r.map(Some).map_err(BatchError::from))
            .collect()
    }
}

/// Scores candidates one at a time on the calling thread.
#[derive(Debug, Clone, Copy, Default)]
pub struct SequentialBatch;

impl SequentialBatch {
    /// Score every candidate; a panicking candidate is skipped with `None`.
    /// Never fails as a backend, only on an objective error.
    pub fn score(
        &self,
        objective: &dyn Objective,
        candidates: &[TriggerVector],
    ) -> SchedulerResult<Vec<Option<f64>>> {
        let mut scores = Vec::with_capacity(candidates.len());
        for (i, c) in candidates.iter().enumerate() {
            match panic::catch_unwind(AssertUnwindSafe(|| objective.cost(c.as_slice()))) {
                Ok(Ok(v)) => scores.push(Some(v)),
                Ok(Err(e)) => return Err(e),
                Err(payload) => {
                    warn!(
                        candidate = i,
                        reason = %panic_message(payload.as_ref()),
                        "Candidate evaluation died, skipping"
                    );
                    scores.push(None);
                }
            }
        }
        Ok(scores)
    }
}

impl BatchEvaluator for SequentialBatch {
    fn name(&self) -> &'static str {
        "sequential"
    }

    fn evaluate_batch(
        &self,
        objective: &dyn Objective,
        candidates: &[TriggerVector],
    ) -> Result<Vec<Option<f64>>, BatchError> {
        Ok(self.score(objective, candidates)?)
    }
}

pub(super) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "worker panicked".to_string()
    }
}

// ============================================================================
// Search
// ============================================================================

/// Random-restart scan configuration.
#[derive(Debug, Clone)]
pub struct StartPointSearch {
    stages: usize,
    num_searches: usize,
    mode: SearchMode,
    seed: Option<u64>,
    max_workers: Option<usize>,
}

impl StartPointSearch {
    pub fn new(stages: usize, num_searches: usize) -> Self {
        Self {
            stages,
            num_searches,
            mode: SearchMode::Auto,
            seed: None,
            max_workers: None,
        }
    }

    pub fn with_mode(mut self, mode: SearchMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_seed(mut self, seed: Option<u64>) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_max_workers(mut self, max_workers: Option<usize>) -> Self {
        self.max_workers = max_workers;
        self
    }

    pub fn stages(&self) -> usize {
        self.stages
    }

    /// Draw `num_searches` vectors, components uniform on `[0, 100)`.
    pub fn draw_candidates(&self) -> Vec<TriggerVector> {
        let mut rng = match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        (0..self.num_searches)
            .map(|_| {
                TriggerVector::new(
                    (0..self.stages)
                        .map(|_| rng.gen_range(TRIGGER_MIN..TRIGGER_MAX))
                        .collect(),
                )
            })
            .collect()
    }

    /// Pool size for a batch of `batch` candidates, or `None` to run
    /// sequentially.
    pub fn worker_count(&self, batch: usize) -> Option<usize> {
        let available = std::thread::available_parallelism().map(NonZeroUsize::get);
        let workers = |cores: usize| {
            let cap = self.max_workers.unwrap_or(cores);
            batch.min(cap).max(1)
        };
        match self.mode {
            SearchMode::Sequential => None,
            SearchMode::Parallel => Some(workers(available.unwrap_or(1))),
            SearchMode::Auto => match available {
                Ok(cores) if cores > 1 && batch > 1 => Some(workers(cores)),
                _ => None,
            },
        }
    }

    /// Draw a fresh batch and pick the best candidate.
    pub fn find_start(&self, objective: &dyn Objective) -> SchedulerResult<StartPoint> {
        let candidates = self.draw_candidates();
        self.find_start_from(objective, candidates)
    }

    /// Score the given candidates and pick the best one.
    pub fn find_start_from(
        &self,
        objective: &dyn Objective,
        candidates: Vec<TriggerVector>,
    ) -> SchedulerResult<StartPoint> {
        let (scores, origin) = match self.worker_count(candidates.len()) {
            Some(workers) => {
                let pool = ParallelBatch::new(workers);
                info!(
                    workers,
                    candidates = candidates.len(),
                    "Scoring start candidates on worker pool"
                );
                match pool.evaluate_batch(objective, &candidates) {
                    Ok(scores) => (scores, StartOrigin::Parallel { workers }),
                    Err(BatchError::Backend(reason)) => {
                        warn!(%reason, "Worker pool failed, rescoring candidates sequentially");
                        (SequentialBatch.score(objective, &candidates)?, StartOrigin::Sequential)
                    }
                    Err(BatchError::Objective(e)) => return Err(e),
                }
            }
            None => {
                info!(candidates = candidates.len(), "Scoring start candidates sequentially");
                (SequentialBatch.score(objective, &candidates)?, StartOrigin::Sequential)
            }
        };

        let trace = SearchTrace {
            entries: candidates
                .into_iter()
                .zip(scores)
                .filter_map(|(candidate, score)| {
                    score.map(|objective| TraceEntry {
                        candidate,
                        objective,
                    })
                })
                .collect(),
        };

        match trace.best_index() {
            Some(best) => {
                let entry = &trace.entries[best];
                debug!(
                    scored = trace.len(),
                    best = %entry.candidate,
                    objective = entry.objective,
                    "Start point selected"
                );
                Ok(StartPoint {
                    vector: entry.candidate.clone(),
                    objective: Some(entry.objective),
                    origin,
                    trace,
                })
            }
            None => {
                warn!(
                    stages = self.stages,
                    "No start candidate could be scored, using the midpoint default"
                );
                Ok(StartPoint {
                    vector: TriggerVector::midpoint(self.stages),
                    objective: None,
                    origin: StartOrigin::Fallback,
                    trace,
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn sum_objective(x: &[f64]) -> SchedulerResult<f64> {
        Ok(x.iter().sum())
    }

    #[test]
    fn test_draws_are_in_range_and_seeded() {
        let search = StartPointSearch::new(4, 50).with_seed(Some(11));
        let a = search.draw_candidates();
        let b = search.draw_candidates();
        assert_eq!(a.len(), 50);
        assert!(a.iter().all(|c| c.len() == 4));
        assert!(a
            .iter()
            .flat_map(|c| c.as_slice())
            .all(|v| (TRIGGER_MIN..TRIGGER_MAX).contains(v)));
        assert_eq!(a, b);
    }

    #[test]
    fn test_worker_count_respects_mode_and_bounds() {
        let seq = StartPointSearch::new(4, 10).with_mode(SearchMode::Sequential);
        assert_eq!(seq.worker_count(10), None);

        let par = StartPointSearch::new(4, 10)
            .with_mode(SearchMode::Parallel)
            .with_max_workers(Some(3));
        assert_eq!(par.worker_count(10), Some(3));
        assert_eq!(par.worker_count(2), Some(2));

        let single = StartPointSearch::new(4, 1).with_mode(SearchMode::Auto);
        assert_eq!(single.worker_count(1), None);
    }

    #[test]
    fn test_parallel_and_sequential_agree() {
        let candidates = StartPointSearch::new(3, 40).with_seed(Some(5)).draw_candidates();
        let objective = sum_objective;

        let par = StartPointSearch::new(3, 40)
            .with_mode(SearchMode::Parallel)
            .with_max_workers(Some(4))
            .find_start_from(&objective, candidates.clone())
            .unwrap();
        let seq = StartPointSearch::new(3, 40)
            .with_mode(SearchMode::Sequential)
            .find_start_from(&objective, candidates)
            .unwrap();

        assert_eq!(par.vector, seq.vector);
        assert_eq!(par.origin, StartOrigin::Parallel { workers: 4 });
        assert_eq!(seq.origin, StartOrigin::Sequential);
        assert_eq!(par.trace, seq.trace);
    }

    #[test]
    fn test_ties_keep_first_candidate() {
        let candidates = vec![
            TriggerVector::new(vec![10.0, 0.0]),
            TriggerVector::new(vec![0.0, 5.0]),
            TriggerVector::new(vec![5.0, 0.0]),
        ];
        let start = StartPointSearch::new(2, 3)
            .with_mode(SearchMode::Sequential)
            .find_start_from(&sum_objective, candidates)
            .unwrap();
        assert_eq!(start.vector.as_slice(), &[0.0, 5.0]);
        assert_eq!(start.objective, Some(5.0));
    }

    #[test]
    fn test_worker_panic_falls_back_to_sequential() {
        // Panics only on worker threads, so the sequential rescoring succeeds.
        let objective = |x: &[f64]| -> SchedulerResult<f64> {
            let on_pool = std::thread::current()
                .name()
                .is_some_and(|n| n.starts_with("start-search-"));
            assert!(!on_pool, "pool worker crashed");
            Ok(x.iter().sum())
        };
        let start = StartPointSearch::new(2, 8)
            .with_seed(Some(3))
            .with_mode(SearchMode::Parallel)
            .with_max_workers(Some(2))
            .find_start(&objective)
            .unwrap();
        assert_eq!(start.origin, StartOrigin::Sequential);
        assert_eq!(start.trace.len(), 8);
    }

    #[test]
    fn test_all_failures_return_midpoint() {
        let calls = AtomicUsize::new(0);
        let objective = |_: &[f64]| -> SchedulerResult<f64> {
            calls.fetch_add(1, Ordering::SeqCst);
            panic!("simulator crashed");
        };
        let start = StartPointSearch::new(4, 6)
            .with_seed(Some(1))
            .with_mode(SearchMode::Parallel)
            .with_max_workers(Some(2))
            .find_start(&objective)
            .unwrap();
        assert_eq!(start.vector, TriggerVector::midpoint(4));
        assert!(start.origin.is_fallback());
        assert!(start.objective.is_none());
        assert!(start.trace.is_empty());
        // the sequential pass retried every candidate
        assert!(calls.load(Ordering::SeqCst) >= 6);
    }

    #[test]
    fn test_objective_error_aborts_search() {
        let objective = |x: &[f64]| -> SchedulerResult<f64> {
            if x[0] > 50.0 {
                Err(SchedulerError::Optimizer("simulator refused".to_string()))
            } else {
                Ok(0.0)
            }
        };
        let candidates = vec![
            TriggerVector::new(vec![10.0]),
            TriggerVector::new(vec![90.0]),
        ];
        for mode in [SearchMode::Parallel, SearchMode::Sequential] {
            let err = StartPointSearch::new(1, 2)
                .with_mode(mode)
                .find_start_from(&objective, candidates.clone())
                .unwrap_err();
            assert!(matches!(err, SchedulerError::Optimizer(_)), "{mode:?}: {err}");
        }
    }

    #[test]
    fn test_sequential_batch_absorbs_panics() {
        let objective = |_: &[f64]| -> SchedulerResult<f64> { panic!("simulator crashed") };
        let candidates = vec![TriggerVector::midpoint(2); 3];
        let scores = SequentialBatch
            .evaluate_batch(&objective, &candidates)
            .unwrap();
        assert_eq!(scores, vec![None; 3]);
    }

    #[test]
    fn test_partial_sequential_failures_are_skipped() {
        let objective = |x: &[f64]| -> SchedulerResult<f64> {
            assert!(x[0] < 50.0, "bad candidate");
            Ok(-x[0])
        };
        let candidates = vec![
            TriggerVector::new(vec![10.0]),
            TriggerVector::new(vec![90.0]),
            TriggerVector::new(vec![40.0]),
        ];
        let start = StartPointSearch::new(1, 3)
            .with_mode(SearchMode::Sequential)
            .find_start_from(&objective, candidates)
            .unwrap();
        assert_eq!(start.vector.as_slice(), &[40.0]);
        assert_eq!(start.trace.len(), 2);
    }
}
