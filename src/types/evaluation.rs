//! Evaluation and search result types.

use std::path::PathBuf;

use serde::Serialize;

use super::TriggerVector;

/// Diagnostic-mode evaluation of one trigger vector.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct EvaluationDiagnostics {
    /// Mean dry yield across simulated seasons (t/ha).
    pub yield_t_ha: f64,
    /// Mean seasonal irrigation across simulated seasons (mm).
    pub irrigation_mm: f64,
    /// Quantity being maximized. Equal to `yield_t_ha`.
    pub reward: f64,
}

/// One evaluated candidate of the start-point scan.
#[derive(Debug, Clone, PartialEq)]
pub struct TraceEntry {
    pub candidate: TriggerVector,
    /// Minimization objective (negated yield).
    pub objective: f64,
}

/// Every candidate drawn by one start-point scan, in draw order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchTrace {
    pub entries: Vec<TraceEntry>,
}

impl SearchTrace {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Index of the first entry with the smallest non-NaN objective.
    pub fn best_index(&self) -> Option<usize> {
        let mut best: Option<(usize, f64)> = None;
        for (i, e) in self.entries.iter().enumerate() {
            if e.objective.is_nan() {
                continue;
            }
            match best {
                Some((_, b)) if e.objective >= b => {}
                _ => best = Some((i, e.objective)),
            }
        }
        best.map(|(i, _)| i)
    }
}

/// How the starting vector for refinement was obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StartOrigin {
    /// Best candidate of a worker-pool scan.
    Parallel { workers: usize },
    /// Best candidate of a sequential scan (forced, or after a pool failure).
    Sequential,
    /// No candidate could be scored; the midpoint default was substituted.
    Fallback,
}

impl StartOrigin {
    pub fn is_fallback(self) -> bool {
        matches!(self, Self::Fallback)
    }
}

/// Result of the start-point scan.
#[derive(Debug, Clone, PartialEq)]
pub struct StartPoint {
    pub vector: TriggerVector,
    /// Objective of `vector`, absent for the fallback default.
    pub objective: Option<f64>,
    pub origin: StartOrigin,
    pub trace: SearchTrace,
}

/// Externally visible result of a full run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OptimizationOutcome {
    /// Refined triggers, clipped to `[0, 100]`.
    pub optimal: TriggerVector,
    pub schedule_path: PathBuf,
    pub start_origin: StartOrigin,
    /// Expected performance of `optimal` over the optimization window.
    pub diagnostics: Option<EvaluationDiagnostics>,
    pub schedule_days: usize,
    pub schedule_total_mm: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(objective: f64) -> TraceEntry {
        TraceEntry {
            candidate: TriggerVector::midpoint(2),
            objective,
        }
    }

    #[test]
    fn test_best_index_first_minimum_wins() {
        let trace = SearchTrace {
            entries: vec![entry(-1.0), entry(-3.0), entry(-2.0), entry(-3.0)],
        };
        assert_eq!(trace.best_index(), Some(1));
    }

    #[test]
    fn test_best_index_skips_nan() {
        let trace = SearchTrace {
            entries: vec![entry(f64::NAN), entry(-0.5), entry(f64::NAN)],
        };
        assert_eq!(trace.best_index(), Some(1));
    }

    #[test]
    fn test_best_index_empty_or_all_nan() {
        assert_eq!(SearchTrace::default().best_index(), None);
        let trace = SearchTrace {
            entries: vec![entry(f64::NAN)],
        };
        assert_eq!(trace.best_index(), None);
    }
}
