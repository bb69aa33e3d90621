//! Trigger Optimization Engine
//!
//! Two-phase black-box search over soil-moisture trigger vectors:
//!
//! 1. [`StartPointSearch`] scores a batch of random candidates (on a worker
//!    pool when the host allows it) and keeps the best one.
//! 2. [`LocalRefiner`] runs a derivative-free simplex descent from there.
//!
//! Both phases only see the [`Objective`] trait; [`ObjectiveEvaluator`] is
//! the implementation that drives the crop simulator.

mod evaluator;
mod refiner;
mod start_point;

pub use evaluator::{Objective, ObjectiveEvaluator};
pub use refiner::{LocalRefiner, Minimizer, NelderMeadMinimizer};
pub use start_point::{
    BatchError, BatchEvaluator, ParallelBatch, SearchMode, SequentialBatch, StartPointSearch,
};
