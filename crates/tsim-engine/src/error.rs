//! Engine error taxonomy.
//!
//! Build-time precondition violations are the only recoverable errors the
//! engine surfaces as values; per-agent failures during the run are
//! counters plus warnings, and a worker-thread failure propagates as a
//! panic out of `run()` — a batch run has nothing sensible to salvage from
//! a broken barrier protocol.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("no population loaded — nothing to simulate")]
    EmptyPopulation,

    #[error("no events sink configured")]
    NoEventsSink,

    #[error("expected {expected} worker events publishers (one per partition), got {got}")]
    PublisherCount { expected: usize, got: usize },

    #[error("timestep must be at least 1 second")]
    ZeroTimestep,
}

pub type EngineResult<T> = Result<T, EngineError>;
