//! # Ingestion Worker
//!
//! Aggregates historical risk signals for a repository: reverted and
//! rejected pull requests, closed defects, CI failure traces and the files
//! that define its architecture. Each `connection` request is fanned out to
//! four concurrent stages, merged into one `SignalEnvelope`, and handed to
//! the emission sink while the repository status is tracked in the status
//! store.
//!
//! ## Architecture
//!
//! - `model`: request, records, envelope and status codes
//! - `classify`: ordered revert and rejection rule tables
//! - `stages`: bucketer, defect extractor, build-failure extractor,
//!   architecture scanner
//! - `coordinator`: the per-request state machine
//! - `pool`: poll loop and fixed-size worker pool
//! - `transport`: job source, envelope sink and status store boundaries
//! - `logging`: subscriber setup

pub mod classify;
pub mod coordinator;
pub mod error;
pub mod logging;
pub mod model;
pub mod pool;
pub mod stages;
pub mod transport;

pub use coordinator::{Coordinator, CoordinatorSettings, Outcome};
pub use error::PipelineError;
pub use model::{RepoStatus, SignalEnvelope, SignalRequest};
pub use pool::WorkerPool;
