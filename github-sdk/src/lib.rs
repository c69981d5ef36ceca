//! # GitHub SDK
//!
//! The gateway every ingestion stage uses to reach the GitHub REST API.
//!
//! This crate provides:
//!
//! - `GitHubClient`: a typed client for the handful of endpoints the worker
//!   needs (closed pulls and issues, comments, commits, workflow runs, job
//!   logs, repository contents)
//! - `RequestGate`: the shared token bucket that bounds how fast expensive
//!   fan-outs may start, with cancellable waits
//! - `ServiceError`: normalized error handling for remote calls
//!
//! ## Architecture
//!
//! - `core`: the client, its builder and the raw request executor
//! - `services`: endpoint groups implemented on top of the executor
//! - `models`: serde models for the GitHub JSON payloads
//! - `limiter`: the request gate

pub mod core;
pub use core::{ClientBuilder, GitHubClient};

pub mod services;

pub mod models;
pub use models::RepoRef;

pub mod error;
pub use error::{ErrorContext, Result, ServiceError};

pub mod limiter;
pub use limiter::RequestGate;

#[cfg(test)]
mod tests;
