//! Pipeline error taxonomy
//!
//! Every failure a request can meet ends up as one of these variants. Only
//! the bucketer and the coordinator return them; the other stages log a
//! `PartialStageDegradation` and carry on with whatever they collected.

use github_sdk::ServiceError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PipelineError {
    /// Unparseable payload or repository identifier. No status can be
    /// recorded because there is no trustworthy repository key.
    #[error("malformed request: {0}")]
    MalformedRequest(String),

    #[error("rate limiter wait cancelled for {repo}")]
    RateLimitCancelled { repo: String },

    #[error("upstream fetch failed for {repo}: {source}")]
    UpstreamFetchFailed {
        repo: String,
        #[source]
        source: ServiceError,
    },

    #[error("{stage} degraded: {detail}")]
    PartialStageDegradation { stage: &'static str, detail: String },

    #[error("emission failed for {repo}: {reason}")]
    EmissionFailed { repo: String, reason: String },
}

impl PipelineError {
    pub fn degraded(stage: &'static str, detail: impl Into<String>) -> Self {
        Self::PartialStageDegradation {
            stage,
            detail: detail.into(),
        }
    }

    /// Short machine-friendly name used in logs and the failure message
    /// written to the status store
    pub fn kind(&self) -> &'static str {
        match self {
            Self::MalformedRequest(_) => "malformed_request",
            Self::RateLimitCancelled { .. } => "rate_limit_cancelled",
            Self::UpstreamFetchFailed { .. } => "upstream_fetch_failed",
            Self::PartialStageDegradation { .. } => "partial_stage_degradation",
            Self::EmissionFailed { .. } => "emission_failed",
        }
    }
}

pub type Result<T> = std::result::Result<T, PipelineError>;
