//! Aggregation coordinator
//!
//! Drives one repository request through
//! `RECEIVED -> FETCHING -> (COMPLETE | FAILED) -> QUEUED`. The defect,
//! build-failure and architecture stages start immediately as independent
//! tasks; the bucketer waits on the request gate first. Every stage writes
//! its section of the shared envelope under one lock held only for the
//! write.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use config_rs::WorkerConfig;
use github_sdk::services::common::build_http_client;
use github_sdk::{GitHubClient, RepoRef, RequestGate, ServiceError};
use tokio::sync::Mutex;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::error::{PipelineError, Result};
use crate::model::{ChangeRequestEnvelope, RepoStatus, RequestKind, SignalEnvelope, SignalRequest};
use crate::stages::architecture::scan_architecture;
use crate::stages::build_failures::BuildFailureExtractor;
use crate::stages::defects::extract_defects;
use crate::stages::pr_bucket::{Bucketer, ChangeRequestBuckets};
use crate::transport::{EnvelopeSink, StatusStore};

#[derive(Debug, Clone)]
pub struct CoordinatorSettings {
    pub api_url: String,
    pub http_timeout: Duration,
    pub log_timeout: Duration,
    pub payload_warn_bytes: usize,
}

impl From<&WorkerConfig> for CoordinatorSettings {
    fn from(config: &WorkerConfig) -> Self {
        Self {
            api_url: config.github.api_url.clone(),
            http_timeout: config.github.http_timeout,
            log_timeout: config.github.log_timeout,
            payload_warn_bytes: config.payload_warn_bytes,
        }
    }
}

/// What happened to a request that did not fail
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Envelope emitted and status moved to QUEUED
    Queued { bytes: usize },
    /// Accepted without processing (`sync` or an unknown type)
    Skipped,
}

type SharedEnvelope = Arc<Mutex<SignalEnvelope>>;

pub struct Coordinator {
    settings: CoordinatorSettings,
    http: reqwest::Client,
    gate: Arc<RequestGate>,
    sink: Arc<dyn EnvelopeSink>,
    status: Arc<dyn StatusStore>,
}

impl Coordinator {
    pub fn new(
        settings: CoordinatorSettings,
        gate: Arc<RequestGate>,
        sink: Arc<dyn EnvelopeSink>,
        status: Arc<dyn StatusStore>,
    ) -> std::result::Result<Self, ServiceError> {
        let http = build_http_client(None, Some(settings.http_timeout))?;
        Ok(Self {
            settings,
            http,
            gate,
            sink,
            status,
        })
    }

    /// Process one raw job payload. Malformed payloads are rejected before
    /// any status is written.
    pub async fn handle(&self, payload: &[u8], cancel: &CancellationToken) -> Result<Outcome> {
        let request = SignalRequest::from_slice(payload)?;
        let repo = request.repo_ref()?;

        let span = info_span!("request", repo = %request.repo, request_id = %Uuid::new_v4());
        async {
            match request.kind {
                RequestKind::Connection => self.process_connection(&request, repo, cancel).await,
                RequestKind::Sync => {
                    info!("sync request for {} accepted, nothing to do", request.repo);
                    Ok(Outcome::Skipped)
                }
                RequestKind::Unknown => {
                    warn!("unknown request type for {}, ignored", request.repo);
                    Ok(Outcome::Skipped)
                }
            }
        }
        .instrument(span)
        .await
    }

    fn client_for(&self, token: &str) -> std::result::Result<GitHubClient, ServiceError> {
        GitHubClient::builder()
            .base_url(&self.settings.api_url)
            .token(token)
            .log_timeout(self.settings.log_timeout)
            .http_client(self.http.clone())
            .build()
    }

    async fn process_connection(
        &self,
        request: &SignalRequest,
        repo: RepoRef,
        cancel: &CancellationToken,
    ) -> Result<Outcome> {
        let client = match self.client_for(&request.access_token) {
            Ok(client) => client,
            Err(source) => {
                let err = PipelineError::UpstreamFetchFailed {
                    repo: request.repo.clone(),
                    source,
                };
                return Err(self.fail(&request.repo, err).await);
            }
        };

        info!("processing repository {}", request.repo);
        self.set_status(&request.repo, RepoStatus::Fetching).await;

        let now = Utc::now();
        let envelope: SharedEnvelope = Arc::new(Mutex::new(SignalEnvelope::new(&request.repo)));
        let mut stages = spawn_stages(&client, &repo, &envelope, now);

        if let Err(e) = self.gate.admit(cancel).await {
            stages.abort_all();
            warn!("request gate refused {}: {}", request.repo, e);
            let err = PipelineError::RateLimitCancelled {
                repo: request.repo.clone(),
            };
            return Err(self.fail(&request.repo, err).await);
        }

        let buckets = match Bucketer::new(&client, &repo).run(now).await {
            Ok(buckets) => buckets,
            Err(source) => {
                stages.abort_all();
                let err = PipelineError::UpstreamFetchFailed {
                    repo: request.repo.clone(),
                    source,
                };
                return Err(self.fail(&request.repo, err).await);
            }
        };

        let mut builders = spawn_bucket_builders(&request.repo, buckets, &envelope);
        drain("bucket payload", &mut builders).await;
        drain("stage", &mut stages).await;

        let envelope = std::mem::take(&mut *envelope.lock().await);
        self.emit(&request.repo, &envelope).await
    }

    async fn emit(&self, repo: &str, envelope: &SignalEnvelope) -> Result<Outcome> {
        let payload = match serde_json::to_vec(envelope) {
            Ok(payload) => payload,
            Err(e) => {
                let err = PipelineError::EmissionFailed {
                    repo: repo.to_string(),
                    reason: format!("serialization failed: {}", e),
                };
                return Err(self.fail(repo, err).await);
            }
        };

        let size = payload.len();
        info!(
            "repo fetch completed for {} | payload {} bytes ({:.2} MB)",
            repo,
            size,
            size as f64 / 1024.0 / 1024.0
        );
        if size > self.settings.payload_warn_bytes {
            warn!(
                "payload for {} is {} bytes, above the {} byte transport guideline",
                repo, size, self.settings.payload_warn_bytes
            );
        }

        match self.sink.deliver(&payload).await {
            Ok(receipt) => {
                info!("envelope for {} delivered to {}", repo, receipt.destination);
                self.set_status(repo, RepoStatus::Queued).await;
                Ok(Outcome::Queued { bytes: size })
            }
            Err(e) => {
                let err = PipelineError::EmissionFailed {
                    repo: repo.to_string(),
                    reason: e.to_string(),
                };
                Err(self.fail(repo, err).await)
            }
        }
    }

    async fn set_status(&self, repo: &str, status: RepoStatus) {
        match self.status.update_status(repo, status).await {
            Ok(()) => info!("repo {} status updated to {}", repo, status),
            Err(e) => error!("failed to update status for {} to {}: {}", repo, status, e),
        }
    }

    /// Record the failure and hand the error back to the caller
    async fn fail(&self, repo: &str, err: PipelineError) -> PipelineError {
        error!("{} [{}]", err, err.kind());
        if let Err(e) = self.status.mark_failed(repo, &err.to_string()).await {
            error!("failed to mark {} as failed: {}", repo, e);
        }
        err
    }
}

/// Defect, build-failure and architecture stages. Each writes its section
/// only on success; a failed stage leaves the section absent.
fn spawn_stages(
    client: &GitHubClient,
    repo: &RepoRef,
    envelope: &SharedEnvelope,
    now: DateTime<Utc>,
) -> JoinSet<()> {
    let mut stages = JoinSet::new();

    {
        let (client, repo, envelope) = (client.clone(), repo.clone(), envelope.clone());
        stages.spawn(
            async move {
                match extract_defects(&client, &repo, now).await {
                    Ok(defects) => envelope.lock().await.bug = Some(defects),
                    Err(e) => warn!("{}", PipelineError::degraded("defects", e.to_string())),
                }
            }
            .in_current_span(),
        );
    }

    {
        let (client, repo, envelope) = (client.clone(), repo.clone(), envelope.clone());
        stages.spawn(
            async move {
                match BuildFailureExtractor::new(&client, &repo).run(now).await {
                    Ok(failures) => envelope.lock().await.workflow_crash = Some(failures),
                    Err(e) => warn!("{}", PipelineError::degraded("build_failures", e.to_string())),
                }
            }
            .in_current_span(),
        );
    }

    {
        let (client, repo, envelope) = (client.clone(), repo.clone(), envelope.clone());
        stages.spawn(
            async move {
                match scan_architecture(&client, &repo).await {
                    Ok(files) => envelope.lock().await.rule = Some(files),
                    Err(e) => warn!("{}", PipelineError::degraded("architecture", e.to_string())),
                }
            }
            .in_current_span(),
        );
    }

    stages
}

/// Build the reverted and rejected envelope lists. Empty buckets leave
/// their section absent.
fn spawn_bucket_builders(repo: &str, buckets: ChangeRequestBuckets, envelope: &SharedEnvelope) -> JoinSet<()> {
    let mut builders = JoinSet::new();
    let ChangeRequestBuckets { reverted, rejected } = buckets;

    if !reverted.is_empty() {
        let (repo, envelope) = (repo.to_string(), envelope.clone());
        builders.spawn(async move {
            let entries: Vec<_> = reverted
                .into_iter()
                .map(|pr| ChangeRequestEnvelope::new(&repo, pr))
                .collect();
            envelope.lock().await.reverted_prs = Some(entries);
        });
    }

    if !rejected.is_empty() {
        let (repo, envelope) = (repo.to_string(), envelope.clone());
        builders.spawn(async move {
            let entries: Vec<_> = rejected
                .into_iter()
                .map(|pr| ChangeRequestEnvelope::new(&repo, pr))
                .collect();
            envelope.lock().await.rejected_prs = Some(entries);
        });
    }

    builders
}

async fn drain(group: &str, tasks: &mut JoinSet<()>) {
    while let Some(joined) = tasks.join_next().await {
        if let Err(e) = joined {
            error!("{} task did not complete: {}", group, e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::{MemoryEnvelopeSink, MemoryStatusStore};

    fn coordinator(sink: Arc<MemoryEnvelopeSink>, status: Arc<MemoryStatusStore>) -> Coordinator {
        let settings = CoordinatorSettings {
            api_url: "http://127.0.0.1:9".into(),
            http_timeout: Duration::from_secs(1),
            log_timeout: Duration::from_secs(1),
            payload_warn_bytes: 1_000_000,
        };
        Coordinator::new(settings, Arc::new(RequestGate::new(2, 4).unwrap()), sink, status).unwrap()
    }

    #[tokio::test]
    async fn test_sync_request_is_a_no_op() {
        let sink = Arc::new(MemoryEnvelopeSink::new());
        let status = Arc::new(MemoryStatusStore::new());
        let coordinator = coordinator(sink.clone(), status.clone());

        let outcome = coordinator
            .handle(
                br#"{"repo":"octo/widgets","access_token":"t","type":"sync"}"#,
                &CancellationToken::new(),
            )
            .await
            .unwrap();

        assert_eq!(outcome, Outcome::Skipped);
        assert!(status.transitions().await.is_empty());
        assert!(sink.delivered().await.is_empty());
    }

    #[tokio::test]
    async fn test_malformed_requests_write_no_status() {
        let sink = Arc::new(MemoryEnvelopeSink::new());
        let status = Arc::new(MemoryStatusStore::new());
        let coordinator = coordinator(sink.clone(), status.clone());
        let cancel = CancellationToken::new();

        let err = coordinator.handle(b"{oops", &cancel).await.unwrap_err();
        assert!(matches!(err, PipelineError::MalformedRequest(_)));

        let err = coordinator
            .handle(br#"{"repo":"widgets","access_token":"t","type":"connection"}"#, &cancel)
            .await
            .unwrap_err();
        assert!(matches!(err, PipelineError::MalformedRequest(_)));

        assert!(status.transitions().await.is_empty());
        assert!(sink.delivered().await.is_empty());
    }

    #[tokio::test]
    async fn test_cancelled_gate_marks_failed() {
        let sink = Arc::new(MemoryEnvelopeSink::new());
        let status = Arc::new(MemoryStatusStore::new());
        let coordinator = coordinator(sink.clone(), status.clone());
        let cancel = CancellationToken::new();
        cancel.cancel();

        let err = coordinator
            .handle(br#"{"repo":"octo/widgets","access_token":"t","type":"connection"}"#, &cancel)
            .await
            .unwrap_err();

        assert!(matches!(err, PipelineError::RateLimitCancelled { .. }));
        assert_eq!(
            status.history("octo/widgets").await,
            vec![RepoStatus::Fetching, RepoStatus::Failed]
        );
        assert!(sink.delivered().await.is_empty());
    }
}
