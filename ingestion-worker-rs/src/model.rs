// ingestion-worker-rs/src/model.rs
//
// Data model for one aggregation run:
// - SignalRequest: the inbound job
// - the per-stage records (change requests, defects, build failures,
//   architecture files)
// - SignalEnvelope: the aggregate handed to the emission sink
// - RepoStatus: the status codes written to the status store

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use github_sdk::RepoRef;
use serde::{Deserialize, Serialize};

use crate::error::PipelineError;

/// Operation requested for a repository
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RequestKind {
    Sync,
    Connection,
    #[serde(other)]
    Unknown,
}

/// Inbound job: `{repo, access_token, type}`
#[derive(Clone, Deserialize)]
pub struct SignalRequest {
    pub repo: String,
    pub access_token: String,
    #[serde(rename = "type")]
    pub kind: RequestKind,
}

impl fmt::Debug for SignalRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SignalRequest")
            .field("repo", &self.repo)
            .field("access_token", &"[REDACTED]")
            .field("kind", &self.kind)
            .finish()
    }
}

impl SignalRequest {
    /// Decode a raw job payload
    pub fn from_slice(payload: &[u8]) -> Result<Self, PipelineError> {
        serde_json::from_slice(payload)
            .map_err(|e| PipelineError::MalformedRequest(format!("undecodable payload: {}", e)))
    }

    /// Split the `owner/name` identifier
    pub fn repo_ref(&self) -> Result<RepoRef, PipelineError> {
        RepoRef::parse(&self.repo).map_err(|e| PipelineError::MalformedRequest(e.to_string()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Authorship {
    Bot,
    Human,
}

impl Authorship {
    pub fn from_bot_flag(is_bot: bool) -> Self {
        if is_bot {
            Self::Bot
        } else {
            Self::Human
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CommentRecord {
    pub author: String,
    pub author_type: Authorship,
    pub is_bot: bool,
    pub body: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RevertKind {
    ExplicitTitle,
    ExplicitCommit,
    Heuristic,
    Contextual,
}

/// Outcome of revert detection
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RevertSignal {
    pub revert_kind: RevertKind,
    pub revert_confidence: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectionReason {
    BotGenerated,
    RateLimited,
    ReviewSkipped,
    Manual,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Rejection {
    pub rejection_reason: RejectionReason,
    pub authorship: Authorship,
}

/// Why a change request was kept. Serialized flat into the record.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Classification {
    Reverted(RevertSignal),
    Rejected(Rejection),
}

#[derive(Debug, Clone, Serialize)]
pub struct ChangeRequestRecord {
    pub number: u64,
    pub title: String,
    pub body: String,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub merged_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub merge_commit_sha: Option<String>,
    pub html_url: String,
    /// Present only for merged reverts
    #[serde(skip_serializing_if = "Option::is_none")]
    pub diff: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub comments: Vec<CommentRecord>,
    pub head_branch: String,
    pub base_branch: String,
    #[serde(flatten)]
    pub classification: Classification,
}

impl ChangeRequestRecord {
    pub fn revert_signal(&self) -> Option<RevertSignal> {
        match self.classification {
            Classification::Reverted(signal) => Some(signal),
            Classification::Rejected(_) => None,
        }
    }

    pub fn rejection(&self) -> Option<Rejection> {
        match self.classification {
            Classification::Rejected(rejection) => Some(rejection),
            Classification::Reverted(_) => None,
        }
    }
}

/// Envelope entry for one change request. The diff is lifted out of the
/// record so it is carried once.
#[derive(Debug, Clone, Serialize)]
pub struct ChangeRequestEnvelope {
    pub repo: String,
    pub pr: ChangeRequestRecord,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub diff: Option<String>,
}

impl ChangeRequestEnvelope {
    pub fn new(repo: &str, mut pr: ChangeRequestRecord) -> Self {
        let diff = pr.diff.take();
        Self {
            repo: repo.to_string(),
            pr,
            diff,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeHint {
    Bugfix,
    Feature,
    Refactor,
    Test,
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TimeBucket {
    #[serde(rename = "last_7d")]
    Last7d,
    #[serde(rename = "last_30d")]
    Last30d,
    Older,
    Unknown,
}

#[derive(Debug, Clone, Serialize)]
pub struct DefectRecord {
    pub number: u64,
    pub title: String,
    pub body: String,
    pub state: String,
    pub html_url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    pub labels: Vec<String>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
    pub closed_at: Option<DateTime<Utc>>,
    pub issue_type: String,
    pub change_hint: ChangeHint,
    pub keywords: Vec<String>,
    pub time_bucket: TimeBucket,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CodeChange {
    pub filename: String,
    pub patch: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeSource {
    Pr,
    Direct,
}

/// Code that was in flight when a CI run failed
#[derive(Debug, Clone, Serialize)]
pub struct ChangeContext {
    #[serde(rename = "type")]
    pub source: ChangeSource,
    pub branch: String,
    pub files: Vec<CodeChange>,
}

#[derive(Debug, Clone, Serialize)]
pub struct LinkedChangeRequest {
    pub number: u64,
    pub title: String,
    pub body: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct BuildFailureRecord {
    pub id: u64,
    pub name: String,
    pub job_name: String,
    /// ANSI-stripped tail of the failing job's log
    pub error_signature: String,
    pub html_url: String,
    pub created_at: DateTime<Utc>,
    pub branch: String,
    pub head_sha: String,
    pub commit_msg: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pull_request: Option<LinkedChangeRequest>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub change: Option<ChangeContext>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FileRole {
    Documentation,
    CiPipeline,
    RuntimeConfig,
    RuntimeOrchestration,
    DependencyManifest,
    BuildConfig,
    InfraConfig,
    Entrypoint,
    TestConfig,
    Config,
}

impl FileRole {
    /// Fixed weight of a role when ranking architecture files
    pub fn importance(self) -> f32 {
        match self {
            Self::Entrypoint => 1.0,
            Self::RuntimeConfig | Self::RuntimeOrchestration => 0.9,
            Self::CiPipeline => 0.85,
            Self::DependencyManifest => 0.8,
            Self::BuildConfig => 0.7,
            Self::Documentation => 0.6,
            Self::InfraConfig | Self::TestConfig | Self::Config => 0.4,
        }
    }
}

pub type Signals = BTreeMap<String, serde_json::Value>;

#[derive(Debug, Clone, Serialize)]
pub struct ArchitectureFileRecord {
    pub path: String,
    pub name: String,
    pub html_url: String,
    pub content: String,
    pub size: u64,
    pub language: String,
    pub role: FileRole,
    pub importance: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub signals: Option<Signals>,
    pub is_truncated: bool,
}

/// Per-request aggregate. Absent sections are omitted from the JSON.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SignalEnvelope {
    pub repo: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub workflow_crash: Option<Vec<BuildFailureRecord>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bug: Option<Vec<DefectRecord>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rule: Option<Vec<ArchitectureFileRecord>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reverted_prs: Option<Vec<ChangeRequestEnvelope>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rejected_prs: Option<Vec<ChangeRequestEnvelope>>,
}

impl SignalEnvelope {
    pub fn new(repo: impl Into<String>) -> Self {
        Self {
            repo: repo.into(),
            ..Default::default()
        }
    }
}

/// Status codes persisted for a repository
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RepoStatus {
    Fetching,
    Queued,
    Failed,
}

impl RepoStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Fetching => "FETCHING",
            Self::Queued => "QUEUED",
            Self::Failed => "FAILED",
        }
    }
}

impl fmt::Display for RepoStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
