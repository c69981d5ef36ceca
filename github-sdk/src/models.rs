//! Models for the GitHub REST payloads the worker consumes
//!
//! Only the fields the ingestion stages read are modeled. Everything that
//! GitHub may omit or null out is optional or defaulted so that a sparse
//! payload still decodes.

use std::fmt;

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Result, ServiceError};

/// `owner/name` repository coordinates
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RepoRef {
    pub owner: String,
    pub name: String,
}

impl RepoRef {
    pub fn new(owner: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            name: name.into(),
        }
    }

    /// Parse an `owner/name` slug. Exactly two non-empty segments are
    /// accepted.
    pub fn parse(slug: &str) -> Result<Self> {
        let mut parts = slug.split('/');
        match (parts.next(), parts.next(), parts.next()) {
            (Some(owner), Some(name), None)
                if !owner.trim().is_empty() && !name.trim().is_empty() =>
            {
                Ok(Self::new(owner.trim(), name.trim()))
            }
            _ => Err(ServiceError::validation(format!(
                "invalid repository identifier '{}', expected owner/name",
                slug
            ))),
        }
    }
}

impl fmt::Display for RepoRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.name)
    }
}

/// Account attached to a pull request, issue or comment
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    #[serde(default)]
    pub login: String,
    #[serde(rename = "type", default)]
    pub kind: String,
}

impl User {
    /// Bots are reported with account type `Bot`; app accounts also carry the
    /// `[bot]` login suffix
    pub fn is_bot(&self) -> bool {
        self.kind.eq_ignore_ascii_case("bot") || self.login.ends_with("[bot]")
    }
}

/// Head or base reference of a pull request
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GitRef {
    #[serde(rename = "ref", default)]
    pub name: String,
    #[serde(default)]
    pub sha: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PullRequest {
    pub number: u64,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub body: Option<String>,
    #[serde(default)]
    pub state: String,
    #[serde(default)]
    pub user: Option<User>,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub closed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub merged_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub merge_commit_sha: Option<String>,
    #[serde(default)]
    pub html_url: Option<String>,
    #[serde(default)]
    pub head: GitRef,
    #[serde(default)]
    pub base: GitRef,
    /// Only present on the single pull request endpoint
    #[serde(default)]
    pub additions: Option<u64>,
    #[serde(default)]
    pub deletions: Option<u64>,
}

impl PullRequest {
    pub fn body_text(&self) -> &str {
        self.body.as_deref().unwrap_or_default()
    }

    pub fn is_merged(&self) -> bool {
        self.merged_at.is_some()
    }

    pub fn authored_by_bot(&self) -> bool {
        self.user.as_ref().map(User::is_bot).unwrap_or(false)
    }
}

/// Issue-style or review-style comment
#[derive(Debug, Clone, Deserialize)]
pub struct Comment {
    #[serde(default)]
    pub user: Option<User>,
    #[serde(default)]
    pub body: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CommitInfo {
    #[serde(default)]
    pub message: String,
}

/// Entry of a commit listing
#[derive(Debug, Clone, Deserialize)]
pub struct CommitSummary {
    pub sha: String,
    #[serde(default)]
    pub commit: CommitInfo,
}

/// File touched by a commit or pull request
#[derive(Debug, Clone, Deserialize)]
pub struct ChangedFile {
    pub filename: String,
    #[serde(default)]
    pub patch: Option<String>,
}

/// Single commit with its file list
#[derive(Debug, Clone, Deserialize)]
pub struct CommitDetail {
    pub sha: String,
    #[serde(default)]
    pub commit: CommitInfo,
    #[serde(default)]
    pub files: Vec<ChangedFile>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Label {
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Issue {
    pub number: u64,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub body: Option<String>,
    #[serde(default)]
    pub state: String,
    #[serde(default)]
    pub html_url: Option<String>,
    #[serde(default)]
    pub user: Option<User>,
    #[serde(default)]
    pub labels: Vec<Label>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub closed_at: Option<DateTime<Utc>>,
    /// Set when the entry is a pull request surfaced through the issues API
    #[serde(default)]
    pub pull_request: Option<serde_json::Value>,
}

impl Issue {
    pub fn is_pull_request(&self) -> bool {
        self.pull_request.is_some()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct RunPullRequest {
    pub number: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WorkflowRun {
    pub id: u64,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub html_url: Option<String>,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub head_branch: Option<String>,
    #[serde(default)]
    pub head_sha: Option<String>,
    #[serde(default)]
    pub pull_requests: Vec<RunPullRequest>,
}

impl WorkflowRun {
    /// Head commit, if GitHub reported a non-empty one
    pub fn head_commit(&self) -> Option<&str> {
        self.head_sha.as_deref().filter(|sha| !sha.is_empty())
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct WorkflowRunList {
    #[serde(default)]
    pub total_count: u64,
    #[serde(default)]
    pub workflow_runs: Vec<WorkflowRun>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WorkflowJob {
    pub id: u64,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub conclusion: Option<String>,
}

impl WorkflowJob {
    pub fn failed(&self) -> bool {
        self.conclusion.as_deref() == Some("failure")
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct WorkflowJobList {
    #[serde(default)]
    pub jobs: Vec<WorkflowJob>,
}

/// Entry returned by the contents API, either a directory listing element or
/// a single file with its encoded content
#[derive(Debug, Clone, Deserialize)]
pub struct ContentItem {
    pub name: String,
    pub path: String,
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub size: u64,
    #[serde(default)]
    pub html_url: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub encoding: Option<String>,
}

impl ContentItem {
    pub fn is_file(&self) -> bool {
        self.kind == "file"
    }

    /// Decode the file content. GitHub wraps base64 payloads at 60 columns,
    /// so whitespace is stripped before decoding.
    pub fn decoded_content(&self) -> Result<String> {
        let raw = self.content.as_deref().unwrap_or_default();
        match self.encoding.as_deref() {
            Some("base64") => {
                let compact: String = raw.chars().filter(|c| !c.is_whitespace()).collect();
                let bytes = STANDARD
                    .decode(compact)
                    .map_err(|e| ServiceError::parsing(format!("invalid base64 content for {}: {}", self.path, e)))?;
                Ok(String::from_utf8_lossy(&bytes).into_owned())
            }
            _ => Ok(raw.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_repo_ref_parse() {
        let repo = RepoRef::parse("octo/widgets").unwrap();
        assert_eq!(repo.owner, "octo");
        assert_eq!(repo.name, "widgets");
        assert_eq!(repo.to_string(), "octo/widgets");

        assert!(RepoRef::parse("octo").is_err());
        assert!(RepoRef::parse("octo/widgets/extra").is_err());
        assert!(RepoRef::parse("/widgets").is_err());
    }

    #[test]
    fn test_bot_detection() {
        let app = User { login: "dependabot[bot]".into(), kind: "Bot".into() };
        let person = User { login: "alice".into(), kind: "User".into() };
        assert!(app.is_bot());
        assert!(!person.is_bot());
    }

    #[test]
    fn test_null_urls_and_shas_decode() {
        let run: WorkflowRun = serde_json::from_value(serde_json::json!({
            "id": 9,
            "html_url": null,
            "created_at": "2024-05-01T10:00:00Z",
            "head_sha": null
        }))
        .unwrap();
        assert!(run.html_url.is_none());
        assert!(run.head_commit().is_none());

        let issue: Issue = serde_json::from_value(serde_json::json!({
            "number": 4,
            "title": "Crash",
            "html_url": null,
            "pull_request": null
        }))
        .unwrap();
        assert!(issue.html_url.is_none());
        assert!(!issue.is_pull_request());

        let pr: PullRequest = serde_json::from_value(serde_json::json!({
            "number": 5,
            "created_at": "2024-05-01T10:00:00Z",
            "html_url": null
        }))
        .unwrap();
        assert!(pr.html_url.is_none());
    }

    #[test]
    fn test_decoded_content_handles_wrapped_base64() {
        let item = ContentItem {
            name: "README.md".into(),
            path: "README.md".into(),
            kind: "file".into(),
            size: 11,
            html_url: None,
            content: Some("aGVsbG8g\nd29ybGQ=\n".into()),
            encoding: Some("base64".into()),
        };
        assert_eq!(item.decoded_content().unwrap(), "hello world");
    }
}
