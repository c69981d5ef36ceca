// ingestion-worker-rs/src/stages/build_failures.rs
//
// Build-failure extractor
// For each recent failed CI run:
// - picks the first failed job and downloads its log (zip aware)
// - keeps the ANSI-stripped tail as the error signature
// - resolves the head commit and the pull request that carried it
// - captures the code in flight, PR files first, commit files second
// A run that cannot be resolved is skipped, never fatal.

use std::io::{Cursor, Read};

use chrono::{DateTime, Utc};
use github_sdk::models::{ChangedFile, CommitDetail, PullRequest, WorkflowRun};
use github_sdk::{GitHubClient, RepoRef, Result};
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{debug, info, warn};

use super::lookback_cutoff;
use crate::error::PipelineError;
use crate::model::{BuildFailureRecord, ChangeContext, ChangeSource, CodeChange, LinkedChangeRequest};

pub const RUNS_PER_PAGE: u32 = 40;
pub const MAX_FAILURES: usize = 20;
pub const LOG_TAIL_LINES: usize = 50;
const ARCHIVE_ENTRY_SEPARATOR: &str = "\n---\n";

static ANSI_ESCAPE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\x1b\[[0-9;]*[a-zA-Z]").unwrap());

pub fn strip_ansi(text: &str) -> String {
    ANSI_ESCAPE.replace_all(text, "").into_owned()
}

/// Last `n` lines of the trimmed text
pub fn tail_lines(text: &str, n: usize) -> String {
    let lines: Vec<&str> = text.trim().lines().collect();
    let start = lines.len().saturating_sub(n);
    lines[start..].join("\n")
}

/// Text of a downloaded job log. Archives contribute the tail of every entry;
/// anything that is not a zip archive is read as raw text.
pub fn extract_log_text(payload: &[u8]) -> String {
    let mut archive = match zip::ZipArchive::new(Cursor::new(payload)) {
        Ok(archive) => archive,
        Err(_) => return tail_lines(&String::from_utf8_lossy(payload), LOG_TAIL_LINES),
    };

    let mut tails = Vec::with_capacity(archive.len());
    for index in 0..archive.len() {
        let mut entry = match archive.by_index(index) {
            Ok(entry) => entry,
            Err(e) => {
                debug!("unreadable log archive entry {}: {}", index, e);
                continue;
            }
        };
        if entry.is_dir() {
            continue;
        }

        let mut raw = Vec::new();
        if let Err(e) = entry.read_to_end(&mut raw) {
            debug!("failed to inflate log entry {}: {}", entry.name(), e);
            continue;
        }
        tails.push(tail_lines(&String::from_utf8_lossy(&raw), LOG_TAIL_LINES));
    }

    tails.join(ARCHIVE_ENTRY_SEPARATOR)
}

fn patched(files: Vec<ChangedFile>) -> Vec<CodeChange> {
    files
        .into_iter()
        .filter_map(|f| match f.patch {
            Some(patch) if !patch.is_empty() => Some(CodeChange {
                filename: f.filename,
                patch,
            }),
            _ => None,
        })
        .collect()
}

/// Prefer the pull request's patches; fall back to the commit's own
pub fn choose_change(
    branch: &str,
    pr_files: Option<Vec<ChangedFile>>,
    commit: Option<&CommitDetail>,
) -> Option<ChangeContext> {
    if let Some(files) = pr_files.map(patched).filter(|f| !f.is_empty()) {
        return Some(ChangeContext {
            source: ChangeSource::Pr,
            branch: branch.to_string(),
            files,
        });
    }

    commit.map(|commit| ChangeContext {
        source: ChangeSource::Direct,
        branch: branch.to_string(),
        files: patched(commit.files.clone()),
    })
}

pub struct BuildFailureExtractor<'a> {
    client: &'a GitHubClient,
    repo: &'a RepoRef,
}

impl<'a> BuildFailureExtractor<'a> {
    pub fn new(client: &'a GitHubClient, repo: &'a RepoRef) -> Self {
        Self { client, repo }
    }

    /// Only the run listing itself can fail the stage
    pub async fn run(&self, now: DateTime<Utc>) -> Result<Vec<BuildFailureRecord>> {
        let cutoff = lookback_cutoff(now);
        info!("fetching failed workflow runs for {}", self.repo);

        let runs = self.client.list_failed_runs(self.repo, RUNS_PER_PAGE).await?;
        let mut out = Vec::new();

        for run in runs.workflow_runs {
            if out.len() >= MAX_FAILURES {
                break;
            }
            if run.created_at < cutoff {
                continue;
            }

            match self.process_run(&run).await {
                Ok(Some(record)) => out.push(record),
                Ok(None) => {}
                Err(e) => warn!(
                    "{}",
                    PipelineError::degraded("build_failures", format!("run {} skipped: {}", run.id, e))
                ),
            }
        }

        info!("build failure extraction completed for {} | failures={}", self.repo, out.len());
        Ok(out)
    }

    async fn process_run(&self, run: &WorkflowRun) -> Result<Option<BuildFailureRecord>> {
        let jobs = self.client.list_run_jobs(self.repo, run.id).await?;
        let Some(job) = jobs.jobs.into_iter().find(|j| j.failed()) else {
            debug!("run {} has no failed job", run.id);
            return Ok(None);
        };

        let payload = self.client.download_job_logs(self.repo, job.id).await?;
        let signature = strip_ansi(&extract_log_text(&payload));

        let commit = match run.head_commit() {
            Some(sha) => match self.client.get_commit(self.repo, sha).await {
                Ok(commit) => Some(commit),
                Err(e) => {
                    debug!("commit {} unavailable: {}", sha, e);
                    None
                }
            },
            None => None,
        };

        let pull_request = self.resolve_pull_request(run).await;
        let pr_files = match &pull_request {
            Some(pr) => self.client.list_pull_files(self.repo, pr.number).await.ok(),
            None => None,
        };

        let branch = run.head_branch.clone().unwrap_or_default();
        let change = choose_change(&branch, pr_files, commit.as_ref());

        Ok(Some(BuildFailureRecord {
            id: run.id,
            name: run.name.clone().unwrap_or_default(),
            job_name: job.name,
            error_signature: signature,
            html_url: run.html_url.clone().unwrap_or_default(),
            created_at: run.created_at,
            branch,
            head_sha: run.head_commit().unwrap_or_default().to_string(),
            commit_msg: commit.map(|c| c.commit.message).unwrap_or_default(),
            pull_request: pull_request.map(|pr| LinkedChangeRequest {
                number: pr.number,
                body: pr.body_text().to_string(),
                title: pr.title,
            }),
            change,
        }))
    }

    /// The run's own linkage first, then pull requests containing the head
    /// commit
    async fn resolve_pull_request(&self, run: &WorkflowRun) -> Option<PullRequest> {
        if let Some(linked) = run.pull_requests.first() {
            return self.client.get_pull(self.repo, linked.number).await.ok();
        }

        let sha = run.head_commit()?;
        match self.client.list_pulls_for_commit(self.repo, sha).await {
            Ok(pulls) => pulls.into_iter().next(),
            Err(e) => {
                debug!("no pull request lookup for {}: {}", sha, e);
                None
            }
        }
    }
}
