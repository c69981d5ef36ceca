//! GitHub Actions endpoints

use crate::core::GitHubClient;
use crate::error::Result;
use crate::models::{RepoRef, WorkflowJobList, WorkflowRunList};

impl GitHubClient {
    /// List failed workflow runs, newest first
    pub async fn list_failed_runs(&self, repo: &RepoRef, per_page: u32) -> Result<WorkflowRunList> {
        let path = format!("repos/{}/{}/actions/runs", repo.owner, repo.name);
        self.get_json(
            &path,
            &[("status", "failure".to_string()), ("per_page", per_page.to_string())],
        )
        .await
    }

    /// Jobs of the latest attempt of a run
    pub async fn list_run_jobs(&self, repo: &RepoRef, run_id: u64) -> Result<WorkflowJobList> {
        let path = format!("repos/{}/{}/actions/runs/{}/jobs", repo.owner, repo.name, run_id);
        self.get_json(&path, &[("filter", "latest".to_string())]).await
    }

    /// Download the log of a job. GitHub answers with a redirect to a plain
    /// text or zip archive.
    pub async fn download_job_logs(&self, repo: &RepoRef, job_id: u64) -> Result<Vec<u8>> {
        let path = format!("repos/{}/{}/actions/jobs/{}/logs", repo.owner, repo.name, job_id);
        self.get_bytes(&path).await
    }
}
