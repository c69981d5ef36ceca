//! Pull request endpoints

use crate::core::{GitHubClient, DIFF_MEDIA_TYPE};
use crate::error::Result;
use crate::models::{ChangedFile, Comment, CommitSummary, PullRequest, RepoRef};

/// GitHub stops listing pull request files after 3000 entries
const MAX_FILE_PAGES: u32 = 30;
const FILES_PER_PAGE: u32 = 100;

impl GitHubClient {
    /// List closed pull requests, most recently updated first
    pub async fn list_closed_pulls(&self, repo: &RepoRef, per_page: u32, page: u32) -> Result<Vec<PullRequest>> {
        let path = format!("repos/{}/{}/pulls", repo.owner, repo.name);
        self.get_json(
            &path,
            &[
                ("state", "closed".to_string()),
                ("sort", "updated".to_string()),
                ("direction", "desc".to_string()),
                ("per_page", per_page.to_string()),
                ("page", page.to_string()),
            ],
        )
        .await
    }

    /// Fetch a single pull request, including its line statistics
    pub async fn get_pull(&self, repo: &RepoRef, number: u64) -> Result<PullRequest> {
        let path = format!("repos/{}/{}/pulls/{}", repo.owner, repo.name, number);
        self.get_json(&path, &[]).await
    }

    /// Fetch the unified diff of a pull request
    pub async fn get_pull_diff(&self, repo: &RepoRef, number: u64) -> Result<String> {
        let path = format!("repos/{}/{}/pulls/{}", repo.owner, repo.name, number);
        self.get_text(&path, DIFF_MEDIA_TYPE).await
    }

    pub async fn list_pull_commits(&self, repo: &RepoRef, number: u64, per_page: u32) -> Result<Vec<CommitSummary>> {
        let path = format!("repos/{}/{}/pulls/{}/commits", repo.owner, repo.name, number);
        self.get_json(&path, &[("per_page", per_page.to_string())]).await
    }

    /// Conversation comments of a pull request (served by the issues API)
    pub async fn list_issue_comments(&self, repo: &RepoRef, number: u64, per_page: u32) -> Result<Vec<Comment>> {
        let path = format!("repos/{}/{}/issues/{}/comments", repo.owner, repo.name, number);
        self.get_json(&path, &[("per_page", per_page.to_string())]).await
    }

    /// Inline review comments of a pull request
    pub async fn list_review_comments(&self, repo: &RepoRef, number: u64, per_page: u32) -> Result<Vec<Comment>> {
        let path = format!("repos/{}/{}/pulls/{}/comments", repo.owner, repo.name, number);
        self.get_json(&path, &[("per_page", per_page.to_string())]).await
    }

    /// All files changed by a pull request, following pagination until a
    /// short page is returned
    pub async fn list_pull_files(&self, repo: &RepoRef, number: u64) -> Result<Vec<ChangedFile>> {
        let path = format!("repos/{}/{}/pulls/{}/files", repo.owner, repo.name, number);
        let mut files = Vec::new();

        for page in 1..=MAX_FILE_PAGES {
            let batch: Vec<ChangedFile> = self
                .get_json(
                    &path,
                    &[("per_page", FILES_PER_PAGE.to_string()), ("page", page.to_string())],
                )
                .await?;
            let short = batch.len() < FILES_PER_PAGE as usize;
            files.extend(batch);
            if short {
                break;
            }
        }

        Ok(files)
    }
}
