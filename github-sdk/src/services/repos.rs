//! Repository endpoints: commits and contents

use crate::core::GitHubClient;
use crate::error::{Result, ServiceError};
use crate::models::{CommitDetail, ContentItem, PullRequest, RepoRef};

impl GitHubClient {
    /// Fetch a commit with its changed files
    pub async fn get_commit(&self, repo: &RepoRef, sha: &str) -> Result<CommitDetail> {
        let path = format!("repos/{}/{}/commits/{}", repo.owner, repo.name, sha);
        self.get_json(&path, &[]).await
    }

    /// Pull requests that contain the given commit
    pub async fn list_pulls_for_commit(&self, repo: &RepoRef, sha: &str) -> Result<Vec<PullRequest>> {
        let path = format!("repos/{}/{}/commits/{}/pulls", repo.owner, repo.name, sha);
        self.get_json(&path, &[]).await
    }

    /// List a directory. An empty path lists the repository root.
    pub async fn list_directory(&self, repo: &RepoRef, dir: &str) -> Result<Vec<ContentItem>> {
        let path = contents_path(repo, dir);
        self.get_json(&path, &[]).await
    }

    /// Fetch a single file with its encoded content
    pub async fn get_file(&self, repo: &RepoRef, file: &str) -> Result<ContentItem> {
        if file.trim_matches('/').is_empty() {
            return Err(ServiceError::validation("file path must not be empty"));
        }
        let path = contents_path(repo, file);
        self.get_json(&path, &[]).await
    }
}

fn contents_path(repo: &RepoRef, path: &str) -> String {
    let path = path.trim_matches('/');
    if path.is_empty() {
        format!("repos/{}/{}/contents", repo.owner, repo.name)
    } else {
        format!("repos/{}/{}/contents/{}", repo.owner, repo.name, path)
    }
}
