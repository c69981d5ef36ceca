//! Issue endpoints

use crate::core::GitHubClient;
use crate::error::Result;
use crate::models::RepoRef;

impl GitHubClient {
    /// List closed issues as raw JSON values.
    ///
    /// Entries are decoded individually by the caller so that one malformed
    /// issue does not fail the whole page.
    pub async fn list_closed_issues_raw(&self, repo: &RepoRef, per_page: u32) -> Result<Vec<serde_json::Value>> {
        let path = format!("repos/{}/{}/issues", repo.owner, repo.name);
        self.get_json(
            &path,
            &[("state", "closed".to_string()), ("per_page", per_page.to_string())],
        )
        .await
    }
}
