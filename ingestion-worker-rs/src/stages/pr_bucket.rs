//! Change-request bucketer
//!
//! Fetches one page of closed pull requests and sorts each into the reverted
//! bucket, the rejected bucket or neither. Every remote call error aborts the
//! whole bucketing run.

use chrono::{DateTime, Utc};
use github_sdk::models::{Comment, PullRequest};
use github_sdk::{GitHubClient, RepoRef, Result};
use tracing::{debug, info};

use super::lookback_cutoff;
use crate::classify::revert::title_prefix;
use crate::classify::{classify_rejection, classify_revert, mentions_revert, RejectionEvidence, RevertEvidence};
use crate::model::{Authorship, ChangeRequestRecord, Classification, CommentRecord, RevertSignal};

pub const PULLS_PER_PAGE: u32 = 50;
pub const COMMITS_PER_PAGE: u32 = 30;
pub const COMMENTS_PER_PAGE: u32 = 30;

#[derive(Debug, Default)]
pub struct ChangeRequestBuckets {
    pub reverted: Vec<ChangeRequestRecord>,
    pub rejected: Vec<ChangeRequestRecord>,
}

/// Where a closed request ends up. A request gets exactly one placement.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Placement {
    Reverted(RevertSignal),
    Rejected,
    Stale,
    MergedUninteresting,
}

/// Placement from the revert signal, merge state and closure time
pub fn place(
    signal: Option<RevertSignal>,
    merged: bool,
    closed_at: Option<DateTime<Utc>>,
    cutoff: DateTime<Utc>,
) -> Placement {
    match signal {
        Some(signal) => Placement::Reverted(signal),
        None if closed_at.map(|c| c < cutoff).unwrap_or(true) => Placement::Stale,
        None if merged => Placement::MergedUninteresting,
        None => Placement::Rejected,
    }
}

pub struct Bucketer<'a> {
    client: &'a GitHubClient,
    repo: &'a RepoRef,
}

impl<'a> Bucketer<'a> {
    pub fn new(client: &'a GitHubClient, repo: &'a RepoRef) -> Self {
        Self { client, repo }
    }

    pub async fn run(&self, now: DateTime<Utc>) -> Result<ChangeRequestBuckets> {
        let cutoff = lookback_cutoff(now);
        info!("fetching closed pull requests for {}", self.repo);

        let pulls = self.client.list_closed_pulls(self.repo, PULLS_PER_PAGE, 1).await?;
        let mut buckets = ChangeRequestBuckets::default();

        for pr in pulls {
            let signal = self.detect_revert(&pr).await?;

            match place(signal, pr.is_merged(), pr.closed_at, cutoff) {
                Placement::Reverted(signal) => {
                    let diff = if pr.is_merged() {
                        Some(self.client.get_pull_diff(self.repo, pr.number).await?)
                    } else {
                        None
                    };
                    let comments = self.collect_comments(pr.number).await?;
                    let mut record = to_record(&pr, Classification::Reverted(signal), comments);
                    record.diff = diff;
                    buckets.reverted.push(record);
                }
                Placement::Rejected => {
                    let evidence = RejectionEvidence::new(pr.authored_by_bot(), &pr.title, pr.body_text());
                    let comments = self.collect_comments(pr.number).await?;
                    let classification = Classification::Rejected(classify_rejection(&evidence));
                    buckets.rejected.push(to_record(&pr, classification, comments));
                }
                Placement::Stale => debug!("#{} closed before cutoff, dropped", pr.number),
                Placement::MergedUninteresting => debug!("#{} merged without revert signal", pr.number),
            }
        }

        info!(
            "bucketing completed for {} | reverted={} rejected={}",
            self.repo,
            buckets.reverted.len(),
            buckets.rejected.len()
        );

        Ok(buckets)
    }

    /// Run the revert rules, fetching commits and line stats only when the
    /// cheaper rules could still be overridden or need them
    async fn detect_revert(&self, pr: &PullRequest) -> Result<Option<RevertSignal>> {
        let mut evidence = RevertEvidence::new(&pr.title, &pr.head.name, pr.body_text());

        if title_prefix(&evidence).is_some() {
            return Ok(classify_revert(&evidence));
        }

        let commits = self
            .client
            .list_pull_commits(self.repo, pr.number, COMMITS_PER_PAGE)
            .await?;
        evidence = evidence.with_commit_messages(commits.iter().map(|c| c.commit.message.as_str()));

        let signal = classify_revert(&evidence);
        if signal.is_some() || !mentions_revert(pr.body_text()) {
            return Ok(signal);
        }

        let detail = match (pr.additions, pr.deletions) {
            (Some(additions), Some(deletions)) => (additions, deletions),
            _ => {
                let full = self.client.get_pull(self.repo, pr.number).await?;
                (full.additions.unwrap_or(0), full.deletions.unwrap_or(0))
            }
        };
        evidence = evidence.with_line_stats(detail.0, detail.1);

        Ok(classify_revert(&evidence))
    }

    async fn collect_comments(&self, number: u64) -> Result<Vec<CommentRecord>> {
        let issue_comments = self
            .client
            .list_issue_comments(self.repo, number, COMMENTS_PER_PAGE)
            .await?;
        let review_comments = self
            .client
            .list_review_comments(self.repo, number, COMMENTS_PER_PAGE)
            .await?;

        Ok(issue_comments
            .into_iter()
            .chain(review_comments)
            .map(to_comment_record)
            .collect())
    }
}

fn to_comment_record(comment: Comment) -> CommentRecord {
    let user = comment.user.unwrap_or_default();
    let is_bot = user.is_bot();
    CommentRecord {
        author: user.login,
        author_type: Authorship::from_bot_flag(is_bot),
        is_bot,
        body: comment.body.unwrap_or_default(),
        created_at: comment.created_at,
    }
}

fn to_record(pr: &PullRequest, classification: Classification, comments: Vec<CommentRecord>) -> ChangeRequestRecord {
    ChangeRequestRecord {
        number: pr.number,
        title: pr.title.clone(),
        body: pr.body_text().to_string(),
        created_at: pr.created_at,
        merged_at: pr.merged_at,
        merge_commit_sha: pr.merge_commit_sha.clone().filter(|s| !s.is_empty()),
        html_url: pr.html_url.clone().unwrap_or_default(),
        diff: None,
        comments,
        head_branch: pr.head.name.clone(),
        base_branch: pr.base.name.clone(),
        classification,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::RevertKind;
    use chrono::Duration;

    fn revert() -> Option<RevertSignal> {
        Some(RevertSignal {
            revert_kind: RevertKind::Heuristic,
            revert_confidence: 0.8,
        })
    }

    #[test]
    fn test_placement_is_exclusive() {
        let now = Utc::now();
        let cutoff = lookback_cutoff(now);
        let recent = Some(now - Duration::days(2));
        let stale = Some(now - Duration::days(200));

        assert!(matches!(place(revert(), true, recent, cutoff), Placement::Reverted(_)));
        assert!(matches!(place(revert(), false, stale, cutoff), Placement::Reverted(_)));
        assert_eq!(place(None, false, recent, cutoff), Placement::Rejected);
        assert_eq!(place(None, true, recent, cutoff), Placement::MergedUninteresting);
    }

    #[test]
    fn test_stale_without_signal_is_dropped() {
        let now = Utc::now();
        let cutoff = lookback_cutoff(now);

        assert_eq!(place(None, false, Some(now - Duration::days(120)), cutoff), Placement::Stale);
        assert_eq!(place(None, true, Some(now - Duration::days(120)), cutoff), Placement::Stale);
        assert_eq!(place(None, false, None, cutoff), Placement::Stale);
    }
}
