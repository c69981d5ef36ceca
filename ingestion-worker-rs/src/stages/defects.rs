//! Defect extractor
//!
//! Turns closed issues into defect records with keywords, a change-type hint
//! and a recency bucket. Entries that fail to decode are skipped one by one.

use chrono::{DateTime, Duration, Utc};
use github_sdk::models::Issue;
use github_sdk::{GitHubClient, RepoRef, Result};
use tracing::{info, warn};

use crate::error::PipelineError;
use crate::model::{ChangeHint, DefectRecord, TimeBucket};

pub const ISSUES_PER_PAGE: u32 = 100;
pub const MAX_KEYWORDS: usize = 8;
const MIN_KEYWORD_LEN: usize = 3;

const STOP_WORDS: [&str; 11] = ["the", "and", "or", "to", "a", "of", "in", "on", "for", "with", "is"];

const HINT_RULES: [(ChangeHint, &[&str]); 4] = [
    (ChangeHint::Bugfix, &["fix", "bug", "error", "crash"]),
    (ChangeHint::Feature, &["feat", "feature", "add"]),
    (ChangeHint::Refactor, &["refactor", "cleanup", "restructure"]),
    (ChangeHint::Test, &["test", "jest", "ci"]),
];

/// Lowercase alphabetic words of at least three letters, stop words removed,
/// first occurrence order kept, at most eight
pub fn extract_keywords(title: &str, body: &str) -> Vec<String> {
    let text = format!("{} {}", title, body).to_lowercase();
    let mut keywords: Vec<String> = Vec::with_capacity(MAX_KEYWORDS);

    for word in text.split(|c: char| !c.is_ascii_lowercase()) {
        if keywords.len() == MAX_KEYWORDS {
            break;
        }
        if word.len() < MIN_KEYWORD_LEN || STOP_WORDS.contains(&word) {
            continue;
        }
        if !keywords.iter().any(|k| k == word) {
            keywords.push(word.to_string());
        }
    }

    keywords
}

pub fn change_hint(title: &str, body: &str) -> ChangeHint {
    let text = format!("{} {}", title, body).to_lowercase();
    HINT_RULES
        .iter()
        .find(|(_, needles)| needles.iter().any(|n| text.contains(n)))
        .map(|(hint, _)| *hint)
        .unwrap_or(ChangeHint::Other)
}

pub fn time_bucket(closed_at: Option<DateTime<Utc>>, now: DateTime<Utc>) -> TimeBucket {
    let Some(closed_at) = closed_at else {
        return TimeBucket::Unknown;
    };

    let age = now - closed_at;
    if age <= Duration::days(7) {
        TimeBucket::Last7d
    } else if age <= Duration::days(30) {
        TimeBucket::Last30d
    } else {
        TimeBucket::Older
    }
}

fn to_defect(issue: Issue, now: DateTime<Utc>) -> DefectRecord {
    let body = issue.body.unwrap_or_default();
    DefectRecord {
        keywords: extract_keywords(&issue.title, &body),
        change_hint: change_hint(&issue.title, &body),
        time_bucket: time_bucket(issue.closed_at, now),
        number: issue.number,
        title: issue.title,
        body,
        state: issue.state,
        html_url: issue.html_url.unwrap_or_default(),
        author: issue.user.map(|u| u.login).filter(|l| !l.is_empty()),
        labels: issue.labels.into_iter().map(|l| l.name).collect(),
        created_at: issue.created_at,
        updated_at: issue.updated_at,
        closed_at: issue.closed_at,
        issue_type: "issue".to_string(),
    }
}

/// Decode a raw issues page. Pull requests surfaced through the issues API
/// and undecodable entries are skipped.
pub fn defects_from_page(page: Vec<serde_json::Value>, now: DateTime<Utc>) -> Vec<DefectRecord> {
    let mut out = Vec::with_capacity(page.len());

    for (index, raw) in page.into_iter().enumerate() {
        match serde_json::from_value::<Issue>(raw) {
            Ok(issue) if issue.is_pull_request() => continue,
            Ok(issue) => out.push(to_defect(issue, now)),
            Err(e) => warn!(
                "{}",
                PipelineError::degraded("defects", format!("entry {} skipped: {}", index, e))
            ),
        }
    }

    out
}

pub async fn extract_defects(client: &GitHubClient, repo: &RepoRef, now: DateTime<Utc>) -> Result<Vec<DefectRecord>> {
    let page = client.list_closed_issues_raw(repo, ISSUES_PER_PAGE).await?;
    let defects = defects_from_page(page, now);
    info!("defect extraction completed for {} | issues={}", repo, defects.len());
    Ok(defects)
}
