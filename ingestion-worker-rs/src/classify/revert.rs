use crate::model::{RevertKind, RevertSignal};

const REVERT_WORDS: [&str; 3] = ["revert", "rollback", "undo"];

/// Share of deleted lines above which a change counts as subtractive
const DELETION_RATIO_THRESHOLD: f64 = 0.7;

/// Points needed for a contextual revert
const CONTEXTUAL_THRESHOLD: u8 = 2;

/// Everything revert detection looks at. Commit messages and line stats
/// are filled in lazily by the caller; absent data never scores.
#[derive(Debug, Clone, Default)]
pub struct RevertEvidence {
    pub title: String,
    pub head_branch: String,
    pub body: String,
    pub commit_messages: Vec<String>,
    pub additions: Option<u64>,
    pub deletions: Option<u64>,
}

impl RevertEvidence {
    pub fn new(title: &str, head_branch: &str, body: &str) -> Self {
        Self {
            title: title.to_lowercase(),
            head_branch: head_branch.to_lowercase(),
            body: body.to_lowercase(),
            ..Default::default()
        }
    }

    pub fn with_commit_messages<I, S>(mut self, messages: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.commit_messages = messages.into_iter().map(|m| m.as_ref().to_lowercase()).collect();
        self
    }

    pub fn with_line_stats(mut self, additions: u64, deletions: u64) -> Self {
        self.additions = Some(additions);
        self.deletions = Some(deletions);
        self
    }

    fn deletion_ratio(&self) -> Option<f64> {
        let (additions, deletions) = (self.additions?, self.deletions?);
        let total = additions + deletions;
        if total == 0 {
            return None;
        }
        Some(deletions as f64 / total as f64)
    }
}

/// Whether free text mentions any revert word
pub fn mentions_revert(text: &str) -> bool {
    let text = text.to_lowercase();
    REVERT_WORDS.iter().any(|w| text.contains(w))
}

type RevertRule = fn(&RevertEvidence) -> Option<RevertSignal>;

/// Detection rules in descending confidence
pub const REVERT_RULES: [(&str, RevertRule); 4] = [
    ("title_prefix", title_prefix),
    ("commit_prefix", commit_prefix),
    ("title_or_branch_keyword", title_or_branch_keyword),
    ("contextual_score", contextual_score),
];

pub fn classify_revert(evidence: &RevertEvidence) -> Option<RevertSignal> {
    REVERT_RULES.iter().find_map(|(_, rule)| rule(evidence))
}

fn signal(kind: RevertKind, confidence: f32) -> RevertSignal {
    RevertSignal {
        revert_kind: kind,
        revert_confidence: confidence,
    }
}

pub fn title_prefix(evidence: &RevertEvidence) -> Option<RevertSignal> {
    evidence
        .title
        .starts_with("revert")
        .then(|| signal(RevertKind::ExplicitTitle, 1.0))
}

pub fn commit_prefix(evidence: &RevertEvidence) -> Option<RevertSignal> {
    evidence
        .commit_messages
        .iter()
        .any(|m| m.starts_with("revert \""))
        .then(|| signal(RevertKind::ExplicitCommit, 1.0))
}

pub fn title_or_branch_keyword(evidence: &RevertEvidence) -> Option<RevertSignal> {
    REVERT_WORDS
        .iter()
        .any(|w| evidence.title.contains(w) || evidence.head_branch.contains(w))
        .then(|| signal(RevertKind::Heuristic, 0.8))
}

pub fn contextual_score(evidence: &RevertEvidence) -> Option<RevertSignal> {
    let mut score = 0u8;
    if REVERT_WORDS.iter().any(|w| evidence.body.contains(w)) {
        score += 1;
    }
    if evidence
        .deletion_ratio()
        .map(|r| r > DELETION_RATIO_THRESHOLD)
        .unwrap_or(false)
    {
        score += 1;
    }

    (score >= CONTEXTUAL_THRESHOLD).then(|| signal(RevertKind::Contextual, 0.6))
}
