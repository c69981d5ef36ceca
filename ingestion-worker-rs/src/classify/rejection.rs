use crate::model::{Authorship, Rejection, RejectionReason};

/// Inputs for rejection classification of a closed, unmerged request
#[derive(Debug, Clone)]
pub struct RejectionEvidence {
    pub authored_by_bot: bool,
    text: String,
}

impl RejectionEvidence {
    pub fn new(authored_by_bot: bool, title: &str, body: &str) -> Self {
        Self {
            authored_by_bot,
            text: format!("{}\n{}", title, body).to_lowercase(),
        }
    }
}

type RejectionRule = fn(&RejectionEvidence) -> Option<RejectionReason>;

pub const REJECTION_RULES: [(&str, RejectionRule); 3] = [
    ("bot_author", bot_author),
    ("rate_limit_mention", rate_limit_mention),
    ("skip_review_mention", skip_review_mention),
];

/// Total: falls through to `manual`
pub fn classify_rejection(evidence: &RejectionEvidence) -> Rejection {
    let reason = REJECTION_RULES
        .iter()
        .find_map(|(_, rule)| rule(evidence))
        .unwrap_or(RejectionReason::Manual);

    Rejection {
        rejection_reason: reason,
        authorship: Authorship::from_bot_flag(evidence.authored_by_bot),
    }
}

fn bot_author(evidence: &RejectionEvidence) -> Option<RejectionReason> {
    evidence.authored_by_bot.then_some(RejectionReason::BotGenerated)
}

fn rate_limit_mention(evidence: &RejectionEvidence) -> Option<RejectionReason> {
    evidence.text.contains("rate limit").then_some(RejectionReason::RateLimited)
}

fn skip_review_mention(evidence: &RejectionEvidence) -> Option<RejectionReason> {
    evidence.text.contains("skip review").then_some(RejectionReason::ReviewSkipped)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bot_author_takes_precedence() {
        let rejection = classify_rejection(&RejectionEvidence::new(true, "Bump deps", "rate limit hit"));
        assert_eq!(rejection.rejection_reason, RejectionReason::BotGenerated);
        assert_eq!(rejection.authorship, Authorship::Bot);
    }

    #[test]
    fn test_text_rules_in_order() {
        let rate = classify_rejection(&RejectionEvidence::new(false, "Closing", "Hit the Rate Limit; skip review"));
        assert_eq!(rate.rejection_reason, RejectionReason::RateLimited);
        assert_eq!(rate.authorship, Authorship::Human);

        let skip = classify_rejection(&RejectionEvidence::new(false, "Skip review for hotfix", ""));
        assert_eq!(skip.rejection_reason, RejectionReason::ReviewSkipped);
    }

    #[test]
    fn test_falls_through_to_manual() {
        let rejection = classify_rejection(&RejectionEvidence::new(false, "Superseded", "see #12"));
        assert_eq!(rejection.rejection_reason, RejectionReason::Manual);
    }
}
