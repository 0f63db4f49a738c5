use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

/// Classification extracted from a decision model response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QualificationDecision {
    Approved,
    Rejected,
    Indeterminate,
}

impl QualificationDecision {
    pub const fn label(self) -> &'static str {
        match self {
            QualificationDecision::Approved => "Approved",
            QualificationDecision::Rejected => "Rejected",
            QualificationDecision::Indeterminate => "Indeterminate",
        }
    }

    pub const fn is_approved(self) -> Option<bool> {
        match self {
            QualificationDecision::Approved => Some(true),
            QualificationDecision::Rejected => Some(false),
            QualificationDecision::Indeterminate => None,
        }
    }
}

fn decision_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"\*\*(Approved|Rejected)\*\*").expect("decision pattern compiles")
    })
}

/// Locate the first bold `Approved`/`Rejected` token in a model response.
pub fn parse_decision(response: &str) -> QualificationDecision {
    let Some(captures) = decision_pattern().captures(response) else {
        return QualificationDecision::Indeterminate;
    };

    match captures.get(1).map(|token| token.as_str()) {
        Some("Approved") => QualificationDecision::Approved,
        Some("Rejected") => QualificationDecision::Rejected,
        _ => QualificationDecision::Indeterminate,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finds_bold_decision_token() {
        let response = "### Final Decision:\n- **Approved** 👍\n- Tracking ID: abc12345";
        assert_eq!(parse_decision(response), QualificationDecision::Approved);

        let response = "- >**Rejected** 👎 the score is below 0.1";
        assert_eq!(parse_decision(response), QualificationDecision::Rejected);
    }

    #[test]
    fn first_token_wins() {
        let response = "**Rejected** ... previously this would have been **Approved**";
        assert_eq!(parse_decision(response), QualificationDecision::Rejected);
    }

    #[test]
    fn plain_words_are_indeterminate() {
        let response = "The request is Approved pending review. It was not Rejected.";
        assert_eq!(parse_decision(response), QualificationDecision::Indeterminate);
        assert_eq!(
            parse_decision("**approved**"),
            QualificationDecision::Indeterminate
        );
        assert_eq!(parse_decision(""), QualificationDecision::Indeterminate);
    }
}
