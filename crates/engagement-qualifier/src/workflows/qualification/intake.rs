use chrono::NaiveDate;

use super::domain::RequestSubmission;
use super::scoring::{ScoreInput, ACTUAL_ACR_MAX, PROJECTED_ACR_MAX, PROJECTED_LENGTH_MAX};

/// Validation errors raised while accepting a submission.
#[derive(Debug, thiserror::Error)]
pub enum IntakeViolation {
    #[error("missing mandatory field(s): {}", .0.join(", "))]
    MissingFields(Vec<&'static str>),
}

/// Accepted submission plus advisory notes surfaced to the requester.
#[derive(Debug, Clone, PartialEq)]
pub struct IntakeReview {
    pub score_input: ScoreInput,
    pub expected_start_date: NaiveDate,
    pub warnings: Vec<String>,
}

/// Guard checking mandatory fields and mapping form values onto score inputs.
#[derive(Debug, Clone, Default)]
pub struct IntakeGuard;

impl IntakeGuard {
    pub fn review(
        &self,
        submission: &RequestSubmission,
        today: NaiveDate,
    ) -> Result<IntakeReview, IntakeViolation> {
        let missing = missing_fields(submission);
        let expected_start_date = match submission.expected_start_date {
            Some(date) if missing.is_empty() => date,
            _ => return Err(IntakeViolation::MissingFields(missing)),
        };

        let mut warnings = Vec::new();

        if expected_start_date <= today {
            warnings.push(format!(
                "expected start date {expected_start_date} is not in the future"
            ));
        }

        let hours = f64::from(submission.projected_work_hours);
        if !(1.0..=PROJECTED_LENGTH_MAX).contains(&hours) {
            warnings.push(format!(
                "projected work hours {} should be between 1 and {PROJECTED_LENGTH_MAX}",
                submission.projected_work_hours
            ));
        }

        let projected_acr = submission.projected_acr as f64;
        if projected_acr <= 0.0 || projected_acr > PROJECTED_ACR_MAX {
            warnings.push(format!(
                "projected ACR {} should be between 0 (exclusive) and {PROJECTED_ACR_MAX} (inclusive)",
                submission.projected_acr
            ));
        }

        let monthly_usage = submission.monthly_usage as f64;
        if monthly_usage <= 0.0 || monthly_usage > ACTUAL_ACR_MAX {
            warnings.push(format!(
                "monthly usage {} should be between 0 (exclusive) and {ACTUAL_ACR_MAX} (inclusive)",
                submission.monthly_usage
            ));
        }

        let score_input = ScoreInput {
            projected_acr,
            projected_length: hours,
            partner_executives: if submission.partner { 1.0 } else { 0.0 },
            actual_acr: monthly_usage,
        };

        Ok(IntakeReview {
            score_input,
            expected_start_date,
            warnings,
        })
    }
}

fn missing_fields(submission: &RequestSubmission) -> Vec<&'static str> {
    let checks: [(&'static str, bool); 13] = [
        ("Request Name", is_blank(&submission.request_title)),
        ("Requester", is_blank(&submission.requester)),
        ("Projected Work Hours", submission.projected_work_hours == 0),
        (
            "Expected Start Date",
            submission.expected_start_date.is_none(),
        ),
        ("MSXID", is_blank(&submission.msx_id)),
        ("TPID", is_blank(&submission.tpid)),
        (
            "Primary Solution Area",
            submission.primary_solution_areas.is_empty(),
        ),
        (
            "Secondary Solution Area",
            submission.secondary_solution_areas.is_empty(),
        ),
        ("Customer Name", is_blank(&submission.customer_name)),
        ("Problem Description", is_blank(&submission.problem_description)),
        ("Projected ACR", submission.projected_acr == 0),
        ("Operating Unit", submission.operating_units.is_empty()),
        ("Azure AI Services", submission.azure_ai_services.is_empty()),
    ];

    checks
        .into_iter()
        .filter_map(|(name, missing)| missing.then_some(name))
        .collect()
}

fn is_blank(value: &str) -> bool {
    value.trim().is_empty()
}
