use super::common::*;
use crate::workflows::qualification::intake::{IntakeGuard, IntakeViolation};
use chrono::NaiveDate;

#[test]
fn maps_form_values_onto_score_inputs() {
    let review = IntakeGuard
        .review(&submission(), today())
        .expect("valid submission");

    assert!(review.warnings.is_empty(), "{:?}", review.warnings);
    assert_eq!(review.score_input.projected_acr, 10_000.0);
    assert_eq!(review.score_input.projected_length, 10.0);
    assert_eq!(review.score_input.partner_executives, 1.0);
    assert_eq!(review.score_input.actual_acr, 10_000.0);
}

#[test]
fn non_partner_scores_zero_executives() {
    let mut submission = submission();
    submission.partner = false;
    let review = IntakeGuard.review(&submission, today()).expect("valid");
    assert_eq!(review.score_input.partner_executives, 0.0);
}

#[test]
fn reports_every_missing_field_together() {
    let mut submission = submission();
    submission.request_title = "   ".to_string();
    submission.tpid.clear();
    submission.operating_units.clear();
    submission.projected_acr = 0;

    let err = IntakeGuard
        .review(&submission, today())
        .expect_err("missing fields");
    let IntakeViolation::MissingFields(fields) = &err;
    assert_eq!(
        fields,
        &vec!["Request Name", "TPID", "Projected ACR", "Operating Unit"]
    );
    assert!(err.to_string().contains("Request Name, TPID"));
}

#[test]
fn out_of_range_values_only_warn() {
    let mut submission = submission();
    submission.expected_start_date = NaiveDate::from_ymd_opt(2024, 2, 1);
    submission.projected_work_hours = 120;
    submission.projected_acr = 75_000;
    submission.monthly_usage = -5;

    let review = IntakeGuard
        .review(&submission, today())
        .expect("warnings do not block");

    assert_eq!(review.warnings.len(), 4);
    assert!(review.warnings[0].contains("not in the future"));
    assert_eq!(review.score_input.projected_length, 120.0);
}
