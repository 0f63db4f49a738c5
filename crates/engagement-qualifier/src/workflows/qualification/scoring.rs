use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

pub const PROJECTED_ACR_MAX: f64 = 50_000.0;
pub const PROJECTED_LENGTH_MAX: f64 = 60.0;
pub const PARTNER_EXECUTIVES_MAX: f64 = 1.0;
pub const ACTUAL_ACR_MAX: f64 = 100_000.0;

const PROJECTED_ACR_WEIGHT: f64 = 0.4;
const PROJECTED_LENGTH_WEIGHT: f64 = 0.2;
const PARTNER_EXECUTIVES_WEIGHT: f64 = 0.2;
const ACTUAL_ACR_WEIGHT: f64 = 0.2;

// Normalization floors differ from the clamping floors; values between the two
// normalize below zero.
const PROJECTED_ACR_FLOOR: f64 = 1_000.0;
const PROJECTED_LENGTH_FLOOR: f64 = 1.0;

/// Raw business metrics feeding the qualification score.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoreInput {
    pub projected_acr: f64,
    pub projected_length: f64,
    pub partner_executives: f64,
    pub actual_acr: f64,
}

/// Input field subject to domain clamping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoreField {
    ProjectedAcr,
    ProjectedLength,
    ActualAcr,
}

impl ScoreField {
    pub const fn label(self) -> &'static str {
        match self {
            ScoreField::ProjectedAcr => "Projected ACR",
            ScoreField::ProjectedLength => "Projected length",
            ScoreField::ActualAcr => "Actual ACR",
        }
    }

    pub const fn domain_max(self) -> f64 {
        match self {
            ScoreField::ProjectedAcr => PROJECTED_ACR_MAX,
            ScoreField::ProjectedLength => PROJECTED_LENGTH_MAX,
            ScoreField::ActualAcr => ACTUAL_ACR_MAX,
        }
    }
}

/// Record of an out-of-domain input replaced by its nearest bound.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClampAdjustment {
    pub field: ScoreField,
    pub submitted: f64,
    pub clamped: f64,
}

/// Weighted score breakdown for a single request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreResult {
    pub total_score: f64,
    pub weighted_projected_acr: f64,
    pub weighted_projected_length: f64,
    pub weighted_partner_executives: f64,
    pub weighted_actual_acr: f64,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub adjustments: Vec<ClampAdjustment>,
}

impl ScoreResult {
    /// `(total, projected ACR, projected length, partner executives, actual ACR)`.
    pub fn as_tuple(&self) -> (f64, f64, f64, f64, f64) {
        (
            self.total_score,
            self.weighted_projected_acr,
            self.weighted_projected_length,
            self.weighted_partner_executives,
            self.weighted_actual_acr,
        )
    }

    pub fn was_clamped(&self) -> bool {
        !self.adjustments.is_empty()
    }
}

/// Stateless scorer applying the fixed normalization and weighting rubric.
#[derive(Debug, Clone, Copy, Default)]
pub struct ScoreEngine;

impl ScoreEngine {
    pub fn compute(&self, input: ScoreInput) -> ScoreResult {
        let mut adjustments = Vec::new();

        let projected_acr = clamp_field(
            ScoreField::ProjectedAcr,
            input.projected_acr,
            &mut adjustments,
        );
        let projected_length = clamp_field(
            ScoreField::ProjectedLength,
            input.projected_length,
            &mut adjustments,
        );
        let actual_acr = clamp_field(ScoreField::ActualAcr, input.actual_acr, &mut adjustments);

        let partner_executives = input.partner_executives;
        if !(0.0..=PARTNER_EXECUTIVES_MAX).contains(&partner_executives) {
            warn!(
                partner_executives,
                "partner executives outside expected boundaries (0-1); value used as submitted"
            );
        }

        let normalized_projected_acr =
            (projected_acr - PROJECTED_ACR_FLOOR) / (PROJECTED_ACR_MAX - PROJECTED_ACR_FLOOR);
        let normalized_projected_length = (projected_length - PROJECTED_LENGTH_FLOOR)
            / (PROJECTED_LENGTH_MAX - PROJECTED_LENGTH_FLOOR);
        let normalized_partner_executives = partner_executives / PARTNER_EXECUTIVES_MAX;
        let normalized_actual_acr = actual_acr / ACTUAL_ACR_MAX;

        debug!(
            normalized_projected_acr,
            normalized_projected_length,
            normalized_partner_executives,
            normalized_actual_acr,
            "normalized score inputs"
        );

        let weighted_projected_acr = PROJECTED_ACR_WEIGHT * normalized_projected_acr;
        let weighted_projected_length = PROJECTED_LENGTH_WEIGHT * normalized_projected_length;
        let weighted_partner_executives = PARTNER_EXECUTIVES_WEIGHT * normalized_partner_executives;
        let weighted_actual_acr = ACTUAL_ACR_WEIGHT * normalized_actual_acr;

        let total_score = weighted_projected_acr
            + weighted_projected_length
            + weighted_partner_executives
            + weighted_actual_acr;

        debug!(
            weighted_projected_acr,
            weighted_projected_length,
            weighted_partner_executives,
            weighted_actual_acr,
            total_score,
            "computed qualification score"
        );

        ScoreResult {
            total_score,
            weighted_projected_acr,
            weighted_projected_length,
            weighted_partner_executives,
            weighted_actual_acr,
            adjustments,
        }
    }
}

/// Positional form of [`ScoreEngine::compute`].
pub fn calculate_total_score(
    projected_acr: f64,
    projected_length: f64,
    partner_executives: f64,
    actual_acr: f64,
) -> ScoreResult {
    ScoreEngine.compute(ScoreInput {
        projected_acr,
        projected_length,
        partner_executives,
        actual_acr,
    })
}

fn clamp_field(field: ScoreField, value: f64, adjustments: &mut Vec<ClampAdjustment>) -> f64 {
    let max = field.domain_max();
    if (0.0..=max).contains(&value) {
        return value;
    }

    let clamped = value.clamp(0.0, max);
    warn!(
        field = field.label(),
        submitted = value,
        clamped,
        "score input outside expected boundaries (0-{max}); value limited"
    );
    adjustments.push(ClampAdjustment {
        field,
        submitted: value,
        clamped,
    });
    clamped
}
