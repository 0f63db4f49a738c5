use chrono::NaiveDate;
use rand::distributions::Alphanumeric;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;

use super::scoring::ScoreResult;

const REQUEST_ID_LENGTH: usize = 8;

/// Tracking identifier shared by the stored record, the email subject and the model prompt.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequestId(pub String);

impl RequestId {
    pub fn generate() -> Self {
        let id = rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(REQUEST_ID_LENGTH)
            .map(char::from)
            .collect();
        Self(id)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Sales operating units a request can be routed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum OperatingUnit {
    #[serde(rename = "Retail/CPG")]
    RetailCpg,
    #[serde(rename = "FSI")]
    Fsi,
    #[serde(rename = "MFG")]
    Mfg,
    #[serde(rename = "HLS")]
    Hls,
    #[serde(rename = "SDP")]
    Sdp,
    #[serde(rename = "West/Midwest")]
    WestMidwest,
    South,
    Northeast,
    Southeast,
    #[serde(rename = "LATAM")]
    Latam,
    Canada,
    Education,
    #[serde(rename = "Fed / Public Sector")]
    FedPublicSector,
}

impl OperatingUnit {
    pub const ALL: [OperatingUnit; 13] = [
        OperatingUnit::RetailCpg,
        OperatingUnit::Fsi,
        OperatingUnit::Mfg,
        OperatingUnit::Hls,
        OperatingUnit::Sdp,
        OperatingUnit::WestMidwest,
        OperatingUnit::South,
        OperatingUnit::Northeast,
        OperatingUnit::Southeast,
        OperatingUnit::Latam,
        OperatingUnit::Canada,
        OperatingUnit::Education,
        OperatingUnit::FedPublicSector,
    ];

    pub const fn label(self) -> &'static str {
        match self {
            OperatingUnit::RetailCpg => "Retail/CPG",
            OperatingUnit::Fsi => "FSI",
            OperatingUnit::Mfg => "MFG",
            OperatingUnit::Hls => "HLS",
            OperatingUnit::Sdp => "SDP",
            OperatingUnit::WestMidwest => "West/Midwest",
            OperatingUnit::South => "South",
            OperatingUnit::Northeast => "Northeast",
            OperatingUnit::Southeast => "Southeast",
            OperatingUnit::Latam => "LATAM",
            OperatingUnit::Canada => "Canada",
            OperatingUnit::Education => "Education",
            OperatingUnit::FedPublicSector => "Fed / Public Sector",
        }
    }

    pub fn from_label(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        Self::ALL
            .into_iter()
            .find(|unit| unit.label().eq_ignore_ascii_case(raw))
    }
}

impl fmt::Display for OperatingUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Optional file uploaded with the request, carried as base64 over JSON.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttachmentUpload {
    pub file_name: String,
    pub content: String,
}

/// Raw intake form as submitted by a requester.
///
/// Every field defaults when absent so the intake guard can report all missing
/// mandatory fields at once instead of failing on the first absent key.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RequestSubmission {
    pub request_title: String,
    pub requester: String,
    pub requester_email: String,
    pub partner: bool,
    pub projected_work_hours: u32,
    pub expected_start_date: Option<NaiveDate>,
    pub msx_id: String,
    pub tpid: String,
    pub primary_solution_areas: Vec<String>,
    pub secondary_solution_areas: Vec<String>,
    pub customer_name: String,
    pub operating_units: Vec<OperatingUnit>,
    pub problem_description: String,
    pub projected_acr: i64,
    pub necessary_skills: Vec<String>,
    pub azure_ai_services: Vec<String>,
    pub engagement_country: String,
    pub engagement_region: String,
    pub monthly_usage: i64,
    pub attachment: Option<AttachmentUpload>,
}

/// Workflow status persisted with each request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RequestStatus {
    #[serde(rename = "In progress")]
    InProgress,
    #[serde(rename = "Blocked due to Rejection")]
    BlockedDueToRejection,
}

impl RequestStatus {
    pub const fn label(self) -> &'static str {
        match self {
            RequestStatus::InProgress => "In progress",
            RequestStatus::BlockedDueToRejection => "Blocked due to Rejection",
        }
    }
}

pub const APPROVED_BY: &str = "QualiFiction.ai";

/// Flat document persisted per request; field names match the query schema.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct RequestRecord {
    pub request_id: RequestId,
    pub request_title: String,
    pub requester: String,
    pub requester_email: String,
    pub partner: String,
    pub projected_work_hours: u32,
    pub expected_start_date: NaiveDate,
    #[serde(rename = "MSXID")]
    pub msx_id: String,
    #[serde(rename = "TPID")]
    pub tpid: String,
    #[serde(rename = "PrimarySolutionArea")]
    pub primary_solution_areas: Vec<String>,
    #[serde(rename = "SecondarySolutionArea")]
    pub secondary_solution_areas: Vec<String>,
    pub customer_name: String,
    #[serde(rename = "OperatingUnit")]
    pub operating_units: Vec<OperatingUnit>,
    pub problem_description: String,
    #[serde(rename = "ProjectedACR")]
    pub projected_acr: i64,
    pub necessary_skills: Vec<String>,
    #[serde(rename = "AzureAIServices")]
    pub azure_ai_services: Vec<String>,
    pub engagement_country: String,
    pub engagement_region: String,
    pub monthly_usage: i64,
    pub attachment: Option<String>,
    pub created_date: NaiveDate,
    pub status: RequestStatus,
    pub assigned_to: Vec<String>,
    pub assigned_date: NaiveDate,
    pub approved: bool,
    pub approved_date: NaiveDate,
    pub approved_by: String,
    pub total_score: f64,
    #[serde(rename = "WeightedProjectedACR")]
    pub weighted_projected_acr: f64,
    pub weighted_projected_length: f64,
    pub weighted_partner_executives: f64,
    #[serde(rename = "WeightedActualACR")]
    pub weighted_actual_acr: f64,
    pub evaluation: String,
}

/// Everything the submission flow learned about a request before persisting it.
pub struct RecordDraft<'a> {
    pub request_id: &'a RequestId,
    pub submission: &'a RequestSubmission,
    pub expected_start_date: NaiveDate,
    pub attachment: Option<String>,
    pub created_on: NaiveDate,
    pub score: &'a ScoreResult,
    pub approved: bool,
    pub assigned_to: Vec<String>,
    pub evaluation: &'a str,
}

impl RequestRecord {
    pub fn from_draft(draft: RecordDraft<'_>) -> Self {
        let RecordDraft {
            request_id,
            submission,
            expected_start_date,
            attachment,
            created_on,
            score,
            approved,
            assigned_to,
            evaluation,
        } = draft;

        let status = if approved {
            RequestStatus::InProgress
        } else {
            RequestStatus::BlockedDueToRejection
        };

        Self {
            request_id: request_id.clone(),
            request_title: submission.request_title.clone(),
            requester: submission.requester.clone(),
            requester_email: submission.requester_email.clone(),
            partner: if submission.partner { "Yes" } else { "No" }.to_string(),
            projected_work_hours: submission.projected_work_hours,
            expected_start_date,
            msx_id: submission.msx_id.clone(),
            tpid: submission.tpid.clone(),
            primary_solution_areas: submission.primary_solution_areas.clone(),
            secondary_solution_areas: submission.secondary_solution_areas.clone(),
            customer_name: submission.customer_name.clone(),
            operating_units: submission.operating_units.clone(),
            problem_description: submission.problem_description.clone(),
            projected_acr: submission.projected_acr,
            necessary_skills: submission.necessary_skills.clone(),
            azure_ai_services: submission.azure_ai_services.clone(),
            engagement_country: submission.engagement_country.clone(),
            engagement_region: submission.engagement_region.clone(),
            monthly_usage: submission.monthly_usage,
            attachment,
            created_date: created_on,
            status,
            assigned_to,
            assigned_date: created_on,
            approved,
            approved_date: created_on,
            approved_by: APPROVED_BY.to_string(),
            total_score: score.total_score,
            weighted_projected_acr: score.weighted_projected_acr,
            weighted_projected_length: score.weighted_projected_length,
            weighted_partner_executives: score.weighted_partner_executives,
            weighted_actual_acr: score.weighted_actual_acr,
            evaluation: evaluation.to_string(),
        }
    }

    /// Sanitized representation returned by the status endpoint.
    pub fn status_view(&self) -> RequestStatusView {
        RequestStatusView {
            request_id: self.request_id.clone(),
            request_title: self.request_title.clone(),
            status: self.status.label(),
            approved: self.approved,
            total_score: self.total_score,
            created_date: self.created_date,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RequestStatusView {
    pub request_id: RequestId,
    pub request_title: String,
    pub status: &'static str,
    pub approved: bool,
    pub total_score: f64,
    pub created_date: NaiveDate,
}
