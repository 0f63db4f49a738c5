use std::path::PathBuf;
use std::sync::Arc;

use chrono::{Local, NaiveDate};
use serde::Serialize;
use tracing::{debug, error, info, warn};

use super::decision::{parse_decision, QualificationDecision};
use super::domain::{RecordDraft, RequestId, RequestRecord, RequestSubmission};
use super::intake::{IntakeGuard, IntakeReview, IntakeViolation};
use super::model::{is_image, LanguageModel, ModelError, ModelRequest};
use super::notify::{notify_operating_units, NotificationReport, Notifier, OperatingUnitDirectory};
use super::prompts::{evaluation_prompt, DECISION_SYSTEM_MESSAGE};
use super::repository::{RepositoryError, RequestRepository};
use super::scoring::{ScoreEngine, ScoreInput, ScoreResult};
use super::uploads::{AttachmentError, AttachmentStore};

const DECISION_MAX_TOKENS: u32 = 2000;
const DECISION_SEED: u64 = 42;
const REQUEST_ID_ATTEMPTS: usize = 5;

/// Deployment settings the submission flow needs beyond its collaborators.
#[derive(Debug, Clone)]
pub struct QualificationSettings {
    pub directory: OperatingUnitDirectory,
    pub from_address: String,
    pub upload_dir: PathBuf,
}

/// Service composing intake validation, scoring, the decision model, notification and storage.
pub struct QualificationService<M, R, N> {
    guard: IntakeGuard,
    engine: ScoreEngine,
    model: Arc<M>,
    repository: Arc<R>,
    notifier: Arc<N>,
    directory: Arc<OperatingUnitDirectory>,
    attachments: AttachmentStore,
    from_address: String,
}

/// Everything produced while qualifying one submission.
#[derive(Debug, Clone)]
pub struct SubmissionOutcome {
    pub record: RequestRecord,
    pub decision: QualificationDecision,
    pub score: ScoreResult,
    pub warnings: Vec<String>,
    pub notifications: NotificationReport,
}

impl SubmissionOutcome {
    pub fn receipt(&self) -> SubmissionReceipt {
        SubmissionReceipt {
            request_id: self.record.request_id.clone(),
            decision: self.decision.label(),
            status: self.record.status.label(),
            approved: self.record.approved,
            score: self.score.clone(),
            evaluation: self.record.evaluation.clone(),
            assigned_to: self.record.assigned_to.clone(),
            warnings: self.warnings.clone(),
            notifications: self.notifications.clone(),
        }
    }
}

/// Response body returned to the requester after a submission.
#[derive(Debug, Clone, Serialize)]
pub struct SubmissionReceipt {
    pub request_id: RequestId,
    pub decision: &'static str,
    pub status: &'static str,
    pub approved: bool,
    pub score: ScoreResult,
    pub evaluation: String,
    pub assigned_to: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
    pub notifications: NotificationReport,
}

impl<M, R, N> QualificationService<M, R, N>
where
    M: LanguageModel + 'static,
    R: RequestRepository + 'static,
    N: Notifier + 'static,
{
    pub fn new(
        model: Arc<M>,
        repository: Arc<R>,
        notifier: Arc<N>,
        settings: QualificationSettings,
    ) -> Self {
        let QualificationSettings {
            directory,
            from_address,
            upload_dir,
        } = settings;

        Self {
            guard: IntakeGuard,
            engine: ScoreEngine,
            model,
            repository,
            notifier,
            directory: Arc::new(directory),
            attachments: AttachmentStore::new(upload_dir),
            from_address,
        }
    }

    /// Qualify a submission dated today in local time.
    pub async fn submit(
        &self,
        submission: RequestSubmission,
    ) -> Result<SubmissionOutcome, QualificationServiceError> {
        self.submit_on(submission, Local::now().date_naive()).await
    }

    /// Validate, score, evaluate, notify and persist a submission.
    ///
    /// An indeterminate model response aborts before any email is sent or record stored.
    /// A saved attachment is discarded whenever the submission ends without a stored record.
    pub async fn submit_on(
        &self,
        submission: RequestSubmission,
        today: NaiveDate,
    ) -> Result<SubmissionOutcome, QualificationServiceError> {
        let review = self.guard.review(&submission, today)?;
        for warning in &review.warnings {
            warn!(
                request_title = %submission.request_title,
                %warning,
                "submission accepted with warning"
            );
        }

        let request_id = self.allocate_request_id()?;

        let attachment = match &submission.attachment {
            Some(upload) => Some(self.attachments.save(upload, today).await?),
            None => None,
        };

        let result = self
            .qualify(&submission, review, request_id, attachment.clone(), today)
            .await;
        if result.is_err() {
            if let Some(path) = &attachment {
                self.attachments.discard(path).await;
            }
        }
        result
    }

    async fn qualify(
        &self,
        submission: &RequestSubmission,
        review: IntakeReview,
        request_id: RequestId,
        attachment: Option<PathBuf>,
        today: NaiveDate,
    ) -> Result<SubmissionOutcome, QualificationServiceError> {
        let score = self.engine.compute(review.score_input);

        let prompt = evaluation_prompt(&request_id, &submission.problem_description, &score);
        let images = attachment
            .iter()
            .filter(|path| is_image(path))
            .cloned()
            .collect();
        let request = ModelRequest::new(DECISION_SYSTEM_MESSAGE, prompt)
            .with_images(images)
            .max_tokens(DECISION_MAX_TOKENS)
            .seed(DECISION_SEED);
        let evaluation = self.model.complete(request).await?;

        let decision = parse_decision(&evaluation);
        let Some(approved) = decision.is_approved() else {
            warn!(%request_id, "model response carried no decision token");
            return Err(QualificationServiceError::IndeterminateDecision {
                request_id,
                response: evaluation,
            });
        };

        let notifications = notify_operating_units(
            self.notifier.as_ref(),
            &self.directory,
            &self.from_address,
            &submission.operating_units,
            &request_id,
            &evaluation,
        )
        .await;

        let record = RequestRecord::from_draft(RecordDraft {
            request_id: &request_id,
            submission,
            expected_start_date: review.expected_start_date,
            attachment: attachment.map(|path| path.display().to_string()),
            created_on: today,
            score: &score,
            approved,
            assigned_to: notifications.notified_recipients(),
            evaluation: &evaluation,
        });
        let record = match self.repository.insert(record) {
            Ok(record) => record,
            Err(source) => {
                error!(
                    %request_id,
                    error = %source,
                    notified = notifications.notified_recipients().len(),
                    "decision emails sent but request was not stored"
                );
                return Err(QualificationServiceError::NotPersisted {
                    request_id,
                    notifications,
                    source,
                });
            }
        };

        info!(
            %request_id,
            decision = decision.label(),
            total_score = score.total_score,
            notified = record.assigned_to.len(),
            failed_notifications = notifications.failures(),
            "request qualified"
        );

        Ok(SubmissionOutcome {
            record,
            decision,
            score,
            warnings: review.warnings,
            notifications,
        })
    }

    /// Draw request ids until one is not already stored.
    fn allocate_request_id(&self) -> Result<RequestId, QualificationServiceError> {
        for _ in 0..REQUEST_ID_ATTEMPTS {
            let candidate = RequestId::generate();
            if self.repository.fetch(&candidate)?.is_none() {
                return Ok(candidate);
            }
            debug!(%candidate, "request id already stored; drawing another");
        }
        Err(RepositoryError::Conflict.into())
    }

    /// Score raw metrics without evaluating or storing anything.
    pub fn score(&self, input: ScoreInput) -> ScoreResult {
        self.engine.compute(input)
    }

    /// Fetch a stored request for API responses.
    pub fn get(&self, request_id: &RequestId) -> Result<RequestRecord, QualificationServiceError> {
        let record = self
            .repository
            .fetch(request_id)?
            .ok_or(RepositoryError::NotFound)?;
        Ok(record)
    }
}

/// Error raised by the qualification service.
#[derive(Debug, thiserror::Error)]
pub enum QualificationServiceError {
    #[error(transparent)]
    Intake(#[from] IntakeViolation),
    #[error(transparent)]
    Attachment(#[from] AttachmentError),
    #[error(transparent)]
    Model(#[from] ModelError),
    #[error("model response for request {request_id} contained no approval decision")]
    IndeterminateDecision {
        request_id: RequestId,
        response: String,
    },
    #[error("request {request_id} was evaluated and notified but could not be stored: {source}")]
    NotPersisted {
        request_id: RequestId,
        notifications: NotificationReport,
        source: RepositoryError,
    },
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}
