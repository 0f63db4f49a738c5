//! Request intake, scoring, model evaluation, notification and chat over stored requests.

pub mod chat;
pub mod decision;
pub mod domain;
pub mod intake;
pub mod model;
pub mod notify;
pub mod prompts;
pub mod repository;
pub mod router;
pub mod scoring;
pub mod service;
pub mod uploads;

#[cfg(test)]
mod tests;

pub use chat::{ChatQuestion, ChatReply, ChatServiceError, RequestChatService};
pub use decision::{parse_decision, QualificationDecision};
pub use domain::{
    AttachmentUpload, OperatingUnit, RecordDraft, RequestId, RequestRecord, RequestStatus,
    RequestStatusView, RequestSubmission, APPROVED_BY,
};
pub use intake::{IntakeGuard, IntakeReview, IntakeViolation};
pub use model::{
    AzureOpenAiClient, ChatRole, ChatTurn, LanguageModel, ModelError, ModelRequest,
};
pub use notify::{
    DeliveryStatus, DirectoryError, EmailMessage, LoggingNotifier, NotificationReport, Notifier,
    NotifyError, OperatingUnitDirectory, SmtpNotifier, UnitDelivery,
};
pub use repository::{RepositoryError, RequestRepository};
pub use router::{chat_router, qualification_router};
pub use scoring::{
    calculate_total_score, ClampAdjustment, ScoreEngine, ScoreField, ScoreInput, ScoreResult,
};
pub use service::{
    QualificationService, QualificationServiceError, QualificationSettings, SubmissionOutcome,
    SubmissionReceipt,
};
pub use uploads::{AttachmentError, AttachmentStore};
