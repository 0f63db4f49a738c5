use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use serde_json::json;

use super::chat::{ChatQuestion, ChatServiceError, RequestChatService};
use super::domain::{RequestId, RequestSubmission};
use super::intake::IntakeViolation;
use super::model::LanguageModel;
use super::notify::Notifier;
use super::repository::{RepositoryError, RequestRepository};
use super::scoring::ScoreInput;
use super::service::{QualificationService, QualificationServiceError};

/// Router builder exposing submission, status and scoring endpoints.
pub fn qualification_router<M, R, N>(service: Arc<QualificationService<M, R, N>>) -> Router
where
    M: LanguageModel + 'static,
    R: RequestRepository + 'static,
    N: Notifier + 'static,
{
    Router::new()
        .route("/api/v1/requests", post(submit_handler::<M, R, N>))
        .route(
            "/api/v1/requests/:request_id",
            get(status_handler::<M, R, N>),
        )
        .route("/api/v1/score", post(score_handler::<M, R, N>))
        .with_state(service)
}

/// Router builder exposing the natural-language query endpoint.
pub fn chat_router<M, R>(service: Arc<RequestChatService<M, R>>) -> Router
where
    M: LanguageModel + 'static,
    R: RequestRepository + 'static,
{
    Router::new()
        .route("/api/v1/chat", post(chat_handler::<M, R>))
        .with_state(service)
}

fn error_response(status: StatusCode, message: impl Into<String>) -> Response {
    let payload = json!({
        "error": message.into(),
    });
    (status, axum::Json(payload)).into_response()
}

/// Malformed bodies still answer with the JSON error shape.
fn rejection_response(rejection: JsonRejection) -> Response {
    error_response(rejection.status(), rejection.body_text())
}

pub(crate) async fn submit_handler<M, R, N>(
    State(service): State<Arc<QualificationService<M, R, N>>>,
    payload: Result<axum::Json<RequestSubmission>, JsonRejection>,
) -> Response
where
    M: LanguageModel + 'static,
    R: RequestRepository + 'static,
    N: Notifier + 'static,
{
    let submission = match payload {
        Ok(axum::Json(submission)) => submission,
        Err(rejection) => return rejection_response(rejection),
    };

    match service.submit(submission).await {
        Ok(outcome) => (StatusCode::CREATED, axum::Json(outcome.receipt())).into_response(),
        Err(QualificationServiceError::Intake(violation)) => {
            let IntakeViolation::MissingFields(fields) = &violation;
            let payload = json!({
                "error": violation.to_string(),
                "missing_fields": fields,
            });
            (StatusCode::UNPROCESSABLE_ENTITY, axum::Json(payload)).into_response()
        }
        Err(QualificationServiceError::Attachment(error)) => {
            error_response(StatusCode::BAD_REQUEST, error.to_string())
        }
        Err(QualificationServiceError::Model(error)) => {
            error_response(StatusCode::BAD_GATEWAY, error.to_string())
        }
        Err(QualificationServiceError::IndeterminateDecision {
            request_id,
            response,
        }) => {
            let payload = json!({
                "error": "decision model response contained no approval decision",
                "request_id": request_id,
                "response": response,
            });
            (StatusCode::BAD_GATEWAY, axum::Json(payload)).into_response()
        }
        Err(QualificationServiceError::Repository(RepositoryError::Conflict)) => {
            error_response(StatusCode::CONFLICT, "request already exists")
        }
        Err(QualificationServiceError::NotPersisted {
            request_id,
            notifications,
            source,
        }) => {
            let status = match &source {
                RepositoryError::Conflict => StatusCode::CONFLICT,
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            };
            let payload = json!({
                "error": format!("request was notified but not stored: {source}"),
                "request_id": request_id,
                "notifications": notifications,
            });
            (status, axum::Json(payload)).into_response()
        }
        Err(other) => error_response(StatusCode::INTERNAL_SERVER_ERROR, other.to_string()),
    }
}

pub(crate) async fn status_handler<M, R, N>(
    State(service): State<Arc<QualificationService<M, R, N>>>,
    Path(request_id): Path<String>,
) -> Response
where
    M: LanguageModel + 'static,
    R: RequestRepository + 'static,
    N: Notifier + 'static,
{
    let id = RequestId(request_id);
    match service.get(&id) {
        Ok(record) => {
            let view = record.status_view();
            (StatusCode::OK, axum::Json(view)).into_response()
        }
        Err(QualificationServiceError::Repository(RepositoryError::NotFound)) => {
            let payload = json!({
                "error": "request not found",
                "request_id": id,
            });
            (StatusCode::NOT_FOUND, axum::Json(payload)).into_response()
        }
        Err(other) => error_response(StatusCode::INTERNAL_SERVER_ERROR, other.to_string()),
    }
}

pub(crate) async fn score_handler<M, R, N>(
    State(service): State<Arc<QualificationService<M, R, N>>>,
    payload: Result<axum::Json<ScoreInput>, JsonRejection>,
) -> Response
where
    M: LanguageModel + 'static,
    R: RequestRepository + 'static,
    N: Notifier + 'static,
{
    let input = match payload {
        Ok(axum::Json(input)) => input,
        Err(rejection) => return rejection_response(rejection),
    };
    let result = service.score(input);
    (StatusCode::OK, axum::Json(result)).into_response()
}

pub(crate) async fn chat_handler<M, R>(
    State(service): State<Arc<RequestChatService<M, R>>>,
    payload: Result<axum::Json<ChatQuestion>, JsonRejection>,
) -> Response
where
    M: LanguageModel + 'static,
    R: RequestRepository + 'static,
{
    let question = match payload {
        Ok(axum::Json(question)) => question,
        Err(rejection) => return rejection_response(rejection),
    };

    match service.ask(question).await {
        Ok(reply) => (StatusCode::OK, axum::Json(reply)).into_response(),
        Err(error @ (ChatServiceError::EmptyQuestion | ChatServiceError::NotAnImage(_))) => {
            error_response(StatusCode::BAD_REQUEST, error.to_string())
        }
        Err(ChatServiceError::Attachment(error)) => {
            error_response(StatusCode::BAD_REQUEST, error.to_string())
        }
        Err(ChatServiceError::Query { query, source }) => {
            let payload = json!({
                "error": source.to_string(),
                "query": query,
            });
            (StatusCode::UNPROCESSABLE_ENTITY, axum::Json(payload)).into_response()
        }
        Err(ChatServiceError::Model(error)) => {
            error_response(StatusCode::BAD_GATEWAY, error.to_string())
        }
        Err(ChatServiceError::Repository(error)) => {
            error_response(StatusCode::INTERNAL_SERVER_ERROR, error.to_string())
        }
    }
}
