use crate::infra::AppState;
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::Extension;
use axum::Json;
use engagement_qualifier::workflows::qualification::{
    chat_router, qualification_router, LanguageModel, Notifier, QualificationService,
    RequestChatService, RequestRepository,
};
use serde_json::json;
use std::sync::Arc;

pub(crate) fn with_service_routes<M, R, N>(
    qualification: Arc<QualificationService<M, R, N>>,
    chat: Arc<RequestChatService<M, R>>,
) -> axum::Router
where
    M: LanguageModel + 'static,
    R: RequestRepository + 'static,
    N: Notifier + 'static,
{
    qualification_router(qualification)
        .merge(chat_router(chat))
        .route("/health", axum::routing::get(healthcheck))
        .route("/ready", axum::routing::get(readiness_endpoint))
        .route("/metrics", axum::routing::get(metrics_endpoint))
}

pub(crate) async fn healthcheck() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

pub(crate) async fn readiness_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    let ready = state.readiness.load(std::sync::atomic::Ordering::Relaxed);
    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let payload = if ready {
        json!({ "status": "ready" })
    } else {
        json!({ "status": "initializing" })
    };

    (status, Json(payload))
}

pub(crate) async fn metrics_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.render(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infra::ServiceNotifier;
    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::Request;
    use engagement_qualifier::store::InMemoryRequestStore;
    use engagement_qualifier::workflows::qualification::{
        LoggingNotifier, ModelError, ModelRequest, OperatingUnitDirectory, QualificationSettings,
    };
    use metrics_exporter_prometheus::PrometheusBuilder;
    use std::sync::atomic::AtomicBool;
    use tower::ServiceExt;

    struct SilentModel;

    #[async_trait]
    impl LanguageModel for SilentModel {
        async fn complete(&self, _request: ModelRequest) -> Result<String, ModelError> {
            Err(ModelError::Api("no model in route tests".to_string()))
        }
    }

    fn app(ready: bool) -> (axum::Router, tempfile::TempDir) {
        let uploads = tempfile::tempdir().expect("tempdir");
        let model = Arc::new(SilentModel);
        let store = Arc::new(InMemoryRequestStore::new());
        let qualification = Arc::new(QualificationService::new(
            model.clone(),
            store.clone(),
            Arc::new(ServiceNotifier::Logging(LoggingNotifier)),
            QualificationSettings {
                directory: OperatingUnitDirectory::new(),
                from_address: "qualification@example.com".to_string(),
                upload_dir: uploads.path().to_path_buf(),
            },
        ));
        let chat = Arc::new(RequestChatService::new(model, store, uploads.path()));
        let state = AppState {
            readiness: Arc::new(AtomicBool::new(ready)),
            metrics: Arc::new(PrometheusBuilder::new().build_recorder().handle()),
        };
        let router = with_service_routes(qualification, chat).layer(Extension(state));
        (router, uploads)
    }

    async fn get(router: axum::Router, uri: &str) -> axum::response::Response {
        router
            .oneshot(Request::get(uri).body(Body::empty()).expect("request builds"))
            .await
            .expect("route responds")
    }

    #[tokio::test]
    async fn health_and_readiness_report_state() {
        let (router, _uploads) = app(false);
        assert_eq!(get(router.clone(), "/health").await.status(), StatusCode::OK);
        assert_eq!(
            get(router, "/ready").await.status(),
            StatusCode::SERVICE_UNAVAILABLE
        );

        let (router, _uploads) = app(true);
        assert_eq!(get(router, "/ready").await.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn metrics_are_plain_text() {
        let (router, _uploads) = app(true);
        let response = get(router, "/metrics").await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()[header::CONTENT_TYPE],
            "text/plain; version=0.0.4"
        );
    }

    #[tokio::test]
    async fn workflow_routes_are_mounted() {
        let (router, _uploads) = app(true);
        let response = get(router.clone(), "/api/v1/requests/unknown1").await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let response = router
            .oneshot(
                Request::post("/api/v1/chat")
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(json!({ "question": " " }).to_string()))
                    .expect("request builds"),
            )
            .await
            .expect("route responds");
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
