use crate::cli::ServeArgs;
use crate::infra::{build_notifier, load_directory, open_store, AppState};
use crate::routes::with_service_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use engagement_qualifier::config::AppConfig;
use engagement_qualifier::error::AppError;
use engagement_qualifier::telemetry;
use engagement_qualifier::workflows::qualification::{
    AzureOpenAiClient, QualificationService, QualificationSettings, RequestChatService,
};
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tracing::info;

pub(crate) async fn run(mut args: ServeArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;

    if let Some(host) = args.host.take() {
        config.server.host = host;
    }
    if let Some(port) = args.port.take() {
        config.server.port = port;
    }

    telemetry::init(&config.telemetry, config.environment)?;

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(std::sync::atomic::AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
    };

    let model = Arc::new(AzureOpenAiClient::new(config.require_model()?)?);
    let store = Arc::new(open_store(&config.storage)?);
    let notifier = Arc::new(build_notifier(&config.mail)?);
    let directory = load_directory(&config.mail)?;

    let qualification = Arc::new(QualificationService::new(
        model.clone(),
        store.clone(),
        notifier,
        QualificationSettings {
            directory,
            from_address: config.mail.from_address.clone(),
            upload_dir: config.storage.upload_dir.clone(),
        },
    ));
    let chat = Arc::new(RequestChatService::new(
        model,
        store,
        config.storage.upload_dir.clone(),
    ));

    let app = with_service_routes(qualification, chat)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(?config.environment, %addr, "qualification service ready");

    axum::serve(listener, app).await?;
    Ok(())
}
