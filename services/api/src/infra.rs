use async_trait::async_trait;
use engagement_qualifier::config::{MailConfig, StorageConfig};
use engagement_qualifier::error::AppError;
use engagement_qualifier::store::InMemoryRequestStore;
use engagement_qualifier::workflows::qualification::{
    EmailMessage, LoggingNotifier, Notifier, NotifyError, OperatingUnitDirectory, SmtpNotifier,
};
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// Notifier chosen at startup from the mail settings.
#[derive(Debug)]
pub(crate) enum ServiceNotifier {
    Smtp(SmtpNotifier),
    Logging(LoggingNotifier),
}

#[async_trait]
impl Notifier for ServiceNotifier {
    async fn send(&self, message: &EmailMessage) -> Result<(), NotifyError> {
        match self {
            ServiceNotifier::Smtp(notifier) => notifier.send(message).await,
            ServiceNotifier::Logging(notifier) => notifier.send(message).await,
        }
    }

    fn delivers(&self) -> bool {
        match self {
            ServiceNotifier::Smtp(notifier) => notifier.delivers(),
            ServiceNotifier::Logging(notifier) => notifier.delivers(),
        }
    }
}

pub(crate) fn build_notifier(config: &MailConfig) -> Result<ServiceNotifier, AppError> {
    if config.password.is_none() {
        warn!("EMAIL_PASSWORD not set; decision emails will only be logged");
        return Ok(ServiceNotifier::Logging(LoggingNotifier));
    }
    let notifier = SmtpNotifier::new(config)?;
    info!(host = %config.smtp_host, port = config.smtp_port, "smtp notifier configured");
    Ok(ServiceNotifier::Smtp(notifier))
}

pub(crate) fn load_directory(config: &MailConfig) -> Result<OperatingUnitDirectory, AppError> {
    match &config.ou_mapping_csv {
        Some(path) => {
            let directory = OperatingUnitDirectory::from_path(path)?;
            info!(
                path = %path.display(),
                units = directory.len(),
                "loaded operating unit mapping"
            );
            Ok(directory)
        }
        None => {
            warn!("OU_MAPPING_CSV not set; no operating unit will be notified");
            Ok(OperatingUnitDirectory::new())
        }
    }
}

pub(crate) fn open_store(config: &StorageConfig) -> Result<InMemoryRequestStore, AppError> {
    match &config.store_path {
        Some(path) => {
            let store = InMemoryRequestStore::with_snapshot(path)?;
            info!(
                path = %path.display(),
                records = store.len(),
                "request store opened"
            );
            Ok(store)
        }
        None => {
            warn!("STORE_PATH not set; requests are kept in memory only");
            Ok(InMemoryRequestStore::new())
        }
    }
}
