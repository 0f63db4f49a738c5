use std::collections::BTreeMap;
use std::fmt;
use std::io::Read;
use std::path::Path;

use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use pulldown_cmark::{html, Options, Parser};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::domain::{OperatingUnit, RequestId};
use crate::config::MailConfig;

/// Recipients registered for each operating unit.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OperatingUnitDirectory {
    recipients: BTreeMap<OperatingUnit, Vec<String>>,
}

#[derive(Debug, thiserror::Error)]
pub enum DirectoryError {
    #[error("failed to read operating unit mapping: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid operating unit mapping CSV: {0}")]
    Csv(#[from] csv::Error),
    #[error("unknown operating unit '{value}' on row {row}")]
    UnknownUnit { row: usize, value: String },
}

#[derive(Debug, Deserialize)]
struct DirectoryRow {
    operating_unit: String,
    #[serde(default)]
    email: String,
}

impl OperatingUnitDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self, DirectoryError> {
        let file = std::fs::File::open(path)?;
        Self::from_reader(file)
    }

    /// Parse `operating_unit,email` rows; a blank email registers the unit without recipients.
    pub fn from_reader<R: Read>(reader: R) -> Result<Self, DirectoryError> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(reader);
        let mut directory = Self::new();

        for (index, row) in csv_reader.deserialize::<DirectoryRow>().enumerate() {
            let row = row?;
            let unit = OperatingUnit::from_label(&row.operating_unit).ok_or_else(|| {
                DirectoryError::UnknownUnit {
                    row: index + 1,
                    value: row.operating_unit.clone(),
                }
            })?;
            let entry = directory.recipients.entry(unit).or_default();
            if !row.email.is_empty() && !entry.contains(&row.email) {
                entry.push(row.email);
            }
        }

        Ok(directory)
    }

    pub fn insert(&mut self, unit: OperatingUnit, email: impl Into<String>) {
        let email = email.into();
        let entry = self.recipients.entry(unit).or_default();
        if !entry.contains(&email) {
            entry.push(email);
        }
    }

    /// `None` when the unit has no mapping row at all.
    pub fn recipients(&self, unit: OperatingUnit) -> Option<&[String]> {
        self.recipients.get(&unit).map(Vec::as_slice)
    }

    pub fn len(&self) -> usize {
        self.recipients.len()
    }

    pub fn is_empty(&self) -> bool {
        self.recipients.is_empty()
    }
}

/// Rendered decision email ready for a transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailMessage {
    pub from: String,
    pub to: Vec<String>,
    pub subject: String,
    pub html_body: String,
}

/// Outbound notification boundary so delivery can be swapped in tests.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, message: &EmailMessage) -> Result<(), NotifyError>;

    /// Whether a successful `send` reaches the recipients' mailboxes.
    fn delivers(&self) -> bool {
        true
    }
}

#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    #[error("notifier configuration error: {0}")]
    Config(String),
    #[error("invalid email address '{0}'")]
    Address(String),
    #[error("failed to build email: {0}")]
    Build(String),
    #[error("mail transport unavailable: {0}")]
    Transport(String),
}

/// STARTTLS SMTP delivery authenticated as the configured sender.
#[derive(Clone)]
pub struct SmtpNotifier {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    relay: String,
}

impl fmt::Debug for SmtpNotifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SmtpNotifier")
            .field("relay", &self.relay)
            .finish_non_exhaustive()
    }
}

impl SmtpNotifier {
    pub fn new(config: &MailConfig) -> Result<Self, NotifyError> {
        let password = config
            .password
            .clone()
            .ok_or_else(|| NotifyError::Config("EMAIL_PASSWORD is not set".to_string()))?;

        let transport = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.smtp_host)
            .map_err(|err| NotifyError::Config(err.to_string()))?
            .port(config.smtp_port)
            .credentials(Credentials::new(config.from_address.clone(), password))
            .build();

        Ok(Self {
            transport,
            relay: format!("{}:{}", config.smtp_host, config.smtp_port),
        })
    }
}

fn mailbox(address: &str) -> Result<Mailbox, NotifyError> {
    address
        .parse::<Mailbox>()
        .map_err(|_| NotifyError::Address(address.to_string()))
}

#[async_trait]
impl Notifier for SmtpNotifier {
    async fn send(&self, message: &EmailMessage) -> Result<(), NotifyError> {
        let mut builder = Message::builder()
            .from(mailbox(&message.from)?)
            .subject(message.subject.clone())
            .header(ContentType::TEXT_HTML);
        for recipient in &message.to {
            builder = builder.to(mailbox(recipient)?);
        }
        let email = builder
            .body(message.html_body.clone())
            .map_err(|err| NotifyError::Build(err.to_string()))?;

        self.transport
            .send(email)
            .await
            .map_err(|err| NotifyError::Transport(err.to_string()))?;

        info!(
            relay = %self.relay,
            to = %message.to.join(", "),
            subject = %message.subject,
            "email sent"
        );
        Ok(())
    }
}

/// Fallback used when no SMTP credentials are configured.
#[derive(Debug, Clone, Default)]
pub struct LoggingNotifier;

#[async_trait]
impl Notifier for LoggingNotifier {
    async fn send(&self, message: &EmailMessage) -> Result<(), NotifyError> {
        info!(
            from = %message.from,
            to = %message.to.join(", "),
            subject = %message.subject,
            body_bytes = message.html_body.len(),
            "email delivery disabled; notification logged only"
        );
        Ok(())
    }

    fn delivers(&self) -> bool {
        false
    }
}

pub fn decision_subject(request_id: &RequestId) -> String {
    format!("Qualification.ai Request Evaluation - Tracking ID: {request_id}")
}

/// Render the model's markdown response as an HTML email body.
pub fn render_html(markdown: &str) -> String {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_TABLES);
    options.insert(Options::ENABLE_STRIKETHROUGH);

    let parser = Parser::new_ext(markdown, options);
    let mut body = String::with_capacity(markdown.len() * 3 / 2);
    html::push_html(&mut body, parser);
    body
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "detail", rename_all = "snake_case")]
pub enum DeliveryStatus {
    Sent,
    Logged,
    NoRecipients,
    Failed(String),
    Unmapped,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UnitDelivery {
    pub operating_unit: OperatingUnit,
    pub recipients: Vec<String>,
    #[serde(flatten)]
    pub status: DeliveryStatus,
}

/// Per-unit outcome of a decision notification round.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct NotificationReport {
    pub deliveries: Vec<UnitDelivery>,
}

impl NotificationReport {
    /// Recipients of every successful delivery, first occurrence order.
    pub fn notified_recipients(&self) -> Vec<String> {
        let mut notified: Vec<String> = Vec::new();
        for delivery in &self.deliveries {
            if delivery.status != DeliveryStatus::Sent {
                continue;
            }
            for recipient in &delivery.recipients {
                if !notified.contains(recipient) {
                    notified.push(recipient.clone());
                }
            }
        }
        notified
    }

    pub fn failures(&self) -> usize {
        self.deliveries
            .iter()
            .filter(|delivery| matches!(delivery.status, DeliveryStatus::Failed(_)))
            .count()
    }
}

/// Send one decision email per selected operating unit; failures are recorded, not raised.
pub async fn notify_operating_units<N>(
    notifier: &N,
    directory: &OperatingUnitDirectory,
    from: &str,
    units: &[OperatingUnit],
    request_id: &RequestId,
    decision_markdown: &str,
) -> NotificationReport
where
    N: Notifier + ?Sized,
{
    let subject = decision_subject(request_id);
    let html_body = render_html(decision_markdown);
    let mut report = NotificationReport::default();
    let mut seen = Vec::new();

    for &unit in units {
        if seen.contains(&unit) {
            continue;
        }
        seen.push(unit);

        let Some(recipients) = directory.recipients(unit) else {
            warn!(%request_id, operating_unit = %unit, "operating unit has no mapping row");
            report.deliveries.push(UnitDelivery {
                operating_unit: unit,
                recipients: Vec::new(),
                status: DeliveryStatus::Unmapped,
            });
            continue;
        };

        if recipients.is_empty() {
            warn!(%request_id, operating_unit = %unit, "operating unit has no recipients");
            report.deliveries.push(UnitDelivery {
                operating_unit: unit,
                recipients: Vec::new(),
                status: DeliveryStatus::NoRecipients,
            });
            continue;
        }

        let message = EmailMessage {
            from: from.to_string(),
            to: recipients.to_vec(),
            subject: subject.clone(),
            html_body: html_body.clone(),
        };

        let status = match notifier.send(&message).await {
            Ok(()) if notifier.delivers() => DeliveryStatus::Sent,
            Ok(()) => DeliveryStatus::Logged,
            Err(err) => {
                warn!(%request_id, operating_unit = %unit, error = %err, "decision email failed");
                DeliveryStatus::Failed(err.to_string())
            }
        };

        report.deliveries.push(UnitDelivery {
            operating_unit: unit,
            recipients: message.to,
            status,
        });
    }

    report
}
