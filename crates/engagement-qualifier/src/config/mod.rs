use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;

/// Distinguishes runtime behavior for different stages of the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnvironment {
    Development,
    Test,
    Production,
}

impl AppEnvironment {
    fn from_str(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "prod" | "production" => Self::Production,
            "test" | "ci" => Self::Test,
            _ => Self::Development,
        }
    }
}

/// Top-level configuration for the application.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: AppEnvironment,
    pub server: ServerConfig,
    pub telemetry: TelemetryConfig,
    pub model: Option<ModelConfig>,
    pub mail: MailConfig,
    pub storage: StorageConfig,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let environment = AppEnvironment::from_str(
            &env::var("APP_ENV").unwrap_or_else(|_| "development".to_string()),
        );

        let host = env::var("APP_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env::var("APP_PORT")
            .unwrap_or_else(|_| "3000".to_string())
            .parse::<u16>()
            .map_err(|_| ConfigError::InvalidPort)?;

        let log_level = env::var("APP_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        Ok(Self {
            environment,
            server: ServerConfig { host, port },
            telemetry: TelemetryConfig { log_level },
            model: ModelConfig::from_env(),
            mail: MailConfig::from_env()?,
            storage: StorageConfig::from_env(),
        })
    }

    /// Model settings, required before any evaluation can run.
    pub fn require_model(&self) -> Result<&ModelConfig, ConfigError> {
        self.model.as_ref().ok_or(ConfigError::MissingModel)
    }
}

/// Settings controlling the HTTP server binding.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl ServerConfig {
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        if self.host.eq_ignore_ascii_case("localhost") {
            return Ok(SocketAddr::new(IpAddr::from([127, 0, 0, 1]), self.port));
        }

        let ip: IpAddr = self
            .host
            .parse()
            .map_err(|source| ConfigError::InvalidHost { source })?;

        Ok(SocketAddr::new(ip, self.port))
    }
}

/// Tracing controls.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
}

/// Azure OpenAI deployment used for decisions and chat.
#[derive(Debug, Clone)]
pub struct ModelConfig {
    pub endpoint: String,
    pub api_key: String,
    pub api_version: String,
    pub deployment: String,
}

impl ModelConfig {
    fn from_env() -> Option<Self> {
        let api_key = env::var("AZURE_AOAI_KEY").ok()?;
        let endpoint = env::var("AZURE_AOAI_API_ENDPOINT").ok()?;
        let api_version = env::var("AZURE_AOAI_API_VERSION")
            .unwrap_or_else(|_| "2024-02-15-preview".to_string());
        let deployment = env::var("AZURE_AOAI_CHAT_MODEL_NAME_DEPLOYMENT_ID")
            .unwrap_or_else(|_| "gpt-4-vision".to_string());

        Some(Self {
            endpoint,
            api_key,
            api_version,
            deployment,
        })
    }
}

/// Outbound SMTP settings; without a password notifications are only logged.
#[derive(Debug, Clone)]
pub struct MailConfig {
    pub from_address: String,
    pub password: Option<String>,
    pub smtp_host: String,
    pub smtp_port: u16,
    pub ou_mapping_csv: Option<PathBuf>,
}

impl MailConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let from_address =
            env::var("EMAIL_FROM").unwrap_or_else(|_| "qualification@example.com".to_string());
        let password = env::var("EMAIL_PASSWORD")
            .ok()
            .filter(|value| !value.is_empty());
        let smtp_host = env::var("SMTP_HOST").unwrap_or_else(|_| "smtp.office365.com".to_string());
        let smtp_port = env::var("SMTP_PORT")
            .unwrap_or_else(|_| "587".to_string())
            .parse::<u16>()
            .map_err(|_| ConfigError::InvalidSmtpPort)?;
        let ou_mapping_csv = env::var("OU_MAPPING_CSV").ok().map(PathBuf::from);

        Ok(Self {
            from_address,
            password,
            smtp_host,
            smtp_port,
            ou_mapping_csv,
        })
    }
}

/// Where attachments and the request snapshot live on disk.
#[derive(Debug, Clone)]
pub struct StorageConfig {
    pub upload_dir: PathBuf,
    pub store_path: Option<PathBuf>,
}

impl StorageConfig {
    fn from_env() -> Self {
        let upload_dir = env::var("UPLOAD_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("utils").join("uploads"));
        let store_path = env::var("STORE_PATH").ok().map(PathBuf::from);

        Self {
            upload_dir,
            store_path,
        }
    }
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidSmtpPort,
    InvalidHost { source: std::net::AddrParseError },
    MissingModel,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "APP_PORT must be a valid u16"),
            ConfigError::InvalidSmtpPort => write!(f, "SMTP_PORT must be a valid u16"),
            ConfigError::InvalidHost { .. } => {
                write!(f, "APP_HOST must parse to an IPv4 or IPv6 address")
            }
            ConfigError::MissingModel => write!(
                f,
                "AZURE_AOAI_KEY and AZURE_AOAI_API_ENDPOINT must be set to evaluate requests"
            ),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidHost { source } => Some(source),
            ConfigError::InvalidPort
            | ConfigError::InvalidSmtpPort
            | ConfigError::MissingModel => None,
        }
    }
}
