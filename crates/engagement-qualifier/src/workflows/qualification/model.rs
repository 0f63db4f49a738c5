use std::path::{Path, PathBuf};
use std::time::Instant;

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, warn};

use crate::config::ModelConfig;

/// Conversation turn exchanged with the language model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatTurn {
    pub role: ChatRole,
    pub content: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    System,
    User,
    Assistant,
}

impl ChatTurn {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::Assistant,
            content: content.into(),
        }
    }
}

/// One completion call: instructions, optional images and sampling controls.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelRequest {
    pub system_instruction: String,
    pub user_instruction: String,
    pub image_paths: Vec<PathBuf>,
    pub max_tokens: u32,
    pub temperature: Option<f32>,
    pub top_p: Option<f32>,
    pub seed: Option<u64>,
}

impl ModelRequest {
    pub fn new(system_instruction: impl Into<String>, user_instruction: impl Into<String>) -> Self {
        Self {
            system_instruction: system_instruction.into(),
            user_instruction: user_instruction.into(),
            image_paths: Vec::new(),
            max_tokens: 2000,
            temperature: None,
            top_p: None,
            seed: None,
        }
    }

    pub fn with_images(mut self, image_paths: Vec<PathBuf>) -> Self {
        self.image_paths = image_paths;
        self
    }

    pub fn max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn top_p(mut self, top_p: f32) -> Self {
        self.top_p = Some(top_p);
        self
    }

    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }
}

/// Hosted language model boundary used by the decision and chat workflows.
#[async_trait]
pub trait LanguageModel: Send + Sync {
    async fn complete(&self, request: ModelRequest) -> Result<String, ModelError>;
}

#[derive(Debug, thiserror::Error)]
pub enum ModelError {
    #[error("model configuration error: {0}")]
    Config(String),
    #[error("model network error: {0}")]
    Network(String),
    #[error("model API error: {0}")]
    Api(String),
    #[error("model response parse error: {0}")]
    Parse(String),
    #[error("unable to read image {path}: {source}")]
    Image {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Chat-completions client for an Azure OpenAI vision-capable deployment.
#[derive(Clone)]
pub struct AzureOpenAiClient {
    http_client: Client,
    endpoint: String,
    api_key: String,
    api_version: String,
    deployment: String,
}

impl std::fmt::Debug for AzureOpenAiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AzureOpenAiClient")
            .field("endpoint", &self.endpoint)
            .field("deployment", &self.deployment)
            .finish_non_exhaustive()
    }
}

impl AzureOpenAiClient {
    pub fn new(config: &ModelConfig) -> Result<Self, ModelError> {
        if config.api_key.trim().is_empty() {
            return Err(ModelError::Config("AZURE_AOAI_KEY is empty".to_string()));
        }
        if config.endpoint.trim().is_empty() {
            return Err(ModelError::Config(
                "AZURE_AOAI_API_ENDPOINT is empty".to_string(),
            ));
        }

        Ok(Self {
            http_client: Client::new(),
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            api_version: config.api_version.clone(),
            deployment: config.deployment.clone(),
        })
    }

    pub fn completions_url(&self) -> String {
        format!(
            "{}/openai/deployments/{}/chat/completions?api-version={}",
            self.endpoint, self.deployment, self.api_version
        )
    }

    async fn request_body(&self, request: &ModelRequest) -> Result<serde_json::Value, ModelError> {
        let mut content = vec![json!({ "type": "text", "text": request.user_instruction })];
        for path in &request.image_paths {
            content.push(json!({
                "type": "image_url",
                "image_url": { "url": image_data_url(path).await? },
            }));
        }

        let mut body = json!({
            "messages": [
                { "role": "system", "content": request.system_instruction },
                { "role": "user", "content": content },
            ],
            "max_tokens": request.max_tokens,
        });
        if let Some(temperature) = request.temperature {
            body["temperature"] = json!(temperature);
        }
        if let Some(top_p) = request.top_p {
            body["top_p"] = json!(top_p);
        }
        if let Some(seed) = request.seed {
            body["seed"] = json!(seed);
        }
        Ok(body)
    }
}

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    choices: Vec<CompletionChoice>,
}

#[derive(Debug, Deserialize)]
struct CompletionChoice {
    message: CompletionMessage,
}

#[derive(Debug, Deserialize)]
struct CompletionMessage {
    #[serde(default)]
    content: Option<String>,
}

#[async_trait]
impl LanguageModel for AzureOpenAiClient {
    async fn complete(&self, request: ModelRequest) -> Result<String, ModelError> {
        let start = Instant::now();
        let body = self.request_body(&request).await?;

        let response = self
            .http_client
            .post(self.completions_url())
            .header("api-key", &self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|err| {
                warn!(error = %err, "model request failed");
                ModelError::Network(err.to_string())
            })?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            warn!(%status, error = %error_text, "model API error");
            return Err(ModelError::Api(format!("{status}: {error_text}")));
        }

        let completion: CompletionResponse = response
            .json()
            .await
            .map_err(|err| ModelError::Parse(err.to_string()))?;

        let content = completion
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| ModelError::Api("no completion returned".to_string()))?;

        debug!(
            deployment = %self.deployment,
            images = request.image_paths.len(),
            duration_ms = start.elapsed().as_millis() as u64,
            "model completion"
        );

        Ok(content)
    }
}

async fn image_data_url(path: &Path) -> Result<String, ModelError> {
    let bytes = tokio::fs::read(path).await.map_err(|source| ModelError::Image {
        path: path.to_path_buf(),
        source,
    })?;
    let mime = mime_guess::from_path(path).first_or(mime::IMAGE_PNG);
    Ok(format!("data:{mime};base64,{}", STANDARD.encode(bytes)))
}

/// Whether a stored attachment should be forwarded to the model as an image.
pub fn is_image(path: &Path) -> bool {
    mime_guess::from_path(path)
        .first()
        .map(|mime| mime.type_() == mime::IMAGE)
        .unwrap_or(false)
}
