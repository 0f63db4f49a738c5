use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::Local;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info};

use super::domain::AttachmentUpload;
use super::model::{is_image, ChatTurn, LanguageModel, ModelError, ModelRequest};
use super::prompts::{
    query_translation_prompt, response_processor_prompt, CHAT_SYSTEM_MESSAGE,
    QUERY_TRANSLATOR_SYSTEM_MESSAGE,
};
use super::repository::{RepositoryError, RequestRepository};
use super::uploads::{AttachmentError, AttachmentStore};
use crate::store::query::{clean_model_query, QueryError, RecordQuery};

const TRANSLATION_MAX_TOKENS: u32 = 450;
const TRANSLATION_TEMPERATURE: f32 = 0.7;
const TRANSLATION_TOP_P: f32 = 1.0;
const ANSWER_MAX_TOKENS: u32 = 2000;
const ANSWER_SEED: u64 = 42;

/// A natural-language question about stored requests.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatQuestion {
    pub question: String,
    #[serde(default)]
    pub history: Vec<ChatTurn>,
    #[serde(default)]
    pub images: Vec<AttachmentUpload>,
}

/// Answer plus the query that produced it and the rows it matched.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatReply {
    pub answer: String,
    pub query: String,
    pub records: Vec<Value>,
    pub history: Vec<ChatTurn>,
}

/// Answers questions by translating them into store queries and summarizing the results.
pub struct RequestChatService<M, R> {
    model: Arc<M>,
    repository: Arc<R>,
    attachments: AttachmentStore,
}

impl<M, R> RequestChatService<M, R>
where
    M: LanguageModel + 'static,
    R: RequestRepository + 'static,
{
    pub fn new(model: Arc<M>, repository: Arc<R>, upload_dir: impl Into<PathBuf>) -> Self {
        Self {
            model,
            repository,
            attachments: AttachmentStore::new(upload_dir),
        }
    }

    pub async fn ask(&self, question: ChatQuestion) -> Result<ChatReply, ChatServiceError> {
        let ChatQuestion {
            question,
            mut history,
            images,
        } = question;
        let question = question.trim().to_string();
        if question.is_empty() {
            return Err(ChatServiceError::EmptyQuestion);
        }

        let image_paths = self.save_images(&images).await?;

        let translation = ModelRequest::new(
            QUERY_TRANSLATOR_SYSTEM_MESSAGE,
            query_translation_prompt(&question),
        )
        .with_images(image_paths.clone())
        .max_tokens(TRANSLATION_MAX_TOKENS)
        .temperature(TRANSLATION_TEMPERATURE)
        .top_p(TRANSLATION_TOP_P);
        let raw_query = self.model.complete(translation).await?;

        let query = clean_model_query(&raw_query);
        info!(%query, "translated question into request query");
        let parsed = RecordQuery::parse(&query).map_err(|source| ChatServiceError::Query {
            query: query.clone(),
            source,
        })?;

        let records = self.repository.query(&parsed)?;
        debug!(rows = records.len(), "request query returned rows");

        let json_response = serde_json::to_string_pretty(&records)
            .map_err(|err| ModelError::Parse(err.to_string()))?;
        let answer_request = ModelRequest::new(
            CHAT_SYSTEM_MESSAGE,
            response_processor_prompt(&question, &json_response),
        )
        .with_images(image_paths)
        .max_tokens(ANSWER_MAX_TOKENS)
        .seed(ANSWER_SEED);
        let answer = self.model.complete(answer_request).await?;

        history.push(ChatTurn::user(question));
        history.push(ChatTurn::assistant(answer.clone()));

        Ok(ChatReply {
            answer,
            query,
            records,
            history,
        })
    }

    async fn save_images(
        &self,
        uploads: &[AttachmentUpload],
    ) -> Result<Vec<PathBuf>, ChatServiceError> {
        let today = Local::now().date_naive();
        let mut paths = Vec::with_capacity(uploads.len());
        for upload in uploads {
            if !is_image(Path::new(&upload.file_name)) {
                return Err(ChatServiceError::NotAnImage(upload.file_name.clone()));
            }
            paths.push(self.attachments.save(upload, today).await?);
        }
        Ok(paths)
    }
}

/// Error raised by the chat service.
#[derive(Debug, thiserror::Error)]
pub enum ChatServiceError {
    #[error("question must not be empty")]
    EmptyQuestion,
    #[error("chat uploads must be images, got '{0}'")]
    NotAnImage(String),
    #[error(transparent)]
    Attachment(#[from] AttachmentError),
    #[error(transparent)]
    Model(#[from] ModelError),
    #[error("model produced an unusable query '{query}': {source}")]
    Query { query: String, source: QueryError },
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}
