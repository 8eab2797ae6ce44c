pub mod gemini;
pub mod huggingface;
pub mod together;

use crate::models::ChatTurn;
use async_trait::async_trait;
use std::future::Future;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

pub use gemini::GeminiClient;
pub use huggingface::HuggingFaceCaptioner;
pub use together::TogetherChat;

#[derive(Debug, Error)]
pub enum ModelError {
    #[error("model call timed out after {0:?}")]
    Timeout(Duration),

    #[error("request to model provider failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("model provider returned {status}: {body}")]
    Status {
        status: reqwest::StatusCode,
        body: String,
    },

    #[error("model response had no usable output: {0}")]
    MissingOutput(String),

    #[error("model provider error: {0}")]
    Provider(String),

    #[error("failed to read input for model: {0}")]
    Io(#[from] std::io::Error),
}

/// Single-prompt text generation.
#[async_trait]
pub trait TextModel: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<String, ModelError>;
}

/// Chat completion with optional earlier turns.
#[async_trait]
pub trait ChatModel: Send + Sync {
    async fn complete(&self, prompt: &str, history: &[ChatTurn]) -> Result<String, ModelError>;
}

/// Image-to-text captioning of a file already saved on local disk.
#[async_trait]
pub trait ImageCaptioner: Send + Sync {
    async fn caption(&self, image_path: &Path) -> Result<String, ModelError>;
}

pub(crate) async fn with_timeout<T, F>(limit: Duration, call: F) -> Result<T, ModelError>
where
    F: Future<Output = Result<T, ModelError>>,
{
    tokio::time::timeout(limit, call)
        .await
        .map_err(|_| ModelError::Timeout(limit))?
}

pub(crate) async fn ensure_success(
    response: reqwest::Response,
) -> Result<reqwest::Response, ModelError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(ModelError::Status { status, body })
}
