use super::{ImageCaptioner, ModelError, ensure_success, with_timeout};
use async_trait::async_trait;
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;
use tracing::info;

pub const CAPTION_MODEL: &str = "Salesforce/blip-image-captioning-large";

#[derive(Debug, Deserialize)]
struct Generated {
    generated_text: String,
}

// The inference API answers with a list for this task but some deployments
// return the bare object.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum CaptionPayload {
    Many(Vec<Generated>),
    One(Generated),
}

/// HuggingFace hosted inference for image-to-text.
pub struct HuggingFaceCaptioner {
    http: reqwest::Client,
    base_url: String,
    token: String,
    model: String,
    timeout: Duration,
}

impl HuggingFaceCaptioner {
    pub fn new(
        http: reqwest::Client,
        base_url: impl Into<String>,
        token: impl Into<String>,
        timeout: Duration,
    ) -> Self {
        Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: token.into(),
            model: CAPTION_MODEL.to_string(),
            timeout,
        }
    }

    async fn send(&self, image_path: &Path) -> Result<String, ModelError> {
        let bytes = tokio::fs::read(image_path).await?;
        let content_type = image::guess_format(&bytes)
            .map(|format| format.to_mime_type())
            .unwrap_or("application/octet-stream");

        let response = self
            .http
            .post(format!("{}/models/{}", self.base_url, self.model))
            .bearer_auth(&self.token)
            .header("Content-Type", content_type)
            .body(bytes)
            .send()
            .await?;

        let payload: CaptionPayload = ensure_success(response).await?.json().await?;
        let caption = match payload {
            CaptionPayload::Many(items) => items.into_iter().next(),
            CaptionPayload::One(item) => Some(item),
        }
        .map(|generated| generated.generated_text.trim().to_string())
        .unwrap_or_default();

        Ok(caption)
    }
}

#[async_trait]
impl ImageCaptioner for HuggingFaceCaptioner {
    /// Returns the top caption, which may be empty if the model produced none.
    async fn caption(&self, image_path: &Path) -> Result<String, ModelError> {
        let caption = with_timeout(self.timeout, self.send(image_path)).await?;
        info!(model = %self.model, caption = %caption, "Image captioned");
        Ok(caption)
    }
}
