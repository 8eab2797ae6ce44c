use super::{ModelError, TextModel, ensure_success, with_timeout};
use async_trait::async_trait;
use serde::Serialize;
use serde_json::{Value, json};
use std::time::Duration;
use tracing::{debug, info};

pub const GEMINI_MODEL: &str = "gemini-2.0-flash-exp";

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationConfig {
    pub temperature: f64,
    pub top_p: f64,
    pub top_k: u32,
    pub max_output_tokens: u32,
    pub response_mime_type: String,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            temperature: 1.0,
            top_p: 0.95,
            top_k: 40,
            max_output_tokens: 8192,
            response_mime_type: "text/plain".to_string(),
        }
    }
}

/// Gemini `generateContent` over REST.
pub struct GeminiClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
    generation: GenerationConfig,
    timeout: Duration,
}

impl GeminiClient {
    pub fn new(
        http: reqwest::Client,
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        timeout: Duration,
    ) -> Self {
        Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            model: GEMINI_MODEL.to_string(),
            generation: GenerationConfig::default(),
            timeout,
        }
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url, self.model
        )
    }

    async fn send(&self, prompt: &str) -> Result<String, ModelError> {
        let payload = json!({
            "contents": [
                {
                    "role": "user",
                    "parts": [{ "text": prompt }]
                }
            ],
            "generationConfig": self.generation,
        });

        let response = self
            .http
            .post(self.endpoint())
            .header("x-goog-api-key", &self.api_key)
            .json(&payload)
            .send()
            .await?;

        let response_json: Value = ensure_success(response).await?.json().await?;
        extract_text(&response_json)
    }
}

#[async_trait]
impl TextModel for GeminiClient {
    async fn generate(&self, prompt: &str) -> Result<String, ModelError> {
        debug!(model = %self.model, prompt_len = prompt.len(), "Calling Gemini");
        let text = with_timeout(self.timeout, self.send(prompt)).await?;
        info!(model = %self.model, output_len = text.len(), "Gemini generation completed");
        Ok(text)
    }
}

fn extract_text(response: &Value) -> Result<String, ModelError> {
    if let Some(reason) = response["promptFeedback"]["blockReason"].as_str() {
        return Err(ModelError::MissingOutput(format!(
            "prompt blocked: {reason}"
        )));
    }

    let parts = response["candidates"][0]["content"]["parts"]
        .as_array()
        .ok_or_else(|| {
            let finish = response["candidates"][0]["finishReason"]
                .as_str()
                .unwrap_or("no candidates");
            ModelError::MissingOutput(format!("no content parts ({finish})"))
        })?;

    let text: String = parts
        .iter()
        .filter_map(|part| part["text"].as_str())
        .collect();

    let text = text.trim();
    if text.is_empty() {
        return Err(ModelError::MissingOutput("empty text".to_string()));
    }
    Ok(text.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::{Matcher, Server};

    const PATH: &str = "/v1beta/models/gemini-2.0-flash-exp:generateContent";

    fn client(base_url: &str) -> GeminiClient {
        GeminiClient::new(
            reqwest::Client::new(),
            base_url,
            "test-key",
            Duration::from_secs(5),
        )
    }

    #[tokio::test]
    async fn test_generate_sends_sampling_config() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", PATH)
            .match_header("x-goog-api-key", "test-key")
            .match_body(Matcher::PartialJson(json!({
                "generationConfig": {
                    "temperature": 1.0,
                    "topP": 0.95,
                    "topK": 40,
                    "maxOutputTokens": 8192,
                    "responseMimeType": "text/plain"
                }
            })))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                r#"{"candidates":[{"content":{"parts":[{"text":"  Rest and hydrate.  "}]}}]}"#,
            )
            .create_async()
            .await;

        let text = client(&server.url()).generate("hello").await.unwrap();

        assert_eq!(text, "Rest and hydrate.");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_generate_non_success_status() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("POST", PATH)
            .with_status(429)
            .with_body("quota exceeded")
            .create_async()
            .await;

        let err = client(&server.url()).generate("hello").await.unwrap_err();

        match err {
            ModelError::Status { status, body } => {
                assert_eq!(status.as_u16(), 429);
                assert_eq!(body, "quota exceeded");
            }
            other => panic!("Expected Status error, got: {other:?}"),
        }
    }

    #[test]
    fn test_extract_text_blocked_prompt() {
        let response = json!({ "promptFeedback": { "blockReason": "SAFETY" } });
        assert!(matches!(
            extract_text(&response),
            Err(ModelError::MissingOutput(_))
        ));
    }

    #[test]
    fn test_extract_text_joins_parts() {
        let response = json!({
            "candidates": [{ "content": { "parts": [{ "text": "a" }, { "text": "b" }] } }]
        });
        assert_eq!(extract_text(&response).unwrap(), "ab");
    }
}
