use crate::llm::{ChatModel, ModelError, TextModel};
use crate::models::ChatTurn;
use crate::prompts::{caption_prompt, chat_prompt};
use std::sync::Arc;
use tracing::info;

/// Conversational answers for typed questions and for image captions.
#[derive(Clone)]
pub struct ChatResponder {
    chat_model: Arc<dyn ChatModel>,
    caption_model: Arc<dyn TextModel>,
}

impl ChatResponder {
    pub fn new(chat_model: Arc<dyn ChatModel>, caption_model: Arc<dyn TextModel>) -> Self {
        Self {
            chat_model,
            caption_model,
        }
    }

    pub async fn respond(&self, query: &str, history: &[ChatTurn]) -> Result<String, ModelError> {
        info!(
            query_len = query.len(),
            history_len = history.len(),
            "Answering text query"
        );
        let prompt = chat_prompt(query, !history.is_empty());
        self.chat_model.complete(&prompt, history).await
    }

    pub async fn respond_to_caption(&self, caption: &str) -> Result<String, ModelError> {
        info!(caption = %caption, "Answering image caption");
        let prompt = caption_prompt(caption);
        let text = self.caption_model.generate(&prompt).await?;
        Ok(text.trim().to_string())
    }
}
