//! Together AI chat completions through rig's provider client.

use super::{ChatModel, ModelError, with_timeout};
use crate::models::{ChatRole, ChatTurn};
use async_trait::async_trait;
use rig::{
    agent::Agent,
    client::CompletionClient,
    completion::{Chat, Message},
    providers::together::{self, completion::CompletionModel},
};
use std::time::Duration;
use tracing::{debug, info};

pub const TOGETHER_CHAT_MODEL: &str = "meta-llama/Llama-3.3-70B-Instruct-Turbo";

pub struct TogetherChat {
    agent: Agent<CompletionModel>,
    timeout: Duration,
}

impl TogetherChat {
    pub fn new(api_key: &str, timeout: Duration) -> Self {
        let client = together::Client::new(api_key);
        // No preamble: the whole instruction travels in the user message.
        let agent = client.agent(TOGETHER_CHAT_MODEL).build();
        Self { agent, timeout }
    }
}

pub fn to_rig_message(turn: &ChatTurn) -> Message {
    match turn.role {
        ChatRole::User => Message::user(turn.content.clone()),
        ChatRole::Assistant => Message::assistant(turn.content.clone()),
    }
}

pub fn to_rig_messages(history: &[ChatTurn]) -> Vec<Message> {
    history.iter().map(to_rig_message).collect()
}

#[async_trait]
impl ChatModel for TogetherChat {
    async fn complete(&self, prompt: &str, history: &[ChatTurn]) -> Result<String, ModelError> {
        debug!(
            model = TOGETHER_CHAT_MODEL,
            history_len = history.len(),
            "Calling Together chat completion"
        );

        let messages = to_rig_messages(history);
        let response = with_timeout(self.timeout, async {
            self.agent
                .chat(prompt, messages)
                .await
                .map_err(|e| ModelError::Provider(e.to_string()))
        })
        .await?;

        if response.trim().is_empty() {
            return Err(ModelError::MissingOutput("empty completion".to_string()));
        }

        info!(
            model = TOGETHER_CHAT_MODEL,
            output_len = response.len(),
            "Together chat completion finished"
        );
        Ok(response)
    }
}
