//! OpenAI-compatible chat-completion backend

use super::{ChatMessage, ChatModel};
use crate::config::Config;
use crate::error::{Error, Result};
use crate::openai::OpenAiClient;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

#[derive(Debug, Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

/// Chat model backed by the `/chat/completions` endpoint
pub struct OpenAiChatModel {
    client: OpenAiClient,
    model: String,
    temperature: f32,
    max_tokens: Option<u32>,
}

impl OpenAiChatModel {
    pub fn new(client: OpenAiClient, model: impl Into<String>, temperature: f32) -> Self {
        Self {
            client,
            model: model.into(),
            temperature,
            max_tokens: None,
        }
    }

    pub fn with_max_tokens(mut self, max_tokens: Option<u32>) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    /// Build a chat model from the `[llm]` config section
    pub fn from_config(config: &Config, client: OpenAiClient) -> Self {
        Self::new(client, config.llm.model.clone(), config.llm.temperature)
            .with_max_tokens(config.llm.max_tokens)
    }
}

#[async_trait]
impl ChatModel for OpenAiChatModel {
    async fn complete(&self, messages: &[ChatMessage]) -> Result<String> {
        let body = CompletionRequest {
            model: &self.model,
            messages,
            temperature: self.temperature,
            max_tokens: self.max_tokens,
        };
        let request = self.client.post("chat/completions")?.json(&body);

        let response: CompletionResponse = self
            .client
            .send_json(request)
            .await
            .map_err(|e| Error::Llm(e.to_string()))?;

        let content = response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| Error::Llm("completion contained no message content".to_string()))?;

        debug!(model = %self.model, chars = content.len(), "Completion received");
        Ok(content.trim().to_string())
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}
