//! OpenAI-compatible chat completion backend.

use super::{clean_response, Generator, TokenCounter};
use crate::config::GenerationSettings;
use crate::error::{DocketError, Result};
use crate::openai::create_client;
use async_openai::types::{ChatCompletionRequestUserMessageArgs, CreateChatCompletionRequestArgs};
use async_trait::async_trait;
use tracing::{debug, instrument};

/// Sequences that end a completion early.
const STOP_SEQUENCES: [&str; 3] = ["###", "Human:", "Assistant:"];

/// Generator backed by an OpenAI-compatible chat completions endpoint.
pub struct OpenAiGenerator {
    client: async_openai::Client<async_openai::config::OpenAIConfig>,
    model: String,
    temperature: f32,
    top_p: f32,
}

impl OpenAiGenerator {
    /// Create a generator for `model` with default sampling.
    pub fn new(model: &str) -> Result<Self> {
        Ok(Self {
            client: create_client()?,
            model: model.to_string(),
            temperature: 0.1,
            top_p: 0.9,
        })
    }

    /// Create a generator from settings.
    pub fn from_settings(settings: &GenerationSettings) -> Result<Self> {
        Ok(Self {
            client: create_client()?,
            model: settings.model.clone(),
            temperature: settings.temperature,
            top_p: settings.top_p,
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

impl TokenCounter for OpenAiGenerator {}

#[async_trait]
impl Generator for OpenAiGenerator {
    #[instrument(skip(self, prompt), fields(model = %self.model, prompt_words = self.count_tokens(prompt)))]
    async fn generate(&self, prompt: &str, max_tokens: u32) -> Result<String> {
        let message = ChatCompletionRequestUserMessageArgs::default()
            .content(prompt)
            .build()
            .map_err(|e| DocketError::Generation(e.to_string()))?;

        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.model)
            .messages(vec![message.into()])
            .max_tokens(max_tokens)
            .temperature(self.temperature)
            .top_p(self.top_p)
            .stop(STOP_SEQUENCES.iter().map(|s| s.to_string()).collect::<Vec<_>>())
            .build()
            .map_err(|e| DocketError::Generation(e.to_string()))?;

        let response = self.client.chat().create(request).await.map_err(|e| {
            DocketError::OpenAI(format!("Failed to generate response: {}", e))
        })?;

        let text = response
            .choices
            .first()
            .and_then(|c| c.message.content.as_ref())
            .ok_or_else(|| DocketError::Generation("Empty response from model".to_string()))?;

        debug!("Generated {} characters", text.len());
        Ok(clean_response(text))
    }
}
