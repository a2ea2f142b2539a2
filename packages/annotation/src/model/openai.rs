//! Reference OpenAI chat-completions backend.
//!
//! This is the infrastructure implementation of the `LanguageModel`
//! trait. What to prompt for lives in the pipeline; this module only
//! handles transport and response unwrapping.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::credentials::SecretString;
use crate::error::{AnnotationError, Result};
use crate::traits::model::{LanguageModel, LanguageModelFactory};
use crate::types::prompt::{CompletionMessage, Prompt, Role};
use crate::types::workflow::LanguageModelSpecification;

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    content: Option<String>,
}

fn role_name(role: Role) -> &'static str {
    match role {
        Role::System => "system",
        Role::User => "user",
        Role::Assistant => "assistant",
    }
}

/// A language model backed by the OpenAI chat-completions REST API.
pub struct OpenAiLanguageModel {
    http_client: reqwest::Client,
    api_key: SecretString,
    base_url: String,
    specification: LanguageModelSpecification,
}

impl OpenAiLanguageModel {
    pub fn new(api_key: SecretString, specification: LanguageModelSpecification) -> Self {
        Self {
            http_client: reqwest::Client::new(),
            api_key,
            base_url: DEFAULT_BASE_URL.to_string(),
            specification,
        }
    }

    /// Create from the `OPENAI_API_KEY` environment variable.
    pub fn from_env(specification: LanguageModelSpecification) -> Result<Self> {
        let api_key = std::env::var("OPENAI_API_KEY")
            .map_err(|_| AnnotationError::Config("OPENAI_API_KEY not set".into()))?;
        Ok(Self::new(SecretString::new(api_key), specification))
    }

    /// Set a custom base URL (for proxies or compatible providers).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }
}

#[async_trait]
impl LanguageModel for OpenAiLanguageModel {
    fn specification(&self) -> &LanguageModelSpecification {
        &self.specification
    }

    async fn invoke(&self, prompt: &Prompt) -> Result<CompletionMessage> {
        let request = ChatRequest {
            model: &self.specification.api_identifier,
            messages: prompt
                .messages
                .iter()
                .map(|m| ChatMessage {
                    role: role_name(m.role),
                    content: &m.content,
                })
                .collect(),
        };

        debug!(
            model = %self.specification.api_identifier,
            message_count = prompt.len(),
            "invoking chat completion"
        );

        let response = self
            .http_client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(self.api_key.expose())
            .json(&request)
            .send()
            .await
            .map_err(AnnotationError::model)?
            .error_for_status()
            .map_err(AnnotationError::model)?;

        let body: ChatResponse = response.json().await.map_err(AnnotationError::model)?;

        let content = body
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| AnnotationError::model("completion had no choices"))?;

        Ok(CompletionMessage::new(content))
    }
}

/// Builds OpenAI-backed language models from specifications.
pub struct OpenAiModelFactory {
    api_key: SecretString,
    base_url: String,
    default_specification: LanguageModelSpecification,
}

impl OpenAiModelFactory {
    pub fn new(api_key: SecretString, default_specification: LanguageModelSpecification) -> Self {
        Self {
            api_key,
            base_url: DEFAULT_BASE_URL.to_string(),
            default_specification,
        }
    }

    /// Create from the `OPENAI_API_KEY` environment variable.
    pub fn from_env(default_specification: LanguageModelSpecification) -> Result<Self> {
        let api_key = std::env::var("OPENAI_API_KEY")
            .map_err(|_| AnnotationError::Config("OPENAI_API_KEY not set".into()))?;
        Ok(Self::new(SecretString::new(api_key), default_specification))
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    fn build(&self, specification: LanguageModelSpecification) -> Arc<dyn LanguageModel> {
        Arc::new(
            OpenAiLanguageModel::new(self.api_key.clone(), specification)
                .with_base_url(self.base_url.clone()),
        )
    }
}

impl LanguageModelFactory for OpenAiModelFactory {
    fn create(&self, specification: &LanguageModelSpecification) -> Result<Arc<dyn LanguageModel>> {
        Ok(self.build(specification.clone()))
    }

    fn default_model(&self) -> Result<Arc<dyn LanguageModel>> {
        Ok(self.build(self.default_specification.clone()))
    }
}
