//! Testing utilities including mock implementations.
//!
//! Useful for testing applications that drive the pipeline without making
//! real language model calls.

use std::collections::VecDeque;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;

use crate::error::{AnnotationError, Result};
use crate::traits::model::{LanguageModel, LanguageModelFactory};
use crate::types::prompt::{CompletionMessage, Prompt};
use crate::types::workflow::LanguageModelSpecification;

/// A scripted response for the mock model.
#[derive(Debug, Clone)]
enum ScriptedResponse {
    Completion(String),
    Failure(String),
}

/// A mock language model for testing.
///
/// Responses are scripted in order: each invocation consumes the next
/// completion or failure from the queue. When the queue is empty, a
/// neutral `{"answer": []}` completion is returned. Every invocation's
/// prompt is recorded for assertions.
pub struct MockLanguageModel {
    specification: LanguageModelSpecification,
    responses: Arc<RwLock<VecDeque<ScriptedResponse>>>,
    invocations: Arc<RwLock<Vec<Prompt>>>,
}

impl Default for MockLanguageModel {
    fn default() -> Self {
        Self::new()
    }
}

impl MockLanguageModel {
    /// Create a new mock model with a neutral specification.
    pub fn new() -> Self {
        Self {
            specification: LanguageModelSpecification::new("mock", "mock-model"),
            responses: Arc::new(RwLock::new(VecDeque::new())),
            invocations: Arc::new(RwLock::new(Vec::new())),
        }
    }

    pub fn with_specification(mut self, specification: LanguageModelSpecification) -> Self {
        self.specification = specification;
        self
    }

    /// Queue a completion to return.
    pub fn with_completion(self, content: impl Into<String>) -> Self {
        self.responses
            .write()
            .unwrap()
            .push_back(ScriptedResponse::Completion(content.into()));
        self
    }

    /// Queue an invocation failure.
    pub fn with_failure(self, message: impl Into<String>) -> Self {
        self.responses
            .write()
            .unwrap()
            .push_back(ScriptedResponse::Failure(message.into()));
        self
    }

    /// Every prompt sent to this mock, in order.
    pub fn invocations(&self) -> Vec<Prompt> {
        self.invocations.read().unwrap().clone()
    }

    /// Number of invocations made.
    pub fn invocation_count(&self) -> usize {
        self.invocations.read().unwrap().len()
    }
}

#[async_trait]
impl LanguageModel for MockLanguageModel {
    fn specification(&self) -> &LanguageModelSpecification {
        &self.specification
    }

    async fn invoke(&self, prompt: &Prompt) -> Result<CompletionMessage> {
        self.invocations.write().unwrap().push(prompt.clone());

        match self.responses.write().unwrap().pop_front() {
            Some(ScriptedResponse::Completion(content)) => Ok(CompletionMessage::new(content)),
            Some(ScriptedResponse::Failure(message)) => Err(AnnotationError::model(message)),
            None => Ok(CompletionMessage::new(r#"{"answer": []}"#)),
        }
    }
}

/// A factory handing out one shared mock model, regardless of the
/// requested specification.
pub struct MockLanguageModelFactory {
    model: Arc<MockLanguageModel>,
    /// Specification identifiers that should fail to instantiate.
    fail_specifications: Vec<String>,
}

impl MockLanguageModelFactory {
    pub fn new(model: MockLanguageModel) -> Self {
        Self {
            model: Arc::new(model),
            fail_specifications: Vec::new(),
        }
    }

    /// Mark a specification identifier as failing to instantiate.
    pub fn fail_specification(mut self, identifier: impl Into<String>) -> Self {
        self.fail_specifications.push(identifier.into());
        self
    }

    /// The shared mock, for assertions after a run.
    pub fn model(&self) -> &MockLanguageModel {
        &self.model
    }
}

impl LanguageModelFactory for MockLanguageModelFactory {
    fn create(&self, specification: &LanguageModelSpecification) -> Result<Arc<dyn LanguageModel>> {
        if self.fail_specifications.contains(&specification.identifier) {
            return Err(AnnotationError::unresolved_language_model(
                &specification.identifier,
            ));
        }
        Ok(self.model.clone())
    }

    fn default_model(&self) -> Result<Arc<dyn LanguageModel>> {
        Ok(self.model.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::prompt::PromptMessage;

    #[tokio::test]
    async fn mock_model_replays_scripted_responses_in_order() {
        let model = MockLanguageModel::new()
            .with_completion("first")
            .with_failure("boom")
            .with_completion("third");

        let prompt = Prompt::new(vec![PromptMessage::user("q")]);

        assert_eq!(model.invoke(&prompt).await.unwrap().content, "first");
        let err = model.invoke(&prompt).await.unwrap_err();
        assert!(err.to_string().contains("boom"));
        assert_eq!(model.invoke(&prompt).await.unwrap().content, "third");
        assert_eq!(model.invocation_count(), 3);
    }

    #[tokio::test]
    async fn exhausted_script_falls_back_to_empty_answer() {
        let model = MockLanguageModel::new();
        let completion = model.invoke(&Prompt::default()).await.unwrap();
        assert_eq!(completion.content, r#"{"answer": []}"#);
    }

    #[test]
    fn factory_can_fail_named_specifications() {
        let factory = MockLanguageModelFactory::new(MockLanguageModel::new())
            .fail_specification("broken-model");

        let ok = factory.create(&LanguageModelSpecification::new("fine", "m"));
        assert!(ok.is_ok());

        let err = factory
            .create(&LanguageModelSpecification::new("broken-model", "m"))
            .err()
            .unwrap();
        assert!(err.to_string().contains("broken-model"));
    }
}
