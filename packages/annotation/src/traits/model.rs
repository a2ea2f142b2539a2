//! Language model abstraction.
//!
//! Implementations wrap a specific provider (OpenAI, a local runtime,
//! a mock) and handle transport, authentication, and retries. The
//! pipeline only needs "prompt in, completion or error out" plus a
//! specification for provenance.

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::Result;
use crate::types::prompt::{CompletionMessage, Prompt};
use crate::types::workflow::LanguageModelSpecification;

/// A language model the pipeline can invoke.
#[async_trait]
pub trait LanguageModel: Send + Sync {
    /// The specification identifying this model, recorded as provenance
    /// on every invocation.
    fn specification(&self) -> &LanguageModelSpecification;

    /// Send a prompt and return the model's completion.
    async fn invoke(&self, prompt: &Prompt) -> Result<CompletionMessage>;
}

/// Creates language model instances from specifications.
///
/// Which concrete model to use is the caller's policy; the engine only
/// asks the factory for an instance per workflow step.
pub trait LanguageModelFactory: Send + Sync {
    /// Instantiate a model for the given specification.
    fn create(&self, specification: &LanguageModelSpecification) -> Result<Arc<dyn LanguageModel>>;

    /// The factory's notion of a default model, used by steps that do not
    /// name one.
    fn default_model(&self) -> Result<Arc<dyn LanguageModel>>;
}
