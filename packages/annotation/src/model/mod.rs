//! Language model backend implementations.

#[cfg(feature = "openai")]
pub mod credentials;
#[cfg(feature = "openai")]
pub mod openai;

#[cfg(feature = "openai")]
pub use credentials::SecretString;
#[cfg(feature = "openai")]
pub use openai::{OpenAiLanguageModel, OpenAiModelFactory};
