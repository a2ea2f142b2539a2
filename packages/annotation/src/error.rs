//! Typed errors for the annotation library.
//!
//! Uses `thiserror` for library errors (not `anyhow`) to provide
//! strongly-typed, composable error handling. Pipeline stages convert
//! these into `Exception` process-record outputs at stage boundaries
//! (see [`crate::types::process`]); nothing in the pipeline panics on
//! a fallible path.

use thiserror::Error;

/// Errors that can occur during annotation operations.
#[derive(Debug, Error)]
pub enum AnnotationError {
    /// An identifier could not be resolved through the model set.
    #[error("unable to resolve {kind}: {identifier}")]
    Resolution {
        kind: ResolutionKind,
        identifier: String,
    },

    /// Prompt template expansion failed
    #[error(transparent)]
    Template(#[from] TemplateError),

    /// Language model invocation failed (transport or API)
    #[error("language model error: {0}")]
    Model(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// Completion could not be parsed into answer values
    #[error(transparent)]
    Extraction(#[from] ExtractError),

    /// Model set lookup failed for a reason other than a missing record
    #[error("storage error: {0}")]
    Storage(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// JSON (de)serialization error
    #[error("JSON parse error: {0}")]
    JsonParse(#[from] serde_json::Error),

    /// Configuration error
    #[error("config error: {0}")]
    Config(String),
}

impl AnnotationError {
    /// Resolution error for a workflow identifier.
    pub fn unresolved_workflow(identifier: impl Into<String>) -> Self {
        Self::Resolution {
            kind: ResolutionKind::Workflow,
            identifier: identifier.into(),
        }
    }

    /// Resolution error for a document identifier.
    pub fn unresolved_document(identifier: impl Into<String>) -> Self {
        Self::Resolution {
            kind: ResolutionKind::Document,
            identifier: identifier.into(),
        }
    }

    /// Resolution error for a concept IRI.
    pub fn unresolved_concept(identifier: impl Into<String>) -> Self {
        Self::Resolution {
            kind: ResolutionKind::Concept,
            identifier: identifier.into(),
        }
    }

    /// Resolution error for a language model identifier.
    pub fn unresolved_language_model(identifier: impl Into<String>) -> Self {
        Self::Resolution {
            kind: ResolutionKind::LanguageModel,
            identifier: identifier.into(),
        }
    }

    /// Wrap an arbitrary error as a language model error.
    pub fn model(error: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
        Self::Model(error.into())
    }

    /// Wrap an arbitrary error as a storage error.
    pub fn storage(error: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
        Self::Storage(error.into())
    }
}

/// What kind of record failed to resolve.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolutionKind {
    Workflow,
    Document,
    Concept,
    LanguageModel,
}

impl std::fmt::Display for ResolutionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Self::Workflow => "workflow",
            Self::Document => "document",
            Self::Concept => "concept",
            Self::LanguageModel => "language model",
        };
        f.write_str(label)
    }
}

/// Errors from answer-value extraction.
///
/// Display strings are part of the contract: they surface verbatim as
/// `Exception` messages in process records, and callers match on them.
#[derive(Debug, Error)]
pub enum ExtractError {
    /// Completion was not valid JSON even after the lenient repair parse
    #[error("malformed JSON answer: {0}")]
    Malformed(String),

    /// Top-level JSON object had no members
    #[error("empty JSON object")]
    EmptyObject,

    /// Top-level JSON object had more than one member
    #[error("JSON object with multiple members: {members}")]
    MultipleMembers { members: String },

    /// Top-level JSON value was not a scalar or single-member object
    #[error("unsupported JSON answer value: {0}")]
    Unsupported(String),

    /// Expected answer kind did not match the scalars found
    #[error("expected {expected} answer, got: {found}")]
    WrongKind { expected: &'static str, found: String },

    /// Categorical answer element was not a syntactically valid IRI
    #[error("invalid concept IRI: {0}")]
    InvalidIri(String),
}

/// Errors from prompt template expansion.
#[derive(Debug, Error)]
pub enum TemplateError {
    /// A `{{var}}` placeholder had no value bound
    #[error("unresolved template variable: {0}")]
    UnresolvedVariable(String),

    /// A select binding's query failed
    #[error("template query failed: {0}")]
    Query(String),
}

/// Result type alias for annotation operations.
pub type Result<T> = std::result::Result<T, AnnotationError>;
