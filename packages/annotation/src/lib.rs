//! Questionnaire-Driven Document Annotation Library
//!
//! Extracts structured, provenance-tracked factual claims from free-text
//! documents by administering questionnaires to a language model. Curators
//! define questionnaires (ordered questions plus instructions) and bundle
//! them into workflows; the engine runs a workflow against a document,
//! invoking the model once per question, parsing its free-text answer into
//! typed values, and emitting subject–predicate–object claims annotated
//! with full execution provenance.
//!
//! # Design Philosophy
//!
//! - Errors are data: every stage records success or an exception in an
//!   immutable process record; the pipeline never throws across a stage
//!   boundary.
//! - The provenance tree mirrors execution structure: a workflow
//!   execution nests step executions, which nest questionnaire and
//!   question administrations, down to individual prompt constructions
//!   and model invocations.
//! - Event emission is decoupled observation: subscribers stream progress
//!   without being able to influence or block the pipeline.
//!
//! # Usage
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use annotation::{ExecuteRequest, MemoryModelSet, WorkflowEngine};
//! use annotation::testing::{MockLanguageModel, MockLanguageModelFactory};
//!
//! let model_set = Arc::new(MemoryModelSet::new()
//!     .with_document(document)
//!     .with_workflow(workflow));
//! let factory = MockLanguageModelFactory::new(MockLanguageModel::new());
//! let engine = WorkflowEngine::new(model_set, factory);
//!
//! let execution = engine.execute(&ExecuteRequest::new("wf-1", "doc-1")).await;
//! for claim in execution.claims() {
//!     println!("{} {} {}", claim.subject, claim.predicate, claim.object.lexical_form());
//! }
//! ```
//!
//! # Modules
//!
//! - [`traits`] - Core trait abstractions (LanguageModel, ModelSet)
//! - [`types`] - Domain data types and process records
//! - [`pipeline`] - Administration pipeline and claim evaluation
//! - [`events`] - Engine lifecycle events and the pub/sub bus
//! - [`stores`] - Model set implementations (MemoryModelSet)
//! - [`model`] - Language model backends (OpenAI, feature-gated)
//! - [`testing`] - Mock implementations for testing

pub mod error;
pub mod events;
pub mod model;
pub mod pipeline;
pub mod stores;
pub mod testing;
pub mod traits;
pub mod types;

// Re-export core types at crate root
pub use error::{AnnotationError, ExtractError, ResolutionKind, Result, TemplateError};
pub use events::{EventBus, WorkflowEvent};
pub use traits::{
    model::{LanguageModel, LanguageModelFactory},
    store::{ModelSet, QuerySolution},
};
pub use types::{
    claim::{Claim, Value},
    concept::{CandidateConcept, Concept, ConceptQuery, ConceptSelector, ConceptStub},
    document::{Document, TextEncoding, TextualEntity},
    process::{
        Answer, Exception, LanguageModelInvocation, Outcome, Process, PromptConstruction,
        QuestionAdministration, QuestionnaireAdministration, ValueExtraction, WorkflowExecution,
        WorkflowStepExecution,
    },
    prompt::{
        CompletionMessage, Prompt, PromptMessage, PromptMessageTemplate, PromptSource,
        PromptTemplate, Role, SelectBinding,
    },
    question::{Instruction, InstructionSource, Question, Questionnaire, QuestionnaireMember},
    workflow::{
        LanguageModelSpecification, Workflow, WorkflowQuestionnaireStep, WorkflowStep,
    },
};

// Re-export pipeline components
pub use pipeline::{
    evaluate_claims, extract_values, AmbientValues, ClaimPair, EvaluatedClaims, ExecuteRequest,
    PromptFormatter, QuestionAdministrator, QuestionnaireAdministrator, WorkflowEngine,
};

// Re-export stores
pub use stores::{MemoryModelSet, ModelFile};

#[cfg(feature = "openai")]
pub use model::{OpenAiLanguageModel, OpenAiModelFactory};
