//! The uniform process-record family.
//!
//! Every pipeline stage produces an immutable record of the same shape:
//! stage-specific `input`, an `output` that is either the stage's success
//! payload or an `Exception`, optional nested child records, and start/end
//! timestamps. Records are built bottom-up and never mutated after
//! construction; a failure path returns a new record with an exception
//! output rather than patching an existing one.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::claim::Claim;
use super::prompt::{CompletionMessage, Prompt, PromptMessage, PromptSource};
use super::question::Question;
use super::workflow::LanguageModelSpecification;
use crate::error::AnnotationError;

/// A failure recorded as data. Carries the original failing stage's
/// message unchanged as it bubbles up the record tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Exception {
    pub message: String,
}

impl Exception {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl From<&AnnotationError> for Exception {
    fn from(error: &AnnotationError) -> Self {
        Self::new(error.to_string())
    }
}

impl From<AnnotationError> for Exception {
    fn from(error: AnnotationError) -> Self {
        Self::new(error.to_string())
    }
}

/// A stage's output: its success payload or an exception.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Outcome<T> {
    Success { value: T },
    Exception { message: String },
}

impl<T> Outcome<T> {
    pub fn success(value: T) -> Self {
        Self::Success { value }
    }

    pub fn exception(message: impl Into<String>) -> Self {
        Self::Exception {
            message: message.into(),
        }
    }

    pub fn from_result(result: crate::error::Result<T>) -> Self {
        match result {
            Ok(value) => Self::Success { value },
            Err(error) => Self::Exception {
                message: error.to_string(),
            },
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }

    pub fn is_exception(&self) -> bool {
        matches!(self, Self::Exception { .. })
    }

    pub fn value(&self) -> Option<&T> {
        match self {
            Self::Success { value } => Some(value),
            Self::Exception { .. } => None,
        }
    }

    pub fn exception_message(&self) -> Option<&str> {
        match self {
            Self::Success { .. } => None,
            Self::Exception { message } => Some(message),
        }
    }

    /// Carry this outcome's exception into another stage's output type.
    /// Panics on success outcomes; callers check `is_exception` first.
    pub fn carry<U>(&self) -> Outcome<U> {
        match self {
            Self::Exception { message } => Outcome::Exception {
                message: message.clone(),
            },
            Self::Success { .. } => unreachable!("carry called on a success outcome"),
        }
    }
}

/// The uniform provenance record shape shared by every pipeline stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Process<I, O, S> {
    pub input: I,
    pub output: Outcome<O>,
    pub sub_processes: S,
    pub started_at: DateTime<Utc>,
    /// Absent only while the stage is still running; always set on the
    /// records this library returns.
    pub ended_at: Option<DateTime<Utc>>,
}

impl<I, O, S> Process<I, O, S> {
    /// Build a completed record, stamping the end time.
    pub fn completed(input: I, output: Outcome<O>, sub_processes: S, started_at: DateTime<Utc>) -> Self {
        Self {
            input,
            output,
            sub_processes,
            started_at,
            ended_at: Some(Utc::now()),
        }
    }

    pub fn is_success(&self) -> bool {
        self.output.is_success()
    }

    pub fn is_exception(&self) -> bool {
        self.output.is_exception()
    }
}

// ---------------------------------------------------------------------------
// Stage-specific inputs, outputs, and sub-process collections
// ---------------------------------------------------------------------------

/// Input to prompt construction: the question's prompt source and the
/// message history it may extend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PromptConstructionInput {
    pub source: PromptSource,
    pub message_history: Vec<PromptMessage>,
}

pub type PromptConstruction = Process<PromptConstructionInput, Prompt, ()>;

/// Input to a language model invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LanguageModelInvocationInput {
    pub prompt: Prompt,
    pub language_model: LanguageModelSpecification,
}

pub type LanguageModelInvocation = Process<LanguageModelInvocationInput, CompletionMessage, ()>;

/// Input to value extraction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValueExtractionInput {
    pub completion: CompletionMessage,
}

pub type ValueExtraction = Process<ValueExtractionInput, Vec<super::claim::Value>, ()>;

/// Input to a question administration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuestionAdministrationInput {
    pub question: Question,
}

/// Success payload of a question administration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuestionAdministrationOutput {
    pub claims: Vec<Claim>,
}

/// Child records of a question administration, present up to the first
/// failing stage.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QuestionAdministrationSubProcesses {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt_construction: Option<PromptConstruction>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language_model_invocation: Option<LanguageModelInvocation>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value_extraction: Option<ValueExtraction>,
}

pub type QuestionAdministration =
    Process<QuestionAdministrationInput, QuestionAdministrationOutput, QuestionAdministrationSubProcesses>;

impl QuestionAdministration {
    /// The prompt actually sent to the model, if construction succeeded.
    pub fn prompt_sent(&self) -> Option<&Prompt> {
        self.sub_processes
            .prompt_construction
            .as_ref()
            .and_then(|p| p.output.value())
    }

    /// The completion received, if invocation succeeded.
    pub fn completion(&self) -> Option<&CompletionMessage> {
        self.sub_processes
            .language_model_invocation
            .as_ref()
            .and_then(|p| p.output.value())
    }
}

/// One question's accumulated claims within a questionnaire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Answer {
    /// Identifier of the question answered.
    pub question: String,
    pub claims: Vec<Claim>,
}

/// Input to a questionnaire administration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuestionnaireAdministrationInput {
    pub questionnaire: String,
    pub document: String,
}

/// Success payload of a questionnaire administration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuestionnaireAdministrationOutput {
    pub answers: Vec<Answer>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QuestionnaireAdministrationSubProcesses {
    pub question_administrations: Vec<QuestionAdministration>,
}

pub type QuestionnaireAdministration = Process<
    QuestionnaireAdministrationInput,
    QuestionnaireAdministrationOutput,
    QuestionnaireAdministrationSubProcesses,
>;

/// Input to a workflow step execution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowStepExecutionInput {
    pub step_index: usize,
    pub questionnaire: String,
    #[serde(default)]
    pub language_model: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WorkflowStepExecutionSubProcesses {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub questionnaire_administration: Option<QuestionnaireAdministration>,
}

pub type WorkflowStepExecution =
    Process<WorkflowStepExecutionInput, (), WorkflowStepExecutionSubProcesses>;

/// Input to a workflow execution: the unresolved handles.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowExecutionInput {
    pub workflow: String,
    pub document: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WorkflowExecutionSubProcesses {
    pub step_executions: Vec<WorkflowStepExecution>,
}

pub type WorkflowExecution = Process<WorkflowExecutionInput, (), WorkflowExecutionSubProcesses>;

impl WorkflowExecution {
    /// All claims produced by this execution, in administration order.
    pub fn claims(&self) -> Vec<&Claim> {
        self.sub_processes
            .step_executions
            .iter()
            .filter_map(|step| step.sub_processes.questionnaire_administration.as_ref())
            .flat_map(|qa| qa.sub_processes.question_administrations.iter())
            .filter_map(|question| question.output.value())
            .flat_map(|output| output.claims.iter())
            .collect()
    }
}
