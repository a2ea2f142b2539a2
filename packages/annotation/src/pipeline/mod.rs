//! The annotation pipeline - the core of the library.
//!
//! Control flow runs top-down: the workflow engine resolves handles and
//! executes steps; each questionnaire step walks its members in order;
//! each question builds a prompt, invokes the language model, and
//! extracts typed values. Each layer returns an immutable process record
//! nesting the layer below it, so a finished execution is a full audit
//! tree of everything that happened.

pub mod evaluate;
pub mod prompts;
pub mod question;
pub mod questionnaire;
pub mod values;
pub mod workflow;

pub use evaluate::{evaluate_claims, ClaimPair, EvaluatedClaims};
pub use prompts::{AmbientValues, PromptFormatter};
pub use question::QuestionAdministrator;
pub use questionnaire::QuestionnaireAdministrator;
pub use values::{
    extract_answer_scalars, extract_boolean_value, extract_categorical_values,
    extract_real_values, extract_text_values, extract_values, Scalar,
};
pub use workflow::{ExecuteRequest, WorkflowEngine};
