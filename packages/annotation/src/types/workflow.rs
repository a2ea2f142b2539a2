//! Workflows, workflow steps, and language model specifications.

use serde::{Deserialize, Serialize};

use super::question::Questionnaire;

/// Identifies a language model family/API endpoint for provenance and
/// client construction. Not used for control flow in the pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LanguageModelSpecification {
    pub identifier: String,
    #[serde(default)]
    pub family: Option<String>,
    /// The provider-side model name, e.g. `gpt-4o`.
    pub api_identifier: String,
    #[serde(default)]
    pub context_window: Option<u32>,
}

impl LanguageModelSpecification {
    pub fn new(identifier: impl Into<String>, api_identifier: impl Into<String>) -> Self {
        Self {
            identifier: identifier.into(),
            family: None,
            api_identifier: api_identifier.into(),
            context_window: None,
        }
    }

    pub fn with_family(mut self, family: impl Into<String>) -> Self {
        self.family = Some(family.into());
        self
    }

    pub fn with_context_window(mut self, context_window: u32) -> Self {
        self.context_window = Some(context_window);
        self
    }
}

/// A questionnaire step within a workflow.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowQuestionnaireStep {
    pub questionnaire: Questionnaire,
    /// Identifier of the language model specification to use for this
    /// step; the factory's default model when absent.
    #[serde(default)]
    pub language_model: Option<String>,
}

/// One step of a workflow. Questionnaire steps are currently the only
/// kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum WorkflowStep {
    Questionnaire { step: WorkflowQuestionnaireStep },
}

/// An ordered list of steps applied to a document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Workflow {
    pub identifier: String,
    #[serde(default)]
    pub label: Option<String>,
    pub steps: Vec<WorkflowStep>,
}

impl Workflow {
    pub fn new(identifier: impl Into<String>) -> Self {
        Self {
            identifier: identifier.into(),
            label: None,
            steps: Vec::new(),
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn with_questionnaire_step(mut self, step: WorkflowQuestionnaireStep) -> Self {
        self.steps.push(WorkflowStep::Questionnaire { step });
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn workflow_steps_keep_declaration_order() {
        let workflow = Workflow::new("wf-1")
            .with_questionnaire_step(WorkflowQuestionnaireStep {
                questionnaire: Questionnaire::new("qn-a"),
                language_model: None,
            })
            .with_questionnaire_step(WorkflowQuestionnaireStep {
                questionnaire: Questionnaire::new("qn-b"),
                language_model: Some("lm-1".into()),
            });

        assert_eq!(workflow.steps.len(), 2);
        let WorkflowStep::Questionnaire { step } = &workflow.steps[1];
        assert_eq!(step.questionnaire.identifier, "qn-b");
        assert_eq!(step.language_model.as_deref(), Some("lm-1"));
    }

    #[test]
    fn specification_roundtrips() {
        let spec = LanguageModelSpecification::new("lm-1", "gpt-4o")
            .with_family("openai")
            .with_context_window(128_000);
        let json = serde_json::to_string(&spec).unwrap();
        let back: LanguageModelSpecification = serde_json::from_str(&json).unwrap();
        assert_eq!(spec, back);
    }
}
