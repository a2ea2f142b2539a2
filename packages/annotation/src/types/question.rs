//! Questions, instructions, and questionnaires.

use serde::{Deserialize, Serialize};

use super::concept::ConceptSelector;
use super::prompt::{PromptMessage, PromptMessageTemplate, PromptSource};

/// A question administered to a language model.
///
/// The variant determines how the completion is parsed into values;
/// every variant carries the claim predicate to produce (`path`) and the
/// prompt to send.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Question {
    /// Yes/no answer, parsed to a boolean value.
    Dichotomous {
        identifier: String,
        path: String,
        prompt: PromptSource,
    },

    /// One or more concept references, constrained by a selector.
    Categorical {
        identifier: String,
        path: String,
        prompt: PromptSource,
        selector: ConceptSelector,
    },

    /// Numeric answer(s).
    RealValued {
        identifier: String,
        path: String,
        prompt: PromptSource,
    },

    /// Free-text answer(s).
    Text {
        identifier: String,
        path: String,
        prompt: PromptSource,
    },
}

impl Question {
    pub fn identifier(&self) -> &str {
        match self {
            Self::Dichotomous { identifier, .. }
            | Self::Categorical { identifier, .. }
            | Self::RealValued { identifier, .. }
            | Self::Text { identifier, .. } => identifier,
        }
    }

    /// The claim predicate this question produces.
    pub fn path(&self) -> &str {
        match self {
            Self::Dichotomous { path, .. }
            | Self::Categorical { path, .. }
            | Self::RealValued { path, .. }
            | Self::Text { path, .. } => path,
        }
    }

    pub fn prompt(&self) -> &PromptSource {
        match self {
            Self::Dichotomous { prompt, .. }
            | Self::Categorical { prompt, .. }
            | Self::RealValued { prompt, .. }
            | Self::Text { prompt, .. } => prompt,
        }
    }

    /// The concept selector, for categorical questions.
    pub fn selector(&self) -> Option<&ConceptSelector> {
        match self {
            Self::Categorical { selector, .. } => Some(selector),
            _ => None,
        }
    }
}

/// Where an instruction gets its prompt message from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum InstructionSource {
    Message { message: PromptMessage },
    Template { template: PromptMessageTemplate },
}

/// A non-question questionnaire member. Contributes one prompt message to
/// the rolling history and produces no claims.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Instruction {
    pub identifier: String,
    pub source: InstructionSource,
}

impl Instruction {
    pub fn literal(identifier: impl Into<String>, message: PromptMessage) -> Self {
        Self {
            identifier: identifier.into(),
            source: InstructionSource::Message { message },
        }
    }

    pub fn template(identifier: impl Into<String>, template: PromptMessageTemplate) -> Self {
        Self {
            identifier: identifier.into(),
            source: InstructionSource::Template { template },
        }
    }
}

/// One member of a questionnaire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum QuestionnaireMember {
    Instruction { instruction: Instruction },
    Question { question: Question },
}

/// An ordered sequence of instructions and questions.
///
/// Order is significant: it defines both prompt-history order and
/// stop-on-error order during administration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Questionnaire {
    pub identifier: String,
    #[serde(default)]
    pub label: Option<String>,
    pub members: Vec<QuestionnaireMember>,
}

impl Questionnaire {
    pub fn new(identifier: impl Into<String>) -> Self {
        Self {
            identifier: identifier.into(),
            label: None,
            members: Vec::new(),
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn with_instruction(mut self, instruction: Instruction) -> Self {
        self.members
            .push(QuestionnaireMember::Instruction { instruction });
        self
    }

    pub fn with_question(mut self, question: Question) -> Self {
        self.members.push(QuestionnaireMember::Question { question });
        self
    }

    /// Number of question members (instructions excluded).
    pub fn question_count(&self) -> usize {
        self.members
            .iter()
            .filter(|m| matches!(m, QuestionnaireMember::Question { .. }))
            .count()
    }
}
