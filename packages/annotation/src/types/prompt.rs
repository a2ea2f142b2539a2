//! Prompts, prompt messages, and their template forms.

use serde::{Deserialize, Serialize};

/// Role of a prompt message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// A single message within a prompt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PromptMessage {
    pub role: Role,
    pub content: String,
}

impl PromptMessage {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::new(Role::System, content)
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }
}

/// An ordered sequence of messages sent to a language model.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Prompt {
    pub messages: Vec<PromptMessage>,
}

impl Prompt {
    pub fn new(messages: Vec<PromptMessage>) -> Self {
        Self { messages }
    }

    /// Build a prompt from existing history plus one more message.
    pub fn from_history(history: &[PromptMessage], message: PromptMessage) -> Self {
        let mut messages = history.to_vec();
        messages.push(message);
        Self { messages }
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }
}

/// The language model's raw textual answer to a prompt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletionMessage {
    pub content: String,
}

impl CompletionMessage {
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
        }
    }

    /// View the completion as an assistant-role prompt message, for
    /// appending to a rolling message history.
    pub fn as_message(&self) -> PromptMessage {
        PromptMessage::assistant(self.content.clone())
    }
}

/// A query-derived template binding.
///
/// The query runs through `ModelSet::select` at expansion time; each
/// result variable `var` of solution `i` is exposed to the template as
/// `var{i}`, and additionally as bare `var` when the query yields exactly
/// one solution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelectBinding {
    pub query: String,
}

impl SelectBinding {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
        }
    }
}

/// A single-message template with `{{var}}` / `{{{var}}}` placeholders.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PromptMessageTemplate {
    pub role: Role,
    pub text: String,
    #[serde(default)]
    pub bindings: Vec<SelectBinding>,
}

impl PromptMessageTemplate {
    pub fn new(role: Role, text: impl Into<String>) -> Self {
        Self {
            role,
            text: text.into(),
            bindings: Vec::new(),
        }
    }

    pub fn with_binding(mut self, binding: SelectBinding) -> Self {
        self.bindings.push(binding);
        self
    }
}

/// A full-prompt template: an ordered list of message templates plus
/// shared query bindings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PromptTemplate {
    pub messages: Vec<PromptMessageTemplate>,
    #[serde(default)]
    pub bindings: Vec<SelectBinding>,
}

impl PromptTemplate {
    pub fn new(messages: Vec<PromptMessageTemplate>) -> Self {
        Self {
            messages,
            bindings: Vec::new(),
        }
    }

    pub fn with_binding(mut self, binding: SelectBinding) -> Self {
        self.bindings.push(binding);
        self
    }
}

/// Where a question or instruction gets its prompt from.
///
/// Literal forms are used as-is; template forms are expanded against the
/// ambient value bag by the prompt formatter. A literal completion message
/// is represented as an assistant-role [`PromptMessage`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum PromptSource {
    /// A complete literal prompt, used verbatim (history is not included).
    Prompt { prompt: Prompt },

    /// A literal message, appended to the rolling history.
    Message { message: PromptMessage },

    /// A full-prompt template; its expansion replaces the prompt outright.
    Template { template: PromptTemplate },

    /// A single-message template; its expansion is appended to history.
    MessageTemplate { template: PromptMessageTemplate },
}
