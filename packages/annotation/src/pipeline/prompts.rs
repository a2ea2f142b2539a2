//! Prompt template expansion.
//!
//! Templates use Mustache-style placeholders: `{{var}}` substitutes the
//! HTML-escaped value, `{{{var}}}` substitutes it raw. Values come from
//! the ambient bag the administrator assembles (document bodies, candidate
//! concepts) and from live SELECT queries run through the model set.
//! Query results bind indexed variables `var0`, `var1`, …; a query with
//! exactly one solution also binds the bare `var`.

use std::sync::OnceLock;

use indexmap::IndexMap;
use regex::Regex;

use crate::error::{Result, TemplateError};
use crate::traits::store::ModelSet;
use crate::types::prompt::{Prompt, PromptMessage, PromptMessageTemplate, PromptTemplate, SelectBinding};

/// The value bag templates are expanded against, in insertion order.
pub type AmbientValues = IndexMap<String, String>;

/// Expands prompt templates against ambient and query-derived values.
pub struct PromptFormatter<'a, M: ModelSet + ?Sized> {
    model_set: &'a M,
}

impl<'a, M: ModelSet + ?Sized> PromptFormatter<'a, M> {
    pub fn new(model_set: &'a M) -> Self {
        Self { model_set }
    }

    /// Expand a full-prompt template into a concrete prompt.
    pub async fn format_prompt_template(
        &self,
        template: &PromptTemplate,
        ambient: &AmbientValues,
    ) -> Result<Prompt> {
        let mut values = ambient.clone();
        self.bind_selects(&template.bindings, &mut values).await?;

        let mut messages = Vec::with_capacity(template.messages.len());
        for message_template in &template.messages {
            let mut message_values = values.clone();
            self.bind_selects(&message_template.bindings, &mut message_values)
                .await?;
            messages.push(PromptMessage::new(
                message_template.role,
                expand(&message_template.text, &message_values)?,
            ));
        }
        Ok(Prompt::new(messages))
    }

    /// Expand a single-message template into a concrete message.
    pub async fn format_prompt_message_template(
        &self,
        template: &PromptMessageTemplate,
        ambient: &AmbientValues,
    ) -> Result<PromptMessage> {
        let mut values = ambient.clone();
        self.bind_selects(&template.bindings, &mut values).await?;
        Ok(PromptMessage::new(
            template.role,
            expand(&template.text, &values)?,
        ))
    }

    /// Run select bindings and merge their solutions into the value bag.
    /// Query-derived values shadow ambient values on name collision.
    async fn bind_selects(
        &self,
        bindings: &[SelectBinding],
        values: &mut AmbientValues,
    ) -> Result<()> {
        for binding in bindings {
            let solutions = self
                .model_set
                .select(&binding.query)
                .await
                .map_err(|e| TemplateError::Query(e.to_string()))?;

            for (index, solution) in solutions.iter().enumerate() {
                for (variable, value) in solution {
                    values.insert(format!("{variable}{index}"), value.clone());
                    if solutions.len() == 1 {
                        values.insert(variable.clone(), value.clone());
                    }
                }
            }
        }
        Ok(())
    }
}

fn placeholder_regex() -> &'static Regex {
    static PLACEHOLDER: OnceLock<Regex> = OnceLock::new();
    PLACEHOLDER.get_or_init(|| {
        Regex::new(r"\{\{\{\s*([A-Za-z_][A-Za-z0-9_]*)\s*\}\}\}|\{\{\s*([A-Za-z_][A-Za-z0-9_]*)\s*\}\}")
            .expect("placeholder regex is valid")
    })
}

/// Substitute every placeholder in `text`. An unbound variable is an
/// error, not an empty substitution.
fn expand(text: &str, values: &AmbientValues) -> Result<String> {
    let regex = placeholder_regex();
    let mut output = String::with_capacity(text.len());
    let mut last_end = 0;

    for captures in regex.captures_iter(text) {
        let whole = captures.get(0).ok_or_else(|| {
            TemplateError::UnresolvedVariable("malformed placeholder".to_string())
        })?;
        output.push_str(&text[last_end..whole.start()]);

        // Group 1 is the raw {{{var}}} form, group 2 the escaping {{var}} form
        if let Some(raw) = captures.get(1) {
            let value = lookup(values, raw.as_str())?;
            output.push_str(value);
        } else if let Some(escaped) = captures.get(2) {
            let value = lookup(values, escaped.as_str())?;
            output.push_str(&escape_html(value));
        }

        last_end = whole.end();
    }
    output.push_str(&text[last_end..]);
    Ok(output)
}

fn lookup<'v>(values: &'v AmbientValues, name: &str) -> Result<&'v String> {
    values
        .get(name)
        .ok_or_else(|| TemplateError::UnresolvedVariable(name.to_string()).into())
}

fn escape_html(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}
