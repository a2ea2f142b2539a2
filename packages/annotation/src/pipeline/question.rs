//! Question administration: one question against one document.
//!
//! Administration runs three sub-stages (prompt construction, model
//! invocation, value extraction), records each as a nested process, and
//! assembles one claim per extracted value. Any sub-stage failure
//! short-circuits: the administration's output becomes that stage's
//! exception, and later stages are never attempted. `administer` itself
//! never returns an error; failures are encoded in the record.

use chrono::Utc;
use tracing::debug;

use crate::error::Result;
use crate::pipeline::prompts::{AmbientValues, PromptFormatter};
use crate::pipeline::values::extract_values;
use crate::traits::model::LanguageModel;
use crate::traits::store::ModelSet;
use crate::types::claim::Claim;
use crate::types::concept::{CandidateConcept, Concept, ConceptQuery, ConceptSelector};
use crate::types::document::{Document, TextEncoding};
use crate::types::process::{
    LanguageModelInvocationInput, Outcome, Process, PromptConstruction, PromptConstructionInput,
    QuestionAdministration, QuestionAdministrationInput, QuestionAdministrationOutput,
    QuestionAdministrationSubProcesses, ValueExtractionInput,
};
use crate::types::prompt::{Prompt, PromptMessage, PromptSource};
use crate::types::question::Question;

/// Administers a single question against a document.
pub struct QuestionAdministrator<'a, M: ModelSet> {
    document: &'a Document,
    model_set: &'a M,
    language_model: &'a dyn LanguageModel,
}

impl<'a, M: ModelSet> QuestionAdministrator<'a, M> {
    pub fn new(
        document: &'a Document,
        model_set: &'a M,
        language_model: &'a dyn LanguageModel,
    ) -> Self {
        Self {
            document,
            model_set,
            language_model,
        }
    }

    /// Administer the question, threading the caller's prompt-message
    /// history into prompt construction.
    pub async fn administer(
        &self,
        question: &Question,
        history: &[PromptMessage],
    ) -> QuestionAdministration {
        let started = Utc::now();
        let input = QuestionAdministrationInput {
            question: question.clone(),
        };
        let mut sub_processes = QuestionAdministrationSubProcesses::default();

        debug!(question = %question.identifier(), "administering question");

        // Prompt construction
        let construction = self.construct_prompt(question, history).await;
        let prompt = match construction.output.value() {
            Some(prompt) => prompt.clone(),
            None => {
                let output = construction.output.carry();
                sub_processes.prompt_construction = Some(construction);
                return Process::completed(input, output, sub_processes, started);
            }
        };
        sub_processes.prompt_construction = Some(construction);

        // Language model invocation
        let invocation_started = Utc::now();
        let invocation_input = LanguageModelInvocationInput {
            prompt: prompt.clone(),
            language_model: self.language_model.specification().clone(),
        };
        let invocation_result = self.language_model.invoke(&prompt).await;
        let invocation = Process::completed(
            invocation_input,
            Outcome::from_result(invocation_result),
            (),
            invocation_started,
        );
        let completion = match invocation.output.value() {
            Some(completion) => completion.clone(),
            None => {
                let output = invocation.output.carry();
                sub_processes.language_model_invocation = Some(invocation);
                return Process::completed(input, output, sub_processes, started);
            }
        };
        sub_processes.language_model_invocation = Some(invocation);

        // Value extraction
        let extraction_started = Utc::now();
        let extraction_result =
            extract_values(&completion, question, Some(self.model_set as &dyn ModelSet)).await;
        let extraction = Process::completed(
            ValueExtractionInput {
                completion: completion.clone(),
            },
            Outcome::from_result(extraction_result),
            (),
            extraction_started,
        );
        let values = match extraction.output.value() {
            Some(values) => values.clone(),
            None => {
                let output = extraction.output.carry();
                sub_processes.value_extraction = Some(extraction);
                return Process::completed(input, output, sub_processes, started);
            }
        };
        sub_processes.value_extraction = Some(extraction);

        // Claim assembly
        let claims: Vec<Claim> = values
            .into_iter()
            .map(|value| Claim::new(&self.document.identifier, question.path(), value))
            .collect();

        debug!(
            question = %question.identifier(),
            claim_count = claims.len(),
            "question administered"
        );

        Process::completed(
            input,
            Outcome::success(QuestionAdministrationOutput { claims }),
            sub_processes,
            started,
        )
    }

    async fn construct_prompt(
        &self,
        question: &Question,
        history: &[PromptMessage],
    ) -> PromptConstruction {
        let started = Utc::now();
        let input = PromptConstructionInput {
            source: question.prompt().clone(),
            message_history: history.to_vec(),
        };
        let result = self.build_prompt(question, history).await;
        Process::completed(input, Outcome::from_result(result), (), started)
    }

    async fn build_prompt(&self, question: &Question, history: &[PromptMessage]) -> Result<Prompt> {
        match question.prompt() {
            // A literal prompt is used verbatim; history is not included.
            PromptSource::Prompt { prompt } => Ok(prompt.clone()),

            // A literal message extends the history.
            PromptSource::Message { message } => Ok(Prompt::from_history(history, message.clone())),

            PromptSource::MessageTemplate { template } => {
                let ambient = self.ambient_values(question).await?;
                let formatter = PromptFormatter::new(self.model_set);
                let message = formatter
                    .format_prompt_message_template(template, &ambient)
                    .await?;
                Ok(Prompt::from_history(history, message))
            }

            // A full-template expansion replaces the prompt outright.
            PromptSource::Template { template } => {
                let ambient = self.ambient_values(question).await?;
                let formatter = PromptFormatter::new(self.model_set);
                formatter.format_prompt_template(template, &ambient).await
            }
        }
    }

    /// The ambient value bag: document bodies, plus candidate concepts for
    /// categorical questions.
    async fn ambient_values(&self, question: &Question) -> Result<AmbientValues> {
        let mut values = document_ambient_values(self.document);

        if let Some(selector) = question.selector() {
            let concepts = self.candidate_concepts(selector).await?;
            let candidates: Vec<CandidateConcept> =
                concepts.iter().map(CandidateConcept::from).collect();
            values.insert(
                "concepts".to_string(),
                serde_json::to_string_pretty(&candidates)?,
            );
        }

        Ok(values)
    }

    async fn candidate_concepts(&self, selector: &ConceptSelector) -> Result<Vec<Concept>> {
        let iris = match selector {
            ConceptSelector::Enumerated { concepts } => concepts.clone(),
            ConceptSelector::Search { query, limit } => {
                let query = ConceptQuery {
                    query: query.clone(),
                    limit: *limit,
                };
                self.model_set
                    .concept_stubs(&query)
                    .await?
                    .into_iter()
                    .map(|stub| stub.iri)
                    .collect()
            }
        };
        self.model_set.concepts(&iris).await
    }
}

/// Ambient values shared by questions and instructions: the document's
/// bodies keyed by encoding.
pub(crate) fn document_ambient_values(document: &Document) -> AmbientValues {
    let mut values = AmbientValues::new();
    if let Some(text) = document.body(TextEncoding::PlainText) {
        values.insert("document_text".to_string(), text.to_string());
    }
    if let Some(html) = document.body(TextEncoding::Html) {
        values.insert("document_html".to_string(), html.to_string());
    }
    values
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stores::memory::MemoryModelSet;
    use crate::testing::MockLanguageModel;
    use crate::types::claim::Value;
    use crate::types::document::TextualEntity;
    use crate::types::prompt::{PromptMessageTemplate, Role};

    fn document() -> Document {
        Document::new("doc-1")
            .with_textual_entity(TextualEntity::plain_text("The sky is blue."))
            .with_textual_entity(TextualEntity::html("<p>The sky is blue.</p>"))
    }

    fn dichotomous(prompt: PromptSource) -> Question {
        Question::Dichotomous {
            identifier: "q-1".into(),
            path: "p:blue_sky".into(),
            prompt,
        }
    }

    #[tokio::test]
    async fn successful_administration_assembles_claims() {
        let doc = document();
        let model_set = MemoryModelSet::new();
        let model = MockLanguageModel::new().with_completion(r#"{"answer": true}"#);
        let administrator = QuestionAdministrator::new(&doc, &model_set, &model);

        let question = dichotomous(PromptSource::Message {
            message: PromptMessage::user("Is the sky blue?"),
        });
        let administration = administrator.administer(&question, &[]).await;

        assert!(administration.is_success());
        let output = administration.output.value().unwrap();
        assert_eq!(output.claims.len(), 1);
        assert_eq!(output.claims[0].subject, "doc-1");
        assert_eq!(output.claims[0].predicate, "p:blue_sky");
        assert!(!output.claims[0].gold);
        assert!(matches!(
            output.claims[0].object,
            Value::Boolean { value: true, .. }
        ));

        // All three sub-stages recorded
        assert!(administration.sub_processes.prompt_construction.is_some());
        assert!(administration
            .sub_processes
            .language_model_invocation
            .is_some());
        assert!(administration.sub_processes.value_extraction.is_some());
    }

    #[tokio::test]
    async fn literal_message_extends_the_history() {
        let doc = document();
        let model_set = MemoryModelSet::new();
        let model = MockLanguageModel::new().with_completion("true");
        let administrator = QuestionAdministrator::new(&doc, &model_set, &model);

        let history = vec![PromptMessage::system("Answer in JSON.")];
        let question = dichotomous(PromptSource::Message {
            message: PromptMessage::user("Is the sky blue?"),
        });
        administrator.administer(&question, &history).await;

        let prompts = model.invocations();
        assert_eq!(prompts.len(), 1);
        assert_eq!(prompts[0].len(), 2);
        assert_eq!(prompts[0].messages[0].content, "Answer in JSON.");
        assert_eq!(prompts[0].messages[1].content, "Is the sky blue?");
    }

    #[tokio::test]
    async fn literal_prompt_is_used_verbatim() {
        let doc = document();
        let model_set = MemoryModelSet::new();
        let model = MockLanguageModel::new().with_completion("true");
        let administrator = QuestionAdministrator::new(&doc, &model_set, &model);

        let history = vec![PromptMessage::system("ignored")];
        let question = dichotomous(PromptSource::Prompt {
            prompt: Prompt::new(vec![PromptMessage::user("standalone")]),
        });
        administrator.administer(&question, &history).await;

        let prompts = model.invocations();
        assert_eq!(prompts[0].len(), 1);
        assert_eq!(prompts[0].messages[0].content, "standalone");
    }

    #[tokio::test]
    async fn message_template_sees_document_ambient_values() {
        let doc = document();
        let model_set = MemoryModelSet::new();
        let model = MockLanguageModel::new().with_completion("true");
        let administrator = QuestionAdministrator::new(&doc, &model_set, &model);

        let question = dichotomous(PromptSource::MessageTemplate {
            template: PromptMessageTemplate::new(Role::User, "Document: {{{document_text}}}"),
        });
        administrator.administer(&question, &[]).await;

        let prompts = model.invocations();
        assert_eq!(
            prompts[0].messages[0].content,
            "Document: The sky is blue."
        );
    }

    #[tokio::test]
    async fn invocation_failure_short_circuits_extraction() {
        let doc = document();
        let model_set = MemoryModelSet::new();
        let model = MockLanguageModel::new().with_failure("connection reset");
        let administrator = QuestionAdministrator::new(&doc, &model_set, &model);

        let question = dichotomous(PromptSource::Message {
            message: PromptMessage::user("Is the sky blue?"),
        });
        let administration = administrator.administer(&question, &[]).await;

        assert!(administration.is_exception());
        let message = administration.output.exception_message().unwrap();
        assert!(message.contains("connection reset"));

        // The invocation is recorded with the same exception; extraction
        // never ran.
        let invocation = administration
            .sub_processes
            .language_model_invocation
            .as_ref()
            .unwrap();
        assert_eq!(invocation.output.exception_message(), Some(message));
        assert!(administration.sub_processes.value_extraction.is_none());
    }

    #[tokio::test]
    async fn template_failure_prevents_invocation() {
        let doc = document();
        let model_set = MemoryModelSet::new();
        let model = MockLanguageModel::new();
        let administrator = QuestionAdministrator::new(&doc, &model_set, &model);

        let question = dichotomous(PromptSource::MessageTemplate {
            template: PromptMessageTemplate::new(Role::User, "{{never_bound}}"),
        });
        let administration = administrator.administer(&question, &[]).await;

        assert!(administration.is_exception());
        assert_eq!(
            administration.output.exception_message(),
            Some("unresolved template variable: never_bound")
        );
        assert!(administration
            .sub_processes
            .language_model_invocation
            .is_none());
        assert_eq!(model.invocation_count(), 0);
    }

    #[tokio::test]
    async fn extraction_failure_is_the_administration_output() {
        let doc = document();
        let model_set = MemoryModelSet::new();
        let model = MockLanguageModel::new().with_completion(r#"{"answer": "blah"}"#);
        let administrator = QuestionAdministrator::new(&doc, &model_set, &model);

        let question = dichotomous(PromptSource::Message {
            message: PromptMessage::user("Is the sky blue?"),
        });
        let administration = administrator.administer(&question, &[]).await;

        assert!(administration.is_exception());
        assert!(administration
            .output
            .exception_message()
            .unwrap()
            .starts_with("expected a boolean answer"));
        let extraction = administration.sub_processes.value_extraction.as_ref().unwrap();
        assert!(extraction.is_exception());
    }

    #[tokio::test]
    async fn categorical_question_projects_candidate_concepts() {
        let doc = document();
        let model_set = MemoryModelSet::new().with_concept(
            Concept::new("http://example.com/c/1")
                .with_notation("1.1")
                .with_pref_label("Meteorology")
                .with_scope_note("Weather phenomena."),
        );
        let model =
            MockLanguageModel::new().with_completion(r#"{"answer": ["http://example.com/c/1"]}"#);
        let administrator = QuestionAdministrator::new(&doc, &model_set, &model);

        let question = Question::Categorical {
            identifier: "q-2".into(),
            path: "p:topic".into(),
            prompt: PromptSource::MessageTemplate {
                template: PromptMessageTemplate::new(
                    Role::User,
                    "Pick from:\n{{{concepts}}}\nDocument: {{{document_text}}}",
                ),
            },
            selector: ConceptSelector::Enumerated {
                concepts: vec!["http://example.com/c/1".into()],
            },
        };
        let administration = administrator.administer(&question, &[]).await;

        // The prompt carried the candidate projection
        let sent = model.invocations();
        assert!(sent[0].messages[0].content.contains("Meteorology"));
        assert!(sent[0].messages[0].content.contains("scopeNote"));

        // The claim carries a resolved stub, label included
        let output = administration.output.value().unwrap();
        assert!(matches!(
            &output.claims[0].object,
            Value::Categorical { concept, .. }
                if concept.pref_label.as_deref() == Some("Meteorology")
        ));
    }

    #[tokio::test]
    async fn unresolvable_selector_concept_aborts_construction() {
        let doc = document();
        let model_set = MemoryModelSet::new(); // no concepts stored
        let model = MockLanguageModel::new();
        let administrator = QuestionAdministrator::new(&doc, &model_set, &model);

        let question = Question::Categorical {
            identifier: "q-2".into(),
            path: "p:topic".into(),
            prompt: PromptSource::MessageTemplate {
                template: PromptMessageTemplate::new(Role::User, "{{{concepts}}}"),
            },
            selector: ConceptSelector::Enumerated {
                concepts: vec!["http://example.com/missing".into()],
            },
        };
        let administration = administrator.administer(&question, &[]).await;

        assert!(administration.is_exception());
        assert_eq!(
            administration.output.exception_message(),
            Some("unable to resolve concept: http://example.com/missing")
        );
        assert_eq!(model.invocation_count(), 0);
    }
}
