//! Questionnaire administration: an ordered walk over instructions and
//! questions with a rolling prompt-message history.
//!
//! Instructions contribute a message to the history and produce no
//! record. Questions are delegated to the question administrator; their
//! records are always kept, even on failure. The first failing member
//! stops the walk, and the questionnaire's output becomes that member's
//! exception unchanged. After a successful question, the history becomes
//! exactly the prompt actually sent plus the model's completion, so it
//! stays faithful even when prompt construction rewrote the prompt.

use chrono::Utc;
use tracing::debug;

use crate::error::Result;
use crate::pipeline::prompts::PromptFormatter;
use crate::pipeline::question::{document_ambient_values, QuestionAdministrator};
use crate::traits::model::LanguageModel;
use crate::traits::store::ModelSet;
use crate::types::document::Document;
use crate::types::process::{
    Answer, Outcome, Process, QuestionnaireAdministration, QuestionnaireAdministrationInput,
    QuestionnaireAdministrationOutput, QuestionnaireAdministrationSubProcesses,
};
use crate::types::prompt::PromptMessage;
use crate::types::question::{Instruction, InstructionSource, Questionnaire, QuestionnaireMember};

/// Administers a questionnaire against a document, one member at a time.
pub struct QuestionnaireAdministrator<'a, M: ModelSet> {
    document: &'a Document,
    model_set: &'a M,
    language_model: &'a dyn LanguageModel,
}

impl<'a, M: ModelSet> QuestionnaireAdministrator<'a, M> {
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

    pub async fn administer(&self, questionnaire: &Questionnaire) -> QuestionnaireAdministration {
        let started = Utc::now();
        let input = QuestionnaireAdministrationInput {
            questionnaire: questionnaire.identifier.clone(),
            document: self.document.identifier.clone(),
        };
        let mut sub_processes = QuestionnaireAdministrationSubProcesses::default();
        let mut history: Vec<PromptMessage> = Vec::new();
        let mut answers: Vec<Answer> = Vec::new();

        debug!(
            questionnaire = %questionnaire.identifier,
            document = %self.document.identifier,
            member_count = questionnaire.members.len(),
            "administering questionnaire"
        );

        for member in &questionnaire.members {
            match member {
                QuestionnaireMember::Instruction { instruction } => {
                    match self.instruction_message(instruction).await {
                        Ok(message) => history.push(message),
                        Err(error) => {
                            return Process::completed(
                                input,
                                Outcome::exception(error.to_string()),
                                sub_processes,
                                started,
                            );
                        }
                    }
                }

                QuestionnaireMember::Question { question } => {
                    let administrator = QuestionAdministrator::new(
                        self.document,
                        self.model_set,
                        self.language_model,
                    );
                    let administration = administrator.administer(question, &history).await;

                    if administration.is_exception() {
                        // The administration is recorded even on failure;
                        // its exception becomes ours, unchanged.
                        let output = administration.output.carry();
                        sub_processes.question_administrations.push(administration);
                        return Process::completed(input, output, sub_processes, started);
                    }

                    let claims = administration
                        .output
                        .value()
                        .map(|output| output.claims.clone())
                        .unwrap_or_default();

                    // Advance history to exactly what the model saw and said.
                    if let (Some(prompt), Some(completion)) =
                        (administration.prompt_sent(), administration.completion())
                    {
                        history = prompt.messages.clone();
                        history.push(completion.as_message());
                    }

                    answers.push(Answer {
                        question: question.identifier().to_string(),
                        claims,
                    });
                    sub_processes.question_administrations.push(administration);
                }
            }
        }

        Process::completed(
            input,
            Outcome::success(QuestionnaireAdministrationOutput { answers }),
            sub_processes,
            started,
        )
    }

    async fn instruction_message(&self, instruction: &Instruction) -> Result<PromptMessage> {
        match &instruction.source {
            InstructionSource::Message { message } => Ok(message.clone()),
            InstructionSource::Template { template } => {
                let ambient = document_ambient_values(self.document);
                PromptFormatter::new(self.model_set)
                    .format_prompt_message_template(template, &ambient)
                    .await
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stores::memory::MemoryModelSet;
    use crate::testing::MockLanguageModel;
    use crate::types::document::TextualEntity;
    use crate::types::prompt::{PromptMessageTemplate, PromptSource, Role};
    use crate::types::question::Question;

    fn document() -> Document {
        Document::new("doc-1").with_textual_entity(TextualEntity::plain_text("Some text."))
    }

    fn text_question(identifier: &str, prompt_text: &str) -> Question {
        Question::Text {
            identifier: identifier.into(),
            path: format!("p:{identifier}"),
            prompt: PromptSource::Message {
                message: PromptMessage::user(prompt_text),
            },
        }
    }

    #[tokio::test]
    async fn instruction_then_question_yields_a_two_message_prompt() {
        let doc = document();
        let model_set = MemoryModelSet::new();
        let model = MockLanguageModel::new().with_completion(r#"{"answer": "ok"}"#);
        let administrator = QuestionnaireAdministrator::new(&doc, &model_set, &model);

        let questionnaire = Questionnaire::new("qn-1")
            .with_instruction(Instruction::literal(
                "i-1",
                PromptMessage::system("Answer with JSON only."),
            ))
            .with_question(text_question("q-1", "What is the text about?"));

        let administration = administrator.administer(&questionnaire).await;
        assert!(administration.is_success());

        let prompts = model.invocations();
        assert_eq!(prompts.len(), 1);
        assert_eq!(prompts[0].len(), 2);
        assert_eq!(prompts[0].messages[0].content, "Answer with JSON only.");
        assert_eq!(prompts[0].messages[0].role, Role::System);

        // Instructions produce no question administration record
        assert_eq!(
            administration.sub_processes.question_administrations.len(),
            1
        );
    }

    #[tokio::test]
    async fn later_questions_see_earlier_answers_as_context() {
        let doc = document();
        let model_set = MemoryModelSet::new();
        let model = MockLanguageModel::new()
            .with_completion(r#"{"answer": "sports"}"#)
            .with_completion(r#"{"answer": "yes"}"#);
        let administrator = QuestionnaireAdministrator::new(&doc, &model_set, &model);

        let questionnaire = Questionnaire::new("qn-1")
            .with_question(text_question("q-1", "What is the topic?"))
            .with_question(text_question("q-2", "Are you sure?"));

        let administration = administrator.administer(&questionnaire).await;
        assert!(administration.is_success());

        let prompts = model.invocations();
        assert_eq!(prompts.len(), 2);
        // Second prompt: first question, its completion, second question
        assert_eq!(prompts[1].len(), 3);
        assert_eq!(prompts[1].messages[0].content, "What is the topic?");
        assert_eq!(prompts[1].messages[1].role, Role::Assistant);
        assert_eq!(prompts[1].messages[1].content, r#"{"answer": "sports"}"#);
        assert_eq!(prompts[1].messages[2].content, "Are you sure?");
    }

    #[tokio::test]
    async fn first_failing_question_stops_the_questionnaire() {
        let doc = document();
        let model_set = MemoryModelSet::new();
        let model = MockLanguageModel::new().with_failure("model exploded");
        let administrator = QuestionnaireAdministrator::new(&doc, &model_set, &model);

        let questionnaire = Questionnaire::new("qn-1")
            .with_question(text_question("q-1", "First?"))
            .with_question(text_question("q-2", "Second?"));

        let administration = administrator.administer(&questionnaire).await;

        assert!(administration.is_exception());
        let message = administration.output.exception_message().unwrap();
        assert!(message.contains("model exploded"));

        // Exactly one administration recorded; the second question never ran
        assert_eq!(
            administration.sub_processes.question_administrations.len(),
            1
        );
        assert_eq!(model.invocation_count(), 1);

        // The recorded administration carries the same exception
        let recorded = &administration.sub_processes.question_administrations[0];
        assert_eq!(recorded.output.exception_message(), Some(message));
    }

    #[tokio::test]
    async fn failing_instruction_template_stops_before_any_question() {
        let doc = document();
        let model_set = MemoryModelSet::new();
        let model = MockLanguageModel::new();
        let administrator = QuestionnaireAdministrator::new(&doc, &model_set, &model);

        let questionnaire = Questionnaire::new("qn-1")
            .with_instruction(Instruction::template(
                "i-1",
                PromptMessageTemplate::new(Role::System, "{{unbound}}"),
            ))
            .with_question(text_question("q-1", "Never asked?"));

        let administration = administrator.administer(&questionnaire).await;

        assert!(administration.is_exception());
        assert_eq!(
            administration.output.exception_message(),
            Some("unresolved template variable: unbound")
        );
        assert!(administration
            .sub_processes
            .question_administrations
            .is_empty());
        assert_eq!(model.invocation_count(), 0);
    }

    #[tokio::test]
    async fn answers_accumulate_per_question() {
        let doc = document();
        let model_set = MemoryModelSet::new();
        let model = MockLanguageModel::new()
            .with_completion(r#"{"answer": ["a", "b"]}"#)
            .with_completion(r#"{"answer": "c"}"#);
        let administrator = QuestionnaireAdministrator::new(&doc, &model_set, &model);

        let questionnaire = Questionnaire::new("qn-1")
            .with_question(text_question("q-1", "List things"))
            .with_question(text_question("q-2", "One more"));

        let administration = administrator.administer(&questionnaire).await;
        let output = administration.output.value().unwrap();

        assert_eq!(output.answers.len(), 2);
        assert_eq!(output.answers[0].question, "q-1");
        assert_eq!(output.answers[0].claims.len(), 2);
        assert_eq!(output.answers[1].claims.len(), 1);
    }

    #[tokio::test]
    async fn empty_questionnaire_succeeds_with_no_answers() {
        let doc = document();
        let model_set = MemoryModelSet::new();
        let model = MockLanguageModel::new();
        let administrator = QuestionnaireAdministrator::new(&doc, &model_set, &model);

        let administration = administrator.administer(&Questionnaire::new("qn-0")).await;
        assert!(administration.is_success());
        assert!(administration.output.value().unwrap().answers.is_empty());
    }
}
