//! The workflow engine - top-level orchestrator.
//!
//! Resolves the workflow and document handles, runs each step strictly in
//! declaration order with a freshly resolved language model, assembles the
//! full execution record, and emits lifecycle events for live streaming.
//! Exactly one document is handled per `execute` call; callers iterate
//! corpora themselves, one document at a time.

use std::sync::Arc;

use chrono::Utc;
use tracing::{info, warn};

use crate::error::Result;
use crate::events::{EventBus, WorkflowEvent};
use crate::pipeline::questionnaire::QuestionnaireAdministrator;
use crate::traits::model::{LanguageModel, LanguageModelFactory};
use crate::traits::store::ModelSet;
use crate::types::document::Document;
use crate::types::process::{
    Outcome, Process, WorkflowExecution, WorkflowExecutionInput, WorkflowExecutionSubProcesses,
    WorkflowStepExecution, WorkflowStepExecutionInput, WorkflowStepExecutionSubProcesses,
};
use crate::types::workflow::{WorkflowQuestionnaireStep, WorkflowStep};

/// Handles identifying what to execute.
#[derive(Debug, Clone)]
pub struct ExecuteRequest {
    pub workflow: String,
    pub document: String,
}

impl ExecuteRequest {
    pub fn new(workflow: impl Into<String>, document: impl Into<String>) -> Self {
        Self {
            workflow: workflow.into(),
            document: document.into(),
        }
    }
}

/// Top-level orchestrator for workflow executions.
pub struct WorkflowEngine<M: ModelSet, F: LanguageModelFactory> {
    model_set: Arc<M>,
    models: F,
    events: EventBus,
}

impl<M: ModelSet, F: LanguageModelFactory> WorkflowEngine<M, F> {
    pub fn new(model_set: Arc<M>, models: F) -> Self {
        Self {
            model_set,
            models,
            events: EventBus::new(),
        }
    }

    /// Subscribe to lifecycle events for live progress streaming or
    /// tracing. Subscribers receive immutable snapshots only and cannot
    /// influence execution.
    pub fn subscribe(&self) -> tokio::sync::broadcast::Receiver<WorkflowEvent> {
        self.events.subscribe()
    }

    /// Execute a workflow against a document. Never returns an error;
    /// failures are encoded in the execution record's output.
    pub async fn execute(&self, request: &ExecuteRequest) -> WorkflowExecution {
        let started = Utc::now();
        let input = WorkflowExecutionInput {
            workflow: request.workflow.clone(),
            document: request.document.clone(),
        };

        self.events.emit(WorkflowEvent::PreExecution {
            workflow: request.workflow.clone(),
            document: request.document.clone(),
            at: Utc::now(),
        });

        let execution = self.run(request, input, started).await;

        if let Some(message) = execution.output.exception_message() {
            warn!(workflow = %request.workflow, document = %request.document, %message, "workflow execution failed");
        } else {
            info!(workflow = %request.workflow, document = %request.document, "workflow execution finished");
        }

        self.events.emit(WorkflowEvent::PostExecution {
            execution: execution.clone(),
            at: Utc::now(),
        });

        execution
    }

    async fn run(
        &self,
        request: &ExecuteRequest,
        input: WorkflowExecutionInput,
        started: chrono::DateTime<Utc>,
    ) -> WorkflowExecution {
        // Resolution phase: no step runs against an unresolved handle.
        let workflow = match self.model_set.workflow(&request.workflow).await {
            Ok(workflow) => workflow,
            Err(error) => {
                return Process::completed(
                    input,
                    Outcome::exception(error.to_string()),
                    WorkflowExecutionSubProcesses::default(),
                    started,
                );
            }
        };

        let document = match self.model_set.document(&request.document).await {
            Ok(document) => document,
            Err(error) => {
                return Process::completed(
                    input,
                    Outcome::exception(error.to_string()),
                    WorkflowExecutionSubProcesses::default(),
                    started,
                );
            }
        };

        // Step execution phase: strictly sequential, stopping at the
        // first failing step.
        let mut step_executions: Vec<WorkflowStepExecution> = Vec::new();
        let mut first_exception: Option<String> = None;

        for (step_index, step) in workflow.steps.iter().enumerate() {
            let WorkflowStep::Questionnaire { step } = step;

            self.events.emit(WorkflowEvent::PreStepExecution {
                workflow: workflow.identifier.clone(),
                step_index,
                at: Utc::now(),
            });

            let execution = self
                .execute_questionnaire_step(&document, step_index, step)
                .await;

            self.events.emit(WorkflowEvent::PostStepExecution {
                workflow: workflow.identifier.clone(),
                step_index,
                execution: execution.clone(),
                at: Utc::now(),
            });

            let exception = execution.output.exception_message().map(str::to_string);
            step_executions.push(execution);

            if let Some(message) = exception {
                first_exception = Some(message);
                break;
            }
        }

        let output = match first_exception {
            Some(message) => Outcome::exception(message),
            None => Outcome::success(()),
        };

        Process::completed(
            input,
            output,
            WorkflowExecutionSubProcesses { step_executions },
            started,
        )
    }

    async fn execute_questionnaire_step(
        &self,
        document: &Document,
        step_index: usize,
        step: &WorkflowQuestionnaireStep,
    ) -> WorkflowStepExecution {
        let started = Utc::now();
        let input = WorkflowStepExecutionInput {
            step_index,
            questionnaire: step.questionnaire.identifier.clone(),
            language_model: step.language_model.clone(),
        };

        let language_model = match self.resolve_language_model(step).await {
            Ok(model) => model,
            Err(error) => {
                return Process::completed(
                    input,
                    Outcome::exception(error.to_string()),
                    WorkflowStepExecutionSubProcesses::default(),
                    started,
                );
            }
        };

        let administrator = QuestionnaireAdministrator::new(
            document,
            self.model_set.as_ref(),
            language_model.as_ref(),
        );
        let administration = administrator.administer(&step.questionnaire).await;

        // The step's output mirrors the administration's: the original
        // exception bubbles unchanged, success is an empty marker.
        let output = match administration.output.exception_message() {
            Some(message) => Outcome::exception(message.to_string()),
            None => Outcome::success(()),
        };

        Process::completed(
            input,
            output,
            WorkflowStepExecutionSubProcesses {
                questionnaire_administration: Some(administration),
            },
            started,
        )
    }

    /// Resolve the model a step runs with: an explicit specification
    /// reference through the model set and factory, or the factory's
    /// default.
    async fn resolve_language_model(
        &self,
        step: &WorkflowQuestionnaireStep,
    ) -> Result<Arc<dyn LanguageModel>> {
        match &step.language_model {
            Some(identifier) => {
                let specification = self
                    .model_set
                    .language_model_specification(identifier)
                    .await?;
                self.models.create(&specification)
            }
            None => self.models.default_model(),
        }
    }
}
