//! HTTP routes: the streaming annotation endpoint and a health check.
//!
//! `POST /api/annotate` runs a workflow against one document (or each
//! document of a corpus, strictly one at a time) on a background task and
//! relays every engine event to the client as a Server-Sent-Event with
//! the event kind as the SSE event type. The stream closes when the run
//! finishes.

use std::convert::Infallible;
use std::sync::Arc;

use annotation::{
    ExecuteRequest, MemoryModelSet, OpenAiModelFactory, WorkflowEngine, WorkflowEvent,
};
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use tokio_stream::wrappers::ReceiverStream;
use tower_http::trace::TraceLayer;
use tracing::warn;

pub type Engine = WorkflowEngine<MemoryModelSet, OpenAiModelFactory>;

/// Shared state for the annotation routes.
#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<Engine>,
    pub model_set: Arc<MemoryModelSet>,
}

/// Build the axum router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/annotate", post(annotate))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health() -> &'static str {
    "OK"
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnnotateRequest {
    pub workflow_identifier: String,
    #[serde(default)]
    pub document_identifier: Option<String>,
    #[serde(default)]
    pub corpus_identifier: Option<String>,
}

type EventStream = Sse<ReceiverStream<Result<Event, Infallible>>>;

async fn annotate(
    State(state): State<AppState>,
    Json(request): Json<AnnotateRequest>,
) -> Result<EventStream, (StatusCode, String)> {
    let documents = match (&request.document_identifier, &request.corpus_identifier) {
        (Some(document), _) => vec![document.clone()],
        (None, Some(corpus)) => {
            let documents = state.model_set.documents_in_corpus(corpus);
            if documents.is_empty() {
                return Err((
                    StatusCode::NOT_FOUND,
                    format!("no documents in corpus: {corpus}"),
                ));
            }
            documents
        }
        (None, None) => {
            return Err((
                StatusCode::BAD_REQUEST,
                "documentIdentifier or corpusIdentifier is required".to_string(),
            ));
        }
    };

    let (sender, receiver) = tokio::sync::mpsc::channel::<Result<Event, Infallible>>(64);
    let engine = state.engine.clone();
    let workflow = request.workflow_identifier;

    tokio::spawn(async move {
        for document in documents {
            if run_and_relay(&engine, &workflow, &document, &sender)
                .await
                .is_err()
            {
                // Client went away; stop the relay (the in-flight
                // execution completes and is simply abandoned).
                break;
            }
        }
    });

    Ok(Sse::new(ReceiverStream::new(receiver)).keep_alive(KeepAlive::default()))
}

/// Execute one workflow/document pair, forwarding engine events to the
/// SSE channel until the run's own `postExecution` arrives. Returns Err
/// when the client disconnected.
async fn run_and_relay(
    engine: &Arc<Engine>,
    workflow: &str,
    document: &str,
    sender: &tokio::sync::mpsc::Sender<Result<Event, Infallible>>,
) -> Result<(), ()> {
    let mut events = engine.subscribe();

    let execution = {
        let engine = engine.clone();
        let request = ExecuteRequest::new(workflow, document);
        tokio::spawn(async move { engine.execute(&request).await })
    };

    loop {
        match events.recv().await {
            Ok(event) => {
                let ours_and_final = matches!(
                    &event,
                    WorkflowEvent::PostExecution { execution: finished, .. }
                        if finished.input.workflow == workflow
                            && finished.input.document == document
                );

                match serde_json::to_string(&event) {
                    Ok(data) => {
                        let frame = Event::default().event(event.kind()).data(data);
                        if sender.send(Ok(frame)).await.is_err() {
                            return Err(());
                        }
                    }
                    Err(error) => warn!(%error, "failed to serialize engine event"),
                }

                if ours_and_final {
                    break;
                }
            }
            Err(tokio::sync::broadcast::error::RecvError::Lagged(skipped)) => {
                warn!(skipped, "event relay lagged; events dropped");
            }
            Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
        }
    }

    let _ = execution.await;
    Ok(())
}
