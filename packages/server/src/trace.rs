//! Trace writer: one JSON snapshot file per engine event.
//!
//! Subscribes to the engine bus and writes each event to the trace
//! directory as `<seq>-<kind>.json` for offline inspection. Write
//! failures are logged, never propagated; tracing can never abort an
//! execution.

use std::path::PathBuf;

use annotation::WorkflowEvent;
use tokio::sync::broadcast;
use tracing::warn;

/// Spawn the trace writer task. It runs until the engine bus closes.
pub fn spawn_trace_writer(
    directory: PathBuf,
    mut events: broadcast::Receiver<WorkflowEvent>,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut sequence: u64 = 0;
        loop {
            match events.recv().await {
                Ok(event) => {
                    sequence += 1;
                    let path = directory.join(format!("{sequence:06}-{}.json", event.kind()));
                    match serde_json::to_vec_pretty(&event) {
                        Ok(bytes) => {
                            if let Err(error) = tokio::fs::write(&path, bytes).await {
                                warn!(%error, path = %path.display(), "failed to write trace snapshot");
                            }
                        }
                        Err(error) => warn!(%error, "failed to serialize trace snapshot"),
                    }
                }
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(skipped, "trace writer lagged; events dropped");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    })
}
