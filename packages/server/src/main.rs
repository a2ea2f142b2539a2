// Main entry point for the annotation server

mod config;
mod routes;
mod trace;

use std::sync::Arc;

use annotation::{
    LanguageModelSpecification, MemoryModelSet, OpenAiModelFactory, WorkflowEngine,
};
use anyhow::{Context, Result};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use config::Config;
use routes::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,annotation=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting annotation server");

    // Load configuration
    let config = Config::from_env().context("Failed to load configuration")?;

    // Load the model file
    let model_json = std::fs::read_to_string(&config.model_file).with_context(|| {
        format!("Failed to read model file: {}", config.model_file.display())
    })?;
    let model_set =
        Arc::new(MemoryModelSet::from_json(&model_json).context("Failed to parse model file")?);
    tracing::info!(
        documents = model_set.document_count(),
        workflows = model_set.workflow_count(),
        "Model file loaded"
    );

    // Build the engine with an OpenAI-backed model factory
    let default_specification =
        LanguageModelSpecification::new("default", &config.default_model);
    let factory = OpenAiModelFactory::from_env(default_specification)
        .context("Failed to create language model factory")?;
    let engine = Arc::new(WorkflowEngine::new(model_set.clone(), factory));

    // Optional trace writer
    if let Some(trace_dir) = &config.trace_dir {
        tokio::fs::create_dir_all(trace_dir)
            .await
            .context("Failed to create trace directory")?;
        trace::spawn_trace_writer(trace_dir.clone(), engine.subscribe());
        tracing::info!(directory = %trace_dir.display(), "Trace writer enabled");
    }

    // Build application
    let app = routes::router(AppState { engine, model_set });

    // Start server
    let addr = format!("0.0.0.0:{}", config.port);
    tracing::info!("Starting server on {}", addr);
    tracing::info!("Health check: http://localhost:{}/health", config.port);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .context("Failed to bind to address")?;

    axum::serve(listener, app).await.context("Server error")?;

    Ok(())
}
