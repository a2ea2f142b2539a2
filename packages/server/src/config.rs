//! Server configuration from environment variables.

use std::path::PathBuf;

use anyhow::{Context, Result};

/// Runtime configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Port to listen on (`ANNOTATION_PORT`, default 8080).
    pub port: u16,

    /// JSON model file loaded into the in-memory model set
    /// (`ANNOTATION_MODEL_FILE`, required).
    pub model_file: PathBuf,

    /// Directory for per-event trace snapshots
    /// (`ANNOTATION_TRACE_DIR`, optional).
    pub trace_dir: Option<PathBuf>,

    /// Default model API identifier for steps that do not name one
    /// (`ANNOTATION_DEFAULT_MODEL`, default `gpt-4o`).
    pub default_model: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let port = match std::env::var("ANNOTATION_PORT") {
            Ok(raw) => raw.parse().context("invalid ANNOTATION_PORT")?,
            Err(_) => 8080,
        };

        let model_file = std::env::var("ANNOTATION_MODEL_FILE")
            .context("ANNOTATION_MODEL_FILE not set")?
            .into();

        let trace_dir = std::env::var("ANNOTATION_TRACE_DIR").ok().map(PathBuf::from);

        let default_model =
            std::env::var("ANNOTATION_DEFAULT_MODEL").unwrap_or_else(|_| "gpt-4o".to_string());

        Ok(Self {
            port,
            model_file,
            trace_dir,
            default_model,
        })
    }
}
