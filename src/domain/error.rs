use thiserror::Error;

use crate::app::ConfigError;
use crate::store::StoreError;

/// Top-level error type for a pipeline run.
///
/// Item-level failures never surface here; they are logged and counted by the
/// stage that hit them.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Startup failed: {details}")]
    Startup {
        details: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid pipeline settings: {0}")]
    InvalidSettings(String),

    #[error("Stage thread '{stage}' panicked")]
    StagePanicked { stage: String },

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}
