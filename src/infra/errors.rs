// src/infra/errors.rs — Error types for Scrutineer

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ScrutineerError {
    // Input errors. The only fatal class: raised before the first
    // iteration, surfaced to the caller unchanged.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    // Orchestration errors, recovered inside the loop with documented
    // substitutions (fallback tool, pass-through answer, floor score).
    #[error("Unknown tool '{name}'")]
    UnknownTool {
        name: String,
        suggestion: Option<String>,
    },

    #[error("Tool '{tool}' failed: {message}")]
    ToolFailure { tool: String, message: String },

    #[error("Tool '{tool}' timed out after {elapsed_ms}ms")]
    Timeout { tool: String, elapsed_ms: u64 },

    #[error("Intent classification failed: {0}")]
    Classification(String),

    #[error("Result synthesis failed: {0}")]
    Synthesis(String),

    #[error("Quality scoring failed: {0}")]
    Scoring(String),

    // Model provider boundary
    #[error("Provider '{provider}' error: {message}")]
    Provider {
        provider: String,
        message: String,
        retriable: bool,
    },

    #[error("'{provider}' rate limited the request, retry in {retry_after_ms}ms")]
    RateLimited {
        provider: String,
        retry_after_ms: u64,
    },

    // Retrieval boundary
    #[error("Retrieval backend error: {0}")]
    Retrieval(String),

    // Ambient failures
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl ScrutineerError {
    pub fn is_retriable(&self) -> bool {
        matches!(
            self,
            ScrutineerError::Provider {
                retriable: true,
                ..
            } | ScrutineerError::RateLimited { .. }
        )
    }

    /// Whether this error aborts a run. Everything except `InvalidInput`
    /// is absorbed into the iteration loop as a degraded step.
    pub fn is_fatal(&self) -> bool {
        matches!(self, ScrutineerError::InvalidInput(_))
    }
}
