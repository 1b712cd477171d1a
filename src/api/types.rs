// src/api/types.rs

use serde::{Deserialize, Serialize};

/// Request body for asking a question.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AskRequest {
    pub question: String,
    /// Restrict retrieval to one regulation year, e.g. "2024".
    #[serde(default)]
    pub year: Option<String>,
    /// Restrict retrieval to one document type
    /// (sporting | technical | financial | operational).
    #[serde(default)]
    pub doc_type: Option<String>,
}

/// Tool catalog entry.
#[derive(Debug, Serialize)]
pub struct ToolInfo {
    pub id: String,
    pub description: String,
}

/// One recorded run, as listed by the history endpoint.
#[derive(Debug, Serialize)]
pub struct RunSummary {
    pub run_id: String,
    pub question: String,
    pub terminated_by: String,
    pub iterations: i32,
    pub final_score: Option<f64>,
    pub elapsed_ms: i64,
    pub created_at: String,
}

/// Error response body.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}
