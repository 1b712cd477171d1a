// src/tools/out_of_scope.rs — Polite decline for non-regulation questions

use async_trait::async_trait;

use super::{Tool, ToolContext, OUT_OF_SCOPE_HANDLER};
use crate::infra::errors::ScrutineerError;

/// Fixed decline answer for questions outside the FIA regulation corpus.
/// Shared by the tool and by the controller, which short-circuits
/// out-of-scope runs without dispatching any tool.
pub fn decline_message(question: &str) -> String {
    format!(
        "I specialize in FIA Formula 1 regulations and can't help with \"{}\".\n\n\
         I can help you with:\n\
         - Finding specific F1 regulations and rules\n\
         - Comparing regulations between seasons\n\
         - Looking up penalties for rule violations\n\
         - Summarizing regulation topics\n\n\
         Try asking something like:\n\
         - \"What are the penalties for track limit violations?\"\n\
         - \"Compare Article 5.2 between 2024 and 2025\"\n\
         - \"What are the power unit regulations for 2026?\"\n\
         - \"Summarize the rules on safety car restarts\"",
        question.trim()
    )
}

pub struct OutOfScopeTool;

impl OutOfScopeTool {
    pub fn new() -> Self {
        Self
    }
}

impl Default for OutOfScopeTool {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Tool for OutOfScopeTool {
    fn id(&self) -> &'static str {
        OUT_OF_SCOPE_HANDLER
    }

    fn description(&self) -> &'static str {
        "Decline questions unrelated to FIA Formula 1 regulations."
    }

    async fn execute(
        &self,
        query: &str,
        _context: &ToolContext,
    ) -> Result<String, ScrutineerError> {
        Ok(decline_message(query))
    }
}
