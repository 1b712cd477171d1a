// src/core/synthesizer.rs — Combining tool results into one answer

use std::sync::Arc;

use super::types::ToolResult;
use crate::provider::{ChatRequest, Message, ModelProvider, TokenUsage};

/// Answer returned when no tool produced anything usable this iteration.
const DEGRADED_ANSWER: &str =
    "I was unable to process your question. Please try rephrasing it.";

/// Synthesis output. `must_continue` is set when every tool failed: the
/// degraded placeholder answer must never end a run on its own.
#[derive(Debug, Clone)]
pub struct Synthesis {
    pub answer: String,
    pub must_continue: bool,
    pub usage: TokenUsage,
    /// Recovery note for the step rationale, e.g. when generation failed
    /// and the outputs were concatenated instead.
    pub note: Option<String>,
}

/// Turns an iteration's tool results into a single candidate answer.
/// Total by construction: generation failures fall back to concatenation,
/// so the controller always receives an answer.
pub struct ResultSynthesizer {
    provider: Arc<dyn ModelProvider>,
    model: String,
}

impl ResultSynthesizer {
    pub fn new(provider: Arc<dyn ModelProvider>, model: String) -> Self {
        Self { provider, model }
    }

    pub async fn synthesize(&self, question: &str, results: &[ToolResult]) -> Synthesis {
        let successes: Vec<&ToolResult> = results.iter().filter(|r| r.success).collect();

        match successes.len() {
            0 => {
                tracing::warn!("no successful tool results to synthesize");
                Synthesis {
                    answer: DEGRADED_ANSWER.to_string(),
                    must_continue: true,
                    usage: TokenUsage::default(),
                    note: Some("all tools failed; degraded answer substituted".into()),
                }
            }
            // A single result is already a formatted, grounded answer.
            1 => Synthesis {
                answer: successes[0].content.clone(),
                must_continue: false,
                usage: TokenUsage::default(),
                note: None,
            },
            _ => self.combine(question, &successes).await,
        }
    }

    /// Merge several successful outputs into one narrative, attributing
    /// claims to the tools that produced them.
    async fn combine(&self, question: &str, successes: &[&ToolResult]) -> Synthesis {
        let blocks = result_blocks(successes);
        let prompt = combination_prompt(question, &blocks);

        let request = ChatRequest {
            model: self.model.clone(),
            messages: vec![Message::system(&prompt), Message::user(question)],
            max_tokens: Some(1536),
            temperature: Some(0.2),
        };

        match self.provider.chat(request).await {
            Ok(response) if !response.content.trim().is_empty() => Synthesis {
                answer: response.content,
                must_continue: false,
                usage: response.usage,
                note: None,
            },
            Ok(response) => Synthesis {
                answer: blocks,
                must_continue: false,
                usage: response.usage,
                note: Some("synthesis returned empty text; tool outputs concatenated".into()),
            },
            Err(e) => {
                tracing::warn!("synthesis failed, concatenating tool outputs: {e}");
                Synthesis {
                    answer: blocks,
                    must_continue: false,
                    usage: TokenUsage::default(),
                    note: Some(format!("synthesis failed ({e}); tool outputs concatenated")),
                }
            }
        }
    }
}

fn result_blocks(successes: &[&ToolResult]) -> String {
    successes
        .iter()
        .map(|r| format!("**{}**:\n{}", r.tool, r.content))
        .collect::<Vec<_>>()
        .join("\n\n")
}

fn combination_prompt(question: &str, results_text: &str) -> String {
    format!(
        "You are an expert FIA Formula 1 regulations analyst. Combine the following results \
         from multiple tools into a comprehensive, well-structured answer.\n\n\
         Original Question: {question}\n\n\
         Tool Results:\n{results_text}\n\n\
         Instructions:\n\
         1. Synthesize the information from all tools\n\
         2. Attribute claims to the tool results they came from\n\
         3. Cross-reference overlapping findings and call out conflicts\n\
         4. Organize the information logically with clear headings\n\
         5. Ensure the answer directly addresses the original question\n\n\
         Provide a well-organized, comprehensive answer that combines all the information \
         effectively."
    )
}
