// src/tools/summary.rs — Broad-coverage regulation summaries

use async_trait::async_trait;
use std::sync::Arc;

use super::{Tool, ToolContext, REGULATION_SUMMARY};
use crate::infra::errors::ScrutineerError;
use crate::rag::RagPipeline;

// Summaries pull a wider net than point lookups.
const K: usize = 5;

pub struct RegulationSummaryTool {
    pipeline: Arc<RagPipeline>,
}

impl RegulationSummaryTool {
    pub fn new(pipeline: Arc<RagPipeline>) -> Self {
        Self { pipeline }
    }
}

#[async_trait]
impl Tool for RegulationSummaryTool {
    fn id(&self) -> &'static str {
        REGULATION_SUMMARY
    }

    fn description(&self) -> &'static str {
        "Produce a comprehensive summary of a regulation area across multiple documents."
    }

    async fn execute(
        &self,
        query: &str,
        context: &ToolContext,
    ) -> Result<String, ScrutineerError> {
        let grounded = self.pipeline.answer(query, &context.filters, K).await?;
        if grounded.is_empty() {
            return Ok("No relevant regulations found for your query.".to_string());
        }

        let mut out = format!("**Comprehensive Analysis: {query}**\n\n{}\n\n", grounded.answer);
        out.push_str(&format!(
            "**Analysis based on {} regulation documents:**\n",
            grounded.sources.len()
        ));
        for (i, source) in grounded.sources.iter().enumerate() {
            out.push_str(&format!("{}. {source}\n", i + 1));
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::{ChatRequest, ChatResponse, ModelProvider, StopReason, TokenUsage};
    use crate::rag::{Passage, RetrievalFilters, Retriever};

    struct ThreePassages;

    #[async_trait]
    impl Retriever for ThreePassages {
        async fn retrieve(
            &self,
            _query: &str,
            _filters: &RetrievalFilters,
            _k: usize,
        ) -> Result<Vec<Passage>, ScrutineerError> {
            Ok((1..=3)
                .map(|i| Passage {
                    text: format!("passage {i}"),
                    source: format!("doc-{i}.pdf"),
                    citation: format!("Article {i}"),
                    year: Some("2025".into()),
                    doc_type: None,
                    score: 1.0 - i as f32 * 0.1,
                })
                .collect())
        }
    }

    struct CannedProvider;

    #[async_trait]
    impl ModelProvider for CannedProvider {
        fn id(&self) -> &'static str {
            "canned"
        }
        fn name(&self) -> &'static str {
            "Canned"
        }
        fn default_model(&self) -> &'static str {
            "canned-1"
        }
        async fn chat(&self, _request: ChatRequest) -> Result<ChatResponse, ScrutineerError> {
            Ok(ChatResponse {
                content: "the rules cover three areas".into(),
                usage: TokenUsage::default(),
                stop_reason: StopReason::EndTurn,
            })
        }
    }

    #[tokio::test]
    async fn test_summary_counts_documents() {
        let pipeline = Arc::new(RagPipeline::new(
            Arc::new(ThreePassages),
            Arc::new(CannedProvider),
            "canned-1",
        ));
        let tool = RegulationSummaryTool::new(pipeline);
        let out = tool
            .execute("power unit rules", &ToolContext::default())
            .await
            .unwrap();

        assert!(out.starts_with("**Comprehensive Analysis: power unit rules**"));
        assert!(out.contains("**Analysis based on 3 regulation documents:**"));
        assert!(out.contains("1. doc-1.pdf, Article 1"));
    }
}
