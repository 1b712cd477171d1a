// src/tools/search.rs — Targeted regulation search

use async_trait::async_trait;
use regex::Regex;
use std::sync::{Arc, LazyLock};

use super::{Tool, ToolContext, REGULATION_SEARCH};
use crate::infra::errors::ScrutineerError;
use crate::rag::{format_sources, RagPipeline};

const K: usize = 3;

static YEAR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(20\d{2})\b").expect("valid year pattern"));

/// Pull a season year out of the query text, e.g. "engine rules in 2024".
pub(crate) fn extract_year(query: &str) -> Option<String> {
    YEAR_RE
        .captures(query)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
}

pub struct RegulationSearchTool {
    pipeline: Arc<RagPipeline>,
}

impl RegulationSearchTool {
    pub fn new(pipeline: Arc<RagPipeline>) -> Self {
        Self { pipeline }
    }
}

#[async_trait]
impl Tool for RegulationSearchTool {
    fn id(&self) -> &'static str {
        REGULATION_SEARCH
    }

    fn description(&self) -> &'static str {
        "Search FIA regulations for specific articles, sections or rules."
    }

    async fn execute(
        &self,
        query: &str,
        context: &ToolContext,
    ) -> Result<String, ScrutineerError> {
        let mut filters = context.filters.clone();
        if filters.year.is_none() {
            filters.year = extract_year(query);
        }

        let grounded = self.pipeline.answer(query, &filters, K).await?;
        if grounded.is_empty() {
            return Ok("No relevant regulations found for your query.".into());
        }

        let mut out = format!("**Search Results:**\n{}\n\n", grounded.answer);
        out.push_str(&format_sources(&grounded.sources));
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::{ChatRequest, ChatResponse, ModelProvider, StopReason, TokenUsage};
    use crate::rag::{Passage, RetrievalFilters, Retriever};

    #[test]
    fn test_extract_year_present() {
        assert_eq!(
            extract_year("What are the engine rules in 2024?"),
            Some("2024".into())
        );
    }

    #[test]
    fn test_extract_year_takes_first() {
        assert_eq!(
            extract_year("rules in 2024 and 2025"),
            Some("2024".into())
        );
    }

    #[test]
    fn test_extract_year_absent() {
        assert_eq!(extract_year("What are the engine rules?"), None);
        assert_eq!(extract_year("Article 54.3 paragraph"), None);
    }

    // ─── execute ────────────────────────────────────────────────

    struct OnePassage;

    #[async_trait]
    impl Retriever for OnePassage {
        async fn retrieve(
            &self,
            _query: &str,
            filters: &RetrievalFilters,
            _k: usize,
        ) -> Result<Vec<Passage>, ScrutineerError> {
            // The year hint from the query must reach the retriever.
            assert_eq!(filters.year.as_deref(), Some("2024"));
            Ok(vec![Passage {
                text: "Power unit output is limited as specified.".into(),
                source: "2024 Technical Regulations".into(),
                citation: "Article 5.1".into(),
                year: Some("2024".into()),
                doc_type: None,
                score: 0.92,
            }])
        }
    }

    struct CannedProvider;

    #[async_trait]
    impl ModelProvider for CannedProvider {
        fn id(&self) -> &str {
            "canned"
        }
        fn name(&self) -> &str {
            "Canned"
        }
        fn default_model(&self) -> &str {
            "canned-1"
        }
        async fn chat(&self, _req: ChatRequest) -> Result<ChatResponse, ScrutineerError> {
            Ok(ChatResponse {
                content: "Engine power is limited per Article 5.1.".into(),
                usage: TokenUsage::default(),
                stop_reason: StopReason::EndTurn,
            })
        }
    }

    #[tokio::test]
    async fn test_execute_formats_results_with_sources() {
        let pipeline = Arc::new(RagPipeline::new(
            Arc::new(OnePassage),
            Arc::new(CannedProvider),
            "canned-1",
        ));
        let tool = RegulationSearchTool::new(pipeline);

        let out = tool
            .execute("What are the engine power limits in 2024?", &ToolContext::default())
            .await
            .unwrap();

        assert!(out.starts_with("**Search Results:**\n"));
        assert!(out.contains("Engine power is limited per Article 5.1."));
        assert!(out.contains("**Sources:**\n1. 2024 Technical Regulations, Article 5.1"));
    }
}
