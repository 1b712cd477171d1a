// src/tools/general.rs — General-purpose RAG fallback

use async_trait::async_trait;
use std::sync::Arc;

use super::{Tool, ToolContext, GENERAL_RAG};
use crate::infra::errors::ScrutineerError;
use crate::rag::RagPipeline;

const K: usize = 3;

/// Plain retrieve-and-answer over the whole corpus. Never selected by
/// classification; the controller falls back to it when classification
/// fails or a refinement switches away from every specialized tool.
pub struct GeneralRagTool {
    pipeline: Arc<RagPipeline>,
}

impl GeneralRagTool {
    pub fn new(pipeline: Arc<RagPipeline>) -> Self {
        Self { pipeline }
    }
}

#[async_trait]
impl Tool for GeneralRagTool {
    fn id(&self) -> &'static str {
        GENERAL_RAG
    }

    fn description(&self) -> &'static str {
        "Answer general questions against the full regulation corpus."
    }

    async fn execute(
        &self,
        query: &str,
        context: &ToolContext,
    ) -> Result<String, ScrutineerError> {
        let grounded = self.pipeline.answer(query, &context.filters, K).await?;
        if grounded.is_empty() {
            return Ok(
                "I couldn't find any relevant information in the FIA regulations for your question."
                    .to_string(),
            );
        }

        let mut out = format!("**Answer:**\n{}\n\n", grounded.answer);
        out.push_str(&crate::rag::format_sources(&grounded.sources));
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::{ChatRequest, ChatResponse, ModelProvider};
    use crate::rag::{Passage, RetrievalFilters, Retriever};

    struct EmptyRetriever;

    #[async_trait]
    impl Retriever for EmptyRetriever {
        async fn retrieve(
            &self,
            _query: &str,
            _filters: &RetrievalFilters,
            _k: usize,
        ) -> Result<Vec<Passage>, ScrutineerError> {
            Ok(Vec::new())
        }
    }

    struct NeverCalledProvider;

    #[async_trait]
    impl ModelProvider for NeverCalledProvider {
        fn id(&self) -> &'static str {
            "never"
        }
        fn name(&self) -> &'static str {
            "Never"
        }
        fn default_model(&self) -> &'static str {
            "never-1"
        }
        async fn chat(&self, _request: ChatRequest) -> Result<ChatResponse, ScrutineerError> {
            panic!("no model call expected on empty retrieval");
        }
    }

    #[tokio::test]
    async fn test_empty_corpus_message() {
        let pipeline = Arc::new(RagPipeline::new(
            Arc::new(EmptyRetriever),
            Arc::new(NeverCalledProvider),
            "never-1",
        ));
        let tool = GeneralRagTool::new(pipeline);
        let out = tool
            .execute("what is the meaning of article 99", &ToolContext::default())
            .await
            .unwrap();
        assert!(out.contains("couldn't find any relevant information"));
    }
}
