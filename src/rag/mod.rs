// src/rag/mod.rs — Grounded retrieval pipeline
//
// The vector index, embeddings and document chunking live in an external
// service behind the `Retriever` trait. This module owns what happens
// after retrieval: context assembly and cited answer generation.

pub mod remote;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::infra::errors::ScrutineerError;
use crate::provider::{ChatRequest, Message, ModelProvider};
use crate::util::clip;

/// Regulation document families.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocType {
    Sporting,
    Technical,
    Financial,
    Operational,
}

impl DocType {
    pub fn as_str(&self) -> &'static str {
        match self {
            DocType::Sporting => "sporting",
            DocType::Technical => "technical",
            DocType::Financial => "financial",
            DocType::Operational => "operational",
        }
    }

    pub fn from_str_lenient(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "sporting" => Some(DocType::Sporting),
            "technical" => Some(DocType::Technical),
            "financial" => Some(DocType::Financial),
            "operational" => Some(DocType::Operational),
            _ => None,
        }
    }
}

impl std::fmt::Display for DocType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Metadata filters applied at retrieval time.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RetrievalFilters {
    pub year: Option<String>,
    pub doc_type: Option<DocType>,
}

impl RetrievalFilters {
    pub fn for_year(year: impl Into<String>) -> Self {
        Self {
            year: Some(year.into()),
            doc_type: None,
        }
    }

    pub fn with_doc_type(mut self, doc_type: DocType) -> Self {
        self.doc_type = Some(doc_type);
        self
    }
}

/// One retrieved regulation extract.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Passage {
    pub text: String,
    /// Document label, e.g. "2024 Formula 1 Sporting Regulations".
    pub source: String,
    /// Position within the document, e.g. "Article 54.3".
    pub citation: String,
    pub year: Option<String>,
    pub doc_type: Option<DocType>,
    pub score: f32,
}

impl Passage {
    /// Human-readable source reference for answer footers.
    pub fn reference(&self) -> String {
        if self.citation.is_empty() {
            self.source.clone()
        } else {
            format!("{}, {}", self.source, self.citation)
        }
    }
}

/// Boundary to the external similarity-search service.
#[async_trait]
pub trait Retriever: Send + Sync {
    async fn retrieve(
        &self,
        query: &str,
        filters: &RetrievalFilters,
        k: usize,
    ) -> Result<Vec<Passage>, ScrutineerError>;
}

/// A grounded answer plus the references it drew on.
#[derive(Debug, Clone)]
pub struct GroundedAnswer {
    pub answer: String,
    pub sources: Vec<String>,
}

impl GroundedAnswer {
    pub fn empty() -> Self {
        Self {
            answer: String::new(),
            sources: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.answer.trim().is_empty()
    }
}

/// Longest passage slice fed into the generation prompt.
const MAX_PASSAGE_CHARS: usize = 2_000;

/// Retrieve-then-generate pipeline shared by all retrieval tools.
pub struct RagPipeline {
    retriever: Arc<dyn Retriever>,
    provider: Arc<dyn ModelProvider>,
    model: String,
}

impl RagPipeline {
    pub fn new(
        retriever: Arc<dyn Retriever>,
        provider: Arc<dyn ModelProvider>,
        model: impl Into<String>,
    ) -> Self {
        Self {
            retriever,
            provider,
            model: model.into(),
        }
    }

    /// Raw passage retrieval, for callers that format their own output.
    pub async fn retrieve(
        &self,
        query: &str,
        filters: &RetrievalFilters,
        k: usize,
    ) -> Result<Vec<Passage>, ScrutineerError> {
        self.retriever.retrieve(query, filters, k).await
    }

    /// Full pipeline: retrieve `k` passages, then generate an answer
    /// grounded in them. An empty retrieval produces an empty answer and
    /// no model call; callers decide how to phrase "nothing found".
    pub async fn answer(
        &self,
        query: &str,
        filters: &RetrievalFilters,
        k: usize,
    ) -> Result<GroundedAnswer, ScrutineerError> {
        let passages = self.retriever.retrieve(query, filters, k).await?;
        if passages.is_empty() {
            tracing::debug!(query, "retrieval returned no passages");
            return Ok(GroundedAnswer::empty());
        }

        let context = format_context(&passages);
        let system = "You are an expert FIA Formula 1 regulations analyst. \
            Answer strictly from the regulation extracts provided. \
            Cite the specific articles you rely on. \
            If the extracts do not contain the answer, say so plainly."
            .to_string();
        let user = format!("Regulation extracts:\n\n{context}\n\nQuestion: {query}");

        let response = self
            .provider
            .chat(ChatRequest {
                model: self.model.clone(),
                messages: vec![Message::system(system), Message::user(user)],
                max_tokens: Some(1024),
                temperature: Some(0.1),
            })
            .await?;

        let sources = passages.iter().map(Passage::reference).collect();
        Ok(GroundedAnswer {
            answer: response.content,
            sources,
        })
    }
}

/// Number the passages and tag each with its source reference so the
/// model can cite them.
pub fn format_context(passages: &[Passage]) -> String {
    let mut out = String::new();
    for (i, p) in passages.iter().enumerate() {
        if i > 0 {
            out.push_str("\n\n");
        }
        out.push_str(&format!(
            "[{}] ({})\n{}",
            i + 1,
            p.reference(),
            clip(&p.text, MAX_PASSAGE_CHARS)
        ));
    }
    out
}

/// Standard "**Sources:**" footer used by the retrieval tools.
pub fn format_sources(sources: &[String]) -> String {
    let mut out = String::from("**Sources:**\n");
    for (i, s) in sources.iter().enumerate() {
        out.push_str(&format!("{}. {}\n", i + 1, s));
    }
    out
}
