// src/rag/remote.rs — HTTP client for the external retrieval service

use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;

use super::{DocType, Passage, RetrievalFilters, Retriever};
use crate::infra::config::RetrievalConfig;
use crate::infra::errors::ScrutineerError;

/// Retriever that calls a remote similarity-search endpoint.
///
/// Wire contract: `POST {base_url}/search` with
/// `{"query": ..., "k": ..., "year": ..., "doc_type": ...}`, answered by
/// `{"results": [{"text", "source", "citation", "year", "doc_type", "score"}]}`.
pub struct RemoteRetriever {
    base_url: String,
    request_timeout: Duration,
    client: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    results: Vec<WirePassage>,
}

#[derive(Debug, Deserialize)]
struct WirePassage {
    text: String,
    #[serde(default)]
    source: String,
    #[serde(default)]
    citation: String,
    year: Option<String>,
    doc_type: Option<String>,
    #[serde(default)]
    score: f32,
}

impl RemoteRetriever {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            request_timeout: Duration::from_secs(30),
            client: reqwest::Client::new(),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn from_config(cfg: &RetrievalConfig) -> Self {
        Self::new(cfg.base_url.clone())
            .with_timeout(Duration::from_secs(cfg.request_timeout_seconds))
    }
}

#[async_trait]
impl Retriever for RemoteRetriever {
    async fn retrieve(
        &self,
        query: &str,
        filters: &RetrievalFilters,
        k: usize,
    ) -> Result<Vec<Passage>, ScrutineerError> {
        let mut body = serde_json::json!({
            "query": query,
            "k": k,
        });
        if let Some(year) = &filters.year {
            body["year"] = serde_json::json!(year);
        }
        if let Some(doc_type) = filters.doc_type {
            body["doc_type"] = serde_json::json!(doc_type.as_str());
        }

        let response = self
            .client
            .post(format!("{}/search", self.base_url))
            .timeout(self.request_timeout)
            .json(&body)
            .send()
            .await
            .map_err(|e| ScrutineerError::Retrieval(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(ScrutineerError::Retrieval(format!(
                "search returned HTTP {status}: {text}"
            )));
        }

        let parsed: SearchResponse = response
            .json()
            .await
            .map_err(|e| ScrutineerError::Retrieval(format!("bad search response: {e}")))?;

        Ok(parsed
            .results
            .into_iter()
            .map(|w| Passage {
                text: w.text,
                source: w.source,
                citation: w.citation,
                year: w.year,
                doc_type: w.doc_type.as_deref().and_then(DocType::from_str_lenient),
                score: w.score,
            })
            .collect())
    }
}
