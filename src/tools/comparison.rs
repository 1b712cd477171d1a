// src/tools/comparison.rs — Year-over-year regulation comparison

use async_trait::async_trait;
use regex::Regex;
use std::sync::{Arc, LazyLock};

use super::{Tool, ToolContext, REGULATION_COMPARISON};
use crate::infra::errors::ScrutineerError;
use crate::rag::{RagPipeline, RetrievalFilters};

const K_PER_YEAR: usize = 2;

static ARTICLE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)article\s+(\d+(?:\.\d+)?)").expect("valid article pattern"));
static YEAR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(20\d{2})\b").expect("valid year pattern"));

/// What a comparison query asks for: an optional article number and the
/// two seasons to compare.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ComparisonRequest {
    pub article: Option<String>,
    pub year_a: String,
    pub year_b: String,
}

/// Parse the comparison parameters out of free text. Two distinct season
/// years are required; without them there is nothing to compare and the
/// invocation fails.
pub(crate) fn parse_comparison(query: &str) -> Result<ComparisonRequest, ScrutineerError> {
    let mut years: Vec<String> = Vec::new();
    for m in YEAR_RE.find_iter(query) {
        let y = m.as_str().to_string();
        if !years.contains(&y) {
            years.push(y);
        }
    }

    if years.len() < 2 {
        return Err(ScrutineerError::ToolFailure {
            tool: REGULATION_COMPARISON.into(),
            message: format!("could not identify two regulation years to compare in: {query}"),
        });
    }

    let article = ARTICLE_RE
        .captures(query)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string());

    Ok(ComparisonRequest {
        article,
        year_a: years[0].clone(),
        year_b: years[1].clone(),
    })
}

pub struct RegulationComparisonTool {
    pipeline: Arc<RagPipeline>,
}

impl RegulationComparisonTool {
    pub fn new(pipeline: Arc<RagPipeline>) -> Self {
        Self { pipeline }
    }
}

#[async_trait]
impl Tool for RegulationComparisonTool {
    fn id(&self) -> &'static str {
        REGULATION_COMPARISON
    }

    fn description(&self) -> &'static str {
        "Compare specific articles or topics between different regulation years."
    }

    async fn execute(
        &self,
        query: &str,
        context: &ToolContext,
    ) -> Result<String, ScrutineerError> {
        let request = parse_comparison(query)?;

        let subject = match &request.article {
            Some(a) => format!("Article {a}"),
            None => query.to_string(),
        };

        let filters_a = RetrievalFilters {
            year: Some(request.year_a.clone()),
            doc_type: context.filters.doc_type,
        };
        let filters_b = RetrievalFilters {
            year: Some(request.year_b.clone()),
            doc_type: context.filters.doc_type,
        };

        let side_a = self.pipeline.answer(&subject, &filters_a, K_PER_YEAR).await?;
        let side_b = self.pipeline.answer(&subject, &filters_b, K_PER_YEAR).await?;

        if side_a.is_empty() || side_b.is_empty() {
            return Ok(format!(
                "Could not find {subject} in one or both of {} and {}.",
                request.year_a, request.year_b
            ));
        }

        let header = match &request.article {
            Some(a) => format!("**Article {a} Comparison:**\n\n"),
            None => format!(
                "**Comparison ({} vs {}):**\n\n",
                request.year_a, request.year_b
            ),
        };

        let mut out = header;
        out.push_str(&format!(
            "**{} Version:**\n{}\n\n",
            request.year_a, side_a.answer
        ));
        out.push_str(&format!(
            "**{} Version:**\n{}\n\n",
            request.year_b, side_b.answer
        ));

        out.push_str("**Sources:**\n");
        if let Some(src) = side_a.sources.first() {
            out.push_str(&format!("{}: {src}\n", request.year_a));
        }
        if let Some(src) = side_b.sources.first() {
            out.push_str(&format!("{}: {src}\n", request.year_b));
        }

        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_article_and_years() {
        let r = parse_comparison("Compare Article 5.2 between 2024 and 2025").unwrap();
        assert_eq!(r.article.as_deref(), Some("5.2"));
        assert_eq!(r.year_a, "2024");
        assert_eq!(r.year_b, "2025");
    }

    #[test]
    fn test_parse_article_case_insensitive() {
        let r = parse_comparison("compare ARTICLE 12 in 2024 vs 2026").unwrap();
        assert_eq!(r.article.as_deref(), Some("12"));
    }

    #[test]
    fn test_parse_topic_without_article() {
        let r = parse_comparison("How did the budget cap change from 2024 to 2025?").unwrap();
        assert!(r.article.is_none());
        assert_eq!(r.year_a, "2024");
        assert_eq!(r.year_b, "2025");
    }

    #[test]
    fn test_parse_duplicate_year_rejected() {
        // "2024 and 2024" names one season twice, not two seasons
        let err = parse_comparison("Compare Article 5 in 2024 and 2024").unwrap_err();
        assert!(matches!(err, ScrutineerError::ToolFailure { .. }));
    }

    #[test]
    fn test_parse_missing_years_fails() {
        let err = parse_comparison("Compare the engine regulations").unwrap_err();
        match err {
            ScrutineerError::ToolFailure { tool, message } => {
                assert_eq!(tool, REGULATION_COMPARISON);
                assert!(message.contains("two regulation years"));
            }
            other => panic!("expected ToolFailure, got {other:?}"),
        }
    }

    #[test]
    fn test_parse_keeps_first_two_years() {
        let r = parse_comparison("Across 2023, 2024 and 2025 seasons").unwrap();
        assert_eq!(r.year_a, "2023");
        assert_eq!(r.year_b, "2024");
    }
}
