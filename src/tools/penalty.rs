// src/tools/penalty.rs — Penalty lookup over the sporting regulations

use async_trait::async_trait;
use std::sync::Arc;

use super::{Tool, ToolContext, PENALTY_LOOKUP};
use crate::infra::errors::ScrutineerError;
use crate::rag::{DocType, RagPipeline, RetrievalFilters};

const K: usize = 3;

/// Recognized violation phrases, checked in order against the lowercased
/// query. The first hit wins; queries naming none of them fall back to
/// track limits, the most commonly asked-about infringement.
const VIOLATIONS: &[(&str, &str)] = &[
    ("mgu-k", "MGU-K"),
    ("fuel", "fuel flow"),
    ("track limit", "track limits"),
    ("unsafe release", "unsafe release"),
    ("false start", "false start"),
    ("impeding", "impeding"),
];

const DEFAULT_VIOLATION: &str = "track limits";

pub(crate) fn extract_violation(query: &str) -> &'static str {
    let lowered = query.to_lowercase();
    for (needle, violation) in VIOLATIONS {
        if lowered.contains(needle) {
            return violation;
        }
    }
    DEFAULT_VIOLATION
}

fn title_case(s: &str) -> String {
    s.split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) if first.is_lowercase() => {
                    first.to_uppercase().collect::<String>() + chars.as_str()
                }
                _ => word.to_string(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

pub struct PenaltyLookupTool {
    pipeline: Arc<RagPipeline>,
}

impl PenaltyLookupTool {
    pub fn new(pipeline: Arc<RagPipeline>) -> Self {
        Self { pipeline }
    }
}

#[async_trait]
impl Tool for PenaltyLookupTool {
    fn id(&self) -> &'static str {
        PENALTY_LOOKUP
    }

    fn description(&self) -> &'static str {
        "Look up penalties and sanctions for specific rule violations."
    }

    async fn execute(
        &self,
        query: &str,
        context: &ToolContext,
    ) -> Result<String, ScrutineerError> {
        let violation = extract_violation(query);
        let penalty_query = format!("penalties for {violation} violations");

        // Penalties live in the sporting regulations regardless of what
        // document type the caller asked for.
        let filters = RetrievalFilters {
            year: context.filters.year.clone(),
            doc_type: Some(DocType::Sporting),
        };

        let grounded = self.pipeline.answer(&penalty_query, &filters, K).await?;
        if grounded.is_empty() {
            return Ok(format!(
                "No penalty information found for {violation} violations."
            ));
        }

        let mut out = format!(
            "**Penalties for {} Violations:**\n{}\n\n",
            title_case(violation),
            grounded.answer
        );
        out.push_str(&crate::rag::format_sources(&grounded.sources));
        Ok(out)
    }
}
