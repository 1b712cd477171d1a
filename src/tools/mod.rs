// src/tools/mod.rs — Tool capability interface and registry

pub mod comparison;
pub mod general;
pub mod out_of_scope;
pub mod penalty;
pub mod search;
pub mod summary;

pub use comparison::RegulationComparisonTool;
pub use general::GeneralRagTool;
pub use out_of_scope::OutOfScopeTool;
pub use penalty::PenaltyLookupTool;
pub use search::RegulationSearchTool;
pub use summary::RegulationSummaryTool;

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;

use crate::infra::errors::ScrutineerError;
use crate::rag::{RagPipeline, RetrievalFilters};

/// Canonical tool ids.
pub const REGULATION_SEARCH: &str = "regulation_search";
pub const REGULATION_COMPARISON: &str = "regulation_comparison";
pub const PENALTY_LOOKUP: &str = "penalty_lookup";
pub const REGULATION_SUMMARY: &str = "regulation_summary";
pub const GENERAL_RAG: &str = "general_rag";
pub const OUT_OF_SCOPE_HANDLER: &str = "out_of_scope_handler";

/// Ambient inputs for one tool invocation. Kept apart from the query so
/// caller-supplied filters survive query rewriting between iterations.
#[derive(Debug, Clone, Default)]
pub struct ToolContext {
    pub filters: RetrievalFilters,
}

/// A single agent capability. Implementations return their formatted
/// output or an error; converting errors into failed results is the
/// executor's job, not the tool's.
#[async_trait]
pub trait Tool: Send + Sync {
    fn id(&self) -> &'static str;
    fn description(&self) -> &'static str;
    async fn execute(&self, query: &str, context: &ToolContext)
        -> Result<String, ScrutineerError>;
}

impl std::fmt::Debug for dyn Tool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Tool").field("id", &self.id()).finish()
    }
}

/// Id-to-capability map. Populated once at startup, read-only afterwards;
/// every run shares the same registry behind an `Arc`.
#[derive(Default)]
pub struct ToolRegistry {
    tools: HashMap<String, Arc<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self {
            tools: HashMap::new(),
        }
    }

    /// Registry with the six standard regulation tools.
    pub fn with_standard_tools(pipeline: Arc<RagPipeline>) -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(RegulationSearchTool::new(pipeline.clone())));
        registry.register(Arc::new(RegulationComparisonTool::new(pipeline.clone())));
        registry.register(Arc::new(PenaltyLookupTool::new(pipeline.clone())));
        registry.register(Arc::new(RegulationSummaryTool::new(pipeline.clone())));
        registry.register(Arc::new(GeneralRagTool::new(pipeline)));
        registry.register(Arc::new(OutOfScopeTool::new()));
        registry
    }

    pub fn register(&mut self, tool: Arc<dyn Tool>) {
        self.tools.insert(tool.id().to_string(), tool);
    }

    pub fn resolve(&self, id: &str) -> Result<Arc<dyn Tool>, ScrutineerError> {
        self.tools
            .get(id)
            .cloned()
            .ok_or_else(|| ScrutineerError::UnknownTool {
                name: id.to_string(),
                suggestion: self.closest_id(id),
            })
    }

    pub fn contains(&self, id: &str) -> bool {
        self.tools.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Registered ids, sorted for stable listings.
    pub fn ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.tools.keys().cloned().collect();
        ids.sort();
        ids
    }

    /// Sorted (id, description) pairs for the CLI and API listings.
    pub fn descriptions(&self) -> Vec<(String, String)> {
        let mut out: Vec<(String, String)> = self
            .tools
            .values()
            .map(|t| (t.id().to_string(), t.description().to_string()))
            .collect();
        out.sort();
        out
    }

    /// Fuzzy nearest registered id, using Jaro-Winkler similarity. Only
    /// reasonably close matches (> 0.7) are suggested.
    fn closest_id(&self, id: &str) -> Option<String> {
        let mut best: Option<(f64, &String)> = None;
        for known in self.tools.keys() {
            let score = strsim::jaro_winkler(known, id);
            if score > 0.7 && best.map_or(true, |(b, _)| score > b) {
                best = Some((score, known));
            }
        }
        best.map(|(_, id)| id.clone())
    }
}
