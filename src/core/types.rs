// src/core/types.rs — Core domain types

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;

use crate::provider::TokenUsage;

/// Question intent, as classified at the top of each iteration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Intent {
    Search,
    Comparison,
    Penalty,
    Summary,
    MultiTool,
    OutOfScope,
}

impl Intent {
    pub fn label(&self) -> &'static str {
        match self {
            Intent::Search => "SEARCH",
            Intent::Comparison => "COMPARISON",
            Intent::Penalty => "PENALTY",
            Intent::Summary => "SUMMARY",
            Intent::MultiTool => "MULTI_TOOL",
            Intent::OutOfScope => "OUT_OF_SCOPE",
        }
    }

    pub fn from_label(s: &str) -> Option<Self> {
        match s.trim().to_uppercase().as_str() {
            "SEARCH" => Some(Intent::Search),
            "COMPARISON" => Some(Intent::Comparison),
            "PENALTY" => Some(Intent::Penalty),
            "SUMMARY" => Some(Intent::Summary),
            "MULTI_TOOL" => Some(Intent::MultiTool),
            "OUT_OF_SCOPE" => Some(Intent::OutOfScope),
            _ => None,
        }
    }
}

impl std::fmt::Display for Intent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// How a multi-tool selection is executed. Single-tool steps record
/// `Parallel` (a parallel set of one).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExecutionStrategy {
    Parallel,
    Sequential,
}

impl Default for ExecutionStrategy {
    fn default() -> Self {
        Self::Parallel
    }
}

impl std::fmt::Display for ExecutionStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExecutionStrategy::Parallel => write!(f, "PARALLEL"),
            ExecutionStrategy::Sequential => write!(f, "SEQUENTIAL"),
        }
    }
}

/// An ordered set of tool ids plus the strategy for running them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolSelection {
    pub tools: Vec<String>,
    pub strategy: ExecutionStrategy,
}

impl ToolSelection {
    pub fn single(tool: impl Into<String>) -> Self {
        Self {
            tools: vec![tool.into()],
            strategy: ExecutionStrategy::Parallel,
        }
    }

    pub fn parallel(tools: Vec<String>) -> Self {
        Self {
            tools,
            strategy: ExecutionStrategy::Parallel,
        }
    }

    pub fn sequential(tools: Vec<String>) -> Self {
        Self {
            tools,
            strategy: ExecutionStrategy::Sequential,
        }
    }

    pub fn is_single(&self) -> bool {
        self.tools.len() == 1
    }

    /// First tool in the set. Selections are never empty: the classifier
    /// falls back to the general tool before producing one.
    pub fn primary(&self) -> &str {
        self.tools.first().map(String::as_str).unwrap_or_default()
    }
}

/// Outcome of one tool invocation. Immutable once produced; failures are
/// data here, never propagated errors.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolResult {
    pub tool: String,
    pub content: String,
    pub success: bool,
    pub error: Option<String>,
    pub elapsed_ms: u64,
}

impl ToolResult {
    pub fn ok(tool: impl Into<String>, content: impl Into<String>, elapsed_ms: u64) -> Self {
        Self {
            tool: tool.into(),
            content: content.into(),
            success: true,
            error: None,
            elapsed_ms,
        }
    }

    pub fn failed(tool: impl Into<String>, error: impl Into<String>, elapsed_ms: u64) -> Self {
        Self {
            tool: tool.into(),
            content: String::new(),
            success: false,
            error: Some(error.into()),
            elapsed_ms,
        }
    }
}

/// The four assessment dimensions, in tie-break order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Dimension {
    Completeness,
    Accuracy,
    Clarity,
    Specificity,
}

impl Dimension {
    pub fn as_str(&self) -> &'static str {
        match self {
            Dimension::Completeness => "completeness",
            Dimension::Accuracy => "accuracy",
            Dimension::Clarity => "clarity",
            Dimension::Specificity => "specificity",
        }
    }
}

impl std::fmt::Display for Dimension {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Four-dimension answer score. Each sub-score lives in [1, 10]; the
/// aggregate is their arithmetic mean.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct QualityScore {
    pub completeness: f32,
    pub accuracy: f32,
    pub clarity: f32,
    pub specificity: f32,
}

impl QualityScore {
    pub fn new(completeness: f32, accuracy: f32, clarity: f32, specificity: f32) -> Self {
        Self {
            completeness,
            accuracy,
            clarity,
            specificity,
        }
    }

    /// All four sub-scores set to the same value.
    pub fn uniform(value: f32) -> Self {
        Self::new(value, value, value, value)
    }

    pub fn aggregate(&self) -> f32 {
        (self.completeness + self.accuracy + self.clarity + self.specificity) / 4.0
    }

    pub fn passes(&self, threshold: f32) -> bool {
        self.aggregate() >= threshold
    }

    /// Clamp every sub-score into the valid [1, 10] range.
    pub fn clamped(self) -> Self {
        Self {
            completeness: self.completeness.clamp(1.0, 10.0),
            accuracy: self.accuracy.clamp(1.0, 10.0),
            clarity: self.clarity.clamp(1.0, 10.0),
            specificity: self.specificity.clamp(1.0, 10.0),
        }
    }

    pub fn get(&self, dim: Dimension) -> f32 {
        match dim {
            Dimension::Completeness => self.completeness,
            Dimension::Accuracy => self.accuracy,
            Dimension::Clarity => self.clarity,
            Dimension::Specificity => self.specificity,
        }
    }

    /// Lowest-scoring dimension. Ties resolve to the earlier dimension in
    /// declaration order, which keeps refinement deterministic.
    pub fn weakest_dimension(&self) -> Dimension {
        let dims = [
            Dimension::Completeness,
            Dimension::Accuracy,
            Dimension::Clarity,
            Dimension::Specificity,
        ];
        let mut weakest = dims[0];
        for dim in dims.into_iter().skip(1) {
            if self.get(dim) < self.get(weakest) {
                weakest = dim;
            }
        }
        weakest
    }
}

/// Refinement strategy chosen between iterations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RefinementStrategy {
    RefineQuery,
    SwitchTool,
    MultiToolOrchestration,
}

impl std::fmt::Display for RefinementStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RefinementStrategy::RefineQuery => write!(f, "REFINE_QUERY"),
            RefinementStrategy::SwitchTool => write!(f, "SWITCH_TOOL"),
            RefinementStrategy::MultiToolOrchestration => write!(f, "MULTI_TOOL_ORCHESTRATION"),
        }
    }
}

/// Verdict recorded at the end of each iteration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Decision {
    Continue,
    End,
}

impl std::fmt::Display for Decision {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Decision::Continue => write!(f, "CONTINUE"),
            Decision::End => write!(f, "END"),
        }
    }
}

/// Why a run stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TerminatedBy {
    QualityMet,
    MaxIterations,
    OutOfScope,
    BudgetExhausted,
}

impl std::fmt::Display for TerminatedBy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TerminatedBy::QualityMet => write!(f, "QUALITY_MET"),
            TerminatedBy::MaxIterations => write!(f, "MAX_ITERATIONS"),
            TerminatedBy::OutOfScope => write!(f, "OUT_OF_SCOPE"),
            TerminatedBy::BudgetExhausted => write!(f, "BUDGET_EXHAUSTED"),
        }
    }
}

/// One completed iteration, as recorded in the run trace.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReasoningStep {
    pub iteration: u8,
    pub intent: Intent,
    pub tools: Vec<String>,
    pub strategy: ExecutionStrategy,
    pub refinement: Option<RefinementStrategy>,
    pub rationale: String,
    pub quality: Option<QualityScore>,
    pub decision: Decision,
    pub elapsed_ms: u64,
}

/// Mutable state for one engine invocation. Never shared between runs;
/// concurrent invocations each build their own.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunState {
    pub run_id: String,
    pub question: String,
    /// Number of the iteration currently executing (1-based once the loop
    /// starts). Never exceeds the configured maximum.
    pub iteration: u8,
    pub history: Vec<ReasoningStep>,
    /// Results from the most recent ACT, keyed by tool id. Replaced
    /// wholesale each iteration.
    pub last_tool_results: HashMap<String, ToolResult>,
    /// Best candidate answer so far. Empty until the first synthesis.
    pub current_answer: String,
    pub terminal: bool,
}

impl RunState {
    pub fn new(question: impl Into<String>) -> Self {
        Self {
            run_id: uuid::Uuid::new_v4().to_string(),
            question: question.into(),
            iteration: 0,
            history: Vec::new(),
            last_tool_results: HashMap::new(),
            current_answer: String::new(),
            terminal: false,
        }
    }

    /// Aggregate score of the most recent scored iteration.
    pub fn latest_score(&self) -> Option<f32> {
        self.history
            .iter()
            .rev()
            .find_map(|s| s.quality.map(|q| q.aggregate()))
    }

    pub fn last_step(&self) -> Option<&ReasoningStep> {
        self.history.last()
    }
}

/// Final result returned to the caller.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunOutcome {
    pub run_id: String,
    pub question: String,
    pub answer: String,
    pub terminated_by: TerminatedBy,
    pub iterations: u8,
    pub final_score: Option<f32>,
    pub trace: Vec<ReasoningStep>,
    pub usage: TokenUsage,
    pub elapsed_ms: u64,
}

/// Named multi-tool escalation sets. Values are ordered tool-id lists.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CombinationTable {
    pub safety_and_penalties: Vec<String>,
    pub comprehensive_analysis: Vec<String>,
    pub comparison_analysis: Vec<String>,
}

impl Default for CombinationTable {
    fn default() -> Self {
        Self {
            safety_and_penalties: vec!["regulation_search".into(), "penalty_lookup".into()],
            comprehensive_analysis: vec!["regulation_search".into(), "regulation_summary".into()],
            comparison_analysis: vec!["regulation_comparison".into(), "regulation_summary".into()],
        }
    }
}

/// Configuration for the iteration controller.
#[derive(Debug, Clone)]
pub struct ControllerConfig {
    pub max_iterations: u8,
    pub quality_threshold: f32,
    pub max_parallel_tools: usize,
    pub tool_timeout: Duration,
    pub run_budget: Option<Duration>,
    pub combinations: CombinationTable,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            max_iterations: 3,
            quality_threshold: 7.0,
            max_parallel_tools: 3,
            tool_timeout: Duration::from_secs(30),
            run_budget: None,
            combinations: CombinationTable::default(),
        }
    }
}

impl From<&crate::infra::config::Config> for ControllerConfig {
    fn from(cfg: &crate::infra::config::Config) -> Self {
        Self {
            max_iterations: cfg.engine.max_iterations,
            quality_threshold: cfg.engine.quality_threshold,
            max_parallel_tools: cfg.engine.max_parallel_tools,
            tool_timeout: Duration::from_secs(cfg.engine.tool_timeout_seconds),
            run_budget: cfg.engine.run_budget_seconds.map(Duration::from_secs),
            combinations: CombinationTable {
                safety_and_penalties: cfg.combinations.safety_and_penalties.clone(),
                comprehensive_analysis: cfg.combinations.comprehensive_analysis.clone(),
                comparison_analysis: cfg.combinations.comparison_analysis.clone(),
            },
        }
    }
}

/// Progress callback events, emitted as a run advances.
#[derive(Debug, Clone)]
pub enum ProgressEvent {
    RunStarted {
        run_id: String,
        question: String,
    },
    IntentClassified {
        iteration: u8,
        intent: Intent,
        tools: Vec<String>,
    },
    ToolCompleted {
        iteration: u8,
        tool: String,
        success: bool,
        elapsed_ms: u64,
    },
    IterationCompleted {
        iteration: u8,
        max_iterations: u8,
        score: Option<f32>,
        decision: Decision,
    },
    RunCompleted {
        terminated_by: TerminatedBy,
        iterations: u8,
        elapsed_ms: u64,
    },
}

pub type ProgressCallback = Box<dyn Fn(ProgressEvent) + Send + Sync>;
