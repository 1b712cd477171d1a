// src/core/classifier.rs — Intent classification and tool selection

use regex::Regex;
use std::sync::{Arc, LazyLock};

use super::types::{ExecutionStrategy, Intent, ReasoningStep, ToolSelection};
use crate::infra::errors::ScrutineerError;
use crate::provider::{ChatRequest, Message, ModelProvider, TokenUsage};
use crate::tools::{self, ToolRegistry};

static TOOL_NAME_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#""(regulation_\w+|penalty_\w+|general_\w+)""#).expect("valid tool name pattern")
});

/// What REASON produces: the question's intent, the tools to run, and a
/// trace-friendly rationale. Usage covers every model call made on the way.
#[derive(Debug, Clone)]
pub struct Classification {
    pub intent: Intent,
    pub selection: ToolSelection,
    pub rationale: String,
    pub usage: TokenUsage,
}

/// Classifies a question into one of the six intents and maps the intent
/// to a tool selection. Tool ids are validated against the registry; any
/// id the registry does not know is a classification error, which the
/// controller recovers from with the general fallback tool.
pub struct IntentClassifier {
    provider: Arc<dyn ModelProvider>,
    registry: Arc<ToolRegistry>,
    model: String,
}

impl IntentClassifier {
    pub fn new(provider: Arc<dyn ModelProvider>, registry: Arc<ToolRegistry>, model: String) -> Self {
        Self {
            provider,
            registry,
            model,
        }
    }

    pub async fn classify(
        &self,
        question: &str,
        history: &[ReasoningStep],
    ) -> Result<Classification, ScrutineerError> {
        let mut usage = TokenUsage::default();

        let prompt = classification_prompt(question, history);
        let response = self
            .provider
            .chat(ChatRequest {
                model: self.model.clone(),
                messages: vec![Message::system(&prompt), Message::user(question)],
                max_tokens: Some(32),
                temperature: Some(0.0),
            })
            .await?;
        usage.add(&response.usage);

        let label = response.content.trim();
        let intent = Intent::from_label(label).ok_or_else(|| {
            ScrutineerError::Classification(format!("unrecognized intent label: {label:?}"))
        })?;

        let selection = match intent {
            Intent::Search => ToolSelection::single(tools::REGULATION_SEARCH),
            Intent::Comparison => ToolSelection::single(tools::REGULATION_COMPARISON),
            Intent::Penalty => ToolSelection::single(tools::PENALTY_LOOKUP),
            Intent::Summary => ToolSelection::single(tools::REGULATION_SUMMARY),
            Intent::OutOfScope => ToolSelection::single(tools::OUT_OF_SCOPE_HANDLER),
            Intent::MultiTool => {
                let (selection, select_usage) = self.select_tools(question).await?;
                usage.add(&select_usage);
                selection
            }
        };

        for id in &selection.tools {
            if !self.registry.contains(id) {
                return Err(ScrutineerError::Classification(format!(
                    "classifier selected unknown tool: {id}"
                )));
            }
        }

        let rationale = format!(
            "Intent {intent}: dispatching [{}] ({})",
            selection.tools.join(", "),
            selection.strategy
        );

        tracing::debug!(%intent, tools = ?selection.tools, "question classified");

        Ok(Classification {
            intent,
            selection,
            rationale,
            usage,
        })
    }

    /// Second model call for MULTI_TOOL questions: which tools, and
    /// whether they chain.
    async fn select_tools(
        &self,
        question: &str,
    ) -> Result<(ToolSelection, TokenUsage), ScrutineerError> {
        let prompt = tool_selection_prompt(question);
        let response = self
            .provider
            .chat(ChatRequest {
                model: self.model.clone(),
                messages: vec![Message::system(&prompt), Message::user(question)],
                max_tokens: Some(128),
                temperature: Some(0.0),
            })
            .await?;

        let selection = parse_tool_selection(&response.content);
        Ok((selection, response.usage))
    }
}

fn classification_prompt(question: &str, history: &[ReasoningStep]) -> String {
    let mut prompt = format!(
        "Classify this FIA regulation question into one of these categories:\n\n\
         1. COMPARISON - Comparing regulations between years (e.g., \"compare 2024 and 2025\", \"differences between years\")\n\
         2. PENALTY - Looking up penalties or violations (e.g., \"penalties for track limits\", \"violations\", \"sanctions\")\n\
         3. SEARCH - Finding specific regulations (e.g., \"find Article 5\", \"search for engine rules\", \"what are the requirements\")\n\
         4. SUMMARY - Comprehensive analysis (e.g., \"summarize safety requirements\", \"comprehensive analysis\")\n\
         5. MULTI_TOOL - Questions requiring multiple tools (e.g., \"safety requirements AND penalties\", \"compare AND summarize\")\n\
         6. OUT_OF_SCOPE - Not about FIA regulations (e.g., \"weather\", \"cooking\", \"other topics\")\n\n\
         Question: {question}\n"
    );

    if !history.is_empty() {
        let attempted: Vec<&str> = history
            .iter()
            .flat_map(|s| s.tools.iter().map(String::as_str))
            .collect();
        prompt.push_str(&format!(
            "\nEarlier attempts used these tools without producing a satisfactory answer: {}\n",
            attempted.join(", ")
        ));
    }

    prompt.push_str(
        "\nReturn only the category name (COMPARISON, PENALTY, SEARCH, SUMMARY, MULTI_TOOL, or OUT_OF_SCOPE).",
    );
    prompt
}

fn tool_selection_prompt(question: &str) -> String {
    format!(
        "Analyze this FIA regulation question and determine which tools are needed:\n\n\
         Available tools:\n\
         - regulation_search: Find specific regulations\n\
         - regulation_comparison: Compare regulations between years\n\
         - penalty_lookup: Look up penalties for violations\n\
         - regulation_summary: Create comprehensive summaries\n\
         - general_rag: General regulation questions\n\n\
         Question: {question}\n\n\
         Determine which tools are needed to fully answer this question. Consider:\n\
         1. Does it ask for specific regulations? -> regulation_search\n\
         2. Does it ask for comparisons? -> regulation_comparison\n\
         3. Does it ask for penalties? -> penalty_lookup\n\
         4. Does it ask for summaries? -> regulation_summary\n\n\
         Return JSON: either a list of tool names, e.g. [\"regulation_search\", \"penalty_lookup\"],\n\
         or an object {{\"tools\": [...], \"mode\": \"parallel\"|\"sequential\"}} when one tool\n\
         should build on another tool's output."
    )
}

/// Parse the tool-selection response. Accepts a bare JSON array, a
/// `{"tools": [...], "mode": ...}` object, or free text (tool names are
/// then pulled out by pattern). An unusable response falls back to the
/// general tool; execution mode defaults to parallel.
pub fn parse_tool_selection(text: &str) -> ToolSelection {
    let trimmed = text.trim();

    if let Ok(value) = serde_json::from_str::<serde_json::Value>(trimmed) {
        match value {
            serde_json::Value::Array(items) => {
                let tools = string_items(&items);
                if !tools.is_empty() {
                    return ToolSelection::parallel(dedup(tools));
                }
            }
            serde_json::Value::Object(map) => {
                let tools = map
                    .get("tools")
                    .and_then(|v| v.as_array())
                    .map(|items| string_items(items))
                    .unwrap_or_default();
                if !tools.is_empty() {
                    let tools = dedup(tools);
                    let sequential = map
                        .get("mode")
                        .and_then(|v| v.as_str())
                        .is_some_and(|m| m.eq_ignore_ascii_case("sequential"));
                    return if sequential {
                        ToolSelection::sequential(tools)
                    } else {
                        ToolSelection::parallel(tools)
                    };
                }
            }
            _ => {}
        }
    }

    let extracted: Vec<String> = TOOL_NAME_RE
        .captures_iter(trimmed)
        .filter_map(|c| c.get(1))
        .map(|m| m.as_str().to_string())
        .collect();
    if !extracted.is_empty() {
        return ToolSelection::parallel(dedup(extracted));
    }

    ToolSelection::single(tools::GENERAL_RAG)
}

fn string_items(items: &[serde_json::Value]) -> Vec<String> {
    items
        .iter()
        .filter_map(|v| v.as_str())
        .map(str::to_string)
        .collect()
}

fn dedup(tools: Vec<String>) -> Vec<String> {
    let mut seen = Vec::with_capacity(tools.len());
    for t in tools {
        if !seen.contains(&t) {
            seen.push(t);
        }
    }
    seen
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::{ChatResponse, StopReason};
    use crate::tools::{Tool, ToolContext};
    use async_trait::async_trait;
    use std::sync::Mutex;

    // ─── Selection parsing ──────────────────────────────────────

    #[test]
    fn test_parse_json_array() {
        let sel = parse_tool_selection(r#"["regulation_search", "penalty_lookup"]"#);
        assert_eq!(sel.tools, vec!["regulation_search", "penalty_lookup"]);
        assert_eq!(sel.strategy, ExecutionStrategy::Parallel);
    }

    #[test]
    fn test_parse_object_sequential() {
        let sel = parse_tool_selection(
            r#"{"tools": ["regulation_search", "regulation_summary"], "mode": "sequential"}"#,
        );
        assert_eq!(sel.tools, vec!["regulation_search", "regulation_summary"]);
        assert_eq!(sel.strategy, ExecutionStrategy::Sequential);
    }

    #[test]
    fn test_parse_object_defaults_parallel() {
        let sel = parse_tool_selection(r#"{"tools": ["regulation_search"]}"#);
        assert_eq!(sel.strategy, ExecutionStrategy::Parallel);
    }

    #[test]
    fn test_parse_free_text_extraction() {
        let sel = parse_tool_selection(
            r#"I would use "regulation_search" and then "penalty_lookup" here."#,
        );
        assert_eq!(sel.tools, vec!["regulation_search", "penalty_lookup"]);
    }

    #[test]
    fn test_parse_garbage_falls_back_to_general() {
        let sel = parse_tool_selection("no tools needed, sorry");
        assert_eq!(sel.tools, vec![tools::GENERAL_RAG]);
    }

    #[test]
    fn test_parse_dedups_repeats() {
        let sel = parse_tool_selection(r#"["penalty_lookup", "penalty_lookup"]"#);
        assert_eq!(sel.tools, vec!["penalty_lookup"]);
    }

    // ─── Classification ─────────────────────────────────────────

    /// Returns scripted responses in order.
    struct ScriptedProvider {
        responses: Mutex<Vec<String>>,
    }

    impl ScriptedProvider {
        fn new(responses: Vec<&str>) -> Self {
            Self {
                responses: Mutex::new(responses.into_iter().rev().map(String::from).collect()),
            }
        }
    }

    #[async_trait]
    impl ModelProvider for ScriptedProvider {
        fn id(&self) -> &'static str {
            "scripted"
        }
        fn name(&self) -> &'static str {
            "Scripted"
        }
        fn default_model(&self) -> &'static str {
            "scripted-1"
        }
        async fn chat(&self, _request: ChatRequest) -> Result<ChatResponse, ScrutineerError> {
            let content = self
                .responses
                .lock()
                .unwrap()
                .pop()
                .unwrap_or_else(|| "SEARCH".into());
            Ok(ChatResponse {
                content,
                usage: TokenUsage {
                    input_tokens: 10,
                    output_tokens: 2,
                },
                stop_reason: StopReason::EndTurn,
            })
        }
    }

    struct NamedStub(&'static str);

    #[async_trait]
    impl Tool for NamedStub {
        fn id(&self) -> &'static str {
            self.0
        }
        fn description(&self) -> &'static str {
            "stub"
        }
        async fn execute(&self, _q: &str, _c: &ToolContext) -> Result<String, ScrutineerError> {
            Ok("stub".into())
        }
    }

    fn stub_registry() -> Arc<ToolRegistry> {
        let mut registry = ToolRegistry::new();
        for id in [
            tools::REGULATION_SEARCH,
            tools::REGULATION_COMPARISON,
            tools::PENALTY_LOOKUP,
            tools::REGULATION_SUMMARY,
            tools::GENERAL_RAG,
            tools::OUT_OF_SCOPE_HANDLER,
        ] {
            registry.register(Arc::new(NamedStub(id)));
        }
        Arc::new(registry)
    }

    fn classifier(responses: Vec<&'static str>) -> IntentClassifier {
        IntentClassifier::new(
            Arc::new(ScriptedProvider::new(responses)),
            stub_registry(),
            "scripted-1".into(),
        )
    }

    #[tokio::test]
    async fn test_classify_penalty() {
        let c = classifier(vec!["PENALTY"]);
        let out = c.classify("penalties for track limits?", &[]).await.unwrap();
        assert_eq!(out.intent, Intent::Penalty);
        assert_eq!(out.selection.tools, vec![tools::PENALTY_LOOKUP]);
        assert!(out.rationale.contains("PENALTY"));
    }

    #[tokio::test]
    async fn test_classify_accepts_padded_label() {
        let c = classifier(vec!["  out_of_scope  "]);
        let out = c.classify("how do I bake bread?", &[]).await.unwrap();
        assert_eq!(out.intent, Intent::OutOfScope);
        assert_eq!(out.selection.tools, vec![tools::OUT_OF_SCOPE_HANDLER]);
    }

    #[tokio::test]
    async fn test_classify_unknown_label_errors() {
        let c = classifier(vec!["PHILOSOPHY"]);
        let err = c.classify("anything", &[]).await.unwrap_err();
        assert!(matches!(err, ScrutineerError::Classification(_)));
    }

    #[tokio::test]
    async fn test_classify_multi_tool_two_calls() {
        let c = classifier(vec![
            "MULTI_TOOL",
            r#"["regulation_search", "penalty_lookup"]"#,
        ]);
        let out = c
            .classify("safety requirements and their penalties", &[])
            .await
            .unwrap();
        assert_eq!(out.intent, Intent::MultiTool);
        assert_eq!(
            out.selection.tools,
            vec![tools::REGULATION_SEARCH, tools::PENALTY_LOOKUP]
        );
        // both calls' usage is accumulated
        assert_eq!(out.usage.input_tokens, 20);
    }

    #[tokio::test]
    async fn test_classify_rejects_unregistered_tool() {
        let c = classifier(vec!["MULTI_TOOL", r#"["regulation_telemetry"]"#]);
        let err = c.classify("anything", &[]).await.unwrap_err();
        match err {
            ScrutineerError::Classification(msg) => {
                assert!(msg.contains("regulation_telemetry"));
            }
            other => panic!("expected Classification, got {other:?}"),
        }
    }
}
