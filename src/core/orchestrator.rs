// src/core/orchestrator.rs — Iteration controller

use std::sync::{Arc, Mutex};
use std::time::Instant;

use super::assessor::QualityAssessor;
use super::classifier::{Classification, IntentClassifier};
use super::executor::ToolExecutor;
use super::strategy;
use super::synthesizer::ResultSynthesizer;
use super::types::*;
use crate::infra::errors::ScrutineerError;
use crate::memory::store::Store;
use crate::provider::roles::ModelRoles;
use crate::provider::{ChatRequest, Message, ModelProvider, TokenUsage};
use crate::rag::RetrievalFilters;
use crate::tools::{self, ToolContext, ToolRegistry};

/// Drives the reason-act-reflect-decide loop for one question at a time.
/// Instances are shared across concurrent runs; all per-run state lives
/// in a `RunState` owned by the invocation.
pub struct Orchestrator {
    classifier: IntentClassifier,
    executor: ToolExecutor,
    synthesizer: ResultSynthesizer,
    assessor: QualityAssessor,
    provider: Arc<dyn ModelProvider>,
    rewrite_model: String,
    config: ControllerConfig,
    /// Optional persistence for run history. Non-fatal on error.
    store: Option<Arc<Mutex<Store>>>,
    /// Optional callback for real-time progress events.
    on_progress: Option<ProgressCallback>,
}

impl Orchestrator {
    pub fn new(
        provider: Arc<dyn ModelProvider>,
        roles: ModelRoles,
        registry: Arc<ToolRegistry>,
        config: ControllerConfig,
    ) -> Self {
        Self {
            classifier: IntentClassifier::new(
                provider.clone(),
                registry.clone(),
                roles.classifier.clone(),
            ),
            executor: ToolExecutor::new(registry)
                .with_limits(config.max_parallel_tools, config.tool_timeout),
            synthesizer: ResultSynthesizer::new(provider.clone(), roles.synthesizer),
            assessor: QualityAssessor::new(provider.clone(), roles.assessor)
                .with_threshold(config.quality_threshold),
            rewrite_model: roles.classifier,
            provider,
            config,
            store: None,
            on_progress: None,
        }
    }

    /// Attach a run-history store.
    pub fn with_store(mut self, store: Arc<Mutex<Store>>) -> Self {
        self.store = Some(store);
        self
    }

    /// Set a callback for real-time progress events.
    pub fn with_progress(mut self, cb: impl Fn(ProgressEvent) + Send + Sync + 'static) -> Self {
        self.on_progress = Some(Box::new(cb));
        self
    }

    fn emit(&self, event: ProgressEvent) {
        if let Some(ref cb) = self.on_progress {
            cb(event);
        }
    }

    /// Persist a finished run. Failures are logged and swallowed; history
    /// is never worth failing a run over.
    fn persist_run(&self, outcome: &RunOutcome) {
        let Some(ref store) = self.store else { return };
        let Ok(s) = store.lock() else { return };
        if let Err(e) = s.insert_run(outcome) {
            tracing::warn!(run_id = %outcome.run_id, "failed to persist run: {e}");
        }
    }

    /// Answer a question with default (unfiltered) retrieval.
    pub async fn invoke(&self, question: &str) -> Result<RunOutcome, ScrutineerError> {
        self.invoke_with_filters(question, RetrievalFilters::default())
            .await
    }

    /// Run the full loop. The only fatal error is an empty question;
    /// everything else degrades into the answer and the trace.
    pub async fn invoke_with_filters(
        &self,
        question: &str,
        filters: RetrievalFilters,
    ) -> Result<RunOutcome, ScrutineerError> {
        if question.trim().is_empty() {
            return Err(ScrutineerError::InvalidInput(
                "question must not be empty".into(),
            ));
        }

        let started = Instant::now();
        let mut state = RunState::new(question);
        let mut total_usage = TokenUsage::default();

        self.emit(ProgressEvent::RunStarted {
            run_id: state.run_id.clone(),
            question: question.to_string(),
        });
        tracing::info!(run_id = %state.run_id, "run started");

        // REASON happens once; later iterations only refine its output.
        let classification = match self.classifier.classify(question, &[]).await {
            Ok(c) => c,
            Err(e) => {
                tracing::warn!("classification failed, falling back to general tool: {e}");
                Classification {
                    intent: Intent::Search,
                    selection: ToolSelection::single(tools::GENERAL_RAG),
                    rationale: format!(
                        "classification failed ({e}); falling back to {}",
                        tools::GENERAL_RAG
                    ),
                    usage: TokenUsage::default(),
                }
            }
        };
        total_usage.add(&classification.usage);

        if classification.intent == Intent::OutOfScope {
            let outcome =
                self.decline_out_of_scope(question, state, classification, total_usage, started);
            self.persist_run(&outcome);
            return Ok(outcome);
        }

        let context = ToolContext { filters };
        let mut selection = classification.selection.clone();
        let mut query = question.to_string();
        let mut refinement: Option<RefinementStrategy> = None;
        let mut rationale = classification.rationale.clone();
        let mut terminated_by = TerminatedBy::MaxIterations;

        while !state.terminal {
            state.iteration += 1;
            let iter_started = Instant::now();

            // Refinement replaces REASON from the second iteration on.
            if state.iteration > 1 {
                if let Some(prev) = state.last_step() {
                    let plan = strategy::choose(
                        prev,
                        self.config.quality_threshold,
                        &self.config.combinations,
                    );
                    refinement = Some(plan.strategy);
                    selection = plan.selection;
                    rationale = format!("{} targeting {}", plan.strategy, plan.focus);

                    if plan.strategy == RefinementStrategy::RefineQuery {
                        let (rewritten, rewrite_usage, note) =
                            self.rewrite_query(question, plan.focus).await;
                        total_usage.add(&rewrite_usage);
                        query = rewritten;
                        if let Some(note) = note {
                            rationale.push_str("; ");
                            rationale.push_str(&note);
                        }
                    } else {
                        query = question.to_string();
                    }
                }
            }

            self.emit(ProgressEvent::IntentClassified {
                iteration: state.iteration,
                intent: classification.intent,
                tools: selection.tools.clone(),
            });

            // ACT
            let results = self.executor.execute(&query, &selection, &context).await;
            for r in &results {
                self.emit(ProgressEvent::ToolCompleted {
                    iteration: state.iteration,
                    tool: r.tool.clone(),
                    success: r.success,
                    elapsed_ms: r.elapsed_ms,
                });
            }
            state.last_tool_results = results
                .iter()
                .map(|r| (r.tool.clone(), r.clone()))
                .collect();

            // REFLECT
            let synthesis = self.synthesizer.synthesize(question, &results).await;
            total_usage.add(&synthesis.usage);
            if let Some(ref note) = synthesis.note {
                rationale.push_str("; ");
                rationale.push_str(note);
            }
            // The degraded all-failed placeholder never displaces a real
            // answer from an earlier iteration.
            if !synthesis.must_continue || state.current_answer.is_empty() {
                state.current_answer = synthesis.answer.clone();
            }

            let quality = if synthesis.must_continue {
                None
            } else {
                match self.assessor.assess(question, &synthesis.answer).await {
                    Ok(assessment) => {
                        total_usage.add(&assessment.usage);
                        Some(assessment.score)
                    }
                    Err(e) => {
                        tracing::warn!("scoring failed, substituting minimum passing score: {e}");
                        rationale.push_str(&format!(
                            "; scoring failed ({e}); minimum passing score substituted"
                        ));
                        Some(QualityScore::uniform(self.assessor.threshold()))
                    }
                }
            };

            // DECIDE
            let at_cap = state.iteration >= self.config.max_iterations;
            let budget_spent = self
                .config
                .run_budget
                .is_some_and(|budget| started.elapsed() >= budget);

            let decision = match quality {
                Some(score) if self.assessor.meets_threshold(&score) => {
                    terminated_by = TerminatedBy::QualityMet;
                    Decision::End
                }
                _ if budget_spent => {
                    terminated_by = TerminatedBy::BudgetExhausted;
                    Decision::End
                }
                _ if at_cap => {
                    terminated_by = TerminatedBy::MaxIterations;
                    Decision::End
                }
                _ => Decision::Continue,
            };

            state.history.push(ReasoningStep {
                iteration: state.iteration,
                intent: classification.intent,
                tools: selection.tools.clone(),
                strategy: selection.strategy,
                refinement,
                rationale: rationale.clone(),
                quality,
                decision,
                elapsed_ms: iter_started.elapsed().as_millis() as u64,
            });

            self.emit(ProgressEvent::IterationCompleted {
                iteration: state.iteration,
                max_iterations: self.config.max_iterations,
                score: quality.map(|q| q.aggregate()),
                decision,
            });
            tracing::info!(
                run_id = %state.run_id,
                iteration = state.iteration,
                score = ?quality.map(|q| q.aggregate()),
                %decision,
                "iteration completed"
            );

            if decision == Decision::End {
                state.terminal = true;
            }
        }

        let outcome = RunOutcome {
            run_id: state.run_id.clone(),
            question: question.to_string(),
            answer: state.current_answer.clone(),
            terminated_by,
            iterations: state.iteration,
            final_score: state.latest_score(),
            trace: state.history,
            usage: total_usage,
            elapsed_ms: started.elapsed().as_millis() as u64,
        };

        self.emit(ProgressEvent::RunCompleted {
            terminated_by,
            iterations: outcome.iterations,
            elapsed_ms: outcome.elapsed_ms,
        });
        tracing::info!(
            run_id = %outcome.run_id,
            %terminated_by,
            iterations = outcome.iterations,
            "run completed"
        );

        self.persist_run(&outcome);
        Ok(outcome)
    }

    /// OUT_OF_SCOPE ends the run at REASON: fixed decline answer, no tool
    /// dispatch, a single trace step.
    fn decline_out_of_scope(
        &self,
        question: &str,
        mut state: RunState,
        classification: Classification,
        usage: TokenUsage,
        started: Instant,
    ) -> RunOutcome {
        state.iteration = 1;
        state.current_answer = tools::out_of_scope::decline_message(question);

        self.emit(ProgressEvent::IntentClassified {
            iteration: 1,
            intent: Intent::OutOfScope,
            tools: vec![tools::OUT_OF_SCOPE_HANDLER.to_string()],
        });

        state.history.push(ReasoningStep {
            iteration: 1,
            intent: Intent::OutOfScope,
            tools: vec![tools::OUT_OF_SCOPE_HANDLER.to_string()],
            strategy: ExecutionStrategy::Parallel,
            refinement: None,
            rationale: format!(
                "{}; out-of-scope question declined without tool dispatch",
                classification.rationale
            ),
            quality: None,
            decision: Decision::End,
            elapsed_ms: started.elapsed().as_millis() as u64,
        });

        self.emit(ProgressEvent::IterationCompleted {
            iteration: 1,
            max_iterations: self.config.max_iterations,
            score: None,
            decision: Decision::End,
        });

        let outcome = RunOutcome {
            run_id: state.run_id.clone(),
            question: question.to_string(),
            answer: state.current_answer.clone(),
            terminated_by: TerminatedBy::OutOfScope,
            iterations: 1,
            final_score: None,
            trace: state.history,
            usage,
            elapsed_ms: started.elapsed().as_millis() as u64,
        };

        self.emit(ProgressEvent::RunCompleted {
            terminated_by: TerminatedBy::OutOfScope,
            iterations: 1,
            elapsed_ms: outcome.elapsed_ms,
        });
        tracing::info!(run_id = %outcome.run_id, "out-of-scope question declined");

        outcome
    }

    /// Rewrite the question for better retrieval on the weak dimension.
    /// Always starts from the original question so successive refinements
    /// never compound. Falls back to a deterministic rewrite.
    async fn rewrite_query(
        &self,
        question: &str,
        focus: Dimension,
    ) -> (String, TokenUsage, Option<String>) {
        let prompt = strategy::rewrite_prompt(question, focus);
        let request = ChatRequest {
            model: self.rewrite_model.clone(),
            messages: vec![Message::system(&prompt), Message::user(question)],
            max_tokens: Some(128),
            temperature: Some(0.3),
        };

        match self.provider.chat(request).await {
            Ok(response) if !response.content.trim().is_empty() => (
                response.content.trim().to_string(),
                response.usage,
                None,
            ),
            Ok(response) => (
                strategy::fallback_rewrite(question, focus),
                response.usage,
                Some("empty rewrite; deterministic rewrite substituted".into()),
            ),
            Err(e) => {
                tracing::warn!("query rewrite failed, using deterministic rewrite: {e}");
                (
                    strategy::fallback_rewrite(question, focus),
                    TokenUsage::default(),
                    Some(format!("rewrite failed ({e}); deterministic rewrite substituted")),
                )
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::{ChatResponse, StopReason};
    use crate::tools::Tool;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Routes responses on the system prompt, so call order never matters:
    /// classification, selection, synthesis, scoring and rewrite requests
    /// each get their own scripted reply.
    struct RoutedProvider {
        intent: &'static str,
        scores: &'static str,
    }

    #[async_trait]
    impl ModelProvider for RoutedProvider {
        fn id(&self) -> &'static str {
            "routed"
        }
        fn name(&self) -> &'static str {
            "Routed"
        }
        fn default_model(&self) -> &'static str {
            "routed-1"
        }
        async fn chat(&self, request: ChatRequest) -> Result<ChatResponse, ScrutineerError> {
            let system = request
                .messages
                .first()
                .map(|m| m.content.clone())
                .unwrap_or_default();
            let content = if system.starts_with("Classify this FIA regulation question") {
                self.intent.to_string()
            } else if system.starts_with("You are a quality assessor") {
                self.scores.to_string()
            } else if system.contains("Combine the following results") {
                "combined answer".to_string()
            } else if system.starts_with("Rewrite this FIA regulation question") {
                "rewritten question".to_string()
            } else {
                "generated text".to_string()
            };
            Ok(ChatResponse {
                content,
                usage: TokenUsage {
                    input_tokens: 5,
                    output_tokens: 5,
                },
                stop_reason: StopReason::EndTurn,
            })
        }
    }

    struct CountingTool {
        id: &'static str,
        calls: Arc<AtomicUsize>,
        succeed: bool,
    }

    #[async_trait]
    impl Tool for CountingTool {
        fn id(&self) -> &'static str {
            self.id
        }
        fn description(&self) -> &'static str {
            "counting stub"
        }
        async fn execute(&self, _q: &str, _c: &ToolContext) -> Result<String, ScrutineerError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.succeed {
                Ok(format!("{} output", self.id))
            } else {
                Err(ScrutineerError::ToolFailure {
                    tool: self.id.into(),
                    message: "stub failure".into(),
                })
            }
        }
    }

    fn registry_with(calls: &Arc<AtomicUsize>, succeed: bool) -> Arc<ToolRegistry> {
        let mut registry = ToolRegistry::new();
        for id in [
            tools::REGULATION_SEARCH,
            tools::REGULATION_COMPARISON,
            tools::PENALTY_LOOKUP,
            tools::REGULATION_SUMMARY,
            tools::GENERAL_RAG,
            tools::OUT_OF_SCOPE_HANDLER,
        ] {
            registry.register(Arc::new(CountingTool {
                id,
                calls: Arc::clone(calls),
                succeed,
            }));
        }
        Arc::new(registry)
    }

    fn orchestrator(
        intent: &'static str,
        scores: &'static str,
        registry: Arc<ToolRegistry>,
    ) -> Orchestrator {
        Orchestrator::new(
            Arc::new(RoutedProvider { intent, scores }),
            ModelRoles::from_single("routed-1"),
            registry,
            ControllerConfig::default(),
        )
    }

    #[tokio::test]
    async fn test_passing_score_ends_after_one_iteration() {
        let calls = Arc::new(AtomicUsize::new(0));
        let orch = orchestrator(
            "PENALTY",
            "completeness: 8\naccuracy: 8\nclarity: 8\nspecificity: 8",
            registry_with(&calls, true),
        );

        let outcome = orch.invoke("penalties for track limits?").await.unwrap();

        assert_eq!(outcome.terminated_by, TerminatedBy::QualityMet);
        assert_eq!(outcome.iterations, 1);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(outcome.final_score, Some(8.0));
        assert_eq!(outcome.trace.len(), 1);
        assert_eq!(outcome.trace[0].decision, Decision::End);
    }

    #[tokio::test]
    async fn test_out_of_scope_short_circuits_without_tools() {
        let calls = Arc::new(AtomicUsize::new(0));
        let orch = orchestrator("OUT_OF_SCOPE", "", registry_with(&calls, true));

        let outcome = orch.invoke("best pizza in Monza?").await.unwrap();

        assert_eq!(outcome.terminated_by, TerminatedBy::OutOfScope);
        assert_eq!(outcome.iterations, 1);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert!(outcome.answer.contains("FIA Formula 1 regulations"));
        assert_eq!(outcome.trace[0].tools, vec![tools::OUT_OF_SCOPE_HANDLER]);
        assert!(outcome.final_score.is_none());
    }

    #[tokio::test]
    async fn test_empty_question_is_invalid_input() {
        let calls = Arc::new(AtomicUsize::new(0));
        let orch = orchestrator("SEARCH", "", registry_with(&calls, true));

        let err = orch.invoke("   ").await.unwrap_err();
        assert!(matches!(err, ScrutineerError::InvalidInput(_)));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_low_scores_run_to_the_cap() {
        let calls = Arc::new(AtomicUsize::new(0));
        let orch = orchestrator(
            "SEARCH",
            "completeness: 5\naccuracy: 5\nclarity: 5\nspecificity: 5",
            registry_with(&calls, true),
        );

        let outcome = orch.invoke("what are the engine rules?").await.unwrap();

        assert_eq!(outcome.terminated_by, TerminatedBy::MaxIterations);
        assert_eq!(outcome.iterations, 3);
        assert_eq!(outcome.trace.len(), 3);
        assert_eq!(outcome.trace[2].decision, Decision::End);
        assert_eq!(outcome.final_score, Some(5.0));
        // first refinement escalates the single low-completeness tool
        assert_eq!(
            outcome.trace[1].refinement,
            Some(RefinementStrategy::MultiToolOrchestration)
        );
    }

    #[tokio::test]
    async fn test_all_failures_never_end_early() {
        let calls = Arc::new(AtomicUsize::new(0));
        let orch = orchestrator("SEARCH", "ignored", registry_with(&calls, false));

        let outcome = orch.invoke("what are the engine rules?").await.unwrap();

        assert_eq!(outcome.terminated_by, TerminatedBy::MaxIterations);
        assert_eq!(outcome.iterations, 3);
        // every iteration skipped scoring
        assert!(outcome.trace.iter().all(|s| s.quality.is_none()));
        assert!(outcome.final_score.is_none());
        assert!(outcome.answer.contains("unable to process"));
    }

    #[tokio::test]
    async fn test_classification_failure_falls_back_to_general() {
        let calls = Arc::new(AtomicUsize::new(0));
        let orch = orchestrator(
            "NONSENSE_LABEL",
            "completeness: 9\naccuracy: 9\nclarity: 9\nspecificity: 9",
            registry_with(&calls, true),
        );

        let outcome = orch.invoke("anything at all").await.unwrap();

        assert_eq!(outcome.trace[0].tools, vec![tools::GENERAL_RAG]);
        assert!(outcome.trace[0].rationale.contains("classification failed"));
        assert_eq!(outcome.terminated_by, TerminatedBy::QualityMet);
    }
}
