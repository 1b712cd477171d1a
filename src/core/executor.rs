// src/core/executor.rs — Tool dispatch with bounded parallelism

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::Semaphore;

use super::types::{ExecutionStrategy, ToolResult, ToolSelection};
use crate::infra::errors::ScrutineerError;
use crate::tools::{ToolContext, ToolRegistry};

const DEFAULT_MAX_PARALLEL: usize = 3;
const DEFAULT_TOOL_TIMEOUT: Duration = Duration::from_secs(30);

/// Runs tool selections against the registry. Every failure mode of a
/// tool, including timeout and panic, is folded into a `success=false`
/// result; this function never loses a slot, so N requested tools always
/// produce N results in selection order.
pub struct ToolExecutor {
    registry: Arc<ToolRegistry>,
    max_parallel: usize,
    tool_timeout: Duration,
}

impl ToolExecutor {
    pub fn new(registry: Arc<ToolRegistry>) -> Self {
        Self {
            registry,
            max_parallel: DEFAULT_MAX_PARALLEL,
            tool_timeout: DEFAULT_TOOL_TIMEOUT,
        }
    }

    /// Configure the concurrency bound and per-tool timeout.
    pub fn with_limits(mut self, max_parallel: usize, tool_timeout: Duration) -> Self {
        // a bound of zero would never grant a permit
        self.max_parallel = max_parallel.max(1);
        self.tool_timeout = tool_timeout;
        self
    }

    pub async fn execute(
        &self,
        question: &str,
        selection: &ToolSelection,
        context: &ToolContext,
    ) -> Vec<ToolResult> {
        match selection.strategy {
            ExecutionStrategy::Parallel => self.run_parallel(question, selection, context).await,
            ExecutionStrategy::Sequential => {
                self.run_sequential(question, selection, context).await
            }
        }
    }

    /// Dispatch every tool concurrently, at most `max_parallel` in flight.
    /// A single tool is just a parallel set of one.
    async fn run_parallel(
        &self,
        question: &str,
        selection: &ToolSelection,
        context: &ToolContext,
    ) -> Vec<ToolResult> {
        let semaphore = Arc::new(Semaphore::new(self.max_parallel));
        let mut handles = Vec::with_capacity(selection.tools.len());

        for id in &selection.tools {
            let sem = Arc::clone(&semaphore);
            let registry = Arc::clone(&self.registry);
            let id = id.clone();
            let query = question.to_string();
            let ctx = context.clone();
            let timeout = self.tool_timeout;

            handles.push(tokio::spawn(async move {
                let _permit = match sem.acquire().await {
                    Ok(permit) => permit,
                    Err(e) => {
                        return ToolResult::failed(&id, format!("semaphore closed: {e}"), 0);
                    }
                };
                run_one(&registry, &id, &query, &ctx, timeout).await
            }));
        }

        let expected = handles.len();
        let mut results = Vec::with_capacity(expected);
        for (handle, id) in handles.into_iter().zip(&selection.tools) {
            match handle.await {
                Ok(result) => results.push(result),
                Err(e) => {
                    tracing::error!(tool = %id, "tool task join failed: {e}");
                    results.push(ToolResult::failed(id, format!("task join failed: {e}"), 0));
                }
            }
        }

        debug_assert_eq!(results.len(), expected, "tool result count mismatch");
        results
    }

    /// Run the tools one after another in declared order. Each tool after
    /// the first sees the most recent successful output appended to its
    /// query; failures pass the original query through unchanged.
    async fn run_sequential(
        &self,
        question: &str,
        selection: &ToolSelection,
        context: &ToolContext,
    ) -> Vec<ToolResult> {
        let mut results = Vec::with_capacity(selection.tools.len());
        let mut carried: Option<(String, String)> = None;

        for id in &selection.tools {
            let query = match &carried {
                Some((prior_tool, prior_output)) => {
                    format!("{question}\n\nContext from {prior_tool}:\n{prior_output}")
                }
                None => question.to_string(),
            };

            let result = run_one(&self.registry, id, &query, context, self.tool_timeout).await;
            if result.success {
                carried = Some((result.tool.clone(), result.content.clone()));
            }
            results.push(result);
        }

        results
    }
}

/// Resolve and run a single tool under the per-tool timeout. Errors and
/// timeouts come back as failed results, never as `Err`.
async fn run_one(
    registry: &ToolRegistry,
    id: &str,
    query: &str,
    context: &ToolContext,
    timeout: Duration,
) -> ToolResult {
    let tool = match registry.resolve(id) {
        Ok(tool) => tool,
        Err(e) => {
            tracing::warn!(tool = %id, "tool resolution failed: {e}");
            return ToolResult::failed(id, e.to_string(), 0);
        }
    };

    let started = Instant::now();
    match tokio::time::timeout(timeout, tool.execute(query, context)).await {
        Ok(Ok(content)) => {
            let elapsed = started.elapsed().as_millis() as u64;
            tracing::debug!(tool = %id, elapsed_ms = elapsed, "tool completed");
            ToolResult::ok(id, content, elapsed)
        }
        Ok(Err(e)) => {
            let elapsed = started.elapsed().as_millis() as u64;
            tracing::warn!(tool = %id, elapsed_ms = elapsed, "tool failed: {e}");
            ToolResult::failed(id, e.to_string(), elapsed)
        }
        Err(_) => {
            let elapsed = started.elapsed().as_millis() as u64;
            let err = ScrutineerError::Timeout {
                tool: id.to_string(),
                elapsed_ms: elapsed,
            };
            tracing::warn!(tool = %id, elapsed_ms = elapsed, "tool timed out");
            ToolResult::failed(id, err.to_string(), elapsed)
        }
    }
}
