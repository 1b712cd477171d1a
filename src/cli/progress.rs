// src/cli/progress.rs — Terminal progress renderer for real-time run feedback

use crate::core::types::ProgressEvent;
use crate::util::clip;

/// Build a progress callback that writes formatted output to stderr.
///
/// All progress output goes to stderr so stdout remains clean for the
/// answer. Returns a closure suitable for `Orchestrator::with_progress()`.
pub fn terminal_progress() -> impl Fn(ProgressEvent) + Send + Sync + 'static {
    move |event| eprintln!("{}", format_event(&event))
}

/// Render one progress event as a single stderr line.
pub fn format_event(event: &ProgressEvent) -> String {
    match event {
        ProgressEvent::RunStarted { question, .. } => {
            if question.len() > 72 {
                format!("[run] {}...", clip(question, 72))
            } else {
                format!("[run] {question}")
            }
        }
        ProgressEvent::IntentClassified {
            iteration,
            intent,
            tools,
        } => {
            format!(
                "[iter {}] intent={} tools=[{}]",
                iteration,
                intent,
                tools.join(", ")
            )
        }
        ProgressEvent::ToolCompleted {
            iteration,
            tool,
            success,
            elapsed_ms,
        } => {
            let status = if *success { "ok" } else { "failed" };
            format!("[iter {iteration}]   {tool}: {status} ({elapsed_ms}ms)")
        }
        ProgressEvent::IterationCompleted {
            iteration,
            max_iterations,
            score,
            decision,
        } => match score {
            Some(s) => format!("[iter {iteration}/{max_iterations}] score={s:.1} -> {decision}"),
            None => format!("[iter {iteration}/{max_iterations}] score=- -> {decision}"),
        },
        ProgressEvent::RunCompleted {
            terminated_by,
            iterations,
            elapsed_ms,
        } => {
            format!("[done] {terminated_by} iterations={iterations} elapsed={elapsed_ms}ms")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::{Decision, Intent, TerminatedBy};

    #[test]
    fn test_run_started_format() {
        let line = format_event(&ProgressEvent::RunStarted {
            run_id: "abc".into(),
            question: "What are the penalties for track limit violations?".into(),
        });
        assert_eq!(
            line,
            "[run] What are the penalties for track limit violations?"
        );
    }

    #[test]
    fn test_run_started_truncates_long_questions() {
        let long = "x".repeat(200);
        let line = format_event(&ProgressEvent::RunStarted {
            run_id: "abc".into(),
            question: long,
        });
        assert!(line.len() < 90);
        assert!(line.ends_with("..."));
    }

    #[test]
    fn test_intent_classified_format() {
        let line = format_event(&ProgressEvent::IntentClassified {
            iteration: 1,
            intent: Intent::MultiTool,
            tools: vec!["regulation_search".into(), "penalty_lookup".into()],
        });
        assert_eq!(
            line,
            "[iter 1] intent=MULTI_TOOL tools=[regulation_search, penalty_lookup]"
        );
    }

    #[test]
    fn test_tool_completed_format() {
        let ok = format_event(&ProgressEvent::ToolCompleted {
            iteration: 2,
            tool: "regulation_search".into(),
            success: true,
            elapsed_ms: 840,
        });
        assert_eq!(ok, "[iter 2]   regulation_search: ok (840ms)");

        let failed = format_event(&ProgressEvent::ToolCompleted {
            iteration: 2,
            tool: "penalty_lookup".into(),
            success: false,
            elapsed_ms: 30000,
        });
        assert!(failed.contains("penalty_lookup: failed"));
    }

    #[test]
    fn test_iteration_completed_scored() {
        let line = format_event(&ProgressEvent::IterationCompleted {
            iteration: 1,
            max_iterations: 3,
            score: Some(6.25),
            decision: Decision::Continue,
        });
        assert_eq!(line, "[iter 1/3] score=6.2 -> CONTINUE");
    }

    #[test]
    fn test_iteration_completed_unscored() {
        let line = format_event(&ProgressEvent::IterationCompleted {
            iteration: 2,
            max_iterations: 3,
            score: None,
            decision: Decision::Continue,
        });
        assert_eq!(line, "[iter 2/3] score=- -> CONTINUE");
    }

    #[test]
    fn test_run_completed_format() {
        let line = format_event(&ProgressEvent::RunCompleted {
            terminated_by: TerminatedBy::QualityMet,
            iterations: 2,
            elapsed_ms: 4180,
        });
        assert_eq!(line, "[done] QUALITY_MET iterations=2 elapsed=4180ms");
    }
}
