// src/core/strategy.rs — Deterministic refinement strategy selection

use super::types::{
    CombinationTable, Dimension, QualityScore, ReasoningStep, RefinementStrategy, ToolSelection,
};
use crate::tools;

/// The plan for the next iteration: which refinement applies, which tools
/// run, and which quality dimension drove the choice.
#[derive(Debug, Clone, PartialEq)]
pub struct Refinement {
    pub strategy: RefinementStrategy,
    pub selection: ToolSelection,
    pub focus: Dimension,
}

/// Choose the refinement for the next iteration from the previous step.
/// Pure: the same step, threshold and table always produce the same
/// refinement.
///
/// Rules, in order:
/// 1. previous iteration ran one tool and scored below threshold on
///    completeness → escalate to the matching combination set;
/// 2. otherwise, one tool and accuracy is the weakest sub-score → switch
///    to a different tool;
/// 3. otherwise → rerun the same tools with a rewritten query targeting
///    the weakest sub-score.
/// A previous iteration with no score at all (every tool failed) is a
/// plain query refinement.
pub fn choose(prev: &ReasoningStep, threshold: f32, table: &CombinationTable) -> Refinement {
    let same_selection = ToolSelection {
        tools: prev.tools.clone(),
        strategy: prev.strategy,
    };

    let Some(score) = prev.quality else {
        return Refinement {
            strategy: RefinementStrategy::RefineQuery,
            selection: same_selection,
            focus: Dimension::Completeness,
        };
    };

    let single = prev.tools.len() == 1;
    let weakest = score.weakest_dimension();

    if single && score.completeness < threshold {
        return Refinement {
            strategy: RefinementStrategy::MultiToolOrchestration,
            selection: ToolSelection::parallel(escalation_set(&prev.tools[0], table)),
            focus: Dimension::Completeness,
        };
    }

    if single && weakest == Dimension::Accuracy {
        return Refinement {
            strategy: RefinementStrategy::SwitchTool,
            selection: ToolSelection::single(switch_target(&prev.tools[0])),
            focus: Dimension::Accuracy,
        };
    }

    Refinement {
        strategy: RefinementStrategy::RefineQuery,
        selection: same_selection,
        focus: weakest,
    }
}

/// Which combination a single tool escalates into.
fn escalation_set(tool: &str, table: &CombinationTable) -> Vec<String> {
    match tool {
        tools::PENALTY_LOOKUP => table.safety_and_penalties.clone(),
        tools::REGULATION_COMPARISON => table.comparison_analysis.clone(),
        _ => table.comprehensive_analysis.clone(),
    }
}

/// Fixed replacement used by SWITCH_TOOL. Always maps to a different
/// tool than its input.
fn switch_target(tool: &str) -> &'static str {
    match tool {
        tools::REGULATION_SEARCH => tools::REGULATION_SUMMARY,
        tools::REGULATION_SUMMARY => tools::REGULATION_SEARCH,
        tools::PENALTY_LOOKUP => tools::REGULATION_SEARCH,
        tools::REGULATION_COMPARISON => tools::REGULATION_SEARCH,
        _ => tools::REGULATION_SEARCH,
    }
}

/// Domain terms appended to the question when the rewrite capability is
/// unavailable. Keyed by the dimension being refined.
pub fn fallback_rewrite(question: &str, focus: Dimension) -> String {
    let terms = match focus {
        Dimension::Completeness => "cover all applicable articles, exceptions, and related provisions",
        Dimension::Accuracy => "cite exact article numbers and the official regulation wording",
        Dimension::Clarity => "organize the answer into clearly separated points",
        Dimension::Specificity => "include specific article numbers, limit values, and seasons",
    };
    format!("{question} ({terms})")
}

/// Prompt for the model-backed query rewrite.
pub fn rewrite_prompt(question: &str, focus: Dimension) -> String {
    format!(
        "Rewrite this FIA regulation question so a retrieval system returns an answer with \
         better {focus}. Keep the original meaning, add precise regulation terminology, and \
         return only the rewritten question.\n\nQuestion: {question}"
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::{Decision, ExecutionStrategy, Intent};

    fn step(tools: Vec<&str>, quality: Option<QualityScore>) -> ReasoningStep {
        ReasoningStep {
            iteration: 1,
            intent: Intent::Search,
            tools: tools.into_iter().map(String::from).collect(),
            strategy: ExecutionStrategy::Parallel,
            refinement: None,
            rationale: String::new(),
            quality,
            decision: Decision::Continue,
            elapsed_ms: 0,
        }
    }

    fn table() -> CombinationTable {
        CombinationTable::default()
    }

    // ─── Escalation ─────────────────────────────────────────────

    #[test]
    fn test_low_completeness_escalates_penalty_to_safety_set() {
        let prev = step(
            vec![tools::PENALTY_LOOKUP],
            Some(QualityScore::new(5.0, 8.0, 8.0, 8.0)),
        );
        let r = choose(&prev, 7.0, &table());
        assert_eq!(r.strategy, RefinementStrategy::MultiToolOrchestration);
        assert_eq!(
            r.selection.tools,
            vec![tools::REGULATION_SEARCH, tools::PENALTY_LOOKUP]
        );
        assert_eq!(r.selection.strategy, ExecutionStrategy::Parallel);
    }

    #[test]
    fn test_low_completeness_escalates_comparison_set() {
        let prev = step(
            vec![tools::REGULATION_COMPARISON],
            Some(QualityScore::new(6.0, 8.0, 8.0, 8.0)),
        );
        let r = choose(&prev, 7.0, &table());
        assert_eq!(
            r.selection.tools,
            vec![tools::REGULATION_COMPARISON, tools::REGULATION_SUMMARY]
        );
    }

    #[test]
    fn test_low_completeness_default_comprehensive_set() {
        let prev = step(
            vec![tools::REGULATION_SEARCH],
            Some(QualityScore::new(4.0, 9.0, 9.0, 9.0)),
        );
        let r = choose(&prev, 7.0, &table());
        assert_eq!(
            r.selection.tools,
            vec![tools::REGULATION_SEARCH, tools::REGULATION_SUMMARY]
        );
    }

    #[test]
    fn test_escalation_outranks_switch() {
        // completeness below threshold AND accuracy weakest: rule order
        // puts escalation first
        let prev = step(
            vec![tools::REGULATION_SEARCH],
            Some(QualityScore::new(6.0, 5.0, 8.0, 8.0)),
        );
        let r = choose(&prev, 7.0, &table());
        assert_eq!(r.strategy, RefinementStrategy::MultiToolOrchestration);
    }

    // ─── Switch ─────────────────────────────────────────────────

    #[test]
    fn test_weak_accuracy_switches_tool() {
        let prev = step(
            vec![tools::REGULATION_SEARCH],
            Some(QualityScore::new(8.0, 5.0, 8.0, 8.0)),
        );
        let r = choose(&prev, 7.0, &table());
        assert_eq!(r.strategy, RefinementStrategy::SwitchTool);
        assert_eq!(r.selection.tools, vec![tools::REGULATION_SUMMARY]);
        assert_eq!(r.focus, Dimension::Accuracy);
    }

    #[test]
    fn test_switch_never_returns_same_tool() {
        for tool in [
            tools::REGULATION_SEARCH,
            tools::REGULATION_SUMMARY,
            tools::PENALTY_LOOKUP,
            tools::REGULATION_COMPARISON,
            tools::GENERAL_RAG,
        ] {
            assert_ne!(switch_target(tool), tool);
        }
    }

    // ─── Refine ─────────────────────────────────────────────────

    #[test]
    fn test_weak_clarity_refines_query() {
        let prev = step(
            vec![tools::REGULATION_SEARCH],
            Some(QualityScore::new(8.0, 8.0, 5.0, 8.0)),
        );
        let r = choose(&prev, 7.0, &table());
        assert_eq!(r.strategy, RefinementStrategy::RefineQuery);
        assert_eq!(r.selection.tools, vec![tools::REGULATION_SEARCH]);
        assert_eq!(r.focus, Dimension::Clarity);
    }

    #[test]
    fn test_multi_tool_previous_always_refines() {
        // even with low completeness, a multi-tool step never escalates
        let prev = step(
            vec![tools::REGULATION_SEARCH, tools::PENALTY_LOOKUP],
            Some(QualityScore::new(4.0, 4.0, 4.0, 4.0)),
        );
        let r = choose(&prev, 7.0, &table());
        assert_eq!(r.strategy, RefinementStrategy::RefineQuery);
        assert_eq!(
            r.selection.tools,
            vec![tools::REGULATION_SEARCH, tools::PENALTY_LOOKUP]
        );
    }

    #[test]
    fn test_unscored_previous_refines_query() {
        let prev = step(vec![tools::REGULATION_SEARCH], None);
        let r = choose(&prev, 7.0, &table());
        assert_eq!(r.strategy, RefinementStrategy::RefineQuery);
        assert_eq!(r.focus, Dimension::Completeness);
    }

    #[test]
    fn test_choose_is_pure() {
        let prev = step(
            vec![tools::PENALTY_LOOKUP],
            Some(QualityScore::new(5.0, 6.0, 7.0, 8.0)),
        );
        let a = choose(&prev, 7.0, &table());
        let b = choose(&prev, 7.0, &table());
        assert_eq!(a, b);
    }

    #[test]
    fn test_tie_break_order_drives_focus() {
        // clarity and specificity tie at 6; the earlier dimension wins
        let prev = step(
            vec![tools::REGULATION_SEARCH, tools::GENERAL_RAG],
            Some(QualityScore::new(8.0, 8.0, 6.0, 6.0)),
        );
        let r = choose(&prev, 7.0, &table());
        assert_eq!(r.focus, Dimension::Clarity);
    }

    // ─── Rewrite ────────────────────────────────────────────────

    #[test]
    fn test_fallback_rewrite_appends_dimension_terms() {
        let q = fallback_rewrite("engine rules", Dimension::Specificity);
        assert!(q.starts_with("engine rules ("));
        assert!(q.contains("article numbers"));

        let q2 = fallback_rewrite("engine rules", Dimension::Completeness);
        assert!(q2.contains("all applicable articles"));
        assert_ne!(q, q2);
    }
}
