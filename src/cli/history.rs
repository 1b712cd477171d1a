// src/cli/history.rs — `history` subcommand: recent run listing

use std::sync::{Arc, Mutex};

use crate::memory::store::Store;
use crate::util::{clip, format_elapsed_ms};

/// Show recent runs, or the full trace of one run when `id` is given.
pub fn run_history(
    store: Option<Arc<Mutex<Store>>>,
    limit: u32,
    id: Option<String>,
) -> anyhow::Result<()> {
    let Some(store) = store else {
        println!("No run history (database not initialized).");
        return Ok(());
    };
    let store = store
        .lock()
        .map_err(|_| anyhow::anyhow!("history store lock poisoned"))?;

    if let Some(run_id) = id {
        return show_run(&store, &run_id);
    }

    let runs = store.list_runs(limit)?;
    if runs.is_empty() {
        println!("No runs recorded yet.");
        return Ok(());
    }

    for run in &runs {
        let score = match run.final_score {
            Some(s) => format!("{s:.1}"),
            None => "-".to_string(),
        };
        println!(
            "  {}  {}  {:<15} {} iter  score {:<4} {}",
            clip(&run.run_id, 8),
            clip(&run.created_at, 19),
            run.terminated_by,
            run.iterations,
            score,
            clip(&run.question, 48),
        );
    }

    let total = store.count_runs()?;
    println!();
    println!("  {} of {} recorded run(s)", runs.len(), total);
    Ok(())
}

/// Print one run in full: question, answer, and the reasoning trace.
fn show_run(store: &Store, run_id: &str) -> anyhow::Result<()> {
    let Some(run) = store.get_run(run_id)? else {
        anyhow::bail!("no run with id '{run_id}'");
    };

    println!("Run {}", run.run_id);
    println!("  Asked:   {}", run.created_at);
    println!("  Question: {}", run.question);
    let score = match run.final_score {
        Some(s) => format!("score {s:.1}"),
        None => "unscored".to_string(),
    };
    println!(
        "  Ended:   {} after {} iteration(s), {}, {} in / {} out tokens, {}",
        run.terminated_by,
        run.iterations,
        score,
        run.input_tokens,
        run.output_tokens,
        format_elapsed_ms(run.elapsed_ms.max(0) as u64),
    );

    let steps = store.query_steps(run_id)?;
    if !steps.is_empty() {
        println!();
        println!("  Trace:");
        for step in &steps {
            let score = match step.aggregate() {
                Some(s) => format!("score {s:.1}"),
                None => "unscored".to_string(),
            };
            println!(
                "    [{}] {} via [{}] -> {} ({})",
                step.iteration,
                step.intent,
                step.tools().join(", "),
                step.decision,
                score,
            );
            println!("        {}", step.rationale);
        }
    }

    println!();
    println!("{}", run.answer);
    Ok(())
}
