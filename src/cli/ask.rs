// src/cli/ask.rs — Default command: answer a question

use std::sync::{Arc, Mutex};

use crate::core::types::ControllerConfig;
use crate::infra::config::Config;
use crate::memory::store::Store;
use crate::rag::{DocType, RetrievalFilters};
use crate::util::format_elapsed_ms;

/// Options for one `ask` invocation, taken from the CLI flags.
pub struct AskOptions {
    pub year: Option<String>,
    pub doc_type: Option<String>,
    pub max_iterations: Option<u8>,
    pub quality_threshold: Option<f32>,
    pub quiet: bool,
    pub json: bool,
}

/// Run one question through the engine and print the answer to stdout.
pub async fn run_ask(
    question: &str,
    config: &Config,
    opts: AskOptions,
    store: Option<Arc<Mutex<Store>>>,
) -> anyhow::Result<()> {
    let mut engine_config = ControllerConfig::from(config);
    if let Some(n) = opts.max_iterations {
        engine_config.max_iterations = n;
    }
    if let Some(q) = opts.quality_threshold {
        engine_config.quality_threshold = q;
    }

    let (mut engine, _registry) = super::build_engine(config, engine_config, store);
    if !opts.quiet {
        engine = engine.with_progress(super::progress::terminal_progress());
    }

    let filters = RetrievalFilters {
        year: opts.year,
        doc_type: opts
            .doc_type
            .as_deref()
            .and_then(DocType::from_str_lenient),
    };

    let outcome = engine.invoke_with_filters(question, filters).await?;

    if opts.json {
        println!("{}", serde_json::to_string_pretty(&outcome)?);
        return Ok(());
    }

    println!("{}", outcome.answer);

    if !opts.quiet {
        let score = match outcome.final_score {
            Some(s) => format!("{s:.1}"),
            None => "-".to_string(),
        };
        eprintln!(
            "  {} | {} iteration(s) | score {} | {} token(s) | {}",
            outcome.terminated_by,
            outcome.iterations,
            score,
            outcome.usage.total(),
            format_elapsed_ms(outcome.elapsed_ms),
        );
    }

    Ok(())
}
