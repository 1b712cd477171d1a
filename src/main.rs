// src/main.rs — Scrutineer entry point

use clap::Parser;
use std::sync::{Arc, Mutex};

use scrutineer::cli::{Cli, Commands};
use scrutineer::infra::config::Config;
use scrutineer::infra::logger;
use scrutineer::memory::store::Store;
use scrutineer::memory::RunHistory;

#[tokio::main]
async fn main() {
    // Initialize logging (respects RUST_LOG / SCRUTINEER_LOG)
    logger::init_logging("warn");

    if let Err(e) = run().await {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

async fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Without a config.toml every setting falls back to its default
    let config = match cli.config.as_deref() {
        Some(path) => Config::load_from(std::path::Path::new(path))?,
        None => Config::load()?,
    };

    match cli.command {
        Some(Commands::Serve { listen }) => {
            let store = init_store();
            scrutineer::cli::serve::run_serve(&config, listen, store).await
        }
        Some(Commands::Tools) => scrutineer::cli::tools::run_tools(&config),
        Some(Commands::History { limit, id }) => {
            let store = init_store();
            scrutineer::cli::history::run_history(store, limit, id)
        }
        None => {
            let question = build_question_input(&cli)?;
            let store = init_store();
            let opts = scrutineer::cli::ask::AskOptions {
                year: cli.year,
                doc_type: cli.doc_type,
                max_iterations: cli.iterations,
                quality_threshold: cli.quality,
                quiet: cli.quiet,
                json: cli.json,
            };
            scrutineer::cli::ask::run_ask(&question, &config, opts, store).await
        }
    }
}

/// Open the run-history database, running migrations if needed.
/// Returns None if the database can't be opened (non-fatal; history is
/// disabled for the run).
fn init_store() -> Option<Arc<Mutex<Store>>> {
    let db_path = scrutineer::infra::paths::db_path();

    if let Some(parent) = db_path.parent() {
        let _ = std::fs::create_dir_all(parent);
    }

    match RunHistory::open(&db_path) {
        Ok(history) => Some(Arc::new(Mutex::new(history.store))),
        Err(e) => {
            tracing::warn!("Could not open history database: {e}. Continuing without it.");
            None
        }
    }
}

/// Build the question from CLI args and/or stdin.
///
/// Supports three modes:
/// 1. `scrutineer "question"` — positional args only
/// 2. `scrutineer --stdin` — explicit stdin read (entire input is the question)
/// 3. `cat incident.txt | scrutineer "what penalty applies here?"` —
///    auto-detected piped stdin is appended to positional args as context
fn build_question_input(cli: &Cli) -> anyhow::Result<String> {
    use std::io::IsTerminal;

    let has_args = !cli.question.is_empty();
    let stdin_is_pipe = !std::io::stdin().is_terminal();

    if cli.stdin || stdin_is_pipe {
        let content = read_stdin()?;
        if has_args {
            // Args are the question, stdin is supporting context
            let question = cli.question.join(" ");
            Ok(format!("{}\n\n---\n\n{}", question, content))
        } else {
            Ok(content)
        }
    } else if has_args {
        Ok(cli.question.join(" "))
    } else {
        eprintln!("Usage: scrutineer <question>");
        eprintln!("Run scrutineer --help for all options.");
        std::process::exit(1);
    }
}

fn read_stdin() -> anyhow::Result<String> {
    use std::io::Read;
    let mut buf = String::new();
    std::io::stdin().read_to_string(&mut buf)?;
    if buf.trim().is_empty() {
        anyhow::bail!("Stdin was empty");
    }
    Ok(buf)
}
