// src/cli/mod.rs — CLI definition (clap derive)

pub mod ask;
pub mod history;
pub mod progress;
pub mod serve;
pub mod tools;

use clap::{Parser, Subcommand};
use std::sync::{Arc, Mutex};

use crate::core::orchestrator::Orchestrator;
use crate::core::types::ControllerConfig;
use crate::infra::config::Config;
use crate::memory::store::Store;
use crate::provider::openai_compat::OpenAICompatProvider;
use crate::provider::retry::{RetryConfig, RetryProvider};
use crate::provider::roles::ModelRoles;
use crate::provider::ModelProvider;
use crate::rag::remote::RemoteRetriever;
use crate::rag::RagPipeline;
use crate::tools::ToolRegistry;

/// Assemble the engine stack from config: retry-wrapped provider, remote
/// retriever, tool registry, orchestrator. Shared by `ask` and `serve`.
pub(crate) fn build_engine(
    config: &Config,
    engine_config: ControllerConfig,
    store: Option<Arc<Mutex<Store>>>,
) -> (Orchestrator, Arc<ToolRegistry>) {
    let base = Arc::new(OpenAICompatProvider::from_config(&config.provider));
    let provider: Arc<dyn ModelProvider> = Arc::new(RetryProvider::with_config(
        base,
        RetryConfig {
            max_retries: config.provider.max_retries,
            ..RetryConfig::default()
        },
    ));

    let retriever = Arc::new(RemoteRetriever::from_config(&config.retrieval));
    let roles = ModelRoles::from_config(
        &config.provider.model,
        config.models.classifier.as_deref(),
        config.models.synthesizer.as_deref(),
        config.models.assessor.as_deref(),
    );
    let pipeline = Arc::new(RagPipeline::new(
        retriever,
        provider.clone(),
        roles.synthesizer.clone(),
    ));
    let registry = Arc::new(ToolRegistry::with_standard_tools(pipeline));

    let mut engine = Orchestrator::new(provider, roles, registry.clone(), engine_config);
    if let Some(s) = store {
        engine = engine.with_store(s);
    }
    (engine, registry)
}

#[derive(Parser)]
#[command(
    name = "scrutineer",
    about = "Agentic Q&A over FIA Formula 1 regulations",
    version
)]
pub struct Cli {
    /// Question to answer (default command when no subcommand given)
    #[arg(trailing_var_arg = true)]
    pub question: Vec<String>,

    /// Restrict retrieval to one regulation year (e.g. 2024)
    #[arg(short, long)]
    pub year: Option<String>,

    /// Restrict retrieval to one document type
    /// (sporting | technical | financial | operational)
    #[arg(long)]
    pub doc_type: Option<String>,

    /// Max refinement iterations (overrides config)
    #[arg(short, long)]
    pub iterations: Option<u8>,

    /// Quality threshold on the 1-10 scale (overrides config)
    #[arg(short = 'q', long)]
    pub quality: Option<f32>,

    /// Suppress progress output (only emit the final answer)
    #[arg(long)]
    pub quiet: bool,

    /// Emit the full run outcome as JSON (answer, trace, usage)
    #[arg(long)]
    pub json: bool,

    /// Read the question from stdin
    #[arg(long)]
    pub stdin: bool,

    /// Config file path
    #[arg(long)]
    pub config: Option<String>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the HTTP API server
    Serve {
        /// Listen address (overrides config)
        #[arg(long)]
        listen: Option<String>,
    },
    /// List the registered tools
    Tools,
    /// Show recent run history
    History {
        /// Number of runs to show
        #[arg(short = 'n', long, default_value = "10")]
        limit: u32,
        /// Show the full reasoning trace for one run id
        #[arg(long)]
        id: Option<String>,
    },
}
