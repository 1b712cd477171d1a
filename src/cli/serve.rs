// src/cli/serve.rs — `serve` subcommand: HTTP API server

use std::sync::{Arc, Mutex};

use crate::api::{self, ApiState};
use crate::core::types::ControllerConfig;
use crate::infra::config::Config;
use crate::memory::store::Store;

/// Start the API server and block until it exits.
pub async fn run_serve(
    config: &Config,
    listen: Option<String>,
    store: Option<Arc<Mutex<Store>>>,
) -> anyhow::Result<()> {
    let engine_config = ControllerConfig::from(config);
    let (engine, registry) = super::build_engine(config, engine_config, store.clone());

    let state = ApiState {
        engine: Arc::new(engine),
        registry,
        store,
        token: config.api.auth_token.clone(),
    };

    let mut api_config = config.api.clone();
    if let Some(listen) = listen {
        api_config.listen = listen;
    }

    api::start_server(&api_config, state).await
}
