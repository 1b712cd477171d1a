// src/cli/tools.rs — `tools` subcommand: list the registered tools

use crate::core::types::ControllerConfig;
use crate::infra::config::Config;

/// Print the tool catalog: one line per tool, id then description.
pub fn run_tools(config: &Config) -> anyhow::Result<()> {
    let (_engine, registry) = super::build_engine(config, ControllerConfig::from(config), None);

    let descriptions = registry.descriptions();
    let width = descriptions
        .iter()
        .map(|(id, _)| id.len())
        .max()
        .unwrap_or(0);

    for (id, description) in descriptions {
        println!("{id:<width$}  {description}");
    }
    Ok(())
}
