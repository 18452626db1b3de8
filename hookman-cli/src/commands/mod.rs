pub mod check;
pub mod hooks;
pub mod plugins;

use anyhow::{Context, Result};
use hookman_core::{HookManager, HookSpecRegistry};

use crate::config::HookmanConfig;

/// Load and validate the configured hook spec
pub fn load_registry(config: &HookmanConfig) -> Result<HookSpecRegistry> {
    HookSpecRegistry::load(&config.spec)
        .with_context(|| format!("failed to load hook spec {}", config.spec.display()))
}

pub fn load_manager(config: &HookmanConfig) -> Result<HookManager> {
    Ok(HookManager::new(
        load_registry(config)?,
        config.manager_config(),
    ))
}
