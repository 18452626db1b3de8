use hookman_core::{HookManagerConfig, LoadPolicy};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Configuration as stored in TOML files (with optional fields for merging)
#[derive(Debug, Clone, Deserialize, Default)]
pub struct RawHookmanConfig {
    /// Hook spec file
    pub spec: Option<PathBuf>,

    /// Plugin roots, scanned in order
    pub plugin_dirs: Option<Vec<PathBuf>>,

    /// Plugins left out of every scan
    pub ignored_plugins: Option<Vec<String>>,

    /// What `check` does with a plugin that fails to load
    pub on_load_error: Option<LoadPolicy>,
}

/// Final configuration with defaults applied
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HookmanConfig {
    pub spec: PathBuf,
    pub plugin_dirs: Vec<PathBuf>,
    pub ignored_plugins: Vec<String>,
    pub on_load_error: LoadPolicy,
}

impl Default for HookmanConfig {
    fn default() -> Self {
        let manager = HookManagerConfig::default();
        Self {
            spec: PathBuf::from(DEFAULT_SPEC_FILE),
            plugin_dirs: manager.plugin_dirs,
            ignored_plugins: manager.ignored_plugins,
            on_load_error: manager.load_policy,
        }
    }
}

impl HookmanConfig {
    pub fn manager_config(&self) -> HookManagerConfig {
        HookManagerConfig {
            plugin_dirs: self.plugin_dirs.clone(),
            ignored_plugins: self.ignored_plugins.clone(),
            load_policy: self.on_load_error,
        }
    }

    /// First plugin root, the default install destination
    pub fn default_destination(&self) -> Option<&PathBuf> {
        self.plugin_dirs.first()
    }
}

/// Hook spec file looked up in the working directory when none is configured
pub const DEFAULT_SPEC_FILE: &str = "hooks.toml";
