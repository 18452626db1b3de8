use super::types::{DEFAULT_SPEC_FILE, HookmanConfig, RawHookmanConfig};
use anyhow::{Context, Result};
use directories::ProjectDirs;
use hookman_core::HookManagerConfig;
use std::path::{Path, PathBuf};

pub struct ConfigLoader;

impl ConfigLoader {
    /// Load merged configuration (user + project)
    pub fn load() -> Result<HookmanConfig> {
        let mut raw = RawHookmanConfig::default();

        // Layer 1: User config
        if let Some(user_path) = Self::user_config_path()
            && user_path.exists()
        {
            raw = Self::merge_raw(raw, Self::read_raw(&user_path)?);
        }

        // Layer 2: Project config
        let project_path = Self::project_config_path();
        if project_path.exists() {
            raw = Self::merge_raw(raw, Self::read_raw(&project_path)?);
        }

        Ok(Self::finalize(raw))
    }

    /// Load a single config file, falling back to defaults if it doesn't exist
    #[cfg(test)]
    pub fn load_from_path(path: &Path) -> Result<HookmanConfig> {
        if !path.exists() {
            return Ok(HookmanConfig::default());
        }
        Ok(Self::finalize(Self::read_raw(path)?))
    }

    fn read_raw(path: &Path) -> Result<RawHookmanConfig> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        let raw = toml::from_str(&contents)
            .with_context(|| format!("invalid config in {}", path.display()))?;
        tracing::debug!(path = %path.display(), "Loaded config layer");
        Ok(raw)
    }

    /// Get user config path (platform-specific)
    pub fn user_config_path() -> Option<PathBuf> {
        ProjectDirs::from("", "", "hookman").map(|dirs| dirs.config_dir().join("config.toml"))
    }

    /// Get project config path
    /// Can be overridden with HOOKMAN_PROJECT_CONFIG_DIR env var (useful for isolated tests)
    pub fn project_config_path() -> PathBuf {
        if let Ok(dir) = std::env::var("HOOKMAN_PROJECT_CONFIG_DIR") {
            PathBuf::from(dir).join("config.toml")
        } else {
            PathBuf::from(".hookman/config.toml")
        }
    }

    /// Merge two raw configs (overlay values override base only if explicitly set)
    fn merge_raw(base: RawHookmanConfig, overlay: RawHookmanConfig) -> RawHookmanConfig {
        RawHookmanConfig {
            spec: overlay.spec.or(base.spec),
            plugin_dirs: overlay.plugin_dirs.or(base.plugin_dirs),
            ignored_plugins: overlay.ignored_plugins.or(base.ignored_plugins),
            on_load_error: overlay.on_load_error.or(base.on_load_error),
        }
    }

    /// Convert raw config to final config with defaults applied
    fn finalize(raw: RawHookmanConfig) -> HookmanConfig {
        let defaults = HookManagerConfig::default();
        HookmanConfig {
            spec: raw.spec.unwrap_or_else(|| PathBuf::from(DEFAULT_SPEC_FILE)),
            plugin_dirs: raw.plugin_dirs.unwrap_or(defaults.plugin_dirs),
            ignored_plugins: raw.ignored_plugins.unwrap_or_default(),
            on_load_error: raw.on_load_error.unwrap_or(defaults.load_policy),
        }
    }
}
