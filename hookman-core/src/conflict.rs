//! Conflict detection between discovered plugins

use indexmap::IndexMap;
use serde::Serialize;

use crate::catalog::PluginInfo;
use crate::error::ConflictError;
use crate::spec::CanonicalHookId;

/// A hook exported by more than one plugin
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConflictStatus {
    pub hook: CanonicalHookId,
    /// Plugins exporting the hook, in discovery order
    pub plugins: Vec<String>,
}

/// Group plugins by the hooks they export and report every hook claimed
/// more than once.
///
/// Hooks are reported in the order they were first seen; plugin names keep
/// their order in `plugins`.
pub fn detect_conflicts(plugins: &[PluginInfo]) -> Vec<ConflictStatus> {
    let mut by_hook: IndexMap<&CanonicalHookId, Vec<&str>> = IndexMap::new();

    for plugin in plugins {
        for hook in &plugin.hooks_implemented {
            by_hook.entry(hook).or_default().push(&plugin.name);
        }
    }

    by_hook
        .into_iter()
        .filter(|(_, names)| names.len() > 1)
        .map(|(hook, names)| ConflictStatus {
            hook: hook.clone(),
            plugins: names.into_iter().map(str::to_string).collect(),
        })
        .collect()
}

/// A plugin set checked by [`ensure_conflict_free`].
///
/// This is the only input the binder accepts.
#[derive(Debug, Clone)]
pub struct ConflictFree(Vec<PluginInfo>);

impl ConflictFree {
    pub fn plugins(&self) -> &[PluginInfo] {
        &self.0
    }

    pub fn into_inner(self) -> Vec<PluginInfo> {
        self.0
    }

    /// Skips the check; only for exercising the binder's own guards.
    #[cfg(test)]
    pub(crate) fn unchecked(plugins: Vec<PluginInfo>) -> Self {
        Self(plugins)
    }
}

/// Check a plugin set for conflicts, refusing it wholesale if any exist.
pub fn ensure_conflict_free(plugins: Vec<PluginInfo>) -> Result<ConflictFree, ConflictError> {
    let conflicts = detect_conflicts(&plugins);
    if conflicts.is_empty() {
        Ok(ConflictFree(plugins))
    } else {
        for conflict in &conflicts {
            tracing::warn!(
                hook = %conflict.hook,
                plugins = ?conflict.plugins,
                "Hook implemented by more than one plugin"
            );
        }
        Err(ConflictError { conflicts })
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use std::path::PathBuf;

    use super::*;
    use crate::manifest::PluginManifest;

    /// In-memory plugin descriptor exporting the given symbols
    pub fn plugin(name: &str, hooks: &[&str]) -> PluginInfo {
        let location = PathBuf::from("/plugins").join(name);
        PluginInfo {
            name: name.to_string(),
            manifest_path: location.join("plugin.toml"),
            shared_lib_path: location.join(format!("lib{name}.so")),
            location,
            manifest: PluginManifest {
                name: name.to_string(),
                version: "1.0.0".to_string(),
                author: String::new(),
                email: String::new(),
                description: String::new(),
                shared_lib_name: name.to_string(),
            },
            hooks_implemented: hooks
                .iter()
                .map(|h| CanonicalHookId::from_raw(*h))
                .collect(),
        }
    }
}
