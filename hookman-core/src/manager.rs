//! HookManager - the management API tying the pipeline together

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::binder::{HookCaller, LibraryBinder, LibraryLoader, LoadPolicy};
use crate::catalog::{PluginCatalog, PluginInfo, ScanReport, SymbolInspector};
use crate::conflict::{ConflictFree, ConflictStatus, detect_conflicts, ensure_conflict_free};
use crate::error::{BindError, ConflictError, InstallError};
use crate::installer::PluginInstaller;
use crate::spec::HookSpecRegistry;

/// Configuration for [`HookManager`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HookManagerConfig {
    /// Plugin roots, scanned in order; also the only valid install destinations
    pub plugin_dirs: Vec<PathBuf>,
    /// Plugins left out of every scan
    #[serde(default)]
    pub ignored_plugins: Vec<String>,
    /// What binding does with a plugin whose library fails to load
    #[serde(default)]
    pub load_policy: LoadPolicy,
}

/// Environment variable naming the default plugin root
pub const PLUGIN_DIR_ENV: &str = "HOOKMAN_PLUGIN_DIR";

impl HookManagerConfig {
    /// Plugin root used when none is configured: `$HOOKMAN_PLUGIN_DIR` if
    /// set, otherwise `hookman/plugins` under the platform data directory.
    pub fn default_plugin_dir() -> PathBuf {
        if let Some(dir) = std::env::var_os(PLUGIN_DIR_ENV).filter(|d| !d.is_empty()) {
            return PathBuf::from(dir);
        }
        dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("hookman")
            .join("plugins")
    }
}

impl Default for HookManagerConfig {
    fn default() -> Self {
        Self {
            plugin_dirs: vec![Self::default_plugin_dir()],
            ignored_plugins: Vec::new(),
            load_policy: LoadPolicy::default(),
        }
    }
}

/// Owns the hook spec and the configured roots.
///
/// Every query re-scans the roots; results are snapshots.
#[derive(Debug)]
pub struct HookManager {
    registry: HookSpecRegistry,
    catalog: PluginCatalog,
    installer: PluginInstaller,
    ignored: Vec<String>,
    load_policy: LoadPolicy,
}

impl HookManager {
    pub fn new(registry: HookSpecRegistry, config: HookManagerConfig) -> Self {
        Self {
            registry,
            catalog: PluginCatalog::new(config.plugin_dirs.clone()),
            installer: PluginInstaller::new(config.plugin_dirs),
            ignored: config.ignored_plugins,
            load_policy: config.load_policy,
        }
    }

    /// Replace the export-table reader used by discovery
    pub fn with_inspector(mut self, inspector: impl SymbolInspector + 'static) -> Self {
        self.catalog = PluginCatalog::with_inspector(self.catalog.roots().to_vec(), inspector);
        self
    }

    pub fn registry(&self) -> &HookSpecRegistry {
        &self.registry
    }

    pub fn plugin_dirs(&self) -> &[PathBuf] {
        self.catalog.roots()
    }

    fn ignored_with(&self, extra: &[String]) -> Vec<String> {
        self.ignored.iter().chain(extra).cloned().collect()
    }

    /// Plugins currently installed, minus configured and `ignored` names
    pub fn plugins_available(&self, ignored: &[String]) -> Vec<PluginInfo> {
        self.catalog.scan(&self.registry, &self.ignored_with(ignored))
    }

    /// Like [`plugins_available`](Self::plugins_available), keeping skipped entries
    pub fn scan_report(&self, ignored: &[String]) -> ScanReport {
        self.catalog.scan_report(&self.registry, &self.ignored_with(ignored))
    }

    /// Hooks implemented by more than one available plugin
    pub fn status(&self, ignored: &[String]) -> Vec<ConflictStatus> {
        detect_conflicts(&self.plugins_available(ignored))
    }

    pub fn ensure_is_valid(&self, ignored: &[String]) -> Result<ConflictFree, ConflictError> {
        ensure_conflict_free(self.plugins_available(ignored))
    }

    /// Discover, check for conflicts and bind.
    ///
    /// Fails with [`BindError::Conflict`] before any library is opened if
    /// two plugins implement the same hook.
    pub fn hook_caller<L: LibraryLoader>(
        &self,
        loader: L,
        ignored: &[String],
    ) -> Result<HookCaller, BindError> {
        let plugins = self.ensure_is_valid(ignored)?;
        LibraryBinder::new(&self.registry, loader)
            .with_policy(self.load_policy)
            .bind(plugins)
    }

    pub fn install_plugin(&self, package: &Path, destination: &Path) -> Result<PathBuf, InstallError> {
        self.installer.install(package, destination)
    }

    /// Remove an installed plugin; ignored plugins can be removed too.
    pub fn remove_plugin(&self, name: &str) -> Result<bool, InstallError> {
        let discovered = self.catalog.scan(&self.registry, &[]);
        self.installer.remove(name, &discovered)
    }
}
