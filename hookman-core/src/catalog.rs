//! Plugin discovery - scans plugin roots and reads library export tables

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use object::Object;
use serde::Serialize;

use crate::error::DiscoveryError;
use crate::manifest::{MANIFEST_FILE, PluginManifest};
use crate::spec::{CanonicalHookId, HookSpecRegistry};

/// Reads the names a native library exports.
///
/// Implementations must not load or run the library.
pub trait SymbolInspector {
    fn exported_symbols(&self, library: &Path) -> Result<HashSet<String>, DiscoveryError>;
}

/// Parses ELF, Mach-O and PE export tables with the `object` crate.
#[derive(Debug, Default, Clone, Copy)]
pub struct ObjectFileInspector;

impl SymbolInspector for ObjectFileInspector {
    fn exported_symbols(&self, library: &Path) -> Result<HashSet<String>, DiscoveryError> {
        let symbols_error = |reason: String| DiscoveryError::Symbols {
            path: library.to_path_buf(),
            reason,
        };

        let data = std::fs::read(library)?;
        let file = object::File::parse(&*data).map_err(|e| symbols_error(e.to_string()))?;
        let exports = file.exports().map_err(|e| symbols_error(e.to_string()))?;

        // Mach-O prefixes C symbols with an underscore
        let strip_underscore = file.format() == object::BinaryFormat::MachO;

        Ok(exports
            .iter()
            .filter_map(|export| std::str::from_utf8(export.name()).ok())
            .map(|name| {
                if strip_underscore {
                    name.strip_prefix('_').unwrap_or(name)
                } else {
                    name
                }
            })
            .map(str::to_string)
            .collect())
    }
}

/// Snapshot of one discovered plugin
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PluginInfo {
    /// Install directory name, used as the plugin's identity
    pub name: String,
    /// Plugin directory under one of the roots
    pub location: PathBuf,
    pub manifest_path: PathBuf,
    pub shared_lib_path: PathBuf,
    pub manifest: PluginManifest,
    /// Spec hooks the library exports, in spec order
    pub hooks_implemented: Vec<CanonicalHookId>,
}

impl PluginInfo {
    pub fn implements(&self, hook: &CanonicalHookId) -> bool {
        self.hooks_implemented.contains(hook)
    }
}

/// A plugin directory left out of a scan, with the reason
#[derive(Debug)]
pub struct SkippedPlugin {
    pub name: String,
    pub location: PathBuf,
    pub error: DiscoveryError,
}

/// Result of a scan including the plugins that could not be read
#[derive(Debug, Default)]
pub struct ScanReport {
    pub plugins: Vec<PluginInfo>,
    pub skipped: Vec<SkippedPlugin>,
}

/// Scans a fixed set of plugin roots.
///
/// Every call re-reads the filesystem; nothing is cached between scans.
pub struct PluginCatalog {
    roots: Vec<PathBuf>,
    inspector: Box<dyn SymbolInspector>,
}

impl std::fmt::Debug for PluginCatalog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PluginCatalog")
            .field("roots", &self.roots)
            .finish_non_exhaustive()
    }
}

impl PluginCatalog {
    pub fn new(roots: Vec<PathBuf>) -> Self {
        Self::with_inspector(roots, ObjectFileInspector)
    }

    pub fn with_inspector(roots: Vec<PathBuf>, inspector: impl SymbolInspector + 'static) -> Self {
        Self {
            roots,
            inspector: Box::new(inspector),
        }
    }

    pub fn roots(&self) -> &[PathBuf] {
        &self.roots
    }

    /// Discover all readable plugins, minus the ignored ones.
    pub fn scan(&self, registry: &HookSpecRegistry, ignored: &[String]) -> Vec<PluginInfo> {
        self.scan_report(registry, ignored).plugins
    }

    /// Discover plugins and keep the reason each unreadable one was skipped.
    pub fn scan_report(&self, registry: &HookSpecRegistry, ignored: &[String]) -> ScanReport {
        let mut report = ScanReport::default();

        for dir in self.plugin_dirs() {
            let Some(name) = dir.file_name().and_then(|n| n.to_str()).map(str::to_string)
            else {
                continue;
            };

            if ignored.iter().any(|i| i == &name) {
                tracing::debug!(plugin = %name, "Plugin ignored, skipping");
                continue;
            }

            match self.inspect(registry, &dir, &name) {
                Ok(info) => {
                    tracing::debug!(
                        plugin = %name,
                        hooks = info.hooks_implemented.len(),
                        "Plugin discovered"
                    );
                    report.plugins.push(info);
                }
                Err(error) => {
                    tracing::warn!(plugin = %name, error = %error, "Skipping unreadable plugin");
                    report.skipped.push(SkippedPlugin {
                        name,
                        location: dir,
                        error,
                    });
                }
            }
        }

        report
    }

    /// Subdirectories holding a manifest, roots in order, entries sorted by name
    fn plugin_dirs(&self) -> Vec<PathBuf> {
        let mut found = Vec::new();

        for root in &self.roots {
            let entries = match std::fs::read_dir(root) {
                Ok(entries) => entries,
                Err(e) => {
                    tracing::debug!(dir = %root.display(), error = %e, "Plugin root not readable");
                    continue;
                }
            };

            let mut dirs: Vec<PathBuf> = entries
                .filter_map(Result::ok)
                .map(|entry| entry.path())
                .filter(|path| path.is_dir() && path.join(MANIFEST_FILE).is_file())
                .collect();
            dirs.sort();
            found.extend(dirs);
        }

        found
    }

    fn inspect(
        &self,
        registry: &HookSpecRegistry,
        dir: &Path,
        name: &str,
    ) -> Result<PluginInfo, DiscoveryError> {
        let manifest_path = dir.join(MANIFEST_FILE);
        let manifest = PluginManifest::load(&manifest_path)?;

        let shared_lib_path = manifest.library_path(dir);
        if !shared_lib_path.is_file() {
            return Err(DiscoveryError::LibraryNotFound {
                path: shared_lib_path,
            });
        }

        let exports = self.inspector.exported_symbols(&shared_lib_path)?;
        let hooks_implemented = registry
            .ids()
            .iter()
            .filter(|id| exports.contains(id.as_str()))
            .cloned()
            .collect();

        Ok(PluginInfo {
            name: name.to_string(),
            location: dir.to_path_buf(),
            manifest_path,
            shared_lib_path,
            manifest,
            hooks_implemented,
        })
    }
}

#[cfg(test)]
pub(crate) mod testing {
    //! Filesystem fixtures shared by the catalog, installer and manager tests

    use super::*;
    use crate::spec::{HookDescriptor, HookSpec, ParamType};

    /// Treats the library file as a newline-separated list of exported names.
    pub struct ListingInspector;

    impl SymbolInspector for ListingInspector {
        fn exported_symbols(&self, library: &Path) -> Result<HashSet<String>, DiscoveryError> {
            let content = std::fs::read_to_string(library)?;
            Ok(content.lines().map(|l| l.trim().to_string()).collect())
        }
    }

    pub fn registry() -> HookSpecRegistry {
        HookSpecRegistry::new(HookSpec::new(
            "Proj",
            "1",
            "proj_hooks",
            vec![
                HookDescriptor::new("friction", "Friction factor.")
                    .param("reynolds", ParamType::F64)
                    .returns(ParamType::F64),
                HookDescriptor::new("env_temperature", "Ambient temperature.")
                    .param("time", ParamType::F64)
                    .returns(ParamType::F64),
            ],
        ))
        .unwrap()
    }

    pub fn manifest_text(lib: &str) -> String {
        format!("name = \"{lib}\"\nversion = \"1.0.0\"\nauthor = \"tests\"\nshared_lib_name = \"{lib}\"\n")
    }

    /// Write `<root>/<name>/plugin.toml` and a fake library listing `exports`
    pub fn write_plugin(root: &Path, name: &str, exports: &[&str]) -> PathBuf {
        let dir = root.join(name);
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join(MANIFEST_FILE), manifest_text(name)).unwrap();
        let manifest = PluginManifest::load(&dir.join(MANIFEST_FILE)).unwrap();
        std::fs::write(manifest.library_path(&dir), exports.join("\n")).unwrap();
        dir
    }
}
