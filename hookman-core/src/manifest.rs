//! Plugin manifest - `plugin.toml` at the root of every plugin

use std::env::consts::{DLL_PREFIX, DLL_SUFFIX};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::ManifestError;

/// File name of the manifest inside a plugin directory or package
pub const MANIFEST_FILE: &str = "plugin.toml";

/// Plugin metadata
///
/// ```toml
/// name = "Acme friction models"
/// version = "1.0.0"
/// author = "Acme"
/// email = "dev@acme.test"
/// description = "Colebrook friction factor"
/// shared_lib_name = "acme_friction"
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PluginManifest {
    /// Human-readable name; the plugin is identified by its directory name
    #[serde(default)]
    pub name: String,
    pub version: String,
    #[serde(default)]
    pub author: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub description: String,
    /// Library base name without platform prefix or extension
    pub shared_lib_name: String,
}

impl PluginManifest {
    /// Parse and validate manifest text. `path` is only used for error context.
    pub fn from_toml_str(content: &str, path: &Path) -> Result<Self, ManifestError> {
        let manifest: Self = toml::from_str(content).map_err(|source| ManifestError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        manifest.validate(path)?;
        Ok(manifest)
    }

    /// Load a manifest from disk
    pub fn load(path: &Path) -> Result<Self, ManifestError> {
        let content = std::fs::read_to_string(path).map_err(|source| ManifestError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content, path)
    }

    fn validate(&self, path: &Path) -> Result<(), ManifestError> {
        let invalid = |reason: &str| ManifestError::Invalid {
            path: path.to_path_buf(),
            reason: reason.to_string(),
        };

        if self.version.trim().is_empty() {
            return Err(invalid("version is empty"));
        }
        if self.shared_lib_name.trim().is_empty() {
            return Err(invalid("shared_lib_name is empty"));
        }
        if self.shared_lib_name.contains(['/', '\\']) {
            return Err(invalid("shared_lib_name must be a bare name"));
        }
        Ok(())
    }

    /// Platform file name of the library: `libfoo.so`, `libfoo.dylib` or `foo.dll`.
    pub fn library_file_name(&self) -> String {
        format!("{DLL_PREFIX}{}{DLL_SUFFIX}", self.shared_lib_name)
    }

    /// Library path inside an installed plugin directory
    pub fn library_path(&self, plugin_dir: &Path) -> PathBuf {
        plugin_dir.join(self.library_file_name())
    }
}
