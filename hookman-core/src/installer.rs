//! Plugin installer - unpacks `.hmplugin` archives into plugin roots

use std::fs::{self, File};
use std::io::{Read, Seek};
use std::path::{Path, PathBuf};

use zip::ZipArchive;

use crate::catalog::PluginInfo;
use crate::error::InstallError;
use crate::manifest::{MANIFEST_FILE, PluginManifest};

/// Conventional extension of plugin packages
pub const PACKAGE_EXTENSION: &str = "hmplugin";

/// Platform tags a package file stem may end with
const PLATFORM_TAGS: [&str; 2] = ["-linux64", "-win64"];

/// Plugin name for a package: the file stem minus a trailing platform tag.
///
/// `mylib-linux64.hmplugin` → `mylib`
pub fn plugin_name_from_package(package: &Path) -> Option<String> {
    let stem = package.file_stem()?.to_str()?;
    let name = PLATFORM_TAGS
        .iter()
        .find_map(|tag| stem.strip_suffix(tag))
        .unwrap_or(stem);
    (!name.is_empty()).then(|| name.to_string())
}

/// Installs and removes plugins under a fixed set of roots.
///
/// There is no locking: two processes installing into the same root can
/// race. Extraction is not atomic, a failure midway can leave a partially
/// populated plugin directory behind.
#[derive(Debug, Clone)]
pub struct PluginInstaller {
    roots: Vec<PathBuf>,
}

impl PluginInstaller {
    pub fn new(roots: Vec<PathBuf>) -> Self {
        Self { roots }
    }

    pub fn roots(&self) -> &[PathBuf] {
        &self.roots
    }

    /// Install `package` into `destination`, returning the plugin directory.
    ///
    /// The package, the destination and the target directory are all checked
    /// before anything is written.
    pub fn install(&self, package: &Path, destination: &Path) -> Result<PathBuf, InstallError> {
        let mut archive = ZipArchive::new(File::open(package)?)?;
        let manifest = read_manifest(&mut archive, package)?;

        if !self.roots.iter().any(|root| root == destination) {
            return Err(InstallError::InvalidDestination {
                destination: destination.to_path_buf(),
                roots: self.roots.clone(),
            });
        }

        let name = plugin_name_from_package(package).ok_or_else(|| InstallError::InvalidPackage {
            package: package.to_path_buf(),
            reason: "cannot derive a plugin name from the file name".to_string(),
        })?;

        let plugin_dir = destination.join(&name);
        if plugin_dir.exists() {
            return Err(InstallError::AlreadyInstalled {
                name,
                path: plugin_dir,
            });
        }

        fs::create_dir_all(&plugin_dir)?;
        extract(&mut archive, &plugin_dir)?;

        tracing::info!(
            plugin = %name,
            version = %manifest.version,
            path = %plugin_dir.display(),
            "Plugin installed"
        );

        Ok(plugin_dir)
    }

    /// Delete the install directory of a discovered plugin.
    ///
    /// Returns `false` when no plugin of that name was discovered.
    pub fn remove(&self, name: &str, discovered: &[PluginInfo]) -> Result<bool, InstallError> {
        let Some(plugin) = discovered.iter().find(|p| p.name == name) else {
            tracing::debug!(plugin = %name, "Plugin not installed, nothing to remove");
            return Ok(false);
        };

        fs::remove_dir_all(&plugin.location)?;
        tracing::info!(plugin = %name, path = %plugin.location.display(), "Plugin removed");
        Ok(true)
    }
}

fn read_manifest<R: Read + Seek>(
    archive: &mut ZipArchive<R>,
    package: &Path,
) -> Result<PluginManifest, InstallError> {
    let invalid = |reason: String| InstallError::InvalidPackage {
        package: package.to_path_buf(),
        reason,
    };

    let mut entry = archive
        .by_name(MANIFEST_FILE)
        .map_err(|_| invalid(format!("missing {MANIFEST_FILE}")))?;
    let mut content = String::new();
    entry
        .read_to_string(&mut content)
        .map_err(|e| invalid(format!("unreadable {MANIFEST_FILE}: {e}")))?;

    PluginManifest::from_toml_str(&content, &package.join(MANIFEST_FILE))
        .map_err(|e| invalid(e.to_string()))
}

fn extract<R: Read + Seek>(archive: &mut ZipArchive<R>, target: &Path) -> Result<(), InstallError> {
    for i in 0..archive.len() {
        let mut entry = archive.by_index(i)?;

        let Some(relative) = entry.enclosed_name() else {
            tracing::warn!(entry = %entry.name(), "Skipping archive entry outside the plugin directory");
            continue;
        };
        let out_path = target.join(relative);

        if entry.is_dir() {
            fs::create_dir_all(&out_path)?;
            continue;
        }

        if let Some(parent) = out_path.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut out = File::create(&out_path)?;
        std::io::copy(&mut entry, &mut out)?;
    }

    Ok(())
}


#[cfg(test)]
mod tests {
    use std::env::consts::{DLL_PREFIX, DLL_SUFFIX};

    use super::testing::write_package;
    use super::*;
    use crate::catalog::PluginCatalog;
    use crate::catalog::testing::{ListingInspector, manifest_text, registry};
    use tempfile::TempDir;

    fn lib_file(name: &str) -> String {
        format!("{DLL_PREFIX}{name}{DLL_SUFFIX}")
    }

    fn package(dir: &Path, file_name: &str, lib: &str) -> PathBuf {
        let manifest = manifest_text(lib);
        let lib_name = lib_file(lib);
        write_package(
            &dir.join(file_name),
            &[
                (MANIFEST_FILE, manifest.as_str()),
                (lib_name.as_str(), "proj_v1_friction"),
                ("assets/readme.txt", "docs"),
            ],
        )
    }

    #[test]
    fn test_plugin_name_strips_platform_tag() {
        let name = |p: &str| plugin_name_from_package(Path::new(p));
        assert_eq!(name("/tmp/mylib-linux64.hmplugin").as_deref(), Some("mylib"));
        assert_eq!(name("mylib-win64.hmplugin").as_deref(), Some("mylib"));
        assert_eq!(name("mylib.hmplugin").as_deref(), Some("mylib"));
        assert_eq!(name("my-linux64-lib.hmplugin").as_deref(), Some("my-linux64-lib"));
        assert_eq!(name("-linux64.hmplugin"), None);
    }

    #[test]
    fn test_install_creates_plugin_dir() {
        let work = TempDir::new().unwrap();
        let root = TempDir::new().unwrap();
        let pkg = package(work.path(), "mylib-linux64.hmplugin", "mylib");

        let installer = PluginInstaller::new(vec![root.path().to_path_buf()]);
        let dir = installer.install(&pkg, root.path()).unwrap();

        assert_eq!(dir, root.path().join("mylib"));
        assert!(dir.join(MANIFEST_FILE).is_file());
        assert!(dir.join(lib_file("mylib")).is_file());
        assert!(dir.join("assets/readme.txt").is_file());
    }

    #[test]
    fn test_install_rejects_unknown_destination_without_writing() {
        let work = TempDir::new().unwrap();
        let root = TempDir::new().unwrap();
        let elsewhere = TempDir::new().unwrap();
        let pkg = package(work.path(), "mylib.hmplugin", "mylib");

        let installer = PluginInstaller::new(vec![root.path().to_path_buf()]);
        let err = installer.install(&pkg, elsewhere.path()).unwrap_err();

        assert!(matches!(err, InstallError::InvalidDestination { .. }));
        assert_eq!(fs::read_dir(elsewhere.path()).unwrap().count(), 0);
        assert_eq!(fs::read_dir(root.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_install_twice_is_rejected() {
        let work = TempDir::new().unwrap();
        let root = TempDir::new().unwrap();
        let linux = package(work.path(), "mylib-linux64.hmplugin", "mylib");
        let windows = package(work.path(), "mylib-win64.hmplugin", "mylib");

        let installer = PluginInstaller::new(vec![root.path().to_path_buf()]);
        installer.install(&linux, root.path()).unwrap();
        let err = installer.install(&windows, root.path()).unwrap_err();

        assert!(matches!(err, InstallError::AlreadyInstalled { name, .. } if name == "mylib"));
    }

    #[test]
    fn test_package_without_manifest_is_invalid() {
        let work = TempDir::new().unwrap();
        let root = TempDir::new().unwrap();
        let pkg = write_package(&work.path().join("bare.hmplugin"), &[("libbare.so", "")]);

        let installer = PluginInstaller::new(vec![root.path().to_path_buf()]);
        let err = installer.install(&pkg, root.path()).unwrap_err();

        assert!(matches!(err, InstallError::InvalidPackage { reason, .. } if reason.contains(MANIFEST_FILE)));
        assert!(!root.path().join("bare").exists());
    }

    #[test]
    fn test_package_with_malformed_manifest_is_invalid() {
        let work = TempDir::new().unwrap();
        let root = TempDir::new().unwrap();
        let pkg = write_package(
            &work.path().join("broken.hmplugin"),
            &[(MANIFEST_FILE, "version = \"1.0\"")],
        );

        let installer = PluginInstaller::new(vec![root.path().to_path_buf()]);
        let err = installer.install(&pkg, root.path()).unwrap_err();
        assert!(matches!(err, InstallError::InvalidPackage { .. }));
    }

    #[test]
    fn test_non_zip_package_is_rejected() {
        let work = TempDir::new().unwrap();
        let root = TempDir::new().unwrap();
        let pkg = work.path().join("junk.hmplugin");
        fs::write(&pkg, b"not a zip").unwrap();

        let installer = PluginInstaller::new(vec![root.path().to_path_buf()]);
        let err = installer.install(&pkg, root.path()).unwrap_err();
        assert!(matches!(err, InstallError::Zip(_)));
    }

    #[test]
    fn test_entries_escaping_plugin_dir_are_skipped() {
        let work = TempDir::new().unwrap();
        let root = TempDir::new().unwrap();
        let manifest = manifest_text("sneaky");
        let pkg = write_package(
            &work.path().join("sneaky.hmplugin"),
            &[
                (MANIFEST_FILE, manifest.as_str()),
                ("../escaped.txt", "gotcha"),
            ],
        );

        let installer = PluginInstaller::new(vec![root.path().to_path_buf()]);
        installer.install(&pkg, root.path()).unwrap();

        assert!(!root.path().join("escaped.txt").exists());
        assert!(root.path().join("sneaky").join(MANIFEST_FILE).is_file());
    }

    #[test]
    fn test_install_scan_remove_roundtrip() {
        let work = TempDir::new().unwrap();
        let root = TempDir::new().unwrap();
        let roots = vec![root.path().to_path_buf()];
        let pkg = package(work.path(), "mylib-linux64.hmplugin", "mylib");

        let installer = PluginInstaller::new(roots.clone());
        let catalog = PluginCatalog::with_inspector(roots, ListingInspector);
        let registry = registry();

        installer.install(&pkg, root.path()).unwrap();
        let plugins = catalog.scan(&registry, &[]);
        assert_eq!(plugins.len(), 1);
        assert_eq!(plugins[0].name, "mylib");
        assert_eq!(plugins[0].hooks_implemented.len(), 1);

        assert!(installer.remove("mylib", &plugins).unwrap());
        assert!(catalog.scan(&registry, &[]).is_empty());
        assert!(!root.path().join("mylib").exists());
    }

    #[test]
    fn test_remove_unknown_plugin_is_noop() {
        let installer = PluginInstaller::new(Vec::new());
        assert!(!installer.remove("ghost", &[]).unwrap());
    }
}
