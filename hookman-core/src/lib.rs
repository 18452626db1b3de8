//! hookman-core: Native plugin management for host applications
//!
//! A host declares a set of hooks; plugins are shared libraries that export
//! functions for some of them. This crate provides:
//!
//! - **Hook spec** - [`HookSpecRegistry`] validates [`HookSpec`] declarations and
//!   derives the [`CanonicalHookId`] each hook is exported as
//! - **Discovery** - [`PluginCatalog`] scans plugin roots into [`PluginInfo`] records
//! - **Conflicts** - [`detect_conflicts`] and [`ensure_conflict_free`] guard against
//!   two plugins implementing the same hook
//! - **Binding** - [`LibraryBinder`] loads libraries into a [`HookCaller`]
//! - **Packages** - [`PluginInstaller`] installs and removes `.hmplugin` archives
//! - **Facade** - [`HookManager`] ties all of the above to one configuration
//!
//! # Quick Start
//!
//! ```no_run
//! use std::path::Path;
//! use hookman_core::{DynamicLoader, HookManager, HookManagerConfig, HookSpecRegistry};
//!
//! fn example() -> Result<(), Box<dyn std::error::Error>> {
//!     let registry = HookSpecRegistry::load(Path::new("hooks.toml"))?;
//!     let runtime = registry.runtime().to_string();
//!     let manager = HookManager::new(registry, HookManagerConfig::default());
//!
//!     let caller = manager.hook_caller(DynamicLoader::new(runtime), &[])?;
//!     type Friction = extern "C" fn(f64) -> f64;
//!     if let Some(friction) = caller.function::<Friction>("friction")? {
//!         println!("friction: {}", friction.call(1.0e5));
//!     }
//!     Ok(())
//! }
//! ```
//!
//! # Pipeline
//!
//! ```text
//! HookSpec ──► HookSpecRegistry ──► PluginCatalog::scan ──► ensure_conflict_free
//!                                                                  │
//!                                         HookCaller ◄── LibraryBinder::bind
//! ```

pub mod binder;
pub mod catalog;
pub mod conflict;
pub mod error;
pub mod installer;
pub mod manager;
pub mod manifest;
pub mod spec;

// Re-export key types for convenience
pub use binder::{
    DynamicLoader, HookCaller, HookFn, HookSlot, LibraryBinder, LibraryLoader, LoadPolicy,
    NativeLibrary,
};
pub use catalog::{
    ObjectFileInspector, PluginCatalog, PluginInfo, ScanReport, SkippedPlugin, SymbolInspector,
};
pub use conflict::{ConflictFree, ConflictStatus, detect_conflicts, ensure_conflict_free};
pub use error::{
    BindError, CallError, ConflictError, DiscoveryError, InstallError, LoadError, ManifestError,
    SpecError,
};
pub use installer::{PACKAGE_EXTENSION, PluginInstaller, plugin_name_from_package};
pub use manager::{HookManager, HookManagerConfig, PLUGIN_DIR_ENV};
pub use manifest::{MANIFEST_FILE, PluginManifest};
pub use spec::{
    CanonicalHookId, HookDescriptor, HookParam, HookSignature, HookSpec, HookSpecRegistry,
    ParamType,
};
