//! Dynamic binding of plugin libraries into a [`HookCaller`]

mod caller;
mod loader;

use serde::{Deserialize, Serialize};

use crate::catalog::PluginInfo;
use crate::conflict::ConflictFree;
use crate::error::{BindError, LoadError};
use crate::spec::HookSpecRegistry;

pub use caller::{HookCaller, HookFn, HookSlot};
pub use loader::{BoxError, DynamicLoader, LibraryLoader, NativeLibrary};

/// What to do when a plugin's library cannot be opened or resolved
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LoadPolicy {
    /// Refuse to build the caller
    #[default]
    Abort,
    /// Log and leave that plugin's hooks unbound
    Skip,
}

/// Loads plugin libraries through an injected backend and binds their
/// exports into a fresh [`HookCaller`].
#[derive(Debug)]
pub struct LibraryBinder<'r, L> {
    registry: &'r HookSpecRegistry,
    loader: L,
    policy: LoadPolicy,
}

impl<'r, L: LibraryLoader> LibraryBinder<'r, L> {
    pub fn new(registry: &'r HookSpecRegistry, loader: L) -> Self {
        Self {
            registry,
            loader,
            policy: LoadPolicy::default(),
        }
    }

    pub fn with_policy(mut self, policy: LoadPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Bind every plugin of a checked set.
    ///
    /// A slot is bound iff exactly one plugin exports its hook. A second
    /// registration into a slot fails with
    /// [`BindError::InternalConsistency`].
    pub fn bind(&self, plugins: ConflictFree) -> Result<HookCaller, BindError> {
        if self.loader.runtime() != self.registry.runtime() {
            return Err(BindError::RuntimeMismatch {
                expected: self.registry.runtime().to_string(),
                found: self.loader.runtime().to_string(),
            });
        }

        let mut caller = HookCaller::unbound(self.registry);

        for plugin in plugins.plugins() {
            match self.bind_plugin(plugin, &mut caller) {
                Ok(bound) => {
                    tracing::info!(plugin = %plugin.name, hooks = bound, "Plugin bound");
                }
                Err(BindError::Load(e)) if self.policy == LoadPolicy::Skip => {
                    tracing::warn!(plugin = %plugin.name, error = %e, "Skipping plugin that failed to load");
                }
                Err(e) => return Err(e),
            }
        }

        Ok(caller)
    }

    fn bind_plugin(&self, plugin: &PluginInfo, caller: &mut HookCaller) -> Result<usize, BindError> {
        let load_error = |reason: String| LoadError {
            plugin: plugin.name.clone(),
            path: plugin.shared_lib_path.clone(),
            reason,
        };

        let library = self
            .loader
            .open(&plugin.shared_lib_path)
            .map_err(|e| load_error(e.to_string()))?;

        // Resolve everything first so a failing plugin leaves no bindings behind
        let mut resolved = Vec::new();
        for (index, (_, id)) in self.registry.hooks().enumerate() {
            if !plugin.implements(id) {
                continue;
            }
            let address = library
                .symbol(id.as_str())
                .map_err(|e| load_error(format!("symbol '{id}': {e}")))?;
            resolved.push((index, address));
        }

        let bound = resolved.len();
        for (index, address) in resolved {
            caller.bind_slot(index, address, &plugin.name)?;
        }
        caller.retain_library(library);

        Ok(bound)
    }
}
