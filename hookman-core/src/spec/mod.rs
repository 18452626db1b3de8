//! Hook specification: the declared contract between host and plugins
//!
//! A [`HookSpec`] is the raw declaration (from code or a TOML file). A
//! [`HookSpecRegistry`] is a validated spec plus the canonical symbol name of
//! every hook. Only a registry can be handed to the catalog, binder or
//! manager.

mod types;

use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::SpecError;

pub use types::{HookSignature, NativeArg, NativeReturn, ParamType};

/// One parameter of a hook.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HookParam {
    pub name: String,
    /// `None` means the declaration left the type out, which the registry rejects
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub ty: Option<ParamType>,
}

impl HookParam {
    pub fn new(name: impl Into<String>, ty: ParamType) -> Self {
        Self {
            name: name.into(),
            ty: Some(ty),
        }
    }

    /// A parameter declared without a type.
    pub fn untyped(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ty: None,
        }
    }
}

/// Declaration of a single hook.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HookDescriptor {
    pub name: String,
    #[serde(default)]
    pub params: Vec<HookParam>,
    /// Return type, `None` for `void`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub returns: Option<ParamType>,
    #[serde(default)]
    pub doc: String,
}

impl HookDescriptor {
    pub fn new(name: impl Into<String>, doc: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            params: Vec::new(),
            returns: None,
            doc: doc.into(),
        }
    }

    pub fn param(mut self, name: impl Into<String>, ty: ParamType) -> Self {
        self.params.push(HookParam::new(name, ty));
        self
    }

    pub fn returns(mut self, ty: ParamType) -> Self {
        self.returns = Some(ty);
        self
    }

    /// Declared parameter types. Only meaningful after validation, when
    /// every parameter is known to carry a type.
    pub fn param_types(&self) -> Vec<ParamType> {
        self.params.iter().filter_map(|p| p.ty).collect()
    }

    fn validate(&self) -> Result<(), SpecError> {
        if self.params.is_empty() {
            return Err(SpecError::NoArguments {
                hook: self.name.clone(),
            });
        }
        if let Some(param) = self.params.iter().find(|p| p.ty.is_none()) {
            return Err(SpecError::MissingTypeAnnotation {
                hook: self.name.clone(),
                param: param.name.clone(),
            });
        }
        if self.doc.trim().is_empty() {
            return Err(SpecError::MissingDocumentation {
                hook: self.name.clone(),
            });
        }
        Ok(())
    }
}

/// Raw hook specification, as declared.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HookSpec {
    /// Project identifier, first component of every symbol name
    pub project: String,
    /// Spec version; bump it whenever a hook is added or changed
    pub version: String,
    /// Identifier of the native runtime the host binds through
    pub runtime: String,
    #[serde(default)]
    pub hooks: Vec<HookDescriptor>,
}

impl HookSpec {
    pub fn new(
        project: impl Into<String>,
        version: impl Into<String>,
        runtime: impl Into<String>,
        hooks: Vec<HookDescriptor>,
    ) -> Self {
        Self {
            project: project.into(),
            version: version.into(),
            runtime: runtime.into(),
            hooks,
        }
    }

    pub fn from_toml_str(content: &str) -> Result<Self, SpecError> {
        Ok(toml::from_str(content)?)
    }

    /// Load a spec from a TOML file
    pub fn load(path: &Path) -> Result<Self, SpecError> {
        let content = std::fs::read_to_string(path).map_err(|source| SpecError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content)
    }
}

/// The exported symbol name a plugin must define to implement a hook:
/// `lowercase(project)_v<version>_lowercase(hook)`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CanonicalHookId(String);

impl CanonicalHookId {
    pub fn new(project: &str, version: &str, hook: &str) -> Self {
        Self(format!(
            "{}_v{}_{}",
            project.to_lowercase(),
            version,
            hook.to_lowercase()
        ))
    }

    #[cfg(test)]
    pub(crate) fn from_raw(symbol: impl Into<String>) -> Self {
        Self(symbol.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CanonicalHookId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for CanonicalHookId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Hook names match when their lowercase forms match, the same folding
/// [`CanonicalHookId::new`] applies.
pub(crate) fn same_hook_name(a: &str, b: &str) -> bool {
    a.to_lowercase() == b.to_lowercase()
}

/// A validated hook spec with the canonical id of every hook.
///
/// Read-only once built; share it by reference.
#[derive(Debug, Clone)]
pub struct HookSpecRegistry {
    spec: HookSpec,
    ids: Vec<CanonicalHookId>,
}

impl HookSpecRegistry {
    /// Validate every descriptor in declaration order and derive its id.
    ///
    /// Fails with the first violation found; no registry is produced.
    pub fn new(spec: HookSpec) -> Result<Self, SpecError> {
        let mut ids: Vec<CanonicalHookId> = Vec::with_capacity(spec.hooks.len());

        for hook in &spec.hooks {
            hook.validate()?;

            let id = CanonicalHookId::new(&spec.project, &spec.version, &hook.name);
            if ids.contains(&id) {
                return Err(SpecError::DuplicateHook {
                    hook: hook.name.clone(),
                });
            }
            ids.push(id);
        }

        tracing::debug!(
            project = %spec.project,
            version = %spec.version,
            hooks = ids.len(),
            "Hook spec validated"
        );

        Ok(Self { spec, ids })
    }

    /// Read and validate a TOML spec file
    pub fn load(path: &Path) -> Result<Self, SpecError> {
        Self::new(HookSpec::load(path)?)
    }

    pub fn project(&self) -> &str {
        &self.spec.project
    }

    pub fn version(&self) -> &str {
        &self.spec.version
    }

    pub fn runtime(&self) -> &str {
        &self.spec.runtime
    }

    pub fn spec(&self) -> &HookSpec {
        &self.spec
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Descriptors paired with their ids, in declaration order.
    pub fn hooks(&self) -> impl Iterator<Item = (&HookDescriptor, &CanonicalHookId)> {
        self.spec.hooks.iter().zip(self.ids.iter())
    }

    pub fn ids(&self) -> &[CanonicalHookId] {
        &self.ids
    }

    /// Slot index of a hook by its declared name (case-insensitive).
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.spec
            .hooks
            .iter()
            .position(|h| same_hook_name(&h.name, name))
    }

    /// Slot index of a hook by its canonical id.
    pub fn index_of_id(&self, id: &CanonicalHookId) -> Option<usize> {
        self.ids.iter().position(|candidate| candidate == id)
    }

    pub fn descriptor(&self, index: usize) -> Option<&HookDescriptor> {
        self.spec.hooks.get(index)
    }

    pub fn canonical_id(&self, name: &str) -> Option<&CanonicalHookId> {
        self.index_of(name).map(|i| &self.ids[i])
    }
}
