//! Error types for hookman-core

use std::path::PathBuf;

use thiserror::Error;

use crate::conflict::ConflictStatus;
use crate::spec::ParamType;

/// Errors raised while building a [`HookSpecRegistry`](crate::HookSpecRegistry).
///
/// Construction stops at the first violation, in declaration order.
#[derive(Error, Debug)]
pub enum SpecError {
    /// A hook was declared without parameters
    #[error("Hook '{hook}' has no arguments, every hook needs at least one")]
    NoArguments { hook: String },

    /// A hook parameter has no declared type
    #[error("Argument '{param}' of hook '{hook}' has no type")]
    MissingTypeAnnotation { hook: String, param: String },

    /// A hook has no documentation
    #[error("Hook '{hook}' has no documentation")]
    MissingDocumentation { hook: String },

    /// Two hooks share a name (compared case-insensitively)
    #[error("Hook '{hook}' is declared more than once")]
    DuplicateHook { hook: String },

    /// Spec file could not be read
    #[error("Failed to read hook spec {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Spec file is not valid TOML for a hook spec
    #[error("Failed to parse hook spec: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Errors reading or validating a `plugin.toml`.
#[derive(Error, Debug)]
pub enum ManifestError {
    /// Manifest file could not be read
    #[error("Failed to read manifest {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Manifest is not valid TOML or misses required keys
    #[error("Malformed manifest {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    /// Manifest parsed but holds an unusable value
    #[error("Invalid manifest {path}: {reason}")]
    Invalid { path: PathBuf, reason: String },
}

/// Why a plugin directory was left out of a scan.
#[derive(Error, Debug)]
pub enum DiscoveryError {
    #[error(transparent)]
    Manifest(#[from] ManifestError),

    /// The platform library named by the manifest is absent
    #[error("Plugin library not found: {path}")]
    LibraryNotFound { path: PathBuf },

    /// The library exists but its export table could not be read
    #[error("Failed to read exports of {path}: {reason}")]
    Symbols { path: PathBuf, reason: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors from installing a plugin package.
///
/// Every variant except `Zip` and `Io` is raised before the filesystem is
/// modified.
#[derive(Error, Debug)]
pub enum InstallError {
    /// Destination is not one of the configured plugin roots
    #[error("Invalid destination {destination}, it is not one of the configured plugin directories: {roots:?}")]
    InvalidDestination {
        destination: PathBuf,
        roots: Vec<PathBuf>,
    },

    /// A plugin directory with the same name already exists
    #[error("Plugin '{name}' is already installed at {path}")]
    AlreadyInstalled { name: String, path: PathBuf },

    /// Package is missing its manifest or the manifest is malformed
    #[error("Invalid plugin package {package}: {reason}")]
    InvalidPackage { package: PathBuf, reason: String },

    #[error("Archive error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// More than one plugin implements the same hook.
#[derive(Error, Debug, Clone)]
#[error("Could not build a hook caller, conflicts between installed plugins: {}", format_conflicts(.conflicts))]
pub struct ConflictError {
    pub conflicts: Vec<ConflictStatus>,
}

fn format_conflicts(conflicts: &[ConflictStatus]) -> String {
    conflicts
        .iter()
        .map(|c| format!("{} [{}]", c.hook, c.plugins.join(", ")))
        .collect::<Vec<_>>()
        .join("; ")
}

/// A plugin's native library could not be opened or a symbol resolved.
#[derive(Error, Debug)]
#[error("Failed to load plugin '{plugin}' from {path}: {reason}")]
pub struct LoadError {
    pub plugin: String,
    pub path: PathBuf,
    pub reason: String,
}

/// Errors from building a [`HookCaller`](crate::HookCaller).
#[derive(Error, Debug)]
pub enum BindError {
    #[error(transparent)]
    Conflict(#[from] ConflictError),

    #[error(transparent)]
    Load(#[from] LoadError),

    /// A slot received a second registration. This is a defect in the
    /// gating, never a user error.
    #[error("Internal consistency error: hook '{hook}' already bound by '{bound_by}', rejected registration from '{rejected}'")]
    InternalConsistency {
        hook: String,
        bound_by: String,
        rejected: String,
    },

    /// The injected backend serves a different runtime than the spec targets
    #[error("Runtime mismatch: hook spec targets '{expected}', loader provides '{found}'")]
    RuntimeMismatch { expected: String, found: String },
}

/// Errors from typed access to a bound hook.
#[derive(Error, Debug, PartialEq)]
pub enum CallError {
    #[error("Unknown hook '{0}'")]
    UnknownHook(String),

    #[error("Signature mismatch for hook '{hook}': spec declares ({expected}), caller asked for ({found})")]
    SignatureMismatch {
        hook: String,
        expected: String,
        found: String,
    },
}

impl CallError {
    pub(crate) fn mismatch(
        hook: &str,
        expected: (&[ParamType], Option<ParamType>),
        found: (&[ParamType], Option<ParamType>),
    ) -> Self {
        Self::SignatureMismatch {
            hook: hook.to_string(),
            expected: ParamType::describe_signature(expected.0, expected.1),
            found: ParamType::describe_signature(found.0, found.1),
        }
    }
}
