//! Native backend: opening plugin libraries and resolving symbols

use std::ffi::c_void;
use std::path::Path;
use std::ptr::NonNull;

use libloading::Library;

pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// An opened native library.
///
/// Dropping it may unmap the code behind every address it resolved, so the
/// [`HookCaller`](super::HookCaller) keeps it alive.
pub trait NativeLibrary {
    /// Raw address of an exported function
    fn symbol(&self, name: &str) -> Result<NonNull<c_void>, BoxError>;
}

/// Backend the binder opens libraries through.
pub trait LibraryLoader {
    /// Runtime identifier this backend serves; must match the hook spec's
    fn runtime(&self) -> &str;

    fn open(&self, path: &Path) -> Result<Box<dyn NativeLibrary>, BoxError>;
}

/// Opens libraries with the platform dynamic loader.
#[derive(Debug, Clone)]
pub struct DynamicLoader {
    runtime: String,
}

impl DynamicLoader {
    pub fn new(runtime: impl Into<String>) -> Self {
        Self {
            runtime: runtime.into(),
        }
    }
}

impl LibraryLoader for DynamicLoader {
    fn runtime(&self) -> &str {
        &self.runtime
    }

    fn open(&self, path: &Path) -> Result<Box<dyn NativeLibrary>, BoxError> {
        // SAFETY: Loading runs the library's initializers. Plugins come from
        // the configured roots, which the host trusts.
        let library = unsafe { Library::new(path)? };
        Ok(Box::new(DynamicLibrary { library }))
    }
}

struct DynamicLibrary {
    library: Library,
}

impl NativeLibrary for DynamicLibrary {
    fn symbol(&self, name: &str) -> Result<NonNull<c_void>, BoxError> {
        // SAFETY: Only the address is taken here; the signature is checked
        // against the hook descriptor before anything is called.
        let function: libloading::Symbol<unsafe extern "C" fn()> =
            unsafe { self.library.get(name.as_bytes())? };

        NonNull::new(*function as *mut c_void)
            .ok_or_else(|| format!("symbol '{name}' resolved to a null address").into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_dynamic_loader_reports_runtime() {
        assert_eq!(DynamicLoader::new("acme_hooks").runtime(), "acme_hooks");
    }

    #[test]
    fn test_dynamic_loader_missing_library() {
        let dir = TempDir::new().unwrap();
        let result = DynamicLoader::new("acme_hooks").open(&dir.path().join("libmissing.so"));
        assert!(result.is_err());
    }

    #[test]
    fn test_dynamic_loader_rejects_non_library() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("libbogus.so");
        std::fs::write(&path, b"not a shared object").unwrap();
        assert!(DynamicLoader::new("acme_hooks").open(&path).is_err());
    }
}
