//! End-to-end lifecycle: install packages, discover, check conflicts, bind, call

use std::collections::{HashMap, HashSet};
use std::ffi::c_void;
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::ptr::NonNull;

use hookman_core::binder::BoxError;
use hookman_core::{
    BindError, DiscoveryError, HookManager, HookManagerConfig, HookSpecRegistry, LibraryLoader,
    LoadPolicy, NativeLibrary, SymbolInspector,
};
use tempfile::TempDir;
use zip::ZipWriter;
use zip::write::SimpleFileOptions;

const HOOKS: &str = r#"
project = "Acme"
version = "2"
runtime = "acme_native"

[[hooks]]
name = "friction"
doc = "Darcy friction factor for a Reynolds number and relative roughness."
returns = "double"
params = [
    { name = "reynolds", type = "double" },
    { name = "roughness", type = "double" },
]

[[hooks]]
name = "Scale"
doc = "Scale an integer reading."
returns = "int"
params = [{ name = "raw", type = "int" }]
"#;

extern "C" fn friction(reynolds: f64, _roughness: f64) -> f64 {
    64.0 / reynolds
}

extern "C" fn scale(raw: i32) -> i32 {
    raw * 10
}

/// Library files hold their export list, one name per line
struct ListingInspector;

impl SymbolInspector for ListingInspector {
    fn exported_symbols(&self, library: &Path) -> Result<HashSet<String>, DiscoveryError> {
        let content = std::fs::read_to_string(library)?;
        Ok(content.lines().map(str::to_string).collect())
    }
}

/// Resolves listed exports to functions linked into this test binary
struct InProcessLoader {
    functions: HashMap<&'static str, NonNull<c_void>>,
}

impl InProcessLoader {
    fn new() -> Self {
        let functions = HashMap::from([
            (
                "acme_v2_friction",
                NonNull::new(friction as *mut c_void).unwrap(),
            ),
            ("acme_v2_scale", NonNull::new(scale as *mut c_void).unwrap()),
        ]);
        Self { functions }
    }
}

struct InProcessLibrary {
    exports: HashMap<String, NonNull<c_void>>,
}

impl NativeLibrary for InProcessLibrary {
    fn symbol(&self, name: &str) -> Result<NonNull<c_void>, BoxError> {
        self.exports
            .get(name)
            .copied()
            .ok_or_else(|| format!("undefined symbol {name}").into())
    }
}

impl LibraryLoader for InProcessLoader {
    fn runtime(&self) -> &str {
        "acme_native"
    }

    fn open(&self, path: &Path) -> Result<Box<dyn NativeLibrary>, BoxError> {
        let listing = std::fs::read_to_string(path)?;
        let exports = listing
            .lines()
            .filter_map(|name| Some((name.to_string(), *self.functions.get(name)?)))
            .collect();
        Ok(Box::new(InProcessLibrary { exports }))
    }
}

fn library_file(lib: &str) -> String {
    format!(
        "{}{lib}{}",
        std::env::consts::DLL_PREFIX,
        std::env::consts::DLL_SUFFIX
    )
}

fn package(dir: &Path, file_name: &str, lib: &str, exports: &[&str]) -> PathBuf {
    let path = dir.join(file_name);
    let mut zip = ZipWriter::new(File::create(&path).unwrap());
    let options = SimpleFileOptions::default();

    zip.start_file("plugin.toml", options).unwrap();
    write!(
        zip,
        "name = \"{lib}\"\nversion = \"0.3.0\"\nauthor = \"Acme\"\ndescription = \"test plugin\"\nshared_lib_name = \"{lib}\"\n"
    )
    .unwrap();
    zip.start_file(library_file(lib), options).unwrap();
    zip.write_all(exports.join("\n").as_bytes()).unwrap();
    zip.finish().unwrap();
    path
}

struct Fixture {
    _dir: TempDir,
    packages: PathBuf,
    root: PathBuf,
    manager: HookManager,
}

fn fixture(policy: LoadPolicy) -> Fixture {
    let dir = TempDir::new().unwrap();
    let packages = dir.path().join("packages");
    let root = dir.path().join("plugins");
    std::fs::create_dir_all(&packages).unwrap();
    std::fs::create_dir_all(&root).unwrap();

    let registry = HookSpecRegistry::new(hookman_core::HookSpec::from_toml_str(HOOKS).unwrap())
        .unwrap();
    let config = HookManagerConfig {
        plugin_dirs: vec![root.clone()],
        ignored_plugins: Vec::new(),
        load_policy: policy,
    };
    let manager = HookManager::new(registry, config).with_inspector(ListingInspector);

    Fixture {
        _dir: dir,
        packages,
        root,
        manager,
    }
}

#[test]
fn test_install_discover_bind_and_call() {
    let fx = fixture(LoadPolicy::Abort);
    let flow = package(&fx.packages, "flow-linux64.hmplugin", "flow", &["acme_v2_friction"]);
    let gauge = package(&fx.packages, "gauge-win64.hmplugin", "gauge", &["acme_v2_scale"]);

    assert_eq!(
        fx.manager.install_plugin(&flow, &fx.root).unwrap(),
        fx.root.join("flow")
    );
    fx.manager.install_plugin(&gauge, &fx.root).unwrap();

    let plugins = fx.manager.plugins_available(&[]);
    let names: Vec<&str> = plugins.iter().map(|p| p.name.as_str()).collect();
    assert_eq!(names, ["flow", "gauge"]);
    assert_eq!(plugins[0].manifest.version, "0.3.0");
    assert!(fx.manager.status(&[]).is_empty());

    let caller = fx.manager.hook_caller(InProcessLoader::new(), &[]).unwrap();
    assert_eq!(caller.library_count(), 2);
    assert_eq!(caller.slot("friction").unwrap().plugin(), Some("flow"));

    type Friction = extern "C" fn(f64, f64) -> f64;
    let f = caller.function::<Friction>("friction").unwrap().unwrap();
    assert_eq!(f.call(3200.0, 0.0), 0.02);

    type Scale = extern "C" fn(i32) -> i32;
    let s = caller.function::<Scale>("scale").unwrap().unwrap();
    assert_eq!(s.call(7), 70);
}

#[test]
fn test_conflicting_install_blocks_binding_until_removed() {
    let fx = fixture(LoadPolicy::Abort);
    let flow = package(&fx.packages, "flow.hmplugin", "flow", &["acme_v2_friction"]);
    let rival = package(&fx.packages, "rival.hmplugin", "rival", &["acme_v2_friction"]);
    fx.manager.install_plugin(&flow, &fx.root).unwrap();
    fx.manager.install_plugin(&rival, &fx.root).unwrap();

    let status = fx.manager.status(&[]);
    assert_eq!(status.len(), 1);
    assert_eq!(status[0].hook.as_str(), "acme_v2_friction");
    assert_eq!(status[0].plugins, ["flow", "rival"]);

    let err = fx
        .manager
        .hook_caller(InProcessLoader::new(), &[])
        .unwrap_err();
    assert!(matches!(err, BindError::Conflict(_)));
    assert!(err.to_string().contains("acme_v2_friction"));

    // Ignoring one side is enough
    let caller = fx
        .manager
        .hook_caller(InProcessLoader::new(), &["rival".to_string()])
        .unwrap();
    assert!(caller.is_bound("friction"));
    drop(caller);

    assert!(fx.manager.remove_plugin("rival").unwrap());
    assert!(fx.manager.status(&[]).is_empty());
    assert!(fx.manager.hook_caller(InProcessLoader::new(), &[]).is_ok());
}

#[test]
fn test_plugin_info_serializes_for_reports() {
    let fx = fixture(LoadPolicy::Abort);
    let flow = package(&fx.packages, "flow.hmplugin", "flow", &["acme_v2_friction"]);
    fx.manager.install_plugin(&flow, &fx.root).unwrap();

    let plugins = fx.manager.plugins_available(&[]);
    let json = serde_json::to_value(&plugins).unwrap();
    assert_eq!(json[0]["name"], "flow");
    assert_eq!(json[0]["hooks_implemented"][0], "acme_v2_friction");
    assert_eq!(json[0]["manifest"]["author"], "Acme");
}

#[test]
fn test_wrong_signature_is_rejected() {
    let fx = fixture(LoadPolicy::Abort);
    let gauge = package(&fx.packages, "gauge.hmplugin", "gauge", &["acme_v2_scale"]);
    fx.manager.install_plugin(&gauge, &fx.root).unwrap();

    let caller = fx.manager.hook_caller(InProcessLoader::new(), &[]).unwrap();
    type Wrong = extern "C" fn(f64) -> f64;
    assert!(caller.function::<Wrong>("scale").is_err());
    assert!(caller.function::<Wrong>("missing").is_err());
}
