//! Macro loading and the namespace registry.
//!
//! Macros are user-authored `.star` files in a flat directory. Each file is
//! executed in a fresh module with only the standard globals (macros must be
//! self-contained), frozen, and exposed under a namespace equal to its file
//! stem. Bindings whose names start with `_` stay private.

use crate::error::{clamp, StarError, StarResult};
use once_cell::sync::Lazy;
use regex::Regex;
use starlark::environment::{FrozenModule, Globals, Module};
use starlark::eval::Evaluator;
use starlark::syntax::{AstModule, Dialect};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Engine-injected globals that macro namespaces may never shadow.
pub const RESERVED_NAMESPACES: &[&str] = &["config", "env", "target", "this", "ref"];

static NAMESPACE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("namespace regex"));

/// A loaded, frozen macro module.
#[derive(Debug)]
pub struct MacroModule {
    /// Namespace (the filename stem)
    pub namespace: String,
    /// Source path
    pub path: PathBuf,
    /// The frozen module holding the executed bindings
    pub module: FrozenModule,
    /// Exported binding names (non-underscore), sorted
    pub exports: Vec<String>,
}

/// Registry of macro namespaces. Immutable once loading completes.
#[derive(Debug, Default)]
pub struct MacroRegistry {
    modules: BTreeMap<String, MacroModule>,
}

impl MacroRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a module; reserved and duplicate namespaces are errors.
    pub fn register(&mut self, module: MacroModule) -> StarResult<()> {
        if RESERVED_NAMESPACES.contains(&module.namespace.as_str()) {
            return Err(StarError::Registry {
                namespace: module.namespace.clone(),
                message: format!("cannot use reserved namespace '{}'", module.namespace),
            });
        }
        if let Some(existing) = self.modules.get(&module.namespace) {
            return Err(StarError::Registry {
                namespace: module.namespace.clone(),
                message: format!(
                    "namespace already registered by {}",
                    existing.path.display()
                ),
            });
        }
        self.modules.insert(module.namespace.clone(), module);
        Ok(())
    }

    /// Look up a module by namespace (case-sensitive).
    pub fn get(&self, namespace: &str) -> Option<&MacroModule> {
        self.modules.get(namespace)
    }

    /// Whether a namespace is registered.
    pub fn has(&self, namespace: &str) -> bool {
        self.modules.contains_key(namespace)
    }

    /// Sorted namespace names.
    pub fn namespaces(&self) -> Vec<&str> {
        self.modules.keys().map(String::as_str).collect()
    }

    /// Iterate (namespace, module) pairs in namespace order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &MacroModule)> {
        self.modules.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Number of registered namespaces.
    pub fn len(&self) -> usize {
        self.modules.len()
    }

    /// Whether the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }
}

/// Load every `*.star` file at the top level of `dir` and register it.
///
/// A missing directory yields an empty registry; anything else that goes
/// wrong (unreadable file, syntax error, invalid or colliding namespace)
/// aborts the load.
pub fn load_and_register(dir: &Path) -> StarResult<MacroRegistry> {
    let mut registry = MacroRegistry::new();

    if !dir.exists() {
        return Ok(registry);
    }
    if !dir.is_dir() {
        return Err(StarError::Load {
            file: dir.display().to_string(),
            message: "not a directory".to_string(),
        });
    }

    let mut files: Vec<PathBuf> = std::fs::read_dir(dir)
        .map_err(|e| StarError::Load {
            file: dir.display().to_string(),
            message: e.to_string(),
        })?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| p.is_file() && p.extension().is_some_and(|e| e == "star"))
        .collect();
    files.sort();

    for path in files {
        let module = load_macro_file(&path)?;
        registry.register(module)?;
    }

    Ok(registry)
}

/// Load and execute one macro file into a frozen module.
pub fn load_macro_file(path: &Path) -> StarResult<MacroModule> {
    let file = path.display().to_string();
    let load_err = |message: String| StarError::Load {
        file: file.clone(),
        message: clamp(&message),
    };

    let namespace = path
        .file_stem()
        .and_then(|s| s.to_str())
        .map(str::to_string)
        .ok_or_else(|| load_err("non-UTF-8 file name".to_string()))?;

    if !NAMESPACE_RE.is_match(&namespace) {
        return Err(load_err(format!(
            "invalid namespace '{namespace}': must match [A-Za-z_][A-Za-z0-9_]*"
        )));
    }

    let source = std::fs::read_to_string(path).map_err(|e| load_err(e.to_string()))?;

    let ast = AstModule::parse(&file, source, &Dialect::Standard)
        .map_err(|e| load_err(e.to_string()))?;

    // Fresh module, standard globals only: macros see no project state.
    let module = Module::new();
    {
        let mut eval = Evaluator::new(&module);
        eval.eval_module(ast, &Globals::standard())
            .map_err(|e| load_err(e.to_string()))?;
    }

    let frozen = module.freeze().map_err(|e| load_err(e.to_string()))?;

    let mut exports: Vec<String> = frozen
        .names()
        .map(|n| n.as_str().to_string())
        .filter(|n| !n.starts_with('_'))
        .collect();
    exports.sort();

    Ok(MacroModule {
        namespace,
        path: path.to_path_buf(),
        module: frozen,
        exports,
    })
}

#[cfg(test)]
#[path = "macros_test.rs"]
mod tests;
