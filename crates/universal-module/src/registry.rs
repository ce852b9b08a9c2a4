// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Synchronous module registry
//!
//! Two bundling conventions are supported:
//!
//! - **Static**: everything is bundled into one artifact and modules are
//!   loaded directly by their static path.
//! - **Chunked**: code-split bundles install evaluated chunks into a
//!   registry keyed by opaque id, read back through a chunk lookup function.
//!
//! [`ModuleRegistry::detect`] probes the [`Environment`] once and picks the
//! matching [`SyncResolver`].

use crate::error::{Result, UniversalError};
use crate::value::Value;
use dashmap::DashMap;
use std::fmt;
use std::sync::{Arc, OnceLock};

/// Environment-provided chunk lookup: `(identifier) -> module`
pub type ChunkLookup = Arc<dyn Fn(&str) -> Option<Value> + Send + Sync>;

/// Lazily evaluated module body for the static convention
pub type ModuleFactory = Arc<dyn Fn() -> anyhow::Result<Value> + Send + Sync>;

/// Bundling convention a resolver implements
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Convention {
    /// All code in one artifact, modules keyed by static path
    Static,
    /// Code-split chunks, modules keyed by bundler id
    Chunked,
}

/// Synchronous module lookup for one bundling convention
pub trait SyncResolver: Send + Sync {
    /// Which convention this resolver implements
    fn convention(&self) -> Convention;

    /// Whether `id` can be produced without suspending
    fn is_available(&self, id: &str) -> bool;

    /// Produce the module for `id`, or `None` if it is not loaded yet
    fn resolve(&self, id: &str) -> Option<Value>;
}

/// A module identifier, either known up front or computed on demand
#[derive(Clone)]
pub enum ModuleSource {
    /// Literal identifier
    Literal(String),
    /// Identifier computed when first needed
    Deferred(Arc<dyn Fn() -> String + Send + Sync>),
}

impl ModuleSource {
    /// Deferred identifier computed by `f`
    pub fn deferred<F>(f: F) -> Self
    where
        F: Fn() -> String + Send + Sync + 'static,
    {
        ModuleSource::Deferred(Arc::new(f))
    }

    /// Evaluate to a concrete identifier
    pub fn identifier(&self) -> String {
        match self {
            ModuleSource::Literal(id) => id.clone(),
            ModuleSource::Deferred(f) => f(),
        }
    }
}

impl fmt::Debug for ModuleSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModuleSource::Literal(id) => f.debug_tuple("Literal").field(id).finish(),
            ModuleSource::Deferred(_) => write!(f, "Deferred(..)"),
        }
    }
}

impl From<&str> for ModuleSource {
    fn from(id: &str) -> Self {
        ModuleSource::Literal(id.to_string())
    }
}

impl From<String> for ModuleSource {
    fn from(id: String) -> Self {
        ModuleSource::Literal(id)
    }
}

#[derive(Clone)]
enum StaticEntry {
    Evaluated(Value),
    Lazy(Arc<LazyModule>),
}

// Factory plus the single outcome of running it. A failed evaluation is
// remembered as `None` so the factory never runs twice.
struct LazyModule {
    factory: ModuleFactory,
    outcome: OnceLock<Option<Value>>,
}

impl LazyModule {
    fn evaluate(&self, id: &str) -> Option<Value> {
        self.outcome
            .get_or_init(|| match (self.factory)() {
                Ok(value) => Some(value),
                Err(err) => {
                    tracing::warn!(module = id, error = %err, "module evaluation failed");
                    None
                }
            })
            .clone()
    }
}

/// Registry for the static convention: every module is in the bundle.
#[derive(Default)]
pub struct StaticRegistry {
    modules: DashMap<String, StaticEntry>,
}

impl StaticRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an already evaluated module
    pub fn register(&self, path: impl Into<String>, module: impl Into<Value>) {
        self.modules
            .insert(path.into(), StaticEntry::Evaluated(module.into()));
    }

    /// Register a module evaluated on first load
    pub fn register_lazy<F>(&self, path: impl Into<String>, factory: F)
    where
        F: Fn() -> anyhow::Result<Value> + Send + Sync + 'static,
    {
        let lazy = LazyModule {
            factory: Arc::new(factory),
            outcome: OnceLock::new(),
        };
        self.modules
            .insert(path.into(), StaticEntry::Lazy(Arc::new(lazy)));
    }

    /// Number of registered modules
    pub fn len(&self) -> usize {
        self.modules.len()
    }

    /// Whether nothing is registered
    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }
}

impl SyncResolver for StaticRegistry {
    fn convention(&self) -> Convention {
        Convention::Static
    }

    fn is_available(&self, id: &str) -> bool {
        self.modules.contains_key(id)
    }

    fn resolve(&self, id: &str) -> Option<Value> {
        // Clone out so no shard lock is held while the factory runs
        let entry = self.modules.get(id).map(|entry| entry.clone())?;

        match entry {
            StaticEntry::Evaluated(value) => Some(value),
            StaticEntry::Lazy(lazy) => lazy.evaluate(id),
        }
    }
}

/// Registry for the chunked convention.
///
/// A module is synchronously available only once the chunk carrying it has
/// been installed. The lookup function then turns the id into the module.
pub struct ChunkRegistry {
    installed: DashMap<String, Value>,
    lookup: Option<ChunkLookup>,
}

impl ChunkRegistry {
    /// Registry that reads modules back from its own installed set
    pub fn new() -> Self {
        Self {
            installed: DashMap::new(),
            lookup: None,
        }
    }

    /// Registry paired with an environment-provided lookup function
    pub fn with_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<Value> + Send + Sync + 'static,
    {
        Self {
            installed: DashMap::new(),
            lookup: Some(Arc::new(lookup)),
        }
    }

    /// Record that the chunk carrying `id` has been evaluated
    pub fn install(&self, id: impl Into<String>, module: impl Into<Value>) {
        let id = id.into();
        tracing::trace!(module = %id, "chunk installed");
        self.installed.insert(id, module.into());
    }

    /// Remove an installed module (hot reload)
    pub fn uninstall(&self, id: &str) -> Option<Value> {
        self.installed.remove(id).map(|(_, v)| v)
    }

    /// Ids of all installed modules
    pub fn installed_ids(&self) -> Vec<String> {
        self.installed.iter().map(|entry| entry.key().clone()).collect()
    }
}

impl Default for ChunkRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl SyncResolver for ChunkRegistry {
    fn convention(&self) -> Convention {
        Convention::Chunked
    }

    fn is_available(&self, id: &str) -> bool {
        self.installed.contains_key(id)
    }

    fn resolve(&self, id: &str) -> Option<Value> {
        if !self.is_available(id) {
            return None;
        }
        match &self.lookup {
            Some(lookup) => lookup(id),
            None => self.installed.get(id).map(|entry| entry.clone()),
        }
    }
}

/// Capabilities offered by the host environment
#[derive(Clone, Default)]
pub struct Environment {
    /// Chunk registry, present when the bundle is code-split
    pub chunks: Option<Arc<ChunkRegistry>>,
    /// Static modules bundled into the main artifact
    pub statics: Arc<StaticRegistry>,
}

impl Environment {
    /// Environment with only statically bundled modules
    pub fn bundled(statics: Arc<StaticRegistry>) -> Self {
        Self {
            chunks: None,
            statics,
        }
    }

    /// Environment with a chunk registry
    pub fn chunked(chunks: Arc<ChunkRegistry>) -> Self {
        Self {
            chunks: Some(chunks),
            statics: Arc::new(StaticRegistry::new()),
        }
    }
}

/// Synchronous module registry handle shared by universal loaders
#[derive(Clone)]
pub struct ModuleRegistry {
    resolver: Arc<dyn SyncResolver>,
}

impl ModuleRegistry {
    /// Registry backed by a specific resolver
    pub fn new(resolver: Arc<dyn SyncResolver>) -> Self {
        Self { resolver }
    }

    /// Pick a resolver by probing for the chunk lookup capability
    pub fn detect(env: &Environment) -> Self {
        let resolver: Arc<dyn SyncResolver> = match &env.chunks {
            Some(chunks) => chunks.clone(),
            None => env.statics.clone(),
        };
        tracing::debug!(convention = ?resolver.convention(), "module registry selected");
        Self { resolver }
    }

    /// Convention of the underlying resolver
    pub fn convention(&self) -> Convention {
        self.resolver.convention()
    }

    /// Resolve without failing: absence is an expected result.
    pub fn try_resolve_sync(&self, source: &ModuleSource) -> Option<Value> {
        self.try_resolve_id(&source.identifier())
    }

    /// [`try_resolve_sync`](Self::try_resolve_sync) for an already evaluated identifier
    pub fn try_resolve_id(&self, id: &str) -> Option<Value> {
        let module = self.resolver.resolve(id);
        tracing::trace!(module = %id, found = module.is_some(), "sync resolve");
        module
    }

    /// Load a module whose presence the caller guarantees.
    pub fn require_by_identifier(&self, id: &str) -> Result<Value> {
        self.resolver
            .resolve(id)
            .ok_or_else(|| UniversalError::module_not_found(id))
    }
}

impl fmt::Debug for ModuleRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModuleRegistry")
            .field("convention", &self.convention())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::ModuleObject;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_detect_static() {
        let statics = Arc::new(StaticRegistry::new());
        statics.register("/es6", ModuleObject::es_module().with("default", "es6"));

        let registry = ModuleRegistry::detect(&Environment::bundled(statics));
        assert_eq!(registry.convention(), Convention::Static);
        assert!(registry.try_resolve_sync(&"/es6".into()).is_some());
        assert!(registry.try_resolve_sync(&"/missing".into()).is_none());
    }

    #[test]
    fn test_detect_chunked() {
        let chunks = Arc::new(ChunkRegistry::new());
        let registry = ModuleRegistry::detect(&Environment::chunked(chunks.clone()));
        assert_eq!(registry.convention(), Convention::Chunked);

        assert!(registry.try_resolve_sync(&"42".into()).is_none());
        chunks.install("42", "loaded");
        assert_eq!(registry.try_resolve_sync(&"42".into()), Some(Value::from("loaded")));
    }

    #[test]
    fn test_chunk_lookup_requires_installation() {
        let chunks = Arc::new(ChunkRegistry::with_lookup(|id| Some(Value::from(format!("req:{}", id)))));
        assert!(chunks.resolve("7").is_none());

        chunks.install("7", Value::Null);
        assert_eq!(chunks.resolve("7"), Some(Value::from("req:7")));
    }

    #[test]
    fn test_deferred_identifier() {
        let statics = Arc::new(StaticRegistry::new());
        statics.register("./Foo", "foo");
        let registry = ModuleRegistry::detect(&Environment::bundled(statics));

        let source = ModuleSource::deferred(|| "./Foo".to_string());
        assert_eq!(registry.try_resolve_sync(&source), Some(Value::from("foo")));
    }

    #[test]
    fn test_lazy_module_evaluated_once() {
        let calls = Arc::new(AtomicUsize::new(0));
        let statics = StaticRegistry::new();
        let counter = calls.clone();
        statics.register_lazy("./Lazy", move || {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(Value::from("lazy"))
        });

        assert_eq!(statics.resolve("./Lazy"), Some(Value::from("lazy")));
        assert_eq!(statics.resolve("./Lazy"), Some(Value::from("lazy")));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_lazy_module_evaluated_once_across_threads() {
        let calls = Arc::new(AtomicUsize::new(0));
        let statics = Arc::new(StaticRegistry::new());
        let counter = calls.clone();
        statics.register_lazy("./Lazy", move || {
            counter.fetch_add(1, Ordering::SeqCst);
            std::thread::sleep(std::time::Duration::from_millis(50));
            Ok(Value::from("lazy"))
        });

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let statics = statics.clone();
                std::thread::spawn(move || statics.resolve("./Lazy"))
            })
            .collect();

        for handle in handles {
            assert_eq!(handle.join().unwrap(), Some(Value::from("lazy")));
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_register_during_lazy_evaluation_is_kept() {
        let statics = Arc::new(StaticRegistry::new());
        let (started_tx, started_rx) = std::sync::mpsc::channel();
        let (release_tx, release_rx) = std::sync::mpsc::channel::<()>();
        let release_rx = parking_lot::Mutex::new(release_rx);
        statics.register_lazy("./Page", move || {
            let _ = started_tx.send(());
            let _ = release_rx.lock().recv();
            Ok(Value::from("stale"))
        });

        let worker = {
            let statics = statics.clone();
            std::thread::spawn(move || statics.resolve("./Page"))
        };
        started_rx.recv().unwrap();
        statics.register("./Page", "fresh");
        release_tx.send(()).unwrap();

        assert_eq!(worker.join().unwrap(), Some(Value::from("stale")));
        assert_eq!(statics.resolve("./Page"), Some(Value::from("fresh")));
    }

    #[test]
    fn test_failing_module_is_absent() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let statics = StaticRegistry::new();
        statics.register_lazy("./Broken", move || {
            counter.fetch_add(1, Ordering::SeqCst);
            Err(anyhow::anyhow!("boom"))
        });
        assert!(statics.resolve("./Broken").is_none());
        assert!(statics.resolve("./Broken").is_none());
        assert!(statics.is_available("./Broken"));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_require_by_identifier() {
        let statics = Arc::new(StaticRegistry::new());
        statics.register("./Foo", "foo");
        let registry = ModuleRegistry::detect(&Environment::bundled(statics));

        assert_eq!(registry.require_by_identifier("./Foo").unwrap(), Value::from("foo"));
        let err = registry.require_by_identifier("./Nope").unwrap_err();
        assert!(matches!(err, UniversalError::ModuleNotFound(ref id) if id == "./Nope"));
        assert_eq!(err.to_string(), "Cannot find module './Nope'");
    }
}
