// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Universal loader
//!
//! One [`UniversalLoader`] stands for one module reference site. It answers
//! from the synchronous registry when the module is already evaluated and
//! otherwise runs the asynchronous loader:
//!
//! - `require_sync` - registry lookup, cached after the first hit
//! - `require_async` - cached value, or a (timed) loader run
//! - `add_module` - record the module and its chunk for flushing
//!
//! The cache holds the export-resolved value only. Overlapping async calls
//! are not deduplicated; whichever completes last owns the cache.

mod descriptor;
mod options;

pub use descriptor::{CallbackLoader, LoaderCallback, LoaderDescriptor, LoaderFactory};
pub use options::{LoadInfo, OnError, OnLoad, ResolutionOptions};

use crate::error::{Result, UniversalError};
use crate::export::resolve_export;
use crate::registry::{Convention, ModuleRegistry, ModuleSource};
use crate::usage::UsageTracker;
use crate::value::Value;
use parking_lot::RwLock;
use std::fmt;

/// Sync/async module resolution for one module reference
pub struct UniversalLoader {
    /// Asynchronous import source, absent for sync-only loaders
    loader: Option<LoaderDescriptor>,
    /// Resolution options
    options: ResolutionOptions,
    /// Synchronous registry
    registry: ModuleRegistry,
    /// Request usage sink
    tracker: UsageTracker,
    /// Export-resolved module, once loaded
    module: RwLock<Option<Value>>,
}

impl UniversalLoader {
    /// Create a loader, resolving synchronously right away when
    /// `initial_require` is set.
    pub fn new(
        loader: Option<LoaderDescriptor>,
        options: ResolutionOptions,
        registry: ModuleRegistry,
        tracker: UsageTracker,
    ) -> Self {
        let this = Self {
            loader,
            options,
            registry,
            tracker,
            module: RwLock::new(None),
        };

        if this.options.initial_require {
            this.require_sync();
        }

        this
    }

    /// Resolve from the synchronous registry.
    ///
    /// Returns the cached value when present. `None` means the module is not
    /// evaluated yet; call again once its chunk has been installed.
    pub fn require_sync(&self) -> Option<Value> {
        if let Some(cached) = self.cached() {
            return Some(cached);
        }

        // Deferred identifiers may call into the bundler; evaluate once
        let id = self.sync_source()?.identifier();
        let module = self.registry.try_resolve_id(&id)?;
        let export = resolve_export(&module, &self.options.key);

        // An evaluated module without the requested export is not a hit
        if export.is_undefined() {
            tracing::debug!(key = ?self.options.key, "sync module lacks requested export");
            return None;
        }

        self.notify_load(&module, true);
        *self.module.write() = Some(export.clone());
        tracing::debug!(module = %id, "resolved synchronously");
        Some(export)
    }

    /// Resolve asynchronously.
    ///
    /// Short-circuits to the cached value unless `always_update` is set.
    /// Every failure is reported to `on_error` before it is returned.
    pub async fn require_async(&self, args: &[Value]) -> Result<Value> {
        if !self.options.always_update {
            if let Some(cached) = self.cached() {
                return Ok(cached);
            }
        }

        match self.load_async(args).await {
            Ok(export) => Ok(export),
            Err(err) => {
                tracing::debug!(error = %err, "async load failed");
                if let Some(on_error) = &self.options.on_error {
                    on_error(&err);
                }
                Err(err)
            }
        }
    }

    async fn load_async(&self, args: &[Value]) -> Result<Value> {
        let loader = self.loader.as_ref().ok_or(UniversalError::NoLoader)?;
        let load = loader.invoke(args);

        let module = match self.options.timeout {
            Some(limit) => match tokio::time::timeout(limit, load).await {
                Ok(result) => result?,
                Err(_) => {
                    tracing::warn!(timeout = ?limit, chunk = ?self.options.chunk_name, "module load timed out");
                    return Err(UniversalError::Timeout);
                }
            },
            None => load.await?,
        };

        let export = resolve_export(&module, &self.options.key);
        if export.is_undefined() {
            return Err(UniversalError::ExportNotFound);
        }

        self.notify_load(&module, false);
        *self.module.write() = Some(export.clone());
        tracing::debug!(chunk = ?self.options.chunk_name, "resolved asynchronously");
        Ok(export)
    }

    /// Record this module (and its chunk) as used by the current request
    pub fn add_module(&self) {
        if let Some(chunk_name) = &self.options.chunk_name {
            self.tracker.add_chunk_name(chunk_name);
        }
        if let Some(id) = self.module_id() {
            self.tracker.add_module_id(&id);
        }
    }

    /// The identifier used for synchronous resolution
    pub fn module_id(&self) -> Option<String> {
        self.sync_source().map(ModuleSource::identifier)
    }

    /// The cached export, if any
    pub fn cached(&self) -> Option<Value> {
        self.module.read().clone()
    }

    /// Whether a value is cached
    pub fn is_resolved(&self) -> bool {
        self.module.read().is_some()
    }

    /// Forget the cached value so the next `require_sync` consults the registry
    pub fn clear_cache(&self) {
        *self.module.write() = None;
    }

    /// This loader's options
    pub fn options(&self) -> &ResolutionOptions {
        &self.options
    }

    // `resolve` is a bundler id and only meaningful to the chunk registry,
    // `path` only to the static bundle.
    fn sync_source(&self) -> Option<&ModuleSource> {
        match self.registry.convention() {
            Convention::Chunked => self.options.resolve.as_ref(),
            Convention::Static => self.options.path.as_ref(),
        }
    }

    fn notify_load(&self, module: &Value, is_sync: bool) {
        if let Some(on_load) = &self.options.on_load {
            on_load(module, LoadInfo { is_sync });
        }
    }
}

impl fmt::Debug for UniversalLoader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UniversalLoader")
            .field("loader", &self.loader)
            .field("options", &self.options)
            .field("registry", &self.registry)
            .field("resolved", &self.is_resolved())
            .finish()
    }
}
