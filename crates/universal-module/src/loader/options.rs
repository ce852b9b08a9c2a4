// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Per-loader resolution options

use crate::config::LoaderConfig;
use crate::error::UniversalError;
use crate::export::ExportKey;
use crate::registry::ModuleSource;
use crate::value::Value;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// How a module reached `on_load`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadInfo {
    /// True when the module came from the synchronous registry
    pub is_sync: bool,
}

/// Called with the raw module whenever one is freshly loaded
pub type OnLoad = Arc<dyn Fn(&Value, LoadInfo) + Send + Sync>;

/// Called with the error whenever an asynchronous load fails
pub type OnError = Arc<dyn Fn(&UniversalError) + Send + Sync>;

/// Options for one [`UniversalLoader`](super::UniversalLoader)
#[derive(Clone)]
pub struct ResolutionOptions {
    /// Static module path (static convention)
    pub path: Option<ModuleSource>,
    /// Bundler module id (chunked convention)
    pub resolve: Option<ModuleSource>,
    /// Export selector
    pub key: ExportKey,
    /// Chunk label reported to the usage tracker
    pub chunk_name: Option<String>,
    /// Asynchronous load budget
    pub timeout: Option<Duration>,
    /// Try the synchronous path when the loader is built
    pub initial_require: bool,
    /// Re-run the loader even when a value is cached
    pub always_update: bool,
    /// Fresh-load notification
    pub on_load: Option<OnLoad>,
    /// Async failure notification
    pub on_error: Option<OnError>,
}

impl Default for ResolutionOptions {
    fn default() -> Self {
        Self::from_config(&LoaderConfig::default())
    }
}

impl ResolutionOptions {
    /// Options seeded from configured defaults
    pub fn from_config(config: &LoaderConfig) -> Self {
        Self {
            path: None,
            resolve: None,
            key: ExportKey::Default,
            chunk_name: None,
            timeout: config.timeout(),
            initial_require: config.initial_require,
            always_update: config.always_update,
            on_load: None,
            on_error: None,
        }
    }

    /// Set the static module path
    pub fn path(mut self, path: impl Into<ModuleSource>) -> Self {
        self.path = Some(path.into());
        self
    }

    /// Set the bundler module id
    pub fn resolve(mut self, resolve: impl Into<ModuleSource>) -> Self {
        self.resolve = Some(resolve.into());
        self
    }

    /// Set the export selector
    pub fn key(mut self, key: impl Into<ExportKey>) -> Self {
        self.key = key.into();
        self
    }

    /// Set the chunk name
    pub fn chunk_name(mut self, name: impl Into<String>) -> Self {
        self.chunk_name = Some(name.into());
        self
    }

    /// Set the async timeout
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Disable the async timeout
    pub fn no_timeout(mut self) -> Self {
        self.timeout = None;
        self
    }

    /// Set whether to resolve synchronously on construction
    pub fn initial_require(mut self, enabled: bool) -> Self {
        self.initial_require = enabled;
        self
    }

    /// Set whether async calls bypass the cache
    pub fn always_update(mut self, enabled: bool) -> Self {
        self.always_update = enabled;
        self
    }

    /// Set the load callback
    pub fn on_load<F>(mut self, f: F) -> Self
    where
        F: Fn(&Value, LoadInfo) + Send + Sync + 'static,
    {
        self.on_load = Some(Arc::new(f));
        self
    }

    /// Set the error callback
    pub fn on_error<F>(mut self, f: F) -> Self
    where
        F: Fn(&UniversalError) + Send + Sync + 'static,
    {
        self.on_error = Some(Arc::new(f));
        self
    }
}

impl fmt::Debug for ResolutionOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResolutionOptions")
            .field("path", &self.path)
            .field("resolve", &self.resolve)
            .field("key", &self.key)
            .field("chunk_name", &self.chunk_name)
            .field("timeout", &self.timeout)
            .field("initial_require", &self.initial_require)
            .field("always_update", &self.always_update)
            .field("on_load", &self.on_load.is_some())
            .field("on_error", &self.on_error.is_some())
            .finish()
    }
}
