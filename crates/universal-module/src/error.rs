// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Error types for module resolution

use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;

/// Result type for module resolution operations
pub type Result<T> = std::result::Result<T, UniversalError>;

/// Errors surfaced by the registry and the universal loader
///
/// The type is `Clone` so a shared loader future can hand the same
/// outcome to every awaiting caller.
#[derive(Debug, Clone, Error)]
pub enum UniversalError {
    /// Synchronous lookup found nothing where presence was asserted
    #[error("Cannot find module '{0}'")]
    ModuleNotFound(String),

    /// Asynchronous resolution exceeded the configured timeout
    #[error("timeout exceeded")]
    Timeout,

    /// The module loaded but the key selected no value
    #[error("export not found")]
    ExportNotFound,

    /// Error raised by the supplied loader, passed through unchanged
    #[error("{0}")]
    Loader(Arc<anyhow::Error>),

    /// A callback-style loader dropped its callback without calling it
    #[error("loader callback was dropped without being invoked")]
    CallbackDropped,

    /// `require_async` was called on a loader built without a descriptor
    #[error("no asynchronous loader configured")]
    NoLoader,
}

impl UniversalError {
    /// Create a module not found error
    pub fn module_not_found(module: impl Into<String>) -> Self {
        Self::ModuleNotFound(module.into())
    }

    /// Wrap a loader-side error
    pub fn loader(err: impl Into<anyhow::Error>) -> Self {
        Self::Loader(Arc::new(err.into()))
    }

    /// The shared loader error, if this error came from the loader
    pub fn loader_error(&self) -> Option<&Arc<anyhow::Error>> {
        match self {
            Self::Loader(err) => Some(err),
            _ => None,
        }
    }

    /// Whether this is a timeout
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout)
    }
}

impl From<anyhow::Error> for UniversalError {
    fn from(err: anyhow::Error) -> Self {
        Self::Loader(Arc::new(err))
    }
}

/// Errors that can occur while loading [`LoaderConfig`](crate::LoaderConfig)
#[derive(Debug, Error)]
pub enum ConfigError {
    /// File system error
    #[error("File system error: {0}")]
    Fs(#[from] std::io::Error),

    /// TOML parsing error
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    /// JSON parsing error
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    /// Config file with an extension we cannot read
    #[error("Unsupported config format: {0}")]
    UnsupportedFormat(PathBuf),

    /// A key was given a value of the wrong shape
    #[error("Invalid value '{value}' for '{key}'")]
    InvalidValue {
        /// Config key
        key: String,
        /// Offending value
        value: String,
    },
}
