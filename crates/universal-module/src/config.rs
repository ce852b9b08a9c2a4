// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Loader defaults.
//!
//! Defaults come from, in increasing priority: built-in values, a config file
//! (`.toml` or `.json`), and `UNIVERSAL_*` environment variables.

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Default asynchronous load timeout in milliseconds
pub const DEFAULT_TIMEOUT_MS: u64 = 15_000;

/// Prefix of environment variables overriding the config
pub const ENV_PREFIX: &str = "UNIVERSAL_";

/// Defaults applied to every [`ResolutionOptions`](crate::ResolutionOptions)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct LoaderConfig {
    /// Asynchronous load timeout in milliseconds; 0 disables it
    pub timeout_ms: u64,

    /// Attempt synchronous resolution when a loader is built
    pub initial_require: bool,

    /// Re-run the loader on every async call even when cached
    pub always_update: bool,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            timeout_ms: DEFAULT_TIMEOUT_MS,
            initial_require: true,
            always_update: false,
        }
    }
}

impl LoaderConfig {
    /// Load from an optional file, then apply environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_env(std::env::vars())?;
        Ok(config)
    }

    /// Parse a config file. Missing keys keep their defaults.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;

        match path.extension().and_then(|e| e.to_str()) {
            Some("toml") => Ok(toml::from_str(&content)?),
            Some("json") => Ok(serde_json::from_str(&content)?),
            _ => Err(ConfigError::UnsupportedFormat(path.to_path_buf())),
        }
    }

    /// Apply `UNIVERSAL_*` overrides from an environment listing.
    pub fn apply_env<I>(&mut self, vars: I) -> Result<(), ConfigError>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        for (key, value) in vars {
            if let Some(config_key) = key.strip_prefix(ENV_PREFIX) {
                let config_key = config_key.to_lowercase().replace('_', "-");
                self.set(&config_key, &value)?;
            }
        }
        Ok(())
    }

    /// Set a configuration value.
    pub fn set(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        let invalid = || ConfigError::InvalidValue {
            key: key.to_string(),
            value: value.to_string(),
        };

        match key {
            "timeout-ms" | "timeout" => self.timeout_ms = value.parse().map_err(|_| invalid())?,
            "initial-require" => self.initial_require = parse_bool(value).ok_or_else(invalid)?,
            "always-update" => self.always_update = parse_bool(value).ok_or_else(invalid)?,
            _ => tracing::debug!(key, "ignoring unknown config key"),
        }
        Ok(())
    }

    /// Configured timeout, `None` when disabled
    pub fn timeout(&self) -> Option<Duration> {
        (self.timeout_ms > 0).then(|| Duration::from_millis(self.timeout_ms))
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value {
        "true" | "1" => Some(true),
        "false" | "0" => Some(false),
        _ => None,
    }
}
