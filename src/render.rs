// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Simulated server render driven by a JSON manifest.
//!
//! Each render entry gets its own [`UniversalLoader`]. Modules that are not
//! evaluated yet are fetched through an async loader that waits for the
//! manifest's latency and then installs the chunk, the way a code-split
//! client would.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use universal_module::{
    ChunkRegistry, Environment, ExportKey, LoaderConfig, LoaderDescriptor, ModuleRegistry,
    ResolutionOptions, StaticRegistry, UniversalError, UniversalLoader, UsageTracker, Value,
    json_to_value, value_to_json,
};

/// Bundling convention named in the manifest
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ManifestConvention {
    /// Everything bundled, modules keyed by path
    #[default]
    Static,
    /// Code-split, modules keyed by bundler id
    Chunked,
}

/// One module described by the manifest
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManifestModule {
    /// Static path
    pub path: String,
    /// Bundler id (defaults to the path)
    pub id: Option<String>,
    /// Chunk carrying the module
    pub chunk_name: Option<String>,
    /// Module exports
    pub exports: serde_json::Value,
    /// Whether the chunk is evaluated before rendering starts
    #[serde(default)]
    pub evaluated: bool,
    /// Simulated async fetch latency
    #[serde(default)]
    pub latency_ms: u64,
    /// Export to select; absent means the default export
    #[serde(default, deserialize_with = "deserialize_key")]
    pub key: Option<Option<String>>,
    /// Make the async fetch fail with this message
    pub fail: Option<String>,
}

impl ManifestModule {
    fn bundler_id(&self) -> &str {
        self.id.as_deref().unwrap_or(&self.path)
    }

    fn export_key(&self) -> ExportKey {
        match &self.key {
            None => ExportKey::Default,
            Some(None) => ExportKey::Whole,
            Some(Some(name)) => ExportKey::named(name.clone()),
        }
    }
}

// Distinguishes an absent `key` from an explicit `"key": null`
fn deserialize_key<'de, D>(deserializer: D) -> Result<Option<Option<String>>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Option::<String>::deserialize(deserializer).map(Some)
}

/// Render manifest
#[derive(Debug, Clone, Deserialize)]
pub struct Manifest {
    /// Bundling convention
    #[serde(default)]
    pub convention: ManifestConvention,
    /// Available modules
    pub modules: Vec<ManifestModule>,
    /// Paths rendered, in order
    pub render: Vec<String>,
}

impl Manifest {
    /// Read a manifest file
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    fn module(&self, path: &str) -> Option<&ManifestModule> {
        self.modules.iter().find(|m| m.path == path)
    }
}

/// What a render produced
#[derive(Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderReport {
    /// Module ids used by the render, in order
    pub module_ids: Vec<String>,
    /// Chunk names used by the render, in order
    pub chunk_names: Vec<String>,
    /// Resolved export per rendered path
    pub resolved: BTreeMap<String, serde_json::Value>,
    /// Failure per rendered path
    pub errors: BTreeMap<String, String>,
}

/// Render every entry of the manifest and flush the usage tracker
pub async fn render(manifest: &Manifest, config: &LoaderConfig) -> anyhow::Result<RenderReport> {
    let (registry, chunks) = build_registry(manifest);
    let tracker = UsageTracker::new();
    let mut report = RenderReport::default();

    for path in &manifest.render {
        let Some(module) = manifest.module(path) else {
            report
                .errors
                .insert(path.clone(), format!("Cannot find module '{}'", path));
            continue;
        };

        let mut options = ResolutionOptions::from_config(config)
            .path(module.path.as_str())
            .resolve(module.bundler_id())
            .key(module.export_key());
        if let Some(chunk_name) = &module.chunk_name {
            options = options.chunk_name(chunk_name.as_str());
        }

        let loader = UniversalLoader::new(
            Some(chunk_loader(module, chunks.clone())),
            options,
            registry.clone(),
            tracker.clone(),
        );

        let outcome = match loader.require_sync() {
            Some(value) => Ok(value),
            None => loader.require_async(&[]).await,
        };

        match outcome {
            Ok(value) => {
                loader.add_module();
                report.resolved.insert(path.clone(), value_to_json(&value));
            }
            Err(err) => {
                tracing::warn!(module = %path, error = %err, "render entry failed");
                report.errors.insert(path.clone(), err.to_string());
            }
        }
    }

    report.module_ids = tracker.flush_module_ids();
    report.chunk_names = tracker.flush_chunk_names();
    Ok(report)
}

fn build_registry(manifest: &Manifest) -> (ModuleRegistry, Option<Arc<ChunkRegistry>>) {
    match manifest.convention {
        ManifestConvention::Static => {
            let statics = Arc::new(StaticRegistry::new());
            for module in &manifest.modules {
                let exports = module.exports.clone();
                statics.register_lazy(module.path.clone(), move || Ok(json_to_value(&exports)));
            }
            (ModuleRegistry::detect(&Environment::bundled(statics)), None)
        }
        ManifestConvention::Chunked => {
            let chunks = Arc::new(ChunkRegistry::new());
            for module in manifest.modules.iter().filter(|m| m.evaluated) {
                chunks.install(module.bundler_id(), json_to_value(&module.exports));
            }
            (
                ModuleRegistry::detect(&Environment::chunked(chunks.clone())),
                Some(chunks),
            )
        }
    }
}

fn chunk_loader(module: &ManifestModule, chunks: Option<Arc<ChunkRegistry>>) -> LoaderDescriptor {
    let id = module.bundler_id().to_string();
    let exports = module.exports.clone();
    let latency = Duration::from_millis(module.latency_ms);
    let fail = module.fail.clone();

    LoaderDescriptor::factory(move |_| {
        let id = id.clone();
        let exports = exports.clone();
        let fail = fail.clone();
        let chunks = chunks.clone();
        async move {
            tokio::time::sleep(latency).await;
            if let Some(message) = fail {
                return Err(UniversalError::loader(anyhow::anyhow!(message)));
            }
            let value: Value = json_to_value(&exports);
            if let Some(chunks) = chunks {
                chunks.install(id, value.clone());
            }
            Ok(value)
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn manifest(json: serde_json::Value) -> Manifest {
        serde_json::from_value(json).unwrap()
    }

    #[tokio::test]
    async fn test_static_render_is_fully_sync() {
        let manifest = manifest(serde_json::json!({
            "convention": "static",
            "modules": [
                { "path": "./Home", "chunkName": "home", "exports": { "__esModule": true, "default": "Home" } },
                { "path": "./About", "chunkName": "about", "exports": "About" }
            ],
            "render": ["./Home", "./About", "./Home"]
        }));

        let report = render(&manifest, &LoaderConfig::default()).await.unwrap();
        assert_eq!(report.module_ids, vec!["./Home", "./About"]);
        assert_eq!(report.chunk_names, vec!["home", "about"]);
        assert_eq!(report.resolved["./Home"], serde_json::json!("Home"));
        assert!(report.errors.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_chunked_render_loads_missing_chunks() {
        let manifest = manifest(serde_json::json!({
            "convention": "chunked",
            "modules": [
                { "path": "./Home", "id": "1", "chunkName": "home", "evaluated": true, "exports": { "view": "Home" }, "key": "view" },
                { "path": "./Feed", "id": "2", "chunkName": "feed", "latencyMs": 20, "exports": { "view": "Feed" }, "key": null },
                { "path": "./Slow", "id": "3", "chunkName": "slow", "latencyMs": 5000, "exports": {} },
                { "path": "./Broken", "id": "4", "chunkName": "broken", "fail": "chunk 4 failed", "exports": {} }
            ],
            "render": ["./Home", "./Feed", "./Slow", "./Broken", "./Ghost"]
        }));
        let config = LoaderConfig {
            timeout_ms: 100,
            ..LoaderConfig::default()
        };

        let report = render(&manifest, &config).await.unwrap();
        assert_eq!(report.module_ids, vec!["1", "2"]);
        assert_eq!(report.chunk_names, vec!["home", "feed"]);
        assert_eq!(report.resolved["./Home"], serde_json::json!("Home"));
        assert_eq!(report.resolved["./Feed"], serde_json::json!({ "view": "Feed" }));
        assert_eq!(report.errors["./Slow"], "timeout exceeded");
        assert_eq!(report.errors["./Broken"], "chunk 4 failed");
        assert_eq!(report.errors["./Ghost"], "Cannot find module './Ghost'");
    }

    #[test]
    fn test_manifest_from_file() {
        use std::io::Write;

        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"modules": [{{"path": "./A", "exports": 1}}], "render": ["./A"]}}"#
        )
        .unwrap();

        let manifest = Manifest::from_file(file.path()).unwrap();
        assert_eq!(manifest.convention, ManifestConvention::Static);
        assert_eq!(manifest.modules[0].key, None);
        assert!(matches!(manifest.modules[0].export_key(), ExportKey::Default));
    }
}
