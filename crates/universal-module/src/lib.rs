// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! # universal-module
//!
//! Resolve one logical module whether it is already evaluated (server side,
//! or client after the bundle ran) or still has to be fetched as a split
//! chunk, and track which modules a server render used so their client
//! assets can be flushed into the response.
//!
//! - [`ModuleRegistry`] - synchronous lookup over a static bundle or a chunk
//!   registry, picked once from the [`Environment`]
//! - [`UniversalLoader`] - `require_sync` / `require_async` / `add_module`
//!   with caching, timeout, export selection and lifecycle callbacks
//! - [`UsageTracker`] - request-scoped module id and chunk name sets
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use universal_module::*;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let chunks = Arc::new(ChunkRegistry::new());
//!     let registry = ModuleRegistry::detect(&Environment::chunked(chunks.clone()));
//!     let tracker = UsageTracker::new();
//!
//!     let loader = UniversalLoader::new(
//!         Some(LoaderDescriptor::factory(|_| fetch_chunk("home"))),
//!         ResolutionOptions::default().resolve("12").chunk_name("home"),
//!         registry,
//!         tracker.clone(),
//!     );
//!
//!     let home = match loader.require_sync() {
//!         Some(module) => module,
//!         None => loader.require_async(&[]).await?,
//!     };
//!     loader.add_module();
//!
//!     println!("{:?}", tracker.flush_chunk_names());
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

#[macro_use]
mod macros;

pub mod config;
pub mod error;
pub mod export;
pub mod loader;
pub mod registry;
pub mod usage;
pub mod value;

// Re-exports
pub use config::LoaderConfig;
pub use error::{ConfigError, Result, UniversalError};
pub use export::{resolve_export, ExportKey, ExportSelector};
pub use loader::{
    LoadInfo, LoaderCallback, LoaderDescriptor, ResolutionOptions, UniversalLoader,
};
pub use registry::{
    ChunkLookup, ChunkRegistry, Convention, Environment, ModuleRegistry, ModuleSource,
    StaticRegistry, SyncResolver,
};
pub use usage::UsageTracker;
pub use value::{json_to_value, value_to_json, ModuleObject, Value};

/// Version of the universal-module crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
