// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Export selection from a loaded module

use crate::value::Value;
use std::fmt;
use std::sync::Arc;

/// Selector function applied to a whole module
pub type ExportSelector = Arc<dyn Fn(&Value) -> Value + Send + Sync>;

/// Which value to pull out of a loaded module
#[derive(Clone, Default)]
pub enum ExportKey {
    /// No key given: `default` for ESM wrappers, else the module itself
    #[default]
    Default,
    /// Explicit null: the module object unchanged
    Whole,
    /// A named export
    Named(String),
    /// A selector run against the module
    Select(ExportSelector),
}

impl ExportKey {
    /// Key selecting a named export
    pub fn named(name: impl Into<String>) -> Self {
        ExportKey::Named(name.into())
    }

    /// Key running `f` against the module
    pub fn select<F>(f: F) -> Self
    where
        F: Fn(&Value) -> Value + Send + Sync + 'static,
    {
        ExportKey::Select(Arc::new(f))
    }
}

impl fmt::Debug for ExportKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExportKey::Default => write!(f, "Default"),
            ExportKey::Whole => write!(f, "Whole"),
            ExportKey::Named(name) => f.debug_tuple("Named").field(name).finish(),
            ExportKey::Select(_) => write!(f, "Select(..)"),
        }
    }
}

impl From<&str> for ExportKey {
    fn from(name: &str) -> Self {
        ExportKey::Named(name.to_string())
    }
}

impl From<String> for ExportKey {
    fn from(name: String) -> Self {
        ExportKey::Named(name)
    }
}

/// Extract the value selected by `key` from `module`.
///
/// Never fails. `Undefined` means the key selected nothing.
pub fn resolve_export(module: &Value, key: &ExportKey) -> Value {
    match key {
        ExportKey::Whole => module.clone(),
        ExportKey::Named(name) => module.get(name),
        ExportKey::Select(select) => select(module),
        ExportKey::Default => {
            if module.is_es_module() {
                module.get("default")
            } else {
                module.clone()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::ModuleObject;

    fn esm() -> Value {
        ModuleObject::es_module()
            .with("default", "Default")
            .with("foo", "Foo")
            .into()
    }

    #[test]
    fn test_whole_module() {
        let module = esm();
        assert_eq!(resolve_export(&module, &ExportKey::Whole), module);
    }

    #[test]
    fn test_named_export() {
        assert_eq!(resolve_export(&esm(), &"foo".into()), Value::from("Foo"));
        assert!(resolve_export(&esm(), &"bar".into()).is_undefined());
        assert!(resolve_export(&Value::from(3), &"foo".into()).is_undefined());
    }

    #[test]
    fn test_selector() {
        let key = ExportKey::select(|m| m.get("foo"));
        assert_eq!(resolve_export(&esm(), &key), Value::from("Foo"));
    }

    #[test]
    fn test_default_unwraps_es_module_only() {
        assert_eq!(resolve_export(&esm(), &ExportKey::Default), Value::from("Default"));

        let cjs: Value = ModuleObject::new().with("default", "Default").into();
        assert_eq!(resolve_export(&cjs, &ExportKey::Default), cjs);

        let es_without_default: Value = ModuleObject::es_module().with("foo", 1).into();
        assert!(resolve_export(&es_without_default, &ExportKey::Default).is_undefined());
    }
}
