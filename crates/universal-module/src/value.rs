// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Module values.
//!
//! A loaded module is an object of named exports. Exports themselves can be
//! primitives, nested objects, or opaque host values (a component, a
//! function table) carried as [`Value::Native`].

use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Property marking a module object as a default-export wrapper
pub const ES_MODULE_FLAG: &str = "__esModule";

static ES_MODULE_MARK: Value = Value::Boolean(true);

// 2^53 - 1: largest integer an f64 holds exactly
const MAX_SAFE_INTEGER: f64 = 9_007_199_254_740_991.0;

/// A module value.
///
/// Values are cheap to clone and can be shared between async tasks.
#[derive(Clone)]
pub enum Value {
    /// undefined
    Undefined,
    /// null
    Null,
    /// Boolean value
    Boolean(bool),
    /// Number (IEEE 754 double)
    Number(f64),
    /// String
    String(String),
    /// Object of named properties (a module namespace or plain object)
    Object(Arc<ModuleObject>),
    /// Ordered list of values
    Array(Arc<Vec<Value>>),
    /// Opaque host value
    Native(Arc<dyn Any + Send + Sync>),
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Undefined, Value::Undefined) => true,
            (Value::Null, Value::Null) => true,
            (Value::Boolean(a), Value::Boolean(b)) => a == b,
            (Value::Number(a), Value::Number(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Object(a), Value::Object(b)) => Arc::ptr_eq(a, b),
            (Value::Array(a), Value::Array(b)) => Arc::ptr_eq(a, b),
            (Value::Native(a), Value::Native(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl Value {
    /// Returns true if this value is undefined.
    pub fn is_undefined(&self) -> bool {
        matches!(self, Value::Undefined)
    }

    /// Returns true if this value is null or undefined.
    pub fn is_nullish(&self) -> bool {
        matches!(self, Value::Undefined | Value::Null)
    }

    /// Wrap an arbitrary host value.
    pub fn native<T: Any + Send + Sync>(value: T) -> Self {
        Value::Native(Arc::new(value))
    }

    /// Borrow the host value if it is a `T`.
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        match self {
            Value::Native(inner) => inner.downcast_ref::<T>(),
            _ => None,
        }
    }

    /// The object behind this value, if any.
    pub fn as_object(&self) -> Option<&ModuleObject> {
        match self {
            Value::Object(obj) => Some(obj),
            _ => None,
        }
    }

    /// Elements, if this is an array.
    pub fn as_array(&self) -> Option<&[Value]> {
        match self {
            Value::Array(items) => Some(items),
            _ => None,
        }
    }

    /// String contents, if this is a string.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// Property lookup. Arrays answer `length` and indices; anything else
    /// that is not an object, and missing keys, yield `Undefined`.
    pub fn get(&self, key: &str) -> Value {
        match self {
            Value::Object(obj) => obj.get(key).cloned().unwrap_or(Value::Undefined),
            Value::Array(items) if key == "length" => Value::Number(items.len() as f64),
            Value::Array(items) => key
                .parse::<usize>()
                .ok()
                .and_then(|i| items.get(i))
                .cloned()
                .unwrap_or(Value::Undefined),
            _ => Value::Undefined,
        }
    }

    /// Whether this value is a module object flagged as a default-export wrapper.
    pub fn is_es_module(&self) -> bool {
        self.as_object().is_some_and(ModuleObject::is_es_module)
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Undefined => write!(f, "Undefined"),
            Value::Null => write!(f, "Null"),
            Value::Boolean(b) => write!(f, "Boolean({})", b),
            Value::Number(n) => write!(f, "Number({})", n),
            Value::String(s) => write!(f, "String({:?})", s),
            Value::Object(obj) => f.debug_tuple("Object").field(obj).finish(),
            Value::Array(items) => f.debug_tuple("Array").field(items).finish(),
            Value::Native(_) => write!(f, "Native(..)"),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Undefined => write!(f, "undefined"),
            Value::Null => write!(f, "null"),
            Value::Boolean(b) => write!(f, "{}", b),
            Value::Number(n) => write!(f, "{}", n),
            Value::String(s) => write!(f, "{}", s),
            Value::Object(_) => write!(f, "[object Module]"),
            Value::Array(items) => {
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ",")?;
                    }
                    write!(f, "{}", item)?;
                }
                Ok(())
            }
            Value::Native(_) => write!(f, "[native]"),
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Boolean(b)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Number(n as f64)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::Array(Arc::new(items))
    }
}

impl From<ModuleObject> for Value {
    fn from(obj: ModuleObject) -> Self {
        Value::Object(Arc::new(obj))
    }
}

/// A module namespace: named exports plus the default-export marker.
#[derive(Debug, Clone, Default)]
pub struct ModuleObject {
    exports: HashMap<String, Value>,
    es_module: bool,
}

impl ModuleObject {
    /// Create an empty plain (non-ESM) object
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty object flagged as a default-export wrapper
    pub fn es_module() -> Self {
        Self {
            exports: HashMap::new(),
            es_module: true,
        }
    }

    /// Builder-style export setter
    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.set(name, value);
        self
    }

    /// Set an exported value.
    ///
    /// `__esModule: true` becomes the wrapper flag; any other value under
    /// that name is kept as an ordinary export.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        let name = name.into();
        let value = value.into();
        if name == ES_MODULE_FLAG {
            self.es_module = matches!(value, Value::Boolean(true));
            if self.es_module {
                self.exports.remove(ES_MODULE_FLAG);
                return;
            }
        }
        self.exports.insert(name, value);
    }

    /// Get an exported value
    pub fn get(&self, name: &str) -> Option<&Value> {
        if name == ES_MODULE_FLAG && self.es_module {
            return Some(&ES_MODULE_MARK);
        }
        self.exports.get(name)
    }

    /// Whether the module marks itself as a default-export wrapper
    pub fn is_es_module(&self) -> bool {
        self.es_module
    }

    /// Names of all exports
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.exports.keys().map(String::as_str)
    }

    /// Number of exports
    pub fn len(&self) -> usize {
        self.exports.len()
    }

    /// Whether the object has no exports
    pub fn is_empty(&self) -> bool {
        self.exports.is_empty()
    }
}

/// Convert serde_json::Value to a module value.
///
/// Objects carrying `"__esModule": true` become default-export wrappers.
/// Numbers are stored as `f64`, so integers beyond 2^53 lose precision.
pub fn json_to_value(json: &serde_json::Value) -> Value {
    match json {
        serde_json::Value::Null => Value::Null,
        serde_json::Value::Bool(b) => Value::Boolean(*b),
        serde_json::Value::Number(n) => Value::Number(n.as_f64().unwrap_or(0.0)),
        serde_json::Value::String(s) => Value::String(s.clone()),
        serde_json::Value::Array(arr) => arr.iter().map(json_to_value).collect::<Vec<_>>().into(),
        serde_json::Value::Object(map) => {
            let mut obj = ModuleObject::new();
            for (k, v) in map {
                obj.set(k.clone(), json_to_value(v));
            }
            obj.into()
        }
    }
}

/// Convert a module value back to JSON for reporting.
///
/// Integral numbers render as JSON integers. `undefined` renders as `null`
/// and native values, which have no JSON form, as their display string.
pub fn value_to_json(value: &Value) -> serde_json::Value {
    match value {
        Value::Undefined | Value::Null => serde_json::Value::Null,
        Value::Boolean(b) => serde_json::Value::Bool(*b),
        Value::Number(n) if n.fract() == 0.0 && n.abs() <= MAX_SAFE_INTEGER => {
            serde_json::Value::from(*n as i64)
        }
        Value::Number(n) => serde_json::Number::from_f64(*n)
            .map(serde_json::Value::Number)
            .unwrap_or(serde_json::Value::Null),
        Value::String(s) => serde_json::Value::String(s.clone()),
        Value::Object(obj) => {
            let mut map = serde_json::Map::new();
            if obj.is_es_module() {
                map.insert(ES_MODULE_FLAG.to_string(), serde_json::Value::Bool(true));
            }
            for key in obj.keys() {
                if let Some(v) = obj.get(key) {
                    map.insert(key.to_string(), value_to_json(v));
                }
            }
            serde_json::Value::Object(map)
        }
        Value::Array(items) => items.iter().map(value_to_json).collect(),
        Value::Native(_) => serde_json::Value::String(value.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_object_identity_equality() {
        let a: Value = ModuleObject::new().with("x", 1).into();
        let b: Value = ModuleObject::new().with("x", 1).into();
        assert_eq!(a, a.clone());
        assert_ne!(a, b);
    }

    #[test]
    fn test_es_module_flag() {
        let plain: Value = ModuleObject::new().with("default", "x").into();
        let esm: Value = ModuleObject::es_module().with("default", "x").into();
        assert!(!plain.is_es_module());
        assert!(esm.is_es_module());
        assert_eq!(esm.get(ES_MODULE_FLAG), Value::Boolean(true));
    }

    #[test]
    fn test_json_to_value() {
        let json = serde_json::json!({ "__esModule": true, "default": "Foo", "n": 2.5 });
        let value = json_to_value(&json);
        assert!(value.is_es_module());
        assert_eq!(value.get("default"), Value::from("Foo"));
        assert_eq!(value.get("n"), Value::Number(2.5));
        assert!(value.get("missing").is_undefined());
        assert_eq!(value_to_json(&value), json);
    }

    #[test]
    fn test_json_round_trip_keeps_arrays_and_flags() {
        let json = serde_json::json!({
            "routes": ["/", "/about", { "lazy": true }],
            "__esModule": false,
            "count": 3,
        });
        let value = json_to_value(&json);
        assert!(!value.is_es_module());
        assert_eq!(value.get("__esModule"), Value::Boolean(false));

        let routes = value.get("routes");
        assert_eq!(routes.as_array().map(<[Value]>::len), Some(3));
        assert_eq!(routes.get("length"), Value::Number(3.0));
        assert_eq!(routes.get("1"), Value::from("/about"));
        assert!(routes.get("3").is_undefined());

        assert_eq!(value_to_json(&value), json);
    }

    #[test]
    fn test_es_module_flag_toggle() {
        let mut obj = ModuleObject::new();
        obj.set(ES_MODULE_FLAG, false);
        obj.set(ES_MODULE_FLAG, true);
        assert!(obj.is_es_module());
        assert_eq!(obj.len(), 0);

        let json = value_to_json(&obj.into());
        assert_eq!(json, serde_json::json!({ "__esModule": true }));
    }

    #[test]
    fn test_native_downcast() {
        struct Component(&'static str);
        let value = Value::native(Component("Header"));
        assert_eq!(value.downcast_ref::<Component>().map(|c| c.0), Some("Header"));
        assert!(value.downcast_ref::<String>().is_none());
    }
}
