// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Module literal macros.

/// Create a module object literal as a [`Value`](crate::Value).
///
/// A leading `esm;` marks the module as a default-export wrapper.
///
/// # Example
///
/// ```
/// use universal_module::{module_object, Value};
///
/// let module = module_object! {
///     esm;
///     "default" => "Header",
///     "version" => 2,
/// };
///
/// assert!(module.is_es_module());
/// assert_eq!(module.get("default"), Value::from("Header"));
/// ```
#[macro_export]
macro_rules! module_object {
    () => {
        $crate::Value::from($crate::ModuleObject::new())
    };
    (esm $(;)?) => {
        $crate::Value::from($crate::ModuleObject::es_module())
    };
    (esm; $($key:literal => $value:expr),+ $(,)?) => {{
        let mut obj = $crate::ModuleObject::es_module();
        $(obj.set($key, $value);)+
        $crate::Value::from(obj)
    }};
    ($($key:literal => $value:expr),+ $(,)?) => {{
        let mut obj = $crate::ModuleObject::new();
        $(obj.set($key, $value);)+
        $crate::Value::from(obj)
    }};
}
