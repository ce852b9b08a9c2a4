// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Asynchronous import sources.
//!
//! Three calling conventions are accepted and normalized into one future:
//!
//! - a promise: an already started load, awaitable any number of times
//! - a factory: `args -> future`
//! - a callback loader: `(callback, args)`, where the loader eventually
//!   reports its outcome through the callback

use crate::error::{Result, UniversalError};
use crate::value::Value;
use futures::future::{BoxFuture, FutureExt, Shared};
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::oneshot;

/// Factory producing a fresh load future per call
pub type LoaderFactory = Arc<dyn Fn(&[Value]) -> BoxFuture<'static, Result<Value>> + Send + Sync>;

/// Loader reporting through a [`LoaderCallback`]
pub type CallbackLoader = Arc<dyn Fn(LoaderCallback, &[Value]) + Send + Sync>;

/// One-shot completion handle given to callback-style loaders
pub struct LoaderCallback {
    tx: oneshot::Sender<Result<Value>>,
}

impl LoaderCallback {
    /// Report the outcome of the load
    pub fn call(self, result: Result<Value>) {
        // The receiver is gone when the caller timed out; nothing to do then
        let _ = self.tx.send(result);
    }

    /// Report a loaded module
    pub fn resolve(self, module: impl Into<Value>) {
        self.call(Ok(module.into()));
    }

    /// Report a failure
    pub fn reject(self, err: impl Into<UniversalError>) {
        self.call(Err(err.into()));
    }
}

impl fmt::Debug for LoaderCallback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoaderCallback")
            .field("closed", &self.tx.is_closed())
            .finish()
    }
}

/// The asynchronous import source of a universal loader
#[derive(Clone)]
pub enum LoaderDescriptor {
    /// A load already in flight, shared by every caller
    Promise(Shared<BoxFuture<'static, Result<Value>>>),
    /// A function starting a new load per call
    Factory(LoaderFactory),
    /// A callback-style loader
    Callback(CallbackLoader),
}

impl LoaderDescriptor {
    /// Wrap an in-flight load
    pub fn promise<F>(future: F) -> Self
    where
        F: Future<Output = Result<Value>> + Send + 'static,
    {
        LoaderDescriptor::Promise(future.boxed().shared())
    }

    /// Wrap a future-returning function
    pub fn factory<F, Fut>(f: F) -> Self
    where
        F: Fn(&[Value]) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Value>> + Send + 'static,
    {
        LoaderDescriptor::Factory(Arc::new(move |args: &[Value]| f(args).boxed()))
    }

    /// Wrap a callback-style loader
    pub fn callback<F>(f: F) -> Self
    where
        F: Fn(LoaderCallback, &[Value]) + Send + Sync + 'static,
    {
        LoaderDescriptor::Callback(Arc::new(f))
    }

    /// Start (or join) a load with `args`
    pub(crate) fn invoke(&self, args: &[Value]) -> BoxFuture<'static, Result<Value>> {
        match self {
            LoaderDescriptor::Promise(shared) => shared.clone().boxed(),
            LoaderDescriptor::Factory(factory) => factory(args),
            LoaderDescriptor::Callback(loader) => {
                let (tx, rx) = oneshot::channel();
                loader(LoaderCallback { tx }, args);
                async move {
                    match rx.await {
                        Ok(result) => result,
                        Err(_) => Err(UniversalError::CallbackDropped),
                    }
                }
                .boxed()
            }
        }
    }
}

impl fmt::Debug for LoaderDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoaderDescriptor::Promise(_) => write!(f, "Promise(..)"),
            LoaderDescriptor::Factory(_) => write!(f, "Factory(..)"),
            LoaderDescriptor::Callback(_) => write!(f, "Callback(..)"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test]
    async fn test_promise_can_be_awaited_twice() {
        let descriptor = LoaderDescriptor::promise(async { Ok(Value::from("mod")) });
        assert_eq!(descriptor.invoke(&[]).await.unwrap(), Value::from("mod"));
        assert_eq!(descriptor.invoke(&[]).await.unwrap(), Value::from("mod"));
    }

    #[tokio::test]
    async fn test_factory_receives_args() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let descriptor = LoaderDescriptor::factory(move |args| {
            counter.fetch_add(1, Ordering::SeqCst);
            let first = args.first().cloned().unwrap_or(Value::Undefined);
            async move { Ok(first) }
        });

        assert_eq!(descriptor.invoke(&[Value::from(1)]).await.unwrap(), Value::from(1));
        assert_eq!(descriptor.invoke(&[Value::from(2)]).await.unwrap(), Value::from(2));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_callback_success_and_error() {
        let ok = LoaderDescriptor::callback(|cb, _| cb.resolve("done"));
        assert_eq!(ok.invoke(&[]).await.unwrap(), Value::from("done"));

        let failing = LoaderDescriptor::callback(|cb, _| cb.reject(anyhow::anyhow!("ah")));
        assert_eq!(failing.invoke(&[]).await.unwrap_err().to_string(), "ah");
    }

    #[tokio::test]
    async fn test_dropped_callback() {
        let descriptor = LoaderDescriptor::callback(|cb, _| drop(cb));
        let err = descriptor.invoke(&[]).await.unwrap_err();
        assert!(matches!(err, UniversalError::CallbackDropped));
    }
}
