// File: src/events.rs
// Purpose: Publish/subscribe hub with fire-and-forget and sequential-await dispatch

use crate::error::{FormError, Result};
use futures::future::BoxFuture;
use futures::FutureExt;
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

/// What a handler hands back to the dispatcher: either it already finished,
/// or it needs to be awaited.
pub enum Outcome<'a> {
    Ready(Result<()>),
    Deferred(BoxFuture<'a, Result<()>>),
}

impl<'a> Outcome<'a> {
    /// Completed successfully
    pub fn done() -> Self {
        Outcome::Ready(Ok(()))
    }

    /// Completed with a failure
    pub fn fail(err: impl Into<FormError>) -> Self {
        Outcome::Ready(Err(err.into()))
    }

    /// Needs to be awaited
    pub fn deferred<F>(future: F) -> Self
    where
        F: Future<Output = Result<()>> + Send + 'a,
    {
        Outcome::Deferred(future.boxed())
    }

    async fn settle(self) -> Result<()> {
        match self {
            Outcome::Ready(result) => result,
            Outcome::Deferred(future) => future.await,
        }
    }
}

impl From<Result<()>> for Outcome<'_> {
    fn from(result: Result<()>) -> Self {
        Outcome::Ready(result)
    }
}

type HandlerFn<T, A> = dyn for<'a> Fn(&'a mut T, &'a mut A) -> Outcome<'a> + Send + Sync;

/// Registered handlers, keyed by event name.
///
/// `T` is the dispatch target handlers receive mutably (the form model),
/// `A` the per-dispatch argument bag. Handlers for one event run in
/// registration order under both dispatch modes.
pub struct EventHub<T, A> {
    handlers: HashMap<String, Vec<Arc<HandlerFn<T, A>>>>,
}

impl<T, A> Default for EventHub<T, A> {
    fn default() -> Self {
        Self {
            handlers: HashMap::new(),
        }
    }
}

impl<T, A> Clone for EventHub<T, A> {
    fn clone(&self) -> Self {
        Self {
            handlers: self.handlers.clone(),
        }
    }
}

impl<T, A> std::fmt::Debug for EventHub<T, A> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let counts: HashMap<&str, usize> = self
            .handlers
            .iter()
            .map(|(k, v)| (k.as_str(), v.len()))
            .collect();
        f.debug_struct("EventHub").field("handlers", &counts).finish()
    }
}

impl<T, A> EventHub<T, A> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a handler to the end of the list for `event`
    pub fn on<F>(&mut self, event: impl Into<String>, handler: F) -> &mut Self
    where
        F: for<'a> Fn(&'a mut T, &'a mut A) -> Outcome<'a> + Send + Sync + 'static,
    {
        self.handlers
            .entry(event.into())
            .or_default()
            .push(Arc::new(handler));
        self
    }

    /// Remove every handler for `event`
    pub fn off(&mut self, event: &str) -> &mut Self {
        self.handlers.remove(event);
        self
    }

    pub fn listener_count(&self, event: &str) -> usize {
        self.handlers.get(event).map_or(0, Vec::len)
    }

    /// Snapshot of the handlers for `event`.
    ///
    /// Dispatch runs against the snapshot, so the target can be borrowed
    /// mutably while the hub itself lives inside it.
    pub fn listeners(&self, event: &str) -> Listeners<T, A> {
        Listeners {
            event: event.to_string(),
            handlers: self.handlers.get(event).cloned().unwrap_or_default(),
        }
    }
}

/// Handlers captured for one dispatch
pub struct Listeners<T, A> {
    event: String,
    handlers: Vec<Arc<HandlerFn<T, A>>>,
}

impl<T, A> Listeners<T, A> {
    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    /// Fire-and-forget dispatch.
    ///
    /// Handler failures are logged, never returned. A deferred outcome is
    /// polled once; if it cannot finish without suspending it is dropped.
    pub fn trigger(&self, target: &mut T, args: &mut A) {
        for handler in &self.handlers {
            match handler(target, args) {
                Outcome::Ready(Ok(())) => {}
                Outcome::Ready(Err(err)) => {
                    tracing::warn!(event = %self.event, error = %err, "event handler failed");
                }
                Outcome::Deferred(future) => match future.now_or_never() {
                    Some(Ok(())) => {}
                    Some(Err(err)) => {
                        tracing::warn!(event = %self.event, error = %err, "event handler failed");
                    }
                    None => {
                        tracing::warn!(
                            event = %self.event,
                            "deferred event handler dropped by synchronous dispatch"
                        );
                    }
                },
            }
        }
    }

    /// Sequential-await dispatch.
    ///
    /// Each handler settles before the next one starts. The first failure
    /// aborts the dispatch and skips the remaining handlers.
    pub async fn trigger_sequential(&self, target: &mut T, args: &mut A) -> Result<()> {
        for (index, handler) in self.handlers.iter().enumerate() {
            if let Err(err) = handler(target, args).settle().await {
                tracing::debug!(event = %self.event, index, error = %err, "sequential dispatch aborted");
                return Err(err);
            }
        }
        Ok(())
    }
}
