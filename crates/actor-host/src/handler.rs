//! # KeyedHandler Trait
//!
//! The `KeyedHandler` trait is the contract a piece of business logic implements to be
//! hosted by [`ActorHost`](crate::ActorHost). The host guarantees that, for a given key,
//! at most one `handle` call is in flight at a time; calls for different keys run in
//! parallel.
//!
//! # Host Primitives
//! A handler never touches the store or the clock directly. Every invocation receives a
//! [`HostContext`] exposing the primitives the host owns:
//! - [`HostContext::load`] / [`HostContext::store`]: whole-value state read and replace.
//! - [`HostContext::now`]: the logical time of this invocation, captured once at admission
//!   so a handler reading it several times always sees the same instant.

use crate::error::HostError;
use crate::store::StateStore;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::fmt::Debug;
use std::sync::Arc;

/// Business logic hosted behind a per-key single-writer mailbox.
///
/// # Associated Types
/// - `State` is the durable value the host persists per key.
/// - `Request` / `Response` describe one invocation.
/// - `Error` is the handler's own error type. It must absorb [`HostError`] so that store
///   failures raised through the context propagate with `?`.
#[async_trait]
pub trait KeyedHandler: Send + Sync + 'static {
    /// The per-key state persisted by the host.
    type State: Clone + Send + Sync + 'static;

    /// The payload of one invocation.
    type Request: Send + Debug + 'static;

    /// The result of one invocation.
    type Response: Send + 'static;

    /// The handler's error type.
    type Error: std::error::Error + From<HostError> + Send + Sync + 'static;

    /// Handle one request for `ctx.key()`.
    ///
    /// The host never runs two `handle` calls for the same key concurrently, so an
    /// implementation may treat load-modify-store as atomic.
    async fn handle(
        &self,
        request: Self::Request,
        ctx: &HostContext<Self::State>,
    ) -> Result<Self::Response, Self::Error>;
}

/// Host primitives available to a handler during one invocation.
pub struct HostContext<S: Send + Sync + 'static> {
    key: String,
    now: DateTime<Utc>,
    store: Arc<dyn StateStore<S>>,
}

impl<S: Send + Sync + 'static> HostContext<S> {
    pub(crate) fn new(key: String, now: DateTime<Utc>, store: Arc<dyn StateStore<S>>) -> Self {
        Self { key, now, store }
    }

    /// The key this invocation was admitted for.
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Logical time of this invocation.
    pub fn now(&self) -> DateTime<Utc> {
        self.now
    }

    /// Reads the current state for this key, `None` if nothing was stored yet.
    pub async fn load(&self) -> Result<Option<S>, HostError> {
        self.store.load(&self.key).await
    }

    /// Atomically replaces the state for this key.
    pub async fn store(&self, state: &S) -> Result<(), HostError> {
        self.store.store(&self.key, state).await
    }
}
