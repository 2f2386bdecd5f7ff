//! # Actor Host
//!
//! This crate provides a key-addressed, single-writer actor host. Business logic implements
//! [`KeyedHandler`]; the host guarantees that invocations for the same key are strictly
//! serialized while invocations for different keys run in parallel.
//!
//! ## Why per-key actors?
//!
//! Many systems keep one durable record per entity (a lead, a subscription) and mutate it
//! from several triggers: webhooks, schedulers, admin tooling. If two triggers for the same
//! entity overlap, a naive load-modify-store loses one of the updates. Giving every key its
//! own mailbox and its own sequential worker removes that race without a single lock in
//! handler code, while unrelated entities still proceed concurrently.
//!
//! **Further Reading**:
//! - [Actor Model (Wikipedia)](https://en.wikipedia.org/wiki/Actor_model)
//! - [Actors in Rust](https://ryhl.io/blog/actors-with-tokio/) - Practical guide to implementing actors with Tokio
//!
//! ## Architecture Overview
//!
//! 1. **Handler Layer** ([`KeyedHandler`]) - your business logic, one call per request
//! 2. **Runtime Layer** ([`ActorHost`]) - routing, per-key workers, shutdown
//! 3. **Interface Layer** ([`HostClient`]) - type-safe submission of requests
//! 4. **Primitives** ([`HostContext`], [`StateStore`], [`Clock`]) - state read/write and logical time
//!
//! ## Example
//!
//! ```rust
//! use actor_host::{ActorHost, HostConfig, HostContext, HostError, KeyedHandler, MemoryStore, SystemClock};
//! use async_trait::async_trait;
//! use std::sync::Arc;
//!
//! struct Counter;
//!
//! #[async_trait]
//! impl KeyedHandler for Counter {
//!     type State = u64;
//!     type Request = u64;
//!     type Response = u64;
//!     type Error = HostError;
//!
//!     async fn handle(&self, add: u64, ctx: &HostContext<u64>) -> Result<u64, HostError> {
//!         let next = ctx.load().await?.unwrap_or(0) + add;
//!         ctx.store(&next).await?;
//!         Ok(next)
//!     }
//! }
//!
//! #[tokio::main]
//! async fn main() {
//!     let (host, client) = ActorHost::new(
//!         &HostConfig::default(),
//!         Counter,
//!         Arc::new(MemoryStore::<u64>::new()),
//!         Arc::new(SystemClock),
//!     );
//!     let handle = tokio::spawn(host.run());
//!
//!     assert_eq!(client.invoke("a", 2).await.unwrap(), 2);
//!     assert_eq!(client.invoke("a", 3).await.unwrap(), 5);
//!     assert_eq!(client.read("b").await.unwrap(), None);
//!
//!     drop(client);
//!     handle.await.unwrap();
//! }
//! ```
//!
//! ## Testing
//!
//! The [`mock`] module provides a [`MockStore`](mock::MockStore) with failure injection and
//! write recording; [`ManualClock`] gives deterministic time.

pub mod actor;
pub mod client;
pub mod client_trait;
pub mod clock;
pub mod config;
pub mod error;
pub mod handler;
pub mod message;
pub mod mock;
pub mod store;
pub mod tracing;

// Re-export core types for convenience
pub use actor::ActorHost;
pub use client::HostClient;
pub use client_trait::HostedClient;
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::HostConfig;
pub use error::HostError;
pub use handler::{HostContext, KeyedHandler};
pub use message::{HostRequest, Response};
pub use store::{FileStore, MemoryStore, StateStore};
