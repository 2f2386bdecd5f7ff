//! # Lifecycle
//!
//! Starting and stopping the engine. [`SyncSystem`] owns the host task; logging setup
//! lives in [`actor_host::tracing`].

pub mod sync_system;

pub use sync_system::SyncSystem;
