//! Type-safe wrappers around [`HostClient`](actor_host::HostClient).

pub mod sync_client;

pub use sync_client::*;
