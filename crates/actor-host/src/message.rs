//! # Host Messages
//!
//! This module defines the messages exchanged between the [`HostClient`](crate::HostClient),
//! the router ([`ActorHost`](crate::ActorHost)) and the per-key workers.
//!
//! Requests arrive at the router as [`HostRequest`], carrying their key. The router strips
//! the key and forwards a [`KeyRequest`] to the worker that owns it, so everything a worker
//! receives is, by construction, about its own key. Workers talk back to the router only to
//! offer their retirement with an [`IdleNotice`].

use crate::error::HostError;
use crate::handler::KeyedHandler;
use tokio::sync::oneshot;

/// Type alias for the one-shot response channel used by the host.
pub type Response<T> = oneshot::Sender<Result<T, HostError>>;

/// Request sent from a client to the router.
pub enum HostRequest<H: KeyedHandler> {
    /// Run the handler for `key`, serialized with every other invocation for that key.
    Invoke {
        key: String,
        request: H::Request,
        respond_to: oneshot::Sender<Result<H::Response, H::Error>>,
    },
    /// Read the stored state for `key`, queued behind in-flight invocations.
    Read {
        key: String,
        respond_to: Response<Option<H::State>>,
    },
    /// Number of live key workers. Answered by the router itself.
    Workers { respond_to: oneshot::Sender<usize> },
}

impl<H: KeyedHandler> HostRequest<H> {
    /// The key a request is routed by, if any.
    pub fn key(&self) -> Option<&str> {
        match self {
            HostRequest::Invoke { key, .. } | HostRequest::Read { key, .. } => Some(key),
            HostRequest::Workers { .. } => None,
        }
    }
}

/// Request forwarded by the router to the worker owning one key.
pub(crate) enum KeyRequest<H: KeyedHandler> {
    Invoke {
        request: H::Request,
        respond_to: oneshot::Sender<Result<H::Response, H::Error>>,
    },
    Read {
        respond_to: Response<Option<H::State>>,
    },
}

/// Sent by a worker whose mailbox stayed empty for the idle timeout.
///
/// `received` counts every request the worker has taken from its mailbox. The router
/// compares it with the number it sent, so a notice that crossed a fresh request is ignored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct IdleNotice {
    pub key: String,
    pub generation: u64,
    pub received: u64,
}
