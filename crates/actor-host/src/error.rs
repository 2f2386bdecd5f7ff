//! # Host Errors
//!
//! This module defines the errors raised by the host itself: mailbox failures and
//! state store failures. Handler-level errors are owned by the handler and only need
//! to be constructible from a [`HostError`].

/// Errors that can occur within the actor host.
#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum HostError {
    #[error("Actor closed")]
    ActorClosed,
    #[error("Actor dropped response channel")]
    ActorDropped,
    #[error("State store unavailable: {0}")]
    Unavailable(String),
    #[error("Invalid key: {0}")]
    InvalidKey(String),
    #[error("Host task failed: {0}")]
    TaskFailed(String),
}
