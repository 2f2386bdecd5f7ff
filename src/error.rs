//! Error types for the synchronization engine.
//!
//! Three tiers, matching how far a failure is allowed to travel:
//!
//! - [`AdapterError`]: one lifecycle call failed. Recovered inside the pass and recorded in
//!   that integration's [`ErrorInfo`](crate::model::ErrorInfo).
//! - [`ConfigurationError`]: one of an integration's hooks could not be evaluated. Logged,
//!   reported in the [`PassOutcome`](crate::orchestrator::PassOutcome). Before the adapter
//!   call the integration is skipped with its prior state untouched; after it, the call's
//!   record is kept and only the projection is dropped.
//! - [`SyncError`]: the pass itself cannot complete. Returned to the caller; nothing is
//!   persisted.

use actor_host::HostError;
use std::time::Duration;
use thiserror::Error;

/// Failure of a single integration lifecycle call.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum AdapterError {
    /// The external system could not be reached.
    #[error("Transport error: {0}")]
    Transport(String),

    /// The external system answered with a failure.
    #[error("Remote system rejected request: {0}")]
    Remote(String),

    /// The stored integration state does not allow this call.
    #[error("Invalid integration state: {0}")]
    InvalidState(String),

    /// The call did not finish within the configured adapter timeout.
    #[error("Adapter call timed out after {0:?}")]
    Timeout(Duration),

    /// The adapter panicked instead of returning.
    #[error("Adapter panicked: {0}")]
    Panicked(String),
}

/// An integration skipped for the current pass.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigurationError {
    /// The stored record does not decode into the integration's data type.
    #[error("Integration '{integration}' has a stored record of a different shape: {reason}")]
    ShapeMismatch { integration: String, reason: String },

    /// Evaluating `should_run` panicked.
    #[error("Integration '{integration}' failed while evaluating should_run: {reason}")]
    ShouldRunPanicked { integration: String, reason: String },

    /// The initial record could not be built or encoded.
    #[error("Integration '{integration}' has no usable default state: {reason}")]
    DefaultState { integration: String, reason: String },

    /// `project` panicked; the domain payload was left as it was.
    #[error("Integration '{integration}' failed while projecting into the domain: {reason}")]
    ProjectPanicked { integration: String, reason: String },
}

impl ConfigurationError {
    /// Name of the affected integration.
    pub fn integration(&self) -> &str {
        match self {
            ConfigurationError::ShapeMismatch { integration, .. }
            | ConfigurationError::ShouldRunPanicked { integration, .. }
            | ConfigurationError::DefaultState { integration, .. }
            | ConfigurationError::ProjectPanicked { integration, .. } => integration,
        }
    }
}

/// Errors surfaced to callers of the synchronization engine.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum SyncError {
    /// The single-writer host could not load or store state, or is shut down.
    #[error("Host unavailable: {0}")]
    HostUnavailable(#[from] HostError),

    /// No state exists for the key and the request carried no domain payload.
    #[error("Entity not found: {0}")]
    UnknownEntity(String),

    /// The entity has no record for the requested integration.
    #[error("Integration '{integration}' not found for entity '{key}'")]
    UnknownIntegration { key: String, integration: String },

    /// Two configured integrations share a name.
    #[error("Integration '{0}' configured more than once")]
    DuplicateIntegration(String),
}
