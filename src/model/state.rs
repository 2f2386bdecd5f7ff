//! The per-integration state record attached to an entity.

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fmt::Display;

/// Lifecycle position of one integration for one entity.
///
/// ```text
/// NOT_SYNCED --create--> SYNCED | ERROR
/// ERROR      --create/sync--> SYNCED | ERROR
/// SYNCED     --sync--> SYNCED | ERROR
/// SYNCED | ERROR | SYNCING --close--> CLOSED | ERROR
/// CLOSED     (terminal)
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SyncStatus {
    #[default]
    NotSynced,
    /// Accepted by the external system but not confirmed yet.
    Syncing,
    Synced,
    Error,
    Closed,
}

impl SyncStatus {
    pub fn is_closed(self) -> bool {
        self == SyncStatus::Closed
    }
}

impl Display for SyncStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            SyncStatus::NotSynced => "NOT_SYNCED",
            SyncStatus::Syncing => "SYNCING",
            SyncStatus::Synced => "SYNCED",
            SyncStatus::Error => "ERROR",
            SyncStatus::Closed => "CLOSED",
        };
        f.write_str(label)
    }
}

/// Why the last call for an integration failed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorInfo {
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
    pub error_date: DateTime<Utc>,
}

impl ErrorInfo {
    pub fn new(message: impl Into<String>, error_date: DateTime<Utc>) -> Self {
        Self {
            message: message.into(),
            details: None,
            error_date,
        }
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }
}

/// State of one integration for one entity.
///
/// `D` is the integration's own payload, e.g. identifiers of the remote record. The
/// orchestrator never looks inside it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntegrationState<D> {
    pub status: SyncStatus,
    pub data: D,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_synced: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorInfo>,
}

impl<D: Default> Default for IntegrationState<D> {
    fn default() -> Self {
        Self {
            status: SyncStatus::NotSynced,
            data: D::default(),
            last_synced: None,
            error: None,
        }
    }
}

impl<D> IntegrationState<D> {
    /// A record in `status` carrying `data`, with no sync or error history.
    pub fn new(status: SyncStatus, data: D) -> Self {
        Self {
            status,
            data,
            last_synced: None,
            error: None,
        }
    }

    /// Same record with a different status.
    pub fn with_status(mut self, status: SyncStatus) -> Self {
        self.status = status;
        self
    }

    /// Marks the record failed, keeping its data and sync history.
    pub fn failed(mut self, error: ErrorInfo) -> Self {
        self.status = SyncStatus::Error;
        self.error = Some(error);
        self
    }
}

/// The stored, type-erased form of an [`IntegrationState`].
pub type IntegrationRecord = IntegrationState<serde_json::Value>;

impl<D: Serialize> IntegrationState<D> {
    /// Converts into the stored form.
    pub fn to_record(&self) -> Result<IntegrationRecord, serde_json::Error> {
        Ok(IntegrationRecord {
            status: self.status,
            data: serde_json::to_value(&self.data)?,
            last_synced: self.last_synced,
            error: self.error.clone(),
        })
    }
}

impl IntegrationRecord {
    /// Decodes the stored form into an integration's own data type.
    pub fn decode<D: DeserializeOwned>(&self) -> Result<IntegrationState<D>, serde_json::Error> {
        Ok(IntegrationState {
            status: self.status,
            data: serde_json::from_value(self.data.clone())?,
            last_synced: self.last_synced,
            error: self.error.clone(),
        })
    }
}
