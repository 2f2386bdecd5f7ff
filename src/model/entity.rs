//! The entity state container: the domain payload plus one record per integration.

use crate::model::state::{IntegrationRecord, SyncStatus};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Everything the engine persists for one entity key.
///
/// Records are kept in a `BTreeMap` so the serialized form is ordered by integration name
/// and does not depend on the order results were produced in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityState<T> {
    pub key: String,
    pub domain: T,
    pub integrations: BTreeMap<String, IntegrationRecord>,
}

impl<T> EntityState<T> {
    /// A container with no integration records yet.
    pub fn new(key: impl Into<String>, domain: T) -> Self {
        Self {
            key: key.into(),
            domain,
            integrations: BTreeMap::new(),
        }
    }

    pub fn integration(&self, name: &str) -> Option<&IntegrationRecord> {
        self.integrations.get(name)
    }

    /// Names of integrations currently in `ERROR`.
    pub fn failing(&self) -> Vec<&str> {
        self.integrations
            .iter()
            .filter(|(_, record)| record.status == SyncStatus::Error)
            .map(|(name, _)| name.as_str())
            .collect()
    }
}
