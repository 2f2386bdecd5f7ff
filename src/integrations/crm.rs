//! CRM integration: keeps a remote lead record in step with the local [`Lead`].

use super::{lock, FaultInjector, Lead};
use crate::error::AdapterError;
use crate::integration::Integration;
use crate::model::{IntegrationState, SyncStatus};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use tracing::{debug, info};

#[async_trait]
pub trait CrmApi: Send + Sync {
    /// Id of an existing, non-archived remote lead with this email.
    async fn find_by_email(&self, email: &str) -> Result<Option<String>, AdapterError>;
    async fn create_lead(&self, lead: &Lead) -> Result<String, AdapterError>;
    async fn update_lead(&self, id: &str, lead: &Lead) -> Result<(), AdapterError>;
    async fn archive_lead(&self, id: &str) -> Result<(), AdapterError>;
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CrmData {
    pub remote_id: Option<String>,
    /// Number of successful pushes to the CRM.
    pub revision: u64,
}

pub struct CrmIntegration {
    api: Arc<dyn CrmApi>,
}

impl CrmIntegration {
    pub const NAME: &'static str = "crm";

    pub fn new(api: Arc<dyn CrmApi>) -> Self {
        Self { api }
    }

    async fn push(
        &self,
        id: String,
        mut state: IntegrationState<CrmData>,
        lead: &Lead,
    ) -> Result<IntegrationState<CrmData>, AdapterError> {
        self.api.update_lead(&id, lead).await?;
        state.data.remote_id = Some(id);
        state.data.revision += 1;
        Ok(state.with_status(SyncStatus::Synced))
    }
}

#[async_trait]
impl Integration<Lead> for CrmIntegration {
    type Data = CrmData;

    fn name(&self) -> &str {
        Self::NAME
    }

    async fn create(
        &self,
        mut state: IntegrationState<CrmData>,
        lead: &Lead,
    ) -> Result<IntegrationState<CrmData>, AdapterError> {
        // A previous attempt may have created the remote lead before failing.
        if let Some(id) = state.data.remote_id.clone() {
            return self.push(id, state, lead).await;
        }
        if let Some(email) = &lead.email {
            if let Some(id) = self.api.find_by_email(email).await? {
                info!(lead = %lead.id, remote_id = %id, "Adopting existing CRM lead");
                return self.push(id, state, lead).await;
            }
        }

        let id = self.api.create_lead(lead).await?;
        debug!(lead = %lead.id, remote_id = %id, "Created CRM lead");
        state.data.remote_id = Some(id);
        state.data.revision = 1;
        Ok(state.with_status(SyncStatus::Synced))
    }

    async fn sync(
        &self,
        state: IntegrationState<CrmData>,
        lead: &Lead,
    ) -> Result<IntegrationState<CrmData>, AdapterError> {
        match state.data.remote_id.clone() {
            Some(id) => self.push(id, state, lead).await,
            None => self.create(state, lead).await,
        }
    }

    async fn close(
        &self,
        state: IntegrationState<CrmData>,
        _lead: &Lead,
    ) -> Result<IntegrationState<CrmData>, AdapterError> {
        if let Some(id) = &state.data.remote_id {
            self.api.archive_lead(id).await?;
        }
        Ok(state.with_status(SyncStatus::Closed))
    }

    fn project(&self, state: &IntegrationState<CrmData>, lead: &mut Lead) {
        if state.data.remote_id.is_some() {
            lead.crm_id = state.data.remote_id.clone();
        }
    }
}

/// A remote lead as the in-memory CRM holds it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrmRecord {
    pub lead: Lead,
    pub archived: bool,
}

/// In-process CRM.
#[derive(Debug, Default)]
pub struct InMemoryCrm {
    records: Mutex<HashMap<String, CrmRecord>>,
    next_id: AtomicU64,
    pub faults: FaultInjector,
}

impl InMemoryCrm {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, id: &str) -> Option<CrmRecord> {
        lock(&self.records).get(id).cloned()
    }

    pub fn len(&self) -> usize {
        lock(&self.records).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl CrmApi for InMemoryCrm {
    async fn find_by_email(&self, email: &str) -> Result<Option<String>, AdapterError> {
        self.faults.check()?;
        let records = lock(&self.records);
        let mut matches: Vec<&String> = records
            .iter()
            .filter(|(_, r)| !r.archived && r.lead.email.as_deref() == Some(email))
            .map(|(id, _)| id)
            .collect();
        matches.sort();
        Ok(matches.first().map(|id| id.to_string()))
    }

    async fn create_lead(&self, lead: &Lead) -> Result<String, AdapterError> {
        self.faults.check()?;
        let id = format!("crm-{}", self.next_id.fetch_add(1, Ordering::SeqCst) + 1);
        lock(&self.records).insert(
            id.clone(),
            CrmRecord {
                lead: lead.clone(),
                archived: false,
            },
        );
        Ok(id)
    }

    async fn update_lead(&self, id: &str, lead: &Lead) -> Result<(), AdapterError> {
        self.faults.check()?;
        match lock(&self.records).get_mut(id) {
            Some(record) if record.archived => {
                Err(AdapterError::Remote(format!("lead {id} is archived")))
            }
            Some(record) => {
                record.lead = lead.clone();
                Ok(())
            }
            None => Err(AdapterError::Remote(format!("lead {id} not found"))),
        }
    }

    async fn archive_lead(&self, id: &str) -> Result<(), AdapterError> {
        self.faults.check()?;
        match lock(&self.records).get_mut(id) {
            Some(record) => {
                record.archived = true;
                Ok(())
            }
            None => Err(AdapterError::Remote(format!("lead {id} not found"))),
        }
    }
}
