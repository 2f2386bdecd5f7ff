//! Referral integration: forwards leads to a partner once the CRM knows them.
//!
//! The partner accepts referrals asynchronously. A forwarded lead stays `SYNCING` until a
//! later sync pass sees the partner's acceptance.

use super::{lock, FaultInjector, Lead};
use crate::error::AdapterError;
use crate::integration::Integration;
use crate::model::{IntegrationState, SyncStatus};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReferralStatus {
    Pending,
    Accepted,
    Withdrawn,
}

#[async_trait]
pub trait ReferralApi: Send + Sync {
    /// Forwards a lead, returning the partner's referral id.
    async fn forward(&self, lead: &Lead, crm_id: &str) -> Result<String, AdapterError>;
    async fn status(&self, referral_id: &str) -> Result<ReferralStatus, AdapterError>;
    async fn withdraw(&self, referral_id: &str) -> Result<(), AdapterError>;
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReferralData {
    pub referral_id: Option<String>,
}

pub struct ReferralIntegration {
    api: Arc<dyn ReferralApi>,
}

impl ReferralIntegration {
    pub const NAME: &'static str = "referral";

    pub fn new(api: Arc<dyn ReferralApi>) -> Self {
        Self { api }
    }

    /// Maps the partner's view of a forwarded referral onto the record.
    ///
    /// A failed status check still returns the record, so the referral id is never lost.
    async fn refresh(
        &self,
        state: IntegrationState<ReferralData>,
        referral_id: &str,
        lead: &Lead,
    ) -> IntegrationState<ReferralData> {
        match self.api.status(referral_id).await {
            Ok(ReferralStatus::Accepted) => state.with_status(SyncStatus::Synced),
            Ok(ReferralStatus::Pending) => state.with_status(SyncStatus::Syncing),
            Ok(ReferralStatus::Withdrawn) => {
                warn!(lead = %lead.id, %referral_id, "Referral withdrawn by partner");
                state.with_status(SyncStatus::Error)
            }
            Err(e) => {
                warn!(lead = %lead.id, %referral_id, error = %e, "Referral status unavailable");
                state.with_status(SyncStatus::Error)
            }
        }
    }
}

#[async_trait]
impl Integration<Lead> for ReferralIntegration {
    type Data = ReferralData;

    fn name(&self) -> &str {
        Self::NAME
    }

    /// Referrals carry the CRM id, so they wait for the CRM integration.
    fn should_run(&self, lead: &Lead) -> bool {
        lead.crm_id.is_some()
    }

    async fn create(
        &self,
        mut state: IntegrationState<ReferralData>,
        lead: &Lead,
    ) -> Result<IntegrationState<ReferralData>, AdapterError> {
        if state.data.referral_id.is_some() {
            return self.sync(state, lead).await;
        }
        let crm_id = lead
            .crm_id
            .as_deref()
            .ok_or_else(|| AdapterError::InvalidState("lead has no CRM id".into()))?;

        let referral_id = self.api.forward(lead, crm_id).await?;
        debug!(lead = %lead.id, %referral_id, "Forwarded referral");
        state.data.referral_id = Some(referral_id.clone());
        Ok(self.refresh(state, &referral_id, lead).await)
    }

    async fn sync(
        &self,
        state: IntegrationState<ReferralData>,
        lead: &Lead,
    ) -> Result<IntegrationState<ReferralData>, AdapterError> {
        let Some(referral_id) = state.data.referral_id.clone() else {
            return self.create(state, lead).await;
        };
        Ok(self.refresh(state, &referral_id, lead).await)
    }

    async fn close(
        &self,
        state: IntegrationState<ReferralData>,
        _lead: &Lead,
    ) -> Result<IntegrationState<ReferralData>, AdapterError> {
        if let Some(referral_id) = &state.data.referral_id {
            self.api.withdraw(referral_id).await?;
        }
        Ok(state.with_status(SyncStatus::Closed))
    }
}

/// A referral as the in-memory partner holds it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Referral {
    pub lead_id: String,
    pub crm_id: String,
    pub status: ReferralStatus,
}

/// In-process referral partner.
///
/// Accepts referrals immediately unless [`InMemoryReferrals::accept_later`] is set, in
/// which case they stay pending until [`InMemoryReferrals::accept_all`].
#[derive(Debug, Default)]
pub struct InMemoryReferrals {
    referrals: Mutex<HashMap<String, Referral>>,
    next_id: AtomicU64,
    defer: AtomicBool,
    pub faults: FaultInjector,
}

impl InMemoryReferrals {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn accept_later(&self, defer: bool) {
        self.defer.store(defer, Ordering::SeqCst);
    }

    pub fn accept_all(&self) {
        for referral in lock(&self.referrals).values_mut() {
            if referral.status == ReferralStatus::Pending {
                referral.status = ReferralStatus::Accepted;
            }
        }
    }

    pub fn referral(&self, id: &str) -> Option<Referral> {
        lock(&self.referrals).get(id).cloned()
    }

    pub fn len(&self) -> usize {
        lock(&self.referrals).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl ReferralApi for InMemoryReferrals {
    async fn forward(&self, lead: &Lead, crm_id: &str) -> Result<String, AdapterError> {
        self.faults.check()?;
        let id = format!("ref-{}", self.next_id.fetch_add(1, Ordering::SeqCst) + 1);
        let status = if self.defer.load(Ordering::SeqCst) {
            ReferralStatus::Pending
        } else {
            ReferralStatus::Accepted
        };
        lock(&self.referrals).insert(
            id.clone(),
            Referral {
                lead_id: lead.id.clone(),
                crm_id: crm_id.to_string(),
                status,
            },
        );
        Ok(id)
    }

    async fn status(&self, referral_id: &str) -> Result<ReferralStatus, AdapterError> {
        self.faults.check()?;
        lock(&self.referrals)
            .get(referral_id)
            .map(|r| r.status)
            .ok_or_else(|| AdapterError::Remote(format!("referral {referral_id} not found")))
    }

    async fn withdraw(&self, referral_id: &str) -> Result<(), AdapterError> {
        self.faults.check()?;
        match lock(&self.referrals).get_mut(referral_id) {
            Some(referral) => {
                referral.status = ReferralStatus::Withdrawn;
                Ok(())
            }
            None => Err(AdapterError::Remote(format!(
                "referral {referral_id} not found"
            ))),
        }
    }
}
