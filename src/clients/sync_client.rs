//! # Sync Client
//!
//! The API webhook handlers, schedulers, and admin tooling use to talk to the orchestrator.
//! It wraps a [`HostClient`] so callers never build [`SyncRequest`]s by hand.

use crate::error::SyncError;
use crate::integration::DomainState;
use crate::model::{EntityState, IntegrationRecord};
use crate::orchestrator::{Orchestrator, PassOutcome, Phase, SyncRequest};
use actor_host::{HostClient, HostError, HostedClient};
use async_trait::async_trait;
use tracing::{debug, instrument};

/// Client for running passes and querying integration state.
pub struct SyncClient<T: DomainState> {
    inner: HostClient<Orchestrator<T>>,
}

impl<T: DomainState> Clone for SyncClient<T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<T: DomainState> SyncClient<T> {
    pub fn new(inner: HostClient<Orchestrator<T>>) -> Self {
        Self { inner }
    }

    /// Runs one pass over the stored entity.
    #[instrument(skip(self))]
    pub async fn run_lifecycle(
        &self,
        phase: Phase,
        key: &str,
    ) -> Result<PassOutcome<T>, SyncError> {
        debug!("Sending request");
        self.inner.invoke(key, SyncRequest::new(phase)).await
    }

    /// Runs one pass after replacing the entity's domain payload; creates the entity on
    /// first use.
    #[instrument(skip(self, domain))]
    pub async fn run_lifecycle_with(
        &self,
        phase: Phase,
        key: &str,
        domain: T,
    ) -> Result<PassOutcome<T>, SyncError> {
        debug!(?domain, "Sending request");
        self.inner
            .invoke(key, SyncRequest::with_domain(phase, domain))
            .await
    }

    /// Current record of one integration for one entity.
    #[instrument(skip(self))]
    pub async fn integration_status(
        &self,
        key: &str,
        integration: &str,
    ) -> Result<IntegrationRecord, SyncError> {
        let entity = self
            .read(key)
            .await?
            .ok_or_else(|| SyncError::UnknownEntity(key.to_string()))?;
        entity
            .integrations
            .get(integration)
            .cloned()
            .ok_or_else(|| SyncError::UnknownIntegration {
                key: key.to_string(),
                integration: integration.to_string(),
            })
    }

    /// The full container for an entity, if any pass ever ran for it.
    pub async fn entity(&self, key: &str) -> Result<Option<EntityState<T>>, SyncError> {
        self.read(key).await
    }
}

#[async_trait]
impl<T: DomainState> HostedClient<Orchestrator<T>> for SyncClient<T> {
    type Error = SyncError;

    fn inner(&self) -> &HostClient<Orchestrator<T>> {
        &self.inner
    }

    fn map_error(e: HostError) -> Self::Error {
        SyncError::HostUnavailable(e)
    }
}
