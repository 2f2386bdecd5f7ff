//! Demo: one lead pushed through create, retry, sync and close passes.
//!
//! Set `SYNC_STATE_DIR` to persist entity state as JSON files instead of in memory.

use actor_host::tracing::setup_tracing;
use actor_host::{FileStore, HostConfig, MemoryStore, StateStore};
use integration_sync::integrations::{
    CrmIntegration, InMemoryCrm, InMemoryMessaging, InMemoryReferrals, Lead,
    MessagingIntegration, ReferralIntegration,
};
use integration_sync::lifecycle::SyncSystem;
use integration_sync::{AdapterError, EntityState, Orchestrator, OrchestratorConfig, Phase};
use std::sync::Arc;
use tracing::{info, Instrument};

const STATE_DIR_ENV: &str = "SYNC_STATE_DIR";

#[tokio::main]
async fn main() -> Result<(), String> {
    setup_tracing();

    let crm = Arc::new(InMemoryCrm::new());
    let messaging = Arc::new(InMemoryMessaging::new());
    let referrals = Arc::new(InMemoryReferrals::new());

    let orchestrator = Orchestrator::<Lead>::builder()
        .with_integration(CrmIntegration::new(crm.clone()))
        .with_integration(MessagingIntegration::new(messaging.clone()))
        .with_integration(ReferralIntegration::new(referrals.clone()))
        .with_config(OrchestratorConfig::from_env())
        .build()
        .map_err(|e| e.to_string())?;

    let store: Arc<dyn StateStore<EntityState<Lead>>> = match std::env::var(STATE_DIR_ENV) {
        Ok(dir) => {
            info!(%dir, "Persisting entity state to disk");
            Arc::new(FileStore::<EntityState<Lead>>::new(dir))
        }
        Err(_) => Arc::new(MemoryStore::<EntityState<Lead>>::new()),
    };
    let system = SyncSystem::start(orchestrator, store, &HostConfig::from_env());
    let client = system.client.clone();

    let lead = Lead::new("lead-42", "Ada Lovelace").with_email("ada@example.com");
    let key = lead.id.clone();

    // The CRM is down for the first attempt; the other integrations carry on.
    crm.faults
        .fail_next(AdapterError::Transport("connection refused".into()));
    let outcome = client
        .run_lifecycle_with(Phase::Create, &key, lead.clone())
        .instrument(tracing::info_span!("create"))
        .await
        .map_err(|e| e.to_string())?;
    info!(failed = ?outcome.failed_integrations, "First create pass finished");

    let outcome = client
        .run_lifecycle(Phase::Create, &key)
        .instrument(tracing::info_span!("retry"))
        .await
        .map_err(|e| e.to_string())?;
    info!(
        failed = ?outcome.failed_integrations,
        crm_id = ?outcome.entity.domain.crm_id,
        "Retry pass finished"
    );

    // The lead now has a phone number, so messaging joins in.
    let mut updated = outcome.entity.domain.clone();
    updated.phone = Some("+44 20 7946 0000".into());
    let outcome = client
        .run_lifecycle_with(Phase::Sync, &key, updated)
        .instrument(tracing::info_span!("sync"))
        .await
        .map_err(|e| e.to_string())?;
    for (name, record) in &outcome.entity.integrations {
        info!(integration = %name, status = %record.status, "Integration status");
    }

    let outcome = client
        .run_lifecycle(Phase::Close, &key)
        .instrument(tracing::info_span!("close"))
        .await
        .map_err(|e| e.to_string())?;
    info!(failed = ?outcome.failed_integrations, "Close pass finished");

    let referral = client
        .integration_status(&key, ReferralIntegration::NAME)
        .await
        .map_err(|e| e.to_string())?;
    info!(status = %referral.status, "Referral after close");
    info!(
        crm_records = crm.len(),
        open_channels = messaging.open_channels(),
        referrals = referrals.len(),
        "External systems"
    );

    drop(client);
    system.shutdown().await.map_err(|e| e.to_string())?;

    info!("Demo completed successfully");
    Ok(())
}
