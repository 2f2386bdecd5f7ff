use crate::clients::SyncClient;
use crate::error::SyncError;
use crate::integration::DomainState;
use crate::model::EntityState;
use crate::orchestrator::Orchestrator;
use actor_host::{ActorHost, Clock, HostConfig, HostError, StateStore, SystemClock};
use std::sync::Arc;
use tracing::{error, info};

/// A running synchronization engine: one [`ActorHost`] around one [`Orchestrator`].
///
/// `SyncSystem` is responsible for:
/// - **Lifecycle Management**: spawning the host task and stopping it again
/// - **Dependency Wiring**: handing the store and clock to the host, and the host's
///   client to callers
///
/// # Example
///
/// ```ignore
/// let system = SyncSystem::start(orchestrator, store, &HostConfig::from_env());
///
/// system.client.run_lifecycle_with(Phase::Create, "lead-42", lead).await?;
/// let crm = system.client.integration_status("lead-42", "crm").await?;
///
/// system.shutdown().await?;
/// ```
pub struct SyncSystem<T: DomainState> {
    /// Client for running passes and reading state
    pub client: SyncClient<T>,

    handle: tokio::task::JoinHandle<()>,
}

impl<T: DomainState> SyncSystem<T> {
    /// Starts the engine with wall-clock time.
    pub fn start(
        orchestrator: Orchestrator<T>,
        store: Arc<dyn StateStore<EntityState<T>>>,
        config: &HostConfig,
    ) -> Self {
        Self::start_with_clock(orchestrator, store, Arc::new(SystemClock), config)
    }

    /// Starts the engine with an explicit clock, e.g. a
    /// [`ManualClock`](actor_host::ManualClock) in tests.
    pub fn start_with_clock(
        orchestrator: Orchestrator<T>,
        store: Arc<dyn StateStore<EntityState<T>>>,
        clock: Arc<dyn Clock>,
        config: &HostConfig,
    ) -> Self {
        info!(
            integrations = ?orchestrator.integration_names(),
            mailbox_size = config.mailbox_size,
            idle_timeout = ?config.idle_timeout,
            "Starting sync system"
        );
        let (host, client) = ActorHost::new(config, orchestrator, store, clock);
        let handle = tokio::spawn(host.run());

        Self {
            client: SyncClient::new(client),
            handle,
        }
    }

    /// Stops accepting work and waits for in-flight passes to finish.
    ///
    /// Clones of [`SyncSystem::client`] held elsewhere keep the host alive, so drop them
    /// first.
    pub async fn shutdown(self) -> Result<(), SyncError> {
        info!("Shutting down sync system...");

        drop(self.client);

        if let Err(e) = self.handle.await {
            error!(error = %e, "Host task failed");
            return Err(HostError::TaskFailed(e.to_string()).into());
        }

        info!("Sync system shutdown complete.");
        Ok(())
    }
}
