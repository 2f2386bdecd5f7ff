//! # Synchronization Orchestrator
//!
//! The [`Orchestrator`] drives every configured integration of one entity through its
//! lifecycle. One call is one *pass*:
//!
//! 1. Load the [`EntityState`] through the host (or create it from the request's domain
//!    payload) and reconcile its records with the configured integrations.
//! 2. For each integration, in configuration order: decode its record, check the phase
//!    allows a call, evaluate `should_run`, then call the adapter under a timeout with
//!    panics caught. Whatever happens is folded into that integration's record only.
//! 3. Store the whole container with a single write.
//! 4. Report which integrations ended the pass in `ERROR`.
//!
//! The orchestrator never retries and never locks: it is hosted behind an
//! [`ActorHost`](actor_host::ActorHost), which guarantees one pass per key at a time.
//! Retrying records left in `ERROR` is the business of whoever schedules the next pass.

pub mod config;
pub(crate) mod step;

pub use config::OrchestratorConfig;

use crate::error::{ConfigurationError, SyncError};
use crate::integration::erased::{DynIntegration, Erased};
use crate::integration::{DomainState, Integration};
use crate::model::EntityState;
use actor_host::{HostContext, KeyedHandler};
use async_trait::async_trait;
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt::Display;
use step::{StepEnv, StepOutcome};
use tracing::{debug, info, warn};

/// Lifecycle phase requested for a pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    Create,
    Sync,
    Close,
}

impl Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Phase::Create => "create",
            Phase::Sync => "sync",
            Phase::Close => "close",
        })
    }
}

/// One pass request.
#[derive(Debug, Clone)]
pub struct SyncRequest<T> {
    pub phase: Phase,
    /// Replaces the stored domain payload before the pass. Required for unknown keys.
    pub domain: Option<T>,
}

impl<T> SyncRequest<T> {
    pub fn new(phase: Phase) -> Self {
        Self {
            phase,
            domain: None,
        }
    }

    pub fn with_domain(phase: Phase, domain: T) -> Self {
        Self {
            phase,
            domain: Some(domain),
        }
    }
}

/// Result of one pass.
#[derive(Debug, Clone, PartialEq)]
pub struct PassOutcome<T> {
    /// The container as persisted at the end of the pass.
    pub entity: EntityState<T>,
    /// Integrations called during this pass that ended it in `ERROR`, in configuration order.
    pub failed_integrations: Vec<String>,
    /// Integration hooks that could not be evaluated during this pass.
    pub configuration_errors: Vec<ConfigurationError>,
}

impl<T> PassOutcome<T> {
    /// True when nothing failed and nothing was skipped for configuration reasons.
    pub fn is_clean(&self) -> bool {
        self.failed_integrations.is_empty() && self.configuration_errors.is_empty()
    }
}

/// Drives the configured integrations for entities of domain type `T`.
pub struct Orchestrator<T: DomainState> {
    integrations: Vec<Box<dyn DynIntegration<T>>>,
    config: OrchestratorConfig,
}

impl<T: DomainState> Orchestrator<T> {
    pub fn builder() -> OrchestratorBuilder<T> {
        OrchestratorBuilder::default()
    }

    /// Configured integration names, in configuration order.
    pub fn integration_names(&self) -> Vec<&str> {
        self.integrations.iter().map(|i| i.name()).collect()
    }

    pub fn config(&self) -> &OrchestratorConfig {
        &self.config
    }

    /// Adds missing records and drops records of integrations no longer configured.
    ///
    /// An integration whose default record cannot be built gets no record, and so sits out
    /// this pass.
    fn reconcile(&self, entity: &mut EntityState<T>, report: &mut Report) {
        for integration in &self.integrations {
            let name = integration.name();
            if entity.integrations.contains_key(name) {
                continue;
            }
            match integration.default_record() {
                Ok(record) => {
                    entity.integrations.insert(name.to_string(), record);
                    debug!(key = %entity.key, integration = name, "Attached integration");
                }
                Err(error) => {
                    warn!(key = %entity.key, integration = name, %error, "Integration not attached");
                    report.configuration_errors.push(error);
                }
            }
        }

        let configured: HashSet<&str> = self.integrations.iter().map(|i| i.name()).collect();
        let key = entity.key.clone();
        entity.integrations.retain(|name, _| {
            let keep = configured.contains(name.as_str());
            if !keep {
                warn!(%key, integration = %name, "Dropping record of unconfigured integration");
            }
            keep
        });
    }

    async fn run_sequential(
        &self,
        phase: Phase,
        entity: &mut EntityState<T>,
        env: &StepEnv,
        report: &mut Report,
    ) {
        for integration in &self.integrations {
            let Some(record) = entity.integrations.get(integration.name()) else {
                continue;
            };
            let step = integration
                .run_step(phase, record, &entity.domain, env)
                .await;
            report.apply(integration.as_ref(), step, entity);
        }
    }

    async fn run_concurrent(
        &self,
        phase: Phase,
        entity: &mut EntityState<T>,
        env: &StepEnv,
        report: &mut Report,
    ) {
        let domain = &entity.domain;
        let records = &entity.integrations;
        let steps = join_all(self.integrations.iter().filter_map(move |integration| {
            let record = records.get(integration.name())?;
            Some(async move {
                let step = integration.run_step(phase, record, domain, env).await;
                (integration, step)
            })
        }))
        .await;

        // join_all keeps input order, so this merge follows configuration order.
        for (integration, step) in steps {
            report.apply(integration.as_ref(), step, entity);
        }
    }
}

#[async_trait]
impl<T: DomainState> KeyedHandler for Orchestrator<T> {
    type State = EntityState<T>;
    type Request = SyncRequest<T>;
    type Response = PassOutcome<T>;
    type Error = SyncError;

    async fn handle(
        &self,
        request: SyncRequest<T>,
        ctx: &HostContext<EntityState<T>>,
    ) -> Result<PassOutcome<T>, SyncError> {
        let key = ctx.key();
        let phase = request.phase;

        let mut entity = match (ctx.load().await?, request.domain) {
            (Some(mut entity), Some(domain)) => {
                entity.domain = domain;
                entity
            }
            (Some(entity), None) => entity,
            (None, Some(domain)) => {
                info!(%key, "Creating entity state");
                EntityState::new(key, domain)
            }
            (None, None) => return Err(SyncError::UnknownEntity(key.to_string())),
        };
        let mut report = Report::default();
        self.reconcile(&mut entity, &mut report);

        info!(%key, %phase, integrations = self.integrations.len(), "Pass started");
        let env = StepEnv {
            now: ctx.now(),
            adapter_timeout: self.config.adapter_timeout,
        };
        if self.config.concurrent_adapters {
            self.run_concurrent(phase, &mut entity, &env, &mut report)
                .await;
        } else {
            self.run_sequential(phase, &mut entity, &env, &mut report)
                .await;
        }

        ctx.store(&entity).await?;
        info!(
            %key,
            %phase,
            ran = report.ran,
            failed = report.failed.len(),
            misconfigured = report.configuration_errors.len(),
            "Pass finished"
        );

        Ok(PassOutcome {
            entity,
            failed_integrations: report.failed,
            configuration_errors: report.configuration_errors,
        })
    }
}

/// Accumulates step outcomes while merging them into the container.
#[derive(Default)]
struct Report {
    ran: usize,
    failed: Vec<String>,
    configuration_errors: Vec<ConfigurationError>,
}

impl Report {
    fn apply<T: DomainState>(
        &mut self,
        integration: &dyn DynIntegration<T>,
        step: StepOutcome,
        entity: &mut EntityState<T>,
    ) {
        let name = integration.name();
        match step {
            StepOutcome::Ran { record, failed } => {
                self.ran += 1;
                if failed {
                    self.failed.push(name.to_string());
                } else if let Err(error) = integration.project(&record, &mut entity.domain) {
                    warn!(key = %entity.key, integration = name, %error, "Projection dropped");
                    self.configuration_errors.push(error);
                }
                debug!(key = %entity.key, integration = name, status = %record.status, "Record replaced");
                entity.integrations.insert(name.to_string(), record);
            }
            StepOutcome::Skipped(reason) => {
                debug!(key = %entity.key, integration = name, ?reason, "Skipped");
            }
            StepOutcome::Misconfigured(error) => {
                warn!(key = %entity.key, integration = name, %error, "Integration skipped");
                self.configuration_errors.push(error);
            }
        }
    }
}

/// Assembles an [`Orchestrator`] from integrations in configuration order.
pub struct OrchestratorBuilder<T: DomainState> {
    integrations: Vec<Box<dyn DynIntegration<T>>>,
    config: OrchestratorConfig,
}

impl<T: DomainState> Default for OrchestratorBuilder<T> {
    fn default() -> Self {
        Self {
            integrations: Vec::new(),
            config: OrchestratorConfig::default(),
        }
    }
}

impl<T: DomainState> OrchestratorBuilder<T> {
    /// Appends an integration. Integrations run in the order they are added.
    pub fn with_integration<I: Integration<T>>(mut self, integration: I) -> Self {
        self.integrations.push(Box::new(Erased::new(integration)));
        self
    }

    pub fn with_config(mut self, config: OrchestratorConfig) -> Self {
        self.config = config;
        self
    }

    /// Fails if two integrations share a name.
    pub fn build(self) -> Result<Orchestrator<T>, SyncError> {
        {
            let mut seen = HashSet::new();
            for integration in &self.integrations {
                if !seen.insert(integration.name()) {
                    return Err(SyncError::DuplicateIntegration(
                        integration.name().to_string(),
                    ));
                }
            }
        }
        Ok(Orchestrator {
            integrations: self.integrations,
            config: self.config,
        })
    }
}
