//! Object-safe view of an [`Integration`] so integrations with different `Data` types can
//! share one ordered list.

use crate::error::ConfigurationError;
use crate::integration::{DomainState, Integration};
use crate::model::IntegrationRecord;
use crate::orchestrator::step::{self, StepEnv, StepOutcome};
use crate::orchestrator::Phase;
use async_trait::async_trait;
use std::marker::PhantomData;
use std::panic::{catch_unwind, AssertUnwindSafe};
use tracing::warn;

#[async_trait]
pub(crate) trait DynIntegration<T: DomainState>: Send + Sync {
    fn name(&self) -> &str;

    fn default_record(&self) -> Result<IntegrationRecord, ConfigurationError>;

    async fn run_step(
        &self,
        phase: Phase,
        record: &IntegrationRecord,
        domain: &T,
        env: &StepEnv,
    ) -> StepOutcome;

    /// Leaves `domain` unchanged if the projection panics.
    fn project(&self, record: &IntegrationRecord, domain: &mut T)
        -> Result<(), ConfigurationError>;
}

pub(crate) struct Erased<T, I> {
    inner: I,
    _domain: PhantomData<fn() -> T>,
}

impl<T, I> Erased<T, I> {
    pub(crate) fn new(inner: I) -> Self {
        Self {
            inner,
            _domain: PhantomData,
        }
    }
}

#[async_trait]
impl<T, I> DynIntegration<T> for Erased<T, I>
where
    T: DomainState,
    I: Integration<T>,
{
    fn name(&self) -> &str {
        self.inner.name()
    }

    fn default_record(&self) -> Result<IntegrationRecord, ConfigurationError> {
        let failure = |reason: String| ConfigurationError::DefaultState {
            integration: self.inner.name().to_string(),
            reason,
        };
        let state = catch_unwind(AssertUnwindSafe(|| self.inner.default_state()))
            .map_err(|panic| failure(step::panic_message(panic.as_ref())))?;
        state.to_record().map_err(|e| failure(e.to_string()))
    }

    async fn run_step(
        &self,
        phase: Phase,
        record: &IntegrationRecord,
        domain: &T,
        env: &StepEnv,
    ) -> StepOutcome {
        step::run_step(&self.inner, phase, record, domain, env).await
    }

    fn project(
        &self,
        record: &IntegrationRecord,
        domain: &mut T,
    ) -> Result<(), ConfigurationError> {
        let state = match record.decode::<I::Data>() {
            Ok(state) => state,
            Err(e) => {
                warn!(
                    integration = self.inner.name(),
                    error = %e,
                    "Skipping projection of undecodable record"
                );
                return Ok(());
            }
        };

        // Project into a copy so a panic halfway through cannot leave a torn payload.
        let mut projected = domain.clone();
        match catch_unwind(AssertUnwindSafe(|| self.inner.project(&state, &mut projected))) {
            Ok(()) => {
                *domain = projected;
                Ok(())
            }
            Err(panic) => Err(ConfigurationError::ProjectPanicked {
                integration: self.inner.name().to_string(),
                reason: step::panic_message(panic.as_ref()),
            }),
        }
    }
}
