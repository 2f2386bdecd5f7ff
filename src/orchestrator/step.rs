//! One integration's share of a pass: eligibility, the guarded adapter call(s), and the
//! bookkeeping applied to whatever the adapter returned.

use crate::error::{AdapterError, ConfigurationError};
use crate::integration::{DomainState, Integration};
use crate::model::{ErrorInfo, IntegrationRecord, IntegrationState, SyncStatus};
use crate::orchestrator::Phase;
use chrono::{DateTime, Utc};
use futures::FutureExt;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::time::Duration;
use tracing::{debug, warn};

/// Inputs shared by every step of one pass.
#[derive(Debug, Clone, Copy)]
pub(crate) struct StepEnv {
    /// Host logical time for the whole pass.
    pub now: DateTime<Utc>,
    pub adapter_timeout: Duration,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum SkipReason {
    Closed,
    ShouldRunFalse,
    Ineligible(SyncStatus),
}

#[derive(Debug)]
pub(crate) enum StepOutcome {
    Skipped(SkipReason),
    Misconfigured(ConfigurationError),
    Ran { record: IntegrationRecord, failed: bool },
}

/// Lifecycle calls a record in `status` receives for `phase`, in order.
///
/// A record that was never provisioned gets a create attempt before anything else, so a
/// `NOT_SYNCED` record can only reach `CLOSED` through a create attempt.
pub(crate) fn plan(phase: Phase, status: SyncStatus) -> Result<&'static [Phase], SkipReason> {
    match (phase, status) {
        (_, SyncStatus::Closed) => Err(SkipReason::Closed),
        (Phase::Create, SyncStatus::NotSynced | SyncStatus::Error) => Ok(&[Phase::Create]),
        (Phase::Create, other) => Err(SkipReason::Ineligible(other)),
        (Phase::Sync, SyncStatus::NotSynced) => Ok(&[Phase::Create]),
        (Phase::Sync, _) => Ok(&[Phase::Sync]),
        (Phase::Close, SyncStatus::NotSynced) => Ok(&[Phase::Create, Phase::Close]),
        (Phase::Close, _) => Ok(&[Phase::Close]),
    }
}

pub(crate) async fn run_step<T, I>(
    integration: &I,
    phase: Phase,
    stored: &IntegrationRecord,
    domain: &T,
    env: &StepEnv,
) -> StepOutcome
where
    T: DomainState,
    I: Integration<T>,
{
    let name = integration.name();

    let state = match stored.decode::<I::Data>() {
        Ok(state) => state,
        Err(e) => {
            return StepOutcome::Misconfigured(ConfigurationError::ShapeMismatch {
                integration: name.to_string(),
                reason: e.to_string(),
            })
        }
    };

    let calls = match plan(phase, state.status) {
        Ok(calls) => calls,
        Err(reason) => return StepOutcome::Skipped(reason),
    };

    match std::panic::catch_unwind(AssertUnwindSafe(|| integration.should_run(domain))) {
        Ok(true) => {}
        Ok(false) => return StepOutcome::Skipped(SkipReason::ShouldRunFalse),
        Err(panic) => {
            return StepOutcome::Misconfigured(ConfigurationError::ShouldRunPanicked {
                integration: name.to_string(),
                reason: panic_message(panic.as_ref()),
            })
        }
    }

    let mut current = state;
    for &call in calls {
        current = invoke(integration, call, current, domain, env).await;
        if current.status == SyncStatus::Error {
            break;
        }
    }

    let failed = current.status == SyncStatus::Error;
    match current.to_record() {
        Ok(record) => StepOutcome::Ran { record, failed },
        Err(e) => {
            // Keep what was stored before the pass, flagged with the encoding failure.
            let err = AdapterError::InvalidState(format!("result could not be encoded: {e}"));
            let record = stored.clone().failed(error_info(&err, env.now));
            StepOutcome::Ran {
                record,
                failed: true,
            }
        }
    }
}

async fn invoke<T, I>(
    integration: &I,
    call: Phase,
    prior: IntegrationState<I::Data>,
    domain: &T,
    env: &StepEnv,
) -> IntegrationState<I::Data>
where
    T: DomainState,
    I: Integration<T>,
{
    let name = integration.name();
    debug!(integration = name, %call, status = %prior.status, "Calling adapter");

    let pending = match call {
        Phase::Create => integration.create(prior.clone(), domain),
        Phase::Sync => integration.sync(prior.clone(), domain),
        Phase::Close => integration.close(prior.clone(), domain),
    };
    let guarded = AssertUnwindSafe(pending).catch_unwind();
    let result = match tokio::time::timeout(env.adapter_timeout, guarded).await {
        Err(_) => Err(AdapterError::Timeout(env.adapter_timeout)),
        Ok(Err(panic)) => Err(AdapterError::Panicked(panic_message(panic.as_ref()))),
        Ok(Ok(result)) => result,
    };

    let next = settle(call, prior, result, env.now);
    match &next.error {
        Some(error) if next.status == SyncStatus::Error => {
            warn!(integration = name, %call, error = %error.message, "Adapter call failed")
        }
        _ => debug!(integration = name, %call, status = %next.status, "Adapter call settled"),
    }
    next
}

/// Applies orchestrator-owned bookkeeping to an adapter result.
///
/// - failures keep the prior data and sync history and gain a fresh [`ErrorInfo`];
/// - create/sync may only end `SYNCED`, `SYNCING` or `ERROR`; any other returned status is
///   treated as a failure of that call;
/// - successful create/sync calls clear the error, and stamp `last_synced` when `SYNCED`;
/// - successful close calls always end `CLOSED` unless the adapter returned `ERROR`.
pub(crate) fn settle<D>(
    call: Phase,
    prior: IntegrationState<D>,
    result: Result<IntegrationState<D>, AdapterError>,
    now: DateTime<Utc>,
) -> IntegrationState<D> {
    let mut next = match result {
        Ok(next) => next,
        Err(err) => return prior.failed(error_info(&err, now)),
    };

    next.last_synced = prior.last_synced;
    match (call, next.status) {
        (_, SyncStatus::Error) => {
            if next.error.is_none() {
                next.error = Some(ErrorInfo::new(format!("{call} reported failure"), now));
            }
        }
        (Phase::Close, _) => {
            next.status = SyncStatus::Closed;
            next.error = None;
        }
        (_, status @ (SyncStatus::NotSynced | SyncStatus::Closed)) => {
            let message = format!("{call} returned illegal status {status}");
            return prior.failed(ErrorInfo::new(message, now));
        }
        (_, status) => {
            next.error = None;
            if status == SyncStatus::Synced {
                next.last_synced = Some(now);
            }
        }
    }
    next
}

fn error_info(err: &AdapterError, now: DateTime<Utc>) -> ErrorInfo {
    ErrorInfo::new(err.to_string(), now).with_details(format!("{err:?}"))
}

pub(crate) fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
