//! # Integration Contract
//!
//! [`Integration`] is the capability set every external system adapter implements: a
//! CRM, a messaging provider, a lead-forwarding partner. One instance exists per
//! integration per orchestrator; it is stateless with respect to entities, all per-entity
//! state travels in the [`IntegrationState`] passed to each call.
//!
//! # Replace, never patch
//! Every lifecycle method receives the current record by value and returns the complete
//! replacement record. There are no partial updates to reason about: whatever the adapter
//! returns is what gets stored, after the orchestrator applies its own bookkeeping
//! (`last_synced`, `error`, forced `CLOSED`). Create and sync must not return `NOT_SYNCED` or
//! `CLOSED`; such a result is recorded as a failed call.
//!
//! # Partial remote effects
//! If a call changed the external system and a later step of the same call failed, return
//! `Ok` with an `ERROR` record that keeps the new remote identifiers. Returning `Err` drops
//! them, and the next attempt would provision a duplicate.
//!
//! # Expected vs unexpected failures
//! Expected failures (remote rejected the payload, rate limited) should come back as
//! `Err(AdapterError)` or as a record with [`SyncStatus::Error`](crate::model::SyncStatus).
//! Panics are caught and recorded too, but they are reserved for bugs.
//!
//! # Provided Methods
//! - [`Integration::should_run`] defaults to `true`.
//! - [`Integration::default_state`] defaults to `NOT_SYNCED` with `Data::default()`.
//! - [`Integration::project`] defaults to doing nothing.

pub(crate) mod erased;

use crate::error::AdapterError;
use crate::model::IntegrationState;
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fmt::Debug;

/// Bounds every domain payload must satisfy.
pub trait DomainState: Clone + Debug + Send + Sync + 'static {}

impl<T: Clone + Debug + Send + Sync + 'static> DomainState for T {}

/// An external system kept in sync with entities of domain type `T`.
///
/// Dependencies such as API clients are passed to the implementor's constructor; the
/// orchestrator never hands out ambient clients.
#[async_trait]
pub trait Integration<T: DomainState>: Send + Sync + 'static {
    /// Integration-specific payload stored in the record, e.g. remote identifiers.
    type Data: Clone + Default + Debug + Serialize + DeserializeOwned + Send + Sync + 'static;

    /// Stable, unique name. Used as the record key inside the entity container.
    fn name(&self) -> &str;

    /// Whether this integration takes part in a pass for `domain`.
    ///
    /// Must be free of side effects. Evaluated before every lifecycle call.
    fn should_run(&self, _domain: &T) -> bool {
        true
    }

    /// The record attached to an entity the first time this integration sees it.
    fn default_state(&self) -> IntegrationState<Self::Data> {
        IntegrationState::default()
    }

    /// First-time provisioning in the external system.
    ///
    /// May be called again after a failed attempt; checking for an already existing
    /// remote record before creating a duplicate is up to the implementor.
    async fn create(
        &self,
        state: IntegrationState<Self::Data>,
        domain: &T,
    ) -> Result<IntegrationState<Self::Data>, AdapterError>;

    /// Pushes or pulls incremental changes. Never called on a `CLOSED` record.
    async fn sync(
        &self,
        state: IntegrationState<Self::Data>,
        domain: &T,
    ) -> Result<IntegrationState<Self::Data>, AdapterError>;

    /// Terminal teardown. The record ends `CLOSED` unless this returns an `ERROR` record
    /// or fails, in which case a later close pass retries.
    async fn close(
        &self,
        state: IntegrationState<Self::Data>,
        domain: &T,
    ) -> Result<IntegrationState<Self::Data>, AdapterError>;

    /// Copies values produced by this integration into the domain payload after a
    /// successful call, so integrations later in the configuration order can use them.
    fn project(&self, _state: &IntegrationState<Self::Data>, _domain: &mut T) {}
}
