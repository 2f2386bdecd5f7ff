//! # Lead Integrations
//!
//! Three integrations for [`Lead`] entities, run in this order:
//!
//! 1. [`CrmIntegration`] provisions the lead in the CRM and projects the CRM id back into
//!    the lead.
//! 2. [`MessagingIntegration`] opens a messaging channel for leads with a phone number.
//! 3. [`ReferralIntegration`] forwards the lead to a partner once it has a CRM id.
//!
//! Each integration talks to its external system through a client trait passed to its
//! constructor. The `InMemory*` implementations back the demo binary and the tests, and
//! can be told to fail their next calls through a [`FaultInjector`].

pub mod crm;
pub mod lead;
pub mod messaging;
pub mod referral;

pub use crm::{CrmApi, CrmData, CrmIntegration, InMemoryCrm};
pub use lead::Lead;
pub use messaging::{InMemoryMessaging, MessagingApi, MessagingData, MessagingIntegration};
pub use referral::{InMemoryReferrals, ReferralApi, ReferralData, ReferralIntegration};

use crate::error::AdapterError;
use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Scripted outcomes for the next client calls, one per call. Calls beyond the script
/// succeed.
#[derive(Debug, Default)]
pub struct FaultInjector {
    pending: Mutex<VecDeque<Option<AdapterError>>>,
}

impl FaultInjector {
    /// Makes the next unscripted call fail with `error`.
    pub fn fail_next(&self, error: AdapterError) {
        lock(&self.pending).push_back(Some(error));
    }

    /// Lets the next unscripted call through, so a later one can be made to fail.
    pub fn succeed_next(&self) {
        lock(&self.pending).push_back(None);
    }

    /// Consumes one scripted outcome, if any.
    pub fn check(&self) -> Result<(), AdapterError> {
        match lock(&self.pending).pop_front() {
            Some(Some(error)) => Err(error),
            _ => Ok(()),
        }
    }
}

pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
