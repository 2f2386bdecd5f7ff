//! # Mock Integration
//!
//! [`ScriptedIntegration`] is an [`Integration`] whose lifecycle calls answer from a queue of
//! scripted responses. It works with any domain type and stores an arbitrary JSON payload
//! as its data.
//!
//! Calls with nothing scripted succeed: create and sync return `SYNCED`, close returns
//! `CLOSED`. Scripted responses are consumed in order; a call whose phase does not match
//! the next script is answered with the default and recorded as a mismatch, which
//! [`ScriptedIntegration::verify`] reports.
//!
//! ```rust
//! use integration_sync::error::AdapterError;
//! use integration_sync::mock::ScriptedIntegration;
//! use integration_sync::model::SyncStatus;
//!
//! let crm = ScriptedIntegration::new("crm");
//! crm.expect_create().return_err(AdapterError::Transport("connection refused".into()));
//! crm.expect_create().return_ok(SyncStatus::Synced, serde_json::json!({ "id": "c-1" }));
//! // ... hand `crm.clone()` to an orchestrator and run passes ...
//! # let _ = crm;
//! ```

use crate::error::AdapterError;
use crate::integration::{DomainState, Integration};
use crate::model::{IntegrationState, SyncStatus};
use crate::orchestrator::Phase;
use async_trait::async_trait;
use serde_json::Value;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

/// Shared, ordered log of `"<integration>:<phase>"` entries.
pub type CallLog = Arc<Mutex<Vec<String>>>;

#[derive(Debug, Clone)]
enum Response {
    Return(SyncStatus, Value),
    Fail(AdapterError),
    Panic(String),
}

#[derive(Debug, Clone)]
struct Expectation {
    phase: Phase,
    delay: Option<Duration>,
    response: Response,
}

#[derive(Default)]
struct Inner {
    expectations: Mutex<VecDeque<Expectation>>,
    calls: Mutex<Vec<Phase>>,
    mismatches: Mutex<Vec<String>>,
    skip: AtomicBool,
    panic_in_should_run: AtomicBool,
    panic_in_project: AtomicBool,
    panic_in_default_state: AtomicBool,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// An integration driven by scripted responses.
///
/// Clones share their script and call history, so a test keeps one handle while the
/// orchestrator owns another.
#[derive(Clone)]
pub struct ScriptedIntegration {
    name: String,
    inner: Arc<Inner>,
    log: Option<CallLog>,
}

impl ScriptedIntegration {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            inner: Arc::new(Inner::default()),
            log: None,
        }
    }

    /// Appends every call to `log`, shared with other integrations to observe ordering.
    pub fn with_call_log(mut self, log: CallLog) -> Self {
        self.log = Some(log);
        self
    }

    /// Makes `should_run` return `false` (or `true` again).
    pub fn skip(&self, skip: bool) {
        self.inner.skip.store(skip, Ordering::SeqCst);
    }

    /// Makes `should_run` panic.
    pub fn panic_in_should_run(&self, panic: bool) {
        self.inner.panic_in_should_run.store(panic, Ordering::SeqCst);
    }

    /// Makes `project` panic after successful calls.
    pub fn panic_in_project(&self, panic: bool) {
        self.inner.panic_in_project.store(panic, Ordering::SeqCst);
    }

    pub fn panic_in_default_state(&self, panic: bool) {
        self.inner.panic_in_default_state.store(panic, Ordering::SeqCst);
    }

    pub fn expect_create(&self) -> ExpectationBuilder {
        self.expect(Phase::Create)
    }

    pub fn expect_sync(&self) -> ExpectationBuilder {
        self.expect(Phase::Sync)
    }

    pub fn expect_close(&self) -> ExpectationBuilder {
        self.expect(Phase::Close)
    }

    fn expect(&self, phase: Phase) -> ExpectationBuilder {
        ExpectationBuilder {
            phase,
            delay: None,
            inner: self.inner.clone(),
        }
    }

    /// Every lifecycle call received so far, in order.
    pub fn calls(&self) -> Vec<Phase> {
        lock(&self.inner.calls).clone()
    }

    pub fn call_count(&self, phase: Phase) -> usize {
        lock(&self.inner.calls).iter().filter(|p| **p == phase).count()
    }

    /// Panics if scripted responses are left over or a call did not match its script.
    pub fn verify(&self) {
        let mismatches = lock(&self.inner.mismatches);
        if !mismatches.is_empty() {
            panic!("{}: unexpected calls: {:?}", self.name, *mismatches);
        }
        let remaining = lock(&self.inner.expectations).len();
        if remaining > 0 {
            panic!(
                "{}: not all expectations were met. {} remaining",
                self.name, remaining
            );
        }
    }

    async fn answer(
        &self,
        phase: Phase,
        state: IntegrationState<Value>,
    ) -> Result<IntegrationState<Value>, AdapterError> {
        lock(&self.inner.calls).push(phase);
        if let Some(log) = &self.log {
            lock(log).push(format!("{}:{}", self.name, phase));
        }

        let expectation = {
            let mut queue = lock(&self.inner.expectations);
            match queue.front().map(|next| next.phase) {
                Some(expected) if expected == phase => queue.pop_front(),
                Some(expected) => {
                    lock(&self.inner.mismatches)
                        .push(format!("expected {expected}, got {phase}"));
                    None
                }
                None => None,
            }
        };

        let Some(expectation) = expectation else {
            return Ok(match phase {
                Phase::Create | Phase::Sync => state.with_status(SyncStatus::Synced),
                Phase::Close => state.with_status(SyncStatus::Closed),
            });
        };

        if let Some(delay) = expectation.delay {
            tokio::time::sleep(delay).await;
        }
        match expectation.response {
            Response::Return(status, data) => Ok(IntegrationState {
                status,
                data,
                ..state
            }),
            Response::Fail(error) => Err(error),
            Response::Panic(message) => panic!("{message}"),
        }
    }
}

/// Completes a scripted response for one lifecycle call.
pub struct ExpectationBuilder {
    phase: Phase,
    delay: Option<Duration>,
    inner: Arc<Inner>,
}

impl ExpectationBuilder {
    /// Waits `delay` before answering.
    pub fn after(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Returns a record with `status` and `data`.
    pub fn return_ok(self, status: SyncStatus, data: Value) {
        self.push(Response::Return(status, data));
    }

    pub fn return_err(self, error: AdapterError) {
        self.push(Response::Fail(error));
    }

    pub fn panic(self, message: impl Into<String>) {
        self.push(Response::Panic(message.into()));
    }

    fn push(self, response: Response) {
        lock(&self.inner.expectations).push_back(Expectation {
            phase: self.phase,
            delay: self.delay,
            response,
        });
    }
}

#[async_trait]
impl<T: DomainState> Integration<T> for ScriptedIntegration {
    type Data = Value;

    fn name(&self) -> &str {
        &self.name
    }

    fn should_run(&self, _domain: &T) -> bool {
        if self.inner.panic_in_should_run.load(Ordering::SeqCst) {
            panic!("{}: should_run exploded", self.name);
        }
        !self.inner.skip.load(Ordering::SeqCst)
    }

    fn default_state(&self) -> IntegrationState<Value> {
        if self.inner.panic_in_default_state.load(Ordering::SeqCst) {
            panic!("{}: default_state exploded", self.name);
        }
        IntegrationState::default()
    }

    async fn create(
        &self,
        state: IntegrationState<Value>,
        _domain: &T,
    ) -> Result<IntegrationState<Value>, AdapterError> {
        self.answer(Phase::Create, state).await
    }

    async fn sync(
        &self,
        state: IntegrationState<Value>,
        _domain: &T,
    ) -> Result<IntegrationState<Value>, AdapterError> {
        self.answer(Phase::Sync, state).await
    }

    async fn close(
        &self,
        state: IntegrationState<Value>,
        _domain: &T,
    ) -> Result<IntegrationState<Value>, AdapterError> {
        self.answer(Phase::Close, state).await
    }

    fn project(&self, _state: &IntegrationState<Value>, _domain: &mut T) {
        if self.inner.panic_in_project.load(Ordering::SeqCst) {
            panic!("{}: project exploded", self.name);
        }
    }
}
