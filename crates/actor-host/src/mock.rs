//! # Test Doubles
//!
//! Real handlers are easiest to test against a real [`ActorHost`](crate::ActorHost); what is
//! hard to reproduce is the infrastructure misbehaving. [`MockStore`] is an in-memory
//! [`StateStore`] that can be told to fail and that records every write it accepted.
//!
//! | Need | Use |
//! |------|-----|
//! | Store outage on load or store | [`MockStore::fail_loads`] / [`MockStore::fail_stores`] |
//! | "Exactly one write per invocation" | [`MockStore::store_count`] |
//! | Every value ever persisted, in order | [`MockStore::writes`] |
//! | Deterministic time | [`ManualClock`](crate::ManualClock) |
//!
//! ```rust
//! use actor_host::mock::MockStore;
//! use actor_host::{HostError, StateStore};
//!
//! #[tokio::main]
//! async fn main() {
//!     let store = MockStore::<u32>::new();
//!     store.store("a", &1).await.unwrap();
//!
//!     store.fail_loads(true);
//!     assert!(matches!(store.load("a").await, Err(HostError::Unavailable(_))));
//!     assert_eq!(store.writes(), vec![("a".to_string(), 1)]);
//! }
//! ```

use crate::error::HostError;
use crate::store::{MemoryStore, StateStore};
use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

/// In-memory store with failure injection and write recording.
///
/// Clones share state, so a test keeps one handle while the host owns another.
pub struct MockStore<S> {
    inner: Arc<MemoryStore<S>>,
    fail_loads: Arc<AtomicBool>,
    fail_stores: Arc<AtomicBool>,
    stores: Arc<AtomicUsize>,
    writes: Arc<Mutex<Vec<(String, S)>>>,
}

impl<S> Clone for MockStore<S> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
            fail_loads: self.fail_loads.clone(),
            fail_stores: self.fail_stores.clone(),
            stores: self.stores.clone(),
            writes: self.writes.clone(),
        }
    }
}

impl<S> Default for MockStore<S> {
    fn default() -> Self {
        Self {
            inner: Arc::new(MemoryStore::new()),
            fail_loads: Arc::new(AtomicBool::new(false)),
            fail_stores: Arc::new(AtomicBool::new(false)),
            stores: Arc::new(AtomicUsize::new(0)),
            writes: Arc::new(Mutex::new(Vec::new())),
        }
    }
}

impl<S: Clone> MockStore<S> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every subsequent `load` fail with [`HostError::Unavailable`].
    pub fn fail_loads(&self, fail: bool) {
        self.fail_loads.store(fail, Ordering::SeqCst);
    }

    /// Makes every subsequent `store` fail with [`HostError::Unavailable`].
    pub fn fail_stores(&self, fail: bool) {
        self.fail_stores.store(fail, Ordering::SeqCst);
    }

    /// Number of successful writes so far.
    pub fn store_count(&self) -> usize {
        self.stores.load(Ordering::SeqCst)
    }

    /// Every successful write, oldest first.
    pub fn writes(&self) -> Vec<(String, S)> {
        self.writes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[async_trait]
impl<S: Clone + Send + Sync + 'static> StateStore<S> for MockStore<S> {
    async fn load(&self, key: &str) -> Result<Option<S>, HostError> {
        if self.fail_loads.load(Ordering::SeqCst) {
            return Err(HostError::Unavailable(format!("load of '{key}' refused")));
        }
        self.inner.load(key).await
    }

    async fn store(&self, key: &str, state: &S) -> Result<(), HostError> {
        if self.fail_stores.load(Ordering::SeqCst) {
            return Err(HostError::Unavailable(format!("store of '{key}' refused")));
        }
        self.inner.store(key, state).await?;
        self.stores.fetch_add(1, Ordering::SeqCst);
        self.writes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((key.to_string(), state.clone()));
        Ok(())
    }
}
