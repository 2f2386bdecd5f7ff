//! # State Stores
//!
//! A [`StateStore`] persists one value per key with whole-value replace semantics. The host
//! only ever calls it from the worker that owns the key, so implementations need no
//! per-key locking of their own.
//!
//! - [`MemoryStore`]: process-local map, the default for tests and demos.
//! - [`FileStore`]: one JSON document per key, replaced atomically via temp file + rename.

use crate::error::HostError;
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::HashMap;
use std::io::ErrorKind;
use std::marker::PhantomData;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::sync::RwLock;

/// Durable per-key state.
#[async_trait]
pub trait StateStore<S: Send + Sync>: Send + Sync + 'static {
    /// Returns the stored value, `None` if the key was never written.
    async fn load(&self, key: &str) -> Result<Option<S>, HostError>;

    /// Replaces the stored value. Readers see either the old or the new value, never a mix.
    async fn store(&self, key: &str, state: &S) -> Result<(), HostError>;
}

/// In-memory store.
pub struct MemoryStore<S> {
    entries: RwLock<HashMap<String, S>>,
}

impl<S> Default for MemoryStore<S> {
    fn default() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
        }
    }
}

impl<S> MemoryStore<S> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of keys with a stored value.
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

#[async_trait]
impl<S: Clone + Send + Sync + 'static> StateStore<S> for MemoryStore<S> {
    async fn load(&self, key: &str) -> Result<Option<S>, HostError> {
        Ok(self.entries.read().await.get(key).cloned())
    }

    async fn store(&self, key: &str, state: &S) -> Result<(), HostError> {
        self.entries
            .write()
            .await
            .insert(key.to_string(), state.clone());
        Ok(())
    }
}

/// JSON-file store: `<dir>/<key>.json`.
pub struct FileStore<S> {
    dir: PathBuf,
    _state: PhantomData<fn() -> S>,
}

impl<S> FileStore<S> {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            _state: PhantomData,
        }
    }

    fn path_for(&self, key: &str) -> Result<PathBuf, HostError> {
        let invalid = key.is_empty()
            || key.starts_with('.')
            || key.contains(['/', '\\'])
            || key.chars().any(char::is_control);
        if invalid {
            return Err(HostError::InvalidKey(key.to_string()));
        }
        Ok(self.dir.join(format!("{key}.json")))
    }
}

#[async_trait]
impl<S> StateStore<S> for FileStore<S>
where
    S: Serialize + DeserializeOwned + Send + Sync + 'static,
{
    async fn load(&self, key: &str) -> Result<Option<S>, HostError> {
        let path = self.path_for(key)?;
        let bytes = match fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(None),
            Err(err) => {
                return Err(HostError::Unavailable(format!(
                    "Failed to read '{}': {}",
                    path.display(),
                    err
                )))
            }
        };
        serde_json::from_slice(&bytes).map(Some).map_err(|err| {
            HostError::Unavailable(format!("Corrupt state in '{}': {}", path.display(), err))
        })
    }

    async fn store(&self, key: &str, state: &S) -> Result<(), HostError> {
        let path = self.path_for(key)?;
        let bytes = serde_json::to_vec_pretty(state).map_err(|err| {
            HostError::Unavailable(format!("Failed to encode state for '{key}': {err}"))
        })?;
        atomic_write(&path, &bytes).await
    }
}

async fn atomic_write(path: &Path, bytes: &[u8]) -> Result<(), HostError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).await.map_err(|err| {
            HostError::Unavailable(format!(
                "Failed to create directory '{}': {}",
                parent.display(),
                err
            ))
        })?;
    }

    let tmp = path.with_extension("json.tmp");
    fs::write(&tmp, bytes).await.map_err(|err| {
        HostError::Unavailable(format!(
            "Failed to write temp file '{}': {}",
            tmp.display(),
            err
        ))
    })?;

    fs::rename(&tmp, path).await.map_err(|err| {
        HostError::Unavailable(format!(
            "Failed to rename '{}' -> '{}': {}",
            tmp.display(),
            path.display(),
            err
        ))
    })
}
