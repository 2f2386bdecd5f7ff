//! # HostedClient Trait
//!
//! Provides a common interface for domain-specific clients wrapping a [`HostClient`], adding
//! a default `read` built on top of it.
use crate::{HostClient, HostError, KeyedHandler};
use async_trait::async_trait;

/// Trait for domain-specific clients to inherit the standard state read.
///
/// Implementors only supply access to the inner [`HostClient`] and a mapping from
/// [`HostError`] into their own error type.
#[async_trait]
pub trait HostedClient<H: KeyedHandler>: Send + Sync {
    /// The domain-specific error type.
    type Error: Send + Sync;

    /// Access the inner generic client.
    fn inner(&self) -> &HostClient<H>;

    /// Map host errors to the domain error type.
    fn map_error(e: HostError) -> Self::Error;

    /// Fetch the stored state for a key.
    #[tracing::instrument(skip(self))]
    async fn read(&self, key: &str) -> Result<Option<H::State>, Self::Error> {
        tracing::debug!("Sending request");
        self.inner().read(key).await.map_err(Self::map_error)
    }
}
