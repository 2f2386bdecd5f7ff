//! # Host Client
//!
//! This module defines the client used to talk to an [`ActorHost`](crate::ActorHost).

use crate::error::HostError;
use crate::handler::KeyedHandler;
use crate::message::HostRequest;
use tokio::sync::{mpsc, oneshot};

/// ## HostClient
///
/// A type-safe handle for submitting requests to an `ActorHost<H>`. It forwards requests
/// over a Tokio mpsc channel and awaits the answer on a oneshot channel.
///
/// * **Cloneable**: holds only a sender, so cloning is inexpensive.
/// * **Admission**: `invoke` returns only once the handler has run for that key, after
///   every earlier request for the same key.
pub struct HostClient<H: KeyedHandler> {
    sender: mpsc::Sender<HostRequest<H>>,
}

impl<H: KeyedHandler> Clone for HostClient<H> {
    fn clone(&self) -> Self {
        Self {
            sender: self.sender.clone(),
        }
    }
}

impl<H: KeyedHandler> HostClient<H> {
    pub fn new(sender: mpsc::Sender<HostRequest<H>>) -> Self {
        Self { sender }
    }

    /// Runs the handler for `key`. Host failures surface through `H::Error`.
    pub async fn invoke(
        &self,
        key: impl Into<String>,
        request: H::Request,
    ) -> Result<H::Response, H::Error> {
        let (respond_to, response) = oneshot::channel();
        self.sender
            .send(HostRequest::Invoke {
                key: key.into(),
                request,
                respond_to,
            })
            .await
            .map_err(|_| H::Error::from(HostError::ActorClosed))?;
        response
            .await
            .map_err(|_| H::Error::from(HostError::ActorDropped))?
    }

    /// Reads the stored state for `key` without running the handler.
    pub async fn read(&self, key: impl Into<String>) -> Result<Option<H::State>, HostError> {
        let (respond_to, response) = oneshot::channel();
        self.sender
            .send(HostRequest::Read {
                key: key.into(),
                respond_to,
            })
            .await
            .map_err(|_| HostError::ActorClosed)?;
        response.await.map_err(|_| HostError::ActorDropped)?
    }

    /// Number of keys that currently have a live worker.
    pub async fn worker_count(&self) -> Result<usize, HostError> {
        let (respond_to, response) = oneshot::channel();
        self.sender
            .send(HostRequest::Workers { respond_to })
            .await
            .map_err(|_| HostError::ActorClosed)?;
        response.await.map_err(|_| HostError::ActorDropped)
    }
}
