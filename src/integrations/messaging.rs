//! Messaging integration: one channel per lead with a phone number.

use super::{lock, FaultInjector, Lead};
use crate::error::AdapterError;
use crate::integration::Integration;
use crate::model::{IntegrationState, SyncStatus};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use tracing::warn;

#[async_trait]
pub trait MessagingApi: Send + Sync {
    async fn open_channel(&self, phone: &str) -> Result<String, AdapterError>;
    async fn send(&self, channel: &str, text: &str) -> Result<(), AdapterError>;
    async fn release_channel(&self, channel: &str) -> Result<(), AdapterError>;
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessagingData {
    pub channel_id: Option<String>,
    /// Phone number the channel was opened for.
    pub phone: Option<String>,
}

pub struct MessagingIntegration {
    api: Arc<dyn MessagingApi>,
}

impl MessagingIntegration {
    pub const NAME: &'static str = "messaging";

    pub fn new(api: Arc<dyn MessagingApi>) -> Self {
        Self { api }
    }
}

#[async_trait]
impl Integration<Lead> for MessagingIntegration {
    type Data = MessagingData;

    fn name(&self) -> &str {
        Self::NAME
    }

    fn should_run(&self, lead: &Lead) -> bool {
        lead.phone.is_some()
    }

    async fn create(
        &self,
        mut state: IntegrationState<MessagingData>,
        lead: &Lead,
    ) -> Result<IntegrationState<MessagingData>, AdapterError> {
        let phone = lead
            .phone
            .clone()
            .ok_or_else(|| AdapterError::InvalidState("lead has no phone number".into()))?;

        let channel = match state.data.channel_id.clone() {
            Some(channel) => channel,
            None => {
                let channel = self.api.open_channel(&phone).await?;
                // Keep the channel even if the welcome message fails, so a retry reuses it.
                state.data.channel_id = Some(channel.clone());
                state.data.phone = Some(phone);
                channel
            }
        };
        match self
            .api
            .send(&channel, &format!("Hi {}, thanks for reaching out!", lead.name))
            .await
        {
            Ok(()) => Ok(state.with_status(SyncStatus::Synced)),
            Err(e) => {
                warn!(lead = %lead.id, %channel, error = %e, "Welcome message not delivered");
                Ok(state.with_status(SyncStatus::Error))
            }
        }
    }

    async fn sync(
        &self,
        mut state: IntegrationState<MessagingData>,
        lead: &Lead,
    ) -> Result<IntegrationState<MessagingData>, AdapterError> {
        if state.data.phone == lead.phone && state.data.channel_id.is_some() {
            // An errored record still owes the welcome message.
            if state.status == SyncStatus::Error {
                return self.create(state, lead).await;
            }
            return Ok(state.with_status(SyncStatus::Synced));
        }
        if let Some(channel) = state.data.channel_id.take() {
            self.api.release_channel(&channel).await?;
        }
        state.data.phone = None;
        // The old channel is gone; a failed reopen must not bring it back.
        let released = state.clone();
        match self.create(state, lead).await {
            Ok(next) => Ok(next),
            Err(e) => {
                warn!(lead = %lead.id, error = %e, "Messaging channel not reopened");
                Ok(released.with_status(SyncStatus::Error))
            }
        }
    }

    async fn close(
        &self,
        mut state: IntegrationState<MessagingData>,
        _lead: &Lead,
    ) -> Result<IntegrationState<MessagingData>, AdapterError> {
        if let Some(channel) = &state.data.channel_id {
            self.api.release_channel(channel).await?;
        }
        state.data.channel_id = None;
        Ok(state.with_status(SyncStatus::Closed))
    }
}

/// In-process messaging provider.
#[derive(Debug, Default)]
pub struct InMemoryMessaging {
    /// Open channels and the messages sent on them.
    channels: Mutex<HashMap<String, Vec<String>>>,
    next_id: AtomicU64,
    pub faults: FaultInjector,
}

impl InMemoryMessaging {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn open_channels(&self) -> usize {
        lock(&self.channels).len()
    }

    pub fn messages(&self, channel: &str) -> Vec<String> {
        lock(&self.channels)
            .get(channel)
            .cloned()
            .unwrap_or_default()
    }
}

#[async_trait]
impl MessagingApi for InMemoryMessaging {
    async fn open_channel(&self, phone: &str) -> Result<String, AdapterError> {
        self.faults.check()?;
        if phone.trim().is_empty() {
            return Err(AdapterError::Remote("empty phone number".into()));
        }
        let id = format!("chan-{}", self.next_id.fetch_add(1, Ordering::SeqCst) + 1);
        lock(&self.channels).insert(id.clone(), Vec::new());
        Ok(id)
    }

    async fn send(&self, channel: &str, text: &str) -> Result<(), AdapterError> {
        self.faults.check()?;
        match lock(&self.channels).get_mut(channel) {
            Some(messages) => {
                messages.push(text.to_string());
                Ok(())
            }
            None => Err(AdapterError::Remote(format!("channel {channel} is closed"))),
        }
    }

    async fn release_channel(&self, channel: &str) -> Result<(), AdapterError> {
        self.faults.check()?;
        lock(&self.channels).remove(channel);
        Ok(())
    }
}
