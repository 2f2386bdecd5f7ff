//! Host configuration.

use std::time::Duration;
use tracing::warn;

/// Tunables for [`ActorHost`](crate::ActorHost).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostConfig {
    /// Capacity of the router mailbox. When full, clients wait for space.
    pub mailbox_size: usize,
    /// How long a key worker may sit with an empty mailbox before it is retired.
    /// `None` keeps workers until shutdown.
    pub idle_timeout: Option<Duration>,
}

impl HostConfig {
    /// Environment variable overriding [`HostConfig::mailbox_size`].
    pub const MAILBOX_ENV: &'static str = "ACTOR_HOST_MAILBOX";
    /// Environment variable overriding [`HostConfig::idle_timeout`], in seconds. `0` disables
    /// retirement.
    pub const IDLE_ENV: &'static str = "ACTOR_HOST_IDLE_SECS";

    /// Reads overrides from the environment, keeping defaults for unset or invalid values.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(raw) = std::env::var(Self::MAILBOX_ENV) {
            match raw.parse::<usize>() {
                Ok(size) if size > 0 => config.mailbox_size = size,
                _ => warn!(
                    var = Self::MAILBOX_ENV,
                    value = %raw,
                    default = config.mailbox_size,
                    "Ignoring invalid mailbox size"
                ),
            }
        }
        if let Ok(raw) = std::env::var(Self::IDLE_ENV) {
            match raw.parse::<u64>() {
                Ok(0) => config.idle_timeout = None,
                Ok(secs) => config.idle_timeout = Some(Duration::from_secs(secs)),
                Err(_) => warn!(
                    var = Self::IDLE_ENV,
                    value = %raw,
                    default = ?config.idle_timeout,
                    "Ignoring invalid idle timeout"
                ),
            }
        }
        config
    }

    pub fn with_mailbox_size(mut self, mailbox_size: usize) -> Self {
        self.mailbox_size = mailbox_size.max(1);
        self
    }

    pub fn with_idle_timeout(mut self, idle_timeout: Option<Duration>) -> Self {
        self.idle_timeout = idle_timeout;
        self
    }
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            mailbox_size: 32,
            idle_timeout: Some(Duration::from_secs(300)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builders_clamp_and_disable() {
        let config = HostConfig::default()
            .with_mailbox_size(0)
            .with_idle_timeout(None);

        assert_eq!(config.mailbox_size, 1);
        assert_eq!(config.idle_timeout, None);
    }
}
