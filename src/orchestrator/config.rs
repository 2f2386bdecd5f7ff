//! Orchestrator configuration.

use std::time::Duration;
use tracing::warn;

/// Tunables for [`Orchestrator`](super::Orchestrator).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrchestratorConfig {
    /// Upper bound for a single adapter call. A call that exceeds it is recorded as failed.
    pub adapter_timeout: Duration,
    /// Issue the adapter calls of one pass concurrently.
    ///
    /// Results are still merged in configuration order, but [`project`] only runs after
    /// every call finished, so integrations that read values projected by an earlier
    /// integration need the default sequential mode.
    ///
    /// [`project`]: crate::integration::Integration::project
    pub concurrent_adapters: bool,
}

impl OrchestratorConfig {
    pub const TIMEOUT_ENV: &'static str = "SYNC_ADAPTER_TIMEOUT_MS";
    pub const CONCURRENT_ENV: &'static str = "SYNC_CONCURRENT_ADAPTERS";

    /// Reads overrides from the environment, keeping defaults for unset or invalid values.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(raw) = std::env::var(Self::TIMEOUT_ENV) {
            match raw.parse::<u64>() {
                Ok(ms) if ms > 0 => config.adapter_timeout = Duration::from_millis(ms),
                _ => warn!(var = Self::TIMEOUT_ENV, value = %raw, "Ignoring invalid adapter timeout"),
            }
        }

        if let Ok(raw) = std::env::var(Self::CONCURRENT_ENV) {
            match raw.trim().to_ascii_lowercase().as_str() {
                "1" | "true" | "yes" => config.concurrent_adapters = true,
                "0" | "false" | "no" => config.concurrent_adapters = false,
                _ => warn!(var = Self::CONCURRENT_ENV, value = %raw, "Ignoring invalid flag"),
            }
        }

        config
    }

    pub fn with_adapter_timeout(mut self, adapter_timeout: Duration) -> Self {
        self.adapter_timeout = adapter_timeout;
        self
    }

    pub fn with_concurrent_adapters(mut self, concurrent_adapters: bool) -> Self {
        self.concurrent_adapters = concurrent_adapters;
        self
    }
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            adapter_timeout: Duration::from_secs(30),
            concurrent_adapters: false,
        }
    }
}
