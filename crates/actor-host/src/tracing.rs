//! # Observability & Tracing
//!
//! The host logs with the `tracing` crate. Every host event carries the handler type and,
//! for per-key events, the `key` field:
//!
//! ```text
//! INFO Host started handler_type="Orchestrator<Lead>"
//! DEBUG Key worker started handler_type="Orchestrator<Lead>" key="lead-1"
//! DEBUG Invoke handler_type="Orchestrator<Lead>" key="lead-1" request=SyncRequest { phase: Create, .. }
//! INFO Shutdown handler_type="Orchestrator<Lead>" workers=1
//! ```
//!
//! Verbosity is controlled through `RUST_LOG`:
//!
//! ```bash
//! RUST_LOG=info cargo run
//! RUST_LOG=actor_host=debug,integration_sync=debug cargo run
//! ```

/// Initializes the global subscriber with `RUST_LOG` filtering and compact output.
pub fn setup_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_target(false)
        .compact()
        .init();
}
