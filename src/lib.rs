//! # Integration Sync
//!
//! > **Keeping one entity in step with many external systems.**
//!
//! An entity (a lead, a customer, a subscription) is mirrored into several external systems:
//! a CRM, a messaging provider, a referral partner. Each of those is an [`Integration`]
//! with its own lifecycle (`create`, `sync`, `close`) and its own state record. This crate
//! runs those lifecycles so that one misbehaving integration never holds back the others,
//! and persists the outcome of every pass with a single write.
//!
//! ## 🏗️ Design Philosophy
//!
//! ### Failure isolation
//! Every adapter call runs under a timeout with panics caught. Whatever happens (error,
//! timeout, panic) is recorded in that integration's [`IntegrationState`] as `ERROR` with
//! an [`ErrorInfo`]. The pass always continues with the next integration, and the caller
//! receives the list of integrations that failed.
//!
//! ### Single writer per entity
//! The [`Orchestrator`] is hosted in an [`actor_host::ActorHost`]: passes for the same key
//! run strictly one after the other, passes for different keys run in parallel. The
//! orchestrator itself holds no locks.
//!
//! ### Replace, never patch
//! Adapters receive their current record and return the complete replacement. The
//! orchestrator owns the bookkeeping fields (`last_synced`, `error`, terminal `CLOSED`).
//!
//! ## 🗺️ Module Tour
//!
//! ### 1. The Contract ([`integration`], [`model`])
//! - **Key items**: [`Integration`], [`IntegrationState`], [`SyncStatus`], [`EntityState`].
//!
//! ### 2. The Engine ([`orchestrator`])
//! - **Role**: runs one pass over every configured integration of one entity.
//! - **Key items**: [`Orchestrator`], [`Phase`], [`PassOutcome`].
//!
//! ### 3. The Interface ([`clients`]) and Wiring ([`lifecycle`])
//! - **Key items**: [`SyncClient`](clients::SyncClient), [`SyncSystem`](lifecycle::SyncSystem).
//!
//! ### 4. The Implementations ([`integrations`])
//! CRM, messaging and referral integrations for [`Lead`](integrations::Lead) entities.
//!
//! ## 🚀 Quick Start
//!
//! ```rust
//! use actor_host::{HostConfig, MemoryStore};
//! use integration_sync::lifecycle::SyncSystem;
//! use integration_sync::mock::ScriptedIntegration;
//! use integration_sync::{EntityState, Orchestrator, Phase, SyncStatus};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() {
//!     let orchestrator = Orchestrator::<String>::builder()
//!         .with_integration(ScriptedIntegration::new("crm"))
//!         .build()
//!         .unwrap();
//!     let system = SyncSystem::start(
//!         orchestrator,
//!         Arc::new(MemoryStore::<EntityState<String>>::new()),
//!         &HostConfig::default(),
//!     );
//!
//!     let outcome = system
//!         .client
//!         .run_lifecycle_with(Phase::Create, "lead-1", "Ada".to_string())
//!         .await
//!         .unwrap();
//!     assert!(outcome.failed_integrations.is_empty());
//!
//!     let crm = system.client.integration_status("lead-1", "crm").await.unwrap();
//!     assert_eq!(crm.status, SyncStatus::Synced);
//!
//!     system.shutdown().await.unwrap();
//! }
//! ```
//!
//! ### Running the Demo
//!
//! ```bash
//! # Run with info logs
//! RUST_LOG=info cargo run
//! ```

pub mod clients;
pub mod error;
pub mod integration;
pub mod integrations;
pub mod lifecycle;
pub mod mock;
pub mod model;
pub mod orchestrator;

pub use error::{AdapterError, ConfigurationError, SyncError};
pub use integration::{DomainState, Integration};
pub use model::{EntityState, ErrorInfo, IntegrationRecord, IntegrationState, SyncStatus};
pub use orchestrator::{
    Orchestrator, OrchestratorBuilder, OrchestratorConfig, PassOutcome, Phase, SyncRequest,
};
