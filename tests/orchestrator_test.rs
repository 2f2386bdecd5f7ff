use actor_host::mock::MockStore;
use actor_host::{HostConfig, HostError, ManualClock, StateStore};
use async_trait::async_trait;
use chrono::{DateTime, Duration as ChronoDuration, TimeZone, Utc};
use integration_sync::lifecycle::SyncSystem;
use integration_sync::mock::{CallLog, ScriptedIntegration};
use integration_sync::{
    AdapterError, ConfigurationError, EntityState, Integration, IntegrationRecord,
    IntegrationState, Orchestrator, OrchestratorConfig, Phase, SyncError, SyncStatus,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

const KEY: &str = "lead-1";

fn start_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap()
}

struct Harness {
    system: SyncSystem<String>,
    store: MockStore<EntityState<String>>,
    clock: ManualClock,
}

fn start_with(
    integrations: &[ScriptedIntegration],
    config: OrchestratorConfig,
    store: MockStore<EntityState<String>>,
) -> Harness {
    let mut builder = Orchestrator::<String>::builder().with_config(config);
    for integration in integrations {
        builder = builder.with_integration(integration.clone());
    }
    let orchestrator = builder.build().unwrap();
    let clock = ManualClock::new(start_time());
    let system = SyncSystem::start_with_clock(
        orchestrator,
        Arc::new(store.clone()),
        Arc::new(clock.clone()),
        &HostConfig::default(),
    );
    Harness {
        system,
        store,
        clock,
    }
}

fn start(integrations: &[ScriptedIntegration]) -> Harness {
    start_with(integrations, OrchestratorConfig::default(), MockStore::new())
}

fn trio() -> [ScriptedIntegration; 3] {
    [
        ScriptedIntegration::new("a"),
        ScriptedIntegration::new("b"),
        ScriptedIntegration::new("c"),
    ]
}

/// Typed counterpart to the scripted mock: counts its own create/sync calls.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
struct Counter {
    count: u32,
}

struct CounterIntegration;

#[async_trait]
impl Integration<String> for CounterIntegration {
    type Data = Counter;

    fn name(&self) -> &str {
        "counter"
    }

    async fn create(
        &self,
        mut state: IntegrationState<Counter>,
        _domain: &String,
    ) -> Result<IntegrationState<Counter>, AdapterError> {
        state.data.count += 1;
        Ok(state.with_status(SyncStatus::Synced))
    }

    async fn sync(
        &self,
        state: IntegrationState<Counter>,
        domain: &String,
    ) -> Result<IntegrationState<Counter>, AdapterError> {
        tokio::task::yield_now().await;
        self.create(state, domain).await
    }

    async fn close(
        &self,
        state: IntegrationState<Counter>,
        _domain: &String,
    ) -> Result<IntegrationState<Counter>, AdapterError> {
        Ok(state)
    }
}

#[tokio::test]
async fn test_happy_path_syncs_every_integration_with_one_write() {
    let integrations = trio();
    let h = start(&integrations);

    let outcome = h
        .system
        .client
        .run_lifecycle_with(Phase::Create, KEY, "Ada".to_string())
        .await
        .unwrap();

    assert!(outcome.is_clean());
    assert_eq!(outcome.entity.integrations.len(), 3);
    for record in outcome.entity.integrations.values() {
        assert_eq!(record.status, SyncStatus::Synced);
        assert_eq!(record.last_synced, Some(start_time()));
        assert_eq!(record.error, None);
    }
    assert_eq!(h.store.store_count(), 1);
    for integration in &integrations {
        integration.verify();
    }

    h.system.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_failures_are_isolated_and_reported() {
    let [a, b, c] = trio();
    b.expect_create()
        .return_err(AdapterError::Transport("connection reset".into()));
    c.expect_create().panic("kaboom");
    let h = start(&[a.clone(), b.clone(), c.clone()]);

    let outcome = h
        .system
        .client
        .run_lifecycle_with(Phase::Create, KEY, "Ada".to_string())
        .await
        .unwrap();

    assert_eq!(outcome.failed_integrations, vec!["b", "c"]);
    assert_eq!(outcome.entity.failing(), vec!["b", "c"]);
    assert_eq!(outcome.entity.integrations["a"].status, SyncStatus::Synced);

    let b_record = &outcome.entity.integrations["b"];
    assert_eq!(b_record.status, SyncStatus::Error);
    let b_error = b_record.error.as_ref().unwrap();
    assert_eq!(b_error.message, "Transport error: connection reset");
    assert_eq!(b_error.error_date, start_time());
    assert_eq!(b_record.last_synced, None);

    let c_record = &outcome.entity.integrations["c"];
    assert_eq!(c_record.status, SyncStatus::Error);
    assert_eq!(
        c_record.error.as_ref().unwrap().message,
        "Adapter panicked: kaboom"
    );

    // The stored container matches what the caller saw.
    let (key, stored) = h.store.writes().pop().unwrap();
    assert_eq!(key, KEY);
    assert_eq!(stored, outcome.entity);
    b.verify();
    c.verify();

    h.system.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_failed_integration_recovers_on_a_later_pass() {
    let [a, b, c] = trio();
    b.expect_create()
        .return_err(AdapterError::Remote("rate limited".into()));
    let h = start(&[a.clone(), b.clone(), c.clone()]);
    let client = h.system.client.clone();

    let first = client
        .run_lifecycle_with(Phase::Create, KEY, "Ada".to_string())
        .await
        .unwrap();
    assert_eq!(first.failed_integrations, vec!["b"]);

    h.clock.advance(ChronoDuration::minutes(5));
    let second = client.run_lifecycle(Phase::Create, KEY).await.unwrap();

    assert!(second.failed_integrations.is_empty());
    let b_record = &second.entity.integrations["b"];
    assert_eq!(b_record.status, SyncStatus::Synced);
    assert_eq!(b_record.error, None);
    assert_eq!(
        b_record.last_synced,
        Some(start_time() + ChronoDuration::minutes(5))
    );
    // Already synced integrations are not created twice.
    assert_eq!(a.call_count(Phase::Create), 1);
    assert_eq!(b.call_count(Phase::Create), 2);
    assert_eq!(
        second.entity.integrations["a"],
        first.entity.integrations["a"]
    );

    drop(client);
    h.system.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_should_run_false_leaves_record_untouched() {
    let [a, b, c] = trio();
    b.skip(true);
    let h = start(&[a.clone(), b.clone(), c.clone()]);

    let outcome = h
        .system
        .client
        .run_lifecycle_with(Phase::Create, KEY, "Ada".to_string())
        .await
        .unwrap();

    assert!(outcome.is_clean());
    assert!(b.calls().is_empty());
    assert_eq!(
        outcome.entity.integrations["b"],
        IntegrationRecord::default()
    );
    assert_eq!(outcome.entity.integrations["c"].status, SyncStatus::Synced);

    h.system.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_panicking_should_run_is_a_configuration_error() {
    let [a, b, c] = trio();
    b.panic_in_should_run(true);
    let h = start(&[a.clone(), b.clone(), c.clone()]);

    let outcome = h
        .system
        .client
        .run_lifecycle_with(Phase::Create, KEY, "Ada".to_string())
        .await
        .unwrap();

    assert!(outcome.failed_integrations.is_empty());
    assert_eq!(outcome.configuration_errors.len(), 1);
    assert!(matches!(
        &outcome.configuration_errors[0],
        ConfigurationError::ShouldRunPanicked { integration, .. } if integration == "b"
    ));
    assert_eq!(outcome.entity.integrations["b"].status, SyncStatus::NotSynced);
    assert_eq!(outcome.entity.integrations["c"].status, SyncStatus::Synced);

    h.system.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_close_is_idempotent() {
    let integrations = trio();
    let h = start(&integrations);
    let client = h.system.client.clone();

    client
        .run_lifecycle_with(Phase::Create, KEY, "Ada".to_string())
        .await
        .unwrap();
    let first = client.run_lifecycle(Phase::Close, KEY).await.unwrap();
    h.clock.advance(ChronoDuration::hours(1));
    let second = client.run_lifecycle(Phase::Close, KEY).await.unwrap();

    for record in first.entity.integrations.values() {
        assert_eq!(record.status, SyncStatus::Closed);
    }
    assert_eq!(first.entity, second.entity);
    for integration in &integrations {
        assert_eq!(integration.call_count(Phase::Close), 1);
    }

    // Closed records ignore every later phase.
    let third = client.run_lifecycle(Phase::Sync, KEY).await.unwrap();
    assert_eq!(third.entity, first.entity);
    for integration in &integrations {
        assert_eq!(integration.call_count(Phase::Sync), 0);
    }

    drop(client);
    h.system.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_close_of_unprovisioned_record_creates_first() {
    let a = ScriptedIntegration::new("a");
    let h = start(&[a.clone()]);

    let outcome = h
        .system
        .client
        .run_lifecycle_with(Phase::Close, KEY, "Ada".to_string())
        .await
        .unwrap();

    assert_eq!(a.calls(), vec![Phase::Create, Phase::Close]);
    assert_eq!(outcome.entity.integrations["a"].status, SyncStatus::Closed);

    h.system.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_failed_close_is_retried() {
    let a = ScriptedIntegration::new("a");
    a.expect_close()
        .return_err(AdapterError::Transport("offline".into()));
    let h = start(&[a.clone()]);
    let client = h.system.client.clone();

    client
        .run_lifecycle_with(Phase::Create, KEY, "Ada".to_string())
        .await
        .unwrap();
    let failed = client.run_lifecycle(Phase::Close, KEY).await.unwrap();
    assert_eq!(failed.failed_integrations, vec!["a"]);
    assert_eq!(failed.entity.integrations["a"].status, SyncStatus::Error);

    let closed = client.run_lifecycle(Phase::Close, KEY).await.unwrap();
    assert!(closed.is_clean());
    assert_eq!(closed.entity.integrations["a"].status, SyncStatus::Closed);
    assert_eq!(closed.entity.integrations["a"].error, None);

    drop(client);
    h.system.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_error_status_without_details_gets_error_info() {
    let a = ScriptedIntegration::new("a");
    a.expect_create()
        .return_ok(SyncStatus::Error, json!({ "attempt": 1 }));
    let h = start(&[a.clone()]);

    let outcome = h
        .system
        .client
        .run_lifecycle_with(Phase::Create, KEY, "Ada".to_string())
        .await
        .unwrap();

    let record = &outcome.entity.integrations["a"];
    assert_eq!(outcome.failed_integrations, vec!["a"]);
    assert_eq!(record.data, json!({ "attempt": 1 }));
    assert_eq!(
        record.error.as_ref().unwrap().message,
        "create reported failure"
    );

    h.system.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_status_never_regresses() {
    let a = ScriptedIntegration::new("a");
    a.expect_sync()
        .return_err(AdapterError::Remote("conflict".into()));
    let h = start(&[a.clone()]);
    let client = h.system.client.clone();

    client
        .run_lifecycle_with(Phase::Create, KEY, "Ada".to_string())
        .await
        .unwrap();
    client.run_lifecycle(Phase::Sync, KEY).await.unwrap();
    client.run_lifecycle(Phase::Sync, KEY).await.unwrap();
    client.run_lifecycle(Phase::Close, KEY).await.unwrap();
    client.run_lifecycle(Phase::Create, KEY).await.unwrap();
    client.run_lifecycle(Phase::Sync, KEY).await.unwrap();

    let history: Vec<SyncStatus> = h
        .store
        .writes()
        .into_iter()
        .map(|(_, entity)| entity.integrations["a"].status)
        .collect();
    assert_eq!(
        history,
        vec![
            SyncStatus::Synced,
            SyncStatus::Error,
            SyncStatus::Synced,
            SyncStatus::Closed,
            SyncStatus::Closed,
            SyncStatus::Closed,
        ]
    );

    drop(client);
    h.system.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_create_and_sync_cannot_report_not_synced_or_closed() {
    let a = ScriptedIntegration::new("a");
    let b = ScriptedIntegration::new("b");
    a.expect_create()
        .return_ok(SyncStatus::Synced, json!({ "remote": "a-1" }));
    a.expect_sync()
        .return_ok(SyncStatus::NotSynced, json!(null));
    b.expect_create()
        .return_ok(SyncStatus::Synced, json!({ "remote": "b-1" }));
    b.expect_sync().return_ok(SyncStatus::Closed, json!(null));
    let h = start(&[a.clone(), b.clone()]);
    let client = h.system.client.clone();

    client
        .run_lifecycle_with(Phase::Create, KEY, "Ada".to_string())
        .await
        .unwrap();
    h.clock.advance(ChronoDuration::minutes(1));
    let outcome = client.run_lifecycle(Phase::Sync, KEY).await.unwrap();

    assert_eq!(outcome.failed_integrations, vec!["a", "b"]);
    for (name, status) in [("a", "NOT_SYNCED"), ("b", "CLOSED")] {
        let record = &outcome.entity.integrations[name];
        assert_eq!(record.status, SyncStatus::Error);
        assert_eq!(record.data, json!({ "remote": format!("{name}-1") }));
        assert_eq!(record.last_synced, Some(start_time()));
        let error = record.error.as_ref().unwrap();
        assert_eq!(error.message, format!("sync returned illegal status {status}"));
        assert_eq!(error.error_date, start_time() + ChronoDuration::minutes(1));
    }

    // The errored records are still open, so a later sync recovers them.
    let recovered = client.run_lifecycle(Phase::Sync, KEY).await.unwrap();
    assert!(recovered.is_clean());
    assert_eq!(recovered.entity.integrations["b"].status, SyncStatus::Synced);
    a.verify();
    b.verify();

    drop(client);
    h.system.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_panicking_projection_keeps_the_pass() {
    let bad = ScriptedIntegration::new("bad");
    let good = ScriptedIntegration::new("good");
    bad.panic_in_project(true);
    let h = start(&[bad.clone(), good.clone()]);
    let client = h.system.client.clone();

    let outcome = client
        .run_lifecycle_with(Phase::Create, KEY, "Ada".to_string())
        .await
        .unwrap();

    assert!(outcome.failed_integrations.is_empty());
    assert!(matches!(
        &outcome.configuration_errors[..],
        [ConfigurationError::ProjectPanicked { integration, .. }] if integration == "bad"
    ));
    assert_eq!(outcome.entity.domain, "Ada");
    assert_eq!(outcome.entity.integrations["bad"].status, SyncStatus::Synced);
    assert_eq!(outcome.entity.integrations["good"].status, SyncStatus::Synced);
    assert_eq!(h.store.writes().pop().unwrap().1, outcome.entity);

    // The key's worker survived and serves the next pass.
    bad.panic_in_project(false);
    let next = client.run_lifecycle(Phase::Sync, KEY).await.unwrap();
    assert!(next.is_clean());

    drop(client);
    h.system.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_panicking_default_state_sits_out_the_pass() {
    let late = ScriptedIntegration::new("late");
    let other = ScriptedIntegration::new("other");
    late.panic_in_default_state(true);
    let h = start(&[late.clone(), other.clone()]);
    let client = h.system.client.clone();

    let outcome = client
        .run_lifecycle_with(Phase::Create, KEY, "Ada".to_string())
        .await
        .unwrap();

    assert!(matches!(
        &outcome.configuration_errors[..],
        [ConfigurationError::DefaultState { integration, .. }] if integration == "late"
    ));
    assert!(!outcome.entity.integrations.contains_key("late"));
    assert_eq!(outcome.entity.integrations["other"].status, SyncStatus::Synced);
    assert!(late.calls().is_empty());

    late.panic_in_default_state(false);
    let next = client.run_lifecycle(Phase::Create, KEY).await.unwrap();
    assert!(next.is_clean());
    assert_eq!(next.entity.integrations["late"].status, SyncStatus::Synced);

    drop(client);
    h.system.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_merge_is_deterministic() {
    // Same integrations, different configuration order and execution mode, one of them slow.
    let run = |names: [&'static str; 3], concurrent: bool| async move {
        let integrations: Vec<ScriptedIntegration> =
            names.iter().map(|n| ScriptedIntegration::new(*n)).collect();
        for (name, integration) in names.iter().zip(&integrations) {
            if *name == "b" {
                integration
                    .expect_create()
                    .after(Duration::from_millis(30))
                    .return_err(AdapterError::Transport("slow and broken".into()));
            }
        }
        let h = start_with(
            &integrations,
            OrchestratorConfig::default().with_concurrent_adapters(concurrent),
            MockStore::new(),
        );
        let outcome = h
            .system
            .client
            .run_lifecycle_with(Phase::Create, KEY, "Ada".to_string())
            .await
            .unwrap();
        h.system.shutdown().await.unwrap();
        serde_json::to_string(&outcome.entity).unwrap()
    };

    let sequential = run(["a", "b", "c"], false).await;
    let reversed = run(["c", "b", "a"], false).await;
    let concurrent = run(["a", "b", "c"], true).await;

    assert_eq!(sequential, reversed);
    assert_eq!(sequential, concurrent);
}

#[tokio::test]
async fn test_sequential_mode_runs_in_configuration_order() {
    let log: CallLog = Arc::new(Mutex::new(Vec::new()));
    let integrations: Vec<ScriptedIntegration> = ["crm", "messaging", "referral"]
        .into_iter()
        .map(|n| ScriptedIntegration::new(n).with_call_log(log.clone()))
        .collect();
    integrations[0]
        .expect_create()
        .after(Duration::from_millis(20))
        .return_ok(SyncStatus::Synced, json!(null));
    let h = start(&integrations);

    h.system
        .client
        .run_lifecycle_with(Phase::Create, KEY, "Ada".to_string())
        .await
        .unwrap();

    assert_eq!(
        *log.lock().unwrap(),
        vec!["crm:create", "messaging:create", "referral:create"]
    );

    h.system.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_concurrent_mode_overlaps_calls_and_keeps_order() {
    let [a, b, c] = trio();
    a.expect_create()
        .after(Duration::from_millis(200))
        .return_err(AdapterError::Transport("a down".into()));
    b.expect_create()
        .after(Duration::from_millis(200))
        .return_err(AdapterError::Transport("b down".into()));
    c.expect_create()
        .after(Duration::from_millis(200))
        .return_ok(SyncStatus::Synced, json!(null));
    let h = start_with(
        &[a, b, c],
        OrchestratorConfig::default().with_concurrent_adapters(true),
        MockStore::new(),
    );

    let started = Instant::now();
    let outcome = h
        .system
        .client
        .run_lifecycle_with(Phase::Create, KEY, "Ada".to_string())
        .await
        .unwrap();

    assert!(started.elapsed() < Duration::from_millis(500));
    assert_eq!(outcome.failed_integrations, vec!["a", "b"]);
    assert_eq!(h.store.store_count(), 1);

    h.system.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_slow_adapter_times_out() {
    let [a, b, c] = trio();
    b.expect_create()
        .after(Duration::from_secs(10))
        .return_ok(SyncStatus::Synced, json!(null));
    let h = start_with(
        &[a, b, c],
        OrchestratorConfig::default().with_adapter_timeout(Duration::from_millis(50)),
        MockStore::new(),
    );

    let outcome = h
        .system
        .client
        .run_lifecycle_with(Phase::Create, KEY, "Ada".to_string())
        .await
        .unwrap();

    assert_eq!(outcome.failed_integrations, vec!["b"]);
    assert_eq!(
        outcome.entity.integrations["b"].error.as_ref().unwrap().message,
        "Adapter call timed out after 50ms"
    );
    assert_eq!(outcome.entity.integrations["c"].status, SyncStatus::Synced);

    h.system.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_store_failure_persists_nothing() {
    let a = ScriptedIntegration::new("a");
    let h = start(&[a.clone()]);
    let client = h.system.client.clone();

    h.store.fail_stores(true);
    let result = client
        .run_lifecycle_with(Phase::Create, KEY, "Ada".to_string())
        .await;
    assert!(matches!(
        result,
        Err(SyncError::HostUnavailable(HostError::Unavailable(_)))
    ));
    assert!(h.store.writes().is_empty());

    h.store.fail_stores(false);
    assert_eq!(client.entity(KEY).await.unwrap(), None);

    drop(client);
    h.system.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_load_failure_calls_no_adapter() {
    let a = ScriptedIntegration::new("a");
    let h = start(&[a.clone()]);

    h.store.fail_loads(true);
    let result = h
        .system
        .client
        .run_lifecycle_with(Phase::Create, KEY, "Ada".to_string())
        .await;

    assert!(matches!(result, Err(SyncError::HostUnavailable(_))));
    assert!(a.calls().is_empty());

    h.system.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_unknown_entity_and_integration() {
    let a = ScriptedIntegration::new("a");
    let h = start(&[a]);
    let client = h.system.client.clone();

    assert_eq!(
        client.run_lifecycle(Phase::Sync, "ghost").await.unwrap_err(),
        SyncError::UnknownEntity("ghost".into())
    );
    assert_eq!(
        client.integration_status("ghost", "a").await.unwrap_err(),
        SyncError::UnknownEntity("ghost".into())
    );

    client
        .run_lifecycle_with(Phase::Create, KEY, "Ada".to_string())
        .await
        .unwrap();
    assert_eq!(
        client.integration_status(KEY, "a").await.unwrap().status,
        SyncStatus::Synced
    );
    assert_eq!(
        client.integration_status(KEY, "zzz").await.unwrap_err(),
        SyncError::UnknownIntegration {
            key: KEY.into(),
            integration: "zzz".into(),
        }
    );

    drop(client);
    h.system.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_mismatched_record_is_skipped_and_kept() {
    let store = MockStore::<EntityState<String>>::new();
    let mut seeded = EntityState::new(KEY, "Ada".to_string());
    let broken = IntegrationRecord::new(SyncStatus::Synced, json!("not a counter"));
    seeded.integrations.insert("counter".into(), broken.clone());
    seeded
        .integrations
        .insert("retired".into(), IntegrationRecord::default());
    store.store(KEY, &seeded).await.unwrap();

    let a = ScriptedIntegration::new("a");
    let orchestrator = Orchestrator::<String>::builder()
        .with_integration(CounterIntegration)
        .with_integration(a.clone())
        .build()
        .unwrap();
    let system = SyncSystem::start(orchestrator, Arc::new(store.clone()), &HostConfig::default());

    let outcome = system.client.run_lifecycle(Phase::Sync, KEY).await.unwrap();

    assert!(outcome.failed_integrations.is_empty());
    assert!(matches!(
        &outcome.configuration_errors[..],
        [ConfigurationError::ShapeMismatch { integration, .. }] if integration == "counter"
    ));
    assert_eq!(outcome.entity.integrations["counter"], broken);
    assert_eq!(outcome.entity.integrations["a"].status, SyncStatus::Synced);
    // Records of integrations no longer configured are dropped.
    assert!(!outcome.entity.integrations.contains_key("retired"));

    system.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_same_key_passes_are_serialized() {
    let store = MockStore::<EntityState<String>>::new();
    let orchestrator = Orchestrator::<String>::builder()
        .with_integration(CounterIntegration)
        .build()
        .unwrap();
    let system = SyncSystem::start(orchestrator, Arc::new(store.clone()), &HostConfig::default());
    let client = system.client.clone();

    client
        .run_lifecycle_with(Phase::Create, KEY, "Ada".to_string())
        .await
        .unwrap();
    let passes = (0..10).map(|_| {
        let client = client.clone();
        tokio::spawn(async move { client.run_lifecycle(Phase::Sync, KEY).await })
    });
    for pass in futures::future::join_all(passes).await {
        pass.unwrap().unwrap();
    }

    let record = client.integration_status(KEY, "counter").await.unwrap();
    let counter: IntegrationState<Counter> = record.decode().unwrap();
    assert_eq!(counter.data.count, 11);
    assert_eq!(store.store_count(), 11);

    drop(client);
    system.shutdown().await.unwrap();
}

#[test]
fn test_duplicate_names_are_rejected() {
    let result = Orchestrator::<String>::builder()
        .with_integration(ScriptedIntegration::new("a"))
        .with_integration(ScriptedIntegration::new("a"))
        .build();

    assert!(matches!(result, Err(SyncError::DuplicateIntegration(name)) if name == "a"));
}

#[tokio::test]
async fn test_shutdown_reports_typed_errors() {
    let h = start(&trio());
    let client = h.system.client.clone();
    drop(client);

    let result: Result<(), SyncError> = h.system.shutdown().await;
    assert_eq!(result, Ok(()));

    let failed = SyncError::from(HostError::TaskFailed("host panicked".into()));
    assert_eq!(
        failed.to_string(),
        "Host unavailable: Host task failed: host panicked"
    );
}
