//! Scheduler trigger: shared-secret auth and the JSON summary response.

use std::sync::Arc;

use chrono::Duration;
use test_fixtures::{fixed_now, make_activity, make_patient, InMemoryStore, ScriptedSender};
use vigil_core::config::{MonitoringConfig, NotificationConfig};
use vigil_core::models::ActivitySource;
use vigil_core::traits::IEngineStore;
use vigil_engine::{ThresholdEvaluator, TickHandler};
use vigil_notify::NotificationDispatcher;

fn handler(secret: Option<&str>) -> (Arc<InMemoryStore>, TickHandler) {
    let store = Arc::new(InMemoryStore::new());
    let sender = Arc::new(ScriptedSender::new());
    let dispatcher = Arc::new(NotificationDispatcher::new(
        Arc::clone(&store) as Arc<dyn IEngineStore>,
        sender as _,
        NotificationConfig::default(),
    ));
    let evaluator = ThresholdEvaluator::new(
        Arc::clone(&store) as Arc<dyn IEngineStore>,
        dispatcher,
        MonitoringConfig {
            soft_threshold_secs: 30,
            escalation_window_secs: 60,
            ..Default::default()
        },
    );
    (store, TickHandler::new(evaluator, secret.map(str::to_string)))
}

#[test]
fn wrong_or_missing_secret_is_rejected_before_processing() {
    let (store, handler) = handler(Some("s3cret"));
    let t0 = fixed_now();
    store.put_patient(&make_patient("p1")).unwrap();
    store
        .append_activity(&make_activity("p1", ActivitySource::Sensor, t0))
        .unwrap();

    let tick_at = t0 + Duration::seconds(31);
    assert_eq!(handler.handle(None, tick_at).unwrap_err().kind(), "auth");
    assert_eq!(
        handler.handle(Some("wrong"), tick_at).unwrap_err().kind(),
        "auth"
    );
    // Nothing ran.
    assert!(store.all_alerts().is_empty());

    let summary = handler.handle(Some("s3cret"), tick_at).unwrap();
    assert_eq!(summary.alerts_created, 1);
}

#[test]
fn no_configured_secret_disables_the_check() {
    let (_store, handler) = handler(None);
    let summary = handler.handle(None, fixed_now()).unwrap();
    assert_eq!(summary.alerts_created, 0);
}

#[test]
fn summary_serializes_with_stable_field_names() {
    let (store, handler) = handler(None);
    let t0 = fixed_now();
    store.put_patient(&make_patient("p1")).unwrap();
    store
        .append_activity(&make_activity("p1", ActivitySource::Sensor, t0))
        .unwrap();

    let summary = handler.handle(None, t0 + Duration::seconds(31)).unwrap();
    let body = serde_json::to_value(&summary).unwrap();

    assert_eq!(body["alerts_created"], 1);
    assert_eq!(body["check_ins_sent"], 1);
    assert_eq!(body["escalations_sent"], 0);
    assert!(body["errors"].as_array().unwrap().is_empty());
}

#[test]
fn handler_accumulates_tick_metrics() {
    let (store, handler) = handler(None);
    let t0 = fixed_now();
    store.put_patient(&make_patient("p1")).unwrap();
    store
        .append_activity(&make_activity("p1", ActivitySource::Sensor, t0))
        .unwrap();

    handler.handle(None, t0 + Duration::seconds(31)).unwrap();
    handler.handle(None, t0 + Duration::seconds(45)).unwrap();

    let totals = handler.metrics_totals();
    assert_eq!(totals.ticks, 2);
    assert_eq!(totals.alerts_created, 1);
}
