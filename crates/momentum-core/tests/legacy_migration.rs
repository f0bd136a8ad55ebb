//! Records written by older clients load into a working application.

use chrono::{TimeZone, Utc};
use momentum_core::storage::{keys, migrations};
use momentum_core::{
    App, Database, ExceptionRuleType, Judgment, KvStore, ManualClock, NoopNotifier, SessionState,
    Store,
};

const LEGACY_CHAINS: &str = r#"[{
    "id": "c1",
    "name": "Morning pages",
    "trigger": "coffee poured",
    "duration": 20,
    "description": "",
    "currentStreak": 6,
    "totalCompletions": 6,
    "totalFailures": 0,
    "exceptions": ["bathroom break", "doorbell"],
    "auxiliarySignal": "open notebook",
    "auxiliaryDuration": 10,
    "auxiliaryCompletionTrigger": "coffee poured",
    "createdAt": "2023-11-02T07:00:00.000Z",
    "lastCompletedAt": "2024-04-30T07:25:00.000Z"
}]"#;

const LEGACY_ACTIVE: &str = r#"{
    "chainId": "c1",
    "startedAt": "2024-05-01T07:00:00.000Z",
    "duration": 20,
    "isPaused": false,
    "totalPausedTime": 0
}"#;

const LEGACY_HISTORY: &str = r#"[{
    "chainId": "c1",
    "completedAt": "2024-04-30T07:25:00.000Z",
    "duration": 20,
    "wasSuccessful": true
}]"#;

fn legacy_database() -> Database {
    let db = Database::open_memory().unwrap();
    // A store written before schema versioning existed.
    db.kv_delete(keys::SCHEMA_VERSION).unwrap();
    db.kv_set(keys::CHAINS, LEGACY_CHAINS).unwrap();
    db.kv_set(keys::ACTIVE_SESSION, LEGACY_ACTIVE).unwrap();
    db.kv_set(keys::COMPLETION_HISTORY, LEGACY_HISTORY).unwrap();
    db
}

#[test]
fn legacy_records_read_in_canonical_shape() {
    let db = legacy_database();

    let chains = db.get_chains().unwrap();
    let chain = &chains[0];
    assert_eq!(chain.current_streak, 6);
    assert_eq!(chain.auxiliary_streak, 0);
    assert_eq!(chain.auxiliary_failures, 0);
    assert!(chain.auxiliary_exceptions.is_empty());
    let descriptions: Vec<&str> = chain
        .exceptions
        .iter()
        .map(|r| r.description.as_str())
        .collect();
    assert_eq!(descriptions, ["bathroom break", "doorbell"]);
    assert!(chain
        .exceptions
        .iter()
        .all(|r| r.rule_type == ExceptionRuleType::Normal && r.id.starts_with("migrated_")));

    let active = db.get_active_session().unwrap().unwrap();
    assert_eq!(active.original_duration_min(), 20);
    assert!(active.rule_effects().is_empty());

    let history = db.get_completion_history().unwrap();
    assert_eq!(history[0].actual_focus_time, 1200);
    assert!(!history[0].is_early_complete);
}

#[test]
fn migrate_pins_migrated_rule_ids() {
    let db = legacy_database();
    assert_eq!(migrations::migrate(&db).unwrap(), migrations::SCHEMA_VERSION);

    let first = db.get_chains().unwrap();
    let second = db.get_chains().unwrap();
    assert_eq!(first[0].exceptions[0].id, second[0].exceptions[0].id);
}

#[test]
fn legacy_session_can_be_judged_against_migrated_rule() {
    let db = legacy_database();
    migrations::migrate(&db).unwrap();

    let clock = ManualClock::new(Utc.with_ymd_and_hms(2024, 5, 1, 7, 5, 0).unwrap());
    let mut app = App::load(db, clock, NoopNotifier).unwrap();
    assert_eq!(app.state(), SessionState::Running);
    assert_eq!(app.remaining_secs(), Some(15 * 60));

    let events = app
        .judge(Judgment::describe("doorbell", ExceptionRuleType::Pause))
        .unwrap();
    // The migrated rule is reused, keeping its `normal` type.
    assert_eq!(events.len(), 1);
    assert_eq!(app.chain("c1").unwrap().exceptions.len(), 2);
    assert_eq!(app.active_session().unwrap().rule_effects().len(), 1);

    app.clock().advance_mins(15);
    app.tick().unwrap().unwrap();
    let chain = app.chain("c1").unwrap();
    assert_eq!(chain.current_streak, 7);
    assert_eq!(app.history().len(), 2);
}
