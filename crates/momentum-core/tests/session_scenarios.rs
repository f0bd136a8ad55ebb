//! End-to-end session scenarios.
//!
//! Each test drives [`App`] the way a front end would: a manual clock stands
//! in for wall time and every notification is recorded.

use chrono::{DateTime, TimeZone, Utc};
use momentum_core::{
    App, AuxiliaryJudgment, ChainDraft, Event, ExceptionRuleType, Judgment, ManualClock,
    MemoryStore, RecordingNotifier, SessionState, Store,
};

type TestApp = App<MemoryStore, ManualClock, RecordingNotifier>;

fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 5, 1, 9, 0, 0).unwrap()
}

fn draft(duration: u32) -> ChainDraft {
    ChainDraft {
        name: "Deep work".into(),
        trigger: "put on headphones".into(),
        duration,
        auxiliary_signal: "snap fingers".into(),
        auxiliary_duration: 15,
        auxiliary_completion_trigger: "put on headphones".into(),
        ..ChainDraft::default()
    }
}

fn setup(duration: u32) -> (TestApp, String) {
    let mut app = App::load(
        MemoryStore::new(),
        ManualClock::new(t0()),
        RecordingNotifier::new(),
    )
    .unwrap();
    let id = app.create_chain(draft(duration)).unwrap().unwrap();
    (app, id)
}

#[test]
fn scenario_a_focus_time_excludes_pause() {
    let (mut app, id) = setup(25);
    app.start(&id).unwrap().unwrap();
    app.pause().unwrap().unwrap();
    app.clock().advance_ms(300_000);
    app.resume().unwrap().unwrap();
    assert_eq!(app.active_session().unwrap().total_paused_ms(), 300_000);

    app.clock().advance_ms(25 * 60_000 + 5_000 - 300_000);
    let event = app.complete().unwrap().unwrap();

    match event {
        Event::SessionCompleted {
            actual_focus_secs,
            current_streak,
            early,
            ..
        } => {
            assert_eq!(actual_focus_secs, 1505 - 300);
            assert_eq!(current_streak, 1);
            assert!(!early);
        }
        other => panic!("unexpected event {other:?}"),
    }
    let record = &app.history()[0];
    assert!(record.was_successful);
    assert_eq!(record.duration, 25);
    assert_eq!(record.actual_focus_time, 1205);
}

#[test]
fn scenario_a_completion_is_due_after_the_pause_shift() {
    let (mut app, id) = setup(25);
    app.start(&id).unwrap();
    app.pause().unwrap();
    app.clock().advance_mins(5);
    app.resume().unwrap();

    app.clock().advance_mins(25);
    app.clock().advance_ms(-1);
    assert!(app.tick().unwrap().is_none());
    assert_eq!(app.remaining_secs(), Some(1));

    app.clock().advance_ms(1);
    let event = app.tick().unwrap().unwrap();
    assert!(matches!(
        event,
        Event::SessionCompleted {
            actual_focus_secs: 1500,
            current_streak: 1,
            ..
        }
    ));
    assert_eq!(
        app.notifier().titles(),
        vec!["Chain completed".to_string()]
    );
}

#[test]
fn scenario_b_reported_pause_creates_rule() {
    let (mut app, id) = setup(25);
    app.start(&id).unwrap();
    app.clock().advance_mins(4);

    let events = app
        .judge(Judgment::describe("checked phone", ExceptionRuleType::Pause))
        .unwrap();

    assert!(matches!(events[0], Event::RuleApplied { created: true, .. }));
    assert!(matches!(events[1], Event::SessionPaused { .. }));
    let chain = app.chain(&id).unwrap();
    assert_eq!(chain.exceptions.len(), 1);
    assert_eq!(chain.exceptions[0].rule_type, ExceptionRuleType::Pause);
    assert_eq!(chain.current_streak, 0);
    assert_eq!(app.state(), SessionState::Paused);
    assert!(app.active_session().unwrap().is_paused());
    assert_eq!(app.notifier().titles(), vec!["Session paused".to_string()]);

    // The new rule is already durable.
    let stored = app.store().get_chains().unwrap();
    assert_eq!(stored[0].exceptions.len(), 1);
}

#[test]
fn scenario_c_repeated_report_reuses_rule() {
    let (mut app, id) = setup(25);
    app.start(&id).unwrap();
    app.judge(Judgment::describe("checked phone", ExceptionRuleType::Pause))
        .unwrap();
    app.clock().advance_mins(2);
    app.resume().unwrap();
    app.clock().advance_mins(3);

    let events = app
        .judge(Judgment::describe("checked phone", ExceptionRuleType::Normal))
        .unwrap();

    assert!(matches!(events[0], Event::RuleApplied { created: false, .. }));
    assert!(matches!(events[1], Event::SessionPaused { .. }));
    let chain = app.chain(&id).unwrap();
    assert_eq!(chain.exceptions.len(), 1);
    assert_eq!(chain.exceptions[0].rule_type, ExceptionRuleType::Pause);
    let effects = app.active_session().unwrap().rule_effects();
    assert_eq!(effects.len(), 2);
    assert_eq!(effects[0].time_impact, Some(-120));
}

#[test]
fn scenario_c_existing_rule_by_id() {
    let (mut app, id) = setup(25);
    let rule = app
        .add_rule(&id, "checked phone", ExceptionRuleType::Pause, None)
        .unwrap()
        .unwrap();
    app.start(&id).unwrap();
    let events = app.judge(Judgment::existing(rule.rule.id.clone())).unwrap();
    assert!(matches!(
        &events[0],
        Event::RuleApplied { rule_id, created: false, .. } if *rule_id == rule.rule.id
    ));
    assert_eq!(app.chain(&id).unwrap().exceptions.len(), 1);
}

#[test]
fn scenario_d_unattended_expiry_fails_precommitment() {
    let (mut app, id) = setup(25);
    app.schedule_chain(&id).unwrap().unwrap();
    app.schedule_chain(&id).unwrap();
    assert_eq!(app.chain(&id).unwrap().auxiliary_streak, 1);

    app.clock().advance_mins(16);
    let expired = app.sweep_expired_schedules();
    assert_eq!(expired.len(), 1);
    assert!(matches!(&expired[0], Event::ScheduleExpired { chain_id, .. } if *chain_id == id));

    let verdict = app
        .judge_auxiliary(
            &id,
            AuxiliaryJudgment::Fail {
                reason: "missed the window".into(),
            },
        )
        .unwrap()
        .unwrap();
    assert!(matches!(verdict, Event::AuxiliaryJudged { allowed: false, .. }));

    let chain = app.chain(&id).unwrap();
    assert_eq!(chain.auxiliary_streak, 0);
    assert_eq!(chain.auxiliary_failures, 1);
    assert!(app.history().is_empty());
    assert!(app.scheduled_sessions().is_empty());
    assert!(app.pending_auxiliary_judgments().is_empty());
    assert!(app.store().get_scheduled_sessions().unwrap().is_empty());
    assert_eq!(app.store().get_chains().unwrap()[0].auxiliary_failures, 1);
}

#[test]
fn scenario_e_extend_rule_adds_ten_minutes() {
    let (mut app, id) = setup(25);
    app.add_rule(&id, "overran", ExceptionRuleType::ExtendTime, Some(10))
        .unwrap();
    app.start(&id).unwrap();
    app.clock().advance_mins(20);
    let before = app.remaining_secs().unwrap();

    let events = app
        .judge(Judgment::describe("overran", ExceptionRuleType::ExtendTime))
        .unwrap();

    assert!(matches!(
        events[1],
        Event::SessionExtended {
            added_min: 10,
            duration_min: 35,
            ..
        }
    ));
    assert_eq!(app.remaining_secs().unwrap(), before + 600);
    let session = app.active_session().unwrap();
    assert_eq!(session.duration_min(), 35);
    assert_eq!(session.original_duration_min(), 25);
    assert_eq!(session.rule_effects().len(), 1);
    assert_eq!(session.rule_effects()[0].time_impact, Some(600));
    assert_eq!(app.notifier().titles(), vec!["Time extended".to_string()]);

    app.clock().advance_mins(15);
    app.tick().unwrap().unwrap();
    let record = &app.history()[0];
    assert_eq!(record.duration, 25);
    assert_eq!(record.actual_focus_time, 35 * 60);
    assert_eq!(record.rule_effects[0].rule_type, ExceptionRuleType::ExtendTime);
}

#[test]
fn failure_judgment_breaks_the_chain() {
    let (mut app, id) = setup(25);
    app.start(&id).unwrap();
    app.clock().advance_mins(25);
    app.complete().unwrap();
    app.schedule_chain(&id).unwrap();
    app.start(&id).unwrap();
    app.clock().advance_secs(42);

    let event = app.judge_failure(Some("opened social media")).unwrap().unwrap();
    assert!(matches!(
        event,
        Event::SessionInterrupted { actual_focus_secs: 42, .. }
    ));
    let chain = app.chain(&id).unwrap();
    assert_eq!(chain.current_streak, 0);
    assert_eq!(chain.auxiliary_streak, 0);
    assert_eq!(chain.total_completions, 0);
    assert!(chain.last_completed_at.is_none());
    let last = app.history().last().unwrap();
    assert!(!last.was_successful);
    assert_eq!(last.reason_for_failure.as_deref(), Some("opened social media"));
}

#[test]
fn state_survives_restart_mid_session() {
    let (mut app, id) = setup(25);
    app.start(&id).unwrap();
    app.judge(Judgment::describe("checked phone", ExceptionRuleType::Pause))
        .unwrap();

    let store = MemoryStore::new();
    store.save_chains(app.chains()).unwrap();
    store.save_active_session(app.active_session()).unwrap();

    let clock = ManualClock::new(t0());
    clock.advance_mins(10);
    let mut restarted = App::load(store, clock, RecordingNotifier::new()).unwrap();
    assert_eq!(restarted.state(), SessionState::Paused);
    restarted.resume().unwrap().unwrap();
    assert_eq!(
        restarted.active_session().unwrap().rule_effects()[0].time_impact,
        Some(-600)
    );
    assert_eq!(restarted.remaining_secs(), Some(25 * 60));
}
