//! Ledger properties over arbitrary chain counters.

use chrono::{DateTime, TimeZone, Utc};
use momentum_core::{
    App, Chain, ChainDraft, ExceptionRuleType, ManualClock, MemoryStore, NoopNotifier, Store,
};
use proptest::prelude::*;

type TestApp = App<MemoryStore, ManualClock, NoopNotifier>;

fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 5, 1, 9, 0, 0).unwrap()
}

/// An app holding one chain with the given counters.
fn app_with_counters(streak: u32, aux_streak: u32, completions: u32, failures: u32) -> TestApp {
    let draft = ChainDraft {
        name: "Deep work".into(),
        duration: 25,
        auxiliary_duration: 15,
        ..ChainDraft::default()
    };
    let mut chain = Chain::new("c1", draft, t0());
    chain.current_streak = streak;
    chain.auxiliary_streak = aux_streak;
    chain.total_completions = completions;
    chain.total_failures = failures;

    let store = MemoryStore::new();
    store.save_chains(&[chain]).unwrap();
    App::load(store, ManualClock::new(t0()), NoopNotifier).unwrap()
}

proptest! {
    #[test]
    fn completion_increments_streak(
        streak in 0u32..10_000,
        completions in 0u32..10_000,
        elapsed_secs in 0i64..10_000,
    ) {
        let mut app = app_with_counters(streak, 0, completions, 0);
        app.start("c1").unwrap();
        app.clock().advance_secs(elapsed_secs);
        app.complete().unwrap();

        let chain = app.chain("c1").unwrap();
        prop_assert_eq!(chain.current_streak, streak + 1);
        prop_assert_eq!(chain.total_completions, completions + 1);
        prop_assert_eq!(app.history().len(), 1);
        prop_assert!(app.history()[0].was_successful);
        prop_assert_eq!(app.history()[0].actual_focus_time, elapsed_secs as u64);
    }

    #[test]
    fn interruption_resets_all_counters(
        streak in 0u32..10_000,
        aux_streak in 0u32..10_000,
        completions in 0u32..10_000,
        failures in 0u32..10_000,
    ) {
        let mut app = app_with_counters(streak, aux_streak, completions, failures);
        app.start("c1").unwrap();
        app.clock().advance_secs(30);
        app.interrupt(None).unwrap();

        let chain = app.chain("c1").unwrap();
        prop_assert_eq!(
            (chain.current_streak, chain.auxiliary_streak, chain.total_completions, chain.total_failures),
            (0, 0, 0, 0)
        );
        prop_assert_eq!(app.history().len(), 1);
        prop_assert!(!app.history()[0].was_successful);
        prop_assert_eq!(
            app.history()[0].reason_for_failure.as_deref(),
            Some("Interrupted by user")
        );
    }

    #[test]
    fn cancel_is_invisible(
        streak in 0u32..10_000,
        completions in 0u32..10_000,
        elapsed_secs in 0i64..10_000,
    ) {
        let mut app = app_with_counters(streak, 3, completions, 2);
        let before = app.chain("c1").unwrap().clone();
        app.start("c1").unwrap();
        app.clock().advance_secs(elapsed_secs);
        app.cancel().unwrap();

        prop_assert_eq!(app.chain("c1").unwrap(), &before);
        prop_assert!(app.history().is_empty());
        prop_assert!(app.active_session().is_none());
        prop_assert!(app.store().get_active_session().unwrap().is_none());
        prop_assert!(app.store().get_completion_history().unwrap().is_empty());
    }

    #[test]
    fn rules_never_duplicate(
        description in "[a-z]{1,12}",
        left in " {0,3}",
        right in " {0,3}",
        type_index in 0usize..5,
    ) {
        let mut app = app_with_counters(0, 0, 0, 0);
        let rule_type = ExceptionRuleType::ALL[type_index];
        let first = app
            .add_rule("c1", &description, rule_type, Some(5))
            .unwrap()
            .unwrap();
        let padded = format!("{left}{description}{right}");
        let second = app
            .add_rule("c1", &padded, ExceptionRuleType::Normal, None)
            .unwrap()
            .unwrap();

        prop_assert!(first.created);
        prop_assert!(!second.created);
        prop_assert_eq!(&second.rule.id, &first.rule.id);
        prop_assert_eq!(app.chain("c1").unwrap().exceptions.len(), 1);
    }
}
