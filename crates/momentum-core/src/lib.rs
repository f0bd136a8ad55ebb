//! # Momentum Core Library
//!
//! Core business logic for Momentum, a habit tracker built on a "chain"
//! metaphor: every habit is a streak counter gated by a timed focus session,
//! with an optional pre-commitment (scheduled) phase and a rule-based
//! exception mechanism deciding what breaks a streak.
//!
//! ## Architecture
//!
//! - **Session state machine**: a wall-clock-based machine driven by the
//!   caller. Nothing runs in the background; `tick()` is a pure query and the
//!   caller completes the session once the remaining time reaches zero.
//! - **Exception rules**: per-chain, de-duplicated by description, each tagged
//!   with the effect it has on a running session.
//! - **Judgment resolver**: classifies a reported deviation into a rule and
//!   dispatches the matching transition.
//! - **Streak ledger**: applies session outcomes to chain counters.
//! - **Storage**: SQLite-backed key-value persistence with legacy-record
//!   migration, and TOML configuration.
//!
//! ## Key Components
//!
//! - [`App`]: application state owning chains, schedules, the active session
//!   and history
//! - [`ActiveSession`]: the in-flight session and its transitions
//! - [`Store`]: persistence port implemented by [`Database`] and [`MemoryStore`]
//! - [`Clock`] / [`Notifier`]: injectable time and notification ports

pub mod app;
pub mod chain;
pub mod clock;
pub mod error;
pub mod events;
pub mod judgment;
pub mod ledger;
pub mod notify;
pub mod session;
pub mod storage;
pub mod time_fmt;

pub use app::App;
pub use chain::{Chain, ChainDraft, ExceptionRule, ExceptionRuleType, MAX_EXTEND_MINUTES};
pub use clock::{Clock, ManualClock, SystemClock};
pub use error::{ConfigError, CoreError, ImportError, Result, StorageError};
pub use events::Event;
pub use judgment::{AuxiliaryJudgment, Judgment, ResolvedRule, RuleAction};
pub use ledger::CompletionHistory;
pub use notify::{LogNotifier, NoopNotifier, Notifier, RecordingNotifier};
pub use session::{
    ActiveSession, ExceptionRuleEffect, FinishedSession, ScheduledSession, SessionOutcome,
    SessionState,
};
pub use storage::{Config, Database, KvStore, MemoryStore, Store};
