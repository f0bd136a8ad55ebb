use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::chain::ExceptionRuleType;
use crate::session::SessionState;

/// Every state change in the core produces an Event.
/// Presentation layers render them; the CLI prints them as JSON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    SessionStarted {
        chain_id: String,
        duration_min: u32,
        at: DateTime<Utc>,
    },
    SessionPaused {
        chain_id: String,
        remaining_secs: u64,
        at: DateTime<Utc>,
    },
    SessionResumed {
        chain_id: String,
        paused_ms: u64,
        remaining_secs: u64,
        at: DateTime<Utc>,
    },
    SessionExtended {
        chain_id: String,
        added_min: u32,
        duration_min: u32,
        at: DateTime<Utc>,
    },
    SessionCompleted {
        chain_id: String,
        /// Ended by an `early_complete` rule rather than by the timer.
        early: bool,
        actual_focus_secs: u64,
        current_streak: u32,
        at: DateTime<Utc>,
    },
    SessionInterrupted {
        chain_id: String,
        reason: String,
        actual_focus_secs: u64,
        at: DateTime<Utc>,
    },
    SessionCancelled {
        chain_id: String,
        at: DateTime<Utc>,
    },
    /// A judgment resolved to an exception rule.
    RuleApplied {
        chain_id: String,
        rule_id: String,
        rule_type: ExceptionRuleType,
        description: String,
        /// The rule did not exist before this judgment.
        created: bool,
        at: DateTime<Utc>,
    },
    ChainScheduled {
        chain_id: String,
        expires_at: DateTime<Utc>,
        at: DateTime<Utc>,
    },
    /// A pre-commitment ran out and now awaits judgment.
    ScheduleExpired {
        chain_id: String,
        expired_at: DateTime<Utc>,
        at: DateTime<Utc>,
    },
    AuxiliaryJudged {
        chain_id: String,
        allowed: bool,
        at: DateTime<Utc>,
    },
    StateSnapshot {
        state: SessionState,
        chain_id: Option<String>,
        chain_name: Option<String>,
        remaining_secs: u64,
        duration_min: u32,
        focus_secs: u64,
        progress_pct: f64,
        rule_effects: usize,
        at: DateTime<Utc>,
    },
}

impl Event {
    pub fn at(&self) -> DateTime<Utc> {
        match self {
            Event::SessionStarted { at, .. }
            | Event::SessionPaused { at, .. }
            | Event::SessionResumed { at, .. }
            | Event::SessionExtended { at, .. }
            | Event::SessionCompleted { at, .. }
            | Event::SessionInterrupted { at, .. }
            | Event::SessionCancelled { at, .. }
            | Event::RuleApplied { at, .. }
            | Event::ChainScheduled { at, .. }
            | Event::ScheduleExpired { at, .. }
            | Event::AuxiliaryJudged { at, .. }
            | Event::StateSnapshot { at, .. } => *at,
        }
    }
}
