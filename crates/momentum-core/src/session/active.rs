//! Active session state machine.
//!
//! The session is a wall-clock-based state machine. It keeps timestamps and
//! an accumulated pause total, never a countdown, so remaining time can be
//! recomputed from any `now`. The caller polls [`ActiveSession::is_due`] and
//! completes the session itself.
//!
//! ## State Transitions
//!
//! ```text
//! Idle -> Running <-> Paused -> (Completed | Interrupted | Cancelled)
//! ```
//!
//! `Idle` is the absence of a session; terminal states consume it through
//! [`ActiveSession::finish`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::chain::{Chain, ExceptionRule, ExceptionRuleType};
use crate::clock::millis_between;
use crate::events::Event;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionState {
    Idle,
    Running,
    Paused,
    Completed,
    Interrupted,
    Cancelled,
}

/// Audit record of one rule application during a session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExceptionRuleEffect {
    pub rule_type: ExceptionRuleType,
    pub description: String,
    pub applied_at: DateTime<Utc>,
    /// Seconds; negative for pauses, positive for extensions.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_impact: Option<i64>,
}

impl ExceptionRuleEffect {
    pub fn new(rule: &ExceptionRule, applied_at: DateTime<Utc>, time_impact: Option<i64>) -> Self {
        Self {
            rule_type: rule.rule_type,
            description: rule.description.clone(),
            applied_at,
            time_impact,
        }
    }
}

/// How a session ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionOutcome {
    Completed { early: bool },
    Interrupted { reason: String },
    Cancelled,
}

impl SessionOutcome {
    pub fn state(&self) -> SessionState {
        match self {
            SessionOutcome::Completed { .. } => SessionState::Completed,
            SessionOutcome::Interrupted { .. } => SessionState::Interrupted,
            SessionOutcome::Cancelled => SessionState::Cancelled,
        }
    }
}

/// A terminated session, ready for the streak ledger.
#[derive(Debug, Clone, PartialEq)]
pub struct FinishedSession {
    pub chain_id: String,
    pub started_at: DateTime<Utc>,
    pub ended_at: DateTime<Utc>,
    pub original_duration_min: u32,
    pub final_duration_min: u32,
    pub actual_focus_secs: u64,
    pub total_paused_ms: u64,
    pub rule_effects: Vec<ExceptionRuleEffect>,
    pub outcome: SessionOutcome,
}

/// The single in-flight timed session.
///
/// Invariant: `is_paused` is true exactly when `paused_at` is set, and
/// `total_paused_time` (ms) only grows, on resume.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActiveSession {
    pub(crate) chain_id: String,
    pub(crate) started_at: DateTime<Utc>,
    /// Minutes, including extensions.
    pub(crate) duration: u32,
    pub(crate) is_paused: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub(crate) paused_at: Option<DateTime<Utc>>,
    pub(crate) total_paused_time: u64,
    pub(crate) rule_effects: Vec<ExceptionRuleEffect>,
    pub(crate) original_duration: u32,
}

impl ActiveSession {
    /// Begin a session for `chain` at `now` using its configured duration.
    pub fn start(chain: &Chain, now: DateTime<Utc>) -> Self {
        Self {
            chain_id: chain.id.clone(),
            started_at: now,
            duration: chain.duration,
            is_paused: false,
            paused_at: None,
            total_paused_time: 0,
            rule_effects: Vec::new(),
            original_duration: chain.duration,
        }
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn chain_id(&self) -> &str {
        &self.chain_id
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    pub fn duration_min(&self) -> u32 {
        self.duration
    }

    pub fn original_duration_min(&self) -> u32 {
        self.original_duration
    }

    pub fn is_paused(&self) -> bool {
        self.is_paused
    }

    pub fn paused_at(&self) -> Option<DateTime<Utc>> {
        self.paused_at
    }

    pub fn total_paused_ms(&self) -> u64 {
        self.total_paused_time
    }

    pub fn rule_effects(&self) -> &[ExceptionRuleEffect] {
        &self.rule_effects
    }

    pub fn state(&self) -> SessionState {
        if self.is_paused {
            SessionState::Paused
        } else {
            SessionState::Running
        }
    }

    /// Focus time so far in ms. Frozen at `paused_at` while paused.
    pub fn elapsed_ms(&self, now: DateTime<Utc>) -> u64 {
        let until = match (self.is_paused, self.paused_at) {
            (true, Some(paused_at)) => paused_at,
            _ => now,
        };
        let elapsed = millis_between(self.started_at, until).saturating_sub(self.paused_ms_i64());
        elapsed.max(0) as u64
    }

    pub fn remaining_ms(&self, now: DateTime<Utc>) -> u64 {
        let total = self.duration as u64 * 60_000;
        total.saturating_sub(self.elapsed_ms(now))
    }

    /// Remaining whole seconds, rounded up so 0 only shows once time is out.
    pub fn remaining_secs(&self, now: DateTime<Utc>) -> u64 {
        self.remaining_ms(now).div_ceil(1000)
    }

    /// Running and out of time: the caller must complete the session.
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        !self.is_paused && self.remaining_ms(now) == 0
    }

    /// Whole seconds of focus credited if the session ended at `now`.
    ///
    /// Rounded down. An open pause is not subtracted: paused time is only
    /// accounted on resume.
    pub fn actual_focus_secs(&self, now: DateTime<Utc>) -> u64 {
        let focus = millis_between(self.started_at, now).saturating_sub(self.paused_ms_i64());
        (focus.max(0) / 1000) as u64
    }

    /// 0.0 .. 100.0 progress through the current (possibly extended) duration.
    pub fn progress_pct(&self, now: DateTime<Utc>) -> f64 {
        let total_secs = self.duration as f64 * 60.0;
        if total_secs == 0.0 {
            return 100.0;
        }
        let done = total_secs - self.remaining_secs(now) as f64;
        (done / total_secs * 100.0).clamp(0.0, 100.0)
    }

    // ── Commands ─────────────────────────────────────────────────────

    pub fn pause(&mut self, now: DateTime<Utc>) -> Option<Event> {
        if self.is_paused {
            tracing::warn!(chain = %self.chain_id, "pause ignored: session already paused");
            return None;
        }
        self.is_paused = true;
        self.paused_at = Some(now);
        tracing::debug!(chain = %self.chain_id, "session paused");
        Some(Event::SessionPaused {
            chain_id: self.chain_id.clone(),
            remaining_secs: self.remaining_secs(now),
            at: now,
        })
    }

    pub fn resume(&mut self, now: DateTime<Utc>) -> Option<Event> {
        let paused_at = match (self.is_paused, self.paused_at) {
            (true, Some(paused_at)) => paused_at,
            _ => {
                tracing::warn!(chain = %self.chain_id, "resume ignored: session not paused");
                return None;
            }
        };
        let paused_ms = millis_between(paused_at, now).max(0) as u64;
        self.total_paused_time = self.total_paused_time.saturating_add(paused_ms);
        self.is_paused = false;
        self.paused_at = None;
        self.close_open_pause_effect(paused_ms);
        tracing::debug!(chain = %self.chain_id, paused_ms, "session resumed");
        Some(Event::SessionResumed {
            chain_id: self.chain_id.clone(),
            paused_ms,
            remaining_secs: self.remaining_secs(now),
            at: now,
        })
    }

    /// Add `minutes` to the duration. Zero is ignored.
    pub fn extend(&mut self, minutes: u32, now: DateTime<Utc>) -> Option<Event> {
        if minutes == 0 {
            tracing::warn!(chain = %self.chain_id, "extend ignored: non-positive minutes");
            return None;
        }
        self.duration = self.duration.saturating_add(minutes);
        tracing::debug!(chain = %self.chain_id, minutes, duration = self.duration, "session extended");
        Some(Event::SessionExtended {
            chain_id: self.chain_id.clone(),
            added_min: minutes,
            duration_min: self.duration,
            at: now,
        })
    }

    pub(crate) fn record_effect(&mut self, effect: ExceptionRuleEffect) {
        self.rule_effects.push(effect);
    }

    /// Consume the session into its terminal record.
    pub fn finish(mut self, outcome: SessionOutcome, now: DateTime<Utc>) -> FinishedSession {
        if let (true, Some(paused_at)) = (self.is_paused, self.paused_at) {
            self.close_open_pause_effect(millis_between(paused_at, now).max(0) as u64);
        }
        FinishedSession {
            actual_focus_secs: self.actual_focus_secs(now),
            chain_id: self.chain_id,
            started_at: self.started_at,
            ended_at: now,
            original_duration_min: self.original_duration,
            final_duration_min: self.duration,
            total_paused_ms: self.total_paused_time,
            rule_effects: self.rule_effects,
            outcome,
        }
    }

    // ── Internal ─────────────────────────────────────────────────────

    fn paused_ms_i64(&self) -> i64 {
        i64::try_from(self.total_paused_time).unwrap_or(i64::MAX)
    }

    /// Pause effects are recorded without an impact when the pause starts.
    fn close_open_pause_effect(&mut self, paused_ms: u64) {
        if let Some(effect) = self
            .rule_effects
            .iter_mut()
            .rev()
            .find(|e| e.rule_type == ExceptionRuleType::Pause && e.time_impact.is_none())
        {
            effect.time_impact = Some(-((paused_ms / 1000) as i64));
        }
    }
}
