//! Streak ledger.
//!
//! Applies session outcomes to a chain's persistent counters and produces
//! the append-only completion record.
//!
//! A failure resets every main and auxiliary counter, not only the broken
//! streak. `total_failures` is zeroed as well rather than incremented.
//! Cancelled sessions leave no trace.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::chain::Chain;
use crate::session::{ExceptionRuleEffect, FinishedSession, SessionOutcome};

/// Failure reason used when the caller gives none.
pub const DEFAULT_FAILURE_REASON: &str = "Interrupted by user";

/// Immutable record of a terminated session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletionHistory {
    pub chain_id: String,
    pub completed_at: DateTime<Utc>,
    /// Originally committed minutes, extensions excluded.
    pub duration: u32,
    /// Whole seconds of focus, pauses excluded.
    pub actual_focus_time: u64,
    pub was_successful: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason_for_failure: Option<String>,
    #[serde(default)]
    pub rule_effects: Vec<ExceptionRuleEffect>,
    #[serde(default)]
    pub is_early_complete: bool,
}

/// Apply a finished session to `chain`.
///
/// Returns the history record to append, or `None` for a cancelled session.
pub fn apply(chain: &mut Chain, finished: FinishedSession) -> Option<CompletionHistory> {
    match &finished.outcome {
        SessionOutcome::Completed { early } => {
            let early = *early;
            Some(record_success(chain, finished, early))
        }
        SessionOutcome::Interrupted { reason } => {
            let reason = reason.clone();
            Some(record_failure(chain, finished, &reason))
        }
        SessionOutcome::Cancelled => {
            tracing::debug!(chain = %chain.id, "cancelled session leaves ledger untouched");
            None
        }
    }
}

fn record_success(chain: &mut Chain, finished: FinishedSession, early: bool) -> CompletionHistory {
    chain.current_streak = chain.current_streak.saturating_add(1);
    chain.total_completions = chain.total_completions.saturating_add(1);
    chain.last_completed_at = Some(finished.ended_at);
    tracing::info!(
        chain = %chain.id,
        streak = chain.current_streak,
        focus_secs = finished.actual_focus_secs,
        early,
        "session completed"
    );

    CompletionHistory {
        chain_id: finished.chain_id,
        completed_at: finished.ended_at,
        duration: finished.original_duration_min,
        actual_focus_time: finished.actual_focus_secs,
        was_successful: true,
        reason_for_failure: None,
        rule_effects: finished.rule_effects,
        is_early_complete: early,
    }
}

fn record_failure(chain: &mut Chain, finished: FinishedSession, reason: &str) -> CompletionHistory {
    let reason = match reason.trim() {
        "" => DEFAULT_FAILURE_REASON,
        r => r,
    };
    reset_counters(chain);
    tracing::info!(chain = %chain.id, reason, "session interrupted, chain reset");

    CompletionHistory {
        chain_id: finished.chain_id,
        completed_at: finished.ended_at,
        duration: finished.original_duration_min,
        actual_focus_time: finished.actual_focus_secs,
        was_successful: false,
        reason_for_failure: Some(reason.to_string()),
        rule_effects: finished.rule_effects,
        is_early_complete: false,
    }
}

/// Zero every counter and forget the last completion.
pub fn reset_counters(chain: &mut Chain) {
    chain.current_streak = 0;
    chain.auxiliary_streak = 0;
    chain.total_completions = 0;
    chain.total_failures = 0;
    chain.auxiliary_failures = 0;
    chain.last_completed_at = None;
}

/// A pre-commitment was made.
pub fn record_schedule(chain: &mut Chain) {
    chain.auxiliary_streak = chain.auxiliary_streak.saturating_add(1);
}

/// A pre-commitment was judged broken. No history record is produced.
pub fn record_auxiliary_failure(chain: &mut Chain, reason: &str) {
    chain.auxiliary_streak = 0;
    chain.auxiliary_failures = chain.auxiliary_failures.saturating_add(1);
    tracing::info!(chain = %chain.id, reason, "pre-commitment failed");
}

/// A pre-commitment deviation was allowed; remember it as an exception.
///
/// Returns `false` for a blank exception.
pub fn record_auxiliary_allowance(chain: &mut Chain, exception: &str) -> bool {
    let exception = exception.trim();
    if exception.is_empty() {
        return false;
    }
    chain.auxiliary_exceptions.push(exception.to_string());
    true
}
