//! Read-boundary migrations for persisted records.
//!
//! Every stored document passes through one of the `*_from_json` functions
//! below, which accept any historical shape and return canonical records:
//!
//! - v1: exceptions stored as plain strings, auxiliary counters absent,
//!   sessions and history without rule effects.
//! - v2: typed exception rules and every field present.
//!
//! Unreadable documents or records are logged and dropped; they never
//! surface as errors. The `schema_version` entry tracks whether a store has
//! been rewritten in canonical form.

use chrono::{DateTime, TimeZone, Utc};
use serde_json::{Map, Value};
use uuid::Uuid;

use super::{keys, KvStore, Store};
use crate::chain::{Chain, ExceptionRule, ExceptionRuleType, MAX_EXTEND_MINUTES};
use crate::error::Result;
use crate::ledger::CompletionHistory;
use crate::session::{ActiveSession, ExceptionRuleEffect, ScheduledSession, DEFAULT_AUXILIARY_SIGNAL};

/// Current schema version.
///
/// Increment this when adding new migrations.
pub const SCHEMA_VERSION: u32 = 2;

pub(crate) type Object = Map<String, Value>;

// ── Documents ────────────────────────────────────────────────────────

pub fn chains_from_json(raw: &str, now: DateTime<Utc>) -> Vec<Chain> {
    parse_array(raw, keys::CHAINS)
        .iter()
        .filter_map(|v| chain_from_value(v, now))
        .collect()
}

pub fn scheduled_sessions_from_json(raw: &str) -> Vec<ScheduledSession> {
    parse_array(raw, keys::SCHEDULED_SESSIONS)
        .iter()
        .filter_map(scheduled_session_from_value)
        .collect()
}

pub fn active_session_from_json(raw: &str) -> Option<ActiveSession> {
    match serde_json::from_str::<Value>(raw) {
        Ok(Value::Null) => None,
        Ok(value) => active_session_from_value(&value),
        Err(e) => {
            tracing::warn!(key = keys::ACTIVE_SESSION, error = %e, "unreadable document ignored");
            None
        }
    }
}

pub fn history_from_json(raw: &str) -> Vec<CompletionHistory> {
    parse_array(raw, keys::COMPLETION_HISTORY)
        .iter()
        .filter_map(history_from_value)
        .collect()
}

// ── Records ──────────────────────────────────────────────────────────

pub fn chain_from_value(value: &Value, now: DateTime<Utc>) -> Option<Chain> {
    let obj = value.as_object()?;
    let Some(id) = non_empty(obj, "id") else {
        tracing::warn!("stored chain without id dropped");
        return None;
    };
    Some(chain_from_object(id, obj, now))
}

/// Read a chain record under the given id; missing fields take defaults.
pub(crate) fn chain_from_object(id: String, obj: &Object, now: DateTime<Utc>) -> Chain {
    let exceptions = match obj.get("exceptions") {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(|item| rule_from_value(item, now))
            .collect(),
        _ => Vec::new(),
    };
    let auxiliary_exceptions = match obj.get("auxiliaryExceptions") {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(|item| item.as_str().map(str::to_string))
            .collect(),
        _ => Vec::new(),
    };

    Chain {
        id,
        name: text(obj, "name"),
        trigger: text(obj, "trigger"),
        duration: count(obj, "duration"),
        description: text(obj, "description"),
        current_streak: count(obj, "currentStreak"),
        auxiliary_streak: count(obj, "auxiliaryStreak"),
        total_completions: count(obj, "totalCompletions"),
        total_failures: count(obj, "totalFailures"),
        auxiliary_failures: count(obj, "auxiliaryFailures"),
        exceptions,
        auxiliary_exceptions,
        auxiliary_signal: text(obj, "auxiliarySignal"),
        auxiliary_duration: count(obj, "auxiliaryDuration"),
        auxiliary_completion_trigger: text(obj, "auxiliaryCompletionTrigger"),
        created_at: timestamp(obj, "createdAt").unwrap_or(now),
        last_completed_at: timestamp(obj, "lastCompletedAt"),
    }
}

/// Strings are v1 rules and become `normal` rules.
pub fn rule_from_value(value: &Value, now: DateTime<Utc>) -> Option<ExceptionRule> {
    match value {
        Value::String(description) => {
            tracing::debug!(description = %description, "migrating plain-text exception");
            Some(ExceptionRule {
                id: migrated_id(),
                description: description.clone(),
                rule_type: ExceptionRuleType::Normal,
                created_at: now,
                extend_minutes: None,
            })
        }
        Value::Object(obj) => {
            let rule_type = rule_type(obj, "type");
            let extend_minutes = match rule_type {
                ExceptionRuleType::ExtendTime => {
                    Some(count(obj, "extendMinutes")).filter(|m| *m > 0)
                }
                _ => None,
            };
            Some(ExceptionRule {
                id: non_empty(obj, "id").unwrap_or_else(migrated_id),
                description: text(obj, "description"),
                rule_type,
                created_at: timestamp(obj, "createdAt").unwrap_or(now),
                extend_minutes: extend_minutes.map(|m| m.min(MAX_EXTEND_MINUTES)),
            })
        }
        _ => None,
    }
}

pub fn scheduled_session_from_value(value: &Value) -> Option<ScheduledSession> {
    let obj = value.as_object()?;
    let chain_id = non_empty(obj, "chainId")?;
    let (Some(scheduled_at), Some(expires_at)) =
        (timestamp(obj, "scheduledAt"), timestamp(obj, "expiresAt"))
    else {
        tracing::warn!(chain = %chain_id, "scheduled session without timestamps dropped");
        return None;
    };
    Some(ScheduledSession {
        chain_id,
        scheduled_at,
        expires_at,
        auxiliary_signal: non_empty(obj, "auxiliarySignal")
            .unwrap_or_else(|| DEFAULT_AUXILIARY_SIGNAL.to_string()),
    })
}

pub fn active_session_from_value(value: &Value) -> Option<ActiveSession> {
    let obj = value.as_object()?;
    let chain_id = non_empty(obj, "chainId")?;
    let Some(started_at) = timestamp(obj, "startedAt") else {
        tracing::warn!(chain = %chain_id, "active session without start time dropped");
        return None;
    };

    let duration = count(obj, "duration");
    let original_duration = match count(obj, "originalDuration") {
        0 => duration,
        d => d,
    };
    let mut paused_at = timestamp(obj, "pausedAt");
    let is_paused = match obj.get("isPaused").and_then(Value::as_bool) {
        Some(flag) => flag && paused_at.is_some(),
        None => paused_at.is_some(),
    };
    if !is_paused {
        paused_at = None;
    }

    Some(ActiveSession {
        chain_id,
        started_at,
        duration,
        is_paused,
        paused_at,
        total_paused_time: count_u64(obj, "totalPausedTime").min(i64::MAX as u64),
        rule_effects: effects(obj),
        original_duration,
    })
}

pub fn history_from_value(value: &Value) -> Option<CompletionHistory> {
    let obj = value.as_object()?;
    let chain_id = non_empty(obj, "chainId")?;
    let completed_at = timestamp(obj, "completedAt")?;
    let duration = count(obj, "duration");
    let actual_focus_time = match count_u64(obj, "actualFocusTime") {
        0 => duration as u64 * 60,
        secs => secs,
    };
    Some(CompletionHistory {
        chain_id,
        completed_at,
        duration,
        actual_focus_time,
        was_successful: obj
            .get("wasSuccessful")
            .and_then(Value::as_bool)
            .unwrap_or(false),
        reason_for_failure: non_empty(obj, "reasonForFailure"),
        rule_effects: effects(obj),
        is_early_complete: obj
            .get("isEarlyComplete")
            .and_then(Value::as_bool)
            .unwrap_or(false),
    })
}

fn effects(obj: &Object) -> Vec<ExceptionRuleEffect> {
    let Some(Value::Array(items)) = obj.get("ruleEffects") else {
        return Vec::new();
    };
    items
        .iter()
        .filter_map(|item| {
            let effect = item.as_object()?;
            Some(ExceptionRuleEffect {
                rule_type: rule_type(effect, "ruleType"),
                description: text(effect, "description"),
                applied_at: timestamp(effect, "appliedAt")?,
                time_impact: effect.get("timeImpact").and_then(|v| {
                    v.as_i64().or_else(|| v.as_f64().map(|f| f.trunc() as i64))
                }),
            })
        })
        .collect()
}

// ── Versioning ───────────────────────────────────────────────────────

/// Bring a key-value store to [`SCHEMA_VERSION`].
///
/// # Errors
/// Returns an error if a document cannot be written back.
pub fn migrate<K: KvStore + ?Sized>(kv: &K) -> Result<u32> {
    let current = schema_version(kv)?;

    if current < 1 {
        migrate_v1(kv)?;
    }
    if current < 2 {
        migrate_v2(kv)?;
    }

    Ok(SCHEMA_VERSION)
}

pub fn schema_version<K: KvStore + ?Sized>(kv: &K) -> Result<u32> {
    Ok(kv
        .kv_get(keys::SCHEMA_VERSION)?
        .and_then(|v| v.trim().parse::<u32>().ok())
        .unwrap_or(0))
}

fn set_schema_version<K: KvStore + ?Sized>(kv: &K, version: u32) -> Result<()> {
    kv.kv_set(keys::SCHEMA_VERSION, &version.to_string())
}

/// Migration v1: baseline, documents as written by the first clients.
fn migrate_v1<K: KvStore + ?Sized>(kv: &K) -> Result<()> {
    set_schema_version(kv, 1)
}

/// Migration v2: rewrite every document in canonical form.
fn migrate_v2<K: KvStore + ?Sized>(kv: &K) -> Result<()> {
    if kv.kv_get(keys::CHAINS)?.is_some() {
        let chains = kv.get_chains()?;
        kv.save_chains(&chains)?;
    }
    if kv.kv_get(keys::SCHEDULED_SESSIONS)?.is_some() {
        let sessions = kv.get_scheduled_sessions()?;
        kv.save_scheduled_sessions(&sessions)?;
    }
    if kv.kv_get(keys::ACTIVE_SESSION)?.is_some() {
        let session = kv.get_active_session()?;
        kv.save_active_session(session.as_ref())?;
    }
    if kv.kv_get(keys::COMPLETION_HISTORY)?.is_some() {
        let history = kv.get_completion_history()?;
        kv.save_completion_history(&history)?;
    }
    tracing::info!("stored records rewritten to schema v2");
    set_schema_version(kv, 2)
}

// ── Field readers ────────────────────────────────────────────────────

fn parse_array(raw: &str, key: &str) -> Vec<Value> {
    match serde_json::from_str::<Value>(raw) {
        Ok(Value::Array(items)) => items,
        Ok(_) => {
            tracing::warn!(key, "stored document is not a list; ignored");
            Vec::new()
        }
        Err(e) => {
            tracing::warn!(key, error = %e, "unreadable document ignored");
            Vec::new()
        }
    }
}

fn migrated_id() -> String {
    format!("migrated_{}", Uuid::new_v4().simple())
}

fn text(obj: &Object, key: &str) -> String {
    obj.get(key)
        .and_then(Value::as_str)
        .map(str::to_string)
        .unwrap_or_default()
}

fn non_empty(obj: &Object, key: &str) -> Option<String> {
    obj.get(key)
        .and_then(Value::as_str)
        .filter(|s| !s.trim().is_empty())
        .map(str::to_string)
}

/// Non-negative integer; floats are truncated, anything else is 0.
fn count_u64(obj: &Object, key: &str) -> u64 {
    match obj.get(key) {
        Some(Value::Number(n)) => n
            .as_u64()
            .or_else(|| n.as_f64().filter(|f| *f > 0.0).map(|f| f.trunc() as u64))
            .unwrap_or(0),
        _ => 0,
    }
}

fn count(obj: &Object, key: &str) -> u32 {
    count_u64(obj, key).min(u32::MAX as u64) as u32
}

/// RFC 3339 strings or epoch milliseconds.
fn timestamp(obj: &Object, key: &str) -> Option<DateTime<Utc>> {
    match obj.get(key)? {
        Value::String(s) => DateTime::parse_from_rfc3339(s)
            .ok()
            .map(|dt| dt.with_timezone(&Utc)),
        Value::Number(n) => n
            .as_i64()
            .and_then(|ms| Utc.timestamp_millis_opt(ms).single()),
        _ => None,
    }
}

fn rule_type(obj: &Object, key: &str) -> ExceptionRuleType {
    obj.get(key)
        .and_then(Value::as_str)
        .and_then(|s| s.parse().ok())
        .unwrap_or(ExceptionRuleType::Normal)
}
