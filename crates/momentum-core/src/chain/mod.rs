//! Chain definitions and their exception rules.
//!
//! A chain is a recurring habit with persistent streak counters. Counters
//! are unsigned and only the streak ledger writes them.

mod rules;

pub use rules::MAX_EXTEND_MINUTES;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Effect an exception rule has on a running session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExceptionRuleType {
    /// Behavior allowed, session untouched.
    Normal,
    Pause,
    EarlyComplete,
    ExtendTime,
    /// Session discarded without a record.
    CancelFocus,
}

impl ExceptionRuleType {
    pub const ALL: [ExceptionRuleType; 5] = [
        ExceptionRuleType::Normal,
        ExceptionRuleType::Pause,
        ExceptionRuleType::EarlyComplete,
        ExceptionRuleType::ExtendTime,
        ExceptionRuleType::CancelFocus,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ExceptionRuleType::Normal => "normal",
            ExceptionRuleType::Pause => "pause",
            ExceptionRuleType::EarlyComplete => "early_complete",
            ExceptionRuleType::ExtendTime => "extend_time",
            ExceptionRuleType::CancelFocus => "cancel_focus",
        }
    }

    /// Short display label.
    pub fn label(&self) -> &'static str {
        match self {
            ExceptionRuleType::Normal => "Allow",
            ExceptionRuleType::Pause => "Pause timer",
            ExceptionRuleType::EarlyComplete => "Finish early",
            ExceptionRuleType::ExtendTime => "Extend timer",
            ExceptionRuleType::CancelFocus => "Cancel focus",
        }
    }

    /// What applying a rule of this type does to the session.
    pub fn action_text(&self) -> &'static str {
        match self {
            ExceptionRuleType::Normal => "The behavior is allowed; the session continues",
            ExceptionRuleType::Pause => "The behavior pauses the session timer",
            ExceptionRuleType::EarlyComplete => {
                "The behavior ends the session early and records it as complete"
            }
            ExceptionRuleType::ExtendTime => "The behavior extends the session timer",
            ExceptionRuleType::CancelFocus => {
                "The behavior cancels the session without recording it"
            }
        }
    }
}

impl fmt::Display for ExceptionRuleType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ExceptionRuleType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace('-', "_");
        ExceptionRuleType::ALL
            .into_iter()
            .find(|t| t.as_str() == normalized)
            .ok_or_else(|| {
                format!(
                    "unknown rule type '{s}' (expected one of: normal, pause, early_complete, extend_time, cancel_focus)"
                )
            })
    }
}

/// A named exemption owned by one chain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExceptionRule {
    pub id: String,
    pub description: String,
    #[serde(rename = "type")]
    pub rule_type: ExceptionRuleType,
    pub created_at: DateTime<Utc>,
    /// Only set for `extend_time` rules.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extend_minutes: Option<u32>,
}

/// A recurring habit definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Chain {
    pub id: String,
    pub name: String,
    pub trigger: String,
    /// Session length in minutes.
    pub duration: u32,
    pub description: String,
    pub current_streak: u32,
    pub auxiliary_streak: u32,
    pub total_completions: u32,
    pub total_failures: u32,
    pub auxiliary_failures: u32,
    pub exceptions: Vec<ExceptionRule>,
    pub auxiliary_exceptions: Vec<String>,
    pub auxiliary_signal: String,
    /// Pre-commitment window in minutes.
    pub auxiliary_duration: u32,
    pub auxiliary_completion_trigger: String,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_completed_at: Option<DateTime<Utc>>,
}

/// The user-editable part of a chain.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChainDraft {
    pub name: String,
    pub trigger: String,
    pub duration: u32,
    pub description: String,
    #[serde(default)]
    pub exceptions: Vec<ExceptionRule>,
    #[serde(default)]
    pub auxiliary_exceptions: Vec<String>,
    pub auxiliary_signal: String,
    pub auxiliary_duration: u32,
    pub auxiliary_completion_trigger: String,
}

impl ChainDraft {
    /// A chain needs a positive session length; a zero-minute session would
    /// be due the moment it starts.
    pub fn is_valid(&self) -> bool {
        self.duration > 0
    }
}

impl Chain {
    /// A fresh chain with every counter at zero.
    pub fn new(id: impl Into<String>, draft: ChainDraft, now: DateTime<Utc>) -> Self {
        Self {
            id: id.into(),
            name: draft.name,
            trigger: draft.trigger,
            duration: draft.duration,
            description: draft.description,
            current_streak: 0,
            auxiliary_streak: 0,
            total_completions: 0,
            total_failures: 0,
            auxiliary_failures: 0,
            exceptions: draft.exceptions,
            auxiliary_exceptions: draft.auxiliary_exceptions,
            auxiliary_signal: draft.auxiliary_signal,
            auxiliary_duration: draft.auxiliary_duration,
            auxiliary_completion_trigger: draft.auxiliary_completion_trigger,
            created_at: now,
            last_completed_at: None,
        }
    }

    /// Overwrite the editable fields, keeping id, counters and timestamps.
    pub fn apply_draft(&mut self, draft: ChainDraft) {
        self.name = draft.name;
        self.trigger = draft.trigger;
        self.duration = draft.duration;
        self.description = draft.description;
        self.exceptions = draft.exceptions;
        self.auxiliary_exceptions = draft.auxiliary_exceptions;
        self.auxiliary_signal = draft.auxiliary_signal;
        self.auxiliary_duration = draft.auxiliary_duration;
        self.auxiliary_completion_trigger = draft.auxiliary_completion_trigger;
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use chrono::TimeZone;

    pub(crate) fn draft(name: &str, duration: u32) -> ChainDraft {
        ChainDraft {
            name: name.to_string(),
            trigger: "put on headphones".to_string(),
            duration,
            description: String::new(),
            exceptions: Vec::new(),
            auxiliary_exceptions: Vec::new(),
            auxiliary_signal: "snap fingers".to_string(),
            auxiliary_duration: 15,
            auxiliary_completion_trigger: "put on headphones".to_string(),
        }
    }

    pub(crate) fn chain(duration: u32) -> Chain {
        let at = Utc.with_ymd_and_hms(2024, 5, 1, 8, 0, 0).unwrap();
        Chain::new("chain-1", draft("Deep work", duration), at)
    }

    #[test]
    fn rule_type_parses_loosely() {
        assert_eq!(
            "extend-time".parse::<ExceptionRuleType>().unwrap(),
            ExceptionRuleType::ExtendTime
        );
        assert_eq!(
            " Pause ".parse::<ExceptionRuleType>().unwrap(),
            ExceptionRuleType::Pause
        );
        assert!("snooze".parse::<ExceptionRuleType>().is_err());
    }

    #[test]
    fn rule_type_serializes_snake_case() {
        let json = serde_json::to_string(&ExceptionRuleType::EarlyComplete).unwrap();
        assert_eq!(json, "\"early_complete\"");
    }

    #[test]
    fn chain_serializes_camel_case() {
        let json = serde_json::to_value(chain(25)).unwrap();
        assert_eq!(json["currentStreak"], 0);
        assert_eq!(json["auxiliaryDuration"], 15);
        assert!(json.get("lastCompletedAt").is_none());
    }

    #[test]
    fn apply_draft_keeps_counters() {
        let mut c = chain(25);
        c.current_streak = 4;
        c.total_completions = 9;
        c.apply_draft(draft("Reading", 40));
        assert_eq!(c.name, "Reading");
        assert_eq!(c.duration, 40);
        assert_eq!(c.current_streak, 4);
        assert_eq!(c.total_completions, 9);
        assert_eq!(c.id, "chain-1");
    }
}
