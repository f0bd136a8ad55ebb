//! Judgment resolver.
//!
//! A judgment is the user classifying a deviation that happened during a
//! session. The allow path resolves it to an exception rule (reusing one with
//! the same description, or creating it) and maps the rule to the session
//! transition it triggers. The fail path skips rules entirely and interrupts
//! the session; [`crate::App::judge_failure`] handles it.
//!
//! Malformed input never errors: unknown rule ids, blank descriptions and
//! extend rules without minutes all resolve to no-ops.

use chrono::{DateTime, Utc};

use crate::chain::{Chain, ExceptionRule, ExceptionRuleType};

/// Allow-path input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Judgment {
    /// Apply a rule the chain already has.
    Existing { rule_id: String },
    /// Describe the behavior; matched by description or stored as a new rule
    /// of `rule_type`.
    Describe {
        description: String,
        rule_type: ExceptionRuleType,
        extend_minutes: Option<u32>,
    },
}

impl Judgment {
    pub fn existing(rule_id: impl Into<String>) -> Self {
        Judgment::Existing {
            rule_id: rule_id.into(),
        }
    }

    pub fn describe(description: impl Into<String>, rule_type: ExceptionRuleType) -> Self {
        Judgment::Describe {
            description: description.into(),
            rule_type,
            extend_minutes: None,
        }
    }

    pub fn with_extend_minutes(self, minutes: u32) -> Self {
        match self {
            Judgment::Describe {
                description,
                rule_type,
                ..
            } => Judgment::Describe {
                description,
                rule_type,
                extend_minutes: Some(minutes),
            },
            other => other,
        }
    }
}

/// Verdict on a lapsed or cancelled pre-commitment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuxiliaryJudgment {
    Fail { reason: String },
    Allow { exception: String },
}

/// The rule a judgment landed on.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedRule {
    pub rule: ExceptionRule,
    /// Appended to the chain by this judgment.
    pub created: bool,
}

/// Find or create the rule for `judgment` on `chain`.
pub fn resolve(chain: &mut Chain, judgment: &Judgment, now: DateTime<Utc>) -> Option<ResolvedRule> {
    match judgment {
        Judgment::Existing { rule_id } => match chain.find_rule(rule_id) {
            Some(rule) => Some(ResolvedRule {
                rule: rule.clone(),
                created: false,
            }),
            None => {
                tracing::warn!(chain = %chain.id, rule_id = %rule_id, "judgment references unknown rule");
                None
            }
        },
        Judgment::Describe {
            description,
            rule_type,
            extend_minutes,
        } => chain
            .add_rule(description, *rule_type, *extend_minutes, now)
            .map(|(rule, created)| ResolvedRule {
                rule: rule.clone(),
                created,
            }),
    }
}

/// Session transition triggered by a rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleAction {
    Acknowledge,
    Pause,
    EarlyComplete,
    Extend(u32),
    CancelFocus,
    /// `extend_time` rule without usable minutes.
    Ignore,
}

impl RuleAction {
    pub fn for_rule(rule: &ExceptionRule) -> Self {
        match rule.rule_type {
            ExceptionRuleType::Normal => RuleAction::Acknowledge,
            ExceptionRuleType::Pause => RuleAction::Pause,
            ExceptionRuleType::EarlyComplete => RuleAction::EarlyComplete,
            ExceptionRuleType::ExtendTime => match rule.extend_minutes {
                Some(m) if m > 0 => RuleAction::Extend(m),
                _ => RuleAction::Ignore,
            },
            ExceptionRuleType::CancelFocus => RuleAction::CancelFocus,
        }
    }

    /// Title and message to announce once the action has been carried out.
    pub fn notification(&self) -> Option<(&'static str, String)> {
        match self {
            RuleAction::Acknowledge => Some((
                "Behavior allowed",
                "Allowed by an exception rule; keep going".to_string(),
            )),
            RuleAction::Pause => Some((
                "Session paused",
                "The session timer was paused by an exception rule".to_string(),
            )),
            RuleAction::EarlyComplete => Some((
                "Finished early",
                "The session ended early by an exception rule".to_string(),
            )),
            RuleAction::Extend(m) => Some((
                "Time extended",
                format!("The session was extended by {m} minutes by an exception rule"),
            )),
            RuleAction::CancelFocus => Some((
                "Focus cancelled",
                "The session was cancelled by an exception rule and will not be recorded"
                    .to_string(),
            )),
            RuleAction::Ignore => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::tests::chain;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 9, 0, 0).unwrap()
    }

    #[test]
    fn describe_creates_then_reuses() {
        let mut c = chain(25);
        let first = resolve(
            &mut c,
            &Judgment::describe("checked phone", ExceptionRuleType::Pause),
            now(),
        )
        .unwrap();
        assert!(first.created);

        let second = resolve(
            &mut c,
            &Judgment::describe(" checked phone ", ExceptionRuleType::CancelFocus),
            now(),
        )
        .unwrap();
        assert!(!second.created);
        assert_eq!(second.rule.id, first.rule.id);
        assert_eq!(second.rule.rule_type, ExceptionRuleType::Pause);
        assert_eq!(c.exceptions.len(), 1);
    }

    #[test]
    fn unknown_rule_and_blank_description_resolve_to_nothing() {
        let mut c = chain(25);
        assert!(resolve(&mut c, &Judgment::existing("nope"), now()).is_none());
        assert!(resolve(
            &mut c,
            &Judgment::describe("   ", ExceptionRuleType::Normal),
            now()
        )
        .is_none());
        assert!(c.exceptions.is_empty());
    }

    #[test]
    fn existing_rule_is_looked_up_by_id() {
        let mut c = chain(25);
        let id = c
            .add_rule("stretch", ExceptionRuleType::ExtendTime, Some(10), now())
            .map(|(r, _)| r.id.clone())
            .unwrap();
        let resolved = resolve(&mut c, &Judgment::existing(id), now()).unwrap();
        assert_eq!(RuleAction::for_rule(&resolved.rule), RuleAction::Extend(10));
    }

    #[test]
    fn extend_without_minutes_is_ignored() {
        let mut c = chain(25);
        let resolved = resolve(
            &mut c,
            &Judgment::describe("late", ExceptionRuleType::ExtendTime),
            now(),
        )
        .unwrap();
        assert_eq!(RuleAction::for_rule(&resolved.rule), RuleAction::Ignore);
        assert!(RuleAction::Ignore.notification().is_none());
    }

    #[test]
    fn with_extend_minutes_only_affects_describe() {
        let j = Judgment::describe("late", ExceptionRuleType::ExtendTime).with_extend_minutes(5);
        assert!(matches!(
            j,
            Judgment::Describe {
                extend_minutes: Some(5),
                ..
            }
        ));
        assert_eq!(
            Judgment::existing("r").with_extend_minutes(5),
            Judgment::existing("r")
        );
    }
}
