//! Exception rule store.
//!
//! Rules are kept in insertion order on their chain and are unique by
//! trimmed description. Lookups are case-sensitive.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::{Chain, ExceptionRule, ExceptionRuleType};

/// Upper bound for `extend_time` rules.
pub const MAX_EXTEND_MINUTES: u32 = 120;

/// Extension minutes are kept only for `extend_time` rules with a positive
/// value, clamped to `1..=MAX_EXTEND_MINUTES`.
fn normalize_extend(rule_type: ExceptionRuleType, extend_minutes: Option<u32>) -> Option<u32> {
    match (rule_type, extend_minutes) {
        (ExceptionRuleType::ExtendTime, Some(m)) if m > 0 => Some(m.min(MAX_EXTEND_MINUTES)),
        _ => None,
    }
}

/// Descriptions compare trimmed and case-sensitive.
fn same_description(rule: &ExceptionRule, wanted: &str) -> bool {
    rule.description.trim() == wanted
}

impl Chain {
    pub fn find_rule(&self, rule_id: &str) -> Option<&ExceptionRule> {
        self.exceptions.iter().find(|r| r.id == rule_id)
    }

    /// Exact match on the trimmed description.
    pub fn find_rule_by_description(&self, description: &str) -> Option<&ExceptionRule> {
        self.position_by_description(description)
            .map(|index| &self.exceptions[index])
    }

    fn position_by_description(&self, description: &str) -> Option<usize> {
        let wanted = description.trim();
        if wanted.is_empty() {
            return None;
        }
        self.exceptions.iter().position(|r| same_description(r, wanted))
    }

    /// Add a rule, or return the existing one with the same description.
    ///
    /// Returns `None` when the description is empty after trimming. The
    /// boolean is `true` when a new rule was appended.
    pub fn add_rule(
        &mut self,
        description: &str,
        rule_type: ExceptionRuleType,
        extend_minutes: Option<u32>,
        now: DateTime<Utc>,
    ) -> Option<(&ExceptionRule, bool)> {
        let description = description.trim();
        if description.is_empty() {
            return None;
        }
        if let Some(index) = self.position_by_description(description) {
            return Some((&self.exceptions[index], false));
        }

        self.exceptions.push(ExceptionRule {
            id: format!("rule_{}", Uuid::new_v4().simple()),
            description: description.to_string(),
            rule_type,
            created_at: now,
            extend_minutes: normalize_extend(rule_type, extend_minutes),
        });
        tracing::debug!(chain = %self.id, rule_type = %rule_type, "exception rule added");
        self.exceptions.last().map(|r| (r, true))
    }

    /// Change an existing rule in place.
    ///
    /// No-op when the rule is unknown, the description is empty, or the
    /// description belongs to a different rule.
    pub fn update_rule(
        &mut self,
        rule_id: &str,
        description: &str,
        rule_type: ExceptionRuleType,
        extend_minutes: Option<u32>,
    ) -> bool {
        let description = description.trim();
        if description.is_empty() {
            return false;
        }
        let collides = self
            .exceptions
            .iter()
            .any(|r| r.id != rule_id && same_description(r, description));
        if collides {
            return false;
        }
        match self.exceptions.iter_mut().find(|r| r.id == rule_id) {
            Some(rule) => {
                rule.description = description.to_string();
                rule.rule_type = rule_type;
                rule.extend_minutes = normalize_extend(rule_type, extend_minutes);
                true
            }
            None => false,
        }
    }

    pub fn remove_rule(&mut self, rule_id: &str) -> Option<ExceptionRule> {
        let index = self.exceptions.iter().position(|r| r.id == rule_id)?;
        Some(self.exceptions.remove(index))
    }
}
