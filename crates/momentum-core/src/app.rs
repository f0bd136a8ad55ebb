//! Application state.
//!
//! [`App`] owns the chain list, the scheduled sessions, the single active
//! session and the completion history, and is the only writer of all four.
//! Every mutating method persists what it changed before returning
//! (save-after-mutate), so a crash never leaves the store behind memory.
//!
//! Invalid transitions and unknown ids are logged and return `Ok(None)` /
//! `Ok(false)`; only store failures are errors.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::chain::{Chain, ChainDraft, ExceptionRule, ExceptionRuleType};
use crate::clock::{Clock, SystemClock};
use crate::error::Result;
use crate::events::Event;
use crate::judgment::{self, AuxiliaryJudgment, Judgment, ResolvedRule, RuleAction};
use crate::ledger::{self, CompletionHistory, DEFAULT_FAILURE_REASON};
use crate::notify::{NoopNotifier, Notifier};
use crate::session::{
    ActiveSession, ExceptionRuleEffect, ScheduledSession, SessionOutcome, SessionState,
};
use crate::storage::Store;

pub struct App<S: Store, C: Clock = SystemClock, N: Notifier = NoopNotifier> {
    store: S,
    clock: C,
    notifier: N,
    default_failure_reason: String,
    chains: Vec<Chain>,
    scheduled: Vec<ScheduledSession>,
    active: Option<ActiveSession>,
    history: Vec<CompletionHistory>,
    /// Chains whose pre-commitment lapsed or was cancelled and awaits a
    /// verdict. Not persisted: the next sweep finds lapsed ones again.
    pending_auxiliary: Vec<String>,
}

impl<S: Store, C: Clock, N: Notifier> App<S, C, N> {
    /// Read every record set from `store`.
    ///
    /// # Errors
    /// Returns an error if the store cannot be read.
    pub fn load(store: S, clock: C, notifier: N) -> Result<Self> {
        let chains = store.get_chains_at(clock.now())?;
        let scheduled = store.get_scheduled_sessions()?;
        let active = store.get_active_session()?;
        let history = store.get_completion_history()?;
        tracing::debug!(
            chains = chains.len(),
            scheduled = scheduled.len(),
            active = active.is_some(),
            history = history.len(),
            "application state loaded"
        );
        Ok(Self {
            store,
            clock,
            notifier,
            default_failure_reason: DEFAULT_FAILURE_REASON.to_string(),
            chains,
            scheduled,
            active,
            history,
            pending_auxiliary: Vec::new(),
        })
    }

    /// Reason recorded when an interruption gives none.
    pub fn with_failure_reason(mut self, reason: impl Into<String>) -> Self {
        let reason = reason.into();
        if !reason.trim().is_empty() {
            self.default_failure_reason = reason;
        }
        self
    }

    // ── Accessors ────────────────────────────────────────────────────

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    pub fn notifier(&self) -> &N {
        &self.notifier
    }

    pub fn chains(&self) -> &[Chain] {
        &self.chains
    }

    pub fn chain(&self, id: &str) -> Option<&Chain> {
        self.chains.iter().find(|c| c.id == id)
    }

    pub fn scheduled_sessions(&self) -> &[ScheduledSession] {
        &self.scheduled
    }

    pub fn scheduled_for(&self, chain_id: &str) -> Option<&ScheduledSession> {
        self.scheduled.iter().find(|s| s.chain_id == chain_id)
    }

    pub fn active_session(&self) -> Option<&ActiveSession> {
        self.active.as_ref()
    }

    /// The chain owning the active session, if both exist.
    pub fn active_chain(&self) -> Option<&Chain> {
        self.active.as_ref().and_then(|s| self.chain(s.chain_id()))
    }

    pub fn history(&self) -> &[CompletionHistory] {
        &self.history
    }

    pub fn history_for<'a>(&'a self, chain_id: &'a str) -> impl Iterator<Item = &'a CompletionHistory> {
        self.history.iter().filter(move |h| h.chain_id == chain_id)
    }

    pub fn pending_auxiliary_judgments(&self) -> &[String] {
        &self.pending_auxiliary
    }

    pub fn state(&self) -> SessionState {
        self.active
            .as_ref()
            .map_or(SessionState::Idle, ActiveSession::state)
    }

    /// Remaining whole seconds of the active session.
    pub fn remaining_secs(&self) -> Option<u64> {
        let now = self.clock.now();
        self.active.as_ref().map(|s| s.remaining_secs(now))
    }

    // ── Chains ───────────────────────────────────────────────────────

    /// Create a chain with zeroed counters. Returns its id, or `None` when
    /// the draft has no session length.
    ///
    /// # Errors
    /// Returns an error if the chain list cannot be saved.
    pub fn create_chain(&mut self, draft: ChainDraft) -> Result<Option<String>> {
        if !draft.is_valid() {
            tracing::warn!(name = %draft.name, "create ignored: duration must be positive");
            return Ok(None);
        }
        let id = Uuid::new_v4().to_string();
        let chain = Chain::new(id.clone(), draft, self.clock.now());
        tracing::info!(chain = %id, name = %chain.name, "chain created");
        self.chains.push(chain);
        self.store.save_chains(&self.chains)?;
        Ok(Some(id))
    }

    /// Replace the editable fields of a chain, keeping its counters.
    pub fn update_chain(&mut self, id: &str, draft: ChainDraft) -> Result<bool> {
        if !draft.is_valid() {
            tracing::warn!(chain = %id, "update ignored: duration must be positive");
            return Ok(false);
        }
        let Some(chain) = self.chains.iter_mut().find(|c| c.id == id) else {
            tracing::warn!(chain = %id, "update ignored: unknown chain");
            return Ok(false);
        };
        chain.apply_draft(draft);
        self.store.save_chains(&self.chains)?;
        Ok(true)
    }

    /// Delete a chain with its schedule, its active session and its history.
    pub fn delete_chain(&mut self, id: &str) -> Result<bool> {
        let before = self.chains.len();
        self.chains.retain(|c| c.id != id);
        if self.chains.len() == before {
            tracing::warn!(chain = %id, "delete ignored: unknown chain");
            return Ok(false);
        }

        self.scheduled.retain(|s| s.chain_id != id);
        self.history.retain(|h| h.chain_id != id);
        self.pending_auxiliary.retain(|c| c != id);
        if self.active.as_ref().is_some_and(|s| s.chain_id() == id) {
            self.active = None;
            self.store.save_active_session(None)?;
        }

        self.store.save_chains(&self.chains)?;
        self.store.save_scheduled_sessions(&self.scheduled)?;
        self.store.save_completion_history(&self.history)?;
        tracing::info!(chain = %id, "chain deleted");
        Ok(true)
    }

    /// Add imported chains, or replace the whole list when `replace` is set.
    ///
    /// Every imported chain gets a fresh id and is stamped as created now,
    /// so a file can be imported next to the chains it was exported from.
    /// Chains without a session length are skipped. Returns how many chains
    /// were taken.
    pub fn import_chains(&mut self, chains: Vec<Chain>, replace: bool) -> Result<usize> {
        let now = self.clock.now();
        let mut imported = Vec::with_capacity(chains.len());
        for mut chain in chains {
            if chain.duration == 0 {
                tracing::warn!(name = %chain.name, "import skipped: duration must be positive");
                continue;
            }
            chain.id = Uuid::new_v4().to_string();
            chain.created_at = now;
            imported.push(chain);
        }
        let count = imported.len();
        if replace {
            self.chains = imported;
        } else {
            self.chains.extend(imported);
        }
        self.store.save_chains(&self.chains)?;
        tracing::info!(imported = count, replace, "chains imported");
        Ok(count)
    }

    /// Overwrite a chain's rule list and auxiliary exceptions.
    pub fn replace_exceptions(
        &mut self,
        chain_id: &str,
        rules: Vec<ExceptionRule>,
        auxiliary_exceptions: Vec<String>,
    ) -> Result<bool> {
        let Some(chain) = self.chains.iter_mut().find(|c| c.id == chain_id) else {
            return Ok(false);
        };
        chain.exceptions = rules;
        chain.auxiliary_exceptions = auxiliary_exceptions;
        self.store.save_chains(&self.chains)?;
        Ok(true)
    }

    // ── Rules ────────────────────────────────────────────────────────

    /// Add a rule or return the existing one with the same description.
    pub fn add_rule(
        &mut self,
        chain_id: &str,
        description: &str,
        rule_type: ExceptionRuleType,
        extend_minutes: Option<u32>,
    ) -> Result<Option<ResolvedRule>> {
        let now = self.clock.now();
        let Some(chain) = self.chains.iter_mut().find(|c| c.id == chain_id) else {
            tracing::warn!(chain = %chain_id, "rule ignored: unknown chain");
            return Ok(None);
        };
        let resolved = chain
            .add_rule(description, rule_type, extend_minutes, now)
            .map(|(rule, created)| ResolvedRule {
                rule: rule.clone(),
                created,
            });
        if resolved.as_ref().is_some_and(|r| r.created) {
            self.store.save_chains(&self.chains)?;
        }
        Ok(resolved)
    }

    pub fn update_rule(
        &mut self,
        chain_id: &str,
        rule_id: &str,
        description: &str,
        rule_type: ExceptionRuleType,
        extend_minutes: Option<u32>,
    ) -> Result<bool> {
        let updated = self
            .chains
            .iter_mut()
            .find(|c| c.id == chain_id)
            .is_some_and(|c| c.update_rule(rule_id, description, rule_type, extend_minutes));
        if updated {
            self.store.save_chains(&self.chains)?;
        }
        Ok(updated)
    }

    pub fn remove_rule(&mut self, chain_id: &str, rule_id: &str) -> Result<Option<ExceptionRule>> {
        let removed = self
            .chains
            .iter_mut()
            .find(|c| c.id == chain_id)
            .and_then(|c| c.remove_rule(rule_id));
        if removed.is_some() {
            self.store.save_chains(&self.chains)?;
        }
        Ok(removed)
    }

    // ── Pre-commitments ──────────────────────────────────────────────

    /// Pre-commit to `chain_id`. The commitment itself counts towards the
    /// auxiliary streak.
    pub fn schedule_chain(&mut self, chain_id: &str) -> Result<Option<Event>> {
        if self.scheduled_for(chain_id).is_some() {
            tracing::warn!(chain = %chain_id, "schedule ignored: already scheduled");
            return Ok(None);
        }
        let now = self.clock.now();
        let Some(chain) = self.chains.iter_mut().find(|c| c.id == chain_id) else {
            tracing::warn!(chain = %chain_id, "schedule ignored: unknown chain");
            return Ok(None);
        };

        let scheduled = ScheduledSession::for_chain(chain, now);
        ledger::record_schedule(chain);
        let expires_at = scheduled.expires_at;
        self.scheduled.push(scheduled);
        self.store.save_chains(&self.chains)?;
        self.store.save_scheduled_sessions(&self.scheduled)?;
        tracing::debug!(chain = %chain_id, %expires_at, "chain scheduled");
        Ok(Some(Event::ChainScheduled {
            chain_id: chain_id.to_string(),
            expires_at,
            at: now,
        }))
    }

    /// Queue every lapsed pre-commitment for judgment.
    ///
    /// Returns one event per newly queued chain.
    pub fn sweep_expired_schedules(&mut self) -> Vec<Event> {
        let now = self.clock.now();
        let mut events = Vec::new();
        for scheduled in self.scheduled.iter().filter(|s| s.is_expired(now)) {
            if self.pending_auxiliary.contains(&scheduled.chain_id) {
                continue;
            }
            tracing::info!(chain = %scheduled.chain_id, "pre-commitment expired");
            self.pending_auxiliary.push(scheduled.chain_id.clone());
            events.push(Event::ScheduleExpired {
                chain_id: scheduled.chain_id.clone(),
                expired_at: scheduled.expires_at,
                at: now,
            });
        }
        events
    }

    /// Cancelling a pre-commitment requires a verdict.
    pub fn request_schedule_cancellation(&mut self, chain_id: &str) -> bool {
        if self.scheduled_for(chain_id).is_none() {
            tracing::warn!(chain = %chain_id, "cancellation ignored: nothing scheduled");
            return false;
        }
        if !self.pending_auxiliary.iter().any(|c| c == chain_id) {
            self.pending_auxiliary.push(chain_id.to_string());
        }
        true
    }

    /// Resolve a lapsed or cancelled pre-commitment. Never writes history.
    ///
    /// Only chains queued by [`Self::sweep_expired_schedules`] or
    /// [`Self::request_schedule_cancellation`] can be judged.
    pub fn judge_auxiliary(
        &mut self,
        chain_id: &str,
        verdict: AuxiliaryJudgment,
    ) -> Result<Option<Event>> {
        if !self.pending_auxiliary.iter().any(|c| c == chain_id) {
            tracing::warn!(chain = %chain_id, "auxiliary judgment ignored: nothing to judge");
            return Ok(None);
        }
        let Some(chain) = self.chains.iter_mut().find(|c| c.id == chain_id) else {
            tracing::warn!(chain = %chain_id, "auxiliary judgment ignored: unknown chain");
            return Ok(None);
        };

        let allowed = match &verdict {
            AuxiliaryJudgment::Fail { reason } => {
                ledger::record_auxiliary_failure(chain, reason);
                false
            }
            AuxiliaryJudgment::Allow { exception } => {
                if !ledger::record_auxiliary_allowance(chain, exception) {
                    return Ok(None);
                }
                true
            }
        };

        self.scheduled.retain(|s| s.chain_id != chain_id);
        self.pending_auxiliary.retain(|c| c != chain_id);
        self.store.save_chains(&self.chains)?;
        self.store.save_scheduled_sessions(&self.scheduled)?;
        Ok(Some(Event::AuxiliaryJudged {
            chain_id: chain_id.to_string(),
            allowed,
            at: self.clock.now(),
        }))
    }

    // ── Session ──────────────────────────────────────────────────────

    /// Start a session for `chain_id`, consuming its pre-commitment.
    pub fn start(&mut self, chain_id: &str) -> Result<Option<Event>> {
        if let Some(active) = &self.active {
            tracing::warn!(
                chain = %chain_id,
                active = %active.chain_id(),
                "start ignored: a session is already active"
            );
            return Ok(None);
        }
        let Some(chain) = self.chain(chain_id) else {
            tracing::warn!(chain = %chain_id, "start ignored: unknown chain");
            return Ok(None);
        };
        if chain.duration == 0 {
            tracing::warn!(chain = %chain_id, "start ignored: chain has no duration");
            return Ok(None);
        }

        let now = self.clock.now();
        let session = ActiveSession::start(chain, now);
        let duration_min = session.duration_min();
        self.active = Some(session);
        self.scheduled.retain(|s| s.chain_id != chain_id);
        self.pending_auxiliary.retain(|c| c != chain_id);
        self.store.save_active_session(self.active.as_ref())?;
        self.store.save_scheduled_sessions(&self.scheduled)?;
        tracing::info!(chain = %chain_id, duration_min, "session started");
        Ok(Some(Event::SessionStarted {
            chain_id: chain_id.to_string(),
            duration_min,
            at: now,
        }))
    }

    /// Complete the active session once its time is up.
    ///
    /// Call at any rate; returns the completion event on the tick that
    /// finds no time remaining.
    pub fn tick(&mut self) -> Result<Option<Event>> {
        let now = self.clock.now();
        if self.active.as_ref().is_some_and(|s| s.is_due(now)) {
            self.complete()
        } else {
            Ok(None)
        }
    }

    pub fn pause(&mut self) -> Result<Option<Event>> {
        self.transition(|session, now| session.pause(now))
    }

    pub fn resume(&mut self) -> Result<Option<Event>> {
        self.transition(|session, now| session.resume(now))
    }

    pub fn extend(&mut self, minutes: u32) -> Result<Option<Event>> {
        self.transition(|session, now| session.extend(minutes, now))
    }

    /// Complete the active session as a success.
    pub fn complete(&mut self) -> Result<Option<Event>> {
        let event = self.terminate(SessionOutcome::Completed { early: false })?;
        if let Some(Event::SessionCompleted {
            chain_id,
            current_streak,
            ..
        }) = &event
        {
            let name = self.chain(chain_id).map_or("", |c| c.name.as_str());
            let message = format!("{name} finished. Streak is now #{current_streak}");
            self.notify("Chain completed", &message);
        }
        Ok(event)
    }

    /// End the active session as a failure. A blank reason records the
    /// default one.
    pub fn interrupt(&mut self, reason: Option<&str>) -> Result<Option<Event>> {
        let reason = reason
            .map(str::trim)
            .filter(|r| !r.is_empty())
            .unwrap_or(self.default_failure_reason.as_str())
            .to_string();
        self.terminate(SessionOutcome::Interrupted { reason })
    }

    /// Drop the active session without touching counters or history.
    pub fn cancel(&mut self) -> Result<Option<Event>> {
        self.terminate(SessionOutcome::Cancelled)
    }

    // ── Judgment ─────────────────────────────────────────────────────

    /// Allow path: resolve `judgment` to a rule and carry out its action.
    ///
    /// Returns `RuleApplied` followed by the transition event, if any.
    pub fn judge(&mut self, judgment: Judgment) -> Result<Vec<Event>> {
        let Some(chain_id) = self.active.as_ref().map(|s| s.chain_id().to_string()) else {
            tracing::warn!("judgment ignored: no active session");
            return Ok(Vec::new());
        };
        let now = self.clock.now();
        let Some(chain) = self.chains.iter_mut().find(|c| c.id == chain_id) else {
            tracing::warn!(chain = %chain_id, "judgment ignored: active session has no chain");
            return Ok(Vec::new());
        };
        let Some(resolved) = judgment::resolve(chain, &judgment, now) else {
            return Ok(Vec::new());
        };
        if resolved.created {
            self.store.save_chains(&self.chains)?;
        }

        let rule = resolved.rule;
        let mut events = vec![Event::RuleApplied {
            chain_id: chain_id.clone(),
            rule_id: rule.id.clone(),
            rule_type: rule.rule_type,
            description: rule.description.clone(),
            created: resolved.created,
            at: now,
        }];

        let action = RuleAction::for_rule(&rule);
        let (performed, transition) = match action {
            RuleAction::Acknowledge => {
                self.record_effect(&rule, now, None)?;
                (true, None)
            }
            RuleAction::Pause => {
                let event = self.transition(|session, now| {
                    let event = session.pause(now);
                    if event.is_some() {
                        session.record_effect(ExceptionRuleEffect::new(&rule, now, None));
                    }
                    event
                })?;
                (event.is_some(), event)
            }
            RuleAction::Extend(minutes) => {
                let impact = i64::from(minutes) * 60;
                let event = self.transition(|session, now| {
                    let event = session.extend(minutes, now);
                    if event.is_some() {
                        session.record_effect(ExceptionRuleEffect::new(&rule, now, Some(impact)));
                    }
                    event
                })?;
                (event.is_some(), event)
            }
            RuleAction::EarlyComplete => {
                if let Some(session) = self.active.as_mut() {
                    session.record_effect(ExceptionRuleEffect::new(&rule, now, None));
                }
                let event = self.terminate(SessionOutcome::Completed { early: true })?;
                (event.is_some(), event)
            }
            RuleAction::CancelFocus => {
                let event = self.terminate(SessionOutcome::Cancelled)?;
                (event.is_some(), event)
            }
            RuleAction::Ignore => {
                tracing::warn!(rule = %rule.id, "extend rule without minutes ignored");
                (false, None)
            }
        };

        if performed {
            if let Some((title, message)) = action.notification() {
                self.notify(title, &message);
            }
        }
        events.extend(transition);
        Ok(events)
    }

    /// Fail path: the deviation breaks the chain.
    pub fn judge_failure(&mut self, reason: Option<&str>) -> Result<Option<Event>> {
        self.interrupt(reason)
    }

    /// Presentation view of the current state.
    pub fn snapshot(&self) -> Event {
        let now = self.clock.now();
        match &self.active {
            Some(session) => Event::StateSnapshot {
                state: session.state(),
                chain_id: Some(session.chain_id().to_string()),
                chain_name: self.active_chain().map(|c| c.name.clone()),
                remaining_secs: session.remaining_secs(now),
                duration_min: session.duration_min(),
                focus_secs: session.elapsed_ms(now) / 1000,
                progress_pct: session.progress_pct(now),
                rule_effects: session.rule_effects().len(),
                at: now,
            },
            None => Event::StateSnapshot {
                state: SessionState::Idle,
                chain_id: None,
                chain_name: None,
                remaining_secs: 0,
                duration_min: 0,
                focus_secs: 0,
                progress_pct: 0.0,
                rule_effects: 0,
                at: now,
            },
        }
    }

    // ── Internal ─────────────────────────────────────────────────────

    /// Run a non-terminal transition on the active session and persist it
    /// when it changed anything.
    fn transition<F>(&mut self, f: F) -> Result<Option<Event>>
    where
        F: FnOnce(&mut ActiveSession, DateTime<Utc>) -> Option<Event>,
    {
        let now = self.clock.now();
        let Some(session) = self.active.as_mut() else {
            tracing::warn!("transition ignored: no active session");
            return Ok(None);
        };
        let event = f(session, now);
        if event.is_some() {
            self.store.save_active_session(self.active.as_ref())?;
        }
        Ok(event)
    }

    fn record_effect(
        &mut self,
        rule: &ExceptionRule,
        now: DateTime<Utc>,
        time_impact: Option<i64>,
    ) -> Result<()> {
        if let Some(session) = self.active.as_mut() {
            session.record_effect(ExceptionRuleEffect::new(rule, now, time_impact));
            self.store.save_active_session(self.active.as_ref())?;
        }
        Ok(())
    }

    fn terminate(&mut self, outcome: SessionOutcome) -> Result<Option<Event>> {
        let Some(chain_id) = self.active.as_ref().map(|s| s.chain_id().to_string()) else {
            tracing::warn!("termination ignored: no active session");
            return Ok(None);
        };
        let chain_index = self.chains.iter().position(|c| c.id == chain_id);
        if chain_index.is_none() && outcome != SessionOutcome::Cancelled {
            tracing::warn!(chain = %chain_id, "termination ignored: active session has no chain");
            return Ok(None);
        }
        let Some(session) = self.active.take() else {
            return Ok(None);
        };

        let now = self.clock.now();
        let finished = session.finish(outcome, now);
        let outcome = finished.outcome.clone();
        let actual_focus_secs = finished.actual_focus_secs;

        let record = chain_index.and_then(|i| ledger::apply(&mut self.chains[i], finished));
        self.store.save_active_session(None)?;
        if let Some(record) = &record {
            self.history.push(record.clone());
            self.store.save_completion_history(&self.history)?;
            self.store.save_chains(&self.chains)?;
        }

        let event = match outcome {
            SessionOutcome::Completed { early } => Event::SessionCompleted {
                current_streak: chain_index.map_or(0, |i| self.chains[i].current_streak),
                chain_id,
                early,
                actual_focus_secs,
                at: now,
            },
            SessionOutcome::Interrupted { reason } => Event::SessionInterrupted {
                chain_id,
                reason: record
                    .and_then(|r| r.reason_for_failure)
                    .unwrap_or(reason),
                actual_focus_secs,
                at: now,
            },
            SessionOutcome::Cancelled => {
                tracing::info!(chain = %chain_id, "session cancelled");
                Event::SessionCancelled { chain_id, at: now }
            }
        };
        Ok(Some(event))
    }

    fn notify(&self, title: &str, message: &str) {
        if let Err(e) = self.notifier.notify(title, message) {
            tracing::warn!(title, error = %e, "notification failed");
        }
    }
}
