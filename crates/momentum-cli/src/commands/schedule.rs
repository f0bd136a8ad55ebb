use clap::{ArgGroup, Subcommand};
use momentum_core::time_fmt;
use momentum_core::{AuxiliaryJudgment, Clock, Config};
use serde_json::{json, Value};

use super::{open_app, print_json, print_outcome, CliApp, CliResult};

#[derive(Subcommand)]
pub enum ScheduleAction {
    /// Pre-commit to starting a chain within its window
    Add { chain_id: String },
    /// List pre-commitments with the time left on each
    List,
    /// Report pre-commitments whose window has run out
    Sweep,
    /// Cancel a pre-commitment, choosing how it counts
    #[command(group(ArgGroup::new("verdict").required(true).args(["allow", "fail"])))]
    Cancel {
        chain_id: String,
        /// Keep the auxiliary streak through this exception
        #[arg(long)]
        allow: Option<String>,
        /// Count the cancellation as a failure
        #[arg(long, num_args = 0..=1, default_missing_value = "")]
        fail: Option<String>,
    },
    /// Judge a lapsed pre-commitment
    #[command(group(ArgGroup::new("verdict").required(true).args(["allow", "fail"])))]
    Judge {
        chain_id: String,
        #[arg(long)]
        allow: Option<String>,
        #[arg(long, num_args = 0..=1, default_missing_value = "")]
        fail: Option<String>,
    },
}

pub fn run(action: ScheduleAction) -> CliResult {
    let config = Config::load_or_default();
    let mut app = open_app(&config)?;

    match action {
        ScheduleAction::Add { chain_id } => {
            if app.chain(&chain_id).is_none() {
                return Err(format!("chain not found: {chain_id}").into());
            }
            match app.schedule_chain(&chain_id)? {
                Some(event) => print_json(&event)?,
                None => return Err(format!("chain already scheduled: {chain_id}").into()),
            }
        }
        ScheduleAction::List => {
            print_json(&list(&app))?;
        }
        ScheduleAction::Sweep => {
            print_json(&app.sweep_expired_schedules())?;
        }
        ScheduleAction::Cancel {
            chain_id,
            allow,
            fail,
        } => {
            if !app.request_schedule_cancellation(&chain_id) {
                return Err(format!("nothing scheduled for chain: {chain_id}").into());
            }
            let event = app.judge_auxiliary(&chain_id, verdict(&config, allow, fail))?;
            print_outcome(&app, event)?;
        }
        ScheduleAction::Judge {
            chain_id,
            allow,
            fail,
        } => {
            // Expiry is only noticed by a sweep, so run one before judging.
            app.sweep_expired_schedules();
            match app.judge_auxiliary(&chain_id, verdict(&config, allow, fail))? {
                Some(event) => print_json(&event)?,
                None => return Err(format!("nothing to judge for chain: {chain_id}").into()),
            }
        }
    }
    Ok(())
}

fn list(app: &CliApp) -> Vec<Value> {
    let now = app.clock().now();
    app.scheduled_sessions()
        .iter()
        .map(|s| {
            json!({
                "chainId": s.chain_id,
                "chainName": app.chain(&s.chain_id).map(|c| c.name.as_str()),
                "scheduledAt": s.scheduled_at,
                "expiresAt": s.expires_at,
                "auxiliarySignal": s.auxiliary_signal,
                "secondsRemaining": s.seconds_remaining(now),
                "remaining": time_fmt::format_duration(s.seconds_remaining(now)),
                "expired": s.is_expired(now),
            })
        })
        .collect()
}

/// `--allow` wins; a bare `--fail` uses the configured failure reason.
fn verdict(config: &Config, allow: Option<String>, fail: Option<String>) -> AuxiliaryJudgment {
    match (allow, fail) {
        (Some(exception), _) => AuxiliaryJudgment::Allow { exception },
        (None, reason) => {
            let reason = reason
                .filter(|r| !r.trim().is_empty())
                .unwrap_or_else(|| config.session.default_failure_reason.clone());
            AuxiliaryJudgment::Fail { reason }
        }
    }
}
