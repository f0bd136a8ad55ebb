use std::thread;
use std::time::{Duration, Instant};

use clap::Subcommand;
use momentum_core::{Config, Event, ExceptionRuleType, Judgment, SessionState};

use super::{open_app, print_json, print_outcome, CliResult};

#[derive(Subcommand)]
pub enum SessionAction {
    /// Start a session for a chain
    Start { chain_id: String },
    /// Print the current session state as JSON
    Status,
    /// Pause the running session
    Pause,
    /// Resume the paused session
    Resume,
    /// Add minutes to the session
    Extend { minutes: u32 },
    /// Finish the session as a success
    Complete,
    /// End the session as a failure
    Interrupt {
        #[arg(long)]
        reason: Option<String>,
    },
    /// Drop the session without recording it
    Cancel,
    /// Allow a deviation through an exception rule
    Judge {
        /// Description of what happened
        #[arg(required_unless_present = "rule")]
        description: Option<String>,
        /// Apply an existing rule instead
        #[arg(long, conflicts_with = "description")]
        rule: Option<String>,
        /// Type of the rule created for a new description
        #[arg(long = "type", default_value = "normal")]
        rule_type: ExceptionRuleType,
        #[arg(long)]
        minutes: Option<u32>,
    },
    /// Count a deviation as breaking the chain
    Fail {
        #[arg(long)]
        reason: Option<String>,
    },
    /// Follow the running session, completing it when time runs out
    Watch,
}

pub fn run(action: SessionAction) -> CliResult {
    let config = Config::load_or_default();
    let mut app = open_app(&config)?;

    match action {
        SessionAction::Start { chain_id } => {
            if app.chain(&chain_id).is_none() {
                return Err(format!("chain not found: {chain_id}").into());
            }
            let event = app.start(&chain_id)?;
            print_outcome(&app, event)?;
        }
        SessionAction::Status => {
            let completed = app.tick()?;
            print_json(&app.snapshot())?;
            if let Some(event) = completed {
                print_json(&event)?;
            }
        }
        SessionAction::Pause => {
            let event = app.pause()?;
            print_outcome(&app, event)?;
        }
        SessionAction::Resume => {
            let event = app.resume()?;
            print_outcome(&app, event)?;
        }
        SessionAction::Extend { minutes } => {
            let event = app.extend(minutes)?;
            print_outcome(&app, event)?;
        }
        SessionAction::Complete => {
            let event = app.complete()?;
            print_outcome(&app, event)?;
        }
        SessionAction::Interrupt { reason } => {
            let event = app.interrupt(reason.as_deref())?;
            print_outcome(&app, event)?;
        }
        SessionAction::Cancel => {
            let event = app.cancel()?;
            print_outcome(&app, event)?;
        }
        SessionAction::Judge {
            description,
            rule,
            rule_type,
            minutes,
        } => {
            let judgment = match (rule, description) {
                (Some(rule_id), _) => Judgment::existing(rule_id),
                (None, Some(description)) => {
                    let judgment = Judgment::describe(description, rule_type);
                    match minutes {
                        Some(m) => judgment.with_extend_minutes(m),
                        None => judgment,
                    }
                }
                (None, None) => return Err("a description or --rule is required".into()),
            };
            let events = app.judge(judgment)?;
            if events.is_empty() {
                print_json(&app.snapshot())?;
            } else {
                print_json(&events)?;
            }
        }
        SessionAction::Fail { reason } => {
            let event = app.judge_failure(reason.as_deref())?;
            print_outcome(&app, event)?;
        }
        SessionAction::Watch => {
            let tick = Duration::from_secs(config.session.tick_interval_secs.max(1));
            let sweep = Duration::from_secs(config.session.expiry_sweep_secs.max(1));
            let mut last_sweep: Option<Instant> = None;

            loop {
                if last_sweep.map_or(true, |at| at.elapsed() >= sweep) {
                    for event in app.sweep_expired_schedules() {
                        print_line(&event)?;
                    }
                    last_sweep = Some(Instant::now());
                }

                if let Some(event) = app.tick()? {
                    print_line(&event)?;
                }
                let snapshot = app.snapshot();
                print_line(&snapshot)?;
                // Nothing else changes the session while this process holds it.
                if let Event::StateSnapshot { state, .. } = snapshot {
                    if state != SessionState::Running {
                        break;
                    }
                }
                thread::sleep(tick);
            }
        }
    }
    Ok(())
}

/// One compact JSON object per line.
fn print_line(event: &Event) -> CliResult {
    println!("{}", serde_json::to_string(event)?);
    Ok(())
}
