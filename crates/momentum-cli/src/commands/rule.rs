use clap::Subcommand;
use momentum_core::{Config, ExceptionRule, ExceptionRuleType};
use serde_json::{json, Value};

use super::{open_app, print_json, CliResult};

#[derive(Subcommand)]
pub enum RuleAction {
    /// Add a rule, or show the existing one with the same description
    Add {
        chain_id: String,
        description: String,
        /// normal, pause, early_complete, extend_time or cancel_focus
        #[arg(long = "type", default_value = "normal")]
        rule_type: ExceptionRuleType,
        /// Minutes added by an extend_time rule
        #[arg(long)]
        minutes: Option<u32>,
    },
    /// List the rules of a chain
    List { chain_id: String },
    /// Change a rule
    Update {
        chain_id: String,
        rule_id: String,
        description: String,
        #[arg(long = "type", default_value = "normal")]
        rule_type: ExceptionRuleType,
        #[arg(long)]
        minutes: Option<u32>,
    },
    /// Remove a rule
    Remove { chain_id: String, rule_id: String },
    /// Describe the available rule types
    Types,
}

fn describe(rule: &ExceptionRule) -> Value {
    json!({
        "id": rule.id,
        "description": rule.description,
        "type": rule.rule_type,
        "label": rule.rule_type.label(),
        "action": rule.rule_type.action_text(),
        "extendMinutes": rule.extend_minutes,
        "createdAt": rule.created_at,
    })
}

pub fn run(action: RuleAction) -> CliResult {
    if let RuleAction::Types = action {
        let types: Vec<Value> = ExceptionRuleType::ALL
            .iter()
            .map(|t| json!({ "type": t, "label": t.label(), "action": t.action_text() }))
            .collect();
        return print_json(&types);
    }

    let config = Config::load_or_default();
    let mut app = open_app(&config)?;

    match action {
        RuleAction::Add {
            chain_id,
            description,
            rule_type,
            minutes,
        } => match app.add_rule(&chain_id, &description, rule_type, minutes)? {
            Some(resolved) => {
                let mut out = describe(&resolved.rule);
                out["created"] = json!(resolved.created);
                print_json(&out)?;
            }
            None => return Err("rule not added: unknown chain or empty description".into()),
        },
        RuleAction::List { chain_id } => {
            let Some(chain) = app.chain(&chain_id) else {
                return Err(format!("chain not found: {chain_id}").into());
            };
            let rules: Vec<Value> = chain.exceptions.iter().map(describe).collect();
            print_json(&rules)?;
        }
        RuleAction::Update {
            chain_id,
            rule_id,
            description,
            rule_type,
            minutes,
        } => {
            if !app.update_rule(&chain_id, &rule_id, &description, rule_type, minutes)? {
                return Err(
                    "rule not updated: unknown rule, empty description or duplicate description"
                        .into(),
                );
            }
            if let Some(rule) = app.chain(&chain_id).and_then(|c| c.find_rule(&rule_id)) {
                print_json(&describe(rule))?;
            }
        }
        RuleAction::Remove { chain_id, rule_id } => match app.remove_rule(&chain_id, &rule_id)? {
            Some(rule) => print_json(&describe(&rule))?,
            None => return Err(format!("rule not found: {rule_id}").into()),
        },
        RuleAction::Types => {}
    }
    Ok(())
}
