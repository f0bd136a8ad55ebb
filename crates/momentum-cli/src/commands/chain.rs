use std::path::PathBuf;

use chrono::Utc;
use clap::Subcommand;
use momentum_core::storage::transfer::{self, ChainExport};
use momentum_core::{ChainDraft, Config};
use serde_json::json;

use super::{open_app, print_json, CliResult};

#[derive(Subcommand)]
pub enum ChainAction {
    /// Create a chain
    Create {
        /// Chain name
        name: String,
        /// Action that starts a session
        #[arg(long, default_value = "")]
        trigger: String,
        /// Session length in minutes (default from config)
        #[arg(long)]
        duration: Option<u32>,
        #[arg(long, default_value = "")]
        description: String,
        /// Pre-commitment ritual (default from config)
        #[arg(long)]
        signal: Option<String>,
        /// Pre-commitment window in minutes (default from config)
        #[arg(long)]
        aux_duration: Option<u32>,
        /// Action that fulfils a pre-commitment (defaults to the trigger)
        #[arg(long)]
        completion_trigger: Option<String>,
    },
    /// List all chains
    List,
    /// Show one chain
    Show { id: String },
    /// Edit a chain; counters are kept
    Update {
        id: String,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        trigger: Option<String>,
        #[arg(long)]
        duration: Option<u32>,
        #[arg(long)]
        description: Option<String>,
        #[arg(long)]
        signal: Option<String>,
        #[arg(long)]
        aux_duration: Option<u32>,
        #[arg(long)]
        completion_trigger: Option<String>,
    },
    /// Delete a chain with its schedule, session and history
    Delete { id: String },
    /// Import chains from an export file; each gets a new id
    Import {
        file: PathBuf,
        /// Replace every existing chain instead of appending
        #[arg(long)]
        replace: bool,
    },
    /// Print chains as an importable export file
    Export {
        /// Export only this chain
        #[arg(long)]
        id: Option<String>,
    },
}

pub fn run(action: ChainAction) -> CliResult {
    let config = Config::load_or_default();
    let mut app = open_app(&config)?;

    match action {
        ChainAction::Create {
            name,
            trigger,
            duration,
            description,
            signal,
            aux_duration,
            completion_trigger,
        } => {
            let draft = ChainDraft {
                name,
                auxiliary_completion_trigger: completion_trigger.unwrap_or_else(|| trigger.clone()),
                trigger,
                duration: duration.unwrap_or(config.session.default_duration_min),
                description,
                exceptions: Vec::new(),
                auxiliary_exceptions: Vec::new(),
                auxiliary_signal: signal.unwrap_or(config.auxiliary.default_signal),
                auxiliary_duration: aux_duration.unwrap_or(config.auxiliary.default_duration_min),
            };
            let Some(id) = app.create_chain(draft)? else {
                return Err("duration must be positive".into());
            };
            if let Some(chain) = app.chain(&id) {
                print_json(chain)?;
            }
        }
        ChainAction::List => {
            print_json(app.chains())?;
        }
        ChainAction::Show { id } => match app.chain(&id) {
            Some(chain) => print_json(chain)?,
            None => return Err(format!("chain not found: {id}").into()),
        },
        ChainAction::Update {
            id,
            name,
            trigger,
            duration,
            description,
            signal,
            aux_duration,
            completion_trigger,
        } => {
            let Some(chain) = app.chain(&id) else {
                return Err(format!("chain not found: {id}").into());
            };
            let draft = ChainDraft {
                name: name.unwrap_or_else(|| chain.name.clone()),
                trigger: trigger.unwrap_or_else(|| chain.trigger.clone()),
                duration: duration.unwrap_or(chain.duration),
                description: description.unwrap_or_else(|| chain.description.clone()),
                exceptions: chain.exceptions.clone(),
                auxiliary_exceptions: chain.auxiliary_exceptions.clone(),
                auxiliary_signal: signal.unwrap_or_else(|| chain.auxiliary_signal.clone()),
                auxiliary_duration: aux_duration.unwrap_or(chain.auxiliary_duration),
                auxiliary_completion_trigger: completion_trigger
                    .unwrap_or_else(|| chain.auxiliary_completion_trigger.clone()),
            };
            if !app.update_chain(&id, draft)? {
                return Err("duration must be positive".into());
            }
            if let Some(chain) = app.chain(&id) {
                print_json(chain)?;
            }
        }
        ChainAction::Delete { id } => {
            if !app.delete_chain(&id)? {
                return Err(format!("chain not found: {id}").into());
            }
            print_json(&json!({ "type": "chain_deleted", "chain_id": id }))?;
        }
        ChainAction::Import { file, replace } => {
            let raw = std::fs::read_to_string(&file)?;
            let chains = transfer::chains_from_import(&raw, Utc::now())?;
            let imported = app.import_chains(chains, replace)?;
            print_json(&json!({ "type": "chains_imported", "imported": imported, "replace": replace }))?;
        }
        ChainAction::Export { id: None } => {
            print_json(&ChainExport::bulk(app.chains(), Utc::now()))?;
        }
        ChainAction::Export { id: Some(id) } => match app.chain(&id) {
            Some(chain) => print_json(&ChainExport::single(chain, Utc::now()))?,
            None => return Err(format!("chain not found: {id}").into()),
        },
    }
    Ok(())
}
