use clap::Subcommand;
use momentum_core::time_fmt;
use momentum_core::{CompletionHistory, Config};
use serde_json::{json, Value};

use super::{open_app, print_json, CliResult};

#[derive(Subcommand)]
pub enum HistoryAction {
    /// List finished sessions, newest first
    List {
        /// Only sessions of this chain
        #[arg(long)]
        chain: Option<String>,
        /// Maximum number of entries
        #[arg(long)]
        limit: Option<usize>,
    },
}

pub fn run(action: HistoryAction) -> CliResult {
    let config = Config::load_or_default();
    let app = open_app(&config)?;

    match action {
        HistoryAction::List { chain, limit } => {
            let mut entries: Vec<&CompletionHistory> = match chain.as_deref() {
                Some(chain_id) => app.history_for(chain_id).collect(),
                None => app.history().iter().collect(),
            };
            entries.sort_by(|a, b| b.completed_at.cmp(&a.completed_at));
            if let Some(limit) = limit {
                entries.truncate(limit);
            }
            let rows = entries
                .into_iter()
                .map(|h| {
                    let mut row = serde_json::to_value(h)?;
                    row["focus"] = json!(time_fmt::format_focus_time(h.actual_focus_time));
                    row["planned"] = json!(time_fmt::format_minutes(h.duration));
                    Ok(row)
                })
                .collect::<Result<Vec<Value>, serde_json::Error>>()?;
            print_json(&rows)?;
        }
    }
    Ok(())
}
