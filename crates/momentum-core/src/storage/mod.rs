mod config;
pub mod database;
pub mod memory;
pub mod migrations;
pub mod transfer;

pub use config::Config;
pub use database::Database;
pub use memory::MemoryStore;

use std::path::PathBuf;

use chrono::{DateTime, Utc};

use crate::chain::Chain;
use crate::error::{Result, StorageError};
use crate::ledger::CompletionHistory;
use crate::session::{ActiveSession, ScheduledSession};

/// Storage keys, shared by every backend.
pub mod keys {
    pub const CHAINS: &str = "momentum_chains";
    pub const SCHEDULED_SESSIONS: &str = "momentum_scheduled_sessions";
    pub const ACTIVE_SESSION: &str = "momentum_active_session";
    pub const COMPLETION_HISTORY: &str = "momentum_completion_history";
    pub const SCHEMA_VERSION: &str = "momentum_schema_version";
}

/// Returns `~/.config/momentum[-dev]/` based on MOMENTUM_ENV.
///
/// Set MOMENTUM_ENV=dev to use development data directory.
///
/// # Errors
/// Returns an error if creating the directory fails.
pub fn data_dir() -> Result<PathBuf> {
    let base_dir = dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config");

    let env = std::env::var("MOMENTUM_ENV").unwrap_or_else(|_| "production".to_string());

    let dir = if env == "dev" {
        base_dir.join("momentum-dev")
    } else {
        base_dir.join("momentum")
    };

    std::fs::create_dir_all(&dir)
        .map_err(|e| StorageError::DataDir(format!("{}: {e}", dir.display())))?;
    Ok(dir)
}

/// Persistence collaborator of the core.
///
/// Reads go through [`migrations`], so records written by older clients
/// come back in canonical shape.
pub trait Store {
    /// Chains as stored. Fields the stored records lack, such as the
    /// creation time of migrated rules, are stamped with `now`.
    fn get_chains_at(&self, now: DateTime<Utc>) -> Result<Vec<Chain>>;

    fn get_chains(&self) -> Result<Vec<Chain>> {
        self.get_chains_at(Utc::now())
    }
    fn save_chains(&self, chains: &[Chain]) -> Result<()>;

    fn get_scheduled_sessions(&self) -> Result<Vec<ScheduledSession>>;
    fn save_scheduled_sessions(&self, sessions: &[ScheduledSession]) -> Result<()>;

    fn get_active_session(&self) -> Result<Option<ActiveSession>>;
    /// `None` clears the stored session.
    fn save_active_session(&self, session: Option<&ActiveSession>) -> Result<()>;

    fn get_completion_history(&self) -> Result<Vec<CompletionHistory>>;
    fn save_completion_history(&self, history: &[CompletionHistory]) -> Result<()>;
}

/// String key-value backend. Every `KvStore` is a [`Store`] holding JSON
/// documents under [`keys`].
pub trait KvStore {
    fn kv_get(&self, key: &str) -> Result<Option<String>>;
    fn kv_set(&self, key: &str, value: &str) -> Result<()>;
    fn kv_delete(&self, key: &str) -> Result<()>;
}

impl<K: KvStore + ?Sized> Store for K {
    fn get_chains_at(&self, now: DateTime<Utc>) -> Result<Vec<Chain>> {
        Ok(self
            .kv_get(keys::CHAINS)?
            .map(|raw| migrations::chains_from_json(&raw, now))
            .unwrap_or_default())
    }

    fn save_chains(&self, chains: &[Chain]) -> Result<()> {
        self.kv_set(keys::CHAINS, &serde_json::to_string(chains)?)
    }

    fn get_scheduled_sessions(&self) -> Result<Vec<ScheduledSession>> {
        Ok(self
            .kv_get(keys::SCHEDULED_SESSIONS)?
            .map(|raw| migrations::scheduled_sessions_from_json(&raw))
            .unwrap_or_default())
    }

    fn save_scheduled_sessions(&self, sessions: &[ScheduledSession]) -> Result<()> {
        self.kv_set(keys::SCHEDULED_SESSIONS, &serde_json::to_string(sessions)?)
    }

    fn get_active_session(&self) -> Result<Option<ActiveSession>> {
        Ok(self
            .kv_get(keys::ACTIVE_SESSION)?
            .and_then(|raw| migrations::active_session_from_json(&raw)))
    }

    fn save_active_session(&self, session: Option<&ActiveSession>) -> Result<()> {
        match session {
            Some(session) => self.kv_set(keys::ACTIVE_SESSION, &serde_json::to_string(session)?),
            None => self.kv_delete(keys::ACTIVE_SESSION),
        }
    }

    fn get_completion_history(&self) -> Result<Vec<CompletionHistory>> {
        Ok(self
            .kv_get(keys::COMPLETION_HISTORY)?
            .map(|raw| migrations::history_from_json(&raw))
            .unwrap_or_default())
    }

    fn save_completion_history(&self, history: &[CompletionHistory]) -> Result<()> {
        self.kv_set(keys::COMPLETION_HISTORY, &serde_json::to_string(history)?)
    }
}
