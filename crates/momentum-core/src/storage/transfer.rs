//! Chain import and export files.
//!
//! Exports are JSON envelopes tagged by `type`:
//!
//! - `single_chain`: one chain under `chain`
//! - `bulk_chains`: a list under `chains`
//! - `full_archive`: a list under `chains` next to client settings, which
//!   are not read here
//!
//! Imports also take an untagged chain object and a bare list of chains.
//! Every chain in a file needs a text name, a text trigger and a positive
//! duration; one invalid chain rejects the whole file.

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use uuid::Uuid;

use super::migrations::{self, Object};
use crate::chain::Chain;
use crate::error::ImportError;
use crate::session::{DEFAULT_AUXILIARY_DURATION_MIN, DEFAULT_AUXILIARY_SIGNAL};

pub const EXPORT_VERSION: &str = "1.0";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ExportKind {
    SingleChain,
    BulkChains,
    FullArchive,
}

impl ExportKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExportKind::SingleChain => "single_chain",
            ExportKind::BulkChains => "bulk_chains",
            ExportKind::FullArchive => "full_archive",
        }
    }

    fn from_tag(tag: &str) -> Option<Self> {
        [
            ExportKind::SingleChain,
            ExportKind::BulkChains,
            ExportKind::FullArchive,
        ]
        .into_iter()
        .find(|k| k.as_str() == tag)
    }
}

/// Export envelope as written to disk.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChainExport<'a> {
    #[serde(rename = "type")]
    pub kind: ExportKind,
    pub version: &'static str,
    pub exported_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chain: Option<&'a Chain>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chains: Option<&'a [Chain]>,
}

impl<'a> ChainExport<'a> {
    pub fn single(chain: &'a Chain, now: DateTime<Utc>) -> Self {
        Self {
            kind: ExportKind::SingleChain,
            version: EXPORT_VERSION,
            exported_at: now,
            chain: Some(chain),
            chains: None,
        }
    }

    pub fn bulk(chains: &'a [Chain], now: DateTime<Utc>) -> Self {
        Self {
            kind: ExportKind::BulkChains,
            version: EXPORT_VERSION,
            exported_at: now,
            chain: None,
            chains: Some(chains),
        }
    }
}

/// Read the chains of an import file.
///
/// Each chain gets a fresh id and `now` as its creation time; counters,
/// rules and `lastCompletedAt` are kept. Missing pre-commitment settings
/// take their defaults.
///
/// # Errors
/// Returns an error if the file is not JSON, has an unknown shape, or holds
/// an invalid chain.
pub fn chains_from_import(raw: &str, now: DateTime<Utc>) -> Result<Vec<Chain>, ImportError> {
    let value: Value = serde_json::from_str(raw)?;
    let candidates = candidates(&value)?;
    let chains = candidates
        .into_iter()
        .enumerate()
        .map(|(index, item)| imported_chain(item, now).ok_or(ImportError::InvalidChain { index }))
        .collect::<Result<Vec<_>, _>>()?;
    tracing::debug!(chains = chains.len(), "import file read");
    Ok(chains)
}

fn candidates(value: &Value) -> Result<Vec<&Value>, ImportError> {
    let obj = match value {
        Value::Array(items) => return Ok(items.iter().collect()),
        Value::Object(obj) => obj,
        _ => return Err(ImportError::UnknownFormat("not an object or a list".into())),
    };

    let tag = match obj.get("type") {
        None if looks_like_chain(obj) => return Ok(vec![value]),
        None => return Err(ImportError::UnknownFormat("untagged object is not a chain".into())),
        Some(Value::String(tag)) => tag,
        Some(_) => return Err(ImportError::UnknownFormat("type is not text".into())),
    };
    match ExportKind::from_tag(tag) {
        Some(ExportKind::SingleChain) => Ok(vec![obj.get("chain").unwrap_or(value)]),
        Some(ExportKind::BulkChains | ExportKind::FullArchive) => match obj.get("chains") {
            Some(Value::Array(items)) => Ok(items.iter().collect()),
            _ => Err(ImportError::MissingChains(tag.clone())),
        },
        None => Err(ImportError::UnknownFormat(format!("type '{tag}'"))),
    }
}

/// Untagged files are single chains when name, trigger and duration are
/// all set.
fn looks_like_chain(obj: &Object) -> bool {
    ["name", "trigger", "duration"]
        .into_iter()
        .all(|key| match obj.get(key) {
            None | Some(Value::Null) => false,
            Some(Value::String(s)) => !s.is_empty(),
            Some(Value::Number(n)) => n.as_f64().is_some_and(|f| f != 0.0),
            Some(Value::Bool(b)) => *b,
            Some(_) => true,
        })
}

fn imported_chain(value: &Value, now: DateTime<Utc>) -> Option<Chain> {
    let obj = value.as_object()?;
    let well_formed = obj.get("name").is_some_and(Value::is_string)
        && obj.get("trigger").is_some_and(Value::is_string)
        && obj.get("duration").is_some_and(Value::is_number);
    if !well_formed {
        return None;
    }

    let mut chain = migrations::chain_from_object(Uuid::new_v4().to_string(), obj, now);
    if chain.duration == 0 {
        return None;
    }
    chain.created_at = now;
    if chain.auxiliary_signal.trim().is_empty() {
        chain.auxiliary_signal = DEFAULT_AUXILIARY_SIGNAL.to_string();
    }
    if chain.auxiliary_duration == 0 {
        chain.auxiliary_duration = DEFAULT_AUXILIARY_DURATION_MIN;
    }
    if chain.auxiliary_completion_trigger.trim().is_empty() {
        chain.auxiliary_completion_trigger = chain.trigger.clone();
    }
    Some(chain)
}
