//! Pre-commitments to start a chain within a time window.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::chain::Chain;
use crate::time_fmt;

/// Signal recorded when neither the chain nor the stored record has one.
pub const DEFAULT_AUXILIARY_SIGNAL: &str = "Scheduled signal";

/// Pre-commitment window, in minutes, when none is configured.
pub const DEFAULT_AUXILIARY_DURATION_MIN: u32 = 15;

/// At most one per chain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduledSession {
    pub chain_id: String,
    pub scheduled_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub auxiliary_signal: String,
}

impl ScheduledSession {
    /// Window of `chain.auxiliary_duration` minutes starting at `now`.
    pub fn for_chain(chain: &Chain, now: DateTime<Utc>) -> Self {
        let signal = if chain.auxiliary_signal.trim().is_empty() {
            DEFAULT_AUXILIARY_SIGNAL.to_string()
        } else {
            chain.auxiliary_signal.clone()
        };
        Self {
            chain_id: chain.id.clone(),
            scheduled_at: now,
            expires_at: now + Duration::minutes(chain.auxiliary_duration as i64),
            auxiliary_signal: signal,
        }
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        time_fmt::is_expired(self.expires_at, now)
    }

    pub fn seconds_remaining(&self, now: DateTime<Utc>) -> u64 {
        time_fmt::seconds_until(self.expires_at, now)
    }
}
