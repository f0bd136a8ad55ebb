mod active;
mod scheduled;

pub use active::{
    ActiveSession, ExceptionRuleEffect, FinishedSession, SessionOutcome, SessionState,
};
pub use scheduled::{ScheduledSession, DEFAULT_AUXILIARY_DURATION_MIN, DEFAULT_AUXILIARY_SIGNAL};
