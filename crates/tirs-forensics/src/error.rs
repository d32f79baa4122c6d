use thiserror::Error;

use crate::timeline::TimelineEventId;

/// Errors from the timeline and snapshot subsystems.
#[derive(Debug, Error)]
pub enum ForensicError {
    #[error("causal parent not found in timeline: {0}")]
    UnknownCausalParent(TimelineEventId),

    #[error("timeline event not found: {0}")]
    EventNotFound(TimelineEventId),

    #[error("snapshot export I/O failure: {0}")]
    Io(#[from] std::io::Error),

    #[error("snapshot serialization failure: {0}")]
    Serialization(#[from] serde_json::Error),
}
