use thiserror::Error;
use tirs_types::{AgentId, AppealId, RunState};

/// Errors from enforcement, remediation, and appeal handling.
///
/// Invalid operations on terminal state carry a specific reason rather
/// than collapsing into a generic failure.
#[derive(Debug, Error)]
pub enum EnforcementError {
    #[error("invalid run-state transition for {agent}: {from} -> {to}")]
    InvalidTransition {
        agent: AgentId,
        from: RunState,
        to: RunState,
    },

    #[error("agent {agent} is {state}, not killed; appeals target killed agents only")]
    AgentNotKilled { agent: AgentId, state: RunState },

    #[error(
        "agent {agent} has exhausted its resurrection budget ({count} of {max} used)"
    )]
    ResurrectionLimitReached {
        agent: AgentId,
        count: u32,
        max: u32,
    },

    #[error("appeal not found: {0}")]
    AppealNotFound(AppealId),

    #[error("appeal {0} was already decided")]
    AppealAlreadyDecided(AppealId),

    #[error("audit append failed: {0}")]
    Audit(#[from] tirs_audit::AuditError),

    #[error("timeline recording failed: {0}")]
    Timeline(#[from] tirs_forensics::ForensicError),
}
