use thiserror::Error;
use tirs_types::AgentId;

/// Errors surfaced by the engine facade.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("configuration invalid: {0}")]
    Config(#[from] tirs_types::ConfigError),

    #[error("audit chain failure: {0}")]
    Audit(#[from] tirs_audit::AuditError),

    #[error("enforcement failure: {0}")]
    Enforcement(#[from] tirs_enforcement::EnforcementError),

    #[error("forensics failure: {0}")]
    Forensic(#[from] tirs_forensics::ForensicError),

    #[error("no profile exists for agent {0}")]
    AgentNotFound(AgentId),
}
