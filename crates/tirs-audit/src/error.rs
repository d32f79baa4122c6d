use thiserror::Error;

/// Errors from the audit chain and its stores.
#[derive(Debug, Error)]
pub enum AuditError {
    #[error("audit store I/O failure: {0}")]
    Io(#[from] std::io::Error),

    #[error("audit entry serialization failure: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("audit store failure: {0}")]
    Store(String),
}
