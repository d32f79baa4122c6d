use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Previous-hash value of the first chain entry.
pub const GENESIS_HASH: &str =
    "0000000000000000000000000000000000000000000000000000000000000000";

/// Kind tag for every security-relevant event the chain records.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditEventKind {
    /// An intent was scored through the full signal pipeline.
    IntentEvaluated,
    /// A killed agent submitted an intent and was rejected without scoring.
    TerminalRejection,
    /// A throttle/pause/kill/quarantine action was applied.
    EnforcementApplied,
    AppealSubmitted,
    AppealApproved,
    AppealDenied,
    AgentResurrected,
    /// Chain verification found a hash/link/sequence fault.
    ChainIncident,
    /// A forensic snapshot could not be captured or exported.
    SnapshotFailure,
}

impl std::fmt::Display for AuditEventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::IntentEvaluated => "intent_evaluated",
            Self::TerminalRejection => "terminal_rejection",
            Self::EnforcementApplied => "enforcement_applied",
            Self::AppealSubmitted => "appeal_submitted",
            Self::AppealApproved => "appeal_approved",
            Self::AppealDenied => "appeal_denied",
            Self::AgentResurrected => "agent_resurrected",
            Self::ChainIncident => "chain_incident",
            Self::SnapshotFailure => "snapshot_failure",
        };
        write!(f, "{s}")
    }
}

/// One immutable entry in the audit chain.
///
/// Invariant: `previous_hash` equals the prior entry's `content_hash`
/// (or [`GENESIS_HASH`] for sequence 0), and `content_hash` is the SHA-256
/// of the deterministically serialized content fields.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AuditEntry {
    pub sequence: u64,
    pub timestamp: DateTime<Utc>,
    pub kind: AuditEventKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub agent_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub actor_id: Option<String>,
    /// Opaque event payload. serde_json keeps object keys sorted, so the
    /// serialized form is stable for hashing.
    pub payload: serde_json::Value,
    pub previous_hash: String,
    pub content_hash: String,
}

impl AuditEntry {
    /// Build and hash a new entry linked to `previous_hash`.
    pub fn create(
        sequence: u64,
        kind: AuditEventKind,
        agent_id: Option<String>,
        actor_id: Option<String>,
        payload: serde_json::Value,
        previous_hash: String,
    ) -> Self {
        let timestamp = Utc::now();
        let content_hash = compute_content_hash(
            sequence,
            &timestamp,
            kind,
            agent_id.as_deref(),
            actor_id.as_deref(),
            &payload,
            &previous_hash,
        );
        Self {
            sequence,
            timestamp,
            kind,
            agent_id,
            actor_id,
            payload,
            previous_hash,
            content_hash,
        }
    }

    /// Recompute this entry's content hash from its stored fields.
    pub fn recompute_hash(&self) -> String {
        compute_content_hash(
            self.sequence,
            &self.timestamp,
            self.kind,
            self.agent_id.as_deref(),
            self.actor_id.as_deref(),
            &self.payload,
            &self.previous_hash,
        )
    }
}

/// Deterministic content hash: stable field ordering, RFC 3339 timestamp,
/// sorted-key payload serialization.
fn compute_content_hash(
    sequence: u64,
    timestamp: &DateTime<Utc>,
    kind: AuditEventKind,
    agent_id: Option<&str>,
    actor_id: Option<&str>,
    payload: &serde_json::Value,
    previous_hash: &str,
) -> String {
    let input = format!(
        "{}|{}|{}|{}|{}|{}|{}",
        sequence,
        timestamp.to_rfc3339(),
        kind,
        agent_id.unwrap_or(""),
        actor_id.unwrap_or(""),
        serde_json::to_string(payload).unwrap_or_default(),
        previous_hash
    );
    let mut hasher = Sha256::new();
    hasher.update(input.as_bytes());
    hex::encode(hasher.finalize())
}
