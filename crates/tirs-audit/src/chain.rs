use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::entry::{AuditEntry, AuditEventKind, GENESIS_HASH};
use crate::error::AuditError;
use crate::store::AuditStore;

/// A specific integrity fault found while walking the chain.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "fault")]
pub enum ChainFault {
    /// The entry's stored hash does not match its recomputed content hash.
    HashMismatch { sequence: u64 },
    /// `previous_hash` does not match the prior entry's `content_hash`.
    BrokenLink { sequence: u64 },
    /// Sequence numbers are not contiguous from zero.
    SequenceGap { expected: u64, found: u64 },
}

impl std::fmt::Display for ChainFault {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::HashMismatch { sequence } => {
                write!(f, "entry {sequence} content hash mismatch")
            }
            Self::BrokenLink { sequence } => {
                write!(f, "entry {sequence} previous-hash link broken")
            }
            Self::SequenceGap { expected, found } => {
                write!(f, "sequence gap: expected {expected}, found {found}")
            }
        }
    }
}

/// Outcome of a full-chain verification walk.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ChainVerification {
    pub valid: bool,
    pub entries_checked: usize,
    /// First fault found; verification stops at the first break because
    /// everything after an altered entry is untrustworthy anyway.
    pub fault: Option<ChainFault>,
}

impl ChainVerification {
    fn valid_for(entries_checked: usize) -> Self {
        Self {
            valid: true,
            entries_checked,
            fault: None,
        }
    }

    fn broken(entries_checked: usize, fault: ChainFault) -> Self {
        Self {
            valid: false,
            entries_checked,
            fault: Some(fault),
        }
    }
}

struct ChainHead {
    next_sequence: u64,
    last_hash: String,
}

/// The append-only, hash-linked audit chain.
///
/// Appends are strictly serialized: sequence assignment, hashing, and the
/// durable store write all happen under one lock so entries can never race
/// or interleave out of order.
pub struct AuditChain {
    store: Arc<dyn AuditStore>,
    head: Mutex<ChainHead>,
}

impl AuditChain {
    /// Open a chain over `store`, re-deriving the sequence counter and
    /// tail hash from the persisted entries.
    pub async fn open(store: Arc<dyn AuditStore>) -> Result<Self, AuditError> {
        let entries = store.load_all().await?;
        let head = match entries.last() {
            Some(tail) => {
                info!(
                    entries = entries.len(),
                    tail_sequence = tail.sequence,
                    "audit chain reloaded from store"
                );
                ChainHead {
                    next_sequence: tail.sequence + 1,
                    last_hash: tail.content_hash.clone(),
                }
            }
            None => ChainHead {
                next_sequence: 0,
                last_hash: GENESIS_HASH.to_string(),
            },
        };
        Ok(Self {
            store,
            head: Mutex::new(head),
        })
    }

    /// Append one event. Atomic under the chain lock; the entry is durable
    /// in the store before this returns.
    pub async fn append(
        &self,
        kind: AuditEventKind,
        agent_id: Option<String>,
        actor_id: Option<String>,
        payload: serde_json::Value,
    ) -> Result<AuditEntry, AuditError> {
        let mut head = self.head.lock().await;
        let entry = AuditEntry::create(
            head.next_sequence,
            kind,
            agent_id,
            actor_id,
            payload,
            head.last_hash.clone(),
        );
        self.store.append(&entry).await?;
        head.next_sequence = entry.sequence + 1;
        head.last_hash = entry.content_hash.clone();
        Ok(entry)
    }

    /// Walk the full persisted chain and check hashes, links, and sequence
    /// continuity. A fault is reported, never repaired.
    pub async fn verify(&self) -> Result<ChainVerification, AuditError> {
        let entries = self.store.load_all().await?;
        Ok(verify_entries(&entries))
    }

    /// Verify, and if a fault is found, record it as a chain-incident
    /// event so the tampering attempt is itself on the record.
    pub async fn verify_and_record(&self) -> Result<ChainVerification, AuditError> {
        let verification = self.verify().await?;
        if let Some(fault) = &verification.fault {
            warn!(%fault, "audit chain integrity fault detected");
            self.append(
                AuditEventKind::ChainIncident,
                None,
                None,
                serde_json::json!({
                    "fault": fault,
                    "entries_checked": verification.entries_checked,
                }),
            )
            .await?;
        }
        Ok(verification)
    }

    /// Number of entries appended so far.
    pub async fn len(&self) -> u64 {
        self.head.lock().await.next_sequence
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Content hash of the current tail entry.
    pub async fn head_hash(&self) -> String {
        self.head.lock().await.last_hash.clone()
    }

    /// All persisted entries, oldest first.
    pub async fn entries(&self) -> Result<Vec<AuditEntry>, AuditError> {
        self.store.load_all().await
    }
}

/// Stateless verification walk over a slice of entries.
pub fn verify_entries(entries: &[AuditEntry]) -> ChainVerification {
    let mut expected_previous = GENESIS_HASH.to_string();
    for (i, entry) in entries.iter().enumerate() {
        let expected_sequence = i as u64;
        if entry.sequence != expected_sequence {
            return ChainVerification::broken(
                i,
                ChainFault::SequenceGap {
                    expected: expected_sequence,
                    found: entry.sequence,
                },
            );
        }
        if entry.previous_hash != expected_previous {
            return ChainVerification::broken(
                i,
                ChainFault::BrokenLink {
                    sequence: entry.sequence,
                },
            );
        }
        if entry.recompute_hash() != entry.content_hash {
            return ChainVerification::broken(
                i,
                ChainFault::HashMismatch {
                    sequence: entry.sequence,
                },
            );
        }
        expected_previous = entry.content_hash.clone();
    }
    ChainVerification::valid_for(entries.len())
}
