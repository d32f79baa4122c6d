//! TIRS Audit - the tamper-evident record of everything that happened.
//!
//! Provides:
//! - `AuditEntry`: sequence-numbered, hash-linked log entries
//! - `AuditChain`: the single serialization point for appends, with
//!   full-chain verification and typed fault reporting
//! - `AuditStore`: pluggable persistence (in-memory, append-only JSONL)
//!
//! The chain is the source of truth for "did this enforcement/appeal/drift
//! event really happen, unaltered". Entries are never mutated after
//! creation and faults are never silently repaired.

#![deny(unsafe_code)]
#![warn(rust_2018_idioms)]

mod chain;
mod entry;
mod error;
mod store;

pub use chain::{AuditChain, ChainFault, ChainVerification};
pub use entry::{AuditEntry, AuditEventKind, GENESIS_HASH};
pub use error::AuditError;
pub use store::{AuditStore, FileAuditStore, MemoryAuditStore};
