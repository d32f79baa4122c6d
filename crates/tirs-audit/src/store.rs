use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs::{File, OpenOptions};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::sync::Mutex;

use crate::entry::AuditEntry;
use crate::error::AuditError;

/// Durable backing for the audit chain.
///
/// Appends must be durable (or durably queued) before returning; audit
/// completeness is a correctness property, not best-effort.
#[async_trait]
pub trait AuditStore: Send + Sync {
    /// Persist one already-hashed entry.
    async fn append(&self, entry: &AuditEntry) -> Result<(), AuditError>;

    /// Load every persisted entry in append order.
    async fn load_all(&self) -> Result<Vec<AuditEntry>, AuditError>;
}

/// In-memory store for tests and ephemeral deployments.
#[derive(Default)]
pub struct MemoryAuditStore {
    entries: Mutex<Vec<AuditEntry>>,
}

impl MemoryAuditStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl AuditStore for MemoryAuditStore {
    async fn append(&self, entry: &AuditEntry) -> Result<(), AuditError> {
        self.entries.lock().await.push(entry.clone());
        Ok(())
    }

    async fn load_all(&self) -> Result<Vec<AuditEntry>, AuditError> {
        Ok(self.entries.lock().await.clone())
    }
}

/// Append-only JSONL file store: one entry per line, flushed before the
/// append returns, reloaded in order on startup.
pub struct FileAuditStore {
    path: PathBuf,
}

impl FileAuditStore {
    pub async fn new(path: impl Into<PathBuf>) -> Result<Self, AuditError> {
        let path = path.into();
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl AuditStore for FileAuditStore {
    async fn append(&self, entry: &AuditEntry) -> Result<(), AuditError> {
        let json = serde_json::to_string(entry)?;
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;
        file.write_all(json.as_bytes()).await?;
        file.write_all(b"\n").await?;
        file.flush().await?;
        Ok(())
    }

    async fn load_all(&self) -> Result<Vec<AuditEntry>, AuditError> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let file = File::open(&self.path).await?;
        let reader = BufReader::new(file);
        let mut lines = reader.lines();
        let mut entries = Vec::new();
        while let Some(line) = lines.next_line().await? {
            if line.trim().is_empty() {
                continue;
            }
            entries.push(serde_json::from_str(&line)?);
        }
        Ok(entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entry::{AuditEventKind, GENESIS_HASH};

    fn entry(sequence: u64, previous_hash: &str) -> AuditEntry {
        AuditEntry::create(
            sequence,
            AuditEventKind::IntentEvaluated,
            Some("agent-1".to_string()),
            None,
            serde_json::json!({"seq": sequence}),
            previous_hash.to_string(),
        )
    }

    #[tokio::test]
    async fn memory_store_round_trip() {
        let store = MemoryAuditStore::new();
        let e0 = entry(0, GENESIS_HASH);
        let e1 = entry(1, &e0.content_hash);
        store.append(&e0).await.unwrap();
        store.append(&e1).await.unwrap();

        let loaded = store.load_all().await.unwrap();
        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded[1].previous_hash, e0.content_hash);
    }

    #[tokio::test]
    async fn file_store_persists_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("audit.jsonl");

        {
            let store = FileAuditStore::new(&path).await.unwrap();
            let e0 = entry(0, GENESIS_HASH);
            let e1 = entry(1, &e0.content_hash);
            store.append(&e0).await.unwrap();
            store.append(&e1).await.unwrap();
        }

        let store = FileAuditStore::new(&path).await.unwrap();
        let loaded = store.load_all().await.unwrap();
        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded[0].sequence, 0);
        assert_eq!(loaded[1].sequence, 1);
    }

    #[tokio::test]
    async fn file_store_skips_blank_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("audit.jsonl");
        let store = FileAuditStore::new(&path).await.unwrap();
        store.append(&entry(0, GENESIS_HASH)).await.unwrap();
        tokio::fs::OpenOptions::new()
            .append(true)
            .open(&path)
            .await
            .unwrap()
            .write_all(b"\n\n")
            .await
            .unwrap();

        let loaded = store.load_all().await.unwrap();
        assert_eq!(loaded.len(), 1);
    }
}
