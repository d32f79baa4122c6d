use std::collections::BTreeMap;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tirs_types::AgentId;
use tracing::info;

use crate::error::ForensicError;
use crate::timeline::TimelineEvent;

/// Point-in-time capture of an agent's full state at a trigger event.
///
/// Captured on every kill and exportable as a standalone artifact for
/// offline analysis. Capture and export are best-effort: callers on the
/// enforcement path log failures instead of propagating them.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ForensicSnapshot {
    pub snapshot_id: String,
    pub agent_id: AgentId,
    pub captured_at: DateTime<Utc>,
    /// What caused the capture, e.g. `"kill"`.
    pub trigger: String,
    /// Full drift-profile dump at capture time.
    pub profile: serde_json::Value,
    /// Timeline slice leading up to the trigger.
    pub recent_events: Vec<TimelineEvent>,
    /// Environment facts (versions, host, configuration digests).
    pub environment: BTreeMap<String, String>,
}

impl ForensicSnapshot {
    pub fn capture(
        agent_id: AgentId,
        trigger: impl Into<String>,
        profile: serde_json::Value,
        recent_events: Vec<TimelineEvent>,
        environment: BTreeMap<String, String>,
    ) -> Self {
        Self {
            snapshot_id: uuid::Uuid::new_v4().to_string(),
            agent_id,
            captured_at: Utc::now(),
            trigger: trigger.into(),
            profile,
            recent_events,
            environment,
        }
    }

    /// Write the snapshot as pretty JSON to `path`.
    pub fn export(&self, path: &Path) -> Result<(), ForensicError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_vec_pretty(self)?;
        std::fs::write(path, json)?;
        info!(
            agent = %self.agent_id,
            snapshot = %self.snapshot_id,
            path = %path.display(),
            "forensic snapshot exported"
        );
        Ok(())
    }

    /// Reload an exported snapshot.
    pub fn import(path: &Path) -> Result<Self, ForensicError> {
        let bytes = std::fs::read(path)?;
        Ok(serde_json::from_slice(&bytes)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot() -> ForensicSnapshot {
        let mut environment = BTreeMap::new();
        environment.insert("engine_version".to_string(), "0.1.0".to_string());
        ForensicSnapshot::capture(
            AgentId::new("agent-1"),
            "kill",
            serde_json::json!({"total_intents": 42, "violation_count": 7}),
            Vec::new(),
            environment,
        )
    }

    #[test]
    fn capture_fills_identity_fields() {
        let snap = snapshot();
        assert_eq!(snap.trigger, "kill");
        assert!(!snap.snapshot_id.is_empty());
        assert_eq!(snap.environment.get("engine_version").unwrap(), "0.1.0");
    }

    #[test]
    fn export_import_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("forensics").join("agent-1.json");

        let snap = snapshot();
        snap.export(&path).unwrap();

        let restored = ForensicSnapshot::import(&path).unwrap();
        assert_eq!(restored.snapshot_id, snap.snapshot_id);
        assert_eq!(restored.agent_id, snap.agent_id);
        assert_eq!(restored.profile, snap.profile);
    }

    #[test]
    fn export_to_unwritable_path_is_an_error_not_a_panic() {
        let snap = snapshot();
        let result = snap.export(Path::new("/dev/null/impossible/agent.json"));
        assert!(result.is_err());
    }
}
