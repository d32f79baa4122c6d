use std::collections::{BTreeMap, HashMap};
use std::path::PathBuf;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tirs_audit::{AuditChain, AuditEventKind};
use tirs_drift::DriftProfile;
use tirs_forensics::{
    EventCategory, EventSeverity, EventTimeline, ForensicSnapshot, TimelineEventId,
};
use tirs_types::{AgentId, EnforcementId, RiskLevel, RunState};
use tracing::{info, warn};

use crate::error::EnforcementError;

/// The action kinds the executor can apply.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnforcementKind {
    Throttle,
    Pause,
    /// Manual containment: same run-state as pause, operator-initiated.
    Quarantine,
    Kill,
}

impl EnforcementKind {
    /// The run-state this action leaves the agent in.
    pub fn target_state(&self) -> RunState {
        match self {
            Self::Throttle => RunState::Throttled,
            Self::Pause | Self::Quarantine => RunState::Paused,
            Self::Kill => RunState::Killed,
        }
    }
}

impl std::fmt::Display for EnforcementKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Throttle => "throttle",
            Self::Pause => "pause",
            Self::Quarantine => "quarantine",
            Self::Kill => "kill",
        };
        write!(f, "{s}")
    }
}

/// A record of one applied enforcement decision. Append-only per agent.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct EnforcementAction {
    pub enforcement_id: EnforcementId,
    pub agent_id: AgentId,
    pub kind: EnforcementKind,
    pub reason: String,
    /// Composite risk score at the moment of the action.
    pub risk_score: f64,
    pub previous_state: RunState,
    pub new_state: RunState,
    pub timestamp: DateTime<Utc>,
}

/// Applies run-state transitions and records them everywhere they must
/// be visible. No other component mutates an agent's run-state.
///
/// Every `apply` runs the same ordered pipeline over one transition value:
/// mutate state, append action history, append audit entry, record
/// timeline event, and (for kills) capture a forensic snapshot. The
/// snapshot step is best-effort; the rest must succeed.
pub struct EnforcementExecutor {
    audit: Arc<AuditChain>,
    timeline: Arc<RwLock<EventTimeline>>,
    /// Export directory for kill snapshots; `None` keeps snapshots
    /// in-memory only.
    snapshot_dir: Option<PathBuf>,
    history: RwLock<HashMap<AgentId, Vec<EnforcementAction>>>,
    snapshots: RwLock<HashMap<AgentId, Vec<ForensicSnapshot>>>,
}

impl EnforcementExecutor {
    pub fn new(audit: Arc<AuditChain>, timeline: Arc<RwLock<EventTimeline>>) -> Self {
        Self {
            audit,
            timeline,
            snapshot_dir: None,
            history: RwLock::new(HashMap::new()),
            snapshots: RwLock::new(HashMap::new()),
        }
    }

    pub fn with_snapshot_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.snapshot_dir = Some(dir.into());
        self
    }

    /// Map a risk band to the action it triggers, given the current state.
    /// Returns `None` when the band demands nothing beyond the present
    /// state; escalation never regresses.
    pub fn decide(level: RiskLevel, current: RunState) -> Option<EnforcementKind> {
        let wanted = match level {
            RiskLevel::Nominal | RiskLevel::Elevated => return None,
            RiskLevel::Warning => EnforcementKind::Throttle,
            RiskLevel::Critical => EnforcementKind::Pause,
            RiskLevel::Terminal => EnforcementKind::Kill,
        };
        if wanted.target_state().severity_rank() > current.severity_rank() {
            Some(wanted)
        } else {
            None
        }
    }

    /// Apply one enforcement action to the agent's profile.
    ///
    /// The caller holds the per-agent lock on `profile`; `caused_by` links
    /// the timeline event to the evaluation that triggered it.
    pub async fn apply(
        &self,
        profile: &mut DriftProfile,
        kind: EnforcementKind,
        reason: impl Into<String>,
        risk_score: f64,
        caused_by: Option<&TimelineEventId>,
    ) -> Result<EnforcementAction, EnforcementError> {
        let previous_state = profile.run_state;
        let new_state = kind.target_state();
        if new_state.severity_rank() <= previous_state.severity_rank() {
            return Err(EnforcementError::InvalidTransition {
                agent: profile.agent_id.clone(),
                from: previous_state,
                to: new_state,
            });
        }

        let action = EnforcementAction {
            enforcement_id: EnforcementId::generate(),
            agent_id: profile.agent_id.clone(),
            kind,
            reason: reason.into(),
            risk_score,
            previous_state,
            new_state,
            timestamp: Utc::now(),
        };

        // Step 1: the externally visible state change.
        profile.run_state = new_state;
        info!(
            agent = %action.agent_id,
            %kind,
            from = %previous_state,
            to = %new_state,
            risk = risk_score,
            "enforcement applied"
        );

        // Step 2: append-only action history.
        self.history
            .write()
            .entry(action.agent_id.clone())
            .or_default()
            .push(action.clone());

        // Step 3: audit chain.
        self.audit
            .append(
                AuditEventKind::EnforcementApplied,
                Some(action.agent_id.0.clone()),
                None,
                serde_json::json!({
                    "enforcement_id": action.enforcement_id,
                    "kind": action.kind,
                    "reason": action.reason,
                    "risk_score": action.risk_score,
                    "previous_state": action.previous_state,
                    "new_state": action.new_state,
                }),
            )
            .await?;

        // Step 4: causal timeline.
        self.timeline.write().record(
            &action.agent_id,
            EventCategory::Enforcement,
            if kind == EnforcementKind::Kill {
                EventSeverity::Critical
            } else {
                EventSeverity::Warning
            },
            format!("{kind}: {}", action.reason),
            caused_by,
        )?;

        // Step 5: forensic snapshot on kill, best-effort.
        if kind == EnforcementKind::Kill {
            self.capture_kill_snapshot(profile).await;
        }

        Ok(action)
    }

    /// Resurrect a killed agent. Only reachable through an approved appeal;
    /// trims profile history per `retain_history` and audits the event.
    pub async fn resurrect(
        &self,
        profile: &mut DriftProfile,
        admin_id: &str,
        reason: &str,
        retain_history: usize,
    ) -> Result<(), EnforcementError> {
        if profile.run_state != RunState::Killed {
            return Err(EnforcementError::AgentNotKilled {
                agent: profile.agent_id.clone(),
                state: profile.run_state,
            });
        }

        profile.apply_resurrection(retain_history);
        info!(agent = %profile.agent_id, admin = admin_id, "agent resurrected");

        self.audit
            .append(
                AuditEventKind::AgentResurrected,
                Some(profile.agent_id.0.clone()),
                Some(admin_id.to_string()),
                serde_json::json!({
                    "reason": reason,
                    "resurrection_count": profile.resurrection_count,
                }),
            )
            .await?;

        self.timeline.write().record(
            &profile.agent_id,
            EventCategory::Appeal,
            EventSeverity::Warning,
            format!("resurrected by {admin_id}: {reason}"),
            None,
        )?;

        Ok(())
    }

    /// Full enforcement history for one agent, oldest first.
    pub fn history_for(&self, agent_id: &AgentId) -> Vec<EnforcementAction> {
        self.history
            .read()
            .get(agent_id)
            .cloned()
            .unwrap_or_default()
    }

    /// The most recent kill action for an agent, if any.
    pub fn last_kill(&self, agent_id: &AgentId) -> Option<EnforcementAction> {
        self.history
            .read()
            .get(agent_id)?
            .iter()
            .rev()
            .find(|a| a.kind == EnforcementKind::Kill)
            .cloned()
    }

    /// Snapshots captured for an agent, oldest first.
    pub fn snapshots_for(&self, agent_id: &AgentId) -> Vec<ForensicSnapshot> {
        self.snapshots
            .read()
            .get(agent_id)
            .cloned()
            .unwrap_or_default()
    }

    /// Capture (and optionally export) a kill snapshot. Never fails the
    /// kill: failures are logged and recorded as audit events.
    async fn capture_kill_snapshot(&self, profile: &DriftProfile) {
        let profile_dump = match serde_json::to_value(profile) {
            Ok(value) => value,
            Err(err) => {
                warn!(agent = %profile.agent_id, %err, "kill snapshot serialization failed");
                self.record_snapshot_failure(&profile.agent_id, &err.to_string())
                    .await;
                return;
            }
        };

        let recent_events = {
            let timeline = self.timeline.read();
            timeline
                .events_for_agent(&profile.agent_id)
                .into_iter()
                .cloned()
                .collect()
        };

        let mut environment = BTreeMap::new();
        environment.insert(
            "engine_version".to_string(),
            env!("CARGO_PKG_VERSION").to_string(),
        );
        environment.insert("run_state".to_string(), profile.run_state.to_string());

        let snapshot = ForensicSnapshot::capture(
            profile.agent_id.clone(),
            "kill",
            profile_dump,
            recent_events,
            environment,
        );

        if let Some(dir) = &self.snapshot_dir {
            let path = dir.join(format!(
                "{}-{}.json",
                profile.agent_id.0, snapshot.snapshot_id
            ));
            if let Err(err) = snapshot.export(&path) {
                warn!(agent = %profile.agent_id, %err, "kill snapshot export failed");
                self.record_snapshot_failure(&profile.agent_id, &err.to_string())
                    .await;
            }
        }

        self.snapshots
            .write()
            .entry(profile.agent_id.clone())
            .or_default()
            .push(snapshot);
    }

    async fn record_snapshot_failure(&self, agent_id: &AgentId, detail: &str) {
        if let Err(err) = self
            .audit
            .append(
                AuditEventKind::SnapshotFailure,
                Some(agent_id.0.clone()),
                None,
                serde_json::json!({"detail": detail}),
            )
            .await
        {
            warn!(agent = %agent_id, %err, "failed to audit snapshot failure");
        }
    }
}
