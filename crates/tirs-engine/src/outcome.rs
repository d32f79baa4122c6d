use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tirs_drift::RiskSignal;
use tirs_enforcement::{EnforcementAction, RemediationPlan};
use tirs_profiles::{AnomalyFinding, ProfileState};
use tirs_types::{AgentId, IntentId, RiskLevel, RunState};

/// The unified result of one `analyze_intent` call.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AnalysisOutcome {
    pub agent_id: AgentId,
    /// Absent for terminal rejections, which create no intent record.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub intent_id: Option<IntentId>,
    pub risk_score: f64,
    pub risk_level: RiskLevel,
    pub confidence: f64,
    /// Weighted breakdown; empty when signal computation was skipped.
    pub signals: Vec<RiskSignal>,
    /// Baseline deviations flagged by the behavioral matcher.
    pub anomalies: Vec<AnomalyFinding>,
    pub explanation: String,
    /// Run-state after any enforcement this evaluation triggered.
    pub run_state: RunState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enforcement: Option<EnforcementAction>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remediation: Option<RemediationPlan>,
    /// Sequence number of this evaluation's audit entry.
    pub audit_sequence: u64,
}

/// Snapshot of one agent's governance state.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AgentStatus {
    pub agent_id: AgentId,
    pub run_state: RunState,
    pub total_intents: u64,
    pub violation_count: u64,
    pub resurrection_count: u32,
    pub mean_recent_risk: f64,
    pub last_seen: DateTime<Utc>,
    /// Learning vs established, when a behavioral baseline exists.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub baseline_state: Option<ProfileState>,
    pub enforcement_count: usize,
}

/// Fleet-wide aggregate view.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RiskDashboard {
    pub generated_at: DateTime<Utc>,
    pub total_agents: usize,
    pub active: usize,
    pub throttled: usize,
    pub paused: usize,
    pub killed: usize,
    pub resurrected: usize,
    pub total_intents: u64,
    pub total_violations: u64,
    pub audit_entries: u64,
    /// Highest mean-recent-risk agents, descending.
    pub top_risk_agents: Vec<(AgentId, f64)>,
}
