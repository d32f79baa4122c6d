use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::Timelike;
use dashmap::DashMap;
use parking_lot::RwLock;
use tokio::sync::Mutex;
use tracing::{info, warn};

use tirs_audit::{
    AuditChain, AuditEventKind, AuditStore, ChainVerification, MemoryAuditStore,
};
use tirs_drift::{DriftDetector, DriftProfile};
use tirs_embedding::{EmbeddingProvider, HashEmbeddingProvider};
use tirs_enforcement::{
    AppealManager, AppealRequest, EnforcementExecutor, RemediationEngine,
};
use tirs_forensics::{
    EventCategory, EventSeverity, EventTimeline, ForensicSnapshot, PatternFinding,
};
use tirs_profiles::{AdaptiveThresholds, ProfileMatcher, SystemState};
use tirs_types::{AgentId, AppealId, RiskLevel, RunState};

use crate::config::EngineConfig;
use crate::error::EngineError;
use crate::explain::{explain_evaluation, explain_terminal_rejection};
use crate::outcome::{AgentStatus, AnalysisOutcome, RiskDashboard};
use crate::request::IntentRequest;

/// Agents listed on the dashboard's top-risk board.
const DASHBOARD_TOP_AGENTS: usize = 5;

/// Builder wiring every dependency explicitly. Defaults: deterministic
/// fallback embeddings, in-memory audit store, no snapshot export dir.
pub struct TirsEngineBuilder {
    config: EngineConfig,
    provider: Option<Arc<dyn EmbeddingProvider>>,
    audit_store: Option<Arc<dyn AuditStore>>,
    snapshot_dir: Option<PathBuf>,
}

impl TirsEngineBuilder {
    pub fn new() -> Self {
        Self {
            config: EngineConfig::default(),
            provider: None,
            audit_store: None,
            snapshot_dir: None,
        }
    }

    pub fn config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    pub fn embedding_provider(mut self, provider: Arc<dyn EmbeddingProvider>) -> Self {
        self.provider = Some(provider);
        self
    }

    pub fn audit_store(mut self, store: Arc<dyn AuditStore>) -> Self {
        self.audit_store = Some(store);
        self
    }

    pub fn snapshot_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.snapshot_dir = Some(dir.into());
        self
    }

    /// Validate configuration, reload the audit chain from its store, and
    /// assemble the engine.
    pub async fn build(self) -> Result<TirsEngine, EngineError> {
        self.config.validate()?;

        let provider = self
            .provider
            .unwrap_or_else(|| Arc::new(HashEmbeddingProvider::default()));
        let store = self
            .audit_store
            .unwrap_or_else(|| Arc::new(MemoryAuditStore::new()));
        let audit = Arc::new(AuditChain::open(store).await?);
        let timeline = Arc::new(RwLock::new(EventTimeline::new(self.config.timeline)));

        let mut executor =
            EnforcementExecutor::new(Arc::clone(&audit), Arc::clone(&timeline));
        if let Some(dir) = self.snapshot_dir {
            executor = executor.with_snapshot_dir(dir);
        }

        let detector = DriftDetector::new(self.config.drift.clone())?;
        let matcher = ProfileMatcher::new(self.config.behavioral.clone());
        let adaptive = AdaptiveThresholds::new(
            self.config.drift.thresholds,
            self.config.adaptive.clone(),
        );
        let appeals = AppealManager::new(self.config.max_resurrections);

        info!(provider = provider.name(), "risk governance engine assembled");
        Ok(TirsEngine {
            config: self.config,
            provider,
            detector,
            profiles: DashMap::new(),
            matcher: RwLock::new(matcher),
            adaptive: RwLock::new(adaptive),
            timeline,
            audit,
            executor,
            appeals,
            remediation: RemediationEngine::new(),
            system_state: RwLock::new(SystemState::Normal),
        })
    }
}

impl Default for TirsEngineBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// The orchestrating facade. One instance governs a fleet of agents;
/// everything it owns was injected through the builder.
pub struct TirsEngine {
    config: EngineConfig,
    provider: Arc<dyn EmbeddingProvider>,
    detector: DriftDetector,
    /// Sharded per-agent entries; each profile is mutated under its own lock.
    profiles: DashMap<AgentId, Arc<Mutex<DriftProfile>>>,
    matcher: RwLock<ProfileMatcher>,
    adaptive: RwLock<AdaptiveThresholds>,
    timeline: Arc<RwLock<EventTimeline>>,
    audit: Arc<AuditChain>,
    executor: EnforcementExecutor,
    appeals: AppealManager,
    remediation: RemediationEngine,
    system_state: RwLock<SystemState>,
}

impl TirsEngine {
    pub fn builder() -> TirsEngineBuilder {
        TirsEngineBuilder::new()
    }

    /// Score one proposed action and apply whatever follows from the score.
    ///
    /// Killed agents short-circuit to a fixed terminal verdict without
    /// signal computation; the rejection is still audited.
    pub async fn analyze_intent(
        &self,
        request: IntentRequest,
    ) -> Result<AnalysisOutcome, EngineError> {
        let agent_id = request.agent_id.clone();
        let entry = self
            .profiles
            .entry(agent_id.clone())
            .or_insert_with(|| {
                Arc::new(Mutex::new(DriftProfile::new(agent_id.clone())))
            })
            .value()
            .clone();
        let mut profile = entry.lock().await;

        if !profile.run_state.accepts_intents() {
            return self.reject_terminal(&request, &profile).await;
        }

        let embedding = self.provider.embed(&request.intent_text);
        let context = request.context.unwrap_or_default();
        let base_thresholds = {
            let system_state = *self.system_state.read();
            self.adaptive.read().thresholds_for(
                &agent_id,
                request.agent_type.as_deref(),
                system_state,
            )
        };

        let (evaluation, record) = self.detector.evaluate(
            &mut profile,
            &request.intent_text,
            embedding,
            request.capabilities,
            request.was_allowed,
            request.policy_triggered.clone(),
            &context,
            &base_thresholds,
        );

        self.adaptive.write().record_score(
            &agent_id,
            evaluation.composite_score,
            record.timestamp,
        );
        let anomalies = self.matcher.write().observe(
            &agent_id,
            request.agent_type.as_deref(),
            evaluation.composite_score,
            &record.capabilities,
            record.timestamp.hour(),
        );

        let intent_event = self.timeline.write().record(
            &agent_id,
            EventCategory::Intent,
            severity_for(evaluation.risk_level),
            format!(
                "intent scored {:.3} ({})",
                evaluation.composite_score, evaluation.risk_level
            ),
            None,
        )?;
        if !record.was_allowed {
            self.timeline.write().record(
                &agent_id,
                EventCategory::Violation,
                EventSeverity::Warning,
                match &record.policy_triggered {
                    Some(policy) => format!("denied by policy {policy}"),
                    None => "denied by compliance evaluation".to_string(),
                },
                Some(&intent_event),
            )?;
        }

        let audit_entry = self
            .audit
            .append(
                AuditEventKind::IntentEvaluated,
                Some(agent_id.0.clone()),
                None,
                serde_json::json!({
                    "intent_id": record.intent_id,
                    "risk_score": evaluation.composite_score,
                    "risk_level": evaluation.risk_level,
                    "confidence": evaluation.confidence,
                    "was_allowed": record.was_allowed,
                    "policy_triggered": record.policy_triggered,
                }),
            )
            .await?;

        let enforcement = match EnforcementExecutor::decide(
            evaluation.risk_level,
            profile.run_state,
        ) {
            Some(kind) => Some(
                self.executor
                    .apply(
                        &mut profile,
                        kind,
                        format!(
                            "composite risk {:.3} reached the {} band",
                            evaluation.composite_score, evaluation.risk_level
                        ),
                        evaluation.composite_score,
                        Some(&intent_event),
                    )
                    .await?,
            ),
            None => None,
        };

        let remediation = if evaluation.risk_level.needs_remediation() {
            Some(self.remediation.plan(
                &agent_id,
                &evaluation.signals,
                evaluation.composite_score,
            ))
        } else {
            None
        };

        let explanation =
            explain_evaluation(&agent_id, &evaluation, enforcement.as_ref());

        Ok(AnalysisOutcome {
            agent_id,
            intent_id: Some(record.intent_id),
            risk_score: evaluation.composite_score,
            risk_level: evaluation.risk_level,
            confidence: evaluation.confidence,
            signals: evaluation.signals,
            anomalies,
            explanation,
            run_state: profile.run_state,
            enforcement,
            remediation,
            audit_sequence: audit_entry.sequence,
        })
    }

    /// The killed-agent fast path: fixed verdict, no signal computation,
    /// still recorded in the audit chain and timeline.
    async fn reject_terminal(
        &self,
        request: &IntentRequest,
        profile: &DriftProfile,
    ) -> Result<AnalysisOutcome, EngineError> {
        let agent_id = profile.agent_id.clone();
        warn!(agent = %agent_id, "intent rejected: agent is killed");

        let audit_entry = self
            .audit
            .append(
                AuditEventKind::TerminalRejection,
                Some(agent_id.0.clone()),
                None,
                serde_json::json!({
                    "was_allowed": request.was_allowed,
                    "capability_count": request.capabilities.len(),
                }),
            )
            .await?;
        self.timeline.write().record(
            &agent_id,
            EventCategory::System,
            EventSeverity::Warning,
            "intent rejected without evaluation: agent is killed",
            None,
        )?;

        Ok(AnalysisOutcome {
            agent_id: agent_id.clone(),
            intent_id: None,
            risk_score: 1.0,
            risk_level: RiskLevel::Terminal,
            confidence: 1.0,
            signals: Vec::new(),
            anomalies: Vec::new(),
            explanation: explain_terminal_rejection(&agent_id),
            run_state: profile.run_state,
            enforcement: None,
            remediation: None,
            audit_sequence: audit_entry.sequence,
        })
    }

    /// Current governance state for one agent.
    pub async fn get_agent_status(&self, agent_id: &AgentId) -> Option<AgentStatus> {
        let entry = self.profiles.get(agent_id)?.value().clone();
        let profile = entry.lock().await;
        let baseline_state = self
            .matcher
            .read()
            .profile(agent_id)
            .map(|p| p.state);
        Some(AgentStatus {
            agent_id: agent_id.clone(),
            run_state: profile.run_state,
            total_intents: profile.total_intents,
            violation_count: profile.violation_count,
            resurrection_count: profile.resurrection_count,
            mean_recent_risk: profile.mean_recent_risk(),
            last_seen: profile.last_seen,
            baseline_state,
            enforcement_count: self.executor.history_for(agent_id).len(),
        })
    }

    /// Fleet-wide aggregate counts and the top-risk board.
    pub async fn risk_dashboard(&self) -> RiskDashboard {
        let mut dashboard = RiskDashboard {
            generated_at: chrono::Utc::now(),
            total_agents: 0,
            active: 0,
            throttled: 0,
            paused: 0,
            killed: 0,
            resurrected: 0,
            total_intents: 0,
            total_violations: 0,
            audit_entries: self.audit.len().await,
            top_risk_agents: Vec::new(),
        };

        let entries: Vec<(AgentId, Arc<Mutex<DriftProfile>>)> = self
            .profiles
            .iter()
            .map(|e| (e.key().clone(), e.value().clone()))
            .collect();

        let mut risks: Vec<(AgentId, f64)> = Vec::with_capacity(entries.len());
        for (agent_id, entry) in entries {
            let profile = entry.lock().await;
            dashboard.total_agents += 1;
            match profile.run_state {
                RunState::Active => dashboard.active += 1,
                RunState::Throttled => dashboard.throttled += 1,
                RunState::Paused => dashboard.paused += 1,
                RunState::Killed => dashboard.killed += 1,
                RunState::Resurrected => dashboard.resurrected += 1,
            }
            dashboard.total_intents += profile.total_intents;
            dashboard.total_violations += profile.violation_count;
            risks.push((agent_id, profile.mean_recent_risk()));
        }

        risks.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        risks.truncate(DASHBOARD_TOP_AGENTS);
        dashboard.top_risk_agents = risks;
        dashboard
    }

    /// Submit a human appeal against an agent's kill.
    pub async fn submit_resurrection_appeal(
        &self,
        agent_id: &AgentId,
        submitted_by: &str,
        reason: &str,
    ) -> Result<AppealRequest, EngineError> {
        let entry = self
            .profiles
            .get(agent_id)
            .ok_or_else(|| EngineError::AgentNotFound(agent_id.clone()))?
            .value()
            .clone();
        let profile = entry.lock().await;

        let kill = self.executor.last_kill(agent_id).ok_or_else(|| {
            EngineError::Enforcement(tirs_enforcement::EnforcementError::AgentNotKilled {
                agent: agent_id.clone(),
                state: profile.run_state,
            })
        })?;

        let appeal = self.appeals.submit(
            agent_id,
            profile.run_state,
            profile.resurrection_count,
            kill.enforcement_id,
            submitted_by,
            reason,
        )?;

        self.audit
            .append(
                AuditEventKind::AppealSubmitted,
                Some(agent_id.0.clone()),
                Some(submitted_by.to_string()),
                serde_json::json!({
                    "appeal_id": appeal.appeal_id,
                    "reason": reason,
                }),
            )
            .await?;
        self.timeline.write().record(
            agent_id,
            EventCategory::Appeal,
            EventSeverity::Info,
            format!("resurrection appeal submitted by {submitted_by}"),
            None,
        )?;

        Ok(appeal)
    }

    /// Record a human decision on a pending appeal; approval resurrects.
    pub async fn decide_appeal(
        &self,
        appeal_id: &AppealId,
        approve: bool,
        admin_id: &str,
    ) -> Result<AppealRequest, EngineError> {
        let appeal = self.appeals.decide(appeal_id, approve, admin_id)?;

        self.audit
            .append(
                if approve {
                    AuditEventKind::AppealApproved
                } else {
                    AuditEventKind::AppealDenied
                },
                Some(appeal.agent_id.0.clone()),
                Some(admin_id.to_string()),
                serde_json::json!({"appeal_id": appeal.appeal_id}),
            )
            .await?;

        if approve {
            self.resurrect_agent(
                &appeal.agent_id,
                admin_id,
                &format!("appeal {} approved", appeal.appeal_id),
            )
            .await?;
        }
        Ok(appeal)
    }

    /// Restore a killed agent to operation. Human-gated; bounded by the
    /// maximum-resurrections invariant.
    pub async fn resurrect_agent(
        &self,
        agent_id: &AgentId,
        admin_id: &str,
        reason: &str,
    ) -> Result<(), EngineError> {
        let entry = self
            .profiles
            .get(agent_id)
            .ok_or_else(|| EngineError::AgentNotFound(agent_id.clone()))?
            .value()
            .clone();
        let mut profile = entry.lock().await;

        self.appeals
            .check_eligibility(agent_id, profile.resurrection_count)?;
        self.executor
            .resurrect(
                &mut profile,
                admin_id,
                reason,
                self.config.drift.resurrection_retain_history,
            )
            .await?;
        Ok(())
    }

    /// Walk the full audit chain; faults are reported and themselves
    /// recorded as chain-incident events.
    pub async fn verify_audit_chain(&self) -> Result<ChainVerification, EngineError> {
        Ok(self.audit.verify_and_record().await?)
    }

    /// Export an agent's full forensic state (profile, timeline slice,
    /// detected patterns) as a standalone JSON artifact.
    pub async fn export_agent_forensics(
        &self,
        agent_id: &AgentId,
        path: &Path,
    ) -> Result<(), EngineError> {
        let entry = self
            .profiles
            .get(agent_id)
            .ok_or_else(|| EngineError::AgentNotFound(agent_id.clone()))?
            .value()
            .clone();
        let profile = entry.lock().await;

        let profile_dump = serde_json::to_value(&*profile)
            .map_err(tirs_forensics::ForensicError::Serialization)?;
        let recent_events = {
            let timeline = self.timeline.read();
            timeline
                .events_for_agent(agent_id)
                .into_iter()
                .cloned()
                .collect()
        };

        let mut environment = std::collections::BTreeMap::new();
        environment.insert(
            "engine_version".to_string(),
            env!("CARGO_PKG_VERSION").to_string(),
        );
        environment.insert(
            "embedding_provider".to_string(),
            self.provider.name().to_string(),
        );

        let snapshot = ForensicSnapshot::capture(
            agent_id.clone(),
            "export",
            profile_dump,
            recent_events,
            environment,
        );
        snapshot.export(path)?;
        Ok(())
    }

    /// Pattern findings for one agent over the timeline's sliding window.
    pub fn detect_patterns(&self, agent_id: &AgentId) -> Vec<PatternFinding> {
        self.timeline
            .read()
            .detect_patterns(agent_id, chrono::Utc::now())
    }

    /// Snapshots the executor captured for an agent (kills).
    pub fn kill_snapshots(&self, agent_id: &AgentId) -> Vec<ForensicSnapshot> {
        self.executor.snapshots_for(agent_id)
    }

    /// Enforcement history for one agent.
    pub fn enforcement_history(&self, agent_id: &AgentId) -> Vec<tirs_enforcement::EnforcementAction> {
        self.executor.history_for(agent_id)
    }

    pub fn set_system_state(&self, state: SystemState) {
        info!(?state, "system state changed");
        *self.system_state.write() = state;
    }

    pub fn system_state(&self) -> SystemState {
        *self.system_state.read()
    }

    /// The audit chain, for direct inspection.
    pub fn audit_chain(&self) -> &Arc<AuditChain> {
        &self.audit
    }
}

fn severity_for(level: RiskLevel) -> EventSeverity {
    match level {
        RiskLevel::Nominal | RiskLevel::Elevated => EventSeverity::Info,
        RiskLevel::Warning => EventSeverity::Warning,
        RiskLevel::Critical | RiskLevel::Terminal => EventSeverity::Critical,
    }
}
