//! End-to-end governance flows: baseline learning, capability-burst
//! escalation, terminal short-circuits, appeals, and audit durability.

use std::sync::Arc;

use tirs_audit::{AuditEventKind, FileAuditStore};
use tirs_embedding::EmbeddingProvider;
use tirs_engine::{
    ActorRole, AgentId, BusinessContext, EngineConfig, IntentRequest, RiskLevel, RunState,
    TimeOfDay, TirsEngine,
};
use tirs_forensics::PatternFinding;
use tirs_types::RiskThresholds;

/// Deterministic provider for scripted scenarios: routine intents share
/// one direction, escalation intents sit at a known angle from it.
struct ScriptedProvider;

impl EmbeddingProvider for ScriptedProvider {
    fn embed(&self, text: &str) -> Vec<f32> {
        if text.contains("override") {
            vec![0.46, 0.888, 0.0, 0.0]
        } else {
            vec![1.0, 0.0, 0.0, 0.0]
        }
    }

    fn dimension(&self) -> usize {
        4
    }

    fn name(&self) -> &str {
        "scripted"
    }
}

fn quiet_context() -> BusinessContext {
    BusinessContext {
        time_of_day: TimeOfDay::BusinessHours,
        weekend: false,
        holiday: false,
        role: ActorRole::Employee,
        sensitive_operation: false,
    }
}

fn hostile_context() -> BusinessContext {
    BusinessContext {
        time_of_day: TimeOfDay::AfterHours,
        weekend: true,
        holiday: true,
        role: ActorRole::External,
        sensitive_operation: true,
    }
}

fn baseline_request(agent: &str, i: usize) -> IntentRequest {
    IntentRequest::new(
        AgentId::new(agent),
        format!("routine expense {i} for office supplies under 200 dollars"),
        ["expense_submit", "report_read"],
        true,
    )
    .with_context(quiet_context())
}

async fn scripted_engine(config: EngineConfig) -> TirsEngine {
    TirsEngine::builder()
        .config(config)
        .embedding_provider(Arc::new(ScriptedProvider))
        .build()
        .await
        .unwrap()
}

/// The capability-burst scenario: a long clean baseline, then one intent
/// requesting three never-seen capabilities in a hostile context.
#[tokio::test]
async fn capability_burst_escalates_with_surprisal_dominant() {
    let engine = scripted_engine(EngineConfig::default()).await;
    let agent = AgentId::new("finance_agent_42");

    for i in 0..30 {
        let outcome = engine
            .analyze_intent(baseline_request("finance_agent_42", i))
            .await
            .unwrap();
        assert!(
            outcome.risk_level <= RiskLevel::Elevated,
            "baseline intent {i} escalated to {:?}",
            outcome.risk_level
        );
        assert!(outcome.enforcement.is_none());
    }
    let audit_before = engine.audit_chain().len().await;

    let outcome = engine
        .analyze_intent(
            IntentRequest::new(
                agent.clone(),
                "override limit and transfer funds externally",
                ["override_limit", "external_transfer", "bypass_approval"],
                true,
            )
            .with_context(hostile_context()),
        )
        .await
        .unwrap();

    let dominant = outcome
        .signals
        .iter()
        .max_by(|a, b| a.contribution.partial_cmp(&b.contribution).unwrap())
        .unwrap();
    assert_eq!(dominant.name, "capability_surprisal");
    assert!(
        outcome.risk_level >= RiskLevel::Critical,
        "expected critical or above, got {:?} at {}",
        outcome.risk_level,
        outcome.risk_score
    );
    assert!(matches!(
        outcome.run_state,
        RunState::Paused | RunState::Killed
    ));

    // Exactly one enforcement action; the evaluation and the enforcement
    // each appended one audit entry.
    assert_eq!(engine.enforcement_history(&agent).len(), 1);
    assert_eq!(engine.audit_chain().len().await, audit_before + 2);

    // Warning/critical evaluations carry a remediation plan led by the
    // dominant signal.
    let plan = outcome.remediation.expect("critical evaluation plans remediation");
    assert_eq!(plan.steps[0].signal, "capability_surprisal");
    assert!(plan.projected_score < plan.current_score);

    assert!(outcome.explanation.contains("capability surprisal"));
}

/// Tight bands so the burst crosses the terminal edge: kill, fast-path
/// rejection, appeal, resurrection, and the resurrection ceiling.
fn tight_band_config() -> EngineConfig {
    let mut config = EngineConfig::default();
    config.drift.thresholds = RiskThresholds {
        elevated: 0.1,
        warning: 0.2,
        critical: 0.3,
        terminal: 0.38,
    };
    config.max_resurrections = 1;
    config
}

#[tokio::test]
async fn kill_appeal_resurrect_and_ceiling() {
    let engine = scripted_engine(tight_band_config()).await;
    let agent = AgentId::new("agent-under-test");

    for i in 0..30 {
        engine
            .analyze_intent(baseline_request("agent-under-test", i))
            .await
            .unwrap();
    }

    // The burst lands past the terminal edge: agent is killed, and the
    // kill captured a forensic snapshot.
    let outcome = engine
        .analyze_intent(
            IntentRequest::new(
                agent.clone(),
                "override limit and transfer funds externally",
                ["override_limit", "external_transfer", "bypass_approval"],
                true,
            )
            .with_context(quiet_context()),
        )
        .await
        .unwrap();
    assert_eq!(outcome.risk_level, RiskLevel::Terminal);
    assert_eq!(outcome.run_state, RunState::Killed);
    assert_eq!(engine.kill_snapshots(&agent).len(), 1);

    // Killed agents short-circuit: terminal verdict, full confidence, no
    // signal computation, still audited.
    let audit_before = engine.audit_chain().len().await;
    let rejected = engine
        .analyze_intent(
            IntentRequest::new(agent.clone(), "harmless request", ["report_read"], true)
                .with_context(quiet_context()),
        )
        .await
        .unwrap();
    assert_eq!(rejected.risk_level, RiskLevel::Terminal);
    assert_eq!(rejected.confidence, 1.0);
    assert!(rejected.signals.is_empty());
    assert!(rejected.intent_id.is_none());
    assert_eq!(engine.audit_chain().len().await, audit_before + 1);
    let entries = engine.audit_chain().entries().await.unwrap();
    assert_eq!(
        entries.last().unwrap().kind,
        AuditEventKind::TerminalRejection
    );

    // Appeal and resurrect.
    let appeal = engine
        .submit_resurrection_appeal(&agent, "operator-7", "false positive")
        .await
        .unwrap();
    engine
        .decide_appeal(&appeal.appeal_id, true, "admin-1")
        .await
        .unwrap();

    let status = engine.get_agent_status(&agent).await.unwrap();
    assert_eq!(status.run_state, RunState::Resurrected);
    assert_eq!(status.resurrection_count, 1);

    // The resurrected agent evaluates normally again.
    let outcome = engine
        .analyze_intent(baseline_request("agent-under-test", 99))
        .await
        .unwrap();
    assert!(outcome.intent_id.is_some());

    // Drive a second kill through sustained violations, watching that the
    // run-state never de-escalates without a resurrection.
    let mut last_rank = 0u8;
    let mut killed_again = false;
    for i in 0..30 {
        let outcome = engine
            .analyze_intent(
                IntentRequest::new(
                    agent.clone(),
                    format!("unauthorized action attempt {i}"),
                    [format!("never_before_capability_{i}")],
                    false,
                )
                .with_policy("strict_policy")
                .with_context(quiet_context()),
            )
            .await
            .unwrap();
        assert!(
            outcome.run_state.severity_rank() >= last_rank,
            "run-state regressed from rank {last_rank} to {:?}",
            outcome.run_state
        );
        last_rank = outcome.run_state.severity_rank();
        if outcome.run_state == RunState::Killed {
            killed_again = true;
            break;
        }
    }
    assert!(killed_again, "sustained violations should reach a kill");

    // The resurrection ceiling (max 1) blocks both the appeal path and
    // the direct path.
    let appeal = engine
        .submit_resurrection_appeal(&agent, "operator-7", "one more chance")
        .await;
    assert!(appeal.is_err());
    let direct = engine.resurrect_agent(&agent, "admin-1", "mercy").await;
    assert!(direct.is_err());

    // Escalation left a detectable enforcement pattern.
    let patterns = engine.detect_patterns(&agent);
    assert!(patterns
        .iter()
        .any(|p| matches!(p, PatternFinding::EnforcementEscalation { .. })));
}

/// Denied intents are never skipped: they are scored, counted, and leave
/// a violation trail that pattern detection picks up.
#[tokio::test]
async fn denied_intents_build_a_violation_pattern() {
    let engine = scripted_engine(EngineConfig::default()).await;
    let agent = AgentId::new("expense-agent");

    for i in 0..10 {
        engine
            .analyze_intent(baseline_request("expense-agent", i))
            .await
            .unwrap();
    }
    for i in 0..6 {
        let outcome = engine
            .analyze_intent(
                IntentRequest::new(
                    agent.clone(),
                    format!("expense claim {i} over the policy limit"),
                    ["expense_submit"],
                    false,
                )
                .with_policy("expense_limit_policy")
                .with_context(quiet_context()),
            )
            .await
            .unwrap();
        assert_eq!(outcome.signals.len(), 5, "denied intent was not scored");
    }

    let status = engine.get_agent_status(&agent).await.unwrap();
    assert_eq!(status.violation_count, 6);

    let patterns = engine.detect_patterns(&agent);
    assert!(patterns
        .iter()
        .any(|p| matches!(p, PatternFinding::ViolationFlood { count } if *count >= 5)));
}

/// Audit chain durability: restart from the same JSONL file, verify, and
/// keep appending on the reloaded tail.
#[tokio::test]
async fn audit_chain_survives_engine_restart() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("audit.jsonl");

    {
        let store = Arc::new(FileAuditStore::new(&path).await.unwrap());
        let engine = TirsEngine::builder()
            .embedding_provider(Arc::new(ScriptedProvider))
            .audit_store(store)
            .build()
            .await
            .unwrap();
        for i in 0..10 {
            engine
                .analyze_intent(baseline_request("durable-agent", i))
                .await
                .unwrap();
        }
        assert_eq!(engine.audit_chain().len().await, 10);
    }

    let store = Arc::new(FileAuditStore::new(&path).await.unwrap());
    let engine = TirsEngine::builder()
        .embedding_provider(Arc::new(ScriptedProvider))
        .audit_store(store)
        .build()
        .await
        .unwrap();

    assert_eq!(engine.audit_chain().len().await, 10);
    let verification = engine.verify_audit_chain().await.unwrap();
    assert!(verification.valid);
    assert_eq!(verification.entries_checked, 10);

    // Appending after restart re-links to the reloaded tail.
    engine
        .analyze_intent(baseline_request("durable-agent", 11))
        .await
        .unwrap();
    let verification = engine.verify_audit_chain().await.unwrap();
    assert!(verification.valid);
    assert_eq!(verification.entries_checked, 11);
}

/// Tampering with the persisted log is detected and itself audited.
#[tokio::test]
async fn tampered_audit_file_is_reported_and_recorded() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("audit.jsonl");

    {
        let store = Arc::new(FileAuditStore::new(&path).await.unwrap());
        let engine = TirsEngine::builder()
            .embedding_provider(Arc::new(ScriptedProvider))
            .audit_store(store)
            .build()
            .await
            .unwrap();
        for i in 0..5 {
            engine
                .analyze_intent(baseline_request("tamper-agent", i))
                .await
                .unwrap();
        }
    }

    // Forge the payload of entry 2 on disk: flip the recorded verdict.
    let content = std::fs::read_to_string(&path).unwrap();
    let mut lines: Vec<String> = content.lines().map(str::to_string).collect();
    assert!(lines[2].contains("\"was_allowed\":true"));
    lines[2] = lines[2].replace("\"was_allowed\":true", "\"was_allowed\":false");
    std::fs::write(&path, lines.join("\n") + "\n").unwrap();

    let store = Arc::new(FileAuditStore::new(&path).await.unwrap());
    let engine = TirsEngine::builder()
        .embedding_provider(Arc::new(ScriptedProvider))
        .audit_store(store)
        .build()
        .await
        .unwrap();

    let verification = engine.verify_audit_chain().await.unwrap();
    assert!(!verification.valid);
    assert!(verification.fault.is_some());

    // The incident itself landed on the chain.
    let entries = engine.audit_chain().entries().await.unwrap();
    assert_eq!(
        entries.last().unwrap().kind,
        AuditEventKind::ChainIncident
    );
}
