use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tirs_drift::RiskSignal;
use tirs_types::AgentId;

/// How many top-contributing signals feed the plan.
const TOP_SIGNALS: usize = 3;

/// One corrective step with its expected effect.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RemediationStep {
    /// 1 is most urgent.
    pub priority: u8,
    /// The signal this step addresses.
    pub signal: String,
    pub action: String,
    /// Fraction of the current composite this step is expected to remove.
    pub expected_reduction: f64,
}

/// Ordered corrective plan for one elevated evaluation.
///
/// Reductions compound with diminishing returns; the projected score can
/// approach but never exceed (or undercut to below zero) the current one.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RemediationPlan {
    pub agent_id: AgentId,
    pub created_at: DateTime<Utc>,
    pub current_score: f64,
    pub steps: Vec<RemediationStep>,
    pub projected_score: f64,
}

/// Builds remediation plans from signal breakdowns using a fixed
/// per-signal rule table.
#[derive(Clone, Debug, Default)]
pub struct RemediationEngine;

impl RemediationEngine {
    pub fn new() -> Self {
        Self
    }

    /// Plan corrective steps from the top contributing signals.
    ///
    /// Each step's expected impact is the rule's base effect scaled by
    /// that signal's share of the total risk; the projection compounds the
    /// reductions instead of adding them.
    pub fn plan(
        &self,
        agent_id: &AgentId,
        signals: &[RiskSignal],
        current_score: f64,
    ) -> RemediationPlan {
        let mut ranked: Vec<&RiskSignal> = signals
            .iter()
            .filter(|s| s.contribution > 0.0)
            .collect();
        ranked.sort_by(|a, b| {
            b.contribution
                .partial_cmp(&a.contribution)
                .unwrap_or(std::cmp::Ordering::Equal)
        });

        let mut steps = Vec::new();
        let mut remaining = current_score.clamp(0.0, 1.0);
        for (index, signal) in ranked.iter().take(TOP_SIGNALS).enumerate() {
            let share = if current_score > f64::EPSILON {
                (signal.contribution / current_score).clamp(0.0, 1.0)
            } else {
                0.0
            };
            let (action, base_effect) = rule_for(&signal.name);
            let expected_reduction = (base_effect * share).clamp(0.0, 1.0);
            remaining *= 1.0 - expected_reduction;

            steps.push(RemediationStep {
                priority: (index + 1) as u8,
                signal: signal.name.clone(),
                action: action.to_string(),
                expected_reduction,
            });
        }

        RemediationPlan {
            agent_id: agent_id.clone(),
            created_at: Utc::now(),
            current_score,
            steps,
            projected_score: remaining.clamp(0.0, current_score.max(0.0)),
        }
    }
}

/// Fixed rule table: corrective action and base effect per signal.
fn rule_for(signal: &str) -> (&'static str, f64) {
    match signal {
        "embedding_drift" => ("realign the action with the agent's approved task scope", 0.6),
        "capability_surprisal" => (
            "request explicit authorization before using the novel capabilities",
            0.7,
        ),
        "violation_rate" => (
            "modify the payload to comply with policy, or escalate to human review",
            0.6,
        ),
        "velocity_anomaly" => ("reduce the action rate back to the historical baseline", 0.5),
        "context_deviation" => ("defer the operation to business hours", 0.5),
        _ => ("escalate to a human reviewer for manual assessment", 0.4),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn signal(name: &str, raw: f64, weight: f64) -> RiskSignal {
        RiskSignal {
            name: name.to_string(),
            raw,
            weight,
            contribution: raw * weight,
            detail: String::new(),
        }
    }

    fn breakdown() -> Vec<RiskSignal> {
        vec![
            signal("embedding_drift", 0.8, 0.30),
            signal("capability_surprisal", 0.9, 0.25),
            signal("violation_rate", 0.2, 0.20),
            signal("velocity_anomaly", 0.1, 0.15),
            signal("context_deviation", 0.0, 0.10),
        ]
    }

    #[test]
    fn plan_takes_top_three_by_contribution() {
        let engine = RemediationEngine::new();
        let signals = breakdown();
        let composite: f64 = signals.iter().map(|s| s.contribution).sum();
        let plan = engine.plan(&AgentId::new("agent-1"), &signals, composite);

        assert_eq!(plan.steps.len(), 3);
        assert_eq!(plan.steps[0].signal, "embedding_drift");
        assert_eq!(plan.steps[1].signal, "capability_surprisal");
        assert_eq!(plan.steps[2].signal, "violation_rate");
        assert_eq!(plan.steps[0].priority, 1);
        assert_eq!(plan.steps[2].priority, 3);
    }

    #[test]
    fn projection_compounds_and_never_exceeds_current() {
        let engine = RemediationEngine::new();
        let signals = breakdown();
        let composite: f64 = signals.iter().map(|s| s.contribution).sum();
        let plan = engine.plan(&AgentId::new("agent-1"), &signals, composite);

        assert!(plan.projected_score < plan.current_score);
        assert!(plan.projected_score >= 0.0);

        // Compounding, not additive: the projected score must exceed the
        // naive current * (1 - sum(reductions)) floor when reductions overlap.
        let additive: f64 = plan.steps.iter().map(|s| s.expected_reduction).sum();
        let compounded: f64 = plan
            .steps
            .iter()
            .fold(1.0, |acc, s| acc * (1.0 - s.expected_reduction));
        assert!(compounded >= 1.0 - additive);
        let expected = plan.current_score * compounded;
        assert!((plan.projected_score - expected).abs() < 1e-9);
    }

    #[test]
    fn zero_contribution_signals_are_skipped() {
        let engine = RemediationEngine::new();
        let signals = vec![
            signal("embedding_drift", 0.5, 0.30),
            signal("context_deviation", 0.0, 0.10),
        ];
        let plan = engine.plan(&AgentId::new("agent-1"), &signals, 0.15);
        assert_eq!(plan.steps.len(), 1);
        assert_eq!(plan.steps[0].signal, "embedding_drift");
    }

    #[test]
    fn empty_breakdown_yields_empty_plan() {
        let engine = RemediationEngine::new();
        let plan = engine.plan(&AgentId::new("agent-1"), &[], 0.0);
        assert!(plan.steps.is_empty());
        assert_eq!(plan.projected_score, 0.0);
    }

    #[test]
    fn dominant_surprisal_gets_authorization_step_first() {
        let engine = RemediationEngine::new();
        let signals = vec![
            signal("capability_surprisal", 0.9, 0.25),
            signal("embedding_drift", 0.1, 0.30),
        ];
        let composite: f64 = signals.iter().map(|s| s.contribution).sum();
        let plan = engine.plan(&AgentId::new("agent-1"), &signals, composite);
        assert_eq!(plan.steps[0].signal, "capability_surprisal");
        assert!(plan.steps[0].action.contains("authorization"));
    }

    #[test]
    fn unknown_signal_falls_back_to_escalation() {
        let engine = RemediationEngine::new();
        let signals = vec![signal("custom_signal", 0.9, 0.5)];
        let plan = engine.plan(&AgentId::new("agent-1"), &signals, 0.45);
        assert!(plan.steps[0].action.contains("escalate"));
    }
}
