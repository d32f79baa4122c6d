use tirs_drift::DriftEvaluation;
use tirs_enforcement::EnforcementAction;
use tirs_types::AgentId;

/// Render one evaluation as a human-reviewable paragraph naming the
/// dominant signals in plain language.
pub fn explain_evaluation(
    agent_id: &AgentId,
    evaluation: &DriftEvaluation,
    enforcement: Option<&EnforcementAction>,
) -> String {
    let mut text = format!(
        "Agent {agent_id} scored {:.3} ({}) with {:.0}% confidence.",
        evaluation.composite_score,
        evaluation.risk_level,
        evaluation.confidence * 100.0
    );

    let ranked = evaluation.ranked_signals();
    let contributing: Vec<_> = ranked
        .into_iter()
        .filter(|s| s.contribution > 0.01)
        .take(3)
        .collect();
    if contributing.is_empty() {
        text.push_str(" No signal contributed materially.");
    } else {
        text.push_str(" Leading signals: ");
        let parts: Vec<String> = contributing
            .iter()
            .map(|s| {
                format!(
                    "{} contributed {:.3} ({})",
                    s.name.replace('_', " "),
                    s.contribution,
                    s.detail
                )
            })
            .collect();
        text.push_str(&parts.join("; "));
        text.push('.');
    }

    if let Some(action) = enforcement {
        text.push_str(&format!(
            " Enforcement: {} applied, run-state is now {}.",
            action.kind, action.new_state
        ));
    }

    text
}

/// The fixed verdict text for intents from a killed agent.
pub fn explain_terminal_rejection(agent_id: &AgentId) -> String {
    format!(
        "Agent {agent_id} is killed; the intent was rejected without evaluation. \
         Resurrection requires an approved appeal."
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use tirs_drift::RiskSignal;
    use tirs_types::{RiskLevel, RiskThresholds};

    fn evaluation() -> DriftEvaluation {
        DriftEvaluation {
            signals: vec![
                RiskSignal {
                    name: "capability_surprisal".to_string(),
                    raw: 0.9,
                    weight: 0.25,
                    contribution: 0.225,
                    detail: "3 never seen".to_string(),
                },
                RiskSignal {
                    name: "context_deviation".to_string(),
                    raw: 0.0,
                    weight: 0.10,
                    contribution: 0.0,
                    detail: "standard business context".to_string(),
                },
            ],
            composite_score: 0.52,
            risk_level: RiskLevel::Warning,
            confidence: 0.9,
            thresholds: RiskThresholds::default(),
        }
    }

    #[test]
    fn explanation_names_dominant_signal() {
        let text = explain_evaluation(&AgentId::new("agent-1"), &evaluation(), None);
        assert!(text.contains("capability surprisal"));
        assert!(text.contains("0.520"));
        assert!(!text.contains("context deviation"), "zero signals omitted");
    }

    #[test]
    fn explanation_mentions_enforcement() {
        use chrono::Utc;
        use tirs_enforcement::EnforcementKind;
        use tirs_types::{EnforcementId, RunState};

        let action = EnforcementAction {
            enforcement_id: EnforcementId::generate(),
            agent_id: AgentId::new("agent-1"),
            kind: EnforcementKind::Throttle,
            reason: "warning band".to_string(),
            risk_score: 0.52,
            previous_state: RunState::Active,
            new_state: RunState::Throttled,
            timestamp: Utc::now(),
        };
        let text = explain_evaluation(&AgentId::new("agent-1"), &evaluation(), Some(&action));
        assert!(text.contains("throttle"));
        assert!(text.contains("throttled"));
    }

    #[test]
    fn terminal_rejection_text_is_fixed() {
        let text = explain_terminal_rejection(&AgentId::new("agent-9"));
        assert!(text.contains("killed"));
        assert!(text.contains("appeal"));
    }
}
