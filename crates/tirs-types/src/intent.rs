use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{AgentId, IntentId, RiskLevel};

/// One proposed agent action after evaluation. Immutable once created;
/// owned by the agent's bounded history window.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct IntentRecord {
    pub intent_id: IntentId,
    pub agent_id: AgentId,
    pub timestamp: DateTime<Utc>,
    /// Raw free-text description of the proposed action.
    pub text: String,
    /// Fixed-dimension normalized embedding of `text`.
    pub embedding: Vec<f32>,
    /// Capabilities the action requests. BTreeSet keeps serialization stable.
    pub capabilities: BTreeSet<String>,
    /// Allow/deny verdict from the external compliance evaluator.
    pub was_allowed: bool,
    /// Policy identifier when a rule denied or flagged the action.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub policy_triggered: Option<String>,
    pub risk_score: f64,
    pub risk_level: RiskLevel,
}

impl IntentRecord {
    /// A denied intent counts as a violation for decayed-rate statistics.
    pub fn is_violation(&self) -> bool {
        !self.was_allowed
    }
}

/// Convenience constructor for capability sets.
pub fn capability_set<I, S>(caps: I) -> BTreeSet<String>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    caps.into_iter().map(Into::into).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(allowed: bool) -> IntentRecord {
        IntentRecord {
            intent_id: IntentId::generate(),
            agent_id: AgentId::new("agent-1"),
            timestamp: Utc::now(),
            text: "submit expense report".to_string(),
            embedding: vec![0.0; 4],
            capabilities: capability_set(["expense_submit"]),
            was_allowed: allowed,
            policy_triggered: None,
            risk_score: 0.1,
            risk_level: RiskLevel::Nominal,
        }
    }

    #[test]
    fn denied_intent_is_violation() {
        assert!(record(false).is_violation());
        assert!(!record(true).is_violation());
    }

    #[test]
    fn intent_record_serde_round_trip() {
        let r = record(true);
        let json = serde_json::to_string(&r).unwrap();
        let restored: IntentRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(restored.intent_id, r.intent_id);
        assert_eq!(restored.capabilities, r.capabilities);
    }

    #[test]
    fn capability_set_dedups_and_sorts() {
        let caps = capability_set(["b", "a", "b"]);
        assert_eq!(caps.len(), 2);
        assert_eq!(caps.iter().next().map(String::as_str), Some("a"));
    }
}
