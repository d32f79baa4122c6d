use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use tirs_types::{AgentId, BusinessContext};

/// One intent submitted for analysis.
///
/// The allow/deny verdict and optional policy reference come from the
/// external compliance evaluator; the engine scores denied intents too.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct IntentRequest {
    pub agent_id: AgentId,
    pub intent_text: String,
    pub capabilities: BTreeSet<String>,
    pub was_allowed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub policy_triggered: Option<String>,
    /// Derived fresh by the engine when absent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<BusinessContext>,
    /// Agent type for cold-start borrowing and type multipliers.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub agent_type: Option<String>,
}

impl IntentRequest {
    pub fn new(
        agent_id: impl Into<AgentId>,
        intent_text: impl Into<String>,
        capabilities: impl IntoIterator<Item = impl Into<String>>,
        was_allowed: bool,
    ) -> Self {
        Self {
            agent_id: agent_id.into(),
            intent_text: intent_text.into(),
            capabilities: capabilities.into_iter().map(Into::into).collect(),
            was_allowed,
            policy_triggered: None,
            context: None,
            agent_type: None,
        }
    }

    pub fn with_policy(mut self, policy: impl Into<String>) -> Self {
        self.policy_triggered = Some(policy.into());
        self
    }

    pub fn with_context(mut self, context: BusinessContext) -> Self {
        self.context = Some(context);
        self
    }

    pub fn with_agent_type(mut self, agent_type: impl Into<String>) -> Self {
        self.agent_type = Some(agent_type.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_style_construction() {
        let request = IntentRequest::new(
            AgentId::new("agent-1"),
            "submit expense",
            ["expense_submit"],
            true,
        )
        .with_policy("expense_policy")
        .with_agent_type("finance");

        assert_eq!(request.agent_id, AgentId::new("agent-1"));
        assert_eq!(request.policy_triggered.as_deref(), Some("expense_policy"));
        assert_eq!(request.agent_type.as_deref(), Some("finance"));
        assert!(request.capabilities.contains("expense_submit"));
    }
}
