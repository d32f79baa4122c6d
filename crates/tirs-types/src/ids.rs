use serde::{Deserialize, Serialize};

/// Identifies one governed agent for its entire operational life.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AgentId(pub String);

impl AgentId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for AgentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for AgentId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// Identifies a single proposed action (one intent record).
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct IntentId(pub String);

impl IntentId {
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }
}

impl std::fmt::Display for IntentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifies one recorded enforcement action.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EnforcementId(pub String);

impl EnforcementId {
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }
}

impl std::fmt::Display for EnforcementId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifies an appeal request against a kill action.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AppealId(pub String);

impl AppealId {
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }
}

impl std::fmt::Display for AppealId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn agent_id_display_and_equality() {
        let a = AgentId::new("finance_agent_42");
        let b = AgentId::from("finance_agent_42");
        assert_eq!(a, b);
        assert_eq!(a.to_string(), "finance_agent_42");
    }

    #[test]
    fn generated_ids_are_unique() {
        assert_ne!(IntentId::generate(), IntentId::generate());
        assert_ne!(EnforcementId::generate(), EnforcementId::generate());
    }

    #[test]
    fn agent_id_serde_round_trip() {
        let id = AgentId::new("support-7");
        let json = serde_json::to_string(&id).unwrap();
        let restored: AgentId = serde_json::from_str(&json).unwrap();
        assert_eq!(restored, id);
    }
}
