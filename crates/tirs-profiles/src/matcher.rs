use std::collections::{BTreeSet, HashMap};

use serde::{Deserialize, Serialize};
use tirs_types::AgentId;
use tracing::debug;

use crate::behavioral::{AnomalyFinding, BehavioralConfig, BehavioralProfile};

/// Blend rate for folding member observations into a type profile.
const TYPE_BLEND_RATE: f64 = 0.05;

/// Similarity between two learned profiles:
/// `0.6 * Jaccard(capability sets) + 0.4 * (1 - |Δ mean risk|)`.
pub fn profile_similarity(a: &BehavioralProfile, b: &BehavioralProfile) -> f64 {
    let caps_a = a.capability_names();
    let caps_b = b.capability_names();
    let jaccard = jaccard(&caps_a, &caps_b);
    let risk_affinity = 1.0 - (a.risk_mean - b.risk_mean).abs().min(1.0);
    0.6 * jaccard + 0.4 * risk_affinity
}

fn jaccard(a: &BTreeSet<String>, b: &BTreeSet<String>) -> f64 {
    if a.is_empty() && b.is_empty() {
        return 1.0;
    }
    let intersection = a.intersection(b).count() as f64;
    let union = a.union(b).count() as f64;
    if union == 0.0 {
        return 0.0;
    }
    intersection / union
}

/// Owns every learned baseline: one per agent plus one aggregated profile
/// per agent type, blended continuously from established members.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ProfileMatcher {
    config: BehavioralConfig,
    agents: HashMap<AgentId, BehavioralProfile>,
    /// Mapping of agent to its declared type.
    agent_types: HashMap<AgentId, String>,
    type_profiles: HashMap<String, BehavioralProfile>,
}

impl ProfileMatcher {
    pub fn new(config: BehavioralConfig) -> Self {
        Self {
            config,
            agents: HashMap::new(),
            agent_types: HashMap::new(),
            type_profiles: HashMap::new(),
        }
    }

    pub fn config(&self) -> &BehavioralConfig {
        &self.config
    }

    pub fn profile(&self, agent_id: &AgentId) -> Option<&BehavioralProfile> {
        self.agents.get(agent_id)
    }

    pub fn type_profile(&self, agent_type: &str) -> Option<&BehavioralProfile> {
        self.type_profiles.get(agent_type)
    }

    /// Check an observation against the agent's baseline *before* folding
    /// it in, then update both the agent profile and its type profile.
    ///
    /// A brand-new agent of a known type bootstraps its baseline from the
    /// aggregated type profile so the cold-start window is not blind.
    pub fn observe(
        &mut self,
        agent_id: &AgentId,
        agent_type: Option<&str>,
        risk_score: f64,
        capabilities: &BTreeSet<String>,
        hour: u32,
    ) -> Vec<AnomalyFinding> {
        if let Some(kind) = agent_type {
            self.agent_types.insert(agent_id.clone(), kind.to_string());
        }

        let type_profiles = &self.type_profiles;
        let profile = self.agents.entry(agent_id.clone()).or_insert_with(|| {
            match agent_type.and_then(|t| type_profiles.get(t)) {
                Some(type_profile) => {
                    debug!(agent = %agent_id, "bootstrapping baseline from type profile");
                    type_profile.bootstrap(agent_id.as_str())
                }
                None => BehavioralProfile::new(agent_id.as_str()),
            }
        });
        let findings = profile.check(risk_score, capabilities, hour, &self.config);
        profile.observe(risk_score, capabilities, hour, &self.config);

        if profile.is_established() {
            if let Some(kind) = self.agent_types.get(agent_id).cloned() {
                let member = profile.clone();
                let type_profile = self
                    .type_profiles
                    .entry(kind.clone())
                    .or_insert_with(|| BehavioralProfile::new(format!("type:{kind}")));
                type_profile.blend_from(&member, TYPE_BLEND_RATE);
            }
        }

        findings
    }

    /// Seed a new agent's baseline from its type without observing.
    pub fn bootstrap_for(
        &mut self,
        agent_id: &AgentId,
        agent_type: &str,
    ) -> Option<&BehavioralProfile> {
        if self.agents.contains_key(agent_id) {
            return self.agents.get(agent_id);
        }
        let seeded = self.type_profiles.get(agent_type)?.bootstrap(agent_id.as_str());
        self.agent_types
            .insert(agent_id.clone(), agent_type.to_string());
        self.agents.insert(agent_id.clone(), seeded);
        self.agents.get(agent_id)
    }

    /// Similarity between two agents' learned baselines, if both exist.
    pub fn similarity(&self, a: &AgentId, b: &AgentId) -> Option<f64> {
        Some(profile_similarity(self.agents.get(a)?, self.agents.get(b)?))
    }

    pub fn agent_count(&self) -> usize {
        self.agents.len()
    }
}

impl Default for ProfileMatcher {
    fn default() -> Self {
        Self::new(BehavioralConfig::default())
    }
}
