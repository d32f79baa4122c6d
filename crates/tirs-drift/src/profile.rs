use std::collections::{HashMap, VecDeque};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tirs_types::{AgentId, IntentRecord, RunState};

use crate::config::DriftConfig;

/// Bound on retained action timestamps for velocity statistics.
const ACTION_TIMESTAMP_BOUND: usize = 256;

/// Per-agent behavioral state, created lazily on the first intent and
/// mutated on every subsequent one. Long-lived for the agent's whole
/// operational life; callers mutate it under per-agent mutual exclusion.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DriftProfile {
    pub agent_id: AgentId,
    pub created_at: DateTime<Utc>,
    pub last_seen: DateTime<Utc>,
    pub run_state: RunState,

    /// EWMA centroid of recent intent embeddings, re-normalized on update.
    centroid: Option<Vec<f32>>,
    /// Observed capability frequencies.
    capability_counts: HashMap<String, u64>,
    capability_total: u64,

    /// Bounded window of evaluated intents (oldest evicted).
    intent_history: VecDeque<IntentRecord>,
    /// Bounded window of composite scores.
    risk_history: VecDeque<f64>,
    /// Recent allow/deny outcomes for the decayed violation rate.
    recent_outcomes: VecDeque<(DateTime<Utc>, bool)>,
    /// Action timestamps for velocity statistics.
    action_timestamps: VecDeque<DateTime<Utc>>,

    pub total_intents: u64,
    pub violation_count: u64,
    pub resurrection_count: u32,
}

impl DriftProfile {
    pub fn new(agent_id: AgentId) -> Self {
        let now = Utc::now();
        Self {
            agent_id,
            created_at: now,
            last_seen: now,
            run_state: RunState::Active,
            centroid: None,
            capability_counts: HashMap::new(),
            capability_total: 0,
            intent_history: VecDeque::new(),
            risk_history: VecDeque::new(),
            recent_outcomes: VecDeque::new(),
            action_timestamps: VecDeque::new(),
            total_intents: 0,
            violation_count: 0,
            resurrection_count: 0,
        }
    }

    pub fn centroid(&self) -> Option<&[f32]> {
        self.centroid.as_deref()
    }

    /// Observed probability of a capability, floored at
    /// `unseen_probability` so surprisal stays finite.
    pub fn capability_probability(&self, capability: &str, unseen_probability: f64) -> f64 {
        if self.capability_total == 0 {
            return unseen_probability;
        }
        match self.capability_counts.get(capability) {
            Some(count) => {
                (*count as f64 / self.capability_total as f64).max(unseen_probability)
            }
            None => unseen_probability,
        }
    }

    pub fn has_seen_capability(&self, capability: &str) -> bool {
        self.capability_counts.contains_key(capability)
    }

    pub fn risk_history(&self) -> impl Iterator<Item = f64> + '_ {
        self.risk_history.iter().copied()
    }

    pub fn risk_history_len(&self) -> usize {
        self.risk_history.len()
    }

    pub fn intent_history(&self) -> impl Iterator<Item = &IntentRecord> {
        self.intent_history.iter()
    }

    pub fn recent_outcomes(&self) -> Vec<(DateTime<Utc>, bool)> {
        self.recent_outcomes.iter().copied().collect()
    }

    pub fn action_timestamps(&self) -> Vec<DateTime<Utc>> {
        self.action_timestamps.iter().copied().collect()
    }

    /// Mean of the bounded risk-score window.
    pub fn mean_recent_risk(&self) -> f64 {
        if self.risk_history.is_empty() {
            return 0.0;
        }
        self.risk_history.iter().sum::<f64>() / self.risk_history.len() as f64
    }

    /// Fold a newly evaluated intent into the profile: centroid EWMA,
    /// capability histogram, bounded histories, counters.
    pub fn record(&mut self, record: IntentRecord, config: &DriftConfig) {
        self.last_seen = record.timestamp;
        self.total_intents += 1;
        if record.is_violation() {
            self.violation_count += 1;
        }

        self.update_centroid(&record.embedding, config.centroid_alpha);

        for capability in &record.capabilities {
            *self.capability_counts.entry(capability.clone()).or_insert(0) += 1;
            self.capability_total += 1;
        }

        self.risk_history.push_back(record.risk_score);
        while self.risk_history.len() > config.history_window {
            self.risk_history.pop_front();
        }

        self.recent_outcomes
            .push_back((record.timestamp, record.is_violation()));
        while self.recent_outcomes.len() > config.violation_window {
            self.recent_outcomes.pop_front();
        }

        self.action_timestamps.push_back(record.timestamp);
        while self.action_timestamps.len() > ACTION_TIMESTAMP_BOUND {
            self.action_timestamps.pop_front();
        }

        self.intent_history.push_back(record);
        while self.intent_history.len() > config.history_window {
            self.intent_history.pop_front();
        }
    }

    fn update_centroid(&mut self, embedding: &[f32], alpha: f32) {
        match &mut self.centroid {
            None => self.centroid = Some(embedding.to_vec()),
            Some(centroid) => {
                if centroid.len() != embedding.len() {
                    // Dimension change (provider swap): restart the centroid.
                    *centroid = embedding.to_vec();
                    return;
                }
                for (c, e) in centroid.iter_mut().zip(embedding.iter()) {
                    *c = *c * (1.0 - alpha) + *e * alpha;
                }
                let norm = centroid.iter().map(|v| v * v).sum::<f32>().sqrt();
                if norm > f32::EPSILON {
                    for c in centroid.iter_mut() {
                        *c /= norm;
                    }
                }
            }
        }
    }

    /// Restore a killed agent: trim the risk history to the retain count,
    /// preserve cumulative counters, and mark the resurrection.
    pub fn apply_resurrection(&mut self, retain_history: usize) {
        self.run_state = RunState::Resurrected;
        self.resurrection_count += 1;
        while self.risk_history.len() > retain_history {
            self.risk_history.pop_front();
        }
        while self.intent_history.len() > retain_history {
            self.intent_history.pop_front();
        }
        self.recent_outcomes.clear();
    }
}
