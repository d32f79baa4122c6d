use std::collections::{HashMap, VecDeque};

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tirs_types::AgentId;

use crate::error::ForensicError;

/// Identifies one timeline event.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TimelineEventId(pub String);

impl TimelineEventId {
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }
}

impl std::fmt::Display for TimelineEventId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventCategory {
    Intent,
    Violation,
    Drift,
    Enforcement,
    Appeal,
    System,
}

#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum EventSeverity {
    Info,
    Warning,
    Critical,
}

/// One node in the causal event DAG.
///
/// `caused_by` points at the direct causal parent; `causes` is maintained
/// lazily as children are recorded, mirroring the parent/children split of
/// a provenance index.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TimelineEvent {
    pub event_id: TimelineEventId,
    pub agent_id: AgentId,
    pub category: EventCategory,
    pub severity: EventSeverity,
    pub description: String,
    pub timestamp: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub caused_by: Option<TimelineEventId>,
    pub causes: Vec<TimelineEventId>,
}

impl TimelineEvent {
    /// A root event has no causal parent.
    pub fn is_root(&self) -> bool {
        self.caused_by.is_none()
    }
}

/// Threshold-on-count heuristics over the sliding pattern window.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "pattern")]
pub enum PatternFinding {
    /// Violation events exceeded the flood threshold inside the window.
    ViolationFlood { count: usize },
    /// Repeated enforcement actions inside the window.
    EnforcementEscalation { count: usize },
    /// Total event volume exceeded the rapid-fire threshold.
    RapidFire { count: usize },
}

/// Pattern-detection tuning.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct TimelineConfig {
    /// Sliding window for pattern detection.
    pub pattern_window_secs: i64,
    pub violation_flood_threshold: usize,
    pub enforcement_escalation_threshold: usize,
    pub rapid_fire_threshold: usize,
}

impl Default for TimelineConfig {
    fn default() -> Self {
        Self {
            pattern_window_secs: 60 * 60,
            violation_flood_threshold: 5,
            enforcement_escalation_threshold: 3,
            rapid_fire_threshold: 30,
        }
    }
}

/// Append-only causal event log with per-agent indexing.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct EventTimeline {
    config: TimelineConfig,
    events: HashMap<TimelineEventId, TimelineEvent>,
    by_agent: HashMap<AgentId, Vec<TimelineEventId>>,
}

impl EventTimeline {
    pub fn new(config: TimelineConfig) -> Self {
        Self {
            config,
            events: HashMap::new(),
            by_agent: HashMap::new(),
        }
    }

    /// Record one event, linking it into the causal DAG.
    ///
    /// A `caused_by` reference must name an already-recorded event; the
    /// parent's forward `causes` list is updated in the same operation.
    pub fn record(
        &mut self,
        agent_id: &AgentId,
        category: EventCategory,
        severity: EventSeverity,
        description: impl Into<String>,
        caused_by: Option<&TimelineEventId>,
    ) -> Result<TimelineEventId, ForensicError> {
        if let Some(parent_id) = caused_by {
            if !self.events.contains_key(parent_id) {
                return Err(ForensicError::UnknownCausalParent(parent_id.clone()));
            }
        }

        let event_id = TimelineEventId::generate();
        let event = TimelineEvent {
            event_id: event_id.clone(),
            agent_id: agent_id.clone(),
            category,
            severity,
            description: description.into(),
            timestamp: Utc::now(),
            caused_by: caused_by.cloned(),
            causes: Vec::new(),
        };

        if let Some(parent_id) = caused_by {
            if let Some(parent) = self.events.get_mut(parent_id) {
                parent.causes.push(event_id.clone());
            }
        }

        self.events.insert(event_id.clone(), event);
        self.by_agent
            .entry(agent_id.clone())
            .or_default()
            .push(event_id.clone());
        Ok(event_id)
    }

    pub fn get(&self, event_id: &TimelineEventId) -> Option<&TimelineEvent> {
        self.events.get(event_id)
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// All events recorded for one agent, in insertion order.
    pub fn events_for_agent(&self, agent_id: &AgentId) -> Vec<&TimelineEvent> {
        self.by_agent
            .get(agent_id)
            .map(|ids| ids.iter().filter_map(|id| self.events.get(id)).collect())
            .unwrap_or_default()
    }

    /// Walk `caused_by` backward to the root cause. The result starts at
    /// the given event and ends at the root.
    pub fn causal_chain(
        &self,
        event_id: &TimelineEventId,
    ) -> Result<Vec<&TimelineEvent>, ForensicError> {
        let mut chain = Vec::new();
        let mut cursor = Some(event_id.clone());
        while let Some(id) = cursor {
            let event = self
                .events
                .get(&id)
                .ok_or_else(|| ForensicError::EventNotFound(id.clone()))?;
            cursor = event.caused_by.clone();
            chain.push(event);
        }
        Ok(chain)
    }

    /// Expand the forward `causes` edges recursively (breadth-first),
    /// excluding the starting event itself.
    pub fn consequence_tree(
        &self,
        event_id: &TimelineEventId,
    ) -> Result<Vec<&TimelineEvent>, ForensicError> {
        let root = self
            .events
            .get(event_id)
            .ok_or_else(|| ForensicError::EventNotFound(event_id.clone()))?;

        let mut queue: VecDeque<&TimelineEventId> = root.causes.iter().collect();
        let mut tree = Vec::new();
        while let Some(id) = queue.pop_front() {
            if let Some(event) = self.events.get(id) {
                queue.extend(event.causes.iter());
                tree.push(event);
            }
        }
        Ok(tree)
    }

    /// Threshold-on-count pattern detection over the sliding window.
    pub fn detect_patterns(&self, agent_id: &AgentId, now: DateTime<Utc>) -> Vec<PatternFinding> {
        let window = Duration::seconds(self.config.pattern_window_secs);
        let cutoff = now - window;
        let recent: Vec<&TimelineEvent> = self
            .events_for_agent(agent_id)
            .into_iter()
            .filter(|e| e.timestamp >= cutoff)
            .collect();

        let mut findings = Vec::new();

        let violations = recent
            .iter()
            .filter(|e| e.category == EventCategory::Violation)
            .count();
        if violations >= self.config.violation_flood_threshold {
            findings.push(PatternFinding::ViolationFlood { count: violations });
        }

        let enforcements = recent
            .iter()
            .filter(|e| e.category == EventCategory::Enforcement)
            .count();
        if enforcements >= self.config.enforcement_escalation_threshold {
            findings.push(PatternFinding::EnforcementEscalation {
                count: enforcements,
            });
        }

        if recent.len() >= self.config.rapid_fire_threshold {
            findings.push(PatternFinding::RapidFire {
                count: recent.len(),
            });
        }

        findings
    }
}
