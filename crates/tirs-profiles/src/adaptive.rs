use std::collections::{HashMap, VecDeque};

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tirs_types::{AgentId, RiskThresholds};
use tracing::trace;

/// Minimum separation kept between adjacent band edges.
const EDGE_SEPARATION: f64 = 1e-6;

/// System-wide operating posture. An elevated incident state tightens
/// every agent's bands multiplicatively.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SystemState {
    Normal,
    /// Active incident: thresholds tighten across the fleet.
    Elevated,
}

impl Default for SystemState {
    fn default() -> Self {
        Self::Normal
    }
}

/// Tuning for per-agent threshold adaptation.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AdaptiveConfig {
    /// Learning window over score history.
    pub window_secs: i64,
    /// Samples required inside the window before adapting.
    pub min_samples: usize,
    /// Bounded blend rate toward the learned percentiles.
    pub adaptation_rate: f64,
    /// How far a learned edge may wander from its configured base,
    /// as a fraction of the base edge.
    pub max_drift_fraction: f64,
    /// Stricter multipliers per agent type (finance/legal default 0.85).
    pub agent_type_multipliers: HashMap<String, f64>,
    /// Multiplier applied while the system state is elevated.
    pub incident_multiplier: f64,
}

impl Default for AdaptiveConfig {
    fn default() -> Self {
        let mut agent_type_multipliers = HashMap::new();
        agent_type_multipliers.insert("finance".to_string(), 0.85);
        agent_type_multipliers.insert("legal".to_string(), 0.85);
        Self {
            window_secs: 24 * 60 * 60,
            min_samples: 50,
            adaptation_rate: 0.1,
            max_drift_fraction: 0.5,
            agent_type_multipliers,
            incident_multiplier: 0.85,
        }
    }
}

/// Learned percentile breakpoints of an agent's recent score history.
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize)]
pub struct ScorePercentiles {
    pub p50: f64,
    pub p75: f64,
    pub p90: f64,
    pub p95: f64,
}

/// Per-agent dynamic thresholds.
///
/// Learns percentile breakpoints of each agent's own recent scores and
/// blends them into the active band edges at a bounded rate so thresholds
/// shift gradually instead of jumping. Type and system-state multipliers
/// apply multiplicatively on top of the learned bands.
#[derive(Clone, Debug)]
pub struct AdaptiveThresholds {
    config: AdaptiveConfig,
    base: RiskThresholds,
    histories: HashMap<AgentId, VecDeque<(DateTime<Utc>, f64)>>,
    learned: HashMap<AgentId, RiskThresholds>,
}

impl AdaptiveThresholds {
    pub fn new(base: RiskThresholds, config: AdaptiveConfig) -> Self {
        Self {
            config,
            base,
            histories: HashMap::new(),
            learned: HashMap::new(),
        }
    }

    pub fn base(&self) -> &RiskThresholds {
        &self.base
    }

    /// Record one composite score and, once enough samples exist inside
    /// the learning window, nudge the agent's learned bands toward its
    /// observed percentiles.
    pub fn record_score(&mut self, agent_id: &AgentId, score: f64, now: DateTime<Utc>) {
        let window = Duration::seconds(self.config.window_secs);
        let history = self.histories.entry(agent_id.clone()).or_default();
        history.push_back((now, score));
        while let Some((oldest, _)) = history.front() {
            if now - *oldest > window {
                history.pop_front();
            } else {
                break;
            }
        }

        if history.len() < self.config.min_samples {
            return;
        }

        let mut scores: Vec<f64> = history.iter().map(|(_, s)| *s).collect();
        scores.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
        let percentiles = ScorePercentiles {
            p50: percentile(&scores, 0.50),
            p75: percentile(&scores, 0.75),
            p90: percentile(&scores, 0.90),
            p95: percentile(&scores, 0.95),
        };

        let current = self.learned.get(agent_id).copied().unwrap_or(self.base);
        let blended = self.blend(&current, &percentiles);
        trace!(agent = %agent_id, ?blended, "adapted thresholds");
        self.learned.insert(agent_id.clone(), blended);
    }

    /// The active band edges for an agent: learned bands (or base), with
    /// type and system-state multipliers applied.
    pub fn thresholds_for(
        &self,
        agent_id: &AgentId,
        agent_type: Option<&str>,
        system_state: SystemState,
    ) -> RiskThresholds {
        let mut thresholds = self.learned.get(agent_id).copied().unwrap_or(self.base);

        let mut factor = 1.0;
        if let Some(multiplier) = agent_type
            .and_then(|t| self.config.agent_type_multipliers.get(t))
        {
            factor *= multiplier;
        }
        if system_state == SystemState::Elevated {
            factor *= self.config.incident_multiplier;
        }
        if factor != 1.0 {
            thresholds = thresholds.scaled(factor);
        }
        thresholds
    }

    /// Blend learned edges toward observed percentiles, bounded to the
    /// configured drift corridor around the base, then re-separated so the
    /// band set stays strictly monotonic.
    fn blend(&self, current: &RiskThresholds, percentiles: &ScorePercentiles) -> RiskThresholds {
        let rate = self.config.adaptation_rate;
        let corridor = |edge: f64, base: f64| {
            let low = base * (1.0 - self.config.max_drift_fraction);
            let high = (base * (1.0 + self.config.max_drift_fraction)).min(1.0);
            edge.clamp(low, high)
        };

        let mut elevated = corridor(
            current.elevated + rate * (percentiles.p50 - current.elevated),
            self.base.elevated,
        );
        let mut warning = corridor(
            current.warning + rate * (percentiles.p75 - current.warning),
            self.base.warning,
        );
        let mut critical = corridor(
            current.critical + rate * (percentiles.p90 - current.critical),
            self.base.critical,
        );
        let terminal = corridor(
            current.terminal + rate * (percentiles.p95 - current.terminal),
            self.base.terminal,
        );

        // Re-assert strict ordering from the top edge down.
        critical = critical.min(terminal - EDGE_SEPARATION);
        warning = warning.min(critical - EDGE_SEPARATION);
        elevated = elevated.min(warning - EDGE_SEPARATION);

        RiskThresholds {
            elevated,
            warning,
            critical,
            terminal,
        }
    }
}

/// Nearest-rank percentile over a sorted slice.
fn percentile(sorted: &[f64], q: f64) -> f64 {
    if sorted.is_empty() {
        return 0.0;
    }
    let rank = ((sorted.len() as f64) * q).ceil() as usize;
    let index = rank.clamp(1, sorted.len()) - 1;
    sorted[index]
}
