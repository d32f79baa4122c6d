use std::collections::{BTreeSet, HashMap};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Tuning for baseline learning and anomaly checks.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BehavioralConfig {
    /// EWMA learning rate for mean/deviation updates.
    pub learning_rate: f64,
    /// Samples required before a profile is established.
    pub min_establishment_samples: u64,
    /// Z-score (deviation-relative) bound before risk is anomalous.
    pub z_score_threshold: f64,
    /// Total samples required before hourly-pattern checks apply.
    pub hourly_min_total_samples: u64,
    /// An hour with activity below this fraction of the uniform share is
    /// unusual for the agent.
    pub hourly_low_fraction: f64,
}

impl Default for BehavioralConfig {
    fn default() -> Self {
        Self {
            learning_rate: 0.05,
            min_establishment_samples: 50,
            z_score_threshold: 2.5,
            hourly_min_total_samples: 100,
            hourly_low_fraction: 0.1,
        }
    }
}

/// Observable lifecycle state of a baseline.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProfileState {
    /// Not enough samples to trust the baseline yet.
    Learning,
    Established,
}

/// Learned statistics for one capability.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct CapabilityStats {
    pub count: u64,
    /// Share of observations that requested this capability.
    pub frequency: f64,
    /// EWMA of the risk delta vs the profile mean when this capability
    /// appears.
    pub mean_risk_delta: f64,
}

/// One agent's (or one agent type's) learned behavioral baseline.
///
/// Updated online via EWMA. Transitions from `Learning` to `Established`
/// only after the minimum sample count; never transitions back.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BehavioralProfile {
    pub subject: String,
    pub state: ProfileState,
    pub samples: u64,
    pub risk_mean: f64,
    /// EWMA of the mean absolute deviation from `risk_mean`.
    pub risk_deviation: f64,
    capabilities: HashMap<String, CapabilityStats>,
    hourly_activity: [u64; 24],
    pub first_seen: DateTime<Utc>,
    pub last_updated: DateTime<Utc>,
}

/// A deviation from the learned baseline.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "anomaly")]
pub enum AnomalyFinding {
    /// The capability has never appeared in the baseline.
    NovelCapability { capability: String },
    /// The risk score is far outside the learned mean/deviation.
    RiskZScore { z: f64 },
    /// Activity at an hour the agent is normally quiet.
    UnusualHour { hour: u32 },
}

impl BehavioralProfile {
    pub fn new(subject: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            subject: subject.into(),
            state: ProfileState::Learning,
            samples: 0,
            risk_mean: 0.0,
            risk_deviation: 0.0,
            capabilities: HashMap::new(),
            hourly_activity: [0; 24],
            first_seen: now,
            last_updated: now,
        }
    }

    pub fn is_established(&self) -> bool {
        self.state == ProfileState::Established
    }

    pub fn capability_names(&self) -> BTreeSet<String> {
        self.capabilities.keys().cloned().collect()
    }

    pub fn capability_stats(&self, capability: &str) -> Option<&CapabilityStats> {
        self.capabilities.get(capability)
    }

    pub fn hourly_activity(&self) -> &[u64; 24] {
        &self.hourly_activity
    }

    /// Fold one observation into the baseline.
    pub fn observe(
        &mut self,
        risk_score: f64,
        capabilities: &BTreeSet<String>,
        hour: u32,
        config: &BehavioralConfig,
    ) {
        let alpha = config.learning_rate;
        self.samples += 1;
        self.last_updated = Utc::now();

        if self.samples == 1 {
            self.risk_mean = risk_score;
            self.risk_deviation = 0.0;
        } else {
            let delta = risk_score - self.risk_mean;
            self.risk_mean += alpha * delta;
            self.risk_deviation += alpha * (delta.abs() - self.risk_deviation);
        }

        let risk_delta = risk_score - self.risk_mean;
        for capability in capabilities {
            let stats = self.capabilities.entry(capability.clone()).or_default();
            stats.count += 1;
            stats.mean_risk_delta += alpha * (risk_delta - stats.mean_risk_delta);
        }
        for stats in self.capabilities.values_mut() {
            stats.frequency = stats.count as f64 / self.samples as f64;
        }

        if let Some(slot) = self.hourly_activity.get_mut(hour as usize) {
            *slot += 1;
        }

        if self.state == ProfileState::Learning
            && self.samples >= config.min_establishment_samples
        {
            self.state = ProfileState::Established;
        }
    }

    /// Z-score of a risk value against the learned mean/deviation.
    /// `None` while learning or while the deviation is degenerate.
    pub fn z_score(&self, risk_score: f64) -> Option<f64> {
        if !self.is_established() || self.risk_deviation < f64::EPSILON {
            return None;
        }
        Some((risk_score - self.risk_mean).abs() / self.risk_deviation)
    }

    /// Check one observation against the baseline.
    pub fn check(
        &self,
        risk_score: f64,
        capabilities: &BTreeSet<String>,
        hour: u32,
        config: &BehavioralConfig,
    ) -> Vec<AnomalyFinding> {
        let mut findings = Vec::new();
        if !self.is_established() {
            return findings;
        }

        for capability in capabilities {
            if !self.capabilities.contains_key(capability) {
                findings.push(AnomalyFinding::NovelCapability {
                    capability: capability.clone(),
                });
            }
        }

        if let Some(z) = self.z_score(risk_score) {
            if z > config.z_score_threshold {
                findings.push(AnomalyFinding::RiskZScore { z });
            }
        }

        if self.samples >= config.hourly_min_total_samples {
            let uniform_share = self.samples as f64 / 24.0;
            let observed = self
                .hourly_activity
                .get(hour as usize)
                .copied()
                .unwrap_or(0) as f64;
            if observed < uniform_share * config.hourly_low_fraction {
                findings.push(AnomalyFinding::UnusualHour { hour });
            }
        }

        findings
    }

    /// Blend another (established) profile into this one at `rate`.
    /// Used for continuous agent-type aggregation.
    pub fn blend_from(&mut self, other: &BehavioralProfile, rate: f64) {
        self.samples = self.samples.max(1);
        self.risk_mean += rate * (other.risk_mean - self.risk_mean);
        self.risk_deviation += rate * (other.risk_deviation - self.risk_deviation);

        for (capability, theirs) in &other.capabilities {
            let ours = self.capabilities.entry(capability.clone()).or_default();
            ours.frequency += rate * (theirs.frequency - ours.frequency);
            ours.mean_risk_delta += rate * (theirs.mean_risk_delta - ours.mean_risk_delta);
            ours.count = ours.count.max(1);
        }
        for (hour, theirs) in other.hourly_activity.iter().enumerate() {
            // Hour histograms accumulate; counts only inform low-activity ratios.
            self.hourly_activity[hour] = self.hourly_activity[hour].max(*theirs / 2);
        }
        self.last_updated = Utc::now();
    }

    /// Seed a fresh learning profile from this one (cold-start borrowing).
    /// Borrowed capability baselines keep their frequencies but restart
    /// their counts with the new agent's own observations.
    pub fn bootstrap(&self, subject: impl Into<String>) -> BehavioralProfile {
        let mut seeded = self.clone();
        seeded.subject = subject.into();
        seeded.state = ProfileState::Learning;
        seeded.samples = 0;
        for stats in seeded.capabilities.values_mut() {
            stats.count = 1;
        }
        let now = Utc::now();
        seeded.first_seen = now;
        seeded.last_updated = now;
        seeded
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn caps(names: &[&str]) -> BTreeSet<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    fn established_profile(config: &BehavioralConfig) -> BehavioralProfile {
        let mut profile = BehavioralProfile::new("agent-1");
        for _ in 0..60 {
            profile.observe(0.1, &caps(&["read", "write"]), 10, config);
        }
        profile
    }

    #[test]
    fn profile_starts_learning_and_establishes() {
        let config = BehavioralConfig::default();
        let mut profile = BehavioralProfile::new("agent-1");
        assert_eq!(profile.state, ProfileState::Learning);

        for i in 0..50 {
            assert!(
                !profile.is_established(),
                "established too early at sample {i}"
            );
            profile.observe(0.1, &caps(&["read"]), 9, &config);
        }
        assert!(profile.is_established());
    }

    #[test]
    fn learning_profile_reports_no_anomalies() {
        let config = BehavioralConfig::default();
        let mut profile = BehavioralProfile::new("agent-1");
        profile.observe(0.1, &caps(&["read"]), 9, &config);

        let findings = profile.check(0.99, &caps(&["never_seen"]), 3, &config);
        assert!(findings.is_empty());
    }

    #[test]
    fn novel_capability_is_flagged() {
        let config = BehavioralConfig::default();
        let profile = established_profile(&config);

        let findings = profile.check(0.1, &caps(&["delete_all"]), 10, &config);
        assert!(findings.iter().any(|f| matches!(
            f,
            AnomalyFinding::NovelCapability { capability } if capability == "delete_all"
        )));
    }

    #[test]
    fn extreme_risk_is_flagged_by_z_score() {
        let config = BehavioralConfig::default();
        let mut profile = BehavioralProfile::new("agent-1");
        // Alternate slightly so the deviation is non-degenerate.
        for i in 0..80 {
            let score = if i % 2 == 0 { 0.1 } else { 0.14 };
            profile.observe(score, &caps(&["read"]), 10, &config);
        }

        let findings = profile.check(0.9, &caps(&["read"]), 10, &config);
        assert!(findings
            .iter()
            .any(|f| matches!(f, AnomalyFinding::RiskZScore { z } if *z > 2.5)));
    }

    #[test]
    fn quiet_hour_activity_is_flagged() {
        let config = BehavioralConfig::default();
        let mut profile = BehavioralProfile::new("agent-1");
        for _ in 0..200 {
            profile.observe(0.1, &caps(&["read"]), 10, &config);
        }

        let findings = profile.check(0.1, &caps(&["read"]), 3, &config);
        assert!(findings
            .iter()
            .any(|f| matches!(f, AnomalyFinding::UnusualHour { hour: 3 })));

        // The hour the agent always works in is not unusual.
        let findings = profile.check(0.1, &caps(&["read"]), 10, &config);
        assert!(findings.is_empty());
    }

    #[test]
    fn bootstrap_carries_baseline_but_restarts_lifecycle() {
        let config = BehavioralConfig::default();
        let profile = established_profile(&config);

        let seeded = profile.bootstrap("agent-2");
        assert_eq!(seeded.state, ProfileState::Learning);
        assert_eq!(seeded.samples, 0);
        assert!(seeded.capability_names().contains("read"));
        assert!((seeded.risk_mean - profile.risk_mean).abs() < 1e-12);
    }

    #[test]
    fn blend_moves_toward_member_profile() {
        let config = BehavioralConfig::default();
        let member = established_profile(&config);
        let mut type_profile = BehavioralProfile::new("type:finance");

        type_profile.blend_from(&member, 0.5);
        assert!(type_profile.risk_mean > 0.0);
        assert!(type_profile.capability_names().contains("write"));
    }

    #[test]
    fn profile_serde_round_trip() {
        let config = BehavioralConfig::default();
        let profile = established_profile(&config);
        let json = serde_json::to_string(&profile).unwrap();
        let restored: BehavioralProfile = serde_json::from_str(&json).unwrap();
        assert_eq!(restored.samples, profile.samples);
        assert_eq!(restored.state, profile.state);
    }
}
