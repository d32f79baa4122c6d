use chrono::Duration;
use serde::{Deserialize, Serialize};
use tirs_types::{ConfigError, RiskThresholds, SignalWeights};

use crate::context_adjust::ContextAdjustConfig;

/// Configuration for signal computation and fusion.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DriftConfig {
    pub weights: SignalWeights,
    pub thresholds: RiskThresholds,
    pub context_adjust: ContextAdjustConfig,

    /// Bounded intent-history window per profile.
    pub history_window: usize,
    /// Outcomes considered by the decayed violation rate.
    pub violation_window: usize,
    /// Half-life of a violation's decay weight, in seconds.
    pub violation_half_life_secs: i64,
    /// Normalization ceiling for capability surprisal, in nats.
    pub surprisal_ceiling_nats: f64,
    /// Floor probability for never-seen capabilities.
    pub unseen_capability_probability: f64,
    /// Embedding-drift baseline when the profile has no centroid yet.
    pub cold_start_drift: f64,
    /// EWMA rate for centroid updates.
    pub centroid_alpha: f32,
    /// Raw value substituted when a signal cannot be computed. Never zero:
    /// an unknown signal is not evidence of safety.
    pub neutral_signal_default: f64,
    /// Lookback for the recent action rate, in seconds.
    pub velocity_recent_window_secs: i64,
    /// Risk-history entries retained through a resurrection.
    pub resurrection_retain_history: usize,
}

impl Default for DriftConfig {
    fn default() -> Self {
        Self {
            weights: SignalWeights::default(),
            thresholds: RiskThresholds::default(),
            context_adjust: ContextAdjustConfig::default(),
            history_window: 50,
            violation_window: 20,
            violation_half_life_secs: 30 * 60,
            surprisal_ceiling_nats: 7.0,
            unseen_capability_probability: 0.01,
            cold_start_drift: 0.1,
            centroid_alpha: 0.2,
            neutral_signal_default: 0.5,
            velocity_recent_window_secs: 5 * 60,
            resurrection_retain_history: 5,
        }
    }
}

impl DriftConfig {
    /// Fail-fast validation of every tunable.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.weights.validate()?;
        self.thresholds.validate()?;
        if self.history_window == 0 {
            return Err(ConfigError::invalid("history_window", "must be positive"));
        }
        if self.violation_window == 0 {
            return Err(ConfigError::invalid("violation_window", "must be positive"));
        }
        if self.violation_half_life_secs <= 0 {
            return Err(ConfigError::invalid(
                "violation_half_life_secs",
                "must be positive",
            ));
        }
        if self.surprisal_ceiling_nats <= 0.0 {
            return Err(ConfigError::invalid(
                "surprisal_ceiling_nats",
                "must be positive",
            ));
        }
        if !(0.0..1.0).contains(&self.unseen_capability_probability)
            || self.unseen_capability_probability == 0.0
        {
            return Err(ConfigError::invalid(
                "unseen_capability_probability",
                "must be in (0, 1)",
            ));
        }
        if !(0.0..=1.0).contains(&self.cold_start_drift) {
            return Err(ConfigError::invalid("cold_start_drift", "must be in [0, 1]"));
        }
        if !(0.0..=1.0).contains(&(self.centroid_alpha as f64)) {
            return Err(ConfigError::invalid("centroid_alpha", "must be in [0, 1]"));
        }
        if !(0.0..=1.0).contains(&self.neutral_signal_default) {
            return Err(ConfigError::invalid(
                "neutral_signal_default",
                "must be in [0, 1]",
            ));
        }
        if self.velocity_recent_window_secs <= 0 {
            return Err(ConfigError::invalid(
                "velocity_recent_window_secs",
                "must be positive",
            ));
        }
        Ok(())
    }

    pub fn violation_half_life(&self) -> Duration {
        Duration::seconds(self.violation_half_life_secs)
    }

    pub fn velocity_recent_window(&self) -> Duration {
        Duration::seconds(self.velocity_recent_window_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_validates() {
        DriftConfig::default().validate().unwrap();
    }

    #[test]
    fn zero_history_window_rejected() {
        let config = DriftConfig {
            history_window: 0,
            ..DriftConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn zero_unseen_probability_rejected() {
        let config = DriftConfig {
            unseen_capability_probability: 0.0,
            ..DriftConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn invalid_weights_propagate() {
        let mut config = DriftConfig::default();
        config.weights.embedding_drift = 0.9;
        assert!(config.validate().is_err());
    }
}
