use serde::{Deserialize, Serialize};
use tirs_drift::DriftConfig;
use tirs_forensics::TimelineConfig;
use tirs_profiles::{AdaptiveConfig, BehavioralConfig};
use tirs_types::ConfigError;

/// Top-level engine configuration, validated fail-fast at build time.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct EngineConfig {
    pub drift: DriftConfig,
    pub behavioral: BehavioralConfig,
    pub adaptive: AdaptiveConfig,
    pub timeline: TimelineConfig,
    /// Lifetime resurrection ceiling per agent.
    pub max_resurrections: u32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            drift: DriftConfig::default(),
            behavioral: BehavioralConfig::default(),
            adaptive: AdaptiveConfig::default(),
            timeline: TimelineConfig::default(),
            max_resurrections: 3,
        }
    }
}

impl EngineConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.drift.validate()?;
        if self.max_resurrections == 0 {
            return Err(ConfigError::invalid(
                "max_resurrections",
                "must allow at least one resurrection",
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_validates() {
        EngineConfig::default().validate().unwrap();
    }

    #[test]
    fn zero_resurrections_rejected() {
        let config = EngineConfig {
            max_resurrections: 0,
            ..EngineConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn drift_errors_propagate() {
        let mut config = EngineConfig::default();
        config.drift.weights.context_deviation = 0.8;
        assert!(config.validate().is_err());
    }
}
