use serde::{Deserialize, Serialize};

use crate::ConfigError;

/// Risk bands in ascending order of severity.
///
/// The ordering is load-bearing: enforcement escalation compares bands
/// with `>` and must never regress without an explicit resurrection.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum RiskLevel {
    Nominal,
    Elevated,
    Warning,
    Critical,
    Terminal,
}

impl RiskLevel {
    /// Whether this band triggers remediation planning.
    pub fn needs_remediation(&self) -> bool {
        matches!(self, Self::Warning | Self::Critical)
    }
}

impl std::fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Nominal => "nominal",
            Self::Elevated => "elevated",
            Self::Warning => "warning",
            Self::Critical => "critical",
            Self::Terminal => "terminal",
        };
        write!(f, "{s}")
    }
}

/// Band edges for mapping a composite score into a [`RiskLevel`].
///
/// Each field is the *lower inclusive* edge of the named band; scores below
/// `elevated` are nominal. Edges must be strictly increasing in (0, 1].
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct RiskThresholds {
    pub elevated: f64,
    pub warning: f64,
    pub critical: f64,
    pub terminal: f64,
}

impl Default for RiskThresholds {
    fn default() -> Self {
        Self {
            elevated: 0.3,
            warning: 0.5,
            critical: 0.7,
            terminal: 0.85,
        }
    }
}

impl RiskThresholds {
    /// Fail-fast validation: edges strictly increasing inside (0, 1].
    pub fn validate(&self) -> Result<(), ConfigError> {
        let edges = [self.elevated, self.warning, self.critical, self.terminal];
        for edge in edges {
            if !(0.0..=1.0).contains(&edge) || edge == 0.0 {
                return Err(ConfigError::ThresholdOutOfRange { value: edge });
            }
        }
        if !(self.elevated < self.warning
            && self.warning < self.critical
            && self.critical < self.terminal)
        {
            return Err(ConfigError::NonMonotonicThresholds {
                elevated: self.elevated,
                warning: self.warning,
                critical: self.critical,
                terminal: self.terminal,
            });
        }
        Ok(())
    }

    /// Map a composite score into its unique band.
    pub fn level_for(&self, score: f64) -> RiskLevel {
        if score >= self.terminal {
            RiskLevel::Terminal
        } else if score >= self.critical {
            RiskLevel::Critical
        } else if score >= self.warning {
            RiskLevel::Warning
        } else if score >= self.elevated {
            RiskLevel::Elevated
        } else {
            RiskLevel::Nominal
        }
    }

    /// Scale every edge by `factor`, clamping into (0, 1] while preserving
    /// strict ordering. Used by contextual and adaptive adjustment.
    pub fn scaled(&self, factor: f64) -> Self {
        let clamp = |v: f64| v.clamp(1e-6, 1.0);
        let mut scaled = Self {
            elevated: clamp(self.elevated * factor),
            warning: clamp(self.warning * factor),
            critical: clamp(self.critical * factor),
            terminal: clamp(self.terminal * factor),
        };
        // Clamping at 1.0 can collapse adjacent edges; re-separate from the top.
        scaled.terminal = scaled.terminal.max(scaled.critical + 1e-6).min(1.0);
        scaled.critical = scaled.critical.min(scaled.terminal - 1e-6);
        scaled.warning = scaled.warning.min(scaled.critical - 1e-6);
        scaled.elevated = scaled.elevated.min(scaled.warning - 1e-6);
        scaled
    }
}

/// Weights of the five drift signals. Must sum to 1.0.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct SignalWeights {
    pub embedding_drift: f64,
    pub capability_surprisal: f64,
    pub violation_rate: f64,
    pub velocity_anomaly: f64,
    pub context_deviation: f64,
}

impl Default for SignalWeights {
    fn default() -> Self {
        Self {
            embedding_drift: 0.30,
            capability_surprisal: 0.25,
            violation_rate: 0.20,
            velocity_anomaly: 0.15,
            context_deviation: 0.10,
        }
    }
}

impl SignalWeights {
    const SUM_TOLERANCE: f64 = 1e-6;

    /// Fail-fast validation: each weight in [0, 1], total exactly 1.0.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (name, value) in self.named() {
            if !(0.0..=1.0).contains(&value) {
                return Err(ConfigError::WeightOutOfRange {
                    name: name.to_string(),
                    value,
                });
            }
        }
        let sum = self.sum();
        if (sum - 1.0).abs() > Self::SUM_TOLERANCE {
            return Err(ConfigError::WeightSumMismatch { sum });
        }
        Ok(())
    }

    pub fn sum(&self) -> f64 {
        self.embedding_drift
            + self.capability_surprisal
            + self.violation_rate
            + self.velocity_anomaly
            + self.context_deviation
    }

    /// Weight lookup paired with the canonical signal names.
    pub fn named(&self) -> [(&'static str, f64); 5] {
        [
            ("embedding_drift", self.embedding_drift),
            ("capability_surprisal", self.capability_surprisal),
            ("violation_rate", self.violation_rate),
            ("velocity_anomaly", self.velocity_anomaly),
            ("context_deviation", self.context_deviation),
        ]
    }
}

/// Externally visible run-state of a governed agent.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunState {
    /// Operating normally.
    Active,
    /// Rate-limited after a warning-band evaluation.
    Throttled,
    /// Suspended pending review after a critical-band evaluation.
    Paused,
    /// Terminated. Only an approved appeal leaves this state.
    Killed,
    /// Restored from `Killed`; treated as active with trimmed history.
    Resurrected,
}

impl RunState {
    /// Whether the agent may still submit intents for full evaluation.
    pub fn accepts_intents(&self) -> bool {
        !matches!(self, Self::Killed)
    }

    /// Escalation rank used to forbid silent de-escalation.
    pub fn severity_rank(&self) -> u8 {
        match self {
            Self::Active | Self::Resurrected => 0,
            Self::Throttled => 1,
            Self::Paused => 2,
            Self::Killed => 3,
        }
    }
}

impl std::fmt::Display for RunState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Active => "active",
            Self::Throttled => "throttled",
            Self::Paused => "paused",
            Self::Killed => "killed",
            Self::Resurrected => "resurrected",
        };
        write!(f, "{s}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_thresholds_validate() {
        RiskThresholds::default().validate().unwrap();
    }

    #[test]
    fn non_monotonic_thresholds_rejected() {
        let t = RiskThresholds {
            elevated: 0.5,
            warning: 0.4,
            critical: 0.7,
            terminal: 0.85,
        };
        assert!(matches!(
            t.validate(),
            Err(ConfigError::NonMonotonicThresholds { .. })
        ));
    }

    #[test]
    fn level_for_selects_unique_band() {
        let t = RiskThresholds::default();
        assert_eq!(t.level_for(0.0), RiskLevel::Nominal);
        assert_eq!(t.level_for(0.29), RiskLevel::Nominal);
        assert_eq!(t.level_for(0.3), RiskLevel::Elevated);
        assert_eq!(t.level_for(0.5), RiskLevel::Warning);
        assert_eq!(t.level_for(0.7), RiskLevel::Critical);
        assert_eq!(t.level_for(0.85), RiskLevel::Terminal);
        assert_eq!(t.level_for(1.0), RiskLevel::Terminal);
    }

    #[test]
    fn scaled_thresholds_stay_monotonic() {
        let t = RiskThresholds::default();
        for factor in [0.5, 0.85, 1.0, 1.2, 5.0] {
            let s = t.scaled(factor);
            assert!(
                s.validate().is_ok(),
                "factor {factor} broke monotonicity: {s:?}"
            );
        }
    }

    #[test]
    fn default_weights_validate() {
        SignalWeights::default().validate().unwrap();
    }

    #[test]
    fn weight_sum_mismatch_rejected() {
        let w = SignalWeights {
            embedding_drift: 0.5,
            ..SignalWeights::default()
        };
        assert!(matches!(
            w.validate(),
            Err(ConfigError::WeightSumMismatch { .. })
        ));
    }

    #[test]
    fn risk_levels_are_ordered() {
        assert!(RiskLevel::Nominal < RiskLevel::Elevated);
        assert!(RiskLevel::Critical < RiskLevel::Terminal);
    }

    #[test]
    fn killed_rejects_intents() {
        assert!(!RunState::Killed.accepts_intents());
        assert!(RunState::Resurrected.accepts_intents());
    }
}
