use serde::{Deserialize, Serialize};
use tirs_types::{ActorRole, BusinessContext, RiskThresholds, TimeOfDay};

/// Multiplicative tightening factors applied to band edges per context
/// dimension. Values below 1.0 tighten (lower edges trigger earlier).
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct ContextAdjustConfig {
    pub after_hours_factor: f64,
    pub weekend_factor: f64,
    pub holiday_factor: f64,
    pub contractor_factor: f64,
    pub external_factor: f64,
    pub sensitive_factor: f64,
    /// Lower bound on the combined factor so bands never collapse.
    pub min_combined_factor: f64,
}

impl Default for ContextAdjustConfig {
    fn default() -> Self {
        Self {
            after_hours_factor: 0.95,
            weekend_factor: 0.95,
            holiday_factor: 0.9,
            contractor_factor: 0.95,
            external_factor: 0.9,
            sensitive_factor: 0.9,
            min_combined_factor: 0.7,
        }
    }
}

/// Computes context-tightened risk-band thresholds.
///
/// Adjustment is multiplicative over the active context dimensions and
/// floor-bounded; the scaled band set stays strictly monotonic.
#[derive(Clone, Debug, Default)]
pub struct ContextAdjuster {
    config: ContextAdjustConfig,
}

impl ContextAdjuster {
    pub fn new(config: ContextAdjustConfig) -> Self {
        Self { config }
    }

    /// Combined tightening factor for a context.
    pub fn factor(&self, business: &BusinessContext) -> f64 {
        let mut factor = 1.0;
        if business.time_of_day == TimeOfDay::AfterHours {
            factor *= self.config.after_hours_factor;
        }
        if business.weekend {
            factor *= self.config.weekend_factor;
        }
        if business.holiday {
            factor *= self.config.holiday_factor;
        }
        match business.role {
            ActorRole::Contractor => factor *= self.config.contractor_factor,
            ActorRole::External => factor *= self.config.external_factor,
            ActorRole::Employee | ActorRole::Manager | ActorRole::Service => {}
        }
        if business.sensitive_operation {
            factor *= self.config.sensitive_factor;
        }
        factor.max(self.config.min_combined_factor)
    }

    /// Apply the context factor to a band set.
    pub fn adjust(&self, thresholds: &RiskThresholds, business: &BusinessContext) -> RiskThresholds {
        thresholds.scaled(self.factor(business))
    }
}
