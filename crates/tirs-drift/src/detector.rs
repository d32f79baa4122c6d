use std::collections::BTreeSet;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tirs_types::{
    BusinessContext, ConfigError, IntentId, IntentRecord, RiskLevel, RiskThresholds,
};
use tracing::debug;

use crate::config::DriftConfig;
use crate::context_adjust::ContextAdjuster;
use crate::profile::DriftProfile;
use crate::signals::{builtin_signals, DriftSignal, RiskSignal, SignalContext};

/// Profile maturity (in evaluations) at which confidence saturates.
const CONFIDENCE_MATURITY: usize = 20;

/// Outcome of one drift evaluation: the weighted signal breakdown, the
/// fused composite, and the band it landed in under the adjusted edges.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DriftEvaluation {
    pub signals: Vec<RiskSignal>,
    pub composite_score: f64,
    pub risk_level: RiskLevel,
    /// Confidence in the evaluation, scaled by profile maturity.
    pub confidence: f64,
    /// The context-adjusted band edges this evaluation used.
    pub thresholds: RiskThresholds,
}

impl DriftEvaluation {
    /// Signals ordered by contribution, highest first.
    pub fn ranked_signals(&self) -> Vec<&RiskSignal> {
        let mut ranked: Vec<&RiskSignal> = self.signals.iter().collect();
        ranked.sort_by(|a, b| {
            b.contribution
                .partial_cmp(&a.contribution)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        ranked
    }

    /// The highest-contributing signal, if any.
    pub fn dominant_signal(&self) -> Option<&RiskSignal> {
        self.ranked_signals().into_iter().next()
    }
}

/// Fuses the weighted signal set into one composite risk score per intent
/// and evaluates it against context-adjusted band edges.
pub struct DriftDetector {
    signals: Vec<Box<dyn DriftSignal>>,
    adjuster: ContextAdjuster,
    config: DriftConfig,
}

impl DriftDetector {
    /// Create a detector with the five built-in signals.
    pub fn new(config: DriftConfig) -> Result<Self, ConfigError> {
        Self::with_signals(config, builtin_signals())
    }

    /// Create with a custom signal set. Weights are looked up by signal
    /// name; a signal without a configured weight contributes nothing.
    pub fn with_signals(
        config: DriftConfig,
        signals: Vec<Box<dyn DriftSignal>>,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        let adjuster = ContextAdjuster::new(config.context_adjust);
        Ok(Self {
            signals,
            adjuster,
            config,
        })
    }

    pub fn config(&self) -> &DriftConfig {
        &self.config
    }

    pub fn signal_count(&self) -> usize {
        self.signals.len()
    }

    /// Evaluate one intent and fold it into the profile.
    ///
    /// Signals read the profile as it stood *before* this intent; the
    /// profile is updated afterwards with the scored record. Callers hold
    /// the per-agent lock across this read-modify-write.
    ///
    /// `base_thresholds` are the (possibly adaptively adjusted) band edges
    /// to start from; contextual tightening is applied on top.
    #[allow(clippy::too_many_arguments)]
    pub fn evaluate(
        &self,
        profile: &mut DriftProfile,
        text: &str,
        embedding: Vec<f32>,
        capabilities: BTreeSet<String>,
        was_allowed: bool,
        policy_triggered: Option<String>,
        business: &BusinessContext,
        base_thresholds: &RiskThresholds,
    ) -> (DriftEvaluation, IntentRecord) {
        let now = Utc::now();
        let ctx = SignalContext {
            profile,
            embedding: &embedding,
            capabilities: &capabilities,
            business,
            now,
            config: &self.config,
        };

        let mut signals = Vec::with_capacity(self.signals.len());
        let mut composite = 0.0;
        for signal in &self.signals {
            let reading = signal.compute(&ctx);
            let weight = self.weight_for(signal.name());
            let contribution = reading.raw * weight;
            composite += contribution;
            signals.push(RiskSignal {
                name: signal.name().to_string(),
                raw: reading.raw,
                weight,
                contribution,
                detail: reading.detail,
            });
        }
        let composite_score = composite.clamp(0.0, 1.0);

        let thresholds = self.adjuster.adjust(base_thresholds, business);
        let risk_level = thresholds.level_for(composite_score);

        let maturity =
            (profile.risk_history_len() as f64 / CONFIDENCE_MATURITY as f64).min(1.0);
        let confidence = 0.5 + 0.5 * maturity;

        let record = IntentRecord {
            intent_id: IntentId::generate(),
            agent_id: profile.agent_id.clone(),
            timestamp: now,
            text: text.to_string(),
            embedding,
            capabilities,
            was_allowed,
            policy_triggered,
            risk_score: composite_score,
            risk_level,
        };
        profile.record(record.clone(), &self.config);

        if risk_level >= RiskLevel::Warning {
            debug!(
                agent = %profile.agent_id,
                score = composite_score,
                level = %risk_level,
                "intent scored above warning band"
            );
        }

        let evaluation = DriftEvaluation {
            signals,
            composite_score,
            risk_level,
            confidence,
            thresholds,
        };
        (evaluation, record)
    }

    fn weight_for(&self, name: &str) -> f64 {
        self.config
            .weights
            .named()
            .iter()
            .find(|(n, _)| *n == name)
            .map(|(_, w)| *w)
            .unwrap_or(0.0)
    }
}
