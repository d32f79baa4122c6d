use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tirs_embedding::cosine_similarity;
use tirs_types::{ActorRole, BusinessContext, TimeOfDay};

use crate::config::DriftConfig;
use crate::decay::{decayed_violation_rate, velocity_observation};
use crate::profile::DriftProfile;

// ── Trait ────────────────────────────────────────────────────────────────

/// Everything a signal may read for one evaluation. Signals are pure:
/// they never mutate the profile.
pub struct SignalContext<'a> {
    pub profile: &'a DriftProfile,
    pub embedding: &'a [f32],
    pub capabilities: &'a BTreeSet<String>,
    pub business: &'a BusinessContext,
    pub now: DateTime<Utc>,
    pub config: &'a DriftConfig,
}

/// Raw output of one signal before weighting.
#[derive(Clone, Debug)]
pub struct SignalReading {
    /// Clipped to [0, 1] by the producing signal.
    pub raw: f64,
    /// Human-readable explanation of the value.
    pub detail: String,
}

impl SignalReading {
    pub fn new(raw: f64, detail: impl Into<String>) -> Self {
        Self {
            raw: raw.clamp(0.0, 1.0),
            detail: detail.into(),
        }
    }
}

/// Pluggable drift signal.
///
/// Each built-in signal inspects one aspect of the intent against the
/// agent's profile and produces a clipped reading with an explanation.
pub trait DriftSignal: Send + Sync {
    fn compute(&self, ctx: &SignalContext<'_>) -> SignalReading;

    /// Canonical signal name; must match a [`tirs_types::SignalWeights`] entry.
    fn name(&self) -> &'static str;
}

/// One named, weighted contribution to a composite score. Transient:
/// recomputed every evaluation, never persisted standalone.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RiskSignal {
    pub name: String,
    pub raw: f64,
    pub weight: f64,
    pub contribution: f64,
    pub detail: String,
}

// ── 1. Embedding drift ──────────────────────────────────────────────────

/// Semantic distance between this intent and the profile centroid.
///
/// With no centroid yet, reports a small constant baseline instead of
/// zero: an agent's very first action is unknown, not safe.
pub struct EmbeddingDrift;

impl DriftSignal for EmbeddingDrift {
    fn compute(&self, ctx: &SignalContext<'_>) -> SignalReading {
        match ctx.profile.centroid() {
            Some(centroid) => {
                let similarity = cosine_similarity(ctx.embedding, centroid) as f64;
                let drift = (1.0 - similarity).clamp(0.0, 1.0);
                SignalReading::new(
                    drift,
                    format!("cosine similarity to behavioral centroid {similarity:.3}"),
                )
            }
            None => SignalReading::new(
                ctx.config.cold_start_drift,
                "no behavioral centroid yet, cold-start baseline applied",
            ),
        }
    }

    fn name(&self) -> &'static str {
        "embedding_drift"
    }
}

// ── 2. Capability surprisal ─────────────────────────────────────────────

/// Mean `-ln(p)` over requested capabilities, normalized by a fixed nat
/// ceiling. Unseen capabilities get the configured floor probability so
/// surprisal stays finite.
pub struct CapabilitySurprisal;

impl DriftSignal for CapabilitySurprisal {
    fn compute(&self, ctx: &SignalContext<'_>) -> SignalReading {
        if ctx.capabilities.is_empty() {
            return SignalReading::new(0.0, "no capabilities requested");
        }
        let floor = ctx.config.unseen_capability_probability;
        let mut total_nats = 0.0;
        let mut novel = 0usize;
        for capability in ctx.capabilities {
            let p = ctx.profile.capability_probability(capability, floor);
            total_nats += -p.ln();
            if !ctx.profile.has_seen_capability(capability) {
                novel += 1;
            }
        }
        let mean_nats = total_nats / ctx.capabilities.len() as f64;
        let raw = mean_nats / ctx.config.surprisal_ceiling_nats;
        SignalReading::new(
            raw,
            format!(
                "mean surprisal {mean_nats:.2} nats over {} capabilities ({novel} never seen)",
                ctx.capabilities.len()
            ),
        )
    }

    fn name(&self) -> &'static str {
        "capability_surprisal"
    }
}

// ── 3. Decayed violation rate ───────────────────────────────────────────

/// Exponentially decayed share of recent denials. A profile with no
/// outcome history yet reads as the neutral default, not as clean.
pub struct ViolationRate;

impl DriftSignal for ViolationRate {
    fn compute(&self, ctx: &SignalContext<'_>) -> SignalReading {
        let outcomes = ctx.profile.recent_outcomes();
        match decayed_violation_rate(&outcomes, ctx.now, ctx.config.violation_half_life()) {
            Some(rate) => SignalReading::new(
                rate,
                format!(
                    "decay-weighted violation rate {rate:.3} over {} outcomes",
                    outcomes.len()
                ),
            ),
            None => SignalReading::new(
                ctx.config.neutral_signal_default,
                "no outcome history, neutral default applied",
            ),
        }
    }

    fn name(&self) -> &'static str {
        "violation_rate"
    }
}

// ── 4. Velocity anomaly ─────────────────────────────────────────────────

/// Recent action rate compared against the agent's own baseline rate.
/// Acceleration past 5x the baseline saturates the signal.
pub struct VelocityAnomaly;

impl DriftSignal for VelocityAnomaly {
    fn compute(&self, ctx: &SignalContext<'_>) -> SignalReading {
        let timestamps = ctx.profile.action_timestamps();
        match velocity_observation(&timestamps, ctx.now, ctx.config.velocity_recent_window()) {
            Some(obs) => {
                let acceleration = obs.acceleration();
                let raw = ((acceleration - 1.0) / 4.0).clamp(0.0, 1.0);
                SignalReading::new(
                    raw,
                    format!(
                        "recent rate {:.2}/min vs baseline {:.2}/min ({acceleration:.1}x)",
                        obs.recent_rate, obs.baseline_rate
                    ),
                )
            }
            None => SignalReading::new(
                ctx.config.neutral_signal_default,
                "insufficient activity history for a rate baseline, neutral default applied",
            ),
        }
    }

    fn name(&self) -> &'static str {
        "velocity_anomaly"
    }
}

// ── 5. Context deviation ────────────────────────────────────────────────

/// Additive risk from the business context: after-hours, weekend,
/// holiday, contractor/external roles, sensitive operations. Capped at 1.
pub struct ContextDeviation;

impl DriftSignal for ContextDeviation {
    fn compute(&self, ctx: &SignalContext<'_>) -> SignalReading {
        let business = ctx.business;
        let mut raw = 0.0;
        let mut factors: Vec<&str> = Vec::new();

        if business.time_of_day == TimeOfDay::AfterHours && !business.weekend {
            raw += 0.3;
            factors.push("after hours");
        }
        if business.weekend {
            raw += 0.4;
            factors.push("weekend");
        }
        if business.holiday {
            raw += 0.5;
            factors.push("holiday");
        }
        match business.role {
            ActorRole::Contractor => {
                raw += 0.2;
                factors.push("contractor role");
            }
            ActorRole::External => {
                raw += 0.3;
                factors.push("external role");
            }
            ActorRole::Employee | ActorRole::Manager | ActorRole::Service => {}
        }
        if business.sensitive_operation {
            raw += 0.2;
            factors.push("sensitive operation");
        }

        let detail = if factors.is_empty() {
            "standard business context".to_string()
        } else {
            format!("risk factors: {}", factors.join(", "))
        };
        SignalReading::new(raw, detail)
    }

    fn name(&self) -> &'static str {
        "context_deviation"
    }
}

/// The default signal set, in weight order.
pub fn builtin_signals() -> Vec<Box<dyn DriftSignal>> {
    vec![
        Box::new(EmbeddingDrift),
        Box::new(CapabilitySurprisal),
        Box::new(ViolationRate),
        Box::new(VelocityAnomaly),
        Box::new(ContextDeviation),
    ]
}
