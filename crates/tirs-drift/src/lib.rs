//! TIRS Drift - multi-signal behavioral drift detection.
//!
//! Provides:
//! - `DriftSignal` trait with the five built-in signals: embedding drift,
//!   capability surprisal, decayed violation rate, velocity anomaly,
//!   context deviation
//! - `DriftProfile`: per-agent behavioral state (centroid, capability
//!   histogram, bounded histories, run-state, counters)
//! - `ContextAdjuster`: business-context band tightening
//! - `DriftDetector`: fuses weighted signals into one composite score and
//!   maps it into a risk band
//!
//! Signals are pure reads over the profile; the detector performs the
//! read-modify-write, so callers hold one per-agent lock around `evaluate`.

#![deny(unsafe_code)]
#![warn(rust_2018_idioms)]

mod config;
mod context_adjust;
mod decay;
mod detector;
mod profile;
mod signals;

pub use config::DriftConfig;
pub use context_adjust::{ContextAdjustConfig, ContextAdjuster};
pub use decay::{decayed_violation_rate, velocity_observation, VelocityObservation};
pub use detector::{DriftDetector, DriftEvaluation};
pub use profile::DriftProfile;
pub use signals::{
    CapabilitySurprisal, ContextDeviation, DriftSignal, EmbeddingDrift, RiskSignal,
    SignalContext, SignalReading, VelocityAnomaly, ViolationRate,
};
