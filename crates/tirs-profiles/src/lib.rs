//! TIRS Profiles - learned behavioral baselines and adaptive thresholds.
//!
//! Provides:
//! - `BehavioralProfile`: per-agent learned baseline (capability
//!   frequencies and risk deltas, risk mean/deviation, hourly activity)
//!   with a learning → established lifecycle
//! - `ProfileMatcher`: anomaly checks against baselines, per-type profile
//!   blending, and cold-start borrowing for new agents
//! - `AdaptiveThresholds`: per-agent percentile learning blended into the
//!   active risk-band edges at a bounded rate
//!
//! Baselines are meaning input only: they flag anomalies and tune bands,
//! but never trigger enforcement by themselves.

#![deny(unsafe_code)]
#![warn(rust_2018_idioms)]

mod adaptive;
mod behavioral;
mod matcher;

pub use adaptive::{AdaptiveConfig, AdaptiveThresholds, SystemState};
pub use behavioral::{
    AnomalyFinding, BehavioralConfig, BehavioralProfile, CapabilityStats, ProfileState,
};
pub use matcher::{profile_similarity, ProfileMatcher};
