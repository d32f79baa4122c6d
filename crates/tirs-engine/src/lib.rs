//! TIRS Engine - the single entry point for runtime risk governance.
//!
//! `TirsEngine::analyze_intent` sequences the whole pipeline for one
//! proposed action: embedding, five-signal drift fusion, adaptive and
//! contextual thresholding, profile updates, enforcement, audit and
//! timeline recording, and explanation/remediation synthesis.
//!
//! Everything the engine needs is injected through `TirsEngineBuilder`;
//! there are no module-level singletons, so lifecycle and test isolation
//! are explicit.

#![deny(unsafe_code)]
#![warn(rust_2018_idioms)]

mod config;
mod engine;
mod error;
mod explain;
mod outcome;
mod request;

pub use config::EngineConfig;
pub use engine::{TirsEngine, TirsEngineBuilder};
pub use error::EngineError;
pub use outcome::{AgentStatus, AnalysisOutcome, RiskDashboard};
pub use request::IntentRequest;

// The facade's vocabulary, re-exported for callers.
pub use tirs_audit::{AuditEntry, ChainVerification};
pub use tirs_enforcement::{AppealRequest, EnforcementAction, RemediationPlan};
pub use tirs_profiles::SystemState;
pub use tirs_types::{
    ActorRole, AgentId, BusinessContext, RiskLevel, RunState, TimeOfDay,
};
