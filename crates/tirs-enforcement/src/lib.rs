//! TIRS Enforcement - the only place run-state changes.
//!
//! Provides:
//! - `EnforcementExecutor`: decides and applies throttle/pause/kill
//!   transitions as one ordered pipeline (state change, action history,
//!   audit, timeline, snapshot-on-kill)
//! - `RemediationEngine`: turns the top contributing signals into a
//!   prioritized corrective plan with compounding risk reductions
//! - `AppealManager`: human-gated resurrection workflow for killed agents
//!
//! Escalation is monotone: an agent never leaves a more severe state for a
//! less severe one except through an explicit, audited resurrection.

#![deny(unsafe_code)]
#![warn(rust_2018_idioms)]

mod appeals;
mod error;
mod executor;
mod remediation;

pub use appeals::{AppealManager, AppealRequest, AppealStatus};
pub use error::EnforcementError;
pub use executor::{EnforcementAction, EnforcementExecutor, EnforcementKind};
pub use remediation::{RemediationEngine, RemediationPlan, RemediationStep};
