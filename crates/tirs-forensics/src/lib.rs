//! TIRS Forensics - causal timelines and point-in-time snapshots.
//!
//! Provides:
//! - `EventTimeline`: category/severity-tagged events forming a causal DAG
//!   per agent, with root-cause walks, consequence-tree expansion, and
//!   sliding-window pattern detection
//! - `ForensicSnapshot`: full profile + environment capture at a trigger
//!   event (kill), independently exportable for post-mortem analysis
//!
//! Snapshot capture and export are best-effort side channels: failures are
//! logged by callers and never propagated into the enforcement path.

#![deny(unsafe_code)]
#![warn(rust_2018_idioms)]

mod error;
mod snapshot;
mod timeline;

pub use error::ForensicError;
pub use snapshot::ForensicSnapshot;
pub use timeline::{
    EventCategory, EventSeverity, EventTimeline, PatternFinding, TimelineConfig, TimelineEvent,
    TimelineEventId,
};
