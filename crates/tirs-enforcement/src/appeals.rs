use std::collections::HashMap;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tirs_types::{AgentId, AppealId, EnforcementId, RunState};
use tracing::info;

use crate::error::EnforcementError;

/// Default ceiling on lifetime resurrections per agent.
pub const DEFAULT_MAX_RESURRECTIONS: u32 = 3;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AppealStatus {
    Pending,
    Approved,
    Denied,
}

/// A human-submitted request to resurrect a killed agent.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AppealRequest {
    pub appeal_id: AppealId,
    pub agent_id: AgentId,
    /// The kill action this appeal contests.
    pub enforcement_id: EnforcementId,
    pub submitted_by: String,
    pub reason: String,
    pub submitted_at: DateTime<Utc>,
    pub status: AppealStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub decided_by: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub decided_at: Option<DateTime<Utc>>,
}

/// Governs the resurrection workflow for killed agents.
///
/// An appeal may only target a currently-killed agent, and resurrection
/// is bounded by the maximum-resurrections invariant. The manager tracks
/// appeal state; the executor performs the actual state restoration.
pub struct AppealManager {
    max_resurrections: u32,
    appeals: RwLock<HashMap<AppealId, AppealRequest>>,
}

impl AppealManager {
    pub fn new(max_resurrections: u32) -> Self {
        Self {
            max_resurrections,
            appeals: RwLock::new(HashMap::new()),
        }
    }

    pub fn max_resurrections(&self) -> u32 {
        self.max_resurrections
    }

    /// Submit an appeal against a kill. Rejected unless the agent is
    /// currently killed and still has resurrection budget.
    pub fn submit(
        &self,
        agent_id: &AgentId,
        agent_state: RunState,
        resurrection_count: u32,
        enforcement_id: EnforcementId,
        submitted_by: impl Into<String>,
        reason: impl Into<String>,
    ) -> Result<AppealRequest, EnforcementError> {
        if agent_state != RunState::Killed {
            return Err(EnforcementError::AgentNotKilled {
                agent: agent_id.clone(),
                state: agent_state,
            });
        }
        self.check_eligibility(agent_id, resurrection_count)?;

        let appeal = AppealRequest {
            appeal_id: AppealId::generate(),
            agent_id: agent_id.clone(),
            enforcement_id,
            submitted_by: submitted_by.into(),
            reason: reason.into(),
            submitted_at: Utc::now(),
            status: AppealStatus::Pending,
            decided_by: None,
            decided_at: None,
        };
        info!(agent = %agent_id, appeal = %appeal.appeal_id, "resurrection appeal submitted");
        self.appeals
            .write()
            .insert(appeal.appeal_id.clone(), appeal.clone());
        Ok(appeal)
    }

    /// The resurrection-count invariant: the (max+1)-th attempt fails.
    pub fn check_eligibility(
        &self,
        agent_id: &AgentId,
        resurrection_count: u32,
    ) -> Result<(), EnforcementError> {
        if resurrection_count >= self.max_resurrections {
            return Err(EnforcementError::ResurrectionLimitReached {
                agent: agent_id.clone(),
                count: resurrection_count,
                max: self.max_resurrections,
            });
        }
        Ok(())
    }

    /// Record a human decision on a pending appeal.
    pub fn decide(
        &self,
        appeal_id: &AppealId,
        approve: bool,
        decided_by: impl Into<String>,
    ) -> Result<AppealRequest, EnforcementError> {
        let mut appeals = self.appeals.write();
        let appeal = appeals
            .get_mut(appeal_id)
            .ok_or_else(|| EnforcementError::AppealNotFound(appeal_id.clone()))?;
        if appeal.status != AppealStatus::Pending {
            return Err(EnforcementError::AppealAlreadyDecided(appeal_id.clone()));
        }
        appeal.status = if approve {
            AppealStatus::Approved
        } else {
            AppealStatus::Denied
        };
        appeal.decided_by = Some(decided_by.into());
        appeal.decided_at = Some(Utc::now());
        Ok(appeal.clone())
    }

    pub fn get(&self, appeal_id: &AppealId) -> Option<AppealRequest> {
        self.appeals.read().get(appeal_id).cloned()
    }

    /// Appeals for one agent, newest first.
    pub fn appeals_for(&self, agent_id: &AgentId) -> Vec<AppealRequest> {
        let mut appeals: Vec<AppealRequest> = self
            .appeals
            .read()
            .values()
            .filter(|a| &a.agent_id == agent_id)
            .cloned()
            .collect();
        appeals.sort_by(|a, b| b.submitted_at.cmp(&a.submitted_at));
        appeals
    }
}

impl Default for AppealManager {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_RESURRECTIONS)
    }
}
