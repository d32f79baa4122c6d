use chrono::{DateTime, Datelike, Timelike, Utc, Weekday};
use serde::{Deserialize, Serialize};

/// Coarse time-of-day bucket for contextual risk.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimeOfDay {
    /// Weekday 08:00-18:00 UTC.
    BusinessHours,
    AfterHours,
}

/// Role of the actor on whose behalf the agent operates.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActorRole {
    Employee,
    Manager,
    Contractor,
    External,
    Service,
}

impl Default for ActorRole {
    fn default() -> Self {
        Self::Service
    }
}

/// Business context for one evaluation. Derived fresh per request and
/// never persisted; the holiday flag comes from the caller because the
/// core carries no calendar data.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct BusinessContext {
    pub time_of_day: TimeOfDay,
    pub weekend: bool,
    pub holiday: bool,
    pub role: ActorRole,
    pub sensitive_operation: bool,
}

impl BusinessContext {
    /// Derive a context from a timestamp plus caller-supplied facts.
    pub fn derive(now: DateTime<Utc>, role: ActorRole, sensitive_operation: bool) -> Self {
        let weekend = matches!(now.weekday(), Weekday::Sat | Weekday::Sun);
        let hour = now.hour();
        let time_of_day = if !weekend && (8..18).contains(&hour) {
            TimeOfDay::BusinessHours
        } else {
            TimeOfDay::AfterHours
        };
        Self {
            time_of_day,
            weekend,
            holiday: false,
            role,
            sensitive_operation,
        }
    }

    pub fn with_holiday(mut self, holiday: bool) -> Self {
        self.holiday = holiday;
        self
    }
}

impl Default for BusinessContext {
    fn default() -> Self {
        Self::derive(Utc::now(), ActorRole::Service, false)
    }
}
