use thiserror::Error;

/// Configuration errors. All of these fail fast at construction time;
/// a running engine never sees an invalid weight or band set.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error(
        "risk thresholds must be strictly increasing: \
         elevated={elevated}, warning={warning}, critical={critical}, terminal={terminal}"
    )]
    NonMonotonicThresholds {
        elevated: f64,
        warning: f64,
        critical: f64,
        terminal: f64,
    },

    #[error("risk threshold edge {value} outside (0, 1]")]
    ThresholdOutOfRange { value: f64 },

    #[error("signal weights must sum to 1.0, got {sum}")]
    WeightSumMismatch { sum: f64 },

    #[error("signal weight `{name}` = {value} outside [0, 1]")]
    WeightOutOfRange { name: String, value: f64 },

    #[error("invalid parameter `{name}`: {reason}")]
    InvalidParameter { name: String, reason: String },
}

impl ConfigError {
    pub fn invalid(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidParameter {
            name: name.into(),
            reason: reason.into(),
        }
    }
}
