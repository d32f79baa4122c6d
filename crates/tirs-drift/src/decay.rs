use chrono::{DateTime, Duration, Utc};

/// Decay-weighted violation rate over recent outcomes.
///
/// Each outcome contributes 1.0 (violation) or 0.0 (clean) weighted by
/// `0.5^(age / half_life)`; the result is the weighted sum divided by the
/// total weight. Returns `None` when there are no outcomes to weigh.
pub fn decayed_violation_rate(
    outcomes: &[(DateTime<Utc>, bool)],
    now: DateTime<Utc>,
    half_life: Duration,
) -> Option<f64> {
    if outcomes.is_empty() {
        return None;
    }
    let half_life_secs = half_life.num_seconds().max(1) as f64;
    let mut weighted_violations = 0.0;
    let mut total_weight = 0.0;
    for (timestamp, violation) in outcomes {
        let age_secs = (now - *timestamp).num_seconds().max(0) as f64;
        let weight = 0.5_f64.powf(age_secs / half_life_secs);
        total_weight += weight;
        if *violation {
            weighted_violations += weight;
        }
    }
    if total_weight <= f64::EPSILON {
        return None;
    }
    Some((weighted_violations / total_weight).clamp(0.0, 1.0))
}

/// Recent-vs-baseline action rates for the velocity signal.
#[derive(Clone, Copy, Debug)]
pub struct VelocityObservation {
    /// Events per minute inside the recent window.
    pub recent_rate: f64,
    /// Events per minute over the whole recorded span.
    pub baseline_rate: f64,
}

impl VelocityObservation {
    /// Acceleration ratio of recent activity over the baseline.
    pub fn acceleration(&self) -> f64 {
        if self.baseline_rate <= f64::EPSILON {
            return 1.0;
        }
        self.recent_rate / self.baseline_rate
    }
}

/// Compare the recent action rate against the agent's own historical rate.
///
/// Needs at least three timestamps and a baseline span longer than the
/// recent window; otherwise there is no meaningful baseline yet and the
/// caller falls back to the neutral default.
pub fn velocity_observation(
    timestamps: &[DateTime<Utc>],
    now: DateTime<Utc>,
    recent_window: Duration,
) -> Option<VelocityObservation> {
    if timestamps.len() < 3 {
        return None;
    }
    let first = timestamps.iter().min()?;
    let span_secs = (now - *first).num_seconds();
    if span_secs <= recent_window.num_seconds() {
        return None;
    }

    let window_start = now - recent_window;
    let recent_count = timestamps.iter().filter(|t| **t >= window_start).count();
    let recent_rate = recent_count as f64 / (recent_window.num_seconds() as f64 / 60.0);
    let baseline_rate = timestamps.len() as f64 / (span_secs as f64 / 60.0);

    Some(VelocityObservation {
        recent_rate,
        baseline_rate,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn minutes_ago(now: DateTime<Utc>, minutes: i64) -> DateTime<Utc> {
        now - Duration::minutes(minutes)
    }

    #[test]
    fn empty_outcomes_yield_none() {
        assert!(decayed_violation_rate(&[], Utc::now(), Duration::minutes(30)).is_none());
    }

    #[test]
    fn all_recent_violations_rate_near_one() {
        let now = Utc::now();
        let outcomes: Vec<_> = (0..5).map(|i| (minutes_ago(now, i), true)).collect();
        let rate = decayed_violation_rate(&outcomes, now, Duration::minutes(30)).unwrap();
        assert!(rate > 0.95, "rate was {rate}");
    }

    #[test]
    fn old_violations_decay_below_recent_ones() {
        let now = Utc::now();
        let old = vec![(minutes_ago(now, 120), true), (minutes_ago(now, 1), false)];
        let recent = vec![(minutes_ago(now, 120), false), (minutes_ago(now, 1), true)];
        let old_rate = decayed_violation_rate(&old, now, Duration::minutes(30)).unwrap();
        let recent_rate = decayed_violation_rate(&recent, now, Duration::minutes(30)).unwrap();
        assert!(
            recent_rate > old_rate,
            "recent violation {recent_rate} should outweigh decayed one {old_rate}"
        );
    }

    #[test]
    fn clean_history_rate_is_zero() {
        let now = Utc::now();
        let outcomes: Vec<_> = (0..10).map(|i| (minutes_ago(now, i), false)).collect();
        let rate = decayed_violation_rate(&outcomes, now, Duration::minutes(30)).unwrap();
        assert_eq!(rate, 0.0);
    }

    #[test]
    fn velocity_needs_minimum_history() {
        let now = Utc::now();
        let timestamps = vec![minutes_ago(now, 1), minutes_ago(now, 2)];
        assert!(velocity_observation(&timestamps, now, Duration::minutes(5)).is_none());
    }

    #[test]
    fn burst_shows_acceleration() {
        let now = Utc::now();
        // Sparse background over two hours, then a burst in the last minute.
        let mut timestamps: Vec<_> = (1..=4).map(|i| minutes_ago(now, i * 30)).collect();
        for _ in 0..20 {
            timestamps.push(now - Duration::seconds(30));
        }
        let obs = velocity_observation(&timestamps, now, Duration::minutes(5)).unwrap();
        assert!(
            obs.acceleration() > 3.0,
            "acceleration was {}",
            obs.acceleration()
        );
    }

    #[test]
    fn steady_rate_has_acceleration_near_one() {
        let now = Utc::now();
        let timestamps: Vec<_> = (0..60).map(|i| minutes_ago(now, i)).collect();
        let obs = velocity_observation(&timestamps, now, Duration::minutes(5)).unwrap();
        let accel = obs.acceleration();
        assert!(
            (0.5..2.0).contains(&accel),
            "steady stream acceleration was {accel}"
        );
    }
}
