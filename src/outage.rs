//! Outage bookkeeping for the live feed connection

use chrono::{DateTime, Duration, Utc};

/// Tracks when the current live-feed outage began.
///
/// Holds at most one instant: the healthy-to-broken transition of the
/// connection. Repeated failures within the same outage do not move it.
/// Never persisted; a process restart recovers through the startup
/// reconciliation pass instead.
#[derive(Debug, Default)]
pub struct OutageTracker {
    started_at: Option<DateTime<Utc>>,
}

impl OutageTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a failure. Only the first failure of a new outage is kept.
    pub fn mark_failure(&mut self, now: DateTime<Utc>) {
        if self.started_at.is_none() {
            self.started_at = Some(now);
        }
    }

    /// Clear the marker after a successful reconnect.
    pub fn mark_recovered(&mut self) {
        self.started_at = None;
    }

    pub fn is_clear(&self) -> bool {
        self.started_at.is_none()
    }

    /// How long the feed has been down, or zero if it is healthy.
    pub fn current_outage_duration(&self, now: DateTime<Utc>) -> Duration {
        self.started_at.map_or_else(Duration::zero, |t| now - t)
    }

    /// Look-back for the post-outage reconciliation: the outage duration
    /// plus a five-minute cushion covering buckets that complete exactly at
    /// the reconnect boundary.
    pub fn recovery_horizon(&self, now: DateTime<Utc>) -> Duration {
        self.current_outage_duration(now) + Duration::minutes(5)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_tracker_is_clear() {
        let tracker = OutageTracker::new();
        assert!(tracker.is_clear());
        assert_eq!(tracker.current_outage_duration(Utc::now()), Duration::zero());
    }

    #[test]
    fn test_mark_failure_keeps_first_instant() {
        let mut tracker = OutageTracker::new();
        let t0 = Utc::now();

        tracker.mark_failure(t0);
        tracker.mark_failure(t0 + Duration::minutes(2));

        assert_eq!(
            tracker.current_outage_duration(t0 + Duration::minutes(3)),
            Duration::minutes(3)
        );
    }

    #[test]
    fn test_recovery_clears_marker() {
        let mut tracker = OutageTracker::new();
        tracker.mark_failure(Utc::now());
        assert!(!tracker.is_clear());

        tracker.mark_recovered();
        assert!(tracker.is_clear());
        assert_eq!(tracker.current_outage_duration(Utc::now()), Duration::zero());
    }

    #[test]
    fn test_recovery_horizon_adds_cushion() {
        let mut tracker = OutageTracker::new();
        let t0 = Utc::now();
        tracker.mark_failure(t0);

        // A three-minute outage must reconcile at least eight minutes back.
        let horizon = tracker.recovery_horizon(t0 + Duration::minutes(3));
        assert_eq!(horizon, Duration::minutes(8));
    }

    #[test]
    fn test_recovery_horizon_when_clear_is_just_the_cushion() {
        let tracker = OutageTracker::new();
        assert_eq!(tracker.recovery_horizon(Utc::now()), Duration::minutes(5));
    }
}
