//! Fixed-rate tick scheduling for the render loop

use std::time::{Duration, Instant};

/// Repeating timer with a single pending deadline
///
/// The UI loop polls it between events. When the loop falls behind, missed
/// ticks are dropped rather than replayed in a burst.
#[derive(Debug, Clone)]
pub struct Ticker {
    period: Duration,
    deadline: Instant,
}

impl Ticker {
    pub fn new(period: Duration, now: Instant) -> Self {
        let period = period.max(Duration::from_millis(1));
        Self {
            period,
            deadline: now + period,
        }
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    /// Returns true, at most once per call, when the deadline has passed
    pub fn poll(&mut self, now: Instant) -> bool {
        if now < self.deadline {
            return false;
        }
        self.deadline += self.period;
        if self.deadline <= now {
            tracing::trace!("render tick behind schedule, skipping ahead");
            self.deadline = now + self.period;
        }
        true
    }

    /// Replace the schedule with one at `period`, first firing a period from now
    pub fn reschedule(&mut self, period: Duration, now: Instant) {
        tracing::debug!("render tick period {:?} -> {:?}", self.period, period);
        self.period = period.max(Duration::from_millis(1));
        self.deadline = now + self.period;
    }

    /// Time left until the next deadline
    pub fn until_next(&self, now: Instant) -> Duration {
        self.deadline.saturating_duration_since(now)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MS: Duration = Duration::from_millis(1);

    #[test]
    fn test_fires_once_per_period() {
        let start = Instant::now();
        let mut ticker = Ticker::new(10 * MS, start);
        assert!(!ticker.poll(start + 5 * MS));
        assert!(ticker.poll(start + 10 * MS));
        assert!(!ticker.poll(start + 12 * MS));
        assert!(ticker.poll(start + 20 * MS));
    }

    #[test]
    fn test_missed_ticks_are_not_replayed() {
        let start = Instant::now();
        let mut ticker = Ticker::new(10 * MS, start);
        assert!(ticker.poll(start + 55 * MS));
        assert!(!ticker.poll(start + 56 * MS));
        assert_eq!(ticker.until_next(start + 56 * MS), 9 * MS);
    }

    #[test]
    fn test_reschedule_replaces_deadline() {
        let start = Instant::now();
        let mut ticker = Ticker::new(10 * MS, start);
        ticker.reschedule(40 * MS, start + 5 * MS);
        assert_eq!(ticker.period(), 40 * MS);
        assert!(!ticker.poll(start + 10 * MS));
        assert!(ticker.poll(start + 45 * MS));
        assert_eq!(ticker.until_next(start + 45 * MS), 40 * MS);
    }
}
