// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Repeating stats poll schedule.
//!
//! A single global deadline shared by all switches. The owner arms it once, asks
//! for the next deadline to sleep on, and calls [`PollSchedule::fire`] when woken;
//! firing reschedules one interval after the firing time.

use std::time::{Duration, Instant};

/// Deadline-based repeating task.
#[derive(Debug, Clone)]
pub struct PollSchedule {
    interval: Duration,
    next: Option<Instant>,
}

impl PollSchedule {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            next: None,
        }
    }

    /// Arm the schedule one interval from `now`. No-op if already armed.
    ///
    /// Returns `true` if this call armed it.
    pub fn arm(&mut self, now: Instant) -> bool {
        if self.next.is_some() {
            return false;
        }
        self.next = Some(now + self.interval);
        true
    }

    /// Stop the schedule until armed again.
    pub fn cancel(&mut self) {
        self.next = None;
    }

    /// Next deadline, if armed.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.next
    }

    /// Fire if the deadline has passed, rescheduling from `now`.
    pub fn fire(&mut self, now: Instant) -> bool {
        match self.next {
            Some(deadline) if now >= deadline => {
                self.next = Some(now + self.interval);
                true
            }
            _ => false,
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unarmed_never_fires() {
        let mut schedule = PollSchedule::new(Duration::from_secs(5));
        assert!(!schedule.fire(Instant::now() + Duration::from_secs(100)));
        assert_eq!(schedule.next_deadline(), None);
    }

    #[test]
    fn test_arm_is_idempotent() {
        let t0 = Instant::now();
        let mut schedule = PollSchedule::new(Duration::from_secs(5));

        assert!(schedule.arm(t0));
        assert!(!schedule.arm(t0 + Duration::from_secs(3)));
        assert_eq!(schedule.next_deadline(), Some(t0 + Duration::from_secs(5)));
    }

    #[test]
    fn test_fire_and_reschedule() {
        let t0 = Instant::now();
        let mut schedule = PollSchedule::new(Duration::from_secs(5));
        schedule.arm(t0);

        assert!(!schedule.fire(t0 + Duration::from_secs(4)));
        assert!(schedule.fire(t0 + Duration::from_secs(5)));
        assert_eq!(schedule.next_deadline(), Some(t0 + Duration::from_secs(10)));

        // Late wakeup reschedules from the firing time
        assert!(schedule.fire(t0 + Duration::from_secs(12)));
        assert_eq!(schedule.next_deadline(), Some(t0 + Duration::from_secs(17)));
    }

    #[test]
    fn test_cancel() {
        let t0 = Instant::now();
        let mut schedule = PollSchedule::new(Duration::from_secs(5));
        schedule.arm(t0);
        schedule.cancel();

        assert!(!schedule.fire(t0 + Duration::from_secs(5)));
        assert!(schedule.arm(t0 + Duration::from_secs(6)));
        assert_eq!(schedule.interval(), Duration::from_secs(5));
    }
}
