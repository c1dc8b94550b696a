//! Polling timer (idle / polling).
//!
//! The timer does not own a thread. The UI loop asks when it is next due and calls
//! [`PollTimer::fire`]; at most one schedule is active at a time.

use std::time::{Duration, Instant};

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(250);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum PollState {
    Idle,
    Polling { next_due: Instant },
}

#[derive(Debug)]
pub struct PollTimer {
    interval: Duration,
    state: PollState,
}

impl PollTimer {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval: interval.max(Duration::from_millis(1)),
            state: PollState::Idle,
        }
    }

    pub fn is_polling(&self) -> bool {
        matches!(self.state, PollState::Polling { .. })
    }

    /// Start polling; replaces any active schedule. First tick is one interval from `now`.
    pub fn start(&mut self, now: Instant) {
        self.state = PollState::Polling {
            next_due: now + self.interval,
        };
    }

    pub fn stop(&mut self) {
        self.state = PollState::Idle;
    }

    /// True when a tick is due at `now`. Missed ticks collapse into one.
    pub fn fire(&mut self, now: Instant) -> bool {
        let PollState::Polling { next_due } = self.state else {
            return false;
        };
        if now < next_due {
            return false;
        }
        let mut next = next_due + self.interval;
        if next <= now {
            next = now + self.interval;
        }
        self.state = PollState::Polling { next_due: next };
        true
    }

    /// Time until the next tick; `None` while idle.
    pub fn time_until(&self, now: Instant) -> Option<Duration> {
        match self.state {
            PollState::Idle => None,
            PollState::Polling { next_due } => Some(next_due.saturating_duration_since(now)),
        }
    }
}

impl Default for PollTimer {
    fn default() -> Self {
        Self::new(DEFAULT_POLL_INTERVAL)
    }
}
