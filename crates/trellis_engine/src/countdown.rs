//! # Unlock Countdown
//!
//! Boost-style farms lock deposits for a window; the dashboard shows the
//! time left as days / hours / minutes / seconds. The breakdown is a pure
//! function so it can be tested without a clock; the ticking handle
//! recomputes it once per second from the wall clock into a watch channel
//! and stops itself once the deadline passes.

use std::fmt;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

const SECS_PER_MINUTE: u64 = 60;
const SECS_PER_HOUR: u64 = 3_600;
const SECS_PER_DAY: u64 = 86_400;

/// Remaining time split for display.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TimeParts {
    /// Whole days remaining.
    pub days: u64,
    /// Hours remaining after the days.
    pub hours: u64,
    /// Minutes remaining after the hours.
    pub minutes: u64,
    /// Seconds remaining after the minutes.
    pub seconds: u64,
}

impl TimeParts {
    /// Break a remaining-seconds count into display parts.
    #[must_use]
    pub const fn from_remaining_secs(remaining: u64) -> Self {
        Self {
            days: remaining / SECS_PER_DAY,
            hours: (remaining % SECS_PER_DAY) / SECS_PER_HOUR,
            minutes: (remaining % SECS_PER_HOUR) / SECS_PER_MINUTE,
            seconds: remaining % SECS_PER_MINUTE,
        }
    }

    /// Whether the deadline has passed.
    #[must_use]
    pub const fn is_zero(&self) -> bool {
        self.days == 0 && self.hours == 0 && self.minutes == 0 && self.seconds == 0
    }
}

impl fmt::Display for TimeParts {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}d {:02}h {:02}m {:02}s",
            self.days, self.hours, self.minutes, self.seconds
        )
    }
}

/// Seconds until `deadline`, clamped at zero once it has passed.
#[must_use]
pub const fn remaining_secs(now: u64, deadline: u64) -> u64 {
    deadline.saturating_sub(now)
}

/// The wall clock as a unix timestamp. A clock before the epoch reads as
/// zero rather than failing.
#[must_use]
pub fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |elapsed| elapsed.as_secs())
}

/// A running countdown toward one unlock deadline.
///
/// Dropping the handle aborts the tick task; the watch channel keeps the
/// last published parts for any receiver still holding it.
pub struct UnlockCountdown {
    receiver: watch::Receiver<TimeParts>,
    task: JoinHandle<()>,
}

impl UnlockCountdown {
    /// Start ticking toward `deadline` (unix seconds) on the wall clock.
    #[must_use]
    pub fn start(deadline: u64) -> Self {
        Self::start_with_clock(deadline, unix_now)
    }

    /// Start ticking with an injected clock. Tests drive this directly.
    #[must_use]
    pub fn start_with_clock<F>(deadline: u64, clock: F) -> Self
    where
        F: Fn() -> u64 + Send + 'static,
    {
        let initial = TimeParts::from_remaining_secs(remaining_secs(clock(), deadline));
        let (sender, receiver) = watch::channel(initial);
        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(Duration::from_secs(1));
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                ticker.tick().await;
                let parts = TimeParts::from_remaining_secs(remaining_secs(clock(), deadline));
                if sender.send(parts).is_err() {
                    break;
                }
                if parts.is_zero() {
                    break;
                }
            }
        });
        Self { receiver, task }
    }

    /// The most recently published parts.
    #[must_use]
    pub fn parts(&self) -> TimeParts {
        *self.receiver.borrow()
    }

    /// A receiver for per-second updates.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<TimeParts> {
        self.receiver.clone()
    }

    /// Stop ticking. The last published parts stay readable.
    pub fn stop(&self) {
        self.task.abort();
    }

    /// Whether the tick task has ended, by deadline or by stop.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

impl Drop for UnlockCountdown {
    fn drop(&mut self) {
        self.task.abort();
    }
}
