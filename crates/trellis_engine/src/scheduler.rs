//! # Refresh Scheduler
//!
//! Cycle admission for one farm view. The polling loop, post-transaction
//! refresh requests, and manual refreshes all funnel through the same
//! compare-and-swap guard, so at most one refresh cycle runs at a time and
//! a tick that lands mid-cycle is counted as a skip instead of piling up a
//! second cycle behind the first.

use std::sync::atomic::{AtomicBool, AtomicU64, AtomicU8, Ordering};

use tokio::sync::Notify;

/// Scheduler lifecycle values.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum SchedulerState {
    /// Mounted but the snapshot has not initialized yet; the cadence is
    /// spent retrying the bootstrap pipeline.
    Inactive = 0,
    /// Steady-state polling.
    Active = 1,
}

impl From<u8> for SchedulerState {
    fn from(value: u8) -> Self {
        match value {
            1 => Self::Active,
            _ => Self::Inactive,
        }
    }
}

/// Admission guard and cadence bookkeeping, lock-free throughout.
pub struct RefreshScheduler {
    state: AtomicU8,
    cycle_running: AtomicBool,
    refresh_wanted: Notify,
    cycles_skipped: AtomicU64,
    refreshes_requested: AtomicU64,
}

impl RefreshScheduler {
    /// A scheduler in the inactive state with no cycle running.
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: AtomicU8::new(SchedulerState::Inactive as u8),
            cycle_running: AtomicBool::new(false),
            refresh_wanted: Notify::new(),
            cycles_skipped: AtomicU64::new(0),
            refreshes_requested: AtomicU64::new(0),
        }
    }

    /// Current lifecycle state.
    #[inline]
    #[must_use]
    pub fn state(&self) -> SchedulerState {
        SchedulerState::from(self.state.load(Ordering::Relaxed))
    }

    /// Enter steady-state polling. Called once the snapshot initializes.
    pub fn activate(&self) {
        self.state
            .store(SchedulerState::Active as u8, Ordering::Release);
    }

    /// Leave steady-state polling. Called on teardown.
    pub fn deactivate(&self) {
        self.state
            .store(SchedulerState::Inactive as u8, Ordering::Release);
    }

    /// Try to admit a refresh cycle.
    ///
    /// Exactly one caller wins until [`finish_cycle`](Self::finish_cycle);
    /// every loser is recorded as a skipped cycle and must not refresh.
    pub fn try_begin_cycle(&self) -> bool {
        let admitted = self
            .cycle_running
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok();
        if !admitted {
            self.cycles_skipped.fetch_add(1, Ordering::Relaxed);
        }
        admitted
    }

    /// Release the admission guard after a cycle ends, however it ended.
    pub fn finish_cycle(&self) {
        self.cycle_running.store(false, Ordering::Release);
    }

    /// Whether a cycle currently holds the admission guard.
    #[must_use]
    pub fn cycle_running(&self) -> bool {
        self.cycle_running.load(Ordering::Acquire)
    }

    /// Ask for an out-of-cycle refresh.
    ///
    /// A permit is stored when nobody is waiting yet, so a request made
    /// while a cycle is in flight wakes the loop as soon as it listens.
    pub fn request_refresh(&self) {
        self.refreshes_requested.fetch_add(1, Ordering::Relaxed);
        self.refresh_wanted.notify_one();
    }

    /// Wait for the next refresh request.
    pub async fn refresh_requested(&self) {
        self.refresh_wanted.notified().await;
    }

    /// Ticks that arrived while a cycle was still running.
    #[must_use]
    pub fn cycles_skipped(&self) -> u64 {
        self.cycles_skipped.load(Ordering::Relaxed)
    }

    /// Out-of-cycle refreshes requested so far.
    #[must_use]
    pub fn refreshes_requested(&self) -> u64 {
        self.refreshes_requested.load(Ordering::Relaxed)
    }
}

impl Default for RefreshScheduler {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn admission_is_exclusive_until_finished() {
        let scheduler = RefreshScheduler::new();
        assert!(scheduler.try_begin_cycle());
        assert!(!scheduler.try_begin_cycle());
        assert!(!scheduler.try_begin_cycle());
        assert_eq!(scheduler.cycles_skipped(), 2);

        scheduler.finish_cycle();
        assert!(scheduler.try_begin_cycle());
        assert_eq!(scheduler.cycles_skipped(), 2);
    }

    #[test]
    fn lifecycle_moves_between_inactive_and_active() {
        let scheduler = RefreshScheduler::new();
        assert_eq!(scheduler.state(), SchedulerState::Inactive);
        scheduler.activate();
        assert_eq!(scheduler.state(), SchedulerState::Active);
        scheduler.deactivate();
        assert_eq!(scheduler.state(), SchedulerState::Inactive);
    }

    #[tokio::test(start_paused = true)]
    async fn a_refresh_request_made_early_is_not_lost() {
        let scheduler = RefreshScheduler::new();
        scheduler.request_refresh();

        // The permit was stored, so the wait resolves immediately.
        tokio::time::timeout(Duration::from_millis(10), scheduler.refresh_requested())
            .await
            .unwrap();
        assert_eq!(scheduler.refreshes_requested(), 1);
    }
}
