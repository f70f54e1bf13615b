//! # Per-Farm Sync Statistics
//!
//! Counters for everything one farm view does. Relaxed atomics: the numbers
//! feed dashboards and tests, nothing synchronizes on them.

use std::sync::atomic::{AtomicU64, Ordering};

/// Counters for one farm view.
#[derive(Debug, Default)]
pub struct SyncStats {
    /// Refresh cycles that ran to completion.
    pub cycles_completed: AtomicU64,
    /// Individual reads that failed and were absorbed.
    pub reads_failed: AtomicU64,
    /// Reads skipped because no wallet account was connected.
    pub reads_skipped_no_account: AtomicU64,
    /// Transactions handed to the submitter.
    pub tx_dispatched: AtomicU64,
    /// Transactions that settled successfully.
    pub tx_confirmed: AtomicU64,
    /// Transactions that failed at dispatch or settlement.
    pub tx_failed: AtomicU64,
    /// Submissions refused before dispatch by a local guard.
    pub tx_skipped: AtomicU64,
}

impl SyncStats {
    /// Creates zeroed counters.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records one completed refresh cycle.
    pub fn record_cycle(&self) {
        self.cycles_completed.fetch_add(1, Ordering::Relaxed);
    }

    /// Records one absorbed read failure.
    pub fn record_read_failure(&self) {
        self.reads_failed.fetch_add(1, Ordering::Relaxed);
    }

    /// Records a batch of reads skipped for lack of an account.
    pub fn record_reads_skipped(&self, count: u64) {
        self.reads_skipped_no_account
            .fetch_add(count, Ordering::Relaxed);
    }

    /// Records one dispatched transaction.
    pub fn record_dispatch(&self) {
        self.tx_dispatched.fetch_add(1, Ordering::Relaxed);
    }

    /// Records one confirmed transaction.
    pub fn record_confirmed(&self) {
        self.tx_confirmed.fetch_add(1, Ordering::Relaxed);
    }

    /// Records one failed transaction.
    pub fn record_failed(&self) {
        self.tx_failed.fetch_add(1, Ordering::Relaxed);
    }

    /// Records one refused submission.
    pub fn record_skip(&self) {
        self.tx_skipped.fetch_add(1, Ordering::Relaxed);
    }

    /// A point-in-time copy of every counter.
    #[must_use]
    pub fn snapshot(&self) -> SyncStatsSnapshot {
        SyncStatsSnapshot {
            cycles_completed: self.cycles_completed.load(Ordering::Relaxed),
            reads_failed: self.reads_failed.load(Ordering::Relaxed),
            reads_skipped_no_account: self.reads_skipped_no_account.load(Ordering::Relaxed),
            tx_dispatched: self.tx_dispatched.load(Ordering::Relaxed),
            tx_confirmed: self.tx_confirmed.load(Ordering::Relaxed),
            tx_failed: self.tx_failed.load(Ordering::Relaxed),
            tx_skipped: self.tx_skipped.load(Ordering::Relaxed),
        }
    }
}

/// Plain copy of [`SyncStats`] for display and assertions.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SyncStatsSnapshot {
    /// Refresh cycles that ran to completion.
    pub cycles_completed: u64,
    /// Individual reads that failed and were absorbed.
    pub reads_failed: u64,
    /// Reads skipped because no wallet account was connected.
    pub reads_skipped_no_account: u64,
    /// Transactions handed to the submitter.
    pub tx_dispatched: u64,
    /// Transactions that settled successfully.
    pub tx_confirmed: u64,
    /// Transactions that failed at dispatch or settlement.
    pub tx_failed: u64,
    /// Submissions refused before dispatch by a local guard.
    pub tx_skipped: u64,
}
