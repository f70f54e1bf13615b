//! # Diagnostics Channel
//!
//! Absorbed read failures do not vanish: every one becomes a structured
//! record on a single bounded channel, tagged with the farm, the operation
//! and the cause. Subscribers drain at their own pace; when nobody drains,
//! the channel drops the oldest-unread records rather than blocking a
//! refresh cycle, and counts what it dropped.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crossbeam_channel::{bounded, Receiver, Sender, TrySendError};

/// Default channel capacity.
pub const DEFAULT_DIAGNOSTIC_CAPACITY: usize = 256;

/// One absorbed failure.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DiagnosticRecord {
    /// Display name of the farm the failure belongs to.
    pub farm: String,
    /// The operation that failed (Solidity function name).
    pub operation: &'static str,
    /// Human-readable cause.
    pub cause: String,
}

/// Handle to the dashboard-wide diagnostics channel. Clones share one
/// channel.
#[derive(Clone)]
pub struct DiagnosticsHub {
    sender: Sender<DiagnosticRecord>,
    receiver: Receiver<DiagnosticRecord>,
    dropped: Arc<AtomicU64>,
}

impl Default for DiagnosticsHub {
    fn default() -> Self {
        Self::new(DEFAULT_DIAGNOSTIC_CAPACITY)
    }
}

impl DiagnosticsHub {
    /// Creates a hub with the given capacity.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (sender, receiver) = bounded(capacity);
        Self {
            sender,
            receiver,
            dropped: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Emits one record. Never blocks; on a full channel the record is
    /// dropped and counted.
    pub fn emit(&self, record: DiagnosticRecord) {
        tracing::warn!(
            farm = %record.farm,
            operation = record.operation,
            cause = %record.cause,
            "read absorbed"
        );
        match self.sender.try_send(record) {
            Ok(()) => {}
            Err(TrySendError::Full(_) | TrySendError::Disconnected(_)) => {
                self.dropped.fetch_add(1, Ordering::Relaxed);
            }
        }
    }

    /// A receiver for draining records.
    #[must_use]
    pub fn subscribe(&self) -> Receiver<DiagnosticRecord> {
        self.receiver.clone()
    }

    /// Records pending in the channel right now.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.receiver.len()
    }

    /// Records dropped due to a full channel.
    #[must_use]
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}
