//! # Collaborator Traits
//!
//! Everything outside the engine - the RPC transport, the wallet, the
//! notification surface, the protocol-wide stats feed - sits behind the
//! traits in this module. The engine owns none of it and mocks all of it.
//!
//! ```text
//! Engine depends on:      Host app implements:
//! ┌────────────────┐      ┌──────────────────┐
//! │ trait Gateway  │ ←──  │ RPC / simulated  │
//! │ trait Signer   │ ←──  │ wallet bridge    │
//! │ trait Sink     │ ←──  │ toast widget     │
//! └────────────────┘      └──────────────────┘
//! ```

use std::future::Future;
use std::sync::Arc;

use alloy_primitives::{Address, U256};
use parking_lot::Mutex;

use crate::binding::{ContractBinding, InterfaceKind};
use crate::calls::{CallSpec, CallValue, Settlement, TransactionRequest, TxHandle};
use crate::error::{CallError, ResolveError, SubmitError};

// ============================================================================
// ASYNC SURFACE - Reads and Writes
// ============================================================================

/// Executes typed reads against resolved bindings.
///
/// One call, one field: the engine fans out many of these per refresh cycle
/// and absorbs each failure individually.
pub trait CallGateway: Send + Sync {
    /// Executes one read.
    fn read(
        &self,
        binding: ContractBinding,
        spec: CallSpec,
    ) -> impl Future<Output = Result<CallValue, CallError>> + Send;
}

/// Dispatches writes and awaits their settlement.
///
/// The two stages are deliberate: `dispatch` covers the submitting phase,
/// `confirm` covers the waiting-for-inclusion phase. The orchestrator's
/// state machine follows them one to one.
pub trait TransactionSubmitter: Send + Sync {
    /// Signs and dispatches a request; resolves once the pool accepts it.
    fn dispatch(
        &self,
        request: &TransactionRequest,
    ) -> impl Future<Output = Result<TxHandle, SubmitError>> + Send;

    /// Awaits the terminal state of a previously dispatched request.
    fn confirm(&self, handle: TxHandle) -> impl Future<Output = Settlement> + Send;
}

// ============================================================================
// SYNC SURFACE - Resolution, Wallet, Notifications, Stats Feed
// ============================================================================

/// Resolves addresses into callable bindings.
pub trait BindingFactory: Send + Sync {
    /// Resolves a binding, validating that a contract with the requested
    /// interface is available at the address.
    ///
    /// # Errors
    /// Returns [`ResolveError`] for the zero address or an unavailable
    /// interface. Resolution failures are configuration failures: callers
    /// mark the slot failed and skip dependent reads.
    fn resolve(
        &self,
        address: Address,
        interface: InterfaceKind,
    ) -> Result<ContractBinding, ResolveError>;
}

/// The connected wallet, which may be absent at any time.
pub trait WalletSigner: Send + Sync {
    /// The active account, if a wallet is connected.
    fn account(&self) -> Option<Address>;
}

/// Where user-visible transaction outcomes go.
pub trait NotificationSink: Send + Sync {
    /// Delivers one notification. Must not block.
    fn notify(&self, notification: Notification);
}

/// Read-only protocol-wide stats feed (APY, TVL per strategy).
///
/// Produced outside the engine; consumed for display. Nothing in the engine
/// ever writes to it.
pub trait AggregateStatsSource: Send + Sync {
    /// The most recent stats payload, if any has arrived yet.
    fn latest(&self) -> Option<Arc<AggregateStats>>;
}

/// Severity of a user-visible notification.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NotificationKind {
    /// A transaction settled successfully.
    Success,
    /// A transaction was dispatched and is awaiting inclusion.
    Pending,
    /// A transaction failed or was rejected.
    Error,
}

/// One user-visible notification.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Notification {
    /// Severity.
    pub kind: NotificationKind,
    /// Display message.
    pub message: String,
    /// How long the host should keep it on screen.
    pub auto_dismiss_ms: u32,
}

impl Notification {
    /// A success notification.
    #[must_use]
    pub fn success(message: impl Into<String>, auto_dismiss_ms: u32) -> Self {
        Self {
            kind: NotificationKind::Success,
            message: message.into(),
            auto_dismiss_ms,
        }
    }

    /// A pending notification.
    #[must_use]
    pub fn pending(message: impl Into<String>, auto_dismiss_ms: u32) -> Self {
        Self {
            kind: NotificationKind::Pending,
            message: message.into(),
            auto_dismiss_ms,
        }
    }

    /// An error notification.
    #[must_use]
    pub fn error(message: impl Into<String>, auto_dismiss_ms: u32) -> Self {
        Self {
            kind: NotificationKind::Error,
            message: message.into(),
            auto_dismiss_ms,
        }
    }
}

/// Per-strategy entry in the aggregate feed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StrategyStats {
    /// The farm this entry describes.
    pub farm: Address,
    /// Annual percentage yield in basis points.
    pub apy_bps: u64,
    /// Total value staked in the farm, in staked-token base units.
    pub total_value_staked: U256,
}

/// Protocol-wide stats payload.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AggregateStats {
    /// Headline booster APY in basis points, when the protocol publishes
    /// one for its flagship autocompounder.
    pub headline_apy_bps: Option<u64>,
    /// Per-strategy entries.
    pub strategies: Vec<StrategyStats>,
}

impl AggregateStats {
    /// Looks up the entry for a farm address.
    #[must_use]
    pub fn strategy(&self, farm: Address) -> Option<&StrategyStats> {
        self.strategies.iter().find(|entry| entry.farm == farm)
    }
}

// ============================================================================
// MOCK IMPLEMENTATIONS (For Testing)
// ============================================================================

/// Mock wallet with a settable account.
pub struct MockWalletSigner {
    account: Mutex<Option<Address>>,
}

impl MockWalletSigner {
    /// A wallet connected as the given account.
    #[must_use]
    pub fn connected(account: Address) -> Self {
        Self {
            account: Mutex::new(Some(account)),
        }
    }

    /// A wallet with no account connected.
    #[must_use]
    pub fn disconnected() -> Self {
        Self {
            account: Mutex::new(None),
        }
    }

    /// Connects or disconnects the account.
    pub fn set_account(&self, account: Option<Address>) {
        *self.account.lock() = account;
    }
}

impl WalletSigner for MockWalletSigner {
    fn account(&self) -> Option<Address> {
        *self.account.lock()
    }
}

/// Notification sink that records everything it receives.
#[derive(Default)]
pub struct RecordingNotificationSink {
    received: Mutex<Vec<Notification>>,
}

impl RecordingNotificationSink {
    /// Creates an empty recording sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// All notifications received so far, in order.
    #[must_use]
    pub fn received(&self) -> Vec<Notification> {
        self.received.lock().clone()
    }

    /// Count of notifications with the given kind.
    #[must_use]
    pub fn count_of(&self, kind: NotificationKind) -> usize {
        self.received
            .lock()
            .iter()
            .filter(|n| n.kind == kind)
            .count()
    }

    /// Drains and returns everything received so far.
    pub fn take(&self) -> Vec<Notification> {
        std::mem::take(&mut *self.received.lock())
    }
}

impl NotificationSink for RecordingNotificationSink {
    fn notify(&self, notification: Notification) {
        self.received.lock().push(notification);
    }
}

/// Stats source serving a fixed payload.
pub struct StaticStatsSource {
    payload: Mutex<Option<Arc<AggregateStats>>>,
}

impl StaticStatsSource {
    /// A source that has not received a payload yet.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            payload: Mutex::new(None),
        }
    }

    /// A source serving the given payload.
    #[must_use]
    pub fn with(payload: AggregateStats) -> Self {
        Self {
            payload: Mutex::new(Some(Arc::new(payload))),
        }
    }

    /// Replaces the served payload.
    pub fn publish(&self, payload: AggregateStats) {
        *self.payload.lock() = Some(Arc::new(payload));
    }
}

impl AggregateStatsSource for StaticStatsSource {
    fn latest(&self) -> Option<Arc<AggregateStats>> {
        self.payload.lock().clone()
    }
}
