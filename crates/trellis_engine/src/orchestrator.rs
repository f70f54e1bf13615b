//! # Transaction Orchestration
//!
//! Every user-initiated write funnels through one state machine per farm:
//! `Idle -> Submitting -> AwaitingConfirmation -> Settled -> Idle`, held in
//! a single atomic. Entry is a compare-and-swap from `Idle`, so a second
//! submission while anything is in flight resolves to a skip without
//! touching the wallet. Validation is entirely local and runs before the
//! machine is entered; a request that cannot possibly succeed never leaves
//! the process.

use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;

use alloy_primitives::U256;
use tracing::{debug, info, warn};

use trellis_chain::{
    parse_units, ContractBinding, Notification, NotificationSink, Settlement, TransactionKind,
    TransactionRequest, TransactionSubmitter, TxHandle, WalletSigner,
};

use crate::approval;
use crate::config::NotificationTimings;
use crate::countdown::unix_now;
use crate::descriptor::FarmDescriptor;
use crate::scheduler::RefreshScheduler;
use crate::snapshot::{FarmSnapshot, SyncedFarmState};

/// Position of the transaction state machine.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum TxPhase {
    /// Nothing in flight; submissions are admitted.
    Idle = 0,
    /// Validation passed, the dispatch call is running.
    Submitting = 1,
    /// Dispatched; waiting for the chain to settle it.
    AwaitingConfirmation = 2,
    /// Settled; bookkeeping in progress before returning to idle.
    Settled = 3,
}

impl From<u8> for TxPhase {
    fn from(value: u8) -> Self {
        match value {
            1 => Self::Submitting,
            2 => Self::AwaitingConfirmation,
            3 => Self::Settled,
            _ => Self::Idle,
        }
    }
}

/// A user-initiated farm action. Amounts arrive as the text the user
/// typed; parsing at the token's decimals is part of validation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FarmAction {
    /// Grant the farm an unlimited allowance on the staked token.
    Approve,
    /// Stake the given amount.
    Deposit {
        /// Decimal text at staked-token decimals.
        amount: String,
    },
    /// Withdraw the entire stake.
    Withdraw,
    /// Withdraw a caller-specified amount. The deployed farms only pay out
    /// in full, so anything but the exact staked balance is refused.
    WithdrawExact {
        /// Decimal text at staked-token decimals.
        amount: String,
    },
    /// Claim all pending rewards.
    Claim,
    /// Compound pending rewards into the stake.
    Compound,
}

/// Why a submission was refused without dispatching anything.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SkipReason {
    /// Another transaction is already in flight.
    Busy,
    /// The view has been torn down.
    TornDown,
    /// No wallet account is connected.
    SignerAbsent,
    /// The snapshot has not initialized yet.
    NotInitialized,
    /// The staked-token binding is not resolved.
    BindingUnresolved,
    /// The amount failed to parse or was zero.
    InvalidAmount,
    /// Withdraw with nothing staked.
    NothingStaked,
    /// Withdraw for anything other than the full staked balance.
    PartialWithdraw,
    /// The farm does not expose this operation.
    Unsupported,
    /// Claim while no rewards are available (claim gate).
    NothingToClaim,
    /// Withdraw before the unlock timestamp (unlock gate).
    Locked,
}

impl SkipReason {
    /// Stable name for logs.
    #[must_use]
    pub const fn describe(self) -> &'static str {
        match self {
            Self::Busy => "busy",
            Self::TornDown => "torn_down",
            Self::SignerAbsent => "signer_absent",
            Self::NotInitialized => "not_initialized",
            Self::BindingUnresolved => "binding_unresolved",
            Self::InvalidAmount => "invalid_amount",
            Self::NothingStaked => "nothing_staked",
            Self::PartialWithdraw => "partial_withdraw",
            Self::Unsupported => "unsupported",
            Self::NothingToClaim => "nothing_to_claim",
            Self::Locked => "locked",
        }
    }
}

/// How a submission ended. Nothing in the flow panics or propagates an
/// error past this type.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TxOutcome {
    /// Dispatched and settled successfully.
    Confirmed(TxHandle),
    /// Dispatched but rejected or reverted.
    Failed,
    /// Refused before dispatch.
    Skipped(SkipReason),
}

impl TxOutcome {
    /// Whether the transaction settled successfully.
    #[must_use]
    pub const fn is_confirmed(&self) -> bool {
        matches!(self, Self::Confirmed(_))
    }
}

/// Resets the machine to idle when a submission path unwinds.
struct PhaseGuard<'a> {
    phase: &'a AtomicU8,
}

impl Drop for PhaseGuard<'_> {
    fn drop(&mut self) {
        self.phase.store(TxPhase::Idle as u8, Ordering::Release);
    }
}

/// The per-farm transaction state machine.
pub struct TransactionOrchestrator {
    descriptor: FarmDescriptor,
    farm: ContractBinding,
    state: Arc<SyncedFarmState>,
    scheduler: Arc<RefreshScheduler>,
    signer: Arc<dyn WalletSigner>,
    notifications: Arc<dyn NotificationSink>,
    timings: NotificationTimings,
    phase: AtomicU8,
}

impl TransactionOrchestrator {
    /// Wire an orchestrator to its farm and collaborators.
    #[must_use]
    pub fn new(
        descriptor: FarmDescriptor,
        farm: ContractBinding,
        state: Arc<SyncedFarmState>,
        scheduler: Arc<RefreshScheduler>,
        signer: Arc<dyn WalletSigner>,
        notifications: Arc<dyn NotificationSink>,
        timings: NotificationTimings,
    ) -> Self {
        Self {
            descriptor,
            farm,
            state,
            scheduler,
            signer,
            notifications,
            timings,
            phase: AtomicU8::new(TxPhase::Idle as u8),
        }
    }

    /// Current machine position.
    #[inline]
    #[must_use]
    pub fn phase(&self) -> TxPhase {
        TxPhase::from(self.phase.load(Ordering::Acquire))
    }

    /// Validate, dispatch, and confirm one action.
    ///
    /// At most one submission is in flight per orchestrator; a concurrent
    /// call resolves to `Skipped(Busy)`. A deposit while the approval gate
    /// is closed is rewritten into the approve transaction.
    pub async fn execute<S: TransactionSubmitter>(
        &self,
        submitter: &S,
        action: FarmAction,
    ) -> TxOutcome {
        let request = match self.validate(&action) {
            Ok(request) => request,
            Err(reason) => return self.skipped(reason),
        };

        if self
            .phase
            .compare_exchange(
                TxPhase::Idle as u8,
                TxPhase::Submitting as u8,
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .is_err()
        {
            return self.skipped(SkipReason::Busy);
        }
        let _reset = PhaseGuard { phase: &self.phase };
        let kind = request.kind;
        info!(
            farm = %self.descriptor.name,
            kind = kind.name(),
            "dispatching transaction"
        );

        let handle = match submitter.dispatch(&request).await {
            Ok(handle) => handle,
            Err(error) => {
                warn!(
                    farm = %self.descriptor.name,
                    kind = kind.name(),
                    %error,
                    "dispatch refused"
                );
                self.state.stats.record_failed();
                self.notify_error(kind, &error.to_string());
                return TxOutcome::Failed;
            }
        };
        self.state.stats.record_dispatch();
        self.phase
            .store(TxPhase::AwaitingConfirmation as u8, Ordering::Release);
        // Pending toasts stay up until replaced by the settlement toast.
        self.notifications.notify(Notification::pending(
            format!("{} submitted: {handle}", kind.name()),
            0,
        ));

        let settlement = submitter.confirm(handle).await;
        self.phase.store(TxPhase::Settled as u8, Ordering::Release);
        match settlement {
            Settlement::Confirmed { handle } => {
                self.state.stats.record_confirmed();
                info!(
                    farm = %self.descriptor.name,
                    kind = kind.name(),
                    %handle,
                    "transaction confirmed"
                );
                if kind == TransactionKind::Claim {
                    // Show zero immediately; the refresh will agree shortly.
                    self.state.zero_reward_availability();
                }
                self.notifications.notify(Notification::success(
                    format!("{} confirmed", kind.name()),
                    self.timings.success_dismiss_ms,
                ));
                self.scheduler.request_refresh();
                TxOutcome::Confirmed(handle)
            }
            Settlement::Reverted { reason, .. } => {
                warn!(
                    farm = %self.descriptor.name,
                    kind = kind.name(),
                    reason = %reason,
                    "transaction reverted"
                );
                self.state.stats.record_failed();
                self.notify_error(kind, &reason);
                TxOutcome::Failed
            }
        }
    }

    /// All pre-dispatch checks. Local state only; no collaborator calls.
    fn validate(&self, action: &FarmAction) -> Result<TransactionRequest, SkipReason> {
        if self.state.is_torn_down() {
            return Err(SkipReason::TornDown);
        }
        if self.signer.account().is_none() {
            return Err(SkipReason::SignerAbsent);
        }
        let snapshot = self.state.snapshot();
        if !snapshot.is_initialized {
            return Err(SkipReason::NotInitialized);
        }

        match action {
            FarmAction::Approve => self.approve_request(),
            FarmAction::Deposit { amount } => {
                if !snapshot.is_approved {
                    // Closed gate: the deposit becomes the approve.
                    return self.approve_request();
                }
                let value = self.parse_amount(amount)?;
                Ok(TransactionRequest::stake(self.farm, value))
            }
            FarmAction::Withdraw => self.withdraw_request(&snapshot, None),
            FarmAction::WithdrawExact { amount } => {
                let value = self.parse_amount(amount)?;
                self.withdraw_request(&snapshot, Some(value))
            }
            FarmAction::Claim => {
                if !self.descriptor.supports(TransactionKind::Claim) {
                    return Err(SkipReason::Unsupported);
                }
                if self.descriptor.claim_gate_enabled && !snapshot.has_claimable_rewards() {
                    return Err(SkipReason::NothingToClaim);
                }
                Ok(TransactionRequest::claim(self.farm))
            }
            FarmAction::Compound => {
                if !self.descriptor.supports(TransactionKind::Compound) {
                    return Err(SkipReason::Unsupported);
                }
                Ok(TransactionRequest::compound(self.farm))
            }
        }
    }

    fn approve_request(&self) -> Result<TransactionRequest, SkipReason> {
        let Some(token) = self.state.token_slot().binding() else {
            return Err(SkipReason::BindingUnresolved);
        };
        Ok(approval::approve_request(&self.descriptor, token))
    }

    fn withdraw_request(
        &self,
        snapshot: &FarmSnapshot,
        requested: Option<U256>,
    ) -> Result<TransactionRequest, SkipReason> {
        let staked = snapshot.staked_balance.unwrap_or_default();
        if staked == U256::ZERO {
            return Err(SkipReason::NothingStaked);
        }
        if let Some(amount) = requested {
            if amount != staked {
                return Err(SkipReason::PartialWithdraw);
            }
        }
        if self.descriptor.unlock_gate_enabled {
            if let Some(unlock) = snapshot.unlock_time {
                if unix_now() < unlock {
                    return Err(SkipReason::Locked);
                }
            }
        }
        Ok(TransactionRequest::withdraw(self.farm))
    }

    fn parse_amount(&self, text: &str) -> Result<U256, SkipReason> {
        let value = parse_units(text, self.descriptor.token_decimals)
            .map_err(|_| SkipReason::InvalidAmount)?;
        if value == U256::ZERO {
            return Err(SkipReason::InvalidAmount);
        }
        Ok(value)
    }

    fn skipped(&self, reason: SkipReason) -> TxOutcome {
        self.state.stats.record_skip();
        debug!(
            farm = %self.descriptor.name,
            reason = reason.describe(),
            "submission skipped"
        );
        TxOutcome::Skipped(reason)
    }

    fn notify_error(&self, kind: TransactionKind, cause: &str) {
        self.notifications.notify(Notification::error(
            format!("{} failed: {cause}", kind.name()),
            self.timings.error_dismiss_ms,
        ));
    }
}
