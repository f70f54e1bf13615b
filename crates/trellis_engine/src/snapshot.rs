//! # Farm Snapshots
//!
//! One farm's chain state, merged cycle over cycle. The merge rule is the
//! whole point of this module: a refresh cycle produces a [`CycleReads`]
//! delta in which every field is optional, and merging starts from the
//! previous snapshot so a failed read keeps the last good value instead of
//! blanking it. Publication replaces the snapshot in one write, so readers
//! never observe a half-merged cycle.

use alloy_primitives::{Address, U256};
use parking_lot::RwLock;
use std::sync::atomic::{AtomicBool, Ordering};

use trellis_chain::BindingSlot;

use crate::stats::SyncStats;

/// Availability of one reward token.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RewardEntry {
    /// The reward token contract.
    pub token: Address,
    /// Display symbol, resolved once.
    pub symbol: String,
    /// Claimable amount in the reward token's base units.
    pub available: U256,
}

impl RewardEntry {
    /// A fresh entry with nothing claimable yet.
    #[must_use]
    pub const fn new(token: Address, symbol: String) -> Self {
        Self {
            token,
            symbol,
            available: U256::ZERO,
        }
    }
}

/// Staked-token identity, resolved once per mount and immutable afterwards.
///
/// The per-share rate stored here is the seed value from resolution time.
/// Variants that refresh the rate every cycle update the snapshot copy and
/// leave this one alone.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TokenMetadata {
    /// The staked token contract.
    pub address: Address,
    /// Full token name.
    pub name: String,
    /// Display symbol.
    pub symbol: String,
    /// Base-unit decimals.
    pub decimals: u8,
    /// Underlying tokens per whole share at resolution time.
    pub tokens_per_share: U256,
    /// Symbol of the compounded underlying, when the staked token is a
    /// wrapper worth a second discovery hop.
    pub compounded_symbol: Option<String>,
}

/// The merged view of one farm. Every quantity is base-unit `U256`.
///
/// `None` means "never read successfully"; after the first success a field
/// only ever moves to another `Some`.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FarmSnapshot {
    /// Wallet balance of the staked token.
    pub token_balance: Option<U256>,
    /// Amount the wallet has staked in the farm.
    pub staked_balance: Option<U256>,
    /// Farm-wide staked total.
    pub total_staked: Option<U256>,
    /// Underlying tokens per whole share.
    pub tokens_per_share: Option<U256>,
    /// Raw allowance granted to the farm.
    pub allowance: Option<U256>,
    /// Whether the last successful allowance read was strictly positive.
    pub is_approved: bool,
    /// Lock expiry as a unix timestamp, farm-accounting variants only.
    pub unlock_time: Option<u64>,
    /// Last deposit as a unix timestamp, farm-accounting variants only.
    pub last_deposit_time: Option<u64>,
    /// Raw share balance, share-accounting variants only.
    pub share_balance: Option<U256>,
    /// Deposit tokens backing the share balance, share-accounting variants.
    pub underlying_balance: Option<U256>,
    /// Per-reward-token availability.
    pub rewards: Vec<RewardEntry>,
    /// Whether every field this farm's shape requires has been populated
    /// at least once. Monotonic: never reverts to `false`.
    pub is_initialized: bool,
}

/// One refresh cycle's successful reads. `None` means the read failed or
/// was skipped, and the merged snapshot keeps its previous value.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CycleReads {
    /// Wallet balance of the staked token.
    pub token_balance: Option<U256>,
    /// Allowance granted to the farm.
    pub allowance: Option<U256>,
    /// Staked amount, from `farmerInfo` or the share-to-underlying read.
    pub staked_balance: Option<U256>,
    /// Last deposit timestamp, farm-accounting variants.
    pub last_deposit_time: Option<u64>,
    /// Lock expiry timestamp, farm-accounting variants.
    pub unlock_time: Option<u64>,
    /// Raw share balance, share-accounting variants.
    pub share_balance: Option<U256>,
    /// Deposit tokens backing the shares, share-accounting variants.
    pub underlying_balance: Option<U256>,
    /// Farm-wide staked total.
    pub total_staked: Option<U256>,
    /// Refreshed per-share rate, variants that re-read it every cycle.
    pub tokens_per_share: Option<U256>,
    /// Availability per reward entry, index-aligned with the snapshot's
    /// reward list. Missing trailing entries keep their previous value.
    pub reward_available: Vec<Option<U256>>,
}

impl FarmSnapshot {
    /// Merge one cycle's reads over this snapshot.
    ///
    /// Successful reads overwrite their field; everything else is retained.
    /// `is_approved` is recomputed only when the cycle carried an allowance
    /// read. `is_initialized` is copied as-is; the caller decides promotion
    /// once it can see the full merged result.
    #[must_use]
    pub fn merged(&self, reads: CycleReads) -> Self {
        let mut next = self.clone();
        if let Some(balance) = reads.token_balance {
            next.token_balance = Some(balance);
        }
        if let Some(allowance) = reads.allowance {
            next.allowance = Some(allowance);
            next.is_approved = crate::approval::is_open(allowance);
        }
        if let Some(staked) = reads.staked_balance {
            next.staked_balance = Some(staked);
        }
        if let Some(stamp) = reads.last_deposit_time {
            next.last_deposit_time = Some(stamp);
        }
        if let Some(stamp) = reads.unlock_time {
            next.unlock_time = Some(stamp);
        }
        if let Some(shares) = reads.share_balance {
            next.share_balance = Some(shares);
        }
        if let Some(underlying) = reads.underlying_balance {
            next.underlying_balance = Some(underlying);
        }
        if let Some(total) = reads.total_staked {
            next.total_staked = Some(total);
        }
        if let Some(rate) = reads.tokens_per_share {
            next.tokens_per_share = Some(rate);
        }
        for (entry, read) in next.rewards.iter_mut().zip(reads.reward_available) {
            if let Some(available) = read {
                entry.available = available;
            }
        }
        next
    }

    /// Accrued earnings: the growth of the staked position over its
    /// principal, `staked × rate / one_share − staked`, floored at zero.
    ///
    /// `None` until both inputs have been read. Checked arithmetic; a rate
    /// large enough to overflow the product also yields `None`.
    #[must_use]
    pub fn earnings(&self, one_share: U256) -> Option<U256> {
        let staked = self.staked_balance?;
        let rate = self.tokens_per_share?;
        let grown = staked.checked_mul(rate)?.checked_div(one_share)?;
        Some(grown.saturating_sub(staked))
    }

    /// Total claimable across every reward entry.
    #[must_use]
    pub fn total_reward_available(&self) -> U256 {
        self.rewards
            .iter()
            .fold(U256::ZERO, |sum, entry| sum.saturating_add(entry.available))
    }

    /// Whether any reward entry has a strictly positive availability.
    #[must_use]
    pub fn has_claimable_rewards(&self) -> bool {
        self.rewards.iter().any(|entry| entry.available > U256::ZERO)
    }
}

/// Shared, live state of one mounted farm view.
///
/// The refresh task writes here, the view model and its callers read. All
/// interior locks are short-lived and never held across a suspension point.
pub struct SyncedFarmState {
    snapshot: RwLock<FarmSnapshot>,
    metadata: RwLock<Option<TokenMetadata>>,
    token_slot: RwLock<BindingSlot>,
    reward_slot: RwLock<BindingSlot>,
    shares_slot: RwLock<BindingSlot>,
    compounded_slot: RwLock<BindingSlot>,
    torn_down: AtomicBool,
    /// Refresh and transaction counters for this farm.
    pub stats: SyncStats,
}

impl SyncedFarmState {
    /// Fresh state with an empty snapshot and unresolved bindings.
    #[must_use]
    pub fn new() -> Self {
        Self {
            snapshot: RwLock::new(FarmSnapshot::default()),
            metadata: RwLock::new(None),
            token_slot: RwLock::new(BindingSlot::Unresolved),
            reward_slot: RwLock::new(BindingSlot::Unresolved),
            shares_slot: RwLock::new(BindingSlot::Unresolved),
            compounded_slot: RwLock::new(BindingSlot::Unresolved),
            torn_down: AtomicBool::new(false),
            stats: SyncStats::new(),
        }
    }

    /// Clone of the current snapshot.
    #[must_use]
    pub fn snapshot(&self) -> FarmSnapshot {
        self.snapshot.read().clone()
    }

    /// Clone of the resolved metadata, if phase B has completed.
    #[must_use]
    pub fn metadata(&self) -> Option<TokenMetadata> {
        self.metadata.read().clone()
    }

    /// Whether metadata has been resolved. Once true, phase B never runs
    /// again for this mount.
    #[must_use]
    pub fn metadata_resolved(&self) -> bool {
        self.metadata.read().is_some()
    }

    /// Store metadata exactly once; later calls are ignored.
    pub fn set_metadata(&self, metadata: TokenMetadata) {
        let mut slot = self.metadata.write();
        if slot.is_none() {
            *slot = Some(metadata);
        }
    }

    /// Replace the snapshot wholesale. Returns `false` without writing when
    /// the state has been torn down, which is how results from a cycle that
    /// outlived its view are discarded.
    pub fn publish(&self, next: FarmSnapshot) -> bool {
        if self.torn_down.load(Ordering::Acquire) {
            return false;
        }
        *self.snapshot.write() = next;
        true
    }

    /// Optimistically zero every reward entry's availability, ahead of the
    /// post-claim refresh.
    pub fn zero_reward_availability(&self) {
        if self.torn_down.load(Ordering::Acquire) {
            return;
        }
        let mut snapshot = self.snapshot.write();
        for entry in &mut snapshot.rewards {
            entry.available = U256::ZERO;
        }
    }

    /// The staked-token binding slot.
    #[must_use]
    pub fn token_slot(&self) -> BindingSlot {
        *self.token_slot.read()
    }

    /// Replace the staked-token binding slot.
    pub fn set_token_slot(&self, slot: BindingSlot) {
        *self.token_slot.write() = slot;
    }

    /// The reward-token binding slot.
    #[must_use]
    pub fn reward_slot(&self) -> BindingSlot {
        *self.reward_slot.read()
    }

    /// Replace the reward-token binding slot.
    pub fn set_reward_slot(&self, slot: BindingSlot) {
        *self.reward_slot.write() = slot;
    }

    /// The farm-as-ERC-20 binding slot used for share balances.
    #[must_use]
    pub fn shares_slot(&self) -> BindingSlot {
        *self.shares_slot.read()
    }

    /// Replace the share-balance binding slot.
    pub fn set_shares_slot(&self, slot: BindingSlot) {
        *self.shares_slot.write() = slot;
    }

    /// The second-hop binding slot for the compounded underlying token.
    #[must_use]
    pub fn compounded_slot(&self) -> BindingSlot {
        *self.compounded_slot.read()
    }

    /// Replace the compounded-underlying binding slot.
    pub fn set_compounded_slot(&self, slot: BindingSlot) {
        *self.compounded_slot.write() = slot;
    }

    /// Mark the state torn down. Idempotent; all later publishes are
    /// silently discarded.
    pub fn mark_torn_down(&self) {
        self.torn_down.store(true, Ordering::Release);
    }

    /// Whether teardown has happened.
    #[must_use]
    pub fn is_torn_down(&self) -> bool {
        self.torn_down.load(Ordering::Acquire)
    }
}

impl Default for SyncedFarmState {
    fn default() -> Self {
        Self::new()
    }
}
