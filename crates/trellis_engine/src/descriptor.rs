//! # Farm Descriptors
//!
//! The deployed farms come in two shapes that differ only in how they are
//! read: boost-style farms account per farmer with lock timestamps,
//! vault-style farms account in shares. One descriptor type covers both;
//! every variant-specific decision in the engine is driven from here rather
//! than from a second copy of the view code.

use alloy_primitives::{Address, U256};
use serde::{Deserialize, Serialize};
use trellis_chain::{scale_factor, CallSpec, TransactionKind};

use crate::snapshot::FarmSnapshot;
use crate::REFRESH_PERIOD_SECS;

/// How the farm tracks a user's position.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StakeAccounting {
    /// `farmerInfo(account)` with staked amount and lock timestamps.
    FarmerInfo,
    /// Share balance plus `getDepositTokensForShares` for the backing value.
    Shares,
}

/// Which farm read discovers the staked-token address.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenDiscovery {
    /// `STOKEN()` on boost-style farms.
    StakedToken,
    /// `depositToken()` on vault-style farms.
    DepositToken,
}

/// Which farm read discovers the reward-token address.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RewardDiscovery {
    /// `rewardTokens(index)` on boost-style farms.
    Indexed(usize),
    /// `rewardToken()` on vault-style farms.
    Direct,
}

/// Whether the per-share rate moves after metadata resolution.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PerShareRefresh {
    /// Resolved once with the token metadata and trusted afterwards.
    Once,
    /// Re-read on every refresh cycle (autocompounding drift).
    EveryCycle,
}

/// Which entry of the aggregate feed prices this farm.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatsKey {
    /// The protocol's headline booster APY.
    Headline,
    /// The per-strategy entry keyed by this farm's address.
    Strategy,
}

/// Everything the engine needs to know about one farm.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FarmDescriptor {
    /// Display name, used in notifications and diagnostics.
    pub name: String,
    /// The farm contract.
    pub farm_address: Address,
    /// Decimals of the staked token.
    pub token_decimals: u8,
    /// Decimals of the reward token.
    pub reward_decimals: u8,
    /// Decimals of one whole share for per-share rates.
    pub share_unit_decimals: u8,
    /// Position accounting shape.
    pub accounting: StakeAccounting,
    /// Staked-token discovery read.
    pub token_discovery: TokenDiscovery,
    /// Reward-token discovery read.
    pub reward_discovery: RewardDiscovery,
    /// Per-share refresh policy.
    pub per_share_refresh: PerShareRefresh,
    /// Whether the farm exposes `claimRewards()`.
    pub supports_claim: bool,
    /// Whether the farm exposes `compound()`.
    pub supports_compound: bool,
    /// Whether the staked token is a wrapper whose underlying symbol is
    /// worth resolving through a `depositToken()` second hop.
    pub compounded_symbol_hop: bool,
    /// Aggregate-feed lookup for APY / TVL display.
    pub stats_key: StatsKey,
    /// When on, claim is refused while no rewards are available.
    pub claim_gate_enabled: bool,
    /// When on, withdraw is refused before the unlock timestamp.
    pub unlock_gate_enabled: bool,
    /// Refresh cadence in seconds.
    pub poll_period_secs: u64,
}

impl FarmDescriptor {
    /// The boost-style shape: farmer accounting, indexed rewards, 9-decimal
    /// staked token, wrapper-symbol hop, headline APY.
    #[must_use]
    pub fn autocompounder_boost(name: impl Into<String>, farm_address: Address) -> Self {
        Self {
            name: name.into(),
            farm_address,
            token_decimals: 9,
            reward_decimals: 18,
            share_unit_decimals: 9,
            accounting: StakeAccounting::FarmerInfo,
            token_discovery: TokenDiscovery::StakedToken,
            reward_discovery: RewardDiscovery::Indexed(0),
            per_share_refresh: PerShareRefresh::Once,
            supports_claim: true,
            supports_compound: false,
            compounded_symbol_hop: true,
            stats_key: StatsKey::Headline,
            claim_gate_enabled: false,
            unlock_gate_enabled: false,
            poll_period_secs: REFRESH_PERIOD_SECS,
        }
    }

    /// The vault-style shape: share accounting, direct reward discovery,
    /// 18-decimal tokens, per-strategy stats.
    #[must_use]
    pub fn strategy_vault(name: impl Into<String>, farm_address: Address) -> Self {
        Self {
            name: name.into(),
            farm_address,
            token_decimals: 18,
            reward_decimals: 18,
            share_unit_decimals: 18,
            accounting: StakeAccounting::Shares,
            token_discovery: TokenDiscovery::DepositToken,
            reward_discovery: RewardDiscovery::Direct,
            per_share_refresh: PerShareRefresh::EveryCycle,
            supports_claim: false,
            supports_compound: true,
            compounded_symbol_hop: false,
            stats_key: StatsKey::Strategy,
            claim_gate_enabled: false,
            unlock_gate_enabled: false,
            poll_period_secs: REFRESH_PERIOD_SECS,
        }
    }

    /// One whole share in base units. Decimal counts are validated at
    /// config load; the fallback is never hit from a loaded config.
    #[must_use]
    pub fn one_share(&self) -> U256 {
        scale_factor(self.share_unit_decimals).unwrap_or(U256::from(1u8))
    }

    /// Whether the farm exposes a transaction kind at all.
    #[must_use]
    pub fn supports(&self, kind: TransactionKind) -> bool {
        match kind {
            TransactionKind::Approve | TransactionKind::Stake | TransactionKind::Withdraw => true,
            TransactionKind::Claim => self.supports_claim,
            TransactionKind::Compound => self.supports_compound,
        }
    }

    /// The read that discovers the staked-token address.
    #[must_use]
    pub const fn token_discovery_call(&self) -> CallSpec {
        match self.token_discovery {
            TokenDiscovery::StakedToken => CallSpec::StakedToken,
            TokenDiscovery::DepositToken => CallSpec::DepositToken,
        }
    }

    /// The read that discovers the reward-token address.
    #[must_use]
    pub const fn reward_discovery_call(&self) -> CallSpec {
        match self.reward_discovery {
            RewardDiscovery::Indexed(index) => CallSpec::RewardTokenAt(index),
            RewardDiscovery::Direct => CallSpec::RewardToken,
        }
    }

    /// Whether every field this shape requires is populated.
    ///
    /// This is the initialization predicate: once it holds after a merge,
    /// the snapshot is marked initialized and stays that way.
    #[must_use]
    pub fn required_ready(&self, snapshot: &FarmSnapshot) -> bool {
        let base = snapshot.token_balance.is_some()
            && snapshot.allowance.is_some()
            && snapshot.total_staked.is_some()
            && snapshot.tokens_per_share.is_some()
            && snapshot.staked_balance.is_some();
        match self.accounting {
            StakeAccounting::FarmerInfo => {
                base && snapshot.unlock_time.is_some() && snapshot.last_deposit_time.is_some()
            }
            StakeAccounting::Shares => base && snapshot.share_balance.is_some(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn boost() -> FarmDescriptor {
        FarmDescriptor::autocompounder_boost("mUMAMI Boost", Address::repeat_byte(0x01))
    }

    fn vault() -> FarmDescriptor {
        FarmDescriptor::strategy_vault("ETH Strategy", Address::repeat_byte(0x02))
    }

    #[test]
    fn shapes_pick_their_discovery_reads() {
        assert_eq!(boost().token_discovery_call(), CallSpec::StakedToken);
        assert_eq!(boost().reward_discovery_call(), CallSpec::RewardTokenAt(0));
        assert_eq!(vault().token_discovery_call(), CallSpec::DepositToken);
        assert_eq!(vault().reward_discovery_call(), CallSpec::RewardToken);
    }

    #[test]
    fn operation_support_follows_the_shape() {
        assert!(boost().supports(TransactionKind::Claim));
        assert!(!boost().supports(TransactionKind::Compound));
        assert!(vault().supports(TransactionKind::Compound));
        assert!(!vault().supports(TransactionKind::Claim));
        for descriptor in [boost(), vault()] {
            assert!(descriptor.supports(TransactionKind::Approve));
            assert!(descriptor.supports(TransactionKind::Stake));
            assert!(descriptor.supports(TransactionKind::Withdraw));
        }
    }

    #[test]
    fn gates_default_off() {
        for descriptor in [boost(), vault()] {
            assert!(!descriptor.claim_gate_enabled);
            assert!(!descriptor.unlock_gate_enabled);
        }
    }

    #[test]
    fn one_share_scales_by_unit_decimals() {
        assert_eq!(boost().one_share(), U256::from(1_000_000_000u64));
        assert_eq!(
            vault().one_share(),
            U256::from(1_000_000_000_000_000_000u64)
        );
    }

    #[test]
    fn required_fields_differ_by_accounting() {
        let mut snapshot = FarmSnapshot {
            token_balance: Some(U256::ZERO),
            allowance: Some(U256::ZERO),
            total_staked: Some(U256::ZERO),
            tokens_per_share: Some(U256::from(1u8)),
            staked_balance: Some(U256::ZERO),
            ..FarmSnapshot::default()
        };

        // Boost shape still waits on the lock timestamps.
        assert!(!boost().required_ready(&snapshot));
        snapshot.unlock_time = Some(0);
        snapshot.last_deposit_time = Some(0);
        assert!(boost().required_ready(&snapshot));

        // Vault shape waits on the share balance instead.
        assert!(!vault().required_ready(&snapshot));
        snapshot.share_balance = Some(U256::ZERO);
        assert!(vault().required_ready(&snapshot));
    }
}
