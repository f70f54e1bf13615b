//! # Dashboard Configuration
//!
//! TOML-backed description of which farms to mount and how fast to poll
//! them. `FarmConfig` is the raw, string-addressed form; it is validated
//! into a [`FarmDescriptor`] at load time so address typos surface as one
//! configuration error instead of a farm that silently never resolves.

use serde::{Deserialize, Serialize};
use std::str::FromStr;

use alloy_primitives::Address;
use trellis_chain::MAX_DECIMALS;

use crate::descriptor::{
    FarmDescriptor, PerShareRefresh, RewardDiscovery, StakeAccounting, StatsKey, TokenDiscovery,
};
use crate::error::{EngineError, EngineResult};
use crate::{ERROR_DISMISS_MS, REFRESH_PERIOD_SECS, SUCCESS_DISMISS_MS};

/// Auto-dismiss windows for transaction notifications, in milliseconds.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NotificationTimings {
    /// How long a success toast stays up.
    pub success_dismiss_ms: u32,
    /// How long an error toast stays up.
    pub error_dismiss_ms: u32,
}

impl Default for NotificationTimings {
    fn default() -> Self {
        Self {
            success_dismiss_ms: SUCCESS_DISMISS_MS,
            error_dismiss_ms: ERROR_DISMISS_MS,
        }
    }
}

/// One farm's entry in the config file.
///
/// Addresses are strings here and become [`Address`] during validation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FarmConfig {
    /// Display name.
    pub name: String,
    /// Farm contract address, hex string.
    pub farm_address: String,
    /// Staked-token decimals.
    pub token_decimals: u8,
    /// Reward-token decimals.
    pub reward_decimals: u8,
    /// Whole-share decimals for per-share rates.
    pub share_unit_decimals: u8,
    /// Position accounting shape.
    pub accounting: StakeAccounting,
    /// Staked-token discovery read.
    pub token_discovery: TokenDiscovery,
    /// Index into the farm's reward list; absent means the farm exposes a
    /// single direct reward token.
    #[serde(default)]
    pub reward_index: Option<usize>,
    /// Per-share refresh policy.
    pub per_share_refresh: PerShareRefresh,
    /// Whether the farm exposes `claimRewards()`.
    #[serde(default)]
    pub supports_claim: bool,
    /// Whether the farm exposes `compound()`.
    #[serde(default)]
    pub supports_compound: bool,
    /// Resolve the compounded underlying's symbol through a second hop.
    #[serde(default)]
    pub compounded_symbol_hop: bool,
    /// Aggregate-feed lookup for APY / TVL display.
    pub stats_key: StatsKey,
    /// Refuse claim while no rewards are available.
    #[serde(default)]
    pub claim_gate_enabled: bool,
    /// Refuse withdraw before the unlock timestamp.
    #[serde(default)]
    pub unlock_gate_enabled: bool,
    /// Per-farm poll period override, seconds.
    #[serde(default)]
    pub poll_period_secs: Option<u64>,
}

impl FarmConfig {
    /// Raw config for a boost-style farm at the given address.
    #[must_use]
    pub fn autocompounder_boost(name: impl Into<String>, farm_address: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            farm_address: farm_address.into(),
            token_decimals: 9,
            reward_decimals: 18,
            share_unit_decimals: 9,
            accounting: StakeAccounting::FarmerInfo,
            token_discovery: TokenDiscovery::StakedToken,
            reward_index: Some(0),
            per_share_refresh: PerShareRefresh::Once,
            supports_claim: true,
            supports_compound: false,
            compounded_symbol_hop: true,
            stats_key: StatsKey::Headline,
            claim_gate_enabled: false,
            unlock_gate_enabled: false,
            poll_period_secs: None,
        }
    }

    /// Raw config for a vault-style farm at the given address.
    #[must_use]
    pub fn strategy_vault(name: impl Into<String>, farm_address: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            farm_address: farm_address.into(),
            token_decimals: 18,
            reward_decimals: 18,
            share_unit_decimals: 18,
            accounting: StakeAccounting::Shares,
            token_discovery: TokenDiscovery::DepositToken,
            reward_index: None,
            per_share_refresh: PerShareRefresh::EveryCycle,
            supports_claim: false,
            supports_compound: true,
            compounded_symbol_hop: false,
            stats_key: StatsKey::Strategy,
            claim_gate_enabled: false,
            unlock_gate_enabled: false,
            poll_period_secs: None,
        }
    }

    /// Validate this entry into a descriptor.
    ///
    /// `default_poll_secs` applies when the entry carries no override.
    pub fn descriptor(&self, default_poll_secs: u64) -> EngineResult<FarmDescriptor> {
        let farm_address = Address::from_str(self.farm_address.trim()).map_err(|_| {
            EngineError::InvalidAddress {
                farm: self.name.clone(),
                value: self.farm_address.clone(),
            }
        })?;
        for decimals in [
            self.token_decimals,
            self.reward_decimals,
            self.share_unit_decimals,
        ] {
            if decimals > MAX_DECIMALS {
                return Err(EngineError::UnsupportedDecimals {
                    farm: self.name.clone(),
                    decimals,
                });
            }
        }
        let reward_discovery = match self.reward_index {
            Some(index) => RewardDiscovery::Indexed(index),
            None => RewardDiscovery::Direct,
        };
        Ok(FarmDescriptor {
            name: self.name.clone(),
            farm_address,
            token_decimals: self.token_decimals,
            reward_decimals: self.reward_decimals,
            share_unit_decimals: self.share_unit_decimals,
            accounting: self.accounting,
            token_discovery: self.token_discovery,
            reward_discovery,
            per_share_refresh: self.per_share_refresh,
            supports_claim: self.supports_claim,
            supports_compound: self.supports_compound,
            compounded_symbol_hop: self.compounded_symbol_hop,
            stats_key: self.stats_key,
            claim_gate_enabled: self.claim_gate_enabled,
            unlock_gate_enabled: self.unlock_gate_enabled,
            poll_period_secs: self.poll_period_secs.unwrap_or(default_poll_secs),
        })
    }
}

/// The whole dashboard's configuration.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DashboardConfig {
    /// Default refresh cadence in seconds.
    pub poll_period_secs: u64,
    /// Notification auto-dismiss windows.
    pub notification: NotificationTimings,
    /// Farms to mount.
    pub farms: Vec<FarmConfig>,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            poll_period_secs: REFRESH_PERIOD_SECS,
            notification: NotificationTimings::default(),
            farms: Vec::new(),
        }
    }
}

impl DashboardConfig {
    /// Parse a TOML document.
    pub fn from_toml(text: &str) -> EngineResult<Self> {
        Ok(toml::from_str(text)?)
    }

    /// Render back to TOML.
    pub fn to_toml(&self) -> EngineResult<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Validate every farm entry into a descriptor.
    ///
    /// An empty farm list is refused outright; a dashboard with nothing to
    /// mount is a configuration mistake, not a quiet success.
    pub fn descriptors(&self) -> EngineResult<Vec<FarmDescriptor>> {
        if self.farms.is_empty() {
            return Err(EngineError::NoFarms);
        }
        self.farms
            .iter()
            .map(|farm| farm.descriptor(self.poll_period_secs))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BOOST_ADDR: &str = "0x0101010101010101010101010101010101010101";
    const VAULT_ADDR: &str = "0x0202020202020202020202020202020202020202";

    #[test]
    fn defaults_round_trip_through_toml() {
        let config = DashboardConfig::default();
        let text = config.to_toml().unwrap();
        let parsed = DashboardConfig::from_toml(&text).unwrap();
        assert_eq!(parsed, config);
        assert_eq!(parsed.poll_period_secs, 30);
        assert_eq!(parsed.notification.success_dismiss_ms, 10_000);
        assert_eq!(parsed.notification.error_dismiss_ms, 2_000);
    }

    #[test]
    fn farm_entries_round_trip_and_validate() {
        let config = DashboardConfig {
            farms: vec![
                FarmConfig::autocompounder_boost("mUMAMI Boost", BOOST_ADDR),
                FarmConfig::strategy_vault("ETH Strategy", VAULT_ADDR),
            ],
            ..DashboardConfig::default()
        };
        let text = config.to_toml().unwrap();
        let parsed = DashboardConfig::from_toml(&text).unwrap();
        assert_eq!(parsed, config);

        let descriptors = parsed.descriptors().unwrap();
        assert_eq!(descriptors.len(), 2);
        assert_eq!(descriptors[0].accounting, StakeAccounting::FarmerInfo);
        assert_eq!(descriptors[0].reward_discovery, RewardDiscovery::Indexed(0));
        assert_eq!(descriptors[1].accounting, StakeAccounting::Shares);
        assert_eq!(descriptors[1].reward_discovery, RewardDiscovery::Direct);
        assert_eq!(descriptors[1].poll_period_secs, 30);
    }

    #[test]
    fn gate_toggles_default_off_when_absent_from_the_file() {
        let text = format!(
            r#"
            [[farms]]
            name = "mUMAMI Boost"
            farm_address = "{BOOST_ADDR}"
            token_decimals = 9
            reward_decimals = 18
            share_unit_decimals = 9
            accounting = "farmer_info"
            token_discovery = "staked_token"
            reward_index = 0
            per_share_refresh = "once"
            supports_claim = true
            stats_key = "headline"
            "#
        );
        let config = DashboardConfig::from_toml(&text).unwrap();
        let descriptor = &config.descriptors().unwrap()[0];
        assert!(!descriptor.claim_gate_enabled);
        assert!(!descriptor.unlock_gate_enabled);
        assert!(!descriptor.supports_compound);
        assert!(descriptor.supports_claim);
    }

    #[test]
    fn per_farm_poll_override_wins_over_the_default() {
        let mut farm = FarmConfig::strategy_vault("ETH Strategy", VAULT_ADDR);
        farm.poll_period_secs = Some(5);
        let config = DashboardConfig {
            farms: vec![farm],
            ..DashboardConfig::default()
        };
        let descriptors = config.descriptors().unwrap();
        assert_eq!(descriptors[0].poll_period_secs, 5);
    }

    #[test]
    fn bad_addresses_and_decimals_are_refused_at_load() {
        let mut farm = FarmConfig::autocompounder_boost("Broken", "not-an-address");
        let config = DashboardConfig {
            farms: vec![farm.clone()],
            ..DashboardConfig::default()
        };
        assert!(matches!(
            config.descriptors(),
            Err(EngineError::InvalidAddress { .. })
        ));

        farm.farm_address = BOOST_ADDR.to_owned();
        farm.token_decimals = 120;
        let config = DashboardConfig {
            farms: vec![farm],
            ..DashboardConfig::default()
        };
        assert!(matches!(
            config.descriptors(),
            Err(EngineError::UnsupportedDecimals { decimals: 120, .. })
        ));
    }

    #[test]
    fn an_empty_farm_list_is_a_configuration_error() {
        assert!(matches!(
            DashboardConfig::default().descriptors(),
            Err(EngineError::NoFarms)
        ));
    }
}
