//! # Contract Definitions
//!
//! Solidity interface declarations for the two contract shapes the engine
//! talks to: plain ERC-20 tokens and autocompounding strategy farms.

// The sol! macro generates code that we can't document, so allow missing_docs
#![allow(missing_docs)]

use alloy_sol_types::{sol, SolCall};

// Define the two remote surfaces using alloy's sol! macro
sol! {
    /// Minimal ERC-20 surface.
    ///
    /// Only the operations the dashboard actually dispatches are declared;
    /// the engine never sends raw calldata for anything outside this set.
    #[derive(Debug)]
    interface IERC20 {
        /// Emitted on every token transfer.
        event Transfer(address indexed from, address indexed to, uint256 value);

        /// Emitted when an allowance is set.
        event Approval(address indexed owner, address indexed spender, uint256 value);

        /// Token display name.
        function name() external view returns (string);

        /// Token ticker symbol.
        function symbol() external view returns (string);

        /// Token decimal count.
        function decimals() external view returns (uint8);

        /// Total minted supply in base units.
        function totalSupply() external view returns (uint256);

        /// Balance of an account in base units.
        function balanceOf(address account) external view returns (uint256);

        /// Remaining spender allowance granted by an owner.
        function allowance(address owner, address spender) external view returns (uint256);

        /// Grants a spender allowance over the caller's balance.
        function approve(address spender, uint256 amount) external returns (bool);
    }

    /// Autocompounding strategy farm surface.
    ///
    /// Covers both deployed generations: the boost-style farms expose
    /// `STOKEN()` / `rewardTokens(i)` / `farmerInfo`, the vault-style farms
    /// expose `depositToken()` / `rewardToken()` and account in shares.
    #[derive(Debug)]
    interface IStrategyFarm {
        /// Staked-token address on boost-style farms.
        function STOKEN() external view returns (address);

        /// Deposit-token address on vault-style farms (and on wrapper
        /// tokens that sit in front of an underlying asset).
        function depositToken() external view returns (address);

        /// Reward token at an index on boost-style farms.
        function rewardTokens(uint256 index) external view returns (address);

        /// Single reward token on vault-style farms.
        function rewardToken() external view returns (address);

        /// Per-account staking record on boost-style farms.
        function farmerInfo(address farmer) external view returns (
            uint256 staked,
            uint256 lastDepositTime,
            uint256 unlockTime
        );

        /// Farm-wide staked total in base units.
        function totalStaked() external view returns (uint256);

        /// Claimable amount of one reward token for one account.
        function getAvailableTokenRewards(address farmer, address token) external view returns (uint256);

        /// Deposit tokens backing a share amount.
        function getDepositTokensForShares(uint256 shares) external view returns (uint256);

        /// Stakes a base-unit amount.
        function stake(uint256 amount) external;

        /// Withdraws the caller's entire stake. All at once, by design of
        /// the deployed contracts.
        function withdraw() external;

        /// Pays out all pending rewards to the caller.
        function claimRewards() external;

        /// Folds pending rewards back into the caller's stake.
        function compound() external;
    }
}

/// Selectors of every read the engine dispatches against an ERC-20 binding.
pub const ERC20_READ_SELECTORS: [[u8; 4]; 6] = [
    IERC20::nameCall::SELECTOR,
    IERC20::symbolCall::SELECTOR,
    IERC20::decimalsCall::SELECTOR,
    IERC20::totalSupplyCall::SELECTOR,
    IERC20::balanceOfCall::SELECTOR,
    IERC20::allowanceCall::SELECTOR,
];

/// Selectors of every write the engine dispatches against an ERC-20 binding.
pub const ERC20_WRITE_SELECTORS: [[u8; 4]; 1] = [IERC20::approveCall::SELECTOR];

/// Selectors of every read the engine dispatches against a farm binding.
pub const FARM_READ_SELECTORS: [[u8; 4]; 8] = [
    IStrategyFarm::STOKENCall::SELECTOR,
    IStrategyFarm::depositTokenCall::SELECTOR,
    IStrategyFarm::rewardTokensCall::SELECTOR,
    IStrategyFarm::rewardTokenCall::SELECTOR,
    IStrategyFarm::farmerInfoCall::SELECTOR,
    IStrategyFarm::totalStakedCall::SELECTOR,
    IStrategyFarm::getAvailableTokenRewardsCall::SELECTOR,
    IStrategyFarm::getDepositTokensForSharesCall::SELECTOR,
];

/// Selectors of every write the engine dispatches against a farm binding.
pub const FARM_WRITE_SELECTORS: [[u8; 4]; 4] = [
    IStrategyFarm::stakeCall::SELECTOR,
    IStrategyFarm::withdrawCall::SELECTOR,
    IStrategyFarm::claimRewardsCall::SELECTOR,
    IStrategyFarm::compoundCall::SELECTOR,
];

#[cfg(test)]
mod tests {
    use super::*;

    fn all_selectors() -> Vec<[u8; 4]> {
        let mut all = Vec::new();
        all.extend_from_slice(&ERC20_READ_SELECTORS);
        all.extend_from_slice(&ERC20_WRITE_SELECTORS);
        all.extend_from_slice(&FARM_READ_SELECTORS);
        all.extend_from_slice(&FARM_WRITE_SELECTORS);
        all
    }

    #[test]
    fn selectors_are_distinct() {
        let all = all_selectors();
        for (i, a) in all.iter().enumerate() {
            for b in all.iter().skip(i + 1) {
                assert_ne!(a, b, "selector collision in contract surface");
            }
        }
    }

    #[test]
    fn canonical_erc20_selectors() {
        // Well-known selectors from the ERC-20 standard.
        assert_eq!(IERC20::balanceOfCall::SELECTOR, [0x70, 0xa0, 0x82, 0x31]);
        assert_eq!(IERC20::allowanceCall::SELECTOR, [0xdd, 0x62, 0xed, 0x3e]);
        assert_eq!(IERC20::approveCall::SELECTOR, [0x09, 0x5e, 0xa7, 0xb3]);
        assert_eq!(IERC20::totalSupplyCall::SELECTOR, [0x18, 0x16, 0x0d, 0xdd]);
    }
}
