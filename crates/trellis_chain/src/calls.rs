//! # Typed Calls
//!
//! The engine never builds raw calldata. Reads are described by [`CallSpec`],
//! results come back as [`CallValue`], and writes travel as
//! [`TransactionRequest`]. Translation to and from the wire format is the
//! gateway's problem, on the far side of the collaborator traits.

use alloy_primitives::{Address, B256, U256};
use alloy_sol_types::SolCall;

use crate::binding::{ContractBinding, InterfaceKind};
use crate::contracts::{IStrategyFarm, IERC20};
use crate::error::{CallError, CallResult};

/// One read operation against a contract binding.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CallSpec {
    /// ERC-20 `name()`.
    Name,
    /// ERC-20 `symbol()`.
    Symbol,
    /// ERC-20 `decimals()`.
    Decimals,
    /// ERC-20 `totalSupply()`.
    TotalSupply,
    /// ERC-20 `balanceOf(account)`.
    BalanceOf(Address),
    /// ERC-20 `allowance(owner, spender)`.
    Allowance {
        /// The granting account.
        owner: Address,
        /// The spending contract.
        spender: Address,
    },
    /// Farm `STOKEN()` - staked-token discovery on boost-style farms.
    StakedToken,
    /// Farm `depositToken()` - deposit-token discovery on vault-style farms
    /// and wrapper tokens.
    DepositToken,
    /// Farm `rewardTokens(index)` - indexed reward discovery.
    RewardTokenAt(usize),
    /// Farm `rewardToken()` - single reward discovery.
    RewardToken,
    /// Farm `farmerInfo(account)` - staking record with lock timestamps.
    FarmerInfo(Address),
    /// Farm `totalStaked()`.
    TotalStaked,
    /// Farm `getAvailableTokenRewards(account, token)`.
    AvailableRewards {
        /// The staking account.
        farmer: Address,
        /// The reward token being queried.
        token: Address,
    },
    /// Farm `getDepositTokensForShares(shares)`.
    UnderlyingForShares(U256),
}

impl CallSpec {
    /// The Solidity function name, for diagnostics.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Name => "name",
            Self::Symbol => "symbol",
            Self::Decimals => "decimals",
            Self::TotalSupply => "totalSupply",
            Self::BalanceOf(_) => "balanceOf",
            Self::Allowance { .. } => "allowance",
            Self::StakedToken => "STOKEN",
            Self::DepositToken => "depositToken",
            Self::RewardTokenAt(_) => "rewardTokens",
            Self::RewardToken => "rewardToken",
            Self::FarmerInfo(_) => "farmerInfo",
            Self::TotalStaked => "totalStaked",
            Self::AvailableRewards { .. } => "getAvailableTokenRewards",
            Self::UnderlyingForShares(_) => "getDepositTokensForShares",
        }
    }

    /// The 4-byte selector of the underlying function.
    #[must_use]
    pub const fn selector(&self) -> [u8; 4] {
        match self {
            Self::Name => IERC20::nameCall::SELECTOR,
            Self::Symbol => IERC20::symbolCall::SELECTOR,
            Self::Decimals => IERC20::decimalsCall::SELECTOR,
            Self::TotalSupply => IERC20::totalSupplyCall::SELECTOR,
            Self::BalanceOf(_) => IERC20::balanceOfCall::SELECTOR,
            Self::Allowance { .. } => IERC20::allowanceCall::SELECTOR,
            Self::StakedToken => IStrategyFarm::STOKENCall::SELECTOR,
            Self::DepositToken => IStrategyFarm::depositTokenCall::SELECTOR,
            Self::RewardTokenAt(_) => IStrategyFarm::rewardTokensCall::SELECTOR,
            Self::RewardToken => IStrategyFarm::rewardTokenCall::SELECTOR,
            Self::FarmerInfo(_) => IStrategyFarm::farmerInfoCall::SELECTOR,
            Self::TotalStaked => IStrategyFarm::totalStakedCall::SELECTOR,
            Self::AvailableRewards { .. } => IStrategyFarm::getAvailableTokenRewardsCall::SELECTOR,
            Self::UnderlyingForShares(_) => IStrategyFarm::getDepositTokensForSharesCall::SELECTOR,
        }
    }

    /// The interface this read belongs to.
    #[must_use]
    pub const fn interface(&self) -> InterfaceKind {
        match self {
            Self::Name
            | Self::Symbol
            | Self::Decimals
            | Self::TotalSupply
            | Self::BalanceOf(_)
            | Self::Allowance { .. } => InterfaceKind::Erc20,
            Self::StakedToken
            | Self::DepositToken
            | Self::RewardTokenAt(_)
            | Self::RewardToken
            | Self::FarmerInfo(_)
            | Self::TotalStaked
            | Self::AvailableRewards { .. }
            | Self::UnderlyingForShares(_) => InterfaceKind::StrategyFarm,
        }
    }
}

/// Per-account staking record returned by `farmerInfo`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PositionInfo {
    /// Staked amount in base units.
    pub staked: U256,
    /// Epoch seconds of the most recent deposit. Zero when nothing was
    /// ever staked.
    pub last_deposit_time: u64,
    /// Epoch seconds at which the stake unlocks. Zero when no lock applies.
    pub unlock_time: u64,
}

/// Decoded result of one read.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CallValue {
    /// A string result (`name`, `symbol`).
    Text(String),
    /// A 256-bit unsigned result (balances, totals, rates).
    Uint(U256),
    /// A single-byte result (`decimals`).
    Byte(u8),
    /// An address result (token discovery).
    Addr(Address),
    /// A staking record (`farmerInfo`).
    Position(PositionInfo),
}

impl CallValue {
    const fn shape(&self) -> &'static str {
        match self {
            Self::Text(_) => "text",
            Self::Uint(_) => "uint",
            Self::Byte(_) => "byte",
            Self::Addr(_) => "address",
            Self::Position(_) => "position",
        }
    }

    /// Extracts a string result.
    ///
    /// # Errors
    /// Returns [`CallError::Shape`] when the value holds something else.
    pub fn into_text(self) -> CallResult<String> {
        match self {
            Self::Text(text) => Ok(text),
            other => Err(CallError::Shape {
                expected: "text",
                got: other.shape(),
            }),
        }
    }

    /// Extracts a 256-bit unsigned result.
    ///
    /// # Errors
    /// Returns [`CallError::Shape`] when the value holds something else.
    pub fn into_uint(self) -> CallResult<U256> {
        match self {
            Self::Uint(value) => Ok(value),
            other => Err(CallError::Shape {
                expected: "uint",
                got: other.shape(),
            }),
        }
    }

    /// Extracts a single-byte result.
    ///
    /// # Errors
    /// Returns [`CallError::Shape`] when the value holds something else.
    pub fn into_byte(self) -> CallResult<u8> {
        match self {
            Self::Byte(value) => Ok(value),
            other => Err(CallError::Shape {
                expected: "byte",
                got: other.shape(),
            }),
        }
    }

    /// Extracts an address result.
    ///
    /// # Errors
    /// Returns [`CallError::Shape`] when the value holds something else.
    pub fn into_addr(self) -> CallResult<Address> {
        match self {
            Self::Addr(address) => Ok(address),
            other => Err(CallError::Shape {
                expected: "address",
                got: other.shape(),
            }),
        }
    }

    /// Extracts a staking record.
    ///
    /// # Errors
    /// Returns [`CallError::Shape`] when the value holds something else.
    pub fn into_position(self) -> CallResult<PositionInfo> {
        match self {
            Self::Position(info) => Ok(info),
            other => Err(CallError::Shape {
                expected: "position",
                got: other.shape(),
            }),
        }
    }
}

/// The user-initiated write operations.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TransactionKind {
    /// ERC-20 `approve` - always for the maximum representable amount.
    Approve,
    /// Farm `stake(amount)`.
    Stake,
    /// Farm `withdraw()` - the entire stake, all at once.
    Withdraw,
    /// Farm `claimRewards()`.
    Claim,
    /// Farm `compound()`.
    Compound,
}

impl TransactionKind {
    /// Lowercase name for notifications and logs.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Approve => "approve",
            Self::Stake => "stake",
            Self::Withdraw => "withdraw",
            Self::Claim => "claim",
            Self::Compound => "compound",
        }
    }

    /// The 4-byte selector of the underlying function.
    #[must_use]
    pub const fn selector(self) -> [u8; 4] {
        match self {
            Self::Approve => IERC20::approveCall::SELECTOR,
            Self::Stake => IStrategyFarm::stakeCall::SELECTOR,
            Self::Withdraw => IStrategyFarm::withdrawCall::SELECTOR,
            Self::Claim => IStrategyFarm::claimRewardsCall::SELECTOR,
            Self::Compound => IStrategyFarm::compoundCall::SELECTOR,
        }
    }
}

/// One write operation, fully specified before dispatch.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TransactionRequest {
    /// What to do.
    pub kind: TransactionKind,
    /// The contract the write is sent to.
    pub target: ContractBinding,
    /// The spender granted by an approve; `None` for every other kind.
    pub spender: Option<Address>,
    /// The base-unit amount; `None` for the amountless kinds.
    pub payload: Option<U256>,
}

impl TransactionRequest {
    /// An approve of the maximum representable amount.
    #[must_use]
    pub const fn approve(token: ContractBinding, spender: Address) -> Self {
        Self {
            kind: TransactionKind::Approve,
            target: token,
            spender: Some(spender),
            payload: Some(U256::MAX),
        }
    }

    /// A stake of an exact base-unit amount.
    #[must_use]
    pub const fn stake(farm: ContractBinding, amount: U256) -> Self {
        Self {
            kind: TransactionKind::Stake,
            target: farm,
            spender: None,
            payload: Some(amount),
        }
    }

    /// A full withdrawal. The deployed farms take no amount.
    #[must_use]
    pub const fn withdraw(farm: ContractBinding) -> Self {
        Self {
            kind: TransactionKind::Withdraw,
            target: farm,
            spender: None,
            payload: None,
        }
    }

    /// A claim of all pending rewards.
    #[must_use]
    pub const fn claim(farm: ContractBinding) -> Self {
        Self {
            kind: TransactionKind::Claim,
            target: farm,
            spender: None,
            payload: None,
        }
    }

    /// A compound of all pending rewards into the stake.
    #[must_use]
    pub const fn compound(farm: ContractBinding) -> Self {
        Self {
            kind: TransactionKind::Compound,
            target: farm,
            spender: None,
            payload: None,
        }
    }

    /// Whether the target's interface exposes this write at all.
    #[must_use]
    pub fn is_supported(&self) -> bool {
        self.target.supports_write(self.kind.selector())
    }
}

/// Opaque handle to a dispatched transaction.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct TxHandle(pub B256);

impl core::fmt::Display for TxHandle {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Terminal state of a dispatched transaction.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Settlement {
    /// Mined and successful.
    Confirmed {
        /// The dispatched transaction.
        handle: TxHandle,
    },
    /// Mined but reverted, or dropped by the pool.
    Reverted {
        /// The dispatched transaction.
        handle: TxHandle,
        /// Human-readable failure description.
        reason: String,
    },
}

impl Settlement {
    /// Whether the transaction succeeded.
    #[must_use]
    pub const fn is_confirmed(&self) -> bool {
        matches!(self, Self::Confirmed { .. })
    }

    /// The handle this settlement refers to.
    #[must_use]
    pub const fn handle(&self) -> TxHandle {
        match self {
            Self::Confirmed { handle } | Self::Reverted { handle, .. } => *handle,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_read_selector_lives_in_its_interface() {
        let user = Address::repeat_byte(0xaa);
        let token = Address::repeat_byte(0xbb);
        let specs = [
            CallSpec::Name,
            CallSpec::Symbol,
            CallSpec::Decimals,
            CallSpec::TotalSupply,
            CallSpec::BalanceOf(user),
            CallSpec::Allowance {
                owner: user,
                spender: token,
            },
            CallSpec::StakedToken,
            CallSpec::DepositToken,
            CallSpec::RewardTokenAt(0),
            CallSpec::RewardToken,
            CallSpec::FarmerInfo(user),
            CallSpec::TotalStaked,
            CallSpec::AvailableRewards {
                farmer: user,
                token,
            },
            CallSpec::UnderlyingForShares(U256::from(1)),
        ];
        for spec in specs {
            assert!(
                spec.interface().read_selectors().contains(&spec.selector()),
                "{} missing from its interface table",
                spec.name()
            );
        }
    }

    #[test]
    fn value_shape_mismatch_is_an_error() {
        let err = CallValue::Text("UMAMI".into()).into_uint().unwrap_err();
        assert_eq!(
            err,
            CallError::Shape {
                expected: "uint",
                got: "text"
            }
        );
        assert!(CallValue::Uint(U256::ZERO).into_uint().is_ok());
        assert!(CallValue::Addr(Address::ZERO).into_addr().is_ok());
        assert!(CallValue::Position(PositionInfo::default())
            .into_position()
            .is_ok());
    }

    #[test]
    fn approve_request_carries_max_and_spender() {
        let token = ContractBinding::new(Address::repeat_byte(0x01), InterfaceKind::Erc20);
        let farm = Address::repeat_byte(0x02);
        let request = TransactionRequest::approve(token, farm);
        assert_eq!(request.payload, Some(U256::MAX));
        assert_eq!(request.spender, Some(farm));
        assert!(request.is_supported());
    }

    #[test]
    fn withdraw_request_is_amountless() {
        let farm = ContractBinding::new(Address::repeat_byte(0x02), InterfaceKind::StrategyFarm);
        let request = TransactionRequest::withdraw(farm);
        assert_eq!(request.payload, None);
        assert!(request.is_supported());
    }

    #[test]
    fn farm_write_against_token_binding_is_unsupported() {
        let token = ContractBinding::new(Address::repeat_byte(0x01), InterfaceKind::Erc20);
        let request = TransactionRequest::stake(token, U256::from(5));
        assert!(!request.is_supported());
    }
}
