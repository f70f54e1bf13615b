//! # Contract Bindings
//!
//! A binding is a resolved, callable handle to one on-chain contract: an
//! address plus the interface it is known to expose. Bindings are cheap to
//! copy and never change after resolution.

use alloy_primitives::Address;

use crate::contracts::{
    ERC20_READ_SELECTORS, ERC20_WRITE_SELECTORS, FARM_READ_SELECTORS, FARM_WRITE_SELECTORS,
};

/// The remote surface a binding exposes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum InterfaceKind {
    /// Plain ERC-20 token.
    Erc20,
    /// Autocompounding strategy farm.
    StrategyFarm,
}

impl InterfaceKind {
    /// Stable name for diagnostics and errors.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Erc20 => "erc20",
            Self::StrategyFarm => "strategy_farm",
        }
    }

    /// Selectors of the reads this interface supports.
    #[must_use]
    pub const fn read_selectors(self) -> &'static [[u8; 4]] {
        match self {
            Self::Erc20 => &ERC20_READ_SELECTORS,
            Self::StrategyFarm => &FARM_READ_SELECTORS,
        }
    }

    /// Selectors of the writes this interface supports.
    #[must_use]
    pub const fn write_selectors(self) -> &'static [[u8; 4]] {
        match self {
            Self::Erc20 => &ERC20_WRITE_SELECTORS,
            Self::StrategyFarm => &FARM_WRITE_SELECTORS,
        }
    }
}

/// A resolved handle to one contract.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ContractBinding {
    /// The contract address.
    pub address: Address,
    /// The interface the contract is known to expose.
    pub interface: InterfaceKind,
}

impl ContractBinding {
    /// Creates a binding. Resolution checks live in the factory that hands
    /// bindings out; the constructor itself is plain.
    #[must_use]
    pub const fn new(address: Address, interface: InterfaceKind) -> Self {
        Self { address, interface }
    }

    /// Whether this binding's interface exposes the read with the given
    /// selector.
    #[must_use]
    pub fn supports_read(&self, selector: [u8; 4]) -> bool {
        self.interface.read_selectors().contains(&selector)
    }

    /// Whether this binding's interface exposes the write with the given
    /// selector.
    #[must_use]
    pub fn supports_write(&self, selector: [u8; 4]) -> bool {
        self.interface.write_selectors().contains(&selector)
    }
}

/// Resolution state of a late-resolved binding.
///
/// Token and reward bindings are discovered from farm reads at runtime.
/// `Failed` is sticky: a binding that could not be resolved stays failed for
/// the lifetime of its owner, and every read that depends on it is skipped.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum BindingSlot {
    /// Not resolved yet; resolution will be attempted on the next cycle.
    #[default]
    Unresolved,
    /// Resolved and usable.
    Ready(ContractBinding),
    /// Resolution failed; dependent reads are skipped from now on.
    Failed,
}

impl BindingSlot {
    /// The binding, if resolved.
    #[must_use]
    pub const fn binding(&self) -> Option<ContractBinding> {
        match self {
            Self::Ready(binding) => Some(*binding),
            Self::Unresolved | Self::Failed => None,
        }
    }

    /// Whether resolution has permanently failed.
    #[must_use]
    pub const fn is_failed(&self) -> bool {
        matches!(self, Self::Failed)
    }

    /// Whether resolution has not been attempted or completed yet.
    #[must_use]
    pub const fn is_unresolved(&self) -> bool {
        matches!(self, Self::Unresolved)
    }
}
