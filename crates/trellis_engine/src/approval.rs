//! # Approval Gate
//!
//! The allowance check in front of deposits. The deployed flow treats any
//! strictly positive allowance as "approved" and always requests an
//! unlimited allowance, so one approval per wallet and token is enough for
//! every later deposit. The gate never compares against the amount being
//! deposited; that looseness is part of the contract surface the engine
//! mirrors, and tightening it here would desynchronize the two.

use alloy_primitives::U256;
use trellis_chain::{ContractBinding, TransactionRequest};

use crate::descriptor::FarmDescriptor;

/// Whether an allowance opens the gate: strictly positive, nothing more.
#[must_use]
pub fn is_open(allowance: U256) -> bool {
    allowance > U256::ZERO
}

/// The approve transaction for a farm's staked token. Always unlimited.
#[must_use]
pub fn approve_request(descriptor: &FarmDescriptor, token: ContractBinding) -> TransactionRequest {
    TransactionRequest::approve(token, descriptor.farm_address)
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::Address;
    use trellis_chain::{InterfaceKind, TransactionKind};

    #[test]
    fn gate_opens_on_any_positive_allowance() {
        assert!(!is_open(U256::ZERO));
        assert!(is_open(U256::from(1u64)));
        assert!(is_open(U256::MAX));
    }

    #[test]
    fn approve_targets_the_token_and_requests_unlimited_allowance() {
        let descriptor =
            FarmDescriptor::autocompounder_boost("mUMAMI Boost", Address::repeat_byte(0x01));
        let token = ContractBinding::new(Address::repeat_byte(0x02), InterfaceKind::Erc20);
        let request = approve_request(&descriptor, token);

        assert_eq!(request.kind, TransactionKind::Approve);
        assert_eq!(request.target, token);
        assert_eq!(request.spender, Some(descriptor.farm_address));
        assert_eq!(request.payload, Some(U256::MAX));
    }
}
