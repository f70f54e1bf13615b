//! # Ledger Error Types
//!
//! All errors that can cross the ledger surface.

use thiserror::Error;

/// Errors produced while executing a read against a contract binding.
///
/// Reads are absorbed by the caller: a failed read costs one field of one
/// refresh cycle, never the whole snapshot.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CallError {
    /// The target contract does not expose the requested operation.
    #[error("operation `{0}` unavailable on target contract")]
    Unavailable(&'static str),

    /// The transport failed before a response was decoded.
    #[error("transport failure during `{operation}`: {reason}")]
    Transport {
        /// The operation that was in flight.
        operation: &'static str,
        /// Transport-level failure description.
        reason: String,
    },

    /// The response decoded to a different shape than the operation returns.
    #[error("response shape mismatch: expected {expected}, got {got}")]
    Shape {
        /// The shape the operation returns.
        expected: &'static str,
        /// The shape that was decoded.
        got: &'static str,
    },
}

/// Errors produced while resolving a contract binding.
///
/// Resolution failures are configuration failures: the affected reads are
/// skipped, they are never retried blindly.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ResolveError {
    /// The zero address can never host a contract.
    #[error("refusing to bind the zero address")]
    ZeroAddress,

    /// No contract with the requested interface lives at the address.
    #[error("no `{interface}` contract available at {address}")]
    Unavailable {
        /// The interface that was requested.
        interface: &'static str,
        /// The address that was probed.
        address: String,
    },

    /// The binding exists but does not support the requested operation.
    #[error("interface `{interface}` does not support `{operation}`")]
    Unsupported {
        /// The interface of the binding.
        interface: &'static str,
        /// The operation that was requested.
        operation: &'static str,
    },
}

/// Errors produced while dispatching a transaction.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SubmitError {
    /// No signer account is connected.
    #[error("no signer account connected")]
    SignerAbsent,

    /// The wallet or node rejected the request before it entered the pool.
    #[error("transaction rejected: {0}")]
    Rejected(String),
}

/// Errors produced while parsing a human-entered token amount.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum UnitError {
    /// The input was empty or contained no digits.
    #[error("empty amount")]
    Empty,

    /// The input contained a character that is not a digit or single point.
    #[error("invalid character in amount: `{0}`")]
    InvalidCharacter(char),

    /// More than one decimal point.
    #[error("multiple decimal points")]
    MultiplePoints,

    /// More fractional digits than the token carries.
    #[error("amount has more than {decimals} fractional digits")]
    TooManyFractionalDigits {
        /// The token's decimal count.
        decimals: u8,
    },

    /// The amount does not fit in 256 bits at the token's scale.
    #[error("amount overflows 256 bits")]
    Overflow,

    /// The decimal count itself exceeds what 256 bits can scale.
    #[error("unsupported decimal count: {0}")]
    UnsupportedDecimals(u8),
}

/// Result type for read operations.
pub type CallResult<T> = Result<T, CallError>;

/// Result type for binding resolution.
pub type ResolveResult<T> = Result<T, ResolveError>;
