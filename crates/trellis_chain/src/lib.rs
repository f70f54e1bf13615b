//! # TRELLIS Ledger Surface
//!
//! Typed access to the two contract shapes the dashboard engine reads and
//! writes: plain ERC-20 tokens and autocompounding strategy farms.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────┐   CallSpec    ┌──────────────────┐
//! │  Engine         │ ────────────▶ │  CallGateway     │──▶ chain / sim
//! │  (trellis_      │ ◀──────────── │  (trait)         │
//! │   engine)       │   CallValue   └──────────────────┘
//! │                 │
//! │                 │  TransactionRequest  ┌────────────────────┐
//! │                 │ ───────────────────▶ │ TransactionSubmitter│──▶ wallet
//! └─────────────────┘ ◀─────────────────── │ (trait)            │
//!                          Settlement      └────────────────────┘
//! ```
//!
//! No raw calldata crosses this boundary: reads are [`CallSpec`] values,
//! writes are [`TransactionRequest`] values, and translation to the wire
//! format belongs to whoever implements the traits. The [`sim`] module
//! ships a deterministic in-memory implementation for tests and demos.

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(clippy::perf)]

pub mod binding;
pub mod calls;
pub mod contracts;
pub mod error;
pub mod sim;
pub mod traits;
pub mod units;

pub use binding::{BindingSlot, ContractBinding, InterfaceKind};
pub use calls::{
    CallSpec, CallValue, PositionInfo, Settlement, TransactionKind, TransactionRequest, TxHandle,
};
pub use error::{CallError, CallResult, ResolveError, ResolveResult, SubmitError, UnitError};
pub use sim::{SimFarmSpec, SimLedger};
pub use traits::{
    AggregateStats, AggregateStatsSource, BindingFactory, CallGateway, MockWalletSigner,
    Notification, NotificationKind, NotificationSink, RecordingNotificationSink, StaticStatsSource,
    StrategyStats, TransactionSubmitter, WalletSigner,
};
pub use units::{format_units, is_positive_amount, parse_units, scale_factor, MAX_DECIMALS};
