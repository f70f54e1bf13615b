//! # TRELLIS Engine
//!
//! The dashboard brain: keeps one [`FarmSnapshot`] per configured farm in
//! sync with the chain and funnels every user transaction through an
//! at-most-one-in-flight orchestrator.
//!
//! ## Architecture
//!
//! ```text
//!              ┌─────────────────── FarmViewModel ───────────────────┐
//!              │                                                     │
//! 30s ticks ──▶│ RefreshScheduler ──admit──▶ FetchCoordinator ─reads─┼──▶ CallGateway
//!              │        ▲                          │                 │
//!              │        │ request_refresh          ▼ publish         │
//!              │ TransactionOrchestrator ──▶ SyncedFarmState         │
//!              │        │                          │                 │
//!              └────────┼──────────────────────────┼─────────────────┘
//!                       ▼ TransactionRequest       ▼ snapshot clones
//!                TransactionSubmitter          presentation
//! ```
//!
//! Reads merge into the snapshot field by field with retention: a failed
//! read keeps the previous value and costs one cycle of freshness, never
//! the snapshot. Writes walk Idle → Submitting → AwaitingConfirmation →
//! Settled in a single atomic; a second submission while one is in flight
//! is skipped without touching the wallet.
//!
//! Every farm shape is data: a [`FarmDescriptor`] (usually loaded from
//! TOML via [`DashboardConfig`]) tells the engine how a farm accounts for
//! stakes, where its tokens are discovered, and which optional operations
//! it supports. Adding a farm is a config entry, not new code.

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(clippy::perf)]

pub mod approval;
pub mod config;
pub mod countdown;
pub mod descriptor;
pub mod diagnostics;
pub mod error;
pub mod fetch;
pub mod orchestrator;
pub mod scheduler;
pub mod snapshot;
pub mod stats;
pub mod view;

/// Default polling cadence between refresh cycles, in seconds.
pub const REFRESH_PERIOD_SECS: u64 = 30;

/// How long a success toast stays up, in milliseconds.
pub const SUCCESS_DISMISS_MS: u32 = 10_000;

/// How long a failure toast stays up, in milliseconds.
pub const ERROR_DISMISS_MS: u32 = 2_000;

pub use config::{DashboardConfig, FarmConfig, NotificationTimings};
pub use countdown::{TimeParts, UnlockCountdown};
pub use descriptor::{
    FarmDescriptor, PerShareRefresh, RewardDiscovery, StakeAccounting, StatsKey, TokenDiscovery,
};
pub use diagnostics::{DiagnosticRecord, DiagnosticsHub};
pub use error::{EngineError, EngineResult};
pub use fetch::FetchCoordinator;
pub use orchestrator::{FarmAction, SkipReason, TransactionOrchestrator, TxOutcome, TxPhase};
pub use scheduler::{RefreshScheduler, SchedulerState};
pub use snapshot::{CycleReads, FarmSnapshot, RewardEntry, SyncedFarmState, TokenMetadata};
pub use stats::{SyncStats, SyncStatsSnapshot};
pub use view::{FarmEnvironment, FarmViewModel};
