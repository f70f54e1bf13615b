//! # Engine Error Types
//!
//! Hard errors only. Read failures never surface here - they are absorbed
//! into diagnostics; transaction failures travel to the notification sink.
//! What remains is configuration: a dashboard that cannot even be described
//! correctly refuses to start.

use thiserror::Error;
use trellis_chain::ResolveError;

/// Errors raised while loading or validating dashboard configuration.
#[derive(Error, Debug)]
pub enum EngineError {
    /// The TOML document did not parse.
    #[error("config parse failed: {0}")]
    ConfigParse(#[from] toml::de::Error),

    /// The config could not be rendered back to TOML.
    #[error("config encode failed: {0}")]
    ConfigEncode(#[from] toml::ser::Error),

    /// A farm entry carries an address that is not valid hex.
    #[error("farm `{farm}`: invalid address `{value}`")]
    InvalidAddress {
        /// The farm entry at fault.
        farm: String,
        /// The rejected input.
        value: String,
    },

    /// A farm entry carries a decimal count no 256-bit scale can hold.
    #[error("farm `{farm}`: unsupported decimal count {decimals}")]
    UnsupportedDecimals {
        /// The farm entry at fault.
        farm: String,
        /// The rejected decimal count.
        decimals: u8,
    },

    /// The config names no farms at all.
    #[error("no farms configured")]
    NoFarms,

    /// The farm's own binding could not be resolved at mount.
    #[error("farm `{farm}`: binding rejected")]
    FarmBinding {
        /// The farm entry at fault.
        farm: String,
        /// Why resolution failed.
        #[source]
        source: ResolveError,
    },
}

/// Result type for engine configuration operations.
pub type EngineResult<T> = Result<T, EngineError>;
