//! # Error Types
//!
//! Error handling for the extension store and its serialization contract.
//!
//! Most failures at this layer are *not* errors: malformed serialized text is
//! reported by codecs as `Ok(None)` and the holder is left untouched, and format
//! violations (reading back `UserDisplay`, sending local items to the network)
//! are defined as no-ops. What remains here are the conditions a caller must see.
//!
//! ## Error Categories
//! - **Context mismatch**: a value cannot be rebuilt for the holder it targets
//! - **Registration**: duplicate names, unregistered items, unknown units
//! - **Lifecycle**: writes into a store that has already been torn down
//! - **Persistence**: I/O, dump decoding and compression failures
//! - **Configuration**: invalid or unreadable configuration
//!
//! ## Example Usage
//! ```rust
//! use chatd_ext::error::{ExtError, Result};
//!
//! fn require_local(is_local: bool) -> Result<()> {
//!     if !is_local {
//!         return Err(ExtError::ContextMismatch(
//!             "value is only meaningful for local users".to_string(),
//!         ));
//!     }
//!     Ok(())
//! }
//!
//! assert!(require_local(false).is_err());
//! ```

use std::io;
use thiserror::Error;

use crate::extension::HolderKind;

/// Error message constants shared by the lifecycle paths.
pub mod constants {
    /// Holder lookups
    pub const ERR_HOLDER_NOT_FOUND: &str = "Holder not found";

    /// Dump framing
    pub const ERR_EMPTY_DUMP: &str = "Empty dump";
    pub const ERR_UNKNOWN_ENCODING: &str = "Unknown dump encoding byte";
    pub const ERR_UNSUPPORTED_DUMP_VERSION: &str = "Unsupported dump version";
}

// ExtError is the error type for every fallible operation in the crate
#[derive(Error, Debug)]
pub enum ExtError {
    #[error("Context mismatch: {0}")]
    ContextMismatch(String),

    #[error("Extension item already registered: {0}")]
    DuplicateRegistration(String),

    #[error("Extension item {item} is for {expected} holders, not {actual}")]
    CategoryMismatch {
        item: String,
        expected: HolderKind,
        actual: HolderKind,
    },

    #[error("Extension item is not registered: {0}")]
    Unregistered(String),

    #[error("Extension store has already been torn down")]
    TornDown,

    #[error("Unknown holder: {0}")]
    UnknownHolder(String),

    #[error("Unknown feature unit: {0}")]
    UnknownUnit(String),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] bincode::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Decode error: {0}")]
    DecodeError(String),

    #[error("Compression failed")]
    CompressionFailure,

    #[error("Decompression failed")]
    DecompressionFailure,

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

/// Type alias for Results using ExtError
pub type Result<T> = std::result::Result<T, ExtError>;
