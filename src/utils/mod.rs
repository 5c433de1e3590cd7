//! # Utility Modules
//!
//! Supporting utilities shared by the extension core and its drivers.
//!
//! ## Components
//! - **Compression**: LZ4 and Zstd for persistence dumps, with size limits
//! - **Flat containers**: sorted-vector multiset and multimap
//! - **Logging**: `tracing-subscriber` setup
//! - **Metrics**: atomic lifecycle counters

pub mod compression;
pub mod flat;
pub mod logging;
pub mod metrics;

pub use flat::{FlatMultiMap, FlatMultiSet};
