//! # chatd-ext
//!
//! Extensible attribute store and format-aware serialization core for a chat
//! server.
//!
//! Feature units attach typed metadata to users, channels and memberships
//! without the core knowing those types, and that metadata crosses four
//! boundaries: human display, same-process reload, server-to-server sync and
//! on-disk persistence.
//!
//! ## Layout
//! - [`core`]: formats, the escaping codec and the value codec family
//! - [`extension`]: items, per-holder stores and the registry
//! - [`holder`]: users, channels and memberships
//! - [`sync`]: metadata records for netburst, reload and persistence
//! - [`state`]: holder tables and the feature unit lifecycle
//! - [`persist`]: dumps on disk
//! - [`units`]: feature units shipped with the core
//! - [`config`], [`error`], [`utils`]: ambient support
//!
//! ## Example
//! ```rust
//! use chatd_ext::config::AutojoinConfig;
//! use chatd_ext::holder::User;
//! use chatd_ext::state::ServerState;
//! use chatd_ext::units::AutojoinUnit;
//!
//! let mut state = ServerState::new();
//! let autojoin = AutojoinUnit::new(&AutojoinConfig {
//!     channels: vec!["#lobby".into()],
//!     delay: std::time::Duration::from_secs(10),
//! });
//! state.load_unit(&autojoin).unwrap();
//!
//! state.add_user(User::local("001AAAAAA", "alice"));
//! let user = state.user_mut("001AAAAAA").unwrap();
//! assert!(autojoin.on_post_connect(user, 0).unwrap().is_empty());
//! assert_eq!(autojoin.on_tick(user, 10, false), vec!["#lobby".to_string()]);
//! ```

pub mod config;
pub mod core;
pub mod error;
pub mod extension;
pub mod holder;
pub mod persist;
pub mod state;
pub mod sync;
pub mod units;
pub mod utils;

pub use crate::core::{Codec, Context, ExtSerialize, SerializeFormat};
pub use crate::error::{ExtError, Result};
pub use crate::extension::{Extensible, ExtensionItem, ExtensionManager, HolderKind};
pub use crate::holder::{Channel, Holder, HolderRef, Membership, User};
pub use crate::state::{FeatureUnit, ServerState};
