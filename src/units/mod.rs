//! # Feature Units
//!
//! Loadable extensions to server behavior built on extension items. Each unit
//! implements [`FeatureUnit`](crate::state::FeatureUnit) and owns the items it
//! registers.
//!
//! - [`autojoin`]: joins users to configured channels after they connect

pub mod autojoin;

pub use autojoin::{AutojoinUnit, JoinTimer, TimerSettings};
