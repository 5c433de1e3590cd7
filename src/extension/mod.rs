//! # Extension Items
//!
//! Type-erased per-holder attributes owned by feature units.
//!
//! ## Layers
//! - **Item** ([`ExtensionItem`]): named descriptor for one kind of metadata; the
//!   only code that knows the concrete type of the values it stores
//! - **Kinds**: [`LocalItem`], [`SimpleItem`], [`LocalIntItem`], [`StringItem`]
//! - **Store** ([`Extensible`]): per-holder map from item to opaque value
//! - **Registry** ([`ExtensionManager`]): name to item, with per-unit unregistration
//!
//! ## Lifecycle
//! 1. A feature unit builds its items and registers them.
//! 2. It reads and writes values through its own item handles.
//! 3. On unload the manager hands back the unit's items
//!    ([`ExtensionManager::begin_unregister`]), every store drops their entries
//!    ([`Extensible::unhook`]), and only then are the items released.
//!
//! ## Example
//! ```rust
//! use chatd_ext::extension::{ExtensionManager, HolderKind, LocalIntItem};
//! use chatd_ext::holder::{Holder, User};
//!
//! let mut manager = ExtensionManager::new();
//! let warnings = LocalIntItem::new("warn_count", HolderKind::User, "warn");
//! assert!(manager.register(warnings.clone()));
//!
//! let mut user = User::local("001AAAAAA", "alice");
//! warnings.set(user.extensible_mut(), 3).unwrap();
//! assert_eq!(warnings.get(user.extensible()), 3);
//! ```

mod extensible;
mod item;
mod kinds;
mod manager;

pub use extensible::Extensible;
pub use item::{ExtensionItem, HolderKind, ItemId, ItemInfo, ItemRef, Opaque};
pub use kinds::{LocalIntItem, LocalItem, LocalStringItem, SimpleItem, StringItem, TypedItem};
pub use manager::ExtensionManager;

#[cfg(test)]
mod tests;
