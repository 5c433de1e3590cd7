use std::any::Any;
use std::cell::Cell;
use std::fmt;
use std::rc::{Rc, Weak};
use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

use super::extensible::Extensible;
use crate::core::SerializeFormat;
use crate::error::Result;
use crate::holder::Holder;

/// A value stored in an [`Extensible`]. Only the item that stored it knows its
/// concrete type.
pub type Opaque = Box<dyn Any>;

/// Shared handle to a registered item.
pub type ItemRef = Rc<dyn ExtensionItem>;

/// The category of object an item may be attached to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HolderKind {
    User,
    Channel,
    Membership,
}

impl HolderKind {
    pub fn name(self) -> &'static str {
        match self {
            HolderKind::User => "user",
            HolderKind::Channel => "channel",
            HolderKind::Membership => "membership",
        }
    }
}

impl fmt::Display for HolderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Process-unique item identity; the key of every store entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ItemId(u64);

static NEXT_ITEM_ID: AtomicU64 = AtomicU64::new(1);

impl ItemId {
    fn next() -> Self {
        Self(NEXT_ITEM_ID.fetch_add(1, Ordering::Relaxed))
    }
}

/// Identity and registration state shared by every item kind.
pub struct ItemInfo {
    id: ItemId,
    name: String,
    kind: HolderKind,
    owner: String,
    registered: Cell<bool>,
    this: Weak<dyn ExtensionItem>,
}

impl ItemInfo {
    /// Build the info for an item being constructed with `Rc::new_cyclic`.
    pub fn new<I: ExtensionItem + 'static>(
        name: impl Into<String>,
        kind: HolderKind,
        owner: impl Into<String>,
        this: &Weak<I>,
    ) -> Self {
        let this: Weak<dyn ExtensionItem> = this.clone();
        Self {
            id: ItemId::next(),
            name: name.into(),
            kind,
            owner: owner.into(),
            registered: Cell::new(false),
            this,
        }
    }

    pub fn id(&self) -> ItemId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> HolderKind {
        self.kind
    }

    /// Name of the feature unit that owns the item
    pub fn owner(&self) -> &str {
        &self.owner
    }

    /// Whether the item is currently in an extension manager
    pub fn is_registered(&self) -> bool {
        self.registered.get()
    }

    pub(crate) fn set_registered(&self, registered: bool) {
        self.registered.set(registered);
    }

    /// A strong handle to the item, while it is alive
    pub fn handle(&self) -> Option<ItemRef> {
        self.this.upgrade()
    }
}

/// A named, typed descriptor through which a feature unit attaches values to
/// holders of one category.
///
/// Implementations are the only code that knows the concrete type behind the
/// [`Opaque`] values they store, and the only code allowed to release them.
pub trait ExtensionItem {
    fn info(&self) -> &ItemInfo;

    /// Serialize a value this item stored. Empty text means "nothing to send".
    fn serialize(&self, format: SerializeFormat, holder: &dyn Holder, value: &dyn Any) -> Vec<u8>;

    /// Rebuild a value from `text` and attach it to `holder`.
    ///
    /// Malformed text leaves the holder unchanged. `UserDisplay` is never read back.
    ///
    /// # Errors
    /// Context mismatches raised while rebuilding the value.
    fn unserialize(&self, format: SerializeFormat, holder: &mut dyn Holder, text: &[u8])
        -> Result<()>;

    /// Release a value previously stored by this item.
    fn free(&self, container: &Extensible, value: Opaque);

    fn name(&self) -> &str {
        self.info().name()
    }

    fn kind(&self) -> HolderKind {
        self.info().kind()
    }

    fn owner(&self) -> &str {
        self.info().owner()
    }
}

impl fmt::Debug for dyn ExtensionItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExtensionItem")
            .field("name", &self.name())
            .field("kind", &self.kind())
            .field("owner", &self.owner())
            .finish()
    }
}
