//! # Extensible
//!
//! The per-holder attribute store. Every user, channel and membership embeds
//! exactly one.
//!
//! The store maps an item's identity to an opaque value and never looks at the
//! value's type. Values are exclusively owned by the store until handed back
//! through [`Extensible::set`] (displaced value) or [`Extensible::unset`]; the
//! caller then either stores them again or frees them through their item.
//!
//! ## Teardown
//! [`Extensible::free_all`] must run exactly once before the store is dropped.
//! Dropping a store without it is a defect: it is logged at error level and
//! counted in the `teardown_violations` metric, with any still-live entries
//! counted in `leaked_values`.

use std::any::Any;
use std::collections::btree_map::Entry as MapEntry;
use std::collections::BTreeMap;

use tracing::{debug, error};

use super::item::{ExtensionItem, HolderKind, ItemId, ItemRef, Opaque};
use crate::error::{ExtError, Result};
use crate::utils::metrics::global_metrics;

#[derive(Debug)]
struct Entry {
    item: ItemRef,
    value: Opaque,
}

/// Attribute store for one holder.
#[derive(Debug)]
pub struct Extensible {
    kind: HolderKind,
    entries: BTreeMap<ItemId, Entry>,
    torn_down: bool,
}

impl Extensible {
    /// Create an empty store for a holder of `kind`
    pub fn new(kind: HolderKind) -> Self {
        Self {
            kind,
            entries: BTreeMap::new(),
            torn_down: false,
        }
    }

    /// Category of the holder this store belongs to
    pub fn kind(&self) -> HolderKind {
        self.kind
    }

    pub fn get(&self, item: &dyn ExtensionItem) -> Option<&dyn Any> {
        self.entries
            .get(&item.info().id())
            .map(|entry| entry.value.as_ref())
    }

    pub fn get_mut(&mut self, item: &dyn ExtensionItem) -> Option<&mut dyn Any> {
        self.entries
            .get_mut(&item.info().id())
            .map(|entry| entry.value.as_mut())
    }

    pub fn contains(&self, item: &dyn ExtensionItem) -> bool {
        self.entries.contains_key(&item.info().id())
    }

    /// Store `value` for `item`, returning the value it displaced.
    ///
    /// # Errors
    /// - [`ExtError::CategoryMismatch`] if `item` is for another holder category
    /// - [`ExtError::Unregistered`] if `item` is not in an extension manager
    /// - [`ExtError::TornDown`] after [`Extensible::free_all`]
    pub fn set(&mut self, item: &dyn ExtensionItem, value: Opaque) -> Result<Option<Opaque>> {
        if self.torn_down {
            return Err(ExtError::TornDown);
        }

        let info = item.info();
        if info.kind() != self.kind {
            return Err(ExtError::CategoryMismatch {
                item: info.name().to_string(),
                expected: info.kind(),
                actual: self.kind,
            });
        }

        let handle = match info.handle() {
            Some(handle) if info.is_registered() => handle,
            _ => return Err(ExtError::Unregistered(info.name().to_string())),
        };

        global_metrics().value_set();
        match self.entries.entry(info.id()) {
            MapEntry::Occupied(mut slot) => {
                Ok(Some(std::mem::replace(&mut slot.get_mut().value, value)))
            }
            MapEntry::Vacant(slot) => {
                slot.insert(Entry {
                    item: handle,
                    value,
                });
                Ok(None)
            }
        }
    }

    /// Remove and return the value for `item` without freeing it
    pub fn unset(&mut self, item: &dyn ExtensionItem) -> Option<Opaque> {
        self.entries
            .remove(&item.info().id())
            .map(|entry| entry.value)
    }

    /// Every attached `(item, value)` pair, for netburst and persistence dumps
    pub fn iter(&self) -> impl Iterator<Item = (&ItemRef, &dyn Any)> {
        self.entries
            .values()
            .map(|entry| (&entry.item, entry.value.as_ref()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Remove and free every entry belonging to one of `items`.
    ///
    /// Returns how many entries were freed.
    pub fn unhook(&mut self, items: &[ItemRef]) -> usize {
        let mut freed = 0;
        for item in items {
            if let Some(entry) = self.entries.remove(&item.info().id()) {
                self.release(entry);
                freed += 1;
            }
        }
        freed
    }

    /// Free every remaining entry. Part of the holder's destruction sequence.
    pub fn free_all(&mut self) {
        if self.torn_down {
            debug!(kind = %self.kind, "Extensible already torn down");
            return;
        }

        self.torn_down = true;
        let entries = std::mem::take(&mut self.entries);
        for entry in entries.into_values() {
            self.release(entry);
        }
    }

    /// Whether [`Extensible::free_all`] has run
    pub fn is_torn_down(&self) -> bool {
        self.torn_down
    }

    fn release(&self, entry: Entry) {
        global_metrics().value_freed();
        entry.item.free(self, entry.value);
    }
}

impl Drop for Extensible {
    fn drop(&mut self) {
        if self.torn_down {
            return;
        }

        let metrics = global_metrics();
        metrics.teardown_violation();
        if self.entries.is_empty() {
            error!(kind = %self.kind, "Extensible destroyed without free_all");
            return;
        }

        metrics.values_leaked(self.entries.len() as u64);
        error!(
            kind = %self.kind,
            live_entries = self.entries.len(),
            "Extensible destroyed without free_all while holding live entries"
        );
        self.free_all();
    }
}
