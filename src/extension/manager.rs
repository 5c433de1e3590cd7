use std::collections::BTreeMap;

use tracing::debug;

use super::item::ItemRef;
use crate::utils::metrics::global_metrics;

/// Process-wide registry of extension items, keyed by name.
///
/// Append-only apart from [`ExtensionManager::begin_unregister`], which removes
/// every item of one feature unit as a batch.
#[derive(Debug, Default)]
pub struct ExtensionManager {
    types: BTreeMap<String, ItemRef>,
}

impl ExtensionManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `item` under its name.
    ///
    /// Returns `false` and changes nothing if the name is already taken.
    pub fn register(&mut self, item: ItemRef) -> bool {
        if self.types.contains_key(item.name()) {
            debug!(item = item.name(), owner = item.owner(), "Duplicate extension item");
            return false;
        }

        item.info().set_registered(true);
        global_metrics().item_registered();
        debug!(
            item = item.name(),
            kind = %item.kind(),
            owner = item.owner(),
            "Registered extension item"
        );
        self.types.insert(item.name().to_string(), item);
        true
    }

    pub fn find(&self, name: &str) -> Option<&ItemRef> {
        self.types.get(name)
    }

    /// Remove every item owned by `owner` and hand them back.
    ///
    /// The items are marked unregistered immediately. The caller must still
    /// `unhook` them from every live [`Extensible`](super::Extensible) before
    /// dropping its handles.
    pub fn begin_unregister(&mut self, owner: &str) -> Vec<ItemRef> {
        let (removed, kept): (BTreeMap<_, _>, BTreeMap<_, _>) = std::mem::take(&mut self.types)
            .into_iter()
            .partition(|(_, item)| item.owner() == owner);
        self.types = kept;

        let metrics = global_metrics();
        removed
            .into_values()
            .inspect(|item| {
                item.info().set_registered(false);
                metrics.item_unregistered();
                debug!(item = item.name(), owner, "Unregistered extension item");
            })
            .collect()
    }

    /// Every registered item, by name
    pub fn list(&self) -> &BTreeMap<String, ItemRef> {
        &self.types
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extension::{ExtensionItem, HolderKind, LocalIntItem, StringItem};

    #[test]
    fn test_register_rejects_duplicate_name() {
        let mut manager = ExtensionManager::new();
        let first = StringItem::new("swhois", HolderKind::User, "swhois");
        let second = StringItem::new("swhois", HolderKind::User, "other");

        assert!(manager.register(first.clone()));
        assert!(!manager.register(second.clone()));
        assert_eq!(manager.len(), 1);
        assert_eq!(manager.find("swhois").map(|item| item.owner()), Some("swhois"));
        assert!(!second.info().is_registered());
    }

    #[test]
    fn test_begin_unregister_removes_only_owner() {
        let mut manager = ExtensionManager::new();
        manager.register(StringItem::new("topic_lock", HolderKind::Channel, "topiclock"));
        manager.register(LocalIntItem::new("flood_count", HolderKind::User, "flood"));
        manager.register(LocalIntItem::new("flood_ts", HolderKind::User, "flood"));

        let removed = manager.begin_unregister("flood");
        assert_eq!(removed.len(), 2);
        assert!(removed.iter().all(|item| !item.info().is_registered()));
        assert_eq!(manager.list().keys().collect::<Vec<_>>(), vec!["topic_lock"]);
        assert!(manager.begin_unregister("flood").is_empty());
    }
}
