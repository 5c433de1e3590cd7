// test-only module included via extension/mod.rs
#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::cell::Cell;
use std::rc::Rc;

use crate::core::SerializeFormat;
use crate::error::ExtError;
use crate::extension::*;
use crate::holder::{Channel, Holder, User};
use crate::utils::metrics::global_metrics;

/// Counts how many times values it hands out are dropped
struct Released(Rc<Cell<u32>>);

impl Drop for Released {
    fn drop(&mut self) {
        self.0.set(self.0.get() + 1);
    }
}

fn registered<I: ExtensionItem + 'static>(manager: &mut ExtensionManager, item: Rc<I>) -> Rc<I> {
    assert!(manager.register(item.clone()));
    item
}

#[test]
fn test_set_returns_displaced_value() {
    let mut manager = ExtensionManager::new();
    let item = registered(&mut manager, LocalItem::<u32>::new("counter", HolderKind::User, "t"));
    let mut ext = Extensible::new(HolderKind::User);

    assert!(ext.set(&*item, Box::new(1u32)).unwrap().is_none());
    let old = ext.set(&*item, Box::new(2u32)).unwrap().expect("displaced value");
    assert_eq!(old.downcast_ref::<u32>(), Some(&1));
    assert_eq!(item.get(&ext), Some(&2));

    let taken = ext.unset(&*item).expect("stored value");
    assert_eq!(taken.downcast_ref::<u32>(), Some(&2));
    assert!(ext.is_empty());
    ext.free_all();
}

#[test]
fn test_set_rejects_wrong_category() {
    let mut manager = ExtensionManager::new();
    let item = registered(&mut manager, StringItem::new("topic", HolderKind::Channel, "t"));
    let mut user = User::local("001AAAAAA", "alice");

    let err = item.set(user.extensible_mut(), "x").unwrap_err();
    assert!(matches!(
        err,
        ExtError::CategoryMismatch {
            expected: HolderKind::Channel,
            actual: HolderKind::User,
            ..
        }
    ));
    assert!(user.extensible().is_empty());
}

#[test]
fn test_set_rejects_unregistered_item() {
    let item = StringItem::new("orphan", HolderKind::User, "t");
    let mut user = User::local("001AAAAAA", "alice");
    assert!(matches!(
        item.set(user.extensible_mut(), "x"),
        Err(ExtError::Unregistered(_))
    ));
}

#[test]
fn test_typed_set_frees_previous_value() {
    let drops = Rc::new(Cell::new(0));
    let mut manager = ExtensionManager::new();
    let item = registered(&mut manager, LocalItem::<Released>::new("res", HolderKind::User, "t"));
    let mut user = User::local("001AAAAAA", "alice");

    item.set(user.extensible_mut(), Released(drops.clone())).unwrap();
    item.set(user.extensible_mut(), Released(drops.clone())).unwrap();
    assert_eq!(drops.get(), 1);

    let kept = item.take(user.extensible_mut()).expect("value");
    assert_eq!(drops.get(), 1);
    drop(kept);
    assert_eq!(drops.get(), 2);
}

#[test]
fn test_get_mut_updates_in_place() {
    let mut manager = ExtensionManager::new();
    let item = registered(&mut manager, SimpleItem::<Vec<u32>>::new("list", HolderKind::User, "t"));
    let mut user = User::local("001AAAAAA", "alice");

    item.set(user.extensible_mut(), vec![1]).unwrap();
    item.get_mut(user.extensible_mut()).expect("value").push(2);
    assert_eq!(item.get(user.extensible()), Some(&vec![1, 2]));
}

#[test]
fn test_unhook_frees_only_listed_items() {
    let drops = Rc::new(Cell::new(0));
    let mut manager = ExtensionManager::new();
    let gone = registered(&mut manager, LocalItem::<Released>::new("gone", HolderKind::User, "a"));
    let kept = registered(&mut manager, LocalItem::<Released>::new("kept", HolderKind::User, "b"));
    let mut user = User::local("001AAAAAA", "alice");
    gone.set(user.extensible_mut(), Released(drops.clone())).unwrap();
    kept.set(user.extensible_mut(), Released(drops.clone())).unwrap();

    let items = manager.begin_unregister("a");
    assert_eq!(user.extensible_mut().unhook(&items), 1);
    assert_eq!(drops.get(), 1);
    assert!(kept.get(user.extensible()).is_some());
    assert!(gone.get(user.extensible()).is_none());
}

#[test]
fn test_free_all_is_final() {
    let drops = Rc::new(Cell::new(0));
    let mut manager = ExtensionManager::new();
    let item = registered(&mut manager, LocalItem::<Released>::new("res", HolderKind::Channel, "t"));
    let mut ext = Extensible::new(HolderKind::Channel);
    item.set(&mut ext, Released(drops.clone())).unwrap();

    ext.free_all();
    assert!(ext.is_torn_down());
    assert_eq!(drops.get(), 1);
    assert_eq!(ext.iter().count(), 0);
    assert_eq!(ext.unhook(&[item.clone() as ItemRef]), 0);
    assert!(matches!(
        item.set(&mut ext, Released(drops.clone())),
        Err(ExtError::TornDown)
    ));

    ext.free_all();
    assert_eq!(drops.get(), 2);
}

#[test]
fn test_drop_without_teardown_is_reported() {
    let drops = Rc::new(Cell::new(0));
    let mut manager = ExtensionManager::new();
    let item = registered(&mut manager, LocalItem::<Released>::new("res", HolderKind::User, "t"));
    let before = global_metrics().snapshot();

    let mut ext = Extensible::new(HolderKind::User);
    item.set(&mut ext, Released(drops.clone())).unwrap();
    drop(ext);

    let after = global_metrics().snapshot();
    assert!(after.teardown_violations > before.teardown_violations);
    assert!(after.leaked_values > before.leaked_values);
    assert_eq!(drops.get(), 1);
}

#[test]
fn test_holder_drop_tears_down() {
    let drops = Rc::new(Cell::new(0));
    let mut manager = ExtensionManager::new();
    let item = registered(&mut manager, LocalItem::<Released>::new("res", HolderKind::Channel, "t"));

    let mut channel = Channel::new("#rust");
    item.set(channel.extensible_mut(), Released(drops.clone())).unwrap();
    drop(channel);
    assert_eq!(drops.get(), 1);
}

#[test]
fn test_local_int_item_zero_unsets() {
    let mut manager = ExtensionManager::new();
    let item = registered(&mut manager, LocalIntItem::new("warns", HolderKind::User, "t"));
    let mut user = User::local("001AAAAAA", "alice");

    assert_eq!(item.get(user.extensible()), 0);
    assert_eq!(item.set(user.extensible_mut(), 5).unwrap(), 0);
    assert_eq!(item.set(user.extensible_mut(), -3).unwrap(), 5);
    assert_eq!(item.set(user.extensible_mut(), 0).unwrap(), -3);
    assert!(user.extensible().is_empty());
}

#[test]
fn test_local_int_item_formats() {
    let mut manager = ExtensionManager::new();
    let item = registered(&mut manager, LocalIntItem::new("warns", HolderKind::User, "t"));
    let mut user = User::local("001AAAAAA", "alice");
    item.set(user.extensible_mut(), 42).unwrap();

    let value = user.extensible().get(&*item).expect("value");
    assert_eq!(item.serialize(SerializeFormat::Persist, &user, value), b"42");
    assert!(item.serialize(SerializeFormat::Network, &user, value).is_empty());

    let mut other = User::local("002AAAAAA", "bob");
    item.unserialize(SerializeFormat::Network, &mut other, b"7").unwrap();
    assert_eq!(item.get(other.extensible()), 0);
    item.unserialize(SerializeFormat::Internal, &mut other, b"not a number").unwrap();
    assert_eq!(item.get(other.extensible()), 0);
    item.unserialize(SerializeFormat::Internal, &mut other, b"7").unwrap();
    assert_eq!(item.get(other.extensible()), 7);
}

#[test]
fn test_string_item_syncs_everywhere() {
    let mut manager = ExtensionManager::new();
    let item = registered(&mut manager, StringItem::new("swhois", HolderKind::User, "t"));
    let mut user = User::remote("9ZZAAAAAA", "bob");

    item.unserialize(SerializeFormat::Network, &mut user, b"is a bot").unwrap();
    assert_eq!(item.get(user.extensible()), Some("is a bot"));

    item.unserialize(SerializeFormat::UserDisplay, &mut user, b"ignored").unwrap();
    assert_eq!(item.get(user.extensible()), Some("is a bot"));

    item.unserialize(SerializeFormat::Network, &mut user, b"").unwrap();
    assert_eq!(item.get(user.extensible()), None);
}

#[test]
fn test_simple_item_network_guard() {
    let mut manager = ExtensionManager::new();
    let item = registered(&mut manager, LocalStringItem::new("note", HolderKind::User, "t"));
    let mut user = User::local("001AAAAAA", "alice");
    item.set(user.extensible_mut(), "private".to_string()).unwrap();

    let value = user.extensible().get(&*item).expect("value");
    assert!(item.serialize(SerializeFormat::Network, &user, value).is_empty());
    assert_eq!(item.serialize(SerializeFormat::Internal, &user, value), b"private");

    let mut other = User::local("002AAAAAA", "bob");
    item.unserialize(SerializeFormat::Network, &mut other, b"leak").unwrap();
    assert!(other.extensible().is_empty());
}

#[test]
fn test_simple_item_skips_malformed_text() {
    let mut manager = ExtensionManager::new();
    let item = registered(&mut manager, SimpleItem::<u32>::new("count", HolderKind::User, "t"));
    let mut user = User::local("001AAAAAA", "alice");

    item.unserialize(SerializeFormat::Persist, &mut user, &[1, 2]).unwrap();
    assert!(user.extensible().is_empty());
    item.unserialize(SerializeFormat::Persist, &mut user, &[1, 0, 0, 0]).unwrap();
    assert_eq!(item.get(user.extensible()), Some(&1));
}
