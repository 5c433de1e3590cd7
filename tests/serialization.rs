//! Codec behavior across the four serialization formats

#![allow(clippy::expect_used, clippy::unwrap_used)]

use std::collections::{BTreeMap, BTreeSet, VecDeque};

use chatd_ext::core::escape;
use chatd_ext::core::{Codec, Context, ExtSerialize, SeqCodec, SerializeFormat};
use chatd_ext::extension::{HolderKind, SimpleItem, TypedItem};
use chatd_ext::utils::{FlatMultiMap, FlatMultiSet};
use chatd_ext::{ExtensionItem, ExtensionManager, Holder, User};

fn roundtrip<T: ExtSerialize>(format: SerializeFormat, value: &T) -> Option<T> {
    let codec = T::Codec::default();
    let ctx = Context::detached();
    let text = codec.serialize_to_vec(format, value, &ctx);
    codec.unserialize(format, &text, &ctx).expect("detached codecs never mismatch")
}

#[test]
fn test_integer_sequence_internal() {
    let values: Vec<u32> = vec![1, 2, 300];
    let codec = <Vec<u32> as ExtSerialize>::Codec::default();
    let ctx = Context::detached();

    let text = codec.serialize_to_vec(SerializeFormat::Internal, &values, &ctx);
    let fields = escape::decode(&text).expect("well-formed framing");
    assert_eq!(fields.len(), 3);
    assert_eq!(fields[2], 300u32.to_le_bytes().to_vec());

    let back = codec.unserialize(SerializeFormat::Internal, &text, &ctx).unwrap();
    assert_eq!(back, Some(vec![1, 2, 300]));
}

#[test]
fn test_integer_sequence_display() {
    let codec = SeqCodec::<Vec<u32>, _>::new(<u32 as ExtSerialize>::Codec::default());
    let text = codec.serialize_to_vec(SerializeFormat::UserDisplay, &vec![1, 2, 300], &Context::detached());
    assert_eq!(escape::decode(&text), Some(vec![b"1".to_vec(), b"2".to_vec(), b"300".to_vec()]));
}

#[test]
fn test_pair_with_comma_label() {
    let value = (30u32, "general,ops".to_string());
    for format in [SerializeFormat::Internal, SerializeFormat::Network, SerializeFormat::Persist] {
        assert_eq!(roundtrip(format, &value), Some(value.clone()), "format {format}");
    }
}

#[test]
fn test_pair_with_nul_label() {
    let value = (30u32, "general\0ops\\x".to_string());
    let codec = <(u32, String) as ExtSerialize>::Codec::default();
    let text = codec.serialize_to_vec(SerializeFormat::Persist, &value, &Context::detached());

    let fields = escape::decode(&text).expect("framing");
    assert_eq!(fields.len(), 2);
    assert_eq!(fields[1], b"general\0ops\\x".to_vec());
    assert_eq!(roundtrip(SerializeFormat::Persist, &value), Some(value));
}

#[test]
fn test_containers_roundtrip() {
    let deque: VecDeque<i64> = VecDeque::from(vec![-5, 0, i64::MAX]);
    assert_eq!(roundtrip(SerializeFormat::Internal, &deque), Some(deque.clone()));

    let set: BTreeSet<String> = ["#b", "#a", ""].into_iter().map(String::from).collect();
    assert_eq!(roundtrip(SerializeFormat::Persist, &set), Some(set.clone()));

    let mut multi = FlatMultiSet::new();
    multi.insert(3u16);
    multi.insert(3u16);
    multi.insert(1u16);
    assert_eq!(roundtrip(SerializeFormat::Internal, &multi), Some(multi.clone()));
}

#[test]
fn test_mappings_roundtrip() {
    let mut map = BTreeMap::new();
    map.insert("alice".to_string(), vec![1u8, 2]);
    map.insert("b\0b".to_string(), Vec::new());
    assert_eq!(roundtrip(SerializeFormat::Persist, &map), Some(map.clone()));

    let mut multi = FlatMultiMap::new();
    multi.insert(1u32, "x".to_string());
    multi.insert(1u32, "y".to_string());
    assert_eq!(roundtrip(SerializeFormat::Internal, &multi), Some(multi.clone()));
}

#[test]
fn test_nested_containers_roundtrip() {
    let nested: Vec<(String, Vec<u32>)> = vec![
        ("#lobby".into(), vec![1, 2]),
        (String::new(), Vec::new()),
        ("\\".into(), vec![0]),
    ];
    assert_eq!(roundtrip(SerializeFormat::Persist, &nested), Some(nested.clone()));
}

#[test]
fn test_bool_and_numeric_display() {
    let ctx = Context::detached();
    let codec = <bool as ExtSerialize>::Codec::default();
    assert_eq!(codec.serialize_to_vec(SerializeFormat::UserDisplay, &true, &ctx), b"true");
    assert_eq!(roundtrip(SerializeFormat::Network, &false), Some(false));

    let codec = <i32 as ExtSerialize>::Codec::default();
    assert_eq!(codec.serialize_to_vec(SerializeFormat::UserDisplay, &-42, &ctx), b"-42");
}

#[test]
fn test_item_level_roundtrip_on_holder() {
    let mut manager = ExtensionManager::new();
    let item = SimpleItem::<BTreeMap<String, u64>>::new("seen", HolderKind::User, "history");
    assert!(manager.register(item.clone()));

    let mut alice = User::local("001AAAAAA", "alice");
    let mut value = BTreeMap::new();
    value.insert("#lobby".to_string(), 1_700_000_000u64);
    item.set(alice.extensible_mut(), value.clone()).unwrap();

    let stored = alice.extensible().get(&*item).expect("value");
    let text = item.serialize(SerializeFormat::Persist, &alice, stored);

    let mut restored = User::local("001AAAAAA", "alice");
    item.unserialize(SerializeFormat::Persist, &mut restored, &text).unwrap();
    assert_eq!(item.get(restored.extensible()), Some(&value));
}
