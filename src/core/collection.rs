//! Composite codecs built from element codecs and the escaping codec.
//!
//! A collection serializes each element through its element codec and writes the
//! result as one escaped field. Mappings have no pair decomposition of their own:
//! their elements are their entries, and each entry is written exactly as a
//! [`PairCodec`] would write it.

use std::collections::{BTreeMap, BTreeSet, VecDeque};
use std::marker::PhantomData;

use bytes::BytesMut;
use tracing::debug;

use super::codec::{Codec, Context, ExtSerialize};
use super::escape;
use super::format::SerializeFormat;
use crate::error::Result;
use crate::utils::flat::{FlatMultiMap, FlatMultiSet};

/// A container of single elements with a natural insertion operation.
pub trait Collection: Default {
    /// Element type
    type Element;

    /// Elements in iteration order
    fn elements(&self) -> impl Iterator<Item = &Self::Element>;

    /// Insert one element: append for sequences, insert for sets
    fn insert_element(&mut self, element: Self::Element);
}

impl<T> Collection for Vec<T> {
    type Element = T;

    fn elements(&self) -> impl Iterator<Item = &T> {
        self.iter()
    }

    fn insert_element(&mut self, element: T) {
        self.push(element);
    }
}

impl<T> Collection for VecDeque<T> {
    type Element = T;

    fn elements(&self) -> impl Iterator<Item = &T> {
        self.iter()
    }

    fn insert_element(&mut self, element: T) {
        self.push_back(element);
    }
}

impl<T: Ord> Collection for BTreeSet<T> {
    type Element = T;

    fn elements(&self) -> impl Iterator<Item = &T> {
        self.iter()
    }

    fn insert_element(&mut self, element: T) {
        self.insert(element);
    }
}

impl<T: Ord> Collection for FlatMultiSet<T> {
    type Element = T;

    fn elements(&self) -> impl Iterator<Item = &T> {
        self.iter()
    }

    fn insert_element(&mut self, element: T) {
        self.insert(element);
    }
}

/// A container of key/value entries.
pub trait Mapping: Default {
    /// Key type
    type Key;
    /// Mapped type
    type Value;

    /// Entries in iteration order
    fn entries(&self) -> impl Iterator<Item = (&Self::Key, &Self::Value)>;

    /// Insert one entry
    fn insert_entry(&mut self, key: Self::Key, value: Self::Value);
}

impl<K: Ord, V> Mapping for BTreeMap<K, V> {
    type Key = K;
    type Value = V;

    fn entries(&self) -> impl Iterator<Item = (&K, &V)> {
        self.iter()
    }

    // First entry for a key wins, as for any unique associative insert
    fn insert_entry(&mut self, key: K, value: V) {
        self.entry(key).or_insert(value);
    }
}

impl<K: Ord, V> Mapping for FlatMultiMap<K, V> {
    type Key = K;
    type Value = V;

    fn entries(&self) -> impl Iterator<Item = (&K, &V)> {
        self.iter()
    }

    fn insert_entry(&mut self, key: K, value: V) {
        self.insert(key, value);
    }
}

/// Codec for sequences, sets and multisets.
pub struct SeqCodec<C, E> {
    element: E,
    _container: PhantomData<fn() -> C>,
}

impl<C, E: Default> Default for SeqCodec<C, E> {
    fn default() -> Self {
        Self::new(E::default())
    }
}

impl<C, E> SeqCodec<C, E> {
    /// Build over an explicit element codec
    pub fn new(element: E) -> Self {
        Self {
            element,
            _container: PhantomData,
        }
    }
}

impl<C, E> Codec for SeqCodec<C, E>
where
    C: Collection,
    E: Codec<Value = C::Element>,
{
    type Value = C;

    fn serialize(&self, format: SerializeFormat, value: &C, ctx: &Context<'_>, out: &mut BytesMut) {
        let mut field = BytesMut::new();
        for element in value.elements() {
            field.clear();
            self.element.serialize(format, element, ctx, &mut field);
            escape::write_field(&field, out);
        }
    }

    fn unserialize(
        &self,
        format: SerializeFormat,
        text: &[u8],
        ctx: &Context<'_>,
    ) -> Result<Option<C>> {
        let Some(fields) = escape::decode(text) else {
            debug!(len = text.len(), "Malformed collection text");
            return Ok(None);
        };

        let mut container = C::default();
        for field in fields {
            match self.element.unserialize(format, &field, ctx)? {
                Some(element) => container.insert_element(element),
                None => debug!("Dropping malformed collection element"),
            }
        }
        Ok(Some(container))
    }
}

/// Codec for two values written as two escaped fields.
pub struct PairCodec<A, B> {
    first: A,
    second: B,
}

impl<A: Default, B: Default> Default for PairCodec<A, B> {
    fn default() -> Self {
        Self {
            first: A::default(),
            second: B::default(),
        }
    }
}

impl<A: Codec, B: Codec> PairCodec<A, B> {
    /// Build over explicit element codecs
    pub fn new(first: A, second: B) -> Self {
        Self { first, second }
    }

    /// Write a pair given as two separate references
    pub fn write_parts(
        &self,
        format: SerializeFormat,
        first: &A::Value,
        second: &B::Value,
        ctx: &Context<'_>,
        out: &mut BytesMut,
    ) {
        let mut field = BytesMut::new();
        self.first.serialize(format, first, ctx, &mut field);
        escape::write_field(&field, out);

        field.clear();
        self.second.serialize(format, second, ctx, &mut field);
        escape::write_field(&field, out);
    }

    /// Read a pair; both fields must be present and well formed
    pub fn read_parts(
        &self,
        format: SerializeFormat,
        text: &[u8],
        ctx: &Context<'_>,
    ) -> Result<Option<(A::Value, B::Value)>> {
        if text.is_empty() {
            return Ok(None);
        }

        let fields = match escape::decode(text) {
            Some(fields) if fields.len() == 2 => fields,
            _ => {
                debug!(len = text.len(), "Malformed pair text");
                return Ok(None);
            }
        };

        let first = self.first.unserialize(format, &fields[0], ctx)?;
        let second = self.second.unserialize(format, &fields[1], ctx)?;
        Ok(first.zip(second))
    }
}

impl<A: Codec, B: Codec> Codec for PairCodec<A, B> {
    type Value = (A::Value, B::Value);

    fn serialize(
        &self,
        format: SerializeFormat,
        value: &Self::Value,
        ctx: &Context<'_>,
        out: &mut BytesMut,
    ) {
        self.write_parts(format, &value.0, &value.1, ctx, out);
    }

    fn unserialize(
        &self,
        format: SerializeFormat,
        text: &[u8],
        ctx: &Context<'_>,
    ) -> Result<Option<Self::Value>> {
        self.read_parts(format, text, ctx)
    }
}

/// Codec for mappings and multimappings; each entry is one pair-encoded field.
pub struct MapCodec<M, K, V> {
    entry: PairCodec<K, V>,
    _container: PhantomData<fn() -> M>,
}

impl<M, K: Default, V: Default> Default for MapCodec<M, K, V> {
    fn default() -> Self {
        Self {
            entry: PairCodec::default(),
            _container: PhantomData,
        }
    }
}

impl<M, K, V> Codec for MapCodec<M, K, V>
where
    M: Mapping,
    K: Codec<Value = M::Key>,
    V: Codec<Value = M::Value>,
{
    type Value = M;

    fn serialize(&self, format: SerializeFormat, value: &M, ctx: &Context<'_>, out: &mut BytesMut) {
        let mut field = BytesMut::new();
        for (key, mapped) in value.entries() {
            field.clear();
            self.entry.write_parts(format, key, mapped, ctx, &mut field);
            escape::write_field(&field, out);
        }
    }

    fn unserialize(
        &self,
        format: SerializeFormat,
        text: &[u8],
        ctx: &Context<'_>,
    ) -> Result<Option<M>> {
        let Some(fields) = escape::decode(text) else {
            debug!(len = text.len(), "Malformed mapping text");
            return Ok(None);
        };

        let mut container = M::default();
        for field in fields {
            match self.entry.read_parts(format, &field, ctx)? {
                Some((key, mapped)) => container.insert_entry(key, mapped),
                None => debug!("Dropping malformed mapping entry"),
            }
        }
        Ok(Some(container))
    }
}

impl<T: ExtSerialize> ExtSerialize for Vec<T> {
    type Codec = SeqCodec<Self, T::Codec>;
}

impl<T: ExtSerialize> ExtSerialize for VecDeque<T> {
    type Codec = SeqCodec<Self, T::Codec>;
}

impl<T: ExtSerialize + Ord> ExtSerialize for BTreeSet<T> {
    type Codec = SeqCodec<Self, T::Codec>;
}

impl<T: ExtSerialize + Ord> ExtSerialize for FlatMultiSet<T> {
    type Codec = SeqCodec<Self, T::Codec>;
}

impl<K: ExtSerialize + Ord, V: ExtSerialize> ExtSerialize for BTreeMap<K, V> {
    type Codec = MapCodec<Self, K::Codec, V::Codec>;
}

impl<K: ExtSerialize + Ord, V: ExtSerialize> ExtSerialize for FlatMultiMap<K, V> {
    type Codec = MapCodec<Self, K::Codec, V::Codec>;
}

impl<A: ExtSerialize, B: ExtSerialize> ExtSerialize for (A, B) {
    type Codec = PairCodec<A::Codec, B::Codec>;
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]

    use super::*;

    fn codec<T: ExtSerialize>() -> T::Codec {
        T::Codec::default()
    }

    fn roundtrip<T: ExtSerialize>(format: SerializeFormat, value: &T) -> Option<T> {
        let ctx = Context::detached();
        let codec = codec::<T>();
        let text = codec.serialize_to_vec(format, value, &ctx);
        codec.unserialize(format, &text, &ctx).expect("no context needed")
    }

    #[test]
    fn test_sequence_of_integers() {
        let value: Vec<u32> = vec![1, 2, 300];
        let text = codec::<Vec<u32>>().serialize_to_vec(SerializeFormat::Internal, &value, &Context::detached());

        // 300 is 0x012c; neither byte needs escaping but the zero padding does
        assert_eq!(&text[..13], b"\x01\\0\\0\\0\0\x02\\0\\0\\0\0");
        assert_eq!(roundtrip(SerializeFormat::Internal, &value), Some(value));
    }

    #[test]
    fn test_empty_sequence_roundtrips() {
        let value: Vec<String> = Vec::new();
        assert_eq!(roundtrip(SerializeFormat::Persist, &value), Some(value));
    }

    #[test]
    fn test_malformed_elements_are_dropped() {
        let codec = codec::<Vec<u16>>();
        let ctx = Context::detached();
        // second field is a single byte, too short for a u16
        let text = escape::encode(&[vec![5u8, 0], vec![9u8], vec![7u8, 0]]);
        let value = codec.unserialize(SerializeFormat::Internal, &text, &ctx).unwrap();
        assert_eq!(value, Some(vec![5, 7]));
    }

    #[test]
    fn test_set_and_deque() {
        let set: BTreeSet<String> = ["#a", "#b"].iter().map(|s| s.to_string()).collect();
        assert_eq!(roundtrip(SerializeFormat::Persist, &set), Some(set));

        let deque: VecDeque<i8> = VecDeque::from(vec![-1, 0, 1]);
        assert_eq!(roundtrip(SerializeFormat::Internal, &deque), Some(deque));
    }

    #[test]
    fn test_pair_with_embedded_nul() {
        let value = (30u32, String::from("general\0ops"));
        assert_eq!(roundtrip(SerializeFormat::Internal, &value), Some(value));
    }

    #[test]
    fn test_pair_requires_two_fields() {
        let codec = codec::<(u8, String)>();
        let ctx = Context::detached();
        assert_eq!(codec.unserialize(SerializeFormat::Internal, b"", &ctx).unwrap(), None);

        let one = escape::encode(&[vec![1u8]]);
        assert_eq!(codec.unserialize(SerializeFormat::Internal, &one, &ctx).unwrap(), None);

        let three = escape::encode(&[vec![1u8], b"a".to_vec(), b"b".to_vec()]);
        assert_eq!(codec.unserialize(SerializeFormat::Internal, &three, &ctx).unwrap(), None);
    }

    #[test]
    fn test_pair_fails_when_element_fails() {
        let codec = codec::<(u32, String)>();
        let ctx = Context::detached();
        let text = escape::encode(&[vec![1u8, 2], b"label".to_vec()]);
        assert_eq!(codec.unserialize(SerializeFormat::Internal, &text, &ctx).unwrap(), None);
    }

    #[test]
    fn test_mapping_entries_encode_as_pairs() {
        let mut map = BTreeMap::new();
        map.insert(String::from("k"), 1u8);

        let ctx = Context::detached();
        let map_text = codec::<BTreeMap<String, u8>>().serialize_to_vec(SerializeFormat::Internal, &map, &ctx);
        let pair_text = codec::<(String, u8)>().serialize_to_vec(
            SerializeFormat::Internal,
            &(String::from("k"), 1u8),
            &ctx,
        );
        assert_eq!(map_text, escape::encode(&[pair_text]));
        assert_eq!(roundtrip(SerializeFormat::Persist, &map), Some(map));
    }

    #[test]
    fn test_mapping_keeps_first_duplicate() {
        let codec = codec::<BTreeMap<String, u8>>();
        let ctx = Context::detached();
        let pairs = self::codec::<(String, u8)>();
        let first = pairs.serialize_to_vec(SerializeFormat::Internal, &(String::from("k"), 1), &ctx);
        let second = pairs.serialize_to_vec(SerializeFormat::Internal, &(String::from("k"), 2), &ctx);
        let text = escape::encode(&[first, second]);

        let map = codec.unserialize(SerializeFormat::Internal, &text, &ctx).unwrap().unwrap();
        assert_eq!(map.get("k"), Some(&1));
    }

    #[test]
    fn test_multimap_keeps_duplicates() {
        let mut map = FlatMultiMap::new();
        map.insert(String::from("#chan"), String::from("alice"));
        map.insert(String::from("#chan"), String::from("bob"));
        map.insert(String::from("#a"), String::from("carol"));

        let back = roundtrip(SerializeFormat::Internal, &map).unwrap();
        assert_eq!(back, map);
        assert_eq!(back.get_all("#chan").count(), 2);
    }

    #[test]
    fn test_multiset_keeps_duplicates() {
        let set: FlatMultiSet<u64> = [3, 1, 3].into_iter().collect();
        let back = roundtrip(SerializeFormat::Persist, &set).unwrap();
        assert_eq!(back.iter().copied().collect::<Vec<_>>(), vec![1, 3, 3]);
    }

    #[test]
    fn test_serialization_is_deterministic() {
        let set: BTreeSet<u16> = [9, 4, 1].into_iter().collect();
        let ctx = Context::detached();
        let a = codec::<BTreeSet<u16>>().serialize_to_vec(SerializeFormat::Persist, &set, &ctx);
        let b = codec::<BTreeSet<u16>>().serialize_to_vec(SerializeFormat::Persist, &set, &ctx);
        assert_eq!(a, b);
    }
}
