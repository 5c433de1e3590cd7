//! # Value Codecs
//!
//! One codec per value shape, each turning a value into text for a
//! [`SerializeFormat`] and back.
//!
//! ## Policies
//! - **String**: passthrough in every format
//! - **Numeric / bool**: decimal text for `UserDisplay`, fixed-width little-endian
//!   binary otherwise
//! - **Primitive**: fixed-width binary in every format, for plain data structs
//! - **Opaque**: live handles; serializes to nothing and never reconstructs
//! - **User**: forwards to the type's own [`UserSerialize`] implementation
//!
//! `unserialize` reports malformed text as `Ok(None)`, which callers treat as
//! "skip, do not attach". `Err` is reserved for hard context mismatches raised by
//! user-defined types.

use std::fmt::Display;
use std::marker::PhantomData;
use std::str::FromStr;

use bincode::Options;
use bytes::{BufMut, BytesMut};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;

use super::format::SerializeFormat;
use crate::error::Result;
use crate::extension::ExtensionItem;
use crate::holder::Holder;

/// What a codec may consult besides the value itself.
///
/// Either side may be absent when a value is encoded outside of any holder.
#[derive(Clone, Copy, Default)]
pub struct Context<'a> {
    /// The object the value is attached to
    pub holder: Option<&'a dyn Holder>,
    /// The item describing the value
    pub item: Option<&'a dyn ExtensionItem>,
}

impl<'a> Context<'a> {
    /// Context for a value attached to `holder` through `item`
    pub fn new(holder: &'a dyn Holder, item: &'a dyn ExtensionItem) -> Self {
        Self {
            holder: Some(holder),
            item: Some(item),
        }
    }

    /// Context with neither holder nor item
    pub fn detached() -> Self {
        Self::default()
    }
}

/// A format-aware codec for one value shape.
pub trait Codec {
    /// The type this codec reads and writes
    type Value;

    /// Append the serialized form of `value` to `out`
    fn serialize(
        &self,
        format: SerializeFormat,
        value: &Self::Value,
        ctx: &Context<'_>,
        out: &mut BytesMut,
    );

    /// Rebuild a value from `text`
    ///
    /// # Errors
    /// Only for hard context mismatches; malformed text yields `Ok(None)`.
    fn unserialize(
        &self,
        format: SerializeFormat,
        text: &[u8],
        ctx: &Context<'_>,
    ) -> Result<Option<Self::Value>>;

    /// Serialize into a fresh buffer
    fn serialize_to_vec(
        &self,
        format: SerializeFormat,
        value: &Self::Value,
        ctx: &Context<'_>,
    ) -> Vec<u8> {
        let mut out = BytesMut::new();
        self.serialize(format, value, ctx, &mut out);
        out.to_vec()
    }
}

/// Associates a type with the codec used for it by default.
pub trait ExtSerialize: Sized + 'static {
    /// Default codec for this type
    type Codec: Codec<Value = Self> + Default + 'static;
}

/// Binary layout shared by every fixed-width codec: fixed integers, little
/// endian, exact length.
fn fixed_width() -> impl Options {
    bincode::DefaultOptions::new()
        .with_fixint_encoding()
        .with_little_endian()
        .reject_trailing_bytes()
}

fn write_fixed<T: Serialize>(value: &T, out: &mut BytesMut) {
    match fixed_width().serialize(value) {
        Ok(bytes) => out.put_slice(&bytes),
        Err(e) => debug!(error = %e, "Value has no fixed-width encoding"),
    }
}

fn read_fixed<T: DeserializeOwned>(text: &[u8]) -> Option<T> {
    match fixed_width().deserialize(text) {
        Ok(value) => Some(value),
        Err(e) => {
            debug!(error = %e, len = text.len(), "Malformed fixed-width value");
            None
        }
    }
}

fn parse_decimal<T: FromStr>(text: &[u8]) -> Option<T> {
    std::str::from_utf8(text).ok()?.trim().parse().ok()
}

/// Passthrough codec for strings.
#[derive(Debug, Clone, Copy, Default)]
pub struct StringCodec;

impl Codec for StringCodec {
    type Value = String;

    fn serialize(&self, _: SerializeFormat, value: &String, _: &Context<'_>, out: &mut BytesMut) {
        out.put_slice(value.as_bytes());
    }

    fn unserialize(
        &self,
        _: SerializeFormat,
        text: &[u8],
        _: &Context<'_>,
    ) -> Result<Option<String>> {
        Ok(Some(String::from_utf8_lossy(text).into_owned()))
    }
}

impl ExtSerialize for String {
    type Codec = StringCodec;
}

/// Fixed-width plain data in every format.
pub struct PrimitiveCodec<T>(PhantomData<fn() -> T>);

impl<T> Default for PrimitiveCodec<T> {
    fn default() -> Self {
        Self(PhantomData)
    }
}

impl<T: Serialize + DeserializeOwned> Codec for PrimitiveCodec<T> {
    type Value = T;

    fn serialize(&self, _: SerializeFormat, value: &T, _: &Context<'_>, out: &mut BytesMut) {
        write_fixed(value, out);
    }

    fn unserialize(&self, _: SerializeFormat, text: &[u8], _: &Context<'_>) -> Result<Option<T>> {
        Ok(read_fixed(text))
    }
}

/// Decimal text for humans, fixed-width binary everywhere else.
pub struct NumericCodec<T>(PhantomData<fn() -> T>);

impl<T> Default for NumericCodec<T> {
    fn default() -> Self {
        Self(PhantomData)
    }
}

impl<T> Codec for NumericCodec<T>
where
    T: Display + FromStr + Serialize + DeserializeOwned,
{
    type Value = T;

    fn serialize(&self, format: SerializeFormat, value: &T, _: &Context<'_>, out: &mut BytesMut) {
        if format == SerializeFormat::UserDisplay {
            out.put_slice(value.to_string().as_bytes());
        } else {
            write_fixed(value, out);
        }
    }

    fn unserialize(
        &self,
        format: SerializeFormat,
        text: &[u8],
        _: &Context<'_>,
    ) -> Result<Option<T>> {
        if format == SerializeFormat::UserDisplay {
            return Ok(parse_decimal(text));
        }
        Ok(read_fixed(text))
    }
}

macro_rules! numeric_ext_serialize {
    ($($ty:ty),* $(,)?) => {
        $(
            impl ExtSerialize for $ty {
                type Codec = NumericCodec<$ty>;
            }
        )*
    };
}

numeric_ext_serialize!(u8, u16, u32, u64, usize, i8, i16, i32, i64, isize);

/// Numeric codec with `"true"`/`"false"` display text.
#[derive(Debug, Clone, Copy, Default)]
pub struct BoolCodec;

impl Codec for BoolCodec {
    type Value = bool;

    fn serialize(&self, format: SerializeFormat, value: &bool, _: &Context<'_>, out: &mut BytesMut) {
        if format == SerializeFormat::UserDisplay {
            out.put_slice(if *value { b"true" } else { b"false" });
        } else {
            write_fixed(value, out);
        }
    }

    fn unserialize(
        &self,
        format: SerializeFormat,
        text: &[u8],
        _: &Context<'_>,
    ) -> Result<Option<bool>> {
        if format != SerializeFormat::UserDisplay {
            return Ok(read_fixed(text));
        }
        Ok(match text {
            b"true" | b"1" => Some(true),
            b"false" | b"0" => Some(false),
            _ => None,
        })
    }
}

impl ExtSerialize for bool {
    type Codec = BoolCodec;
}

/// Codec for values that cannot cross any boundary, such as live handles.
///
/// Serializes to nothing and never reconstructs a value.
pub struct OpaqueCodec<T>(PhantomData<fn() -> T>);

impl<T> Default for OpaqueCodec<T> {
    fn default() -> Self {
        Self(PhantomData)
    }
}

impl<T> Codec for OpaqueCodec<T> {
    type Value = T;

    fn serialize(&self, _: SerializeFormat, _: &T, _: &Context<'_>, _: &mut BytesMut) {}

    fn unserialize(&self, _: SerializeFormat, _: &[u8], _: &Context<'_>) -> Result<Option<T>> {
        Ok(None)
    }
}

impl<T: 'static> ExtSerialize for std::rc::Weak<T> {
    type Codec = OpaqueCodec<Self>;
}

/// Serialization supplied by the value type itself.
pub trait UserSerialize: Sized {
    /// Append the serialized form of `self` to `out`
    fn serialize_into(&self, format: SerializeFormat, ctx: &Context<'_>, out: &mut BytesMut);

    /// Rebuild a value
    ///
    /// # Errors
    /// Returns [`ExtError::ContextMismatch`](crate::error::ExtError::ContextMismatch)
    /// when the context cannot host the value at all.
    fn from_text(format: SerializeFormat, text: &[u8], ctx: &Context<'_>) -> Result<Option<Self>>;
}

/// Forwards to [`UserSerialize`].
pub struct UserCodec<T>(PhantomData<fn() -> T>);

impl<T> Default for UserCodec<T> {
    fn default() -> Self {
        Self(PhantomData)
    }
}

impl<T: UserSerialize> Codec for UserCodec<T> {
    type Value = T;

    fn serialize(&self, format: SerializeFormat, value: &T, ctx: &Context<'_>, out: &mut BytesMut) {
        value.serialize_into(format, ctx, out);
    }

    fn unserialize(
        &self,
        format: SerializeFormat,
        text: &[u8],
        ctx: &Context<'_>,
    ) -> Result<Option<T>> {
        T::from_text(format, text, ctx)
    }
}
