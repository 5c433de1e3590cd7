//! Concrete extension item kinds.
//!
//! - [`LocalItem`]: typed values that never leave the process
//! - [`SimpleItem`]: typed values with a codec; never sent to the network
//! - [`LocalStringItem`]: one string per holder, never sent to the network
//! - [`LocalIntItem`]: one integer per holder, zero means unset
//! - [`StringItem`]: one string per holder, synchronized everywhere

use std::any::Any;
use std::marker::PhantomData;
use std::rc::Rc;

use tracing::debug;

use super::extensible::Extensible;
use super::item::{ExtensionItem, HolderKind, ItemInfo, Opaque};
use crate::core::{Codec, Context, ExtSerialize, SerializeFormat};
use crate::error::Result;
use crate::holder::Holder;
use crate::utils::metrics::global_metrics;

/// Typed access to the values an item stores.
///
/// `set` and `unset` free whatever they displace; `take` hands ownership back.
pub trait TypedItem: ExtensionItem + Sized + 'static {
    type Value: 'static;

    fn get<'a>(&self, ext: &'a Extensible) -> Option<&'a Self::Value> {
        ext.get(self)?.downcast_ref()
    }

    fn get_mut<'a>(&self, ext: &'a mut Extensible) -> Option<&'a mut Self::Value> {
        ext.get_mut(self)?.downcast_mut()
    }

    /// Attach `value`, freeing any previous value
    ///
    /// # Errors
    /// Category, registration and teardown errors from [`Extensible::set`].
    fn set(&self, ext: &mut Extensible, value: Self::Value) -> Result<()> {
        if let Some(old) = ext.set(self, Box::new(value))? {
            self.free(ext, old);
        }
        Ok(())
    }

    /// Detach and free the value, if any
    fn unset(&self, ext: &mut Extensible) {
        if let Some(old) = ext.unset(self) {
            self.free(ext, old);
        }
    }

    /// Detach the value and hand it to the caller
    fn take(&self, ext: &mut Extensible) -> Option<Self::Value> {
        let value = ext.unset(self)?;
        value.downcast::<Self::Value>().ok().map(|boxed| *boxed)
    }
}

/// Values that must never leave the process.
pub struct LocalItem<T> {
    info: ItemInfo,
    _value: PhantomData<fn() -> T>,
}

impl<T: 'static> LocalItem<T> {
    pub fn new(name: impl Into<String>, kind: HolderKind, owner: impl Into<String>) -> Rc<Self> {
        Rc::new_cyclic(|this| Self {
            info: ItemInfo::new(name, kind, owner, this),
            _value: PhantomData,
        })
    }
}

impl<T: 'static> ExtensionItem for LocalItem<T> {
    fn info(&self) -> &ItemInfo {
        &self.info
    }

    fn serialize(&self, _: SerializeFormat, _: &dyn Holder, _: &dyn Any) -> Vec<u8> {
        Vec::new()
    }

    fn unserialize(&self, _: SerializeFormat, _: &mut dyn Holder, _: &[u8]) -> Result<()> {
        Ok(())
    }

    fn free(&self, _: &Extensible, value: Opaque) {
        drop(value);
    }
}

impl<T: 'static> TypedItem for LocalItem<T> {
    type Value = T;
}

/// A typed value with a codec.
///
/// Serializes in every format except `Network`, whatever the codec could do.
pub struct SimpleItem<T: ExtSerialize> {
    info: ItemInfo,
    codec: T::Codec,
}

impl<T: ExtSerialize> SimpleItem<T> {
    pub fn new(name: impl Into<String>, kind: HolderKind, owner: impl Into<String>) -> Rc<Self> {
        Rc::new_cyclic(|this| Self {
            info: ItemInfo::new(name, kind, owner, this),
            codec: T::Codec::default(),
        })
    }
}

impl<T: ExtSerialize> ExtensionItem for SimpleItem<T> {
    fn info(&self) -> &ItemInfo {
        &self.info
    }

    fn serialize(&self, format: SerializeFormat, holder: &dyn Holder, value: &dyn Any) -> Vec<u8> {
        if format == SerializeFormat::Network {
            return Vec::new();
        }

        match value.downcast_ref::<T>() {
            Some(value) => self
                .codec
                .serialize_to_vec(format, value, &Context::new(holder, self)),
            None => Vec::new(),
        }
    }

    fn unserialize(
        &self,
        format: SerializeFormat,
        holder: &mut dyn Holder,
        text: &[u8],
    ) -> Result<()> {
        if matches!(format, SerializeFormat::Network | SerializeFormat::UserDisplay) {
            return Ok(());
        }

        let value = self
            .codec
            .unserialize(format, text, &Context::new(&*holder, self))?;
        match value {
            Some(value) => self.set(holder.extensible_mut(), value),
            None => {
                global_metrics().unserialize_skipped();
                debug!(item = self.name(), %format, "Skipping malformed value");
                Ok(())
            }
        }
    }

    fn free(&self, _: &Extensible, value: Opaque) {
        drop(value);
    }
}

impl<T: ExtSerialize> TypedItem for SimpleItem<T> {
    type Value = T;
}

/// One string per holder, kept off the network.
pub type LocalStringItem = SimpleItem<String>;

/// One integer per holder. Zero is the same as unset.
pub struct LocalIntItem {
    info: ItemInfo,
}

impl LocalIntItem {
    pub fn new(name: impl Into<String>, kind: HolderKind, owner: impl Into<String>) -> Rc<Self> {
        Rc::new_cyclic(|this| Self {
            info: ItemInfo::new(name, kind, owner, this),
        })
    }

    pub fn get(&self, ext: &Extensible) -> isize {
        ext.get(self)
            .and_then(|value| value.downcast_ref::<isize>())
            .copied()
            .unwrap_or(0)
    }

    /// Set the value, returning the previous one. Setting zero removes the entry.
    ///
    /// # Errors
    /// Category, registration and teardown errors from [`Extensible::set`].
    pub fn set(&self, ext: &mut Extensible, value: isize) -> Result<isize> {
        let old = if value == 0 {
            ext.unset(self)
        } else {
            ext.set(self, Box::new(value))?
        };
        Ok(old
            .and_then(|old| old.downcast::<isize>().ok())
            .map_or(0, |old| *old))
    }

    pub fn unset(&self, ext: &mut Extensible) {
        ext.unset(self);
    }
}

impl ExtensionItem for LocalIntItem {
    fn info(&self) -> &ItemInfo {
        &self.info
    }

    fn serialize(&self, format: SerializeFormat, _: &dyn Holder, value: &dyn Any) -> Vec<u8> {
        if format == SerializeFormat::Network {
            return Vec::new();
        }
        value
            .downcast_ref::<isize>()
            .map(|value| value.to_string().into_bytes())
            .unwrap_or_default()
    }

    fn unserialize(
        &self,
        format: SerializeFormat,
        holder: &mut dyn Holder,
        text: &[u8],
    ) -> Result<()> {
        if matches!(format, SerializeFormat::Network | SerializeFormat::UserDisplay) {
            return Ok(());
        }

        let parsed = std::str::from_utf8(text)
            .ok()
            .and_then(|text| text.trim().parse::<isize>().ok());
        match parsed {
            Some(value) => self.set(holder.extensible_mut(), value).map(|_| ()),
            None => {
                global_metrics().unserialize_skipped();
                debug!(item = self.name(), %format, "Skipping malformed integer");
                Ok(())
            }
        }
    }

    fn free(&self, _: &Extensible, value: Opaque) {
        drop(value);
    }
}

/// One string per holder, synchronized in every format including `Network`.
pub struct StringItem {
    info: ItemInfo,
}

impl StringItem {
    pub fn new(name: impl Into<String>, kind: HolderKind, owner: impl Into<String>) -> Rc<Self> {
        Rc::new_cyclic(|this| Self {
            info: ItemInfo::new(name, kind, owner, this),
        })
    }

    pub fn get<'a>(&self, ext: &'a Extensible) -> Option<&'a str> {
        ext.get(self)?.downcast_ref::<String>().map(String::as_str)
    }

    /// # Errors
    /// Category, registration and teardown errors from [`Extensible::set`].
    pub fn set(&self, ext: &mut Extensible, value: impl Into<String>) -> Result<()> {
        let value: String = value.into();
        if let Some(old) = ext.set(self, Box::new(value))? {
            self.free(ext, old);
        }
        Ok(())
    }

    pub fn unset(&self, ext: &mut Extensible) {
        if let Some(old) = ext.unset(self) {
            self.free(ext, old);
        }
    }
}

impl ExtensionItem for StringItem {
    fn info(&self) -> &ItemInfo {
        &self.info
    }

    fn serialize(&self, _: SerializeFormat, _: &dyn Holder, value: &dyn Any) -> Vec<u8> {
        value
            .downcast_ref::<String>()
            .map(|value| value.as_bytes().to_vec())
            .unwrap_or_default()
    }

    fn unserialize(
        &self,
        format: SerializeFormat,
        holder: &mut dyn Holder,
        text: &[u8],
    ) -> Result<()> {
        if format == SerializeFormat::UserDisplay {
            return Ok(());
        }

        if text.is_empty() {
            self.unset(holder.extensible_mut());
            return Ok(());
        }
        self.set(holder.extensible_mut(), String::from_utf8_lossy(text))
    }

    fn free(&self, _: &Extensible, value: Opaque) {
        drop(value);
    }
}
