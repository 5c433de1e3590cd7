//! # Holders
//!
//! Server objects that carry extension metadata: users, channels and channel
//! memberships. Each embeds exactly one [`Extensible`] and tears it down when
//! dropped.
//!
//! Membership and channel bookkeeping beyond what metadata needs lives
//! elsewhere; these types only carry identity and the attribute store.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::extension::{Extensible, HolderKind};

/// Stable identity of a holder, as carried in metadata records.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HolderRef {
    /// A user, by UUID
    User(String),
    /// A channel, by name
    Channel(String),
    /// A user's membership of a channel
    Membership { channel: String, user: String },
}

impl HolderRef {
    pub fn kind(&self) -> HolderKind {
        match self {
            HolderRef::User(_) => HolderKind::User,
            HolderRef::Channel(_) => HolderKind::Channel,
            HolderRef::Membership { .. } => HolderKind::Membership,
        }
    }
}

impl fmt::Display for HolderRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HolderRef::User(uuid) => write!(f, "{uuid}"),
            HolderRef::Channel(name) => write!(f, "{name}"),
            HolderRef::Membership { channel, user } => write!(f, "{channel}/{user}"),
        }
    }
}

/// An object capable of carrying attached metadata.
pub trait Holder {
    fn holder_ref(&self) -> HolderRef;

    /// Whether the object belongs to this server. Remote users are owned by a peer.
    fn is_local(&self) -> bool {
        true
    }

    fn extensible(&self) -> &Extensible;

    fn extensible_mut(&mut self) -> &mut Extensible;

    fn kind(&self) -> HolderKind {
        self.extensible().kind()
    }
}

/// A connected user.
#[derive(Debug)]
pub struct User {
    pub uuid: String,
    pub nick: String,
    local: bool,
    ext: Extensible,
}

impl User {
    /// A user connected to this server
    pub fn local(uuid: impl Into<String>, nick: impl Into<String>) -> Self {
        Self::new(uuid.into(), nick.into(), true)
    }

    /// A user introduced by a peer server
    pub fn remote(uuid: impl Into<String>, nick: impl Into<String>) -> Self {
        Self::new(uuid.into(), nick.into(), false)
    }

    fn new(uuid: String, nick: String, local: bool) -> Self {
        Self {
            uuid,
            nick,
            local,
            ext: Extensible::new(HolderKind::User),
        }
    }
}

impl Holder for User {
    fn holder_ref(&self) -> HolderRef {
        HolderRef::User(self.uuid.clone())
    }

    fn is_local(&self) -> bool {
        self.local
    }

    fn extensible(&self) -> &Extensible {
        &self.ext
    }

    fn extensible_mut(&mut self) -> &mut Extensible {
        &mut self.ext
    }
}

impl Drop for User {
    fn drop(&mut self) {
        self.ext.free_all();
    }
}

/// A channel.
#[derive(Debug)]
pub struct Channel {
    pub name: String,
    ext: Extensible,
}

impl Channel {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ext: Extensible::new(HolderKind::Channel),
        }
    }
}

impl Holder for Channel {
    fn holder_ref(&self) -> HolderRef {
        HolderRef::Channel(self.name.clone())
    }

    fn extensible(&self) -> &Extensible {
        &self.ext
    }

    fn extensible_mut(&mut self) -> &mut Extensible {
        &mut self.ext
    }
}

impl Drop for Channel {
    fn drop(&mut self) {
        self.ext.free_all();
    }
}

/// A user's membership of a channel.
#[derive(Debug)]
pub struct Membership {
    pub channel: String,
    pub user: String,
    ext: Extensible,
}

impl Membership {
    pub fn new(channel: impl Into<String>, user: impl Into<String>) -> Self {
        Self {
            channel: channel.into(),
            user: user.into(),
            ext: Extensible::new(HolderKind::Membership),
        }
    }
}

impl Holder for Membership {
    fn holder_ref(&self) -> HolderRef {
        HolderRef::Membership {
            channel: self.channel.clone(),
            user: self.user.clone(),
        }
    }

    fn extensible(&self) -> &Extensible {
        &self.ext
    }

    fn extensible_mut(&mut self) -> &mut Extensible {
        &mut self.ext
    }
}

impl Drop for Membership {
    fn drop(&mut self) {
        self.ext.free_all();
    }
}
