//! # Autojoin
//!
//! Joins local users to configured channels after they connect, optionally
//! after a delay. A pending delayed join is a [`JoinTimer`] attached to the user
//! through the `join_timer` item, so it survives a same-process reload and a
//! persistence round-trip, but is never sent to peers.

use std::rc::Rc;

use bytes::{BufMut, BytesMut};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::{AutojoinConfig, MAX_AUTOJOIN_DELAY};
use crate::core::{
    Context, ExtSerialize, PairCodec, PrimitiveCodec, SerializeFormat, StringCodec, UserCodec,
    UserSerialize,
};
use crate::error::{ExtError, Result};
use crate::extension::{HolderKind, ItemRef, SimpleItem, TypedItem};
use crate::holder::{Holder, HolderRef, User};
use crate::state::FeatureUnit;

/// Timer state, stored verbatim as fixed-width binary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimerSettings {
    /// Delay in seconds
    pub interval: u32,
    /// Unix time at which the timer fires
    pub trigger: i64,
}

impl ExtSerialize for TimerSettings {
    type Codec = PrimitiveCodec<Self>;
}

type DataCodec = PairCodec<PrimitiveCodec<TimerSettings>, StringCodec>;

/// A pending delayed join for one local user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinTimer {
    user: String,
    channels: String,
    settings: TimerSettings,
}

impl JoinTimer {
    pub fn new(user: impl Into<String>, channels: impl Into<String>, delay: u32, now: i64) -> Self {
        Self {
            user: user.into(),
            channels: channels.into(),
            settings: TimerSettings {
                interval: delay,
                trigger: now + i64::from(delay),
            },
        }
    }

    /// UUID of the user the timer belongs to
    pub fn user(&self) -> &str {
        &self.user
    }

    /// Comma-separated channel list
    pub fn channels(&self) -> &str {
        &self.channels
    }

    pub fn settings(&self) -> TimerSettings {
        self.settings
    }

    pub fn is_due(&self, now: i64) -> bool {
        now >= self.settings.trigger
    }
}

impl UserSerialize for JoinTimer {
    fn serialize_into(&self, format: SerializeFormat, ctx: &Context<'_>, out: &mut BytesMut) {
        if format == SerializeFormat::UserDisplay {
            out.put_slice(
                format!("{} at {}", self.channels, self.settings.trigger).as_bytes(),
            );
            return;
        }
        DataCodec::default().write_parts(format, &self.settings, &self.channels, ctx, out);
    }

    fn from_text(format: SerializeFormat, text: &[u8], ctx: &Context<'_>) -> Result<Option<Self>> {
        let holder = ctx.holder.ok_or_else(|| {
            ExtError::ContextMismatch(
                "Unable to find user while unserializing JoinTimer object".to_string(),
            )
        })?;

        let HolderRef::User(uuid) = holder.holder_ref() else {
            return Err(ExtError::ContextMismatch(format!(
                "JoinTimer cannot be attached to {}",
                holder.kind()
            )));
        };

        if !holder.is_local() {
            return Err(ExtError::ContextMismatch(
                "Attempt to unserialize JoinTimer for remote user".to_string(),
            ));
        }

        if ctx.item.is_none() {
            return Err(ExtError::ContextMismatch(
                "Unable to find join_timer ext while unserializing JoinTimer object".to_string(),
            ));
        }

        let Some((settings, channels)) = DataCodec::default().read_parts(format, text, ctx)? else {
            return Ok(None);
        };
        Ok(Some(Self {
            user: uuid,
            channels,
            settings,
        }))
    }
}

impl ExtSerialize for JoinTimer {
    type Codec = UserCodec<Self>;
}

/// Channel names in a comma-separated list that look like channels
pub fn join_list(chanlist: &str) -> Vec<String> {
    chanlist
        .split(',')
        .map(str::trim)
        .filter(|chan| chan.len() > 1 && chan.starts_with('#'))
        .map(String::from)
        .collect()
}

/// The autojoin feature unit.
pub struct AutojoinUnit {
    timer: Rc<SimpleItem<JoinTimer>>,
    channels: String,
    delay: u32,
}

impl AutojoinUnit {
    pub const NAME: &'static str = "autojoin";

    pub fn new(config: &AutojoinConfig) -> Self {
        let delay = config.delay.min(MAX_AUTOJOIN_DELAY).as_secs();
        Self {
            timer: SimpleItem::new("join_timer", HolderKind::User, Self::NAME),
            channels: config.channels.join(","),
            delay: u32::try_from(delay).unwrap_or(u32::MAX),
        }
    }

    pub fn timer_item(&self) -> &Rc<SimpleItem<JoinTimer>> {
        &self.timer
    }

    /// Called once a user has finished connecting.
    ///
    /// Returns the channels to join now. With a delay configured nothing is
    /// joined yet and a timer is attached instead. Remote users are ignored.
    ///
    /// # Errors
    /// Registration and teardown errors from attaching the timer.
    pub fn on_post_connect(&self, user: &mut User, now: i64) -> Result<Vec<String>> {
        if !user.is_local() || self.channels.is_empty() {
            return Ok(Vec::new());
        }

        if self.delay == 0 {
            return Ok(join_list(&self.channels));
        }

        let timer = JoinTimer::new(user.uuid.clone(), self.channels.clone(), self.delay, now);
        debug!(user = %user.uuid, trigger = timer.settings.trigger, "Scheduled autojoin");
        self.timer.set(user.extensible_mut(), timer)?;
        Ok(Vec::new())
    }

    /// Fire the user's timer if it is due.
    ///
    /// A fired timer is removed. Users who already joined something in the
    /// meantime are left alone.
    pub fn on_tick(&self, user: &mut User, now: i64, in_any_channel: bool) -> Vec<String> {
        let due = self
            .timer
            .get(user.extensible())
            .is_some_and(|timer| timer.is_due(now));
        if !due {
            return Vec::new();
        }

        match self.timer.take(user.extensible_mut()) {
            Some(timer) if !in_any_channel => join_list(&timer.channels),
            _ => Vec::new(),
        }
    }
}

impl FeatureUnit for AutojoinUnit {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn items(&self) -> Vec<ItemRef> {
        vec![self.timer.clone()]
    }
}
