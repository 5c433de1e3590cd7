//! # Server State
//!
//! Owns the extension registry and every holder, and drives the module
//! boundary: loading, unloading and reloading feature units, and bulk
//! collection or application of metadata records.
//!
//! ## Unload sequence
//! 1. [`ExtensionManager::begin_unregister`] detaches the unit's items
//! 2. every user, channel and membership store unhooks them
//! 3. the unit drops its own handles, which finalizes the items

use std::collections::{BTreeMap, BTreeSet};

use tracing::{info, instrument, warn};

use crate::core::SerializeFormat;
use crate::error::{constants::ERR_HOLDER_NOT_FOUND, ExtError, Result};
use crate::extension::{Extensible, ExtensionManager, ItemRef};
use crate::holder::{Channel, Holder, HolderRef, Membership, User};
use crate::sync::{self, ApplyOutcome, MetadataRecord};

/// An independently loadable extension to server behavior.
///
/// Every item a unit hands out must name the unit as its owner, so that
/// unloading the unit finds them.
pub trait FeatureUnit {
    fn name(&self) -> &str;

    /// Items to register at load time
    fn items(&self) -> Vec<ItemRef>;
}

/// Tally of a batch of applied records.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ApplyReport {
    pub applied: usize,
    pub unknown_items: usize,
    pub missing_holders: usize,
    pub wrong_category: usize,
    pub refused: usize,
}

impl ApplyReport {
    fn record(&mut self, outcome: ApplyOutcome) {
        match outcome {
            ApplyOutcome::Applied => self.applied += 1,
            ApplyOutcome::UnknownItem => self.unknown_items += 1,
            ApplyOutcome::WrongCategory => self.wrong_category += 1,
            ApplyOutcome::Refused => self.refused += 1,
        }
    }
}

/// Holder tables, kept apart from the registry so both can be borrowed at once.
#[derive(Debug, Default)]
struct Holders {
    users: BTreeMap<String, User>,
    channels: BTreeMap<String, Channel>,
    memberships: BTreeMap<(String, String), Membership>,
}

impl Holders {
    fn iter(&self) -> impl Iterator<Item = &dyn Holder> {
        let users = self.users.values().map(|user| user as &dyn Holder);
        let channels = self.channels.values().map(|channel| channel as &dyn Holder);
        let memberships = self.memberships.values().map(|memb| memb as &dyn Holder);
        users.chain(channels).chain(memberships)
    }

    fn extensibles_mut(&mut self) -> impl Iterator<Item = &mut Extensible> {
        let users = self.users.values_mut().map(|user| user.extensible_mut());
        let channels = self.channels.values_mut().map(|channel| channel.extensible_mut());
        let memberships = self.memberships.values_mut().map(|memb| memb.extensible_mut());
        users.chain(channels).chain(memberships)
    }

    fn get_mut(&mut self, target: &HolderRef) -> Option<&mut dyn Holder> {
        match target {
            HolderRef::User(uuid) => self.users.get_mut(uuid).map(|user| user as &mut dyn Holder),
            HolderRef::Channel(name) => self
                .channels
                .get_mut(name)
                .map(|channel| channel as &mut dyn Holder),
            HolderRef::Membership { channel, user } => self
                .memberships
                .get_mut(&(channel.clone(), user.clone()))
                .map(|memb| memb as &mut dyn Holder),
        }
    }
}

/// The registry plus every live holder.
#[derive(Debug, Default)]
pub struct ServerState {
    extensions: ExtensionManager,
    holders: Holders,
    units: BTreeSet<String>,
}

impl ServerState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn extensions(&self) -> &ExtensionManager {
        &self.extensions
    }

    /// Names of the loaded feature units
    pub fn units(&self) -> impl Iterator<Item = &str> {
        self.units.iter().map(String::as_str)
    }

    /// Register every item of `unit`.
    ///
    /// Nothing is registered unless every name is free.
    ///
    /// # Errors
    /// [`ExtError::DuplicateRegistration`] if the unit is already loaded or any
    /// of its item names is taken.
    #[instrument(skip(self, unit), fields(unit = unit.name()))]
    pub fn load_unit(&mut self, unit: &dyn FeatureUnit) -> Result<()> {
        let name = unit.name();
        if self.units.contains(name) {
            return Err(ExtError::DuplicateRegistration(name.to_string()));
        }

        let items = unit.items();
        let mut seen = BTreeSet::new();
        for item in &items {
            if self.extensions.find(item.name()).is_some() || !seen.insert(item.name()) {
                return Err(ExtError::DuplicateRegistration(item.name().to_string()));
            }
        }

        let count = items.len();
        for item in items {
            self.extensions.register(item);
        }
        self.units.insert(name.to_string());
        info!(items = count, "Loaded feature unit");
        Ok(())
    }

    /// Unregister the unit's items and free every value they stored.
    ///
    /// Returns the number of values freed.
    ///
    /// # Errors
    /// [`ExtError::UnknownUnit`] if no unit of that name is loaded.
    #[instrument(skip(self))]
    pub fn unload_unit(&mut self, name: &str) -> Result<usize> {
        if !self.units.remove(name) {
            return Err(ExtError::UnknownUnit(name.to_string()));
        }

        let items = self.extensions.begin_unregister(name);
        let freed: usize = self
            .holders
            .extensibles_mut()
            .map(|ext| ext.unhook(&items))
            .sum();
        info!(items = items.len(), freed, "Unloaded feature unit");
        Ok(freed)
    }

    /// Replace a loaded unit with `unit`, carrying its values across in
    /// `Internal` format.
    ///
    /// Values the new unit cannot read back are dropped. Returns the number of
    /// values restored.
    ///
    /// # Errors
    /// [`ExtError::UnknownUnit`] if `name` is not loaded, registration errors from
    /// the new unit, and context mismatches raised while restoring.
    #[instrument(skip(self, unit), fields(new_unit = unit.name()))]
    pub fn reload_unit(&mut self, name: &str, unit: &dyn FeatureUnit) -> Result<usize> {
        if !self.units.contains(name) {
            return Err(ExtError::UnknownUnit(name.to_string()));
        }

        let saved: Vec<MetadataRecord> = self
            .collect_records(SerializeFormat::Internal)
            .into_iter()
            .filter(|record| {
                self.extensions
                    .find(&record.key)
                    .is_some_and(|item| item.owner() == name)
            })
            .collect();

        self.unload_unit(name)?;
        self.load_unit(unit)?;

        let report = self.apply_records(SerializeFormat::Internal, &saved)?;
        info!(saved = saved.len(), restored = report.applied, "Reloaded feature unit");
        Ok(report.applied)
    }

    /// Every value that may cross to a peer server
    pub fn netburst(&self) -> Vec<MetadataRecord> {
        self.collect_records(SerializeFormat::Network)
    }

    /// Apply a peer's netburst
    ///
    /// # Errors
    /// See [`ServerState::apply_records`].
    pub fn apply_netburst(&mut self, records: &[MetadataRecord]) -> Result<ApplyReport> {
        self.apply_records(SerializeFormat::Network, records)
    }

    /// Serialize every value on every holder in `format`
    pub fn collect_records(&self, format: SerializeFormat) -> Vec<MetadataRecord> {
        self.holders
            .iter()
            .flat_map(|holder| sync::collect(holder, format))
            .collect()
    }

    /// Apply records to the holders they name.
    ///
    /// Records for missing holders, unknown items or the wrong category are
    /// skipped and counted; the rest still apply.
    ///
    /// # Errors
    /// The first context mismatch raised by an item. Records before it stay applied.
    pub fn apply_records(
        &mut self,
        format: SerializeFormat,
        records: &[MetadataRecord],
    ) -> Result<ApplyReport> {
        let mut report = ApplyReport::default();
        for record in records {
            let Some(holder) = self.holders.get_mut(&record.target) else {
                warn!(holder = %record.target, item = %record.key, "{}", ERR_HOLDER_NOT_FOUND);
                report.missing_holders += 1;
                continue;
            };
            report.record(sync::apply(&self.extensions, holder, format, record)?);
        }
        Ok(report)
    }

    pub fn add_user(&mut self, user: User) {
        self.holders.users.insert(user.uuid.clone(), user);
    }

    /// Remove a user together with its memberships
    pub fn remove_user(&mut self, uuid: &str) -> Option<User> {
        self.holders.memberships.retain(|(_, user), _| user != uuid);
        self.holders.users.remove(uuid)
    }

    pub fn user(&self, uuid: &str) -> Option<&User> {
        self.holders.users.get(uuid)
    }

    pub fn user_mut(&mut self, uuid: &str) -> Option<&mut User> {
        self.holders.users.get_mut(uuid)
    }

    pub fn add_channel(&mut self, channel: Channel) {
        self.holders.channels.insert(channel.name.clone(), channel);
    }

    /// Remove a channel together with its memberships
    pub fn remove_channel(&mut self, name: &str) -> Option<Channel> {
        self.holders.memberships.retain(|(channel, _), _| channel != name);
        self.holders.channels.remove(name)
    }

    pub fn channel(&self, name: &str) -> Option<&Channel> {
        self.holders.channels.get(name)
    }

    pub fn channel_mut(&mut self, name: &str) -> Option<&mut Channel> {
        self.holders.channels.get_mut(name)
    }

    /// Add `user` to `channel`, returning the membership
    ///
    /// # Errors
    /// [`ExtError::UnknownHolder`] if either side does not exist.
    pub fn join(&mut self, channel: &str, user: &str) -> Result<&mut Membership> {
        if !self.holders.channels.contains_key(channel) {
            return Err(ExtError::UnknownHolder(channel.to_string()));
        }
        if !self.holders.users.contains_key(user) {
            return Err(ExtError::UnknownHolder(user.to_string()));
        }

        Ok(self
            .holders
            .memberships
            .entry((channel.to_string(), user.to_string()))
            .or_insert_with(|| Membership::new(channel, user)))
    }

    pub fn part(&mut self, channel: &str, user: &str) -> Option<Membership> {
        self.holders
            .memberships
            .remove(&(channel.to_string(), user.to_string()))
    }

    pub fn membership_mut(&mut self, channel: &str, user: &str) -> Option<&mut Membership> {
        self.holders
            .memberships
            .get_mut(&(channel.to_string(), user.to_string()))
    }

    /// Channels `user` is a member of
    pub fn channels_of<'a>(&'a self, user: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.holders
            .memberships
            .keys()
            .filter(move |(_, member)| member == user)
            .map(|(channel, _)| channel.as_str())
    }

    pub fn find_holder_mut(&mut self, target: &HolderRef) -> Option<&mut dyn Holder> {
        self.holders.get_mut(target)
    }

    /// Every user, channel and membership
    pub fn holders(&self) -> impl Iterator<Item = &dyn Holder> {
        self.holders.iter()
    }
}
