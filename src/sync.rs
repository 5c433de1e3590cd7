//! # Metadata Sync
//!
//! Turns a holder's attached values into metadata records and back.
//!
//! The same record shape carries a netburst (`Network`), a persistence dump
//! (`Persist`) and a same-process reload (`Internal`). Items that produce empty
//! text for a format are simply not emitted. On the receiving side a record is
//! resolved by item name through the local [`ExtensionManager`]; names it does
//! not know are ignored so that peers running newer feature units stay linked.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::core::SerializeFormat;
use crate::error::Result;
use crate::extension::ExtensionManager;
use crate::holder::{Holder, HolderRef};
use crate::utils::metrics::global_metrics;

/// One serialized value: `(holder, item name, text)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetadataRecord {
    pub target: HolderRef,
    pub key: String,
    pub value: Vec<u8>,
}

/// What happened to one applied record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyOutcome {
    /// Handed to the item; a malformed value still counts, the item skipped it
    Applied,
    /// No item of that name is registered here
    UnknownItem,
    /// The item exists but is for another holder category
    WrongCategory,
    /// `UserDisplay` text is never read back
    Refused,
}

/// Serialize every value attached to `holder` in `format`.
pub fn collect(holder: &dyn Holder, format: SerializeFormat) -> Vec<MetadataRecord> {
    let target = holder.holder_ref();
    holder
        .extensible()
        .iter()
        .filter_map(|(item, value)| {
            let text = item.serialize(format, holder, value);
            if text.is_empty() {
                return None;
            }
            Some(MetadataRecord {
                target: target.clone(),
                key: item.name().to_string(),
                value: text,
            })
        })
        .collect()
}

/// Apply one record to `holder`.
///
/// # Errors
/// Context mismatches raised by the item while rebuilding the value. Everything
/// else is reported through [`ApplyOutcome`].
pub fn apply(
    manager: &ExtensionManager,
    holder: &mut dyn Holder,
    format: SerializeFormat,
    record: &MetadataRecord,
) -> Result<ApplyOutcome> {
    if !format.is_readable() {
        return Ok(ApplyOutcome::Refused);
    }

    let Some(item) = manager.find(&record.key) else {
        global_metrics().unknown_record();
        if format == SerializeFormat::Persist {
            warn!(item = %record.key, holder = %record.target, "Dropping value for unknown item");
        } else {
            debug!(item = %record.key, holder = %record.target, %format, "Ignoring unknown item");
        }
        return Ok(ApplyOutcome::UnknownItem);
    };

    if item.kind() != holder.kind() {
        warn!(
            item = item.name(),
            expected = %item.kind(),
            holder = %record.target,
            "Ignoring value for wrong holder category"
        );
        return Ok(ApplyOutcome::WrongCategory);
    }

    item.unserialize(format, holder, &record.value)?;
    Ok(ApplyOutcome::Applied)
}

/// Human-readable `name: text` lines for every displayable value on `holder`.
pub fn display_lines(holder: &dyn Holder) -> Vec<String> {
    holder
        .extensible()
        .iter()
        .filter_map(|(item, value)| {
            let text = item.serialize(SerializeFormat::UserDisplay, holder, value);
            (!text.is_empty())
                .then(|| format!("{}: {}", item.name(), String::from_utf8_lossy(&text)))
        })
        .collect()
}
