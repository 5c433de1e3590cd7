//! # Persistence
//!
//! Writes every `Persist`-format value on every holder to disk and reads it
//! back into a running server.
//!
//! ## File Layout
//! ```text
//! [compression flag: 0 = none, 1 = lz4, 2 = zstd]
//! [encoding byte] [PersistDump]     (compressed as a whole when flagged)
//! ```
//!
//! Saves go to a temporary file that is renamed over the dump, so a crash never
//! leaves a half-written dump behind. On restore, records naming holders or
//! items this server does not have are skipped with a warning; everything else
//! still applies.

pub mod encoding;

use std::fs;
use std::io::ErrorKind;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::config::{PersistConfig, MAX_DUMP_SIZE};
use crate::core::SerializeFormat;
use crate::error::constants::{ERR_EMPTY_DUMP, ERR_UNSUPPORTED_DUMP_VERSION};
use crate::error::{ExtError, Result};
use crate::state::{ApplyReport, ServerState};
use crate::sync::MetadataRecord;
use crate::utils::compression::{self, CompressionKind};
use crate::utils::metrics::Timer;

pub use encoding::{DumpEncoding, MultiFormat};

/// Dump layout version
pub const DUMP_VERSION: u32 = 1;

const FLAG_UNCOMPRESSED: u8 = 0;

/// Everything written to disk in one save.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersistDump {
    pub version: u32,
    pub records: Vec<MetadataRecord>,
}

impl MultiFormat for PersistDump {}

/// Saves and restores a server's persistent metadata.
#[derive(Debug, Clone)]
pub struct PersistStore {
    config: PersistConfig,
}

impl PersistStore {
    pub fn new(config: PersistConfig) -> Self {
        Self { config }
    }

    pub fn path(&self) -> &Path {
        &self.config.path
    }

    /// Write every persistable value in `state`. Returns the record count.
    ///
    /// # Errors
    /// Encoding, compression and I/O failures. The previous dump is left intact.
    pub fn save(&self, state: &ServerState) -> Result<usize> {
        let _timer = Timer::start("persist_save");
        let dump = PersistDump {
            version: DUMP_VERSION,
            records: state.collect_records(SerializeFormat::Persist),
        };

        let body = dump.encode_with_header(self.config.encoding)?;
        let bytes = self.frame(&body)?;

        let path = &self.config.path;
        if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let tmp = path.with_extension("tmp");
        fs::write(&tmp, &bytes)?;
        fs::rename(&tmp, path)?;

        info!(
            path = %path.display(),
            records = dump.records.len(),
            bytes = bytes.len(),
            encoding = self.config.encoding.name(),
            "Saved extension dump"
        );
        Ok(dump.records.len())
    }

    /// Apply the dump on disk to `state`. A missing dump restores nothing.
    ///
    /// # Errors
    /// I/O, decompression and decoding failures, an unsupported dump version, and
    /// context mismatches raised while applying.
    pub fn load(&self, state: &mut ServerState) -> Result<ApplyReport> {
        let _timer = Timer::start("persist_load");
        let path = &self.config.path;
        let bytes = match fs::read(path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                info!(path = %path.display(), "No extension dump to restore");
                return Ok(ApplyReport::default());
            }
            Err(e) => return Err(e.into()),
        };

        let body = Self::unframe(&bytes)?;
        let (dump, encoding) = PersistDump::decode_with_header(&body)?;
        if dump.version != DUMP_VERSION {
            return Err(ExtError::DecodeError(format!(
                "{ERR_UNSUPPORTED_DUMP_VERSION}: {}",
                dump.version
            )));
        }

        let report = state.apply_records(SerializeFormat::Persist, &dump.records)?;
        info!(
            path = %path.display(),
            records = dump.records.len(),
            applied = report.applied,
            unknown_items = report.unknown_items,
            missing_holders = report.missing_holders,
            encoding = encoding.name(),
            "Restored extension dump"
        );
        Ok(report)
    }

    fn frame(&self, body: &[u8]) -> Result<Vec<u8>> {
        let (flag, payload) = match self.config.compression {
            Some(kind) => {
                let (out, compressed) =
                    compression::maybe_compress(body, kind, self.config.compression_threshold_bytes)?;
                (if compressed { kind.flag() } else { FLAG_UNCOMPRESSED }, out)
            }
            None => (FLAG_UNCOMPRESSED, body.to_vec()),
        };

        let mut framed = Vec::with_capacity(payload.len() + 1);
        framed.push(flag);
        framed.extend(payload);
        Ok(framed)
    }

    fn unframe(bytes: &[u8]) -> Result<Vec<u8>> {
        let (&flag, payload) = bytes
            .split_first()
            .ok_or_else(|| ExtError::DecodeError(ERR_EMPTY_DUMP.to_string()))?;
        if payload.len() > MAX_DUMP_SIZE {
            return Err(ExtError::DecodeError(format!(
                "Dump exceeds {MAX_DUMP_SIZE} bytes"
            )));
        }

        if flag == FLAG_UNCOMPRESSED {
            return Ok(payload.to_vec());
        }
        let kind = CompressionKind::from_flag(flag)
            .ok_or_else(|| ExtError::DecodeError(format!("Unknown compression flag: {flag}")))?;
        compression::decompress(payload, kind)
    }
}
