//! # Dump Encodings
//!
//! How a persistence dump is laid out on disk. Bincode is compact and the
//! default; JSON is there for inspecting or hand-editing a dump.
//!
//! A dump starts with one encoding byte so a reader does not need to be told
//! which one was used:
//! ```text
//! [encoding byte] [encoded dump]
//! ```

use serde::{Deserialize, Serialize};

use crate::error::constants::{ERR_EMPTY_DUMP, ERR_UNKNOWN_ENCODING};
use crate::error::{ExtError, Result};

/// Supported dump encodings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DumpEncoding {
    #[default]
    Bincode,
    Json,
}

impl DumpEncoding {
    /// Identifier byte written ahead of the dump
    pub fn format_byte(self) -> u8 {
        match self {
            DumpEncoding::Bincode => 0x01,
            DumpEncoding::Json => 0x02,
        }
    }

    pub fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            0x01 => Some(DumpEncoding::Bincode),
            0x02 => Some(DumpEncoding::Json),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            DumpEncoding::Bincode => "bincode",
            DumpEncoding::Json => "json",
        }
    }
}

/// Types that can be written in any [`DumpEncoding`]
pub trait MultiFormat: Serialize + for<'de> Deserialize<'de> + Sized {
    /// # Errors
    /// Encoder failures from bincode or serde_json.
    fn encode(&self, encoding: DumpEncoding) -> Result<Vec<u8>> {
        Ok(match encoding {
            DumpEncoding::Bincode => bincode::serialize(self)?,
            DumpEncoding::Json => serde_json::to_vec_pretty(self)?,
        })
    }

    /// Encode behind an encoding byte
    ///
    /// # Errors
    /// See [`MultiFormat::encode`].
    fn encode_with_header(&self, encoding: DumpEncoding) -> Result<Vec<u8>> {
        let mut data = vec![encoding.format_byte()];
        data.extend(self.encode(encoding)?);
        Ok(data)
    }

    /// # Errors
    /// Decoder failures from bincode or serde_json.
    fn decode(data: &[u8], encoding: DumpEncoding) -> Result<Self> {
        Ok(match encoding {
            DumpEncoding::Bincode => bincode::deserialize(data)?,
            DumpEncoding::Json => serde_json::from_slice(data)?,
        })
    }

    /// Decode data written by [`MultiFormat::encode_with_header`]
    ///
    /// # Errors
    /// [`ExtError::DecodeError`] for empty input or an unknown encoding byte,
    /// plus decoder failures.
    fn decode_with_header(data: &[u8]) -> Result<(Self, DumpEncoding)> {
        let (&byte, payload) = data
            .split_first()
            .ok_or_else(|| ExtError::DecodeError(ERR_EMPTY_DUMP.to_string()))?;
        let encoding = DumpEncoding::from_byte(byte)
            .ok_or_else(|| ExtError::DecodeError(format!("{ERR_UNKNOWN_ENCODING}: {byte:#04x}")))?;

        Ok((Self::decode(payload, encoding)?, encoding))
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Sample {
        key: String,
        value: Vec<u8>,
    }

    impl MultiFormat for Sample {}

    #[test]
    fn test_format_byte_roundtrip() {
        for encoding in [DumpEncoding::Bincode, DumpEncoding::Json] {
            assert_eq!(DumpEncoding::from_byte(encoding.format_byte()), Some(encoding));
        }
        assert_eq!(DumpEncoding::from_byte(0x7f), None);
        assert_eq!(DumpEncoding::default(), DumpEncoding::Bincode);
    }

    #[test]
    fn test_header_detects_encoding() {
        let sample = Sample {
            key: "swhois".into(),
            value: vec![0, 1, 2],
        };
        for encoding in [DumpEncoding::Bincode, DumpEncoding::Json] {
            let bytes = sample.encode_with_header(encoding).unwrap();
            let (decoded, detected) = Sample::decode_with_header(&bytes).unwrap();
            assert_eq!(decoded, sample);
            assert_eq!(detected, encoding);
        }
    }

    #[test]
    fn test_bad_header() {
        assert!(matches!(Sample::decode_with_header(&[]), Err(ExtError::DecodeError(_))));
        assert!(matches!(Sample::decode_with_header(&[0x09, 1]), Err(ExtError::DecodeError(_))));
    }
}
