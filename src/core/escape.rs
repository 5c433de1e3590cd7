//! # Escaping Codec
//!
//! Packs a sequence of byte strings into one NUL-delimited byte string and back.
//!
//! Each field is written with its NUL bytes replaced by `\0` and its escape
//! markers replaced by `\\`, then terminated by a single NUL. Decoding splits on
//! unescaped NULs and reverses the escapes, so any byte string survives, including
//! ones that themselves contain NULs or backslashes.
//!
//! ```rust
//! use chatd_ext::core::escape::{decode, encode};
//!
//! let fields = vec![b"general,ops".to_vec(), b"a\0b".to_vec()];
//! let blob = encode(&fields);
//! assert_eq!(decode(&blob), Some(fields));
//! ```

use bytes::{BufMut, BytesMut};

/// Terminates every field.
pub const FIELD_SEPARATOR: u8 = 0x00;

/// Introduces a two-byte escape sequence.
pub const ESCAPE_MARKER: u8 = b'\\';

/// Second byte of the escape for an embedded NUL.
const ESCAPED_NUL: u8 = b'0';

/// Write `field` with NULs and escape markers escaped. No separator is written.
pub fn escape_into(field: &[u8], out: &mut BytesMut) {
    out.reserve(field.len());
    for &byte in field {
        match byte {
            FIELD_SEPARATOR => out.put_slice(&[ESCAPE_MARKER, ESCAPED_NUL]),
            ESCAPE_MARKER => out.put_slice(&[ESCAPE_MARKER, ESCAPE_MARKER]),
            other => out.put_u8(other),
        }
    }
}

/// Write one escaped field followed by its separator.
#[inline]
pub fn write_field(field: &[u8], out: &mut BytesMut) {
    escape_into(field, out);
    out.put_u8(FIELD_SEPARATOR);
}

/// Encode a sequence of fields. `encode(&[])` is empty.
pub fn encode<F: AsRef<[u8]>>(fields: &[F]) -> Vec<u8> {
    let capacity = fields.iter().map(|f| f.as_ref().len() + 1).sum();
    let mut out = BytesMut::with_capacity(capacity);
    for field in fields {
        write_field(field.as_ref(), &mut out);
    }
    out.to_vec()
}

/// Split an encoded blob back into its fields.
///
/// Returns `None` for malformed input: an escape marker followed by anything but
/// `0` or `\`, a dangling escape marker, or trailing bytes without a separator.
pub fn decode(blob: &[u8]) -> Option<Vec<Vec<u8>>> {
    let mut fields = Vec::new();
    let mut current = Vec::new();
    let mut bytes = blob.iter().copied();

    while let Some(byte) = bytes.next() {
        match byte {
            FIELD_SEPARATOR => fields.push(std::mem::take(&mut current)),
            ESCAPE_MARKER => match bytes.next()? {
                ESCAPED_NUL => current.push(FIELD_SEPARATOR),
                ESCAPE_MARKER => current.push(ESCAPE_MARKER),
                _ => return None,
            },
            other => current.push(other),
        }
    }

    // Every field is terminated, so anything left over is a truncated blob
    if !current.is_empty() {
        return None;
    }

    Some(fields)
}
