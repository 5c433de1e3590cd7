//! # Core Serialization Components
//!
//! Format-aware value codecs and the escaping scheme they share.
//!
//! Every value an extension item stores can be turned into a byte string for one
//! of four [`SerializeFormat`]s and, for every format but `UserDisplay`, turned
//! back into a value. Composite values multiplex their parts into a single
//! string through the escaping codec.
//!
//! ## Components
//! - **Format**: the four serialization contexts
//! - **Escape**: NUL-delimited field framing with `\0` / `\\` escapes
//! - **Codec**: the `Codec` trait and scalar, primitive, opaque and user codecs
//! - **Collection**: sequence, set, mapping and pair adapters
//!
//! ## Field Framing
//! ```text
//! [escaped field 0] 0x00 [escaped field 1] 0x00 ...
//! ```

pub mod codec;
pub mod collection;
pub mod escape;
pub mod format;

pub use codec::{
    BoolCodec, Codec, Context, ExtSerialize, NumericCodec, OpaqueCodec, PrimitiveCodec,
    StringCodec, UserCodec, UserSerialize,
};
pub use collection::{Collection, MapCodec, Mapping, PairCodec, SeqCodec};
pub use format::SerializeFormat;
