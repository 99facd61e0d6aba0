//! A deterministic, schema-directed binary serialization core.
//!
//! Values are encoded as field-number-indexed records (see [`Record`])
//! using a compact tag-plus-payload wire format: varint and zigzag-varint
//! scalars, fixed-width floats, length-prefixed strings/bytes, and
//! length-prefixed nested records, maps, and packed sequences. Deterministic
//! (canonical) mode is the default: fields are written in ascending number
//! order, zero-valued fields are elided, map entries are sorted by their
//! encoded key bytes, and NaN/negative-zero are canonicalized, so two
//! encoders agreeing on a value always produce identical bytes.
//!
//! Decoding never panics or allocates unboundedly on hostile input: every
//! length-bearing read is checked against a [`Limits`] profile before the
//! cursor advances, and nesting depth is bounded separately from message
//! size.
//!
//! ```
//! use wirecore::{Record, Reader, Writer, Tag, WireType, Result};
//!
//! struct Greeting {
//!     text: String,
//! }
//!
//! impl Record for Greeting {
//!     fn encode(&self, w: &mut Writer) {
//!         w.start_record();
//!         if !self.text.is_empty() {
//!             w.write_tag(1, WireType::Bytes);
//!             w.write_str(&self.text);
//!         }
//!         w.end_record();
//!     }
//!
//!     fn decode(r: &mut Reader) -> Result<Self> {
//!         let mut text = String::new();
//!         loop {
//!             match r.read_tag()? {
//!                 Tag::End => break,
//!                 Tag::Field { field_number: 1, wire_type: WireType::Bytes } => {
//!                     text = r.read_string()?;
//!                 }
//!                 Tag::Field { field_number, wire_type } => r.skip_unknown_field(field_number, wire_type)?,
//!             }
//!         }
//!         Ok(Greeting { text })
//!     }
//! }
//!
//! let bytes = wirecore::encode(&Greeting { text: "hi".into() }, &Default::default()).unwrap();
//! let back: Greeting = wirecore::decode(&bytes, &Default::default()).unwrap();
//! assert_eq!(back.text, "hi");
//! ```

mod depth;
mod envelope;
mod error;
mod float;
mod limits;
mod map;
mod packed;
mod record;
mod reader;
mod registry;
mod stream;
mod tag;
mod varint;
mod writer;

pub use error::{Error, Result};
pub use limits::Limits;
pub use reader::{BytesView, Reader, StrView};
pub use record::Record;
pub use registry::{Registry, FIRST_AUTO_TYPE_ID, NULL_TYPE_ID};
pub use stream::{FrameIterator, StreamReader, StreamWriter};
pub use tag::{Tag, WireType};
pub use writer::{LenMark, Writer};

pub mod maps {
    //! Deterministic map encode/decode, for `Record` impls with a
    //! keyed-collection field.
    pub use crate::map::{read_map, write_map};
}

pub mod packed_seq {
    //! Packed scalar-sequence encode/decode, for `Record` impls with an
    //! array-of-scalars field.
    pub use crate::packed::*;
}

pub mod registry_api {
    //! Process-wide polymorphic type registration, for `Record` impls
    //! used as a polymorphic (trait-object-like) field value.
    pub use crate::registry::{register_auto, register_with_id};
}

pub mod polymorphic {
    //! Polymorphic envelope encode/decode, built on [`crate::registry_api`].
    pub use crate::envelope::{
        decode, decode_as, encode, encode_null, read_field, read_field_as, write_field,
    };
}

/// Options controlling how [`encode`] serializes a value.
#[derive(Clone, Copy, Debug)]
pub struct EncodeOptions {
    /// When `true` (the default), output is canonical: ascending field
    /// order (the caller's responsibility), zero-value elision, and map
    /// entries sorted by encoded key bytes. When `false`, map entries are
    /// emitted in iteration order instead, trading determinism for one
    /// less sort per map on the hot path.
    pub deterministic_encoding: bool,
}

impl Default for EncodeOptions {
    fn default() -> Self {
        EncodeOptions {
            deterministic_encoding: true,
        }
    }
}

/// Options controlling how [`decode`] parses input.
#[derive(Clone, Copy, Debug)]
pub struct DecodeOptions {
    /// Resource ceilings enforced while decoding.
    pub limits: Limits,
}

impl Default for DecodeOptions {
    fn default() -> Self {
        DecodeOptions {
            limits: Limits::secure(),
        }
    }
}

/// Encode `value` to a fresh byte buffer.
pub fn encode<T: Record>(value: &T, opts: &EncodeOptions) -> Result<Vec<u8>> {
    let mut w = Writer::new();
    w.set_deterministic(opts.deterministic_encoding);
    value.encode(&mut w);
    w.finish()
}

/// Decode a `T` from `bytes`.
pub fn decode<T: Record>(bytes: &[u8], opts: &DecodeOptions) -> Result<T> {
    let mut r = Reader::new(bytes, opts.limits)?;
    let value = T::decode(&mut r)?;
    if let Some(e) = r.error() {
        return Err(e.clone());
    }
    Ok(value)
}

/// The number of bytes [`encode`] would produce for `value`. Currently
/// implemented as encode-and-measure; a future version may compute this
/// without materializing the buffer.
pub fn encoded_len<T: Record>(value: &T, opts: &EncodeOptions) -> Result<usize> {
    Ok(encode(value, opts)?.len())
}

#[cfg(test)]
mod example_types;
