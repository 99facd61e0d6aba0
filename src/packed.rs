//! Packed scalar sequences: spec §4.1's "elements use their natural width"
//! array encoding — a single BYTES field holding `<count><element><element>...`
//! with no per-element tag.

use crate::error::{Error, Result};
use crate::reader::Reader;
use crate::tag::WireType;
use crate::writer::Writer;

macro_rules! packed_varint {
    ($write_fn:ident, $read_fn:ident, $ty:ty, $write_elem:ident, $read_raw:ident) => {
        /// Write a packed sequence of this width at `field_number`.
        pub fn $write_fn(w: &mut Writer, field_number: u32, values: &[$ty]) {
            w.write_tag(field_number, WireType::Bytes);
            let mark = w.begin_len_delimited();
            w.write_raw_uvarint(values.len() as u64);
            for &v in values {
                w.$write_elem(v);
            }
            w.end_len_delimited(mark);
        }

        /// Read a packed sequence of this width (the field tag must already
        /// have been consumed).
        pub fn $read_fn(r: &mut Reader) -> Result<Vec<$ty>> {
            let view = r.read_bytes_view()?;
            let bytes = view.get(r)?;
            let mut sub = Reader::new(bytes, r.limits())?;
            let count = sub.read_packed_count(1)?;
            let mut out = Vec::with_capacity(count.min(4096));
            for _ in 0..count {
                out.push(sub.$read_raw()?);
            }
            if let Some(e) = sub.error() {
                return Err(e.clone());
            }
            Ok(out)
        }
    };
}

macro_rules! packed_fixed {
    ($write_fn:ident, $read_fn:ident, $ty:ty, $write_elem:ident, $read_elem:ident, $size:expr) => {
        /// Write a packed sequence of this width at `field_number`.
        pub fn $write_fn(w: &mut Writer, field_number: u32, values: &[$ty]) {
            w.write_tag(field_number, WireType::Bytes);
            let mark = w.begin_len_delimited();
            w.write_raw_uvarint(values.len() as u64);
            for &v in values {
                w.$write_elem(v);
            }
            w.end_len_delimited(mark);
        }

        /// Read a packed sequence of this width (the field tag must already
        /// have been consumed).
        pub fn $read_fn(r: &mut Reader) -> Result<Vec<$ty>> {
            let view = r.read_bytes_view()?;
            let bytes = view.get(r)?;
            let mut sub = Reader::new(bytes, r.limits())?;
            let count = sub.read_packed_count($size)?;
            let mut out = Vec::with_capacity(count.min(4096));
            for _ in 0..count {
                out.push(sub.$read_elem()?);
            }
            if let Some(e) = sub.error() {
                return Err(e.clone());
            }
            Ok(out)
        }
    };
}

packed_varint!(write_packed_bool, read_packed_bool, bool, write_bool, read_bool);
packed_varint!(write_packed_u8, read_packed_u8, u8, write_u8, read_u8);
packed_varint!(write_packed_u16, read_packed_u16, u16, write_u16, read_u16);
packed_varint!(write_packed_u32, read_packed_u32, u32, write_u32, read_u32);
packed_varint!(write_packed_u64, read_packed_u64, u64, write_u64, read_u64);
packed_varint!(write_packed_i8, read_packed_i8, i8, write_i8, read_i8);
packed_varint!(write_packed_i16, read_packed_i16, i16, write_i16, read_i16);
packed_varint!(write_packed_i32, read_packed_i32, i32, write_i32, read_i32);
packed_varint!(write_packed_i64, read_packed_i64, i64, write_i64, read_i64);
packed_fixed!(write_packed_f32, read_packed_f32, f32, write_f32, read_f32, 4);
packed_fixed!(write_packed_f64, read_packed_f64, f64, write_f64, read_f64, 8);

/// A count large enough that `count * element_size` would overflow `usize`
/// was rejected, so callers can't be tricked into allocating or reading
/// based on a bogus declared length. Surfaced as its own error variant
/// rather than silently clamped (spec §4.4).
pub fn reject_if_would_overflow(count: u64, element_size: usize) -> Result<()> {
    if element_size > 0 && count > (usize::MAX / element_size) as u64 {
        return Err(Error::ElementCountOverflow {
            count,
            element_size,
        });
    }
    Ok(())
}
