//! The `Record` trait: the hand-written analogue of a generated message
//! type. A record owns its own field layout — which field numbers exist,
//! their wire types, and the zero/`None`-elision rule for each — and
//! implements [`Record::encode`]/[`Record::decode`] directly against a
//! [`Writer`]/[`Reader`], the way a `prost::Message` impl would against a
//! protobuf wire format. There is no derive macro here: callers write the
//! field list once, in ascending field-number order, the same order the
//! encoder is required to honor for determinism (spec §4.3).

use crate::error::Result;
use crate::reader::Reader;
use crate::tag::WireType;
use crate::writer::Writer;

/// A type with a field-number-indexed wire encoding.
///
/// `encode` must write tags/values in ascending field-number order and
/// terminate with the record's end marker (typically via
/// [`Writer::start_record`]/[`Writer::end_record`]); `decode` must read
/// fields until [`crate::tag::Tag::End`], tolerating any subset of known
/// fields being absent and skipping (or rejecting, under
/// `strict_unknown_fields`) field numbers it doesn't recognize.
pub trait Record: Sized {
    /// Encode `self`'s fields into `w`, including the end marker.
    fn encode(&self, w: &mut Writer);
    /// Decode an instance from `r`, consuming up to and including the end
    /// marker.
    fn decode(r: &mut Reader) -> Result<Self>;
}

/// Encode `value` as a nested (embedded) record field at `field_number`:
/// a BYTES-typed field whose payload is `value`'s own field list.
pub fn write_nested<T: Record>(w: &mut Writer, field_number: u32, value: &T) {
    w.write_tag(field_number, WireType::Bytes);
    let mark = w.begin_len_delimited();
    value.encode(w);
    w.end_len_delimited(mark);
}

/// Decode a nested (embedded) record field at the reader's current
/// position (the tag must already have been consumed). Enforces the
/// nesting-depth limit around the recursive decode, per spec §4.4.
pub fn read_nested<T: Record>(r: &mut Reader) -> Result<T> {
    let view = r.read_bytes_view()?;
    let bytes = view.get(r)?;
    r.enter_nested()?;
    let mut sub = Reader::new_nested(bytes, r.limits(), r.depth())?;
    let value = T::decode(&mut sub)?;
    if let Some(e) = sub.error() {
        return Err(e.clone());
    }
    r.exit_nested();
    Ok(value)
}

/// Encode `value` as the top-level message: just its own field list, with
/// no outer length prefix (spec §4.5: a top-level message is a bare
/// record).
pub fn encode<T: Record>(value: &T) -> Result<Vec<u8>> {
    let mut w = Writer::new();
    value.encode(&mut w);
    w.finish()
}

/// Decode a top-level message from `bytes`.
pub fn decode<T: Record>(r: &mut Reader) -> Result<T> {
    let value = T::decode(r)?;
    if let Some(e) = r.error() {
        return Err(e.clone());
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::limits::Limits;
    use crate::tag::Tag;

    struct Point {
        x: i32,
        y: i32,
    }

    impl Record for Point {
        fn encode(&self, w: &mut Writer) {
            w.start_record();
            if self.x != 0 {
                w.write_tag(1, WireType::SVarint);
                w.write_i32(self.x);
            }
            if self.y != 0 {
                w.write_tag(2, WireType::SVarint);
                w.write_i32(self.y);
            }
            w.end_record();
        }

        fn decode(r: &mut Reader) -> Result<Self> {
            let mut x = 0;
            let mut y = 0;
            loop {
                match r.read_tag()? {
                    Tag::End => break,
                    Tag::Field {
                        field_number: 1,
                        wire_type: WireType::SVarint,
                    } => x = r.read_i32()?,
                    Tag::Field {
                        field_number: 2,
                        wire_type: WireType::SVarint,
                    } => y = r.read_i32()?,
                    Tag::Field { field_number, wire_type } => r.skip_unknown_field(field_number, wire_type)?,
                }
            }
            Ok(Point { x, y })
        }
    }

    struct Line {
        start: Point,
        end: Point,
    }

    impl Record for Line {
        fn encode(&self, w: &mut Writer) {
            w.start_record();
            w.write_tag(1, WireType::Bytes);
            let mark = w.begin_len_delimited();
            self.start.encode(w);
            w.end_len_delimited(mark);
            write_nested(w, 2, &self.end);
            w.end_record();
        }

        fn decode(r: &mut Reader) -> Result<Self> {
            let mut start = None;
            let mut end = None;
            loop {
                match r.read_tag()? {
                    Tag::End => break,
                    Tag::Field {
                        field_number: 1,
                        wire_type: WireType::Bytes,
                    } => start = Some(read_nested(r)?),
                    Tag::Field {
                        field_number: 2,
                        wire_type: WireType::Bytes,
                    } => end = Some(read_nested(r)?),
                    Tag::Field { field_number, wire_type } => r.skip_unknown_field(field_number, wire_type)?,
                }
            }
            Ok(Line {
                start: start.unwrap_or(Point { x: 0, y: 0 }),
                end: end.unwrap_or(Point { x: 0, y: 0 }),
            })
        }
    }

    #[test]
    fn zero_valued_scalar_fields_are_elided() {
        let p = Point { x: 0, y: 0 };
        let bytes = encode(&p).unwrap();
        assert_eq!(bytes, vec![0x00], "both fields zero-elided, just the end marker remains");
    }

    #[test]
    fn nonzero_fields_round_trip() {
        let p = Point { x: 5, y: -7 };
        let bytes = encode(&p).unwrap();
        let mut r = Reader::new(&bytes, Limits::secure()).unwrap();
        let decoded: Point = decode(&mut r).unwrap();
        assert_eq!(decoded.x, 5);
        assert_eq!(decoded.y, -7);
    }

    #[test]
    fn nested_records_round_trip() {
        let line = Line {
            start: Point { x: 1, y: 2 },
            end: Point { x: 3, y: 4 },
        };
        let bytes = encode(&line).unwrap();
        let mut r = Reader::new(&bytes, Limits::secure()).unwrap();
        let decoded: Line = decode(&mut r).unwrap();
        assert_eq!(decoded.start.x, 1);
        assert_eq!(decoded.end.y, 4);
    }

    #[derive(Debug)]
    struct Chain {
        inner: Option<Box<Chain>>,
    }

    impl Record for Chain {
        fn encode(&self, w: &mut Writer) {
            w.start_record();
            if let Some(inner) = &self.inner {
                write_nested(w, 1, inner.as_ref());
            }
            w.end_record();
        }

        fn decode(r: &mut Reader) -> Result<Self> {
            let mut inner = None;
            loop {
                match r.read_tag()? {
                    Tag::End => break,
                    Tag::Field {
                        field_number: 1,
                        wire_type: WireType::Bytes,
                    } => inner = Some(Box::new(read_nested(r)?)),
                    Tag::Field { field_number, wire_type } => r.skip_unknown_field(field_number, wire_type)?,
                }
            }
            Ok(Chain { inner })
        }
    }

    fn chain_of(depth: usize) -> Chain {
        let mut chain = Chain { inner: None };
        for _ in 0..depth {
            chain = Chain {
                inner: Some(Box::new(chain)),
            };
        }
        chain
    }

    // Each `read_nested` call used to parse its sub-payload with a brand
    // new `Reader`, which restarted depth accounting at 0 instead of
    // continuing from the parent's depth — so cumulative recursion depth
    // across `Record::decode` calls was never actually bounded.
    #[test]
    fn cumulative_nesting_depth_is_enforced_across_read_nested_calls() {
        let limits = Limits {
            max_depth: 3,
            ..Limits::secure()
        };
        let bytes = encode(&chain_of(5)).unwrap();

        let mut r = Reader::new(&bytes, limits).unwrap();
        let err = decode::<Chain>(&mut r).unwrap_err();
        assert!(matches!(err, Error::MaxDepthExceeded { max: 3 }));
    }

    #[test]
    fn nesting_within_the_depth_limit_still_decodes() {
        let limits = Limits {
            max_depth: 10,
            ..Limits::secure()
        };
        let bytes = encode(&chain_of(5)).unwrap();

        let mut r = Reader::new(&bytes, limits).unwrap();
        let decoded: Chain = decode(&mut r).unwrap();
        let mut depth = 0;
        let mut cur = &decoded;
        while let Some(inner) = &cur.inner {
            depth += 1;
            cur = inner;
        }
        assert_eq!(depth, 5);
    }

    #[test]
    fn unknown_field_is_skipped_not_rejected_by_default() {
        let mut w = Writer::new();
        w.start_record();
        w.write_tag(1, WireType::SVarint);
        w.write_i32(9);
        w.write_tag(99, WireType::Varint);
        w.write_u64(12345);
        w.end_record();
        let bytes = w.finish().unwrap();

        let mut r = Reader::new(&bytes, Limits::secure()).unwrap();
        let decoded: Point = decode(&mut r).unwrap();
        assert_eq!(decoded.x, 9);
    }
}
