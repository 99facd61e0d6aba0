//! The reader: a bounded cursor over a borrowed buffer, with resource
//! limits, nesting-depth tracking, and generation-stamped borrowed views.

use byteorder::{LittleEndian, ReadBytesExt};

use crate::depth::DepthTracker;
use crate::error::{Error, Result};
use crate::limits::Limits;
use crate::tag::{read_tag, Tag, WireType};
use crate::varint::{read_svarint, read_uvarint, read_uvarint32};

/// A zero-copy view into a string previously read from a [`Reader`]'s
/// buffer. Valid only as long as the reader has not been [`Reader::reset`]
/// since the view was issued — call [`StrView::get`] to check and
/// dereference.
#[derive(Clone, Copy, Debug)]
pub struct StrView<'a> {
    bytes: &'a str,
    generation: u64,
}

impl<'a> StrView<'a> {
    /// `true` if the reader that issued this view has not since been reset.
    pub fn is_valid(&self, reader: &Reader<'_>) -> bool {
        self.generation == reader.generation
    }

    /// Dereference the view, failing with [`Error::UseAfterReset`] if the
    /// issuing reader has since been reset onto a different buffer.
    pub fn get(&self, reader: &Reader<'_>) -> Result<&'a str> {
        if self.is_valid(reader) {
            Ok(self.bytes)
        } else {
            Err(Error::UseAfterReset)
        }
    }
}

/// A zero-copy view into a byte sequence previously read from a [`Reader`]'s
/// buffer. See [`StrView`] for the lifetime discipline.
#[derive(Clone, Copy, Debug)]
pub struct BytesView<'a> {
    bytes: &'a [u8],
    generation: u64,
}

impl<'a> BytesView<'a> {
    /// `true` if the reader that issued this view has not since been reset.
    pub fn is_valid(&self, reader: &Reader<'_>) -> bool {
        self.generation == reader.generation
    }

    /// Dereference the view, failing with [`Error::UseAfterReset`] if the
    /// issuing reader has since been reset onto a different buffer.
    pub fn get(&self, reader: &Reader<'_>) -> Result<&'a [u8]> {
        if self.is_valid(reader) {
            Ok(self.bytes)
        } else {
            Err(Error::UseAfterReset)
        }
    }
}

/// A bounded parser over a borrowed byte slice.
#[derive(Debug)]
pub struct Reader<'a> {
    buf: &'a [u8],
    pos: usize,
    error: Option<Error>,
    generation: u64,
    limits: Limits,
    depth: DepthTracker,
}

impl<'a> Reader<'a> {
    /// Create a reader over `buf`, enforcing `limits`. Fails immediately
    /// if `buf` exceeds `limits.max_message_size`.
    pub fn new(buf: &'a [u8], limits: Limits) -> Result<Self> {
        if buf.len() > limits.max_message_size {
            return Err(Error::MaxMessageSizeExceeded {
                max: limits.max_message_size,
                actual: buf.len(),
            });
        }
        Ok(Reader {
            buf,
            pos: 0,
            error: None,
            generation: 0,
            depth: DepthTracker::new(limits.max_depth),
            limits,
        })
    }

    /// Create a reader over `buf` whose depth accounting continues from
    /// `starting_depth` rather than 0. Used to parse a nested,
    /// length-delimited payload with its own `Reader` (needed for its own
    /// borrow lifetime) while still enforcing one cumulative `max_depth`
    /// ceiling across the whole recursive decode, not one ceiling per
    /// `Reader` instance. `starting_depth` is normally the parent reader's
    /// [`Reader::depth`] immediately after [`Reader::enter_nested`].
    pub(crate) fn new_nested(buf: &'a [u8], limits: Limits, starting_depth: usize) -> Result<Self> {
        if buf.len() > limits.max_message_size {
            return Err(Error::MaxMessageSizeExceeded {
                max: limits.max_message_size,
                actual: buf.len(),
            });
        }
        Ok(Reader {
            buf,
            pos: 0,
            error: None,
            generation: 0,
            depth: DepthTracker::new_at(limits.max_depth, starting_depth),
            limits,
        })
    }

    /// Current nesting depth (number of unmatched [`Reader::enter_nested`]
    /// calls).
    pub(crate) fn depth(&self) -> usize {
        self.depth.depth()
    }

    /// Re-target the reader at a new buffer, incrementing the generation
    /// counter and invalidating every [`StrView`]/[`BytesView`] issued
    /// before this call.
    pub fn reset(&mut self, buf: &'a [u8], limits: Limits) -> Result<()> {
        if buf.len() > limits.max_message_size {
            return Err(Error::MaxMessageSizeExceeded {
                max: limits.max_message_size,
                actual: buf.len(),
            });
        }
        self.buf = buf;
        self.pos = 0;
        self.error = None;
        self.generation = self.generation.wrapping_add(1);
        self.limits = limits;
        self.depth = DepthTracker::new(limits.max_depth);
        Ok(())
    }

    /// The active resource limits.
    pub fn limits(&self) -> Limits {
        self.limits
    }

    /// Current byte offset within the buffer.
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Bytes remaining between the cursor and the end of the buffer.
    pub fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    /// The latched error, if a previous read failed.
    pub fn error(&self) -> Option<&Error> {
        self.error.as_ref()
    }

    fn fail<T>(&mut self, e: Error) -> Result<T> {
        if self.error.is_none() {
            self.error = Some(e.clone());
        }
        Err(e)
    }

    fn check_latched<T>(&self) -> Result<Option<T>> {
        if let Some(e) = &self.error {
            return Err(e.clone());
        }
        Ok(None)
    }

    /// Bound-check and return a sub-slice of `n` bytes at the cursor,
    /// advancing past it. The bound check happens before the cursor
    /// advances.
    fn take(&mut self, n: usize) -> Result<&'a [u8]> {
        self.check_latched::<()>()?;
        if self.pos + n > self.buf.len() {
            return self.fail(Error::UnexpectedEndOfInput {
                position: self.pos,
                requested: n,
                remaining: self.buf.len() - self.pos,
            });
        }
        let slice = &self.buf[self.pos..self.pos + n];
        self.pos += n;
        Ok(slice)
    }

    // --- tags ---

    /// Read one tag, dispatching to [`Tag::End`] at the record terminator.
    pub fn read_tag(&mut self) -> Result<Tag> {
        self.check_latched::<()>()?;
        match read_tag(self.buf, &mut self.pos) {
            Ok(t) => Ok(t),
            Err(e) => self.fail(e),
        }
    }

    /// Enter one level of record/length-prefixed nesting. Must be paired
    /// with [`Reader::exit_nested`].
    pub fn enter_nested(&mut self) -> Result<()> {
        self.check_latched::<()>()?;
        match self.depth.enter() {
            Ok(()) => Ok(()),
            Err(e) => self.fail(e),
        }
    }

    /// Exit one level of nesting entered with [`Reader::enter_nested`].
    pub fn exit_nested(&mut self) {
        self.depth.exit();
    }

    /// Skip the payload of a field given its wire type, using the spec
    /// §4.4 skip-unknown algorithm. Does not consult
    /// `strict_unknown_fields`; prefer [`Reader::skip_unknown_field`] from
    /// a `Record::decode` loop's catch-all arm.
    pub fn skip_field(&mut self, wire_type: WireType) -> Result<()> {
        self.check_latched::<()>()?;
        match wire_type {
            WireType::Varint | WireType::SVarint => {
                self.read_raw_uvarint()?;
            }
            WireType::Fixed32 => {
                self.take(4)?;
            }
            WireType::Fixed64 => {
                self.take(8)?;
            }
            WireType::Bytes => {
                self.read_bytes_view()?;
            }
        }
        Ok(())
    }

    /// Handle a field number with no registered meaning: fail with
    /// [`Error::StrictUnknownField`] when `strict_unknown_fields` is set,
    /// otherwise skip its payload per [`Reader::skip_field`] (spec §6:
    /// "`strict_unknown_fields`: if true, encountering a field number with
    /// no registered meaning causes decode failure instead of being
    /// skipped").
    pub fn skip_unknown_field(&mut self, field_number: u32, wire_type: WireType) -> Result<()> {
        self.check_latched::<()>()?;
        if self.limits.strict_unknown_fields {
            return self.fail(Error::StrictUnknownField { field_number });
        }
        self.skip_field(wire_type)
    }

    // --- scalars ---

    /// Read a raw unsigned varint (no tag).
    pub fn read_raw_uvarint(&mut self) -> Result<u64> {
        self.check_latched::<()>()?;
        match read_uvarint(self.buf, &mut self.pos) {
            Ok(v) => Ok(v),
            Err(e) => self.fail(e),
        }
    }

    /// Read a raw unsigned varint and require it fit in 32 bits.
    pub fn read_raw_uvarint32(&mut self) -> Result<u32> {
        self.check_latched::<()>()?;
        match read_uvarint32(self.buf, &mut self.pos) {
            Ok(v) => Ok(v),
            Err(e) => self.fail(e),
        }
    }

    /// Read a zigzag-encoded signed varint (no tag).
    pub fn read_raw_svarint(&mut self) -> Result<i64> {
        self.check_latched::<()>()?;
        match read_svarint(self.buf, &mut self.pos) {
            Ok(v) => Ok(v),
            Err(e) => self.fail(e),
        }
    }

    /// Read a bool from a varint payload (nonzero is true).
    pub fn read_bool(&mut self) -> Result<bool> {
        Ok(self.read_raw_uvarint()? != 0)
    }

    /// Read an unsigned 8-bit integer from a varint payload, checking range.
    pub fn read_u8(&mut self) -> Result<u8> {
        let v = self.read_raw_uvarint()?;
        u8::try_from(v).map_err(|_| Error::VarintOverflow { position: self.pos })
    }
    /// Read an unsigned 16-bit integer from a varint payload, checking range.
    pub fn read_u16(&mut self) -> Result<u16> {
        let v = self.read_raw_uvarint()?;
        u16::try_from(v).map_err(|_| Error::VarintOverflow { position: self.pos })
    }
    /// Read an unsigned 32-bit integer from a varint payload, checking range.
    pub fn read_u32(&mut self) -> Result<u32> {
        let v = self.read_raw_uvarint()?;
        u32::try_from(v).map_err(|_| Error::VarintOverflow { position: self.pos })
    }
    /// Read an unsigned 64-bit integer from a varint payload.
    pub fn read_u64(&mut self) -> Result<u64> {
        self.read_raw_uvarint()
    }

    /// Read a signed 8-bit integer from a zigzag varint payload, checking
    /// decoder inputs stay within range (spec §4.1).
    pub fn read_i8(&mut self) -> Result<i8> {
        let v = self.read_raw_svarint()?;
        i8::try_from(v).map_err(|_| Error::VarintOverflow { position: self.pos })
    }
    /// Read a signed 16-bit integer from a zigzag varint payload.
    pub fn read_i16(&mut self) -> Result<i16> {
        let v = self.read_raw_svarint()?;
        i16::try_from(v).map_err(|_| Error::VarintOverflow { position: self.pos })
    }
    /// Read a signed 32-bit integer from a zigzag varint payload.
    pub fn read_i32(&mut self) -> Result<i32> {
        let v = self.read_raw_svarint()?;
        i32::try_from(v).map_err(|_| Error::VarintOverflow { position: self.pos })
    }
    /// Read a signed 64-bit integer from a zigzag varint payload.
    pub fn read_i64(&mut self) -> Result<i64> {
        self.read_raw_svarint()
    }

    /// Read a 32-bit float from a 4-byte little-endian payload.
    pub fn read_f32(&mut self) -> Result<f32> {
        let bytes = self.take(4)?;
        let mut cursor = bytes;
        Ok(cursor.read_f32::<LittleEndian>().expect("bounds checked above"))
    }

    /// Read a 64-bit float from an 8-byte little-endian payload.
    pub fn read_f64(&mut self) -> Result<f64> {
        let bytes = self.take(8)?;
        let mut cursor = bytes;
        Ok(cursor.read_f64::<LittleEndian>().expect("bounds checked above"))
    }

    /// Read a length-prefixed byte sequence, applying
    /// `max_bytes_length`, and copy it into an owned `Vec<u8>`.
    pub fn read_byte_vec(&mut self) -> Result<Vec<u8>> {
        Ok(self.read_bytes_view()?.bytes.to_vec())
    }

    /// Read a length-prefixed byte sequence as a zero-copy, generation
    /// stamped view into the reader's buffer.
    pub fn read_bytes_view(&mut self) -> Result<BytesView<'a>> {
        self.check_latched::<()>()?;
        let len = self.read_length(self.limits.max_bytes_length, |max, actual| {
            Error::MaxBytesLengthExceeded { max, actual }
        })?;
        let bytes = self.take(len)?;
        Ok(BytesView {
            bytes,
            generation: self.generation,
        })
    }

    /// Read a length-prefixed UTF-8 string, applying `max_string_length`
    /// and (if `validate_utf8` is set) UTF-8 validation, and copy it into
    /// an owned `String`.
    pub fn read_string(&mut self) -> Result<String> {
        Ok(self.read_str_view()?.bytes.to_string())
    }

    /// Read a length-prefixed UTF-8 string as a zero-copy, generation
    /// stamped view into the reader's buffer.
    pub fn read_str_view(&mut self) -> Result<StrView<'a>> {
        self.check_latched::<()>()?;
        let start = self.pos;
        let len = self.read_length(self.limits.max_string_length, |max, actual| {
            Error::MaxStringLengthExceeded { max, actual }
        })?;
        let bytes = self.take(len)?;
        let s = if self.limits.validate_utf8 {
            match std::str::from_utf8(bytes) {
                Ok(s) => s,
                Err(_) => return self.fail(Error::InvalidUtf8 { position: start }),
            }
        } else {
            // SAFETY: validation is explicitly disabled by the caller's
            // limits profile; the bytes are only ever exposed as `&str`
            // through this unchecked path when they asked for it.
            unsafe { std::str::from_utf8_unchecked(bytes) }
        };
        Ok(StrView {
            bytes: s,
            generation: self.generation,
        })
    }

    /// Read a varint length, enforcing both the declared per-kind limit
    /// and `max_array_length`/remaining-buffer bounds.
    fn read_length(
        &mut self,
        max_len: usize,
        limit_err: impl FnOnce(usize, usize) -> Error,
    ) -> Result<usize> {
        let raw = self.read_raw_uvarint()?;
        let len = usize::try_from(raw).unwrap_or(usize::MAX);
        if len > max_len {
            return self.fail(limit_err(max_len, len));
        }
        if len > self.remaining() {
            return self.fail(Error::UnexpectedEndOfInput {
                position: self.pos,
                requested: len,
                remaining: self.remaining(),
            });
        }
        Ok(len)
    }

    /// Read a packed-sequence element count, guarding against
    /// `count * element_size` overflowing platform integer arithmetic
    /// before the multiplication is performed (spec §4.4), and against
    /// `max_array_length`.
    pub fn read_packed_count(&mut self, element_size: usize) -> Result<usize> {
        self.check_latched::<()>()?;
        let raw = self.read_raw_uvarint()?;
        if element_size > 0 && raw > (usize::MAX / element_size) as u64 {
            return self.fail(Error::ElementCountOverflow {
                count: raw,
                element_size,
            });
        }
        let count = raw as usize;
        if count > self.limits.max_array_length {
            return self.fail(Error::MaxArrayLengthExceeded {
                max: self.limits.max_array_length,
                actual: count,
            });
        }
        let required_bytes = count * element_size;
        if required_bytes > self.remaining() {
            return self.fail(Error::UnexpectedEndOfInput {
                position: self.pos,
                requested: required_bytes,
                remaining: self.remaining(),
            });
        }
        Ok(count)
    }

    /// Read a sequence/map length varint and enforce `max_array_length`
    /// or `max_map_size` respectively, without any per-element size
    /// assumption (used for non-packable element sequences and maps).
    pub fn read_collection_count(&mut self, max: usize) -> Result<usize> {
        self.check_latched::<()>()?;
        let raw = self.read_raw_uvarint()?;
        let count = usize::try_from(raw).unwrap_or(usize::MAX);
        if count > max {
            return self.fail(Error::MaxArrayLengthExceeded { max, actual: count });
        }
        Ok(count)
    }
}
