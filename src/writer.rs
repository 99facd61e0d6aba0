//! The writer: a growable buffer, a sticky error slot, and the primitive
//! emitters every wire-level write goes through.
//!
//! Write operations never panic or return a `Result`; a failure latches
//! into the writer's error slot and every subsequent write becomes a
//! no-op. Callers check [`Writer::error`] (or [`Writer::finish`]) once,
//! after a logical group of writes, rather than after each call.

use std::collections::HashSet;

use crate::error::{Error, Result};
use crate::float::{canonicalize_f32, canonicalize_f64};
use crate::tag::{write_end_marker, write_tag, WireType};
use crate::varint::{write_svarint, write_uvarint};

/// An opaque handle returned by [`Writer::begin_len_delimited`] and
/// consumed by [`Writer::end_len_delimited`]. Region nesting is enforced
/// structurally: a mark can only be closed once, and closing out of order
/// would corrupt the buffer, so callers must respect a stack discipline
/// (innermost opened, innermost closed) exactly like balanced brackets.
#[derive(Debug)]
pub struct LenMark {
    reserved_at: usize,
}

/// Owns a growable byte buffer and emits wire-level primitives into it.
#[derive(Debug)]
pub struct Writer {
    buf: Vec<u8>,
    error: Option<Error>,
    field_scopes: Vec<HashSet<u32>>,
    deterministic: bool,
}

impl Default for Writer {
    fn default() -> Self {
        Writer {
            buf: Vec::new(),
            error: None,
            field_scopes: Vec::new(),
            deterministic: true,
        }
    }
}

impl Writer {
    /// Create an empty writer. Deterministic (canonical) encoding is on by
    /// default, matching spec §4.3's "MUST produce byte-identical output".
    pub fn new() -> Self {
        Writer::default()
    }

    /// Create a writer whose buffer starts with at least `capacity` bytes
    /// reserved.
    pub fn with_capacity(capacity: usize) -> Self {
        Writer {
            buf: Vec::with_capacity(capacity),
            error: None,
            field_scopes: Vec::new(),
            deterministic: true,
        }
    }

    /// Clear the buffer and error, returning the writer to its initial
    /// state for reuse (e.g. from a pool). The deterministic-encoding flag
    /// is left untouched.
    pub fn reset(&mut self) {
        self.buf.clear();
        self.error = None;
        self.field_scopes.clear();
    }

    /// `true` if the writer produces canonical/deterministic output (the
    /// default): map entries sorted by encoded key bytes. When `false`
    /// (the "fast" profile), maps are emitted in iteration order instead.
    pub fn is_deterministic(&self) -> bool {
        self.deterministic
    }

    /// Toggle deterministic map-key ordering. See [`Writer::is_deterministic`].
    pub fn set_deterministic(&mut self, deterministic: bool) {
        self.deterministic = deterministic;
    }

    /// The latched error, if any write has failed so far.
    pub fn error(&self) -> Option<&Error> {
        self.error.as_ref()
    }

    /// Consume the writer, returning the encoded bytes, or the latched
    /// error if one occurred.
    pub fn finish(self) -> Result<Vec<u8>> {
        match self.error {
            Some(e) => Err(e),
            None => Ok(self.buf),
        }
    }

    /// Borrow the bytes emitted so far without consuming the writer.
    pub fn as_slice(&self) -> &[u8] {
        &self.buf
    }

    /// Copy the bytes emitted so far into an owned buffer.
    pub fn to_vec(&self) -> Vec<u8> {
        self.buf.clone()
    }

    fn failed(&self) -> bool {
        self.error.is_some()
    }

    fn latch(&mut self, e: Error) {
        if self.error.is_none() {
            self.error = Some(e);
        }
    }

    /// Latch `e` as the writer's sticky error if none is latched yet.
    /// Exposed for layers above the wire-primitive level (e.g. the
    /// polymorphic envelope) that need to report a semantic failure — an
    /// unregistered type, say — through the same no-op-after-error model
    /// as every other write.
    pub(crate) fn latch_error(&mut self, e: Error) {
        self.latch(e);
    }

    /// Begin tracking field numbers for one record's scope, so that
    /// [`Writer::write_tag`] can catch a duplicate field number (spec
    /// §3: "the encoder MUST refuse to encode a record with duplicate
    /// field numbers").
    pub fn start_record(&mut self) {
        self.field_scopes.push(HashSet::new());
    }

    /// End the innermost record scope started with [`Writer::start_record`]
    /// and emit the end marker.
    pub fn end_record(&mut self) {
        self.field_scopes.pop();
        self.write_end_marker();
    }

    /// Emit a field tag, checking for a duplicate field number within the
    /// current (innermost) record scope opened by [`Writer::start_record`].
    pub fn write_tag(&mut self, field_number: u32, wire_type: WireType) {
        if self.failed() {
            return;
        }
        if field_number == 0 {
            self.latch(Error::InvalidFieldNumber {
                position: self.buf.len(),
            });
            return;
        }
        if let Some(scope) = self.field_scopes.last_mut() {
            if !scope.insert(field_number) {
                self.latch(Error::DuplicateFieldNumber { field_number });
                return;
            }
        }
        write_tag(&mut self.buf, field_number, wire_type);
    }

    /// Emit the record-termination end marker directly, without a tracked
    /// scope. Prefer [`Writer::end_record`] when [`Writer::start_record`]
    /// was used.
    pub fn write_end_marker(&mut self) {
        if self.failed() {
            return;
        }
        write_end_marker(&mut self.buf);
    }

    // --- scalar emitters ---

    /// Emit a bool as a one-byte varint payload (`0` or `1`).
    pub fn write_bool(&mut self, v: bool) {
        self.write_raw_uvarint(v as u64);
    }

    /// Emit a raw unsigned varint (no tag).
    pub fn write_raw_uvarint(&mut self, v: u64) {
        if self.failed() {
            return;
        }
        write_uvarint(&mut self.buf, v);
    }

    /// Emit a raw zigzag-encoded signed varint (no tag).
    pub fn write_raw_svarint(&mut self, v: i64) {
        if self.failed() {
            return;
        }
        write_svarint(&mut self.buf, v);
    }

    /// Emit an unsigned 8-bit integer as a varint.
    pub fn write_u8(&mut self, v: u8) {
        self.write_raw_uvarint(v as u64);
    }
    /// Emit an unsigned 16-bit integer as a varint.
    pub fn write_u16(&mut self, v: u16) {
        self.write_raw_uvarint(v as u64);
    }
    /// Emit an unsigned 32-bit integer as a varint.
    pub fn write_u32(&mut self, v: u32) {
        self.write_raw_uvarint(v as u64);
    }
    /// Emit an unsigned 64-bit integer as a varint.
    pub fn write_u64(&mut self, v: u64) {
        self.write_raw_uvarint(v);
    }

    /// Emit a signed 8-bit integer, zigzag-encoded as a 64-bit varint
    /// (spec §4.3: "Signed integers of widths 8/16/32 are zigzag-encoded
    /// as 64-bit values for wire compactness").
    pub fn write_i8(&mut self, v: i8) {
        self.write_raw_svarint(v as i64);
    }
    /// Emit a signed 16-bit integer, zigzag-encoded as 64-bit.
    pub fn write_i16(&mut self, v: i16) {
        self.write_raw_svarint(v as i64);
    }
    /// Emit a signed 32-bit integer, zigzag-encoded as 64-bit.
    pub fn write_i32(&mut self, v: i32) {
        self.write_raw_svarint(v as i64);
    }
    /// Emit a signed 64-bit integer, zigzag-encoded.
    pub fn write_i64(&mut self, v: i64) {
        self.write_raw_svarint(v);
    }

    /// Emit a 32-bit float as 4 little-endian bytes, canonicalizing NaN and
    /// negative zero first.
    pub fn write_f32(&mut self, v: f32) {
        if self.failed() {
            return;
        }
        self.buf
            .extend_from_slice(&canonicalize_f32(v).to_le_bytes());
    }

    /// Emit a 64-bit float as 8 little-endian bytes, canonicalizing NaN and
    /// negative zero first.
    pub fn write_f64(&mut self, v: f64) {
        if self.failed() {
            return;
        }
        self.buf
            .extend_from_slice(&canonicalize_f64(v).to_le_bytes());
    }

    /// Emit a length-prefixed UTF-8 string.
    pub fn write_str(&mut self, v: &str) {
        self.write_bytes(v.as_bytes());
    }

    /// Emit a length-prefixed byte sequence.
    pub fn write_bytes(&mut self, v: &[u8]) {
        if self.failed() {
            return;
        }
        write_uvarint(&mut self.buf, v.len() as u64);
        self.buf.extend_from_slice(v);
    }

    // --- framing ---

    /// Reserve space for a length prefix and return a mark to close it
    /// with [`Writer::end_len_delimited`]. The payload written between
    /// the two calls becomes the prefixed region.
    pub fn begin_len_delimited(&mut self) -> LenMark {
        let reserved_at = self.buf.len();
        // Optimistic one-byte placeholder; end_len_delimited widens it if
        // the payload turned out to need a longer varint.
        self.buf.push(0);
        LenMark { reserved_at }
    }

    /// Backfill the length prefix reserved by [`Writer::begin_len_delimited`]
    /// with the actual payload length, widening the reservation in place
    /// if the one-byte placeholder was not enough.
    pub fn end_len_delimited(&mut self, mark: LenMark) {
        if self.failed() {
            return;
        }
        let payload_len = self.buf.len() - mark.reserved_at - 1;
        let mut len_bytes = Vec::new();
        write_uvarint(&mut len_bytes, payload_len as u64);
        self.buf
            .splice(mark.reserved_at..mark.reserved_at + 1, len_bytes);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reset_clears_buffer_and_error() {
        let mut w = Writer::new();
        w.write_bool(true);
        w.write_tag(0, WireType::Varint); // latches an error
        assert!(w.error().is_some());
        w.reset();
        assert!(w.error().is_none());
        assert!(w.as_slice().is_empty());
    }

    #[test]
    fn error_latches_and_subsequent_writes_are_no_ops() {
        let mut w = Writer::new();
        w.write_tag(0, WireType::Varint);
        assert!(w.error().is_some());
        let len_before = w.as_slice().len();
        w.write_u64(42);
        w.write_str("hello");
        assert_eq!(w.as_slice().len(), len_before);
    }

    #[test]
    fn duplicate_field_number_latches_error() {
        let mut w = Writer::new();
        w.start_record();
        w.write_tag(1, WireType::Varint);
        w.write_u64(1);
        w.write_tag(1, WireType::Varint);
        assert_eq!(
            w.error(),
            Some(&Error::DuplicateFieldNumber { field_number: 1 })
        );
    }

    #[test]
    fn len_delimited_small_payload_one_byte_prefix() {
        let mut w = Writer::new();
        let mark = w.begin_len_delimited();
        w.write_bytes(b"ok"); // itself length-prefixed, but that's the payload
        w.end_len_delimited(mark);
        let bytes = w.finish().unwrap();
        // outer length = inner write_bytes output length (1 + 2 = 3)
        assert_eq!(bytes[0], 3);
    }

    #[test]
    fn len_delimited_widens_prefix_for_large_payload() {
        let mut w = Writer::new();
        let mark = w.begin_len_delimited();
        let payload = vec![0u8; 200];
        w.write_bytes(&payload); // payload len prefix (2 bytes) + 200 bytes = 202
        w.end_len_delimited(mark);
        let bytes = w.finish().unwrap();
        // 202 requires a 2-byte varint prefix.
        assert_eq!(bytes[0], 0xCA);
        assert_eq!(bytes[1], 0x01);
        assert_eq!(bytes.len(), 2 + 202);
    }

    #[test]
    fn nested_len_delimited_regions() {
        let mut w = Writer::new();
        let outer = w.begin_len_delimited();
        let inner = w.begin_len_delimited();
        w.write_u64(7);
        w.end_len_delimited(inner);
        w.end_len_delimited(outer);
        let bytes = w.finish().unwrap();
        assert_eq!(bytes[0], 2); // outer payload: 1 (inner len) + 1 (u64 7)
        assert_eq!(bytes[1], 1); // inner payload length
        assert_eq!(bytes[2], 7);
    }

    #[test]
    fn nan_and_negative_zero_canonicalized_on_write() {
        let mut w = Writer::new();
        w.write_f32(f32::from_bits(0xFFC0_1234));
        w.write_f32(-0.0);
        let bytes = w.finish().unwrap();
        assert_eq!(&bytes[0..4], &0x7FC0_0000u32.to_le_bytes());
        assert_eq!(&bytes[4..8], &0.0f32.to_le_bytes());
    }
}
