//! Length-delimited stream framing (spec §4.7): `<varint length><payload>`
//! repeated end to end. [`StreamWriter`] appends frames to a growable
//! buffer; [`StreamReader`]/[`FrameIterator`] walk a buffer-backed source
//! one frame at a time, distinguishing a clean end of stream (cursor sits
//! exactly at the end of the buffer between frames) from a premature one
//! (the buffer ends mid length-prefix or mid-payload).

use crate::error::{Error, Result};
use crate::limits::Limits;
use crate::varint::{read_uvarint, write_uvarint};

/// Appends length-prefixed frames to an in-memory buffer.
#[derive(Debug, Default)]
pub struct StreamWriter {
    buf: Vec<u8>,
    closed: bool,
    error: Option<Error>,
}

impl StreamWriter {
    /// An empty stream writer.
    pub fn new() -> Self {
        StreamWriter::default()
    }

    /// The latched error, if a previous write failed.
    pub fn error(&self) -> Option<&Error> {
        self.error.as_ref()
    }

    /// Append `payload` as one frame: its length as a varint, then the
    /// bytes themselves. Fails with [`Error::StreamClosed`] if
    /// [`StreamWriter::close`] was already called.
    pub fn write_frame(&mut self, payload: &[u8]) -> Result<()> {
        if let Some(e) = &self.error {
            return Err(e.clone());
        }
        if self.closed {
            let e = Error::StreamClosed;
            self.error = Some(e.clone());
            return Err(e);
        }
        write_uvarint(&mut self.buf, payload.len() as u64);
        self.buf.extend_from_slice(payload);
        Ok(())
    }

    /// Mark the stream closed; further [`StreamWriter::write_frame`] calls
    /// fail.
    pub fn close(&mut self) {
        self.closed = true;
    }

    /// Borrow the framed bytes written so far.
    pub fn as_slice(&self) -> &[u8] {
        &self.buf
    }

    /// Consume the writer, returning the framed bytes.
    pub fn into_inner(self) -> Result<Vec<u8>> {
        match self.error {
            Some(e) => Err(e),
            None => Ok(self.buf),
        }
    }
}

/// Walks a buffer containing zero or more length-prefixed frames.
#[derive(Debug)]
pub struct StreamReader<'a> {
    buf: &'a [u8],
    pos: usize,
    limits: Limits,
    error: Option<Error>,
}

impl<'a> StreamReader<'a> {
    /// Create a reader over `buf`, enforcing `limits.max_message_size` on
    /// each frame.
    pub fn new(buf: &'a [u8], limits: Limits) -> Self {
        StreamReader {
            buf,
            pos: 0,
            limits,
            error: None,
        }
    }

    /// Re-target the reader at a new buffer, starting from position zero.
    /// Restarts the stream: an in-progress error state is cleared.
    pub fn reset(&mut self, buf: &'a [u8]) {
        self.buf = buf;
        self.pos = 0;
        self.error = None;
    }

    /// Current byte offset within the buffer.
    pub fn position(&self) -> usize {
        self.pos
    }

    /// `true` if the cursor sits exactly at the end of the buffer, i.e. a
    /// subsequent read would report a clean (non-premature) end of stream.
    pub fn at_clean_end(&self) -> bool {
        self.pos == self.buf.len()
    }

    /// Read the next frame, or `None` at a clean end of stream. A
    /// malformed or truncated frame latches an error and is returned as
    /// `Some(Err(..))`; after that, subsequent calls keep returning the
    /// same latched error.
    pub fn read_frame(&mut self) -> Option<Result<&'a [u8]>> {
        if let Some(e) = &self.error {
            return Some(Err(e.clone()));
        }
        if self.pos == self.buf.len() {
            return None;
        }
        let start = self.pos;
        let len = match read_uvarint(self.buf, &mut self.pos) {
            Ok(v) => v,
            Err(_) => {
                self.pos = start;
                let e = Error::EndOfStream { premature: true };
                self.error = Some(e.clone());
                return Some(Err(e));
            }
        };
        let len = usize::try_from(len).unwrap_or(usize::MAX);
        if len > self.limits.max_message_size {
            // The length prefix is consumed so the caller can see where
            // the bad frame started, but the (possibly bogus) payload is
            // never read or skipped over.
            let e = Error::MessageSizeExceeded {
                max: self.limits.max_message_size,
                actual: len,
            };
            self.error = Some(e.clone());
            return Some(Err(e));
        }
        if self.pos + len > self.buf.len() {
            self.pos = start;
            let e = Error::EndOfStream { premature: true };
            self.error = Some(e.clone());
            return Some(Err(e));
        }
        let frame = &self.buf[self.pos..self.pos + len];
        self.pos += len;
        Some(Ok(frame))
    }
}

/// Adapts a [`StreamReader`] to [`Iterator`], yielding one frame (or the
/// terminal error) per call to `next`, then `None` forever after either a
/// clean end of stream or a latched error.
pub struct FrameIterator<'a> {
    reader: StreamReader<'a>,
    done: bool,
}

impl<'a> FrameIterator<'a> {
    /// Wrap `buf` for iteration, enforcing `limits.max_message_size`.
    pub fn new(buf: &'a [u8], limits: Limits) -> Self {
        FrameIterator {
            reader: StreamReader::new(buf, limits),
            done: false,
        }
    }

    /// Restart iteration over a new buffer from position zero.
    pub fn reset(&mut self, buf: &'a [u8]) {
        self.reader.reset(buf);
        self.done = false;
    }
}

impl<'a> Iterator for FrameIterator<'a> {
    type Item = Result<&'a [u8]>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.reader.read_frame() {
            None => {
                self.done = true;
                None
            }
            Some(Err(e)) => {
                self.done = true;
                Some(Err(e))
            }
            Some(Ok(frame)) => Some(Ok(frame)),
        }
    }
}
