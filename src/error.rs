//! Library error types.
//!
use std::fmt;

/// A `wirecore` result, normally returning a [`Error`].
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// A `wirecore` error. Encompasses every failure mode that can occur while
/// writing, reading, registering, or framing data.
#[derive(Clone, Debug, PartialEq)]
pub enum Error {
    // --- limit / resource violations ---
    /// A top-level message exceeded `max_message_size`.
    MaxMessageSizeExceeded {
        /// The configured limit.
        max: usize,
        /// The size that was rejected.
        actual: usize,
    },
    /// Nested records exceeded `max_depth`.
    MaxDepthExceeded {
        /// The configured limit.
        max: usize,
    },
    /// A string exceeded `max_string_length`.
    MaxStringLengthExceeded {
        /// The configured limit.
        max: usize,
        /// The length that was rejected.
        actual: usize,
    },
    /// A byte sequence exceeded `max_bytes_length`.
    MaxBytesLengthExceeded {
        /// The configured limit.
        max: usize,
        /// The length that was rejected.
        actual: usize,
    },
    /// A sequence exceeded `max_array_length`.
    MaxArrayLengthExceeded {
        /// The configured limit.
        max: usize,
        /// The length that was rejected.
        actual: usize,
    },
    /// A map exceeded `max_map_size`.
    MaxMapSizeExceeded {
        /// The configured limit.
        max: usize,
        /// The length that was rejected.
        actual: usize,
    },
    /// A packed sequence's `count * element_size` would overflow platform
    /// integer arithmetic.
    ElementCountOverflow {
        /// The declared element count.
        count: u64,
        /// The per-element size in bytes.
        element_size: usize,
    },

    // --- format violations ---
    /// A varint was longer than 10 bytes, or its 10th byte carried more
    /// than one data bit / a continuation bit.
    VarintOverflow {
        /// Byte position within the buffer where the varint started.
        position: usize,
    },
    /// A string field did not contain well-formed UTF-8.
    InvalidUtf8 {
        /// Byte position within the buffer where the string started.
        position: usize,
    },
    /// The cursor ran past the end of the input buffer.
    UnexpectedEndOfInput {
        /// Byte position within the buffer where the read was attempted.
        position: usize,
        /// Number of bytes that were requested.
        requested: usize,
        /// Number of bytes actually remaining.
        remaining: usize,
    },
    /// A tag carried a wire-type value with no defined meaning.
    InvalidWireType {
        /// Byte position within the buffer where the tag was read.
        position: usize,
        /// The offending 3-bit value.
        wire_type: u8,
    },
    /// A tag carried field number zero outside of the end-marker position.
    InvalidFieldNumber {
        /// Byte position within the buffer where the tag was read.
        position: usize,
    },

    // --- semantic violations ---
    /// A record was constructed or encoded with two fields sharing the
    /// same field number.
    DuplicateFieldNumber {
        /// The repeated field number.
        field_number: u32,
    },
    /// A polymorphic value referenced a type-id with no registered
    /// descriptor.
    UnknownTypeId {
        /// The unrecognized type-id.
        type_id: u64,
    },
    /// A polymorphic value's concrete type was never registered.
    UnregisteredType {
        /// The Rust type name, for diagnostics.
        type_name: &'static str,
    },
    /// An explicit type-id registration conflicted with a different
    /// concrete type already bound to that id.
    TypeIdConflict {
        /// The contested type-id.
        type_id: u64,
        /// Name the id is already registered under.
        existing: &'static str,
        /// Name the caller tried to register it under.
        requested: &'static str,
    },
    /// A concrete type was already registered under a different id than
    /// the one just requested.
    TypeAlreadyRegistered {
        /// The id the type is already registered under.
        type_id: u64,
        /// Name the caller tried to re-register it under.
        name: &'static str,
    },
    /// Type-id zero is reserved for the null polymorphic value and cannot
    /// be registered.
    ReservedTypeId {
        /// Always zero; carried for symmetry with the other variants.
        type_id: u64,
    },
    /// An unknown field number was encountered while
    /// `strict_unknown_fields` is enabled.
    StrictUnknownField {
        /// The unrecognized field number.
        field_number: u32,
    },

    // --- stream violations ---
    /// The stream ended, either cleanly between frames or mid-frame.
    EndOfStream {
        /// `true` if the stream ended inside a varint or a payload rather
        /// than cleanly between frames.
        premature: bool,
    },
    /// A frame's declared length exceeded `max_message_size`. No payload
    /// bytes are consumed when this is returned.
    MessageSizeExceeded {
        /// The configured limit.
        max: usize,
        /// The declared size that was rejected.
        actual: usize,
    },
    /// A write was attempted on a stream writer after it was closed.
    StreamClosed,

    // --- memory-safety violations ---
    /// A borrowed string or byte-sequence view was accessed after the
    /// reader that issued it was reset.
    UseAfterReset,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::MaxMessageSizeExceeded { max, actual } => {
                write!(f, "message size {actual} exceeds maximum allowed {max}")
            }
            Error::MaxDepthExceeded { max } => {
                write!(f, "nesting depth exceeds maximum allowed {max}")
            }
            Error::MaxStringLengthExceeded { max, actual } => {
                write!(f, "string length {actual} exceeds maximum allowed {max}")
            }
            Error::MaxBytesLengthExceeded { max, actual } => write!(
                f,
                "byte sequence length {actual} exceeds maximum allowed {max}"
            ),
            Error::MaxArrayLengthExceeded { max, actual } => {
                write!(f, "array length {actual} exceeds maximum allowed {max}")
            }
            Error::MaxMapSizeExceeded { max, actual } => {
                write!(f, "map size {actual} exceeds maximum allowed {max}")
            }
            Error::ElementCountOverflow { count, element_size } => write!(
                f,
                "packed element count {count} times element size {element_size} overflows platform integer arithmetic"
            ),
            Error::VarintOverflow { position } => {
                write!(f, "varint longer than 10 bytes at position {position}")
            }
            Error::InvalidUtf8 { position } => {
                write!(f, "invalid UTF-8 in string starting at position {position}")
            }
            Error::UnexpectedEndOfInput {
                position,
                requested,
                remaining,
            } => write!(
                f,
                "unexpected end of input at position {position}: requested {requested} bytes, {remaining} remaining"
            ),
            Error::InvalidWireType { position, wire_type } => write!(
                f,
                "invalid wire type {wire_type} in tag at position {position}"
            ),
            Error::InvalidFieldNumber { position } => {
                write!(f, "invalid field number zero at position {position}")
            }
            Error::DuplicateFieldNumber { field_number } => {
                write!(f, "duplicate field number {field_number}")
            }
            Error::UnknownTypeId { type_id } => {
                write!(f, "no registered type for type-id {type_id}")
            }
            Error::UnregisteredType { type_name } => {
                write!(f, "type `{type_name}` is not registered")
            }
            Error::TypeIdConflict {
                type_id,
                existing,
                requested,
            } => write!(
                f,
                "type-id {type_id} is already registered as `{existing}`, cannot register `{requested}`"
            ),
            Error::TypeAlreadyRegistered { type_id, name } => write!(
                f,
                "`{name}` is already registered under type-id {type_id}, cannot register it again under a different id"
            ),
            Error::ReservedTypeId { type_id } => {
                write!(f, "type-id {type_id} is reserved for the null polymorphic value")
            }
            Error::StrictUnknownField { field_number } => write!(
                f,
                "unknown field number {field_number} rejected by strict_unknown_fields"
            ),
            Error::EndOfStream { premature } => {
                if *premature {
                    write!(f, "stream ended in the middle of a frame")
                } else {
                    write!(f, "stream ended cleanly between frames")
                }
            }
            Error::MessageSizeExceeded { max, actual } => {
                write!(f, "frame length {actual} exceeds maximum allowed {max}")
            }
            Error::StreamClosed => write!(f, "write attempted on a closed stream"),
            Error::UseAfterReset => {
                write!(f, "borrowed view accessed after its reader was reset")
            }
        }
    }
}

impl std::error::Error for Error {}

impl Error {
    /// `true` for the limit/resource-violation family (spec §7): indicative
    /// of potentially hostile input, as opposed to a merely malformed one.
    pub fn is_limit_violation(&self) -> bool {
        matches!(
            self,
            Error::MaxMessageSizeExceeded { .. }
                | Error::MaxDepthExceeded { .. }
                | Error::MaxStringLengthExceeded { .. }
                | Error::MaxBytesLengthExceeded { .. }
                | Error::MaxArrayLengthExceeded { .. }
                | Error::MaxMapSizeExceeded { .. }
                | Error::ElementCountOverflow { .. }
                | Error::MessageSizeExceeded { .. }
        )
    }
}
