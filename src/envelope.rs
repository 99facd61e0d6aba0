//! Polymorphic envelope encoding: a value whose concrete type is resolved
//! at decode time via the [`crate::registry`] (spec §4.6). An envelope is
//! `<type-id varint><inner record bytes>`; type-id
//! [`crate::registry::NULL_TYPE_ID`] represents the absence of a value and
//! carries no inner bytes.

use std::any::Any;

use crate::error::{Error, Result};
use crate::reader::Reader;
use crate::record::Record;
use crate::registry::{self, NULL_TYPE_ID};
use crate::tag::WireType;
use crate::writer::Writer;

/// Encode `value` as a polymorphic envelope: `value`'s registered type-id
/// followed by its own field bytes. Fails with
/// [`Error::UnregisteredType`] if `T` was never registered.
pub fn encode<T: Record + Any + 'static>(value: &T) -> Result<Vec<u8>> {
    let type_id = registry::read()
        .id_of::<T>()
        .ok_or(Error::UnregisteredType {
            type_name: std::any::type_name::<T>(),
        })?;
    let mut w = Writer::new();
    w.write_raw_uvarint(type_id);
    registry::encode_dispatch(type_id, value, &mut w)?;
    w.finish()
}

/// Encode the null polymorphic value: just the reserved type-id, with no
/// inner payload.
pub fn encode_null() -> Vec<u8> {
    let mut w = Writer::new();
    w.write_raw_uvarint(NULL_TYPE_ID);
    w.finish().expect("writing a single varint cannot fail")
}

/// Decode a polymorphic envelope, dispatching to the registered type's
/// decode function. Returns `None` for the null type-id, `Some((type_id,
/// value))` otherwise, where `value` can be downcast via
/// [`std::any::Any::downcast_ref`]/[`downcast`](Box::downcast).
pub fn decode(r: &mut Reader) -> Result<Option<(u64, Box<dyn Any>)>> {
    let type_id = r.read_raw_uvarint()?;
    if type_id == NULL_TYPE_ID {
        return Ok(None);
    }
    let value = registry::decode_dispatch(type_id, r)?;
    Ok(Some((type_id, value)))
}

/// Decode a polymorphic envelope and downcast it to the expected concrete
/// type `T`, failing with [`Error::UnregisteredType`] if the decoded value
/// is some other registered type.
pub fn decode_as<T: Any + 'static>(r: &mut Reader) -> Result<Option<T>> {
    match decode(r)? {
        None => Ok(None),
        Some((_, boxed)) => match boxed.downcast::<T>() {
            Ok(value) => Ok(Some(*value)),
            Err(_) => Err(Error::UnregisteredType {
                type_name: std::any::type_name::<T>(),
            }),
        },
    }
}

/// Encode `value` as a polymorphic field at `field_number`: a BYTES-typed
/// field whose payload is the envelope from [`encode`] (spec §8 Scenario
/// F). An unregistered `T` latches [`Error::UnregisteredType`] on `w`
/// rather than returning a `Result`, matching every other `Writer` emitter.
pub fn write_field<T: Record + Any + 'static>(w: &mut Writer, field_number: u32, value: &T) {
    if w.error().is_some() {
        return;
    }
    let type_id = match registry::read().id_of::<T>() {
        Some(id) => id,
        None => {
            w.latch_error(Error::UnregisteredType {
                type_name: std::any::type_name::<T>(),
            });
            return;
        }
    };
    w.write_tag(field_number, WireType::Bytes);
    let mark = w.begin_len_delimited();
    w.write_raw_uvarint(type_id);
    registry::encode_dispatch(type_id, value, w).unwrap_or_else(|e| w.latch_error(e));
    w.end_len_delimited(mark);
}

/// Decode a polymorphic field at the reader's current position (the field
/// tag must already have been consumed). Counterpart to [`write_field`].
pub fn read_field(r: &mut Reader) -> Result<Option<(u64, Box<dyn Any>)>> {
    let view = r.read_bytes_view()?;
    let bytes = view.get(r)?;
    r.enter_nested()?;
    let mut sub = Reader::new_nested(bytes, r.limits(), r.depth())?;
    let result = decode(&mut sub)?;
    if let Some(e) = sub.error() {
        return Err(e.clone());
    }
    r.exit_nested();
    Ok(result)
}

/// Decode a polymorphic field and downcast it to the expected concrete
/// type `T`. Counterpart to [`write_field`].
pub fn read_field_as<T: Any + 'static>(r: &mut Reader) -> Result<Option<T>> {
    match read_field(r)? {
        None => Ok(None),
        Some((_, boxed)) => match boxed.downcast::<T>() {
            Ok(value) => Ok(Some(*value)),
            Err(_) => Err(Error::UnregisteredType {
                type_name: std::any::type_name::<T>(),
            }),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::limits::Limits;
    use crate::tag::Tag;

    struct Dog {
        name: String,
    }

    impl Record for Dog {
        fn encode(&self, w: &mut Writer) {
            w.start_record();
            if !self.name.is_empty() {
                w.write_tag(1, WireType::Bytes);
                w.write_str(&self.name);
            }
            w.end_record();
        }
        fn decode(r: &mut Reader) -> Result<Self> {
            let mut name = String::new();
            loop {
                match r.read_tag()? {
                    Tag::End => break,
                    Tag::Field {
                        field_number: 1,
                        wire_type: WireType::Bytes,
                    } => name = r.read_string()?,
                    Tag::Field { field_number, wire_type } => r.skip_unknown_field(field_number, wire_type)?,
                }
            }
            Ok(Dog { name })
        }
    }

    #[test]
    fn round_trips_through_registered_type() {
        registry::register_with_id::<Dog>(128, "Dog").ok();
        let dog = Dog {
            name: "Rex".to_string(),
        };
        let bytes = encode(&dog).unwrap();
        let mut r = Reader::new(&bytes, Limits::secure()).unwrap();
        let decoded: Dog = decode_as(&mut r).unwrap().unwrap();
        assert_eq!(decoded.name, "Rex");
    }

    #[test]
    fn null_round_trips_as_none() {
        let bytes = encode_null();
        assert_eq!(bytes, vec![0x00]);
        let mut r = Reader::new(&bytes, Limits::secure()).unwrap();
        assert!(decode_as::<Dog>(&mut r).unwrap().is_none());
    }

    // Scenario F (spec §8): a polymorphic field at field number 1 holding
    // `Dog{name:"rex"}` encodes as tag BYTES field 1, outer length, then
    // `<varint type-id> <encoded Dog>`.
    #[test]
    fn scenario_f_field_wrapped_polymorphic_value_round_trips() {
        registry::register_with_id::<Dog>(128, "Dog").ok();
        let dog = Dog {
            name: "rex".to_string(),
        };
        let mut w = Writer::new();
        write_field(&mut w, 1, &dog);
        w.write_end_marker();
        let bytes = w.finish().unwrap();

        let mut r = Reader::new(&bytes, Limits::secure()).unwrap();
        assert_eq!(
            r.read_tag().unwrap(),
            Tag::Field {
                field_number: 1,
                wire_type: WireType::Bytes
            }
        );
        let decoded: Dog = read_field_as(&mut r).unwrap().unwrap();
        assert_eq!(decoded.name, "rex");
        assert_eq!(r.read_tag().unwrap(), Tag::End);
    }

    #[test]
    fn unregistered_type_rejected_on_encode() {
        struct Cat;
        impl Record for Cat {
            fn encode(&self, w: &mut Writer) {
                w.write_end_marker();
            }
            fn decode(r: &mut Reader) -> Result<Self> {
                let _ = r.read_tag()?;
                Ok(Cat)
            }
        }
        assert!(matches!(
            encode(&Cat),
            Err(Error::UnregisteredType { .. })
        ));
    }
}
