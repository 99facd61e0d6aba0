//! The polymorphic type registry: a process-wide id-to-type table used to
//! encode and decode values whose concrete type isn't known until decode
//! time (spec §4.6). Mirrors the `OnceLock<RwLock<_>>`-guarded global used
//! elsewhere in this crate for shared, rarely-mutated process state —
//! registration typically happens once at startup, lookups happen on
//! every encode/decode of a polymorphic field.

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::sync::{OnceLock, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::error::{Error, Result};
use crate::reader::Reader;
use crate::record::Record;
use crate::writer::Writer;

/// The type-id reserved to mean "no value" in a polymorphic field.
pub const NULL_TYPE_ID: u64 = 0;

/// The first type id handed out by [`Registry::register_auto`]. IDs 1-127
/// are reserved for types the application registers explicitly (spec §4.6:
/// "well-known types get stable low ids").
pub const FIRST_AUTO_TYPE_ID: u64 = 128;

type EncodeFn = fn(&dyn Any, &mut Writer);
type DecodeFn = fn(&mut Reader) -> Result<Box<dyn Any>>;

#[derive(Clone, Copy)]
struct TypeEntry {
    type_id: u64,
    rust_type: TypeId,
    name: &'static str,
    encode: EncodeFn,
    decode: DecodeFn,
}

/// An id-to-type and type-to-id table for polymorphic record dispatch.
pub struct Registry {
    by_id: HashMap<u64, TypeEntry>,
    by_type: HashMap<TypeId, u64>,
    next_auto_id: u64,
}

impl Registry {
    /// An empty registry, with auto-assignment starting at
    /// [`FIRST_AUTO_TYPE_ID`].
    pub fn new() -> Self {
        Registry {
            by_id: HashMap::new(),
            by_type: HashMap::new(),
            next_auto_id: FIRST_AUTO_TYPE_ID,
        }
    }

    fn insert<T: Record + Any + 'static>(&mut self, type_id: u64, name: &'static str) -> Result<u64> {
        if type_id == NULL_TYPE_ID {
            return Err(Error::ReservedTypeId { type_id: NULL_TYPE_ID });
        }
        let rust_type = TypeId::of::<T>();

        if let Some(existing) = self.by_type.get(&rust_type) {
            if *existing == type_id {
                return Ok(type_id); // idempotent re-registration
            }
            return Err(Error::TypeAlreadyRegistered {
                type_id: *existing,
                name,
            });
        }
        if let Some(entry) = self.by_id.get(&type_id) {
            if entry.rust_type == rust_type {
                return Ok(type_id);
            }
            return Err(Error::TypeIdConflict {
                type_id,
                existing: entry.name,
                requested: name,
            });
        }

        let entry = TypeEntry {
            type_id,
            rust_type,
            name,
            encode: |value, w| {
                let value = value
                    .downcast_ref::<T>()
                    .expect("registry dispatch table invariant: encode fn matched to its own T");
                value.encode(w);
            },
            decode: |r| {
                let value = T::decode(r)?;
                Ok(Box::new(value))
            },
        };
        self.by_id.insert(type_id, entry);
        self.by_type.insert(rust_type, type_id);
        Ok(type_id)
    }

    /// Register `T` under an explicitly chosen id. Re-registering the same
    /// `T` under the same id is a no-op; registering a different `T` under
    /// an id already in use, or re-registering `T` under a different id,
    /// is a conflict.
    pub fn register_with_id<T: Record + Any + 'static>(
        &mut self,
        type_id: u64,
        name: &'static str,
    ) -> Result<()> {
        self.insert::<T>(type_id, name).map(|_| ())
    }

    /// Register `T` under the next free auto-assigned id (starting at
    /// [`FIRST_AUTO_TYPE_ID`]). Idempotent: registering the same `T` again
    /// returns its existing id rather than minting a new one.
    pub fn register_auto<T: Record + Any + 'static>(&mut self, name: &'static str) -> Result<u64> {
        if let Some(id) = self.by_type.get(&TypeId::of::<T>()) {
            return Ok(*id);
        }
        while self.by_id.contains_key(&self.next_auto_id) {
            self.next_auto_id += 1;
        }
        let id = self.next_auto_id;
        self.next_auto_id += 1;
        self.insert::<T>(id, name)
    }

    /// Look up the registered type id for `T`, if registered.
    pub fn id_of<T: Any + 'static>(&self) -> Option<u64> {
        self.by_type.get(&TypeId::of::<T>()).copied()
    }

    fn encode_by_id(&self, type_id: u64, value: &dyn Any, w: &mut Writer) -> Result<()> {
        let entry = self
            .by_id
            .get(&type_id)
            .ok_or(Error::UnknownTypeId { type_id })?;
        (entry.encode)(value, w);
        Ok(())
    }

    fn decode_by_id(&self, type_id: u64, r: &mut Reader) -> Result<Box<dyn Any>> {
        let entry = self
            .by_id
            .get(&type_id)
            .ok_or(Error::UnknownTypeId { type_id })?;
        (entry.decode)(r)
    }
}

impl Default for Registry {
    fn default() -> Self {
        Registry::new()
    }
}

fn global() -> &'static RwLock<Registry> {
    static REGISTRY: OnceLock<RwLock<Registry>> = OnceLock::new();
    REGISTRY.get_or_init(|| RwLock::new(Registry::new()))
}

/// Read-lock the process-wide registry.
pub fn read() -> RwLockReadGuard<'static, Registry> {
    global().read().expect("registry lock poisoned")
}

/// Write-lock the process-wide registry, for registration calls.
pub fn write() -> RwLockWriteGuard<'static, Registry> {
    global().write().expect("registry lock poisoned")
}

/// Register `T` in the process-wide registry under an auto-assigned id.
pub fn register_auto<T: Record + Any + 'static>(name: &'static str) -> Result<u64> {
    write().register_auto::<T>(name)
}

/// Register `T` in the process-wide registry under an explicit id.
pub fn register_with_id<T: Record + Any + 'static>(type_id: u64, name: &'static str) -> Result<()> {
    write().register_with_id::<T>(type_id, name)
}

pub(crate) fn encode_dispatch(type_id: u64, value: &dyn Any, w: &mut Writer) -> Result<()> {
    read().encode_by_id(type_id, value, w)
}

pub(crate) fn decode_dispatch(type_id: u64, r: &mut Reader) -> Result<Box<dyn Any>> {
    read().decode_by_id(type_id, r)
}
