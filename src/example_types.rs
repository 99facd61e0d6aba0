//! Record type definitions exercised by the integration tests in
//! `lib.rs`: the kind of hand-written `Record` impl an application would
//! write for each of the wire shapes this crate supports.

use crate::error::Result;
use crate::float::is_elidable_f64;
use crate::packed_seq::{read_packed_i32, write_packed_i32};
use crate::reader::Reader;
use crate::record::Record;
use crate::tag::{Tag, WireType};
use crate::writer::Writer;
use crate::{maps, registry_api};

pub struct Person {
    pub id: i64,
    pub name: String,
    pub active: bool,
    pub score: f64,
}

impl Record for Person {
    fn encode(&self, w: &mut Writer) {
        w.start_record();
        if self.id != 0 {
            w.write_tag(1, WireType::SVarint);
            w.write_i64(self.id);
        }
        if !self.name.is_empty() {
            w.write_tag(2, WireType::Bytes);
            w.write_str(&self.name);
        }
        if self.active {
            w.write_tag(3, WireType::Varint);
            w.write_bool(self.active);
        }
        if !is_elidable_f64(self.score) {
            w.write_tag(4, WireType::Fixed64);
            w.write_f64(self.score);
        }
        w.end_record();
    }

    fn decode(r: &mut Reader) -> Result<Self> {
        let mut id = 0;
        let mut name = String::new();
        let mut active = false;
        let mut score = 0.0;
        loop {
            match r.read_tag()? {
                Tag::End => break,
                Tag::Field {
                    field_number: 1,
                    wire_type: WireType::SVarint,
                } => id = r.read_i64()?,
                Tag::Field {
                    field_number: 2,
                    wire_type: WireType::Bytes,
                } => name = r.read_string()?,
                Tag::Field {
                    field_number: 3,
                    wire_type: WireType::Varint,
                } => active = r.read_bool()?,
                Tag::Field {
                    field_number: 4,
                    wire_type: WireType::Fixed64,
                } => score = r.read_f64()?,
                Tag::Field { field_number, wire_type } => r.skip_unknown_field(field_number, wire_type)?,
            }
        }
        Ok(Person {
            id,
            name,
            active,
            score,
        })
    }
}

pub struct Numbers {
    pub values: Vec<i32>,
}

impl Record for Numbers {
    fn encode(&self, w: &mut Writer) {
        w.start_record();
        if !self.values.is_empty() {
            write_packed_i32(w, 1, &self.values);
        }
        w.end_record();
    }

    fn decode(r: &mut Reader) -> Result<Self> {
        let mut values = Vec::new();
        loop {
            match r.read_tag()? {
                Tag::End => break,
                Tag::Field {
                    field_number: 1,
                    wire_type: WireType::Bytes,
                } => values = read_packed_i32(r)?,
                Tag::Field { field_number, wire_type } => r.skip_unknown_field(field_number, wire_type)?,
            }
        }
        Ok(Numbers { values })
    }
}

#[derive(Default)]
pub struct Metadata {
    pub entries: Vec<(String, String)>,
}

impl Record for Metadata {
    fn encode(&self, w: &mut Writer) {
        w.start_record();
        if !self.entries.is_empty() {
            maps::write_map(
                w,
                1,
                self.entries.iter().cloned(),
                |w, k: &String| w.write_str(k),
                |w, v: &String| w.write_str(v),
            );
        }
        w.end_record();
    }

    fn decode(r: &mut Reader) -> Result<Self> {
        let mut entries = Vec::new();
        loop {
            match r.read_tag()? {
                Tag::End => break,
                Tag::Field {
                    field_number: 1,
                    wire_type: WireType::Bytes,
                } => entries = maps::read_map(r, |r| r.read_string(), |r| r.read_string())?,
                Tag::Field { field_number, wire_type } => r.skip_unknown_field(field_number, wire_type)?,
            }
        }
        Ok(Metadata { entries })
    }
}

pub struct Dog {
    pub name: String,
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

pub struct Blob {
    pub data: Vec<u8>,
}

impl Record for Blob {
    fn encode(&self, w: &mut Writer) {
        w.start_record();
        if !self.data.is_empty() {
            w.write_tag(1, WireType::Bytes);
            w.write_bytes(&self.data);
        }
        w.end_record();
    }

    fn decode(r: &mut Reader) -> Result<Self> {
        let mut data = Vec::new();
        loop {
            match r.read_tag()? {
                Tag::End => break,
                Tag::Field {
                    field_number: 1,
                    wire_type: WireType::Bytes,
                } => data = r.read_byte_vec()?,
                Tag::Field { field_number, wire_type } => r.skip_unknown_field(field_number, wire_type)?,
            }
        }
        Ok(Blob { data })
    }
}

#[allow(dead_code)]
fn register_example_types() -> Result<()> {
    registry_api::register_with_id::<Dog>(128, "Dog")
}
