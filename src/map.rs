//! Deterministic map encoding: spec §4.3's per-map protocol.
//!
//! A map field is a BYTES-typed payload of
//! `<varint entry count> <entry 1> <entry 2> ...` where each entry is
//! `<key bytes> <value bytes>`. When the writer is in deterministic mode,
//! entries are sorted by the unsigned byte-lexicographic ordering of their
//! encoded key bytes before being emitted; ties are impossible because map
//! keys are unique.

use crate::error::Result;
use crate::reader::Reader;
use crate::tag::WireType;
use crate::writer::Writer;

/// Encode a map field at `field_number`. `encode_key`/`encode_value` write
/// one key or value's wire-level bytes (no outer framing) into the writer
/// passed to them.
pub fn write_map<K, V>(
    w: &mut Writer,
    field_number: u32,
    entries: impl IntoIterator<Item = (K, V)>,
    encode_key: impl Fn(&mut Writer, &K),
    encode_value: impl Fn(&mut Writer, &V),
) {
    if w.error().is_some() {
        return;
    }
    let mut entries: Vec<(K, V)> = entries.into_iter().collect();
    if w.is_deterministic() {
        let mut keyed: Vec<(Vec<u8>, (K, V))> = entries
            .into_iter()
            .map(|kv| {
                let mut kw = Writer::new();
                encode_key(&mut kw, &kv.0);
                (kw.to_vec(), kv)
            })
            .collect();
        keyed.sort_by(|a, b| a.0.cmp(&b.0));
        entries = keyed.into_iter().map(|(_, kv)| kv).collect();
    }

    w.write_tag(field_number, WireType::Bytes);
    let mark = w.begin_len_delimited();
    w.write_raw_uvarint(entries.len() as u64);
    for (k, v) in &entries {
        encode_key(w, k);
        encode_value(w, v);
    }
    w.end_len_delimited(mark);
}

/// Decode a map field at the reader's current position (the tag must
/// already have been consumed). Entries are returned in their encoded
/// (sorted, under a conforming deterministic encoder) order.
pub fn read_map<K, V>(
    r: &mut Reader,
    decode_key: impl Fn(&mut Reader) -> Result<K>,
    decode_value: impl Fn(&mut Reader) -> Result<V>,
) -> Result<Vec<(K, V)>> {
    let view = r.read_bytes_view()?;
    let bytes = view.get(r)?;
    r.enter_nested()?;
    let mut sub = Reader::new_nested(bytes, r.limits(), r.depth())?;
    let count = sub.read_collection_count(r.limits().max_map_size)?;
    let mut out = Vec::with_capacity(count.min(4096));
    for _ in 0..count {
        let k = decode_key(&mut sub)?;
        let v = decode_value(&mut sub)?;
        out.push((k, v));
    }
    if let Some(e) = sub.error() {
        return Err(e.clone());
    }
    r.exit_nested();
    Ok(out)
}
