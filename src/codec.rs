//! Record payload codecs.
//!
//! Two wire shapes are supported:
//!
//! | Shape | Encoding | Decoding |
//! |-------|----------|----------|
//! | JSON | object keyed by wire key, values in each kind's JSON form | shape check, then the kind's extractor on the scalar text |
//! | K/V | flat `[name, value, name, value, ...]` list of display strings | the kind's extractor on each value string |
//!
//! Only live fields are written or read. Unknown keys in a payload are
//! ignored. A live field absent from a payload (or `null` in JSON) keeps its
//! zero value and stays unfilled.

use crate::error::{DecodeError, EncodeError};
use crate::record::{DecodedRecord, Record};
use crate::schema::Schema;
use crate::value::JsonShape;
use serde::ser::{SerializeMap, Serializer};
use serde::Serialize;

/// Field name the JSON payload is stored under in a stream entry.
pub const JSON_FIELD: &str = "json";

struct JsonView<'a> {
    record: &'a Record,
    schema: &'a Schema,
}

impl Serialize for JsonView<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.schema.live_len()))?;
        for (i, field) in self.schema.live_fields() {
            if let Some(value) = self.record.get(i) {
                map.serialize_entry(&field.name, value)?;
            }
        }
        map.end()
    }
}

pub fn encode_json(record: &Record, schema: &Schema) -> Result<Vec<u8>, EncodeError> {
    Ok(serde_json::to_vec(&JsonView { record, schema })?)
}

pub fn encode_kv(record: &Record, schema: &Schema) -> Vec<String> {
    let mut out = Vec::with_capacity(schema.live_len() * 2);
    for (i, field) in schema.live_fields() {
        if let Some(value) = record.get(i) {
            out.push(field.name.clone());
            out.push(value.to_string());
        }
    }
    out
}

pub fn decode_json(bytes: &[u8], schema: &Schema) -> Result<DecodedRecord, DecodeError> {
    let parsed: serde_json::Value = serde_json::from_slice(bytes)?;
    let object = parsed.as_object().ok_or(DecodeError::NotAnObject)?;
    let mut decoded = DecodedRecord::new(schema);

    for (i, field) in schema.live_fields() {
        let raw = match object.get(&field.name) {
            None | Some(serde_json::Value::Null) => continue,
            Some(raw) => raw,
        };

        let text = match (field.kind.json_shape(), raw) {
            (JsonShape::String, serde_json::Value::String(s)) => s.clone(),
            (JsonShape::Number, serde_json::Value::Number(n)) => n.to_string(),
            _ => {
                return Err(DecodeError::TypeMismatch {
                    field: field.name.clone(),
                    kind: field.kind,
                    raw: raw.to_string(),
                })
            }
        };

        let extractor = schema.entry(i).extractor;
        extractor(&text, decoded.slot_mut(i)).map_err(|source| DecodeError::Field {
            field: field.name.clone(),
            source,
        })?;
    }

    Ok(decoded)
}

pub fn decode_kv<S: AsRef<str>>(pairs: &[S], schema: &Schema) -> Result<DecodedRecord, DecodeError> {
    if pairs.len() % 2 != 0 {
        return Err(DecodeError::OddPairs { len: pairs.len() });
    }

    let mut decoded = DecodedRecord::new(schema);
    for pair in pairs.chunks_exact(2) {
        let (name, raw) = (pair[0].as_ref(), pair[1].as_ref());
        let Some(i) = schema.position(name) else {
            continue;
        };
        let extractor = schema.entry(i).extractor;
        extractor(raw, decoded.slot_mut(i)).map_err(|source| DecodeError::Field {
            field: name.to_string(),
            source,
        })?;
    }

    Ok(decoded)
}
