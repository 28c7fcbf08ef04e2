//! Generated and decoded records.
//!
//! Both are schema-indexed slot vectors: slot `i` holds the value of
//! `schema.fields()[i]`.

use crate::schema::Schema;
use crate::value::Value;
use rand::RngCore;

/// One synthetic record, consumed by a single encoding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    values: Vec<Value>,
}

impl Record {
    pub fn values(&self) -> &[Value] {
        &self.values
    }

    pub fn get(&self, position: usize) -> Option<&Value> {
        self.values.get(position)
    }

    /// Looks a value up by wire key.
    pub fn field<'a>(&'a self, schema: &Schema, name: &str) -> Option<&'a Value> {
        schema.position(name).and_then(|i| self.values.get(i))
    }

    #[cfg(test)]
    pub(crate) fn from_values(values: Vec<Value>) -> Self {
        Self { values }
    }
}

/// Calls each field's generator in schema order.
pub fn generate_record(schema: &Schema, rng: &mut dyn RngCore) -> Record {
    let values = (0..schema.len())
        .map(|i| (schema.entry(i).generator)(rng))
        .collect();
    Record { values }
}

/// Record-shaped container filled in place by the extractors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedRecord {
    values: Vec<Value>,
    filled: Vec<bool>,
}

impl DecodedRecord {
    /// Allocates one zero-valued slot per field.
    pub fn new(schema: &Schema) -> Self {
        Self {
            values: schema.fields().iter().map(|f| f.kind.zero()).collect(),
            filled: vec![false; schema.len()],
        }
    }

    pub(crate) fn slot_mut(&mut self, position: usize) -> &mut Value {
        self.filled[position] = true;
        &mut self.values[position]
    }

    pub fn values(&self) -> &[Value] {
        &self.values
    }

    pub fn get(&self, position: usize) -> Option<&Value> {
        self.values.get(position)
    }

    pub fn is_filled(&self, position: usize) -> bool {
        self.filled.get(position).copied().unwrap_or(false)
    }

    /// True when every live field matches `record`.
    pub fn matches(&self, record: &Record, schema: &Schema) -> bool {
        schema
            .live_fields()
            .all(|(i, _)| self.is_filled(i) && self.values.get(i) == record.values.get(i))
    }
}
