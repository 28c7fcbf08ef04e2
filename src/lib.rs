use clap::ValueEnum;

pub mod benches;
pub mod codec;
pub mod error;
pub mod harness;
pub mod logging;
pub mod names;
pub mod record;
pub mod registry;
pub mod report;
pub mod schema;
pub mod store;
pub mod value;

pub use error::{BenchError, DecodeError, EncodeError, ExtractError, SchemaError, StoreError};
pub use record::{generate_record, DecodedRecord, Record};
pub use registry::Registry;
pub use schema::{DuplicatePolicy, FieldSpec, Schema, SchemaBuilder};
pub use value::{FieldKind, Value};

use benches::roundtrip::Encoding;

/// Payload encoding(s) to run through the store.
#[derive(Clone, Copy, Debug, Default, ValueEnum, PartialEq, Eq)]
pub enum EncodingSelection {
    /// JSON blob first, then flattened key/value pairs.
    #[default]
    All,
    /// Single JSON-encoded value per entry.
    Json,
    /// Flattened name/value string pairs per entry.
    Kv,
}

impl EncodingSelection {
    pub fn encodings(&self) -> Vec<Encoding> {
        match self {
            EncodingSelection::All => Encoding::ALL.to_vec(),
            EncodingSelection::Json => vec![Encoding::Json],
            EncodingSelection::Kv => vec![Encoding::Kv],
        }
    }
}

/// Store backend to benchmark.
#[derive(Clone, Copy, Debug, Default, ValueEnum, PartialEq, Eq)]
pub enum StoreKind {
    /// In-process streams.
    #[default]
    Memory,
    /// One append-only file per stream.
    File,
}
