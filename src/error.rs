//! Error types for schema construction, the codecs, the stores and the
//! benchmark loop.
//!
//! Every codec failure carries the field name and the raw input so the caller
//! can log it and abort the run.

use crate::store::EntryId;
use crate::value::FieldKind;
use std::io;
use thiserror::Error;

/// An extractor rejected its raw input.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("couldn't parse {kind} from {raw:?}: {reason}")]
pub struct ExtractError {
    pub kind: FieldKind,
    pub raw: String,
    pub reason: String,
}

impl ExtractError {
    pub fn new(kind: FieldKind, raw: &str, reason: impl Into<String>) -> Self {
        Self {
            kind,
            raw: raw.to_string(),
            reason: reason.into(),
        }
    }
}

#[derive(Debug, Error)]
pub enum EncodeError {
    #[error("couldn't encode JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("encoded JSON is not UTF-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),
}

#[derive(Debug, Error)]
pub enum DecodeError {
    /// Payload is not valid JSON.
    #[error("couldn't decode JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("JSON payload is not an object")]
    NotAnObject,

    /// JSON value has the wrong shape for the declared kind.
    #[error("field {field:?} expects {kind}, got {raw}")]
    TypeMismatch {
        field: String,
        kind: FieldKind,
        raw: String,
    },

    #[error("field {field:?}: {source}")]
    Field {
        field: String,
        #[source]
        source: ExtractError,
    },

    #[error("key/value payload has odd length {len}")]
    OddPairs { len: usize },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaError {
    #[error("field kind {0} is not registered")]
    UnregisteredKind(FieldKind),

    #[error("duplicate field name {name:?} (fields {first} and {second})")]
    DuplicateField {
        name: String,
        first: usize,
        second: usize,
    },

    #[error("registry has no field kinds")]
    EmptyRegistry,

    #[error("phrase {phrase:?} does not yield a field name")]
    InvalidName { phrase: String },
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Stream file failed validation.
    #[error("stream {stream:?} is corrupt: {reason}")]
    Corrupt { stream: String, reason: String },

    #[error("invalid stream key {0:?}")]
    InvalidStreamKey(String),
}

/// Benchmark phase, reported on cancellation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Fill,
    Read,
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Phase::Fill => f.write_str("fill"),
            Phase::Read => f.write_str("read"),
        }
    }
}

/// Any failure that aborts a benchmark run.
#[derive(Debug, Error)]
pub enum BenchError {
    #[error(transparent)]
    Schema(#[from] SchemaError),

    #[error(transparent)]
    Encode(#[from] EncodeError),

    #[error(transparent)]
    Decode(#[from] DecodeError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("store delivered {got} after {previous}")]
    OutOfOrder { previous: EntryId, got: EntryId },

    #[error("read back {got} of {expected} records")]
    ShortRead { expected: u64, got: u64 },

    #[error("stopped during {phase} after {completed} records")]
    Cancelled { phase: Phase, completed: u64 },

    #[error("record {index} decoded to different values")]
    Mismatch { index: u64 },

    #[error("entry {id} has no JSON payload")]
    MissingPayload { id: EntryId },
}
