//! Append-only stream stores the benchmark writes to and reads back from.
//!
//! A stream is an ordered log of entries keyed by a stream name. Each entry
//! carries a flat `[name, value, ...]` field list and an [`EntryId`] that
//! strictly increases within the stream. Readers page through a stream with a
//! cursor: the id of the last entry they consumed.

pub mod file;
pub mod memory;

pub use file::FileStore;
pub use memory::MemoryStore;

use crate::error::StoreError;
use std::fmt;
use std::str::FromStr;
use std::time::{SystemTime, UNIX_EPOCH};

/// Entry position within a stream, rendered as `<ms>-<seq>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct EntryId {
    pub ms: u64,
    pub seq: u64,
}

impl EntryId {
    /// Cursor that precedes every entry.
    pub const ZERO: EntryId = EntryId { ms: 0, seq: 0 };

    pub fn new(ms: u64, seq: u64) -> Self {
        Self { ms, seq }
    }

    /// Next id after `last`, taken from the wall clock when it has advanced.
    pub fn next_after(last: Option<EntryId>) -> EntryId {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or_default();
        match last {
            Some(prev) if now <= prev.ms => EntryId::new(prev.ms, prev.seq + 1),
            _ => EntryId::new(now.max(1), 0),
        }
    }
}

impl fmt::Display for EntryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.ms, self.seq)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseEntryIdError(String);

impl fmt::Display for ParseEntryIdError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid entry id {:?}", self.0)
    }
}

impl std::error::Error for ParseEntryIdError {}

impl FromStr for EntryId {
    type Err = ParseEntryIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || ParseEntryIdError(s.to_string());
        let (ms, seq) = s.split_once('-').ok_or_else(err)?;
        Ok(EntryId {
            ms: ms.parse().map_err(|_| err())?,
            seq: seq.parse().map_err(|_| err())?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamEntry {
    pub id: EntryId,
    pub fields: Vec<String>,
}

impl StreamEntry {
    /// Value stored under `name`, if any.
    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields
            .chunks_exact(2)
            .find(|pair| pair[0] == name)
            .map(|pair| pair[1].as_str())
    }
}

pub trait LogStore {
    /// Short backend name for reports.
    fn name(&self) -> &'static str;

    /// Appends one entry and returns its id.
    fn append(&mut self, stream: &str, fields: &[String]) -> Result<EntryId, StoreError>;

    /// Returns up to `count` entries with ids greater than `after`, oldest
    /// first, or `None` when there is nothing past the cursor.
    fn read_from(
        &mut self,
        stream: &str,
        after: EntryId,
        count: usize,
    ) -> Result<Option<Vec<StreamEntry>>, StoreError>;

    /// Drops a stream. Returns whether it existed.
    fn delete(&mut self, stream: &str) -> Result<bool, StoreError>;
}

fn validate_key(stream: &str) -> Result<(), StoreError> {
    let ok = !stream.is_empty()
        && stream
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    if ok {
        Ok(())
    } else {
        Err(StoreError::InvalidStreamKey(stream.to_string()))
    }
}
