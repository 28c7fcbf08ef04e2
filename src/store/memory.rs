use super::{validate_key, EntryId, LogStore, StreamEntry};
use crate::error::StoreError;
use std::collections::HashMap;

/// Streams held in process memory.
#[derive(Debug, Default)]
pub struct MemoryStore {
    streams: HashMap<String, Vec<StreamEntry>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self, stream: &str) -> usize {
        self.streams.get(stream).map_or(0, Vec::len)
    }
}

impl LogStore for MemoryStore {
    fn name(&self) -> &'static str {
        "memory"
    }

    fn append(&mut self, stream: &str, fields: &[String]) -> Result<EntryId, StoreError> {
        validate_key(stream)?;
        let entries = self.streams.entry(stream.to_string()).or_default();
        let id = EntryId::next_after(entries.last().map(|e| e.id));
        entries.push(StreamEntry {
            id,
            fields: fields.to_vec(),
        });
        Ok(id)
    }

    fn read_from(
        &mut self,
        stream: &str,
        after: EntryId,
        count: usize,
    ) -> Result<Option<Vec<StreamEntry>>, StoreError> {
        validate_key(stream)?;
        let Some(entries) = self.streams.get(stream) else {
            return Ok(None);
        };

        let start = entries.partition_point(|e| e.id <= after);
        if start >= entries.len() {
            return Ok(None);
        }
        let end = start.saturating_add(count.max(1)).min(entries.len());
        Ok(Some(entries[start..end].to_vec()))
    }

    fn delete(&mut self, stream: &str) -> Result<bool, StoreError> {
        validate_key(stream)?;
        Ok(self.streams.remove(stream).is_some())
    }
}
