//! File-backed stream store.
//!
//! Each stream is one append-only file under the store directory.
//!
//! # Binary Format
//!
//! ```text
//! Header:
//!   magic: [u8; 8]  = b"LGSTREAM"
//!   version: u32    = 1
//!
//! Body (one frame per entry):
//!   ms: u64
//!   seq: u64
//!   field_count: u32
//!   fields: field_count x (len: u32, bytes: [u8; len])
//! ```
//!
//! All integers are little-endian. The `(EntryId, offset)` index of a stream
//! is kept in memory and rebuilt by scanning the file the first time the
//! stream is touched.

use super::{validate_key, EntryId, LogStore, StreamEntry};
use crate::error::StoreError;
use std::collections::HashMap;
use std::fs::{self, File, OpenOptions};
use std::io::{self, BufReader, BufWriter, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Magic bytes identifying a stream file.
const MAGIC: &[u8; 8] = b"LGSTREAM";

/// Current format version.
const FORMAT_VERSION: u32 = 1;

/// Header size in bytes.
const HEADER_SIZE: u64 = 8 + 4; // magic + version

struct StreamFile {
    path: PathBuf,
    writer: BufWriter<File>,
    index: Vec<(EntryId, u64)>,
    end: u64,
    /// Set when an append failed midway.
    poisoned: bool,
}

pub struct FileStore {
    dir: PathBuf,
    streams: HashMap<String, StreamFile>,
    // Owns the directory when the store was created without one.
    _temp: Option<TempDir>,
}

impl FileStore {
    pub fn open<P: AsRef<Path>>(dir: P) -> Result<Self, StoreError> {
        fs::create_dir_all(&dir)?;
        Ok(Self {
            dir: dir.as_ref().to_path_buf(),
            streams: HashMap::new(),
            _temp: None,
        })
    }

    /// Store in a fresh temporary directory, removed on drop.
    pub fn temporary() -> Result<Self, StoreError> {
        let temp = TempDir::new()?;
        Ok(Self {
            dir: temp.path().to_path_buf(),
            streams: HashMap::new(),
            _temp: Some(temp),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn stream_path(&self, stream: &str) -> PathBuf {
        self.dir.join(format!("{stream}.log"))
    }

    fn stream(&mut self, stream: &str, create: bool) -> Result<Option<&mut StreamFile>, StoreError> {
        validate_key(stream)?;
        if !self.streams.contains_key(stream) {
            let path = self.stream_path(stream);
            let file = if path.exists() {
                scan_stream(stream, &path)?
            } else if create {
                create_stream(&path)?
            } else {
                return Ok(None);
            };
            self.streams.insert(stream.to_string(), file);
        }
        Ok(self.streams.get_mut(stream))
    }
}

fn write_header<W: Write>(writer: &mut W) -> io::Result<()> {
    writer.write_all(MAGIC)?;
    writer.write_all(&FORMAT_VERSION.to_le_bytes())?;
    Ok(())
}

/// Writes one frame and returns its length in bytes.
fn write_frame<W: Write>(writer: &mut W, id: EntryId, fields: &[String]) -> io::Result<u64> {
    let field_count = u32::try_from(fields.len())
        .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "too many fields"))?;
    if fields.iter().any(|f| u32::try_from(f.len()).is_err()) {
        return Err(io::Error::new(io::ErrorKind::InvalidInput, "field too large"));
    }

    writer.write_all(&id.ms.to_le_bytes())?;
    writer.write_all(&id.seq.to_le_bytes())?;
    writer.write_all(&field_count.to_le_bytes())?;
    let mut written = 8 + 8 + 4;

    for field in fields {
        let len = field.len() as u32;
        writer.write_all(&len.to_le_bytes())?;
        writer.write_all(field.as_bytes())?;
        written += 4 + field.len() as u64;
    }

    Ok(written)
}

/// Reads one frame. Returns `None` at a clean end of file.
fn read_frame<R: Read>(reader: &mut R) -> io::Result<Option<(StreamEntry, u64)>> {
    let mut buf4 = [0u8; 4];
    let mut buf8 = [0u8; 8];

    match reader.read_exact(&mut buf8) {
        Ok(()) => {}
        Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => return Ok(None),
        Err(e) => return Err(e),
    }
    let ms = u64::from_le_bytes(buf8);

    reader.read_exact(&mut buf8)?;
    let seq = u64::from_le_bytes(buf8);

    reader.read_exact(&mut buf4)?;
    let field_count = u32::from_le_bytes(buf4) as usize;
    let mut read = 8 + 8 + 4;

    let mut fields = Vec::with_capacity(field_count.min(1024));
    for _ in 0..field_count {
        reader.read_exact(&mut buf4)?;
        let len = u32::from_le_bytes(buf4) as usize;
        let mut bytes = vec![0u8; len];
        reader.read_exact(&mut bytes)?;
        let field = String::from_utf8(bytes)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
        fields.push(field);
        read += 4 + len as u64;
    }

    Ok(Some((
        StreamEntry {
            id: EntryId::new(ms, seq),
            fields,
        },
        read,
    )))
}

fn corrupt(stream: &str, reason: impl Into<String>) -> StoreError {
    StoreError::Corrupt {
        stream: stream.to_string(),
        reason: reason.into(),
    }
}

fn create_stream(path: &Path) -> Result<StreamFile, StoreError> {
    let file = File::create(path)?;
    let mut writer = BufWriter::with_capacity(64 * 1024, file);
    write_header(&mut writer)?;
    Ok(StreamFile {
        path: path.to_path_buf(),
        writer,
        index: Vec::new(),
        end: HEADER_SIZE,
        poisoned: false,
    })
}

/// Rebuilds the index of an existing stream file.
fn scan_stream(stream: &str, path: &Path) -> Result<StreamFile, StoreError> {
    let file = File::open(path)?;
    let mut reader = BufReader::with_capacity(64 * 1024, file);

    let mut magic = [0u8; 8];
    reader
        .read_exact(&mut magic)
        .map_err(|_| corrupt(stream, "missing header"))?;
    if &magic != MAGIC {
        return Err(corrupt(stream, format!("invalid magic bytes: {magic:?}")));
    }

    let mut buf4 = [0u8; 4];
    reader
        .read_exact(&mut buf4)
        .map_err(|_| corrupt(stream, "missing header"))?;
    let version = u32::from_le_bytes(buf4);
    if version != FORMAT_VERSION {
        return Err(corrupt(stream, format!("unsupported format version: {version}")));
    }

    let mut index = Vec::new();
    let mut offset = HEADER_SIZE;
    let mut last: Option<EntryId> = None;
    loop {
        let frame = read_frame(&mut reader).map_err(|e| corrupt(stream, format!("at offset {offset}: {e}")))?;
        let Some((entry, len)) = frame else {
            break;
        };
        if last.is_some_and(|prev| entry.id <= prev) {
            return Err(corrupt(stream, format!("entry {} is not after {:?}", entry.id, last)));
        }
        last = Some(entry.id);
        index.push((entry.id, offset));
        offset += len;
    }

    let file = OpenOptions::new().append(true).open(path)?;
    Ok(StreamFile {
        path: path.to_path_buf(),
        writer: BufWriter::with_capacity(64 * 1024, file),
        index,
        end: offset,
        poisoned: false,
    })
}

impl LogStore for FileStore {
    fn name(&self) -> &'static str {
        "file"
    }

    fn append(&mut self, stream: &str, fields: &[String]) -> Result<EntryId, StoreError> {
        let Some(file) = self.stream(stream, true)? else {
            return Err(corrupt(stream, "stream could not be created"));
        };
        if file.poisoned {
            return Err(corrupt(stream, "an earlier append failed"));
        }
        let id = EntryId::next_after(file.index.last().map(|(id, _)| *id));

        let mut frame = Vec::new();
        let len = write_frame(&mut frame, id, fields)?;
        if let Err(e) = file.writer.write_all(&frame) {
            // The writer may hold part of the frame; later offsets can't be trusted.
            file.poisoned = true;
            return Err(e.into());
        }
        file.index.push((id, file.end));
        file.end += len;
        Ok(id)
    }

    fn read_from(
        &mut self,
        stream: &str,
        after: EntryId,
        count: usize,
    ) -> Result<Option<Vec<StreamEntry>>, StoreError> {
        let Some(file) = self.stream(stream, false)? else {
            return Ok(None);
        };
        if file.poisoned {
            return Err(corrupt(stream, "an earlier append failed"));
        }

        let start = file.index.partition_point(|(id, _)| *id <= after);
        if start >= file.index.len() {
            return Ok(None);
        }
        let end = start.saturating_add(count.max(1)).min(file.index.len());

        file.writer.flush()?;
        let mut reader = BufReader::with_capacity(64 * 1024, File::open(&file.path)?);
        reader.seek(SeekFrom::Start(file.index[start].1))?;

        let mut out = Vec::with_capacity(end - start);
        for _ in start..end {
            match read_frame(&mut reader)? {
                Some((entry, _)) => out.push(entry),
                None => return Err(corrupt(stream, "index points past end of file")),
            }
        }
        Ok(Some(out))
    }

    fn delete(&mut self, stream: &str) -> Result<bool, StoreError> {
        validate_key(stream)?;
        self.streams.remove(stream);
        let path = self.stream_path(stream);
        match fs::remove_file(&path) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }
}
