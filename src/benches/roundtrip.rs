//! Store round-trip benchmark.
//!
//! For each encoding: fill a fresh stream with `items` generated records,
//! read the stream back from the start while decoding every entry (timed),
//! then delete the stream.
//!
//! Records are generated from per-item seeds, so payloads are identical
//! regardless of how the parallel generation is scheduled, and a verify pass
//! can regenerate record `i` without keeping the originals around.

use crate::codec::{decode_json, decode_kv, encode_json, encode_kv, JSON_FIELD};
use crate::error::{BenchError, EncodeError, Phase};
use crate::harness::{BenchConfig, StopFlag};
use crate::record::{generate_record, DecodedRecord, Record};
use crate::registry::random_v4;
use crate::report::Measurement;
use crate::schema::Schema;
use crate::store::{EntryId, LogStore, StreamEntry};
use rand::RngCore;
use rayon::prelude::*;
use serde_json::json;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Records generated per parallel batch during the fill phase.
const FILL_BATCH: usize = 4096;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Encoding {
    Json,
    Kv,
}

impl Encoding {
    pub const ALL: [Encoding; 2] = [Encoding::Json, Encoding::Kv];

    pub fn as_str(&self) -> &'static str {
        match self {
            Encoding::Json => "json",
            Encoding::Kv => "kv",
        }
    }

    fn label(&self) -> &'static str {
        match self {
            Encoding::Json => "JSON",
            Encoding::Kv => "K/V",
        }
    }
}

#[derive(Clone, Debug)]
pub struct RoundtripArgs {
    pub items: u64,
    /// Maximum entries per read call.
    pub batch: usize,
    pub encodings: Vec<Encoding>,
    /// Compare every decoded record with a regenerated original.
    pub verify: bool,
}

impl Default for RoundtripArgs {
    fn default() -> Self {
        Self {
            items: 10_000,
            batch: 100,
            encodings: Encoding::ALL.to_vec(),
            verify: false,
        }
    }
}

/// Encodes one record as stream entry fields.
pub fn encode_entry(encoding: Encoding, record: &Record, schema: &Schema) -> Result<Vec<String>, EncodeError> {
    match encoding {
        Encoding::Json => {
            let json = String::from_utf8(encode_json(record, schema)?)?;
            Ok(vec![JSON_FIELD.to_string(), json])
        }
        Encoding::Kv => Ok(encode_kv(record, schema)),
    }
}

/// Decodes one stream entry.
pub fn decode_entry(encoding: Encoding, entry: &StreamEntry, schema: &Schema) -> Result<DecodedRecord, BenchError> {
    match encoding {
        Encoding::Json => {
            let json = entry
                .field(JSON_FIELD)
                .ok_or(BenchError::MissingPayload { id: entry.id })?;
            Ok(decode_json(json.as_bytes(), schema)?)
        }
        Encoding::Kv => Ok(decode_kv(&entry.fields, schema)?),
    }
}

fn payload_bytes(fields: &[String]) -> u64 {
    fields.iter().map(|f| f.len() as u64).sum()
}

fn progress_step(items: u64) -> u64 {
    (items / 10).max(1)
}

struct FillStats {
    bytes: u64,
    elapsed: Duration,
}

struct ReadStats {
    records: u64,
    bytes: u64,
    elapsed: Duration,
    decoded: Vec<DecodedRecord>,
}

pub fn run(
    cfg: &BenchConfig,
    args: &RoundtripArgs,
    schema: &Schema,
    store: &mut dyn LogStore,
    rng: &mut dyn RngCore,
    stop: &StopFlag,
) -> Result<Vec<Measurement>, BenchError> {
    let mut out = Vec::new();
    for &encoding in &args.encodings {
        let stream = random_v4(rng).to_string();
        let result = run_encoding(cfg, args, schema, store, &stream, encoding, stop);

        info!(stream = %stream, "Cleaning up {}...", encoding.label());
        match (result, store.delete(&stream)) {
            (Ok(measurements), Ok(_)) => out.extend(measurements),
            (Ok(_), Err(e)) => return Err(e.into()),
            (Err(e), cleanup) => {
                if let Err(cleanup) = cleanup {
                    warn!(stream = %stream, error = %cleanup, "cleanup after failure failed");
                }
                return Err(e);
            }
        }
    }
    Ok(out)
}

fn run_encoding(
    cfg: &BenchConfig,
    args: &RoundtripArgs,
    schema: &Schema,
    store: &mut dyn LogStore,
    stream: &str,
    encoding: Encoding,
    stop: &StopFlag,
) -> Result<Vec<Measurement>, BenchError> {
    info!(stream = %stream, items = args.items, "Filling {}...", encoding.label());
    let fill = fill(cfg, args, schema, store, stream, encoding, stop)?;

    info!(stream = %stream, "Reading {}...", encoding.label());
    let read = read_back(args, schema, store, stream, encoding, stop)?;
    info!(took = ?read.elapsed, records = read.records, "Done");

    if args.verify {
        verify(cfg, schema, &read.decoded)?;
        debug!(records = read.decoded.len(), "verified");
    }

    let name = encoding.as_str();
    let extra = json!({
        "store": store.name(),
        "fields": schema.len(),
        "live_fields": schema.live_len(),
        "batch": args.batch,
        "verified": args.verify,
    });

    Ok(vec![
        Measurement::timed(
            format!("roundtrip.{name}.write"),
            "ns/record",
            args.items,
            0,
            fill.elapsed.as_nanos(),
            Some(fill.bytes),
            extra.clone(),
        ),
        Measurement::timed(
            format!("roundtrip.{name}.read"),
            "ns/record",
            read.records,
            0,
            read.elapsed.as_nanos(),
            Some(read.bytes),
            extra,
        ),
    ])
}

/// Appends `items` records. Only the appends are timed.
fn fill(
    cfg: &BenchConfig,
    args: &RoundtripArgs,
    schema: &Schema,
    store: &mut dyn LogStore,
    stream: &str,
    encoding: Encoding,
    stop: &StopFlag,
) -> Result<FillStats, BenchError> {
    let count = args.items as usize;
    let step = progress_step(args.items);
    let mut bytes = 0u64;
    let mut elapsed = Duration::ZERO;

    let mut start = 0usize;
    while start < count {
        let end = (start + FILL_BATCH).min(count);

        // Range is an IndexedParallelIterator; collect preserves order.
        let payloads: Vec<Vec<String>> = (start..end)
            .into_par_iter()
            .map(|i| {
                let mut rng = cfg.item_rng(i as u64);
                let record = generate_record(schema, &mut rng);
                encode_entry(encoding, &record, schema)
            })
            .collect::<Result<_, EncodeError>>()?;

        let t = Instant::now();
        for (offset, payload) in payloads.iter().enumerate() {
            let done = (start + offset) as u64;
            if stop.is_stopped() {
                return Err(BenchError::Cancelled {
                    phase: Phase::Fill,
                    completed: done,
                });
            }
            store.append(stream, payload)?;
            bytes += payload_bytes(payload);
            if (done + 1) % step == 0 {
                debug!(done = done + 1, total = args.items, "filling");
            }
        }
        elapsed += t.elapsed();

        start = end;
    }

    Ok(FillStats { bytes, elapsed })
}

/// Pages through the stream from the start, decoding every entry.
fn read_back(
    args: &RoundtripArgs,
    schema: &Schema,
    store: &mut dyn LogStore,
    stream: &str,
    encoding: Encoding,
    stop: &StopFlag,
) -> Result<ReadStats, BenchError> {
    let step = progress_step(args.items);
    let mut cursor = EntryId::ZERO;
    let mut records = 0u64;
    let mut bytes = 0u64;
    let mut decoded = Vec::new();

    let start = Instant::now();
    'read: while records < args.items {
        let Some(batch) = store.read_from(stream, cursor, args.batch)? else {
            break;
        };

        for entry in batch {
            if stop.is_stopped() {
                return Err(BenchError::Cancelled {
                    phase: Phase::Read,
                    completed: records,
                });
            }
            if entry.id <= cursor {
                return Err(BenchError::OutOfOrder {
                    previous: cursor,
                    got: entry.id,
                });
            }
            cursor = entry.id;

            let record = decode_entry(encoding, &entry, schema)?;
            bytes += payload_bytes(&entry.fields);
            records += 1;
            if args.verify {
                decoded.push(record);
            }
            if records % step == 0 {
                debug!(done = records, total = args.items, "reading");
            }
            if records == args.items {
                break 'read;
            }
        }
    }
    let elapsed = start.elapsed();

    if records < args.items {
        return Err(BenchError::ShortRead {
            expected: args.items,
            got: records,
        });
    }

    Ok(ReadStats {
        records,
        bytes,
        elapsed,
        decoded,
    })
}

fn verify(cfg: &BenchConfig, schema: &Schema, decoded: &[DecodedRecord]) -> Result<(), BenchError> {
    let mismatch = decoded.par_iter().enumerate().find_first(|(i, d)| {
        let original = generate_record(schema, &mut cfg.item_rng(*i as u64));
        !d.matches(&original, schema)
    });
    match mismatch {
        Some((index, _)) => Err(BenchError::Mismatch { index: index as u64 }),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StoreError;
    use crate::harness::Profile;
    use crate::store::{FileStore, MemoryStore};
    use rand_chacha::ChaCha8Rng;

    fn setup(seed: u64, fields: usize) -> (BenchConfig, Schema, ChaCha8Rng) {
        let cfg = BenchConfig {
            profile: Profile::Quick,
            seed,
        };
        let mut rng = cfg.rng();
        let schema = Schema::generate(fields, &mut rng).unwrap();
        (cfg, schema, rng)
    }

    fn args(items: u64, verify: bool) -> RoundtripArgs {
        RoundtripArgs {
            items,
            batch: 7,
            encodings: Encoding::ALL.to_vec(),
            verify,
        }
    }

    #[test]
    fn test_roundtrip_memory_store() {
        let (cfg, schema, mut rng) = setup(1, 12);
        let mut store = MemoryStore::new();
        let out = run(&cfg, &args(50, true), &schema, &mut store, &mut rng, &StopFlag::new()).unwrap();

        let names: Vec<_> = out.iter().map(|m| m.name.as_str()).collect();
        assert_eq!(
            names,
            vec!["roundtrip.json.write", "roundtrip.json.read", "roundtrip.kv.write", "roundtrip.kv.read"]
        );
        for m in &out {
            assert_eq!(m.iters, 50);
            assert!(m.bytes_processed.unwrap() > 0);
            assert_eq!(m.extra["store"], "memory");
        }
    }

    #[test]
    fn test_roundtrip_file_store_crosses_fill_batches() {
        let (cfg, schema, mut rng) = setup(2, 4);
        let mut store = FileStore::temporary().unwrap();
        let items = (FILL_BATCH + 10) as u64;
        let mut a = args(items, true);
        a.batch = 500;
        a.encodings = vec![Encoding::Kv];
        let out = run(&cfg, &a, &schema, &mut store, &mut rng, &StopFlag::new()).unwrap();
        assert_eq!(out[1].iters, items);
        assert_eq!(out[1].extra["store"], "file");
    }

    #[test]
    fn test_streams_are_deleted() {
        let (cfg, schema, mut rng) = setup(3, 3);
        let mut store = MemoryStore::new();
        let mut key_rng = rng.clone();
        run(&cfg, &args(5, false), &schema, &mut store, &mut rng, &StopFlag::new()).unwrap();

        let json_stream = random_v4(&mut key_rng).to_string();
        let kv_stream = random_v4(&mut key_rng).to_string();
        assert_eq!(store.len(&json_stream), 0);
        assert_eq!(store.len(&kv_stream), 0);
    }

    #[test]
    fn test_payloads_are_deterministic() {
        let (cfg, schema, _) = setup(4, 6);
        let r1 = generate_record(&schema, &mut cfg.item_rng(17));
        let r2 = generate_record(&schema, &mut cfg.item_rng(17));
        assert_eq!(
            encode_entry(Encoding::Json, &r1, &schema).unwrap(),
            encode_entry(Encoding::Json, &r2, &schema).unwrap()
        );
    }

    #[test]
    fn test_cancelled_before_fill() {
        let (cfg, schema, mut rng) = setup(5, 3);
        let mut store = MemoryStore::new();
        let stop = StopFlag::new();
        stop.stop();
        let err = run(&cfg, &args(10, false), &schema, &mut store, &mut rng, &stop).unwrap_err();
        assert!(matches!(
            err,
            BenchError::Cancelled {
                phase: Phase::Fill,
                completed: 0
            }
        ));
    }

    /// Store that raises the stop flag once a number of entries are in.
    struct Interrupting {
        inner: MemoryStore,
        stop: StopFlag,
        after: usize,
    }

    impl LogStore for Interrupting {
        fn name(&self) -> &'static str {
            "interrupting"
        }
        fn append(&mut self, stream: &str, fields: &[String]) -> Result<EntryId, StoreError> {
            let id = self.inner.append(stream, fields)?;
            if self.inner.len(stream) == self.after {
                self.stop.stop();
            }
            Ok(id)
        }
        fn read_from(&mut self, stream: &str, after: EntryId, count: usize) -> Result<Option<Vec<StreamEntry>>, StoreError> {
            self.inner.read_from(stream, after, count)
        }
        fn delete(&mut self, stream: &str) -> Result<bool, StoreError> {
            self.inner.delete(stream)
        }
    }

    #[test]
    fn test_cancelled_mid_fill_deletes_stream() {
        let (cfg, schema, mut rng) = setup(10, 4);
        let stop = StopFlag::new();
        let mut store = Interrupting {
            inner: MemoryStore::new(),
            stop: stop.clone(),
            after: 3,
        };
        let mut key_rng = rng.clone();
        let err = run(&cfg, &args(10, false), &schema, &mut store, &mut rng, &stop).unwrap_err();
        assert!(matches!(
            err,
            BenchError::Cancelled {
                phase: Phase::Fill,
                completed: 3
            }
        ));

        let json_stream = random_v4(&mut key_rng).to_string();
        assert_eq!(store.inner.len(&json_stream), 0);
    }

    /// Store that stops answering after a fixed number of entries.
    struct Truncating {
        inner: MemoryStore,
        limit: usize,
    }

    impl LogStore for Truncating {
        fn name(&self) -> &'static str {
            "truncating"
        }
        fn append(&mut self, stream: &str, fields: &[String]) -> Result<EntryId, StoreError> {
            self.inner.append(stream, fields)
        }
        fn read_from(&mut self, stream: &str, after: EntryId, count: usize) -> Result<Option<Vec<StreamEntry>>, StoreError> {
            let delivered = self.inner.read_from(stream, EntryId::ZERO, usize::MAX)?.unwrap_or_default();
            let seen = delivered.iter().filter(|e| e.id <= after).count();
            if seen >= self.limit {
                return Ok(None);
            }
            self.inner.read_from(stream, after, count.min(self.limit - seen))
        }
        fn delete(&mut self, stream: &str) -> Result<bool, StoreError> {
            self.inner.delete(stream)
        }
    }

    #[test]
    fn test_short_read() {
        let (cfg, schema, mut rng) = setup(6, 3);
        let mut store = Truncating {
            inner: MemoryStore::new(),
            limit: 4,
        };
        let err = run(&cfg, &args(10, false), &schema, &mut store, &mut rng, &StopFlag::new()).unwrap_err();
        assert!(matches!(err, BenchError::ShortRead { expected: 10, got: 4 }));
    }

    /// Store that replays the first entry after every batch.
    struct Replaying {
        inner: MemoryStore,
    }

    impl LogStore for Replaying {
        fn name(&self) -> &'static str {
            "replaying"
        }
        fn append(&mut self, stream: &str, fields: &[String]) -> Result<EntryId, StoreError> {
            self.inner.append(stream, fields)
        }
        fn read_from(&mut self, stream: &str, after: EntryId, count: usize) -> Result<Option<Vec<StreamEntry>>, StoreError> {
            let first = self.inner.read_from(stream, EntryId::ZERO, 1)?;
            let batch = self.inner.read_from(stream, after, count)?;
            Ok(match (batch, first) {
                (Some(mut batch), Some(first)) if after != EntryId::ZERO => {
                    batch.extend(first);
                    Some(batch)
                }
                (batch, _) => batch,
            })
        }
        fn delete(&mut self, stream: &str) -> Result<bool, StoreError> {
            self.inner.delete(stream)
        }
    }

    #[test]
    fn test_out_of_order_detected() {
        let (cfg, schema, mut rng) = setup(7, 3);
        let mut store = Replaying {
            inner: MemoryStore::new(),
        };
        let mut a = args(20, false);
        a.batch = 5;
        let err = run(&cfg, &a, &schema, &mut store, &mut rng, &StopFlag::new()).unwrap_err();
        assert!(matches!(err, BenchError::OutOfOrder { .. }));
    }

    #[test]
    fn test_json_entry_without_payload() {
        let (_, schema, _) = setup(8, 2);
        let entry = StreamEntry {
            id: EntryId::new(1, 0),
            fields: vec!["other".into(), "{}".into()],
        };
        assert!(matches!(
            decode_entry(Encoding::Json, &entry, &schema),
            Err(BenchError::MissingPayload { .. })
        ));
    }

    #[test]
    fn test_verify_catches_mismatch() {
        let (cfg, schema, _) = setup(9, 5);
        let wrong = generate_record(&schema, &mut cfg.item_rng(1));
        let kv = encode_kv(&wrong, &schema);
        let decoded = vec![decode_kv(&kv, &schema).unwrap()];
        assert!(matches!(verify(&cfg, &schema, &decoded), Err(BenchError::Mismatch { index: 0 })));
    }
}
