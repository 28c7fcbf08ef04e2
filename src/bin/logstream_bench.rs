use clap::{Parser, Subcommand, ValueEnum};
use logstream_bench::benches::{self, roundtrip::RoundtripArgs};
use logstream_bench::harness::{BenchConfig, Profile, StopFlag};
use logstream_bench::names::Babbler;
use logstream_bench::report::{BenchReport, RunMeta};
use logstream_bench::store::{FileStore, LogStore, MemoryStore};
use logstream_bench::{
    logging, BenchError, DuplicatePolicy, EncodingSelection, Registry, Schema, SchemaBuilder, StoreKind,
};
use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{error, info};

#[derive(Clone, Copy, Debug, ValueEnum)]
enum ProfileArg {
    Quick,
    Full,
}

impl From<ProfileArg> for Profile {
    fn from(v: ProfileArg) -> Self {
        match v {
            ProfileArg::Quick => Profile::Quick,
            ProfileArg::Full => Profile::Full,
        }
    }
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Fill a stream, read it back with decoding (timed), delete it; per encoding.
    Roundtrip {
        #[command(flatten)]
        store: StoreArgs,
    },

    /// In-process encode/decode micro-benchmarks (no store).
    Codec,

    /// Run codec and round-trip benches.
    Suite {
        #[command(flatten)]
        store: StoreArgs,
    },

    /// Print the generated schema as JSON and exit.
    Schema,
}

#[derive(clap::Args, Debug)]
struct StoreArgs {
    /// Records written and read back per encoding.
    #[arg(long, env = "LOGSTREAM_BENCH_ITEMS", default_value_t = 10_000)]
    items: u64,

    /// Maximum entries per read call.
    #[arg(long, env = "LOGSTREAM_BENCH_BATCH", default_value_t = 100)]
    batch: usize,

    #[arg(long, value_enum, env = "LOGSTREAM_BENCH_STORE", default_value_t = StoreKind::Memory)]
    store: StoreKind,

    /// Directory for the file store. A temporary directory is used if omitted.
    #[arg(long, env = "LOGSTREAM_BENCH_DATA_DIR", value_name = "DIR")]
    data_dir: Option<PathBuf>,

    #[arg(long, value_enum, env = "LOGSTREAM_BENCH_ENCODING", default_value_t = EncodingSelection::All)]
    encoding: EncodingSelection,

    /// Compare every decoded record against its generated original.
    #[arg(long, env = "LOGSTREAM_BENCH_VERIFY", default_value_t = false)]
    verify: bool,
}

#[derive(Parser, Debug)]
#[command(name = "logstream-bench")]
#[command(about = "Append-only log store round-trip benchmark over a random record schema (JSON output)")]
struct Args {
    #[arg(long, value_enum, env = "LOGSTREAM_BENCH_PROFILE", default_value_t = ProfileArg::Quick, global = true)]
    profile: ProfileArg,

    /// Master seed. Random if omitted; always recorded in the report.
    #[arg(long, env = "LOGSTREAM_BENCH_SEED", global = true)]
    seed: Option<u64>,

    /// Number of fields in the generated schema.
    #[arg(long, env = "LOGSTREAM_BENCH_FIELDS", default_value_t = 16, global = true)]
    fields: usize,

    /// Fail instead of shadowing earlier fields when generated names collide.
    #[arg(long, env = "LOGSTREAM_BENCH_REJECT_DUPLICATES", default_value_t = false, global = true)]
    reject_duplicates: bool,

    /// Where to write the JSON report. If omitted, prints to stdout.
    #[arg(long, env = "LOGSTREAM_BENCH_OUT", global = true)]
    out: Option<PathBuf>,

    /// Log filter used when RUST_LOG is unset.
    #[arg(long, default_value = "info", global = true)]
    log_level: String,

    #[command(subcommand)]
    cmd: Command,
}

fn now_utc_rfc3339() -> String {
    // Format: unix:<secs>
    use std::time::{SystemTime, UNIX_EPOCH};
    let secs = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs();
    format!("unix:{secs}")
}

fn open_store(args: &StoreArgs) -> Result<Box<dyn LogStore>, BenchError> {
    let file_store = match (args.store, &args.data_dir) {
        (StoreKind::Memory, _) => return Ok(Box::new(MemoryStore::new())),
        (StoreKind::File, Some(dir)) => FileStore::open(dir)?,
        (StoreKind::File, None) => FileStore::temporary()?,
    };
    info!(dir = %file_store.dir().display(), "file store");
    Ok(Box::new(file_store))
}

fn roundtrip_args(args: &StoreArgs) -> RoundtripArgs {
    RoundtripArgs {
        items: args.items,
        batch: args.batch.max(1),
        encodings: args.encoding.encodings(),
        verify: args.verify,
    }
}

fn run(args: Args) -> Result<(), BenchError> {
    let cfg = BenchConfig {
        profile: args.profile.into(),
        seed: args.seed.unwrap_or_else(rand::random),
    };
    let mut rng = cfg.rng();

    let policy = if args.reject_duplicates {
        DuplicatePolicy::Reject
    } else {
        DuplicatePolicy::Overwrite
    };
    let schema: Schema = SchemaBuilder::new(Registry::builtin())
        .duplicates(policy)
        .build(args.fields, &mut Babbler::default(), &mut rng)?;
    info!(seed = cfg.seed, "Type: {schema}");

    let stop = StopFlag::new();
    stop.stop_on_ctrl_c()?;
    let mut measurements = Vec::new();
    let mut store_name = "none";
    let mut items = 0;

    match &args.cmd {
        Command::Roundtrip { store } => {
            let mut backend = open_store(store)?;
            store_name = backend.name();
            items = store.items;
            measurements.extend(benches::roundtrip::run(
                &cfg,
                &roundtrip_args(store),
                &schema,
                backend.as_mut(),
                &mut rng,
                &stop,
            )?);
        }
        Command::Codec => {
            measurements.extend(benches::codec::run(&cfg, &schema)?);
        }
        Command::Suite { store } => {
            measurements.extend(benches::codec::run(&cfg, &schema)?);

            let mut backend = open_store(store)?;
            store_name = backend.name();
            items = store.items;
            measurements.extend(benches::roundtrip::run(
                &cfg,
                &roundtrip_args(store),
                &schema,
                backend.as_mut(),
                &mut rng,
                &stop,
            )?);
        }
        Command::Schema => {
            let json = serde_json::to_string_pretty(&schema.describe()).map_err(std::io::Error::other)?;
            println!("{json}");
            return Ok(());
        }
    }

    let report = BenchReport {
        run: RunMeta {
            schema_version: 1,
            bench_version: env!("CARGO_PKG_VERSION").to_string(),
            profile: cfg.profile.as_str().to_string(),
            seed: cfg.seed,
            timestamp_utc: now_utc_rfc3339(),
            store: store_name.to_string(),
            fields: schema.len(),
            items,
        },
        schema: schema.describe(),
        measurements,
    };

    let json = serde_json::to_string_pretty(&report).map_err(std::io::Error::other)?;
    if let Some(out) = args.out {
        fs::write(&out, json)?;
        info!(path = %out.display(), "report written");
    } else {
        println!("{json}");
    }

    Ok(())
}

fn main() -> ExitCode {
    let args = Args::parse();
    logging::init(&args.log_level);

    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "benchmark failed");
            let mut source = std::error::Error::source(&e);
            while let Some(cause) = source {
                error!(cause = %cause, "caused by");
                source = cause.source();
            }
            ExitCode::FAILURE
        }
    }
}
