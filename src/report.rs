use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunMeta {
    pub schema_version: u32,
    pub bench_version: String,
    pub profile: String,
    pub seed: u64,
    pub timestamp_utc: String,
    pub store: String,
    pub fields: usize,
    pub items: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Measurement {
    pub name: String,
    pub unit: String,

    pub iters: u64,
    pub warmup_iters: u64,

    pub total_ns: u128,
    pub ns_per_iter: f64,

    pub bytes_processed: Option<u64>,
    pub throughput_bytes_per_s: Option<f64>,

    pub extra: serde_json::Value,
}

impl Measurement {
    /// Builds a measurement from a timed loop, deriving the per-iteration and
    /// throughput figures.
    pub fn timed(
        name: impl Into<String>,
        unit: impl Into<String>,
        iters: u64,
        warmup_iters: u64,
        total_ns: u128,
        bytes_processed: Option<u64>,
        extra: serde_json::Value,
    ) -> Self {
        let ns_per_iter = (total_ns as f64) / (iters.max(1) as f64);
        let throughput_bytes_per_s = bytes_processed.and_then(|bytes| {
            let total_s = (total_ns as f64) / 1e9;
            if total_s <= 0.0 {
                None
            } else {
                Some((bytes as f64) / total_s)
            }
        });

        Self {
            name: name.into(),
            unit: unit.into(),
            iters,
            warmup_iters,
            total_ns,
            ns_per_iter,
            bytes_processed,
            throughput_bytes_per_s,
            extra,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BenchReport {
    pub run: RunMeta,
    pub schema: serde_json::Value,
    pub measurements: Vec<Measurement>,
}
