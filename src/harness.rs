use std::hint::black_box;
use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Instant;

use rand_chacha::rand_core::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tracing::{error, warn};

#[derive(Clone, Copy, Debug)]
pub enum Profile {
    Quick,
    Full,
}

impl Profile {
    pub fn as_str(&self) -> &'static str {
        match self {
            Profile::Quick => "quick",
            Profile::Full => "full",
        }
    }
}

#[derive(Clone, Debug)]
pub struct BenchConfig {
    pub profile: Profile,
    pub seed: u64,
}

impl BenchConfig {
    pub fn rng(&self) -> ChaCha8Rng {
        ChaCha8Rng::seed_from_u64(self.seed)
    }

    /// RNG for the `index`-th generated record, independent of generation order.
    pub fn item_rng(&self, index: u64) -> ChaCha8Rng {
        ChaCha8Rng::seed_from_u64(per_item_seed(self.seed, index))
    }

    pub fn warmup_iters(&self) -> u64 {
        match self.profile {
            Profile::Quick => 32,
            Profile::Full => 200,
        }
    }

    pub fn iters(&self) -> u64 {
        match self.profile {
            Profile::Quick => 300,
            Profile::Full => 3_000,
        }
    }
}

fn per_item_seed(master_seed: u64, index: u64) -> u64 {
    master_seed
        .wrapping_add(index)
        .wrapping_mul(0x517cc1b727220a95)
}

/// Cooperative stop signal, checked between records.
#[derive(Clone, Debug, Default)]
pub struct StopFlag(Arc<AtomicBool>);

impl StopFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stop(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_stopped(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }

    /// Sets the flag on the first Ctrl-C. A second Ctrl-C exits the process.
    pub fn stop_on_ctrl_c(&self) -> io::Result<()> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()?;
        let flag = self.clone();

        thread::Builder::new().name("ctrl-c".to_string()).spawn(move || {
            runtime.block_on(async {
                if let Err(e) = tokio::signal::ctrl_c().await {
                    error!(error = %e, "unable to listen for Ctrl-C");
                    return;
                }
                warn!("interrupt received, stopping after the current record");
                flag.stop();

                if tokio::signal::ctrl_c().await.is_ok() {
                    warn!("second interrupt, exiting without cleanup");
                    std::process::exit(130);
                }
            })
        })?;
        Ok(())
    }
}

#[derive(Clone, Debug)]
pub struct Measured {
    pub iters: u64,
    pub warmup_iters: u64,
    pub total_ns: u128,
    pub ns_per_iter: f64,
}

pub fn measure_fn<T>(iters: u64, warmup_iters: u64, mut f: impl FnMut() -> T) -> Measured {
    for _ in 0..warmup_iters {
        black_box(f());
    }

    let start = Instant::now();
    for _ in 0..iters {
        black_box(f());
    }
    let elapsed = start.elapsed();

    let total_ns = elapsed.as_nanos();
    let denom = iters.max(1) as f64;
    let ns_per_iter = (total_ns as f64) / denom;

    Measured {
        iters,
        warmup_iters,
        total_ns,
        ns_per_iter,
    }
}
