//! Uniform random benchmark for `VortexSort`.
//!
//! Sorts LCG generated keys held in one pool-backed stream, printing the time, the speed,
//! the memory overhead and the block count of each iteration.
//!
//! e.g.
//! ```text
//! RUST_LOG=vortex_sort=debug cargo run --release --features cli --bin vortex-bench -- u32 1 3 20
//! ```
//!
//! Arguments are positional and all optional: key type (`u8`, `u16`, `u32` or `u64`, default
//! `u64`), gigabytes of keys (default 1, fractions allowed), iterations (default 3) and block
//! size power (default 20).

use std::env;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;
use vortex_sort::harness::{Benchmark, BenchmarkConfig, HarnessContext};
use vortex_sort::RadixKey;

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let args: Vec<String> = env::args().skip(1).collect();
    let key = args.first().map(String::as_str).unwrap_or("u64");

    let result = match key {
        "u8" => run::<u8>(&args),
        "u16" => run::<u16>(&args),
        "u32" => run::<u32>(&args),
        "u64" => run::<u64>(&args),
        other => Err(format!("unsupported key type {other}, expected u8, u16, u32 or u64")),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("vortex-bench: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run<T>(args: &[String]) -> Result<(), String>
where
    T: RadixKey,
{
    let gigabytes: f64 = arg(args, 1, 1.0)?;
    let iterations: usize = arg(args, 2, 3)?;
    let block_size_power: u32 = arg(args, 3, 20)?;

    let bytes = (gigabytes * (1u64 << 30) as f64) as usize;
    let config = BenchmarkConfig::for_bytes::<T>(bytes)
        .with_iterations(iterations)
        .with_block_size_power(block_size_power);

    println!(
        "Running uniform {gigabytes} GB random sort of {} ({} keys)",
        std::any::type_name::<T>(),
        config.items_per_sort
    );

    let reports =
        Benchmark::<T>::run(&HarnessContext::system(), &config).map_err(|e| e.to_string())?;

    for r in reports {
        println!("\t{r}");
        println!("\t{}", r.order);
    }

    Ok(())
}

fn arg<V>(args: &[String], i: usize, default: V) -> Result<V, String>
where
    V: std::str::FromStr,
{
    match args.get(i) {
        Some(a) => a.parse().map_err(|_| format!("invalid argument {}: {a}", i + 1)),
        None => Ok(default),
    }
}
