use crate::error::{Fault, Result};
use crate::harness::{check_order, HarnessContext, Lcg, OrderReport};
use crate::tuning_parameters::DEFAULT_BLOCK_SIZE_POWER;
use crate::{RadixKey, SortReport, VortexSort};
use std::fmt;
use std::marker::PhantomData;
use std::mem::size_of;
use std::time::Duration;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BenchmarkConfig {
    pub items_per_sort: usize,
    pub iterations: usize,
    pub block_size_power: u32,
    /// Core the benchmark thread asks to be pinned to.
    pub core: usize,
}

impl BenchmarkConfig {
    /// Enough items of `T` to fill `bytes`.
    pub fn for_bytes<T>(bytes: usize) -> Self {
        Self {
            items_per_sort: bytes / size_of::<T>(),
            ..Self::default()
        }
    }

    pub fn with_iterations(mut self, iterations: usize) -> Self {
        self.iterations = iterations;

        self
    }

    pub fn with_block_size_power(mut self, power: u32) -> Self {
        self.block_size_power = power;

        self
    }
}

impl Default for BenchmarkConfig {
    /// 1 GiB of `u64` keys, three iterations, 1 MiB blocks.
    fn default() -> Self {
        Self {
            items_per_sort: (1 << 30) / size_of::<u64>(),
            iterations: 3,
            block_size_power: DEFAULT_BLOCK_SIZE_POWER,
            core: 0,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct IterationReport {
    pub iteration: usize,
    pub elapsed: Duration,
    /// Millions of keys sorted per second.
    pub speed: f64,
    pub order: OrderReport,
    pub sort: SortReport,
}

impl IterationReport {
    pub fn overhead_percent(&self) -> f64 {
        self.sort.overhead() * 100.0
    }
}

impl fmt::Display for IterationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "time {:.3} sec, speed {:.2} M/s, overhead {:.2}%, blocks {}",
            self.elapsed.as_secs_f64(),
            self.speed,
            self.overhead_percent(),
            self.sort.block_count
        )
    }
}

/// Sorts LCG generated keys held in one top-level stream, repeatedly.
pub struct Benchmark<T> {
    _key: PhantomData<T>,
}

impl<T> Benchmark<T>
where
    T: RadixKey,
{
    /// Each iteration refills the stream from a freshly seeded generator, so every iteration
    /// sorts the same keys.
    pub fn run(ctx: &HarnessContext, config: &BenchmarkConfig) -> Result<Vec<IterationReport>> {
        ctx.affinity.pin_to_core(config.core);

        let mut sorter = VortexSort::<T>::new(config.items_per_sort, config.block_size_power)?;
        let mut input = sorter.create_stream()?;
        let mut reports = Vec::with_capacity(config.iterations);

        for iteration in 0..config.iterations {
            let buf = input.write_buf(sorter.pool_mut())?;
            let buf = &mut buf[..config.items_per_sort];
            Lcg::new().fill(buf);
            input.commit(sorter.pool(), config.items_per_sort)?;

            let start = ctx.clock.now();
            let sort = sorter.sort_stream(&mut input)?;
            let elapsed = ctx.clock.now().saturating_sub(start);

            let sorted = input.read_buf(sorter.pool()).ok_or(Fault::StreamOverrun {
                len: input.len(),
                capacity: input.contiguous_capacity(sorter.pool()),
            })?;

            let report = IterationReport {
                iteration,
                elapsed,
                speed: mkeys_per_sec(sort.items, elapsed),
                order: check_order(sorted),
                sort,
            };

            tracing::info!(
                iteration,
                elapsed_ms = report.elapsed.as_millis() as u64,
                unsorted = report.order.unsorted,
                "benchmark iteration"
            );

            reports.push(report);
            input.reset(sorter.pool_mut());
        }

        Ok(reports)
    }
}

fn mkeys_per_sec(items: usize, elapsed: Duration) -> f64 {
    let secs = elapsed.as_secs_f64();
    if secs == 0.0 {
        return 0.0;
    }

    items as f64 / secs / 1e6
}
