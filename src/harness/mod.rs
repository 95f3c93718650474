//! Everything needed to run the uniform random benchmark: a clock, an affinity hook, the key
//! generator, the order checker and the runner that ties them to a `VortexSort`.
//!
//! None of the sort machinery depends on this module.

mod affinity;
mod benchmark;
mod checker;
mod clock;
mod generator;

pub use affinity::{CpuAffinity, NoAffinity};
pub use benchmark::{Benchmark, BenchmarkConfig, IterationReport};
pub use checker::{check_order, OrderReport};
pub use clock::{Clock, SystemClock};
pub use generator::Lcg;

/// Services the benchmark consumes from its environment.
pub struct HarnessContext {
    pub clock: Box<dyn Clock>,
    pub affinity: Box<dyn CpuAffinity>,
}

impl HarnessContext {
    pub fn new(clock: Box<dyn Clock>, affinity: Box<dyn CpuAffinity>) -> Self {
        Self { clock, affinity }
    }

    /// Wall clock time and no core pinning.
    pub fn system() -> Self {
        Self::new(Box::new(SystemClock::new()), Box::new(NoAffinity))
    }
}

impl Default for HarnessContext {
    fn default() -> Self {
        Self::system()
    }
}
