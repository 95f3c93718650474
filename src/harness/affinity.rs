/// Pins the calling thread to a CPU core.
pub trait CpuAffinity {
    /// Returns whether the thread is now pinned to `core`.
    fn pin_to_core(&self, core: usize) -> bool;
}

/// Leaves scheduling to the operating system.
pub struct NoAffinity;

impl CpuAffinity for NoAffinity {
    fn pin_to_core(&self, core: usize) -> bool {
        tracing::debug!(core, "cpu affinity not supported, running unpinned");

        false
    }
}
