use crate::digits::DigitPlan;
use std::cmp::min;
use std::mem::size_of;

/// Block size used by `VortexSort::builder` unless overridden: 1 MiB.
pub const DEFAULT_BLOCK_SIZE_POWER: u32 = 20;

pub const DEFAULT_DIGIT_BITS: u32 = 8;

/// Widest digit accepted, which caps a level at 65536 buckets.
pub const MAX_DIGIT_BITS: u32 = 16;

/// Buckets at or below this many items are sorted with insertion sort.
pub const INSERTION_SORT_THRESHOLD: usize = 32;

/// Upper bound, in bytes, on a bucket handed to a base-case sort.
pub const BASE_CASE_BYTES: usize = 64 * 1024;

/// Items moved from a bucket to its children per step of a partition pass.
pub const STAGE_LEN: usize = 1024;

/// Smallest block size picked for one-off slice sorts: 4 KiB.
pub const MIN_AUTO_BLOCK_SIZE_POWER: u32 = 12;

/// Blocks one-off slice sorts aim to spread their input over.
const AUTO_BLOCKS_PER_SORT: usize = 256;

/// Defaults derived from the key type and the block size.
pub struct TuningParameters;

impl TuningParameters {
    /// A bucket is small enough for the base case once it fits in one block and in
    /// `BASE_CASE_BYTES`.
    pub fn base_case_threshold<T>(block_len: usize) -> usize {
        let by_bytes = (BASE_CASE_BYTES / size_of::<T>()).max(1);

        min(block_len, by_bytes)
    }

    /// Block size power for sorting `len` items once, scaled so the input spans roughly
    /// `AUTO_BLOCKS_PER_SORT` blocks.
    pub fn block_size_power_for<T>(len: usize) -> u32 {
        let target = len.saturating_mul(size_of::<T>()) / AUTO_BLOCKS_PER_SORT;
        let power = target.max(1).next_power_of_two().trailing_zeros();

        power.clamp(MIN_AUTO_BLOCK_SIZE_POWER, DEFAULT_BLOCK_SIZE_POWER)
    }

    /// Blocks reserved on top of the ones the input needs.
    ///
    /// While a bucket is drained, each child may hold one partially filled block, and every
    /// level on the path to the current bucket may hold one more.
    pub fn headroom_blocks(plan: &DigitPlan) -> usize {
        plan.total_buckets() + plan.levels() + 2
    }
}
