//! Error types for the `vortex-sort` crate

use crate::memory::BlockId;

/// Errors returned by pool, stream and sort operations.
///
/// Every failure is reported to the direct caller of the failing operation.
/// Nothing is retried internally, and after any error from a sort the
/// contents of the output buffer are unspecified.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[non_exhaustive]
pub enum VortexError {
    /// The block pool could not hand out the requested blocks.
    ///
    /// The pool's reservation is fixed at construction, so this occurs when
    /// the live streams already own every block.
    #[error("block pool exhausted: requested {requested} block(s), {available} of {capacity} free")]
    AllocationFailure {
        requested: usize,
        available: usize,
        capacity: usize,
    },

    /// The configuration, or the arguments of a sort call, cannot be served.
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(#[from] ConfigError),

    /// An internal consistency check failed.
    ///
    /// This is fatal to the operation and indicates a bug or misuse of the
    /// pool, such as releasing the same chain twice.
    #[error("internal consistency fault: {0}")]
    Corruption(#[from] Fault),
}

/// Reasons a configuration or a sort request is rejected.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[non_exhaustive]
pub enum ConfigError {
    #[error("a block of {block_bytes} bytes cannot hold one {item_bytes}-byte item")]
    BlockTooSmall { block_bytes: usize, item_bytes: usize },

    #[error("block size power {power} exceeds the maximum of {max}")]
    BlockTooLarge { power: u32, max: u32 },

    #[error("digit width of {bits} bits is outside 1..={max}")]
    DigitBits { bits: u32, max: u32 },

    #[error("base case threshold {threshold} must be within 1..={block_len} (items per block)")]
    BaseCaseThreshold { threshold: usize, block_len: usize },

    #[error("{len} items exceed the {items_per_sort} items the pool was sized for")]
    TooManyItems { len: usize, items_per_sort: usize },

    #[error("input holds {input} items but output holds {output}")]
    LengthMismatch { input: usize, output: usize },

    #[error("a pool of {blocks} blocks of {block_len} items cannot be addressed")]
    PoolTooLarge { blocks: usize, block_len: usize },
}

/// Internal consistency faults.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[non_exhaustive]
pub enum Fault {
    #[error("block chain starting at {head} loops back on itself")]
    ChainCycle { head: BlockId },

    #[error("block {0} was released while already free")]
    DoubleRelease(BlockId),

    #[error("block {0} does not belong to this pool")]
    ForeignBlock(BlockId),

    #[error("block {0} is owned by another chain")]
    BlockInUse(BlockId),

    #[error("level {level} partition produced {actual} items from {expected}")]
    CountMismatch {
        level: usize,
        expected: usize,
        actual: usize,
    },

    #[error("stream holds {len} items but its chain only has room for {capacity}")]
    StreamOverrun { len: usize, capacity: usize },
}

pub type Result<T> = std::result::Result<T, VortexError>;
