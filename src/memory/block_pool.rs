//! `BlockPool` owns one pre-reserved arena divided into fixed-size blocks.
//!
//! Blocks are identified by a `BlockId` (their index in the arena) and are handed out to
//! streams as `BlockChain`s. A chain is an ordered, singly-linked list of blocks; the links
//! live in the pool so that a chain value is nothing but a head, a tail and a length.
//!
//! `BlockChain` is deliberately not `Clone`: whoever holds the chain owns its blocks, and
//! giving it back to the pool via `release` consumes it.
//!
//! The free list is a LIFO stack of ids. Each block also remembers its slot in that stack,
//! which makes it possible to `claim` one specific free block in O(1). This is what lets a
//! stream take back the exact blocks of its contiguous first extent after a sort.
//!
//! ## Accounting
//!
//!  * `block_count` is the number of blocks currently owned by any chain
//!  * `peak_block_count` is the high-water mark since the last `reset_peak`
//!  * every block is either on the free list or owned by exactly one chain

use crate::error::{ConfigError, Fault, Result, VortexError};
use crate::RadixKey;
use std::fmt;
use std::mem::size_of;

const NIL: u32 = u32::MAX;

/// Largest supported block size, as a power of two in bytes.
pub const MAX_BLOCK_SIZE_POWER: u32 = 30;

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BlockId(u32);

impl BlockId {
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }

    #[inline]
    fn offset(self, blocks: usize) -> BlockId {
        BlockId(self.0 + blocks as u32)
    }
}

impl fmt::Display for BlockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A run of blocks with consecutive ids, and therefore consecutive memory.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Run {
    pub first: BlockId,
    pub blocks: usize,
}

impl Run {
    #[inline]
    pub fn block(&self, i: usize) -> BlockId {
        debug_assert!(i < self.blocks);
        self.first.offset(i)
    }

    #[inline]
    pub fn contains(&self, id: BlockId) -> bool {
        id >= self.first && id.index() < self.first.index() + self.blocks
    }
}

/// An owned, ordered chain of blocks.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct BlockChain {
    head: Option<BlockId>,
    tail: Option<BlockId>,
    len: usize,
}

impl BlockChain {
    pub const fn new() -> Self {
        Self {
            head: None,
            tail: None,
            len: 0,
        }
    }

    #[inline]
    pub fn head(&self) -> Option<BlockId> {
        self.head
    }

    #[inline]
    pub fn tail(&self) -> Option<BlockId> {
        self.tail
    }

    /// Number of blocks in the chain.
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

pub struct BlockPool<T> {
    storage: Vec<T>,
    block_len: usize,
    block_size_power: u32,
    next: Vec<u32>,
    free: Vec<BlockId>,
    free_slot: Vec<u32>,
    block_count: usize,
    peak_block_count: usize,
}

impl<T> BlockPool<T>
where
    T: RadixKey,
{
    /// Reserve `capacity` blocks of `2^block_size_power` bytes each.
    ///
    /// The arena is zero-initialised in one allocation. On most platforms this maps fresh
    /// pages lazily, so blocks that are never handed out cost address space only.
    pub fn new(capacity: usize, block_size_power: u32) -> Result<Self> {
        let block_len = Self::items_per_block(block_size_power)?;
        let too_large = ConfigError::PoolTooLarge {
            blocks: capacity,
            block_len,
        };

        if capacity >= NIL as usize {
            return Err(too_large.into());
        }

        let items = capacity
            .checked_mul(block_len)
            .filter(|items| {
                items
                    .checked_mul(size_of::<T>())
                    .map_or(false, |bytes| bytes <= isize::MAX as usize)
            })
            .ok_or(too_large)?;

        let free: Vec<BlockId> = (0..capacity as u32).rev().map(BlockId).collect();
        let free_slot: Vec<u32> = (0..capacity as u32).rev().collect();

        tracing::debug!(
            capacity,
            block_size = 1usize << block_size_power,
            block_len,
            "reserved block pool"
        );

        Ok(Self {
            storage: vec![T::ZERO; items],
            block_len,
            block_size_power,
            next: vec![NIL; capacity],
            free,
            free_slot,
            block_count: 0,
            peak_block_count: 0,
        })
    }

    /// Number of `T` that fit in a block of `2^block_size_power` bytes.
    pub fn items_per_block(block_size_power: u32) -> Result<usize> {
        if block_size_power > MAX_BLOCK_SIZE_POWER {
            return Err(ConfigError::BlockTooLarge {
                power: block_size_power,
                max: MAX_BLOCK_SIZE_POWER,
            }
            .into());
        }

        let block_bytes = 1usize << block_size_power;
        if block_bytes < size_of::<T>() {
            return Err(ConfigError::BlockTooSmall {
                block_bytes,
                item_bytes: size_of::<T>(),
            }
            .into());
        }

        Ok(block_bytes / size_of::<T>())
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.next.len()
    }

    /// Blocks currently owned by a chain.
    #[inline]
    pub fn block_count(&self) -> usize {
        self.block_count
    }

    #[inline]
    pub fn peak_block_count(&self) -> usize {
        self.peak_block_count
    }

    pub fn reset_peak(&mut self) {
        self.peak_block_count = self.block_count;
    }

    #[inline]
    pub fn free_blocks(&self) -> usize {
        self.free.len()
    }

    /// Items per block.
    #[inline]
    pub fn block_len(&self) -> usize {
        self.block_len
    }

    /// Block size in bytes.
    #[inline]
    pub fn block_size(&self) -> usize {
        1 << self.block_size_power
    }

    #[inline]
    pub fn block_size_power(&self) -> u32 {
        self.block_size_power
    }

    #[inline]
    pub fn is_free(&self, id: BlockId) -> bool {
        self.free_slot
            .get(id.index())
            .map_or(false, |slot| *slot != NIL)
    }

    /// Take `count` blocks from the free list as one chain.
    ///
    /// Either all blocks are handed out or none are.
    pub fn acquire(&mut self, count: usize) -> Result<BlockChain> {
        self.ensure_available(count)?;

        let mut chain = BlockChain::new();
        for _ in 0..count {
            let id = self.acquire_block()?;
            self.push_back(&mut chain, id);
        }

        Ok(chain)
    }

    /// Take `count` free blocks with consecutive ids, linked in order.
    pub fn acquire_run(&mut self, count: usize) -> Result<(Run, BlockChain)> {
        self.ensure_available(count)?;

        let mut start = 0;
        let mut found = None;
        for i in 0..self.capacity() {
            if self.free_slot[i] == NIL {
                start = i + 1;
            } else if i + 1 - start == count {
                found = Some(start);
                break;
            }
        }

        let first = match found {
            Some(first) => BlockId(first as u32),
            None if count == 0 => BlockId(0),
            None => return Err(self.allocation_failure(count)),
        };

        let run = Run {
            first,
            blocks: count,
        };
        let mut chain = BlockChain::new();
        for i in 0..count {
            let id = run.block(i);
            self.claim(id)?;
            self.push_back(&mut chain, id);
        }

        Ok((run, chain))
    }

    /// Take one specific free block out of the free list.
    pub fn claim(&mut self, id: BlockId) -> Result<()> {
        self.check_bounds(id)?;

        let slot = self.free_slot[id.index()];
        if slot == NIL {
            return Err(Fault::BlockInUse(id).into());
        }

        let slot = slot as usize;
        self.free.swap_remove(slot);
        if let Some(moved) = self.free.get(slot) {
            self.free_slot[moved.index()] = slot as u32;
        }

        self.mark_live(id);

        Ok(())
    }

    /// Return every block of `chain` to the free list.
    ///
    /// The chain is validated first, so a cycle or an already-free block leaves the pool
    /// untouched.
    pub fn release(&mut self, chain: BlockChain) -> Result<()> {
        let ids = self.walk(&chain)?;

        if let Some(id) = ids.iter().find(|id| self.is_free(**id)) {
            return Err(Fault::DoubleRelease(*id).into());
        }

        for id in ids {
            self.release_block(id)?;
        }

        Ok(())
    }

    /// Return a single block to the free list. The block must not be linked into a chain
    /// that is still in use.
    pub fn release_block(&mut self, id: BlockId) -> Result<()> {
        self.check_bounds(id)?;

        if self.free_slot[id.index()] != NIL {
            return Err(Fault::DoubleRelease(id).into());
        }

        self.free_slot[id.index()] = self.free.len() as u32;
        self.free.push(id);
        self.next[id.index()] = NIL;
        self.block_count -= 1;

        Ok(())
    }

    /// Every block of `chain`, in order.
    pub fn walk(&self, chain: &BlockChain) -> Result<Vec<BlockId>> {
        let mut ids = Vec::with_capacity(chain.len);
        let mut cursor = chain.head;

        while let Some(id) = cursor {
            self.check_bounds(id)?;

            if ids.len() >= chain.len.max(self.capacity()) {
                return Err(Fault::ChainCycle {
                    head: chain.head.unwrap_or(id),
                }
                .into());
            }

            ids.push(id);
            cursor = self.next(id);
        }

        Ok(ids)
    }

    #[inline]
    pub fn next(&self, id: BlockId) -> Option<BlockId> {
        match self.next[id.index()] {
            NIL => None,
            n => Some(BlockId(n)),
        }
    }

    #[inline]
    pub fn block(&self, id: BlockId) -> &[T] {
        let start = id.index() * self.block_len;
        &self.storage[start..start + self.block_len]
    }

    #[inline]
    pub fn block_mut(&mut self, id: BlockId) -> &mut [T] {
        let start = id.index() * self.block_len;
        &mut self.storage[start..start + self.block_len]
    }

    /// `items` items starting at `offset` within block `id`. The span may cross into the
    /// blocks that follow `id` in memory, which is only meaningful for a `Run`.
    #[inline]
    pub fn span(&self, id: BlockId, offset: usize, items: usize) -> &[T] {
        let start = id.index() * self.block_len + offset;
        &self.storage[start..start + items]
    }

    #[inline]
    pub fn span_mut(&mut self, id: BlockId, offset: usize, items: usize) -> &mut [T] {
        let start = id.index() * self.block_len + offset;
        &mut self.storage[start..start + items]
    }

    #[inline]
    pub fn set_item(&mut self, id: BlockId, offset: usize, item: T) {
        self.storage[id.index() * self.block_len + offset] = item;
    }

    /// Copy `count` items between two blocks of the arena.
    #[inline]
    pub fn copy_items(
        &mut self,
        src: BlockId,
        src_offset: usize,
        dst: BlockId,
        dst_offset: usize,
        count: usize,
    ) {
        let start = src.index() * self.block_len + src_offset;
        let dst_start = dst.index() * self.block_len + dst_offset;
        self.storage.copy_within(start..start + count, dst_start);
    }

    /// Exchange the full contents of two blocks.
    pub fn swap_blocks(&mut self, a: BlockId, b: BlockId) {
        if a == b {
            return;
        }

        let (lo, hi) = if a < b { (a, b) } else { (b, a) };
        let len = self.block_len;
        let (left, right) = self.storage.split_at_mut(hi.index() * len);
        let lo_start = lo.index() * len;

        left[lo_start..lo_start + len].swap_with_slice(&mut right[..len]);
    }

    pub(crate) fn acquire_block(&mut self) -> Result<BlockId> {
        let id = self.free.pop().ok_or_else(|| self.allocation_failure(1))?;
        self.mark_live(id);

        Ok(id)
    }

    pub(crate) fn push_back(&mut self, chain: &mut BlockChain, id: BlockId) {
        self.next[id.index()] = NIL;

        match chain.tail {
            Some(tail) => self.next[tail.index()] = id.0,
            None => chain.head = Some(id),
        }

        chain.tail = Some(id);
        chain.len += 1;
    }

    pub(crate) fn pop_front(&mut self, chain: &mut BlockChain) -> Option<BlockId> {
        let head = chain.head?;

        chain.head = self.next(head);
        chain.len -= 1;
        if chain.head.is_none() {
            chain.tail = None;
        }

        self.next[head.index()] = NIL;

        Some(head)
    }

    /// Relink `ids`, which the caller already owns, into a fresh chain.
    pub(crate) fn chain_from(&mut self, ids: &[BlockId]) -> BlockChain {
        let mut chain = BlockChain::new();
        for id in ids {
            self.push_back(&mut chain, *id);
        }

        chain
    }

    fn mark_live(&mut self, id: BlockId) {
        self.free_slot[id.index()] = NIL;
        self.next[id.index()] = NIL;
        self.block_count += 1;
        self.peak_block_count = self.peak_block_count.max(self.block_count);
    }

    fn ensure_available(&self, count: usize) -> Result<()> {
        if count > self.free.len() {
            return Err(self.allocation_failure(count));
        }

        Ok(())
    }

    fn allocation_failure(&self, requested: usize) -> VortexError {
        VortexError::AllocationFailure {
            requested,
            available: self.free.len(),
            capacity: self.capacity(),
        }
    }

    #[inline]
    fn check_bounds(&self, id: BlockId) -> Result<()> {
        if id.index() >= self.capacity() {
            return Err(Fault::ForeignBlock(id).into());
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pool(capacity: usize) -> BlockPool<u32> {
        // 16 byte blocks, 4 items each
        BlockPool::new(capacity, 4).unwrap()
    }

    #[test]
    pub fn test_new_pool_is_empty() {
        let p = pool(8);

        assert_eq!(p.capacity(), 8);
        assert_eq!(p.free_blocks(), 8);
        assert_eq!(p.block_count(), 0);
        assert_eq!(p.block_len(), 4);
        assert_eq!(p.block_size(), 16);
    }

    #[test]
    pub fn test_items_per_block() {
        assert_eq!(BlockPool::<u64>::items_per_block(5).unwrap(), 4);
        assert_eq!(BlockPool::<u8>::items_per_block(0).unwrap(), 1);

        assert_eq!(
            BlockPool::<u64>::items_per_block(2),
            Err(VortexError::InvalidConfiguration(ConfigError::BlockTooSmall {
                block_bytes: 4,
                item_bytes: 8,
            }))
        );
        assert!(matches!(
            BlockPool::<u64>::items_per_block(31),
            Err(VortexError::InvalidConfiguration(ConfigError::BlockTooLarge { .. }))
        ));
    }

    #[test]
    pub fn test_acquire_links_chain_in_order() {
        let mut p = pool(8);
        let chain = p.acquire(3).unwrap();

        assert_eq!(chain.len(), 3);
        assert_eq!(p.block_count(), 3);
        assert_eq!(p.free_blocks(), 5);

        let ids = p.walk(&chain).unwrap();
        assert_eq!(ids.len(), 3);
        assert_eq!(chain.head(), Some(ids[0]));
        assert_eq!(chain.tail(), Some(ids[2]));

        let mut sorted = ids.clone();
        sorted.sort();
        sorted.dedup();
        assert_eq!(sorted.len(), 3);
    }

    #[test]
    pub fn test_acquire_past_capacity_fails_without_side_effects() {
        let mut p = pool(4);
        let _held = p.acquire(3).unwrap();

        assert_eq!(
            p.acquire(2),
            Err(VortexError::AllocationFailure {
                requested: 2,
                available: 1,
                capacity: 4,
            })
        );
        assert_eq!(p.block_count(), 3);
        assert_eq!(p.free_blocks(), 1);
    }

    #[test]
    pub fn test_release_returns_blocks() {
        let mut p = pool(8);
        let a = p.acquire(3).unwrap();
        let b = p.acquire(2).unwrap();

        p.release(a).unwrap();
        assert_eq!(p.block_count(), 2);
        assert_eq!(p.peak_block_count(), 5);

        p.release(b).unwrap();
        assert_eq!(p.block_count(), 0);
        assert_eq!(p.free_blocks(), 8);
    }

    #[test]
    pub fn test_double_release_is_detected() {
        let mut p = pool(4);
        let chain = p.acquire(1).unwrap();
        let id = chain.head().unwrap();

        p.release(chain).unwrap();
        assert_eq!(
            p.release_block(id),
            Err(VortexError::Corruption(Fault::DoubleRelease(id)))
        );
        assert_eq!(p.block_count(), 0);
    }

    #[test]
    pub fn test_foreign_block_is_rejected() {
        let mut p = pool(4);

        assert_eq!(
            p.claim(BlockId(9)),
            Err(VortexError::Corruption(Fault::ForeignBlock(BlockId(9))))
        );
    }

    #[test]
    pub fn test_acquire_run_is_consecutive() {
        let mut p = pool(8);
        let (run, chain) = p.acquire_run(4).unwrap();

        assert_eq!(run.first, BlockId(0));
        let ids = p.walk(&chain).unwrap();
        assert_eq!(ids, vec![BlockId(0), BlockId(1), BlockId(2), BlockId(3)]);
        assert!(run.contains(BlockId(3)));
        assert!(!run.contains(BlockId(4)));
    }

    #[test]
    pub fn test_acquire_run_skips_fragmented_space() {
        let mut p = pool(8);
        let a = p.acquire(1).unwrap(); // #0
        let _b = p.acquire(1).unwrap(); // #1
        p.release(a).unwrap();

        let (run, _chain) = p.acquire_run(3).unwrap();
        assert_eq!(run.first, BlockId(2));

        assert!(matches!(
            p.acquire_run(4),
            Err(VortexError::AllocationFailure { requested: 4, .. })
        ));
    }

    #[test]
    pub fn test_claim_specific_block() {
        let mut p = pool(4);

        p.claim(BlockId(2)).unwrap();
        assert!(!p.is_free(BlockId(2)));
        assert_eq!(p.block_count(), 1);
        assert_eq!(
            p.claim(BlockId(2)),
            Err(VortexError::Corruption(Fault::BlockInUse(BlockId(2))))
        );

        // The remaining free list is still consistent.
        let rest = p.acquire(3).unwrap();
        let mut ids = p.walk(&rest).unwrap();
        ids.sort();
        assert_eq!(ids, vec![BlockId(0), BlockId(1), BlockId(3)]);
        assert_eq!(p.free_blocks(), 0);
    }

    #[test]
    pub fn test_cycle_is_detected() {
        let mut p = pool(4);
        let mut chain = p.acquire(2).unwrap();
        let head = chain.head().unwrap();
        let tail = chain.tail().unwrap();

        // Corrupt the links by hand.
        p.next[tail.index()] = head.0;
        chain.len = 2;

        assert_eq!(
            p.walk(&chain),
            Err(VortexError::Corruption(Fault::ChainCycle { head }))
        );
        assert!(p.release(chain).is_err());
        assert_eq!(p.block_count(), 2);
    }

    #[test]
    pub fn test_swap_and_copy_blocks() {
        let mut p = pool(4);
        let chain = p.acquire(2).unwrap();
        let ids = p.walk(&chain).unwrap();

        p.block_mut(ids[0]).copy_from_slice(&[1, 2, 3, 4]);
        p.block_mut(ids[1]).copy_from_slice(&[5, 6, 7, 8]);

        p.swap_blocks(ids[0], ids[1]);
        assert_eq!(p.block(ids[0]), &[5, 6, 7, 8]);
        assert_eq!(p.block(ids[1]), &[1, 2, 3, 4]);

        p.copy_items(ids[1], 2, ids[0], 0, 2);
        assert_eq!(p.block(ids[0]), &[3, 4, 7, 8]);
    }
}
