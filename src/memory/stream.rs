//! `Stream` is a growable, sequential sequence of items stored in a chain of pool blocks.
//!
//! A stream never owns memory directly. It owns a `BlockChain`, and every operation that
//! touches item data takes the `BlockPool` the chain was drawn from. Writes go to the end of
//! the chain and transparently acquire another block when the current one is full. Reads walk
//! the chain from the front.
//!
//! Reading comes in two flavours:
//!
//!  * `read` copies items out and leaves the stream untouched
//!  * `consume` copies items out and hands every fully read block back to the pool, so the
//!    memory of a stream being drained is immediately available to the streams it feeds
//!
//! A stream created with `Stream::with_capacity` starts with a run of consecutive blocks (its
//! home run). While the chain still begins with that run, the first `capacity` items are one
//! contiguous slice of the arena and are exposed through `read_buf` / `write_buf`.

use crate::error::{Fault, Result, VortexError};
use crate::memory::block_pool::{BlockChain, BlockId, BlockPool, Run};
use crate::utils::cdiv;
use crate::RadixKey;
use std::marker::PhantomData;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
struct Cursor {
    block: Option<BlockId>,
    offset: usize,
}

impl Cursor {
    fn at(block: Option<BlockId>) -> Self {
        Self { block, offset: 0 }
    }
}

#[derive(Debug)]
pub struct Stream<T> {
    chain: BlockChain,
    home: Option<Run>,
    home_intact: bool,
    len: usize,
    consumed: usize,
    /// Items dropped from the front when `consume` gave their blocks back.
    released: usize,
    write: Cursor,
    read: Cursor,
    _items: PhantomData<fn() -> T>,
}

impl<T> Default for Stream<T> {
    fn default() -> Self {
        Self {
            chain: BlockChain::new(),
            home: None,
            home_intact: false,
            len: 0,
            consumed: 0,
            released: 0,
            write: Cursor::default(),
            read: Cursor::default(),
            _items: PhantomData,
        }
    }
}

impl<T> Stream<T>
where
    T: RadixKey,
{
    /// An empty stream. It acquires its first block on the first write.
    pub fn new() -> Self {
        Self::default()
    }

    /// A stream whose first extent is a run of consecutive blocks able to hold `capacity`
    /// items, so that it can be filled and read as one contiguous buffer.
    pub fn with_capacity(pool: &mut BlockPool<T>, capacity: usize) -> Result<Self> {
        let blocks = cdiv(capacity, pool.block_len());
        if blocks == 0 {
            return Ok(Self::new());
        }

        let (run, chain) = pool.acquire_run(blocks)?;
        let head = chain.head();

        Ok(Self {
            chain,
            home: Some(run),
            home_intact: true,
            write: Cursor::at(head),
            read: Cursor::at(head),
            ..Self::default()
        })
    }

    /// Logical number of items written.
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Items not yet read.
    #[inline]
    pub fn remaining(&self) -> usize {
        self.len - self.consumed
    }

    /// Items still stored in the stream's blocks, read or not.
    #[inline]
    pub fn held(&self) -> usize {
        self.len - self.released
    }

    /// Number of blocks currently owned.
    #[inline]
    pub fn block_count(&self) -> usize {
        self.chain.len()
    }

    #[inline]
    pub fn chain(&self) -> &BlockChain {
        &self.chain
    }

    /// The run of consecutive blocks this stream was created with, if any.
    #[inline]
    pub fn home(&self) -> Option<Run> {
        self.home
    }

    /// Items the stream can hold as one contiguous slice.
    pub fn contiguous_capacity(&self, pool: &BlockPool<T>) -> usize {
        match (self.home, self.home_intact) {
            (Some(home), true) => home.blocks * pool.block_len(),
            _ if self.chain.len() == 1 => pool.block_len(),
            _ => 0,
        }
    }

    /// All items as one slice, when they are laid out contiguously.
    pub fn read_buf<'p>(&self, pool: &'p BlockPool<T>) -> Option<&'p [T]> {
        if self.len == 0 {
            return Some(&[]);
        }

        let head = self.contiguous_head(pool)?;

        Some(pool.span(head, 0, self.len))
    }

    /// `read_buf` for in-place edits.
    pub fn read_buf_mut<'p>(&self, pool: &'p mut BlockPool<T>) -> Option<&'p mut [T]> {
        if self.len == 0 {
            return Some(&mut []);
        }

        let head = self.contiguous_head(pool)?;

        Some(pool.span_mut(head, 0, self.len))
    }

    /// The writable region following the write cursor.
    ///
    /// Inside the home run this reaches to the end of the run; anywhere else it is the rest of
    /// the current block. Items placed in it become part of the stream with `commit`.
    pub fn write_buf<'p>(&mut self, pool: &'p mut BlockPool<T>) -> Result<&'p mut [T]> {
        let (block, offset) = self.ensure_writable(pool)?;
        let block_len = pool.block_len();

        let items = match self.home {
            Some(home) if self.home_intact && home.contains(block) => {
                let blocks_after = home.first.index() + home.blocks - block.index();
                blocks_after * block_len - offset
            }
            _ => block_len - offset,
        };

        Ok(pool.span_mut(block, offset, items))
    }

    /// Append `count` items previously written through `write_buf`.
    pub fn commit(&mut self, pool: &BlockPool<T>, count: usize) -> Result<()> {
        let block_len = pool.block_len();
        let mut remaining = count;

        while remaining > 0 {
            let Some(block) = self.write.block else {
                return Err(self.overrun(pool, count));
            };

            if self.write.offset == block_len {
                match pool.next(block) {
                    Some(next) => self.write = Cursor::at(Some(next)),
                    None => return Err(self.overrun(pool, count)),
                }

                continue;
            }

            let step = remaining.min(block_len - self.write.offset);
            self.write.offset += step;
            remaining -= step;
        }

        self.len += count;

        Ok(())
    }

    pub fn append(&mut self, pool: &mut BlockPool<T>, item: T) -> Result<()> {
        let (block, offset) = self.ensure_writable(pool)?;

        pool.set_item(block, offset, item);
        self.write.offset += 1;
        self.len += 1;

        Ok(())
    }

    pub fn extend_from_slice(&mut self, pool: &mut BlockPool<T>, items: &[T]) -> Result<()> {
        let mut rest = items;

        while !rest.is_empty() {
            let buf = self.write_buf(pool)?;
            let step = buf.len().min(rest.len());
            buf[..step].copy_from_slice(&rest[..step]);

            self.commit(pool, step)?;
            rest = &rest[step..];
        }

        Ok(())
    }

    /// Append `count` items that live in another block of the same pool.
    pub(crate) fn extend_from_block(
        &mut self,
        pool: &mut BlockPool<T>,
        src: BlockId,
        src_offset: usize,
        count: usize,
    ) -> Result<()> {
        let block_len = pool.block_len();
        let mut done = 0;

        while done < count {
            let (block, offset) = self.ensure_writable(pool)?;
            let step = (count - done).min(block_len - offset);

            pool.copy_items(src, src_offset + done, block, offset, step);
            self.write.offset += step;
            self.len += step;
            done += step;
        }

        Ok(())
    }

    /// Copy the next unread items into `out`, returning how many were copied.
    pub fn read(&mut self, pool: &BlockPool<T>, out: &mut [T]) -> usize {
        let mut done = 0;

        while done < out.len() {
            let Some((block, offset, available)) = self.next_segment(pool) else {
                break;
            };

            let step = available.min(out.len() - done);
            out[done..done + step].copy_from_slice(&pool.block(block)[offset..offset + step]);
            self.read.offset += step;
            self.consumed += step;
            done += step;
        }

        done
    }

    /// Like `read`, but every block that has been read completely goes back to the pool.
    ///
    /// Once the last item is consumed the stream releases its whole chain and is empty.
    pub fn consume(&mut self, pool: &mut BlockPool<T>, out: &mut [T]) -> Result<usize> {
        let mut done = 0;

        while done < out.len() {
            let Some((block, offset, available)) = self.next_segment(pool) else {
                break;
            };

            let step = available.min(out.len() - done);
            out[done..done + step].copy_from_slice(&pool.block(block)[offset..offset + step]);
            self.advance_consumed(pool, step)?;
            done += step;
        }

        Ok(done)
    }

    /// Rewind the read cursor to the first item still held.
    ///
    /// Items whose blocks `consume` already gave back cannot be read again, so after a
    /// `consume` the stream restarts at the first block it still owns.
    pub fn rewind(&mut self) {
        self.read = Cursor::at(self.chain.head());
        self.consumed = self.released;
    }

    /// Release every block beyond the first extent and rewind both cursors.
    ///
    /// For a stream created with `with_capacity` the first extent is its home run, which is
    /// taken back from the pool if a sort left it scattered. Reset never fails: blocks that
    /// cannot be given back or taken back are skipped and the problem is logged.
    pub fn reset(&mut self, pool: &mut BlockPool<T>) {
        let chain = std::mem::take(&mut self.chain);
        let owned = match pool.walk(&chain) {
            Ok(ids) => ids,
            Err(e) => {
                tracing::warn!(error = %e, "abandoning corrupt chain during reset");
                Vec::new()
            }
        };

        let mut kept = vec![false; pool.capacity()];
        for id in &owned {
            kept[id.index()] = true;
        }

        let keep: Vec<BlockId> = match self.home {
            Some(home) => self.reclaim_home(pool, home, &kept),
            None => Vec::new(),
        };
        let keep = if keep.is_empty() {
            owned.first().copied().into_iter().collect()
        } else {
            keep
        };

        kept.iter_mut().for_each(|k| *k = false);
        for id in &keep {
            kept[id.index()] = true;
        }

        for id in owned.iter().filter(|id| !kept[id.index()]) {
            if let Err(e) = pool.release_block(*id) {
                tracing::warn!(error = %e, "skipping block during reset");
            }
        }

        self.chain = pool.chain_from(&keep);
        self.len = 0;
        self.consumed = 0;
        self.released = 0;
        self.write = Cursor::at(self.chain.head());
        self.read = Cursor::at(self.chain.head());
    }

    /// Give every block back to the pool, leaving an empty stream.
    pub fn release(&mut self, pool: &mut BlockPool<T>) -> Result<()> {
        let chain = std::mem::take(&mut self.chain);

        self.len = 0;
        self.consumed = 0;
        self.released = 0;
        self.write = Cursor::default();
        self.read = Cursor::default();
        self.home_intact = false;

        pool.release(chain)
    }

    /// Move the stream's data back onto its home run after the chain was rebuilt elsewhere.
    ///
    /// Blocks are permuted whole: a block already sitting in a home slot that belongs to a
    /// later position is swapped out of the way, a free home slot is claimed and filled. At
    /// the end the chain is the home run followed by any blocks beyond it.
    pub(crate) fn restore_home(&mut self, pool: &mut BlockPool<T>) -> Result<()> {
        let Some(home) = self.home else {
            return Ok(());
        };

        const UNPLACED: usize = usize::MAX;

        let mut ids = pool.walk(&self.chain)?;
        let mut position = vec![UNPLACED; pool.capacity()];
        for (i, id) in ids.iter().enumerate() {
            position[id.index()] = i;
        }

        let placed = ids.len().min(home.blocks);
        for i in 0..placed {
            let target = home.block(i);
            let src = ids[i];

            if src == target {
                continue;
            }

            match position[target.index()] {
                UNPLACED => {
                    pool.claim(target)?;
                    pool.copy_items(src, 0, target, 0, pool.block_len());
                    pool.release_block(src)?;
                    position[src.index()] = UNPLACED;
                }
                j => {
                    pool.swap_blocks(src, target);
                    ids[j] = src;
                    position[src.index()] = j;
                }
            }

            ids[i] = target;
            position[target.index()] = i;
        }

        for i in placed..home.blocks {
            let target = home.block(i);
            if position[target.index()] == UNPLACED {
                pool.claim(target)?;
            }
        }

        let mut order: Vec<BlockId> = (0..home.blocks).map(|i| home.block(i)).collect();
        order.extend_from_slice(&ids[placed..]);

        self.chain = pool.chain_from(&order);
        self.home_intact = true;
        self.consumed = 0;
        self.released = 0;
        self.read = Cursor::at(self.chain.head());
        self.write = self.cursor_at_len(pool, &order);

        Ok(())
    }

    /// The next readable segment as `(block, offset, available)`.
    pub(crate) fn next_segment(&mut self, pool: &BlockPool<T>) -> Option<(BlockId, usize, usize)> {
        if self.consumed >= self.len {
            return None;
        }

        let mut block = match self.read.block {
            Some(block) => block,
            None => {
                self.read = Cursor::at(self.chain.head());
                self.read.block?
            }
        };

        loop {
            let filled = self.filled(pool, block);
            if self.read.offset < filled {
                return Some((block, self.read.offset, filled - self.read.offset));
            }

            block = pool.next(block)?;
            self.read = Cursor::at(Some(block));
        }
    }

    /// Advance the read cursor by `count` items of the current segment, releasing blocks that
    /// have been read completely.
    pub(crate) fn advance_consumed(&mut self, pool: &mut BlockPool<T>, count: usize) -> Result<()> {
        self.read.offset += count;
        self.consumed += count;
        self.home_intact = false;

        if self.consumed == self.len {
            return self.release(pool);
        }

        if self.read.offset == pool.block_len() {
            let done = self.read.block;
            while let Some(block) = pool.pop_front(&mut self.chain) {
                pool.release_block(block)?;
                self.released += pool.block_len();
                if Some(block) == done {
                    break;
                }
            }

            self.read = Cursor::at(self.chain.head());
        }

        Ok(())
    }

    fn contiguous_head(&self, pool: &BlockPool<T>) -> Option<BlockId> {
        if self.consumed > 0 || self.len > self.contiguous_capacity(pool) {
            return None;
        }

        self.chain.head()
    }

    /// Items stored in `block`. Every block before the write block is full.
    #[inline]
    fn filled(&self, pool: &BlockPool<T>, block: BlockId) -> usize {
        if Some(block) == self.write.block {
            self.write.offset
        } else {
            pool.block_len()
        }
    }

    fn ensure_writable(&mut self, pool: &mut BlockPool<T>) -> Result<(BlockId, usize)> {
        let block_len = pool.block_len();

        let block = match self.write.block {
            Some(block) if self.write.offset < block_len => return Ok((block, self.write.offset)),
            Some(block) => match pool.next(block) {
                Some(next) => next,
                None => self.grow(pool)?,
            },
            None => match self.chain.head() {
                Some(head) => head,
                None => self.grow(pool)?,
            },
        };

        self.write = Cursor::at(Some(block));
        if self.read.block.is_none() {
            self.read = Cursor::at(self.chain.head());
        }

        Ok((block, 0))
    }

    fn grow(&mut self, pool: &mut BlockPool<T>) -> Result<BlockId> {
        let block = pool.acquire_block()?;
        pool.push_back(&mut self.chain, block);

        Ok(block)
    }

    fn cursor_at_len(&self, pool: &BlockPool<T>, order: &[BlockId]) -> Cursor {
        if self.len == 0 {
            return Cursor::at(order.first().copied());
        }

        let block_len = pool.block_len();
        let last = (self.len - 1) / block_len;

        Cursor {
            block: order.get(last).copied(),
            offset: self.len - last * block_len,
        }
    }

    /// Take back every block of the home run. `owned` marks the blocks the stream still holds.
    fn reclaim_home(&mut self, pool: &mut BlockPool<T>, home: Run, owned: &[bool]) -> Vec<BlockId> {
        let blocks: Vec<BlockId> = (0..home.blocks).map(|i| home.block(i)).collect();

        if let Some(held) = blocks
            .iter()
            .find(|id| !owned[id.index()] && !pool.is_free(**id))
        {
            tracing::warn!(block = %held, "home block is held elsewhere, stream is no longer contiguous");
            self.home = None;
            self.home_intact = false;

            return Vec::new();
        }

        for id in blocks.iter().filter(|id| !owned[id.index()]) {
            if let Err(e) = pool.claim(*id) {
                tracing::warn!(error = %e, "failed to reclaim home block");
            }
        }

        self.home_intact = true;

        blocks
    }

    /// Move everything the stream holds into a new stream, leaving this one empty but
    /// still attached to its home run.
    pub(crate) fn take_contents(&mut self) -> Self {
        let taken = Self {
            chain: std::mem::take(&mut self.chain),
            len: self.len,
            consumed: self.consumed,
            released: self.released,
            write: self.write,
            read: self.read,
            ..Self::default()
        };

        self.len = 0;
        self.consumed = 0;
        self.released = 0;
        self.write = Cursor::default();
        self.read = Cursor::default();
        self.home_intact = false;

        taken
    }

    fn overrun(&self, pool: &BlockPool<T>, count: usize) -> VortexError {
        Fault::StreamOverrun {
            len: self.len + count,
            capacity: self.chain.len() * pool.block_len(),
        }
        .into()
    }
}
