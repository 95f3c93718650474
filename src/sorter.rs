//! `Sorter` drives one sort: the level 0 split, then a depth-first walk over the buckets.
//!
//! The walk keeps every pending bucket on an explicit stack of frames, one frame per level
//! currently being visited, with each frame's buckets in ascending digit order. Visiting a
//! bucket either splits it again (pushing a new frame), or sorts it inside its block and
//! flushes it to the output. Because children are always finished before their next sibling
//! is touched, leaves reach the output in key order.
//!
//! When anything fails, the stack still names every bucket that owns blocks, so all of them
//! are handed back to the pool before the error is returned.

use crate::bucket::{partition, Bucket};
use crate::digits::DigitPlan;
use crate::error::{Fault, Result};
use crate::memory::{BlockId, BlockPool, Stream};
use crate::sorts::{comparative_sort, insertion_sort};
use crate::tuner::{Algorithm, Tuner, TuningParams};
use crate::tuning_parameters::STAGE_LEN;
use crate::RadixKey;

/// Where the sort engine is in its cycle.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SortState {
    #[default]
    Idle,
    Partitioning {
        level: usize,
    },
    BaseSortActive,
    Flushing,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub(crate) struct SortStats {
    pub partition_passes: usize,
    pub buckets_created: usize,
    pub base_case_sorts: usize,
    pub deepest_level: usize,
}

/// Data for the level 0 split.
pub(crate) enum Input<'s, T> {
    Slice(&'s [T]),
    Stream(&'s mut Stream<T>),
}

/// Destination of the sorted leaves.
pub(crate) enum Sink<'s, T> {
    Slice { out: &'s mut [T], written: usize },
    Stream(&'s mut Stream<T>),
}

impl<'s, T> Sink<'s, T>
where
    T: RadixKey,
{
    pub fn slice(out: &'s mut [T]) -> Self {
        Sink::Slice { out, written: 0 }
    }

    pub fn written(&self) -> usize {
        match self {
            Sink::Slice { written, .. } => *written,
            Sink::Stream(stream) => stream.len(),
        }
    }

    fn write_from(
        &mut self,
        pool: &mut BlockPool<T>,
        block: BlockId,
        offset: usize,
        count: usize,
    ) -> Result<()> {
        match self {
            Sink::Slice { out, written } => {
                let end = *written + count;
                if end > out.len() {
                    return Err(Fault::StreamOverrun {
                        len: end,
                        capacity: out.len(),
                    }
                    .into());
                }

                out[*written..end].copy_from_slice(&pool.block(block)[offset..offset + count]);
                *written = end;

                Ok(())
            }
            Sink::Stream(stream) => stream.extend_from_block(pool, block, offset, count),
        }
    }
}

struct Frame<T> {
    parent_len: usize,
    buckets: std::vec::IntoIter<Bucket<T>>,
}

pub(crate) struct Sorter<'a, T> {
    plan: &'a DigitPlan,
    tuner: &'a (dyn Tuner + Send + Sync),
    base_case_threshold: usize,
    state: &'a mut SortState,
    stats: SortStats,
    stage: Vec<T>,
}

impl<'a, T> Sorter<'a, T>
where
    T: RadixKey,
{
    pub fn new(
        plan: &'a DigitPlan,
        tuner: &'a (dyn Tuner + Send + Sync),
        base_case_threshold: usize,
        state: &'a mut SortState,
    ) -> Self {
        Self {
            plan,
            tuner,
            base_case_threshold,
            state,
            stats: SortStats::default(),
            stage: vec![T::ZERO; STAGE_LEN],
        }
    }

    pub fn stats(&self) -> SortStats {
        self.stats
    }

    /// Split the whole input by its top digit.
    ///
    /// A slice input is read completely before this returns, so the same memory may be used
    /// as the sink afterwards. A stream input is consumed, its blocks going back to the pool
    /// as they are read.
    pub fn split_root(
        &mut self,
        pool: &mut BlockPool<T>,
        input: Input<'_, T>,
    ) -> Result<Vec<Bucket<T>>> {
        self.transition(SortState::Partitioning { level: 0 });
        let mut children = Bucket::level_buckets(self.plan, 0, T::ZERO);

        let result = match input {
            Input::Slice(items) => partition(items, 0, self.plan, &mut children, pool)
                .and_then(|_| check_conservation(0, items.len(), &children)),
            Input::Stream(source) => {
                let result = self.drain_into(pool, source, 0, &mut children);
                if result.is_err() {
                    if let Err(e) = source.release(pool) {
                        tracing::warn!(error = %e, "failed to release sort input");
                    }
                }

                result
            }
        };

        match result {
            Ok(()) => {
                self.stats.partition_passes += 1;
                self.stats.buckets_created += children.len();

                Ok(children)
            }
            Err(e) => {
                release_all(pool, children);
                self.transition(SortState::Idle);

                Err(e)
            }
        }
    }

    /// Visit every bucket below `root` and write the sorted leaves to `sink`.
    pub fn flush(
        &mut self,
        pool: &mut BlockPool<T>,
        root: Vec<Bucket<T>>,
        root_len: usize,
        sink: &mut Sink<'_, T>,
    ) -> Result<()> {
        let mut stack = vec![Frame {
            parent_len: root_len,
            buckets: root.into_iter(),
        }];

        let result = self.descend(pool, &mut stack, sink);

        if let Err(e) = &result {
            tracing::debug!(error = %e, levels = stack.len(), "sort failed, releasing pending buckets");

            for frame in stack.drain(..) {
                release_all(pool, frame.buckets);
            }
        }

        self.transition(SortState::Idle);

        result
    }

    fn descend(
        &mut self,
        pool: &mut BlockPool<T>,
        stack: &mut Vec<Frame<T>>,
        sink: &mut Sink<'_, T>,
    ) -> Result<()> {
        while let Some(frame) = stack.last_mut() {
            let parent_len = frame.parent_len;
            let Some(mut bucket) = frame.buckets.next() else {
                stack.pop();
                continue;
            };

            let len = bucket.len();
            match self.visit(pool, &mut bucket, parent_len, sink) {
                Ok(Some(children)) => stack.push(Frame {
                    parent_len: len,
                    buckets: children.into_iter(),
                }),
                Ok(None) => {}
                Err(e) => {
                    release_all(pool, std::iter::once(bucket));
                    return Err(e);
                }
            }
        }

        Ok(())
    }

    /// Handle one bucket. Returns its children when it was split.
    fn visit(
        &mut self,
        pool: &mut BlockPool<T>,
        bucket: &mut Bucket<T>,
        parent_len: usize,
        sink: &mut Sink<'_, T>,
    ) -> Result<Option<Vec<Bucket<T>>>> {
        if bucket.is_empty() {
            return Ok(None);
        }

        self.stats.deepest_level = self.stats.deepest_level.max(bucket.level());

        // Every digit is used up, so all keys in the bucket are equal.
        if bucket.is_exhausted(self.plan) {
            self.emit(pool, bucket, sink)?;
            return Ok(None);
        }

        let params = TuningParams {
            level: bucket.level() + 1,
            total_levels: self.plan.levels(),
            input_len: bucket.len(),
            parent_len: Some(parent_len),
            block_len: pool.block_len(),
            base_case_threshold: self.base_case_threshold,
        };

        let algorithm = if bucket.stream().block_count() > 1 {
            Algorithm::Partition
        } else {
            self.tuner.pick_algorithm(&params)
        };

        match algorithm {
            Algorithm::Partition => self.split(pool, bucket).map(Some),
            base => {
                self.sort_leaf(pool, bucket, base);
                self.emit(pool, bucket, sink)?;

                Ok(None)
            }
        }
    }

    fn split(&mut self, pool: &mut BlockPool<T>, bucket: &mut Bucket<T>) -> Result<Vec<Bucket<T>>> {
        let level = bucket.level() + 1;
        self.transition(SortState::Partitioning { level });

        let mut children = bucket.children(self.plan);

        match self.drain_into(pool, bucket.stream_mut(), level, &mut children) {
            Ok(()) => {
                self.stats.partition_passes += 1;
                self.stats.buckets_created += children.len();

                Ok(children)
            }
            Err(e) => {
                release_all(pool, children);
                Err(e)
            }
        }
    }

    fn drain_into(
        &mut self,
        pool: &mut BlockPool<T>,
        source: &mut Stream<T>,
        level: usize,
        children: &mut [Bucket<T>],
    ) -> Result<()> {
        let expected = source.remaining();

        loop {
            let n = source.consume(pool, &mut self.stage)?;
            if n == 0 {
                break;
            }

            partition(&self.stage[..n], level, self.plan, children, pool)?;
        }

        tracing::trace!(level, items = expected, "partition pass");

        check_conservation(level, expected, children)
    }

    fn sort_leaf(&mut self, pool: &mut BlockPool<T>, bucket: &Bucket<T>, algorithm: Algorithm) {
        self.transition(SortState::BaseSortActive);

        if let Some(head) = bucket.stream().chain().head() {
            let items = &mut pool.block_mut(head)[..bucket.len()];

            match algorithm {
                Algorithm::Insertion => insertion_sort(items),
                _ => comparative_sort(items),
            }
        }

        self.stats.base_case_sorts += 1;
    }

    fn emit(
        &mut self,
        pool: &mut BlockPool<T>,
        bucket: &mut Bucket<T>,
        sink: &mut Sink<'_, T>,
    ) -> Result<()> {
        self.transition(SortState::Flushing);
        let stream = bucket.stream_mut();

        while let Some((block, offset, count)) = stream.next_segment(pool) {
            sink.write_from(pool, block, offset, count)?;
            stream.advance_consumed(pool, count)?;
        }

        Ok(())
    }

    fn transition(&mut self, next: SortState) {
        if *self.state != next {
            tracing::trace!(from = ?*self.state, to = ?next, "sort state");
            *self.state = next;
        }
    }
}

fn check_conservation<T>(level: usize, expected: usize, children: &[Bucket<T>]) -> Result<()>
where
    T: RadixKey,
{
    let actual: usize = children.iter().map(|c| c.len()).sum();

    if actual != expected {
        return Err(Fault::CountMismatch {
            level,
            expected,
            actual,
        }
        .into());
    }

    Ok(())
}

fn release_all<T>(pool: &mut BlockPool<T>, buckets: impl IntoIterator<Item = Bucket<T>>)
where
    T: RadixKey,
{
    for mut bucket in buckets {
        if let Err(e) = bucket.release(pool) {
            tracing::warn!(error = %e, level = bucket.level(), "failed to release bucket");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tuners::StandardTuner;
    use crate::utils::test_utils::{sort_single_algorithm, SingleAlgoTuner};
    use crate::VortexError;

    fn run(pool: &mut BlockPool<u16>, plan: &DigitPlan, items: &mut [u16]) -> Result<SortStats> {
        let mut state = SortState::Idle;
        let mut sorter = Sorter::new(plan, &StandardTuner, pool.block_len(), &mut state);

        let root = sorter.split_root(pool, Input::Slice(&*items))?;
        let len = items.len();
        sorter.flush(pool, root, len, &mut Sink::slice(items))?;

        Ok(sorter.stats())
    }

    #[test]
    pub fn test_u32_insertion_leaves() {
        sort_single_algorithm::<u32>(50_000, Algorithm::Insertion);
    }

    #[test]
    pub fn test_u64_comparative_leaves() {
        sort_single_algorithm::<u64>(50_000, Algorithm::Comparative);
    }

    #[test]
    pub fn test_u16_partition_to_the_last_digit() {
        sort_single_algorithm::<u16>(50_000, Algorithm::Partition);
    }

    #[test]
    pub fn test_slice_sink_and_stats() {
        let plan = DigitPlan::new(16, 8).unwrap();
        // 8 items per block
        let mut pool = BlockPool::<u16>::new(600, 4).unwrap();
        let mut items: Vec<u16> = (0..100u16).rev().map(|v| v.wrapping_mul(0x0101)).collect();
        let mut expected = items.clone();
        expected.sort_unstable();

        let stats = run(&mut pool, &plan, &mut items).unwrap();

        assert_eq!(items, expected);
        assert_eq!(pool.block_count(), 0);
        assert_eq!(stats.partition_passes, 1);
        assert_eq!(stats.buckets_created, 256);
        assert_eq!(stats.base_case_sorts, 100);
    }

    #[test]
    pub fn test_failure_releases_every_bucket() {
        let plan = DigitPlan::new(16, 8).unwrap();
        // 2 items per block, far too few blocks for the input.
        let mut pool = BlockPool::<u16>::new(6, 2).unwrap();
        let mut items: Vec<u16> = (0..40u16).map(|v| v * 3).collect();

        let mut state = SortState::Idle;
        let mut sorter = Sorter::new(&plan, &StandardTuner, 2, &mut state);
        let err = sorter.split_root(&mut pool, Input::Slice(&items)).unwrap_err();

        assert!(matches!(err, VortexError::AllocationFailure { .. }));
        assert_eq!(pool.block_count(), 0);
        drop(sorter);
        assert_eq!(state, SortState::Idle);

        // Enough room for level 0, but not for splitting the first bucket.
        let mut pool = BlockPool::<u16>::new(22, 2).unwrap();
        items.iter_mut().for_each(|v| *v &= 0x00FF);
        let err = run(&mut pool, &plan, &mut items).unwrap_err();

        assert!(matches!(err, VortexError::AllocationFailure { .. }));
        assert_eq!(pool.block_count(), 0);
    }

    #[test]
    pub fn test_partition_everything_with_forced_tuner() {
        let plan = DigitPlan::new(16, 4).unwrap();
        let mut pool = BlockPool::<u16>::new(512, 4).unwrap();
        let tuner = SingleAlgoTuner {
            algo: Algorithm::Partition,
        };

        let mut items = vec![0xBEEFu16, 0x0001, 0xBEEF, 0x1234, 0x0000];
        let mut state = SortState::Idle;
        let mut sorter = Sorter::new(&plan, &tuner, 8, &mut state);
        let root = sorter.split_root(&mut pool, Input::Slice(&items)).unwrap();
        sorter.flush(&mut pool, root, 5, &mut Sink::slice(&mut items)).unwrap();

        assert_eq!(items, vec![0x0000, 0x0001, 0x1234, 0xBEEF, 0xBEEF]);
        assert_eq!(sorter.stats().deepest_level, 3);
        assert_eq!(sorter.stats().base_case_sorts, 0);
        assert_eq!(pool.block_count(), 0);
    }
}
