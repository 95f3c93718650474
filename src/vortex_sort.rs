use crate::digits::DigitPlan;
use crate::error::{ConfigError, Fault, Result};
use crate::memory::{BlockPool, Stream};
use crate::sorter::{Input, Sink, SortState, SortStats, Sorter};
use crate::tuner::Tuner;
use crate::vortex_sort_builder::VortexSortBuilder;
use crate::RadixKey;
use std::mem::size_of;

/// Summary of one sort call.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SortReport {
    pub items: usize,
    /// Blocks owned by any stream once the sort returned.
    pub block_count: usize,
    /// Most blocks owned at any point during the sort.
    pub peak_block_count: usize,
    /// Block size in bytes.
    pub block_size: usize,
    pub item_size: usize,
    pub partition_passes: usize,
    pub buckets_created: usize,
    pub base_case_sorts: usize,
    pub deepest_level: usize,
}

impl SortReport {
    /// Bytes the sorted items occupy.
    pub fn ideal_bytes(&self) -> usize {
        self.items * self.item_size
    }

    /// Bytes held in blocks after the sort.
    pub fn used_bytes(&self) -> usize {
        self.block_count * self.block_size
    }

    /// Extra memory held after the sort, as a fraction of `ideal_bytes`.
    ///
    /// Meaningful for `sort_stream`, where the sorted data stays in the pool. Zero for an
    /// empty sort.
    pub fn overhead(&self) -> f64 {
        Self::ratio(self.used_bytes(), self.ideal_bytes())
    }

    /// Like `overhead`, but for the high-water mark of the sort.
    pub fn peak_overhead(&self) -> f64 {
        Self::ratio(self.peak_block_count * self.block_size, self.ideal_bytes())
    }

    fn ratio(used: usize, ideal: usize) -> f64 {
        if ideal == 0 {
            return 0.0;
        }

        used as f64 / ideal as f64 - 1.0
    }
}

/// An MSD radix sort whose buckets are streams in a fixed, pre-reserved block pool.
///
/// The pool is reserved once, when the sorter is built, for at most `items_per_sort` items
/// per call. Every bucket draws blocks from it as it grows and returns them as it is
/// drained, so a sort never allocates on the heap beyond a small staging buffer.
pub struct VortexSort<T> {
    pool: BlockPool<T>,
    plan: DigitPlan,
    items_per_sort: usize,
    base_case_threshold: usize,
    tuner: Box<dyn Tuner + Send + Sync>,
    state: SortState,
}

impl<T> VortexSort<T>
where
    T: RadixKey,
{
    /// A sorter for up to `items_per_sort` items, using blocks of `2^block_size_power` bytes
    /// and the default tuning.
    pub fn new(items_per_sort: usize, block_size_power: u32) -> Result<Self> {
        Self::builder(items_per_sort)
            .with_block_size_power(block_size_power)
            .build()
    }

    pub fn builder(items_per_sort: usize) -> VortexSortBuilder<T> {
        VortexSortBuilder::new(items_per_sort)
    }

    pub(crate) fn from_parts(
        pool: BlockPool<T>,
        plan: DigitPlan,
        items_per_sort: usize,
        base_case_threshold: usize,
        tuner: Box<dyn Tuner + Send + Sync>,
    ) -> Self {
        Self {
            pool,
            plan,
            items_per_sort,
            base_case_threshold,
            tuner,
            state: SortState::Idle,
        }
    }

    /// Sort `buf` in place.
    ///
    /// The whole buffer is split into level 0 buckets before anything is written back.
    pub fn sort(&mut self, buf: &mut [T]) -> Result<SortReport> {
        let len = buf.len();
        self.begin(len)?;

        if len == 0 {
            return Ok(self.report(0, SortStats::default()));
        }

        let mut sorter = Sorter::new(
            &self.plan,
            self.tuner.as_ref(),
            self.base_case_threshold,
            &mut self.state,
        );

        let root = sorter.split_root(&mut self.pool, Input::Slice(&*buf))?;
        let mut sink = Sink::slice(buf);
        sorter.flush(&mut self.pool, root, len, &mut sink)?;
        check_written(len, &sink)?;

        let stats = sorter.stats();

        Ok(self.finish(len, stats))
    }

    /// Sort `input` into `output`, which must be the same length.
    pub fn sort_into(&mut self, input: &[T], output: &mut [T]) -> Result<SortReport> {
        if input.len() != output.len() {
            return Err(ConfigError::LengthMismatch {
                input: input.len(),
                output: output.len(),
            }
            .into());
        }

        let len = input.len();
        self.begin(len)?;

        if len == 0 {
            return Ok(self.report(0, SortStats::default()));
        }

        let mut sorter = Sorter::new(
            &self.plan,
            self.tuner.as_ref(),
            self.base_case_threshold,
            &mut self.state,
        );

        let root = sorter.split_root(&mut self.pool, Input::Slice(input))?;
        let mut sink = Sink::slice(output);
        sorter.flush(&mut self.pool, root, len, &mut sink)?;
        check_written(len, &sink)?;

        let stats = sorter.stats();

        Ok(self.finish(len, stats))
    }

    /// Sort a stream drawn from this sorter's pool, usually one from `create_stream`.
    ///
    /// The stream is drained into level 0 buckets, rebuilt from the sorted leaves, and then
    /// moved back onto its original run of blocks, so `read_buf` on a stream from
    /// `create_stream` returns the sorted data. On failure the stream is reset.
    ///
    /// Every item the stream still holds is sorted, wherever its read cursor is. Items
    /// whose blocks `consume` already gave back are gone and are not part of the sort.
    pub fn sort_stream(&mut self, stream: &mut Stream<T>) -> Result<SortReport> {
        let len = stream.held();
        self.begin(len)?;

        if len == 0 {
            return Ok(self.report(0, SortStats::default()));
        }

        let mut source = stream.take_contents();
        source.rewind();
        let result = self.sort_stream_contents(&mut source, stream);

        match result {
            Ok(stats) => Ok(self.finish(len, stats)),
            Err(e) => {
                if let Err(release) = source.release(&mut self.pool) {
                    tracing::warn!(error = %release, "failed to release sort input");
                }
                stream.reset(&mut self.pool);

                Err(e)
            }
        }
    }

    fn sort_stream_contents(
        &mut self,
        source: &mut Stream<T>,
        stream: &mut Stream<T>,
    ) -> Result<SortStats> {
        let len = source.remaining();
        let mut sorter = Sorter::new(
            &self.plan,
            self.tuner.as_ref(),
            self.base_case_threshold,
            &mut self.state,
        );

        let root = sorter.split_root(&mut self.pool, Input::Stream(source))?;
        let mut sink = Sink::Stream(&mut *stream);
        sorter.flush(&mut self.pool, root, len, &mut sink)?;
        check_written(len, &sink)?;

        let stats = sorter.stats();
        stream.restore_home(&mut self.pool)?;

        Ok(stats)
    }

    /// A stream sized for `items_per_sort` items whose storage is one contiguous run of
    /// blocks in this sorter's pool.
    pub fn create_stream(&mut self) -> Result<Stream<T>> {
        Stream::with_capacity(&mut self.pool, self.items_per_sort)
    }

    /// Blocks currently owned by streams of this sorter's pool.
    pub fn block_count(&self) -> usize {
        self.pool.block_count()
    }

    /// Number of buckets a bucket splits into at `level`.
    pub fn n_buckets_at(&self, level: usize) -> usize {
        self.plan.n_buckets(level)
    }

    /// Bucket count of every level, most significant first.
    pub fn n_buckets(&self) -> Vec<usize> {
        self.plan.fan_out()
    }

    pub fn levels(&self) -> usize {
        self.plan.levels()
    }

    pub fn digit_plan(&self) -> &DigitPlan {
        &self.plan
    }

    pub fn items_per_sort(&self) -> usize {
        self.items_per_sort
    }

    pub fn base_case_threshold(&self) -> usize {
        self.base_case_threshold
    }

    /// Block size in bytes.
    pub fn block_size(&self) -> usize {
        self.pool.block_size()
    }

    /// Items per block.
    pub fn block_len(&self) -> usize {
        self.pool.block_len()
    }

    pub fn state(&self) -> SortState {
        self.state
    }

    pub fn pool(&self) -> &BlockPool<T> {
        &self.pool
    }

    /// The pool, for working with streams from `create_stream`.
    pub fn pool_mut(&mut self) -> &mut BlockPool<T> {
        &mut self.pool
    }

    fn begin(&mut self, len: usize) -> Result<()> {
        if len > self.items_per_sort {
            return Err(ConfigError::TooManyItems {
                len,
                items_per_sort: self.items_per_sort,
            }
            .into());
        }

        self.pool.reset_peak();

        Ok(())
    }

    fn finish(&self, len: usize, stats: SortStats) -> SortReport {
        let report = self.report(len, stats);

        tracing::debug!(
            items = report.items,
            blocks = report.block_count,
            peak_blocks = report.peak_block_count,
            passes = report.partition_passes,
            base_case_sorts = report.base_case_sorts,
            deepest_level = report.deepest_level,
            "sort finished"
        );

        report
    }

    fn report(&self, items: usize, stats: SortStats) -> SortReport {
        SortReport {
            items,
            block_count: self.pool.block_count(),
            peak_block_count: self.pool.peak_block_count(),
            block_size: self.pool.block_size(),
            item_size: size_of::<T>(),
            partition_passes: stats.partition_passes,
            buckets_created: stats.buckets_created,
            base_case_sorts: stats.base_case_sorts,
            deepest_level: stats.deepest_level,
        }
    }
}

fn check_written<T>(expected: usize, sink: &Sink<'_, T>) -> Result<()>
where
    T: RadixKey,
{
    let actual = sink.written();

    if actual != expected {
        return Err(Fault::CountMismatch {
            level: 0,
            expected,
            actual,
        }
        .into());
    }

    Ok(())
}
