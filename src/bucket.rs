//! A `Bucket` is a stream of items that all share the same leading digits.
//!
//! Buckets at `level` were split off using the digit of that level, so every item in one
//! agrees with `prefix` on all bits at and above `plan.shift(level)`. Splitting a bucket again
//! produces `plan.n_buckets(level + 1)` children, ordered by digit, which together cover the
//! bucket's key range without overlap.

use crate::digits::DigitPlan;
use crate::error::Result;
use crate::memory::{BlockPool, Stream};
use crate::RadixKey;
use std::ops::RangeInclusive;

#[derive(Debug)]
pub struct Bucket<T> {
    stream: Stream<T>,
    level: usize,
    digit: usize,
    prefix: T,
}

impl<T> Bucket<T>
where
    T: RadixKey,
{
    pub fn new(level: usize, digit: usize, prefix: T) -> Self {
        Self {
            stream: Stream::new(),
            level,
            digit,
            prefix,
        }
    }

    /// Empty buckets for every digit of `level`, below a parent with `parent_prefix`.
    pub fn level_buckets(plan: &DigitPlan, level: usize, parent_prefix: T) -> Vec<Self> {
        let (shift, width) = plan.digit(level);

        (0..plan.n_buckets(level))
            .map(|digit| Self::new(level, digit, parent_prefix.with_digit(shift, width, digit)))
            .collect()
    }

    /// Empty buckets for the next level, one per digit, in ascending key order.
    pub fn children(&self, plan: &DigitPlan) -> Vec<Self> {
        Self::level_buckets(plan, self.level + 1, self.prefix)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.stream.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.stream.is_empty()
    }

    #[inline]
    pub fn level(&self) -> usize {
        self.level
    }

    #[inline]
    pub fn digit(&self) -> usize {
        self.digit
    }

    #[inline]
    pub fn prefix(&self) -> T {
        self.prefix
    }

    /// True once every digit of the key has been used to split this bucket.
    #[inline]
    pub fn is_exhausted(&self, plan: &DigitPlan) -> bool {
        self.level + 1 >= plan.levels()
    }

    /// Smallest and largest key this bucket may hold.
    pub fn key_range(&self, plan: &DigitPlan) -> RangeInclusive<T> {
        self.prefix..=self.prefix.fill_below(plan.shift(self.level))
    }

    #[inline]
    pub fn stream(&self) -> &Stream<T> {
        &self.stream
    }

    #[inline]
    pub fn stream_mut(&mut self) -> &mut Stream<T> {
        &mut self.stream
    }

    #[inline]
    pub fn append(&mut self, pool: &mut BlockPool<T>, item: T) -> Result<()> {
        debug_assert!(item >= self.prefix);
        self.stream.append(pool, item)
    }

    pub fn release(&mut self, pool: &mut BlockPool<T>) -> Result<()> {
        self.stream.release(pool)
    }
}

/// Append every item of `items` to the bucket selected by its digit at `level`.
///
/// `buckets` must be the full set of buckets for `level` under a single parent. Items keep
/// their relative order within a bucket.
pub fn partition<T>(
    items: &[T],
    level: usize,
    plan: &DigitPlan,
    buckets: &mut [Bucket<T>],
    pool: &mut BlockPool<T>,
) -> Result<()>
where
    T: RadixKey,
{
    debug_assert_eq!(buckets.len(), plan.n_buckets(level));
    let (shift, width) = plan.digit(level);

    for item in items {
        buckets[item.get_digit(shift, width)].append(pool, *item)?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn drain(bucket: &mut Bucket<u16>, pool: &mut BlockPool<u16>) -> Vec<u16> {
        let mut out = vec![0; bucket.len()];
        let n = bucket.stream_mut().consume(pool, &mut out).unwrap();
        out.truncate(n);
        out
    }

    #[test]
    pub fn test_partition_is_stable_and_complete() {
        let plan = DigitPlan::new(16, 8).unwrap();
        let mut pool = BlockPool::<u16>::new(32, 3).unwrap();
        let mut buckets = Bucket::level_buckets(&plan, 0, 0u16);

        let items = [0x0203, 0x0101, 0x0201, 0x0102, 0xFF00, 0x0202, 0x0100];
        partition(&items, 0, &plan, &mut buckets, &mut pool).unwrap();

        assert_eq!(buckets.iter().map(|b| b.len()).sum::<usize>(), items.len());
        assert_eq!(drain(&mut buckets[1], &mut pool), vec![0x0101, 0x0102, 0x0100]);
        assert_eq!(drain(&mut buckets[2], &mut pool), vec![0x0203, 0x0201, 0x0202]);
        assert_eq!(drain(&mut buckets[0xFF], &mut pool), vec![0xFF00]);
        assert!(buckets[0].is_empty());
        assert_eq!(pool.block_count(), 0);
    }

    #[test]
    pub fn test_children_refine_key_range() {
        let plan = DigitPlan::new(16, 8).unwrap();
        let top = Bucket::level_buckets(&plan, 0, 0u16);

        assert_eq!(top[0x12].key_range(&plan), 0x1200..=0x12FF);
        assert!(!top[0x12].is_exhausted(&plan));

        let children = top[0x12].children(&plan);
        assert_eq!(children.len(), 256);
        assert_eq!(children[0x34].prefix(), 0x1234);
        assert_eq!(children[0x34].key_range(&plan), 0x1234..=0x1234);
        assert!(children[0x34].is_exhausted(&plan));
    }

    #[test]
    pub fn test_partition_uses_narrow_last_level() {
        let plan = DigitPlan::new(16, 12).unwrap();
        let mut pool = BlockPool::<u16>::new(32, 3).unwrap();
        let top = Bucket::level_buckets(&plan, 0, 0u16);
        let mut children = top[0xABC].children(&plan);
        assert_eq!(children.len(), 16);

        partition(&[0xABC7, 0xABC1, 0xABC7], 1, &plan, &mut children, &mut pool).unwrap();
        assert_eq!(children[7].len(), 2);
        assert_eq!(children[1].len(), 1);

        for c in children.iter_mut() {
            c.release(&mut pool).unwrap();
        }
        assert_eq!(pool.block_count(), 0);
    }
}
