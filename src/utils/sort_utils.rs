#[cfg(feature = "multi-threaded")]
use rayon::prelude::*;

/// Below this many items, counting out of order pairs is not worth splitting across threads.
#[cfg(feature = "multi-threaded")]
const PAR_COUNT_THRESHOLD: usize = 400_000;

#[inline]
pub const fn cdiv(a: usize, b: usize) -> usize {
    a.div_ceil(b)
}

/// Number of adjacent pairs where the later item is smaller than the earlier one.
#[inline]
pub fn count_descents<T>(items: &[T]) -> usize
where
    T: Ord,
{
    items.windows(2).filter(|w| w[1] < w[0]).count()
}

#[inline]
#[cfg(feature = "multi-threaded")]
pub fn par_count_descents<T>(items: &[T]) -> usize
where
    T: Ord + Send + Sync,
{
    if items.len() < PAR_COUNT_THRESHOLD {
        return count_descents(items);
    }

    items.par_windows(2).filter(|w| w[1] < w[0]).count()
}
