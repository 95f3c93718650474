use std::fmt;

/// Result of scanning a buffer for out of order keys.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct OrderReport {
    /// Adjacent pairs where the second key is smaller than the first.
    pub unsorted: usize,
    pub processed: usize,
}

impl OrderReport {
    pub fn is_sorted(&self) -> bool {
        self.unsorted == 0
    }
}

impl fmt::Display for OrderReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Sorted Result: unsorted keys = {}, processed keys = {}",
            self.unsorted, self.processed
        )
    }
}

pub fn check_order<T>(items: &[T]) -> OrderReport
where
    T: Ord + Send + Sync,
{
    #[cfg(feature = "multi-threaded")]
    let unsorted = crate::utils::par_count_descents(items);
    #[cfg(not(feature = "multi-threaded"))]
    let unsorted = crate::utils::count_descents(items);

    OrderReport {
        unsorted,
        processed: items.len(),
    }
}
