mod comparative_sort;
mod insertion_sort;

pub use comparative_sort::*;
pub use insertion_sort::*;
