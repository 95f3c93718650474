//! # vortex-sort
//!
//! vortex-sort is an in-place MSD radix sort for unsigned integer keys whose buckets grow
//! inside a fixed, pre-reserved pool of memory blocks instead of being sized up front.
//!
//! ## Usage
//!
//! For a one-off sort, call `my_vec.vortex_sort()`. To sort many buffers of a similar size,
//! build a `VortexSort` once and reuse it, so the block pool is only reserved once.
//!
//! ```
//! use vortex_sort::VortexSort;
//!
//! // Up to 1024 u64 keys per sort, 4 KiB blocks.
//! let mut sorter = VortexSort::<u64>::new(1024, 12).unwrap();
//!
//! let mut data = vec![5, 1, 4, 1, 5, 9, 2, 6];
//! sorter.sort(&mut data).unwrap();
//!
//! assert_eq!(data, vec![1, 1, 2, 4, 5, 5, 6, 9]);
//! ```
//!
//! ## How it works
//!
//! The sort is built from three layers:
//!
//!  * `memory::BlockPool` reserves one arena split into `2^block_size_power` byte blocks and
//!    hands them out as linked chains
//!  * `memory::Stream` is a growable, sequential sequence of items on top of a chain
//!  * `bucket::Bucket` is a stream of items sharing the same leading digits
//!
//! Each level of the sort reads a bucket and appends every item to one of `n_buckets` child
//! buckets, chosen by the next digit of the key. Blocks of the bucket being read go back to
//! the pool as soon as they are consumed, so the children reuse them. Buckets that fit in a
//! single block are sorted in place and copied to the output in key order.
//!
//! ## Streams
//!
//! `VortexSort::create_stream` returns a stream whose storage is one contiguous run of
//! blocks. It can be filled through `write_buf`, sorted with `sort_stream`, and read back
//! through `read_buf`. After the sort the stream occupies the same run again.
//!
//! ```
//! use vortex_sort::VortexSort;
//!
//! let mut sorter = VortexSort::<u32>::new(4096, 12).unwrap();
//! let mut stream = sorter.create_stream().unwrap();
//!
//! stream.extend_from_slice(sorter.pool_mut(), &[30, 10, 20]).unwrap();
//! let report = sorter.sort_stream(&mut stream).unwrap();
//!
//! assert_eq!(stream.read_buf(sorter.pool()).unwrap(), &[10, 20, 30]);
//! assert_eq!(report.block_count, stream.block_count());
//!
//! stream.reset(sorter.pool_mut());
//! assert!(stream.is_empty());
//! ```
//!
//! ## Default Implementations
//!
//! `RadixKey` is implemented for the following types:
//!
//!  * `u8`
//!  * `u16`
//!  * `u32`
//!  * `u64`
//!  * `u128`
//!  * `usize`
//!
//! ## Features
//!
//!  * `multi-threaded` (default): parallel order checking in `harness::check_order`
//!  * `cli`: the `vortex-bench` binary
//!
//! ## License
//!
//! Licensed under either of the Apache License, Version 2.0 or the MIT license, at your
//! option.


pub mod bucket;
pub mod digits;
mod error;
pub mod harness;
pub mod memory;
mod radix_key;
mod sorter;
pub mod sorts;
pub mod tuner;
pub mod tuners;
pub mod tuning_parameters;
pub mod utils;
mod vortex_sort;
mod vortex_sort_builder;
mod vortex_sortable;

pub use error::{ConfigError, Fault, Result, VortexError};
pub use memory::{BlockPool, Stream};
pub use radix_key::RadixKey;
pub use sorter::SortState;
pub use vortex_sort::{SortReport, VortexSort};
pub use vortex_sort_builder::VortexSortBuilder;
pub use vortex_sortable::VortexSortable;
