//! Block pool and the streams built on top of it.

mod block_pool;
mod stream;

pub use block_pool::{BlockChain, BlockId, BlockPool, Run, MAX_BLOCK_SIZE_POWER};
pub use stream::Stream;
