use crate::digits::DigitPlan;
use crate::error::{ConfigError, Result};
use crate::memory::BlockPool;
use crate::tuner::Tuner;
use crate::tuners::StandardTuner;
use crate::tuning_parameters::{TuningParameters, DEFAULT_BLOCK_SIZE_POWER, DEFAULT_DIGIT_BITS};
use crate::utils::cdiv;
use crate::vortex_sort::VortexSort;
use crate::RadixKey;
use std::marker::PhantomData;

/// Configures and builds a `VortexSort`.
///
/// ```
/// use vortex_sort::VortexSort;
///
/// let mut sorter = VortexSort::<u32>::builder(1_000)
///     .with_block_size_power(12)
///     .with_digit_bits(11)
///     .build()
///     .unwrap();
///
/// let mut data = vec![3, 1, 2];
/// sorter.sort(&mut data).unwrap();
/// assert_eq!(data, vec![1, 2, 3]);
/// ```
pub struct VortexSortBuilder<T> {
    items_per_sort: usize,
    block_size_power: u32,
    digit_bits: u32,
    base_case_threshold: Option<usize>,
    headroom_blocks: Option<usize>,
    tuner: Box<dyn Tuner + Send + Sync>,
    _key: PhantomData<fn() -> T>,
}

impl<T> VortexSortBuilder<T>
where
    T: RadixKey,
{
    pub(crate) fn new(items_per_sort: usize) -> Self {
        Self {
            items_per_sort,
            block_size_power: DEFAULT_BLOCK_SIZE_POWER,
            digit_bits: DEFAULT_DIGIT_BITS,
            base_case_threshold: None,
            headroom_blocks: None,
            tuner: Box::new(StandardTuner),
            _key: PhantomData,
        }
    }

    /// Blocks of `2^power` bytes.
    pub fn with_block_size_power(mut self, power: u32) -> Self {
        self.block_size_power = power;

        self
    }

    /// Bits of key consumed per partition level.
    pub fn with_digit_bits(mut self, bits: u32) -> Self {
        self.digit_bits = bits;

        self
    }

    /// Buckets of at most this many items are sorted directly instead of being split again.
    /// Must be within one block.
    pub fn with_base_case_threshold(mut self, items: usize) -> Self {
        self.base_case_threshold = Some(items);

        self
    }

    /// Blocks reserved beyond those needed to hold `items_per_sort` items.
    pub fn with_headroom_blocks(mut self, blocks: usize) -> Self {
        self.headroom_blocks = Some(blocks);

        self
    }

    pub fn with_tuner(mut self, tuner: Box<dyn Tuner + Send + Sync>) -> Self {
        self.tuner = tuner;

        self
    }

    pub fn build(self) -> Result<VortexSort<T>> {
        let block_len = BlockPool::<T>::items_per_block(self.block_size_power)?;
        let plan = DigitPlan::new(T::BITS, self.digit_bits)?;

        let base_case_threshold = self
            .base_case_threshold
            .unwrap_or_else(|| TuningParameters::base_case_threshold::<T>(block_len));

        if base_case_threshold == 0 || base_case_threshold > block_len {
            return Err(ConfigError::BaseCaseThreshold {
                threshold: base_case_threshold,
                block_len,
            }
            .into());
        }

        let headroom = self
            .headroom_blocks
            .unwrap_or_else(|| TuningParameters::headroom_blocks(&plan));

        let capacity = cdiv(self.items_per_sort, block_len)
            .checked_add(headroom)
            .ok_or(ConfigError::PoolTooLarge {
                blocks: usize::MAX,
                block_len,
            })?;

        let pool = BlockPool::new(capacity, self.block_size_power)?;

        tracing::debug!(
            items_per_sort = self.items_per_sort,
            block_len,
            levels = plan.levels(),
            digit_bits = plan.digit_bits(),
            base_case_threshold,
            capacity,
            "built vortex sort"
        );

        Ok(VortexSort::from_parts(
            pool,
            plan,
            self.items_per_sort,
            base_case_threshold,
            self.tuner,
        ))
    }
}

#[cfg(test)]
mod tests {
    use crate::error::{ConfigError, VortexError};
    use crate::tuning_parameters::MAX_DIGIT_BITS;
    use crate::VortexSort;

    #[test]
    pub fn test_defaults() {
        let s = VortexSort::<u32>::builder(1 << 20).build().unwrap();

        assert_eq!(s.block_size(), 1 << 20);
        assert_eq!(s.n_buckets(), vec![256; 4]);
        assert_eq!(s.base_case_threshold(), 16 * 1024);
        // Four blocks of data plus headroom.
        assert_eq!(s.pool().capacity(), 4 + 1024 + 4 + 2);
    }

    #[test]
    pub fn test_rejects_block_smaller_than_item() {
        assert!(matches!(
            VortexSort::<u64>::new(16, 2),
            Err(VortexError::InvalidConfiguration(ConfigError::BlockTooSmall { .. }))
        ));
    }

    #[test]
    pub fn test_rejects_bad_threshold() {
        let zero = VortexSort::<u32>::builder(16)
            .with_block_size_power(4)
            .with_base_case_threshold(0)
            .build();
        let too_big = VortexSort::<u32>::builder(16)
            .with_block_size_power(4)
            .with_base_case_threshold(5)
            .build();

        assert!(matches!(
            zero,
            Err(VortexError::InvalidConfiguration(ConfigError::BaseCaseThreshold { .. }))
        ));
        assert!(matches!(
            too_big,
            Err(VortexError::InvalidConfiguration(ConfigError::BaseCaseThreshold {
                threshold: 5,
                block_len: 4,
            }))
        ));
    }

    #[test]
    pub fn test_rejects_bad_digit_bits() {
        let r = VortexSort::<u16>::builder(16)
            .with_digit_bits(MAX_DIGIT_BITS + 1)
            .build();

        assert!(matches!(
            r,
            Err(VortexError::InvalidConfiguration(ConfigError::DigitBits { .. }))
        ));
    }

    #[test]
    pub fn test_explicit_headroom() {
        let s = VortexSort::<u8>::builder(100)
            .with_block_size_power(4)
            .with_headroom_blocks(3)
            .build()
            .unwrap();

        assert_eq!(s.pool().capacity(), 7 + 3);
    }
}
