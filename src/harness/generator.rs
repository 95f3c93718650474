use crate::RadixKey;

const MULTIPLIER: u64 = 6364136223846793005;
const INCREMENT: u64 = 1442695040888963407;

/// Four interleaved 64-bit linear congruential generators.
///
/// Lane `i` of each group of four items comes from generator `i`, and an item is the top
/// `T::BITS` bits of its generator's state. Every `Lcg::new()` produces the same sequence.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Lcg {
    lanes: [u64; 4],
}

impl Lcg {
    pub const SEEDS: [u64; 4] = [10_000, 1_000_000_000_000, 1_000_000_000_000_000_000, 3];

    pub fn new() -> Self {
        Self::with_seeds(Self::SEEDS)
    }

    pub fn with_seeds(lanes: [u64; 4]) -> Self {
        Self { lanes }
    }

    /// Overwrite `out` with the next `out.len()` keys.
    pub fn fill<T>(&mut self, out: &mut [T])
    where
        T: RadixKey,
    {
        let upper = 64 - T::BITS.min(64);

        for group in out.chunks_mut(4) {
            for (item, lane) in group.iter_mut().zip(self.lanes.iter_mut()) {
                *lane = lane.wrapping_mul(MULTIPLIER).wrapping_add(INCREMENT);
                *item = T::from_u64(*lane >> upper);
            }
        }
    }
}

impl Default for Lcg {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    pub fn test_reproducible() {
        let mut a = vec![0u32; 103];
        let mut b = vec![0u32; 103];

        Lcg::new().fill(&mut a);
        Lcg::new().fill(&mut b);

        assert_eq!(a, b);
    }

    #[test]
    pub fn test_first_group() {
        let mut out = [0u64; 4];
        Lcg::new().fill(&mut out);

        for (item, seed) in out.iter().zip(Lcg::SEEDS) {
            assert_eq!(*item, seed.wrapping_mul(MULTIPLIER).wrapping_add(INCREMENT));
        }
    }

    #[test]
    pub fn test_narrow_keys_take_top_bits() {
        let mut wide = [0u64; 8];
        let mut narrow = [0u8; 8];

        Lcg::new().fill(&mut wide);
        Lcg::new().fill(&mut narrow);

        for (w, n) in wide.iter().zip(narrow) {
            assert_eq!((w >> 56) as u8, n);
        }
    }

    #[test]
    pub fn test_partial_group_continues_lanes() {
        let mut whole = [0u16; 8];
        Lcg::new().fill(&mut whole);

        let mut lcg = Lcg::new();
        let mut first = [0u16; 4];
        let mut second = [0u16; 4];
        lcg.fill(&mut first);
        lcg.fill(&mut second);

        assert_eq!(&whole[..4], &first);
        assert_eq!(&whole[4..], &second);
    }
}
